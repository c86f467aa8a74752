//! Lace runtime: the evaluation core of a Clojure-dialect Lisp
//!
//! Key design principles:
//! - Value: one closed tagged sum for everything the language talks
//!   about (scalars, persistent collections, functions, reference
//!   cells)
//! - RuntimeContext: an explicit per-task context instead of
//!   thread-local globals (host hooks, namespaces, binding stack,
//!   output capture, classpath)
//! - Lazy sequences advance by exactly one element per force and
//!   memoize in place
//!
//! The reader, macro expander, analyzer, and evaluator are external:
//! they reach the core through `registry::install` and the context's
//! `call`/`force`/`eval_source` hooks.

pub mod arithmetic;
pub mod context;
pub mod error;
pub mod io;
pub mod lazy;
pub mod list_ops;
pub mod map_ops;
pub mod misc_ops;
pub mod multi_ops;
pub mod namespace;
pub mod ns_ops;
pub mod predicates;
pub mod printer;
pub mod random;
pub mod ref_ops;
pub mod registry;
pub mod regex_ops;
pub mod seq_ops;
pub mod set_ops;
pub mod string_ops;
pub mod value;
pub mod walk_ops;

// Re-export the types a host embedding needs
pub use context::{HostCallFn, HostEvalFn, HostForceFn, RuntimeContext};
pub use error::RuntimeError;
pub use lazy::{LazySeqCell, force_one_step, realize_all, seq_empty, seq_first, seq_rest};
pub use namespace::{BindingStack, CORE_NS, Environment, Namespace, Var};
pub use registry::install;
pub use value::{EvalResult, Value};
