//! Lace core: the data substrate for a Lisp runtime
//!
//! Key design principles:
//! - Persistent containers: every "modify" returns a new container and
//!   leaves the original observably unchanged
//! - Insertion order is part of the contract for maps and sets
//! - Equality is caller-supplied (`PartialEq` on the element type), never
//!   hashing, so unhashable keys (floats, nested containers) are fine
//!
//! The containers are generic; the runtime crate instantiates them with
//! its `Value` type.

pub mod flat;
pub mod hash;
pub mod ident;
pub mod list;
pub mod vector;

pub use flat::{FlatMap, FlatSet};
pub use ident::Ident;
pub use list::PersistentList;
pub use vector::PersistentVector;
