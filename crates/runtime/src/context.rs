//! Per-task runtime context
//!
//! The reference interpreter kept its evaluator hooks, output capture,
//! binding stack, classpath, and loaded-libs set in thread-local slots.
//! Here they are consolidated into one explicit context threaded
//! through every builtin. Only the gensym counter is process-global -
//! it is a monotonic source with no identity of its own.
//!
//! # Host hooks
//!
//! Three callback slots connect the core to the host evaluator:
//!
//! - `call_fn` invokes a user-defined (host-compiled) function value
//! - `force_fn` drives a zero-argument host thunk (delays, lazy-seq
//!   bodies)
//! - `eval_source_fn` hands loaded file text to the external
//!   reader/analyzer/evaluator chain (`require`, `load-file`)
//!
//! Calling a host function without the matching hook installed is a
//! type error.

use crate::error::RuntimeError;
use crate::namespace::{BindingStack, CORE_NS, Environment, Var};
use crate::value::{EvalResult, FnImpl, Value};
use std::collections::BTreeSet;
use std::io::Write;
use std::path::PathBuf;
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};

/// Invoke an arbitrary host function value with arguments.
pub type HostCallFn = Rc<dyn Fn(&mut RuntimeContext, &Value, &[Value]) -> EvalResult>;

/// Drive a zero-argument host function (thunk).
pub type HostForceFn = Rc<dyn Fn(&mut RuntimeContext, &Value) -> EvalResult>;

/// Evaluate loaded source text; second argument is the origin path for
/// error reporting.
pub type HostEvalFn = Rc<dyn Fn(&mut RuntimeContext, &str, &str) -> EvalResult>;

/// Classpath roots are capped; sixteen covers any sane project layout.
pub const MAX_CLASSPATH_ROOTS: usize = 16;

static GENSYM_COUNTER: AtomicU64 = AtomicU64::new(0);

pub struct RuntimeContext {
    pub env: Environment,
    pub current_ns: String,
    pub bindings: BindingStack,
    call_fn: Option<HostCallFn>,
    force_fn: Option<HostForceFn>,
    eval_source_fn: Option<HostEvalFn>,
    output_capture: Option<String>,
    classpath: Vec<PathBuf>,
    loaded_libs: BTreeSet<String>,
}

impl Default for RuntimeContext {
    fn default() -> Self {
        Self::new()
    }
}

impl RuntimeContext {
    pub fn new() -> Self {
        Self {
            env: Environment::new(),
            current_ns: CORE_NS.to_string(),
            bindings: BindingStack::new(),
            call_fn: None,
            force_fn: None,
            eval_source_fn: None,
            output_capture: None,
            classpath: Vec::new(),
            loaded_libs: BTreeSet::new(),
        }
    }

    // Hook installation

    pub fn install_call_fn(&mut self, f: HostCallFn) {
        self.call_fn = Some(f);
    }

    pub fn install_force_fn(&mut self, f: HostForceFn) {
        self.force_fn = Some(f);
    }

    pub fn install_eval_source_fn(&mut self, f: HostEvalFn) {
        self.eval_source_fn = Some(f);
    }

    // Calling

    /// Invoke any callable value. Builtins run directly; host closures
    /// go through the `call_fn` hook; keywords, maps, sets, and vectors
    /// act as lookup functions as usual.
    pub fn call(&mut self, f: &Value, args: &[Value]) -> EvalResult {
        match f {
            Value::Fn(fv) => match &fv.imp {
                FnImpl::Native(native) => {
                    let native = native.clone();
                    native(self, args)
                }
                FnImpl::Host(_) => {
                    let hook = self.call_fn.clone().ok_or_else(|| {
                        RuntimeError::Type(
                            "cannot invoke user function: no call hook installed".to_string(),
                        )
                    })?;
                    hook(self, f, args)
                }
            },
            Value::PartialFn(p) => {
                let mut full = p.prefix.clone();
                full.extend_from_slice(args);
                let inner = p.f.clone();
                self.call(&inner, &full)
            }
            Value::CompFn(c) => {
                let fns = c.fns.clone();
                match fns.split_last() {
                    None => {
                        // (comp) is identity
                        match args {
                            [single] => Ok(single.clone()),
                            _ => Err(RuntimeError::arity_err("comp", "1", args.len())),
                        }
                    }
                    Some((rightmost, rest)) => {
                        let mut result = self.call(rightmost, args)?;
                        for f in rest.iter().rev() {
                            result = self.call(f, &[result])?;
                        }
                        Ok(result)
                    }
                }
            }
            Value::MultiFn(m) => {
                let dispatch = m.dispatch.clone();
                let dispatch_val = self.call(&dispatch, args)?;
                let method = {
                    let methods = m.methods.borrow();
                    methods
                        .iter()
                        .find(|(k, _)| *k == dispatch_val)
                        .or_else(|| {
                            let default = Value::keyword("default");
                            methods.iter().find(|(k, _)| *k == default)
                        })
                        .map(|(_, v)| v.clone())
                };
                match method {
                    Some(method) => self.call(&method, args),
                    None => Err(RuntimeError::Type(format!(
                        "multimethod {}: no method for dispatch value {:?}",
                        m.name, dispatch_val
                    ))),
                }
            }
            Value::ProtocolFn(pf) => {
                let receiver = args.first().ok_or_else(|| {
                    RuntimeError::arity_err(&pf.name, "at least 1", args.len())
                })?;
                let tag = receiver.type_tag();
                let method = pf
                    .protocol
                    .impls
                    .borrow()
                    .get(tag)
                    .and_then(|methods| methods.get(&pf.name))
                    .cloned();
                match method {
                    Some(method) => self.call(&method, args),
                    None => Err(RuntimeError::Type(format!(
                        "protocol {}: no implementation of {} for type {}",
                        pf.protocol.name, pf.name, tag
                    ))),
                }
            }
            Value::FnProto(p) => Err(RuntimeError::Type(format!(
                "protocol method prototype {} is not attached to any protocol",
                p.name
            ))),
            // Keywords and symbols look themselves up in the collection
            Value::Keyword(_) | Value::Symbol(_) => match args {
                [coll] => self.lookup_in(coll, f, &Value::Nil),
                [coll, not_found] => self.lookup_in(coll, f, not_found),
                _ => Err(RuntimeError::arity_err("ident lookup", "1 to 2", args.len())),
            },
            Value::Map(m) => match args {
                [key] => Ok(m.entries.get(key).cloned().unwrap_or(Value::Nil)),
                [key, not_found] => {
                    Ok(m.entries.get(key).cloned().unwrap_or_else(|| not_found.clone()))
                }
                _ => Err(RuntimeError::arity_err("map lookup", "1 to 2", args.len())),
            },
            Value::Set(s) => match args {
                [item] => Ok(if s.items.contains(item) {
                    item.clone()
                } else {
                    Value::Nil
                }),
                _ => Err(RuntimeError::arity_err("set lookup", "1", args.len())),
            },
            Value::Vector(v) => match args {
                [index] => {
                    let i = index.as_int().ok_or_else(|| {
                        RuntimeError::type_err("vector lookup", "integer index", index)
                    })?;
                    usize::try_from(i)
                        .ok()
                        .and_then(|i| v.items.get(i).cloned())
                        .ok_or_else(|| {
                            RuntimeError::IndexOutOfBounds(format!(
                                "vector lookup: index {} for vector of length {}",
                                i,
                                v.items.len()
                            ))
                        })
                }
                _ => Err(RuntimeError::arity_err("vector lookup", "1", args.len())),
            },
            Value::Var(var) => {
                let value = self.deref_var(var);
                self.call(&value, args)
            }
            other => Err(RuntimeError::Type(format!(
                "value of type {} is not callable",
                other.type_tag()
            ))),
        }
    }

    fn lookup_in(&mut self, coll: &Value, key: &Value, not_found: &Value) -> EvalResult {
        match coll {
            Value::Map(m) => Ok(m
                .entries
                .get(key)
                .cloned()
                .unwrap_or_else(|| not_found.clone())),
            Value::Set(s) => Ok(if s.items.contains(key) {
                key.clone()
            } else {
                not_found.clone()
            }),
            Value::Nil => Ok(not_found.clone()),
            _ => Ok(not_found.clone()),
        }
    }

    /// Drive a zero-argument function. Host thunks require the
    /// `force_fn` hook; builtins are invoked directly.
    pub fn force_thunk(&mut self, f: &Value) -> EvalResult {
        match f {
            Value::Fn(fv) => match &fv.imp {
                FnImpl::Native(native) => {
                    let native = native.clone();
                    native(self, &[])
                }
                FnImpl::Host(_) => {
                    let hook = self.force_fn.clone().ok_or_else(|| {
                        RuntimeError::Type(
                            "cannot force thunk: no force hook installed".to_string(),
                        )
                    })?;
                    hook(self, f)
                }
            },
            other => self.call(other, &[]),
        }
    }

    /// Evaluate source text via the host chain.
    pub fn eval_source(&mut self, source: &str, origin: &str) -> EvalResult {
        let hook = self.eval_source_fn.clone().ok_or_else(|| {
            RuntimeError::IllegalState(
                "cannot load source: no eval hook installed".to_string(),
            )
        })?;
        hook(self, source, origin)
    }

    // Vars

    /// Topmost thread-binding frame entry if one exists, otherwise the
    /// root.
    pub fn deref_var(&self, var: &Rc<Var>) -> Value {
        self.bindings.lookup(var).unwrap_or_else(|| var.root())
    }

    /// The namespace the context is currently in.
    pub fn current_ns(&self) -> Rc<crate::namespace::Namespace> {
        self.env.ensure_ns(&self.current_ns)
    }

    /// Resolve a possibly qualified symbol name against the current
    /// namespace: aliases and namespace qualifiers first, then local
    /// mappings, then `clojure.core`.
    pub fn resolve(&self, name: &str) -> Option<Rc<Var>> {
        let ident = lace_core::Ident::parse(name);
        match &ident.ns {
            Some(qualifier) => {
                let current = self.current_ns();
                let ns_name = current
                    .alias_target(qualifier)
                    .unwrap_or_else(|| qualifier.clone());
                self.env.find_ns(&ns_name)?.lookup(&ident.name)
            }
            None => {
                let current = self.current_ns();
                current.lookup(&ident.name).or_else(|| {
                    self.env.find_ns(CORE_NS).and_then(|core| core.lookup(&ident.name))
                })
            }
        }
    }

    // Output

    /// Install a capture buffer; subsequent print output accumulates
    /// there instead of going to stdout.
    pub fn install_output_capture(&mut self) {
        self.output_capture = Some(String::new());
    }

    /// Drain and remove the capture buffer.
    pub fn take_output_capture(&mut self) -> Option<String> {
        self.output_capture.take()
    }

    pub fn write_output(&mut self, text: &str) {
        match &mut self.output_capture {
            Some(buf) => buf.push_str(text),
            None => {
                let _ = std::io::stdout().write_all(text.as_bytes());
            }
        }
    }

    pub fn flush_output(&mut self) {
        if self.output_capture.is_none() {
            let _ = std::io::stdout().flush();
        }
    }

    // Classpath and loaded libs

    pub fn add_classpath_root(&mut self, root: PathBuf) -> Result<(), RuntimeError> {
        if self.classpath.len() >= MAX_CLASSPATH_ROOTS {
            return Err(RuntimeError::IllegalState(format!(
                "classpath is limited to {} roots",
                MAX_CLASSPATH_ROOTS
            )));
        }
        self.classpath.push(root);
        Ok(())
    }

    pub fn classpath(&self) -> &[PathBuf] {
        &self.classpath
    }

    pub fn is_lib_loaded(&self, lib: &str) -> bool {
        self.loaded_libs.contains(lib)
    }

    pub fn mark_lib_loaded(&mut self, lib: &str) {
        self.loaded_libs.insert(lib.to_string());
    }

    pub fn loaded_libs(&self) -> impl Iterator<Item = &str> {
        self.loaded_libs.iter().map(|s| s.as_str())
    }

    /// Next process-wide gensym ordinal.
    pub fn next_gensym_id(&self) -> u64 {
        GENSYM_COUNTER.fetch_add(1, Ordering::Relaxed)
    }
}
