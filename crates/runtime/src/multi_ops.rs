//! Multimethods and protocols
//!
//! A multimethod pairs a dispatch function with a method table keyed
//! by dispatch value (`=` lookup, `:default` fallback). A protocol is
//! a named method set whose implementations are keyed by the
//! receiver's type-tag string. The expander lowers `defmulti`,
//! `defmethod`, `defprotocol`, and `extend-type` onto the `__`
//! primitives here.

use crate::context::RuntimeContext;
use crate::error::{RuntimeError, expect_arity, expect_min_arity};
use crate::value::{EvalResult, FnProtoVal, MultiFnVal, ProtocolFnVal, ProtocolVal, Value};
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

fn ident_name(op: &str, v: &Value) -> Result<String, RuntimeError> {
    match v {
        Value::Str(s) => Ok(s.to_string()),
        Value::Keyword(id) | Value::Symbol(id) => Ok(id.name.clone()),
        other => Err(RuntimeError::type_err(op, "name", other)),
    }
}

/// `(__defmulti name dispatch-fn)`.
pub fn defmulti(_ctx: &mut RuntimeContext, args: &[Value]) -> EvalResult {
    expect_arity("__defmulti", args, 2)?;
    let name = ident_name("__defmulti", &args[0])?;
    Ok(Value::MultiFn(Rc::new(MultiFnVal {
        name,
        dispatch: args[1].clone(),
        methods: RefCell::new(Vec::new()),
    })))
}

/// `(__defmethod multifn dispatch-val method-fn)`; re-defining a
/// dispatch value replaces its method.
pub fn defmethod(_ctx: &mut RuntimeContext, args: &[Value]) -> EvalResult {
    expect_arity("__defmethod", args, 3)?;
    match &args[0] {
        Value::MultiFn(m) => {
            let mut methods = m.methods.borrow_mut();
            if let Some(entry) = methods.iter_mut().find(|(k, _)| *k == args[1]) {
                entry.1 = args[2].clone();
            } else {
                methods.push((args[1].clone(), args[2].clone()));
            }
            drop(methods);
            Ok(args[0].clone())
        }
        other => Err(RuntimeError::type_err("__defmethod", "multifn", other)),
    }
}

/// Method table as a map of dispatch value to fn.
pub fn methods(_ctx: &mut RuntimeContext, args: &[Value]) -> EvalResult {
    expect_arity("methods", args, 1)?;
    match &args[0] {
        Value::MultiFn(m) => Ok(Value::map_from_pairs(m.methods.borrow().clone())),
        other => Err(RuntimeError::type_err("methods", "multifn", other)),
    }
}

pub fn remove_method(_ctx: &mut RuntimeContext, args: &[Value]) -> EvalResult {
    expect_arity("remove-method", args, 2)?;
    match &args[0] {
        Value::MultiFn(m) => {
            m.methods.borrow_mut().retain(|(k, _)| *k != args[1]);
            Ok(args[0].clone())
        }
        other => Err(RuntimeError::type_err("remove-method", "multifn", other)),
    }
}

/// `(__defprotocol name method-name ...)` - returns the protocol;
/// each method becomes a callable `ProtocolFn`, reachable via
/// `__protocol-fn`.
pub fn defprotocol(_ctx: &mut RuntimeContext, args: &[Value]) -> EvalResult {
    expect_min_arity("__defprotocol", args, 1)?;
    let name = ident_name("__defprotocol", &args[0])?;
    for m in &args[1..] {
        ident_name("__defprotocol", m)?;
    }
    Ok(Value::Protocol(Rc::new(ProtocolVal {
        name,
        impls: RefCell::new(HashMap::new()),
    })))
}

/// `(__protocol-fn protocol method-name)` - the callable dispatcher
/// for one protocol method.
pub fn protocol_fn(_ctx: &mut RuntimeContext, args: &[Value]) -> EvalResult {
    expect_arity("__protocol-fn", args, 2)?;
    match &args[0] {
        Value::Protocol(p) => Ok(Value::ProtocolFn(Rc::new(ProtocolFnVal {
            name: ident_name("__protocol-fn", &args[1])?,
            protocol: p.clone(),
        }))),
        other => Err(RuntimeError::type_err("__protocol-fn", "protocol", other)),
    }
}

/// Placeholder for a declared-but-unattached protocol method.
pub fn fn_proto(_ctx: &mut RuntimeContext, args: &[Value]) -> EvalResult {
    expect_min_arity("__fn-proto", args, 1)?;
    Ok(Value::FnProto(Rc::new(FnProtoVal {
        name: ident_name("__fn-proto", &args[0])?,
        doc: args.get(1).and_then(|v| v.as_str().map(str::to_string)),
    })))
}

/// `(__extend-type protocol type-tag {method-name fn, ...})`.
pub fn extend_type(_ctx: &mut RuntimeContext, args: &[Value]) -> EvalResult {
    expect_arity("__extend-type", args, 3)?;
    let proto = match &args[0] {
        Value::Protocol(p) => p.clone(),
        other => return Err(RuntimeError::type_err("__extend-type", "protocol", other)),
    };
    let tag = ident_name("__extend-type", &args[1])?;
    let methods = match &args[2] {
        Value::Map(m) => m,
        other => return Err(RuntimeError::type_err("__extend-type", "method map", other)),
    };
    let mut table = HashMap::new();
    for (k, f) in methods.entries.iter() {
        table.insert(ident_name("__extend-type", k)?, f.clone());
    }
    proto.impls.borrow_mut().insert(tag, table);
    Ok(args[0].clone())
}

/// Does the value's type implement the protocol?
pub fn satisfies_p(_ctx: &mut RuntimeContext, args: &[Value]) -> EvalResult {
    expect_arity("satisfies?", args, 2)?;
    match &args[0] {
        Value::Protocol(p) => Ok(Value::Bool(
            p.impls.borrow().contains_key(args[1].type_tag()),
        )),
        other => Err(RuntimeError::type_err("satisfies?", "protocol", other)),
    }
}

/// Does the named type tag implement the protocol?
pub fn extends_p(_ctx: &mut RuntimeContext, args: &[Value]) -> EvalResult {
    expect_arity("extends?", args, 2)?;
    match &args[0] {
        Value::Protocol(p) => {
            let tag = ident_name("extends?", &args[1])?;
            Ok(Value::Bool(p.impls.borrow().contains_key(&tag)))
        }
        other => Err(RuntimeError::type_err("extends?", "protocol", other)),
    }
}
