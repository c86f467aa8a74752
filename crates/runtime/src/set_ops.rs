//! Set operations
//!
//! Construction, membership, and the algebra (`union`, `difference`,
//! `intersection`). Membership is by `=`, insertion order is kept.

use crate::context::RuntimeContext;
use crate::error::{RuntimeError, expect_arity, expect_min_arity};
use crate::lazy;
use crate::value::{EvalResult, Value};
use lace_core::FlatSet;

pub fn hash_set(_ctx: &mut RuntimeContext, args: &[Value]) -> EvalResult {
    Ok(Value::set_from_vec(args.to_vec()))
}

/// Coerce any finite seqable into a set.
pub fn set(ctx: &mut RuntimeContext, args: &[Value]) -> EvalResult {
    expect_arity("set", args, 1)?;
    match &args[0] {
        Value::Set(_) => Ok(args[0].clone()),
        other => Ok(Value::set_from_vec(lazy::realize_all(ctx, other)?)),
    }
}

pub fn disj(_ctx: &mut RuntimeContext, args: &[Value]) -> EvalResult {
    expect_min_arity("disj", args, 1)?;
    match &args[0] {
        Value::Nil => Ok(Value::Nil),
        Value::Set(s) => {
            let mut items = s.items.clone();
            for item in &args[1..] {
                items = items.disj(item);
            }
            Ok(Value::set(items))
        }
        other => Err(RuntimeError::type_err("disj", "set", other)),
    }
}

fn as_set(op: &str, v: &Value) -> Result<FlatSet<Value>, RuntimeError> {
    match v {
        Value::Nil => Ok(FlatSet::new()),
        Value::Set(s) => Ok(s.items.clone()),
        other => Err(RuntimeError::type_err(op, "set", other)),
    }
}

pub fn union(_ctx: &mut RuntimeContext, args: &[Value]) -> EvalResult {
    let mut out = FlatSet::new();
    for arg in args {
        for item in as_set("union", arg)?.iter() {
            out = out.conj(item.clone());
        }
    }
    Ok(Value::set(out))
}

/// Members of the first set not present in any of the rest.
pub fn difference(_ctx: &mut RuntimeContext, args: &[Value]) -> EvalResult {
    expect_min_arity("difference", args, 1)?;
    let mut out = as_set("difference", &args[0])?;
    for arg in &args[1..] {
        for item in as_set("difference", arg)?.iter() {
            out = out.disj(item);
        }
    }
    Ok(Value::set(out))
}

pub fn intersection(_ctx: &mut RuntimeContext, args: &[Value]) -> EvalResult {
    expect_min_arity("intersection", args, 1)?;
    let first = as_set("intersection", &args[0])?;
    let rest: Vec<FlatSet<Value>> = args[1..]
        .iter()
        .map(|v| as_set("intersection", v))
        .collect::<Result<_, _>>()?;
    let kept: Vec<Value> = first
        .iter()
        .filter(|item| rest.iter().all(|s| s.contains(item)))
        .cloned()
        .collect();
    Ok(Value::set_from_vec(kept))
}

pub fn subset_p(_ctx: &mut RuntimeContext, args: &[Value]) -> EvalResult {
    expect_arity("subset?", args, 2)?;
    let a = as_set("subset?", &args[0])?;
    let b = as_set("subset?", &args[1])?;
    Ok(Value::Bool(a.iter().all(|item| b.contains(item))))
}

pub fn superset_p(_ctx: &mut RuntimeContext, args: &[Value]) -> EvalResult {
    expect_arity("superset?", args, 2)?;
    let a = as_set("superset?", &args[0])?;
    let b = as_set("superset?", &args[1])?;
    Ok(Value::Bool(b.iter().all(|item| a.contains(item))))
}
