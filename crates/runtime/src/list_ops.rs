//! List and vector operations
//!
//! Constructors plus the positional API. `conj` is polymorphic over
//! every collection kind: it prepends to lists, appends to vectors,
//! adds entries to maps, and members to sets.

use crate::context::RuntimeContext;
use crate::error::{RuntimeError, expect_arity, expect_arity_range, expect_min_arity};
use crate::lazy;
use crate::value::{EvalResult, Value};

pub fn list(_ctx: &mut RuntimeContext, args: &[Value]) -> EvalResult {
    Ok(Value::list_from_vec(args.to_vec()))
}

pub fn vector(_ctx: &mut RuntimeContext, args: &[Value]) -> EvalResult {
    Ok(Value::vector_from_vec(args.to_vec()))
}

/// Coerce any finite seqable into a vector.
pub fn vec(ctx: &mut RuntimeContext, args: &[Value]) -> EvalResult {
    expect_arity("vec", args, 1)?;
    match &args[0] {
        Value::Vector(_) => Ok(args[0].clone()),
        other => Ok(Value::vector_from_vec(lazy::realize_all(ctx, other)?)),
    }
}

/// `(cons x coll)` - new sequence with `x` prepended. Lists stay
/// lists; a lazy tail stays deferred.
pub fn cons(_ctx: &mut RuntimeContext, args: &[Value]) -> EvalResult {
    expect_arity("cons", args, 2)?;
    let head = args[0].clone();
    match &args[1] {
        Value::Nil => Ok(Value::list_from_vec(vec![head])),
        Value::List(l) => Ok(Value::list(l.items.cons(head))),
        tail => Ok(crate::lazy::LazySeqCell::cons(head, tail.clone())),
    }
}

/// Polymorphic `conj`; nil conjures a list.
pub fn conj(_ctx: &mut RuntimeContext, args: &[Value]) -> EvalResult {
    expect_min_arity("conj", args, 1)?;
    let mut coll = args[0].clone();
    for item in &args[1..] {
        coll = conj_one(&coll, item)?;
    }
    Ok(coll)
}

fn conj_one(coll: &Value, item: &Value) -> EvalResult {
    match coll {
        Value::Nil => Ok(Value::list_from_vec(vec![item.clone()])),
        Value::List(l) => Ok(Value::list(l.items.cons(item.clone()))),
        Value::Vector(v) => Ok(Value::vector(v.items.push(item.clone()))),
        Value::Set(s) => Ok(Value::set(s.items.conj(item.clone()))),
        Value::Map(m) => match item {
            // Entries arrive as [k v] vectors or as maps to merge
            Value::Vector(pair) if pair.items.len() == 2 => {
                let k = pair.items.get(0).cloned().unwrap_or(Value::Nil);
                let v = pair.items.get(1).cloned().unwrap_or(Value::Nil);
                Ok(Value::map(m.entries.assoc(k, v)))
            }
            Value::Map(other) => {
                let mut entries = m.entries.clone();
                for (k, v) in other.entries.iter() {
                    entries = entries.assoc(k.clone(), v.clone());
                }
                Ok(Value::map(entries))
            }
            other => Err(RuntimeError::type_err(
                "conj",
                "map entry ([k v] vector or map)",
                other,
            )),
        },
        other => Err(RuntimeError::type_err("conj", "collection", other)),
    }
}

/// Indexed access. Vectors and strings are O(1); lists and lazy
/// sequences walk, so an infinite source with a reachable index is
/// fine. Out of range without a not-found value is an error.
pub fn nth(ctx: &mut RuntimeContext, args: &[Value]) -> EvalResult {
    expect_arity_range("nth", args, 2, 3)?;
    let i = args[1]
        .as_int()
        .ok_or_else(|| RuntimeError::type_err("nth", "integer index", &args[1]))?;
    let not_found = args.get(2).cloned();
    let miss = |i: i64| match &not_found {
        Some(v) => Ok(v.clone()),
        None => Err(RuntimeError::IndexOutOfBounds(format!(
            "nth: index {} out of range",
            i
        ))),
    };
    if i < 0 {
        return miss(i);
    }
    match &args[0] {
        Value::Vector(v) => match v.items.get(i as usize) {
            Some(item) => Ok(item.clone()),
            None => miss(i),
        },
        Value::Str(s) => match s.chars().nth(i as usize) {
            Some(c) => Ok(Value::Char(c)),
            None => miss(i),
        },
        Value::Nil => miss(i),
        seqable @ (Value::List(_) | Value::LazySeq(_)) => {
            let mut cursor = seqable.clone();
            for _ in 0..i {
                if lazy::seq_empty(ctx, &cursor)? {
                    return miss(i);
                }
                cursor = lazy::seq_rest(ctx, &cursor)?;
            }
            if lazy::seq_empty(ctx, &cursor)? {
                return miss(i);
            }
            lazy::seq_first(ctx, &cursor)
        }
        other => Err(RuntimeError::type_err("nth", "indexed or seqable", other)),
    }
}

/// View-like copy of `[start, end)`.
pub fn subvec(_ctx: &mut RuntimeContext, args: &[Value]) -> EvalResult {
    expect_arity_range("subvec", args, 2, 3)?;
    let v = match &args[0] {
        Value::Vector(v) => v,
        other => return Err(RuntimeError::type_err("subvec", "vector", other)),
    };
    let start = args[1]
        .as_int()
        .ok_or_else(|| RuntimeError::type_err("subvec", "integer index", &args[1]))?;
    let end = match args.get(2) {
        Some(e) => e
            .as_int()
            .ok_or_else(|| RuntimeError::type_err("subvec", "integer index", e))?,
        None => v.items.len() as i64,
    };
    usize::try_from(start)
        .ok()
        .zip(usize::try_from(end).ok())
        .and_then(|(s, e)| v.items.slice(s, e))
        .map(Value::vector)
        .ok_or_else(|| {
            RuntimeError::IndexOutOfBounds(format!(
                "subvec: range [{}, {}) for vector of length {}",
                start,
                end,
                v.items.len()
            ))
        })
}

/// Last of a vector, first of a list.
pub fn peek(_ctx: &mut RuntimeContext, args: &[Value]) -> EvalResult {
    expect_arity("peek", args, 1)?;
    match &args[0] {
        Value::Nil => Ok(Value::Nil),
        Value::Vector(v) => Ok(v.items.last().cloned().unwrap_or(Value::Nil)),
        Value::List(l) => Ok(l.items.first().cloned().unwrap_or(Value::Nil)),
        other => Err(RuntimeError::type_err("peek", "vector or list", other)),
    }
}

/// Without the peeked element; popping an empty collection is an
/// illegal state.
pub fn pop(_ctx: &mut RuntimeContext, args: &[Value]) -> EvalResult {
    expect_arity("pop", args, 1)?;
    match &args[0] {
        Value::Vector(v) => v.items.pop().map(Value::vector).ok_or_else(|| {
            RuntimeError::IllegalState("pop: cannot pop an empty vector".to_string())
        }),
        Value::List(l) => {
            if l.items.is_empty() {
                Err(RuntimeError::IllegalState(
                    "pop: cannot pop an empty list".to_string(),
                ))
            } else {
                Ok(Value::list(l.items.rest()))
            }
        }
        other => Err(RuntimeError::type_err("pop", "vector or list", other)),
    }
}

/// Reversed seq of a vector; nil when empty.
pub fn rseq(_ctx: &mut RuntimeContext, args: &[Value]) -> EvalResult {
    expect_arity("rseq", args, 1)?;
    match &args[0] {
        Value::Vector(v) => {
            if v.items.is_empty() {
                return Ok(Value::Nil);
            }
            let mut items = v.items.to_vec();
            items.reverse();
            Ok(Value::list_from_vec(items))
        }
        other => Err(RuntimeError::type_err("rseq", "vector", other)),
    }
}
