//! Metadata, typing, hashing, and error-value builtins

use crate::context::RuntimeContext;
use crate::error::{RuntimeError, expect_arity, expect_min_arity};
use crate::value::{EvalResult, Value, hash_value};
use lace_core::hash;

pub fn meta(_ctx: &mut RuntimeContext, args: &[Value]) -> EvalResult {
    expect_arity("meta", args, 1)?;
    Ok(args[0].meta().unwrap_or(Value::Nil))
}

pub fn with_meta(_ctx: &mut RuntimeContext, args: &[Value]) -> EvalResult {
    expect_arity("with-meta", args, 2)?;
    let meta = if args[1].is_nil() {
        None
    } else {
        Some(args[1].clone())
    };
    args[0]
        .with_meta(meta)
        .ok_or_else(|| RuntimeError::type_err("with-meta", "value supporting metadata", &args[0]))
}

/// `(vary-meta obj f & args)` - metadata becomes `(f (meta obj) args...)`.
pub fn vary_meta(ctx: &mut RuntimeContext, args: &[Value]) -> EvalResult {
    expect_min_arity("vary-meta", args, 2)?;
    let current = args[0].meta().unwrap_or(Value::Nil);
    let mut call_args = vec![current];
    call_args.extend_from_slice(&args[2..]);
    let f = args[1].clone();
    let new_meta = ctx.call(&f, &call_args)?;
    with_meta(ctx, &[args[0].clone(), new_meta])
}

/// Type tag as a keyword.
pub fn type_op(_ctx: &mut RuntimeContext, args: &[Value]) -> EvalResult {
    expect_arity("type", args, 1)?;
    Ok(Value::keyword(args[0].type_tag()))
}

/// Structural hash consistent with `=`.
pub fn hash_op(_ctx: &mut RuntimeContext, args: &[Value]) -> EvalResult {
    expect_arity("hash", args, 1)?;
    Ok(Value::Int(hash_value(&args[0]) as i64))
}

pub fn hash_combine_op(_ctx: &mut RuntimeContext, args: &[Value]) -> EvalResult {
    expect_arity("hash-combine", args, 2)?;
    let a = args[0]
        .as_int()
        .ok_or_else(|| RuntimeError::type_err("hash-combine", "integer hash", &args[0]))?;
    let b = args[1]
        .as_int()
        .ok_or_else(|| RuntimeError::type_err("hash-combine", "integer hash", &args[1]))?;
    Ok(Value::Int(hash::hash_combine(a as u64, b as u64) as i64))
}

pub fn hash_ordered_coll(_ctx: &mut RuntimeContext, args: &[Value]) -> EvalResult {
    expect_arity("hash-ordered-coll", args, 1)?;
    let hashes = element_hashes("hash-ordered-coll", &args[0])?;
    Ok(Value::Int(hash::hash_ordered(hashes) as i64))
}

pub fn hash_unordered_coll(_ctx: &mut RuntimeContext, args: &[Value]) -> EvalResult {
    expect_arity("hash-unordered-coll", args, 1)?;
    let hashes = element_hashes("hash-unordered-coll", &args[0])?;
    Ok(Value::Int(hash::hash_unordered(hashes) as i64))
}

fn element_hashes(op: &str, v: &Value) -> Result<Vec<u64>, RuntimeError> {
    match v {
        Value::List(l) => Ok(l.items.iter().map(hash_value).collect()),
        Value::Vector(vec) => Ok(vec.items.iter().map(hash_value).collect()),
        Value::Set(s) => Ok(s.items.iter().map(hash_value).collect()),
        Value::Map(m) => Ok(m
            .entries
            .iter()
            .map(|(k, val)| hash::hash_ordered([hash_value(k), hash_value(val)]))
            .collect()),
        other => Err(RuntimeError::type_err(op, "collection", other)),
    }
}

pub fn mix_collection_hash(_ctx: &mut RuntimeContext, args: &[Value]) -> EvalResult {
    expect_arity("mix-collection-hash", args, 2)?;
    let h = args[0]
        .as_int()
        .ok_or_else(|| RuntimeError::type_err("mix-collection-hash", "integer hash", &args[0]))?;
    let count = args[1]
        .as_int()
        .ok_or_else(|| RuntimeError::type_err("mix-collection-hash", "integer count", &args[1]))?;
    Ok(Value::Int(
        hash::mix_collection_hash(h as u64, count as u64) as i64,
    ))
}

/// `(ex-info msg data)` builds the catchable error map
/// `{:message msg :data data}`.
pub fn ex_info(_ctx: &mut RuntimeContext, args: &[Value]) -> EvalResult {
    expect_arity("ex-info", args, 2)?;
    Ok(Value::map_from_pairs(vec![
        (Value::keyword("message"), args[0].clone()),
        (Value::keyword("data"), args[1].clone()),
    ]))
}

pub fn ex_message(_ctx: &mut RuntimeContext, args: &[Value]) -> EvalResult {
    expect_arity("ex-message", args, 1)?;
    Ok(match &args[0] {
        Value::Map(m) => m
            .entries
            .get(&Value::keyword("message"))
            .cloned()
            .unwrap_or(Value::Nil),
        _ => Value::Nil,
    })
}

pub fn ex_data(_ctx: &mut RuntimeContext, args: &[Value]) -> EvalResult {
    expect_arity("ex-data", args, 1)?;
    Ok(match &args[0] {
        Value::Map(m) => m
            .entries
            .get(&Value::keyword("data"))
            .cloned()
            .unwrap_or(Value::Nil),
        _ => Value::Nil,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_meta_round_trip() {
        let mut ctx = RuntimeContext::new();
        let v = Value::vector_from_vec(vec![Value::Int(1)]);
        assert_eq!(meta(&mut ctx, &[v.clone()]).unwrap(), Value::Nil);

        let m = Value::map_from_pairs(vec![(Value::keyword("tag"), Value::Bool(true))]);
        let tagged = with_meta(&mut ctx, &[v.clone(), m.clone()]).unwrap();
        assert_eq!(meta(&mut ctx, &[tagged.clone()]).unwrap(), m);
        // Metadata does not affect equality
        assert_eq!(tagged, v);

        assert!(with_meta(&mut ctx, &[Value::Int(1), m]).is_err());
    }

    #[test]
    fn test_vary_meta() {
        let mut ctx = RuntimeContext::new();
        let v = Value::vector_from_vec(vec![]);
        let assoc = Value::native_fn("assoc", crate::map_ops::assoc);
        let tagged = vary_meta(
            &mut ctx,
            &[v, assoc, Value::keyword("k"), Value::Int(1)],
        )
        .unwrap();
        assert_eq!(
            meta(&mut ctx, &[tagged]).unwrap(),
            Value::map_from_pairs(vec![(Value::keyword("k"), Value::Int(1))])
        );
    }

    #[test]
    fn test_type_keyword() {
        let mut ctx = RuntimeContext::new();
        assert_eq!(type_op(&mut ctx, &[Value::Int(1)]).unwrap(), Value::keyword("int"));
        assert_eq!(
            type_op(&mut ctx, &[Value::empty_list()]).unwrap(),
            Value::keyword("list")
        );
    }

    #[test]
    fn test_hash_builtin_consistent_with_eq() {
        let mut ctx = RuntimeContext::new();
        let a = Value::vector_from_vec(vec![Value::Int(1), Value::Int(2)]);
        let b = Value::vector_from_vec(vec![Value::Int(1), Value::Int(2)]);
        assert_eq!(hash_op(&mut ctx, &[a]).unwrap(), hash_op(&mut ctx, &[b]).unwrap());
    }

    #[test]
    fn test_ordered_vs_unordered_coll_hash() {
        let mut ctx = RuntimeContext::new();
        let ab = Value::vector_from_vec(vec![Value::Int(1), Value::Int(2)]);
        let ba = Value::vector_from_vec(vec![Value::Int(2), Value::Int(1)]);
        assert_ne!(
            hash_ordered_coll(&mut ctx, &[ab.clone()]).unwrap(),
            hash_ordered_coll(&mut ctx, &[ba.clone()]).unwrap()
        );
        assert_eq!(
            hash_unordered_coll(&mut ctx, &[ab]).unwrap(),
            hash_unordered_coll(&mut ctx, &[ba]).unwrap()
        );
    }

    #[test]
    fn test_ex_info_shape() {
        let mut ctx = RuntimeContext::new();
        let e = ex_info(
            &mut ctx,
            &[Value::string("boom"), Value::map_from_pairs(vec![])],
        )
        .unwrap();
        assert_eq!(ex_message(&mut ctx, &[e.clone()]).unwrap(), Value::string("boom"));
        assert_eq!(ex_data(&mut ctx, &[e]).unwrap(), Value::map_from_pairs(vec![]));
        assert_eq!(ex_message(&mut ctx, &[Value::Int(1)]).unwrap(), Value::Nil);
    }
}
