//! Map operations
//!
//! The associative API over the insertion-ordered persistent map, plus
//! the nested-access helpers (`get-in`, `assoc-in`, `update-in`).
//! `get`/`assoc`/`contains?`/`find` also cover the other associative
//! kinds (vectors by index, sets by membership, strings by position).

use crate::context::RuntimeContext;
use crate::error::{RuntimeError, expect_arity, expect_arity_range, expect_min_arity};
use crate::lazy;
use crate::value::{EvalResult, Value};

/// `(hash-map k v ...)` - pairs in argument order.
pub fn hash_map(_ctx: &mut RuntimeContext, args: &[Value]) -> EvalResult {
    if args.len() % 2 != 0 {
        return Err(RuntimeError::Arity(
            "hash-map: requires an even number of arguments".to_string(),
        ));
    }
    let pairs = args
        .chunks(2)
        .map(|kv| (kv[0].clone(), kv[1].clone()))
        .collect();
    Ok(Value::map_from_pairs(pairs))
}

/// Lookup with optional not-found. Works on maps, vectors, strings,
/// sets, and nil; non-associative values yield the not-found.
pub fn get(_ctx: &mut RuntimeContext, args: &[Value]) -> EvalResult {
    expect_arity_range("get", args, 2, 3)?;
    let not_found = args.get(2).cloned().unwrap_or(Value::Nil);
    Ok(lookup(&args[0], &args[1]).unwrap_or(not_found))
}

/// Shared lookup core; `None` means absent.
pub fn lookup(coll: &Value, key: &Value) -> Option<Value> {
    match coll {
        Value::Map(m) => m.entries.get(key).cloned(),
        Value::Vector(v) => {
            let i = key.as_int()?;
            usize::try_from(i).ok().and_then(|i| v.items.get(i).cloned())
        }
        Value::Str(s) => {
            let i = key.as_int()?;
            usize::try_from(i)
                .ok()
                .and_then(|i| s.chars().nth(i))
                .map(Value::Char)
        }
        Value::Set(s) => {
            if s.items.contains(key) {
                Some(key.clone())
            } else {
                None
            }
        }
        _ => None,
    }
}

/// `(assoc coll k v ...)` on maps and vectors. Vector indices must be
/// in `0..=len`; index `len` appends.
pub fn assoc(_ctx: &mut RuntimeContext, args: &[Value]) -> EvalResult {
    expect_min_arity("assoc", args, 3)?;
    if args[1..].len() % 2 != 0 {
        return Err(RuntimeError::Arity(
            "assoc: requires an even number of key/value arguments".to_string(),
        ));
    }
    let mut coll = args[0].clone();
    for kv in args[1..].chunks(2) {
        coll = assoc_one(&coll, &kv[0], &kv[1])?;
    }
    Ok(coll)
}

pub fn assoc_one(coll: &Value, key: &Value, value: &Value) -> EvalResult {
    match coll {
        Value::Nil => Ok(Value::map_from_pairs(vec![(key.clone(), value.clone())])),
        Value::Map(m) => Ok(Value::map(m.entries.assoc(key.clone(), value.clone()))),
        Value::Vector(v) => {
            let i = key
                .as_int()
                .ok_or_else(|| RuntimeError::type_err("assoc", "integer index", key))?;
            usize::try_from(i)
                .ok()
                .and_then(|i| v.items.set(i, value.clone()))
                .map(Value::vector)
                .ok_or_else(|| {
                    RuntimeError::IndexOutOfBounds(format!(
                        "assoc: index {} for vector of length {}",
                        i,
                        v.items.len()
                    ))
                })
        }
        other => Err(RuntimeError::type_err("assoc", "map or vector", other)),
    }
}

/// `(dissoc m k ...)`.
pub fn dissoc(_ctx: &mut RuntimeContext, args: &[Value]) -> EvalResult {
    expect_min_arity("dissoc", args, 1)?;
    match &args[0] {
        Value::Nil => Ok(Value::Nil),
        Value::Map(m) => {
            let mut entries = m.entries.clone();
            for key in &args[1..] {
                entries = entries.dissoc(key);
            }
            Ok(Value::map(entries))
        }
        other => Err(RuntimeError::type_err("dissoc", "map", other)),
    }
}

/// Membership of a key/index, not of a value.
pub fn contains_p(_ctx: &mut RuntimeContext, args: &[Value]) -> EvalResult {
    expect_arity("contains?", args, 2)?;
    match &args[0] {
        Value::Nil => Ok(Value::Bool(false)),
        Value::Map(m) => Ok(Value::Bool(m.entries.contains_key(&args[1]))),
        Value::Set(s) => Ok(Value::Bool(s.items.contains(&args[1]))),
        Value::Vector(v) => Ok(Value::Bool(
            args[1]
                .as_int()
                .and_then(|i| usize::try_from(i).ok())
                .is_some_and(|i| i < v.items.len()),
        )),
        Value::Str(s) => Ok(Value::Bool(
            args[1]
                .as_int()
                .and_then(|i| usize::try_from(i).ok())
                .is_some_and(|i| i < s.chars().count()),
        )),
        other => Err(RuntimeError::type_err(
            "contains?",
            "associative collection",
            other,
        )),
    }
}

/// `[k v]` entry or nil.
pub fn find(_ctx: &mut RuntimeContext, args: &[Value]) -> EvalResult {
    expect_arity("find", args, 2)?;
    match &args[0] {
        Value::Map(m) => Ok(m
            .entries
            .get(&args[1])
            .map(|v| Value::vector_from_vec(vec![args[1].clone(), v.clone()]))
            .unwrap_or(Value::Nil)),
        Value::Vector(v) => Ok(args[1]
            .as_int()
            .and_then(|i| usize::try_from(i).ok())
            .and_then(|i| v.items.get(i).cloned())
            .map(|item| Value::vector_from_vec(vec![args[1].clone(), item]))
            .unwrap_or(Value::Nil)),
        Value::Nil => Ok(Value::Nil),
        other => Err(RuntimeError::type_err("find", "map or vector", other)),
    }
}

pub fn keys(_ctx: &mut RuntimeContext, args: &[Value]) -> EvalResult {
    expect_arity("keys", args, 1)?;
    match &args[0] {
        Value::Nil => Ok(Value::Nil),
        Value::Map(m) => {
            if m.entries.is_empty() {
                return Ok(Value::Nil);
            }
            Ok(Value::list_from_vec(m.entries.keys()))
        }
        other => Err(RuntimeError::type_err("keys", "map", other)),
    }
}

pub fn vals(_ctx: &mut RuntimeContext, args: &[Value]) -> EvalResult {
    expect_arity("vals", args, 1)?;
    match &args[0] {
        Value::Nil => Ok(Value::Nil),
        Value::Map(m) => {
            if m.entries.is_empty() {
                return Ok(Value::Nil);
            }
            Ok(Value::list_from_vec(m.entries.vals()))
        }
        other => Err(RuntimeError::type_err("vals", "map", other)),
    }
}

/// Nested lookup along a key path.
pub fn get_in(ctx: &mut RuntimeContext, args: &[Value]) -> EvalResult {
    expect_arity_range("get-in", args, 2, 3)?;
    let not_found = args.get(2).cloned().unwrap_or(Value::Nil);
    let path = lazy::realize_all(ctx, &args[1])?;
    let mut cursor = args[0].clone();
    for key in &path {
        match lookup(&cursor, key) {
            Some(next) => cursor = next,
            None => return Ok(not_found),
        }
    }
    Ok(cursor)
}

/// Nested assoc along a key path; absent intermediate levels become
/// maps.
pub fn assoc_in(ctx: &mut RuntimeContext, args: &[Value]) -> EvalResult {
    expect_arity("assoc-in", args, 3)?;
    let path = lazy::realize_all(ctx, &args[1])?;
    if path.is_empty() {
        return Err(RuntimeError::Arity(
            "assoc-in: key path must be non-empty".to_string(),
        ));
    }
    assoc_in_path(&args[0], &path, &args[2])
}

fn assoc_in_path(coll: &Value, path: &[Value], value: &Value) -> EvalResult {
    match path {
        [key] => assoc_one(coll, key, value),
        [key, rest @ ..] => {
            let child = lookup(coll, key).unwrap_or(Value::Nil);
            let new_child = assoc_in_path(&child, rest, value)?;
            assoc_one(coll, key, &new_child)
        }
        [] => unreachable!("assoc-in path checked non-empty"),
    }
}

/// `(update m k f & extra)` - replace the value at `k` with
/// `(f old extra...)`.
pub fn update(ctx: &mut RuntimeContext, args: &[Value]) -> EvalResult {
    expect_min_arity("update", args, 3)?;
    let old = lookup(&args[0], &args[1]).unwrap_or(Value::Nil);
    let mut call_args = vec![old];
    call_args.extend_from_slice(&args[3..]);
    let f = args[2].clone();
    let new = ctx.call(&f, &call_args)?;
    assoc_one(&args[0], &args[1], &new)
}

/// Nested update along a key path.
pub fn update_in(ctx: &mut RuntimeContext, args: &[Value]) -> EvalResult {
    expect_min_arity("update-in", args, 3)?;
    let path = lazy::realize_all(ctx, &args[1])?;
    if path.is_empty() {
        return Err(RuntimeError::Arity(
            "update-in: key path must be non-empty".to_string(),
        ));
    }
    let mut cursor = args[0].clone();
    let mut parents = Vec::with_capacity(path.len());
    for key in &path[..path.len() - 1] {
        parents.push(cursor.clone());
        cursor = lookup(&cursor, key).unwrap_or(Value::Nil);
    }
    let leaf_key = &path[path.len() - 1];
    let old = lookup(&cursor, leaf_key).unwrap_or(Value::Nil);
    let mut call_args = vec![old];
    call_args.extend_from_slice(&args[3..]);
    let f = args[2].clone();
    let new = ctx.call(&f, &call_args)?;
    let mut rebuilt = assoc_one(&cursor, leaf_key, &new)?;
    for (parent, key) in parents.into_iter().zip(path.iter()).rev() {
        rebuilt = assoc_one(&parent, key, &rebuilt)?;
    }
    Ok(rebuilt)
}

/// Left-to-right merge; nils are skipped; all-nil yields nil.
pub fn merge(_ctx: &mut RuntimeContext, args: &[Value]) -> EvalResult {
    let mut acc: Option<Value> = None;
    for arg in args {
        match arg {
            Value::Nil => continue,
            Value::Map(m) => {
                let base = match &acc {
                    None => lace_core::FlatMap::new(),
                    Some(Value::Map(prev)) => prev.entries.clone(),
                    _ => unreachable!("merge accumulator is always a map"),
                };
                let mut merged = base;
                for (k, v) in m.entries.iter() {
                    merged = merged.assoc(k.clone(), v.clone());
                }
                acc = Some(Value::map(merged));
            }
            other => return Err(RuntimeError::type_err("merge", "map", other)),
        }
    }
    Ok(acc.unwrap_or(Value::Nil))
}

/// Merge resolving key conflicts with `(f old new)`.
pub fn merge_with(ctx: &mut RuntimeContext, args: &[Value]) -> EvalResult {
    expect_min_arity("merge-with", args, 1)?;
    let f = args[0].clone();
    let mut acc: Option<lace_core::FlatMap<Value, Value>> = None;
    for arg in &args[1..] {
        match arg {
            Value::Nil => continue,
            Value::Map(m) => {
                let mut merged = acc.take().unwrap_or_default();
                for (k, v) in m.entries.iter() {
                    let new = match merged.get(k) {
                        Some(old) => ctx.call(&f, &[old.clone(), v.clone()])?,
                        None => v.clone(),
                    };
                    merged = merged.assoc(k.clone(), new);
                }
                acc = Some(merged);
            }
            other => return Err(RuntimeError::type_err("merge-with", "map", other)),
        }
    }
    Ok(acc.map(Value::map).unwrap_or(Value::Nil))
}

/// Keep only the named keys (present ones).
pub fn select_keys(ctx: &mut RuntimeContext, args: &[Value]) -> EvalResult {
    expect_arity("select-keys", args, 2)?;
    let keys = lazy::realize_all(ctx, &args[1])?;
    let mut out = lace_core::FlatMap::new();
    for key in &keys {
        if let Some(v) = lookup(&args[0], key) {
            out = out.assoc(key.clone(), v);
        }
    }
    Ok(Value::map(out))
}

/// Rewrite every key with `f`; later collisions win.
pub fn update_keys(ctx: &mut RuntimeContext, args: &[Value]) -> EvalResult {
    expect_arity("update-keys", args, 2)?;
    let m = as_map("update-keys", &args[0])?;
    let f = args[1].clone();
    let mut out = lace_core::FlatMap::new();
    for (k, v) in m {
        let new_key = ctx.call(&f, &[k])?;
        out = out.assoc(new_key, v);
    }
    Ok(Value::map(out))
}

/// Rewrite every value with `f`.
pub fn update_vals(ctx: &mut RuntimeContext, args: &[Value]) -> EvalResult {
    expect_arity("update-vals", args, 2)?;
    let m = as_map("update-vals", &args[0])?;
    let f = args[1].clone();
    let mut out = lace_core::FlatMap::new();
    for (k, v) in m {
        let new_val = ctx.call(&f, &[v])?;
        out = out.assoc(k, new_val);
    }
    Ok(Value::map(out))
}

fn as_map(op: &str, v: &Value) -> Result<Vec<(Value, Value)>, RuntimeError> {
    match v {
        Value::Nil => Ok(Vec::new()),
        Value::Map(m) => Ok(m.entries.iter().cloned().collect()),
        other => Err(RuntimeError::type_err(op, "map", other)),
    }
}

/// Pair up keys and values; stops at the shorter input.
pub fn zipmap(ctx: &mut RuntimeContext, args: &[Value]) -> EvalResult {
    expect_arity("zipmap", args, 2)?;
    let keys = lazy::realize_all(ctx, &args[0])?;
    let vals = lazy::realize_all(ctx, &args[1])?;
    let pairs = keys.into_iter().zip(vals).collect();
    Ok(Value::map_from_pairs(pairs))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kw(s: &str) -> Value {
        Value::keyword(s)
    }

    fn sample_map() -> Value {
        Value::map_from_pairs(vec![(kw("a"), Value::Int(1)), (kw("b"), Value::Int(2))])
    }

    #[test]
    fn test_get_with_not_found() {
        let mut ctx = RuntimeContext::new();
        let m = sample_map();
        assert_eq!(get(&mut ctx, &[m.clone(), kw("a")]).unwrap(), Value::Int(1));
        assert_eq!(get(&mut ctx, &[m.clone(), kw("z")]).unwrap(), Value::Nil);
        assert_eq!(
            get(&mut ctx, &[m, kw("z"), Value::Int(9)]).unwrap(),
            Value::Int(9)
        );
    }

    #[test]
    fn test_get_on_vector_string_set() {
        let mut ctx = RuntimeContext::new();
        let v = Value::vector_from_vec(vec![Value::Int(10), Value::Int(20)]);
        assert_eq!(get(&mut ctx, &[v, Value::Int(1)]).unwrap(), Value::Int(20));

        let s = Value::string("abc");
        assert_eq!(get(&mut ctx, &[s, Value::Int(0)]).unwrap(), Value::Char('a'));

        let set = Value::set_from_vec(vec![Value::Int(3)]);
        assert_eq!(get(&mut ctx, &[set, Value::Int(3)]).unwrap(), Value::Int(3));
    }

    #[test]
    fn test_assoc_leaves_original() {
        let mut ctx = RuntimeContext::new();
        let m = sample_map();
        let n = assoc(&mut ctx, &[m.clone(), kw("c"), Value::Int(3)]).unwrap();
        assert_eq!(get(&mut ctx, &[n, kw("c")]).unwrap(), Value::Int(3));
        assert_eq!(get(&mut ctx, &[m, kw("c")]).unwrap(), Value::Nil);
    }

    #[test]
    fn test_assoc_vector_bounds() {
        let mut ctx = RuntimeContext::new();
        let v = Value::vector_from_vec(vec![Value::Int(1)]);
        // Replacing and appending are fine
        let w = assoc(&mut ctx, &[v.clone(), Value::Int(0), Value::Int(9)]).unwrap();
        assert_eq!(w, Value::vector_from_vec(vec![Value::Int(9)]));
        let x = assoc(&mut ctx, &[v.clone(), Value::Int(1), Value::Int(5)]).unwrap();
        assert_eq!(
            x,
            Value::vector_from_vec(vec![Value::Int(1), Value::Int(5)])
        );
        // Past the end is not
        assert!(matches!(
            assoc(&mut ctx, &[v, Value::Int(2), Value::Int(5)]),
            Err(RuntimeError::IndexOutOfBounds(_))
        ));
    }

    #[test]
    fn test_dissoc() {
        let mut ctx = RuntimeContext::new();
        let m = sample_map();
        let n = dissoc(&mut ctx, &[m.clone(), kw("a")]).unwrap();
        assert_eq!(get(&mut ctx, &[n.clone(), kw("a")]).unwrap(), Value::Nil);
        assert_eq!(get(&mut ctx, &[n, kw("b")]).unwrap(), Value::Int(2));
    }

    #[test]
    fn test_contains_is_about_keys() {
        let mut ctx = RuntimeContext::new();
        let v = Value::vector_from_vec(vec![Value::Int(99)]);
        // Index 0 exists; the value 99 is not an index
        assert_eq!(
            contains_p(&mut ctx, &[v.clone(), Value::Int(0)]).unwrap(),
            Value::Bool(true)
        );
        assert_eq!(
            contains_p(&mut ctx, &[v, Value::Int(99)]).unwrap(),
            Value::Bool(false)
        );
    }

    #[test]
    fn test_find() {
        let mut ctx = RuntimeContext::new();
        let m = sample_map();
        assert_eq!(
            find(&mut ctx, &[m.clone(), kw("a")]).unwrap(),
            Value::vector_from_vec(vec![kw("a"), Value::Int(1)])
        );
        assert_eq!(find(&mut ctx, &[m, kw("z")]).unwrap(), Value::Nil);
    }

    #[test]
    fn test_get_in_nested() {
        let mut ctx = RuntimeContext::new();
        let inner = Value::map_from_pairs(vec![(
            kw("b"),
            Value::vector_from_vec(vec![Value::Int(10), Value::Int(20), Value::Int(30)]),
        )]);
        let outer = Value::map_from_pairs(vec![(kw("a"), inner)]);
        let path = Value::vector_from_vec(vec![kw("a"), kw("b"), Value::Int(2)]);
        assert_eq!(
            get_in(&mut ctx, &[outer, path]).unwrap(),
            Value::Int(30)
        );
    }

    #[test]
    fn test_assoc_in_creates_levels() {
        let mut ctx = RuntimeContext::new();
        let path = Value::vector_from_vec(vec![kw("a"), kw("b")]);
        let m = assoc_in(&mut ctx, &[Value::Nil, path.clone(), Value::Int(5)]).unwrap();
        assert_eq!(get_in(&mut ctx, &[m, path]).unwrap(), Value::Int(5));
    }

    #[test]
    fn test_update_and_update_in() {
        let mut ctx = RuntimeContext::new();
        let plus = Value::native_fn("+", crate::arithmetic::add);
        let m = sample_map();
        let n = update(&mut ctx, &[m, kw("a"), plus.clone(), Value::Int(10)]).unwrap();
        assert_eq!(get(&mut ctx, &[n, kw("a")]).unwrap(), Value::Int(11));

        let nested = Value::map_from_pairs(vec![(
            kw("x"),
            Value::map_from_pairs(vec![(kw("y"), Value::Int(1))]),
        )]);
        let path = Value::vector_from_vec(vec![kw("x"), kw("y")]);
        let updated = update_in(&mut ctx, &[nested, path.clone(), plus, Value::Int(2)]).unwrap();
        assert_eq!(get_in(&mut ctx, &[updated, path]).unwrap(), Value::Int(3));
    }

    #[test]
    fn test_merge_and_merge_with() {
        let mut ctx = RuntimeContext::new();
        let a = Value::map_from_pairs(vec![(kw("x"), Value::Int(1))]);
        let b = Value::map_from_pairs(vec![(kw("x"), Value::Int(2)), (kw("y"), Value::Int(3))]);
        let merged = merge(&mut ctx, &[a.clone(), Value::Nil, b.clone()]).unwrap();
        assert_eq!(get(&mut ctx, &[merged, kw("x")]).unwrap(), Value::Int(2));

        assert_eq!(merge(&mut ctx, &[Value::Nil]).unwrap(), Value::Nil);

        let plus = Value::native_fn("+", crate::arithmetic::add);
        let combined = merge_with(&mut ctx, &[plus, a, b]).unwrap();
        assert_eq!(get(&mut ctx, &[combined, kw("x")]).unwrap(), Value::Int(3));
    }

    #[test]
    fn test_select_keys_and_zipmap() {
        let mut ctx = RuntimeContext::new();
        let m = sample_map();
        let selected = select_keys(
            &mut ctx,
            &[m, Value::vector_from_vec(vec![kw("a"), kw("zzz")])],
        )
        .unwrap();
        assert_eq!(selected, Value::map_from_pairs(vec![(kw("a"), Value::Int(1))]));

        let zipped = zipmap(
            &mut ctx,
            &[
                Value::vector_from_vec(vec![kw("a"), kw("b")]),
                Value::vector_from_vec(vec![Value::Int(1), Value::Int(2), Value::Int(3)]),
            ],
        )
        .unwrap();
        assert_eq!(zipped, sample_map());
    }

    #[test]
    fn test_update_keys_vals() {
        let mut ctx = RuntimeContext::new();
        let m = sample_map();
        let inc = Value::native_fn("inc", crate::arithmetic::inc);
        let bumped = update_vals(&mut ctx, &[m.clone(), inc]).unwrap();
        assert_eq!(get(&mut ctx, &[bumped, kw("a")]).unwrap(), Value::Int(2));

        let name_of = Value::native_fn("name-of", |_, args| {
            Ok(Value::string(args[0].as_ident().unwrap().name.clone()))
        });
        let renamed = update_keys(&mut ctx, &[m, name_of]).unwrap();
        assert_eq!(
            get(&mut ctx, &[renamed, Value::string("a")]).unwrap(),
            Value::Int(1)
        );
    }
}
