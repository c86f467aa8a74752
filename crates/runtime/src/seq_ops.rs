//! Sequence API and higher-order operators
//!
//! The lazy family (`map`, `filter`, `take`, `drop`, the generators)
//! builds cells from the lazy engine and never realizes more than it
//! must. The eager family (`sort`, `group-by`, `partition`, ...)
//! requires finite input by contract. Every user function is invoked
//! through the context's call dispatch.

use crate::context::RuntimeContext;
use crate::error::{RuntimeError, expect_arity, expect_arity_range, expect_min_arity};
use crate::lazy::{self, LazySeqCell, TransformKind};
use crate::value::{CompFnVal, EvalResult, PartialFnVal, Value};
use std::rc::Rc;

/// nil for an empty collection, else a seq view: lists and lazy seqs
/// pass through, other collections become element lists (maps as
/// `[k v]` vectors, strings as one-character strings).
pub fn seq(ctx: &mut RuntimeContext, args: &[Value]) -> EvalResult {
    expect_arity("seq", args, 1)?;
    if lazy::seq_empty(ctx, &args[0])? {
        return Ok(Value::Nil);
    }
    match &args[0] {
        Value::List(_) | Value::LazySeq(_) => Ok(args[0].clone()),
        other => Ok(Value::list_from_vec(lazy::realize_all(ctx, other)?)),
    }
}

pub fn first(ctx: &mut RuntimeContext, args: &[Value]) -> EvalResult {
    expect_arity("first", args, 1)?;
    lazy::seq_first(ctx, &args[0])
}

pub fn rest(ctx: &mut RuntimeContext, args: &[Value]) -> EvalResult {
    expect_arity("rest", args, 1)?;
    lazy::seq_rest(ctx, &args[0])
}

/// Like `rest` but nil when the remainder is empty.
pub fn next_op(ctx: &mut RuntimeContext, args: &[Value]) -> EvalResult {
    expect_arity("next", args, 1)?;
    let r = lazy::seq_rest(ctx, &args[0])?;
    if lazy::seq_empty(ctx, &r)? {
        Ok(Value::Nil)
    } else {
        Ok(r)
    }
}

pub fn second(ctx: &mut RuntimeContext, args: &[Value]) -> EvalResult {
    expect_arity("second", args, 1)?;
    let r = lazy::seq_rest(ctx, &args[0])?;
    lazy::seq_first(ctx, &r)
}

/// First of the first.
pub fn ffirst(ctx: &mut RuntimeContext, args: &[Value]) -> EvalResult {
    expect_arity("ffirst", args, 1)?;
    let head = lazy::seq_first(ctx, &args[0])?;
    lazy::seq_first(ctx, &head)
}

/// `rest` applied `n` times; one step per application, so infinite
/// sources are fine.
pub fn nthrest(ctx: &mut RuntimeContext, args: &[Value]) -> EvalResult {
    expect_arity("nthrest", args, 2)?;
    let n = args[1]
        .as_int()
        .ok_or_else(|| RuntimeError::type_err("nthrest", "integer count", &args[1]))?;
    let mut cursor = args[0].clone();
    for _ in 0..n {
        if lazy::seq_empty(ctx, &cursor)? {
            break;
        }
        cursor = lazy::seq_rest(ctx, &cursor)?;
    }
    Ok(cursor)
}

/// Like `nthrest` but nil when exhausted.
pub fn nthnext(ctx: &mut RuntimeContext, args: &[Value]) -> EvalResult {
    expect_arity("nthnext", args, 2)?;
    let r = nthrest(ctx, args)?;
    if lazy::seq_empty(ctx, &r)? {
        Ok(Value::Nil)
    } else {
        Ok(r)
    }
}

pub fn last(ctx: &mut RuntimeContext, args: &[Value]) -> EvalResult {
    expect_arity("last", args, 1)?;
    Ok(lazy::realize_all(ctx, &args[0])?
        .pop()
        .unwrap_or(Value::Nil))
}

pub fn butlast(ctx: &mut RuntimeContext, args: &[Value]) -> EvalResult {
    expect_arity("butlast", args, 1)?;
    let mut items = lazy::realize_all(ctx, &args[0])?;
    if items.len() <= 1 {
        return Ok(Value::Nil);
    }
    items.pop();
    Ok(Value::list_from_vec(items))
}

pub fn count(ctx: &mut RuntimeContext, args: &[Value]) -> EvalResult {
    expect_arity("count", args, 1)?;
    match &args[0] {
        Value::Nil => Ok(Value::Int(0)),
        Value::List(l) => Ok(Value::Int(l.items.len() as i64)),
        Value::Vector(v) => Ok(Value::Int(v.items.len() as i64)),
        Value::Map(m) => Ok(Value::Int(m.entries.len() as i64)),
        Value::Set(s) => Ok(Value::Int(s.items.len() as i64)),
        Value::Str(s) => Ok(Value::Int(s.chars().count() as i64)),
        ls @ Value::LazySeq(_) => Ok(Value::Int(lazy::realize_all(ctx, ls)?.len() as i64)),
        other => Err(RuntimeError::type_err("count", "countable", other)),
    }
}

pub fn empty_p(ctx: &mut RuntimeContext, args: &[Value]) -> EvalResult {
    expect_arity("empty?", args, 1)?;
    Ok(Value::Bool(lazy::seq_empty(ctx, &args[0])?))
}

/// The collection itself, or nil when empty.
pub fn not_empty(ctx: &mut RuntimeContext, args: &[Value]) -> EvalResult {
    expect_arity("not-empty", args, 1)?;
    if lazy::seq_empty(ctx, &args[0])? {
        Ok(Value::Nil)
    } else {
        Ok(args[0].clone())
    }
}

/// Empty collection of the same kind; nil for non-collections.
pub fn empty(_ctx: &mut RuntimeContext, args: &[Value]) -> EvalResult {
    expect_arity("empty", args, 1)?;
    Ok(match &args[0] {
        Value::List(_) | Value::LazySeq(_) => Value::empty_list(),
        Value::Vector(_) => Value::vector_from_vec(vec![]),
        Value::Map(_) => Value::map_from_pairs(vec![]),
        Value::Set(_) => Value::set_from_vec(vec![]),
        _ => Value::Nil,
    })
}

pub fn reverse(ctx: &mut RuntimeContext, args: &[Value]) -> EvalResult {
    expect_arity("reverse", args, 1)?;
    let mut items = lazy::realize_all(ctx, &args[0])?;
    items.reverse();
    Ok(Value::list_from_vec(items))
}

// Generators

/// `(range)` is the infinite naturals; bounded forms are eager.
pub fn range(_ctx: &mut RuntimeContext, args: &[Value]) -> EvalResult {
    expect_arity_range("range", args, 0, 3)?;
    if args.is_empty() {
        return Ok(LazySeqCell::range_from(0, 1));
    }
    let all_int = args.iter().all(|v| matches!(v, Value::Int(_)));
    let (start, end, step) = match args.len() {
        1 => (Value::Int(0), args[0].clone(), Value::Int(1)),
        2 => (args[0].clone(), args[1].clone(), Value::Int(1)),
        _ => (args[0].clone(), args[1].clone(), args[2].clone()),
    };
    let as_f = |v: &Value| -> Result<f64, RuntimeError> {
        match v {
            Value::Int(n) => Ok(*n as f64),
            Value::Float(f) => Ok(*f),
            other => Err(RuntimeError::type_err("range", "number", other)),
        }
    };
    let (start_f, end_f, step_f) = (as_f(&start)?, as_f(&end)?, as_f(&step)?);
    if step_f == 0.0 {
        // Zero step repeats the start forever (or not at all)
        return Ok(if start_f < end_f {
            LazySeqCell::repeat(start.clone())
        } else {
            Value::empty_list()
        });
    }
    let mut items = Vec::new();
    if all_int {
        let (mut cur, end_i, step_i) = (
            start.as_int().expect("checked int"),
            end.as_int().expect("checked int"),
            step.as_int().expect("checked int"),
        );
        while (step_i > 0 && cur < end_i) || (step_i < 0 && cur > end_i) {
            items.push(Value::Int(cur));
            cur += step_i;
        }
    } else {
        let mut cur = start_f;
        while (step_f > 0.0 && cur < end_f) || (step_f < 0.0 && cur > end_f) {
            items.push(Value::Float(cur));
            cur += step_f;
        }
    }
    Ok(Value::list_from_vec(items))
}

/// `(repeat x)` is infinite; `(repeat n x)` is an eager list.
pub fn repeat(_ctx: &mut RuntimeContext, args: &[Value]) -> EvalResult {
    expect_arity_range("repeat", args, 1, 2)?;
    match args {
        [x] => Ok(LazySeqCell::repeat(x.clone())),
        [n, x] => {
            let n = n
                .as_int()
                .ok_or_else(|| RuntimeError::type_err("repeat", "integer count", n))?
                .max(0);
            Ok(Value::list_from_vec(vec![x.clone(); n as usize]))
        }
        _ => unreachable!("arity checked"),
    }
}

fn repeatedly_value(f: Value) -> Value {
    LazySeqCell::thunk(Value::native_fn("repeatedly*", move |ctx, _| {
        let head = ctx.call(&f, &[])?;
        Ok(LazySeqCell::cons(head, repeatedly_value(f.clone())))
    }))
}

/// `(repeatedly f)` is infinite; `(repeatedly n f)` calls eagerly.
pub fn repeatedly(ctx: &mut RuntimeContext, args: &[Value]) -> EvalResult {
    expect_arity_range("repeatedly", args, 1, 2)?;
    match args {
        [f] => Ok(repeatedly_value(f.clone())),
        [n, f] => {
            let n = n
                .as_int()
                .ok_or_else(|| RuntimeError::type_err("repeatedly", "integer count", n))?
                .max(0);
            let mut items = Vec::with_capacity(n as usize);
            for _ in 0..n {
                items.push(ctx.call(f, &[])?);
            }
            Ok(Value::list_from_vec(items))
        }
        _ => unreachable!("arity checked"),
    }
}

pub fn iterate(_ctx: &mut RuntimeContext, args: &[Value]) -> EvalResult {
    expect_arity("iterate", args, 2)?;
    Ok(LazySeqCell::iterate(args[0].clone(), args[1].clone()))
}

pub fn cycle(ctx: &mut RuntimeContext, args: &[Value]) -> EvalResult {
    expect_arity("cycle", args, 1)?;
    Ok(LazySeqCell::cycle(lazy::realize_all(ctx, &args[0])?))
}

// Lazy slicing

pub fn take(_ctx: &mut RuntimeContext, args: &[Value]) -> EvalResult {
    expect_arity("take", args, 2)?;
    let n = args[0]
        .as_int()
        .ok_or_else(|| RuntimeError::type_err("take", "integer count", &args[0]))?;
    Ok(LazySeqCell::take(args[1].clone(), n))
}

pub fn take_while(_ctx: &mut RuntimeContext, args: &[Value]) -> EvalResult {
    expect_arity("take-while", args, 2)?;
    Ok(LazySeqCell::transform(
        TransformKind::TakeWhile,
        args[0].clone(),
        args[1].clone(),
    ))
}

pub fn take_last(ctx: &mut RuntimeContext, args: &[Value]) -> EvalResult {
    expect_arity("take-last", args, 2)?;
    let n = args[0]
        .as_int()
        .ok_or_else(|| RuntimeError::type_err("take-last", "integer count", &args[0]))?
        .max(0) as usize;
    let items = lazy::realize_all(ctx, &args[1])?;
    if n == 0 || items.is_empty() {
        return Ok(Value::Nil);
    }
    let start = items.len().saturating_sub(n);
    Ok(Value::list_from_vec(items[start..].to_vec()))
}

pub fn take_nth(ctx: &mut RuntimeContext, args: &[Value]) -> EvalResult {
    expect_arity("take-nth", args, 2)?;
    let n = args[0]
        .as_int()
        .ok_or_else(|| RuntimeError::type_err("take-nth", "integer step", &args[0]))?;
    if n <= 0 {
        return Err(RuntimeError::IllegalState(
            "take-nth: step must be positive".to_string(),
        ));
    }
    let items = lazy::realize_all(ctx, &args[1])?;
    Ok(Value::list_from_vec(
        items.into_iter().step_by(n as usize).collect(),
    ))
}

/// Lazy drop: the skipping happens on first observation, one step per
/// skipped element, so infinite sources are fine.
pub fn drop(_ctx: &mut RuntimeContext, args: &[Value]) -> EvalResult {
    expect_arity("drop", args, 2)?;
    let n = args[0]
        .as_int()
        .ok_or_else(|| RuntimeError::type_err("drop", "integer count", &args[0]))?;
    let source = args[1].clone();
    Ok(LazySeqCell::thunk(Value::native_fn(
        "drop*",
        move |ctx, _| {
            let mut cursor = source.clone();
            for _ in 0..n {
                if lazy::seq_empty(ctx, &cursor)? {
                    break;
                }
                cursor = lazy::seq_rest(ctx, &cursor)?;
            }
            Ok(cursor)
        },
    )))
}

pub fn drop_while(_ctx: &mut RuntimeContext, args: &[Value]) -> EvalResult {
    expect_arity("drop-while", args, 2)?;
    Ok(LazySeqCell::transform(
        TransformKind::DropWhile,
        args[0].clone(),
        args[1].clone(),
    ))
}

pub fn drop_last(ctx: &mut RuntimeContext, args: &[Value]) -> EvalResult {
    expect_arity_range("drop-last", args, 1, 2)?;
    let (n, coll) = match args {
        [coll] => (1, coll),
        [n, coll] => (
            n.as_int()
                .ok_or_else(|| RuntimeError::type_err("drop-last", "integer count", n))?
                .max(0),
            coll,
        ),
        _ => unreachable!("arity checked"),
    };
    let items = lazy::realize_all(ctx, coll)?;
    let keep = items.len().saturating_sub(n as usize);
    Ok(Value::list_from_vec(items[..keep].to_vec()))
}

// Lazy transforms

/// Single-collection map is lazy; the zip arity over several
/// collections realizes them (finite by contract).
pub fn map_op(ctx: &mut RuntimeContext, args: &[Value]) -> EvalResult {
    expect_min_arity("map", args, 2)?;
    if args.len() == 2 {
        return Ok(LazySeqCell::transform(
            TransformKind::Map,
            args[0].clone(),
            args[1].clone(),
        ));
    }
    let f = args[0].clone();
    let colls: Vec<Vec<Value>> = args[1..]
        .iter()
        .map(|c| lazy::realize_all(ctx, c))
        .collect::<Result<_, _>>()?;
    let shortest = colls.iter().map(Vec::len).min().unwrap_or(0);
    let mut out = Vec::with_capacity(shortest);
    for i in 0..shortest {
        let row: Vec<Value> = colls.iter().map(|c| c[i].clone()).collect();
        out.push(ctx.call(&f, &row)?);
    }
    Ok(Value::list_from_vec(out))
}

pub fn map_indexed(_ctx: &mut RuntimeContext, args: &[Value]) -> EvalResult {
    expect_arity("map-indexed", args, 2)?;
    Ok(LazySeqCell::transform(
        TransformKind::MapIndexed,
        args[0].clone(),
        args[1].clone(),
    ))
}

pub fn mapcat(ctx: &mut RuntimeContext, args: &[Value]) -> EvalResult {
    expect_min_arity("mapcat", args, 2)?;
    if args.len() == 2 {
        return Ok(LazySeqCell::transform(
            TransformKind::Mapcat,
            args[0].clone(),
            args[1].clone(),
        ));
    }
    let mapped = map_op(ctx, args)?;
    let subs = lazy::realize_all(ctx, &mapped)?;
    Ok(LazySeqCell::concat(subs))
}

pub fn filter_op(_ctx: &mut RuntimeContext, args: &[Value]) -> EvalResult {
    expect_arity("filter", args, 2)?;
    Ok(LazySeqCell::transform(
        TransformKind::Filter,
        args[0].clone(),
        args[1].clone(),
    ))
}

pub fn remove_op(ctx: &mut RuntimeContext, args: &[Value]) -> EvalResult {
    expect_arity("remove", args, 2)?;
    let negated = complement(ctx, &args[..1])?;
    Ok(LazySeqCell::transform(
        TransformKind::Filter,
        negated,
        args[1].clone(),
    ))
}

/// Lazy `keep`: map then drop the nils.
pub fn keep(_ctx: &mut RuntimeContext, args: &[Value]) -> EvalResult {
    expect_arity("keep", args, 2)?;
    let mapped = LazySeqCell::transform(TransformKind::Map, args[0].clone(), args[1].clone());
    let not_nil = Value::native_fn("some?", |_, args| Ok(Value::Bool(!args[0].is_nil())));
    Ok(LazySeqCell::transform(TransformKind::Filter, not_nil, mapped))
}

pub fn keep_indexed(_ctx: &mut RuntimeContext, args: &[Value]) -> EvalResult {
    expect_arity("keep-indexed", args, 2)?;
    let mapped =
        LazySeqCell::transform(TransformKind::MapIndexed, args[0].clone(), args[1].clone());
    let not_nil = Value::native_fn("some?", |_, args| Ok(Value::Bool(!args[0].is_nil())));
    Ok(LazySeqCell::transform(TransformKind::Filter, not_nil, mapped))
}

pub fn concat(_ctx: &mut RuntimeContext, args: &[Value]) -> EvalResult {
    Ok(LazySeqCell::concat(args.to_vec()))
}

/// Eager `map` into a vector.
pub fn mapv(ctx: &mut RuntimeContext, args: &[Value]) -> EvalResult {
    expect_min_arity("mapv", args, 2)?;
    let mapped = map_op(ctx, args)?;
    Ok(Value::vector_from_vec(lazy::realize_all(ctx, &mapped)?))
}

/// Eager `filter` into a vector.
pub fn filterv(ctx: &mut RuntimeContext, args: &[Value]) -> EvalResult {
    expect_arity("filterv", args, 2)?;
    let filtered = filter_op(ctx, args)?;
    Ok(Value::vector_from_vec(lazy::realize_all(ctx, &filtered)?))
}

/// `(list* a b seq)` conses the leading arguments onto the final
/// sequence argument.
pub fn list_star(ctx: &mut RuntimeContext, args: &[Value]) -> EvalResult {
    expect_min_arity("list*", args, 1)?;
    let mut tail = args[args.len() - 1].clone();
    for x in args[..args.len() - 1].iter().rev() {
        tail = crate::list_ops::cons(ctx, &[x.clone(), tail])?;
    }
    Ok(tail)
}

// Reduction

fn unwrap_reduced(v: Value) -> (Value, bool) {
    match v {
        Value::Reduced(inner) => ((*inner).clone(), true),
        other => (other, false),
    }
}

/// `(reduce f coll)` / `(reduce f init coll)`. The two-argument form
/// on an empty collection calls `(f)`; a `reduced` accumulator stops
/// the fold.
pub fn reduce(ctx: &mut RuntimeContext, args: &[Value]) -> EvalResult {
    expect_arity_range("reduce", args, 2, 3)?;
    let f = args[0].clone();
    let (mut acc, coll) = match args {
        [_, coll] => {
            if lazy::seq_empty(ctx, coll)? {
                return ctx.call(&f, &[]);
            }
            let head = lazy::seq_first(ctx, coll)?;
            (head, lazy::seq_rest(ctx, coll)?)
        }
        [_, init, coll] => (init.clone(), coll.clone()),
        _ => unreachable!("arity checked"),
    };
    let mut cursor = coll;
    while !lazy::seq_empty(ctx, &cursor)? {
        let item = lazy::seq_first(ctx, &cursor)?;
        let (next, stop) = unwrap_reduced(ctx.call(&f, &[acc, item])?);
        acc = next;
        if stop {
            return Ok(acc);
        }
        cursor = lazy::seq_rest(ctx, &cursor)?;
    }
    Ok(acc)
}

/// Fold over map entries (or vector index/value pairs) with
/// `(f acc k v)`.
pub fn reduce_kv(ctx: &mut RuntimeContext, args: &[Value]) -> EvalResult {
    expect_arity("reduce-kv", args, 3)?;
    let f = args[0].clone();
    let mut acc = args[1].clone();
    let pairs: Vec<(Value, Value)> = match &args[2] {
        Value::Nil => Vec::new(),
        Value::Map(m) => m.entries.iter().cloned().collect(),
        Value::Vector(v) => v
            .items
            .iter()
            .enumerate()
            .map(|(i, item)| (Value::Int(i as i64), item.clone()))
            .collect(),
        other => return Err(RuntimeError::type_err("reduce-kv", "map or vector", other)),
    };
    for (k, v) in pairs {
        let (next, stop) = unwrap_reduced(ctx.call(&f, &[acc, k, v])?);
        acc = next;
        if stop {
            break;
        }
    }
    Ok(acc)
}

/// Intermediate accumulators of a reduce, including the seed.
pub fn reductions(ctx: &mut RuntimeContext, args: &[Value]) -> EvalResult {
    expect_arity_range("reductions", args, 2, 3)?;
    let f = args[0].clone();
    let (mut acc, coll) = match args {
        [_, coll] => {
            if lazy::seq_empty(ctx, coll)? {
                let seed = ctx.call(&f, &[])?;
                return Ok(Value::list_from_vec(vec![seed]));
            }
            (lazy::seq_first(ctx, coll)?, lazy::seq_rest(ctx, coll)?)
        }
        [_, init, coll] => (init.clone(), coll.clone()),
        _ => unreachable!("arity checked"),
    };
    let mut out = vec![acc.clone()];
    let mut cursor = coll;
    while !lazy::seq_empty(ctx, &cursor)? {
        let item = lazy::seq_first(ctx, &cursor)?;
        let (next, stop) = unwrap_reduced(ctx.call(&f, &[acc, item])?);
        acc = next;
        out.push(acc.clone());
        if stop {
            break;
        }
        cursor = lazy::seq_rest(ctx, &cursor)?;
    }
    Ok(Value::list_from_vec(out))
}

// Function builders

/// Intermediate args are prepended literally; the final argument is a
/// sequence that is spliced.
pub fn apply(ctx: &mut RuntimeContext, args: &[Value]) -> EvalResult {
    expect_min_arity("apply", args, 2)?;
    let f = args[0].clone();
    let mut call_args: Vec<Value> = args[1..args.len() - 1].to_vec();
    call_args.extend(lazy::realize_all(ctx, &args[args.len() - 1])?);
    ctx.call(&f, &call_args)
}

pub fn partial(_ctx: &mut RuntimeContext, args: &[Value]) -> EvalResult {
    expect_min_arity("partial", args, 1)?;
    Ok(Value::PartialFn(Rc::new(PartialFnVal {
        f: args[0].clone(),
        prefix: args[1..].to_vec(),
    })))
}

pub fn comp(_ctx: &mut RuntimeContext, args: &[Value]) -> EvalResult {
    Ok(Value::CompFn(Rc::new(CompFnVal {
        fns: args.to_vec(),
    })))
}

pub fn constantly(_ctx: &mut RuntimeContext, args: &[Value]) -> EvalResult {
    expect_arity("constantly", args, 1)?;
    let v = args[0].clone();
    Ok(Value::native_fn("constantly*", move |_, _| Ok(v.clone())))
}

pub fn identity(_ctx: &mut RuntimeContext, args: &[Value]) -> EvalResult {
    expect_arity("identity", args, 1)?;
    Ok(args[0].clone())
}

pub fn complement(_ctx: &mut RuntimeContext, args: &[Value]) -> EvalResult {
    expect_arity("complement", args, 1)?;
    let f = args[0].clone();
    Ok(Value::native_fn("complement*", move |ctx, call_args| {
        let r = ctx.call(&f, call_args)?;
        Ok(Value::Bool(!r.is_truthy()))
    }))
}

/// Patch nil arguments (up to three) with defaults before calling.
pub fn fnil(_ctx: &mut RuntimeContext, args: &[Value]) -> EvalResult {
    expect_arity_range("fnil", args, 2, 4)?;
    let f = args[0].clone();
    let defaults = args[1..].to_vec();
    Ok(Value::native_fn("fnil*", move |ctx, call_args| {
        let mut patched = call_args.to_vec();
        for (i, default) in defaults.iter().enumerate() {
            if let Some(slot) = patched.get_mut(i) {
                if slot.is_nil() {
                    *slot = default.clone();
                }
            }
        }
        ctx.call(&f, &patched)
    }))
}

/// `((juxt f g) x)` is `[(f x) (g x)]`.
pub fn juxt(_ctx: &mut RuntimeContext, args: &[Value]) -> EvalResult {
    expect_min_arity("juxt", args, 1)?;
    let fns = args.to_vec();
    Ok(Value::native_fn("juxt*", move |ctx, call_args| {
        let mut out = Vec::with_capacity(fns.len());
        for f in &fns {
            out.push(ctx.call(f, call_args)?);
        }
        Ok(Value::vector_from_vec(out))
    }))
}

fn key_number(ctx: &mut RuntimeContext, op: &str, k: &Value, x: &Value) -> Result<f64, RuntimeError> {
    match ctx.call(k, &[x.clone()])? {
        Value::Int(n) => Ok(n as f64),
        Value::Float(f) => Ok(f),
        other => Err(RuntimeError::type_err(op, "number from key fn", &other)),
    }
}

/// `(min-key k x & more)` - the argument with the smallest `(k x)`;
/// later arguments win ties.
pub fn min_key(ctx: &mut RuntimeContext, args: &[Value]) -> EvalResult {
    expect_min_arity("min-key", args, 2)?;
    let k = args[0].clone();
    let mut best = args[1].clone();
    let mut best_key = key_number(ctx, "min-key", &k, &best)?;
    for x in &args[2..] {
        let key = key_number(ctx, "min-key", &k, x)?;
        if key <= best_key {
            best = x.clone();
            best_key = key;
        }
    }
    Ok(best)
}

/// `(max-key k x & more)` - the argument with the largest `(k x)`.
pub fn max_key(ctx: &mut RuntimeContext, args: &[Value]) -> EvalResult {
    expect_min_arity("max-key", args, 2)?;
    let k = args[0].clone();
    let mut best = args[1].clone();
    let mut best_key = key_number(ctx, "max-key", &k, &best)?;
    for x in &args[2..] {
        let key = key_number(ctx, "max-key", &k, x)?;
        if key >= best_key {
            best = x.clone();
            best_key = key;
        }
    }
    Ok(best)
}

/// Composite predicate: true iff every predicate holds for every
/// argument.
pub fn every_pred(_ctx: &mut RuntimeContext, args: &[Value]) -> EvalResult {
    expect_min_arity("every-pred", args, 1)?;
    let preds = args.to_vec();
    Ok(Value::native_fn("every-pred*", move |ctx, call_args| {
        for pred in &preds {
            for arg in call_args {
                if !ctx.call(pred, &[arg.clone()])?.is_truthy() {
                    return Ok(Value::Bool(false));
                }
            }
        }
        Ok(Value::Bool(true))
    }))
}

/// Composite probe: the first truthy predicate result over the
/// arguments, else nil.
pub fn some_fn(_ctx: &mut RuntimeContext, args: &[Value]) -> EvalResult {
    expect_min_arity("some-fn", args, 1)?;
    let preds = args.to_vec();
    Ok(Value::native_fn("some-fn*", move |ctx, call_args| {
        for arg in call_args {
            for pred in &preds {
                let r = ctx.call(pred, &[arg.clone()])?;
                if r.is_truthy() {
                    return Ok(r);
                }
            }
        }
        Ok(Value::Nil)
    }))
}

/// Keep calling while the result is a function; unwinds mutual
/// recursion without stack growth.
pub fn trampoline(ctx: &mut RuntimeContext, args: &[Value]) -> EvalResult {
    expect_min_arity("trampoline", args, 1)?;
    let mut result = ctx.call(&args[0], &args[1..])?;
    loop {
        match result {
            Value::Fn(_) | Value::PartialFn(_) | Value::CompFn(_) => {
                result = ctx.call(&result.clone(), &[])?;
            }
            done => return Ok(done),
        }
    }
}

// Quantifiers

pub fn every_p(ctx: &mut RuntimeContext, args: &[Value]) -> EvalResult {
    expect_arity("every?", args, 2)?;
    let f = args[0].clone();
    let mut cursor = args[1].clone();
    while !lazy::seq_empty(ctx, &cursor)? {
        let item = lazy::seq_first(ctx, &cursor)?;
        if !ctx.call(&f, &[item])?.is_truthy() {
            return Ok(Value::Bool(false));
        }
        cursor = lazy::seq_rest(ctx, &cursor)?;
    }
    Ok(Value::Bool(true))
}

pub fn not_every_p(ctx: &mut RuntimeContext, args: &[Value]) -> EvalResult {
    expect_arity("not-every?", args, 2)?;
    let all = every_p(ctx, args)?;
    Ok(Value::Bool(!all.is_truthy()))
}

/// First truthy predicate result, or nil.
pub fn some(ctx: &mut RuntimeContext, args: &[Value]) -> EvalResult {
    expect_arity("some", args, 2)?;
    let f = args[0].clone();
    let mut cursor = args[1].clone();
    while !lazy::seq_empty(ctx, &cursor)? {
        let item = lazy::seq_first(ctx, &cursor)?;
        let r = ctx.call(&f, &[item])?;
        if r.is_truthy() {
            return Ok(r);
        }
        cursor = lazy::seq_rest(ctx, &cursor)?;
    }
    Ok(Value::Nil)
}

pub fn not_any_p(ctx: &mut RuntimeContext, args: &[Value]) -> EvalResult {
    expect_arity("not-any?", args, 2)?;
    let found = some(ctx, args)?;
    Ok(Value::Bool(!found.is_truthy()))
}

// Ordering and grouping (eager; finite by contract)

fn try_sort(
    items: &mut [Value],
    mut cmp: impl FnMut(&Value, &Value) -> Result<std::cmp::Ordering, RuntimeError>,
) -> Result<(), RuntimeError> {
    // sort_by cannot propagate errors, so park the first one outside
    let mut failure: Option<RuntimeError> = None;
    items.sort_by(|a, b| {
        if failure.is_some() {
            return std::cmp::Ordering::Equal;
        }
        match cmp(a, b) {
            Ok(ord) => ord,
            Err(e) => {
                failure = Some(e);
                std::cmp::Ordering::Equal
            }
        }
    });
    match failure {
        Some(e) => Err(e),
        None => Ok(()),
    }
}

fn comparator(ctx: &mut RuntimeContext, f: &Value, a: &Value, b: &Value) -> Result<std::cmp::Ordering, RuntimeError> {
    let r = ctx.call(f, &[a.clone(), b.clone()])?;
    Ok(match r {
        Value::Int(n) => n.cmp(&0),
        // Boolean comparators: true means a comes first
        Value::Bool(true) => std::cmp::Ordering::Less,
        Value::Bool(false) | Value::Nil => std::cmp::Ordering::Greater,
        other => {
            return Err(RuntimeError::type_err(
                "sort",
                "integer or boolean from comparator",
                &other,
            ));
        }
    })
}

/// `(sort coll)` by natural order, `(sort cmp coll)` by comparator.
pub fn sort(ctx: &mut RuntimeContext, args: &[Value]) -> EvalResult {
    expect_arity_range("sort", args, 1, 2)?;
    match args {
        [coll] => {
            let mut items = lazy::realize_all(ctx, coll)?;
            try_sort(&mut items, crate::arithmetic::compare_values)?;
            Ok(Value::list_from_vec(items))
        }
        [cmp, coll] => {
            let mut items = lazy::realize_all(ctx, coll)?;
            let cmp = cmp.clone();
            try_sort(&mut items, |a, b| comparator(ctx, &cmp, a, b))?;
            Ok(Value::list_from_vec(items))
        }
        _ => unreachable!("arity checked"),
    }
}

/// `(sort-by keyfn coll)` / `(sort-by keyfn cmp coll)`.
pub fn sort_by(ctx: &mut RuntimeContext, args: &[Value]) -> EvalResult {
    expect_arity_range("sort-by", args, 2, 3)?;
    let keyfn = args[0].clone();
    let (cmp, coll) = match args {
        [_, coll] => (None, coll),
        [_, cmp, coll] => (Some(cmp.clone()), coll),
        _ => unreachable!("arity checked"),
    };
    let items = lazy::realize_all(ctx, coll)?;
    let mut keyed: Vec<(Value, Value)> = Vec::with_capacity(items.len());
    for item in items {
        let key = ctx.call(&keyfn, &[item.clone()])?;
        keyed.push((key, item));
    }
    match cmp {
        None => try_sort_pairs(&mut keyed, |a, b| {
            crate::arithmetic::compare_values(a, b)
        })?,
        Some(cmp) => try_sort_pairs(&mut keyed, |a, b| comparator(ctx, &cmp, a, b))?,
    }
    Ok(Value::list_from_vec(
        keyed.into_iter().map(|(_, item)| item).collect(),
    ))
}

/// Sort key/item pairs by key with a fallible comparison.
fn try_sort_pairs(
    pairs: &mut [(Value, Value)],
    mut cmp: impl FnMut(&Value, &Value) -> Result<std::cmp::Ordering, RuntimeError>,
) -> Result<(), RuntimeError> {
    let mut failure: Option<RuntimeError> = None;
    pairs.sort_by(|a, b| {
        if failure.is_some() {
            return std::cmp::Ordering::Equal;
        }
        match cmp(&a.0, &b.0) {
            Ok(ord) => ord,
            Err(e) => {
                failure = Some(e);
                std::cmp::Ordering::Equal
            }
        }
    });
    match failure {
        Some(e) => Err(e),
        None => Ok(()),
    }
}

pub fn group_by(ctx: &mut RuntimeContext, args: &[Value]) -> EvalResult {
    expect_arity("group-by", args, 2)?;
    let f = args[0].clone();
    let items = lazy::realize_all(ctx, &args[1])?;
    let mut groups = lace_core::FlatMap::new();
    for item in items {
        let key = ctx.call(&f, &[item.clone()])?;
        let bucket = match groups.get(&key) {
            Some(Value::Vector(v)) => v.items.push(item),
            _ => lace_core::PersistentVector::from_vec(vec![item]),
        };
        groups = groups.assoc(key, Value::vector(bucket));
    }
    Ok(Value::map(groups))
}

pub fn frequencies(ctx: &mut RuntimeContext, args: &[Value]) -> EvalResult {
    expect_arity("frequencies", args, 1)?;
    let items = lazy::realize_all(ctx, &args[0])?;
    let mut counts = lace_core::FlatMap::new();
    for item in items {
        let n = match counts.get(&item) {
            Some(Value::Int(n)) => n + 1,
            _ => 1,
        };
        counts = counts.assoc(item, Value::Int(n));
    }
    Ok(Value::map(counts))
}

// Partitioning

fn partition_impl(
    ctx: &mut RuntimeContext,
    op: &str,
    args: &[Value],
    keep_partial: bool,
) -> EvalResult {
    expect_arity_range(op, args, 2, 3)?;
    let n = args[0]
        .as_int()
        .ok_or_else(|| RuntimeError::type_err(op, "integer size", &args[0]))?;
    if n <= 0 {
        return Ok(Value::empty_list());
    }
    let (step, coll) = match args {
        [_, coll] => (n, coll),
        [_, step, coll] => (
            step.as_int()
                .ok_or_else(|| RuntimeError::type_err(op, "integer step", step))?,
            coll,
        ),
        _ => unreachable!("arity checked"),
    };
    if step <= 0 {
        return Err(RuntimeError::IllegalState(format!(
            "{}: step must be positive",
            op
        )));
    }
    let items = lazy::realize_all(ctx, coll)?;
    let mut out = Vec::new();
    let mut start = 0usize;
    while start < items.len() {
        let end = (start + n as usize).min(items.len());
        let window = &items[start..end];
        if window.len() == n as usize || keep_partial {
            out.push(Value::list_from_vec(window.to_vec()));
        } else {
            break;
        }
        start += step as usize;
    }
    Ok(Value::list_from_vec(out))
}

/// Complete windows only.
pub fn partition(ctx: &mut RuntimeContext, args: &[Value]) -> EvalResult {
    partition_impl(ctx, "partition", args, false)
}

/// Includes the trailing partial window.
pub fn partition_all(ctx: &mut RuntimeContext, args: &[Value]) -> EvalResult {
    partition_impl(ctx, "partition-all", args, true)
}

/// New group every time `f`'s result changes.
pub fn partition_by(ctx: &mut RuntimeContext, args: &[Value]) -> EvalResult {
    expect_arity("partition-by", args, 2)?;
    let f = args[0].clone();
    let items = lazy::realize_all(ctx, &args[1])?;
    let mut out: Vec<Value> = Vec::new();
    let mut current: Vec<Value> = Vec::new();
    let mut current_key: Option<Value> = None;
    for item in items {
        let key = ctx.call(&f, &[item.clone()])?;
        match &current_key {
            Some(prev) if *prev == key => current.push(item),
            _ => {
                if !current.is_empty() {
                    out.push(Value::list_from_vec(std::mem::take(&mut current)));
                }
                current.push(item);
                current_key = Some(key);
            }
        }
    }
    if !current.is_empty() {
        out.push(Value::list_from_vec(current));
    }
    Ok(Value::list_from_vec(out))
}

pub fn split_at(ctx: &mut RuntimeContext, args: &[Value]) -> EvalResult {
    expect_arity("split-at", args, 2)?;
    let n = args[0]
        .as_int()
        .ok_or_else(|| RuntimeError::type_err("split-at", "integer index", &args[0]))?
        .max(0) as usize;
    let items = lazy::realize_all(ctx, &args[1])?;
    let cut = n.min(items.len());
    Ok(Value::vector_from_vec(vec![
        Value::list_from_vec(items[..cut].to_vec()),
        Value::list_from_vec(items[cut..].to_vec()),
    ]))
}

pub fn split_with(ctx: &mut RuntimeContext, args: &[Value]) -> EvalResult {
    expect_arity("split-with", args, 2)?;
    let f = args[0].clone();
    let items = lazy::realize_all(ctx, &args[1])?;
    let mut cut = items.len();
    for (i, item) in items.iter().enumerate() {
        if !ctx.call(&f, &[item.clone()])?.is_truthy() {
            cut = i;
            break;
        }
    }
    Ok(Value::vector_from_vec(vec![
        Value::list_from_vec(items[..cut].to_vec()),
        Value::list_from_vec(items[cut..].to_vec()),
    ]))
}

// Weaving

/// Round-robin until the shortest collection runs out.
pub fn interleave(ctx: &mut RuntimeContext, args: &[Value]) -> EvalResult {
    let colls: Vec<Vec<Value>> = args
        .iter()
        .map(|c| lazy::realize_all(ctx, c))
        .collect::<Result<_, _>>()?;
    let rounds = colls.iter().map(Vec::len).min().unwrap_or(0);
    let mut out = Vec::with_capacity(rounds * colls.len());
    for i in 0..rounds {
        for coll in &colls {
            out.push(coll[i].clone());
        }
    }
    Ok(Value::list_from_vec(out))
}

pub fn interpose(ctx: &mut RuntimeContext, args: &[Value]) -> EvalResult {
    expect_arity("interpose", args, 2)?;
    let items = lazy::realize_all(ctx, &args[1])?;
    let mut out = Vec::new();
    for (i, item) in items.into_iter().enumerate() {
        if i > 0 {
            out.push(args[0].clone());
        }
        out.push(item);
    }
    Ok(Value::list_from_vec(out))
}

/// Order-preserving dedup by `=` over the whole prefix.
pub fn distinct(ctx: &mut RuntimeContext, args: &[Value]) -> EvalResult {
    expect_arity("distinct", args, 1)?;
    let items = lazy::realize_all(ctx, &args[0])?;
    let mut seen: Vec<Value> = Vec::new();
    for item in items {
        if !seen.contains(&item) {
            seen.push(item);
        }
    }
    Ok(Value::list_from_vec(seen))
}

/// Collapse consecutive duplicates only.
pub fn dedupe(ctx: &mut RuntimeContext, args: &[Value]) -> EvalResult {
    expect_arity("dedupe", args, 1)?;
    let items = lazy::realize_all(ctx, &args[0])?;
    let mut out: Vec<Value> = Vec::new();
    for item in items {
        if out.last() != Some(&item) {
            out.push(item);
        }
    }
    Ok(Value::list_from_vec(out))
}

/// Flatten nested sequential collections into one list; any
/// non-sequential argument flattens to the empty list.
pub fn flatten(ctx: &mut RuntimeContext, args: &[Value]) -> EvalResult {
    expect_arity("flatten", args, 1)?;
    fn walk(ctx: &mut RuntimeContext, v: &Value, out: &mut Vec<Value>) -> Result<(), RuntimeError> {
        match v {
            Value::List(_) | Value::Vector(_) | Value::LazySeq(_) => {
                for item in lazy::realize_all(ctx, v)? {
                    walk(ctx, &item, out)?;
                }
                Ok(())
            }
            other => {
                out.push(other.clone());
                Ok(())
            }
        }
    }
    let mut out = Vec::new();
    match &args[0] {
        v @ (Value::List(_) | Value::Vector(_) | Value::LazySeq(_)) => {
            walk(ctx, v, &mut out)?;
        }
        _ => {}
    }
    Ok(Value::list_from_vec(out))
}

fn tree_seq_value(branch: Value, children: Value, node: Value) -> Value {
    let tail = {
        let branch = branch.clone();
        let children = children.clone();
        let node = node.clone();
        LazySeqCell::thunk(Value::native_fn("tree-seq*", move |ctx, _| {
            if !ctx.call(&branch, &[node.clone()])?.is_truthy() {
                return Ok(Value::empty_list());
            }
            let kids = ctx.call(&children, &[node.clone()])?;
            let branch = branch.clone();
            let children = children.clone();
            let expand = Value::native_fn("tree-seq-expand*", move |_, args| {
                Ok(tree_seq_value(
                    branch.clone(),
                    children.clone(),
                    args[0].clone(),
                ))
            });
            Ok(LazySeqCell::transform(TransformKind::Mapcat, expand, kids))
        }))
    };
    LazySeqCell::cons(node, tail)
}

/// Depth-first preorder walk of a tree, lazily.
pub fn tree_seq(_ctx: &mut RuntimeContext, args: &[Value]) -> EvalResult {
    expect_arity("tree-seq", args, 3)?;
    Ok(tree_seq_value(
        args[0].clone(),
        args[1].clone(),
        args[2].clone(),
    ))
}

// Realization

/// Pour `from` into `to` one `conj` at a time.
pub fn into(ctx: &mut RuntimeContext, args: &[Value]) -> EvalResult {
    expect_arity("into", args, 2)?;
    let items = lazy::realize_all(ctx, &args[1])?;
    let mut call_args = vec![args[0].clone()];
    call_args.extend(items);
    crate::list_ops::conj(ctx, &call_args)
}

/// Realize the whole sequence, return it.
pub fn doall(ctx: &mut RuntimeContext, args: &[Value]) -> EvalResult {
    expect_arity("doall", args, 1)?;
    lazy::realize_all(ctx, &args[0])?;
    Ok(args[0].clone())
}

/// Realize for side effects, return nil.
pub fn dorun(ctx: &mut RuntimeContext, args: &[Value]) -> EvalResult {
    expect_arity("dorun", args, 1)?;
    lazy::realize_all(ctx, &args[0])?;
    Ok(Value::Nil)
}

/// Primitive behind the `lazy-seq` special form: wrap a body thunk.
pub fn lazy_seq_create(_ctx: &mut RuntimeContext, args: &[Value]) -> EvalResult {
    expect_arity("__lazy-seq-create", args, 1)?;
    Ok(LazySeqCell::thunk(args[0].clone()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx() -> RuntimeContext {
        RuntimeContext::new()
    }

    fn inc() -> Value {
        Value::native_fn("inc", crate::arithmetic::inc)
    }

    fn odd() -> Value {
        Value::native_fn("odd?", crate::arithmetic::odd_p)
    }

    fn plus() -> Value {
        Value::native_fn("+", crate::arithmetic::add)
    }

    fn int_vec(items: &[i64]) -> Value {
        Value::vector_from_vec(items.iter().copied().map(Value::Int).collect())
    }

    fn int_list(items: &[i64]) -> Value {
        Value::list_from_vec(items.iter().copied().map(Value::Int).collect())
    }

    fn realized(c: &mut RuntimeContext, v: &Value) -> Value {
        Value::list_from_vec(lazy::realize_all(c, v).unwrap())
    }

    #[test]
    fn test_take_map_range_pipeline() {
        // (take 5 (map inc (range))) => (1 2 3 4 5)
        let mut c = ctx();
        let r = range(&mut c, &[]).unwrap();
        let mapped = map_op(&mut c, &[inc(), r]).unwrap();
        let taken = take(&mut c, &[Value::Int(5), mapped]).unwrap();
        assert_eq!(realized(&mut c, &taken), int_list(&[1, 2, 3, 4, 5]));
    }

    #[test]
    fn test_reduce_filter_pipeline() {
        // (reduce + 0 (filter odd? (range 10))) => 25
        let mut c = ctx();
        let r = range(&mut c, &[Value::Int(10)]).unwrap();
        let odds = filter_op(&mut c, &[odd(), r]).unwrap();
        let total = reduce(&mut c, &[plus(), Value::Int(0), odds]).unwrap();
        assert_eq!(total, Value::Int(25));
    }

    #[test]
    fn test_reduce_empty_calls_zero_arity() {
        let mut c = ctx();
        assert_eq!(
            reduce(&mut c, &[plus(), Value::empty_list()]).unwrap(),
            Value::Int(0)
        );
        // Property: (reduce f init []) = init
        assert_eq!(
            reduce(&mut c, &[plus(), Value::Int(42), Value::empty_list()]).unwrap(),
            Value::Int(42)
        );
        // (reduce f init [x]) = (f init x)
        assert_eq!(
            reduce(&mut c, &[plus(), Value::Int(1), int_vec(&[2])]).unwrap(),
            Value::Int(3)
        );
    }

    #[test]
    fn test_reduce_short_circuits_on_reduced() {
        let mut c = ctx();
        let take_first = Value::native_fn("stop", |_, args| {
            Ok(Value::Reduced(Rc::new(args[1].clone())))
        });
        let out = reduce(
            &mut c,
            &[take_first, Value::Int(0), int_vec(&[7, 8, 9])],
        )
        .unwrap();
        assert_eq!(out, Value::Int(7));
    }

    #[test]
    fn test_reduce_kv() {
        let mut c = ctx();
        let m = Value::map_from_pairs(vec![
            (Value::keyword("a"), Value::Int(1)),
            (Value::keyword("b"), Value::Int(2)),
        ]);
        let sum_vals = Value::native_fn("sum-vals", |_, args| {
            Ok(Value::Int(
                args[0].as_int().unwrap() + args[2].as_int().unwrap(),
            ))
        });
        assert_eq!(
            reduce_kv(&mut c, &[sum_vals, Value::Int(0), m]).unwrap(),
            Value::Int(3)
        );
    }

    #[test]
    fn test_apply_splices_tail() {
        let mut c = ctx();
        let out = apply(
            &mut c,
            &[plus(), Value::Int(1), int_vec(&[2, 3, 4])],
        )
        .unwrap();
        assert_eq!(out, Value::Int(10));
    }

    #[test]
    fn test_partial_and_comp() {
        let mut c = ctx();
        let add10 = partial(&mut c, &[plus(), Value::Int(10)]).unwrap();
        assert_eq!(c.call(&add10, &[Value::Int(5)]).unwrap(), Value::Int(15));

        // (comp inc inc) applied to 1 => 3; rightmost first
        let twice = comp(&mut c, &[inc(), inc()]).unwrap();
        assert_eq!(c.call(&twice, &[Value::Int(1)]).unwrap(), Value::Int(3));

        // (comp) is identity
        let id = comp(&mut c, &[]).unwrap();
        assert_eq!(c.call(&id, &[Value::Int(9)]).unwrap(), Value::Int(9));
    }

    #[test]
    fn test_quantifiers() {
        let mut c = ctx();
        assert_eq!(
            every_p(&mut c, &[odd(), int_vec(&[1, 3, 5])]).unwrap(),
            Value::Bool(true)
        );
        assert_eq!(
            every_p(&mut c, &[odd(), int_vec(&[1, 2])]).unwrap(),
            Value::Bool(false)
        );
        assert_eq!(
            some(&mut c, &[odd(), int_vec(&[2, 4, 5])]).unwrap(),
            Value::Bool(true)
        );
        assert_eq!(some(&mut c, &[odd(), int_vec(&[2, 4])]).unwrap(), Value::Nil);
        assert_eq!(
            not_any_p(&mut c, &[odd(), int_vec(&[2, 4])]).unwrap(),
            Value::Bool(true)
        );
    }

    #[test]
    fn test_sort_variants() {
        let mut c = ctx();
        assert_eq!(
            sort(&mut c, &[int_vec(&[3, 1, 2])]).unwrap(),
            int_list(&[1, 2, 3])
        );
        // Descending via comparator
        let desc = Value::native_fn("desc", |_, args| {
            Ok(Value::Int(
                args[1].as_int().unwrap() - args[0].as_int().unwrap(),
            ))
        });
        assert_eq!(
            sort(&mut c, &[desc, int_vec(&[1, 3, 2])]).unwrap(),
            int_list(&[3, 2, 1])
        );
        // Mixed types are a type error, not a silent misorder
        let mixed = Value::vector_from_vec(vec![Value::Int(1), Value::keyword("k")]);
        assert!(sort(&mut c, &[mixed]).is_err());
    }

    #[test]
    fn test_sort_by() {
        let mut c = ctx();
        let neg = Value::native_fn("neg", |_, args| {
            Ok(Value::Int(-args[0].as_int().unwrap()))
        });
        assert_eq!(
            sort_by(&mut c, &[neg, int_vec(&[1, 3, 2])]).unwrap(),
            int_list(&[3, 2, 1])
        );
    }

    #[test]
    fn test_group_by_and_frequencies() {
        let mut c = ctx();
        let groups = group_by(&mut c, &[odd(), int_vec(&[1, 2, 3, 4])]).unwrap();
        let odds = crate::map_ops::lookup(&groups, &Value::Bool(true)).unwrap();
        assert_eq!(odds, int_vec(&[1, 3]));

        let freqs = frequencies(&mut c, &[int_vec(&[1, 1, 2])]).unwrap();
        assert_eq!(
            crate::map_ops::lookup(&freqs, &Value::Int(1)),
            Some(Value::Int(2))
        );
    }

    #[test]
    fn test_partition_windows() {
        let mut c = ctx();
        let p = partition(&mut c, &[Value::Int(2), int_vec(&[1, 2, 3, 4, 5])]).unwrap();
        assert_eq!(
            p,
            Value::list_from_vec(vec![int_list(&[1, 2]), int_list(&[3, 4])])
        );
        let pa = partition_all(&mut c, &[Value::Int(2), int_vec(&[1, 2, 3])]).unwrap();
        assert_eq!(
            pa,
            Value::list_from_vec(vec![int_list(&[1, 2]), int_list(&[3])])
        );
        let stepped = partition(
            &mut c,
            &[Value::Int(2), Value::Int(1), int_vec(&[1, 2, 3])],
        )
        .unwrap();
        assert_eq!(
            stepped,
            Value::list_from_vec(vec![int_list(&[1, 2]), int_list(&[2, 3])])
        );
    }

    #[test]
    fn test_partition_by_groups_runs() {
        // (partition-by odd? [1 1 2 2 3 1]) => ((1 1) (2 2) (3) (1))
        let mut c = ctx();
        let out = partition_by(&mut c, &[odd(), int_vec(&[1, 1, 2, 2, 3, 1])]).unwrap();
        assert_eq!(
            out,
            Value::list_from_vec(vec![
                int_list(&[1, 1]),
                int_list(&[2, 2]),
                int_list(&[3]),
                int_list(&[1]),
            ])
        );
    }

    #[test]
    fn test_weaving() {
        let mut c = ctx();
        assert_eq!(
            interleave(&mut c, &[int_vec(&[1, 2]), int_vec(&[10, 20, 30])]).unwrap(),
            int_list(&[1, 10, 2, 20])
        );
        assert_eq!(
            interpose(&mut c, &[Value::Int(0), int_vec(&[1, 2, 3])]).unwrap(),
            int_list(&[1, 0, 2, 0, 3])
        );
        assert_eq!(
            distinct(&mut c, &[int_vec(&[1, 2, 1, 3, 2])]).unwrap(),
            int_list(&[1, 2, 3])
        );
        assert_eq!(
            dedupe(&mut c, &[int_vec(&[1, 1, 2, 1, 1])]).unwrap(),
            int_list(&[1, 2, 1])
        );
    }

    #[test]
    fn test_flatten() {
        let mut c = ctx();
        let nested = Value::vector_from_vec(vec![
            Value::Int(1),
            Value::vector_from_vec(vec![Value::Int(2), int_vec(&[3, 4])]),
        ]);
        assert_eq!(flatten(&mut c, &[nested]).unwrap(), int_list(&[1, 2, 3, 4]));
        assert_eq!(flatten(&mut c, &[Value::Int(5)]).unwrap(), Value::empty_list());
    }

    #[test]
    fn test_tree_seq_preorder() {
        let mut c = ctx();
        // Tree of nested vectors; branches are vectors, leaves ints
        let tree = Value::vector_from_vec(vec![
            Value::Int(1),
            Value::vector_from_vec(vec![Value::Int(2), Value::Int(3)]),
        ]);
        let branch = Value::native_fn("vector?", crate::predicates::vector_p);
        let children = Value::native_fn("identity", identity);
        let out = tree_seq(&mut c, &[branch, children, tree.clone()]).unwrap();
        let items = lazy::realize_all(&mut c, &out).unwrap();
        // Preorder: root, 1, [2 3], 2, 3
        assert_eq!(items.len(), 5);
        assert_eq!(items[0], tree);
        assert_eq!(items[1], Value::Int(1));
        assert_eq!(items[3], Value::Int(2));
        assert_eq!(items[4], Value::Int(3));
    }

    #[test]
    fn test_trampoline_unwinds() {
        let mut c = ctx();
        // countdown returns a thunk until it hits zero
        fn countdown(n: i64) -> Value {
            Value::native_fn("countdown", move |_, _| {
                if n <= 0 {
                    Ok(Value::keyword("done"))
                } else {
                    Ok(countdown(n - 1))
                }
            })
        }
        let out = trampoline(&mut c, &[countdown(100)]).unwrap();
        assert_eq!(out, Value::keyword("done"));
    }

    #[test]
    fn test_drop_stays_lazy() {
        let mut c = ctx();
        let r = range(&mut c, &[]).unwrap();
        let dropped = drop(&mut c, &[Value::Int(3), r]).unwrap();
        let taken = take(&mut c, &[Value::Int(2), dropped]).unwrap();
        assert_eq!(realized(&mut c, &taken), int_list(&[3, 4]));
    }

    #[test]
    fn test_keep_discards_nils() {
        let mut c = ctx();
        let odd_or_nil = Value::native_fn("odd-or-nil", |_, args| {
            let n = args[0].as_int().unwrap();
            Ok(if n % 2 != 0 { Value::Int(n) } else { Value::Nil })
        });
        let kept = keep(&mut c, &[odd_or_nil, int_vec(&[1, 2, 3, 4])]).unwrap();
        assert_eq!(realized(&mut c, &kept), int_list(&[1, 3]));
    }

    #[test]
    fn test_seq_contract() {
        let mut c = ctx();
        assert_eq!(seq(&mut c, &[Value::Nil]).unwrap(), Value::Nil);
        assert_eq!(
            seq(&mut c, &[Value::vector_from_vec(vec![])]).unwrap(),
            Value::Nil
        );
        assert_eq!(seq(&mut c, &[int_vec(&[1, 2])]).unwrap(), int_list(&[1, 2]));
        // (vec (seq v)) round-trips
        let v = int_vec(&[1, 2, 3]);
        let s = seq(&mut c, &[v.clone()]).unwrap();
        assert_eq!(crate::list_ops::vec(&mut c, &[s]).unwrap(), v);
    }

    #[test]
    fn test_into() {
        let mut c = ctx();
        assert_eq!(
            into(&mut c, &[int_vec(&[1]), int_list(&[2, 3])]).unwrap(),
            int_vec(&[1, 2, 3])
        );
        let pairs = Value::list_from_vec(vec![Value::vector_from_vec(vec![
            Value::keyword("a"),
            Value::Int(1),
        ])]);
        assert_eq!(
            into(&mut c, &[Value::map_from_pairs(vec![]), pairs]).unwrap(),
            Value::map_from_pairs(vec![(Value::keyword("a"), Value::Int(1))])
        );
    }

    #[test]
    fn test_repeatedly_counts_calls() {
        let mut c = ctx();
        let counter = Rc::new(std::cell::Cell::new(0));
        let counter2 = counter.clone();
        let tick = Value::native_fn("tick", move |_, _| {
            counter2.set(counter2.get() + 1);
            Ok(Value::Int(counter2.get()))
        });
        let s = repeatedly(&mut c, &[tick]).unwrap();
        let taken = take(&mut c, &[Value::Int(3), s]).unwrap();
        assert_eq!(realized(&mut c, &taken), int_list(&[1, 2, 3]));
        assert_eq!(counter.get(), 3);
    }

    #[test]
    fn test_mapv_filterv_are_vectors() {
        let mut c = ctx();
        assert_eq!(
            mapv(&mut c, &[inc(), int_vec(&[1, 2])]).unwrap(),
            int_vec(&[2, 3])
        );
        assert_eq!(
            filterv(&mut c, &[odd(), int_vec(&[1, 2, 3])]).unwrap(),
            int_vec(&[1, 3])
        );
    }

    #[test]
    fn test_list_star_keeps_lazy_tail() {
        let mut c = ctx();
        let r = range(&mut c, &[]).unwrap();
        let s = list_star(&mut c, &[Value::Int(-2), Value::Int(-1), r]).unwrap();
        let taken = take(&mut c, &[Value::Int(4), s]).unwrap();
        assert_eq!(realized(&mut c, &taken), int_list(&[-2, -1, 0, 1]));
    }

    #[test]
    fn test_min_max_key() {
        let mut c = ctx();
        let neg = Value::native_fn("neg", |_, args| {
            Ok(Value::Int(-args[0].as_int().unwrap()))
        });
        assert_eq!(
            min_key(&mut c, &[neg.clone(), Value::Int(1), Value::Int(5), Value::Int(3)]).unwrap(),
            Value::Int(5)
        );
        assert_eq!(
            max_key(&mut c, &[neg, Value::Int(1), Value::Int(5), Value::Int(3)]).unwrap(),
            Value::Int(1)
        );
    }

    #[test]
    fn test_pred_combinators() {
        let mut c = ctx();
        let pos = Value::native_fn("pos?", crate::arithmetic::pos_p);
        let both = every_pred(&mut c, &[odd(), pos]).unwrap();
        assert_eq!(
            c.call(&both, &[Value::Int(3), Value::Int(5)]).unwrap(),
            Value::Bool(true)
        );
        assert_eq!(
            c.call(&both, &[Value::Int(3), Value::Int(-5)]).unwrap(),
            Value::Bool(false)
        );

        let either = some_fn(&mut c, &[odd()]).unwrap();
        assert_eq!(
            c.call(&either, &[Value::Int(2), Value::Int(3)]).unwrap(),
            Value::Bool(true)
        );
        assert_eq!(c.call(&either, &[Value::Int(2)]).unwrap(), Value::Nil);
    }

    #[test]
    fn test_nthrest_and_nthnext() {
        let mut c = ctx();
        let v = int_vec(&[1, 2, 3]);
        let r = nthrest(&mut c, &[v.clone(), Value::Int(1)]).unwrap();
        assert_eq!(realized(&mut c, &r), int_list(&[2, 3]));
        assert_eq!(
            nthnext(&mut c, &[v, Value::Int(5)]).unwrap(),
            Value::Nil
        );
    }

    #[test]
    fn test_range_bounded_forms() {
        let mut c = ctx();
        assert_eq!(range(&mut c, &[Value::Int(3)]).unwrap(), int_list(&[0, 1, 2]));
        assert_eq!(
            range(&mut c, &[Value::Int(5), Value::Int(1), Value::Int(-2)]).unwrap(),
            int_list(&[5, 3])
        );
        assert_eq!(
            range(&mut c, &[Value::Int(3), Value::Int(3)]).unwrap(),
            Value::empty_list()
        );
    }
}
