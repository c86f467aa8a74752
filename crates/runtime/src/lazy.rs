//! Lazy-sequence engine
//!
//! A `LazySeqCell` holds exactly one representation at a time: a
//! pending thunk, a cons (one element known, rest deferred), a
//! transform over another sequence, a concatenation, an infinite
//! generator, a take limit, or the final realized value. Forcing
//! advances the cell by exactly ONE element and rewrites the
//! representation in place, so later observers see the resolved form
//! without recomputation.
//!
//! The cardinal invariant: one-step forcing never evaluates the tail.
//! `take n` over an infinite generator performs exactly `n` element
//! forces; filtering an infinite stream with no matches does not
//! terminate, which matches the language semantics.

use crate::context::RuntimeContext;
use crate::error::RuntimeError;
use crate::value::{EvalResult, Value};
use std::cell::RefCell;
use std::rc::Rc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransformKind {
    Map,
    Filter,
    Mapcat,
    TakeWhile,
    DropWhile,
    MapIndexed,
}

#[derive(Debug, Clone)]
pub enum Generator {
    Iterate { f: Value, current: Value },
    Repeat { value: Value },
    Cycle { items: Rc<[Value]>, index: usize },
    Range { current: i64, step: i64 },
}

#[derive(Debug, Clone)]
pub enum LazyRepr {
    /// Zero-argument function; its result replaces the thunk
    Thunk(Value),
    /// One element known, rest possibly deferred
    Cons { head: Value, tail: Value },
    /// Element-wise transform over another sequence-like value
    Transform {
        kind: TransformKind,
        f: Value,
        source: Value,
        index: i64,
    },
    /// Sources walked in order, empties skipped
    Concat(Vec<Value>),
    Generator(Generator),
    /// At most `n` elements from `source`
    Take { source: Value, n: i64 },
    /// Concrete concluded value
    Realized(Value),
    /// Transient marker while a step is in flight; observing it means
    /// a thunk re-entered its own cell
    Forcing,
}

#[derive(Debug)]
pub struct LazySeqCell {
    pub repr: RefCell<LazyRepr>,
}

impl LazySeqCell {
    fn wrap(repr: LazyRepr) -> Value {
        Value::LazySeq(Rc::new(LazySeqCell {
            repr: RefCell::new(repr),
        }))
    }

    /// Deferred body: `f` is a zero-argument function returning a
    /// collection, nil, or another lazy seq.
    pub fn thunk(f: Value) -> Value {
        Self::wrap(LazyRepr::Thunk(f))
    }

    pub fn cons(head: Value, tail: Value) -> Value {
        Self::wrap(LazyRepr::Cons { head, tail })
    }

    pub fn transform(kind: TransformKind, f: Value, source: Value) -> Value {
        Self::wrap(LazyRepr::Transform {
            kind,
            f,
            source,
            index: 0,
        })
    }

    fn transform_at(kind: TransformKind, f: Value, source: Value, index: i64) -> Value {
        Self::wrap(LazyRepr::Transform {
            kind,
            f,
            source,
            index,
        })
    }

    pub fn concat(sources: Vec<Value>) -> Value {
        Self::wrap(LazyRepr::Concat(sources))
    }

    pub fn iterate(f: Value, seed: Value) -> Value {
        Self::wrap(LazyRepr::Generator(Generator::Iterate { f, current: seed }))
    }

    pub fn repeat(value: Value) -> Value {
        Self::wrap(LazyRepr::Generator(Generator::Repeat { value }))
    }

    /// Cycle over materialized items; the empty cycle is the empty
    /// sequence.
    pub fn cycle(items: Vec<Value>) -> Value {
        if items.is_empty() {
            return Self::wrap(LazyRepr::Realized(Value::Nil));
        }
        Self::wrap(LazyRepr::Generator(Generator::Cycle {
            items: items.into(),
            index: 0,
        }))
    }

    pub fn range_from(start: i64, step: i64) -> Value {
        Self::wrap(LazyRepr::Generator(Generator::Range {
            current: start,
            step,
        }))
    }

    pub fn take(source: Value, n: i64) -> Value {
        Self::wrap(LazyRepr::Take { source, n })
    }
}

/// Idempotent transition into cons or realized form. On error the cell
/// is restored to its prior representation so the error is retryable.
pub fn force_one_step(ctx: &mut RuntimeContext, cell: &Rc<LazySeqCell>) -> Result<(), RuntimeError> {
    loop {
        {
            let repr = cell.repr.borrow();
            match &*repr {
                LazyRepr::Cons { .. } | LazyRepr::Realized(_) => return Ok(()),
                LazyRepr::Forcing => {
                    return Err(RuntimeError::IllegalState(
                        "lazy-seq forced recursively from its own body".to_string(),
                    ));
                }
                _ => {}
            }
        }
        let prev = cell.repr.replace(LazyRepr::Forcing);
        let saved = prev.clone();
        match step(ctx, prev) {
            Ok(next) => {
                cell.repr.replace(next);
            }
            Err(e) => {
                cell.repr.replace(saved);
                return Err(e);
            }
        }
    }
}

/// Compute the successor representation. May return a non-final form
/// (a spliced inner thunk); the caller loops until cons/realized.
fn step(ctx: &mut RuntimeContext, repr: LazyRepr) -> Result<LazyRepr, RuntimeError> {
    match repr {
        LazyRepr::Thunk(f) => {
            let result = ctx.force_thunk(&f)?;
            match result {
                // Splice the inner cell's representation into this one
                Value::LazySeq(inner) => Ok(inner.repr.borrow().clone()),
                other => Ok(LazyRepr::Realized(other)),
            }
        }
        LazyRepr::Transform {
            kind,
            f,
            source,
            index,
        } => step_transform(ctx, kind, f, source, index),
        LazyRepr::Concat(sources) => step_concat(ctx, sources),
        LazyRepr::Generator(generator) => step_generator(ctx, generator),
        LazyRepr::Take { source, n } => {
            if n <= 0 || seq_empty(ctx, &source)? {
                return Ok(LazyRepr::Realized(Value::Nil));
            }
            let head = seq_first(ctx, &source)?;
            let tail = LazySeqCell::take(seq_rest(ctx, &source)?, n - 1);
            Ok(LazyRepr::Cons { head, tail })
        }
        LazyRepr::Cons { head, tail } => Ok(LazyRepr::Cons { head, tail }),
        LazyRepr::Realized(v) => Ok(LazyRepr::Realized(v)),
        LazyRepr::Forcing => Err(RuntimeError::IllegalState(
            "lazy-seq cell lost its representation".to_string(),
        )),
    }
}

fn step_transform(
    ctx: &mut RuntimeContext,
    kind: TransformKind,
    f: Value,
    mut source: Value,
    index: i64,
) -> Result<LazyRepr, RuntimeError> {
    match kind {
        TransformKind::Map => {
            if seq_empty(ctx, &source)? {
                return Ok(LazyRepr::Realized(Value::Nil));
            }
            let head = {
                let x = seq_first(ctx, &source)?;
                ctx.call(&f, &[x])?
            };
            let tail = LazySeqCell::transform(TransformKind::Map, f, seq_rest(ctx, &source)?);
            Ok(LazyRepr::Cons { head, tail })
        }
        TransformKind::MapIndexed => {
            if seq_empty(ctx, &source)? {
                return Ok(LazyRepr::Realized(Value::Nil));
            }
            let head = {
                let x = seq_first(ctx, &source)?;
                ctx.call(&f, &[Value::Int(index), x])?
            };
            let tail = LazySeqCell::transform_at(
                TransformKind::MapIndexed,
                f,
                seq_rest(ctx, &source)?,
                index + 1,
            );
            Ok(LazyRepr::Cons { head, tail })
        }
        TransformKind::Filter => loop {
            if seq_empty(ctx, &source)? {
                return Ok(LazyRepr::Realized(Value::Nil));
            }
            let x = seq_first(ctx, &source)?;
            let rest = seq_rest(ctx, &source)?;
            if ctx.call(&f, &[x.clone()])?.is_truthy() {
                let tail = LazySeqCell::transform(TransformKind::Filter, f, rest);
                return Ok(LazyRepr::Cons { head: x, tail });
            }
            source = rest;
        },
        TransformKind::TakeWhile => {
            if seq_empty(ctx, &source)? {
                return Ok(LazyRepr::Realized(Value::Nil));
            }
            let x = seq_first(ctx, &source)?;
            if ctx.call(&f, &[x.clone()])?.is_truthy() {
                let tail =
                    LazySeqCell::transform(TransformKind::TakeWhile, f, seq_rest(ctx, &source)?);
                Ok(LazyRepr::Cons { head: x, tail })
            } else {
                Ok(LazyRepr::Realized(Value::Nil))
            }
        }
        TransformKind::DropWhile => loop {
            if seq_empty(ctx, &source)? {
                return Ok(LazyRepr::Realized(Value::Nil));
            }
            let x = seq_first(ctx, &source)?;
            let rest = seq_rest(ctx, &source)?;
            if ctx.call(&f, &[x.clone()])?.is_truthy() {
                source = rest;
            } else {
                return Ok(LazyRepr::Cons { head: x, tail: rest });
            }
        },
        TransformKind::Mapcat => loop {
            if seq_empty(ctx, &source)? {
                return Ok(LazyRepr::Realized(Value::Nil));
            }
            let x = seq_first(ctx, &source)?;
            let remaining = seq_rest(ctx, &source)?;
            let sub = ctx.call(&f, &[x])?;
            if seq_empty(ctx, &sub)? {
                source = remaining;
                continue;
            }
            let head = seq_first(ctx, &sub)?;
            let sub_rest = seq_rest(ctx, &sub)?;
            let rest_mapcat = LazySeqCell::transform(TransformKind::Mapcat, f, remaining);
            let tail = if trivially_empty(&sub_rest) {
                rest_mapcat
            } else {
                LazySeqCell::concat(vec![sub_rest, rest_mapcat])
            };
            return Ok(LazyRepr::Cons { head, tail });
        },
    }
}

fn step_concat(ctx: &mut RuntimeContext, sources: Vec<Value>) -> Result<LazyRepr, RuntimeError> {
    let mut queue = std::collections::VecDeque::from(sources);
    loop {
        let Some(front) = queue.pop_front() else {
            return Ok(LazyRepr::Realized(Value::Nil));
        };
        if seq_empty(ctx, &front)? {
            continue;
        }
        let head = seq_first(ctx, &front)?;
        let mut rest_sources = vec![seq_rest(ctx, &front)?];
        rest_sources.extend(queue);
        let tail = LazySeqCell::concat(rest_sources);
        return Ok(LazyRepr::Cons { head, tail });
    }
}

fn step_generator(ctx: &mut RuntimeContext, generator: Generator) -> Result<LazyRepr, RuntimeError> {
    match generator {
        Generator::Iterate { f, current } => {
            let next = ctx.call(&f, &[current.clone()])?;
            let tail = LazySeqCell::wrap(LazyRepr::Generator(Generator::Iterate {
                f,
                current: next,
            }));
            Ok(LazyRepr::Cons {
                head: current,
                tail,
            })
        }
        Generator::Repeat { value } => {
            let tail = LazySeqCell::repeat(value.clone());
            Ok(LazyRepr::Cons { head: value, tail })
        }
        Generator::Cycle { items, index } => {
            let head = items[index].clone();
            let next = (index + 1) % items.len();
            let tail = LazySeqCell::wrap(LazyRepr::Generator(Generator::Cycle {
                items,
                index: next,
            }));
            Ok(LazyRepr::Cons { head, tail })
        }
        Generator::Range { current, step } => {
            let tail = LazySeqCell::range_from(current.wrapping_add(step), step);
            Ok(LazyRepr::Cons {
                head: Value::Int(current),
                tail,
            })
        }
    }
}

/// Empty without forcing: concrete empties only. Lazy cells report
/// false here; use [`seq_empty`] for the forcing check.
fn trivially_empty(v: &Value) -> bool {
    match v {
        Value::Nil => true,
        Value::List(l) => l.items.is_empty(),
        Value::Vector(vec) => vec.items.is_empty(),
        Value::Map(m) => m.entries.is_empty(),
        Value::Set(s) => s.items.is_empty(),
        Value::Str(s) => s.is_empty(),
        _ => false,
    }
}

// Observation API: every sequence-like value answers first/rest/empty
// through these three, forcing lazy cells by at most one step.

/// First element, or nil when exhausted.
pub fn seq_first(ctx: &mut RuntimeContext, v: &Value) -> EvalResult {
    match v {
        Value::Nil => Ok(Value::Nil),
        Value::List(l) => Ok(l.items.first().cloned().unwrap_or(Value::Nil)),
        Value::Vector(vec) => Ok(vec.items.get(0).cloned().unwrap_or(Value::Nil)),
        Value::Map(m) => Ok(m
            .entries
            .iter()
            .next()
            .map(|(k, val)| Value::vector_from_vec(vec![k.clone(), val.clone()]))
            .unwrap_or(Value::Nil)),
        Value::Set(s) => Ok(s.items.iter().next().cloned().unwrap_or(Value::Nil)),
        Value::Str(s) => Ok(s
            .chars()
            .next()
            .map(|c| Value::string(c.to_string()))
            .unwrap_or(Value::Nil)),
        Value::LazySeq(cell) => {
            force_one_step(ctx, cell)?;
            let repr = cell.repr.borrow().clone();
            match repr {
                LazyRepr::Cons { head, .. } => Ok(head),
                LazyRepr::Realized(inner) => seq_first(ctx, &inner),
                _ => unreachable!("force-one-step left a pending representation"),
            }
        }
        other => Err(RuntimeError::type_err("first", "seqable", other)),
    }
}

/// Remainder as a sequence-like value; a concrete empty list when
/// exhausted.
pub fn seq_rest(ctx: &mut RuntimeContext, v: &Value) -> EvalResult {
    match v {
        Value::Nil => Ok(Value::empty_list()),
        Value::List(l) => Ok(Value::list(l.items.rest())),
        Value::Vector(vec) => {
            if vec.items.is_empty() {
                Ok(Value::empty_list())
            } else {
                Ok(Value::list_from_vec(vec.items.as_slice()[1..].to_vec()))
            }
        }
        Value::Map(m) => {
            let rest: Vec<Value> = m
                .entries
                .iter()
                .skip(1)
                .map(|(k, val)| Value::vector_from_vec(vec![k.clone(), val.clone()]))
                .collect();
            Ok(Value::list_from_vec(rest))
        }
        Value::Set(s) => Ok(Value::list_from_vec(
            s.items.iter().skip(1).cloned().collect(),
        )),
        Value::Str(s) => Ok(Value::list_from_vec(
            s.chars().skip(1).map(|c| Value::string(c.to_string())).collect(),
        )),
        Value::LazySeq(cell) => {
            force_one_step(ctx, cell)?;
            let repr = cell.repr.borrow().clone();
            match repr {
                LazyRepr::Cons { tail, .. } => Ok(tail),
                LazyRepr::Realized(inner) => seq_rest(ctx, &inner),
                _ => unreachable!("force-one-step left a pending representation"),
            }
        }
        other => Err(RuntimeError::type_err("rest", "seqable", other)),
    }
}

/// Exhaustion check, forcing a lazy cell by one step.
pub fn seq_empty(ctx: &mut RuntimeContext, v: &Value) -> Result<bool, RuntimeError> {
    match v {
        Value::Nil => Ok(true),
        Value::List(l) => Ok(l.items.is_empty()),
        Value::Vector(vec) => Ok(vec.items.is_empty()),
        Value::Map(m) => Ok(m.entries.is_empty()),
        Value::Set(s) => Ok(s.items.is_empty()),
        Value::Str(s) => Ok(s.is_empty()),
        Value::LazySeq(cell) => {
            force_one_step(ctx, cell)?;
            let repr = cell.repr.borrow().clone();
            match repr {
                LazyRepr::Cons { .. } => Ok(false),
                LazyRepr::Realized(inner) => seq_empty(ctx, &inner),
                _ => unreachable!("force-one-step left a pending representation"),
            }
        }
        other => Err(RuntimeError::type_err("seq", "seqable", other)),
    }
}

/// Fully materialize a sequence into element order. Callable only on
/// sequences known to be finite - caller responsibility.
pub fn realize_all(ctx: &mut RuntimeContext, v: &Value) -> Result<Vec<Value>, RuntimeError> {
    let mut out = Vec::new();
    let mut cursor = v.clone();
    loop {
        if seq_empty(ctx, &cursor)? {
            return Ok(out);
        }
        out.push(seq_first(ctx, &cursor)?);
        cursor = seq_rest(ctx, &cursor)?;
    }
}
