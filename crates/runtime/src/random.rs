//! Randomness builtins
//!
//! Thin wrappers over `rand::thread_rng`. `shuffle` returns a vector
//! (matching the usual contract); `random-sample` keeps each element
//! independently with the given probability.

use crate::context::RuntimeContext;
use crate::error::{RuntimeError, expect_arity, expect_arity_range};
use crate::lazy;
use crate::value::{EvalResult, Value};
use rand::Rng;
use rand::seq::SliceRandom;

/// `(rand)` in [0,1); `(rand n)` in [0,n).
pub fn rand(_ctx: &mut RuntimeContext, args: &[Value]) -> EvalResult {
    expect_arity_range("rand", args, 0, 1)?;
    let upper = match args.first() {
        None => 1.0,
        Some(Value::Int(n)) => *n as f64,
        Some(Value::Float(f)) => *f,
        Some(other) => return Err(RuntimeError::type_err("rand", "number", other)),
    };
    Ok(Value::Float(rand::thread_rng().gen_range(0.0..1.0) * upper))
}

/// Uniform integer in [0,n); n must be positive.
pub fn rand_int(_ctx: &mut RuntimeContext, args: &[Value]) -> EvalResult {
    expect_arity("rand-int", args, 1)?;
    let n = args[0]
        .as_int()
        .ok_or_else(|| RuntimeError::type_err("rand-int", "integer", &args[0]))?;
    if n <= 0 {
        return Ok(Value::Int(0));
    }
    Ok(Value::Int(rand::thread_rng().gen_range(0..n)))
}

pub fn rand_nth(ctx: &mut RuntimeContext, args: &[Value]) -> EvalResult {
    expect_arity("rand-nth", args, 1)?;
    let items = lazy::realize_all(ctx, &args[0])?;
    items
        .choose(&mut rand::thread_rng())
        .cloned()
        .ok_or_else(|| {
            RuntimeError::IndexOutOfBounds("rand-nth: empty collection".to_string())
        })
}

pub fn shuffle(ctx: &mut RuntimeContext, args: &[Value]) -> EvalResult {
    expect_arity("shuffle", args, 1)?;
    let mut items = lazy::realize_all(ctx, &args[0])?;
    items.shuffle(&mut rand::thread_rng());
    Ok(Value::vector_from_vec(items))
}

/// Keep each element with probability `prob`.
pub fn random_sample(ctx: &mut RuntimeContext, args: &[Value]) -> EvalResult {
    expect_arity("random-sample", args, 2)?;
    let prob = match &args[0] {
        Value::Int(n) => *n as f64,
        Value::Float(f) => *f,
        other => return Err(RuntimeError::type_err("random-sample", "probability", other)),
    };
    let items = lazy::realize_all(ctx, &args[1])?;
    let mut rng = rand::thread_rng();
    Ok(Value::list_from_vec(
        items
            .into_iter()
            .filter(|_| rng.gen_range(0.0..1.0) < prob)
            .collect(),
    ))
}
