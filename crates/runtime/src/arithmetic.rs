//! Arithmetic, equality, and ordering
//!
//! Variadic operators with the usual Lisp identities: `(+)` is 0,
//! `(*)` is 1, `(/ x)` is the reciprocal, `(- x)` negates. Numeric
//! promotion: any float argument makes the result float; `/` always
//! yields float. Division, `quot`, `rem`, and `mod` by zero are
//! recoverable `DivisionByZero` errors. Integer arithmetic wraps.

use crate::context::RuntimeContext;
use crate::error::{RuntimeError, expect_arity, expect_min_arity};
use crate::lazy;
use crate::value::{EvalResult, Value};
use std::cmp::Ordering;

/// Numeric view of a value for promotion-aware arithmetic.
#[derive(Debug, Clone, Copy)]
enum Num {
    Int(i64),
    Float(f64),
}

impl Num {
    fn as_f64(self) -> f64 {
        match self {
            Num::Int(n) => n as f64,
            Num::Float(f) => f,
        }
    }

    fn to_value(self) -> Value {
        match self {
            Num::Int(n) => Value::Int(n),
            Num::Float(f) => Value::Float(f),
        }
    }
}

fn num(op: &str, v: &Value) -> Result<Num, RuntimeError> {
    match v {
        Value::Int(n) => Ok(Num::Int(*n)),
        Value::Float(f) => Ok(Num::Float(*f)),
        other => Err(RuntimeError::type_err(op, "number", other)),
    }
}

fn fold(
    op: &str,
    args: &[Value],
    int_op: impl Fn(i64, i64) -> i64,
    float_op: impl Fn(f64, f64) -> f64,
) -> Result<Num, RuntimeError> {
    let mut acc = num(op, &args[0])?;
    for v in &args[1..] {
        let rhs = num(op, v)?;
        acc = match (acc, rhs) {
            (Num::Int(a), Num::Int(b)) => Num::Int(int_op(a, b)),
            (a, b) => Num::Float(float_op(a.as_f64(), b.as_f64())),
        };
    }
    Ok(acc)
}

/// `(+)` is 0; otherwise the promoted sum.
pub fn add(_ctx: &mut RuntimeContext, args: &[Value]) -> EvalResult {
    if args.is_empty() {
        return Ok(Value::Int(0));
    }
    Ok(fold("+", args, i64::wrapping_add, |a, b| a + b)?.to_value())
}

/// `(- x)` negates; otherwise left-fold subtraction.
pub fn subtract(_ctx: &mut RuntimeContext, args: &[Value]) -> EvalResult {
    expect_min_arity("-", args, 1)?;
    if args.len() == 1 {
        return Ok(match num("-", &args[0])? {
            Num::Int(n) => Value::Int(n.wrapping_neg()),
            Num::Float(f) => Value::Float(-f),
        });
    }
    Ok(fold("-", args, i64::wrapping_sub, |a, b| a - b)?.to_value())
}

/// `(*)` is 1; otherwise the promoted product.
pub fn multiply(_ctx: &mut RuntimeContext, args: &[Value]) -> EvalResult {
    if args.is_empty() {
        return Ok(Value::Int(1));
    }
    Ok(fold("*", args, i64::wrapping_mul, |a, b| a * b)?.to_value())
}

/// Division always yields float; `(/ x)` is `1/x`. Zero divisors are
/// recoverable errors.
pub fn divide(_ctx: &mut RuntimeContext, args: &[Value]) -> EvalResult {
    expect_min_arity("/", args, 1)?;
    let (seed, divisors) = if args.len() == 1 {
        (1.0, &args[..])
    } else {
        (num("/", &args[0])?.as_f64(), &args[1..])
    };
    let mut acc = seed;
    for v in divisors {
        let d = num("/", v)?.as_f64();
        if d == 0.0 {
            return Err(RuntimeError::DivisionByZero(format!(
                "/: cannot divide {} by zero",
                acc
            )));
        }
        acc /= d;
    }
    Ok(Value::Float(acc))
}

fn int_pair(op: &str, args: &[Value]) -> Result<(i64, i64), RuntimeError> {
    expect_arity(op, args, 2)?;
    let a = args[0]
        .as_int()
        .ok_or_else(|| RuntimeError::type_err(op, "integer", &args[0]))?;
    let b = args[1]
        .as_int()
        .ok_or_else(|| RuntimeError::type_err(op, "integer", &args[1]))?;
    if b == 0 {
        return Err(RuntimeError::DivisionByZero(format!(
            "{}: cannot divide {} by zero",
            op, a
        )));
    }
    Ok((a, b))
}

/// Truncating integer quotient.
pub fn quot(_ctx: &mut RuntimeContext, args: &[Value]) -> EvalResult {
    let (a, b) = int_pair("quot", args)?;
    Ok(Value::Int(a.wrapping_div(b)))
}

/// Remainder; the sign follows the dividend.
pub fn rem(_ctx: &mut RuntimeContext, args: &[Value]) -> EvalResult {
    let (a, b) = int_pair("rem", args)?;
    Ok(Value::Int(a.wrapping_rem(b)))
}

/// Modulus; the sign follows the divisor.
pub fn modulo(_ctx: &mut RuntimeContext, args: &[Value]) -> EvalResult {
    let (a, b) = int_pair("mod", args)?;
    let r = a.wrapping_rem(b);
    Ok(Value::Int(if r != 0 && (r < 0) != (b < 0) {
        r + b
    } else {
        r
    }))
}

pub fn inc(_ctx: &mut RuntimeContext, args: &[Value]) -> EvalResult {
    expect_arity("inc", args, 1)?;
    Ok(match num("inc", &args[0])? {
        Num::Int(n) => Value::Int(n.wrapping_add(1)),
        Num::Float(f) => Value::Float(f + 1.0),
    })
}

pub fn dec(_ctx: &mut RuntimeContext, args: &[Value]) -> EvalResult {
    expect_arity("dec", args, 1)?;
    Ok(match num("dec", &args[0])? {
        Num::Int(n) => Value::Int(n.wrapping_sub(1)),
        Num::Float(f) => Value::Float(f - 1.0),
    })
}

pub fn abs(_ctx: &mut RuntimeContext, args: &[Value]) -> EvalResult {
    expect_arity("abs", args, 1)?;
    Ok(match num("abs", &args[0])? {
        Num::Int(n) => Value::Int(n.wrapping_abs()),
        Num::Float(f) => Value::Float(f.abs()),
    })
}

pub fn max(_ctx: &mut RuntimeContext, args: &[Value]) -> EvalResult {
    expect_min_arity("max", args, 1)?;
    let mut best = num("max", &args[0])?;
    for v in &args[1..] {
        let n = num("max", v)?;
        if n.as_f64() > best.as_f64() {
            best = n;
        }
    }
    Ok(best.to_value())
}

pub fn min(_ctx: &mut RuntimeContext, args: &[Value]) -> EvalResult {
    expect_min_arity("min", args, 1)?;
    let mut best = num("min", &args[0])?;
    for v in &args[1..] {
        let n = num("min", v)?;
        if n.as_f64() < best.as_f64() {
            best = n;
        }
    }
    Ok(best.to_value())
}

/// Coerce to integer: floats truncate, chars yield their code point.
pub fn to_int(_ctx: &mut RuntimeContext, args: &[Value]) -> EvalResult {
    expect_arity("int", args, 1)?;
    match &args[0] {
        Value::Int(n) => Ok(Value::Int(*n)),
        Value::Float(f) => Ok(Value::Int(*f as i64)),
        Value::Char(c) => Ok(Value::Int(*c as i64)),
        other => Err(RuntimeError::type_err("int", "number or char", other)),
    }
}

/// Coerce to float.
pub fn to_double(_ctx: &mut RuntimeContext, args: &[Value]) -> EvalResult {
    expect_arity("double", args, 1)?;
    Ok(Value::Float(num("double", &args[0])?.as_f64()))
}

// Equality and ordering

/// Structural equality that sees through lazy sequences: a lazy
/// operand is realized (finite by caller contract) before comparing.
pub fn values_equal(ctx: &mut RuntimeContext, a: &Value, b: &Value) -> Result<bool, RuntimeError> {
    let a = normalize_seq(ctx, a)?;
    let b = normalize_seq(ctx, b)?;
    Ok(a == b)
}

fn normalize_seq(ctx: &mut RuntimeContext, v: &Value) -> EvalResult {
    match v {
        Value::LazySeq(_) => Ok(Value::list_from_vec(lazy::realize_all(ctx, v)?)),
        other => Ok(other.clone()),
    }
}

/// n-ary `=`: true iff every adjacent pair is equal.
pub fn eq(ctx: &mut RuntimeContext, args: &[Value]) -> EvalResult {
    expect_min_arity("=", args, 1)?;
    for pair in args.windows(2) {
        if !values_equal(ctx, &pair[0], &pair[1])? {
            return Ok(Value::Bool(false));
        }
    }
    Ok(Value::Bool(true))
}

pub fn not_eq(ctx: &mut RuntimeContext, args: &[Value]) -> EvalResult {
    expect_min_arity("not=", args, 1)?;
    let equal = eq(ctx, args)?;
    Ok(Value::Bool(!equal.is_truthy()))
}

fn numeric_chain(
    op: &str,
    args: &[Value],
    ok: impl Fn(Ordering) -> bool,
) -> EvalResult {
    expect_min_arity(op, args, 1)?;
    for pair in args.windows(2) {
        let a = num(op, &pair[0])?.as_f64();
        let b = num(op, &pair[1])?.as_f64();
        let ord = a
            .partial_cmp(&b)
            .ok_or_else(|| RuntimeError::Type(format!("{}: cannot order NaN", op)))?;
        if !ok(ord) {
            return Ok(Value::Bool(false));
        }
    }
    Ok(Value::Bool(true))
}

pub fn lt(_ctx: &mut RuntimeContext, args: &[Value]) -> EvalResult {
    numeric_chain("<", args, |o| o == Ordering::Less)
}

pub fn le(_ctx: &mut RuntimeContext, args: &[Value]) -> EvalResult {
    numeric_chain("<=", args, |o| o != Ordering::Greater)
}

pub fn gt(_ctx: &mut RuntimeContext, args: &[Value]) -> EvalResult {
    numeric_chain(">", args, |o| o == Ordering::Greater)
}

pub fn ge(_ctx: &mut RuntimeContext, args: &[Value]) -> EvalResult {
    numeric_chain(">=", args, |o| o != Ordering::Less)
}

/// Total order over numbers, strings, chars, keywords, symbols, bools,
/// nil, and vectors (shorter first, then element-wise). Mixed numeric
/// kinds compare as float; anything else is a type error.
pub fn compare_values(a: &Value, b: &Value) -> Result<Ordering, RuntimeError> {
    use Value::*;
    match (a, b) {
        (Nil, Nil) => Ok(Ordering::Equal),
        (Nil, _) => Ok(Ordering::Less),
        (_, Nil) => Ok(Ordering::Greater),
        (Bool(x), Bool(y)) => Ok(x.cmp(y)),
        (Int(x), Int(y)) => Ok(x.cmp(y)),
        (Int(_) | Float(_), Int(_) | Float(_)) => {
            let x = match a {
                Int(n) => *n as f64,
                Float(f) => *f,
                _ => unreachable!(),
            };
            let y = match b {
                Int(n) => *n as f64,
                Float(f) => *f,
                _ => unreachable!(),
            };
            x.partial_cmp(&y)
                .ok_or_else(|| RuntimeError::Type("compare: cannot order NaN".to_string()))
        }
        (Char(x), Char(y)) => Ok(x.cmp(y)),
        (Str(x), Str(y)) => Ok(x.cmp(y)),
        (Keyword(x), Keyword(y)) => Ok(x.cmp(y)),
        (Symbol(x), Symbol(y)) => Ok(x.cmp(y)),
        (Vector(x), Vector(y)) => {
            match x.items.len().cmp(&y.items.len()) {
                Ordering::Equal => {}
                unequal => return Ok(unequal),
            }
            for (xe, ye) in x.items.iter().zip(y.items.iter()) {
                match compare_values(xe, ye)? {
                    Ordering::Equal => continue,
                    unequal => return Ok(unequal),
                }
            }
            Ok(Ordering::Equal)
        }
        _ => Err(RuntimeError::Type(format!(
            "compare: cannot compare {} with {}",
            a.type_tag(),
            b.type_tag()
        ))),
    }
}

/// `compare` builtin: -1, 0, or 1.
pub fn compare(_ctx: &mut RuntimeContext, args: &[Value]) -> EvalResult {
    expect_arity("compare", args, 2)?;
    Ok(Value::Int(match compare_values(&args[0], &args[1])? {
        Ordering::Less => -1,
        Ordering::Equal => 0,
        Ordering::Greater => 1,
    }))
}

pub fn even_p(_ctx: &mut RuntimeContext, args: &[Value]) -> EvalResult {
    expect_arity("even?", args, 1)?;
    let n = args[0]
        .as_int()
        .ok_or_else(|| RuntimeError::type_err("even?", "integer", &args[0]))?;
    Ok(Value::Bool(n % 2 == 0))
}

pub fn odd_p(_ctx: &mut RuntimeContext, args: &[Value]) -> EvalResult {
    expect_arity("odd?", args, 1)?;
    let n = args[0]
        .as_int()
        .ok_or_else(|| RuntimeError::type_err("odd?", "integer", &args[0]))?;
    Ok(Value::Bool(n % 2 != 0))
}

pub fn pos_p(_ctx: &mut RuntimeContext, args: &[Value]) -> EvalResult {
    expect_arity("pos?", args, 1)?;
    Ok(Value::Bool(num("pos?", &args[0])?.as_f64() > 0.0))
}

pub fn neg_p(_ctx: &mut RuntimeContext, args: &[Value]) -> EvalResult {
    expect_arity("neg?", args, 1)?;
    Ok(Value::Bool(num("neg?", &args[0])?.as_f64() < 0.0))
}

pub fn zero_p(_ctx: &mut RuntimeContext, args: &[Value]) -> EvalResult {
    expect_arity("zero?", args, 1)?;
    Ok(Value::Bool(num("zero?", &args[0])?.as_f64() == 0.0))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx() -> RuntimeContext {
        RuntimeContext::new()
    }

    #[test]
    fn test_add_identities() {
        let mut c = ctx();
        assert_eq!(add(&mut c, &[]).unwrap(), Value::Int(0));
        assert_eq!(multiply(&mut c, &[]).unwrap(), Value::Int(1));
        assert_eq!(
            add(&mut c, &[Value::Int(1), Value::Int(2), Value::Int(3)]).unwrap(),
            Value::Int(6)
        );
    }

    #[test]
    fn test_float_promotion() {
        let mut c = ctx();
        assert_eq!(
            add(&mut c, &[Value::Int(1), Value::Float(0.5)]).unwrap(),
            Value::Float(1.5)
        );
        assert_eq!(
            multiply(&mut c, &[Value::Int(2), Value::Int(3)]).unwrap(),
            Value::Int(6)
        );
    }

    #[test]
    fn test_unary_minus_and_reciprocal() {
        let mut c = ctx();
        assert_eq!(subtract(&mut c, &[Value::Int(5)]).unwrap(), Value::Int(-5));
        assert_eq!(divide(&mut c, &[Value::Int(4)]).unwrap(), Value::Float(0.25));
    }

    #[test]
    fn test_divide_is_always_float() {
        let mut c = ctx();
        assert_eq!(
            divide(&mut c, &[Value::Int(6), Value::Int(3)]).unwrap(),
            Value::Float(2.0)
        );
    }

    #[test]
    fn test_division_by_zero() {
        let mut c = ctx();
        assert!(matches!(
            divide(&mut c, &[Value::Int(1), Value::Int(0)]),
            Err(RuntimeError::DivisionByZero(_))
        ));
        assert!(matches!(
            modulo(&mut c, &[Value::Int(1), Value::Int(0)]),
            Err(RuntimeError::DivisionByZero(_))
        ));
        assert!(matches!(
            quot(&mut c, &[Value::Int(1), Value::Int(0)]),
            Err(RuntimeError::DivisionByZero(_))
        ));
    }

    #[test]
    fn test_mod_follows_divisor_sign() {
        let mut c = ctx();
        assert_eq!(
            modulo(&mut c, &[Value::Int(-7), Value::Int(3)]).unwrap(),
            Value::Int(2)
        );
        assert_eq!(
            rem(&mut c, &[Value::Int(-7), Value::Int(3)]).unwrap(),
            Value::Int(-1)
        );
        assert_eq!(
            modulo(&mut c, &[Value::Int(7), Value::Int(-3)]).unwrap(),
            Value::Int(-2)
        );
    }

    #[test]
    fn test_nary_equality() {
        let mut c = ctx();
        assert_eq!(
            eq(&mut c, &[Value::Int(1), Value::Int(1), Value::Int(1)]).unwrap(),
            Value::Bool(true)
        );
        assert_eq!(
            eq(&mut c, &[Value::Int(1), Value::Int(1), Value::Int(2)]).unwrap(),
            Value::Bool(false)
        );
        // Int and Float are distinct under =
        assert_eq!(
            eq(&mut c, &[Value::Int(1), Value::Float(1.0)]).unwrap(),
            Value::Bool(false)
        );
    }

    #[test]
    fn test_ordered_chains_mix_int_float() {
        let mut c = ctx();
        assert_eq!(
            lt(&mut c, &[Value::Int(1), Value::Float(1.5), Value::Int(2)]).unwrap(),
            Value::Bool(true)
        );
        assert_eq!(
            le(&mut c, &[Value::Int(2), Value::Int(2), Value::Int(3)]).unwrap(),
            Value::Bool(true)
        );
        assert_eq!(
            gt(&mut c, &[Value::Int(3), Value::Int(3)]).unwrap(),
            Value::Bool(false)
        );
    }

    #[test]
    fn test_compare_orders() {
        let mut c = ctx();
        assert_eq!(
            compare(&mut c, &[Value::Int(1), Value::Int(2)]).unwrap(),
            Value::Int(-1)
        );
        assert_eq!(
            compare(&mut c, &[Value::string("b"), Value::string("a")]).unwrap(),
            Value::Int(1)
        );
        assert_eq!(
            compare(&mut c, &[Value::keyword("a"), Value::keyword("a")]).unwrap(),
            Value::Int(0)
        );
        assert!(compare(&mut c, &[Value::Int(1), Value::string("a")]).is_err());
    }

    #[test]
    fn test_compare_vectors_shorter_first() {
        let mut c = ctx();
        let short = Value::vector_from_vec(vec![Value::Int(9)]);
        let long = Value::vector_from_vec(vec![Value::Int(1), Value::Int(1)]);
        assert_eq!(compare(&mut c, &[short, long]).unwrap(), Value::Int(-1));
    }

    #[test]
    fn test_numeric_predicates() {
        let mut c = ctx();
        assert_eq!(even_p(&mut c, &[Value::Int(4)]).unwrap(), Value::Bool(true));
        assert_eq!(odd_p(&mut c, &[Value::Int(4)]).unwrap(), Value::Bool(false));
        assert_eq!(pos_p(&mut c, &[Value::Float(0.1)]).unwrap(), Value::Bool(true));
        assert_eq!(neg_p(&mut c, &[Value::Int(-1)]).unwrap(), Value::Bool(true));
        assert_eq!(zero_p(&mut c, &[Value::Float(0.0)]).unwrap(), Value::Bool(true));
    }

    #[test]
    fn test_coercions() {
        let mut c = ctx();
        assert_eq!(to_int(&mut c, &[Value::Float(3.9)]).unwrap(), Value::Int(3));
        assert_eq!(to_int(&mut c, &[Value::Char('A')]).unwrap(), Value::Int(65));
        assert_eq!(to_double(&mut c, &[Value::Int(2)]).unwrap(), Value::Float(2.0));
    }
}
