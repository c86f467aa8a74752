//! Runtime error taxonomy
//!
//! Every builtin returns `Result<Value, RuntimeError>`; errors surface
//! to the host evaluator, which decides whether to convert them into
//! catchable `ex-info` maps or abort. The core never recovers locally
//! unless a builtin's contract says so (`parse-long` returning nil,
//! `find` returning nil, a rejected validator leaving the atom
//! untouched).

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum RuntimeError {
    /// Argument count does not match the operation
    #[error("arity error: {0}")]
    Arity(String),

    /// Wrong value shape for an operation
    #[error("type error: {0}")]
    Type(String),

    /// Integer or float division (or mod/quot/rem) by zero
    #[error("division by zero: {0}")]
    DivisionByZero(String),

    /// Vector or string index out of range without a not-found value
    #[error("index out of bounds: {0}")]
    IndexOutOfBounds(String),

    /// Allocation failed; may be fatal upstream
    #[error("out of memory")]
    OutOfMemory,

    /// Operation used in an invalid state, e.g. binding a non-dynamic Var
    #[error("illegal state: {0}")]
    IllegalState(String),

    /// Atom validator rejected a candidate value; the atom is unchanged
    #[error("validator rejected value: {0}")]
    Validator(String),

    /// Surfaced as-is from the external WASM collaborator
    #[error("wasm load error: {0}")]
    WasmLoad(String),

    #[error("wasm invoke error: {0}")]
    WasmInvoke(String),

    #[error("wasm memory error: {0}")]
    WasmMemory(String),
}

impl RuntimeError {
    /// `op: expected <what>, got <type-tag>` - the common shape for
    /// argument type complaints.
    pub fn type_err(op: &str, expected: &str, got: &crate::value::Value) -> Self {
        RuntimeError::Type(format!("{}: expected {}, got {}", op, expected, got.type_tag()))
    }

    pub fn arity_err(op: &str, expected: &str, got: usize) -> Self {
        RuntimeError::Arity(format!("{}: expected {} args, got {}", op, expected, got))
    }
}

/// Exact argument count check for a builtin.
pub fn expect_arity(op: &str, args: &[crate::value::Value], n: usize) -> Result<(), RuntimeError> {
    if args.len() != n {
        return Err(RuntimeError::arity_err(op, &n.to_string(), args.len()));
    }
    Ok(())
}

/// At-least argument count check.
pub fn expect_min_arity(
    op: &str,
    args: &[crate::value::Value],
    min: usize,
) -> Result<(), RuntimeError> {
    if args.len() < min {
        return Err(RuntimeError::arity_err(
            op,
            &format!("at least {}", min),
            args.len(),
        ));
    }
    Ok(())
}

/// Inclusive range argument count check.
pub fn expect_arity_range(
    op: &str,
    args: &[crate::value::Value],
    min: usize,
    max: usize,
) -> Result<(), RuntimeError> {
    if args.len() < min || args.len() > max {
        return Err(RuntimeError::arity_err(
            op,
            &format!("{} to {}", min, max),
            args.len(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Value;

    #[test]
    fn test_expect_arity() {
        assert!(expect_arity("f", &[Value::Nil], 1).is_ok());
        let err = expect_arity("f", &[], 1).unwrap_err();
        assert!(matches!(err, RuntimeError::Arity(_)));
        assert_eq!(err.to_string(), "arity error: f: expected 1 args, got 0");
    }

    #[test]
    fn test_expect_range() {
        assert!(expect_arity_range("f", &[Value::Nil], 1, 2).is_ok());
        assert!(expect_arity_range("f", &[], 1, 2).is_err());
        assert!(expect_arity_range("f", &[Value::Nil, Value::Nil, Value::Nil], 1, 2).is_err());
    }

    #[test]
    fn test_type_err_message() {
        let err = RuntimeError::type_err("nth", "integer index", &Value::string("x"));
        assert_eq!(
            err.to_string(),
            "type error: nth: expected integer index, got string"
        );
    }
}
