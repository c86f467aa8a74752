//! Regex builtins
//!
//! The compiled pattern is an opaque payload; equality is identity.
//! Group-carrying matches come back as vectors `[whole g1 g2 ...]`,
//! groupless matches as bare strings, misses as nil.

use crate::context::RuntimeContext;
use crate::error::{RuntimeError, expect_arity};
use crate::value::{EvalResult, Value};
use std::rc::Rc;

fn as_regex(op: &str, v: &Value) -> Result<Rc<regex::Regex>, RuntimeError> {
    match v {
        Value::Regex(re) => Ok(re.clone()),
        other => Err(RuntimeError::type_err(op, "regex", other)),
    }
}

fn as_str<'a>(op: &str, v: &'a Value) -> Result<&'a str, RuntimeError> {
    v.as_str()
        .ok_or_else(|| RuntimeError::type_err(op, "string", v))
}

pub fn re_pattern(_ctx: &mut RuntimeContext, args: &[Value]) -> EvalResult {
    expect_arity("re-pattern", args, 1)?;
    match &args[0] {
        Value::Regex(_) => Ok(args[0].clone()),
        Value::Str(s) => regex::Regex::new(s)
            .map(|re| Value::Regex(Rc::new(re)))
            .map_err(|e| RuntimeError::Type(format!("re-pattern: {}", e))),
        other => Err(RuntimeError::type_err("re-pattern", "string", other)),
    }
}

fn match_value(re: &regex::Regex, caps: regex::Captures<'_>) -> Value {
    if re.captures_len() == 1 {
        return Value::string(&caps[0]);
    }
    let groups: Vec<Value> = caps
        .iter()
        .map(|g| match g {
            Some(m) => Value::string(m.as_str()),
            None => Value::Nil,
        })
        .collect();
    Value::vector_from_vec(groups)
}

/// First match anywhere in the string, or nil.
pub fn re_find(_ctx: &mut RuntimeContext, args: &[Value]) -> EvalResult {
    expect_arity("re-find", args, 2)?;
    let re = as_regex("re-find", &args[0])?;
    let s = as_str("re-find", &args[1])?;
    Ok(re
        .captures(s)
        .map(|caps| match_value(&re, caps))
        .unwrap_or(Value::Nil))
}

/// Match only if the whole string matches.
pub fn re_matches(_ctx: &mut RuntimeContext, args: &[Value]) -> EvalResult {
    expect_arity("re-matches", args, 2)?;
    let re = as_regex("re-matches", &args[0])?;
    let s = as_str("re-matches", &args[1])?;
    match re.captures(s) {
        Some(caps) if caps[0].len() == s.len() => Ok(match_value(&re, caps)),
        _ => Ok(Value::Nil),
    }
}

/// All non-overlapping matches, in order.
pub fn re_seq(_ctx: &mut RuntimeContext, args: &[Value]) -> EvalResult {
    expect_arity("re-seq", args, 2)?;
    let re = as_regex("re-seq", &args[0])?;
    let s = as_str("re-seq", &args[1])?;
    let matches: Vec<Value> = re
        .captures_iter(s)
        .map(|caps| match_value(&re, caps))
        .collect();
    if matches.is_empty() {
        return Ok(Value::Nil);
    }
    Ok(Value::list_from_vec(matches))
}
