//! String and identifier operations
//!
//! All indices are code-point based, never byte offsets - slicing a
//! multi-byte scalar in half is not a thing this runtime can express.
//! Parsing builtins (`parse-long`, `parse-double`, `parse-boolean`)
//! return nil on failure by contract.

use crate::context::RuntimeContext;
use crate::error::{RuntimeError, expect_arity, expect_arity_range, expect_min_arity};
use crate::lazy;
use crate::printer;
use crate::value::{EvalResult, Value};
use lace_core::Ident;
use std::rc::Rc;

fn as_str<'a>(op: &str, v: &'a Value) -> Result<&'a str, RuntimeError> {
    v.as_str()
        .ok_or_else(|| RuntimeError::type_err(op, "string", v))
}

/// `(str ...)`: display forms concatenated; nil contributes nothing.
pub fn str_op(_ctx: &mut RuntimeContext, args: &[Value]) -> EvalResult {
    let mut out = String::new();
    for v in args {
        if !v.is_nil() {
            out.push_str(&printer::display_str(v));
        }
    }
    Ok(Value::string(out))
}

/// Code-point substring; end defaults to the end of the string.
pub fn subs(_ctx: &mut RuntimeContext, args: &[Value]) -> EvalResult {
    expect_arity_range("subs", args, 2, 3)?;
    let s = as_str("subs", &args[0])?;
    let chars: Vec<char> = s.chars().collect();
    let start = args[1]
        .as_int()
        .ok_or_else(|| RuntimeError::type_err("subs", "integer index", &args[1]))?;
    let end = match args.get(2) {
        Some(e) => e
            .as_int()
            .ok_or_else(|| RuntimeError::type_err("subs", "integer index", e))?,
        None => chars.len() as i64,
    };
    let bounds = usize::try_from(start)
        .ok()
        .zip(usize::try_from(end).ok())
        .filter(|(s, e)| s <= e && *e <= chars.len());
    match bounds {
        Some((s, e)) => Ok(Value::string(chars[s..e].iter().collect::<String>())),
        None => Err(RuntimeError::IndexOutOfBounds(format!(
            "subs: range [{}, {}) for string of length {}",
            start,
            end,
            chars.len()
        ))),
    }
}

pub fn upper_case(_ctx: &mut RuntimeContext, args: &[Value]) -> EvalResult {
    expect_arity("upper-case", args, 1)?;
    Ok(Value::string(as_str("upper-case", &args[0])?.to_uppercase()))
}

pub fn lower_case(_ctx: &mut RuntimeContext, args: &[Value]) -> EvalResult {
    expect_arity("lower-case", args, 1)?;
    Ok(Value::string(as_str("lower-case", &args[0])?.to_lowercase()))
}

pub fn capitalize(_ctx: &mut RuntimeContext, args: &[Value]) -> EvalResult {
    expect_arity("capitalize", args, 1)?;
    let s = as_str("capitalize", &args[0])?;
    let mut chars = s.chars();
    Ok(Value::string(match chars.next() {
        None => String::new(),
        Some(first) => {
            first.to_uppercase().collect::<String>() + &chars.as_str().to_lowercase()
        }
    }))
}

pub fn trim(_ctx: &mut RuntimeContext, args: &[Value]) -> EvalResult {
    expect_arity("trim", args, 1)?;
    Ok(Value::string(as_str("trim", &args[0])?.trim()))
}

pub fn triml(_ctx: &mut RuntimeContext, args: &[Value]) -> EvalResult {
    expect_arity("triml", args, 1)?;
    Ok(Value::string(as_str("triml", &args[0])?.trim_start()))
}

pub fn trimr(_ctx: &mut RuntimeContext, args: &[Value]) -> EvalResult {
    expect_arity("trimr", args, 1)?;
    Ok(Value::string(as_str("trimr", &args[0])?.trim_end()))
}

pub fn blank_p(_ctx: &mut RuntimeContext, args: &[Value]) -> EvalResult {
    expect_arity("blank?", args, 1)?;
    match &args[0] {
        Value::Nil => Ok(Value::Bool(true)),
        Value::Str(s) => Ok(Value::Bool(s.trim().is_empty())),
        other => Err(RuntimeError::type_err("blank?", "string", other)),
    }
}

/// Split on a regex or literal string separator; optional limit.
pub fn split(_ctx: &mut RuntimeContext, args: &[Value]) -> EvalResult {
    expect_arity_range("split", args, 2, 3)?;
    let s = as_str("split", &args[0])?;
    let limit = match args.get(2) {
        Some(v) => Some(
            v.as_int()
                .ok_or_else(|| RuntimeError::type_err("split", "integer limit", v))?
                .max(0) as usize,
        ),
        None => None,
    };
    let pieces: Vec<&str> = match &args[1] {
        Value::Regex(re) => match limit {
            Some(n) => re.splitn(s, n).collect(),
            None => re.split(s).collect(),
        },
        Value::Str(sep) => match limit {
            Some(n) => s.splitn(n, sep.as_ref()).collect(),
            None => s.split(sep.as_ref()).collect(),
        },
        other => return Err(RuntimeError::type_err("split", "regex or string", other)),
    };
    Ok(Value::vector_from_vec(
        pieces.into_iter().map(Value::string).collect(),
    ))
}

pub fn split_lines(_ctx: &mut RuntimeContext, args: &[Value]) -> EvalResult {
    expect_arity("split-lines", args, 1)?;
    let s = as_str("split-lines", &args[0])?;
    Ok(Value::vector_from_vec(
        s.lines().map(Value::string).collect(),
    ))
}

/// `(join coll)` or `(join sep coll)`.
pub fn join(ctx: &mut RuntimeContext, args: &[Value]) -> EvalResult {
    expect_arity_range("join", args, 1, 2)?;
    let (sep, coll) = match args {
        [coll] => (String::new(), coll),
        [sep, coll] => (printer::display_str(sep), coll),
        _ => unreachable!("arity checked"),
    };
    let items = lazy::realize_all(ctx, coll)?;
    let rendered: Vec<String> = items.iter().map(printer::display_str).collect();
    Ok(Value::string(rendered.join(&sep)))
}

/// Replace every occurrence of a literal string or regex match.
pub fn replace(_ctx: &mut RuntimeContext, args: &[Value]) -> EvalResult {
    expect_arity("replace", args, 3)?;
    let s = as_str("replace", &args[0])?;
    let replacement = as_str("replace", &args[2])?;
    match &args[1] {
        Value::Str(m) => Ok(Value::string(s.replace(m.as_ref(), replacement))),
        Value::Regex(re) => Ok(Value::string(re.replace_all(s, replacement).into_owned())),
        other => return Err(RuntimeError::type_err("replace", "regex or string", other)),
    }
}

pub fn replace_first(_ctx: &mut RuntimeContext, args: &[Value]) -> EvalResult {
    expect_arity("replace-first", args, 3)?;
    let s = as_str("replace-first", &args[0])?;
    let replacement = as_str("replace-first", &args[2])?;
    match &args[1] {
        Value::Str(m) => Ok(Value::string(s.replacen(m.as_ref(), replacement, 1))),
        Value::Regex(re) => Ok(Value::string(re.replace(s, replacement).into_owned())),
        other => {
            return Err(RuntimeError::type_err(
                "replace-first",
                "regex or string",
                other,
            ));
        }
    }
}

pub fn includes_p(_ctx: &mut RuntimeContext, args: &[Value]) -> EvalResult {
    expect_arity("includes?", args, 2)?;
    let s = as_str("includes?", &args[0])?;
    let sub = as_str("includes?", &args[1])?;
    Ok(Value::Bool(s.contains(sub)))
}

pub fn starts_with_p(_ctx: &mut RuntimeContext, args: &[Value]) -> EvalResult {
    expect_arity("starts-with?", args, 2)?;
    let s = as_str("starts-with?", &args[0])?;
    let prefix = as_str("starts-with?", &args[1])?;
    Ok(Value::Bool(s.starts_with(prefix)))
}

pub fn ends_with_p(_ctx: &mut RuntimeContext, args: &[Value]) -> EvalResult {
    expect_arity("ends-with?", args, 2)?;
    let s = as_str("ends-with?", &args[0])?;
    let suffix = as_str("ends-with?", &args[1])?;
    Ok(Value::Bool(s.ends_with(suffix)))
}

/// Code-point index of a substring, or nil; optional from-index.
pub fn index_of(_ctx: &mut RuntimeContext, args: &[Value]) -> EvalResult {
    expect_arity_range("index-of", args, 2, 3)?;
    let s = as_str("index-of", &args[0])?;
    let needle = as_str("index-of", &args[1])?;
    let from = match args.get(2) {
        Some(v) => v
            .as_int()
            .ok_or_else(|| RuntimeError::type_err("index-of", "integer index", v))?
            .max(0) as usize,
        None => 0,
    };
    let chars: Vec<char> = s.chars().collect();
    if from > chars.len() {
        return Ok(Value::Nil);
    }
    let haystack: String = chars[from..].iter().collect();
    Ok(match haystack.find(needle) {
        Some(byte_idx) => {
            let char_idx = haystack[..byte_idx].chars().count();
            Value::Int((from + char_idx) as i64)
        }
        None => Value::Nil,
    })
}

pub fn last_index_of(_ctx: &mut RuntimeContext, args: &[Value]) -> EvalResult {
    expect_arity("last-index-of", args, 2)?;
    let s = as_str("last-index-of", &args[0])?;
    let needle = as_str("last-index-of", &args[1])?;
    Ok(match s.rfind(needle) {
        Some(byte_idx) => Value::Int(s[..byte_idx].chars().count() as i64),
        None => Value::Nil,
    })
}

/// `(char n)` from a code point, or the single char of a 1-char string.
pub fn char_op(_ctx: &mut RuntimeContext, args: &[Value]) -> EvalResult {
    expect_arity("char", args, 1)?;
    match &args[0] {
        Value::Char(c) => Ok(Value::Char(*c)),
        Value::Int(n) => u32::try_from(*n)
            .ok()
            .and_then(char::from_u32)
            .map(Value::Char)
            .ok_or_else(|| {
                RuntimeError::Type(format!("char: {} is not a valid code point", n))
            }),
        Value::Str(s) if s.chars().count() == 1 => {
            Ok(Value::Char(s.chars().next().expect("length checked")))
        }
        other => Err(RuntimeError::type_err("char", "code point or char", other)),
    }
}

/// Name part of an identifier or the string itself.
pub fn name(_ctx: &mut RuntimeContext, args: &[Value]) -> EvalResult {
    expect_arity("name", args, 1)?;
    match &args[0] {
        Value::Str(s) => Ok(Value::Str(s.clone())),
        Value::Keyword(id) | Value::Symbol(id) => Ok(Value::string(id.name.clone())),
        other => Err(RuntimeError::type_err("name", "string or ident", other)),
    }
}

/// Namespace part of an identifier, or nil.
pub fn namespace(_ctx: &mut RuntimeContext, args: &[Value]) -> EvalResult {
    expect_arity("namespace", args, 1)?;
    match &args[0] {
        Value::Keyword(id) | Value::Symbol(id) => Ok(id
            .ns
            .clone()
            .map(Value::string)
            .unwrap_or(Value::Nil)),
        other => Err(RuntimeError::type_err("namespace", "ident", other)),
    }
}

/// `(symbol name)` or `(symbol ns name)`.
pub fn symbol(_ctx: &mut RuntimeContext, args: &[Value]) -> EvalResult {
    expect_arity_range("symbol", args, 1, 2)?;
    match args {
        [Value::Symbol(id)] => Ok(Value::Symbol(id.clone())),
        [Value::Str(s)] => Ok(Value::symbol(s)),
        [Value::Keyword(id)] => Ok(Value::Symbol(id.clone())),
        [ns, name] => {
            let ns = as_str("symbol", ns)?;
            let name = as_str("symbol", name)?;
            Ok(Value::Symbol(Rc::new(Ident::qualified(ns, name))))
        }
        _ => Err(RuntimeError::type_err("symbol", "string or ident", &args[0])),
    }
}

/// `(keyword name)` or `(keyword ns name)`.
pub fn keyword(_ctx: &mut RuntimeContext, args: &[Value]) -> EvalResult {
    expect_arity_range("keyword", args, 1, 2)?;
    match args {
        [Value::Keyword(id)] => Ok(Value::Keyword(id.clone())),
        [Value::Symbol(id)] => Ok(Value::Keyword(id.clone())),
        [Value::Str(s)] => Ok(Value::keyword(s)),
        [ns, name] => {
            let ns = as_str("keyword", ns)?;
            let name = as_str("keyword", name)?;
            Ok(Value::Keyword(Rc::new(Ident::qualified(ns, name))))
        }
        _ => Err(RuntimeError::type_err("keyword", "string or ident", &args[0])),
    }
}

/// Fresh uninterned-looking symbol from the monotonic counter.
pub fn gensym(ctx: &mut RuntimeContext, args: &[Value]) -> EvalResult {
    expect_arity_range("gensym", args, 0, 1)?;
    let prefix = match args.first() {
        Some(v) => as_str("gensym", v)?.to_string(),
        None => "G__".to_string(),
    };
    Ok(Value::symbol(&format!("{}{}", prefix, ctx.next_gensym_id())))
}

pub fn parse_long(_ctx: &mut RuntimeContext, args: &[Value]) -> EvalResult {
    expect_arity("parse-long", args, 1)?;
    let s = as_str("parse-long", &args[0])?;
    Ok(s.trim()
        .parse::<i64>()
        .map(Value::Int)
        .unwrap_or(Value::Nil))
}

pub fn parse_double(_ctx: &mut RuntimeContext, args: &[Value]) -> EvalResult {
    expect_arity("parse-double", args, 1)?;
    let s = as_str("parse-double", &args[0])?;
    Ok(s.trim()
        .parse::<f64>()
        .map(Value::Float)
        .unwrap_or(Value::Nil))
}

pub fn parse_boolean(_ctx: &mut RuntimeContext, args: &[Value]) -> EvalResult {
    expect_arity("parse-boolean", args, 1)?;
    match as_str("parse-boolean", &args[0])?.trim() {
        "true" => Ok(Value::Bool(true)),
        "false" => Ok(Value::Bool(false)),
        _ => Ok(Value::Nil),
    }
}

/// printf-style formatting: `%s` (display form), `%d`, `%f`, `%%`.
pub fn format(_ctx: &mut RuntimeContext, args: &[Value]) -> EvalResult {
    expect_min_arity("format", args, 1)?;
    let spec = as_str("format", &args[0])?;
    let mut out = String::new();
    let mut next_arg = 1;
    let mut chars = spec.chars().peekable();
    while let Some(c) = chars.next() {
        if c != '%' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('%') => out.push('%'),
            Some('s') => {
                let v = args.get(next_arg).ok_or_else(|| {
                    RuntimeError::Arity("format: too few arguments for directives".to_string())
                })?;
                out.push_str(&printer::display_str(v));
                next_arg += 1;
            }
            Some('d') => {
                let v = args.get(next_arg).ok_or_else(|| {
                    RuntimeError::Arity("format: too few arguments for directives".to_string())
                })?;
                let n = v
                    .as_int()
                    .ok_or_else(|| RuntimeError::type_err("format %d", "integer", v))?;
                out.push_str(&n.to_string());
                next_arg += 1;
            }
            Some('f') => {
                let v = args.get(next_arg).ok_or_else(|| {
                    RuntimeError::Arity("format: too few arguments for directives".to_string())
                })?;
                let f = match v {
                    Value::Int(n) => *n as f64,
                    Value::Float(f) => *f,
                    other => return Err(RuntimeError::type_err("format %f", "number", other)),
                };
                out.push_str(&std::format!("{:.6}", f));
                next_arg += 1;
            }
            Some(other) => {
                return Err(RuntimeError::Type(format!(
                    "format: unsupported directive %{}",
                    other
                )));
            }
            None => {
                return Err(RuntimeError::Type(
                    "format: dangling % at end of format string".to_string(),
                ));
            }
        }
    }
    Ok(Value::string(out))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn s(v: &str) -> Value {
        Value::string(v)
    }

    #[test]
    fn test_str_concatenates_display_forms() {
        let mut ctx = RuntimeContext::new();
        let out = str_op(
            &mut ctx,
            &[s("n="), Value::Int(3), Value::Nil, Value::keyword("k")],
        )
        .unwrap();
        assert_eq!(out, s("n=3:k"));
        assert_eq!(str_op(&mut ctx, &[]).unwrap(), s(""));
    }

    #[test]
    fn test_subs_is_code_point_based() {
        let mut ctx = RuntimeContext::new();
        assert_eq!(
            subs(&mut ctx, &[s("héllo"), Value::Int(1), Value::Int(3)]).unwrap(),
            s("él")
        );
        assert_eq!(subs(&mut ctx, &[s("abc"), Value::Int(1)]).unwrap(), s("bc"));
        assert!(subs(&mut ctx, &[s("abc"), Value::Int(2), Value::Int(9)]).is_err());
    }

    #[test]
    fn test_case_and_trim() {
        let mut ctx = RuntimeContext::new();
        assert_eq!(upper_case(&mut ctx, &[s("ab")]).unwrap(), s("AB"));
        assert_eq!(capitalize(&mut ctx, &[s("hELLO")]).unwrap(), s("Hello"));
        assert_eq!(trim(&mut ctx, &[s("  x ")]).unwrap(), s("x"));
        assert_eq!(triml(&mut ctx, &[s("  x ")]).unwrap(), s("x "));
        assert_eq!(trimr(&mut ctx, &[s("  x ")]).unwrap(), s("  x"));
        assert_eq!(blank_p(&mut ctx, &[s(" \t")]).unwrap(), Value::Bool(true));
        assert_eq!(blank_p(&mut ctx, &[Value::Nil]).unwrap(), Value::Bool(true));
    }

    #[test]
    fn test_split_and_join() {
        let mut ctx = RuntimeContext::new();
        let pieces = split(&mut ctx, &[s("a,b,c"), s(",")]).unwrap();
        assert_eq!(
            pieces,
            Value::vector_from_vec(vec![s("a"), s("b"), s("c")])
        );
        let joined = join(&mut ctx, &[s("-"), pieces]).unwrap();
        assert_eq!(joined, s("a-b-c"));
    }

    #[test]
    fn test_replace() {
        let mut ctx = RuntimeContext::new();
        assert_eq!(
            replace(&mut ctx, &[s("aaa"), s("a"), s("b")]).unwrap(),
            s("bbb")
        );
        assert_eq!(
            replace_first(&mut ctx, &[s("aaa"), s("a"), s("b")]).unwrap(),
            s("baa")
        );
    }

    #[test]
    fn test_search_predicates() {
        let mut ctx = RuntimeContext::new();
        assert_eq!(includes_p(&mut ctx, &[s("abc"), s("b")]).unwrap(), Value::Bool(true));
        assert_eq!(
            starts_with_p(&mut ctx, &[s("abc"), s("ab")]).unwrap(),
            Value::Bool(true)
        );
        assert_eq!(
            ends_with_p(&mut ctx, &[s("abc"), s("bc")]).unwrap(),
            Value::Bool(true)
        );
        assert_eq!(index_of(&mut ctx, &[s("héllo"), s("llo")]).unwrap(), Value::Int(2));
        assert_eq!(index_of(&mut ctx, &[s("abc"), s("z")]).unwrap(), Value::Nil);
    }

    #[test]
    fn test_identifier_builtins() {
        let mut ctx = RuntimeContext::new();
        assert_eq!(name(&mut ctx, &[Value::keyword("ns/k")]).unwrap(), s("k"));
        assert_eq!(namespace(&mut ctx, &[Value::keyword("ns/k")]).unwrap(), s("ns"));
        assert_eq!(namespace(&mut ctx, &[Value::symbol("plain")]).unwrap(), Value::Nil);
        assert_eq!(
            symbol(&mut ctx, &[s("a"), s("b")]).unwrap(),
            Value::symbol("a/b")
        );
        assert_eq!(keyword(&mut ctx, &[s("x")]).unwrap(), Value::keyword("x"));
        assert_eq!(
            keyword(&mut ctx, &[Value::symbol("y")]).unwrap(),
            Value::keyword("y")
        );
    }

    #[test]
    fn test_gensym_uniqueness() {
        let mut ctx = RuntimeContext::new();
        let a = gensym(&mut ctx, &[]).unwrap();
        let b = gensym(&mut ctx, &[]).unwrap();
        assert_ne!(a, b);
        let named = gensym(&mut ctx, &[s("tmp")]).unwrap();
        assert!(
            named
                .as_ident()
                .map(|id| id.name.starts_with("tmp"))
                .unwrap_or(false)
        );
    }

    #[test]
    fn test_parse_family_returns_nil_on_failure() {
        let mut ctx = RuntimeContext::new();
        assert_eq!(parse_long(&mut ctx, &[s("42")]).unwrap(), Value::Int(42));
        assert_eq!(parse_long(&mut ctx, &[s("nope")]).unwrap(), Value::Nil);
        assert_eq!(parse_double(&mut ctx, &[s("1.5")]).unwrap(), Value::Float(1.5));
        assert_eq!(parse_boolean(&mut ctx, &[s("true")]).unwrap(), Value::Bool(true));
        assert_eq!(parse_boolean(&mut ctx, &[s("yes")]).unwrap(), Value::Nil);
    }

    #[test]
    fn test_format_directives() {
        let mut ctx = RuntimeContext::new();
        let out = format(
            &mut ctx,
            &[s("%s has %d%% of %f"), s("x"), Value::Int(3), Value::Float(0.5)],
        )
        .unwrap();
        assert_eq!(out, s("x has 3% of 0.500000"));
        assert!(format(&mut ctx, &[s("%d"), s("not-int")]).is_err());
        assert!(format(&mut ctx, &[s("%d")]).is_err());
    }
}
