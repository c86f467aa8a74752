//! Textual forms of values
//!
//! Two renderings, as in any Lisp: the readable `pr` form (strings
//! quoted and escaped, chars as `\a`) and the human `display` form
//! (strings raw). Collections render their elements in `pr` form in
//! both cases, matching Clojure.
//!
//! Lazy sequences are NOT forced here - the printer has no runtime
//! context. The io builtins realize sequences before printing; an
//! unrealized cell renders as an opaque handle.

use crate::lazy::LazyRepr;
use crate::value::Value;

/// Readable form.
pub fn pr_str(v: &Value) -> String {
    let mut out = String::new();
    write_value(&mut out, v, true);
    out
}

/// Human form: top-level strings and chars print raw.
pub fn display_str(v: &Value) -> String {
    let mut out = String::new();
    write_value(&mut out, v, false);
    out
}

/// `pr` forms of several values joined by single spaces.
pub fn pr_join(vals: &[Value]) -> String {
    vals.iter().map(pr_str).collect::<Vec<_>>().join(" ")
}

/// display forms of several values joined by single spaces.
pub fn display_join(vals: &[Value]) -> String {
    vals.iter().map(display_str).collect::<Vec<_>>().join(" ")
}

fn write_value(out: &mut String, v: &Value, readable: bool) {
    match v {
        Value::Nil => out.push_str("nil"),
        Value::Bool(b) => out.push_str(if *b { "true" } else { "false" }),
        Value::Int(n) => out.push_str(&n.to_string()),
        Value::Float(f) => out.push_str(&format_float(*f)),
        Value::Char(c) => {
            if readable {
                write_char(out, *c);
            } else {
                out.push(*c);
            }
        }
        Value::Str(s) => {
            if readable {
                write_string(out, s);
            } else {
                out.push_str(s);
            }
        }
        Value::Keyword(id) => {
            out.push(':');
            out.push_str(&id.to_string());
        }
        Value::Symbol(id) => out.push_str(&id.to_string()),
        Value::List(l) => {
            out.push('(');
            let mut first = true;
            for item in l.items.iter() {
                if !first {
                    out.push(' ');
                }
                write_value(out, item, true);
                first = false;
            }
            out.push(')');
        }
        Value::Vector(vec) => {
            out.push('[');
            for (i, item) in vec.items.iter().enumerate() {
                if i > 0 {
                    out.push(' ');
                }
                write_value(out, item, true);
            }
            out.push(']');
        }
        Value::Map(m) => {
            out.push('{');
            for (i, (k, val)) in m.entries.iter().enumerate() {
                if i > 0 {
                    out.push_str(", ");
                }
                write_value(out, k, true);
                out.push(' ');
                write_value(out, val, true);
            }
            out.push('}');
        }
        Value::Set(s) => {
            out.push_str("#{");
            for (i, item) in s.items.iter().enumerate() {
                if i > 0 {
                    out.push(' ');
                }
                write_value(out, item, true);
            }
            out.push('}');
        }
        Value::Fn(f) => {
            out.push_str("#function[");
            out.push_str(f.name.as_deref().unwrap_or("anonymous"));
            out.push(']');
        }
        Value::PartialFn(_) => out.push_str("#function[partial]"),
        Value::CompFn(_) => out.push_str("#function[comp]"),
        Value::MultiFn(m) => {
            out.push_str("#multifn[");
            out.push_str(&m.name);
            out.push(']');
        }
        Value::ProtocolFn(p) => {
            out.push_str("#function[");
            out.push_str(&p.protocol.name);
            out.push('/');
            out.push_str(&p.name);
            out.push(']');
        }
        Value::Protocol(p) => {
            out.push_str("#protocol[");
            out.push_str(&p.name);
            out.push(']');
        }
        Value::FnProto(p) => {
            out.push_str("#fn-proto[");
            out.push_str(&p.name);
            out.push(']');
        }
        Value::Atom(a) => {
            out.push_str("#atom[");
            write_value(out, &a.value.borrow(), true);
            out.push(']');
        }
        Value::Volatile(cell) => {
            out.push_str("#volatile[");
            write_value(out, &cell.value.borrow(), true);
            out.push(']');
        }
        Value::Delay(d) => {
            match &*d.value.borrow() {
                Some(val) => {
                    out.push_str("#delay[");
                    write_value(out, val, true);
                    out.push(']');
                }
                None => out.push_str("#delay[pending]"),
            }
        }
        Value::Promise(p) => {
            match &*p.value.borrow() {
                Some(val) => {
                    out.push_str("#promise[");
                    write_value(out, val, true);
                    out.push(']');
                }
                None => out.push_str("#promise[pending]"),
            }
        }
        Value::Reduced(inner) => {
            out.push_str("#reduced[");
            write_value(out, inner, true);
            out.push(']');
        }
        Value::LazySeq(cell) => {
            // Render what is already known without forcing anything.
            match &*cell.repr.borrow() {
                LazyRepr::Realized(v) => write_value(out, v, true),
                _ => out.push_str("#lazy-seq[...]"),
            }
        }
        Value::Var(var) => {
            out.push_str("#'");
            out.push_str(&var.ns);
            out.push('/');
            out.push_str(&var.sym);
        }
        Value::WasmModule(m) => {
            out.push_str("#wasm-module[");
            out.push_str(&m.name);
            out.push(']');
        }
        Value::Regex(re) => {
            out.push_str("#\"");
            out.push_str(re.as_str());
            out.push('"');
        }
    }
}

fn write_string(out: &mut String, s: &str) {
    out.push('"');
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            '\r' => out.push_str("\\r"),
            _ => out.push(c),
        }
    }
    out.push('"');
}

fn write_char(out: &mut String, c: char) {
    match c {
        '\n' => out.push_str("\\newline"),
        '\t' => out.push_str("\\tab"),
        ' ' => out.push_str("\\space"),
        '\r' => out.push_str("\\return"),
        _ => {
            out.push('\\');
            out.push(c);
        }
    }
}

/// Floats always render with a decimal point (or exponent) so they
/// read back as floats.
fn format_float(f: f64) -> String {
    if f.is_nan() {
        return "##NaN".to_string();
    }
    if f.is_infinite() {
        return if f > 0.0 { "##Inf" } else { "##-Inf" }.to_string();
    }
    let s = f.to_string();
    if s.contains('.') || s.contains('e') || s.contains('E') {
        s
    } else {
        format!("{}.0", s)
    }
}
