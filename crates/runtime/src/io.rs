//! Print family and output capture
//!
//! Every textual write funnels through the context's single choke
//! point: the capture buffer when one is installed, the host's stdout
//! otherwise. `pr`/`prn` emit readable forms, `print`/`println`
//! display forms. Lazy sequences are realized before printing -
//! printing an infinite sequence is the caller's lookout.

use crate::context::RuntimeContext;
use crate::error::{RuntimeError, expect_arity, expect_min_arity};
use crate::lazy;
use crate::printer;
use crate::string_ops;
use crate::value::{EvalResult, Value};

/// Realize top-level lazy seqs so they print as their elements.
fn printable(ctx: &mut RuntimeContext, v: &Value) -> EvalResult {
    match v {
        Value::LazySeq(_) => Ok(Value::list_from_vec(lazy::realize_all(ctx, v)?)),
        other => Ok(other.clone()),
    }
}

fn printables(ctx: &mut RuntimeContext, args: &[Value]) -> Result<Vec<Value>, RuntimeError> {
    args.iter().map(|v| printable(ctx, v)).collect()
}

pub fn pr(ctx: &mut RuntimeContext, args: &[Value]) -> EvalResult {
    let vals = printables(ctx, args)?;
    let text = printer::pr_join(&vals);
    ctx.write_output(&text);
    Ok(Value::Nil)
}

pub fn prn(ctx: &mut RuntimeContext, args: &[Value]) -> EvalResult {
    pr(ctx, args)?;
    ctx.write_output("\n");
    Ok(Value::Nil)
}

pub fn print(ctx: &mut RuntimeContext, args: &[Value]) -> EvalResult {
    let vals = printables(ctx, args)?;
    let text = printer::display_join(&vals);
    ctx.write_output(&text);
    Ok(Value::Nil)
}

pub fn println(ctx: &mut RuntimeContext, args: &[Value]) -> EvalResult {
    print(ctx, args)?;
    ctx.write_output("\n");
    Ok(Value::Nil)
}

pub fn newline(ctx: &mut RuntimeContext, args: &[Value]) -> EvalResult {
    expect_arity("newline", args, 0)?;
    ctx.write_output("\n");
    Ok(Value::Nil)
}

/// Format then write; no trailing newline.
pub fn printf(ctx: &mut RuntimeContext, args: &[Value]) -> EvalResult {
    expect_min_arity("printf", args, 1)?;
    let formatted = string_ops::format(ctx, args)?;
    let text = formatted
        .as_str()
        .expect("format always yields a string")
        .to_string();
    ctx.write_output(&text);
    Ok(Value::Nil)
}

pub fn flush(ctx: &mut RuntimeContext, args: &[Value]) -> EvalResult {
    expect_arity("flush", args, 0)?;
    ctx.flush_output();
    Ok(Value::Nil)
}

pub fn pr_str(ctx: &mut RuntimeContext, args: &[Value]) -> EvalResult {
    let vals = printables(ctx, args)?;
    Ok(Value::string(printer::pr_join(&vals)))
}

pub fn prn_str(ctx: &mut RuntimeContext, args: &[Value]) -> EvalResult {
    let vals = printables(ctx, args)?;
    Ok(Value::string(format!("{}\n", printer::pr_join(&vals))))
}

pub fn print_str(ctx: &mut RuntimeContext, args: &[Value]) -> EvalResult {
    let vals = printables(ctx, args)?;
    Ok(Value::string(printer::display_join(&vals)))
}

pub fn println_str(ctx: &mut RuntimeContext, args: &[Value]) -> EvalResult {
    let vals = printables(ctx, args)?;
    Ok(Value::string(format!("{}\n", printer::display_join(&vals))))
}

/// Read a whole file as a string.
pub fn slurp(_ctx: &mut RuntimeContext, args: &[Value]) -> EvalResult {
    expect_arity("slurp", args, 1)?;
    let path = args[0]
        .as_str()
        .ok_or_else(|| RuntimeError::type_err("slurp", "path string", &args[0]))?;
    std::fs::read_to_string(path)
        .map(Value::string)
        .map_err(|e| RuntimeError::IllegalState(format!("slurp: {}: {}", path, e)))
}

/// Write a value's display form to a file, replacing its contents.
pub fn spit(_ctx: &mut RuntimeContext, args: &[Value]) -> EvalResult {
    expect_arity("spit", args, 2)?;
    let path = args[0]
        .as_str()
        .ok_or_else(|| RuntimeError::type_err("spit", "path string", &args[0]))?;
    let content = printer::display_str(&args[1]);
    std::fs::write(path, content)
        .map(|_| Value::Nil)
        .map_err(|e| RuntimeError::IllegalState(format!("spit: {}: {}", path, e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lazy::LazySeqCell;

    fn captured(ctx: &mut RuntimeContext) -> String {
        ctx.take_output_capture().unwrap_or_default()
    }

    #[test]
    fn test_print_vs_pr_strings() {
        let mut ctx = RuntimeContext::new();
        ctx.install_output_capture();
        print(&mut ctx, &[Value::string("a"), Value::Int(1)]).unwrap();
        assert_eq!(captured(&mut ctx), "a 1");

        ctx.install_output_capture();
        pr(&mut ctx, &[Value::string("a"), Value::Int(1)]).unwrap();
        assert_eq!(captured(&mut ctx), "\"a\" 1");
    }

    #[test]
    fn test_println_and_newline() {
        let mut ctx = RuntimeContext::new();
        ctx.install_output_capture();
        println(&mut ctx, &[Value::keyword("once")]).unwrap();
        newline(&mut ctx, &[]).unwrap();
        assert_eq!(captured(&mut ctx), ":once\n\n");
    }

    #[test]
    fn test_prn_realizes_lazy_seq() {
        let mut ctx = RuntimeContext::new();
        ctx.install_output_capture();
        let taken = LazySeqCell::take(LazySeqCell::range_from(0, 1), 3);
        prn(&mut ctx, &[taken]).unwrap();
        assert_eq!(captured(&mut ctx), "(0 1 2)\n");
    }

    #[test]
    fn test_printf() {
        let mut ctx = RuntimeContext::new();
        ctx.install_output_capture();
        printf(&mut ctx, &[Value::string("%s=%d"), Value::string("n"), Value::Int(3)]).unwrap();
        assert_eq!(captured(&mut ctx), "n=3");
    }

    #[test]
    fn test_string_builders() {
        let mut ctx = RuntimeContext::new();
        assert_eq!(
            pr_str(&mut ctx, &[Value::string("x")]).unwrap(),
            Value::string("\"x\"")
        );
        assert_eq!(
            println_str(&mut ctx, &[Value::Int(1), Value::Int(2)]).unwrap(),
            Value::string("1 2\n")
        );
    }

    #[test]
    fn test_slurp_spit_round_trip() {
        let mut ctx = RuntimeContext::new();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("note.txt");
        let path_v = Value::string(path.to_string_lossy().to_string());
        spit(&mut ctx, &[path_v.clone(), Value::string("hello")]).unwrap();
        assert_eq!(slurp(&mut ctx, &[path_v]).unwrap(), Value::string("hello"));

        assert!(slurp(&mut ctx, &[Value::string("/no/such/file")]).is_err());
    }
}
