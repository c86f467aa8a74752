//! Namespace commands and Var builtins
//!
//! `require`/`use`/`refer`/`alias`/`in-ns`/`load-file` plus the ns-*
//! introspection family and the Var binding operators. Namespaces have
//! no value variant of their own; commands accept and return namespace
//! symbols (or strings).
//!
//! File loading resolves `a.b.c` against the classpath roots in order,
//! probing `a/b/c.clj` then `a/b/c.cljc` - dots separate segments,
//! hyphens are preserved, nothing else is rewritten. Loaded text is
//! handed to the host's eval hook; the loaded-libs set short-circuits
//! repeat requires unless a reload flag is given.

use crate::context::RuntimeContext;
use crate::error::{RuntimeError, expect_arity, expect_arity_range, expect_min_arity};
use crate::lazy;
use crate::namespace::{Namespace, RootRestoreGuard, Var};
use crate::value::{EvalResult, Value};
use std::path::PathBuf;
use std::rc::Rc;
use tracing::debug;

fn ns_name_of(op: &str, v: &Value) -> Result<String, RuntimeError> {
    match v {
        Value::Symbol(id) => Ok(id.to_string()),
        Value::Str(s) => Ok(s.to_string()),
        other => Err(RuntimeError::type_err(op, "namespace symbol or string", other)),
    }
}

fn get_ns(ctx: &RuntimeContext, op: &str, v: &Value) -> Result<Rc<Namespace>, RuntimeError> {
    let name = ns_name_of(op, v)?;
    ctx.env
        .find_ns(&name)
        .ok_or_else(|| RuntimeError::IllegalState(format!("{}: no namespace {}", op, name)))
}

fn var_map(entries: Vec<(String, Rc<Var>)>) -> Value {
    Value::map_from_pairs(
        entries
            .into_iter()
            .map(|(sym, var)| (Value::symbol(&sym), Value::Var(var)))
            .collect(),
    )
}

// Introspection

pub fn find_ns(ctx: &mut RuntimeContext, args: &[Value]) -> EvalResult {
    expect_arity("find-ns", args, 1)?;
    let name = ns_name_of("find-ns", &args[0])?;
    Ok(match ctx.env.find_ns(&name) {
        Some(ns) => Value::symbol(ns.name()),
        None => Value::Nil,
    })
}

pub fn create_ns(ctx: &mut RuntimeContext, args: &[Value]) -> EvalResult {
    expect_arity("create-ns", args, 1)?;
    let name = ns_name_of("create-ns", &args[0])?;
    Ok(Value::symbol(ctx.env.ensure_ns(&name).name()))
}

pub fn remove_ns(ctx: &mut RuntimeContext, args: &[Value]) -> EvalResult {
    expect_arity("remove-ns", args, 1)?;
    let name = ns_name_of("remove-ns", &args[0])?;
    ctx.env.remove_ns(&name)?;
    Ok(Value::Nil)
}

pub fn all_ns(ctx: &mut RuntimeContext, args: &[Value]) -> EvalResult {
    expect_arity("all-ns", args, 0)?;
    Ok(Value::list_from_vec(
        ctx.env
            .all_ns()
            .iter()
            .map(|ns| Value::symbol(ns.name()))
            .collect(),
    ))
}

pub fn ns_name(ctx: &mut RuntimeContext, args: &[Value]) -> EvalResult {
    expect_arity("ns-name", args, 1)?;
    Ok(Value::symbol(get_ns(ctx, "ns-name", &args[0])?.name()))
}

/// Public interned Vars only.
pub fn ns_publics(ctx: &mut RuntimeContext, args: &[Value]) -> EvalResult {
    expect_arity("ns-publics", args, 1)?;
    Ok(var_map(get_ns(ctx, "ns-publics", &args[0])?.publics_snapshot()))
}

pub fn ns_interns(ctx: &mut RuntimeContext, args: &[Value]) -> EvalResult {
    expect_arity("ns-interns", args, 1)?;
    Ok(var_map(get_ns(ctx, "ns-interns", &args[0])?.interns_snapshot()))
}

/// Interns plus refers - the namespace's full symbol map.
pub fn ns_map(ctx: &mut RuntimeContext, args: &[Value]) -> EvalResult {
    expect_arity("ns-map", args, 1)?;
    let ns = get_ns(ctx, "ns-map", &args[0])?;
    let mut entries = ns.refers_snapshot();
    entries.extend(ns.interns_snapshot());
    Ok(var_map(entries))
}

pub fn ns_refers(ctx: &mut RuntimeContext, args: &[Value]) -> EvalResult {
    expect_arity("ns-refers", args, 1)?;
    Ok(var_map(get_ns(ctx, "ns-refers", &args[0])?.refers_snapshot()))
}

pub fn ns_aliases(ctx: &mut RuntimeContext, args: &[Value]) -> EvalResult {
    expect_arity("ns-aliases", args, 1)?;
    let ns = get_ns(ctx, "ns-aliases", &args[0])?;
    Ok(Value::map_from_pairs(
        ns.aliases_snapshot()
            .into_iter()
            .map(|(short, target)| (Value::symbol(&short), Value::symbol(&target)))
            .collect(),
    ))
}

/// Resolve a symbol in an explicit namespace.
pub fn ns_resolve(ctx: &mut RuntimeContext, args: &[Value]) -> EvalResult {
    expect_arity("ns-resolve", args, 2)?;
    let ns = get_ns(ctx, "ns-resolve", &args[0])?;
    let sym = match &args[1] {
        Value::Symbol(id) => id.clone(),
        other => return Err(RuntimeError::type_err("ns-resolve", "symbol", other)),
    };
    let var = match &sym.ns {
        Some(qualifier) => {
            let target = ns.alias_target(qualifier).unwrap_or_else(|| qualifier.clone());
            ctx.env.find_ns(&target).and_then(|n| n.lookup(&sym.name))
        }
        None => ns.lookup(&sym.name),
    };
    Ok(var.map(Value::Var).unwrap_or(Value::Nil))
}

/// Resolve in the current namespace (falling back to the core ns).
pub fn resolve(ctx: &mut RuntimeContext, args: &[Value]) -> EvalResult {
    expect_arity("resolve", args, 1)?;
    let name = match &args[0] {
        Value::Symbol(id) => id.to_string(),
        other => return Err(RuntimeError::type_err("resolve", "symbol", other)),
    };
    Ok(ctx.resolve(&name).map(Value::Var).unwrap_or(Value::Nil))
}

pub fn ns_unmap(ctx: &mut RuntimeContext, args: &[Value]) -> EvalResult {
    expect_arity("ns-unmap", args, 2)?;
    let ns = get_ns(ctx, "ns-unmap", &args[0])?;
    let sym = ns_name_of("ns-unmap", &args[1])?;
    ns.unmap(&sym);
    Ok(Value::Nil)
}

pub fn ns_unalias(ctx: &mut RuntimeContext, args: &[Value]) -> EvalResult {
    expect_arity("ns-unalias", args, 2)?;
    let ns = get_ns(ctx, "ns-unalias", &args[0])?;
    let short = ns_name_of("ns-unalias", &args[1])?;
    ns.remove_alias(&short);
    Ok(Value::Nil)
}

/// `(intern ns sym)` / `(intern ns sym val)`.
pub fn intern(ctx: &mut RuntimeContext, args: &[Value]) -> EvalResult {
    expect_arity_range("intern", args, 2, 3)?;
    let ns = ctx.env.ensure_ns(&ns_name_of("intern", &args[0])?);
    let sym = ns_name_of("intern", &args[1])?;
    let var = match args.get(2) {
        Some(val) => ns.intern_with_root(&sym, val.clone()),
        None => ns.intern(&sym),
    };
    Ok(Value::Var(var))
}

// refer / alias / in-ns

fn symbol_names(ctx: &mut RuntimeContext, op: &str, v: &Value) -> Result<Vec<String>, RuntimeError> {
    lazy::realize_all(ctx, v)?
        .iter()
        .map(|s| ns_name_of(op, s))
        .collect()
}

/// `(refer src-ns :only [...] :exclude [...] :rename {...})` - copy
/// the source namespace's public mappings into the current namespace.
pub fn refer(ctx: &mut RuntimeContext, args: &[Value]) -> EvalResult {
    expect_min_arity("refer", args, 1)?;
    let src = get_ns(ctx, "refer", &args[0])?;

    let mut only: Option<Vec<String>> = None;
    let mut exclude: Vec<String> = Vec::new();
    let mut rename: Vec<(String, String)> = Vec::new();
    let mut rest = &args[1..];
    while !rest.is_empty() {
        let flag = match &rest[0] {
            Value::Keyword(id) => id.name.clone(),
            other => return Err(RuntimeError::type_err("refer", "option keyword", other)),
        };
        let value = rest.get(1).ok_or_else(|| {
            RuntimeError::Arity(format!("refer: missing value for :{}", flag))
        })?;
        match flag.as_str() {
            "only" => only = Some(symbol_names(ctx, "refer", value)?),
            "exclude" => exclude = symbol_names(ctx, "refer", value)?,
            "rename" => match value {
                Value::Map(m) => {
                    for (from, to) in m.entries.iter() {
                        rename.push((ns_name_of("refer", from)?, ns_name_of("refer", to)?));
                    }
                }
                other => return Err(RuntimeError::type_err("refer", "rename map", other)),
            },
            other => {
                return Err(RuntimeError::IllegalState(format!(
                    "refer: unknown option :{}",
                    other
                )));
            }
        }
        rest = &rest[2..];
    }

    let current = ctx.current_ns();
    for (sym, var) in src.publics_snapshot() {
        if let Some(only) = &only {
            if !only.contains(&sym) {
                continue;
            }
        }
        if exclude.contains(&sym) {
            continue;
        }
        let local = rename
            .iter()
            .find(|(from, _)| *from == sym)
            .map(|(_, to)| to.clone())
            .unwrap_or(sym);
        current.refer(&local, var);
    }
    Ok(Value::Nil)
}

/// Register a short alias for another namespace in the current one.
pub fn alias(ctx: &mut RuntimeContext, args: &[Value]) -> EvalResult {
    expect_arity("alias", args, 2)?;
    let short = ns_name_of("alias", &args[0])?;
    let target = get_ns(ctx, "alias", &args[1])?;
    ctx.current_ns().add_alias(&short, target.name());
    Ok(Value::Nil)
}

/// Switch the current namespace, creating it if missing.
pub fn in_ns(ctx: &mut RuntimeContext, args: &[Value]) -> EvalResult {
    expect_arity("in-ns", args, 1)?;
    let name = ns_name_of("in-ns", &args[0])?;
    ctx.env.ensure_ns(&name);
    ctx.current_ns = name.clone();
    Ok(Value::symbol(&name))
}

// Loading

/// `a.b-c.d` -> `a/b-c/d`; dots split, hyphens survive.
fn lib_relative_path(lib: &str) -> PathBuf {
    let mut path = PathBuf::new();
    for segment in lib.split('.') {
        path.push(segment);
    }
    path
}

fn load_lib(ctx: &mut RuntimeContext, lib: &str, reload: bool) -> Result<(), RuntimeError> {
    if !reload && ctx.is_lib_loaded(lib) {
        debug!(lib, "require: already loaded, skipping");
        return Ok(());
    }
    let rel = lib_relative_path(lib);
    for root in ctx.classpath().to_vec() {
        for ext in ["clj", "cljc"] {
            let candidate = root.join(&rel).with_extension(ext);
            if candidate.is_file() {
                debug!(lib, path = %candidate.display(), "require: loading");
                let source = std::fs::read_to_string(&candidate).map_err(|e| {
                    RuntimeError::IllegalState(format!(
                        "require: cannot read {}: {}",
                        candidate.display(),
                        e
                    ))
                })?;
                // The loaded file may in-ns; the caller's namespace is
                // restored either way.
                let saved_ns = ctx.current_ns.clone();
                let result = ctx.eval_source(&source, &candidate.display().to_string());
                ctx.current_ns = saved_ns;
                result?;
                ctx.mark_lib_loaded(lib);
                return Ok(());
            }
        }
    }
    Err(RuntimeError::IllegalState(format!(
        "require: could not locate {} on the classpath",
        lib
    )))
}

struct LibSpec {
    lib: String,
    alias: Option<String>,
    refer_all: bool,
    refer_syms: Vec<String>,
}

fn parse_lib_spec(ctx: &mut RuntimeContext, spec: &Value) -> Result<LibSpec, RuntimeError> {
    match spec {
        Value::Symbol(_) | Value::Str(_) => Ok(LibSpec {
            lib: ns_name_of("require", spec)?,
            alias: None,
            refer_all: false,
            refer_syms: Vec::new(),
        }),
        Value::Vector(v) => {
            let items = v.items.to_vec();
            if items.is_empty() {
                return Err(RuntimeError::Arity(
                    "require: empty lib spec vector".to_string(),
                ));
            }
            let mut out = LibSpec {
                lib: ns_name_of("require", &items[0])?,
                alias: None,
                refer_all: false,
                refer_syms: Vec::new(),
            };
            let mut rest = &items[1..];
            while !rest.is_empty() {
                let flag = match &rest[0] {
                    Value::Keyword(id) => id.name.clone(),
                    other => {
                        return Err(RuntimeError::type_err("require", "option keyword", other));
                    }
                };
                let value = rest.get(1).ok_or_else(|| {
                    RuntimeError::Arity(format!("require: missing value for :{}", flag))
                })?;
                match flag.as_str() {
                    "as" => out.alias = Some(ns_name_of("require", value)?),
                    "refer" => match value {
                        Value::Keyword(id) if id.name == "all" => out.refer_all = true,
                        coll => out.refer_syms = symbol_names(ctx, "require", coll)?,
                    },
                    other => {
                        return Err(RuntimeError::IllegalState(format!(
                            "require: unknown option :{}",
                            other
                        )));
                    }
                }
                rest = &rest[2..];
            }
            Ok(out)
        }
        other => Err(RuntimeError::type_err("require", "lib spec", other)),
    }
}

/// `(require lib ...)` with `:reload`/`:reload-all` flags and vector
/// specs carrying `:as` and `:refer`.
pub fn require(ctx: &mut RuntimeContext, args: &[Value]) -> EvalResult {
    expect_min_arity("require", args, 1)?;
    let mut reload = false;
    let mut specs = Vec::new();
    for arg in args {
        match arg {
            Value::Keyword(id) if id.name == "reload" || id.name == "reload-all" => {
                reload = true;
            }
            other => specs.push(other.clone()),
        }
    }
    for spec in &specs {
        let parsed = parse_lib_spec(ctx, spec)?;
        load_lib(ctx, &parsed.lib, reload)?;
        if let Some(short) = &parsed.alias {
            let target = ctx.env.ensure_ns(&parsed.lib);
            ctx.current_ns().add_alias(short, target.name());
        }
        if parsed.refer_all {
            refer(ctx, &[Value::symbol(&parsed.lib)])?;
        } else if !parsed.refer_syms.is_empty() {
            let only = Value::vector_from_vec(
                parsed.refer_syms.iter().map(|s| Value::symbol(s)).collect(),
            );
            refer(ctx, &[Value::symbol(&parsed.lib), Value::keyword("only"), only])?;
        }
    }
    Ok(Value::Nil)
}

/// `use` = require + refer :all, optionally narrowed by `:only`.
pub fn use_op(ctx: &mut RuntimeContext, args: &[Value]) -> EvalResult {
    expect_min_arity("use", args, 1)?;
    let lib = ns_name_of("use", &args[0])?;
    load_lib(ctx, &lib, false)?;
    let mut refer_args = vec![Value::symbol(&lib)];
    refer_args.extend_from_slice(&args[1..]);
    refer(ctx, &refer_args)
}

/// Evaluate one file by path, no classpath resolution, no loaded-libs
/// bookkeeping.
pub fn load_file(ctx: &mut RuntimeContext, args: &[Value]) -> EvalResult {
    expect_arity("load-file", args, 1)?;
    let path = args[0]
        .as_str()
        .ok_or_else(|| RuntimeError::type_err("load-file", "path string", &args[0]))?;
    let source = std::fs::read_to_string(path).map_err(|e| {
        RuntimeError::IllegalState(format!("load-file: cannot read {}: {}", path, e))
    })?;
    let saved_ns = ctx.current_ns.clone();
    let result = ctx.eval_source(&source, path);
    ctx.current_ns = saved_ns;
    result
}

pub fn loaded_libs(ctx: &mut RuntimeContext, args: &[Value]) -> EvalResult {
    expect_arity("loaded-libs", args, 0)?;
    Ok(Value::list_from_vec(
        ctx.loaded_libs().map(Value::symbol).collect(),
    ))
}

// Var binding operators

fn as_var(op: &str, v: &Value) -> Result<Rc<Var>, RuntimeError> {
    match v {
        Value::Var(var) => Ok(var.clone()),
        other => Err(RuntimeError::type_err(op, "var", other)),
    }
}

fn binding_frame(
    op: &str,
    map: &Value,
    require_dynamic: bool,
) -> Result<Vec<(Rc<Var>, Value)>, RuntimeError> {
    let entries = match map {
        Value::Map(m) => m.entries.iter().cloned().collect::<Vec<_>>(),
        other => return Err(RuntimeError::type_err(op, "map of var to value", other)),
    };
    let mut frame = Vec::with_capacity(entries.len());
    for (var_val, value) in entries {
        let var = as_var(op, &var_val)?;
        if require_dynamic && !var.is_dynamic() {
            return Err(RuntimeError::IllegalState(format!(
                "{}: {} is not dynamic",
                op,
                var.qualified_name()
            )));
        }
        frame.push((var, value));
    }
    Ok(frame)
}

/// Push one frame of dynamic overrides; every Var must carry the
/// dynamic flag.
pub fn push_thread_bindings(ctx: &mut RuntimeContext, args: &[Value]) -> EvalResult {
    expect_arity("push-thread-bindings", args, 1)?;
    let frame = binding_frame("push-thread-bindings", &args[0], true)?;
    ctx.bindings.push(frame);
    Ok(Value::Nil)
}

pub fn pop_thread_bindings(ctx: &mut RuntimeContext, args: &[Value]) -> EvalResult {
    expect_arity("pop-thread-bindings", args, 0)?;
    ctx.bindings.pop()?;
    Ok(Value::Nil)
}

/// `(with-bindings-fn {var val ...} f)` - push, call, pop on every
/// exit path.
pub fn with_bindings_fn(ctx: &mut RuntimeContext, args: &[Value]) -> EvalResult {
    expect_arity("with-bindings-fn", args, 2)?;
    let frame = binding_frame("with-bindings-fn", &args[0], true)?;
    let f = args[1].clone();
    let _guard = ctx.bindings.guard(frame);
    ctx.call(&f, &[])
}

/// `(with-redefs-fn {var val ...} f)` - temporarily override ROOTS,
/// restoring them on every exit path. Unlike push-thread-bindings this
/// touches roots, so the dynamic flag is not required.
pub fn with_redefs_fn(ctx: &mut RuntimeContext, args: &[Value]) -> EvalResult {
    expect_arity("with-redefs-fn", args, 2)?;
    let frame = binding_frame("with-redefs-fn", &args[0], false)?;
    let f = args[1].clone();
    let _guard = RootRestoreGuard::capture(frame.iter().map(|(var, _)| var.clone()));
    for (var, value) in &frame {
        var.set_root(value.clone());
    }
    ctx.call(&f, &[])
}

pub fn var_get(ctx: &mut RuntimeContext, args: &[Value]) -> EvalResult {
    expect_arity("var-get", args, 1)?;
    let var = as_var("var-get", &args[0])?;
    Ok(ctx.deref_var(&var))
}

/// Set the topmost thread-binding value; a Var with no binding in
/// scope cannot be set.
pub fn var_set(ctx: &mut RuntimeContext, args: &[Value]) -> EvalResult {
    expect_arity("var-set", args, 2)?;
    let var = as_var("var-set", &args[0])?;
    if !ctx.bindings.set(&var, args[1].clone()) {
        return Err(RuntimeError::IllegalState(format!(
            "var-set: {} is not thread-bound",
            var.qualified_name()
        )));
    }
    Ok(args[1].clone())
}

/// `(alter-var-root var f & args)` - root becomes `(f root args...)`.
pub fn alter_var_root(ctx: &mut RuntimeContext, args: &[Value]) -> EvalResult {
    expect_min_arity("alter-var-root", args, 2)?;
    let var = as_var("alter-var-root", &args[0])?;
    let f = args[1].clone();
    let mut call_args = vec![var.root()];
    call_args.extend_from_slice(&args[2..]);
    let new_root = ctx.call(&f, &call_args)?;
    var.set_root(new_root.clone());
    Ok(new_root)
}

/// Find a Var by fully qualified symbol, or nil.
pub fn find_var(ctx: &mut RuntimeContext, args: &[Value]) -> EvalResult {
    expect_arity("find-var", args, 1)?;
    let id = match &args[0] {
        Value::Symbol(id) if id.is_qualified() => id.clone(),
        Value::Symbol(_) => {
            return Err(RuntimeError::IllegalState(
                "find-var: symbol must be namespace-qualified".to_string(),
            ));
        }
        other => return Err(RuntimeError::type_err("find-var", "symbol", other)),
    };
    let ns_name = id.ns.as_deref().expect("qualification checked");
    Ok(ctx
        .env
        .find_ns(ns_name)
        .and_then(|ns| ns.lookup_intern(&id.name))
        .map(Value::Var)
        .unwrap_or(Value::Nil))
}

/// Every Var has a root here, so interned means bound.
pub fn bound_p(_ctx: &mut RuntimeContext, args: &[Value]) -> EvalResult {
    expect_arity("bound?", args, 1)?;
    as_var("bound?", &args[0])?;
    Ok(Value::Bool(true))
}

pub fn thread_bound_p(ctx: &mut RuntimeContext, args: &[Value]) -> EvalResult {
    expect_arity("thread-bound?", args, 1)?;
    let var = as_var("thread-bound?", &args[0])?;
    Ok(Value::Bool(ctx.bindings.is_bound(&var)))
}

/// Mark a Var dynamic (expander support for `^:dynamic` defs).
pub fn set_dynamic(_ctx: &mut RuntimeContext, args: &[Value]) -> EvalResult {
    expect_arity_range("__set-dynamic", args, 1, 2)?;
    let var = as_var("__set-dynamic", &args[0])?;
    let flag = args.get(1).map(Value::is_truthy).unwrap_or(true);
    var.set_dynamic(flag);
    Ok(args[0].clone())
}

/// Attach a docstring (and optionally an arglists string) to a Var
/// (expander support for def docstrings).
pub fn set_doc(_ctx: &mut RuntimeContext, args: &[Value]) -> EvalResult {
    expect_arity_range("__set-doc", args, 2, 3)?;
    let var = as_var("__set-doc", &args[0])?;
    var.set_doc(match &args[1] {
        Value::Nil => None,
        Value::Str(s) => Some(s.to_string()),
        other => return Err(RuntimeError::type_err("__set-doc", "string or nil", other)),
    });
    if let Some(arglists) = args.get(2) {
        var.set_arglists(match arglists {
            Value::Nil => None,
            Value::Str(s) => Some(s.to_string()),
            other => return Err(RuntimeError::type_err("__set-doc", "string or nil", other)),
        });
    }
    Ok(args[0].clone())
}

/// Mark a Var private (expander support for `^:private` defs).
pub fn set_private(_ctx: &mut RuntimeContext, args: &[Value]) -> EvalResult {
    expect_arity_range("__set-private", args, 1, 2)?;
    let var = as_var("__set-private", &args[0])?;
    let flag = args.get(1).map(Value::is_truthy).unwrap_or(true);
    var.set_private(flag);
    Ok(args[0].clone())
}
