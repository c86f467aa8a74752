//! Reference cells: atoms, volatiles, delays, promises, reduced
//!
//! Atoms carry the full invariant set: a validator vets every
//! candidate value BEFORE installation (rejection leaves the atom
//! untouched and surfaces `ValidatorError`), and every successful
//! change notifies each watch with `(key, atom, old, new)`.
//!
//! The runtime is single-threaded, so `swap!` needs no retry loop;
//! with threads it would become a compare-and-swap cycle.

use crate::context::RuntimeContext;
use crate::error::{RuntimeError, expect_arity, expect_min_arity};
use crate::lazy::LazyRepr;
use crate::value::{AtomCell, DelayCell, EvalResult, PromiseCell, Value, VolatileCell};
use std::cell::RefCell;
use std::rc::Rc;

pub fn atom(_ctx: &mut RuntimeContext, args: &[Value]) -> EvalResult {
    expect_arity("atom", args, 1)?;
    Ok(Value::Atom(Rc::new(AtomCell {
        value: RefCell::new(args[0].clone()),
        validator: RefCell::new(None),
        watches: RefCell::new(Vec::new()),
    })))
}

fn as_atom(op: &str, v: &Value) -> Result<Rc<AtomCell>, RuntimeError> {
    match v {
        Value::Atom(a) => Ok(a.clone()),
        other => Err(RuntimeError::type_err(op, "atom", other)),
    }
}

/// Run the validator against a candidate; false or an error rejects.
fn validate(ctx: &mut RuntimeContext, cell: &AtomCell, candidate: &Value) -> Result<(), RuntimeError> {
    let validator = cell.validator.borrow().clone();
    if let Some(f) = validator {
        let accepted = ctx
            .call(&f, &[candidate.clone()])
            .map(|r| r.is_truthy())
            .unwrap_or(false);
        if !accepted {
            return Err(RuntimeError::Validator(format!(
                "atom validator rejected {:?}",
                candidate
            )));
        }
    }
    Ok(())
}

fn notify_watches(
    ctx: &mut RuntimeContext,
    atom_value: &Value,
    cell: &AtomCell,
    old: &Value,
    new: &Value,
) -> Result<(), RuntimeError> {
    let watches = cell.watches.borrow().clone();
    for (key, f) in watches {
        ctx.call(&f, &[key, atom_value.clone(), old.clone(), new.clone()])?;
    }
    Ok(())
}

/// Validate, install, notify. The common tail of every atom mutation.
fn install(
    ctx: &mut RuntimeContext,
    atom_value: &Value,
    cell: &Rc<AtomCell>,
    new: Value,
) -> Result<Value, RuntimeError> {
    validate(ctx, cell, &new)?;
    let old = cell.value.replace(new.clone());
    notify_watches(ctx, atom_value, cell, &old, &new)?;
    Ok(old)
}

pub fn reset(ctx: &mut RuntimeContext, args: &[Value]) -> EvalResult {
    expect_arity("reset!", args, 2)?;
    let cell = as_atom("reset!", &args[0])?;
    install(ctx, &args[0], &cell, args[1].clone())?;
    Ok(args[1].clone())
}

pub fn reset_vals(ctx: &mut RuntimeContext, args: &[Value]) -> EvalResult {
    expect_arity("reset-vals!", args, 2)?;
    let cell = as_atom("reset-vals!", &args[0])?;
    let old = install(ctx, &args[0], &cell, args[1].clone())?;
    Ok(Value::vector_from_vec(vec![old, args[1].clone()]))
}

pub fn swap(ctx: &mut RuntimeContext, args: &[Value]) -> EvalResult {
    expect_min_arity("swap!", args, 2)?;
    let cell = as_atom("swap!", &args[0])?;
    let f = args[1].clone();
    let current = cell.value.borrow().clone();
    let mut call_args = vec![current];
    call_args.extend_from_slice(&args[2..]);
    let new = ctx.call(&f, &call_args)?;
    install(ctx, &args[0], &cell, new.clone())?;
    Ok(new)
}

pub fn swap_vals(ctx: &mut RuntimeContext, args: &[Value]) -> EvalResult {
    expect_min_arity("swap-vals!", args, 2)?;
    let cell = as_atom("swap-vals!", &args[0])?;
    let f = args[1].clone();
    let current = cell.value.borrow().clone();
    let mut call_args = vec![current];
    call_args.extend_from_slice(&args[2..]);
    let new = ctx.call(&f, &call_args)?;
    let old = install(ctx, &args[0], &cell, new.clone())?;
    Ok(Value::vector_from_vec(vec![old, new]))
}

/// Install iff the current value `=` the expected one.
pub fn compare_and_set(ctx: &mut RuntimeContext, args: &[Value]) -> EvalResult {
    expect_arity("compare-and-set!", args, 3)?;
    let cell = as_atom("compare-and-set!", &args[0])?;
    let current = cell.value.borrow().clone();
    if current != args[1] {
        return Ok(Value::Bool(false));
    }
    install(ctx, &args[0], &cell, args[2].clone())?;
    Ok(Value::Bool(true))
}

pub fn set_validator(ctx: &mut RuntimeContext, args: &[Value]) -> EvalResult {
    expect_arity("set-validator!", args, 2)?;
    let cell = as_atom("set-validator!", &args[0])?;
    if args[1].is_nil() {
        *cell.validator.borrow_mut() = None;
        return Ok(Value::Nil);
    }
    // The current value must pass the incoming validator
    let current = cell.value.borrow().clone();
    let previous = cell.validator.replace(Some(args[1].clone()));
    if let Err(e) = validate(ctx, &cell, &current) {
        *cell.validator.borrow_mut() = previous;
        return Err(e);
    }
    Ok(Value::Nil)
}

pub fn get_validator(_ctx: &mut RuntimeContext, args: &[Value]) -> EvalResult {
    expect_arity("get-validator", args, 1)?;
    let cell = as_atom("get-validator", &args[0])?;
    let v = cell.validator.borrow().clone();
    Ok(v.unwrap_or(Value::Nil))
}

/// Watches are keyed; re-adding a key replaces its fn.
pub fn add_watch(_ctx: &mut RuntimeContext, args: &[Value]) -> EvalResult {
    expect_arity("add-watch", args, 3)?;
    let cell = as_atom("add-watch", &args[0])?;
    let mut watches = cell.watches.borrow_mut();
    if let Some(entry) = watches.iter_mut().find(|(k, _)| *k == args[1]) {
        entry.1 = args[2].clone();
    } else {
        watches.push((args[1].clone(), args[2].clone()));
    }
    drop(watches);
    Ok(args[0].clone())
}

pub fn remove_watch(_ctx: &mut RuntimeContext, args: &[Value]) -> EvalResult {
    expect_arity("remove-watch", args, 2)?;
    let cell = as_atom("remove-watch", &args[0])?;
    cell.watches.borrow_mut().retain(|(k, _)| *k != args[1]);
    Ok(args[0].clone())
}

// Volatiles

pub fn volatile(_ctx: &mut RuntimeContext, args: &[Value]) -> EvalResult {
    expect_arity("volatile!", args, 1)?;
    Ok(Value::Volatile(Rc::new(VolatileCell {
        value: RefCell::new(args[0].clone()),
    })))
}

fn as_volatile(op: &str, v: &Value) -> Result<Rc<VolatileCell>, RuntimeError> {
    match v {
        Value::Volatile(cell) => Ok(cell.clone()),
        other => Err(RuntimeError::type_err(op, "volatile", other)),
    }
}

pub fn vreset(_ctx: &mut RuntimeContext, args: &[Value]) -> EvalResult {
    expect_arity("vreset!", args, 2)?;
    let cell = as_volatile("vreset!", &args[0])?;
    *cell.value.borrow_mut() = args[1].clone();
    Ok(args[1].clone())
}

pub fn vswap(ctx: &mut RuntimeContext, args: &[Value]) -> EvalResult {
    expect_min_arity("vswap!", args, 2)?;
    let cell = as_volatile("vswap!", &args[0])?;
    let f = args[1].clone();
    let current = cell.value.borrow().clone();
    let mut call_args = vec![current];
    call_args.extend_from_slice(&args[2..]);
    let new = ctx.call(&f, &call_args)?;
    *cell.value.borrow_mut() = new.clone();
    Ok(new)
}

// Delays

/// Primitive behind `(delay expr)`; the expander wraps the body in a
/// zero-argument fn.
pub fn delay_create(_ctx: &mut RuntimeContext, args: &[Value]) -> EvalResult {
    expect_arity("__delay-create", args, 1)?;
    Ok(Value::Delay(Rc::new(DelayCell {
        thunk: RefCell::new(Some(args[0].clone())),
        value: RefCell::new(None),
    })))
}

/// Evaluate the thunk at most once, cache, drop the thunk. On error
/// the thunk is retained for a retry.
pub fn force(ctx: &mut RuntimeContext, args: &[Value]) -> EvalResult {
    expect_arity("force", args, 1)?;
    match &args[0] {
        Value::Delay(cell) => force_delay(ctx, cell),
        other => Ok(other.clone()),
    }
}

fn force_delay(ctx: &mut RuntimeContext, cell: &Rc<DelayCell>) -> EvalResult {
    if let Some(cached) = cell.value.borrow().clone() {
        return Ok(cached);
    }
    let thunk = cell.thunk.borrow_mut().take();
    match thunk {
        Some(f) => match ctx.force_thunk(&f) {
            Ok(v) => {
                *cell.value.borrow_mut() = Some(v.clone());
                Ok(v)
            }
            Err(e) => {
                *cell.thunk.borrow_mut() = Some(f);
                Err(e)
            }
        },
        None => Err(RuntimeError::IllegalState(
            "delay forced recursively from its own body".to_string(),
        )),
    }
}

// Promises

pub fn promise(_ctx: &mut RuntimeContext, args: &[Value]) -> EvalResult {
    expect_arity("promise", args, 0)?;
    Ok(Value::Promise(Rc::new(PromiseCell {
        value: RefCell::new(None),
    })))
}

/// First delivery wins; later deliveries are silent no-ops.
pub fn deliver(_ctx: &mut RuntimeContext, args: &[Value]) -> EvalResult {
    expect_arity("deliver", args, 2)?;
    match &args[0] {
        Value::Promise(cell) => {
            let mut slot = cell.value.borrow_mut();
            if slot.is_none() {
                *slot = Some(args[1].clone());
                drop(slot);
                Ok(args[0].clone())
            } else {
                Ok(Value::Nil)
            }
        }
        other => Err(RuntimeError::type_err("deliver", "promise", other)),
    }
}

// Reduced

pub fn reduced(_ctx: &mut RuntimeContext, args: &[Value]) -> EvalResult {
    expect_arity("reduced", args, 1)?;
    Ok(Value::Reduced(Rc::new(args[0].clone())))
}

pub fn unreduced(_ctx: &mut RuntimeContext, args: &[Value]) -> EvalResult {
    expect_arity("unreduced", args, 1)?;
    Ok(match &args[0] {
        Value::Reduced(inner) => (**inner).clone(),
        other => other.clone(),
    })
}

pub fn ensure_reduced(_ctx: &mut RuntimeContext, args: &[Value]) -> EvalResult {
    expect_arity("ensure-reduced", args, 1)?;
    Ok(match &args[0] {
        Value::Reduced(_) => args[0].clone(),
        other => Value::Reduced(Rc::new(other.clone())),
    })
}

// Deref and realization

/// Unified `deref`: atoms and volatiles read, delays force, promises
/// yield nil until delivered, Vars consult the binding stack,
/// `reduced` unwraps.
pub fn deref(ctx: &mut RuntimeContext, args: &[Value]) -> EvalResult {
    expect_arity("deref", args, 1)?;
    match &args[0] {
        Value::Atom(cell) => Ok(cell.value.borrow().clone()),
        Value::Volatile(cell) => Ok(cell.value.borrow().clone()),
        Value::Delay(cell) => force_delay(ctx, cell),
        Value::Promise(cell) => Ok(cell.value.borrow().clone().unwrap_or(Value::Nil)),
        Value::Var(var) => Ok(ctx.deref_var(var)),
        Value::Reduced(inner) => Ok((**inner).clone()),
        other => Err(RuntimeError::type_err("deref", "reference", other)),
    }
}

/// Delivered/realized state of delays, promises, and lazy seqs.
pub fn realized_p(_ctx: &mut RuntimeContext, args: &[Value]) -> EvalResult {
    expect_arity("realized?", args, 1)?;
    match &args[0] {
        Value::Delay(cell) => Ok(Value::Bool(cell.value.borrow().is_some())),
        Value::Promise(cell) => Ok(Value::Bool(cell.value.borrow().is_some())),
        Value::LazySeq(cell) => Ok(Value::Bool(matches!(
            &*cell.repr.borrow(),
            LazyRepr::Cons { .. } | LazyRepr::Realized(_)
        ))),
        other => Err(RuntimeError::type_err(
            "realized?",
            "delay, promise, or lazy-seq",
            other,
        )),
    }
}
