//! Structural walking
//!
//! `walk` applies `inner` to every immediate child (map children are
//! `[k v]` entry vectors), rebuilds the same collection kind, then
//! applies `outer` to the rebuilt whole. `postwalk` and `prewalk` are
//! the depth-first bottom-up and top-down closures of that step.

use crate::context::RuntimeContext;
use crate::error::{RuntimeError, expect_arity};
use crate::lazy;
use crate::value::{EvalResult, Value};

/// Rebuild a collection of the same kind from transformed children.
/// Map children must come back as 2-element vectors.
fn rebuild(op: &str, template: &Value, children: Vec<Value>) -> EvalResult {
    match template {
        Value::List(_) | Value::LazySeq(_) => Ok(Value::list_from_vec(children)),
        Value::Vector(_) => Ok(Value::vector_from_vec(children)),
        Value::Set(_) => Ok(Value::set_from_vec(children)),
        Value::Map(_) => {
            let mut pairs = Vec::with_capacity(children.len());
            for child in children {
                match &child {
                    Value::Vector(entry) if entry.items.len() == 2 => {
                        pairs.push((
                            entry.items.get(0).cloned().unwrap_or(Value::Nil),
                            entry.items.get(1).cloned().unwrap_or(Value::Nil),
                        ));
                    }
                    other => {
                        return Err(RuntimeError::type_err(
                            op,
                            "[k v] entry for map rebuild",
                            other,
                        ));
                    }
                }
            }
            Ok(Value::map_from_pairs(pairs))
        }
        _ => unreachable!("rebuild only called for collections"),
    }
}

fn is_walkable(v: &Value) -> bool {
    matches!(
        v,
        Value::List(_) | Value::Vector(_) | Value::Map(_) | Value::Set(_) | Value::LazySeq(_)
    )
}

/// `(walk inner outer form)`.
pub fn walk(ctx: &mut RuntimeContext, args: &[Value]) -> EvalResult {
    expect_arity("walk", args, 3)?;
    let inner = args[0].clone();
    let outer = args[1].clone();
    let form = &args[2];
    if !is_walkable(form) {
        return ctx.call(&outer, &[form.clone()]);
    }
    let children = lazy::realize_all(ctx, form)?;
    let mut transformed = Vec::with_capacity(children.len());
    for child in children {
        transformed.push(ctx.call(&inner, &[child])?);
    }
    let rebuilt = rebuild("walk", form, transformed)?;
    ctx.call(&outer, &[rebuilt])
}

fn postwalk_value(ctx: &mut RuntimeContext, f: &Value, form: &Value) -> EvalResult {
    let rebuilt = if is_walkable(form) {
        let children = lazy::realize_all(ctx, form)?;
        let mut transformed = Vec::with_capacity(children.len());
        for child in children {
            transformed.push(postwalk_value(ctx, f, &child)?);
        }
        rebuild("postwalk", form, transformed)?
    } else {
        form.clone()
    };
    ctx.call(f, &[rebuilt])
}

/// Depth-first, bottom-up.
pub fn postwalk(ctx: &mut RuntimeContext, args: &[Value]) -> EvalResult {
    expect_arity("postwalk", args, 2)?;
    let f = args[0].clone();
    postwalk_value(ctx, &f, &args[1])
}

fn prewalk_value(ctx: &mut RuntimeContext, f: &Value, form: &Value) -> EvalResult {
    let transformed = ctx.call(f, &[form.clone()])?;
    if !is_walkable(&transformed) {
        return Ok(transformed);
    }
    let children = lazy::realize_all(ctx, &transformed)?;
    let mut walked = Vec::with_capacity(children.len());
    for child in children {
        walked.push(prewalk_value(ctx, f, &child)?);
    }
    rebuild("prewalk", &transformed, walked)
}

/// Depth-first, top-down.
pub fn prewalk(ctx: &mut RuntimeContext, args: &[Value]) -> EvalResult {
    expect_arity("prewalk", args, 2)?;
    let f = args[0].clone();
    prewalk_value(ctx, &f, &args[1])
}

fn replacer(smap: Value) -> Value {
    Value::native_fn("replace*", move |_, args| {
        match &smap {
            Value::Map(m) => Ok(m
                .entries
                .get(&args[0])
                .cloned()
                .unwrap_or_else(|| args[0].clone())),
            other => Err(RuntimeError::type_err("walk replace", "map", other)),
        }
    })
}

/// Substitute via map, bottom-up.
pub fn postwalk_replace(ctx: &mut RuntimeContext, args: &[Value]) -> EvalResult {
    expect_arity("postwalk-replace", args, 2)?;
    let f = replacer(args[0].clone());
    postwalk_value(ctx, &f, &args[1])
}

/// Substitute via map, top-down.
pub fn prewalk_replace(ctx: &mut RuntimeContext, args: &[Value]) -> EvalResult {
    expect_arity("prewalk-replace", args, 2)?;
    let f = replacer(args[0].clone());
    prewalk_value(ctx, &f, &args[1])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn identity_fn() -> Value {
        Value::native_fn("identity", crate::seq_ops::identity)
    }

    fn inc_ints() -> Value {
        Value::native_fn("inc-ints", |_, args| {
            Ok(match &args[0] {
                Value::Int(n) => Value::Int(n + 1),
                other => other.clone(),
            })
        })
    }

    #[test]
    fn test_walk_applies_inner_then_outer() {
        let mut ctx = RuntimeContext::new();
        let v = Value::vector_from_vec(vec![Value::Int(1), Value::Int(2)]);
        let out = walk(&mut ctx, &[inc_ints(), identity_fn(), v]).unwrap();
        assert_eq!(
            out,
            Value::vector_from_vec(vec![Value::Int(2), Value::Int(3)])
        );
    }

    #[test]
    fn test_walk_map_children_are_entries() {
        let mut ctx = RuntimeContext::new();
        let m = Value::map_from_pairs(vec![(Value::keyword("a"), Value::Int(1))]);
        let seen = std::rc::Rc::new(std::cell::RefCell::new(Vec::new()));
        let seen2 = seen.clone();
        let spy = Value::native_fn("spy", move |_, args| {
            seen2.borrow_mut().push(args[0].clone());
            Ok(args[0].clone())
        });
        walk(&mut ctx, &[spy, identity_fn(), m]).unwrap();
        assert_eq!(
            seen.borrow()[0],
            Value::vector_from_vec(vec![Value::keyword("a"), Value::Int(1)])
        );
    }

    #[test]
    fn test_postwalk_transforms_nested() {
        let mut ctx = RuntimeContext::new();
        let nested = Value::vector_from_vec(vec![
            Value::Int(1),
            Value::list_from_vec(vec![Value::Int(2)]),
        ]);
        let out = postwalk(&mut ctx, &[inc_ints(), nested]).unwrap();
        assert_eq!(
            out,
            Value::vector_from_vec(vec![
                Value::Int(2),
                Value::list_from_vec(vec![Value::Int(3)]),
            ])
        );
    }

    #[test]
    fn test_postwalk_bottom_up_order() {
        let mut ctx = RuntimeContext::new();
        let order = std::rc::Rc::new(std::cell::RefCell::new(Vec::new()));
        let order2 = order.clone();
        let spy = Value::native_fn("spy", move |_, args| {
            order2.borrow_mut().push(args[0].clone());
            Ok(args[0].clone())
        });
        let form = Value::vector_from_vec(vec![Value::Int(1)]);
        postwalk(&mut ctx, &[spy, form.clone()]).unwrap();
        // Child first, container last
        assert_eq!(order.borrow()[0], Value::Int(1));
        assert_eq!(order.borrow()[1], form);
    }

    #[test]
    fn test_prewalk_top_down_order() {
        let mut ctx = RuntimeContext::new();
        let order = std::rc::Rc::new(std::cell::RefCell::new(Vec::new()));
        let order2 = order.clone();
        let spy = Value::native_fn("spy", move |_, args| {
            order2.borrow_mut().push(args[0].clone());
            Ok(args[0].clone())
        });
        let form = Value::vector_from_vec(vec![Value::Int(1)]);
        prewalk(&mut ctx, &[spy, form.clone()]).unwrap();
        assert_eq!(order.borrow()[0], form);
        assert_eq!(order.borrow()[1], Value::Int(1));
    }

    #[test]
    fn test_replace_walkers() {
        let mut ctx = RuntimeContext::new();
        let smap = Value::map_from_pairs(vec![(Value::keyword("old"), Value::keyword("new"))]);
        let form = Value::vector_from_vec(vec![
            Value::keyword("old"),
            Value::vector_from_vec(vec![Value::keyword("old"), Value::Int(1)]),
        ]);
        let out = postwalk_replace(&mut ctx, &[smap, form]).unwrap();
        assert_eq!(
            out,
            Value::vector_from_vec(vec![
                Value::keyword("new"),
                Value::vector_from_vec(vec![Value::keyword("new"), Value::Int(1)]),
            ])
        );
    }
}
