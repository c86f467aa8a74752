//! End-to-end scenarios driven through the installed builtin catalogue
//!
//! Each test resolves builtins out of `clojure.core` and calls them the
//! way the host evaluator would, so the whole chain (registration,
//! resolution, call dispatch, lazy engine) is exercised together.

use lace_runtime::{RuntimeContext, Value, registry};

fn runtime() -> RuntimeContext {
    // RUST_LOG=debug surfaces require/binding traces when debugging
    static TRACING: std::sync::Once = std::sync::Once::new();
    TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .try_init();
    });
    let mut ctx = RuntimeContext::new();
    registry::install(&mut ctx);
    ctx
}

fn core_fn(ctx: &RuntimeContext, name: &str) -> Value {
    let var = ctx.resolve(name).unwrap_or_else(|| panic!("unresolved builtin {}", name));
    var.root()
}

fn call(ctx: &mut RuntimeContext, name: &str, args: &[Value]) -> Value {
    let f = core_fn(ctx, name);
    ctx.call(&f, args)
        .unwrap_or_else(|e| panic!("({} ...) failed: {}", name, e))
}

fn int_list(items: &[i64]) -> Value {
    Value::list_from_vec(items.iter().copied().map(Value::Int).collect())
}

#[test]
fn scenario_take_map_range() {
    // (take 5 (map inc (range))) => (1 2 3 4 5)
    let mut ctx = runtime();
    let r = call(&mut ctx, "range", &[]);
    let inc = core_fn(&ctx, "inc");
    let mapped = call(&mut ctx, "map", &[inc, r]);
    let taken = call(&mut ctx, "take", &[Value::Int(5), mapped]);
    let realized = call(&mut ctx, "doall", &[taken]);
    let eq = call(&mut ctx, "=", &[realized, int_list(&[1, 2, 3, 4, 5])]);
    assert_eq!(eq, Value::Bool(true));
}

#[test]
fn scenario_reduce_filter_range() {
    // (reduce + 0 (filter odd? (range 10))) => 25
    let mut ctx = runtime();
    let r = call(&mut ctx, "range", &[Value::Int(10)]);
    let odd = core_fn(&ctx, "odd?");
    let odds = call(&mut ctx, "filter", &[odd, r]);
    let plus = core_fn(&ctx, "+");
    let total = call(&mut ctx, "reduce", &[plus, Value::Int(0), odds]);
    assert_eq!(total, Value::Int(25));
}

#[test]
fn scenario_atom_swaps() {
    // (let [a (atom 0)] (swap! a inc) (swap! a + 10) @a) => 11
    let mut ctx = runtime();
    let a = call(&mut ctx, "atom", &[Value::Int(0)]);
    let inc = core_fn(&ctx, "inc");
    call(&mut ctx, "swap!", &[a.clone(), inc]);
    let plus = core_fn(&ctx, "+");
    call(&mut ctx, "swap!", &[a.clone(), plus, Value::Int(10)]);
    assert_eq!(call(&mut ctx, "deref", &[a]), Value::Int(11));
}

#[test]
fn scenario_delay_prints_once() {
    // (let [d (delay (prn :once) 42)] [(force d) (force d)])
    // => [42 42] with exactly one captured ":once" line
    let mut ctx = runtime();
    ctx.install_output_capture();

    let body = Value::native_fn("delay-body", |ctx, _| {
        let prn = ctx.resolve("prn").unwrap().root();
        ctx.call(&prn, &[Value::keyword("once")])?;
        Ok(Value::Int(42))
    });
    let d = call(&mut ctx, "__delay-create", &[body]);
    let first = call(&mut ctx, "force", &[d.clone()]);
    let second = call(&mut ctx, "force", &[d]);
    assert_eq!(first, Value::Int(42));
    assert_eq!(second, Value::Int(42));
    assert_eq!(ctx.take_output_capture().as_deref(), Some(":once\n"));
}

#[test]
fn scenario_get_in_nested() {
    // (get-in {:a {:b [10 20 30]}} [:a :b 2]) => 30
    let mut ctx = runtime();
    let inner_vec = Value::vector_from_vec(vec![
        Value::Int(10),
        Value::Int(20),
        Value::Int(30),
    ]);
    let inner_map = Value::map_from_pairs(vec![(Value::keyword("b"), inner_vec)]);
    let outer = Value::map_from_pairs(vec![(Value::keyword("a"), inner_map)]);
    let path = Value::vector_from_vec(vec![
        Value::keyword("a"),
        Value::keyword("b"),
        Value::Int(2),
    ]);
    assert_eq!(call(&mut ctx, "get-in", &[outer, path]), Value::Int(30));
}

#[test]
fn scenario_partition_by_runs() {
    // (partition-by odd? [1 1 2 2 3 1]) => ((1 1) (2 2) (3) (1))
    let mut ctx = runtime();
    let odd = core_fn(&ctx, "odd?");
    let coll = Value::vector_from_vec(
        [1, 1, 2, 2, 3, 1].iter().map(|n| Value::Int(*n)).collect(),
    );
    let out = call(&mut ctx, "partition-by", &[odd, coll]);
    let expected = Value::list_from_vec(vec![
        int_list(&[1, 1]),
        int_list(&[2, 2]),
        int_list(&[3]),
        int_list(&[1]),
    ]);
    assert_eq!(out, expected);
}

#[test]
fn scenario_promise_first_delivery_wins() {
    // (let [v (promise)] (deliver v 1) (deliver v 2) @v) => 1
    let mut ctx = runtime();
    let p = call(&mut ctx, "promise", &[]);
    call(&mut ctx, "deliver", &[p.clone(), Value::Int(1)]);
    call(&mut ctx, "deliver", &[p.clone(), Value::Int(2)]);
    assert_eq!(call(&mut ctx, "deref", &[p]), Value::Int(1));
}

#[test]
fn scenario_binding_shadows_root() {
    // With *x* dynamic and root 1:
    // (binding [*x* 7] (deref #'*x*)) => 7, afterwards 1
    let mut ctx = runtime();
    let var = call(
        &mut ctx,
        "intern",
        &[
            Value::symbol("clojure.core"),
            Value::symbol("*x*"),
            Value::Int(1),
        ],
    );
    call(&mut ctx, "__set-dynamic", &[var.clone()]);

    let frame = Value::map_from_pairs(vec![(var.clone(), Value::Int(7))]);
    call(&mut ctx, "push-thread-bindings", &[frame]);
    assert_eq!(call(&mut ctx, "deref", &[var.clone()]), Value::Int(7));
    call(&mut ctx, "pop-thread-bindings", &[]);
    assert_eq!(call(&mut ctx, "deref", &[var]), Value::Int(1));
}

#[test]
fn keywords_and_partial_compose_through_the_catalogue() {
    // ((comp (partial + 1) :n) {:n 41}) => 42
    let mut ctx = runtime();
    let plus = core_fn(&ctx, "+");
    let add1 = call(&mut ctx, "partial", &[plus, Value::Int(1)]);
    let composed = call(&mut ctx, "comp", &[add1, Value::keyword("n")]);
    let m = Value::map_from_pairs(vec![(Value::keyword("n"), Value::Int(41))]);
    assert_eq!(ctx.call(&composed, &[m]).unwrap(), Value::Int(42));
}

#[test]
fn host_thunks_drive_lazy_seq_through_force_hook() {
    use lace_runtime::value::{FnImpl, FnVal};
    use std::rc::Rc;

    // A "user" thunk (host fn) forced through the installed force hook
    let mut ctx = runtime();
    ctx.install_force_fn(Rc::new(|_, _| Ok(Value::Int(9))));
    let host_thunk = Value::Fn(Rc::new(FnVal {
        name: None,
        imp: FnImpl::Host(Rc::new(())),
    }));
    let d = call(&mut ctx, "__delay-create", &[host_thunk]);
    assert_eq!(call(&mut ctx, "force", &[d]), Value::Int(9));
}

#[test]
fn host_thunk_without_hook_is_type_error() {
    use lace_runtime::value::{FnImpl, FnVal};
    use std::rc::Rc;

    let mut ctx = runtime();
    let host_thunk = Value::Fn(Rc::new(FnVal {
        name: None,
        imp: FnImpl::Host(Rc::new(())),
    }));
    let d = call(&mut ctx, "__delay-create", &[host_thunk]);
    let force = core_fn(&ctx, "force");
    let err = ctx.call(&force, &[d]).unwrap_err();
    assert!(matches!(err, lace_runtime::RuntimeError::Type(_)));
}
