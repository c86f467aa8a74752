//! Value: what the language talks about
//!
//! One closed tagged sum covers every runtime value: immutable scalars,
//! persistent collections, function-like values, and mutable reference
//! cells. Builtins pattern-match exhaustively on the variants.
//!
//! The runtime is single-threaded cooperative, so composite payloads
//! are `Rc`-shared (O(1) clone) and mutable cells use `RefCell`.
//!
//! # Equality
//!
//! `PartialEq` on `Value` IS the language's `=`: structural for
//! scalars, strings, identifiers, and collections; pointer identity for
//! mutable cells and function-like values. Keywords and symbols compare
//! by namespace/name across instances. `Int` and `Float` are distinct
//! types and never `=` to each other.

use crate::context::RuntimeContext;
use crate::error::RuntimeError;
use crate::lazy::LazySeqCell;
use crate::namespace::Var;
use lace_core::hash::{hash_f64, hash_i64, hash_ordered, hash_str, hash_unordered, mix64};
use lace_core::{FlatMap, FlatSet, Ident, PersistentList, PersistentVector};
use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

pub type EvalResult = Result<Value, RuntimeError>;

/// A builtin's implementation: borrows the runtime context (for user
/// callbacks, namespaces, output) and an argument slice.
pub type NativeFn = Rc<dyn Fn(&mut RuntimeContext, &[Value]) -> EvalResult>;

/// List payload: persistent cons list plus optional metadata.
#[derive(Debug, Clone)]
pub struct ListVal {
    pub items: PersistentList<Value>,
    pub meta: Option<Value>,
}

/// Vector payload: shared slice plus optional metadata.
#[derive(Debug, Clone)]
pub struct VectorVal {
    pub items: PersistentVector<Value>,
    pub meta: Option<Value>,
}

/// Map payload: insertion-ordered flat entries plus optional metadata.
#[derive(Debug, Clone)]
pub struct MapVal {
    pub entries: FlatMap<Value, Value>,
    pub meta: Option<Value>,
}

/// Set payload: insertion-ordered members plus optional metadata.
#[derive(Debug, Clone)]
pub struct SetVal {
    pub items: FlatSet<Value>,
    pub meta: Option<Value>,
}

/// A function value: a named builtin, or an opaque host-compiled
/// closure invoked through the host's call hook.
pub struct FnVal {
    pub name: Option<String>,
    pub imp: FnImpl,
}

pub enum FnImpl {
    /// Builtin implemented in this crate (or a test closure)
    Native(NativeFn),
    /// User-defined closure owned by the host evaluator. The payload is
    /// opaque here; only the host's call hook can interpret it.
    Host(Rc<dyn std::any::Any>),
}

impl fmt::Debug for FnVal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match self.imp {
            FnImpl::Native(_) => "native",
            FnImpl::Host(_) => "host",
        };
        write!(f, "FnVal({}, {})", self.name.as_deref().unwrap_or("anonymous"), kind)
    }
}

/// Captured function plus pre-applied prefix arguments.
#[derive(Debug)]
pub struct PartialFnVal {
    pub f: Value,
    pub prefix: Vec<Value>,
}

/// Ordered composition; functions apply right-to-left.
#[derive(Debug)]
pub struct CompFnVal {
    pub fns: Vec<Value>,
}

/// Multimethod: dispatch function plus a method table keyed by
/// dispatch value (compared by `=`). The `:default` keyword is the
/// fallback key.
#[derive(Debug)]
pub struct MultiFnVal {
    pub name: String,
    pub dispatch: Value,
    pub methods: RefCell<Vec<(Value, Value)>>,
}

/// Protocol: a named method set with an implementation table keyed by
/// type-tag string (see [`Value::type_tag`]).
#[derive(Debug)]
pub struct ProtocolVal {
    pub name: String,
    pub impls: RefCell<HashMap<String, HashMap<String, Value>>>,
}

/// One protocol method as a callable; dispatches on the first
/// argument's type tag.
#[derive(Debug)]
pub struct ProtocolFnVal {
    pub name: String,
    pub protocol: Rc<ProtocolVal>,
}

/// Declared-but-unattached protocol method prototype.
#[derive(Debug)]
pub struct FnProtoVal {
    pub name: String,
    pub doc: Option<String>,
}

/// Atom: shared mutable cell with optional validator and watches.
#[derive(Debug, Default)]
pub struct AtomCell {
    pub value: RefCell<Value>,
    pub validator: RefCell<Option<Value>>,
    pub watches: RefCell<Vec<(Value, Value)>>,
}

/// Volatile: shared mutable cell, no validator, no watches.
#[derive(Debug, Default)]
pub struct VolatileCell {
    pub value: RefCell<Value>,
}

/// Delay: thunk evaluated at most once, then cached. The thunk is
/// dropped on realization.
#[derive(Debug, Default)]
pub struct DelayCell {
    pub thunk: RefCell<Option<Value>>,
    pub value: RefCell<Option<Value>>,
}

/// Promise: delivered at most once; deref of an undelivered promise is
/// nil (no blocking wait in a single-threaded runtime).
#[derive(Debug, Default)]
pub struct PromiseCell {
    pub value: RefCell<Option<Value>>,
}

/// Opaque handle for a loaded WASM module; the core never looks inside.
#[derive(Debug)]
pub struct WasmModule {
    pub name: String,
}

#[derive(Clone)]
pub enum Value {
    Nil,
    Bool(bool),
    Int(i64),
    Float(f64),
    Char(char),
    Str(Rc<str>),
    Keyword(Rc<Ident>),
    Symbol(Rc<Ident>),
    List(Rc<ListVal>),
    Vector(Rc<VectorVal>),
    Map(Rc<MapVal>),
    Set(Rc<SetVal>),
    Fn(Rc<FnVal>),
    PartialFn(Rc<PartialFnVal>),
    CompFn(Rc<CompFnVal>),
    MultiFn(Rc<MultiFnVal>),
    ProtocolFn(Rc<ProtocolFnVal>),
    Protocol(Rc<ProtocolVal>),
    FnProto(Rc<FnProtoVal>),
    Atom(Rc<AtomCell>),
    Volatile(Rc<VolatileCell>),
    Delay(Rc<DelayCell>),
    Promise(Rc<PromiseCell>),
    Reduced(Rc<Value>),
    LazySeq(Rc<LazySeqCell>),
    Var(Rc<Var>),
    WasmModule(Rc<WasmModule>),
    Regex(Rc<regex::Regex>),
}

impl Default for Value {
    fn default() -> Self {
        Value::Nil
    }
}

// Constructors
impl Value {
    pub fn string(s: impl Into<String>) -> Value {
        Value::Str(Rc::from(s.into().as_str()))
    }

    pub fn keyword(name: &str) -> Value {
        Value::Keyword(Rc::new(Ident::parse(name)))
    }

    pub fn symbol(name: &str) -> Value {
        Value::Symbol(Rc::new(Ident::parse(name)))
    }

    pub fn list_from_vec(items: Vec<Value>) -> Value {
        Value::List(Rc::new(ListVal {
            items: PersistentList::from_slice(&items),
            meta: None,
        }))
    }

    pub fn list(items: PersistentList<Value>) -> Value {
        Value::List(Rc::new(ListVal { items, meta: None }))
    }

    pub fn empty_list() -> Value {
        Value::list(PersistentList::new())
    }

    pub fn vector_from_vec(items: Vec<Value>) -> Value {
        Value::Vector(Rc::new(VectorVal {
            items: PersistentVector::from_vec(items),
            meta: None,
        }))
    }

    pub fn vector(items: PersistentVector<Value>) -> Value {
        Value::Vector(Rc::new(VectorVal { items, meta: None }))
    }

    pub fn map_from_pairs(pairs: Vec<(Value, Value)>) -> Value {
        Value::Map(Rc::new(MapVal {
            entries: FlatMap::from_entries(pairs),
            meta: None,
        }))
    }

    pub fn map(entries: FlatMap<Value, Value>) -> Value {
        Value::Map(Rc::new(MapVal {
            entries,
            meta: None,
        }))
    }

    pub fn set_from_vec(items: Vec<Value>) -> Value {
        Value::Set(Rc::new(SetVal {
            items: FlatSet::from_items(items),
            meta: None,
        }))
    }

    pub fn set(items: FlatSet<Value>) -> Value {
        Value::Set(Rc::new(SetVal { items, meta: None }))
    }

    /// Wrap a Rust function as a named builtin value.
    pub fn native_fn(
        name: &str,
        f: impl Fn(&mut RuntimeContext, &[Value]) -> EvalResult + 'static,
    ) -> Value {
        Value::Fn(Rc::new(FnVal {
            name: Some(name.to_string()),
            imp: FnImpl::Native(Rc::new(f)),
        }))
    }
}

// Observers
impl Value {
    /// nil and false are the only falsy values.
    pub fn is_truthy(&self) -> bool {
        !matches!(self, Value::Nil | Value::Bool(false))
    }

    pub fn is_nil(&self) -> bool {
        matches!(self, Value::Nil)
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_ident(&self) -> Option<&Ident> {
        match self {
            Value::Keyword(id) | Value::Symbol(id) => Some(id),
            _ => None,
        }
    }

    /// Type tag string, the dispatch key for protocol implementations
    /// and the payload of the `type` builtin.
    pub fn type_tag(&self) -> &'static str {
        match self {
            Value::Nil => "nil",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Char(_) => "char",
            Value::Str(_) => "string",
            Value::Keyword(_) => "keyword",
            Value::Symbol(_) => "symbol",
            Value::List(_) => "list",
            Value::Vector(_) => "vector",
            Value::Map(_) => "map",
            Value::Set(_) => "set",
            Value::Fn(_) => "fn",
            Value::PartialFn(_) => "partial-fn",
            Value::CompFn(_) => "comp-fn",
            Value::MultiFn(_) => "multi-fn",
            Value::ProtocolFn(_) => "protocol-fn",
            Value::Protocol(_) => "protocol",
            Value::FnProto(_) => "fn-proto",
            Value::Atom(_) => "atom",
            Value::Volatile(_) => "volatile",
            Value::Delay(_) => "delay",
            Value::Promise(_) => "promise",
            Value::Reduced(_) => "reduced",
            Value::LazySeq(_) => "lazy-seq",
            Value::Var(_) => "var",
            Value::WasmModule(_) => "wasm-module",
            Value::Regex(_) => "regex",
        }
    }

    /// Stable address for identity-compared values; used by identity
    /// hashing. Scalars return 0 (they hash structurally).
    fn ptr_id(&self) -> usize {
        match self {
            Value::Fn(r) => Rc::as_ptr(r) as usize,
            Value::PartialFn(r) => Rc::as_ptr(r) as usize,
            Value::CompFn(r) => Rc::as_ptr(r) as usize,
            Value::MultiFn(r) => Rc::as_ptr(r) as usize,
            Value::ProtocolFn(r) => Rc::as_ptr(r) as usize,
            Value::Protocol(r) => Rc::as_ptr(r) as usize,
            Value::FnProto(r) => Rc::as_ptr(r) as usize,
            Value::Atom(r) => Rc::as_ptr(r) as usize,
            Value::Volatile(r) => Rc::as_ptr(r) as usize,
            Value::Delay(r) => Rc::as_ptr(r) as usize,
            Value::Promise(r) => Rc::as_ptr(r) as usize,
            Value::LazySeq(r) => Rc::as_ptr(r) as usize,
            Value::Var(r) => Rc::as_ptr(r) as usize,
            Value::WasmModule(r) => Rc::as_ptr(r) as usize,
            Value::Regex(r) => Rc::as_ptr(r) as usize,
            _ => 0,
        }
    }

    /// The value's metadata, if its kind carries any.
    pub fn meta(&self) -> Option<Value> {
        match self {
            Value::List(l) => l.meta.clone(),
            Value::Vector(v) => v.meta.clone(),
            Value::Map(m) => m.meta.clone(),
            Value::Set(s) => s.meta.clone(),
            _ => None,
        }
    }

    /// New value of the same kind carrying `meta`. `None` when the kind
    /// does not support metadata.
    pub fn with_meta(&self, meta: Option<Value>) -> Option<Value> {
        match self {
            Value::List(l) => Some(Value::List(Rc::new(ListVal {
                items: l.items.clone(),
                meta,
            }))),
            Value::Vector(v) => Some(Value::Vector(Rc::new(VectorVal {
                items: v.items.clone(),
                meta,
            }))),
            Value::Map(m) => Some(Value::Map(Rc::new(MapVal {
                entries: m.entries.clone(),
                meta,
            }))),
            Value::Set(s) => Some(Value::Set(Rc::new(SetVal {
                items: s.items.clone(),
                meta,
            }))),
            _ => None,
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        use Value::*;
        match (self, other) {
            (Nil, Nil) => true,
            (Bool(a), Bool(b)) => a == b,
            (Int(a), Int(b)) => a == b,
            (Float(a), Float(b)) => a == b,
            (Char(a), Char(b)) => a == b,
            (Str(a), Str(b)) => a == b,
            (Keyword(a), Keyword(b)) => a == b,
            (Symbol(a), Symbol(b)) => a == b,
            // Same kind, same elements. A list is never = to a vector.
            (List(a), List(b)) => a.items == b.items,
            (Vector(a), Vector(b)) => a.items == b.items,
            (Map(a), Map(b)) => a.entries == b.entries,
            (Set(a), Set(b)) => a.items == b.items,
            (Reduced(a), Reduced(b)) => a == b,
            (Regex(a), Regex(b)) => Rc::ptr_eq(a, b),
            _ => {
                let id = self.ptr_id();
                id != 0 && id == other.ptr_id()
            }
        }
    }
}

/// Structural hash, consistent with `=`. Identity-equal values hash by
/// address; collections hash their elements (ordered or unordered to
/// match their equality).
pub fn hash_value(v: &Value) -> u64 {
    match v {
        Value::Nil => 0,
        Value::Bool(false) => mix64(1),
        Value::Bool(true) => mix64(2),
        Value::Int(n) => hash_i64(*n),
        Value::Float(f) => hash_f64(*f),
        Value::Char(c) => mix64(*c as u64),
        Value::Str(s) => hash_str(s),
        Value::Keyword(id) => mix64(hash_str(&id.to_string()) ^ 0x6b),
        Value::Symbol(id) => mix64(hash_str(&id.to_string()) ^ 0x73),
        Value::List(l) => hash_ordered(l.items.iter().map(hash_value)),
        Value::Vector(v) => hash_ordered(v.items.iter().map(hash_value)),
        Value::Map(m) => hash_unordered(
            m.entries
                .iter()
                .map(|(k, v)| hash_ordered([hash_value(k), hash_value(v)])),
        ),
        Value::Set(s) => hash_unordered(s.items.iter().map(hash_value)),
        Value::Reduced(inner) => mix64(hash_value(inner) ^ 0x72),
        other => mix64(other.ptr_id() as u64),
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", crate::printer::pr_str(self))
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", crate::printer::display_str(self))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truthiness() {
        assert!(!Value::Nil.is_truthy());
        assert!(!Value::Bool(false).is_truthy());
        assert!(Value::Bool(true).is_truthy());
        assert!(Value::Int(0).is_truthy());
        assert!(Value::string("").is_truthy());
        assert!(Value::empty_list().is_truthy());
    }

    #[test]
    fn test_scalar_equality_is_typed() {
        assert_eq!(Value::Int(1), Value::Int(1));
        assert_ne!(Value::Int(1), Value::Float(1.0));
        assert_ne!(Value::Nil, Value::Bool(false));
    }

    #[test]
    fn test_keyword_equality_across_instances() {
        assert_eq!(Value::keyword("a"), Value::keyword("a"));
        assert_eq!(Value::keyword("ns/a"), Value::keyword("ns/a"));
        assert_ne!(Value::keyword("a"), Value::symbol("a"));
    }

    #[test]
    fn test_collection_equality_structural() {
        let a = Value::vector_from_vec(vec![Value::Int(1), Value::Int(2)]);
        let b = Value::vector_from_vec(vec![Value::Int(1), Value::Int(2)]);
        assert_eq!(a, b);

        // Different kinds never compare equal, even with equal elements
        let l = Value::list_from_vec(vec![Value::Int(1), Value::Int(2)]);
        assert_ne!(l, a);
    }

    #[test]
    fn test_map_equality_ignores_insertion_order() {
        let a = Value::map_from_pairs(vec![
            (Value::keyword("a"), Value::Int(1)),
            (Value::keyword("b"), Value::Int(2)),
        ]);
        let b = Value::map_from_pairs(vec![
            (Value::keyword("b"), Value::Int(2)),
            (Value::keyword("a"), Value::Int(1)),
        ]);
        assert_eq!(a, b);
    }

    #[test]
    fn test_atom_equality_is_identity() {
        let a = Value::Atom(Rc::new(AtomCell::default()));
        let b = Value::Atom(Rc::new(AtomCell::default()));
        assert_eq!(a, a.clone());
        assert_ne!(a, b);
    }

    #[test]
    fn test_fn_equality_is_identity() {
        let f = Value::native_fn("f", |_, _| Ok(Value::Nil));
        let g = Value::native_fn("f", |_, _| Ok(Value::Nil));
        assert_eq!(f, f.clone());
        assert_ne!(f, g);
    }

    #[test]
    fn test_hash_consistent_with_equality() {
        let a = Value::map_from_pairs(vec![
            (Value::keyword("a"), Value::Int(1)),
            (Value::keyword("b"), Value::Int(2)),
        ]);
        let b = Value::map_from_pairs(vec![
            (Value::keyword("b"), Value::Int(2)),
            (Value::keyword("a"), Value::Int(1)),
        ]);
        assert_eq!(hash_value(&a), hash_value(&b));

        let v = Value::vector_from_vec(vec![Value::Int(1), Value::Int(2)]);
        let w = Value::vector_from_vec(vec![Value::Int(2), Value::Int(1)]);
        assert_ne!(hash_value(&v), hash_value(&w));
    }

    #[test]
    fn test_with_meta_round_trip() {
        let v = Value::vector_from_vec(vec![Value::Int(1)]);
        assert_eq!(v.meta(), None);
        let m = Value::map_from_pairs(vec![(Value::keyword("doc"), Value::string("x"))]);
        let tagged = v.with_meta(Some(m.clone())).unwrap();
        assert_eq!(tagged.meta(), Some(m));
        assert_eq!(tagged, v);
        assert_eq!(v.meta(), None);
    }

    #[test]
    fn test_type_tags() {
        assert_eq!(Value::Nil.type_tag(), "nil");
        assert_eq!(Value::Int(3).type_tag(), "int");
        assert_eq!(Value::empty_list().type_tag(), "list");
    }
}
