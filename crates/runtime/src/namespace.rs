//! Namespaces, Vars, and the dynamic binding stack
//!
//! A namespace owns three tables: interned Vars, referred Vars
//! (mappings into other namespaces), and aliases. Vars hold a root
//! value plus metadata flags; `deref` consults the per-task binding
//! stack before falling back to the root.
//!
//! The binding stack and the with-redefs root swap both restore state
//! through RAII guards, so every exit path - including error returns -
//! unwinds them.

use crate::error::RuntimeError;
use crate::value::Value;
use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;
use tracing::{debug, trace};

/// The core namespace; always present, never removable.
pub const CORE_NS: &str = "clojure.core";

/// A named cell in a namespace.
#[derive(Debug)]
pub struct Var {
    pub ns: String,
    pub sym: String,
    root: RefCell<Value>,
    dynamic: Cell<bool>,
    private: Cell<bool>,
    doc: RefCell<Option<String>>,
    arglists: RefCell<Option<String>>,
}

impl Var {
    pub fn new(ns: impl Into<String>, sym: impl Into<String>, root: Value) -> Self {
        Self {
            ns: ns.into(),
            sym: sym.into(),
            root: RefCell::new(root),
            dynamic: Cell::new(false),
            private: Cell::new(false),
            doc: RefCell::new(None),
            arglists: RefCell::new(None),
        }
    }

    pub fn root(&self) -> Value {
        self.root.borrow().clone()
    }

    pub fn set_root(&self, v: Value) {
        *self.root.borrow_mut() = v;
    }

    pub fn is_dynamic(&self) -> bool {
        self.dynamic.get()
    }

    pub fn set_dynamic(&self, flag: bool) {
        self.dynamic.set(flag);
    }

    pub fn is_private(&self) -> bool {
        self.private.get()
    }

    pub fn set_private(&self, flag: bool) {
        self.private.set(flag);
    }

    pub fn doc(&self) -> Option<String> {
        self.doc.borrow().clone()
    }

    pub fn set_doc(&self, doc: Option<String>) {
        *self.doc.borrow_mut() = doc;
    }

    pub fn arglists(&self) -> Option<String> {
        self.arglists.borrow().clone()
    }

    pub fn set_arglists(&self, arglists: Option<String>) {
        *self.arglists.borrow_mut() = arglists;
    }

    /// Fully qualified `ns/sym` spelling.
    pub fn qualified_name(&self) -> String {
        format!("{}/{}", self.ns, self.sym)
    }
}

/// A named container of Var mappings plus refer and alias tables.
#[derive(Debug)]
pub struct Namespace {
    name: String,
    interns: RefCell<HashMap<String, Rc<Var>>>,
    refers: RefCell<HashMap<String, Rc<Var>>>,
    // Alias -> namespace NAME; resolution goes back through the
    // environment so removed namespaces dangle instead of leaking.
    aliases: RefCell<HashMap<String, String>>,
}

impl Namespace {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            interns: RefCell::new(HashMap::new()),
            refers: RefCell::new(HashMap::new()),
            aliases: RefCell::new(HashMap::new()),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Create or locate the Var named `sym` in this namespace.
    pub fn intern(&self, sym: &str) -> Rc<Var> {
        let mut interns = self.interns.borrow_mut();
        interns
            .entry(sym.to_string())
            .or_insert_with(|| Rc::new(Var::new(self.name.clone(), sym, Value::Nil)))
            .clone()
    }

    /// Intern and bind the root in one step.
    pub fn intern_with_root(&self, sym: &str, root: Value) -> Rc<Var> {
        let var = self.intern(sym);
        var.set_root(root);
        var
    }

    pub fn lookup_intern(&self, sym: &str) -> Option<Rc<Var>> {
        self.interns.borrow().get(sym).cloned()
    }

    /// Interns first, then refers - the namespace's full symbol map.
    pub fn lookup(&self, sym: &str) -> Option<Rc<Var>> {
        self.lookup_intern(sym)
            .or_else(|| self.refers.borrow().get(sym).cloned())
    }

    /// Map `sym` to a Var owned by another namespace.
    pub fn refer(&self, sym: &str, var: Rc<Var>) {
        self.refers.borrow_mut().insert(sym.to_string(), var);
    }

    /// Delete the `sym` mapping (interned or referred) in this
    /// namespace only.
    pub fn unmap(&self, sym: &str) {
        self.interns.borrow_mut().remove(sym);
        self.refers.borrow_mut().remove(sym);
    }

    pub fn add_alias(&self, short: &str, ns_name: &str) {
        self.aliases
            .borrow_mut()
            .insert(short.to_string(), ns_name.to_string());
    }

    pub fn remove_alias(&self, short: &str) {
        self.aliases.borrow_mut().remove(short);
    }

    pub fn alias_target(&self, short: &str) -> Option<String> {
        self.aliases.borrow().get(short).cloned()
    }

    pub fn interns_snapshot(&self) -> Vec<(String, Rc<Var>)> {
        let mut out: Vec<_> = self
            .interns
            .borrow()
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        out.sort_by(|a, b| a.0.cmp(&b.0));
        out
    }

    /// Interned Vars that are not marked private.
    pub fn publics_snapshot(&self) -> Vec<(String, Rc<Var>)> {
        self.interns_snapshot()
            .into_iter()
            .filter(|(_, v)| !v.is_private())
            .collect()
    }

    pub fn refers_snapshot(&self) -> Vec<(String, Rc<Var>)> {
        let mut out: Vec<_> = self
            .refers
            .borrow()
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        out.sort_by(|a, b| a.0.cmp(&b.0));
        out
    }

    pub fn aliases_snapshot(&self) -> Vec<(String, String)> {
        let mut out: Vec<_> = self
            .aliases
            .borrow()
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        out.sort();
        out
    }
}

/// Process-wide namespace registry (per runtime context).
#[derive(Debug)]
pub struct Environment {
    namespaces: RefCell<HashMap<String, Rc<Namespace>>>,
}

impl Default for Environment {
    fn default() -> Self {
        Self::new()
    }
}

impl Environment {
    /// A fresh environment with `clojure.core` pre-created.
    pub fn new() -> Self {
        let env = Self {
            namespaces: RefCell::new(HashMap::new()),
        };
        env.ensure_ns(CORE_NS);
        env
    }

    pub fn find_ns(&self, name: &str) -> Option<Rc<Namespace>> {
        self.namespaces.borrow().get(name).cloned()
    }

    /// Find or create a namespace.
    pub fn ensure_ns(&self, name: &str) -> Rc<Namespace> {
        if let Some(ns) = self.find_ns(name) {
            return ns;
        }
        debug!(ns = name, "creating namespace");
        let ns = Rc::new(Namespace::new(name));
        self.namespaces
            .borrow_mut()
            .insert(name.to_string(), ns.clone());
        ns
    }

    /// Remove a namespace, destroying its Vars. `clojure.core` is not
    /// removable.
    pub fn remove_ns(&self, name: &str) -> Result<Option<Rc<Namespace>>, RuntimeError> {
        if name == CORE_NS {
            return Err(RuntimeError::IllegalState(format!(
                "cannot remove namespace {}",
                CORE_NS
            )));
        }
        debug!(ns = name, "removing namespace");
        Ok(self.namespaces.borrow_mut().remove(name))
    }

    pub fn all_ns(&self) -> Vec<Rc<Namespace>> {
        let mut out: Vec<_> = self.namespaces.borrow().values().cloned().collect();
        out.sort_by(|a, b| a.name().cmp(b.name()));
        out
    }
}

/// One layer of dynamic Var overrides.
pub type BindingFrame = Vec<(Rc<Var>, Value)>;

/// Per-task stack of binding frames. The handle is `Rc`-shared so RAII
/// guards can pop without borrowing the runtime context.
#[derive(Debug, Clone, Default)]
pub struct BindingStack {
    frames: Rc<RefCell<Vec<BindingFrame>>>,
}

impl BindingStack {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn depth(&self) -> usize {
        self.frames.borrow().len()
    }

    pub fn push(&self, frame: BindingFrame) {
        trace!(depth = self.depth() + 1, "push binding frame");
        self.frames.borrow_mut().push(frame);
    }

    pub fn pop(&self) -> Result<(), RuntimeError> {
        trace!(depth = self.depth(), "pop binding frame");
        match self.frames.borrow_mut().pop() {
            Some(_) => Ok(()),
            None => Err(RuntimeError::IllegalState(
                "pop-thread-bindings with no pushed frame".to_string(),
            )),
        }
    }

    /// The topmost override for `var`, if any frame binds it.
    pub fn lookup(&self, var: &Rc<Var>) -> Option<Value> {
        let frames = self.frames.borrow();
        for frame in frames.iter().rev() {
            for (v, val) in frame {
                if Rc::ptr_eq(v, var) {
                    return Some(val.clone());
                }
            }
        }
        None
    }

    pub fn is_bound(&self, var: &Rc<Var>) -> bool {
        self.lookup(var).is_some()
    }

    /// Replace the topmost override for `var`. False when no frame
    /// binds it.
    pub fn set(&self, var: &Rc<Var>, value: Value) -> bool {
        let mut frames = self.frames.borrow_mut();
        for frame in frames.iter_mut().rev() {
            for (v, slot) in frame.iter_mut() {
                if Rc::ptr_eq(v, var) {
                    *slot = value;
                    return true;
                }
            }
        }
        false
    }

    /// Push `frame` and return a guard that pops it when dropped.
    pub fn guard(&self, frame: BindingFrame) -> BindingGuard {
        self.push(frame);
        BindingGuard {
            stack: self.clone(),
        }
    }
}

/// Pops one binding frame on drop; covers error exits from scoped
/// binding operators.
pub struct BindingGuard {
    stack: BindingStack,
}

impl Drop for BindingGuard {
    fn drop(&mut self) {
        let _ = self.stack.pop();
    }
}

/// Captures Var roots at construction and writes them back on drop.
/// Used by `with-redefs-fn`, which swaps roots rather than pushing
/// binding frames.
pub struct RootRestoreGuard {
    saved: Vec<(Rc<Var>, Value)>,
}

impl RootRestoreGuard {
    pub fn capture(vars: impl IntoIterator<Item = Rc<Var>>) -> Self {
        Self {
            saved: vars.into_iter().map(|v| (v.clone(), v.root())).collect(),
        }
    }
}

impl Drop for RootRestoreGuard {
    fn drop(&mut self) {
        for (var, old_root) in self.saved.drain(..) {
            var.set_root(old_root);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_intern_is_idempotent() {
        let ns = Namespace::new("user");
        let a = ns.intern("x");
        let b = ns.intern("x");
        assert!(Rc::ptr_eq(&a, &b));
        assert_eq!(a.qualified_name(), "user/x");
    }

    #[test]
    fn test_lookup_prefers_interns_over_refers() {
        let ns = Namespace::new("user");
        let foreign = Rc::new(Var::new("other", "x", Value::Int(1)));
        ns.refer("x", foreign);
        let local = ns.intern_with_root("x", Value::Int(2));
        assert!(Rc::ptr_eq(&ns.lookup("x").unwrap(), &local));
    }

    #[test]
    fn test_unmap_removes_only_here() {
        let env = Environment::new();
        let a = env.ensure_ns("a");
        let b = env.ensure_ns("b");
        a.intern("x");
        b.intern("x");
        a.unmap("x");
        assert!(a.lookup("x").is_none());
        assert!(b.lookup("x").is_some());
    }

    #[test]
    fn test_core_ns_is_not_removable() {
        let env = Environment::new();
        assert!(env.remove_ns(CORE_NS).is_err());
        env.ensure_ns("scratch");
        assert!(env.remove_ns("scratch").unwrap().is_some());
        assert!(env.find_ns("scratch").is_none());
    }

    #[test]
    fn test_binding_stack_shadowing() {
        let stack = BindingStack::new();
        let var = Rc::new(Var::new("user", "*x*", Value::Int(1)));
        var.set_dynamic(true);

        assert!(stack.lookup(&var).is_none());
        stack.push(vec![(var.clone(), Value::Int(7))]);
        assert_eq!(stack.lookup(&var), Some(Value::Int(7)));
        stack.push(vec![(var.clone(), Value::Int(9))]);
        assert_eq!(stack.lookup(&var), Some(Value::Int(9)));
        stack.pop().unwrap();
        assert_eq!(stack.lookup(&var), Some(Value::Int(7)));
        stack.pop().unwrap();
        assert!(stack.lookup(&var).is_none());
        assert!(stack.pop().is_err());
    }

    #[test]
    fn test_binding_guard_pops_on_drop() {
        let stack = BindingStack::new();
        let var = Rc::new(Var::new("user", "*x*", Value::Int(1)));
        {
            let _guard = stack.guard(vec![(var.clone(), Value::Int(5))]);
            assert_eq!(stack.depth(), 1);
        }
        assert_eq!(stack.depth(), 0);
    }

    #[test]
    fn test_root_restore_guard() {
        let var = Rc::new(Var::new("user", "f", Value::Int(1)));
        {
            let _guard = RootRestoreGuard::capture([var.clone()]);
            var.set_root(Value::Int(99));
            assert_eq!(var.root(), Value::Int(99));
        }
        assert_eq!(var.root(), Value::Int(1));
    }

    #[test]
    fn test_binding_set() {
        let stack = BindingStack::new();
        let var = Rc::new(Var::new("user", "*x*", Value::Int(1)));
        assert!(!stack.set(&var, Value::Int(2)));
        stack.push(vec![(var.clone(), Value::Int(2))]);
        assert!(stack.set(&var, Value::Int(3)));
        assert_eq!(stack.lookup(&var), Some(Value::Int(3)));
    }
}
