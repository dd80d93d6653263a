//! Scope-chain environments
//!
//! An [`Environment`] is one node of a frame's scope chain: the global
//! scope, a function activation, a `catch` binding scope, or a `with`
//! object scope. Bindings are insertion-ordered because the trace format
//! exposes variable order (`ordered_globals` / `ordered_varnames`).
//!
//! The chain is what the debugger surface reports per frame: the frame's
//! own activation appears as `Local`, enclosing activations appear as
//! `Closure`, and `Catch`/`With` keep their intrinsic kind.

use super::object::ObjRef;
use super::value::Value;
use indexmap::IndexMap;
use std::cell::RefCell;
use std::rc::Rc;

pub type EnvRef = Rc<RefCell<Environment>>;

/// Intrinsic scope kind of an environment node
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScopeKind {
    Global,
    /// A function activation
    Local,
    Catch,
    With,
}

/// One scope-chain node
#[derive(Debug)]
pub struct Environment {
    pub kind: ScopeKind,
    pub bindings: IndexMap<String, Value>,
    pub parent: Option<EnvRef>,
    /// Backing object for `With` scopes; bindings delegate to it
    pub with_object: Option<ObjRef>,
}

impl Environment {
    pub fn global() -> EnvRef {
        Rc::new(RefCell::new(Environment {
            kind: ScopeKind::Global,
            bindings: IndexMap::new(),
            parent: None,
            with_object: None,
        }))
    }

    pub fn local(parent: EnvRef) -> EnvRef {
        Rc::new(RefCell::new(Environment {
            kind: ScopeKind::Local,
            bindings: IndexMap::new(),
            parent: Some(parent),
            with_object: None,
        }))
    }

    pub fn catch(parent: EnvRef, param: String, error: Value) -> EnvRef {
        let mut bindings = IndexMap::new();
        bindings.insert(param, error);
        Rc::new(RefCell::new(Environment {
            kind: ScopeKind::Catch,
            bindings,
            parent: Some(parent),
            with_object: None,
        }))
    }

    pub fn with(parent: EnvRef, object: ObjRef) -> EnvRef {
        Rc::new(RefCell::new(Environment {
            kind: ScopeKind::With,
            bindings: IndexMap::new(),
            parent: Some(parent),
            with_object: Some(object),
        }))
    }

    /// Declare (or overwrite) a binding in this scope
    pub fn declare(&mut self, name: impl Into<String>, value: Value) {
        self.bindings.insert(name.into(), value);
    }

    /// True when this scope itself can resolve `name`
    fn resolves(&self, name: &str) -> bool {
        if let Some(obj) = &self.with_object {
            if obj.borrow().get_property(name).is_some() {
                return true;
            }
        }
        self.bindings.contains_key(name)
    }
}

/// Look a name up through the scope chain.
pub fn lookup(env: &EnvRef, name: &str) -> Option<Value> {
    let borrowed = env.borrow();
    if let Some(obj) = &borrowed.with_object {
        if let Some(value) = obj.borrow().get_property(name) {
            return Some(value);
        }
    }
    if let Some(value) = borrowed.bindings.get(name) {
        return Some(value.clone());
    }
    match &borrowed.parent {
        Some(parent) => lookup(parent, name),
        None => None,
    }
}

/// Assign to an existing binding through the scope chain. Returns false
/// when no scope resolves the name (strict mode: the caller throws a
/// `ReferenceError`, never creates an implicit global).
pub fn assign(env: &EnvRef, name: &str, value: Value) -> bool {
    let borrowed = env.borrow();
    if borrowed.resolves(name) {
        if let Some(obj) = &borrowed.with_object {
            if obj.borrow().get_property(name).is_some() {
                obj.borrow_mut().set_property(name, value);
                return true;
            }
        }
        drop(borrowed);
        env.borrow_mut().bindings.insert(name.to_string(), value);
        return true;
    }
    match &borrowed.parent {
        Some(parent) => {
            let parent = parent.clone();
            drop(borrowed);
            assign(&parent, name, value)
        }
        None => false,
    }
}

/// Find the nearest enclosing function activation (or the global scope)
/// where `var` declarations land.
pub fn var_target(env: &EnvRef) -> EnvRef {
    let borrowed = env.borrow();
    match borrowed.kind {
        ScopeKind::Global | ScopeKind::Local => {
            drop(borrowed);
            env.clone()
        }
        _ => {
            let parent = borrowed
                .parent
                .clone()
                .expect("catch/with scope always has a parent");
            drop(borrowed);
            var_target(&parent)
        }
    }
}
