//! Heap object representation
//!
//! Every compound JavaScript value is a [`JsObject`] behind an
//! `Rc<RefCell<..>>` reference ([`ObjRef`]). Named properties live in an
//! insertion-ordered map (property order is observable in the language
//! and in the emitted trace); array elements are kept apart from named
//! properties; functions carry their definition, captured environment,
//! and original source text.
//!
//! # Identity tag
//!
//! `heap_id` is the tracer's hidden identity tag: a small integer stamped
//! onto the object the first time the encoder sees it, so the same live
//! object keeps the same id across trace entries. It is not a property:
//! user code can never observe it, and it never appears in encodings.

use super::env::EnvRef;
use super::value::{number_to_string, Value};
use crate::parser::ast::FunctionDef;
use indexmap::IndexMap;
use std::cell::{Cell, RefCell};
use std::rc::Rc;

/// Reference to a heap-allocated object
pub type ObjRef = Rc<RefCell<JsObject>>;

/// Identifier for a native builtin, dispatched by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NativeFunc {
    ConsoleLog,
    ConsoleError,
    MathFloor,
    MathCeil,
    MathRound,
    MathAbs,
    MathSqrt,
    MathPow,
    MathMax,
    MathMin,
    ObjectKeys,
    ArrayCtor,
    ArrayIsArray,
    ArrayPush,
    ArrayPop,
    ArrayJoin,
    ArrayIndexOf,
    ArraySlice,
    StringCtor,
    StringCharAt,
    StringIndexOf,
    StringSlice,
    StringToUpperCase,
    StringToLowerCase,
    NumberCtor,
    BooleanCtor,
    ParseInt,
    ParseFloat,
    IsNaN,
    IsFinite,
    ErrorCtor,
    TypeErrorCtor,
    RangeErrorCtor,
    ReferenceErrorCtor,
    ErrorToString,
}

/// What kind of function a function object is
#[derive(Debug, Clone)]
pub enum FunctionData {
    User {
        def: Rc<FunctionDef>,
        /// Environment the function closes over
        env: EnvRef,
        /// Exact source text, `function` keyword through closing brace
        source_text: Rc<str>,
    },
    Native {
        name: &'static str,
        func: NativeFunc,
    },
}

impl FunctionData {
    pub fn name(&self) -> Option<&str> {
        match self {
            FunctionData::User { def, .. } => def.name.as_deref(),
            FunctionData::Native { name, .. } => Some(name),
        }
    }
}

/// Exotic behavior of an object
#[derive(Debug, Clone)]
pub enum ObjectKind {
    Ordinary,
    /// Indexed elements; named properties still live in `properties`
    Array(Vec<Value>),
    Function(FunctionData),
    /// Error instances; `name` and `message` are ordinary properties,
    /// the kind only switches on native `toString` behavior
    Error,
}

/// A JavaScript object
#[derive(Debug)]
pub struct JsObject {
    pub kind: ObjectKind,
    /// Named own properties in insertion order
    pub properties: IndexMap<String, Value>,
    /// Prototype link (`None` plays the role of a null prototype)
    pub prototype: Option<ObjRef>,
    /// Hidden tracer identity tag; see module docs
    pub heap_id: Cell<Option<u32>>,
}

impl JsObject {
    pub fn new(kind: ObjectKind, prototype: Option<ObjRef>) -> ObjRef {
        Rc::new(RefCell::new(JsObject {
            kind,
            properties: IndexMap::new(),
            prototype,
            heap_id: Cell::new(None),
        }))
    }

    pub fn ordinary(prototype: Option<ObjRef>) -> ObjRef {
        Self::new(ObjectKind::Ordinary, prototype)
    }

    pub fn array(elements: Vec<Value>, prototype: Option<ObjRef>) -> ObjRef {
        Self::new(ObjectKind::Array(elements), prototype)
    }

    pub fn is_callable(&self) -> bool {
        matches!(self.kind, ObjectKind::Function(_))
    }

    pub fn is_array(&self) -> bool {
        matches!(self.kind, ObjectKind::Array(_))
    }

    /// Own named property
    pub fn get_own(&self, key: &str) -> Option<Value> {
        self.properties.get(key).cloned()
    }

    /// Named property lookup through the prototype chain
    pub fn get_property(&self, key: &str) -> Option<Value> {
        if let Some(value) = self.properties.get(key) {
            return Some(value.clone());
        }
        if let Some(proto) = &self.prototype {
            return proto.borrow().get_property(key);
        }
        None
    }

    pub fn set_property(&mut self, key: impl Into<String>, value: Value) {
        self.properties.insert(key.into(), value);
    }

    /// Display form of an `Error`-kind object: `"<name>: <message>"`,
    /// degrading gracefully when either property is missing.
    pub fn error_display_string(&self) -> String {
        let name = self
            .get_property("name")
            .map(|v| v.to_display_string())
            .unwrap_or_else(|| "Error".to_string());
        let message = self
            .get_property("message")
            .map(|v| v.to_display_string())
            .unwrap_or_default();
        if message.is_empty() {
            name
        } else {
            format!("{}: {}", name, message)
        }
    }

    /// True when the object itself has own named properties or (for
    /// arrays) elements. This is the direct "non-empty object" test.
    pub fn has_own_properties(&self) -> bool {
        !self.properties.is_empty()
            || matches!(&self.kind, ObjectKind::Array(elements) if !elements.is_empty())
    }

    /// True when some object on the chain starting at `obj` has own
    /// properties. Only the encoder's function-prototype rule uses
    /// this: there, inherited structure counts even when the immediate
    /// prototype is empty.
    pub fn chain_has_own_properties(obj: &ObjRef) -> bool {
        let borrowed = obj.borrow();
        if borrowed.has_own_properties() {
            return true;
        }
        match &borrowed.prototype {
            Some(proto) => Self::chain_has_own_properties(proto),
            None => false,
        }
    }
}

/// Array index parse: canonical non-negative decimal only (`"10"` yes,
/// `"010"` no), mirroring JS array index semantics.
pub fn as_array_index(key: &str) -> Option<usize> {
    let index: usize = key.parse().ok()?;
    if number_to_string(index as f64) == key {
        Some(index)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn property_order_is_insertion_order() {
        let obj = JsObject::ordinary(None);
        obj.borrow_mut().set_property("b", Value::Number(1.0));
        obj.borrow_mut().set_property("a", Value::Number(2.0));
        let keys: Vec<String> = obj.borrow().properties.keys().cloned().collect();
        assert_eq!(keys, vec!["b".to_string(), "a".to_string()]);
    }

    #[test]
    fn prototype_chain_lookup() {
        let proto = JsObject::ordinary(None);
        proto.borrow_mut().set_property("x", Value::Number(7.0));
        let obj = JsObject::ordinary(Some(proto));
        assert!(matches!(
            obj.borrow().get_property("x"),
            Some(Value::Number(n)) if n == 7.0
        ));
        assert!(obj.borrow().get_own("x").is_none());
    }

    #[test]
    fn own_property_check_does_not_walk_the_chain() {
        let root = JsObject::ordinary(None);
        root.borrow_mut().set_property("x", Value::Number(1.0));
        let mid = JsObject::ordinary(Some(root));
        assert!(!mid.borrow().has_own_properties());
        assert!(JsObject::chain_has_own_properties(&mid));
    }

    #[test]
    fn array_index_keys() {
        assert_eq!(as_array_index("0"), Some(0));
        assert_eq!(as_array_index("12"), Some(12));
        assert_eq!(as_array_index("012"), None);
        assert_eq!(as_array_index("-1"), None);
        assert_eq!(as_array_index("x"), None);
    }
}
