//! Heap/value encoder
//!
//! Recursive encoding of runtime values into the visualizer's tagged
//! JSON schema, with the side effect of populating a per-entry heap
//! table. Primitives become leaves; every compound value becomes
//! `["REF", id]` with its full encoding stored in the heap table under
//! that id.
//!
//! Cycles and shared subgraphs terminate because an id already present
//! in the table is never re-encoded, and a placeholder is inserted
//! *before* recursing into an object's contents.

use crate::memory::object::{FunctionData, JsObject, ObjRef, ObjectKind};
use crate::memory::value::Value;
use crate::tracer::registry::ObjectRegistry;
use crate::tracer::schema::JsonMap;
use serde_json::{json, Value as JsonValue};

/// Per-entry encoder. Create one per trace entry (the heap table is a
/// fresh point-in-time snapshot); the [`ObjectRegistry`] it borrows
/// lives for the whole run so ids persist across entries.
pub struct HeapEncoder<'a> {
    objects: &'a mut ObjectRegistry,
    heap: JsonMap,
}

impl<'a> HeapEncoder<'a> {
    pub fn new(objects: &'a mut ObjectRegistry) -> Self {
        HeapEncoder {
            objects,
            heap: JsonMap::new(),
        }
    }

    /// The populated heap table, keyed by decimal object id in first
    /// encounter order.
    pub fn into_heap(self) -> JsonMap {
        self.heap
    }

    /// Encode a value, populating the heap table for compounds.
    pub fn encode(&mut self, value: &Value) -> JsonValue {
        match value {
            Value::Undefined => json!(["JS_SPECIAL_VAL", "undefined"]),
            Value::Null => json!(["JS_SPECIAL_VAL", "null"]),
            Value::Bool(b) => json!(["JS_SPECIAL_VAL", b.to_string()]),
            Value::Number(n) => encode_number(*n),
            Value::Str(s) => json!(s.as_ref()),
            Value::Object(obj) => {
                let id = self.objects.id_of(obj);
                let reference = json!(["REF", id]);
                let key = id.to_string();
                if self.heap.contains_key(&key) {
                    return reference;
                }
                // Placeholder first so cycles close on the REF above
                self.heap.insert(key.clone(), JsonValue::Null);
                let encoded = self.encode_object(obj);
                self.heap.insert(key, encoded);
                reference
            }
        }
    }

    fn encode_object(&mut self, obj: &ObjRef) -> JsonValue {
        // Clone out what we need before recursing; recursion may visit
        // this same object again (cycles), which only needs its id.
        enum Shape {
            Function {
                name: String,
                body: String,
                prototype: Option<ObjRef>,
                properties: Vec<(String, Value)>,
            },
            List(Vec<Value>),
            PPrint(String),
            Instance {
                properties: Vec<(String, Value)>,
                proto: Option<ObjRef>,
            },
        }

        let shape = {
            let borrowed = obj.borrow();
            match &borrowed.kind {
                ObjectKind::Function(data) => {
                    let name = data.name().unwrap_or_default().to_string();
                    let body = match data {
                        FunctionData::User { source_text, .. } => {
                            fix_body_indentation(source_text)
                        }
                        FunctionData::Native { name, .. } => {
                            format!("function {}() {{ [native code] }}", name)
                        }
                    };
                    let prototype = borrowed.get_own("prototype").and_then(|v| match v {
                        Value::Object(p) => Some(p),
                        _ => None,
                    });
                    let properties = borrowed
                        .properties
                        .iter()
                        .filter(|(key, _)| key.as_str() != "prototype")
                        .map(|(key, value)| (key.clone(), value.clone()))
                        .collect();
                    Shape::Function {
                        name,
                        body,
                        prototype,
                        properties,
                    }
                }
                ObjectKind::Array(elements) => Shape::List(elements.clone()),
                ObjectKind::Error => Shape::PPrint(borrowed.error_display_string()),
                ObjectKind::Ordinary => Shape::Instance {
                    properties: borrowed
                        .properties
                        .iter()
                        .map(|(key, value)| (key.clone(), value.clone()))
                        .collect(),
                    proto: borrowed.prototype.clone(),
                },
            }
        };

        match shape {
            Shape::Function {
                name,
                body,
                prototype,
                properties,
            } => {
                let mut pairs: Vec<JsonValue> = Vec::new();
                if let Some(proto) = prototype {
                    // Emit the prototype first when it carries structure:
                    // own properties, or inheritance further up its chain
                    if JsObject::chain_has_own_properties(&proto) {
                        let encoded = self.encode(&Value::Object(proto));
                        pairs.push(json!(["prototype", encoded]));
                    }
                }
                for (key, value) in &properties {
                    let encoded = self.encode(value);
                    pairs.push(json!([key, encoded]));
                }
                let properties_json = if pairs.is_empty() {
                    JsonValue::Null
                } else {
                    JsonValue::Array(pairs)
                };
                json!(["JS_FUNCTION", name, body, properties_json, null])
            }

            Shape::List(elements) => {
                let mut encoded = vec![json!("LIST")];
                for element in &elements {
                    encoded.push(self.encode(element));
                }
                JsonValue::Array(encoded)
            }

            Shape::PPrint(text) => {
                debug_assert!(!text.is_empty() && text != "[object Object]");
                json!(["INSTANCE_PPRINT", "object", text])
            }

            Shape::Instance { properties, proto } => {
                let mut encoded = vec![json!("INSTANCE"), json!("")];
                for (key, value) in &properties {
                    let encoded_key = self.encode(&Value::string(key.as_str()));
                    let encoded_value = self.encode(value);
                    encoded.push(json!([encoded_key, encoded_value]));
                }
                if let Some(proto) = proto {
                    // Unlike the function-prototype rule, only the
                    // direct prototype's own contents count here
                    if proto.borrow().has_own_properties() {
                        let encoded_proto = self.encode(&Value::Object(proto));
                        encoded.push(json!(["__proto__", encoded_proto]));
                    }
                }
                JsonValue::Array(encoded)
            }
        }
    }
}

/// Numbers: non-special floats are plain JSON numbers; integral values
/// serialize as JSON integers, the way a JS runtime stringifies them.
fn encode_number(n: f64) -> JsonValue {
    if n.is_nan() {
        json!(["SPECIAL_FLOAT", "NaN"])
    } else if n == f64::INFINITY {
        json!(["SPECIAL_FLOAT", "Infinity"])
    } else if n == f64::NEG_INFINITY {
        json!(["SPECIAL_FLOAT", "-Infinity"])
    } else if n.fract() == 0.0 && n.abs() <= 9_007_199_254_740_992.0 {
        json!(n as i64)
    } else {
        json!(n)
    }
}

/// If a function body's last line is a bare `}` with leading
/// whitespace, prepend that whitespace to the whole body so the first
/// line's indentation matches the closing brace.
fn fix_body_indentation(body: &str) -> String {
    if let Some(last_line) = body.lines().last() {
        let trimmed = last_line.trim_start();
        if trimmed == "}" {
            let indent = &last_line[..last_line.len() - trimmed.len()];
            if !indent.is_empty() {
                return format!("{}{}", indent, body);
            }
        }
    }
    body.to_string()
}
