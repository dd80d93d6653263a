// Encoding-focused tests: the tagged value schema, function source
// text, prototype handling, and object identity, all observed through
// complete traced runs.

use jstrace::{trace, TracerConfig};
use serde_json::{json, Value};

fn last_entry(source: &str) -> Value {
    let output = trace(source, &TracerConfig::default()).expect("tracer failed");
    let blob = serde_json::to_value(&output).expect("trace serializes");
    blob["trace"]
        .as_array()
        .and_then(|t| t.last())
        .expect("non-empty trace")
        .clone()
}

/// Resolve a `["REF", id]` into its heap encoding.
fn deref<'a>(entry: &'a Value, reference: &Value) -> &'a Value {
    assert_eq!(reference[0], "REF", "not a REF: {:?}", reference);
    let id = reference[1].as_i64().expect("numeric id").to_string();
    &entry["heap"][&id]
}

#[test]
fn special_floats_are_tagged() {
    let entry = last_entry("var a = 0 / 0; var b = 1 / 0; var c = -1 / 0;");
    assert_eq!(entry["globals"]["a"], json!(["SPECIAL_FLOAT", "NaN"]));
    assert_eq!(entry["globals"]["b"], json!(["SPECIAL_FLOAT", "Infinity"]));
    assert_eq!(entry["globals"]["c"], json!(["SPECIAL_FLOAT", "-Infinity"]));
}

#[test]
fn js_special_values_are_tagged() {
    let entry = last_entry("var t = true; var f = false; var n = null; var u = undefined;");
    assert_eq!(entry["globals"]["t"], json!(["JS_SPECIAL_VAL", "true"]));
    assert_eq!(entry["globals"]["f"], json!(["JS_SPECIAL_VAL", "false"]));
    assert_eq!(entry["globals"]["n"], json!(["JS_SPECIAL_VAL", "null"]));
    assert_eq!(entry["globals"]["u"], json!(["JS_SPECIAL_VAL", "undefined"]));
}

#[test]
fn plain_numbers_and_strings_are_leaves() {
    let entry = last_entry("var i = 42; var f = 2.5; var neg = -3; var s = 'hi';");
    assert_eq!(entry["globals"]["i"], json!(42));
    assert_eq!(entry["globals"]["f"], json!(2.5));
    assert_eq!(entry["globals"]["neg"], json!(-3));
    assert_eq!(entry["globals"]["s"], json!("hi"));
}

#[test]
fn nested_arrays_get_one_heap_entry_each() {
    let entry = last_entry("var m = [[1], [2]];");
    let outer = deref(&entry, &entry["globals"]["m"]);
    assert_eq!(outer[0], "LIST");
    assert_eq!(outer.as_array().unwrap().len(), 3);
    let first = deref(&entry, &outer[1]);
    assert_eq!(*first, json!(["LIST", 1]));
    let second = deref(&entry, &outer[2]);
    assert_eq!(*second, json!(["LIST", 2]));
    assert_eq!(entry["heap"].as_object().unwrap().len(), 3);
}

#[test]
fn object_literals_encode_as_instances_in_insertion_order() {
    let entry = last_entry("var o = { b: 2, a: 1, s: 'x' };");
    let encoded = deref(&entry, &entry["globals"]["o"]);
    assert_eq!(
        *encoded,
        json!(["INSTANCE", "", ["b", 2], ["a", 1], ["s", "x"]])
    );
}

#[test]
fn error_objects_pretty_print() {
    let entry = last_entry("var e = new Error('oops');");
    let encoded = deref(&entry, &entry["globals"]["e"]);
    assert_eq!(*encoded, json!(["INSTANCE_PPRINT", "object", "Error: oops"]));
}

#[test]
fn functions_carry_their_source_text() {
    let entry = last_entry("var f = function (x) { return x; };");
    let encoded = deref(&entry, &entry["globals"]["f"]);
    assert_eq!(encoded[0], "JS_FUNCTION");
    // Anonymous function expressions have no name
    assert_eq!(encoded[1], "");
    assert_eq!(encoded[2], "function (x) { return x; }");
    assert_eq!(encoded[3], Value::Null);
    assert_eq!(encoded[4], Value::Null);
}

#[test]
fn multiline_function_bodies_get_indentation_fixup() {
    let source = "\
function wrapper() {
  function inner() {
    return 1;
  }
  return inner;
}
var f = wrapper();";
    let entry = last_entry(source);
    let encoded = deref(&entry, &entry["globals"]["f"]);
    let body = encoded[2].as_str().unwrap();
    // The closing brace is indented two spaces, so the whole body is
    // re-based to start with that indentation
    assert!(body.starts_with("  function inner() {"), "body: {:?}", body);
    assert!(body.ends_with("  }"));
}

#[test]
fn constructor_prototype_is_emitted_first_when_populated() {
    let source = "\
function C() { this.v = 1; }
C.prototype.greet = function () { return 'hi'; };
C.tag = 'ctor';
var o = new C();";
    let entry = last_entry(source);

    let func = deref(&entry, &entry["globals"]["C"]);
    assert_eq!(func[0], "JS_FUNCTION");
    let props = func[3].as_array().expect("properties present");
    assert_eq!(props[0][0], "prototype", "prototype pair comes first");
    let proto_encoding = deref(&entry, &props[0][1]);
    assert_eq!(proto_encoding[0], "INSTANCE");
    // The named own property follows
    assert_eq!(props[1][0], "tag");
    assert_eq!(props[1][1], "ctor");

    // The instance links back to the populated prototype
    let instance = deref(&entry, &entry["globals"]["o"]);
    let parts = instance.as_array().unwrap();
    assert_eq!(parts[0], "INSTANCE");
    assert_eq!(parts[2], json!(["v", 1]));
    let last = parts.last().unwrap();
    assert_eq!(last[0], "__proto__");
}

#[test]
fn plain_functions_omit_empty_prototypes() {
    let entry = last_entry("function f() { return 1; }\nvar keep = f;");
    let func = deref(&entry, &entry["globals"]["f"]);
    assert_eq!(func[3], Value::Null, "no property list for a plain function");
    assert_eq!(entry["globals"]["keep"], entry["globals"]["f"]);
}

#[test]
fn proto_pair_reflects_direct_prototype_only() {
    let source = "\
function A() {}
A.prototype.x = 1;
function B() {}
B.prototype = new A();
function C() {}
C.prototype = new B();
var a = new A();
var o = new C();";
    let entry = last_entry(source);

    // `a`'s direct prototype carries `x`, so the pair is emitted
    let a = deref(&entry, &entry["globals"]["a"]);
    let parts = a.as_array().unwrap();
    assert_eq!(parts[0], "INSTANCE");
    assert_eq!(parts.last().unwrap()[0], "__proto__");

    // `o`'s direct prototype (`new B()`) has no own properties; the
    // structure further up the chain does not count
    let o = deref(&entry, &entry["globals"]["o"]);
    assert_eq!(*o, json!(["INSTANCE", ""]));
}

#[test]
fn plain_objects_omit_default_proto() {
    let entry = last_entry("var o = { a: 1 };");
    let encoded = deref(&entry, &entry["globals"]["o"]);
    assert_eq!(*encoded, json!(["INSTANCE", "", ["a", 1]]));
}

#[test]
fn aliased_objects_share_one_id() {
    let entry = last_entry("var o = { a: 1 }; var list = [o, o]; var alias = o;");
    let o_ref = entry["globals"]["o"].clone();
    assert_eq!(entry["globals"]["alias"], o_ref);
    let list = deref(&entry, &entry["globals"]["list"]);
    assert_eq!(list[1], o_ref);
    assert_eq!(list[2], o_ref);
    // Two objects total: o and the list
    assert_eq!(entry["heap"].as_object().unwrap().len(), 2);
}

#[test]
fn mutual_references_resolve_within_one_entry() {
    let source = "\
var a = {};
var b = {};
a.other = b;
b.other = a;";
    let entry = last_entry(source);
    let a = deref(&entry, &entry["globals"]["a"]);
    let b = deref(&entry, &entry["globals"]["b"]);
    assert_eq!(a.as_array().unwrap().len(), 3);
    assert_eq!(b.as_array().unwrap().len(), 3);
    assert_eq!(a[2][0], "other");
    assert_eq!(b[2][0], "other");
    assert_eq!(a[2][1], entry["globals"]["b"]);
    assert_eq!(b[2][1], entry["globals"]["a"]);
}

#[test]
fn string_methods_and_length_work() {
    let source = "\
var s = 'Hello';
var len = s.length;
var up = s.toUpperCase();
var at = s.charAt(1);
var idx = s.indexOf('llo');";
    let entry = last_entry(source);
    assert_eq!(entry["globals"]["len"], json!(5));
    assert_eq!(entry["globals"]["up"], json!("HELLO"));
    assert_eq!(entry["globals"]["at"], json!("e"));
    assert_eq!(entry["globals"]["idx"], json!(2));
}

#[test]
fn array_methods_work() {
    let source = "\
var a = [3, 1];
a.push(2);
var popped = [5, 6].pop();
var joined = a.join('-');
var found = a.indexOf(1);
var sliced = a.slice(1);";
    let entry = last_entry(source);
    assert_eq!(entry["globals"]["popped"], json!(6));
    assert_eq!(entry["globals"]["joined"], json!("3-1-2"));
    assert_eq!(entry["globals"]["found"], json!(1));
    let sliced = deref(&entry, &entry["globals"]["sliced"]);
    assert_eq!(*sliced, json!(["LIST", 1, 2]));
}

#[test]
fn math_and_number_builtins_work() {
    let source = "\
var a = Math.floor(2.7);
var b = Math.max(1, 9, 4);
var c = Math.pow(2, 10);
var d = parseInt('  42px');
var e = parseFloat('2.5x');
var f = Number('7');
var g = isNaN('nope');";
    let entry = last_entry(source);
    assert_eq!(entry["globals"]["a"], json!(2));
    assert_eq!(entry["globals"]["b"], json!(9));
    assert_eq!(entry["globals"]["c"], json!(1024));
    assert_eq!(entry["globals"]["d"], json!(42));
    assert_eq!(entry["globals"]["e"], json!(2.5));
    assert_eq!(entry["globals"]["f"], json!(7));
    assert_eq!(entry["globals"]["g"], json!(["JS_SPECIAL_VAL", "true"]));
}

#[test]
fn heap_is_rebuilt_fresh_per_entry() {
    let output = trace(
        "var a = [1];\nvar unused = 2;\nvar b = [2];",
        &TracerConfig::default(),
    )
    .unwrap();
    let blob = serde_json::to_value(&output).unwrap();
    let trace = blob["trace"].as_array().unwrap();

    // After the first statement only `a` exists on the heap
    let first = &trace[0];
    assert_eq!(first["heap"].as_object().unwrap().len(), 1);

    // Later entries re-encode `a` under the same id and add `b`
    let last = trace.last().unwrap();
    let a_id = first["globals"]["a"][1].clone();
    assert_eq!(last["globals"]["a"][1], a_id);
    assert_eq!(last["heap"].as_object().unwrap().len(), 2);
}
