// Integration tests for the execution tracer

use jstrace::{trace, TracerConfig};
use serde_json::{json, Value};

fn run_trace(source: &str) -> Value {
    let output = trace(source, &TracerConfig::default()).expect("tracer failed");
    serde_json::to_value(&output).expect("trace serializes")
}

fn entries(blob: &Value) -> &Vec<Value> {
    blob["trace"].as_array().expect("trace is an array")
}

fn events(blob: &Value) -> Vec<&str> {
    entries(blob)
        .iter()
        .map(|e| e["event"].as_str().expect("event tag"))
        .collect()
}

/// Top (highlighted) rendered frame of an entry, if any.
fn top_frame(entry: &Value) -> Option<&Value> {
    entry["stack_to_render"].as_array().and_then(|s| s.last())
}

#[test]
fn straight_line_code_shows_growing_globals() {
    let blob = run_trace("var x=1; var y=2; var z=x+y;");
    let trace = entries(&blob);

    assert_eq!(events(&blob), vec!["step_line", "step_line", "step_line"]);

    let third = &trace[2];
    assert_eq!(third["globals"]["x"], json!(1));
    assert_eq!(third["globals"]["y"], json!(2));
    assert_eq!(third["globals"]["z"], json!(3));
    assert_eq!(third["ordered_globals"], json!(["x", "y", "z"]));
    assert_eq!(third["heap"], json!({}));
    assert_eq!(third["stack_to_render"], json!([]));
}

#[test]
fn function_call_produces_call_and_return_entries() {
    let blob = run_trace("function f(n){return n+1;} var r=f(41);");
    let trace = entries(&blob);

    // Exactly one entry per step: the call boundary, the return point,
    // and the completed assignment. A `return` never fires twice.
    assert_eq!(events(&blob), vec!["call", "return", "step_line"]);

    let call = trace
        .iter()
        .find(|e| e["event"] == "call")
        .expect("a call entry exists");
    let frame = top_frame(call).expect("call entry has a frame");
    assert_eq!(frame["func_name"], "f");
    // At the call boundary the parameter still holds the argument
    assert_eq!(frame["encoded_locals"]["n"], json!(41));
    assert!(frame["is_highlighted"].as_bool().unwrap());

    let ret = trace
        .iter()
        .find(|e| e["event"] == "return")
        .expect("a return entry exists");
    let frame = top_frame(ret).expect("return entry has a frame");
    assert_eq!(frame["encoded_locals"]["__return__"], json!(42));
    // __return__ is appended last
    assert_eq!(
        frame["ordered_varnames"].as_array().unwrap().last().unwrap(),
        "__return__"
    );

    let last = trace.last().unwrap();
    assert_eq!(last["globals"]["r"], json!(42));
}

#[test]
fn cyclic_array_has_single_heap_entry_with_self_ref() {
    let blob = run_trace("var a=[1,2]; a.push(a);");
    let trace = entries(&blob);
    let last = trace.last().unwrap();

    let heap = last["heap"].as_object().unwrap();
    assert_eq!(heap.len(), 1);
    let (id, encoding) = heap.iter().next().unwrap();
    let id: i64 = id.parse().unwrap();
    assert_eq!(*encoding, json!(["LIST", 1, 2, ["REF", id]]));
    assert_eq!(last["globals"]["a"], json!(["REF", id]));
}

#[test]
fn constructor_frames_are_tagged_and_return_the_receiver() {
    let blob = run_trace("function C(){this.x=1;} var o=new C();");
    let trace = entries(&blob);

    let call = trace
        .iter()
        .find(|e| e["event"] == "call")
        .expect("constructor call entry");
    let frame = top_frame(call).expect("frame rendered");
    assert_eq!(frame["func_name"], "C (constructor)");
    let names = frame["ordered_varnames"].as_array().unwrap();
    assert_eq!(names[0], "this");

    let ret = trace
        .iter()
        .find(|e| e["event"] == "return")
        .expect("constructor return entry");
    let frame = top_frame(ret).unwrap();
    // For constructors __return__ is the receiver
    let returned = &frame["encoded_locals"]["__return__"];
    assert_eq!(returned[0], "REF");
    let this_ref = &frame["encoded_locals"]["this"];
    assert_eq!(returned, this_ref);

    let last = trace.last().unwrap();
    let o_ref = &last["globals"]["o"];
    assert_eq!(o_ref[0], "REF");
    let id = o_ref[1].as_i64().unwrap().to_string();
    assert_eq!(last["heap"][&id], json!(["INSTANCE", "", ["x", 1]]));
}

#[test]
fn uncaught_exception_is_the_final_entry() {
    let blob = run_trace("throw new Error('boom');");
    let trace = entries(&blob);

    let last = trace.last().unwrap();
    assert_eq!(last["event"], "exception");
    let msg = last["exception_msg"].as_str().unwrap();
    assert!(msg.contains("boom"), "message was {:?}", msg);
    assert_eq!(last["line"], json!(1));
}

#[test]
fn syntax_error_yields_single_positioned_entry() {
    let blob = run_trace("var bad = (;");
    let trace = entries(&blob);

    assert_eq!(trace.len(), 1);
    let entry = &trace[0];
    assert_eq!(entry["event"], "uncaught_exception");
    assert!(entry["exception_msg"]
        .as_str()
        .unwrap()
        .starts_with("SyntaxError"));
    assert_eq!(entry["line"], json!(1));
    assert_eq!(entry["col"], json!(11));
}

#[test]
fn step_budget_appends_terminal_entry() {
    let config = TracerConfig {
        max_steps: 10,
        ..TracerConfig::default()
    };
    let output = trace("while (true) {}", &config).expect("tracer failed");
    let blob = serde_json::to_value(&output).unwrap();
    let trace = entries(&blob);

    assert_eq!(trace.len(), 11);
    let last = trace.last().unwrap();
    assert_eq!(last["event"], "instruction_limit_reached");
    assert_eq!(
        last["exception_msg"],
        "(stopped after 10 steps to prevent possible infinite loop)"
    );
}

#[test]
fn empty_source_produces_empty_trace_but_a_blob() {
    let blob = run_trace("");
    assert_eq!(blob["code"], "");
    assert_eq!(entries(&blob).len(), 0);
}

#[test]
fn closure_variables_are_inlined_with_parent_prefix() {
    let source = "\
function outer() {
  var a = 1;
  function inner() { return a + 1; }
  return inner();
}
var r = outer();";
    let blob = run_trace(source);
    let trace = entries(&blob);

    let inner_entry = trace
        .iter()
        .find(|e| {
            top_frame(e).is_some_and(|f| f["func_name"] == "inner" && e["event"] == "call")
        })
        .expect("inner call entry");
    let frame = top_frame(inner_entry).unwrap();
    assert_eq!(frame["encoded_locals"]["parent:a"], json!(1));
    assert_eq!(frame["parent_frame_id_list"], json!([]));

    let last = trace.last().unwrap();
    assert_eq!(last["globals"]["r"], json!(2));
}

#[test]
fn second_level_closure_uses_numbered_prefix() {
    let source = "\
function f1() {
  var a = 1;
  function f2() {
    var b = 2;
    function f3() { return a + b; }
    return f3();
  }
  return f2();
}
var r = f1();";
    let blob = run_trace(source);
    let trace = entries(&blob);

    let f3_entry = trace
        .iter()
        .find(|e| top_frame(e).is_some_and(|f| f["func_name"] == "f3"))
        .expect("f3 entry");
    let locals = &top_frame(f3_entry).unwrap()["encoded_locals"];
    assert_eq!(locals["parent:b"], json!(2));
    assert_eq!(locals["parent2:a"], json!(1));

    assert_eq!(entries(&blob).last().unwrap()["globals"]["r"], json!(3));
}

#[test]
fn with_scope_bindings_are_inlined() {
    let source = "\
function f() {
  var obj = { a: 1 };
  var r = 0;
  with (obj) { r = a; }
  return r;
}
var r = f();";
    let blob = run_trace(source);
    let trace = entries(&blob);

    let with_entry = trace
        .iter()
        .find(|e| {
            top_frame(e).is_some_and(|f| {
                f["encoded_locals"].as_object().is_some_and(|l| l.contains_key("parent:a"))
            })
        })
        .expect("an entry inside the with body");
    let locals = &top_frame(with_entry).unwrap()["encoded_locals"];
    assert_eq!(locals["parent:a"], json!(1));
    assert_eq!(locals["r"], json!(1));

    assert_eq!(trace.last().unwrap()["globals"]["r"], json!(1));
}

#[test]
fn repeated_calls_get_fresh_frame_ids() {
    let blob = run_trace("function f() { return 1; } var a = f(); var b = f();");
    let trace = entries(&blob);

    let ids: Vec<i64> = trace
        .iter()
        .filter(|e| e["event"] == "call")
        .map(|e| top_frame(e).unwrap()["frame_id"].as_i64().unwrap())
        .collect();
    assert_eq!(ids.len(), 2);
    assert_ne!(ids[0], ids[1], "recycled raw frame must get a fresh id");
}

#[test]
fn recursion_gives_each_activation_its_own_frame_id() {
    let source = "function rec(n) { if (n == 0) { return 0; } return rec(n - 1); } var r = rec(2);";
    let blob = run_trace(source);
    let trace = entries(&blob);

    // Deepest stack: three rec frames, all distinct ids
    let deepest = trace
        .iter()
        .filter_map(|e| e["stack_to_render"].as_array())
        .max_by_key(|s| s.len())
        .expect("some stack");
    assert_eq!(deepest.len(), 3);
    let ids: std::collections::HashSet<i64> = deepest
        .iter()
        .map(|f| f["frame_id"].as_i64().unwrap())
        .collect();
    assert_eq!(ids.len(), 3);
}

#[test]
fn caught_exception_resumes_execution() {
    let source = "\
var r = 0;
try { throw new Error('x'); } catch (e) { r = 1; }
var s = r;";
    let blob = run_trace(source);
    let trace = entries(&blob);

    assert!(events(&blob).contains(&"exception"));
    let last = trace.last().unwrap();
    assert_eq!(last["event"], "step_line");
    assert_eq!(last["globals"]["s"], json!(1));
}

#[test]
fn top_level_catch_binding_appears_in_globals() {
    let source = "try { throw new Error('x'); } catch (err) { var m = 1; }";
    let blob = run_trace(source);
    let trace = entries(&blob);

    let in_catch = trace
        .iter()
        .find(|e| e["globals"]["m"] == json!(1))
        .expect("entry inside catch body");
    let ordered: Vec<&str> = in_catch["ordered_globals"]
        .as_array()
        .unwrap()
        .iter()
        .map(|v| v.as_str().unwrap())
        .collect();
    // Catch scope is scanned before the global scope
    assert_eq!(ordered.first(), Some(&"err"));
    assert!(ordered.contains(&"m"));
}

#[test]
fn native_throw_is_attributed_to_last_user_position() {
    let blob = run_trace("var x = 1;\nvar a = new Array(-1);");
    let trace = entries(&blob);

    let last = trace.last().unwrap();
    assert_eq!(last["event"], "exception");
    let msg = last["exception_msg"].as_str().unwrap();
    assert!(msg.contains("Invalid array length"), "message: {:?}", msg);
    // Attributed to the previous entry's position, not the native frame
    assert_eq!(last["line"], trace[trace.len() - 2]["line"]);
}

#[test]
fn stdout_accumulates_across_entries() {
    let blob = run_trace("console.log('hello');\nconsole.log('world');");
    let trace = entries(&blob);

    assert_eq!(trace[0]["stdout"], "hello\n");
    assert_eq!(trace[1]["stdout"], "hello\nworld\n");

    // Monotonic under concatenation
    let mut prev = String::new();
    for entry in trace {
        let now = entry["stdout"].as_str().unwrap();
        assert!(now.starts_with(&prev));
        prev = now.to_string();
    }
}

#[test]
fn reference_error_traces_as_exception() {
    let blob = run_trace("var x = missingVar;");
    let last = entries(&blob).last().unwrap().clone();
    assert_eq!(last["event"], "exception");
    assert!(last["exception_msg"]
        .as_str()
        .unwrap()
        .contains("missingVar is not defined"));
}

#[test]
fn function_declarations_are_hoisted() {
    let blob = run_trace("var r = f();\nfunction f() { return 7; }");
    assert_eq!(entries(&blob).last().unwrap()["globals"]["r"], json!(7));
}

#[test]
fn intrinsic_globals_are_filtered() {
    let blob = run_trace("var mine = 1;");
    for entry in entries(&blob) {
        let globals = entry["globals"].as_object().unwrap();
        for intrinsic in ["console", "Math", "Error", "parseInt", "NaN", "undefined"] {
            assert!(!globals.contains_key(intrinsic), "{} leaked", intrinsic);
        }
        assert!(globals.contains_key("mine"));
    }
}

#[test]
fn extra_ignored_globals_are_configurable() {
    let config = TracerConfig {
        extra_ignored_globals: vec!["hidden".to_string()],
        ..TracerConfig::default()
    };
    let output = trace("var hidden = 1; var shown = 2;", &config).unwrap();
    let blob = serde_json::to_value(&output).unwrap();
    let last = entries(&blob).last().unwrap().clone();
    assert!(!last["globals"].as_object().unwrap().contains_key("hidden"));
    assert_eq!(last["globals"]["shown"], json!(2));
}

#[test]
fn object_ids_are_stable_across_entries() {
    let blob = run_trace("var o = { v: 1 };\nvar p = o;\nvar q = p;");
    let trace = entries(&blob);

    let first_id = trace
        .iter()
        .find_map(|e| e["globals"]["o"].as_array().map(|r| r[1].clone()))
        .expect("o encoded somewhere");
    for entry in trace {
        if let Some(reference) = entry["globals"]["o"].as_array() {
            assert_eq!(reference[1], first_id);
        }
        if let Some(reference) = entry["globals"]["p"].as_array() {
            assert_eq!(reference[1], first_id, "alias shares the id");
        }
    }
}

#[test]
fn call_entries_extend_the_previous_stack_by_one() {
    let source = "\
function inner() { return 1; }
function outer() { return inner(); }
var r = outer();";
    let blob = run_trace(source);
    let trace = entries(&blob);

    for pair in trace.windows(2) {
        if pair[1]["event"] == "call" {
            let prev = pair[0]["stack_to_render"].as_array().unwrap();
            let cur = pair[1]["stack_to_render"].as_array().unwrap();
            assert_eq!(cur.len(), prev.len() + 1);
            for (a, b) in prev.iter().zip(cur.iter()) {
                assert_eq!(a["frame_id"], b["frame_id"], "lower frames match");
            }
        }
    }
}

#[test]
fn unique_hash_and_ordered_names_invariants_hold() {
    let source = "\
function C() { this.x = 1; }
function f(a) { var b = a + 1; return new C(); }
var r = f(1);
var s = [r, r];";
    let blob = run_trace(source);

    for entry in entries(&blob) {
        if entry["event"] == "instruction_limit_reached" {
            continue;
        }
        let ordered: Vec<&str> = entry["ordered_globals"]
            .as_array()
            .unwrap()
            .iter()
            .map(|v| v.as_str().unwrap())
            .collect();
        let keys: Vec<&str> = entry["globals"].as_object().unwrap().keys().map(|k| k.as_str()).collect();
        assert_eq!(ordered, keys, "ordered_globals matches globals keys");

        for frame in entry["stack_to_render"].as_array().unwrap() {
            let expected = format!(
                "{}_f{}",
                frame["func_name"].as_str().unwrap(),
                frame["frame_id"].as_i64().unwrap()
            );
            assert_eq!(frame["unique_hash"], json!(expected));

            let ordered: Vec<&str> = frame["ordered_varnames"]
                .as_array()
                .unwrap()
                .iter()
                .map(|v| v.as_str().unwrap())
                .collect();
            let keys: Vec<&str> = frame["encoded_locals"]
                .as_object()
                .unwrap()
                .keys()
                .map(|k| k.as_str())
                .collect();
            assert_eq!(ordered, keys, "ordered_varnames matches locals keys");
        }
    }
}

#[test]
fn no_dangling_refs_anywhere() {
    fn collect_refs(value: &Value, out: &mut Vec<i64>) {
        match value {
            Value::Array(items) => {
                if items.len() == 2 && items[0] == "REF" {
                    if let Some(id) = items[1].as_i64() {
                        out.push(id);
                    }
                }
                for item in items {
                    collect_refs(item, out);
                }
            }
            Value::Object(map) => {
                for item in map.values() {
                    collect_refs(item, out);
                }
            }
            _ => {}
        }
    }

    let source = "\
function C() { this.next = null; }
var a = new C();
var b = new C();
a.next = b;
b.next = a;
var list = [a, b, [a]];";
    let blob = run_trace(source);

    for entry in entries(&blob) {
        let heap = entry["heap"].as_object().unwrap();
        let mut refs = Vec::new();
        collect_refs(&entry["globals"], &mut refs);
        for frame in entry["stack_to_render"].as_array().unwrap() {
            collect_refs(&frame["encoded_locals"], &mut refs);
        }
        collect_refs(&entry["heap"], &mut refs);
        for id in refs {
            assert!(
                heap.contains_key(&id.to_string()),
                "dangling REF {} in entry {:?}",
                id,
                entry["line"]
            );
        }
    }
}

#[test]
fn trace_round_trips_through_json() {
    let output = trace(
        "function f(n) { return n * 2; } var r = f(21); console.log(r);",
        &TracerConfig::default(),
    )
    .unwrap();
    let text = output.to_json();
    let reparsed: Value = serde_json::from_str(&text).expect("valid JSON");
    assert_eq!(reparsed, serde_json::to_value(&output).unwrap());
}

#[test]
fn tracing_is_deterministic() {
    let source = "\
function fib(n) { if (n < 2) { return n; } return fib(n - 1) + fib(n - 2); }
var r = fib(5);
console.log('fib', r);";
    let first = trace(source, &TracerConfig::default()).unwrap().to_json();
    let second = trace(source, &TracerConfig::default()).unwrap().to_json();
    assert_eq!(first, second);
}

#[test]
fn typeof_undeclared_does_not_throw() {
    let blob = run_trace("var t = typeof missing;");
    let last = entries(&blob).last().unwrap().clone();
    assert_eq!(last["event"], "step_line");
    assert_eq!(last["globals"]["t"], json!("undefined"));
}

#[test]
fn loops_are_bounded_by_per_iteration_breaks() {
    let source = "var sum = 0;\nfor (var i = 0; i < 3; i = i + 1) { sum = sum + i; }";
    let blob = run_trace(source);
    let last = entries(&blob).last().unwrap().clone();
    assert_eq!(last["globals"]["sum"], json!(3));
    assert_eq!(last["globals"]["i"], json!(3));
}
