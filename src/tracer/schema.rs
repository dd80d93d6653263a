//! Trace output schema
//!
//! Serde types for the visualizer blob `{ code, trace }`. Map-valued
//! fields (`globals`, `encoded_locals`, `heap`) use [`IndexMap`] so JSON
//! key order is insertion order: the trace is deterministic and
//! diff-friendly, and `ordered_globals` / `ordered_varnames` always
//! match their maps' key order.
//!
//! Terminal entries (`instruction_limit_reached`, the compile-error
//! `uncaught_exception`) carry only the fields that shape requires, so
//! [`TraceEntry`] is an untagged enum rather than one struct with a pile
//! of optionals.

use indexmap::IndexMap;
use serde::Serialize;

/// Insertion-ordered JSON object.
pub type JsonMap = IndexMap<String, serde_json::Value>;

/// Event tag of a regular step entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StepEvent {
    StepLine,
    Call,
    Return,
    Exception,
}

/// One rendered frame, bottom-of-stack first in
/// [`StepRecord::stack_to_render`].
#[derive(Debug, Clone, Serialize)]
pub struct StackEntry {
    pub func_name: String,
    pub frame_id: u32,
    pub is_highlighted: bool,
    pub is_parent: bool,
    pub is_zombie: bool,
    pub parent_frame_id_list: Vec<u32>,
    pub unique_hash: String,
    pub ordered_varnames: Vec<String>,
    pub encoded_locals: JsonMap,
}

/// A regular trace entry: one observable program step.
#[derive(Debug, Clone, Serialize)]
pub struct StepRecord {
    pub event: StepEvent,
    pub line: i64,
    pub col: i64,
    pub func_name: String,
    pub stdout: String,
    pub globals: JsonMap,
    pub ordered_globals: Vec<String>,
    pub stack_to_render: Vec<StackEntry>,
    pub heap: JsonMap,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exception_msg: Option<String>,
}

/// Terminal entry appended when the step budget is exhausted.
#[derive(Debug, Clone, Serialize)]
pub struct LimitRecord {
    pub event: &'static str,
    pub exception_msg: String,
}

impl LimitRecord {
    pub fn new(max_steps: usize) -> Self {
        LimitRecord {
            event: "instruction_limit_reached",
            exception_msg: format!(
                "(stopped after {} steps to prevent possible infinite loop)",
                max_steps
            ),
        }
    }
}

/// Sole entry of a trace whose source failed to parse.
#[derive(Debug, Clone, Serialize)]
pub struct SyntaxErrorRecord {
    pub event: &'static str,
    pub exception_msg: String,
    pub line: i64,
    pub col: i64,
}

impl SyntaxErrorRecord {
    pub fn new(exception_msg: String, line: i64, col: i64) -> Self {
        SyntaxErrorRecord {
            event: "uncaught_exception",
            exception_msg,
            line,
            col,
        }
    }
}

/// One record of the output sequence.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum TraceEntry {
    Step(Box<StepRecord>),
    Limit(LimitRecord),
    SyntaxError(SyntaxErrorRecord),
}

impl TraceEntry {
    pub fn as_step(&self) -> Option<&StepRecord> {
        match self {
            TraceEntry::Step(record) => Some(record.as_ref()),
            _ => None,
        }
    }
}

/// The visualizer blob.
#[derive(Debug, Clone, Serialize)]
pub struct TraceOutput {
    pub code: String,
    pub trace: Vec<TraceEntry>,
}

impl TraceOutput {
    /// Compact JSON.
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).expect("trace serialization cannot fail")
    }

    /// Deterministic human-readable JSON, for regression diffing.
    pub fn to_pretty_json(&self) -> String {
        serde_json::to_string_pretty(self).expect("trace serialization cannot fail")
    }

    /// `var trace = <json>;` form for direct inclusion by the consumer.
    pub fn to_js_var(&self) -> String {
        format!("var trace = {};", self.to_json())
    }
}
