//! Stepping engine
//!
//! The debugger listener that turns a stream of [`DebugEvent`]s into
//! trace entries. On each break it:
//!
//! 1. shifts the reported position back over the wrapper prelude,
//! 2. gates out non-user code (stepping out of library frames;
//!    attributing library throws to the last user-level position),
//! 3. skips the synthetic `debugger;` marker break,
//! 4. classifies the event (`step_line` / `call` / `return` /
//!    `exception`; a return is never also a call),
//! 5. rebuilds the heap table fresh and encodes globals and per-frame
//!    locals (closure and `with` scopes inlined under `parent:`
//!    prefixes),
//! 6. appends the entry, bumps the frame-return counter *afterwards*
//!    so the returning activation keeps its id for its own entry, and
//! 7. enforces the step budget.

use crate::interpreter::debug::{
    BreakKind, DebugEvent, DebugListener, FrameSnapshot, ReportedScopeKind, StepAction,
    USER_SCRIPT_NAME,
};
use crate::interpreter::errors::thrown_message;
use crate::memory::value::Value;
use crate::tracer::encoder::HeapEncoder;
use crate::tracer::registry::{FrameRegistry, ObjectRegistry};
use crate::tracer::schema::{JsonMap, StackEntry, StepEvent, StepRecord, TraceEntry};
use crate::tracer::wrapper::PRELUDE_LINES;
use rustc_hash::FxHashSet;
use std::cell::RefCell;
use std::rc::Rc;

/// Default step budget.
pub const MAX_EXECUTED_LINES: usize = 300;

/// The stepping engine. Lives for one traced run.
pub struct Stepper {
    max_steps: usize,
    ignored_globals: FxHashSet<String>,

    frames: FrameRegistry,
    objects: ObjectRegistry,
    stdout: Rc<RefCell<Vec<String>>>,

    trace: Vec<TraceEntry>,
    /// Canonical frame ids of the previous entry, top-first
    prev_stack: Option<Vec<u32>>,
    prev_line: Option<i64>,
    prev_col: Option<i64>,
    prev_top_frame: Option<u32>,
}

impl Stepper {
    pub fn new(
        max_steps: usize,
        ignored_globals: FxHashSet<String>,
        stdout: Rc<RefCell<Vec<String>>>,
    ) -> Self {
        Stepper {
            max_steps,
            ignored_globals,
            frames: FrameRegistry::new(),
            objects: ObjectRegistry::new(),
            stdout,
            trace: Vec::new(),
            prev_stack: None,
            prev_line: None,
            prev_col: None,
            prev_top_frame: None,
        }
    }

    /// Finalizer: drop a trailing `return` entry whose rendered stack is
    /// empty (the synthetic top-level return) and hand the trace over.
    pub fn finalize(mut self) -> Vec<TraceEntry> {
        if let Some(last) = self.trace.last().and_then(TraceEntry::as_step) {
            if last.event == StepEvent::Return && last.stack_to_render.is_empty() {
                self.trace.pop();
            }
        }
        self.trace
    }

    pub fn trace_len(&self) -> usize {
        self.trace.len()
    }

    fn record_event(
        &mut self,
        event: &DebugEvent,
        mut line: i64,
        col: i64,
        library_exception: bool,
    ) -> StepAction {
        // Live user frames, top of stack first
        let user_frames: Vec<&FrameSnapshot> = event
            .frames
            .iter()
            .filter(|frame| frame.script == USER_SCRIPT_NAME)
            .collect();
        if user_frames.is_empty() {
            return StepAction::StepIn;
        }

        // Classification
        let cur_stack: Vec<u32> = user_frames
            .iter()
            .map(|frame| self.frames.canonical_id(frame.raw_id))
            .collect();
        let top = user_frames[0];

        let mut event_type = StepEvent::StepLine;
        if let Some(prev) = &self.prev_stack {
            if cur_stack.len() == prev.len() + 1 && prev[..] == cur_stack[1..] {
                event_type = StepEvent::Call;
            }
        }
        if top.at_return {
            // A return is not also a call, even when both would hold
            event_type = StepEvent::Return;
        }
        let mut exception_msg = None;
        if let BreakKind::Exception { value } = &event.kind {
            event_type = StepEvent::Exception;
            exception_msg = Some(thrown_message(value));
        }

        // Return cosmetics: keep returns on the line of the previous
        // entry instead of the closing brace
        if event_type == StepEvent::Return {
            match (self.prev_top_frame, self.prev_line) {
                (Some(prev_top), Some(prev_line)) if prev_top == cur_stack[0] => {
                    line = prev_line;
                }
                (Some(prev_top), Some(_)) => {
                    log::debug!(
                        "return cosmetic frame mismatch: previous top frame {} vs current {}",
                        prev_top,
                        cur_stack[0]
                    );
                }
                _ => {}
            }
        }

        // Fresh heap table for this entry; object ids persist in the
        // registry across entries
        let mut encoder = HeapEncoder::new(&mut self.objects);

        // Globals: Global and Catch scopes of the top frame
        let mut globals = JsonMap::new();
        let mut ordered_globals = Vec::new();
        for scope in &top.scopes {
            if !matches!(
                scope.kind,
                ReportedScopeKind::Global | ReportedScopeKind::Catch
            ) {
                continue;
            }
            for (name, value) in &scope.bindings {
                if self.ignored_globals.contains(name) {
                    continue;
                }
                assert!(
                    !globals.contains_key(name),
                    "duplicate global binding '{}'",
                    name
                );
                ordered_globals.push(name.clone());
                globals.insert(name.clone(), encoder.encode(value));
            }
        }

        // Per-frame locals for everything but the outermost wrapper
        // frame, rendered bottom-of-stack first
        let mut stack_to_render: Vec<StackEntry> = Vec::new();
        for (i, frame) in user_frames.iter().enumerate() {
            if i == user_frames.len() - 1 {
                break; // synthetic wrapper frame
            }
            let frame_id = cur_stack[i];
            let mut func_name = frame.func_name.clone();
            if frame.is_constructor {
                func_name.push_str(" (constructor)");
            }

            let mut ordered_varnames: Vec<String> = Vec::new();
            let mut encoded_locals = JsonMap::new();
            let push_local =
                |ordered: &mut Vec<String>, locals: &mut JsonMap, name: String, value: serde_json::Value| {
                    if !locals.contains_key(&name) {
                        ordered.push(name.clone());
                        locals.insert(name, value);
                    }
                };

            if let Some(receiver) = &frame.receiver {
                if let Value::Object(obj) = receiver {
                    if obj.borrow().prototype.is_some() {
                        let encoded = encoder.encode(receiver);
                        push_local(
                            &mut ordered_varnames,
                            &mut encoded_locals,
                            "this".to_string(),
                            encoded,
                        );
                    }
                }
            }

            let mut parent_scopes = 0usize;
            for scope in &frame.scopes {
                match scope.kind {
                    ReportedScopeKind::Local | ReportedScopeKind::Catch => {
                        for (name, value) in &scope.bindings {
                            let encoded = encoder.encode(value);
                            push_local(
                                &mut ordered_varnames,
                                &mut encoded_locals,
                                name.clone(),
                                encoded,
                            );
                        }
                    }
                    // Closure and with scopes are inlined into this
                    // frame under parent: prefixes
                    ReportedScopeKind::Closure | ReportedScopeKind::With => {
                        parent_scopes += 1;
                        let prefix = if parent_scopes == 1 {
                            "parent:".to_string()
                        } else {
                            format!("parent{}:", parent_scopes)
                        };
                        for (name, value) in &scope.bindings {
                            let encoded = encoder.encode(value);
                            push_local(
                                &mut ordered_varnames,
                                &mut encoded_locals,
                                format!("{}{}", prefix, name),
                                encoded,
                            );
                        }
                    }
                    ReportedScopeKind::Global => {}
                }
            }

            if frame.at_return {
                let returned = if frame.is_constructor {
                    frame.receiver.clone().unwrap_or(Value::Undefined)
                } else {
                    frame.return_value.clone().unwrap_or(Value::Undefined)
                };
                let encoded = encoder.encode(&returned);
                push_local(
                    &mut ordered_varnames,
                    &mut encoded_locals,
                    "__return__".to_string(),
                    encoded,
                );
            }

            stack_to_render.insert(
                0,
                StackEntry {
                    unique_hash: format!("{}_f{}", func_name, frame_id),
                    func_name,
                    frame_id,
                    is_highlighted: i == 0,
                    is_parent: false,
                    is_zombie: false,
                    parent_frame_id_list: Vec::new(),
                    ordered_varnames,
                    encoded_locals,
                },
            );
        }

        let mut entry_func_name = top.func_name.clone();
        if top.is_constructor {
            entry_func_name.push_str(" (constructor)");
        }

        let record = StepRecord {
            event: event_type,
            line,
            col,
            func_name: entry_func_name,
            stdout: self.stdout.borrow().concat(),
            globals,
            ordered_globals,
            stack_to_render,
            heap: encoder.into_heap(),
            exception_msg,
        };

        // Frame-return accounting happens after the entry is built, so
        // the returning activation keeps its id for this entry and the
        // next activation of the raw frame gets a fresh one
        if top.at_return {
            self.frames.note_return(top.raw_id);
        }

        self.trace.push(TraceEntry::Step(Box::new(record)));
        self.prev_stack = Some(cur_stack.clone());
        self.prev_line = Some(line);
        self.prev_col = Some(col);
        self.prev_top_frame = Some(cur_stack[0]);

        if self.trace.len() >= self.max_steps {
            self.trace.push(TraceEntry::Limit(
                crate::tracer::schema::LimitRecord::new(self.max_steps),
            ));
            return StepAction::Abort;
        }

        if library_exception {
            StepAction::StepOut
        } else {
            StepAction::StepIn
        }
    }
}

impl DebugListener for Stepper {
    fn on_break(&mut self, event: &DebugEvent) -> StepAction {
        // Shift the wrapper prelude out of the reported position
        let line = event.line0 as i64 + 1 - PRELUDE_LINES as i64;
        let col = event.col as i64;

        // Non-user code never produces entries, with one exception: a
        // throw from library code with a non-empty trace is recorded and
        // attributed to the last user-level position
        if event.script != USER_SCRIPT_NAME {
            if event.is_exception() && !self.trace.is_empty() {
                let line = self.prev_line.unwrap_or(line);
                let col = self.prev_col.unwrap_or(col);
                return self.record_event(event, line, col, true);
            }
            return StepAction::StepOut;
        }

        // The synthetic `debugger;` marker sits on adjusted line 0. It
        // produces no entry, but it seeds the previous-stack state so
        // the first function entry classifies as a call.
        if line == 0 && !event.is_exception() {
            let ids = event
                .frames
                .iter()
                .filter(|frame| frame.script == USER_SCRIPT_NAME)
                .map(|frame| self.frames.canonical_id(frame.raw_id))
                .collect();
            self.prev_stack = Some(ids);
            return StepAction::StepIn;
        }

        self.record_event(event, line, col, false)
    }
}
