//! Execution tracer
//!
//! Orchestrates one traced run: wrap the source ([`wrapper`]), parse it,
//! run it under the stepping listener ([`stepper`]) with stdout captured
//! ([`capture`]), and hand back the `{code, trace}` blob ([`schema`]).
//! Identity management and value encoding live in [`registry`] and
//! [`encoder`].
//!
//! A source that fails to parse produces a one-entry trace
//! (`uncaught_exception`) positioned at the parser-reported location,
//! still a successful trace from the caller's point of view. Only
//! tracer-internal failures surface as [`TracerError`].

pub mod capture;
pub mod encoder;
pub mod registry;
pub mod schema;
pub mod stepper;
pub mod wrapper;

use crate::interpreter::debug::DebugListener;
use crate::interpreter::engine::Interpreter;
use crate::interpreter::errors::RuntimeError;
use crate::parser::parse::Parser;
use capture::OutputCapture;
use rustc_hash::FxHashSet;
use schema::{SyntaxErrorRecord, TraceEntry, TraceOutput};
use std::cell::RefCell;
use std::rc::Rc;
use stepper::{Stepper, MAX_EXECUTED_LINES};
use wrapper::{wrap_source, PRELUDE_LINES};

/// Tracing knobs.
#[derive(Debug, Clone)]
pub struct TracerConfig {
    /// Step budget; reaching it appends an `instruction_limit_reached`
    /// entry and stops execution
    pub max_steps: usize,
    /// Start the globals ignore list from the runtime's installed
    /// intrinsics
    pub include_default_ignores: bool,
    /// Names to filter out of `globals` in addition to (or instead of)
    /// the defaults
    pub extra_ignored_globals: Vec<String>,
}

impl Default for TracerConfig {
    fn default() -> Self {
        TracerConfig {
            max_steps: MAX_EXECUTED_LINES,
            include_default_ignores: true,
            extra_ignored_globals: Vec::new(),
        }
    }
}

/// Tracer-internal failure, unrelated to the traced program.
#[derive(Debug, thiserror::Error)]
pub enum TracerError {
    #[error("internal tracer failure: {0}")]
    Internal(String),
}

/// Trace a user program.
///
/// Always produces a blob for user-level outcomes (normal completion,
/// uncaught exception, syntax error, step-limit abort). `Err` means the
/// tracer itself failed.
pub fn trace(source: &str, config: &TracerConfig) -> Result<TraceOutput, TracerError> {
    let wrapped = wrap_source(source);

    let program = match Parser::new(&wrapped.text).and_then(|mut p| p.parse_program()) {
        Ok(program) => program,
        Err(err) => {
            // The embedded parser reports precise positions, so the
            // compile-error entry is built straight from it
            let line = err.location.line as i64 - PRELUDE_LINES as i64;
            let col = err.location.column as i64 - 1;
            let record = SyntaxErrorRecord::new(
                format!("SyntaxError: {}", err.message),
                line,
                col,
            );
            return Ok(TraceOutput {
                code: wrapped.user_source,
                trace: vec![TraceEntry::SyntaxError(record)],
            });
        }
    };

    let mut interp = Interpreter::new(program, &wrapped.text);

    let mut ignored: FxHashSet<String> = FxHashSet::default();
    if config.include_default_ignores {
        ignored.extend(interp.intrinsic_names().iter().cloned());
    }
    ignored.extend(config.extra_ignored_globals.iter().cloned());

    let capture = OutputCapture::install(&interp);
    let stepper = Rc::new(RefCell::new(Stepper::new(
        config.max_steps,
        ignored,
        capture.buffer(),
    )));
    let listener: Rc<RefCell<dyn DebugListener>> = stepper.clone();
    interp.set_debug_listener(listener);

    let result = interp.run();
    drop(interp);
    drop(capture); // restore the process stdout sink

    let stepper = Rc::try_unwrap(stepper)
        .map_err(|_| TracerError::Internal("debug listener still shared after run".to_string()))?
        .into_inner();

    match result {
        Ok(())
        | Err(RuntimeError::Thrown { .. })
        | Err(RuntimeError::Terminated) => Ok(TraceOutput {
            code: wrapped.user_source,
            trace: stepper.finalize(),
        }),
        Err(RuntimeError::Internal { message, location }) => Err(TracerError::Internal(format!(
            "{} (wrapped line {}, column {})",
            message, location.line, location.column
        ))),
    }
}
