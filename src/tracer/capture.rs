//! Stdout capture
//!
//! Scoped ownership of the engine's stdout sink: [`OutputCapture::install`]
//! swaps in an append-only buffer of strings, and the `Drop` impl
//! restores the process sink on every exit path (normal termination,
//! caught panic unwind, step-limit abort). [`OutputCapture::snapshot`]
//! concatenates the buffer without clearing it, so successive snapshots
//! are monotonic.

use crate::interpreter::engine::{Interpreter, StdoutSink};
use std::cell::RefCell;
use std::rc::Rc;

/// RAII guard over the engine's stdout sink.
pub struct OutputCapture {
    sink: Rc<RefCell<StdoutSink>>,
    buffer: Rc<RefCell<Vec<String>>>,
}

impl OutputCapture {
    /// Redirect the engine's stdout into a fresh buffer.
    pub fn install(interp: &Interpreter) -> Self {
        let sink = interp.stdout_sink();
        let buffer = Rc::new(RefCell::new(Vec::new()));
        *sink.borrow_mut() = StdoutSink::Buffer(buffer.clone());
        OutputCapture { sink, buffer }
    }

    /// Shared handle to the underlying buffer (the stepper snapshots it
    /// per trace entry).
    pub fn buffer(&self) -> Rc<RefCell<Vec<String>>> {
        self.buffer.clone()
    }

    /// Everything written so far, concatenated. Never clears.
    pub fn snapshot(&self) -> String {
        self.buffer.borrow().concat()
    }
}

impl Drop for OutputCapture {
    fn drop(&mut self) {
        *self.sink.borrow_mut() = StdoutSink::Process;
    }
}
