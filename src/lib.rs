//! # Introduction
//!
//! jstrace runs a user-authored JavaScript program (an ES5 subset) under
//! a single-step debugger and emits a linear JSON trace: one entry per
//! observable program step, each carrying the call stack, fully encoded
//! local and global bindings, the reachable heap, accumulated stdout,
//! source position, and an event tag. The trace is consumed by a replay
//! visualizer that animates the execution.
//!
//! ## Pipeline
//!
//! ```text
//! Source → Wrapper → Lexer → Parser → AST → Interpreter
//!                                              │ debug events
//!                                              ▼
//!                          Stepper → (Registry, Encoder) → Trace JSON
//! ```
//!
//! 1. [`parser`] — tokenises the wrapped source and builds an AST.
//! 2. [`interpreter`] — walks the AST and fires a debug event before
//!    every statement, at function entries and return points, and at
//!    every throw.
//! 3. [`memory`] — the runtime state model: tagged
//!    [`memory::value::Value`]s, shared heap objects, scope-chain
//!    environments.
//! 4. [`tracer`] — the stepping listener; canonicalizes frame/object
//!    identity, encodes the reachable heap per entry, enforces the step
//!    budget, and produces the `{code, trace}` blob.
//!
//! ## Supported subset
//!
//! `var`-scoped ES5: functions and closures, constructor calls with
//! `this`, object/array literals, `throw` / `try` / `catch` /
//! `finally`, `with`, classic control flow, and a small intrinsic
//! library (`console`, `Math`, `Error` classes, array/string methods).
//! No `let`/`const`, classes, arrow functions, or event loop.

pub mod interpreter;
pub mod memory;
pub mod parser;
pub mod tracer;

pub use tracer::schema::{TraceEntry, TraceOutput};
pub use tracer::{trace, TracerConfig, TracerError};
