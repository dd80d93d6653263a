//! JavaScript execution engine
//!
//! This module provides the core execution logic:
//! - [`engine`]: tree-walking interpreter with frames, hoisting, and
//!   the stepping/break machinery
//! - [`expressions`]: the expression evaluator
//! - [`builtins`]: intrinsic globals and native functions
//! - [`debug`]: the debugger seam a tracer attaches to
//! - [`errors`]: runtime error types
//!
//! # Execution Model
//!
//! The interpreter walks the AST one statement at a time. Once a
//! `debugger` statement has armed stepping, a [`debug::DebugEvent`] is
//! fired before every statement, at function entry, at each return
//! point, and at every throw; the installed [`debug::DebugListener`]
//! decides how execution proceeds ([`debug::StepAction`]).
//!
//! # Built-in Functions
//!
//! Built-ins are engine natives dispatched by tag, not user-visible
//! source; they never appear as frames on debug events.

pub mod builtins;
pub mod debug;
pub mod engine;
pub mod errors;
pub mod expressions;
