//! Memory model for the JavaScript interpreter
//!
//! This module provides the core runtime-state abstractions:
//! - [`value`]: tagged runtime values (`Undefined`, `Null`, `Bool`,
//!   `Number`, `Str`, `Object`)
//! - [`object`]: heap objects with insertion-ordered properties,
//!   prototype links, array elements, function data, and the tracer's
//!   hidden identity tag
//! - [`env`]: scope-chain environments (global / activation / catch /
//!   with) with insertion-ordered bindings
//!
//! Compound values are `Rc<RefCell<..>>` shared references, so aliasing
//! and cycles behave like the real language and object identity is
//! pointer identity.

pub mod env;
pub mod object;
pub mod value;
