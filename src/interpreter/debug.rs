//! Debugger surface of the interpreter
//!
//! The engine exposes execution to a tracer through a deliberately narrow
//! seam: on every observable step it builds a [`DebugEvent`] (an owned
//! snapshot of the frame stack with scope chains tagged by kind), hands
//! it to the installed [`DebugListener`], and obeys the returned
//! [`StepAction`]. The listener never reaches into interpreter
//! internals; everything it may legitimately know is on the event.
//!
//! Frame snapshots expose the *raw* frame id, which is the stack slot
//! index and therefore recycled when a frame returns and a later call
//! occupies the same depth. Consumers that need stable per-activation
//! identity must canonicalize (see `tracer::registry`).

use crate::memory::env::ScopeKind;
use crate::memory::value::Value;

/// Canonical name of the wrapped user script. Any other script name on
/// an event marks non-user code.
pub const USER_SCRIPT_NAME: &str = "userscript";

/// Script name reported for breaks raised inside native builtins.
pub const NATIVE_SCRIPT_NAME: &str = "native";

/// What the listener wants the engine to do next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepAction {
    /// Break at the next observable step, entering calls
    StepIn,
    /// Suppress breaks until the current frame has been left
    StepOut,
    /// Disable stepping entirely
    Continue,
    /// Terminate execution
    Abort,
}

/// Why the engine stopped.
#[derive(Debug, Clone)]
pub enum BreakKind {
    /// Statement boundary, function entry, or return point
    Break,
    /// A value was thrown (before any unwinding happened)
    Exception { value: Value },
}

/// One scope-chain node as seen from a particular frame.
///
/// The frame's own activation reports [`ScopeKind::Local`]; enclosing
/// activations report [`ScopeKind::Closure`]; `catch`/`with` scopes keep
/// their intrinsic kind; the global scope is always last.
#[derive(Debug, Clone)]
pub struct ScopeSnapshot {
    pub kind: ReportedScopeKind,
    /// Bindings in insertion order
    pub bindings: Vec<(String, Value)>,
}

/// Scope kind as reported on an event (relative to the observed frame).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportedScopeKind {
    Global,
    Local,
    Closure,
    Catch,
    With,
}

impl ReportedScopeKind {
    pub fn from_intrinsic(kind: ScopeKind, is_own_activation: bool) -> Self {
        match kind {
            ScopeKind::Global => ReportedScopeKind::Global,
            ScopeKind::Local => {
                if is_own_activation {
                    ReportedScopeKind::Local
                } else {
                    ReportedScopeKind::Closure
                }
            }
            ScopeKind::Catch => ReportedScopeKind::Catch,
            ScopeKind::With => ReportedScopeKind::With,
        }
    }
}

/// Point-in-time view of one live frame, top-first in
/// [`DebugEvent::frames`].
#[derive(Debug, Clone)]
pub struct FrameSnapshot {
    /// Name of the script this frame executes (`userscript` for user
    /// code, a native tag for builtins)
    pub script: String,
    pub func_name: String,
    /// Recycled raw identity; see module docs
    pub raw_id: u64,
    pub is_constructor: bool,
    /// `this` binding, when the frame has one
    pub receiver: Option<Value>,
    /// True when the frame is stopped at its return point
    pub at_return: bool,
    /// The value about to be returned (raw; constructors report the
    /// explicit return value, not the receiver)
    pub return_value: Option<Value>,
    /// Scope chain, innermost first, ending with the global scope
    pub scopes: Vec<ScopeSnapshot>,
}

/// A single debugger break.
#[derive(Debug, Clone)]
pub struct DebugEvent {
    pub kind: BreakKind,
    /// Script the break position belongs to
    pub script: String,
    /// 0-based line in the wrapped source
    pub line0: usize,
    /// 0-based column
    pub col: usize,
    /// Live frames, top of stack first
    pub frames: Vec<FrameSnapshot>,
}

impl DebugEvent {
    pub fn is_exception(&self) -> bool {
        matches!(self.kind, BreakKind::Exception { .. })
    }
}

/// Receiver for debug events.
pub trait DebugListener {
    fn on_break(&mut self, event: &DebugEvent) -> StepAction;
}
