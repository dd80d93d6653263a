// Execution engine for the JavaScript interpreter

use crate::interpreter::debug::{
    BreakKind, DebugEvent, DebugListener, FrameSnapshot, ReportedScopeKind, ScopeSnapshot,
    StepAction, NATIVE_SCRIPT_NAME, USER_SCRIPT_NAME,
};
use crate::interpreter::errors::{ErrorClass, RuntimeError};
use crate::memory::env::{self, EnvRef, Environment};
use crate::memory::object::{FunctionData, JsObject, NativeFunc, ObjRef, ObjectKind};
use crate::memory::value::Value;
use crate::parser::ast::*;
use rustc_hash::FxHashMap;
use std::cell::RefCell;
use std::io::Write;
use std::rc::Rc;

/// Recursion guard; each JS frame costs several Rust stack frames, so
/// this stays well below the native stack limit.
pub const MAX_CALL_DEPTH: usize = 200;

/// Name shown for the synthetic outermost frame.
pub const TOP_LEVEL_FRAME_NAME: &str = "<top-level>";

/// Where program output goes. The tracer swaps in a buffer for the
/// duration of a run; the default writes through to the process stdout.
#[derive(Debug)]
pub enum StdoutSink {
    Process,
    Buffer(Rc<RefCell<Vec<String>>>),
}

/// A live call frame
#[derive(Debug)]
pub struct Frame {
    pub name: String,
    pub func: Option<Rc<FunctionDef>>,
    /// The frame's activation environment (the global scope for the
    /// synthetic outermost frame)
    pub env: EnvRef,
    /// Innermost scope; `catch`/`with` push nodes here
    pub scope: EnvRef,
    /// Raw identity: the stack slot index. Recycled across calls that
    /// reuse the same depth.
    pub raw_id: u64,
    pub receiver: Option<Value>,
    pub is_constructor: bool,
    /// Location of the `return` statement that ended the frame, if any
    pub return_location: Option<SourceLocation>,
    pub script: &'static str,
}

/// The main interpreter that executes a parsed program
pub struct Interpreter {
    program: Rc<Program>,
    /// Wrapped source text; function objects slice their body text out
    /// of it
    source: Rc<str>,

    global_env: EnvRef,
    frames: Vec<Frame>,
    current_location: SourceLocation,

    stdout: Rc<RefCell<StdoutSink>>,
    listener: Option<Rc<RefCell<dyn DebugListener>>>,

    /// True once a `debugger` statement has armed single-stepping
    stepping: bool,
    /// When set, suppress breaks while more than this many frames are
    /// live (the StepOut action)
    step_out_depth: Option<usize>,

    // Completion flags, checked after every statement
    should_break: bool,
    should_continue: bool,
    pending_return: Option<Value>,

    /// Root of every ordinary object's prototype chain; deliberately
    /// empty so user-added structure is the only thing prototype checks
    /// can see
    object_prototype: ObjRef,
    /// Shared native-function objects so repeated method accesses
    /// observe one identity
    native_cache: FxHashMap<&'static str, ObjRef>,
    /// Names installed by the global bootstrap, in installation order
    intrinsic_names: Vec<String>,
}

impl Interpreter {
    /// Create an interpreter for a parsed program. `source` must be the
    /// exact text the program was parsed from.
    pub fn new(program: Program, source: &str) -> Self {
        let global_env = Environment::global();
        let object_prototype = JsObject::ordinary(None);

        let mut interp = Interpreter {
            program: Rc::new(program),
            source: source.into(),
            global_env,
            frames: Vec::new(),
            current_location: SourceLocation::new(1, 1),
            stdout: Rc::new(RefCell::new(StdoutSink::Process)),
            listener: None,
            stepping: false,
            step_out_depth: None,
            should_break: false,
            should_continue: false,
            pending_return: None,
            object_prototype,
            native_cache: FxHashMap::default(),
            intrinsic_names: Vec::new(),
        };
        interp.install_globals();
        interp
    }

    pub fn set_debug_listener(&mut self, listener: Rc<RefCell<dyn DebugListener>>) {
        self.listener = Some(listener);
    }

    /// Shared handle to the stdout sink; the capture guard swaps it.
    pub fn stdout_sink(&self) -> Rc<RefCell<StdoutSink>> {
        self.stdout.clone()
    }

    /// Global names installed by the bootstrap, in installation order.
    pub fn intrinsic_names(&self) -> &[String] {
        &self.intrinsic_names
    }

    pub(crate) fn global_env(&self) -> EnvRef {
        self.global_env.clone()
    }

    pub(crate) fn object_prototype(&self) -> ObjRef {
        self.object_prototype.clone()
    }

    pub(crate) fn note_intrinsic(&mut self, name: &str) {
        self.intrinsic_names.push(name.to_string());
    }

    /// Run the program to completion (or to an uncaught exception /
    /// listener abort).
    pub fn run(&mut self) -> Result<(), RuntimeError> {
        let program = Rc::clone(&self.program);

        self.frames.push(Frame {
            name: TOP_LEVEL_FRAME_NAME.to_string(),
            func: None,
            env: self.global_env.clone(),
            scope: self.global_env.clone(),
            raw_id: 0,
            receiver: None,
            is_constructor: false,
            return_location: None,
            script: USER_SCRIPT_NAME,
        });

        let global = self.global_env.clone();
        self.hoist(&program.body, &global);

        let result = self.exec_statements(&program.body);
        let result = result.and_then(|()| {
            // Synthetic top-level return point
            self.pending_return = None;
            let loc = self.current_location;
            self.fire_return_break(loc, Value::Undefined)
        });
        self.frames.pop();
        result
    }

    // ===== Debug-event plumbing =====

    fn dispatch(&mut self, event: DebugEvent) -> Result<(), RuntimeError> {
        let Some(listener) = self.listener.clone() else {
            return Ok(());
        };
        let from_user_code = event.script == USER_SCRIPT_NAME;
        let action = listener.borrow_mut().on_break(&event);
        match action {
            StepAction::StepIn => {
                self.stepping = true;
                self.step_out_depth = None;
            }
            StepAction::StepOut => {
                // Leave the frame the event belongs to. Native builtins
                // have no frame of their own, so stepping out of one
                // suppresses nothing below the current user frame.
                let base = if from_user_code {
                    self.frames.len().saturating_sub(1)
                } else {
                    self.frames.len()
                };
                self.step_out_depth = Some(base);
            }
            StepAction::Continue => {
                self.stepping = false;
            }
            StepAction::Abort => return Err(RuntimeError::Terminated),
        }
        Ok(())
    }

    /// Break at an observable step (after a leaf statement, at a loop
    /// header, at function entry), honoring stepping state.
    fn fire_statement_break(&mut self, loc: SourceLocation) -> Result<(), RuntimeError> {
        if !self.stepping {
            return Ok(());
        }
        if let Some(depth) = self.step_out_depth {
            if self.frames.len() > depth {
                return Ok(());
            }
            self.step_out_depth = None;
        }
        let event = self.build_event(BreakKind::Break, USER_SCRIPT_NAME, loc, false, None);
        self.dispatch(event)
    }

    /// Break at a frame's return point, with the raw return value.
    fn fire_return_break(
        &mut self,
        loc: SourceLocation,
        return_value: Value,
    ) -> Result<(), RuntimeError> {
        if !self.stepping {
            return Ok(());
        }
        if let Some(depth) = self.step_out_depth {
            if self.frames.len() > depth {
                return Ok(());
            }
            self.step_out_depth = None;
        }
        let event = self.build_event(
            BreakKind::Break,
            USER_SCRIPT_NAME,
            loc,
            true,
            Some(return_value),
        );
        self.dispatch(event)
    }

    /// Exception events fire at the raise point, before unwinding, and
    /// regardless of the stepping flag.
    fn fire_exception(
        &mut self,
        value: Value,
        script: &'static str,
        loc: SourceLocation,
    ) -> Result<(), RuntimeError> {
        let event = self.build_event(BreakKind::Exception { value }, script, loc, false, None);
        self.dispatch(event)
    }

    fn build_event(
        &self,
        kind: BreakKind,
        script: &str,
        loc: SourceLocation,
        top_at_return: bool,
        return_value: Option<Value>,
    ) -> DebugEvent {
        let top_index = self.frames.len().saturating_sub(1);
        let frames = self
            .frames
            .iter()
            .enumerate()
            .rev()
            .map(|(i, frame)| {
                let is_top = i == top_index;
                self.snapshot_frame(
                    frame,
                    is_top && top_at_return,
                    if is_top { return_value.clone() } else { None },
                )
            })
            .collect();
        DebugEvent {
            kind,
            script: script.to_string(),
            line0: loc.line.saturating_sub(1),
            col: loc.column.saturating_sub(1),
            frames,
        }
    }

    fn snapshot_frame(
        &self,
        frame: &Frame,
        at_return: bool,
        return_value: Option<Value>,
    ) -> FrameSnapshot {
        let mut scopes = Vec::new();
        let mut cursor = Some(frame.scope.clone());
        while let Some(env) = cursor {
            let borrowed = env.borrow();
            let own = Rc::ptr_eq(&env, &frame.env);
            let kind = ReportedScopeKind::from_intrinsic(borrowed.kind, own);
            let bindings = if let Some(obj) = &borrowed.with_object {
                obj.borrow()
                    .properties
                    .iter()
                    .map(|(k, v)| (k.clone(), v.clone()))
                    .collect()
            } else {
                borrowed
                    .bindings
                    .iter()
                    .map(|(k, v)| (k.clone(), v.clone()))
                    .collect()
            };
            scopes.push(ScopeSnapshot { kind, bindings });
            cursor = borrowed.parent.clone();
        }

        FrameSnapshot {
            script: frame.script.to_string(),
            func_name: frame.name.clone(),
            raw_id: frame.raw_id,
            is_constructor: frame.is_constructor,
            receiver: frame.receiver.clone(),
            at_return,
            return_value,
            scopes,
        }
    }

    // ===== Throw helpers =====

    /// Throw a user-level value (the `throw` statement).
    pub(crate) fn throw_value(
        &mut self,
        value: Value,
        loc: SourceLocation,
    ) -> Result<(), RuntimeError> {
        self.fire_exception(value.clone(), USER_SCRIPT_NAME, loc)?;
        Err(RuntimeError::Thrown { value })
    }

    /// Raise an engine error (TypeError and friends) at a user location.
    pub(crate) fn raise(
        &mut self,
        class: ErrorClass,
        message: impl Into<String>,
        loc: SourceLocation,
    ) -> RuntimeError {
        let value = Value::Object(self.make_error(class, message.into()));
        match self.fire_exception(value.clone(), USER_SCRIPT_NAME, loc) {
            Err(e) => e,
            Ok(()) => RuntimeError::Thrown { value },
        }
    }

    /// Raise an error from inside a native builtin; the event carries a
    /// non-user script name, which routes the tracer through its
    /// library-code gate.
    pub(crate) fn raise_native(
        &mut self,
        class: ErrorClass,
        message: impl Into<String>,
    ) -> RuntimeError {
        let value = Value::Object(self.make_error(class, message.into()));
        let loc = self.current_location;
        match self.fire_exception(value.clone(), NATIVE_SCRIPT_NAME, loc) {
            Err(e) => e,
            Ok(()) => RuntimeError::Thrown { value },
        }
    }

    pub(crate) fn make_error(&mut self, class: ErrorClass, message: String) -> ObjRef {
        let obj = JsObject::new(ObjectKind::Error, Some(self.object_prototype.clone()));
        {
            let mut borrowed = obj.borrow_mut();
            borrowed.set_property("name", Value::string(class.name()));
            borrowed.set_property("message", Value::string(message));
        }
        obj
    }

    // ===== Program output =====

    pub(crate) fn write_stdout(&mut self, text: String) {
        match &*self.stdout.borrow() {
            StdoutSink::Process => {
                print!("{}", text);
                let _ = std::io::stdout().flush();
            }
            StdoutSink::Buffer(buffer) => buffer.borrow_mut().push(text),
        }
    }

    // ===== Scope management =====

    pub(crate) fn current_scope(&self) -> EnvRef {
        self.frames
            .last()
            .expect("no live frame")
            .scope
            .clone()
    }

    pub(crate) fn receiver_of_top_frame(&self) -> Option<Value> {
        self.frames.last().and_then(|frame| frame.receiver.clone())
    }

    fn set_current_scope(&mut self, scope: EnvRef) {
        self.frames.last_mut().expect("no live frame").scope = scope;
    }

    /// Bind `var` names (to undefined) and function declarations (to
    /// closures) into an activation environment, in source order.
    fn hoist(&mut self, body: &[Stmt], env: &EnvRef) {
        let mut vars: Vec<&str> = Vec::new();
        let mut funcs: Vec<&Rc<FunctionDef>> = Vec::new();
        collect_hoisted(body, &mut vars, &mut funcs);

        for name in vars {
            if !env.borrow().bindings.contains_key(name) {
                env.borrow_mut().declare(name, Value::Undefined);
            }
        }
        for func in funcs {
            let closure = self.make_closure_in(func, env.clone());
            let name = func
                .name
                .clone()
                .expect("function declarations always carry a name");
            env.borrow_mut().declare(name, closure);
        }
    }

    pub(crate) fn make_closure(&mut self, def: &Rc<FunctionDef>) -> Value {
        let scope = self.current_scope();
        self.make_closure_in(def, scope)
    }

    fn make_closure_in(&mut self, def: &Rc<FunctionDef>, env: EnvRef) -> Value {
        let source_text: Rc<str> = self.source[def.span.start..def.span.end].into();
        let obj = JsObject::new(
            ObjectKind::Function(FunctionData::User {
                def: Rc::clone(def),
                env,
                source_text,
            }),
            None,
        );
        let proto = JsObject::ordinary(Some(self.object_prototype.clone()));
        obj.borrow_mut().set_property("prototype", Value::Object(proto));
        Value::Object(obj)
    }

    /// Shared native-function object, created once per builtin.
    pub(crate) fn shared_native(&mut self, name: &'static str, func: NativeFunc) -> Value {
        if let Some(obj) = self.native_cache.get(name) {
            return Value::Object(obj.clone());
        }
        let obj = JsObject::new(
            ObjectKind::Function(FunctionData::Native { name, func }),
            None,
        );
        self.native_cache.insert(name, obj.clone());
        Value::Object(obj)
    }

    // ===== Statement execution =====

    fn exec_statements(&mut self, stmts: &[Stmt]) -> Result<(), RuntimeError> {
        for stmt in stmts {
            self.exec_statement(stmt)?;
            if self.pending_return.is_some() || self.should_break || self.should_continue {
                break;
            }
        }
        Ok(())
    }

    fn exec_statement(&mut self, stmt: &Stmt) -> Result<(), RuntimeError> {
        match stmt {
            // Hoisted at frame entry; no runtime effect, no break
            Stmt::FunctionDecl { .. } => Ok(()),
            Stmt::Empty { .. } => Ok(()),
            Stmt::Block { body, .. } => self.exec_statements(body),

            Stmt::Debugger { location } => {
                self.current_location = *location;
                self.stepping = true;
                let event =
                    self.build_event(BreakKind::Break, USER_SCRIPT_NAME, *location, false, None);
                self.dispatch(event)
            }

            Stmt::Try {
                block,
                catch,
                finally,
                ..
            } => self.exec_try(block, catch.as_ref(), finally.as_deref()),

            Stmt::While {
                condition,
                body,
                location,
            } => self.exec_while(condition, body, *location),

            Stmt::DoWhile {
                body,
                condition,
                location,
            } => self.exec_do_while(body, condition, *location),

            Stmt::For {
                init,
                condition,
                update,
                body,
                location,
            } => self.exec_for(
                init.as_deref(),
                condition.as_ref(),
                update.as_ref(),
                body,
                *location,
            ),

            // Leaf statements are the observable steps: execute, then
            // break. A listener snapshot is a point-in-time capture of
            // the step it describes, so it must see the effects.
            Stmt::VarDecl { .. } | Stmt::ExprStmt { .. } => {
                let loc = stmt.location();
                self.current_location = loc;
                self.exec_simple_statement(stmt)?;
                self.fire_statement_break(loc)
            }

            // No plain break here. `return` breaks exactly once, at the
            // frame's return point; `throw` breaks via the exception
            // event; the rest surface through their inner statements.
            other => {
                let loc = other.location();
                self.current_location = loc;
                self.exec_simple_statement(other)
            }
        }
    }

    fn exec_simple_statement(&mut self, stmt: &Stmt) -> Result<(), RuntimeError> {
        match stmt {
            Stmt::VarDecl { decls, .. } => {
                for (name, init) in decls {
                    if let Some(init) = init {
                        let value = self.eval(init)?;
                        let scope = self.current_scope();
                        if !env::assign(&scope, name, value) {
                            return Err(RuntimeError::Internal {
                                message: format!("hoisted binding '{}' missing", name),
                                location: stmt.location(),
                            });
                        }
                    }
                }
                Ok(())
            }

            Stmt::ExprStmt { expr, .. } => {
                self.eval(expr)?;
                Ok(())
            }

            Stmt::Return { expr, location } => {
                let value = match expr {
                    Some(expr) => self.eval(expr)?,
                    None => Value::Undefined,
                };
                self.pending_return = Some(value);
                if let Some(frame) = self.frames.last_mut() {
                    frame.return_location = Some(*location);
                }
                Ok(())
            }

            Stmt::Break { .. } => {
                self.should_break = true;
                Ok(())
            }

            Stmt::Continue { .. } => {
                self.should_continue = true;
                Ok(())
            }

            Stmt::Throw { expr, location } => {
                let value = self.eval(expr)?;
                self.throw_value(value, *location)
            }

            Stmt::If {
                condition,
                then_branch,
                else_branch,
                ..
            } => {
                let cond = self.eval(condition)?;
                if cond.truthy() {
                    self.exec_statements(then_branch)
                } else if let Some(else_branch) = else_branch {
                    self.exec_statements(else_branch)
                } else {
                    Ok(())
                }
            }

            Stmt::With { object, body, location } => {
                let value = self.eval(object)?;
                let Value::Object(obj) = value else {
                    return Err(self.raise(
                        ErrorClass::TypeError,
                        "with requires an object",
                        *location,
                    ));
                };
                let saved = self.current_scope();
                self.set_current_scope(Environment::with(saved.clone(), obj));
                let result = self.exec_statements(body);
                self.set_current_scope(saved);
                result
            }

            // Handled in exec_statement
            Stmt::FunctionDecl { .. }
            | Stmt::Empty { .. }
            | Stmt::Block { .. }
            | Stmt::Debugger { .. }
            | Stmt::Try { .. }
            | Stmt::While { .. }
            | Stmt::DoWhile { .. }
            | Stmt::For { .. } => unreachable!("dispatched by exec_statement"),
        }
    }

    fn exec_try(
        &mut self,
        block: &[Stmt],
        catch: Option<&CatchClause>,
        finally: Option<&[Stmt]>,
    ) -> Result<(), RuntimeError> {
        let mut completion = match self.exec_statements(block) {
            Err(RuntimeError::Thrown { value }) if catch.is_some() => {
                let clause = catch.expect("checked above");
                let saved = self.current_scope();
                let catch_env =
                    Environment::catch(saved.clone(), clause.param.clone(), value);
                self.set_current_scope(catch_env);
                let result = self.exec_statements(&clause.body);
                self.set_current_scope(saved);
                result
            }
            other => other,
        };

        if let Some(finally) = finally {
            let saved_return = self.pending_return.take();
            let saved_break = std::mem::take(&mut self.should_break);
            let saved_continue = std::mem::take(&mut self.should_continue);

            match self.exec_statements(finally) {
                Err(e) => completion = Err(e),
                Ok(()) => {
                    let finally_abrupt = self.pending_return.is_some()
                        || self.should_break
                        || self.should_continue;
                    if finally_abrupt {
                        // The finally block's own completion wins
                        completion = Ok(());
                    } else {
                        self.pending_return = saved_return;
                        self.should_break = saved_break;
                        self.should_continue = saved_continue;
                    }
                }
            }
        }

        completion
    }

    fn exec_while(
        &mut self,
        condition: &Expr,
        body: &[Stmt],
        location: SourceLocation,
    ) -> Result<(), RuntimeError> {
        loop {
            self.current_location = location;
            self.fire_statement_break(location)?;
            if !self.eval(condition)?.truthy() {
                break;
            }
            self.exec_statements(body)?;
            if self.should_continue {
                self.should_continue = false;
            }
            if self.should_break {
                self.should_break = false;
                break;
            }
            if self.pending_return.is_some() {
                break;
            }
        }
        Ok(())
    }

    fn exec_do_while(
        &mut self,
        body: &[Stmt],
        condition: &Expr,
        location: SourceLocation,
    ) -> Result<(), RuntimeError> {
        loop {
            self.exec_statements(body)?;
            if self.should_continue {
                self.should_continue = false;
            }
            if self.should_break {
                self.should_break = false;
                break;
            }
            if self.pending_return.is_some() {
                break;
            }
            self.current_location = location;
            self.fire_statement_break(location)?;
            if !self.eval(condition)?.truthy() {
                break;
            }
        }
        Ok(())
    }

    fn exec_for(
        &mut self,
        init: Option<&Stmt>,
        condition: Option<&Expr>,
        update: Option<&Expr>,
        body: &[Stmt],
        location: SourceLocation,
    ) -> Result<(), RuntimeError> {
        if let Some(init) = init {
            self.exec_statement(init)?;
        }
        loop {
            self.current_location = location;
            self.fire_statement_break(location)?;
            if let Some(condition) = condition {
                if !self.eval(condition)?.truthy() {
                    break;
                }
            }
            self.exec_statements(body)?;
            if self.should_continue {
                self.should_continue = false;
            }
            if self.should_break {
                self.should_break = false;
                break;
            }
            if self.pending_return.is_some() {
                break;
            }
            if let Some(update) = update {
                self.eval(update)?;
            }
        }
        Ok(())
    }

    // ===== Function calls =====

    /// Call a value. `construct` marks `new` invocations.
    pub(crate) fn call_value(
        &mut self,
        callee: Value,
        this: Option<Value>,
        args: Vec<Value>,
        construct: bool,
        loc: SourceLocation,
    ) -> Result<Value, RuntimeError> {
        let Value::Object(obj) = &callee else {
            return Err(self.raise(
                ErrorClass::TypeError,
                format!("{} is not a function", callee.to_display_string()),
                loc,
            ));
        };
        let data = {
            let borrowed = obj.borrow();
            match &borrowed.kind {
                ObjectKind::Function(data) => Some(data.clone()),
                _ => None,
            }
        };
        let Some(data) = data else {
            return Err(self.raise(ErrorClass::TypeError, "value is not a function", loc));
        };

        match data {
            FunctionData::Native { name, func } => {
                if construct && !func.is_constructible() {
                    return Err(self.raise(
                        ErrorClass::TypeError,
                        format!("{} is not a constructor", name),
                        loc,
                    ));
                }
                self.call_native(func, this, &args)
            }
            FunctionData::User { def, env, .. } => {
                if self.frames.len() >= MAX_CALL_DEPTH {
                    return Err(self.raise(
                        ErrorClass::RangeError,
                        "Maximum call stack size exceeded",
                        loc,
                    ));
                }
                let receiver = if construct {
                    let proto = obj
                        .borrow()
                        .get_own("prototype")
                        .and_then(|v| match v {
                            Value::Object(p) => Some(p),
                            _ => None,
                        })
                        .unwrap_or_else(|| self.object_prototype.clone());
                    Some(Value::Object(JsObject::ordinary(Some(proto))))
                } else {
                    this
                };
                self.call_user(&def, env, receiver, args, construct)
            }
        }
    }

    fn call_user(
        &mut self,
        def: &Rc<FunctionDef>,
        closure_env: EnvRef,
        receiver: Option<Value>,
        args: Vec<Value>,
        construct: bool,
    ) -> Result<Value, RuntimeError> {
        let local = Environment::local(closure_env);
        for (i, param) in def.params.iter().enumerate() {
            let value = args.get(i).cloned().unwrap_or(Value::Undefined);
            local.borrow_mut().declare(param.clone(), value);
        }
        self.hoist(&def.body, &local);

        let raw_id = self.frames.len() as u64;
        self.frames.push(Frame {
            name: def.name.clone().unwrap_or_default(),
            func: Some(Rc::clone(def)),
            env: local.clone(),
            scope: local,
            raw_id,
            receiver: receiver.clone(),
            is_constructor: construct,
            return_location: None,
            script: USER_SCRIPT_NAME,
        });

        // Completion flags never leak across frames
        let saved_return = self.pending_return.take();
        let saved_break = std::mem::take(&mut self.should_break);
        let saved_continue = std::mem::take(&mut self.should_continue);

        let result = self.run_frame_body(def);

        self.frames.pop();
        self.pending_return = saved_return;
        self.should_break = saved_break;
        self.should_continue = saved_continue;

        let raw_return = result?;
        if construct {
            // A constructor returning an object overrides the receiver
            Ok(match raw_return {
                Value::Object(_) => raw_return,
                _ => receiver.expect("constructor call always has a receiver"),
            })
        } else {
            Ok(raw_return)
        }
    }

    fn run_frame_body(&mut self, def: &Rc<FunctionDef>) -> Result<Value, RuntimeError> {
        // Entry break: parameters bound, hoisted vars still undefined.
        // An empty body goes straight to the return point instead.
        if let Some(first) = def.body.first() {
            let entry_loc = first.location();
            self.current_location = entry_loc;
            self.fire_statement_break(entry_loc)?;
        }
        self.exec_statements(&def.body)?;
        let value = self.pending_return.take().unwrap_or(Value::Undefined);
        let loc = self
            .frames
            .last()
            .and_then(|f| f.return_location)
            .unwrap_or(def.end_location);
        self.current_location = loc;
        self.fire_return_break(loc, value.clone())?;
        Ok(value)
    }
}

/// Collect `var` names and function declarations for hoisting, in
/// source order, without descending into nested functions.
fn collect_hoisted<'a>(
    stmts: &'a [Stmt],
    vars: &mut Vec<&'a str>,
    funcs: &mut Vec<&'a Rc<FunctionDef>>,
) {
    for stmt in stmts {
        match stmt {
            Stmt::VarDecl { decls, .. } => {
                for (name, _) in decls {
                    vars.push(name);
                }
            }
            Stmt::FunctionDecl { func, .. } => funcs.push(func),
            Stmt::If {
                then_branch,
                else_branch,
                ..
            } => {
                collect_hoisted(then_branch, vars, funcs);
                if let Some(else_branch) = else_branch {
                    collect_hoisted(else_branch, vars, funcs);
                }
            }
            Stmt::While { body, .. }
            | Stmt::DoWhile { body, .. }
            | Stmt::With { body, .. }
            | Stmt::Block { body, .. } => collect_hoisted(body, vars, funcs),
            Stmt::For { init, body, .. } => {
                if let Some(init) = init {
                    collect_hoisted(std::slice::from_ref(&**init), vars, funcs);
                }
                collect_hoisted(body, vars, funcs);
            }
            Stmt::Try {
                block,
                catch,
                finally,
                ..
            } => {
                collect_hoisted(block, vars, funcs);
                if let Some(catch) = catch {
                    collect_hoisted(&catch.body, vars, funcs);
                }
                if let Some(finally) = finally {
                    collect_hoisted(finally, vars, funcs);
                }
            }
            _ => {}
        }
    }
}

impl NativeFunc {
    /// Natives that may be targets of `new`
    pub fn is_constructible(self) -> bool {
        matches!(
            self,
            NativeFunc::ErrorCtor
                | NativeFunc::TypeErrorCtor
                | NativeFunc::RangeErrorCtor
                | NativeFunc::ReferenceErrorCtor
                | NativeFunc::ArrayCtor
        )
    }
}
