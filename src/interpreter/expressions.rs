//! Expression evaluation
//!
//! Extends [`Interpreter`] with the recursive expression evaluator and
//! the member-access helpers shared by reads, writes, and method calls.
//!
//! Member access on primitives follows the language: unknown properties
//! of numbers/booleans/strings read as `undefined`, while any property
//! access on `null`/`undefined` throws a `TypeError`. Array and string
//! methods resolve to shared native-function objects so repeated
//! accesses observe a single identity.

use crate::interpreter::engine::Interpreter;
use crate::interpreter::errors::{ErrorClass, RuntimeError};
use crate::memory::env;
use crate::memory::object::{as_array_index, JsObject, NativeFunc, ObjectKind};
use crate::memory::value::Value;
use crate::parser::ast::*;

impl Interpreter {
    pub(crate) fn eval(&mut self, expr: &Expr) -> Result<Value, RuntimeError> {
        match expr {
            Expr::Number(n, _) => Ok(Value::Number(*n)),
            Expr::Str(s, _) => Ok(Value::string(s.as_str())),
            Expr::Bool(b, _) => Ok(Value::Bool(*b)),
            Expr::Null(_) => Ok(Value::Null),

            Expr::Ident(name, loc) => {
                let scope = self.current_scope();
                match env::lookup(&scope, name) {
                    Some(value) => Ok(value),
                    None => Err(self.raise(
                        ErrorClass::ReferenceError,
                        format!("{} is not defined", name),
                        *loc,
                    )),
                }
            }

            Expr::This(_) => Ok(self.current_receiver().unwrap_or(Value::Undefined)),

            Expr::Array(elements, _) => {
                let mut values = Vec::with_capacity(elements.len());
                for element in elements {
                    values.push(self.eval(element)?);
                }
                Ok(Value::Object(JsObject::array(values, None)))
            }

            Expr::ObjectLit(props, _) => {
                let obj = JsObject::ordinary(Some(self.object_prototype()));
                for (key, value_expr) in props {
                    let value = self.eval(value_expr)?;
                    obj.borrow_mut().set_property(key.clone(), value);
                }
                Ok(Value::Object(obj))
            }

            Expr::Function(def, _) => Ok(self.make_closure(def)),

            Expr::Assign {
                target,
                op,
                value,
                location,
            } => self.eval_assignment(target, *op, value, *location),

            Expr::Conditional {
                condition,
                consequent,
                alternate,
                ..
            } => {
                if self.eval(condition)?.truthy() {
                    self.eval(consequent)
                } else {
                    self.eval(alternate)
                }
            }

            Expr::Logical {
                op, left, right, ..
            } => {
                let left_val = self.eval(left)?;
                match op {
                    LogicalOp::And => {
                        if left_val.truthy() {
                            self.eval(right)
                        } else {
                            Ok(left_val)
                        }
                    }
                    LogicalOp::Or => {
                        if left_val.truthy() {
                            Ok(left_val)
                        } else {
                            self.eval(right)
                        }
                    }
                }
            }

            Expr::Binary {
                op, left, right, ..
            } => {
                let left_val = self.eval(left)?;
                let right_val = self.eval(right)?;
                Ok(apply_binary(*op, &left_val, &right_val))
            }

            Expr::Unary {
                op, operand, ..
            } => match op {
                UnOp::Neg => Ok(Value::Number(-self.eval(operand)?.to_number())),
                UnOp::Plus => Ok(Value::Number(self.eval(operand)?.to_number())),
                UnOp::Not => Ok(Value::Bool(!self.eval(operand)?.truthy())),
                UnOp::TypeOf => {
                    // `typeof undeclared` must not throw
                    if let Expr::Ident(name, _) = operand.as_ref() {
                        let scope = self.current_scope();
                        match env::lookup(&scope, name) {
                            Some(value) => Ok(Value::string(value.type_of())),
                            None => Ok(Value::string("undefined")),
                        }
                    } else {
                        let value = self.eval(operand)?;
                        Ok(Value::string(value.type_of()))
                    }
                }
            },

            Expr::Update {
                increment,
                prefix,
                target,
                location,
            } => {
                let old = self.read_target(target, *location)?.to_number();
                let new = if *increment { old + 1.0 } else { old - 1.0 };
                self.write_target(target, Value::Number(new), *location)?;
                Ok(Value::Number(if *prefix { new } else { old }))
            }

            Expr::Call {
                callee,
                args,
                location,
            } => {
                let (func, this) = match callee.as_ref() {
                    Expr::Member { object, key, .. } => {
                        let obj_val = self.eval(object)?;
                        let key_str = self.member_key(key)?;
                        let func = self.member_get(&obj_val, &key_str, *location)?;
                        (func, Some(obj_val))
                    }
                    other => (self.eval(other)?, None),
                };
                let mut arg_vals = Vec::with_capacity(args.len());
                for arg in args {
                    arg_vals.push(self.eval(arg)?);
                }
                self.call_value(func, this, arg_vals, false, *location)
            }

            Expr::New {
                callee,
                args,
                location,
            } => {
                let func = self.eval(callee)?;
                let mut arg_vals = Vec::with_capacity(args.len());
                for arg in args {
                    arg_vals.push(self.eval(arg)?);
                }
                self.call_value(func, None, arg_vals, true, *location)
            }

            Expr::Member {
                object,
                key,
                location,
            } => {
                let obj_val = self.eval(object)?;
                let key_str = self.member_key(key)?;
                self.member_get(&obj_val, &key_str, *location)
            }
        }
    }

    fn current_receiver(&self) -> Option<Value> {
        self.receiver_of_top_frame()
    }

    fn eval_assignment(
        &mut self,
        target: &Expr,
        op: AssignOp,
        value: &Expr,
        loc: SourceLocation,
    ) -> Result<Value, RuntimeError> {
        match target {
            Expr::Ident(name, _) => {
                let new_val = if op == AssignOp::Assign {
                    self.eval(value)?
                } else {
                    let scope = self.current_scope();
                    let old = match env::lookup(&scope, name) {
                        Some(v) => v,
                        None => {
                            return Err(self.raise(
                                ErrorClass::ReferenceError,
                                format!("{} is not defined", name),
                                loc,
                            ));
                        }
                    };
                    let rhs = self.eval(value)?;
                    apply_compound(op, &old, &rhs)
                };
                let scope = self.current_scope();
                if !env::assign(&scope, name, new_val.clone()) {
                    return Err(self.raise(
                        ErrorClass::ReferenceError,
                        format!("{} is not defined", name),
                        loc,
                    ));
                }
                Ok(new_val)
            }

            Expr::Member { object, key, .. } => {
                let obj_val = self.eval(object)?;
                let key_str = self.member_key(key)?;
                let new_val = if op == AssignOp::Assign {
                    self.eval(value)?
                } else {
                    let old = self.member_get(&obj_val, &key_str, loc)?;
                    let rhs = self.eval(value)?;
                    apply_compound(op, &old, &rhs)
                };
                self.member_set(&obj_val, &key_str, new_val.clone(), loc)?;
                Ok(new_val)
            }

            other => Err(RuntimeError::Internal {
                message: "invalid assignment target survived parsing".to_string(),
                location: other.location(),
            }),
        }
    }

    fn read_target(&mut self, target: &Expr, loc: SourceLocation) -> Result<Value, RuntimeError> {
        match target {
            Expr::Ident(name, _) => {
                let scope = self.current_scope();
                match env::lookup(&scope, name) {
                    Some(value) => Ok(value),
                    None => Err(self.raise(
                        ErrorClass::ReferenceError,
                        format!("{} is not defined", name),
                        loc,
                    )),
                }
            }
            Expr::Member { object, key, .. } => {
                let obj_val = self.eval(object)?;
                let key_str = self.member_key(key)?;
                self.member_get(&obj_val, &key_str, loc)
            }
            other => Err(RuntimeError::Internal {
                message: "invalid update target survived parsing".to_string(),
                location: other.location(),
            }),
        }
    }

    fn write_target(
        &mut self,
        target: &Expr,
        value: Value,
        loc: SourceLocation,
    ) -> Result<(), RuntimeError> {
        match target {
            Expr::Ident(name, _) => {
                let scope = self.current_scope();
                if env::assign(&scope, name, value) {
                    Ok(())
                } else {
                    Err(self.raise(
                        ErrorClass::ReferenceError,
                        format!("{} is not defined", name),
                        loc,
                    ))
                }
            }
            Expr::Member { object, key, .. } => {
                let obj_val = self.eval(object)?;
                let key_str = self.member_key(key)?;
                self.member_set(&obj_val, &key_str, value, loc)
            }
            other => Err(RuntimeError::Internal {
                message: "invalid update target survived parsing".to_string(),
                location: other.location(),
            }),
        }
    }

    pub(crate) fn member_key(&mut self, key: &MemberKey) -> Result<String, RuntimeError> {
        match key {
            MemberKey::Static(name) => Ok(name.clone()),
            MemberKey::Computed(expr) => {
                let value = self.eval(expr)?;
                Ok(value.to_display_string())
            }
        }
    }

    /// Property read with prototype-chain lookup, array element/length
    /// handling, and native method resolution.
    pub(crate) fn member_get(
        &mut self,
        object: &Value,
        key: &str,
        loc: SourceLocation,
    ) -> Result<Value, RuntimeError> {
        enum Resolved {
            Value(Value),
            Native(&'static str, NativeFunc),
        }

        let resolved = match object {
            Value::Object(obj) => {
                let borrowed = obj.borrow();
                match &borrowed.kind {
                    ObjectKind::Array(elements) => {
                        if key == "length" {
                            Resolved::Value(Value::Number(elements.len() as f64))
                        } else if let Some(index) = as_array_index(key) {
                            Resolved::Value(
                                elements.get(index).cloned().unwrap_or(Value::Undefined),
                            )
                        } else if let Some(native) = array_method(key) {
                            Resolved::Native(native.0, native.1)
                        } else {
                            Resolved::Value(
                                borrowed.get_property(key).unwrap_or(Value::Undefined),
                            )
                        }
                    }
                    ObjectKind::Error if key == "toString" => {
                        Resolved::Native("toString", NativeFunc::ErrorToString)
                    }
                    _ => Resolved::Value(
                        borrowed.get_property(key).unwrap_or(Value::Undefined),
                    ),
                }
            }
            Value::Str(s) => {
                if key == "length" {
                    Resolved::Value(Value::Number(s.chars().count() as f64))
                } else if let Some(index) = as_array_index(key) {
                    Resolved::Value(
                        s.chars()
                            .nth(index)
                            .map(|c| Value::string(c.to_string()))
                            .unwrap_or(Value::Undefined),
                    )
                } else if let Some(native) = string_method(key) {
                    Resolved::Native(native.0, native.1)
                } else {
                    Resolved::Value(Value::Undefined)
                }
            }
            Value::Number(_) | Value::Bool(_) => Resolved::Value(Value::Undefined),
            Value::Null | Value::Undefined => {
                return Err(self.raise(
                    ErrorClass::TypeError,
                    format!(
                        "Cannot read property '{}' of {}",
                        key,
                        object.to_display_string()
                    ),
                    loc,
                ));
            }
        };

        match resolved {
            Resolved::Value(value) => Ok(value),
            Resolved::Native(name, func) => Ok(self.shared_native(name, func)),
        }
    }

    /// Property write; arrays get element/length treatment.
    pub(crate) fn member_set(
        &mut self,
        object: &Value,
        key: &str,
        value: Value,
        loc: SourceLocation,
    ) -> Result<(), RuntimeError> {
        match object {
            Value::Object(obj) => {
                if key == "length" && obj.borrow().is_array() {
                    let len = value.to_number();
                    if len < 0.0 || len.fract() != 0.0 || !len.is_finite() {
                        return Err(self.raise(
                            ErrorClass::RangeError,
                            "Invalid array length",
                            loc,
                        ));
                    }
                    let mut borrowed = obj.borrow_mut();
                    if let ObjectKind::Array(elements) = &mut borrowed.kind {
                        elements.resize(len as usize, Value::Undefined);
                    }
                    return Ok(());
                }
                let mut borrowed = obj.borrow_mut();
                if let ObjectKind::Array(elements) = &mut borrowed.kind {
                    if let Some(index) = as_array_index(key) {
                        if index >= elements.len() {
                            elements.resize(index + 1, Value::Undefined);
                        }
                        elements[index] = value;
                        return Ok(());
                    }
                }
                borrowed.set_property(key, value);
                Ok(())
            }
            _ => Err(self.raise(
                ErrorClass::TypeError,
                format!(
                    "Cannot set property '{}' of {}",
                    key,
                    object.to_display_string()
                ),
                loc,
            )),
        }
    }
}

fn array_method(key: &str) -> Option<(&'static str, NativeFunc)> {
    match key {
        "push" => Some(("push", NativeFunc::ArrayPush)),
        "pop" => Some(("pop", NativeFunc::ArrayPop)),
        "join" => Some(("join", NativeFunc::ArrayJoin)),
        "indexOf" => Some(("indexOf", NativeFunc::ArrayIndexOf)),
        "slice" => Some(("slice", NativeFunc::ArraySlice)),
        _ => None,
    }
}

fn string_method(key: &str) -> Option<(&'static str, NativeFunc)> {
    match key {
        "charAt" => Some(("charAt", NativeFunc::StringCharAt)),
        "indexOf" => Some(("indexOf", NativeFunc::StringIndexOf)),
        "slice" => Some(("slice", NativeFunc::StringSlice)),
        "toUpperCase" => Some(("toUpperCase", NativeFunc::StringToUpperCase)),
        "toLowerCase" => Some(("toLowerCase", NativeFunc::StringToLowerCase)),
        _ => None,
    }
}

/// Binary operators over evaluated operands. Nothing here can throw:
/// the subset has no ToPrimitive hooks.
fn apply_binary(op: BinOp, left: &Value, right: &Value) -> Value {
    match op {
        BinOp::Add => {
            let stringy = matches!(left, Value::Str(_) | Value::Object(_))
                || matches!(right, Value::Str(_) | Value::Object(_));
            if stringy {
                Value::string(format!(
                    "{}{}",
                    left.to_display_string(),
                    right.to_display_string()
                ))
            } else {
                Value::Number(left.to_number() + right.to_number())
            }
        }
        BinOp::Sub => Value::Number(left.to_number() - right.to_number()),
        BinOp::Mul => Value::Number(left.to_number() * right.to_number()),
        BinOp::Div => Value::Number(left.to_number() / right.to_number()),
        BinOp::Mod => Value::Number(left.to_number() % right.to_number()),
        BinOp::EqLoose => Value::Bool(left.loose_equals(right)),
        BinOp::NeLoose => Value::Bool(!left.loose_equals(right)),
        BinOp::EqStrict => Value::Bool(left.strict_equals(right)),
        BinOp::NeStrict => Value::Bool(!left.strict_equals(right)),
        BinOp::Lt | BinOp::Le | BinOp::Gt | BinOp::Ge => {
            if let (Value::Str(a), Value::Str(b)) = (left, right) {
                Value::Bool(match op {
                    BinOp::Lt => a < b,
                    BinOp::Le => a <= b,
                    BinOp::Gt => a > b,
                    _ => a >= b,
                })
            } else {
                let (a, b) = (left.to_number(), right.to_number());
                // Comparisons involving NaN are false
                Value::Bool(match op {
                    BinOp::Lt => a < b,
                    BinOp::Le => a <= b,
                    BinOp::Gt => a > b,
                    _ => a >= b,
                })
            }
        }
    }
}

fn apply_compound(op: AssignOp, old: &Value, rhs: &Value) -> Value {
    let bin = match op {
        AssignOp::AddAssign => BinOp::Add,
        AssignOp::SubAssign => BinOp::Sub,
        AssignOp::MulAssign => BinOp::Mul,
        AssignOp::DivAssign => BinOp::Div,
        AssignOp::ModAssign => BinOp::Mod,
        AssignOp::Assign => unreachable!("plain assignment handled by caller"),
    };
    apply_binary(bin, old, rhs)
}
