//! Evaluator - The Tree Walk
//!
//! A strictly synchronous, left-to-right recursive walk over the node
//! arena. Expression nodes produce value handles; statement nodes produce
//! the value the surrounding block sees. `return` unwinds through the
//! [`Flow`] channel instead of the error channel, so it composes with `?`
//! without being mistaken for a failure.
//!
//! The evaluator is the only component that mutates the environment, and
//! every mutation goes through the assignment protocol in the constraint
//! module - identifier, member, and index targets alike. Nothing here may
//! suspend: a statement that started inside a moment finishes inside it.

use crate::ast::{BinOp, Node, UnOp};
use crate::constraint::WriteSlot;
use crate::error::{ErrorKind, RuntimeError};
use crate::names::{AffectedName, affected_name};
use crate::runtime::Runtime;
use std::cmp::Ordering;
use tally_core::{FrameId, NodeId, Value, ValueId, arithmetic, compare};

/// How evaluation of a node ended: with a value, or unwinding a `return`.
#[derive(Debug, Clone, Copy)]
pub(crate) enum Flow {
    Value(ValueId),
    Return(ValueId),
}

/// Extract the value of a sub-evaluation, propagating both errors and
/// `return` unwinding to the caller.
macro_rules! flow_val {
    ($flow:expr) => {
        match $flow? {
            Flow::Value(v) => v,
            ret @ Flow::Return(_) => return Ok(ret),
        }
    };
}

impl Runtime {
    /// Evaluate one node. Errors pick up the node's source position on the
    /// way out (innermost position wins).
    pub(crate) fn eval(&mut self, node: NodeId, frame: FrameId) -> Result<Flow, RuntimeError> {
        self.eval_inner(node, frame)
            .map_err(|e| e.at(self.ast.pos(node)))
    }

    fn eval_inner(&mut self, node: NodeId, frame: FrameId) -> Result<Flow, RuntimeError> {
        let data = self.ast.node(node).clone();
        match data {
            // Literals allocate a fresh value of their kind.
            Node::NumberLit(n) => Ok(Flow::Value(self.store.number(n)?)),
            Node::TextLit(s) => Ok(Flow::Value(self.store.text(s)?)),
            Node::MoneyLit(m) => Ok(Flow::Value(self.store.money(m)?)),
            Node::TimeLit(t) => Ok(Flow::Value(self.store.time(t)?)),
            Node::DateLit(d) => Ok(Flow::Value(self.store.date(d)?)),
            Node::DateTimeLit(dt) => Ok(Flow::Value(self.store.date_time(dt)?)),
            Node::PercentLit(p) => Ok(Flow::Value(self.store.percent(p)?)),
            Node::RatioLit(r) => Ok(Flow::Value(self.store.ratio(r)?)),
            Node::BooleanLit(b) => Ok(Flow::Value(self.store.boolean(b)?)),
            Node::UnknownLit => Ok(Flow::Value(self.store.unknown()?)),
            Node::NilLit => Ok(Flow::Value(self.store.nil()?)),

            Node::Identifier(name) => match self.env.lookup(frame, &name) {
                Some(value) => Ok(Flow::Value(value)),
                None => Err(RuntimeError::new(
                    ErrorKind::UndefinedName,
                    format!("undefined name '{}'", name),
                )),
            },

            Node::Binary { op, left, right } => self.eval_binary(op, left, right, frame),

            Node::Unary { op, operand } => {
                let v = flow_val!(self.eval(operand, frame));
                let result = match op {
                    UnOp::Neg => arithmetic::negate(&mut self.store, v)?,
                    UnOp::Not => arithmetic::logical_not(&mut self.store, v)?,
                };
                Ok(Flow::Value(result))
            }

            Node::Member { object, field } => {
                let obj = flow_val!(self.eval(object, frame));
                match self.store.get(obj) {
                    Value::Record(_) => match self.store.record_lookup(obj, &field) {
                        Some(value) => Ok(Flow::Value(value)),
                        None => Err(RuntimeError::new(
                            ErrorKind::UndefinedName,
                            format!("record has no field '{}'", field),
                        )),
                    },
                    other => Err(RuntimeError::new(
                        ErrorKind::TypeMismatch,
                        format!("cannot access field '{}' of {}", field, other.kind()),
                    )),
                }
            }

            Node::Index { object, index } => {
                let obj = flow_val!(self.eval(object, frame));
                let idx_value = flow_val!(self.eval(index, frame));
                let idx = self.expect_index(idx_value)?;
                match self.store.get(obj) {
                    Value::List(items) => match items.get(idx) {
                        Some(item) => Ok(Flow::Value(*item)),
                        None => Err(RuntimeError::new(
                            ErrorKind::IndexOutOfRange,
                            format!("index {} out of range for list of {}", idx, items.len()),
                        )),
                    },
                    Value::Text(s) => {
                        let ch = s.chars().nth(idx);
                        let len = s.chars().count();
                        match ch {
                            Some(ch) => Ok(Flow::Value(self.store.text(ch.to_string())?)),
                            None => Err(RuntimeError::new(
                                ErrorKind::IndexOutOfRange,
                                format!("index {} out of range for text of {}", idx, len),
                            )),
                        }
                    }
                    other => Err(RuntimeError::new(
                        ErrorKind::TypeMismatch,
                        format!("cannot index {}", other.kind()),
                    )),
                }
            }

            Node::Call { callee, args } => {
                let callee_value = flow_val!(self.eval(callee, frame));
                let mut arg_values = Vec::with_capacity(args.len());
                for arg in args {
                    arg_values.push(flow_val!(self.eval(arg, frame)));
                }
                let func = match self.store.get(callee_value) {
                    Value::Function(f) => f.clone(),
                    other => {
                        return Err(RuntimeError::new(
                            ErrorKind::InvalidCallTarget,
                            format!("cannot call {}", other.kind()),
                        ));
                    }
                };
                if func.params.len() != arg_values.len() {
                    return Err(RuntimeError::new(
                        ErrorKind::ArgumentMismatch,
                        format!(
                            "function '{}' takes {} arguments, got {}",
                            func.name,
                            func.params.len(),
                            arg_values.len()
                        ),
                    ));
                }
                let parent = func.env.unwrap_or(self.env.global());
                let call_frame = self.env.push_frame(parent);
                for (param, value) in func.params.iter().zip(arg_values) {
                    self.env.define(call_frame, param, value);
                }
                match self.eval(func.body, call_frame)? {
                    Flow::Return(v) | Flow::Value(v) => Ok(Flow::Value(v)),
                }
            }

            Node::Block(statements) => {
                let block_frame = self.env.push_frame(frame);
                let mut last = None;
                for stmt in statements {
                    last = Some(flow_val!(self.eval(stmt, block_frame)));
                }
                match last {
                    Some(v) => Ok(Flow::Value(v)),
                    None => Ok(Flow::Value(self.store.nil()?)),
                }
            }

            Node::ExprStmt(inner) => self.eval(inner, frame),

            Node::VarDecl { name, init } => {
                let value = match init {
                    Some(init) => flow_val!(self.eval(init, frame)),
                    None => self.store.unknown()?,
                };
                self.protected_write(
                    WriteSlot::Env {
                        frame,
                        name: name.clone(),
                    },
                    AffectedName::Exact(name),
                    value,
                    frame,
                )?;
                Ok(Flow::Value(value))
            }

            Node::If {
                condition,
                then_branch,
                else_branch,
            } => {
                let cond = flow_val!(self.eval(condition, frame));
                if self.expect_boolean(cond, "if condition")? {
                    self.eval(then_branch, frame)
                } else if let Some(else_branch) = else_branch {
                    self.eval(else_branch, frame)
                } else {
                    Ok(Flow::Value(self.store.nil()?))
                }
            }

            Node::While { condition, body } => {
                loop {
                    let cond = flow_val!(self.eval(condition, frame));
                    if !self.expect_boolean(cond, "while condition")? {
                        break;
                    }
                    flow_val!(self.eval(body, frame));
                }
                Ok(Flow::Value(self.store.nil()?))
            }

            Node::For {
                init,
                condition,
                update,
                body,
            } => {
                let loop_frame = self.env.push_frame(frame);
                if let Some(init) = init {
                    flow_val!(self.eval(init, loop_frame));
                }
                loop {
                    if let Some(condition) = condition {
                        let cond = flow_val!(self.eval(condition, loop_frame));
                        if !self.expect_boolean(cond, "for condition")? {
                            break;
                        }
                    }
                    flow_val!(self.eval(body, loop_frame));
                    if let Some(update) = update {
                        flow_val!(self.eval(update, loop_frame));
                    }
                }
                Ok(Flow::Value(self.store.nil()?))
            }

            Node::ForIn {
                name,
                iterable,
                body,
            } => {
                let iter_value = flow_val!(self.eval(iterable, frame));
                let items: Vec<ValueId> = match self.store.get(iter_value) {
                    Value::List(items) => items.clone(),
                    Value::Text(s) => {
                        let chars: Vec<String> =
                            s.chars().map(|c| c.to_string()).collect();
                        let mut ids = Vec::with_capacity(chars.len());
                        for ch in chars {
                            ids.push(self.store.text(ch)?);
                        }
                        ids
                    }
                    other => {
                        return Err(RuntimeError::new(
                            ErrorKind::TypeMismatch,
                            format!("cannot iterate over {}", other.kind()),
                        ));
                    }
                };
                let loop_frame = self.env.push_frame(frame);
                for item in items {
                    self.env.define(loop_frame, &name, item);
                    flow_val!(self.eval(body, loop_frame));
                }
                Ok(Flow::Value(self.store.nil()?))
            }

            Node::Return(value) => {
                let v = match value {
                    Some(value) => flow_val!(self.eval(value, frame)),
                    None => self.store.nil()?,
                };
                Ok(Flow::Return(v))
            }

            Node::FunctionDef { name, params, body } => {
                let handle = self.store.function(name.as_str(), params, body, Some(frame))?;
                self.env.define(frame, &name, handle);
                Ok(Flow::Value(handle))
            }

            Node::ListLit(items) => {
                let mut values = Vec::with_capacity(items.len());
                for item in items {
                    values.push(flow_val!(self.eval(item, frame)));
                }
                Ok(Flow::Value(self.store.list(values)?))
            }

            Node::RecordLit { keys, values } => {
                let mut field_values = Vec::with_capacity(values.len());
                for value in values {
                    field_values.push(flow_val!(self.eval(value, frame)));
                }
                let record = self.store.record(None)?;
                for (key, value) in keys.iter().zip(field_values) {
                    if let Value::Record(data) = self.store.get_mut(record) {
                        data.set(key, value);
                    }
                }
                Ok(Flow::Value(record))
            }
        }
    }

    fn eval_binary(
        &mut self,
        op: BinOp,
        left: NodeId,
        right: NodeId,
        frame: FrameId,
    ) -> Result<Flow, RuntimeError> {
        match op {
            BinOp::Assign => return self.eval_assignment(left, right, frame),
            // Boolean connectives short-circuit on the left operand.
            BinOp::And | BinOp::Or => {
                let l = flow_val!(self.eval(left, frame));
                let lb = self.expect_boolean(l, "boolean operand")?;
                let result = match (op, lb) {
                    (BinOp::And, false) => false,
                    (BinOp::Or, true) => true,
                    _ => {
                        let r = flow_val!(self.eval(right, frame));
                        self.expect_boolean(r, "boolean operand")?
                    }
                };
                return Ok(Flow::Value(self.store.boolean(result)?));
            }
            _ => {}
        }

        let l = flow_val!(self.eval(left, frame));
        let r = flow_val!(self.eval(right, frame));
        let result = match op {
            BinOp::Add => arithmetic::add(&mut self.store, l, r)?,
            BinOp::Sub => arithmetic::subtract(&mut self.store, l, r)?,
            BinOp::Mul => arithmetic::multiply(&mut self.store, l, r)?,
            BinOp::Div => arithmetic::divide(&mut self.store, l, r)?,
            BinOp::Eq => {
                let eq = compare::equals(&self.store, l, r)?;
                self.store.boolean(eq)?
            }
            BinOp::Neq => {
                let eq = compare::equals(&self.store, l, r)?;
                self.store.boolean(!eq)?
            }
            BinOp::Lt => {
                let ord = compare::compare(&self.store, l, r)?;
                self.store.boolean(ord == Ordering::Less)?
            }
            BinOp::Lte => {
                let ord = compare::compare(&self.store, l, r)?;
                self.store.boolean(ord != Ordering::Greater)?
            }
            BinOp::Gt => {
                let ord = compare::compare(&self.store, l, r)?;
                self.store.boolean(ord == Ordering::Greater)?
            }
            BinOp::Gte => {
                let ord = compare::compare(&self.store, l, r)?;
                self.store.boolean(ord != Ordering::Less)?
            }
            BinOp::Assign | BinOp::And | BinOp::Or => unreachable!("handled above"),
        };
        Ok(Flow::Value(result))
    }

    /// The `=` protocol: evaluate the right-hand side, resolve the target
    /// slot, and hand both to the constraint engine for the atomic
    /// validate-commit-or-rollback sequence.
    fn eval_assignment(
        &mut self,
        target: NodeId,
        value_node: NodeId,
        frame: FrameId,
    ) -> Result<Flow, RuntimeError> {
        let value = flow_val!(self.eval(value_node, frame));
        let affected = affected_name(&self.ast, target);

        let slot = match self.ast.node(target).clone() {
            Node::Identifier(name) => {
                // Assigning an undefined identifier defines it in the
                // innermost frame (declaration by assignment).
                let write_frame = self.env.defining_frame(frame, &name).unwrap_or(frame);
                WriteSlot::Env {
                    frame: write_frame,
                    name,
                }
            }
            Node::Member { object, field } => {
                let obj = flow_val!(self.eval(object, frame));
                match self.store.get(obj) {
                    Value::Record(_) => WriteSlot::RecordField { record: obj, field },
                    other => {
                        return Err(RuntimeError::new(
                            ErrorKind::TypeMismatch,
                            format!("cannot assign field '{}' of {}", field, other.kind()),
                        ));
                    }
                }
            }
            Node::Index { object, index } => {
                let obj = flow_val!(self.eval(object, frame));
                let idx_value = flow_val!(self.eval(index, frame));
                let idx = self.expect_index(idx_value)?;
                match self.store.get(obj) {
                    Value::List(items) => {
                        if idx >= items.len() {
                            return Err(RuntimeError::new(
                                ErrorKind::IndexOutOfRange,
                                format!(
                                    "index {} out of range for list of {}",
                                    idx,
                                    items.len()
                                ),
                            ));
                        }
                        WriteSlot::ListItem {
                            list: obj,
                            index: idx,
                        }
                    }
                    other => {
                        return Err(RuntimeError::new(
                            ErrorKind::TypeMismatch,
                            format!("cannot assign into {}", other.kind()),
                        ));
                    }
                }
            }
            other => {
                return Err(RuntimeError::new(
                    ErrorKind::InvalidAssignmentTarget,
                    format!("cannot assign to {}", node_kind(&other)),
                ));
            }
        };

        self.protected_write(slot, affected, value, frame)?;
        Ok(Flow::Value(value))
    }

    /// Read a boolean or fail with `TypeMismatch` naming the context.
    pub(crate) fn expect_boolean(&self, value: ValueId, what: &str) -> Result<bool, RuntimeError> {
        match self.store.get(value) {
            Value::Boolean(b) => Ok(*b),
            other => Err(RuntimeError::new(
                ErrorKind::TypeMismatch,
                format!("{} must be a boolean, got {}", what, other.kind()),
            )),
        }
    }

    /// Read an index position. A non-number index is the wrong kind of
    /// value (`TypeMismatch`); a negative or fractional number is a number
    /// that names no position (`IndexOutOfRange`).
    fn expect_index(&self, value: ValueId) -> Result<usize, RuntimeError> {
        match self.store.get(value) {
            Value::Number(n) if n.fract() == 0.0 && *n >= 0.0 => Ok(*n as usize),
            Value::Number(n) => Err(RuntimeError::new(
                ErrorKind::IndexOutOfRange,
                format!("index {} is not a valid position", n),
            )),
            other => Err(RuntimeError::new(
                ErrorKind::TypeMismatch,
                format!("index must be a number, got {}", other.kind()),
            )),
        }
    }
}

/// Human-readable node kind for assignment-target diagnostics.
fn node_kind(node: &Node) -> &'static str {
    match node {
        Node::Binary { .. } => "an operator expression",
        Node::Unary { .. } => "an operator expression",
        Node::Call { .. } => "a call result",
        Node::Block(_) => "a block",
        _ => "a non-assignable expression",
    }
}
