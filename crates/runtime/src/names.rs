//! Watched-Name Extraction
//!
//! Two static analyses over the AST, both used by the reactive layer:
//!
//! - [`referenced_names`] walks a condition, action, or healing expression
//!   once at registration time and collects every name it can be affected
//!   by. The dependency index files the reactive handle under each.
//! - [`affected_name`] names the binding a write target addresses. When no
//!   static name exists (computed index, chained call result) it returns
//!   [`AffectedName::Unknown`], and the write is treated as touching every
//!   watcher - correctness over precision.
//!
//! Both analyses share the dotted-path convention: `order.total` for member
//! access rooted at an identifier, `items[2]` for a constant index into an
//! identifier.

use crate::ast::{Ast, Node};
use tally_core::NodeId;

/// The statically-determined name a write affects.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AffectedName {
    /// The write addresses exactly this name
    Exact(String),
    /// No static name exists; fan out to every watcher
    Unknown,
}

/// Collect the names an expression references, in first-occurrence order
/// and without duplicates.
///
/// Rules: an identifier emits its name; member access over a plain
/// identifier emits `object.member`; member access over anything else
/// emits only the object's names; operators and calls emit the union of
/// their operands; literals and control keywords emit nothing on their
/// own (their sub-expressions are still walked).
pub fn referenced_names(ast: &Ast, root: NodeId) -> Vec<String> {
    let mut out = Vec::new();
    walk(ast, root, &mut out);
    out
}

fn emit(out: &mut Vec<String>, name: String) {
    if !out.iter().any(|n| *n == name) {
        out.push(name);
    }
}

fn walk(ast: &Ast, node: NodeId, out: &mut Vec<String>) {
    match ast.node(node) {
        Node::Identifier(name) => emit(out, name.clone()),
        Node::Member { object, field } => match ast.node(*object) {
            Node::Identifier(name) => emit(out, format!("{}.{}", name, field)),
            _ => walk(ast, *object, out),
        },
        Node::Binary { left, right, .. } => {
            walk(ast, *left, out);
            walk(ast, *right, out);
        }
        Node::Unary { operand, .. } => walk(ast, *operand, out),
        Node::Index { object, index } => {
            walk(ast, *object, out);
            walk(ast, *index, out);
        }
        Node::Call { callee, args } => {
            walk(ast, *callee, out);
            for arg in args {
                walk(ast, *arg, out);
            }
        }
        Node::Block(statements) => {
            for stmt in statements {
                walk(ast, *stmt, out);
            }
        }
        Node::ExprStmt(inner) => walk(ast, *inner, out),
        Node::VarDecl { init, .. } => {
            if let Some(init) = init {
                walk(ast, *init, out);
            }
        }
        Node::If {
            condition,
            then_branch,
            else_branch,
        } => {
            walk(ast, *condition, out);
            walk(ast, *then_branch, out);
            if let Some(else_branch) = else_branch {
                walk(ast, *else_branch, out);
            }
        }
        Node::While { condition, body } => {
            walk(ast, *condition, out);
            walk(ast, *body, out);
        }
        Node::For {
            init,
            condition,
            update,
            body,
        } => {
            for part in [init, condition, update].into_iter().flatten() {
                walk(ast, *part, out);
            }
            walk(ast, *body, out);
        }
        Node::ForIn {
            iterable, body, ..
        } => {
            walk(ast, *iterable, out);
            walk(ast, *body, out);
        }
        Node::Return(value) => {
            if let Some(value) = value {
                walk(ast, *value, out);
            }
        }
        Node::FunctionDef { body, .. } => walk(ast, *body, out),
        Node::ListLit(items) => {
            for item in items {
                walk(ast, *item, out);
            }
        }
        Node::RecordLit { values, .. } => {
            for value in values {
                walk(ast, *value, out);
            }
        }
        // Literals reference nothing.
        _ => {}
    }
}

/// Name the binding a write target addresses.
///
/// - identifier: the identifier's name
/// - member access: the dotted path from the outermost identifier
/// - constant non-negative number index rooted at an identifier:
///   `identifier[index]`
/// - anything else: [`AffectedName::Unknown`]
pub fn affected_name(ast: &Ast, target: NodeId) -> AffectedName {
    match ast.node(target) {
        Node::Identifier(name) => AffectedName::Exact(name.clone()),
        Node::Member { object, field } => match member_path(ast, *object) {
            Some(path) => AffectedName::Exact(format!("{}.{}", path, field)),
            None => AffectedName::Unknown,
        },
        Node::Index { object, index } => {
            let Node::Identifier(name) = ast.node(*object) else {
                return AffectedName::Unknown;
            };
            match ast.node(*index) {
                Node::NumberLit(n) if n.fract() == 0.0 && *n >= 0.0 => {
                    AffectedName::Exact(format!("{}[{}]", name, *n as u64))
                }
                _ => AffectedName::Unknown,
            }
        }
        _ => AffectedName::Unknown,
    }
}

/// Dotted path of a pure identifier-rooted member chain, or `None` when
/// anything else (an index, a call) appears in the chain.
fn member_path(ast: &Ast, node: NodeId) -> Option<String> {
    match ast.node(node) {
        Node::Identifier(name) => Some(name.clone()),
        Node::Member { object, field } => {
            member_path(ast, *object).map(|path| format!("{}.{}", path, field))
        }
        _ => None,
    }
}
