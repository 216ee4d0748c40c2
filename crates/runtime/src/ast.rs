//! Abstract Syntax Tree
//!
//! A uniform tree of tagged nodes held in its own arena, parallel to the
//! value arena and addressed by the same style of opaque handle
//! ([`NodeId`]). Nodes are immutable once pushed; the parser (an external
//! collaborator) builds the tree front-to-back and hands the runtime the
//! root handle. Every node carries a source position for error reporting;
//! synthetic nodes (built by glue code or tests) carry the zero position.
//!
//! The builder methods at the bottom exist for that glue: they push a node
//! with a synthetic position and return its handle, which keeps
//! programmatic tree construction readable.

use tally_core::{Date, DateTime, Money, NodeId, Ratio, Time};

/// Source position: optional file, 1-based line and column. Both
/// coordinates are zero for synthetic nodes.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SourcePos {
    pub file: Option<String>,
    pub line: u32,
    pub column: u32,
}

impl SourcePos {
    pub fn new(line: u32, column: u32) -> SourcePos {
        SourcePos {
            file: None,
            line,
            column,
        }
    }

    pub fn in_file(file: impl Into<String>, line: u32, column: u32) -> SourcePos {
        SourcePos {
            file: Some(file.into()),
            line,
            column,
        }
    }

    /// The zero position used for nodes with no source of their own.
    pub fn synthetic() -> SourcePos {
        SourcePos::default()
    }

    pub fn is_synthetic(&self) -> bool {
        self.line == 0 && self.column == 0
    }
}

impl std::fmt::Display for SourcePos {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.file {
            Some(file) => write!(f, "{}:{}:{}", file, self.line, self.column),
            None => write!(f, "{}:{}", self.line, self.column),
        }
    }
}

/// Binary operators. Assignment is a binary form whose left side must be
/// an identifier, member access, or index expression.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    Eq,
    Neq,
    Lt,
    Lte,
    Gt,
    Gte,
    And,
    Or,
    Assign,
}

impl std::fmt::Display for BinOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let text = match self {
            BinOp::Add => "+",
            BinOp::Sub => "-",
            BinOp::Mul => "*",
            BinOp::Div => "/",
            BinOp::Eq => "==",
            BinOp::Neq => "!=",
            BinOp::Lt => "<",
            BinOp::Lte => "<=",
            BinOp::Gt => ">",
            BinOp::Gte => ">=",
            BinOp::And => "and",
            BinOp::Or => "or",
            BinOp::Assign => "=",
        };
        f.write_str(text)
    }
}

/// Unary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnOp {
    Neg,
    Not,
}

/// A syntax node. One arm per syntactic form.
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    // Literals, one per scalar kind.
    NumberLit(f64),
    TextLit(String),
    MoneyLit(Money),
    TimeLit(Time),
    DateLit(Date),
    DateTimeLit(DateTime),
    PercentLit(f64),
    RatioLit(Ratio),
    BooleanLit(bool),
    UnknownLit,
    NilLit,

    /// Name resolved through the environment chain
    Identifier(String),

    Binary {
        op: BinOp,
        left: NodeId,
        right: NodeId,
    },

    Unary {
        op: UnOp,
        operand: NodeId,
    },

    /// `object.field` - record field access following the parent chain
    Member {
        object: NodeId,
        field: String,
    },

    /// `object[index]` - list element or single-character text access
    Index {
        object: NodeId,
        index: NodeId,
    },

    Call {
        callee: NodeId,
        args: Vec<NodeId>,
    },

    /// Statement sequence evaluating to its last statement's value
    Block(Vec<NodeId>),

    /// Expression in statement position
    ExprStmt(NodeId),

    /// `var name [= init]` - defines in the innermost frame
    VarDecl {
        name: String,
        init: Option<NodeId>,
    },

    If {
        condition: NodeId,
        then_branch: NodeId,
        else_branch: Option<NodeId>,
    },

    While {
        condition: NodeId,
        body: NodeId,
    },

    For {
        init: Option<NodeId>,
        condition: Option<NodeId>,
        update: Option<NodeId>,
        body: NodeId,
    },

    ForIn {
        name: String,
        iterable: NodeId,
        body: NodeId,
    },

    Return(Option<NodeId>),

    FunctionDef {
        name: String,
        params: Vec<String>,
        body: NodeId,
    },

    ListLit(Vec<NodeId>),

    /// Record literal; keys keep their written order for evaluation
    RecordLit {
        keys: Vec<String>,
        values: Vec<NodeId>,
    },
}

/// Arena owning the syntax tree. Append-only; nodes are immutable after
/// construction.
#[derive(Debug, Default)]
pub struct Ast {
    nodes: Vec<Node>,
    positions: Vec<SourcePos>,
}

impl Ast {
    pub fn new() -> Ast {
        Ast::default()
    }

    /// Push a node with its source position and return its handle.
    pub fn push(&mut self, node: Node, pos: SourcePos) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(node);
        self.positions.push(pos);
        id
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.0 as usize]
    }

    pub fn pos(&self, id: NodeId) -> &SourcePos {
        &self.positions[id.0 as usize]
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    // Builder methods for programmatic construction (parser glue, tests).
    // All push with a synthetic position.

    pub fn number(&mut self, value: f64) -> NodeId {
        self.push(Node::NumberLit(value), SourcePos::synthetic())
    }

    pub fn text(&mut self, value: impl Into<String>) -> NodeId {
        self.push(Node::TextLit(value.into()), SourcePos::synthetic())
    }

    pub fn money(&mut self, money: Money) -> NodeId {
        self.push(Node::MoneyLit(money), SourcePos::synthetic())
    }

    pub fn date(&mut self, date: Date) -> NodeId {
        self.push(Node::DateLit(date), SourcePos::synthetic())
    }

    pub fn boolean(&mut self, value: bool) -> NodeId {
        self.push(Node::BooleanLit(value), SourcePos::synthetic())
    }

    pub fn nil(&mut self) -> NodeId {
        self.push(Node::NilLit, SourcePos::synthetic())
    }

    pub fn ident(&mut self, name: impl Into<String>) -> NodeId {
        self.push(Node::Identifier(name.into()), SourcePos::synthetic())
    }

    pub fn binary(&mut self, op: BinOp, left: NodeId, right: NodeId) -> NodeId {
        self.push(Node::Binary { op, left, right }, SourcePos::synthetic())
    }

    pub fn unary(&mut self, op: UnOp, operand: NodeId) -> NodeId {
        self.push(Node::Unary { op, operand }, SourcePos::synthetic())
    }

    /// `target = value` as a binary assignment node.
    pub fn assign(&mut self, target: NodeId, value: NodeId) -> NodeId {
        self.binary(BinOp::Assign, target, value)
    }

    pub fn member(&mut self, object: NodeId, field: impl Into<String>) -> NodeId {
        self.push(
            Node::Member {
                object,
                field: field.into(),
            },
            SourcePos::synthetic(),
        )
    }

    pub fn index(&mut self, object: NodeId, index: NodeId) -> NodeId {
        self.push(Node::Index { object, index }, SourcePos::synthetic())
    }

    pub fn call(&mut self, callee: NodeId, args: Vec<NodeId>) -> NodeId {
        self.push(Node::Call { callee, args }, SourcePos::synthetic())
    }

    pub fn block(&mut self, statements: Vec<NodeId>) -> NodeId {
        self.push(Node::Block(statements), SourcePos::synthetic())
    }

    pub fn var_decl(&mut self, name: impl Into<String>, init: Option<NodeId>) -> NodeId {
        self.push(
            Node::VarDecl {
                name: name.into(),
                init,
            },
            SourcePos::synthetic(),
        )
    }

    pub fn if_else(
        &mut self,
        condition: NodeId,
        then_branch: NodeId,
        else_branch: Option<NodeId>,
    ) -> NodeId {
        self.push(
            Node::If {
                condition,
                then_branch,
                else_branch,
            },
            SourcePos::synthetic(),
        )
    }

    pub fn while_loop(&mut self, condition: NodeId, body: NodeId) -> NodeId {
        self.push(Node::While { condition, body }, SourcePos::synthetic())
    }

    pub fn ret(&mut self, value: Option<NodeId>) -> NodeId {
        self.push(Node::Return(value), SourcePos::synthetic())
    }

    pub fn function_def(
        &mut self,
        name: impl Into<String>,
        params: Vec<String>,
        body: NodeId,
    ) -> NodeId {
        self.push(
            Node::FunctionDef {
                name: name.into(),
                params,
                body,
            },
            SourcePos::synthetic(),
        )
    }

    pub fn list(&mut self, items: Vec<NodeId>) -> NodeId {
        self.push(Node::ListLit(items), SourcePos::synthetic())
    }

    pub fn record(&mut self, keys: Vec<String>, values: Vec<NodeId>) -> NodeId {
        self.push(Node::RecordLit { keys, values }, SourcePos::synthetic())
    }
}
