//! Statement AST nodes

use super::{Declaration, Expr};
use crate::common::Span;

/// Statement node
#[derive(Debug, Clone)]
pub struct Stmt {
    pub kind: StmtKind,
    pub span: Span,
}

impl Stmt {
    pub fn new(kind: StmtKind, span: Span) -> Self {
        Self { kind, span }
    }
}

/// Statement kinds
#[derive(Debug, Clone)]
pub enum StmtKind {
    /// Expression statement: expr;
    Expr(Expr),

    /// Empty statement: ;
    Empty,

    /// Compound statement: { ... }
    Block(Block),

    /// Local declaration
    Declaration(Declaration),

    /// If statement: if (cond) then [else else]
    If {
        condition: Expr,
        then_branch: Box<Stmt>,
        else_branch: Option<Box<Stmt>>,
    },

    /// Switch statement: switch (selector) { ... }
    Switch {
        selector: Expr,
        body: Block,
    },

    /// Case label: case expr:
    Case(Expr),

    /// Default label: default:
    Default,

    /// While loop: while (cond) body
    While {
        condition: Expr,
        body: Box<Stmt>,
    },

    /// Do-while loop: do body while (cond);
    DoWhile {
        body: Box<Stmt>,
        condition: Expr,
    },

    /// For loop: for (init; cond; update) body
    For {
        init: Option<Box<Stmt>>,
        condition: Option<Expr>,
        update: Option<Expr>,
        body: Box<Stmt>,
    },

    Continue,
    Break,

    /// Return statement: return [expr];
    Return(Option<Expr>),

    /// Fragment discard
    Discard,
}

/// Compound statement
#[derive(Debug, Clone)]
pub struct Block {
    pub stmts: Vec<Stmt>,
    pub span: Span,
}

impl Block {
    pub fn new(stmts: Vec<Stmt>, span: Span) -> Self {
        Self { stmts, span }
    }
}
