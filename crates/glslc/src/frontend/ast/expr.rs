//! Expression AST nodes

use std::sync::Arc;

use super::TypeSpecifier;
use crate::common::Span;
use crate::frontend::sema::{FunctionBinding, VariableBinding};
use crate::types::Type;

/// Expression node
#[derive(Debug, Clone)]
pub struct Expr {
    pub kind: ExprKind,
    pub span: Span,
    /// Type of this expression (filled in by the checker)
    pub ty: Option<Type>,
}

impl Expr {
    pub fn new(kind: ExprKind, span: Span) -> Self {
        Self {
            kind,
            span,
            ty: None,
        }
    }
}

/// Expression kinds
#[derive(Debug, Clone)]
pub enum ExprKind {
    /// Integer literal as written: `42`, `0x1Fu`, `017`
    IntLiteral(String),

    /// Float literal as written: `1.0`, `.5e2`, `2.0f`
    FloatLiteral(String),

    BoolLiteral(bool),

    /// Variable reference
    Variable {
        name: String,
        binding: Option<Arc<VariableBinding>>,
    },

    /// Unary operation: -x, !flag, ~bits
    Unary {
        op: UnaryOp,
        operand: Box<Expr>,
    },

    /// ++x, x--, ...
    Update {
        op: UpdateOp,
        prefix: bool,
        operand: Box<Expr>,
    },

    /// Binary operation: a + b, x * y
    Binary {
        op: BinaryOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },

    /// Assignment: x = y, a += b
    Assign {
        op: AssignOp,
        target: Box<Expr>,
        value: Box<Expr>,
    },

    /// Ternary conditional: cond ? a : b
    Ternary {
        condition: Box<Expr>,
        then_expr: Box<Expr>,
        else_expr: Box<Expr>,
    },

    /// Sequence: a, b
    Comma {
        left: Box<Expr>,
        right: Box<Expr>,
    },

    /// Function call or constructor: `f(a)`, `vec3(1.0)`, `float[2](a, b)`
    ///
    /// The binder sets exactly one of `binding` (function call) and
    /// `constructor` (constructor target type).
    Call {
        callee: TypeSpecifier,
        args: Vec<Expr>,
        binding: Option<Arc<FunctionBinding>>,
        constructor: Option<Type>,
    },

    /// Field selection or swizzle: `s.f`, `v.xyz`
    Field {
        object: Box<Expr>,
        field: String,
    },

    /// Subscript: `a[i]`
    Index {
        array: Box<Expr>,
        index: Box<Expr>,
    },

    /// `a.length()`
    Length(Box<Expr>),
}

impl ExprKind {
    /// Annotated variable binding, if this is a resolved variable reference
    pub fn variable_binding(&self) -> Option<&Arc<VariableBinding>> {
        match self {
            ExprKind::Variable { binding, .. } => binding.as_ref(),
            _ => None,
        }
    }
}

/// Binary operators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinaryOp {
    // Arithmetic
    Add,
    Sub,
    Mul,
    Div,
    Mod,

    // Bitwise
    BitAnd,
    BitOr,
    BitXor,
    Shl,
    Shr,

    // Logical
    LogAnd,
    LogXor,
    LogOr,

    // Comparison
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl BinaryOp {
    pub const ALL: [BinaryOp; 19] = [
        BinaryOp::Add,
        BinaryOp::Sub,
        BinaryOp::Mul,
        BinaryOp::Div,
        BinaryOp::Mod,
        BinaryOp::BitAnd,
        BinaryOp::BitOr,
        BinaryOp::BitXor,
        BinaryOp::Shl,
        BinaryOp::Shr,
        BinaryOp::LogAnd,
        BinaryOp::LogXor,
        BinaryOp::LogOr,
        BinaryOp::Eq,
        BinaryOp::Ne,
        BinaryOp::Lt,
        BinaryOp::Le,
        BinaryOp::Gt,
        BinaryOp::Ge,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Mod => "%",
            BinaryOp::BitAnd => "&",
            BinaryOp::BitOr => "|",
            BinaryOp::BitXor => "^",
            BinaryOp::Shl => "<<",
            BinaryOp::Shr => ">>",
            BinaryOp::LogAnd => "&&",
            BinaryOp::LogXor => "^^",
            BinaryOp::LogOr => "||",
            BinaryOp::Eq => "==",
            BinaryOp::Ne => "!=",
            BinaryOp::Lt => "<",
            BinaryOp::Le => "<=",
            BinaryOp::Gt => ">",
            BinaryOp::Ge => ">=",
        }
    }

    pub fn is_relational(&self) -> bool {
        matches!(self, BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge)
    }

    pub fn is_equality(&self) -> bool {
        matches!(self, BinaryOp::Eq | BinaryOp::Ne)
    }

    pub fn is_logical(&self) -> bool {
        matches!(self, BinaryOp::LogAnd | BinaryOp::LogXor | BinaryOp::LogOr)
    }
}

/// Unary operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Plus,    // +x
    Neg,     // -x
    Not,     // !x
    BitNot,  // ~x
}

impl UnaryOp {
    pub fn as_str(&self) -> &'static str {
        match self {
            UnaryOp::Plus => "+",
            UnaryOp::Neg => "-",
            UnaryOp::Not => "!",
            UnaryOp::BitNot => "~",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateOp {
    Increment,
    Decrement,
}

impl UpdateOp {
    pub fn as_str(&self) -> &'static str {
        match self {
            UpdateOp::Increment => "++",
            UpdateOp::Decrement => "--",
        }
    }
}

/// Assignment operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssignOp {
    Assign,    // =
    AddAssign, // +=
    SubAssign, // -=
    MulAssign, // *=
    DivAssign, // /=
    ModAssign, // %=
    AndAssign, // &=
    OrAssign,  // |=
    XorAssign, // ^=
    ShlAssign, // <<=
    ShrAssign, // >>=
}

impl AssignOp {
    pub fn as_str(&self) -> &'static str {
        match self {
            AssignOp::Assign => "=",
            AssignOp::AddAssign => "+=",
            AssignOp::SubAssign => "-=",
            AssignOp::MulAssign => "*=",
            AssignOp::DivAssign => "/=",
            AssignOp::ModAssign => "%=",
            AssignOp::AndAssign => "&=",
            AssignOp::OrAssign => "|=",
            AssignOp::XorAssign => "^=",
            AssignOp::ShlAssign => "<<=",
            AssignOp::ShrAssign => ">>=",
        }
    }

    /// Get the corresponding binary operator for compound assignment
    pub fn to_binary_op(&self) -> Option<BinaryOp> {
        match self {
            AssignOp::Assign => None,
            AssignOp::AddAssign => Some(BinaryOp::Add),
            AssignOp::SubAssign => Some(BinaryOp::Sub),
            AssignOp::MulAssign => Some(BinaryOp::Mul),
            AssignOp::DivAssign => Some(BinaryOp::Div),
            AssignOp::ModAssign => Some(BinaryOp::Mod),
            AssignOp::AndAssign => Some(BinaryOp::BitAnd),
            AssignOp::OrAssign => Some(BinaryOp::BitOr),
            AssignOp::XorAssign => Some(BinaryOp::BitXor),
            AssignOp::ShlAssign => Some(BinaryOp::Shl),
            AssignOp::ShrAssign => Some(BinaryOp::Shr),
        }
    }
}
