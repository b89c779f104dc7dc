//! Declaration AST nodes

use std::sync::Arc;

use super::{ArraySpecifier, Block, Expr, FullType, Precision, StructMember, TypeQualifiers, TypeSpecifier};
use crate::common::Span;
use crate::frontend::sema::VariableBinding;

/// Declaration node
#[derive(Debug, Clone)]
pub struct Declaration {
    pub kind: DeclKind,
    pub span: Span,
}

impl Declaration {
    pub fn new(kind: DeclKind, span: Span) -> Self {
        Self { kind, span }
    }
}

/// Declaration kinds
#[derive(Debug, Clone)]
pub enum DeclKind {
    /// Init-declarator list: `const vec3 a = vec3(1.0), b;`
    ///
    /// A bare struct specifier (`struct S { ... };`) has no declarators.
    Variables(VariableList),

    /// Function prototype or definition
    Function(FunctionDecl),

    /// `uniform Name { members } instance;`
    Block(InterfaceBlock),

    /// `precision highp float;`
    Precision {
        precision: Precision,
        specifier: TypeSpecifier,
    },

    /// `invariant gl_Position, v;`
    Invariant(Vec<InvariantTarget>),
}

#[derive(Debug, Clone)]
pub struct VariableList {
    pub ty: FullType,
    pub declarators: Vec<Declarator>,
}

/// One declared name with its own array suffix and initializer
#[derive(Debug, Clone)]
pub struct Declarator {
    pub name: String,
    pub array: Option<ArraySpecifier>,
    pub init: Option<Expr>,
    pub span: Span,
    /// Declared variable (filled in by the binder)
    pub binding: Option<Arc<VariableBinding>>,
}

impl Declarator {
    pub fn new(name: String, span: Span) -> Self {
        Self {
            name,
            array: None,
            init: None,
            span,
            binding: None,
        }
    }
}

/// Function prototype or definition
#[derive(Debug, Clone)]
pub struct FunctionDecl {
    pub return_type: FullType,
    pub name: String,
    pub params: Vec<ParamDecl>,
    pub body: Option<Block>,
    pub span: Span,
}

impl FunctionDecl {
    /// Check if this is a definition (has body)
    pub fn is_definition(&self) -> bool {
        self.body.is_some()
    }
}

/// Function parameter declaration
#[derive(Debug, Clone)]
pub struct ParamDecl {
    pub qualifiers: TypeQualifiers,
    pub specifier: TypeSpecifier,
    pub name: Option<String>,
    pub array: Option<ArraySpecifier>,
    pub span: Span,
    pub binding: Option<Arc<VariableBinding>>,
}

/// Uniform block
#[derive(Debug, Clone)]
pub struct InterfaceBlock {
    pub qualifiers: TypeQualifiers,
    pub name: String,
    pub members: Vec<StructMember>,
    pub instance: Option<Declarator>,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct InvariantTarget {
    pub name: String,
    pub span: Span,
    pub binding: Option<Arc<VariableBinding>>,
}
