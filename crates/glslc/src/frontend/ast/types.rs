//! Type specifiers and qualifiers

use super::Expr;
use crate::common::Span;
use crate::types::{BasicType, Type};

/// Type specifier: `vec3`, `S`, `struct { ... }`, optionally `[N]`
#[derive(Debug, Clone)]
pub struct TypeSpecifier {
    pub kind: TypeSpecifierKind,
    pub array: Option<ArraySpecifier>,
    pub span: Span,
    /// Resolved type including `array` (filled in by the binder)
    pub ty: Option<Type>,
}

impl TypeSpecifier {
    pub fn new(kind: TypeSpecifierKind, span: Span) -> Self {
        Self {
            kind,
            array: None,
            span,
            ty: None,
        }
    }

    pub fn with_array(mut self, array: ArraySpecifier) -> Self {
        self.span = self.span.merge(array.span);
        self.array = Some(array);
        self
    }

    /// Name as written in the source, for messages
    pub fn name(&self) -> String {
        match &self.kind {
            TypeSpecifierKind::Basic(b) => b.to_string(),
            TypeSpecifierKind::Named(n) => n.clone(),
            TypeSpecifierKind::Struct(s) => s.name.clone().unwrap_or_else(|| "struct".to_string()),
        }
    }
}

#[derive(Debug, Clone)]
pub enum TypeSpecifierKind {
    Basic(BasicType),
    /// Struct definition in place
    Struct(StructSpecifier),
    /// Reference to a struct (or a builtin generic family name)
    Named(String),
}

/// `[]` or `[size]`
#[derive(Debug, Clone)]
pub struct ArraySpecifier {
    pub size: Option<Box<Expr>>,
    pub span: Span,
}

impl ArraySpecifier {
    pub fn new(size: Option<Expr>, span: Span) -> Self {
        Self {
            size: size.map(Box::new),
            span,
        }
    }
}

/// `struct Name { members }`
#[derive(Debug, Clone)]
pub struct StructSpecifier {
    pub name: Option<String>,
    pub members: Vec<StructMember>,
    pub span: Span,
}

/// One member line of a struct or uniform block: `highp vec3 a, b[2];`
#[derive(Debug, Clone)]
pub struct StructMember {
    pub qualifiers: TypeQualifiers,
    pub specifier: TypeSpecifier,
    pub declarators: Vec<MemberDeclarator>,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct MemberDeclarator {
    pub name: String,
    pub array: Option<ArraySpecifier>,
    pub span: Span,
}

/// Storage qualifiers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageQualifier {
    Const,
    In,
    Out,
    InOut,
    Uniform,
    CentroidIn,
    CentroidOut,
}

impl StorageQualifier {
    pub fn as_str(&self) -> &'static str {
        match self {
            StorageQualifier::Const => "const",
            StorageQualifier::In => "in",
            StorageQualifier::Out => "out",
            StorageQualifier::InOut => "inout",
            StorageQualifier::Uniform => "uniform",
            StorageQualifier::CentroidIn => "centroid in",
            StorageQualifier::CentroidOut => "centroid out",
        }
    }

    pub fn is_input(&self) -> bool {
        matches!(self, StorageQualifier::In | StorageQualifier::CentroidIn)
    }

    pub fn is_output(&self) -> bool {
        matches!(self, StorageQualifier::Out | StorageQualifier::CentroidOut)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Interpolation {
    Smooth,
    Flat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Precision {
    Low,
    Medium,
    High,
}

/// `layout(name)` or `layout(name = value)`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LayoutQualifier {
    pub name: String,
    pub value: Option<String>,
    pub span: Span,
}

/// Qualifiers preceding a type specifier
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TypeQualifiers {
    pub storage: Option<StorageQualifier>,
    pub interpolation: Option<Interpolation>,
    pub invariant: bool,
    pub precision: Option<Precision>,
    pub layout: Vec<LayoutQualifier>,
    pub span: Span,
}

impl TypeQualifiers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_storage(mut self, storage: StorageQualifier) -> Self {
        self.storage = Some(storage);
        self
    }

    pub fn is_const(&self) -> bool {
        self.storage == Some(StorageQualifier::Const)
    }

    pub fn is_empty(&self) -> bool {
        self.storage.is_none()
            && self.interpolation.is_none()
            && !self.invariant
            && self.precision.is_none()
            && self.layout.is_empty()
    }
}

/// Qualifiers plus specifier, as used for variables and return types
#[derive(Debug, Clone)]
pub struct FullType {
    pub qualifiers: TypeQualifiers,
    pub specifier: TypeSpecifier,
}
