//! Semantic diagnostics accumulated by the binder and checker

use std::fmt;

use super::Span;

/// Stable diagnostic codes
///
/// Binding codes come from name resolution, checking codes from typing and
/// well-formedness rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DiagnosticCode {
    // Binding
    DuplicateDeclaration,
    UnresolvedIdentifier,
    NotAStruct,
    BuiltinRedefinition,
    NotAVariable,
    NonConstantArraySize,
    InvalidArraySize,

    // Checking
    OperatorMismatch,
    TypeMismatch,
    NonBoolCondition,
    InvalidSwitchSelector,
    NotAnLvalue,
    InvalidIndex,
    IndexOutOfRange,
    NoMatchingOverload,
    QualifierMisuse,
    InvalidSwizzle,
    NoSuchField,
    InvalidConstructor,
    ReturnMismatch,
    IntegerOverflow,
    MalformedLiteral,
    NotConstant,
    StageRestriction,
    InvalidDeclaration,
}

impl DiagnosticCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            DiagnosticCode::DuplicateDeclaration => "duplicate-declaration",
            DiagnosticCode::UnresolvedIdentifier => "unresolved-identifier",
            DiagnosticCode::NotAStruct => "not-a-struct",
            DiagnosticCode::BuiltinRedefinition => "builtin-redefinition",
            DiagnosticCode::NotAVariable => "not-a-variable",
            DiagnosticCode::NonConstantArraySize => "non-constant-array-size",
            DiagnosticCode::InvalidArraySize => "invalid-array-size",
            DiagnosticCode::OperatorMismatch => "operator-mismatch",
            DiagnosticCode::TypeMismatch => "type-mismatch",
            DiagnosticCode::NonBoolCondition => "non-bool-condition",
            DiagnosticCode::InvalidSwitchSelector => "invalid-switch-selector",
            DiagnosticCode::NotAnLvalue => "not-an-lvalue",
            DiagnosticCode::InvalidIndex => "invalid-index",
            DiagnosticCode::IndexOutOfRange => "index-out-of-range",
            DiagnosticCode::NoMatchingOverload => "no-matching-overload",
            DiagnosticCode::QualifierMisuse => "qualifier-misuse",
            DiagnosticCode::InvalidSwizzle => "invalid-swizzle",
            DiagnosticCode::NoSuchField => "no-such-field",
            DiagnosticCode::InvalidConstructor => "invalid-constructor",
            DiagnosticCode::ReturnMismatch => "return-mismatch",
            DiagnosticCode::IntegerOverflow => "integer-overflow",
            DiagnosticCode::MalformedLiteral => "malformed-literal",
            DiagnosticCode::NotConstant => "not-constant",
            DiagnosticCode::StageRestriction => "stage-restriction",
            DiagnosticCode::InvalidDeclaration => "invalid-declaration",
        }
    }

    /// True for codes raised during name resolution
    pub fn is_binding(&self) -> bool {
        matches!(
            self,
            DiagnosticCode::DuplicateDeclaration
                | DiagnosticCode::UnresolvedIdentifier
                | DiagnosticCode::NotAStruct
                | DiagnosticCode::BuiltinRedefinition
                | DiagnosticCode::NotAVariable
                | DiagnosticCode::NonConstantArraySize
                | DiagnosticCode::InvalidArraySize
        )
    }
}

impl fmt::Display for DiagnosticCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single semantic diagnostic
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub span: Span,
    pub code: DiagnosticCode,
    pub message: String,
}

impl Diagnostic {
    pub fn new(code: DiagnosticCode, message: impl Into<String>, span: Span) -> Self {
        Self {
            span,
            code,
            message: message.into(),
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)
    }
}
