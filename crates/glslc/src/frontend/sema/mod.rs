//! Semantic analysis module
//!
//! Binding resolves every name against nested scopes rooted in the builtin
//! scope; checking types every expression and enforces the language rules.
//! Both append to a caller-owned diagnostic list and never stop early.

mod binder;
mod builtins;
mod checker;
pub mod operators;
mod scope;

pub use binder::{Binder, bind};
pub use builtins::{builtin_scope, generic_family};
pub use checker::{Checker, check};
pub use scope::{
    Binding, DeclarationKind, FunctionBinding, Overload, ParamQualifier, Parameter, Scope,
    ScopeStack, VariableBinding,
};
