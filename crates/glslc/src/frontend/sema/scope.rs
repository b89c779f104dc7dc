//! Symbol table and scope management

use std::collections::HashMap;
use std::sync::Arc;

use crate::common::Span;
use crate::eval::Constant;
use crate::frontend::ast::{StorageQualifier, TypeQualifiers};
use crate::types::{StructType, Type, types_match};

/// Where a variable was declared
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeclarationKind {
    Global,
    Local,
    Parameter,
    /// Member of a uniform block without an instance name
    BlockMember,
    Builtin,
}

/// A declared variable
#[derive(Debug)]
pub struct VariableBinding {
    pub name: String,
    /// `None` when the declared type failed to resolve
    pub ty: Option<Type>,
    pub kind: DeclarationKind,
    pub qualifiers: TypeQualifiers,
    /// Folded initializer of a `const` variable
    pub constant: Option<Constant>,
    pub span: Span,
}

impl VariableBinding {
    pub fn is_const(&self) -> bool {
        self.qualifiers.is_const()
    }

    /// Can this variable be the root of an assignment target?
    pub fn is_writable(&self) -> bool {
        match self.qualifiers.storage {
            Some(StorageQualifier::Const | StorageQualifier::Uniform) => false,
            Some(StorageQualifier::In | StorageQualifier::CentroidIn) => {
                self.kind == DeclarationKind::Parameter
            }
            _ => true,
        }
    }

    pub fn is_output(&self) -> bool {
        self.qualifiers.storage.is_some_and(|s| s.is_output())
    }
}

/// Parameter passing direction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamQualifier {
    In,
    ConstIn,
    Out,
    InOut,
}

impl ParamQualifier {
    pub fn from_qualifiers(qualifiers: &TypeQualifiers) -> Self {
        match qualifiers.storage {
            Some(StorageQualifier::Const) => ParamQualifier::ConstIn,
            Some(StorageQualifier::Out) => ParamQualifier::Out,
            Some(StorageQualifier::InOut) => ParamQualifier::InOut,
            _ => ParamQualifier::In,
        }
    }

    /// The argument is written back to the caller
    pub fn is_output(&self) -> bool {
        matches!(self, ParamQualifier::Out | ParamQualifier::InOut)
    }
}

#[derive(Debug, Clone)]
pub struct Parameter {
    pub ty: Option<Type>,
    pub qualifier: ParamQualifier,
}

/// One concrete signature of a function
#[derive(Debug, Clone)]
pub struct Overload {
    pub params: Vec<Parameter>,
    pub result: Option<Type>,
    pub span: Span,
    /// A body has been seen for this signature
    pub defined: bool,
}

impl Overload {
    /// Exact match of the ordered parameter types; unknown types never match
    pub fn accepts(&self, args: &[Option<&Type>]) -> bool {
        self.params.len() == args.len()
            && self
                .params
                .iter()
                .zip(args)
                .all(|(p, a)| types_match(p.ty.as_ref(), *a))
    }

    pub fn same_params(&self, other: &Overload) -> bool {
        let types: Vec<Option<&Type>> = other.params.iter().map(|p| p.ty.as_ref()).collect();
        self.accepts(&types)
    }

    /// `name(T1, T2) -> R` for diagnostics
    pub fn signature(&self, name: &str) -> String {
        let params: Vec<String> = self
            .params
            .iter()
            .map(|p| p.ty.as_ref().map_or_else(|| "?".to_string(), |t| t.to_string()))
            .collect();
        let result = self.result.as_ref().map_or_else(|| "?".to_string(), |t| t.to_string());
        format!("{}({}) -> {}", name, params.join(", "), result)
    }
}

/// All overloads sharing one function name
///
/// Cloned on write: a call site keeps the overload set that was visible
/// when it was bound.
#[derive(Debug, Clone)]
pub struct FunctionBinding {
    pub name: String,
    pub overloads: Vec<Overload>,
    pub builtin: bool,
}

impl FunctionBinding {
    pub fn new(name: impl Into<String>, builtin: bool) -> Self {
        Self {
            name: name.into(),
            overloads: Vec::new(),
            builtin,
        }
    }

    pub fn find_overload(&self, args: &[Option<&Type>]) -> Option<&Overload> {
        self.overloads.iter().find(|o| o.accepts(args))
    }
}

/// A symbol in the symbol table
#[derive(Debug, Clone)]
pub enum Binding {
    Variable(Arc<VariableBinding>),
    Function(Arc<FunctionBinding>),
    Struct(Arc<StructType>),
}

impl Binding {
    pub fn describe(&self) -> &'static str {
        match self {
            Binding::Variable(_) => "variable",
            Binding::Function(_) => "function",
            Binding::Struct(_) => "struct",
        }
    }
}

/// A scope containing symbols
#[derive(Debug, Default)]
pub struct Scope {
    symbols: HashMap<String, Binding>,
}

impl Scope {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn define(&mut self, name: &str, binding: Binding) -> Result<(), String> {
        if let Some(existing) = self.symbols.get(name) {
            return Err(format!(
                "'{}' is already declared in this scope as a {}",
                name,
                existing.describe()
            ));
        }
        self.symbols.insert(name.to_string(), binding);
        Ok(())
    }

    pub fn lookup(&self, name: &str) -> Option<&Binding> {
        self.symbols.get(name)
    }

    pub fn lookup_mut(&mut self, name: &str) -> Option<&mut Binding> {
        self.symbols.get_mut(name)
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Binding)> {
        self.symbols.iter()
    }
}

/// Nested scopes of one translation unit, parented on the frozen builtins
pub struct ScopeStack<'a> {
    builtins: Option<&'a Scope>,
    /// Innermost last; index 0 is the global scope
    scopes: Vec<Scope>,
}

impl<'a> ScopeStack<'a> {
    pub fn new(builtins: Option<&'a Scope>) -> Self {
        Self {
            builtins,
            scopes: vec![Scope::new()],
        }
    }

    pub fn push(&mut self) {
        self.scopes.push(Scope::new());
        log::trace!("push scope (depth {})", self.scopes.len());
    }

    pub fn pop(&mut self) {
        if self.scopes.len() > 1 {
            self.scopes.pop();
        }
        log::trace!("pop scope (depth {})", self.scopes.len());
    }

    pub fn is_global(&self) -> bool {
        self.scopes.len() == 1
    }

    /// Define in the innermost scope
    pub fn define(&mut self, name: &str, binding: Binding) -> Result<(), String> {
        let scope = self.scopes.last_mut().unwrap_or_else(|| unreachable!("global scope is never popped"));
        scope.define(name, binding)
    }

    /// Resolve a name from the innermost scope outwards, ending at the builtins
    pub fn lookup(&self, name: &str) -> Option<&Binding> {
        self.scopes
            .iter()
            .rev()
            .find_map(|s| s.lookup(name))
            .or_else(|| self.builtins.and_then(|b| b.lookup(name)))
    }

    pub fn lookup_builtin(&self, name: &str) -> Option<&Binding> {
        self.builtins.and_then(|b| b.lookup(name))
    }

    pub fn lookup_local_mut(&mut self, name: &str) -> Option<&mut Binding> {
        self.scopes.last_mut().and_then(|s| s.lookup_mut(name))
    }

    /// The global scope, consuming the stack
    pub fn into_global(mut self) -> Scope {
        self.scopes.truncate(1);
        self.scopes.pop().unwrap_or_default()
    }
}
