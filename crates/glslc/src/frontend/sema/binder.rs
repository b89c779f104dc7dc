//! Binder - scope construction and name resolution
//!
//! One walk over the translation unit in source order. Every declaration is
//! entered into the scope stack, every name is resolved, and the result is
//! recorded in the AST's annotation slots. Errors are accumulated; a name
//! that fails to resolve leaves its slot empty.

use std::sync::Arc;

use super::builtins::{builtin_scope, generic_family};
use super::scope::{
    Binding, DeclarationKind, FunctionBinding, Overload, ParamQualifier, Parameter, Scope,
    ScopeStack, VariableBinding,
};
use crate::common::{Diagnostic, DiagnosticCode, Span};
use crate::eval::{Scalar, eval};
use crate::frontend::ast::*;
use crate::types::{ArraySize, StructField, StructType, Type, types_match};

/// Bind a translation unit against the builtin scope
pub fn bind(unit: &mut TranslationUnit, diagnostics: &mut Vec<Diagnostic>) {
    let mut binder = Binder::new(builtin_scope());
    binder.bind_unit(unit);
    diagnostics.append(&mut binder.diagnostics);
}

pub struct Binder<'a> {
    scopes: ScopeStack<'a>,
    diagnostics: Vec<Diagnostic>,
    /// Binding the builtin declarations: generic family names resolve and
    /// every variable is a builtin
    builtin_mode: bool,
}

impl<'a> Binder<'a> {
    pub fn new(builtins: &'a Scope) -> Self {
        Self {
            scopes: ScopeStack::new(Some(builtins)),
            diagnostics: Vec::new(),
            builtin_mode: false,
        }
    }

    /// Binder for the builtin declarations themselves
    pub fn for_builtins() -> Binder<'static> {
        Binder {
            scopes: ScopeStack::new(None),
            diagnostics: Vec::new(),
            builtin_mode: true,
        }
    }

    pub fn bind_unit(&mut self, unit: &mut TranslationUnit) {
        for decl in &mut unit.declarations {
            self.bind_declaration(decl);
        }
    }

    /// The global scope and the accumulated diagnostics
    pub fn finish(self) -> (Scope, Vec<Diagnostic>) {
        (self.scopes.into_global(), self.diagnostics)
    }

    fn error(&mut self, code: DiagnosticCode, message: impl Into<String>, span: Span) {
        self.diagnostics.push(Diagnostic::new(code, message, span));
    }

    fn declaration_kind(&self) -> DeclarationKind {
        if self.builtin_mode {
            DeclarationKind::Builtin
        } else if self.scopes.is_global() {
            DeclarationKind::Global
        } else {
            DeclarationKind::Local
        }
    }

    fn define(&mut self, name: &str, binding: Binding, span: Span) {
        if let Err(message) = self.scopes.define(name, binding) {
            self.error(DiagnosticCode::DuplicateDeclaration, message, span);
        }
    }

    // =========================================================================
    // Declarations
    // =========================================================================

    fn bind_declaration(&mut self, decl: &mut Declaration) {
        match &mut decl.kind {
            DeclKind::Variables(list) => self.bind_variables(list),
            DeclKind::Function(func) => self.bind_function(func),
            DeclKind::Block(block) => self.bind_interface_block(block),
            DeclKind::Precision { specifier, .. } => {
                self.resolve_specifier(specifier, None);
            }
            DeclKind::Invariant(targets) => {
                for target in targets {
                    target.binding = self.resolve_variable(&target.name, target.span);
                }
            }
        }
    }

    fn bind_variables(&mut self, list: &mut VariableList) {
        let base = self.resolve_specifier(&mut list.ty.specifier, None);
        let kind = self.declaration_kind();

        for declarator in &mut list.declarators {
            // The initializer cannot see the name it initializes
            if let Some(init) = &mut declarator.init {
                self.bind_expr(init);
            }

            let ty = self.declarator_type(
                base.as_ref(),
                declarator.array.as_mut(),
                declarator.init.as_ref(),
                &declarator.name,
                declarator.span,
            );

            let constant = if list.ty.qualifiers.is_const() {
                declarator
                    .init
                    .as_ref()
                    .and_then(eval)
                    .filter(|c| ty.as_ref() == Some(&c.ty))
            } else {
                None
            };

            let binding = Arc::new(VariableBinding {
                name: declarator.name.clone(),
                ty,
                kind,
                qualifiers: list.ty.qualifiers.clone(),
                constant,
                span: declarator.span,
            });
            declarator.binding = Some(Arc::clone(&binding));
            self.define(&declarator.name, Binding::Variable(binding), declarator.span);
        }
    }

    /// Declared type of one declarator, sizing `T x[] = T[](...)` from its
    /// initializer
    fn declarator_type(
        &mut self,
        base: Option<&Type>,
        array: Option<&mut ArraySpecifier>,
        init: Option<&Expr>,
        name: &str,
        span: Span,
    ) -> Option<Type> {
        let size = array.map(|array| self.array_size(array));
        let base = base?.clone();

        let ty = match size {
            None => base,
            Some(None) => return None,
            Some(Some(_)) if base.is_array() => {
                self.error(
                    DiagnosticCode::InvalidDeclaration,
                    format!("'{}' cannot be an array of arrays", name),
                    span,
                );
                return None;
            }
            Some(Some(size)) => Type::Array { of: Box::new(base), size },
        };

        match ty {
            Type::Array { of, size: ArraySize::Unsized } => {
                if let Some(n) = init.and_then(initializer_array_size) {
                    return Some(Type::Array { of, size: ArraySize::Sized(n) });
                }
                self.error(
                    DiagnosticCode::InvalidArraySize,
                    format!("array '{}' needs an explicit size or an array initializer", name),
                    span,
                );
                None
            }
            ty => Some(ty),
        }
    }

    /// Fold an array size; `[]` is unsized
    fn array_size(&mut self, array: &mut ArraySpecifier) -> Option<ArraySize> {
        let Some(size) = &mut array.size else {
            return Some(ArraySize::Unsized);
        };
        self.bind_expr(size);

        let Some(constant) = eval(size) else {
            self.error(
                DiagnosticCode::NonConstantArraySize,
                "array size must be a constant integer expression",
                array.span,
            );
            return None;
        };

        match constant.value.as_scalar().and_then(Scalar::as_index) {
            Some(n) if n > 0 && n <= i64::from(u32::MAX) => Some(ArraySize::Sized(n as u32)),
            _ => {
                self.error(
                    DiagnosticCode::InvalidArraySize,
                    format!("array size must be a positive integer, found {}", constant.to_glsl()),
                    array.span,
                );
                None
            }
        }
    }

    /// Sized array types only (members, parameters, block instances)
    fn require_sized(&mut self, ty: Option<Type>, name: &str, span: Span) -> Option<Type> {
        match ty? {
            Type::Array { size: ArraySize::Unsized, .. } => {
                self.error(
                    DiagnosticCode::InvalidArraySize,
                    format!("array '{}' must have an explicit size", name),
                    span,
                );
                None
            }
            ty => Some(ty),
        }
    }

    fn with_array(&mut self, base: Option<Type>, array: Option<&mut ArraySpecifier>) -> Option<Type> {
        match array {
            Some(array) => {
                let size = self.array_size(array);
                Some(Type::Array { of: Box::new(base?), size: size? })
            }
            None => base,
        }
    }

    // =========================================================================
    // Type specifiers
    // =========================================================================

    /// Resolve a type specifier and record the result on it
    ///
    /// `generic` selects the family member substituted for generic names
    /// while binding builtins.
    fn resolve_specifier(&mut self, spec: &mut TypeSpecifier, generic: Option<usize>) -> Option<Type> {
        let base = match &mut spec.kind {
            TypeSpecifierKind::Basic(b) => Some(Type::Basic(*b)),
            TypeSpecifierKind::Struct(s) => self.bind_struct(s),
            TypeSpecifierKind::Named(name) => self.resolve_named(name, generic, spec.span),
        };
        let ty = self.with_array(base, spec.array.as_mut());
        spec.ty = ty.clone();
        ty
    }

    fn resolve_named(&mut self, name: &str, generic: Option<usize>, span: Span) -> Option<Type> {
        if self.builtin_mode {
            if let (Some(members), Some(index)) = (generic_family(name), generic) {
                return Some(Type::Basic(members[index]));
            }
        }

        let resolved = match self.scopes.lookup(name) {
            Some(Binding::Struct(s)) => Ok(Type::Struct(Arc::clone(s))),
            Some(other) => Err((
                DiagnosticCode::NotAStruct,
                format!("'{}' is a {}, not a type", name, other.describe()),
            )),
            None => Err((DiagnosticCode::UnresolvedIdentifier, format!("unknown type '{}'", name))),
        };

        match resolved {
            Ok(ty) => Some(ty),
            Err((code, message)) => {
                self.error(code, message, span);
                None
            }
        }
    }

    fn bind_members(&mut self, members: &mut [StructMember]) -> Vec<StructField> {
        let mut fields: Vec<StructField> = Vec::new();
        for member in members {
            if let TypeSpecifierKind::Struct(inner) = &member.specifier.kind {
                let name = inner.name.as_deref().unwrap_or("anonymous struct");
                self.error(
                    DiagnosticCode::InvalidDeclaration,
                    format!("struct '{}' cannot be defined inside a member list", name),
                    member.specifier.span,
                );
            }
            let base = self.resolve_specifier(&mut member.specifier, None);
            for declarator in &mut member.declarators {
                let ty = self.with_array(base.clone(), declarator.array.as_mut());
                let ty = self.require_sized(ty, &declarator.name, declarator.span);

                if fields.iter().any(|f| f.name == declarator.name) {
                    self.error(
                        DiagnosticCode::DuplicateDeclaration,
                        format!("duplicate member '{}'", declarator.name),
                        declarator.span,
                    );
                    continue;
                }
                if let Some(ty) = ty {
                    fields.push(StructField {
                        name: declarator.name.clone(),
                        ty,
                        span: declarator.span,
                    });
                }
            }
        }
        fields
    }

    fn bind_struct(&mut self, s: &mut StructSpecifier) -> Option<Type> {
        let fields = self.bind_members(&mut s.members);
        let struct_type = Arc::new(StructType {
            name: s.name.clone(),
            fields,
            span: s.span,
        });
        if let Some(name) = &s.name {
            self.define(name, Binding::Struct(Arc::clone(&struct_type)), s.span);
        }
        Some(Type::Struct(struct_type))
    }

    fn bind_interface_block(&mut self, block: &mut InterfaceBlock) {
        let fields = self.bind_members(&mut block.members);
        let kind = self.declaration_kind();

        match &mut block.instance {
            Some(instance) => {
                let block_type = Type::Struct(Arc::new(StructType {
                    name: Some(block.name.clone()),
                    fields,
                    span: block.span,
                }));
                let ty = self.with_array(Some(block_type), instance.array.as_mut());
                let ty = self.require_sized(ty, &instance.name, instance.span);

                let binding = Arc::new(VariableBinding {
                    name: instance.name.clone(),
                    ty,
                    kind,
                    qualifiers: block.qualifiers.clone(),
                    constant: None,
                    span: instance.span,
                });
                instance.binding = Some(Arc::clone(&binding));
                self.define(&instance.name, Binding::Variable(binding), instance.span);
            }
            None => {
                for field in fields {
                    let binding = Arc::new(VariableBinding {
                        name: field.name.clone(),
                        ty: Some(field.ty),
                        kind: DeclarationKind::BlockMember,
                        qualifiers: block.qualifiers.clone(),
                        constant: None,
                        span: field.span,
                    });
                    self.define(&field.name, Binding::Variable(binding), field.span);
                }
            }
        }
    }

    // =========================================================================
    // Functions
    // =========================================================================

    fn bind_function(&mut self, func: &mut FunctionDecl) {
        if self.builtin_mode {
            if let Some(count) = generic_count(func) {
                for index in 0..count {
                    let overload = self.function_signature(func, Some(index));
                    self.register_overload(&func.name, overload);
                }
                return;
            }
        }

        let overload = self.function_signature(func, None);
        let param_types: Vec<Option<Type>> = overload.params.iter().map(|p| p.ty.clone()).collect();
        self.register_overload(&func.name, overload);

        if let Some(body) = &mut func.body {
            // Parameters share the body's scope
            self.scopes.push();
            for (param, ty) in func.params.iter_mut().zip(param_types) {
                let Some(name) = &param.name else { continue };
                let binding = Arc::new(VariableBinding {
                    name: name.clone(),
                    ty,
                    kind: DeclarationKind::Parameter,
                    qualifiers: param.qualifiers.clone(),
                    constant: None,
                    span: param.span,
                });
                param.binding = Some(Arc::clone(&binding));
                self.define(name, Binding::Variable(binding), param.span);
            }
            for stmt in &mut body.stmts {
                self.bind_stmt(stmt);
            }
            self.scopes.pop();
        }
    }

    fn function_signature(&mut self, func: &mut FunctionDecl, generic: Option<usize>) -> Overload {
        let result = self.resolve_specifier(&mut func.return_type.specifier, generic);

        let mut params = Vec::with_capacity(func.params.len());
        for param in &mut func.params {
            let base = self.resolve_specifier(&mut param.specifier, generic);
            let ty = self.with_array(base, param.array.as_mut());
            let name = param.name.as_deref().unwrap_or("parameter");
            let ty = self.require_sized(ty, name, param.span);
            params.push(Parameter {
                ty,
                qualifier: ParamQualifier::from_qualifiers(&param.qualifiers),
            });
        }

        Overload {
            params,
            result,
            span: func.span,
            defined: func.body.is_some(),
        }
    }

    /// Add an overload under `name`, or merge it with an identical prototype
    fn register_overload(&mut self, name: &str, overload: Overload) {
        let span = overload.span;

        if !self.builtin_mode && matches!(self.scopes.lookup_builtin(name), Some(Binding::Function(_))) {
            self.error(
                DiagnosticCode::BuiltinRedefinition,
                format!("cannot redefine or overload builtin function '{}'", name),
                span,
            );
            return;
        }

        if self.scopes.lookup_local_mut(name).is_none() {
            log::trace!("function '{}': first overload", name);
            let mut function = FunctionBinding::new(name, self.builtin_mode);
            function.overloads.push(overload);
            self.define(name, Binding::Function(Arc::new(function)), span);
            return;
        }

        let problem = match self.scopes.lookup_local_mut(name) {
            Some(Binding::Function(function)) => {
                // Call sites bound earlier keep their own snapshot
                let function = Arc::make_mut(function);
                match function.overloads.iter_mut().find(|o| o.same_params(&overload)) {
                    Some(existing)
                        if existing.result.is_some()
                            && overload.result.is_some()
                            && !types_match(existing.result.as_ref(), overload.result.as_ref()) =>
                    {
                        Some(format!("function '{}' redeclared with a different return type", name))
                    }
                    Some(existing) if existing.defined && overload.defined => {
                        Some(format!("function '{}' already has a body", name))
                    }
                    Some(existing) => {
                        existing.defined |= overload.defined;
                        None
                    }
                    None => {
                        log::trace!("function '{}': overload {}", name, function.overloads.len() + 1);
                        function.overloads.push(overload);
                        None
                    }
                }
            }
            Some(other) => Some(format!("'{}' is already declared as a {}", name, other.describe())),
            None => unreachable!("'{}' was just found in the innermost scope", name),
        };

        if let Some(message) = problem {
            self.error(DiagnosticCode::DuplicateDeclaration, message, span);
        }
    }

    // =========================================================================
    // Statements
    // =========================================================================

    fn bind_block(&mut self, block: &mut Block) {
        self.scopes.push();
        for stmt in &mut block.stmts {
            self.bind_stmt(stmt);
        }
        self.scopes.pop();
    }

    /// A sub-statement's declarations do not leak into the enclosing scope
    fn bind_nested(&mut self, stmt: &mut Stmt) {
        if let StmtKind::Block(block) = &mut stmt.kind {
            self.bind_block(block);
        } else {
            self.scopes.push();
            self.bind_stmt(stmt);
            self.scopes.pop();
        }
    }

    fn bind_stmt(&mut self, stmt: &mut Stmt) {
        match &mut stmt.kind {
            StmtKind::Expr(expr) | StmtKind::Case(expr) | StmtKind::Return(Some(expr)) => {
                self.bind_expr(expr);
            }
            StmtKind::Block(block) => self.bind_block(block),
            StmtKind::Declaration(decl) => self.bind_declaration(decl),
            StmtKind::If { condition, then_branch, else_branch } => {
                self.bind_expr(condition);
                self.bind_nested(then_branch);
                if let Some(else_branch) = else_branch {
                    self.bind_nested(else_branch);
                }
            }
            StmtKind::Switch { selector, body } => {
                self.bind_expr(selector);
                self.bind_block(body);
            }
            StmtKind::While { condition, body } => {
                self.bind_expr(condition);
                self.bind_nested(body);
            }
            StmtKind::DoWhile { body, condition } => {
                self.bind_nested(body);
                self.bind_expr(condition);
            }
            StmtKind::For { init, condition, update, body } => {
                self.scopes.push();
                if let Some(init) = init {
                    self.bind_stmt(init);
                }
                if let Some(condition) = condition {
                    self.bind_expr(condition);
                }
                if let Some(update) = update {
                    self.bind_expr(update);
                }
                self.bind_nested(body);
                self.scopes.pop();
            }
            StmtKind::Empty
            | StmtKind::Default
            | StmtKind::Continue
            | StmtKind::Break
            | StmtKind::Return(None)
            | StmtKind::Discard => {}
        }
    }

    // =========================================================================
    // Expressions
    // =========================================================================

    fn bind_expr(&mut self, expr: &mut Expr) {
        match &mut expr.kind {
            ExprKind::Variable { name, binding } => {
                *binding = self.resolve_variable(name, expr.span);
            }
            ExprKind::Unary { operand, .. }
            | ExprKind::Update { operand, .. }
            | ExprKind::Length(operand)
            | ExprKind::Field { object: operand, .. } => self.bind_expr(operand),
            ExprKind::Binary { left, right, .. } | ExprKind::Comma { left, right } => {
                self.bind_expr(left);
                self.bind_expr(right);
            }
            ExprKind::Assign { target, value, .. } => {
                self.bind_expr(target);
                self.bind_expr(value);
            }
            ExprKind::Index { array, index } => {
                self.bind_expr(array);
                self.bind_expr(index);
            }
            ExprKind::Ternary { condition, then_expr, else_expr } => {
                self.bind_expr(condition);
                self.bind_expr(then_expr);
                self.bind_expr(else_expr);
            }
            ExprKind::Call { callee, args, binding, constructor } => {
                for arg in args.iter_mut() {
                    self.bind_expr(arg);
                }
                self.bind_callee(callee, args.len(), binding, constructor);
            }
            ExprKind::IntLiteral(_) | ExprKind::FloatLiteral(_) | ExprKind::BoolLiteral(_) => {}
        }
    }

    fn resolve_variable(&mut self, name: &str, span: Span) -> Option<Arc<VariableBinding>> {
        let resolved = match self.scopes.lookup(name) {
            Some(Binding::Variable(v)) => Ok(Arc::clone(v)),
            Some(other) => Err((
                DiagnosticCode::NotAVariable,
                format!("'{}' is a {}, not a variable", name, other.describe()),
            )),
            None => Err((
                DiagnosticCode::UnresolvedIdentifier,
                format!("undeclared identifier '{}'", name),
            )),
        };

        match resolved {
            Ok(binding) => Some(binding),
            Err((code, message)) => {
                self.error(code, message, span);
                None
            }
        }
    }

    /// A callee naming a function is a call; anything else is a constructor
    fn bind_callee(
        &mut self,
        callee: &mut TypeSpecifier,
        arg_count: usize,
        binding: &mut Option<Arc<FunctionBinding>>,
        constructor: &mut Option<Type>,
    ) {
        if let (TypeSpecifierKind::Named(name), None) = (&callee.kind, &callee.array) {
            let resolved = match self.scopes.lookup(name) {
                Some(Binding::Function(f)) => Ok(Some(Arc::clone(f))),
                Some(Binding::Struct(_)) => Ok(None),
                Some(Binding::Variable(_)) => Err((
                    DiagnosticCode::NotAStruct,
                    format!("'{}' is a variable, not a function or type", name),
                )),
                None => Err((
                    DiagnosticCode::UnresolvedIdentifier,
                    format!("no function or type named '{}'", name),
                )),
            };

            match resolved {
                Ok(Some(function)) => {
                    *binding = Some(function);
                    return;
                }
                Ok(None) => {}
                Err((code, message)) => {
                    self.error(code, message, callee.span);
                    return;
                }
            }
        }

        // `T[](a, b, c)` takes its size from the argument count
        let ty = match self.resolve_specifier(callee, None) {
            Some(Type::Array { of, size: ArraySize::Unsized }) => {
                Some(Type::Array { of, size: ArraySize::Sized(arg_count as u32) })
            }
            other => other,
        };
        callee.ty = ty.clone();
        *constructor = ty;
    }
}

/// Array size carried by an initializer expression
fn initializer_array_size(init: &Expr) -> Option<u32> {
    match &init.kind {
        ExprKind::Call { constructor: Some(ty), .. } => ty.array_size(),
        ExprKind::Variable { binding: Some(binding), .. } => binding.ty.as_ref()?.array_size(),
        _ => None,
    }
}

/// Number of overloads a builtin prototype expands to, if it is generic
fn generic_count(func: &FunctionDecl) -> Option<usize> {
    let specifiers = std::iter::once(&func.return_type.specifier)
        .chain(func.params.iter().map(|p| &p.specifier));

    let counts: Vec<usize> = specifiers
        .filter_map(|spec| match &spec.kind {
            TypeSpecifierKind::Named(name) => generic_family(name).map(|m| m.len()),
            _ => None,
        })
        .collect();

    let first = *counts.first()?;
    assert!(
        counts.iter().all(|c| *c == first),
        "builtin '{}' mixes generic families of different sizes",
        func.name
    );
    Some(first)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frontend::parser::Parser;

    fn bind_source(source: &str) -> (TranslationUnit, Vec<Diagnostic>) {
        let mut unit = Parser::new(source).unwrap().parse().unwrap();
        let mut diagnostics = Vec::new();
        bind(&mut unit, &mut diagnostics);
        (unit, diagnostics)
    }

    fn codes(source: &str) -> Vec<DiagnosticCode> {
        bind_source(source).1.into_iter().map(|d| d.code).collect()
    }

    #[test]
    fn test_duplicates_and_shadowing() {
        assert_eq!(codes("float x; int x;"), vec![DiagnosticCode::DuplicateDeclaration]);
        assert!(codes("float x; void f() { int x; { bool x; } }").is_empty());
        assert_eq!(codes("struct S { float a; }; float S;"), vec![DiagnosticCode::DuplicateDeclaration]);
        assert_eq!(codes("struct S { float a; int a; };"), vec![DiagnosticCode::DuplicateDeclaration]);
    }

    #[test]
    fn test_embedded_struct_definition() {
        assert_eq!(
            codes("struct Outer { struct Inner { float f; } inner; };"),
            vec![DiagnosticCode::InvalidDeclaration]
        );
        assert_eq!(codes("struct Outer { struct { int i; } anon; };"), vec![DiagnosticCode::InvalidDeclaration]);
        assert!(codes("struct Inner { float f; }; struct Outer { Inner inner; };").is_empty());
    }

    #[test]
    fn test_unresolved_names() {
        assert_eq!(codes("void f() { y = 1; }"), vec![DiagnosticCode::UnresolvedIdentifier]);
        assert_eq!(codes("Missing m;"), vec![DiagnosticCode::UnresolvedIdentifier]);
        assert_eq!(codes("float x; x y;"), vec![DiagnosticCode::NotAStruct]);
        assert_eq!(codes("void f() {} void g() { float a = f; }"), vec![DiagnosticCode::NotAVariable]);
    }

    #[test]
    fn test_initializer_does_not_see_its_own_name() {
        assert_eq!(codes("void f() { float x = x; }"), vec![DiagnosticCode::UnresolvedIdentifier]);
        assert!(codes("float x; void f() { float x = x; }").is_empty());
    }

    #[test]
    fn test_builtin_redefinition() {
        assert_eq!(codes("float sin(float x) { return x; }"), vec![DiagnosticCode::BuiltinRedefinition]);
        assert!(codes("void f() { float sin = 1.0; }").is_empty());
    }

    #[test]
    fn test_overloads_accumulate() {
        let (unit, diagnostics) = bind_source(
            "float f(float x); float f(int x); float f(float x) { return x; } void g() { f(1.0); }",
        );
        assert!(diagnostics.is_empty());

        let DeclKind::Function(g) = &unit.declarations[3].kind else { panic!("expected function") };
        let StmtKind::Expr(call) = &g.body.as_ref().unwrap().stmts[0].kind else { panic!("expected call") };
        let ExprKind::Call { binding: Some(f), .. } = &call.kind else { panic!("expected bound call") };
        assert_eq!(f.overloads.len(), 2);
        assert!(f.overloads[0].defined);
    }

    #[test]
    fn test_function_redeclaration_errors() {
        assert_eq!(codes("float f(float x); int f(float x);"), vec![DiagnosticCode::DuplicateDeclaration]);
        assert_eq!(codes("void f() {} void f() {}"), vec![DiagnosticCode::DuplicateDeclaration]);
        assert_eq!(codes("float f; void f() {}"), vec![DiagnosticCode::DuplicateDeclaration]);
    }

    #[test]
    fn test_constructor_or_call() {
        let (unit, diagnostics) = bind_source("struct S { float f; }; S s = S(1.0); float a[] = float[](1.0, 2.0, 3.0);");
        assert!(diagnostics.is_empty());

        let DeclKind::Variables(list) = &unit.declarations[1].kind else { panic!("expected variables") };
        let init = list.declarators[0].init.as_ref().unwrap();
        assert!(matches!(&init.kind, ExprKind::Call { constructor: Some(Type::Struct(_)), binding: None, .. }));

        let DeclKind::Variables(list) = &unit.declarations[2].kind else { panic!("expected variables") };
        let binding = list.declarators[0].binding.as_ref().unwrap();
        assert_eq!(binding.ty, Some(Type::array(Type::float(), 3)));
    }

    #[test]
    fn test_array_sizes() {
        assert!(codes("const int N = 2; float a[N * 2]; float b[gl_MaxDrawBuffers];").is_empty());
        assert_eq!(codes("int n; float a[n];"), vec![DiagnosticCode::NonConstantArraySize]);
        assert_eq!(codes("float a[0];"), vec![DiagnosticCode::InvalidArraySize]);
        assert_eq!(codes("float a[1.5];"), vec![DiagnosticCode::InvalidArraySize]);
        assert_eq!(codes("float a[];"), vec![DiagnosticCode::InvalidArraySize]);
    }

    #[test]
    fn test_const_folding_on_declaration() {
        let (unit, _) = bind_source("const float x = radians(30.0);");
        let DeclKind::Variables(list) = &unit.declarations[0].kind else { panic!("expected variables") };
        let binding = list.declarators[0].binding.as_ref().unwrap();
        let constant = binding.constant.as_ref().unwrap();
        assert_eq!(constant.value.as_scalar(), Some(Scalar::Float((std::f64::consts::PI / 6.0) as f32)));
    }

    #[test]
    fn test_uniform_blocks() {
        assert!(codes("uniform Block { float a; vec2 b; }; void f() { float c = a + b.x; }").is_empty());
        assert!(codes("uniform Block { float a; } inst; void f() { float c = inst.a; }").is_empty());
        assert_eq!(codes("uniform Block { float a; }; void f() { float c = Block; }"), vec![DiagnosticCode::UnresolvedIdentifier]);
    }
}
