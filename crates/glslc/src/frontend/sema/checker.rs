//! Checker - type checking and well-formedness rules
//!
//! Runs after the binder. Every expression's type is computed once and
//! cached in its `ty` slot. A subtree that fails to type leaves `None`
//! behind; its ancestors see an unknown type and stay silent, so each
//! problem is reported exactly once.

use std::sync::Arc;

use super::operators::{binary_rule, binary_signatures, has_repeated_component, is_swizzle_like, swizzle_indices, unary_rule};
use super::scope::FunctionBinding;
use crate::common::{Diagnostic, DiagnosticCode, Span};
use crate::eval::{eval, parse_int_literal};
use crate::frontend::Stage;
use crate::frontend::ast::*;
use crate::types::{ArraySize, BasicType, ScalarKind, Type};

/// Check a bound translation unit for `stage`
pub fn check(unit: &mut TranslationUnit, stage: Stage, diagnostics: &mut Vec<Diagnostic>) {
    let mut checker = Checker::new(stage);
    checker.check_unit(unit);
    diagnostics.append(&mut checker.diagnostics);
}

/// Per-call checking context
pub struct Checker {
    stage: Stage,
    diagnostics: Vec<Diagnostic>,
    /// Declared return type of the function being checked
    current_function_return_type: Option<Type>,
    /// Nesting depth; 0 is global scope
    depth: usize,
    /// Selector types of the enclosing switch statements
    switch_selectors: Vec<Option<Type>>,
}

impl Checker {
    pub fn new(stage: Stage) -> Self {
        Self {
            stage,
            diagnostics: Vec::new(),
            current_function_return_type: None,
            depth: 0,
            switch_selectors: Vec::new(),
        }
    }

    pub fn check_unit(&mut self, unit: &mut TranslationUnit) {
        for decl in &mut unit.declarations {
            self.check_declaration(decl);
        }
    }

    pub fn into_diagnostics(self) -> Vec<Diagnostic> {
        self.diagnostics
    }

    fn error(&mut self, code: DiagnosticCode, message: impl Into<String>, span: Span) {
        self.diagnostics.push(Diagnostic::new(code, message, span));
    }

    // =========================================================================
    // Declarations
    // =========================================================================

    fn check_declaration(&mut self, decl: &mut Declaration) {
        match &mut decl.kind {
            DeclKind::Variables(list) => self.check_variables(list, decl.span),
            DeclKind::Function(func) => self.check_function(func),
            DeclKind::Block(block) => self.check_interface_block(block),
            DeclKind::Precision { specifier, .. } => {
                self.check_specifier(specifier);
                let valid = match &specifier.ty {
                    Some(Type::Basic(BasicType::Scalar(ScalarKind::Int | ScalarKind::Float))) => true,
                    Some(Type::Basic(BasicType::Sampler(_))) => true,
                    Some(_) => false,
                    None => true,
                };
                if !valid || specifier.array.is_some() {
                    self.error(
                        DiagnosticCode::QualifierMisuse,
                        "default precision can only be set for int, float and sampler types",
                        specifier.span,
                    );
                }
            }
            DeclKind::Invariant(targets) => {
                for target in targets.iter() {
                    if self.depth > 0 {
                        self.error(
                            DiagnosticCode::QualifierMisuse,
                            "invariant redeclarations are only allowed at global scope",
                            target.span,
                        );
                        continue;
                    }
                    let Some(binding) = &target.binding else { continue };
                    let storage = binding.qualifiers.storage;
                    if !self.may_be_invariant(storage) {
                        self.error(
                            DiagnosticCode::QualifierMisuse,
                            format!("'{}' is not a shader output and cannot be invariant", target.name),
                            target.span,
                        );
                    }
                }
            }
        }
    }

    /// Outputs can be invariant; fragment inputs can match an invariant output
    fn may_be_invariant(&self, storage: Option<StorageQualifier>) -> bool {
        match storage {
            Some(s) if s.is_output() => true,
            Some(s) if s.is_input() => self.stage != Stage::Vertex,
            _ => false,
        }
    }

    /// Walk array sizes and struct members of a specifier
    fn check_specifier(&mut self, spec: &mut TypeSpecifier) {
        if let Some(array) = &mut spec.array {
            self.check_array_size(array);
        }
        if let TypeSpecifierKind::Struct(s) = &mut spec.kind {
            for member in &mut s.members {
                self.check_member(member, "struct");
            }
        }
    }

    fn check_array_size(&mut self, array: &mut ArraySpecifier) {
        if let Some(size) = &mut array.size {
            self.check_expr(size);
        }
    }

    fn check_member(&mut self, member: &mut StructMember, container: &str) {
        self.check_specifier(&mut member.specifier);
        for declarator in &mut member.declarators {
            if let Some(array) = &mut declarator.array {
                self.check_array_size(array);
            }
        }
        if member.specifier.ty.as_ref().is_some_and(Type::is_void) {
            self.error(
                DiagnosticCode::InvalidDeclaration,
                format!("{} members cannot be void", container),
                member.span,
            );
        }
    }

    /// Placement rules shared by every qualified declaration
    fn check_qualifiers(&mut self, qualifiers: &TypeQualifiers, span: Span) {
        let storage = qualifiers.storage;

        if storage == Some(StorageQualifier::InOut) {
            self.error(
                DiagnosticCode::QualifierMisuse,
                "'inout' is only allowed on function parameters",
                span,
            );
        }

        let interface = matches!(storage, Some(s) if s.is_input() || s.is_output() || s == StorageQualifier::Uniform);
        if let Some(storage) = storage.filter(|_| interface && self.depth > 0) {
            self.error(
                DiagnosticCode::QualifierMisuse,
                format!("'{}' is only allowed at global scope", storage.as_str()),
                span,
            );
        }

        if qualifiers.interpolation.is_some() && !matches!(storage, Some(s) if s.is_input() || s.is_output()) {
            self.error(
                DiagnosticCode::QualifierMisuse,
                "interpolation qualifiers require 'in' or 'out'",
                span,
            );
        }

        if !qualifiers.layout.is_empty() && !interface {
            self.error(
                DiagnosticCode::QualifierMisuse,
                "layout qualifiers are only allowed on in, out and uniform declarations",
                span,
            );
        }

        if qualifiers.invariant && (self.depth > 0 || !self.may_be_invariant(storage)) {
            self.error(
                DiagnosticCode::QualifierMisuse,
                "'invariant' is only allowed on global shader outputs",
                span,
            );
        }

        match (self.stage, storage) {
            (Stage::Vertex, Some(StorageQualifier::CentroidIn)) => self.error(
                DiagnosticCode::StageRestriction,
                "'centroid in' is not allowed in vertex shaders",
                span,
            ),
            (Stage::Fragment, Some(StorageQualifier::CentroidOut)) => self.error(
                DiagnosticCode::StageRestriction,
                "'centroid out' is not allowed in fragment shaders",
                span,
            ),
            _ => {}
        }
    }

    /// Types allowed on the shader interface of the current stage
    fn check_interface_type(&mut self, storage: Option<StorageQualifier>, ty: &Type, name: &str, span: Span) {
        let base = ty.base();
        match (self.stage, storage) {
            (Stage::Vertex, Some(s)) if s.is_input() => {
                if base.component_type() == Some(ScalarKind::Bool) || ty.is_array() || base.is_struct() {
                    self.error(
                        DiagnosticCode::StageRestriction,
                        format!("vertex input '{}' cannot be a bool, array or struct", name),
                        span,
                    );
                }
            }
            (Stage::Fragment, Some(s)) if s.is_output() => {
                let is_bool = base.component_type() == Some(ScalarKind::Bool);
                if is_bool || base.is_matrix() || base.is_struct() || ty.is_opaque() {
                    self.error(
                        DiagnosticCode::StageRestriction,
                        format!("fragment output '{}' cannot be a bool, matrix, struct or sampler", name),
                        span,
                    );
                }
            }
            _ => {}
        }
    }

    fn check_variables(&mut self, list: &mut VariableList, span: Span) {
        self.check_specifier(&mut list.ty.specifier);
        let qualifiers = &list.ty.qualifiers;
        self.check_qualifiers(qualifiers, qualifiers.span.merge(list.ty.specifier.span));
        let storage = qualifiers.storage;

        if list.declarators.is_empty() && !matches!(list.ty.specifier.kind, TypeSpecifierKind::Struct(_)) {
            self.error(DiagnosticCode::InvalidDeclaration, "declaration declares nothing", span);
        }

        for declarator in &mut list.declarators {
            if let Some(array) = &mut declarator.array {
                self.check_array_size(array);
            }
            let init_ty = declarator.init.as_mut().and_then(|init| self.check_expr(init));
            let declared = declarator.binding.as_ref().and_then(|b| b.ty.clone());
            let name = declarator.name.as_str();

            if let Some(ty) = &declared {
                if ty.base().is_void() {
                    self.error(
                        DiagnosticCode::InvalidDeclaration,
                        format!("variable '{}' cannot be void", name),
                        declarator.span,
                    );
                    continue;
                }
                if ty.is_opaque() && storage != Some(StorageQualifier::Uniform) {
                    self.error(
                        DiagnosticCode::QualifierMisuse,
                        format!("sampler variable '{}' must be declared uniform", name),
                        declarator.span,
                    );
                }
                self.check_interface_type(storage, ty, name, declarator.span);
            }

            match &declarator.init {
                Some(init) => {
                    if let Some(storage) = storage.filter(|s| *s != StorageQualifier::Const) {
                        self.error(
                            DiagnosticCode::QualifierMisuse,
                            format!("'{}' variables cannot have initializers", storage.as_str()),
                            init.span,
                        );
                    }
                    if let (Some(declared), Some(init_ty)) = (&declared, &init_ty) {
                        if declared != init_ty {
                            self.error(
                                DiagnosticCode::TypeMismatch,
                                format!("cannot initialize '{}' of type '{}' with '{}'", name, declared, init_ty),
                                init.span,
                            );
                        } else if storage == Some(StorageQualifier::Const) && eval(init).is_none() {
                            self.error(
                                DiagnosticCode::NotConstant,
                                format!("initializer of const '{}' is not a constant expression", name),
                                init.span,
                            );
                        }
                    }
                }
                None if storage == Some(StorageQualifier::Const) => self.error(
                    DiagnosticCode::NotConstant,
                    format!("const variable '{}' must be initialized", name),
                    declarator.span,
                ),
                None => {}
            }
        }
    }

    fn check_function(&mut self, func: &mut FunctionDecl) {
        self.check_specifier(&mut func.return_type.specifier);
        if func.return_type.qualifiers.storage.is_some() {
            self.error(
                DiagnosticCode::QualifierMisuse,
                "function return types cannot have storage qualifiers",
                func.return_type.qualifiers.span,
            );
        }

        for param in &mut func.params {
            self.check_specifier(&mut param.specifier);
            if let Some(array) = &mut param.array {
                self.check_array_size(array);
            }

            let storage = param.qualifiers.storage;
            if matches!(storage, Some(StorageQualifier::Uniform | StorageQualifier::CentroidIn | StorageQualifier::CentroidOut))
                || param.qualifiers.interpolation.is_some()
                || param.qualifiers.invariant
                || !param.qualifiers.layout.is_empty()
            {
                self.error(
                    DiagnosticCode::QualifierMisuse,
                    "parameters only accept const, in, out, inout and precision qualifiers",
                    param.span,
                );
            }

            let ty = param.specifier.ty.as_ref();
            if ty.is_some_and(|t| t.base().is_void()) {
                self.error(DiagnosticCode::InvalidDeclaration, "parameters cannot be void", param.span);
            } else if ty.is_some_and(Type::is_opaque) && matches!(storage, Some(StorageQualifier::Out | StorageQualifier::InOut)) {
                self.error(
                    DiagnosticCode::QualifierMisuse,
                    "sampler parameters cannot be out or inout",
                    param.span,
                );
            }
        }

        if func.name == "main" && (!func.params.is_empty() || !func.return_type.specifier.ty.as_ref().is_some_and(Type::is_void)) {
            self.error(
                DiagnosticCode::InvalidDeclaration,
                "'main' must be declared as 'void main()'",
                func.span,
            );
        }

        if let Some(body) = &mut func.body {
            self.current_function_return_type = func.return_type.specifier.ty.clone();
            self.depth += 1;
            for stmt in &mut body.stmts {
                self.check_stmt(stmt);
            }
            self.depth -= 1;
            self.current_function_return_type = None;
        }
    }

    fn check_interface_block(&mut self, block: &mut InterfaceBlock) {
        let qualifiers = &block.qualifiers;
        if qualifiers.storage != Some(StorageQualifier::Uniform) {
            self.error(
                DiagnosticCode::QualifierMisuse,
                format!("interface block '{}' must be a uniform block", block.name),
                block.span,
            );
        } else {
            self.check_qualifiers(qualifiers, qualifiers.span);
        }

        for member in &mut block.members {
            self.check_member(member, "uniform block");

            let q = &member.qualifiers;
            let storage_ok = matches!(q.storage, None | Some(StorageQualifier::Uniform));
            if !storage_ok || q.interpolation.is_some() || q.invariant {
                self.error(
                    DiagnosticCode::QualifierMisuse,
                    "uniform block members only accept the uniform and precision qualifiers",
                    member.span,
                );
            }

            if let Some(ty) = &member.specifier.ty {
                if ty.is_opaque() || ty.base().is_struct() {
                    self.error(
                        DiagnosticCode::InvalidDeclaration,
                        format!("uniform block members cannot have type '{}'", ty),
                        member.span,
                    );
                }
            }
        }

        if let Some(instance) = &mut block.instance {
            if let Some(array) = &mut instance.array {
                self.check_array_size(array);
            }
        }
    }

    // =========================================================================
    // Statements
    // =========================================================================

    fn check_block(&mut self, block: &mut Block) {
        self.depth += 1;
        for stmt in &mut block.stmts {
            self.check_stmt(stmt);
        }
        self.depth -= 1;
    }

    fn check_condition(&mut self, condition: &mut Expr) {
        if let Some(ty) = self.check_expr(condition) {
            if !ty.is_bool() {
                self.error(
                    DiagnosticCode::NonBoolCondition,
                    format!("condition must be a bool, found '{}'", ty),
                    condition.span,
                );
            }
        }
    }

    fn check_stmt(&mut self, stmt: &mut Stmt) {
        match &mut stmt.kind {
            StmtKind::Expr(expr) => {
                self.check_expr(expr);
            }
            StmtKind::Empty | StmtKind::Continue | StmtKind::Break | StmtKind::Default => {}
            StmtKind::Block(block) => self.check_block(block),
            StmtKind::Declaration(decl) => self.check_declaration(decl),

            StmtKind::If { condition, then_branch, else_branch } => {
                self.check_condition(condition);
                self.check_stmt(then_branch);
                if let Some(else_branch) = else_branch {
                    self.check_stmt(else_branch);
                }
            }

            StmtKind::Switch { selector, body } => {
                let ty = self.check_expr(selector);
                if let Some(ty) = &ty {
                    if !ty.scalar_kind().is_some_and(|k| k.is_integer()) {
                        self.error(
                            DiagnosticCode::InvalidSwitchSelector,
                            format!("switch selector must be an int or uint, found '{}'", ty),
                            selector.span,
                        );
                    }
                }
                self.switch_selectors.push(ty);
                self.check_block(body);
                self.switch_selectors.pop();
            }

            StmtKind::Case(label) => {
                let ty = self.check_expr(label);
                let Some(selector) = self.switch_selectors.last().cloned() else {
                    self.error(DiagnosticCode::InvalidDeclaration, "case label outside of a switch", stmt.span);
                    return;
                };
                let Some(ty) = ty else { return };
                if eval(label).is_none() {
                    self.error(
                        DiagnosticCode::NotConstant,
                        "case label must be a constant expression",
                        label.span,
                    );
                } else if selector.is_some_and(|s| s != ty) {
                    self.error(
                        DiagnosticCode::TypeMismatch,
                        format!("case label of type '{}' does not match the switch selector", ty),
                        label.span,
                    );
                }
            }

            StmtKind::While { condition, body } => {
                self.check_condition(condition);
                self.check_stmt(body);
            }

            StmtKind::DoWhile { body, condition } => {
                self.check_stmt(body);
                self.check_condition(condition);
            }

            StmtKind::For { init, condition, update, body } => {
                self.depth += 1;
                if let Some(init) = init {
                    self.check_stmt(init);
                }
                if let Some(condition) = condition {
                    self.check_condition(condition);
                }
                if let Some(update) = update {
                    self.check_expr(update);
                }
                self.check_stmt(body);
                self.depth -= 1;
            }

            StmtKind::Return(value) => self.check_return(value.as_mut(), stmt.span),

            StmtKind::Discard => {
                if self.stage == Stage::Vertex {
                    self.error(
                        DiagnosticCode::StageRestriction,
                        "'discard' is only allowed in fragment shaders",
                        stmt.span,
                    );
                }
            }
        }
    }

    fn check_return(&mut self, value: Option<&mut Expr>, span: Span) {
        let actual = value.map(|v| (self.check_expr(v), v.span));
        let Some(expected) = self.current_function_return_type.clone() else {
            return;
        };

        match actual {
            Some((_, value_span)) if expected.is_void() => self.error(
                DiagnosticCode::ReturnMismatch,
                "a void function cannot return a value",
                value_span,
            ),
            None if !expected.is_void() => self.error(
                DiagnosticCode::ReturnMismatch,
                format!("function must return a value of type '{}'", expected),
                span,
            ),
            Some((Some(actual), value_span)) if actual != expected => self.error(
                DiagnosticCode::ReturnMismatch,
                format!("returning '{}' from a function declared to return '{}'", actual, expected),
                value_span,
            ),
            _ => {}
        }
    }

    // =========================================================================
    // Expressions
    // =========================================================================

    /// Type an expression and cache the result in its `ty` slot
    fn check_expr(&mut self, expr: &mut Expr) -> Option<Type> {
        let ty = self.expr_type(&mut expr.kind, expr.span);
        expr.ty = ty.clone();
        ty
    }

    fn expr_type(&mut self, kind: &mut ExprKind, span: Span) -> Option<Type> {
        match kind {
            ExprKind::IntLiteral(text) => match parse_int_literal(text) {
                Ok(value) => Some(Type::scalar(value.kind())),
                Err(error) => {
                    self.error(error.code(), error.to_string(), span);
                    None
                }
            },
            ExprKind::FloatLiteral(_) => Some(Type::float()),
            ExprKind::BoolLiteral(_) => Some(Type::boolean()),

            ExprKind::Variable { binding, .. } => binding.as_ref()?.ty.clone(),

            ExprKind::Unary { op, operand } => {
                let ty = self.check_expr(operand)?;
                match ty.basic().and_then(|b| unary_rule(*op, b)) {
                    Some(result) => Some(Type::Basic(result)),
                    None => {
                        self.error(
                            DiagnosticCode::OperatorMismatch,
                            format!("unary '{}' cannot be applied to '{}'", op.as_str(), ty),
                            span,
                        );
                        None
                    }
                }
            }

            ExprKind::Update { op, operand, .. } => {
                let ty = self.check_expr(operand);
                self.require_lvalue(operand, op.as_str());
                let ty = ty?;
                if ty.component_type().is_some_and(|k| k.is_numeric()) {
                    Some(ty)
                } else {
                    self.error(
                        DiagnosticCode::OperatorMismatch,
                        format!("'{}' cannot be applied to '{}'", op.as_str(), ty),
                        span,
                    );
                    None
                }
            }

            ExprKind::Binary { op, left, right } => {
                let lhs = self.check_expr(left);
                let rhs = self.check_expr(right);
                self.binary_type(*op, &lhs?, &rhs?, span)
            }

            ExprKind::Assign { op, target, value } => {
                let target_ty = self.check_expr(target);
                let value_ty = self.check_expr(value);
                self.require_lvalue(target, op.as_str());
                let (target_ty, value_ty) = (target_ty?, value_ty?);

                match op.to_binary_op() {
                    None => {
                        if target_ty != value_ty {
                            self.error(
                                DiagnosticCode::TypeMismatch,
                                format!("cannot assign '{}' to '{}'", value_ty, target_ty),
                                span,
                            );
                        }
                    }
                    Some(binary) => {
                        let result = self.binary_type(binary, &target_ty, &value_ty, span)?;
                        if result != target_ty {
                            self.error(
                                DiagnosticCode::OperatorMismatch,
                                format!(
                                    "'{}' of '{}' and '{}' yields '{}', which cannot be stored back",
                                    op.as_str(),
                                    target_ty,
                                    value_ty,
                                    result
                                ),
                                span,
                            );
                        }
                    }
                }
                Some(target_ty)
            }

            ExprKind::Ternary { condition, then_expr, else_expr } => {
                self.check_condition(condition);
                let then_ty = self.check_expr(then_expr);
                let else_ty = self.check_expr(else_expr);
                let (then_ty, else_ty) = (then_ty?, else_ty?);
                if then_ty != else_ty {
                    self.error(
                        DiagnosticCode::TypeMismatch,
                        format!("ternary branches have different types: '{}' and '{}'", then_ty, else_ty),
                        span,
                    );
                    return None;
                }
                Some(then_ty)
            }

            ExprKind::Comma { left, right } => {
                self.check_expr(left);
                self.check_expr(right)
            }

            ExprKind::Call { args, binding, constructor, .. } => {
                let arg_types: Vec<Option<Type>> = args.iter_mut().map(|a| self.check_expr(a)).collect();
                if let Some(ty) = constructor.clone() {
                    return self.check_constructor(ty, &arg_types, span);
                }
                let function = Arc::clone(binding.as_ref()?);
                self.check_call(&function, args, &arg_types, span)
            }

            ExprKind::Field { object, field } => {
                let ty = self.check_expr(object)?;
                self.field_type(&ty, field, span)
            }

            ExprKind::Index { array, index } => {
                let array_ty = self.check_expr(array);
                let index_ty = self.check_expr(index);
                self.index_type(array, array_ty, index, index_ty, span)
            }

            ExprKind::Length(operand) => {
                let ty = self.check_expr(operand)?;
                if ty.length().is_some() {
                    Some(Type::int())
                } else {
                    self.error(
                        DiagnosticCode::NoSuchField,
                        format!("length() requires a sized array, vector or matrix, found '{}'", ty),
                        span,
                    );
                    None
                }
            }
        }
    }

    fn binary_type(&mut self, op: BinaryOp, lhs: &Type, rhs: &Type, span: Span) -> Option<Type> {
        if op.is_equality() && lhs == rhs && (lhs.is_array() || lhs.is_struct()) && !lhs.is_opaque() {
            return Some(Type::boolean());
        }

        if let (Some(l), Some(r)) = (lhs.basic(), rhs.basic()) {
            if let Some(result) = binary_rule(op, l, r) {
                return Some(Type::Basic(result));
            }
        }

        let signatures: Vec<String> = binary_signatures(op)
            .into_iter()
            .map(|(l, r, result)| format!("{} {} {} -> {}", l, op.as_str(), r, result))
            .collect();
        self.error(
            DiagnosticCode::OperatorMismatch,
            format!(
                "no operator '{}' for '{}' and '{}'; valid signatures: {}",
                op.as_str(),
                lhs,
                rhs,
                signatures.join(", ")
            ),
            span,
        );
        None
    }

    /// Report `expr` if it cannot be written to
    fn require_lvalue(&mut self, expr: &Expr, operation: &str) {
        if let Some(reason) = lvalue_error(expr) {
            self.error(
                DiagnosticCode::NotAnLvalue,
                format!("operand of '{}' is not assignable: {}", operation, reason),
                expr.span,
            );
        }
    }

    fn check_call(
        &mut self,
        function: &FunctionBinding,
        args: &[Expr],
        arg_types: &[Option<Type>],
        span: Span,
    ) -> Option<Type> {
        if arg_types.iter().any(Option::is_none) {
            return None;
        }
        let refs: Vec<Option<&Type>> = arg_types.iter().map(Option::as_ref).collect();

        let Some(overload) = function.find_overload(&refs) else {
            let given: Vec<String> = arg_types.iter().flatten().map(ToString::to_string).collect();
            let candidates: Vec<String> = function.overloads.iter().map(|o| o.signature(&function.name)).collect();
            self.error(
                DiagnosticCode::NoMatchingOverload,
                format!(
                    "no overload of '{}' accepts ({}); candidates: {}",
                    function.name,
                    given.join(", "),
                    candidates.join(", ")
                ),
                span,
            );
            return None;
        };

        for (param, arg) in overload.params.iter().zip(args) {
            if param.qualifier.is_output() {
                if let Some(reason) = lvalue_error(arg) {
                    self.error(
                        DiagnosticCode::NotAnLvalue,
                        format!("argument to an out parameter of '{}' is not assignable: {}", function.name, reason),
                        arg.span,
                    );
                }
            }
        }

        if function.builtin && self.stage == Stage::Vertex && matches!(function.name.as_str(), "dFdx" | "dFdy" | "fwidth") {
            self.error(
                DiagnosticCode::StageRestriction,
                format!("'{}' is only available in fragment shaders", function.name),
                span,
            );
        }

        overload.result.clone()
    }

    fn check_constructor(&mut self, ty: Type, args: &[Option<Type>], span: Span) -> Option<Type> {
        // Unknown arguments were reported already; the result type is still known
        if args.iter().any(Option::is_none) {
            return Some(ty);
        }
        let args: Vec<&Type> = args.iter().flatten().collect();

        if let Err(message) = constructor_error(&ty, &args) {
            self.error(DiagnosticCode::InvalidConstructor, message, span);
        }
        Some(ty)
    }

    fn field_type(&mut self, ty: &Type, field: &str, span: Span) -> Option<Type> {
        let result = match ty {
            Type::Basic(BasicType::Vector(kind, n)) => swizzle_indices(field, *n)
                .map(|indices| Type::vector(*kind, indices.len() as u8))
                .map_err(|message| (DiagnosticCode::InvalidSwizzle, message)),
            Type::Struct(s) => s.field(field).map(|f| f.ty.clone()).ok_or_else(|| {
                (DiagnosticCode::NoSuchField, format!("'{}' has no field '{}'", ty, field))
            }),
            Type::Basic(BasicType::Scalar(_)) if is_swizzle_like(field) => Err((
                DiagnosticCode::InvalidSwizzle,
                format!("scalar '{}' cannot be swizzled", ty),
            )),
            _ => Err((DiagnosticCode::NoSuchField, format!("'{}' has no fields", ty))),
        };

        match result {
            Ok(ty) => Some(ty),
            Err((code, message)) => {
                self.error(code, message, span);
                None
            }
        }
    }

    fn index_type(
        &mut self,
        array: &Expr,
        array_ty: Option<Type>,
        index: &Expr,
        index_ty: Option<Type>,
        span: Span,
    ) -> Option<Type> {
        if let Some(index_ty) = &index_ty {
            if !index_ty.scalar_kind().is_some_and(|k| k.is_integer()) {
                self.error(
                    DiagnosticCode::InvalidIndex,
                    format!("index must be an int or uint, found '{}'", index_ty),
                    index.span,
                );
            }
        }
        let array_ty = array_ty?;

        let (element, bound) = match &array_ty {
            Type::Array { of, size } => {
                let bound = match size {
                    ArraySize::Sized(n) => Some(i64::from(*n)),
                    ArraySize::Unsized => None,
                };
                ((**of).clone(), bound)
            }
            Type::Basic(BasicType::Vector(kind, n)) => (Type::scalar(*kind), Some(i64::from(*n))),
            Type::Basic(BasicType::Matrix { cols, rows }) => {
                (Type::vector(ScalarKind::Float, *rows), Some(i64::from(*cols)))
            }
            _ => {
                self.error(
                    DiagnosticCode::InvalidIndex,
                    format!("'{}' cannot be indexed", array_ty),
                    span,
                );
                return None;
            }
        };

        let constant = index_ty
            .filter(|t| t.scalar_kind().is_some_and(|k| k.is_integer()))
            .and_then(|_| eval(index))
            .and_then(|c| c.value.as_scalar())
            .and_then(|s| s.as_index());

        match constant {
            Some(value) => {
                if value < 0 || bound.is_some_and(|b| value >= b) {
                    self.error(
                        DiagnosticCode::IndexOutOfRange,
                        format!("index {} is out of range for '{}'", value, array_ty),
                        index.span,
                    );
                }
            }
            None if array_ty.is_array() => {
                let fragment_output = self.stage == Stage::Fragment
                    && array.kind.variable_binding().is_some_and(|b| b.is_output());
                if fragment_output {
                    self.error(
                        DiagnosticCode::NotConstant,
                        "fragment output arrays must be indexed with a constant expression",
                        index.span,
                    );
                } else if array_ty.is_opaque() {
                    self.error(
                        DiagnosticCode::NotConstant,
                        "sampler arrays must be indexed with a constant expression",
                        index.span,
                    );
                }
            }
            None => {}
        }

        Some(element)
    }
}

/// Why `expr` cannot be assigned to, or `None` if it can
///
/// Unresolved variables are not reported again.
fn lvalue_error(expr: &Expr) -> Option<String> {
    match &expr.kind {
        ExprKind::Variable { binding: None, .. } => None,
        ExprKind::Variable { name, binding: Some(binding) } => {
            if binding.is_writable() {
                return None;
            }
            let what = match binding.qualifiers.storage {
                Some(StorageQualifier::Uniform) => "a uniform",
                Some(s) if s.is_input() => "a shader input",
                _ => "const",
            };
            Some(format!("'{}' is {}", name, what))
        }
        ExprKind::Field { object, field } => {
            if object.ty.as_ref().is_some_and(Type::is_vector) {
                let size = object.ty.as_ref().map_or(0, Type::vector_size);
                if swizzle_indices(field, size).is_ok_and(|indices| has_repeated_component(&indices)) {
                    return Some(format!("swizzle '{}' repeats a component", field));
                }
            }
            lvalue_error(object)
        }
        ExprKind::Index { array, .. } => lvalue_error(array),
        _ => Some("expression is not a variable, field or element".to_string()),
    }
}

/// Argument rules for constructing `ty` from `args`
fn constructor_error(ty: &Type, args: &[&Type]) -> Result<(), String> {
    match ty {
        Type::Basic(BasicType::Scalar(_)) => match args {
            [arg] if arg.component_count() > 0 => Ok(()),
            [arg] => Err(format!("cannot convert '{}' to '{}'", arg, ty)),
            _ => Err(format!("'{}' constructor takes exactly one argument, got {}", ty, args.len())),
        },

        Type::Basic(basic @ (BasicType::Vector(..) | BasicType::Matrix { .. })) => {
            if args.is_empty() {
                return Err(format!("'{}' constructor needs arguments", ty));
            }
            if let Some(bad) = args.iter().find(|a| a.component_count() == 0) {
                return Err(format!("'{}' cannot be used to construct '{}'", bad, ty));
            }

            if ty.is_matrix() && args.iter().any(|a| a.is_matrix()) {
                if args.len() > 1 {
                    return Err("a matrix argument must be the only argument of a matrix constructor".to_string());
                }
                return Ok(());
            }

            let needed = basic.component_count();
            let supplied: usize = args.iter().map(|a| a.component_count()).sum();
            if supplied == 1 {
                return Ok(());
            }
            if supplied < needed {
                return Err(format!(
                    "not enough components to construct '{}': need {}, got {}",
                    ty, needed, supplied
                ));
            }
            let before_last: usize = args[..args.len() - 1].iter().map(|a| a.component_count()).sum();
            if before_last >= needed {
                return Err(format!("too many arguments to construct '{}'", ty));
            }
            Ok(())
        }

        Type::Struct(s) => {
            if args.len() != s.fields.len() {
                return Err(format!(
                    "'{}' constructor takes {} arguments, got {}",
                    ty,
                    s.fields.len(),
                    args.len()
                ));
            }
            for (field, arg) in s.fields.iter().zip(args) {
                if field.ty != **arg {
                    return Err(format!(
                        "field '{}' of '{}' expects '{}', got '{}'",
                        field.name, ty, field.ty, arg
                    ));
                }
            }
            Ok(())
        }

        Type::Array { of, size: ArraySize::Sized(n) } => {
            if args.len() != *n as usize {
                return Err(format!("'{}' constructor takes {} arguments, got {}", ty, n, args.len()));
            }
            match args.iter().find(|a| ***a != **of) {
                Some(bad) => Err(format!("'{}' elements must be '{}', got '{}'", ty, of, bad)),
                None => Ok(()),
            }
        }

        _ => Err(format!("cannot construct a value of type '{}'", ty)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frontend::parser::Parser;
    use crate::frontend::sema::bind;
    use pretty_assertions::assert_eq;

    fn diagnose(source: &str, stage: Stage) -> Vec<DiagnosticCode> {
        let mut unit = Parser::new(source).unwrap().parse().unwrap();
        let mut diagnostics = Vec::new();
        bind(&mut unit, &mut diagnostics);
        check(&mut unit, stage, &mut diagnostics);
        diagnostics.into_iter().map(|d| d.code).collect()
    }

    fn codes(source: &str) -> Vec<DiagnosticCode> {
        diagnose(source, Stage::None)
    }

    fn body(statements: &str) -> Vec<DiagnosticCode> {
        codes(&format!("void f() {{ {} }}", statements))
    }

    #[test]
    fn test_no_coercion() {
        assert_eq!(body("1 + 1.0;"), vec![DiagnosticCode::OperatorMismatch]);
        assert_eq!(body("float x = 1;"), vec![DiagnosticCode::TypeMismatch]);
        assert!(body("vec3 v = vec3(1.0) * 2.0; mat2 m = mat2(1.0) * mat2(2.0);").is_empty());
        assert!(body("int a = 7 % 3; uvec2 b = uvec2(1u) << 2;").is_empty());
        assert_eq!(body("bool b = 1.0 < 2;"), vec![DiagnosticCode::OperatorMismatch]);
    }

    #[test]
    fn test_operator_mismatch_lists_signatures() {
        let mut unit = Parser::new("void f() { true && 1; }").unwrap().parse().unwrap();
        let mut diagnostics = Vec::new();
        bind(&mut unit, &mut diagnostics);
        check(&mut unit, Stage::None, &mut diagnostics);
        assert_eq!(diagnostics.len(), 1);
        assert!(diagnostics[0].message.contains("bool && bool -> bool"));
    }

    #[test]
    fn test_conditions() {
        assert_eq!(body("if (1) ;"), vec![DiagnosticCode::NonBoolCondition]);
        assert_eq!(body("while (1.0) {}"), vec![DiagnosticCode::NonBoolCondition]);
        assert_eq!(body("for (int i = 0; i; i++) {}"), vec![DiagnosticCode::NonBoolCondition]);
        assert_eq!(body("float x = 1 ? 1.0 : 2.0;"), vec![DiagnosticCode::NonBoolCondition]);
        assert!(body("for (int i = 0; i < 4; i++) { if (i == 2) break; }").is_empty());
    }

    #[test]
    fn test_lvalues() {
        assert_eq!(body("1++;"), vec![DiagnosticCode::NotAnLvalue]);
        assert_eq!(body("const float c = 1.0; c = 2.0;"), vec![DiagnosticCode::NotAnLvalue]);
        assert_eq!(body("vec2 v; v.xx = vec2(1.0);"), vec![DiagnosticCode::NotAnLvalue]);
        assert!(body("vec4 v; v.zx = vec2(1.0); v[1] = 2.0; v.y += 1.0;").is_empty());
        assert_eq!(codes("uniform float u; void f() { u = 1.0; }"), vec![DiagnosticCode::NotAnLvalue]);
        assert!(codes("void f(in float x) { x = 1.0; }").is_empty());
        assert_eq!(codes("void f(const float x) { x = 1.0; }"), vec![DiagnosticCode::NotAnLvalue]);
    }

    #[test]
    fn test_swizzles() {
        assert_eq!(body("vec3 a; a.xr;"), vec![DiagnosticCode::InvalidSwizzle]);
        assert_eq!(body("vec2 a; a.z;"), vec![DiagnosticCode::InvalidSwizzle]);
        assert_eq!(body("float a; a.x;"), vec![DiagnosticCode::InvalidSwizzle]);
        assert!(body("vec4 a; vec3 b = a.rgb; float c = a.q;").is_empty());
    }

    #[test]
    fn test_fields_and_indices() {
        let source = "struct S { float f; int g[2]; }; void h() { S s; float a = s.f; int b = s.g[1]; s.missing; }";
        assert_eq!(codes(source), vec![DiagnosticCode::NoSuchField]);
        assert_eq!(body("float a[3]; a[3];"), vec![DiagnosticCode::IndexOutOfRange]);
        assert_eq!(body("vec2 v; v[-1];"), vec![DiagnosticCode::IndexOutOfRange]);
        assert_eq!(body("float a[3]; a[1.0];"), vec![DiagnosticCode::InvalidIndex]);
        assert_eq!(body("float a; a[0];"), vec![DiagnosticCode::InvalidIndex]);
        assert!(body("mat3 m; vec3 c = m[2]; float e = m[1][2]; int n = 1; float x = c[n];").is_empty());
        assert!(body("float a[4]; int n = a.length();").is_empty());
    }

    #[test]
    fn test_length_method() {
        assert!(body("vec3 v; mat2x3 m; int n = v.length() + m.length();").is_empty());
        assert_eq!(body("float f; f.length();"), vec![DiagnosticCode::NoSuchField]);
        assert_eq!(body("float n = vec2(1.0).length();"), vec![DiagnosticCode::TypeMismatch]);
    }

    #[test]
    fn test_fragment_output_index() {
        let source = "out vec4 colors[2]; void main() { int i = 1; colors[i] = vec4(1.0); colors[1] = vec4(0.0); }";
        assert_eq!(diagnose(source, Stage::Fragment), vec![DiagnosticCode::NotConstant]);
        assert!(diagnose(source, Stage::Vertex).is_empty());
    }

    #[test]
    fn test_constructors() {
        assert!(body("vec4 a = vec4(vec2(1.0), bvec2(false)); mat2 b = mat2(2); mat3 c = mat3(mat2(1.0));").is_empty());
        assert!(body("float f = float(vec3(1.0)); vec3 v = vec3(vec4(1.0));").is_empty());
        assert_eq!(body("vec3 v = vec3(1.0, 2.0);"), vec![DiagnosticCode::InvalidConstructor]);
        assert_eq!(body("vec2 v = vec2(1.0, 2.0, 3.0);"), vec![DiagnosticCode::InvalidConstructor]);
        assert_eq!(body("mat2 m = mat2(mat2(1.0), 1.0);"), vec![DiagnosticCode::InvalidConstructor]);
        assert_eq!(body("float f = float(1.0, 2.0);"), vec![DiagnosticCode::InvalidConstructor]);
        assert_eq!(
            codes("struct S { float f; int i; }; S s = S(1.0, 2.0);"),
            vec![DiagnosticCode::InvalidConstructor]
        );
        assert_eq!(body("float a[2] = float[2](1.0);"), vec![DiagnosticCode::InvalidConstructor]);
        assert!(body("float a[] = float[](1.0, 2.0); float b[2] = a;").is_empty());
    }

    #[test]
    fn test_calls() {
        assert!(body("float a = clamp(0.5, 0.0, 1.0); vec3 b = normalize(vec3(1.0));").is_empty());
        assert_eq!(body("float a = sin(1);"), vec![DiagnosticCode::NoMatchingOverload]);
        assert_eq!(body("float i; modf(1.5, 2.0);"), vec![DiagnosticCode::NotAnLvalue]);
        assert!(body("float i; float f = modf(1.5, i);").is_empty());
        assert_eq!(
            diagnose("in float v; void main() { float d = dFdx(v); }", Stage::Vertex),
            vec![DiagnosticCode::StageRestriction]
        );
        assert!(diagnose("in float v; void main() { float d = dFdx(v); }", Stage::Fragment).is_empty());
    }

    #[test]
    fn test_returns() {
        assert_eq!(codes("void f() { return 1.0; }"), vec![DiagnosticCode::ReturnMismatch]);
        assert_eq!(codes("float f() { return; }"), vec![DiagnosticCode::ReturnMismatch]);
        assert_eq!(codes("float f() { return 1; }"), vec![DiagnosticCode::ReturnMismatch]);
        assert!(codes("int f() { return 1; } void g() { return; }").is_empty());
    }

    #[test]
    fn test_switch() {
        assert!(body("int x = 1; switch (x) { case 0: break; case 1 + 1: break; default: break; }").is_empty());
        assert_eq!(body("switch (1.0) { default: break; }"), vec![DiagnosticCode::InvalidSwitchSelector]);
        assert_eq!(body("int x = 1; int y = 2; switch (x) { case y: break; }"), vec![DiagnosticCode::NotConstant]);
        assert_eq!(body("int x = 1; switch (x) { case 1u: break; }"), vec![DiagnosticCode::TypeMismatch]);
    }

    #[test]
    fn test_qualifiers() {
        assert_eq!(body("uniform float u;"), vec![DiagnosticCode::QualifierMisuse]);
        assert_eq!(codes("uniform float u = 1.0;"), vec![DiagnosticCode::QualifierMisuse]);
        assert_eq!(codes("const float c;"), vec![DiagnosticCode::NotConstant]);
        assert_eq!(codes("float g = 1.0; const float c = g;"), vec![DiagnosticCode::NotConstant]);
        assert_eq!(codes("sampler2D s;"), vec![DiagnosticCode::QualifierMisuse]);
        assert_eq!(codes("void v;"), vec![DiagnosticCode::InvalidDeclaration]);
        assert_eq!(body("invariant out vec4 x;"), vec![DiagnosticCode::QualifierMisuse, DiagnosticCode::QualifierMisuse]);
        assert!(codes("invariant gl_Position; uniform sampler2D tex; precision highp float;").is_empty());
    }

    #[test]
    fn test_stage_rules() {
        assert_eq!(diagnose("out bool flag;", Stage::Fragment), vec![DiagnosticCode::StageRestriction]);
        assert_eq!(diagnose("out mat2 m;", Stage::Fragment), vec![DiagnosticCode::StageRestriction]);
        assert_eq!(diagnose("centroid out vec4 c;", Stage::Fragment), vec![DiagnosticCode::StageRestriction]);
        assert_eq!(diagnose("in bool b;", Stage::Vertex), vec![DiagnosticCode::StageRestriction]);
        assert_eq!(diagnose("in float a[2];", Stage::Vertex), vec![DiagnosticCode::StageRestriction]);
        assert!(diagnose("out bool flag; in bool b;", Stage::None).is_empty());
        assert_eq!(diagnose("void main() { discard; }", Stage::Vertex), vec![DiagnosticCode::StageRestriction]);
    }

    #[test]
    fn test_uniform_blocks() {
        assert!(codes("uniform Lights { vec4 color; mat4 transform; } lights;").is_empty());
        assert_eq!(codes("uniform Bad { sampler2D s; };"), vec![DiagnosticCode::InvalidDeclaration]);
        assert_eq!(codes("struct S { float f; }; uniform Bad { S s; };"), vec![DiagnosticCode::InvalidDeclaration]);
        assert_eq!(codes("uniform Bad { in float f; };"), vec![DiagnosticCode::QualifierMisuse]);
        assert_eq!(codes("out Bad { float f; };"), vec![DiagnosticCode::QualifierMisuse]);
    }

    #[test]
    fn test_integer_overflow() {
        assert_eq!(body("uint x = 4294967296u;"), vec![DiagnosticCode::IntegerOverflow]);
        assert_eq!(body("int x = 09;"), vec![DiagnosticCode::MalformedLiteral]);
        assert!(body("uint x = 4294967295u; int y = 0xFFFFFFFF;").is_empty());
    }

    #[test]
    fn test_unknown_types_do_not_cascade() {
        assert_eq!(body("float x = missing + 1.0 * missing;"), vec![
            DiagnosticCode::UnresolvedIdentifier,
            DiagnosticCode::UnresolvedIdentifier,
        ]);
        assert_eq!(body("vec3 v = vec3(missing); v = missing.xyz;"), vec![
            DiagnosticCode::UnresolvedIdentifier,
            DiagnosticCode::UnresolvedIdentifier,
        ]);
    }

    #[test]
    fn test_expression_types_are_cached() {
        let mut unit = Parser::new("void f() { vec4 v; v.xy * 2.0; }").unwrap().parse().unwrap();
        let mut diagnostics = Vec::new();
        bind(&mut unit, &mut diagnostics);
        check(&mut unit, Stage::None, &mut diagnostics);
        assert!(diagnostics.is_empty());

        let DeclKind::Function(f) = &unit.declarations[0].kind else { panic!("expected function") };
        let StmtKind::Expr(expr) = &f.body.as_ref().unwrap().stmts[1].kind else { panic!("expected expression") };
        assert_eq!(expr.ty, Some(Type::vector(ScalarKind::Float, 2)));
        let ExprKind::Binary { left, .. } = &expr.kind else { panic!("expected binary") };
        assert_eq!(left.ty, Some(Type::vector(ScalarKind::Float, 2)));
    }
}
