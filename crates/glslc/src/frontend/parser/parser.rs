//! Recursive descent parser for GLSL ES 3.00

use crate::common::{CompileError, CompileResult, Span};
use crate::frontend::ast::*;
use crate::frontend::lexer::{Lexer, Token, TokenKind};
use crate::types::BasicType;

/// Recursive descent parser for GLSL
///
/// The whole token stream is buffered: telling a declaration (`float[2] a;`)
/// from a constructor call (`float[2](a, b);`) needs unbounded lookahead.
pub struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    /// Create a new parser for the given source
    pub fn new(source: &str) -> CompileResult<Self> {
        let tokens = Lexer::new(source).tokenize_all()?;
        Ok(Self { tokens, pos: 0 })
    }

    /// Parse a complete translation unit
    pub fn parse(&mut self) -> CompileResult<TranslationUnit> {
        let mut declarations = Vec::new();

        while !self.at_end() {
            declarations.push(self.parse_declaration(true)?);
        }

        Ok(TranslationUnit::new(declarations))
    }

    // =========================================================================
    // Helper methods
    // =========================================================================

    fn current(&self) -> &Token {
        &self.tokens[self.pos]
    }

    fn peek_kind(&self, offset: usize) -> &TokenKind {
        let index = (self.pos + offset).min(self.tokens.len() - 1);
        &self.tokens[index].kind
    }

    fn at_end(&self) -> bool {
        matches!(self.current().kind, TokenKind::Eof)
    }

    fn advance(&mut self) -> Token {
        let token = self.tokens[self.pos].clone();
        if self.pos < self.tokens.len() - 1 {
            self.pos += 1;
        }
        token
    }

    fn previous_span(&self) -> Span {
        self.tokens[self.pos.saturating_sub(1)].span
    }

    /// Span from `start` to the end of the last consumed token
    fn span_from(&self, start: Span) -> Span {
        start.merge(self.previous_span())
    }

    fn check(&self, kind: &TokenKind) -> bool {
        std::mem::discriminant(&self.current().kind) == std::mem::discriminant(kind)
    }

    fn match_token(&mut self, kind: &TokenKind) -> bool {
        if self.check(kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, kind: TokenKind) -> CompileResult<Token> {
        if self.check(&kind) {
            Ok(self.advance())
        } else {
            Err(CompileError::parser(
                format!("expected {}, found {}", kind, self.current().kind),
                self.current().span,
            ))
        }
    }

    /// Expect a plain identifier (not a basic type name)
    fn expect_identifier(&mut self) -> CompileResult<(String, Span)> {
        match &self.current().kind {
            TokenKind::Identifier(name) if BasicType::from_name(name).is_none() => {
                let name = name.clone();
                let token = self.advance();
                Ok((name, token.span))
            }
            other => Err(CompileError::parser(
                format!("expected identifier, found {}", other),
                self.current().span,
            )),
        }
    }

    /// Index of the `]` matching the `[` at `open`
    fn matching_bracket(&self, open: usize) -> Option<usize> {
        let mut depth = 0usize;
        for (i, token) in self.tokens.iter().enumerate().skip(open) {
            match token.kind {
                TokenKind::LBracket => depth += 1,
                TokenKind::RBracket => {
                    depth -= 1;
                    if depth == 0 {
                        return Some(i);
                    }
                }
                TokenKind::Semi | TokenKind::Eof => return None,
                _ => {}
            }
        }
        None
    }

    /// Does `Identifier [ ... ]` at the cursor continue with `kind`?
    fn array_suffix_followed_by(&self, kind: &TokenKind) -> bool {
        if !matches!(self.peek_kind(1), TokenKind::LBracket) {
            return false;
        }
        match self.matching_bracket(self.pos + 1) {
            Some(close) => {
                let next = &self.tokens[(close + 1).min(self.tokens.len() - 1)].kind;
                std::mem::discriminant(next) == std::mem::discriminant(kind)
            }
            None => false,
        }
    }

    fn starts_declaration(&self) -> bool {
        let kind = &self.current().kind;
        if kind.starts_qualifier() || matches!(kind, TokenKind::Struct | TokenKind::Precision) {
            return true;
        }
        if !matches!(kind, TokenKind::Identifier(_)) {
            return false;
        }
        matches!(self.peek_kind(1), TokenKind::Identifier(_))
            || self.array_suffix_followed_by(&TokenKind::Identifier(String::new()))
    }

    // =========================================================================
    // Declarations
    // =========================================================================

    fn parse_declaration(&mut self, at_global: bool) -> CompileResult<Declaration> {
        let start = self.current().span;

        if self.match_token(&TokenKind::Precision) {
            let precision = self.parse_precision()?.ok_or_else(|| {
                CompileError::parser("expected precision qualifier", self.current().span)
            })?;
            let specifier = self.parse_type_specifier()?;
            self.expect(TokenKind::Semi)?;
            return Ok(Declaration::new(
                DeclKind::Precision { precision, specifier },
                self.span_from(start),
            ));
        }

        if self.check(&TokenKind::Invariant)
            && matches!(self.peek_kind(1), TokenKind::Identifier(_))
            && matches!(self.peek_kind(2), TokenKind::Semi | TokenKind::Comma)
        {
            self.advance();
            let mut targets = Vec::new();
            loop {
                let (name, span) = self.expect_identifier()?;
                targets.push(InvariantTarget { name, span, binding: None });
                if !self.match_token(&TokenKind::Comma) {
                    break;
                }
            }
            self.expect(TokenKind::Semi)?;
            return Ok(Declaration::new(DeclKind::Invariant(targets), self.span_from(start)));
        }

        let qualifiers = self.parse_type_qualifiers()?;

        if !qualifiers.is_empty()
            && matches!(self.current().kind, TokenKind::Identifier(_))
            && matches!(self.peek_kind(1), TokenKind::LBrace)
        {
            return self.parse_interface_block(qualifiers, start);
        }

        let specifier = self.parse_type_specifier()?;
        let ty = FullType { qualifiers, specifier };

        if self.match_token(&TokenKind::Semi) {
            return Ok(Declaration::new(
                DeclKind::Variables(VariableList { ty, declarators: Vec::new() }),
                self.span_from(start),
            ));
        }

        let (name, name_span) = self.expect_identifier()?;

        if self.check(&TokenKind::LParen) {
            if !at_global {
                return Err(CompileError::parser(
                    "function declarations are only allowed at global scope",
                    name_span,
                ));
            }
            return self.parse_function(ty, name, start);
        }

        let mut declarators = vec![self.parse_declarator_rest(name, name_span)?];
        while self.match_token(&TokenKind::Comma) {
            let (name, name_span) = self.expect_identifier()?;
            declarators.push(self.parse_declarator_rest(name, name_span)?);
        }
        self.expect(TokenKind::Semi)?;

        Ok(Declaration::new(
            DeclKind::Variables(VariableList { ty, declarators }),
            self.span_from(start),
        ))
    }

    fn parse_declarator_rest(&mut self, name: String, name_span: Span) -> CompileResult<Declarator> {
        let mut declarator = Declarator::new(name, name_span);
        if self.check(&TokenKind::LBracket) {
            declarator.array = Some(self.parse_array_specifier()?);
        }
        if self.match_token(&TokenKind::Eq) {
            declarator.init = Some(self.parse_assignment_expression()?);
        }
        declarator.span = self.span_from(name_span);
        Ok(declarator)
    }

    fn parse_function(&mut self, return_type: FullType, name: String, start: Span) -> CompileResult<Declaration> {
        self.expect(TokenKind::LParen)?;
        let mut params = Vec::new();

        let void_list = matches!(&self.current().kind, TokenKind::Identifier(n) if n == "void")
            && matches!(self.peek_kind(1), TokenKind::RParen);
        if void_list {
            self.advance();
        } else if !self.check(&TokenKind::RParen) {
            loop {
                params.push(self.parse_parameter()?);
                if !self.match_token(&TokenKind::Comma) {
                    break;
                }
            }
        }
        self.expect(TokenKind::RParen)?;

        let body = if self.match_token(&TokenKind::Semi) {
            None
        } else {
            Some(self.parse_block()?)
        };

        let func = FunctionDecl {
            return_type,
            name,
            params,
            body,
            span: self.span_from(start),
        };
        Ok(Declaration::new(DeclKind::Function(func), self.span_from(start)))
    }

    fn parse_parameter(&mut self) -> CompileResult<ParamDecl> {
        let start = self.current().span;
        let qualifiers = self.parse_type_qualifiers()?;
        let specifier = self.parse_type_specifier()?;

        let (name, array) = if matches!(self.current().kind, TokenKind::Identifier(_)) {
            let (name, _) = self.expect_identifier()?;
            let array = if self.check(&TokenKind::LBracket) {
                Some(self.parse_array_specifier()?)
            } else {
                None
            };
            (Some(name), array)
        } else {
            (None, None)
        };

        Ok(ParamDecl {
            qualifiers,
            specifier,
            name,
            array,
            span: self.span_from(start),
            binding: None,
        })
    }

    fn parse_interface_block(&mut self, qualifiers: TypeQualifiers, start: Span) -> CompileResult<Declaration> {
        let (name, _) = self.expect_identifier()?;
        let members = self.parse_member_list()?;

        let instance = if matches!(self.current().kind, TokenKind::Identifier(_)) {
            let (instance, span) = self.expect_identifier()?;
            let mut declarator = Declarator::new(instance, span);
            if self.check(&TokenKind::LBracket) {
                declarator.array = Some(self.parse_array_specifier()?);
            }
            declarator.span = self.span_from(span);
            Some(declarator)
        } else {
            None
        };
        self.expect(TokenKind::Semi)?;

        let span = self.span_from(start);
        Ok(Declaration::new(
            DeclKind::Block(InterfaceBlock { qualifiers, name, members, instance, span }),
            span,
        ))
    }

    // =========================================================================
    // Qualifiers and type specifiers
    // =========================================================================

    fn parse_precision(&mut self) -> CompileResult<Option<Precision>> {
        let precision = match self.current().kind {
            TokenKind::Lowp => Precision::Low,
            TokenKind::Mediump => Precision::Medium,
            TokenKind::Highp => Precision::High,
            _ => return Ok(None),
        };
        self.advance();
        Ok(Some(precision))
    }

    fn parse_type_qualifiers(&mut self) -> CompileResult<TypeQualifiers> {
        let start = self.current().span;
        let start_pos = self.pos;
        let mut qualifiers = TypeQualifiers::new();
        let mut centroid = false;

        loop {
            let storage = match &self.current().kind {
                TokenKind::Const => Some(StorageQualifier::Const),
                TokenKind::Uniform => Some(StorageQualifier::Uniform),
                TokenKind::In => Some(StorageQualifier::In),
                TokenKind::Out => Some(StorageQualifier::Out),
                TokenKind::InOut => Some(StorageQualifier::InOut),
                TokenKind::Centroid => {
                    self.advance();
                    centroid = true;
                    continue;
                }
                TokenKind::Flat | TokenKind::Smooth => {
                    let interpolation = if self.check(&TokenKind::Flat) {
                        Interpolation::Flat
                    } else {
                        Interpolation::Smooth
                    };
                    self.advance();
                    qualifiers.interpolation = Some(interpolation);
                    continue;
                }
                TokenKind::Invariant => {
                    self.advance();
                    qualifiers.invariant = true;
                    continue;
                }
                TokenKind::Lowp | TokenKind::Mediump | TokenKind::Highp => {
                    qualifiers.precision = self.parse_precision()?;
                    continue;
                }
                TokenKind::Layout => {
                    self.advance();
                    let layout = self.parse_layout_list()?;
                    qualifiers.layout.extend(layout);
                    continue;
                }
                _ => None,
            };

            match storage {
                Some(storage) => {
                    if qualifiers.storage.is_some() {
                        return Err(CompileError::parser(
                            "multiple storage qualifiers",
                            self.current().span,
                        ));
                    }
                    self.advance();
                    qualifiers.storage = Some(storage);
                }
                None => break,
            }
        }

        if centroid {
            qualifiers.storage = match qualifiers.storage {
                Some(StorageQualifier::In) => Some(StorageQualifier::CentroidIn),
                Some(StorageQualifier::Out) => Some(StorageQualifier::CentroidOut),
                _ => {
                    return Err(CompileError::parser(
                        "'centroid' must be followed by 'in' or 'out'",
                        start,
                    ));
                }
            };
        }

        qualifiers.span = if self.pos > start_pos {
            self.span_from(start)
        } else {
            Span::new(start.start, start.start)
        };
        Ok(qualifiers)
    }

    fn parse_layout_list(&mut self) -> CompileResult<Vec<LayoutQualifier>> {
        self.expect(TokenKind::LParen)?;
        let mut layout = Vec::new();
        loop {
            let token = self.advance();
            let name = match token.kind {
                TokenKind::Identifier(name) => name,
                other => {
                    return Err(CompileError::parser(
                        format!("expected layout qualifier, found {}", other),
                        token.span,
                    ));
                }
            };
            let value = if self.match_token(&TokenKind::Eq) {
                let token = self.advance();
                match token.kind {
                    TokenKind::IntLiteral(value) => Some(value),
                    other => {
                        return Err(CompileError::parser(
                            format!("expected integer layout value, found {}", other),
                            token.span,
                        ));
                    }
                }
            } else {
                None
            };
            layout.push(LayoutQualifier { name, value, span: self.span_from(token.span) });
            if !self.match_token(&TokenKind::Comma) {
                break;
            }
        }
        self.expect(TokenKind::RParen)?;
        Ok(layout)
    }

    fn parse_type_specifier(&mut self) -> CompileResult<TypeSpecifier> {
        let start = self.current().span;

        let kind = if self.match_token(&TokenKind::Struct) {
            TypeSpecifierKind::Struct(self.parse_struct_body(start)?)
        } else if let TokenKind::Identifier(name) = &self.current().kind {
            let name = name.clone();
            self.advance();
            match BasicType::from_name(&name) {
                Some(basic) => TypeSpecifierKind::Basic(basic),
                None => TypeSpecifierKind::Named(name),
            }
        } else {
            return Err(CompileError::parser(
                format!("expected type specifier, found {}", self.current().kind),
                start,
            ));
        };

        let mut specifier = TypeSpecifier::new(kind, self.span_from(start));
        if self.check(&TokenKind::LBracket) {
            specifier = specifier.with_array(self.parse_array_specifier()?);
        }
        Ok(specifier)
    }

    fn parse_array_specifier(&mut self) -> CompileResult<ArraySpecifier> {
        let start = self.expect(TokenKind::LBracket)?.span;
        let size = if self.check(&TokenKind::RBracket) {
            None
        } else {
            Some(self.parse_conditional_expression()?)
        };
        self.expect(TokenKind::RBracket)?;
        Ok(ArraySpecifier::new(size, self.span_from(start)))
    }

    fn parse_struct_body(&mut self, start: Span) -> CompileResult<StructSpecifier> {
        let name = if matches!(self.current().kind, TokenKind::Identifier(_)) {
            Some(self.expect_identifier()?.0)
        } else {
            None
        };
        let members = self.parse_member_list()?;
        Ok(StructSpecifier { name, members, span: self.span_from(start) })
    }

    fn parse_member_list(&mut self) -> CompileResult<Vec<StructMember>> {
        self.expect(TokenKind::LBrace)?;
        let mut members = Vec::new();

        while !self.check(&TokenKind::RBrace) && !self.at_end() {
            let start = self.current().span;
            let qualifiers = self.parse_type_qualifiers()?;
            let specifier = self.parse_type_specifier()?;
            let mut declarators = Vec::new();
            loop {
                let (name, span) = self.expect_identifier()?;
                let array = if self.check(&TokenKind::LBracket) {
                    Some(self.parse_array_specifier()?)
                } else {
                    None
                };
                declarators.push(MemberDeclarator { name, array, span: self.span_from(span) });
                if !self.match_token(&TokenKind::Comma) {
                    break;
                }
            }
            self.expect(TokenKind::Semi)?;
            members.push(StructMember {
                qualifiers,
                specifier,
                declarators,
                span: self.span_from(start),
            });
        }

        self.expect(TokenKind::RBrace)?;
        Ok(members)
    }

    // =========================================================================
    // Statements
    // =========================================================================

    fn parse_statement(&mut self) -> CompileResult<Stmt> {
        let start = self.current().span;

        match &self.current().kind {
            TokenKind::LBrace => {
                let block = self.parse_block()?;
                Ok(Stmt::new(StmtKind::Block(block), self.span_from(start)))
            }
            TokenKind::If => self.parse_if_statement(),
            TokenKind::Switch => self.parse_switch_statement(),
            TokenKind::Case => {
                self.advance();
                let value = self.parse_expression()?;
                self.expect(TokenKind::Colon)?;
                Ok(Stmt::new(StmtKind::Case(value), self.span_from(start)))
            }
            TokenKind::Default => {
                self.advance();
                self.expect(TokenKind::Colon)?;
                Ok(Stmt::new(StmtKind::Default, self.span_from(start)))
            }
            TokenKind::While => self.parse_while_statement(),
            TokenKind::Do => self.parse_do_while_statement(),
            TokenKind::For => self.parse_for_statement(),
            TokenKind::Continue | TokenKind::Break | TokenKind::Discard => {
                let kind = match self.advance().kind {
                    TokenKind::Continue => StmtKind::Continue,
                    TokenKind::Break => StmtKind::Break,
                    _ => StmtKind::Discard,
                };
                self.expect(TokenKind::Semi)?;
                Ok(Stmt::new(kind, self.span_from(start)))
            }
            TokenKind::Return => {
                self.advance();
                let value = if self.check(&TokenKind::Semi) {
                    None
                } else {
                    Some(self.parse_expression()?)
                };
                self.expect(TokenKind::Semi)?;
                Ok(Stmt::new(StmtKind::Return(value), self.span_from(start)))
            }
            TokenKind::Semi => {
                self.advance();
                Ok(Stmt::new(StmtKind::Empty, start))
            }
            _ if self.starts_declaration() => {
                let decl = self.parse_declaration(false)?;
                let span = decl.span;
                Ok(Stmt::new(StmtKind::Declaration(decl), span))
            }
            _ => self.parse_expression_statement(),
        }
    }

    fn parse_block(&mut self) -> CompileResult<Block> {
        let start = self.current().span;
        self.expect(TokenKind::LBrace)?;

        let mut stmts = Vec::new();
        while !self.check(&TokenKind::RBrace) && !self.at_end() {
            stmts.push(self.parse_statement()?);
        }

        self.expect(TokenKind::RBrace)?;
        Ok(Block::new(stmts, self.span_from(start)))
    }

    fn parse_if_statement(&mut self) -> CompileResult<Stmt> {
        let start = self.current().span;
        self.expect(TokenKind::If)?;
        self.expect(TokenKind::LParen)?;
        let condition = self.parse_expression()?;
        self.expect(TokenKind::RParen)?;

        let then_branch = Box::new(self.parse_statement()?);
        let else_branch = if self.match_token(&TokenKind::Else) {
            Some(Box::new(self.parse_statement()?))
        } else {
            None
        };

        Ok(Stmt::new(
            StmtKind::If { condition, then_branch, else_branch },
            self.span_from(start),
        ))
    }

    fn parse_switch_statement(&mut self) -> CompileResult<Stmt> {
        let start = self.current().span;
        self.expect(TokenKind::Switch)?;
        self.expect(TokenKind::LParen)?;
        let selector = self.parse_expression()?;
        self.expect(TokenKind::RParen)?;
        let body = self.parse_block()?;

        Ok(Stmt::new(StmtKind::Switch { selector, body }, self.span_from(start)))
    }

    fn parse_while_statement(&mut self) -> CompileResult<Stmt> {
        let start = self.current().span;
        self.expect(TokenKind::While)?;
        self.expect(TokenKind::LParen)?;
        let condition = self.parse_expression()?;
        self.expect(TokenKind::RParen)?;
        let body = Box::new(self.parse_statement()?);

        Ok(Stmt::new(StmtKind::While { condition, body }, self.span_from(start)))
    }

    fn parse_do_while_statement(&mut self) -> CompileResult<Stmt> {
        let start = self.current().span;
        self.expect(TokenKind::Do)?;
        let body = Box::new(self.parse_statement()?);
        self.expect(TokenKind::While)?;
        self.expect(TokenKind::LParen)?;
        let condition = self.parse_expression()?;
        self.expect(TokenKind::RParen)?;
        self.expect(TokenKind::Semi)?;

        Ok(Stmt::new(StmtKind::DoWhile { body, condition }, self.span_from(start)))
    }

    fn parse_for_statement(&mut self) -> CompileResult<Stmt> {
        let start = self.current().span;
        self.expect(TokenKind::For)?;
        self.expect(TokenKind::LParen)?;

        // Init (consumes its own ';')
        let init = if self.match_token(&TokenKind::Semi) {
            None
        } else if self.starts_declaration() {
            let decl = self.parse_declaration(false)?;
            let span = decl.span;
            Some(Box::new(Stmt::new(StmtKind::Declaration(decl), span)))
        } else {
            Some(Box::new(self.parse_expression_statement()?))
        };

        let condition = if self.check(&TokenKind::Semi) {
            None
        } else {
            Some(self.parse_expression()?)
        };
        self.expect(TokenKind::Semi)?;

        let update = if self.check(&TokenKind::RParen) {
            None
        } else {
            Some(self.parse_expression()?)
        };
        self.expect(TokenKind::RParen)?;

        let body = Box::new(self.parse_statement()?);
        Ok(Stmt::new(
            StmtKind::For { init, condition, update, body },
            self.span_from(start),
        ))
    }

    fn parse_expression_statement(&mut self) -> CompileResult<Stmt> {
        let start = self.current().span;
        let expr = self.parse_expression()?;
        self.expect(TokenKind::Semi)?;
        Ok(Stmt::new(StmtKind::Expr(expr), self.span_from(start)))
    }

    // =========================================================================
    // Expressions
    // =========================================================================

    fn parse_expression(&mut self) -> CompileResult<Expr> {
        let mut left = self.parse_assignment_expression()?;
        while self.match_token(&TokenKind::Comma) {
            let right = self.parse_assignment_expression()?;
            let span = left.span.merge(right.span);
            left = Expr::new(
                ExprKind::Comma { left: Box::new(left), right: Box::new(right) },
                span,
            );
        }
        Ok(left)
    }

    fn parse_assignment_expression(&mut self) -> CompileResult<Expr> {
        let left = self.parse_conditional_expression()?;

        if let Some(op) = self.assignment_op() {
            self.advance();
            let right = self.parse_assignment_expression()?;
            let span = left.span.merge(right.span);
            return Ok(Expr::new(
                ExprKind::Assign { op, target: Box::new(left), value: Box::new(right) },
                span,
            ));
        }

        Ok(left)
    }

    fn assignment_op(&self) -> Option<AssignOp> {
        match &self.current().kind {
            TokenKind::Eq => Some(AssignOp::Assign),
            TokenKind::PlusEq => Some(AssignOp::AddAssign),
            TokenKind::MinusEq => Some(AssignOp::SubAssign),
            TokenKind::StarEq => Some(AssignOp::MulAssign),
            TokenKind::SlashEq => Some(AssignOp::DivAssign),
            TokenKind::PercentEq => Some(AssignOp::ModAssign),
            TokenKind::AmpEq => Some(AssignOp::AndAssign),
            TokenKind::PipeEq => Some(AssignOp::OrAssign),
            TokenKind::CaretEq => Some(AssignOp::XorAssign),
            TokenKind::LtLtEq => Some(AssignOp::ShlAssign),
            TokenKind::GtGtEq => Some(AssignOp::ShrAssign),
            _ => None,
        }
    }

    fn parse_conditional_expression(&mut self) -> CompileResult<Expr> {
        let condition = self.parse_binary(0)?;

        if self.match_token(&TokenKind::Question) {
            let then_expr = self.parse_expression()?;
            self.expect(TokenKind::Colon)?;
            let else_expr = self.parse_assignment_expression()?;
            let span = condition.span.merge(else_expr.span);
            return Ok(Expr::new(
                ExprKind::Ternary {
                    condition: Box::new(condition),
                    then_expr: Box::new(then_expr),
                    else_expr: Box::new(else_expr),
                },
                span,
            ));
        }

        Ok(condition)
    }

    /// Binary operator for the current token at precedence `level`
    /// (0 = `||` ... 10 = `* / %`)
    fn binary_op_at(&self, level: usize) -> Option<BinaryOp> {
        let op = match (&self.current().kind, level) {
            (TokenKind::PipePipe, 0) => BinaryOp::LogOr,
            (TokenKind::CaretCaret, 1) => BinaryOp::LogXor,
            (TokenKind::AmpAmp, 2) => BinaryOp::LogAnd,
            (TokenKind::Pipe, 3) => BinaryOp::BitOr,
            (TokenKind::Caret, 4) => BinaryOp::BitXor,
            (TokenKind::Amp, 5) => BinaryOp::BitAnd,
            (TokenKind::EqEq, 6) => BinaryOp::Eq,
            (TokenKind::NotEq, 6) => BinaryOp::Ne,
            (TokenKind::Lt, 7) => BinaryOp::Lt,
            (TokenKind::Gt, 7) => BinaryOp::Gt,
            (TokenKind::LtEq, 7) => BinaryOp::Le,
            (TokenKind::GtEq, 7) => BinaryOp::Ge,
            (TokenKind::LtLt, 8) => BinaryOp::Shl,
            (TokenKind::GtGt, 8) => BinaryOp::Shr,
            (TokenKind::Plus, 9) => BinaryOp::Add,
            (TokenKind::Minus, 9) => BinaryOp::Sub,
            (TokenKind::Star, 10) => BinaryOp::Mul,
            (TokenKind::Slash, 10) => BinaryOp::Div,
            (TokenKind::Percent, 10) => BinaryOp::Mod,
            _ => return None,
        };
        Some(op)
    }

    /// Left-associative binary operators, lowest precedence first
    fn parse_binary(&mut self, level: usize) -> CompileResult<Expr> {
        const LEVELS: usize = 11;
        if level == LEVELS {
            return self.parse_unary_expression();
        }

        let mut left = self.parse_binary(level + 1)?;
        while let Some(op) = self.binary_op_at(level) {
            self.advance();
            let right = self.parse_binary(level + 1)?;
            let span = left.span.merge(right.span);
            left = Expr::new(
                ExprKind::Binary { op, left: Box::new(left), right: Box::new(right) },
                span,
            );
        }
        Ok(left)
    }

    fn parse_unary_expression(&mut self) -> CompileResult<Expr> {
        let start = self.current().span;

        let unary = match &self.current().kind {
            TokenKind::Plus => UnaryOp::Plus,
            TokenKind::Minus => UnaryOp::Neg,
            TokenKind::Bang => UnaryOp::Not,
            TokenKind::Tilde => UnaryOp::BitNot,
            TokenKind::PlusPlus | TokenKind::MinusMinus => {
                let op = if self.check(&TokenKind::PlusPlus) {
                    UpdateOp::Increment
                } else {
                    UpdateOp::Decrement
                };
                self.advance();
                let operand = self.parse_unary_expression()?;
                let span = start.merge(operand.span);
                return Ok(Expr::new(
                    ExprKind::Update { op, prefix: true, operand: Box::new(operand) },
                    span,
                ));
            }
            _ => return self.parse_postfix_expression(),
        };

        self.advance();
        let operand = self.parse_unary_expression()?;
        let span = start.merge(operand.span);
        Ok(Expr::new(ExprKind::Unary { op: unary, operand: Box::new(operand) }, span))
    }

    fn parse_postfix_expression(&mut self) -> CompileResult<Expr> {
        let mut expr = self.parse_primary_expression()?;

        loop {
            let start = expr.span;
            match &self.current().kind {
                TokenKind::LBracket => {
                    self.advance();
                    let index = self.parse_expression()?;
                    self.expect(TokenKind::RBracket)?;
                    expr = Expr::new(
                        ExprKind::Index { array: Box::new(expr), index: Box::new(index) },
                        self.span_from(start),
                    );
                }
                TokenKind::Dot => {
                    self.advance();
                    let token = self.advance();
                    let field = match token.kind {
                        TokenKind::Identifier(name) => name,
                        other => {
                            return Err(CompileError::parser(
                                format!("expected field name, found {}", other),
                                token.span,
                            ));
                        }
                    };
                    if field == "length"
                        && self.check(&TokenKind::LParen)
                        && matches!(self.peek_kind(1), TokenKind::RParen)
                    {
                        self.advance();
                        self.advance();
                        expr = Expr::new(ExprKind::Length(Box::new(expr)), self.span_from(start));
                    } else {
                        expr = Expr::new(
                            ExprKind::Field { object: Box::new(expr), field },
                            self.span_from(start),
                        );
                    }
                }
                TokenKind::PlusPlus | TokenKind::MinusMinus => {
                    let op = if self.check(&TokenKind::PlusPlus) {
                        UpdateOp::Increment
                    } else {
                        UpdateOp::Decrement
                    };
                    self.advance();
                    expr = Expr::new(
                        ExprKind::Update { op, prefix: false, operand: Box::new(expr) },
                        self.span_from(start),
                    );
                }
                _ => break,
            }
        }

        Ok(expr)
    }

    fn parse_primary_expression(&mut self) -> CompileResult<Expr> {
        let start = self.current().span;

        match &self.current().kind {
            TokenKind::IntLiteral(text) => {
                let text = text.clone();
                self.advance();
                Ok(Expr::new(ExprKind::IntLiteral(text), start))
            }
            TokenKind::FloatLiteral(text) => {
                let text = text.clone();
                self.advance();
                Ok(Expr::new(ExprKind::FloatLiteral(text), start))
            }
            TokenKind::True | TokenKind::False => {
                let value = self.check(&TokenKind::True);
                self.advance();
                Ok(Expr::new(ExprKind::BoolLiteral(value), start))
            }
            TokenKind::LParen => {
                self.advance();
                let mut expr = self.parse_expression()?;
                self.expect(TokenKind::RParen)?;
                expr.span = self.span_from(start);
                Ok(expr)
            }
            TokenKind::Identifier(name) => {
                let is_call = matches!(self.peek_kind(1), TokenKind::LParen)
                    || self.array_suffix_followed_by(&TokenKind::LParen);
                if is_call {
                    return self.parse_call();
                }
                let name = name.clone();
                self.advance();
                Ok(Expr::new(ExprKind::Variable { name, binding: None }, start))
            }
            other => Err(CompileError::parser(
                format!("expected expression, found {}", other),
                start,
            )),
        }
    }

    fn parse_call(&mut self) -> CompileResult<Expr> {
        let start = self.current().span;
        let callee = self.parse_type_specifier()?;
        self.expect(TokenKind::LParen)?;

        let mut args = Vec::new();
        let void_args = matches!(&self.current().kind, TokenKind::Identifier(n) if n == "void")
            && matches!(self.peek_kind(1), TokenKind::RParen);
        if void_args {
            self.advance();
        } else if !self.check(&TokenKind::RParen) {
            loop {
                args.push(self.parse_assignment_expression()?);
                if !self.match_token(&TokenKind::Comma) {
                    break;
                }
            }
        }
        self.expect(TokenKind::RParen)?;

        Ok(Expr::new(
            ExprKind::Call { callee, args, binding: None, constructor: None },
            self.span_from(start),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(source: &str) -> TranslationUnit {
        Parser::new(source).unwrap().parse().unwrap()
    }

    fn body(tu: &TranslationUnit) -> &[Stmt] {
        match &tu.declarations[0].kind {
            DeclKind::Function(f) => &f.body.as_ref().unwrap().stmts,
            other => panic!("expected function, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_simple_function() {
        let tu = parse("void main() { gl_Position = vec4(0.0); }");

        assert_eq!(tu.declarations.len(), 1);
        if let DeclKind::Function(f) = &tu.declarations[0].kind {
            assert_eq!(f.name, "main");
            assert!(f.is_definition());
            assert!(f.params.is_empty());
        } else {
            panic!("expected function declaration");
        }
    }

    #[test]
    fn test_parse_qualified_declarations() {
        let tu = parse("layout(location = 0) out highp vec4 color; centroid in vec2 uv; const float a = 1.0, b[2];");
        assert_eq!(tu.declarations.len(), 3);

        let DeclKind::Variables(list) = &tu.declarations[0].kind else { panic!("expected variables") };
        assert_eq!(list.ty.qualifiers.storage, Some(StorageQualifier::Out));
        assert_eq!(list.ty.qualifiers.precision, Some(Precision::High));
        assert_eq!(list.ty.qualifiers.layout[0].name, "location");
        assert_eq!(list.ty.qualifiers.layout[0].value.as_deref(), Some("0"));

        let DeclKind::Variables(list) = &tu.declarations[1].kind else { panic!("expected variables") };
        assert_eq!(list.ty.qualifiers.storage, Some(StorageQualifier::CentroidIn));

        let DeclKind::Variables(list) = &tu.declarations[2].kind else { panic!("expected variables") };
        assert_eq!(list.declarators.len(), 2);
        assert!(list.declarators[0].init.is_some());
        assert!(list.declarators[1].array.is_some());
    }

    #[test]
    fn test_parse_struct_and_block() {
        let tu = parse("struct Light { vec3 pos; float r[2]; } sun; uniform Params { mat4 mvp; } params;");
        let DeclKind::Variables(list) = &tu.declarations[0].kind else { panic!("expected variables") };
        let TypeSpecifierKind::Struct(s) = &list.ty.specifier.kind else { panic!("expected struct") };
        assert_eq!(s.name.as_deref(), Some("Light"));
        assert_eq!(s.members.len(), 2);
        assert_eq!(list.declarators[0].name, "sun");

        let DeclKind::Block(block) = &tu.declarations[1].kind else { panic!("expected block") };
        assert_eq!(block.name, "Params");
        assert_eq!(block.instance.as_ref().map(|d| d.name.as_str()), Some("params"));
    }

    #[test]
    fn test_declaration_versus_constructor() {
        let tu = parse("void f() { float[2] a; float[2](1.0, 2.0); vec3(1.0); S s; a[0] = 1.0; }");
        let stmts = body(&tu);
        assert!(matches!(stmts[0].kind, StmtKind::Declaration(_)));
        assert!(matches!(&stmts[1].kind, StmtKind::Expr(e) if matches!(&e.kind, ExprKind::Call { callee, .. } if callee.array.is_some())));
        assert!(matches!(&stmts[2].kind, StmtKind::Expr(e) if matches!(e.kind, ExprKind::Call { .. })));
        assert!(matches!(stmts[3].kind, StmtKind::Declaration(_)));
        assert!(matches!(&stmts[4].kind, StmtKind::Expr(e) if matches!(e.kind, ExprKind::Assign { .. })));
    }

    #[test]
    fn test_precedence() {
        let tu = parse("void f() { a = 1 + 2 * 3 << 1; }");
        let StmtKind::Expr(expr) = &body(&tu)[0].kind else { panic!("expected expression") };
        let ExprKind::Assign { value, .. } = &expr.kind else { panic!("expected assignment") };
        let ExprKind::Binary { op: BinaryOp::Shl, left, .. } = &value.kind else { panic!("expected shift") };
        assert!(matches!(&left.kind, ExprKind::Binary { op: BinaryOp::Add, right, .. } if matches!(right.kind, ExprKind::Binary { op: BinaryOp::Mul, .. })));
    }

    #[test]
    fn test_parse_control_flow() {
        let source = "void f() {
            for (int i = 0; i < 4; i++) { if (i == 2) continue; else break; }
            switch (x) { case 1: y++; break; default: discard; }
            do { x--; } while (x > 0);
            return;
        }";
        let tu = parse(source);
        let stmts = body(&tu);
        assert!(matches!(stmts[0].kind, StmtKind::For { .. }));
        assert!(matches!(stmts[1].kind, StmtKind::Switch { .. }));
        assert!(matches!(stmts[2].kind, StmtKind::DoWhile { .. }));
        assert!(matches!(stmts[3].kind, StmtKind::Return(None)));
    }

    #[test]
    fn test_parse_length_and_swizzle() {
        let tu = parse("void f() { a.length(); v.xyz; }");
        let stmts = body(&tu);
        assert!(matches!(&stmts[0].kind, StmtKind::Expr(e) if matches!(e.kind, ExprKind::Length(_))));
        assert!(matches!(&stmts[1].kind, StmtKind::Expr(e) if matches!(&e.kind, ExprKind::Field { field, .. } if field == "xyz")));
    }

    #[test]
    fn test_parse_errors() {
        assert!(Parser::new("float vec4;").unwrap().parse().is_err());
        assert!(Parser::new("void f() { void g() {} }").unwrap().parse().is_err());
        assert!(Parser::new("centroid uniform float x;").unwrap().parse().is_err());
    }
}
