//! Lexer implementation using logos

use super::token::{Token, TokenKind};
use crate::common::{CompileError, CompileResult, Span};
use logos::Logos;

/// Lexer for GLSL source code
pub struct Lexer<'a> {
    inner: logos::Lexer<'a, TokenKind>,
    at_eof: bool,
}

impl<'a> Lexer<'a> {
    /// Create a new lexer for the given source code
    pub fn new(source: &'a str) -> Self {
        Self {
            inner: TokenKind::lexer(source),
            at_eof: false,
        }
    }

    /// Get the next token
    pub fn next_token(&mut self) -> CompileResult<Token> {
        if self.at_eof {
            let len = self.inner.source().len();
            return Ok(Token::new(TokenKind::Eof, Span::new(len, len)));
        }

        match self.inner.next() {
            Some(Ok(kind)) => {
                let span = self.inner.span();
                Ok(Token::new(kind, Span::new(span.start, span.end)))
            }
            Some(Err(())) => {
                let span = self.inner.span();
                Err(CompileError::lexer(
                    format!("unexpected character '{}'", self.inner.slice()),
                    Span::new(span.start, span.end),
                ))
            }
            None => {
                self.at_eof = true;
                let len = self.inner.source().len();
                Ok(Token::new(TokenKind::Eof, Span::new(len, len)))
            }
        }
    }

    /// Tokenize the entire source; the last token is always `Eof`
    pub fn tokenize_all(mut self) -> CompileResult<Vec<Token>> {
        let mut tokens = Vec::new();
        loop {
            let token = self.next_token()?;
            let is_eof = matches!(token.kind, TokenKind::Eof);
            tokens.push(token);
            if is_eof {
                break;
            }
        }
        Ok(tokens)
    }

    /// Get the source being lexed
    pub fn source(&self) -> &'a str {
        self.inner.source()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<TokenKind> {
        Lexer::new(source)
            .tokenize_all()
            .unwrap()
            .into_iter()
            .map(|t| t.kind)
            .collect()
    }

    #[test]
    fn test_qualifiers_and_keywords() {
        let source = "const uniform in out inout centroid flat invariant highp precision struct discard";
        let mut lexer = Lexer::new(source);

        assert!(matches!(lexer.next_token().unwrap().kind, TokenKind::Const));
        assert!(matches!(lexer.next_token().unwrap().kind, TokenKind::Uniform));
        assert!(matches!(lexer.next_token().unwrap().kind, TokenKind::In));
        assert!(matches!(lexer.next_token().unwrap().kind, TokenKind::Out));
        assert!(matches!(lexer.next_token().unwrap().kind, TokenKind::InOut));
        assert!(matches!(lexer.next_token().unwrap().kind, TokenKind::Centroid));
        assert!(matches!(lexer.next_token().unwrap().kind, TokenKind::Flat));
        assert!(matches!(lexer.next_token().unwrap().kind, TokenKind::Invariant));
        assert!(matches!(lexer.next_token().unwrap().kind, TokenKind::Highp));
        assert!(matches!(lexer.next_token().unwrap().kind, TokenKind::Precision));
        assert!(matches!(lexer.next_token().unwrap().kind, TokenKind::Struct));
        assert!(matches!(lexer.next_token().unwrap().kind, TokenKind::Discard));
    }

    #[test]
    fn test_type_names_are_identifiers() {
        let tokens = kinds("int vec4 mat2x3 inside");
        assert!(matches!(&tokens[0], TokenKind::Identifier(s) if s == "int"));
        assert!(matches!(&tokens[1], TokenKind::Identifier(s) if s == "vec4"));
        assert!(matches!(&tokens[2], TokenKind::Identifier(s) if s == "mat2x3"));
        assert!(matches!(&tokens[3], TokenKind::Identifier(s) if s == "inside"));
    }

    #[test]
    fn test_numeric_literals() {
        let tokens = kinds("42 0x1F 0777 3u 1.0 .5 2e3 1.5f");
        assert!(matches!(&tokens[0], TokenKind::IntLiteral(s) if s == "42"));
        assert!(matches!(&tokens[1], TokenKind::IntLiteral(s) if s == "0x1F"));
        assert!(matches!(&tokens[2], TokenKind::IntLiteral(s) if s == "0777"));
        assert!(matches!(&tokens[3], TokenKind::IntLiteral(s) if s == "3u"));
        assert!(matches!(&tokens[4], TokenKind::FloatLiteral(s) if s == "1.0"));
        assert!(matches!(&tokens[5], TokenKind::FloatLiteral(s) if s == ".5"));
        assert!(matches!(&tokens[6], TokenKind::FloatLiteral(s) if s == "2e3"));
        assert!(matches!(&tokens[7], TokenKind::FloatLiteral(s) if s == "1.5f"));
    }

    #[test]
    fn test_operators() {
        let tokens = kinds("^^ <<= >> && || != ++ .");
        assert_eq!(
            tokens,
            vec![
                TokenKind::CaretCaret,
                TokenKind::LtLtEq,
                TokenKind::GtGt,
                TokenKind::AmpAmp,
                TokenKind::PipePipe,
                TokenKind::NotEq,
                TokenKind::PlusPlus,
                TokenKind::Dot,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_comments_and_directives() {
        let tokens = kinds("#version 300 es\nfloat // line\nx /* block */ ;");
        assert_eq!(tokens.len(), 4);
        assert!(matches!(&tokens[0], TokenKind::Identifier(s) if s == "float"));
        assert!(matches!(&tokens[1], TokenKind::Identifier(s) if s == "x"));
        assert!(matches!(tokens[2], TokenKind::Semi));
    }

    #[test]
    fn test_unexpected_character() {
        let mut lexer = Lexer::new("float $x;");
        lexer.next_token().unwrap();
        assert!(matches!(lexer.next_token(), Err(CompileError::Lexer { .. })));
    }
}
