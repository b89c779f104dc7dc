//! Error types and diagnostic reporting

use codespan_reporting::diagnostic::{Diagnostic as Report, Label};
use codespan_reporting::files::{self, SimpleFiles};
use codespan_reporting::term;
use codespan_reporting::term::termcolor::{ColorChoice, StandardStream};
use thiserror::Error;
use super::{Diagnostic, Span};

/// Fatal front-end error with source location
#[derive(Error, Debug)]
pub enum CompileError {
    #[error("Lexer error at {span:?}: {message}")]
    Lexer { message: String, span: Span },

    #[error("Parser error at {span:?}: {message}")]
    Parser { message: String, span: Span },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl CompileError {
    pub fn lexer(message: impl Into<String>, span: Span) -> Self {
        Self::Lexer {
            message: message.into(),
            span,
        }
    }

    pub fn parser(message: impl Into<String>, span: Span) -> Self {
        Self::Parser {
            message: message.into(),
            span,
        }
    }

    pub fn span(&self) -> Option<Span> {
        match self {
            CompileError::Lexer { span, .. } | CompileError::Parser { span, .. } => Some(*span),
            CompileError::Io(_) => None,
        }
    }
}

pub type CompileResult<T> = Result<T, CompileError>;

/// Diagnostic reporter for pretty error output
pub struct DiagnosticReporter {
    files: SimpleFiles<String, String>,
    writer: StandardStream,
    config: term::Config,
}

impl DiagnosticReporter {
    pub fn new() -> Self {
        Self {
            files: SimpleFiles::new(),
            writer: StandardStream::stderr(ColorChoice::Auto),
            config: term::Config::default(),
        }
    }

    pub fn add_file(&mut self, name: impl Into<String>, source: impl Into<String>) -> usize {
        self.files.add(name.into(), source.into())
    }

    pub fn report_error(&self, file_id: usize, error: &CompileError) -> Result<(), files::Error> {
        let report = match error {
            CompileError::Lexer { message, span } => Report::error()
                .with_message("Lexer error")
                .with_labels(vec![
                    Label::primary(file_id, span.start..span.end).with_message(message)
                ]),

            CompileError::Parser { message, span } => Report::error()
                .with_message("Syntax error")
                .with_labels(vec![
                    Label::primary(file_id, span.start..span.end).with_message(message)
                ]),

            CompileError::Io(err) => {
                Report::error().with_message(format!("IO error: {}", err))
            }
        };

        term::emit(&mut self.writer.lock(), &self.config, &self.files, &report)
    }

    /// Render one accumulated semantic diagnostic
    pub fn report_diagnostic(&self, file_id: usize, diagnostic: &Diagnostic) -> Result<(), files::Error> {
        let title = if diagnostic.code.is_binding() {
            "Binding error"
        } else {
            "Semantic error"
        };
        let span = diagnostic.span;
        let report = Report::error()
            .with_message(title)
            .with_code(diagnostic.code.as_str())
            .with_labels(vec![
                Label::primary(file_id, span.start..span.end).with_message(&diagnostic.message)
            ]);

        term::emit(&mut self.writer.lock(), &self.config, &self.files, &report)
    }
}

impl Default for DiagnosticReporter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::DiagnosticCode;

    #[test]
    fn test_reporter_surfaces_render_failures() {
        let mut reporter = DiagnosticReporter::new();
        let file_id = reporter.add_file("shader.frag", "void main() { if (1) ; }");
        let diagnostic = Diagnostic::new(DiagnosticCode::NonBoolCondition, "condition must be bool", Span::new(18, 19));

        assert!(reporter.report_diagnostic(file_id, &diagnostic).is_ok());
        assert!(matches!(
            reporter.report_diagnostic(file_id + 1, &diagnostic),
            Err(files::Error::FileMissing)
        ));

        let error = CompileError::parser("expected ';'", Span::new(0, 4));
        assert!(reporter.report_error(file_id, &error).is_ok());
    }
}
