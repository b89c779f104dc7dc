//! Check pipeline: parse, bind, check

use crate::common::{CompileResult, Diagnostic};
use crate::frontend::{CheckConfig, Stage};
use crate::frontend::ast::TranslationUnit;
use crate::frontend::parser::Parser;
use crate::frontend::sema::{bind, check};

/// An annotated translation unit and everything wrong with it
#[derive(Debug)]
pub struct CheckOutput {
    pub unit: TranslationUnit,
    /// Binding and checking diagnostics in source order
    pub diagnostics: Vec<Diagnostic>,
}

impl CheckOutput {
    pub fn is_clean(&self) -> bool {
        self.diagnostics.is_empty()
    }
}

/// Parse, bind and check one translation unit
///
/// Only lexer and parser failures are errors; semantic problems are returned
/// as diagnostics alongside the annotated AST.
pub fn check_source(source: &str, stage: Stage) -> CompileResult<CheckOutput> {
    check_with_config(source, &CheckConfig { stage, ..CheckConfig::default() })
}

/// [`check_source`] with every option spelled out
pub fn check_with_config(source: &str, config: &CheckConfig) -> CompileResult<CheckOutput> {
    let stage = config.stage;
    let mut parser = Parser::new(source)?;
    let mut unit = parser.parse()?;
    log::debug!("parsed {} declarations", unit.declarations.len());

    let mut diagnostics = Vec::new();
    bind(&mut unit, &mut diagnostics);
    let bound = diagnostics.len();
    log::debug!("binding: {} diagnostics", bound);

    check(&mut unit, stage, &mut diagnostics);
    log::debug!("checking ({} stage): {} diagnostics", stage.name(), diagnostics.len() - bound);

    // Stable: binding diagnostics stay ahead of checking diagnostics at the same offset
    diagnostics.sort_by_key(|d| d.span.start);

    Ok(CheckOutput { unit, diagnostics })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::{CompileError, DiagnosticCode};

    #[test]
    fn test_diagnostics_in_source_order() {
        let source = "void f() { if (1) ; }\nvoid g() { y = 1; }";
        let output = check_source(source, Stage::None).unwrap();
        let codes: Vec<DiagnosticCode> = output.diagnostics.iter().map(|d| d.code).collect();
        assert_eq!(codes, vec![DiagnosticCode::NonBoolCondition, DiagnosticCode::UnresolvedIdentifier]);
        assert!(!output.is_clean());
    }

    #[test]
    fn test_syntax_errors_are_fatal() {
        let result = check_source("void f() { float x = ; }", Stage::None);
        assert!(matches!(result, Err(CompileError::Parser { .. })));
    }
}
