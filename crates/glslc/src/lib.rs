//! GLSLC - semantic analysis for GLSL ES 3.00
//!
//! Turns shader source into a fully typed AST or a list of diagnostics.
//!
//! ## Architecture
//!
//! - **Common** (`common/`): Spans, fatal errors and accumulated diagnostics
//! - **Types** (`types/`): The GLSL type system
//! - **Frontend** (`frontend/`): Lexer, parser, binder and checker
//! - **Eval** (`eval/`): Constant folding with exact 32-bit semantics
//! - **Driver** (`driver/`): The parse, bind, check pipeline

pub mod common;
pub mod types;
pub mod frontend;
pub mod eval;
pub mod driver;

// Re-exports for convenience
pub use common::{CompileError, CompileResult, Diagnostic, DiagnosticCode, DiagnosticReporter, Span};
pub use driver::{CheckOutput, check_source, check_with_config};
pub use frontend::{CheckConfig, Stage};
