//! Common infrastructure shared by every phase

mod diagnostic;
mod error;
mod span;

pub use diagnostic::{Diagnostic, DiagnosticCode};
pub use error::{CompileError, CompileResult, DiagnosticReporter};
pub use span::Span;
