//! Abstract Syntax Tree definitions
//!
//! Nodes carry fixed annotation slots (`ty`, `binding`, `constructor`) that
//! start empty and are filled by the binder and checker.

mod types;
mod expr;
mod stmt;
mod decl;

pub use types::*;
pub use expr::*;
pub use stmt::*;
pub use decl::*;

/// A complete translation unit (one shader stage source)
#[derive(Debug, Clone)]
pub struct TranslationUnit {
    pub declarations: Vec<Declaration>,
}

impl TranslationUnit {
    pub fn new(declarations: Vec<Declaration>) -> Self {
        Self { declarations }
    }
}
