//! GLSL ES 3.00 front end
//!
//! 1. Lexing source code into tokens
//! 2. Parsing tokens into an AST
//! 3. Binding names to declarations
//! 4. Checking types and language rules

pub mod ast;
pub mod lexer;
pub mod parser;
pub mod sema;

pub use lexer::{Lexer, Token, TokenKind};
pub use parser::Parser;

/// Shader stage gating stage-specific rules
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Stage {
    Vertex,
    Fragment,
    /// Only rules common to every stage
    #[default]
    None,
}

impl Stage {
    /// Stage implied by a file extension (`vert`, `frag`)
    pub fn from_extension(ext: &str) -> Stage {
        match ext {
            "vert" | "vs" => Stage::Vertex,
            "frag" | "fs" => Stage::Fragment,
            _ => Stage::None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Stage::Vertex => "vertex",
            Stage::Fragment => "fragment",
            Stage::None => "none",
        }
    }
}

/// Options for one check of one translation unit
#[derive(Debug, Clone, Default)]
pub struct CheckConfig {
    pub stage: Stage,
    pub dump_ast: bool,
    pub verbose: bool,
}
