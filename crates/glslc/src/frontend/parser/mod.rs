//! Parser module
//!
//! Recursive descent over a buffered token stream.

mod parser;

pub use parser::Parser;
