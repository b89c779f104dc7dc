//! Constant expression evaluation
//!
//! Folds constant expressions with exact 32-bit semantics: every float
//! result is rounded to f32, integers wrap modulo 2^32.

mod evaluator;
mod library;
mod value;

pub use evaluator::{LiteralError, eval, parse_float_literal, parse_int_literal};
pub use value::{Constant, Scalar, Value};
