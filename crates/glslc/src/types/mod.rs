//! GLSL type system
//!
//! Structural types with nominal struct identity, plus the shape queries
//! the checker and the constant evaluator share.

mod glsl_type;

pub use glsl_type::{
    ArraySize, BasicType, SamplerDim, SamplerType, ScalarKind, StructField, StructType, Type,
    types_match,
};
