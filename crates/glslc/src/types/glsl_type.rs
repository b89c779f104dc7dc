//! Type representations and shape queries

use std::fmt;
use std::sync::Arc;

use crate::common::Span;

/// Element kind of a scalar or vector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScalarKind {
    Bool,
    Int,
    Uint,
    Float,
}

impl ScalarKind {
    pub fn name(&self) -> &'static str {
        match self {
            ScalarKind::Bool => "bool",
            ScalarKind::Int => "int",
            ScalarKind::Uint => "uint",
            ScalarKind::Float => "float",
        }
    }

    /// Prefix used by vector type names (`vec`, `ivec`, `uvec`, `bvec`)
    fn vector_prefix(&self) -> &'static str {
        match self {
            ScalarKind::Bool => "b",
            ScalarKind::Int => "i",
            ScalarKind::Uint => "u",
            ScalarKind::Float => "",
        }
    }

    pub fn is_integer(&self) -> bool {
        matches!(self, ScalarKind::Int | ScalarKind::Uint)
    }

    pub fn is_numeric(&self) -> bool {
        !matches!(self, ScalarKind::Bool)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SamplerDim {
    Tex2D,
    Tex3D,
    Cube,
    Tex2DArray,
}

/// Opaque sampler type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SamplerType {
    pub dim: SamplerDim,
    /// Component kind returned by lookups (float, int or uint)
    pub sampled: ScalarKind,
    pub shadow: bool,
}

/// Elementary types built into the language
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BasicType {
    Void,
    Scalar(ScalarKind),
    /// Vector of 2..=4 components
    Vector(ScalarKind, u8),
    /// Float matrix with `cols` columns of `rows` components
    Matrix { cols: u8, rows: u8 },
    Sampler(SamplerType),
}

impl BasicType {
    /// Parse a basic type keyword (`vec3`, `mat2x4`, `usampler2D`, ...)
    pub fn from_name(name: &str) -> Option<BasicType> {
        let sampler = |dim, sampled, shadow| {
            BasicType::Sampler(SamplerType { dim, sampled, shadow })
        };
        let basic = match name {
            "void" => BasicType::Void,
            "bool" => BasicType::Scalar(ScalarKind::Bool),
            "int" => BasicType::Scalar(ScalarKind::Int),
            "uint" => BasicType::Scalar(ScalarKind::Uint),
            "float" => BasicType::Scalar(ScalarKind::Float),
            "sampler2D" => sampler(SamplerDim::Tex2D, ScalarKind::Float, false),
            "sampler3D" => sampler(SamplerDim::Tex3D, ScalarKind::Float, false),
            "samplerCube" => sampler(SamplerDim::Cube, ScalarKind::Float, false),
            "sampler2DArray" => sampler(SamplerDim::Tex2DArray, ScalarKind::Float, false),
            "sampler2DShadow" => sampler(SamplerDim::Tex2D, ScalarKind::Float, true),
            "samplerCubeShadow" => sampler(SamplerDim::Cube, ScalarKind::Float, true),
            "sampler2DArrayShadow" => sampler(SamplerDim::Tex2DArray, ScalarKind::Float, true),
            "isampler2D" => sampler(SamplerDim::Tex2D, ScalarKind::Int, false),
            "isampler3D" => sampler(SamplerDim::Tex3D, ScalarKind::Int, false),
            "isamplerCube" => sampler(SamplerDim::Cube, ScalarKind::Int, false),
            "isampler2DArray" => sampler(SamplerDim::Tex2DArray, ScalarKind::Int, false),
            "usampler2D" => sampler(SamplerDim::Tex2D, ScalarKind::Uint, false),
            "usampler3D" => sampler(SamplerDim::Tex3D, ScalarKind::Uint, false),
            "usamplerCube" => sampler(SamplerDim::Cube, ScalarKind::Uint, false),
            "usampler2DArray" => sampler(SamplerDim::Tex2DArray, ScalarKind::Uint, false),
            _ => return Self::vector_or_matrix(name),
        };
        Some(basic)
    }

    fn vector_or_matrix(name: &str) -> Option<BasicType> {
        fn dim(digit: u8) -> Option<u8> {
            matches!(digit, b'2'..=b'4').then(|| digit - b'0')
        }

        if let Some(dims) = name.strip_prefix("mat") {
            return match dims.as_bytes() {
                [n] => dim(*n).map(|n| BasicType::Matrix { cols: n, rows: n }),
                [c, b'x', r] => Some(BasicType::Matrix { cols: dim(*c)?, rows: dim(*r)? }),
                _ => None,
            };
        }

        let (kind, rest) = [
            ("ivec", ScalarKind::Int),
            ("uvec", ScalarKind::Uint),
            ("bvec", ScalarKind::Bool),
            ("vec", ScalarKind::Float),
        ]
        .iter()
        .find_map(|(prefix, kind)| name.strip_prefix(prefix).map(|rest| (*kind, rest)))?;

        match rest.as_bytes() {
            [n] => dim(*n).map(|n| BasicType::Vector(kind, n)),
            _ => None,
        }
    }

    /// Every non-opaque, non-void basic type
    pub fn all_values() -> Vec<BasicType> {
        let kinds = [ScalarKind::Bool, ScalarKind::Int, ScalarKind::Uint, ScalarKind::Float];
        let mut all: Vec<BasicType> = kinds.iter().map(|k| BasicType::Scalar(*k)).collect();
        for kind in kinds {
            for n in 2..=4 {
                all.push(BasicType::Vector(kind, n));
            }
        }
        for cols in 2..=4 {
            for rows in 2..=4 {
                all.push(BasicType::Matrix { cols, rows });
            }
        }
        all
    }

    /// Scalar or vector of `kind` with `n` components
    pub fn with_components(kind: ScalarKind, n: u8) -> BasicType {
        if n == 1 {
            BasicType::Scalar(kind)
        } else {
            BasicType::Vector(kind, n)
        }
    }

    /// Scalar element kind (float for matrices)
    pub fn component_kind(&self) -> Option<ScalarKind> {
        match self {
            BasicType::Scalar(kind) | BasicType::Vector(kind, _) => Some(*kind),
            BasicType::Matrix { .. } => Some(ScalarKind::Float),
            BasicType::Void | BasicType::Sampler(_) => None,
        }
    }

    pub fn component_count(&self) -> usize {
        match self {
            BasicType::Scalar(_) => 1,
            BasicType::Vector(_, n) => *n as usize,
            BasicType::Matrix { cols, rows } => (*cols as usize) * (*rows as usize),
            BasicType::Void | BasicType::Sampler(_) => 0,
        }
    }
}

impl fmt::Display for BasicType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BasicType::Void => f.write_str("void"),
            BasicType::Scalar(kind) => f.write_str(kind.name()),
            BasicType::Vector(kind, n) => write!(f, "{}vec{}", kind.vector_prefix(), n),
            BasicType::Matrix { cols, rows } if cols == rows => write!(f, "mat{}", cols),
            BasicType::Matrix { cols, rows } => write!(f, "mat{}x{}", cols, rows),
            BasicType::Sampler(s) => {
                let prefix = match s.sampled {
                    ScalarKind::Int => "i",
                    ScalarKind::Uint => "u",
                    _ => "",
                };
                let dim = match s.dim {
                    SamplerDim::Tex2D => "2D",
                    SamplerDim::Tex3D => "3D",
                    SamplerDim::Cube => "Cube",
                    SamplerDim::Tex2DArray => "2DArray",
                };
                let shadow = if s.shadow { "Shadow" } else { "" };
                write!(f, "{}sampler{}{}", prefix, dim, shadow)
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArraySize {
    Sized(u32),
    Unsized,
}

/// Struct declaration shared by every type that names it
#[derive(Debug)]
pub struct StructType {
    pub name: Option<String>,
    pub fields: Vec<StructField>,
    pub span: Span,
}

impl StructType {
    pub fn field(&self, name: &str) -> Option<&StructField> {
        self.fields.iter().find(|f| f.name == name)
    }
}

#[derive(Debug, Clone)]
pub struct StructField {
    pub name: String,
    pub ty: Type,
    pub span: Span,
}

/// A fully resolved GLSL type
#[derive(Debug, Clone)]
pub enum Type {
    Basic(BasicType),
    Array { of: Box<Type>, size: ArraySize },
    /// Nominal: two struct types are equal only if they share a declaration
    Struct(Arc<StructType>),
}

impl PartialEq for Type {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Type::Basic(a), Type::Basic(b)) => a == b,
            (Type::Array { of: a, size: sa }, Type::Array { of: b, size: sb }) => {
                sa == sb && a == b
            }
            (Type::Struct(a), Type::Struct(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl Eq for Type {}

/// Equality over possibly-unknown types; unknown never matches anything
pub fn types_match(a: Option<&Type>, b: Option<&Type>) -> bool {
    matches!((a, b), (Some(a), Some(b)) if a == b)
}

impl Type {
    pub fn void() -> Type {
        Type::Basic(BasicType::Void)
    }

    pub fn boolean() -> Type {
        Type::Basic(BasicType::Scalar(ScalarKind::Bool))
    }

    pub fn int() -> Type {
        Type::Basic(BasicType::Scalar(ScalarKind::Int))
    }

    pub fn uint() -> Type {
        Type::Basic(BasicType::Scalar(ScalarKind::Uint))
    }

    pub fn float() -> Type {
        Type::Basic(BasicType::Scalar(ScalarKind::Float))
    }

    pub fn scalar(kind: ScalarKind) -> Type {
        Type::Basic(BasicType::Scalar(kind))
    }

    /// Scalar when `n == 1`, vector otherwise
    pub fn vector(kind: ScalarKind, n: u8) -> Type {
        Type::Basic(BasicType::with_components(kind, n))
    }

    pub fn matrix(cols: u8, rows: u8) -> Type {
        Type::Basic(BasicType::Matrix { cols, rows })
    }

    pub fn array(of: Type, size: u32) -> Type {
        Type::Array { of: Box::new(of), size: ArraySize::Sized(size) }
    }

    pub fn basic(&self) -> Option<BasicType> {
        match self {
            Type::Basic(b) => Some(*b),
            _ => None,
        }
    }

    pub fn is_void(&self) -> bool {
        matches!(self, Type::Basic(BasicType::Void))
    }

    pub fn is_scalar(&self) -> bool {
        matches!(self, Type::Basic(BasicType::Scalar(_)))
    }

    pub fn is_vector(&self) -> bool {
        matches!(self, Type::Basic(BasicType::Vector(..)))
    }

    pub fn is_matrix(&self) -> bool {
        matches!(self, Type::Basic(BasicType::Matrix { .. }))
    }

    pub fn is_array(&self) -> bool {
        matches!(self, Type::Array { .. })
    }

    pub fn is_struct(&self) -> bool {
        matches!(self, Type::Struct(_))
    }

    pub fn is_bool(&self) -> bool {
        self.scalar_kind() == Some(ScalarKind::Bool)
    }

    /// Kind of a scalar type
    pub fn scalar_kind(&self) -> Option<ScalarKind> {
        match self {
            Type::Basic(BasicType::Scalar(kind)) => Some(*kind),
            _ => None,
        }
    }

    /// Component count of a vector, 0 for anything else
    pub fn vector_size(&self) -> u8 {
        match self {
            Type::Basic(BasicType::Vector(_, n)) => *n,
            _ => 0,
        }
    }

    pub fn vector_element_type(&self) -> Option<ScalarKind> {
        match self {
            Type::Basic(BasicType::Vector(kind, _)) => Some(*kind),
            _ => None,
        }
    }

    /// `(cols, rows)` of a matrix
    pub fn matrix_dims(&self) -> Option<(u8, u8)> {
        match self {
            Type::Basic(BasicType::Matrix { cols, rows }) => Some((*cols, *rows)),
            _ => None,
        }
    }

    /// Scalar components held by a scalar, vector or matrix; 0 otherwise
    pub fn component_count(&self) -> usize {
        self.basic().map_or(0, |b| b.component_count())
    }

    /// Scalar element: the kind itself for scalars/vectors, float for matrices
    pub fn component_type(&self) -> Option<ScalarKind> {
        self.basic().and_then(|b| b.component_kind())
    }

    pub fn element_type(&self) -> Option<&Type> {
        match self {
            Type::Array { of, .. } => Some(of),
            _ => None,
        }
    }

    pub fn array_size(&self) -> Option<u32> {
        match self {
            Type::Array { size: ArraySize::Sized(n), .. } => Some(*n),
            _ => None,
        }
    }

    /// Value of `.length()`: elements of a sized array, components of a
    /// vector, columns of a matrix
    pub fn length(&self) -> Option<u32> {
        match self {
            Type::Array { size: ArraySize::Sized(n), .. } => Some(*n),
            Type::Basic(BasicType::Vector(_, n)) => Some(u32::from(*n)),
            Type::Basic(BasicType::Matrix { cols, .. }) => Some(u32::from(*cols)),
            _ => None,
        }
    }

    /// True for samplers and aggregates containing them
    pub fn is_opaque(&self) -> bool {
        match self {
            Type::Basic(BasicType::Sampler(_)) => true,
            Type::Basic(_) => false,
            Type::Array { of, .. } => of.is_opaque(),
            Type::Struct(s) => s.fields.iter().any(|f| f.ty.is_opaque()),
        }
    }

    /// Innermost non-array type
    pub fn base(&self) -> &Type {
        match self {
            Type::Array { of, .. } => of.base(),
            other => other,
        }
    }
}

impl From<BasicType> for Type {
    fn from(basic: BasicType) -> Self {
        Type::Basic(basic)
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::Basic(b) => write!(f, "{}", b),
            Type::Array { of, size: ArraySize::Sized(n) } => write!(f, "{}[{}]", of, n),
            Type::Array { of, size: ArraySize::Unsized } => write!(f, "{}[]", of),
            Type::Struct(s) => match &s.name {
                Some(name) => write!(f, "struct {}", name),
                None => f.write_str("anonymous struct"),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn point(name: &str) -> Arc<StructType> {
        Arc::new(StructType {
            name: Some(name.to_string()),
            fields: vec![StructField { name: "x".to_string(), ty: Type::float(), span: Span::default() }],
            span: Span::default(),
        })
    }

    #[test]
    fn test_basic_names_round_trip() {
        for basic in BasicType::all_values() {
            assert_eq!(BasicType::from_name(&basic.to_string()), Some(basic));
        }
        assert_eq!(BasicType::from_name("mat2x2"), Some(BasicType::Matrix { cols: 2, rows: 2 }));
        assert_eq!(BasicType::from_name("mat3x2"), Some(BasicType::Matrix { cols: 3, rows: 2 }));
        assert_eq!(BasicType::from_name("vec5"), None);
        assert_eq!(BasicType::from_name("mat1"), None);
        assert_eq!(BasicType::from_name("isampler2DArray").map(|b| b.to_string()), Some("isampler2DArray".to_string()));
    }

    #[test]
    fn test_length_of_shapes() {
        assert_eq!(Type::array(Type::float(), 5).length(), Some(5));
        assert_eq!(Type::vector(ScalarKind::Bool, 2).length(), Some(2));
        assert_eq!(Type::matrix(4, 2).length(), Some(4));
        assert_eq!(Type::float().length(), None);
        let unsized_array = Type::Array { of: Box::new(Type::float()), size: ArraySize::Unsized };
        assert_eq!(unsized_array.length(), None);
    }

    #[test]
    fn test_shape_queries() {
        let m = Type::matrix(3, 2);
        assert_eq!(m.matrix_dims(), Some((3, 2)));
        assert_eq!(m.component_count(), 6);
        assert_eq!(m.component_type(), Some(ScalarKind::Float));
        assert_eq!(m.to_string(), "mat3x2");

        let v = Type::vector(ScalarKind::Uint, 3);
        assert_eq!(v.vector_size(), 3);
        assert_eq!(v.vector_element_type(), Some(ScalarKind::Uint));
        assert_eq!(Type::vector(ScalarKind::Int, 1), Type::int());
        assert_eq!(Type::float().vector_size(), 0);
    }

    #[test]
    fn test_struct_equality_is_nominal() {
        let a = point("P");
        let b = point("P");
        assert_eq!(Type::Struct(Arc::clone(&a)), Type::Struct(Arc::clone(&a)));
        assert_ne!(Type::Struct(a), Type::Struct(b));
    }

    #[test]
    fn test_array_equality_and_display() {
        assert_eq!(Type::array(Type::float(), 3), Type::array(Type::float(), 3));
        assert_ne!(Type::array(Type::float(), 3), Type::array(Type::float(), 4));
        assert_ne!(Type::array(Type::float(), 3), Type::array(Type::int(), 3));
        assert_eq!(Type::array(Type::Struct(point("T")), 3).to_string(), "struct T[3]");
        let anon = Arc::new(StructType { name: None, fields: Vec::new(), span: Span::default() });
        assert_eq!(Type::Struct(anon).to_string(), "anonymous struct");
    }

    #[test]
    fn test_unknown_never_matches() {
        let f = Type::float();
        assert!(types_match(Some(&f), Some(&Type::float())));
        assert!(!types_match(None, Some(&f)));
        assert!(!types_match(None, None));
    }
}
