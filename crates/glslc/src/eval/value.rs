//! Compile-time values

use std::fmt::Write;

use crate::types::{ArraySize, BasicType, ScalarKind, Type};

/// A single 32-bit component
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Scalar {
    Float(f32),
    Int(i32),
    Uint(u32),
    Bool(bool),
}

impl Scalar {
    pub fn kind(&self) -> ScalarKind {
        match self {
            Scalar::Float(_) => ScalarKind::Float,
            Scalar::Int(_) => ScalarKind::Int,
            Scalar::Uint(_) => ScalarKind::Uint,
            Scalar::Bool(_) => ScalarKind::Bool,
        }
    }

    /// Constructor conversion (`int(2.7)`, `uint(-1)`, `float(true)`, ...)
    ///
    /// Float to integer truncates toward zero and wraps modulo 2^32; signed
    /// and unsigned integers reinterpret each other's bits.
    pub fn convert(self, kind: ScalarKind) -> Scalar {
        match kind {
            ScalarKind::Float => Scalar::Float(self.as_f32()),
            ScalarKind::Int => Scalar::Int(match self {
                Scalar::Float(f) => (f as i64) as i32,
                Scalar::Int(i) => i,
                Scalar::Uint(u) => u as i32,
                Scalar::Bool(b) => i32::from(b),
            }),
            ScalarKind::Uint => Scalar::Uint(match self {
                Scalar::Float(f) => (f as i64) as u32,
                Scalar::Int(i) => i as u32,
                Scalar::Uint(u) => u,
                Scalar::Bool(b) => u32::from(b),
            }),
            ScalarKind::Bool => Scalar::Bool(self.as_bool()),
        }
    }

    pub fn as_f32(self) -> f32 {
        match self {
            Scalar::Float(f) => f,
            Scalar::Int(i) => i as f32,
            Scalar::Uint(u) => u as f32,
            Scalar::Bool(b) => {
                if b {
                    1.0
                } else {
                    0.0
                }
            }
        }
    }

    pub fn as_bool(self) -> bool {
        match self {
            Scalar::Float(f) => f != 0.0,
            Scalar::Int(i) => i != 0,
            Scalar::Uint(u) => u != 0,
            Scalar::Bool(b) => b,
        }
    }

    /// Integer value widened to i64, for indices and sizes
    pub fn as_index(self) -> Option<i64> {
        match self {
            Scalar::Int(i) => Some(i64::from(i)),
            Scalar::Uint(u) => Some(i64::from(u)),
            _ => None,
        }
    }

    fn to_glsl(self) -> String {
        match self {
            Scalar::Float(f) => float_literal(f),
            Scalar::Int(i) => i.to_string(),
            Scalar::Uint(u) => format!("{}u", u),
            Scalar::Bool(b) => b.to_string(),
        }
    }
}

/// Shortest round-tripping GLSL spelling of a float
fn float_literal(f: f32) -> String {
    if f.is_nan() {
        return "(0.0 / 0.0)".to_string();
    }
    if f.is_infinite() {
        return if f > 0.0 { "(1.0 / 0.0)" } else { "(-1.0 / 0.0)" }.to_string();
    }
    // Debug prints the shortest representation that parses back exactly
    let text = format!("{:?}", f);
    if text.contains(['.', 'e', 'E']) {
        text
    } else {
        format!("{}.0", text)
    }
}

/// A folded value
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Scalar(Scalar),
    Vector(Vec<Scalar>),
    /// Column-major
    Matrix { data: Vec<f32>, cols: u8, rows: u8 },
    /// Fields in declaration order
    Struct(Vec<(String, Value)>),
    Array(Vec<Value>),
}

impl Value {
    /// Flattened components of a scalar, vector or matrix
    pub fn components(&self) -> Vec<Scalar> {
        match self {
            Value::Scalar(s) => vec![*s],
            Value::Vector(v) => v.clone(),
            Value::Matrix { data, .. } => data.iter().map(|f| Scalar::Float(*f)).collect(),
            Value::Struct(_) | Value::Array(_) => Vec::new(),
        }
    }

    /// Shape `components` as a value of `basic`
    pub fn from_components(basic: BasicType, components: Vec<Scalar>) -> Value {
        match basic {
            BasicType::Matrix { cols, rows } => Value::Matrix {
                data: components.into_iter().map(Scalar::as_f32).collect(),
                cols,
                rows,
            },
            BasicType::Vector(..) => Value::Vector(components),
            _ => match components.first() {
                Some(s) => Value::Scalar(*s),
                None => unreachable!("scalar value without components"),
            },
        }
    }

    pub fn as_scalar(&self) -> Option<Scalar> {
        match self {
            Value::Scalar(s) => Some(*s),
            _ => None,
        }
    }

    /// Column `c` of a matrix as a vector
    pub fn column(&self, c: usize) -> Option<Value> {
        match self {
            Value::Matrix { data, cols, rows } if c < *cols as usize => {
                let rows = *rows as usize;
                let column = data[c * rows..(c + 1) * rows].iter().map(|f| Scalar::Float(*f));
                Some(Value::Vector(column.collect()))
            }
            _ => None,
        }
    }
}

/// A folded constant together with its type
#[derive(Debug, Clone, PartialEq)]
pub struct Constant {
    pub ty: Type,
    pub value: Value,
}

impl Constant {
    pub fn new(ty: Type, value: Value) -> Self {
        Self { ty, value }
    }

    pub fn scalar(value: Scalar) -> Self {
        Self {
            ty: Type::scalar(value.kind()),
            value: Value::Scalar(value),
        }
    }

    /// GLSL source that evaluates back to this constant
    pub fn to_glsl(&self) -> String {
        let mut out = String::new();
        write_value(&mut out, &self.ty, &self.value);
        out
    }
}

fn type_name(ty: &Type) -> String {
    match ty {
        Type::Basic(b) => b.to_string(),
        Type::Struct(s) => s.name.clone().unwrap_or_default(),
        Type::Array { of, size: ArraySize::Sized(n) } => format!("{}[{}]", type_name(of), n),
        Type::Array { of, size: ArraySize::Unsized } => format!("{}[]", type_name(of)),
    }
}

fn write_value(out: &mut String, ty: &Type, value: &Value) {
    match (ty, value) {
        (_, Value::Scalar(s)) => out.push_str(&s.to_glsl()),
        (_, Value::Vector(_) | Value::Matrix { .. }) => {
            let parts: Vec<String> = value.components().into_iter().map(Scalar::to_glsl).collect();
            let _ = write!(out, "{}({})", type_name(ty), parts.join(", "));
        }
        (Type::Struct(s), Value::Struct(fields)) => {
            let _ = write!(out, "{}(", type_name(ty));
            for (i, (field, (_, v))) in s.fields.iter().zip(fields).enumerate() {
                if i > 0 {
                    out.push_str(", ");
                }
                write_value(out, &field.ty, v);
            }
            out.push(')');
        }
        (Type::Array { of, .. }, Value::Array(elements)) => {
            let _ = write!(out, "{}(", type_name(ty));
            for (i, element) in elements.iter().enumerate() {
                if i > 0 {
                    out.push_str(", ");
                }
                write_value(out, of, element);
            }
            out.push(')');
        }
        _ => unreachable!("constant value does not match its type"),
    }
}
