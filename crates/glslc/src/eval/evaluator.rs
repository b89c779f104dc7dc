//! Constant expression evaluator
//!
//! `eval` folds an expression to a typed value, or returns `None` when the
//! expression is not a compile-time constant. The binder folds array sizes
//! before the checker runs, so unchecked input must yield `None` rather than
//! panic; only states the operator relation rules out are `unreachable!`.

use thiserror::Error;

use super::library;
use super::value::{Constant, Scalar, Value};
use crate::common::DiagnosticCode;
use crate::frontend::ast::{BinaryOp, Expr, ExprKind, UnaryOp};
use crate::frontend::sema::operators::{binary_rule, swizzle_indices, unary_rule};
use crate::types::{ArraySize, BasicType, ScalarKind, Type};

/// Why an integer literal has no value
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LiteralError {
    #[error("invalid digit '{digit}' in integer literal '{literal}'")]
    InvalidDigit { literal: String, digit: char },

    #[error("integer literal '{0}' has no digits")]
    NoDigits(String),

    #[error("integer literal '{0}' does not fit in 32 bits")]
    Overflow(String),
}

impl LiteralError {
    pub fn code(&self) -> DiagnosticCode {
        match self {
            LiteralError::Overflow(_) => DiagnosticCode::IntegerOverflow,
            LiteralError::InvalidDigit { .. } | LiteralError::NoDigits(_) => {
                DiagnosticCode::MalformedLiteral
            }
        }
    }
}

/// Parse an integer literal as written (`42`, `0x1F`, `017`, `3u`)
///
/// A value above `0xFFFFFFFF` is an error; signed literals wrap into `int`.
pub fn parse_int_literal(text: &str) -> Result<Scalar, LiteralError> {
    let (digits, unsigned) = match text.strip_suffix(['u', 'U']) {
        Some(digits) => (digits, true),
        None => (text, false),
    };

    let (digits, radix) = if let Some(hex) = digits.strip_prefix("0x").or_else(|| digits.strip_prefix("0X")) {
        (hex, 16)
    } else if digits.len() > 1 && digits.starts_with('0') {
        (&digits[1..], 8)
    } else {
        (digits, 10)
    };

    if digits.is_empty() {
        return Err(LiteralError::NoDigits(text.to_string()));
    }
    if let Some(digit) = digits.chars().find(|c| !c.is_digit(radix)) {
        return Err(LiteralError::InvalidDigit { literal: text.to_string(), digit });
    }

    // Every digit is valid, so the only remaining failure is u64 overflow
    let value = u64::from_str_radix(digits, radix).unwrap_or(u64::MAX);
    if value > 0xFFFF_FFFF {
        return Err(LiteralError::Overflow(text.to_string()));
    }

    let value = value as u32;
    Ok(if unsigned {
        Scalar::Uint(value)
    } else {
        Scalar::Int(value as i32)
    })
}

/// Parse a float literal as written (`1.0`, `.5e2`, `2.0f`)
pub fn parse_float_literal(text: &str) -> Option<f32> {
    text.trim_end_matches(['f', 'F']).parse::<f32>().ok()
}

/// Fold `expr` to a constant
pub fn eval(expr: &Expr) -> Option<Constant> {
    match &expr.kind {
        ExprKind::IntLiteral(text) => parse_int_literal(text).ok().map(Constant::scalar),
        ExprKind::FloatLiteral(text) => {
            parse_float_literal(text).map(|f| Constant::scalar(Scalar::Float(f)))
        }
        ExprKind::BoolLiteral(b) => Some(Constant::scalar(Scalar::Bool(*b))),

        ExprKind::Variable { binding, .. } => binding.as_ref()?.constant.clone(),

        ExprKind::Unary { op, operand } => unary(*op, &eval(operand)?),
        ExprKind::Binary { op, left, right } => binary(*op, &eval(left)?, &eval(right)?),

        ExprKind::Ternary { condition, then_expr, else_expr } => {
            let condition = eval(condition)?;
            let then_value = eval(then_expr)?;
            let else_value = eval(else_expr)?;
            if then_value.ty != else_value.ty {
                return None;
            }
            match condition.value {
                Value::Scalar(Scalar::Bool(true)) => Some(then_value),
                Value::Scalar(Scalar::Bool(false)) => Some(else_value),
                _ => None,
            }
        }

        ExprKind::Call { args, binding, constructor, .. } => {
            let args: Vec<Constant> = args.iter().map(eval).collect::<Option<_>>()?;
            if let Some(ty) = constructor {
                return construct(ty, &args);
            }

            // User functions are never constant
            let function = binding.as_ref().filter(|f| f.builtin)?;
            let types: Vec<Option<&Type>> = args.iter().map(|a| Some(&a.ty)).collect();
            let overload = function.find_overload(&types)?;
            if overload.params.iter().any(|p| p.qualifier.is_output()) {
                return None;
            }
            let result = overload.result.clone()?;
            let values: Vec<Value> = args.into_iter().map(|a| a.value).collect();
            let value = library::call(&function.name, &values)?;
            Some(Constant::new(result, value))
        }

        ExprKind::Field { object, field } => field_access(eval(object)?, field),
        ExprKind::Index { array, index } => index_access(eval(array)?, &eval(index)?),

        ExprKind::Length(operand) => {
            let length = static_type(operand)?.length()?;
            Some(Constant::scalar(Scalar::Int(length as i32)))
        }

        ExprKind::Update { .. } | ExprKind::Assign { .. } | ExprKind::Comma { .. } => None,
    }
}

/// Type of an expression that need not itself be constant
fn static_type(expr: &Expr) -> Option<Type> {
    expr.ty
        .clone()
        .or_else(|| expr.kind.variable_binding().and_then(|b| b.ty.clone()))
        .or_else(|| eval(expr).map(|c| c.ty))
}

fn unary(op: UnaryOp, operand: &Constant) -> Option<Constant> {
    let result = unary_rule(op, operand.ty.basic()?)?;

    let components = operand
        .value
        .components()
        .into_iter()
        .map(|s| match (op, s) {
            (UnaryOp::Plus, s) => s,
            (UnaryOp::Neg, Scalar::Float(f)) => Scalar::Float(-f),
            (UnaryOp::Neg, Scalar::Int(i)) => Scalar::Int(i.wrapping_neg()),
            (UnaryOp::Neg, Scalar::Uint(u)) => Scalar::Uint(u.wrapping_neg()),
            (UnaryOp::Not, Scalar::Bool(b)) => Scalar::Bool(!b),
            (UnaryOp::BitNot, Scalar::Int(i)) => Scalar::Int(!i),
            (UnaryOp::BitNot, Scalar::Uint(u)) => Scalar::Uint(!u),
            (op, s) => unreachable!("unary '{}' accepted for {:?}", op.as_str(), s),
        })
        .collect();

    Some(Constant::new(result.into(), Value::from_components(result, components)))
}

fn binary(op: BinaryOp, lhs: &Constant, rhs: &Constant) -> Option<Constant> {
    let (Some(lb), Some(rb)) = (lhs.ty.basic(), rhs.ty.basic()) else {
        // Arrays and structs only compare for equality
        if op.is_equality() && lhs.ty == rhs.ty && !lhs.ty.is_opaque() {
            let equal = lhs.value == rhs.value;
            return Some(Constant::scalar(Scalar::Bool(equal == (op == BinaryOp::Eq))));
        }
        return None;
    };

    let result = binary_rule(op, lb, rb)?;

    let value = match op {
        BinaryOp::Eq | BinaryOp::Ne => {
            let equal = lhs.value == rhs.value;
            Value::Scalar(Scalar::Bool(equal == (op == BinaryOp::Eq)))
        }
        BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge => {
            let (Value::Scalar(a), Value::Scalar(b)) = (&lhs.value, &rhs.value) else {
                unreachable!("relational operator accepted for non-scalars");
            };
            Value::Scalar(Scalar::Bool(compare(op, *a, *b)))
        }
        BinaryOp::LogAnd | BinaryOp::LogXor | BinaryOp::LogOr => {
            let (a, b) = (lhs.value.as_scalar()?.as_bool(), rhs.value.as_scalar()?.as_bool());
            let folded = match op {
                BinaryOp::LogAnd => a && b,
                BinaryOp::LogOr => a || b,
                _ => a != b,
            };
            Value::Scalar(Scalar::Bool(folded))
        }
        BinaryOp::Mul if is_linear_algebra(lb, rb) => {
            matrix_product(&lhs.value, lb, &rhs.value, rb, result)
        }
        _ => {
            let (a, b) = (lhs.value.components(), rhs.value.components());
            let width = a.len().max(b.len());
            let mut components = Vec::with_capacity(width);
            for i in 0..width {
                let x = if a.len() == 1 { a[0] } else { a[i] };
                let y = if b.len() == 1 { b[0] } else { b[i] };
                components.push(scalar_binary(op, x, y)?);
            }
            Value::from_components(result, components)
        }
    };

    Some(Constant::new(result.into(), value))
}

fn compare(op: BinaryOp, a: Scalar, b: Scalar) -> bool {
    let ordering = match (a, b) {
        (Scalar::Float(x), Scalar::Float(y)) => x.partial_cmp(&y),
        (Scalar::Int(x), Scalar::Int(y)) => Some(x.cmp(&y)),
        (Scalar::Uint(x), Scalar::Uint(y)) => Some(x.cmp(&y)),
        _ => unreachable!("relational operator accepted for {:?} and {:?}", a, b),
    };
    // NaN compares false under every ordering
    ordering.is_some_and(|o| match op {
        BinaryOp::Lt => o.is_lt(),
        BinaryOp::Le => o.is_le(),
        BinaryOp::Gt => o.is_gt(),
        _ => o.is_ge(),
    })
}

/// One component of an arithmetic, bitwise or shift operator
///
/// Integer division by zero is not a constant.
fn scalar_binary(op: BinaryOp, a: Scalar, b: Scalar) -> Option<Scalar> {
    use Scalar::{Float, Int, Uint};

    if matches!(op, BinaryOp::Shl | BinaryOp::Shr) {
        let amount = match b {
            Int(i) => i as u32,
            Uint(u) => u,
            _ => unreachable!("shift amount {:?}", b),
        };
        let left = op == BinaryOp::Shl;
        return Some(match a {
            Int(x) if left => Int(x.wrapping_shl(amount)),
            Int(x) => Int(x.wrapping_shr(amount)),
            Uint(x) if left => Uint(x.wrapping_shl(amount)),
            Uint(x) => Uint(x.wrapping_shr(amount)),
            _ => unreachable!("shift of {:?}", a),
        });
    }

    let result = match (a, b) {
        (Float(x), Float(y)) => Float(match op {
            BinaryOp::Add => x + y,
            BinaryOp::Sub => x - y,
            BinaryOp::Mul => x * y,
            BinaryOp::Div => x / y,
            _ => unreachable!("float operator '{}'", op.as_str()),
        }),
        (Int(x), Int(y)) => Int(match op {
            BinaryOp::Add => x.wrapping_add(y),
            BinaryOp::Sub => x.wrapping_sub(y),
            BinaryOp::Mul => x.wrapping_mul(y),
            BinaryOp::Div if y == 0 => return None,
            BinaryOp::Div => x.wrapping_div(y),
            BinaryOp::Mod if y == 0 => return None,
            BinaryOp::Mod => x.wrapping_rem(y).wrapping_add(y).wrapping_rem(y),
            BinaryOp::BitAnd => x & y,
            BinaryOp::BitOr => x | y,
            BinaryOp::BitXor => x ^ y,
            _ => unreachable!("int operator '{}'", op.as_str()),
        }),
        (Uint(x), Uint(y)) => Uint(match op {
            BinaryOp::Add => x.wrapping_add(y),
            BinaryOp::Sub => x.wrapping_sub(y),
            BinaryOp::Mul => x.wrapping_mul(y),
            BinaryOp::Div | BinaryOp::Mod if y == 0 => return None,
            BinaryOp::Div => x / y,
            BinaryOp::Mod => x % y,
            BinaryOp::BitAnd => x & y,
            BinaryOp::BitOr => x | y,
            BinaryOp::BitXor => x ^ y,
            _ => unreachable!("uint operator '{}'", op.as_str()),
        }),
        _ => unreachable!("operator '{}' accepted for {:?} and {:?}", op.as_str(), a, b),
    };
    Some(result)
}

fn is_linear_algebra(lhs: BasicType, rhs: BasicType) -> bool {
    let is_matrix = |b| matches!(b, BasicType::Matrix { .. });
    let is_scalar = |b| matches!(b, BasicType::Scalar(_));
    (is_matrix(lhs) || is_matrix(rhs)) && !is_scalar(lhs) && !is_scalar(rhs)
}

/// Matrix product; a vector on the left is a row, on the right a column
fn matrix_product(lhs: &Value, lb: BasicType, rhs: &Value, rb: BasicType, result: BasicType) -> Value {
    let (a_cols, a_rows) = match lb {
        BasicType::Matrix { cols, rows } => (cols as usize, rows as usize),
        BasicType::Vector(_, n) => (n as usize, 1),
        _ => unreachable!("matrix product with {}", lb),
    };
    let (b_cols, b_rows) = match rb {
        BasicType::Matrix { cols, rows } => (cols as usize, rows as usize),
        BasicType::Vector(_, n) => (1, n as usize),
        _ => unreachable!("matrix product with {}", rb),
    };

    let a: Vec<f64> = lhs.components().into_iter().map(|s| f64::from(s.as_f32())).collect();
    let b: Vec<f64> = rhs.components().into_iter().map(|s| f64::from(s.as_f32())).collect();

    let mut out = Vec::with_capacity(b_cols * a_rows);
    for c in 0..b_cols {
        for r in 0..a_rows {
            let sum: f64 = (0..a_cols).map(|k| a[k * a_rows + r] * b[c * b_rows + k]).sum();
            out.push(Scalar::Float(sum as f32));
        }
    }
    Value::from_components(result, out)
}

/// Components of every argument, converted to `kind`
fn flatten(args: &[Constant], kind: ScalarKind) -> Option<Vec<Scalar>> {
    let mut components = Vec::new();
    for arg in args {
        if arg.ty.component_count() == 0 {
            return None;
        }
        components.extend(arg.value.components().into_iter().map(|s| s.convert(kind)));
    }
    Some(components)
}

fn construct(ty: &Type, args: &[Constant]) -> Option<Constant> {
    let value = match ty {
        Type::Basic(BasicType::Scalar(kind)) => {
            let [arg] = args else { return None };
            let first = *flatten(std::slice::from_ref(arg), *kind)?.first()?;
            Value::Scalar(first)
        }

        Type::Basic(BasicType::Vector(kind, n)) => {
            let n = *n as usize;
            let mut components = flatten(args, *kind)?;
            if components.len() == 1 {
                components = vec![components[0]; n];
            }
            if components.len() < n {
                return None;
            }
            components.truncate(n);
            Value::Vector(components)
        }

        Type::Basic(BasicType::Matrix { cols, rows }) => construct_matrix(*cols, *rows, args)?,

        Type::Struct(s) => {
            if args.len() != s.fields.len() || s.fields.iter().zip(args).any(|(f, a)| f.ty != a.ty) {
                return None;
            }
            let fields = s
                .fields
                .iter()
                .zip(args)
                .map(|(f, a)| (f.name.clone(), a.value.clone()))
                .collect();
            Value::Struct(fields)
        }

        Type::Array { of, size: ArraySize::Sized(n) } => {
            if args.len() != *n as usize || args.iter().any(|a| a.ty != **of) {
                return None;
            }
            Value::Array(args.iter().map(|a| a.value.clone()).collect())
        }

        _ => return None,
    };

    Some(Constant::new(ty.clone(), value))
}

fn construct_matrix(cols: u8, rows: u8, args: &[Constant]) -> Option<Value> {
    let (n_cols, n_rows) = (cols as usize, rows as usize);
    let identity = |c: usize, r: usize, diagonal: f32| if c == r { diagonal } else { 0.0 };

    let data = match args {
        [Constant { value: Value::Matrix { data: src, cols: sc, rows: sr }, .. }] => {
            let (sc, sr) = (*sc as usize, *sr as usize);
            let mut data = Vec::with_capacity(n_cols * n_rows);
            for c in 0..n_cols {
                for r in 0..n_rows {
                    data.push(if c < sc && r < sr { src[c * sr + r] } else { identity(c, r, 1.0) });
                }
            }
            data
        }
        [Constant { value: Value::Scalar(s), .. }] => {
            let diagonal = s.as_f32();
            let mut data = Vec::with_capacity(n_cols * n_rows);
            for c in 0..n_cols {
                for r in 0..n_rows {
                    data.push(identity(c, r, diagonal));
                }
            }
            data
        }
        _ => {
            if args.iter().any(|a| a.ty.is_matrix()) {
                return None;
            }
            let components = flatten(args, ScalarKind::Float)?;
            if components.len() < n_cols * n_rows {
                return None;
            }
            components[..n_cols * n_rows].iter().map(|s| s.as_f32()).collect()
        }
    };

    Some(Value::Matrix { data, cols, rows })
}

fn field_access(object: Constant, field: &str) -> Option<Constant> {
    match (&object.ty, object.value) {
        (Type::Struct(s), Value::Struct(fields)) => {
            let ty = s.field(field)?.ty.clone();
            let value = fields.into_iter().find(|(name, _)| name == field)?.1;
            Some(Constant::new(ty, value))
        }
        (Type::Basic(BasicType::Vector(kind, n)), value) => {
            let indices = swizzle_indices(field, *n).ok()?;
            let components = value.components();
            let picked: Vec<Scalar> = indices.iter().map(|i| components[*i]).collect();
            let basic = BasicType::with_components(*kind, picked.len() as u8);
            Some(Constant::new(basic.into(), Value::from_components(basic, picked)))
        }
        _ => None,
    }
}

fn index_access(array: Constant, index: &Constant) -> Option<Constant> {
    if !index.ty.scalar_kind().is_some_and(|k| k.is_integer()) {
        return None;
    }
    let index = usize::try_from(index.value.as_scalar()?.as_index()?).ok()?;

    match (&array.ty, array.value) {
        (Type::Array { of, .. }, Value::Array(elements)) => {
            let element = elements.into_iter().nth(index)?;
            Some(Constant::new((**of).clone(), element))
        }
        (Type::Basic(BasicType::Vector(..)), Value::Vector(components)) => {
            components.get(index).copied().map(Constant::scalar)
        }
        (Type::Basic(BasicType::Matrix { rows, .. }), value) => {
            let column = value.column(index)?;
            Some(Constant::new(Type::vector(ScalarKind::Float, *rows), column))
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn int(i: i32) -> Constant {
        Constant::scalar(Scalar::Int(i))
    }

    fn float(f: f32) -> Constant {
        Constant::scalar(Scalar::Float(f))
    }

    #[test]
    fn test_int_literals() {
        assert_eq!(parse_int_literal("42"), Ok(Scalar::Int(42)));
        assert_eq!(parse_int_literal("0x1F"), Ok(Scalar::Int(31)));
        assert_eq!(parse_int_literal("017"), Ok(Scalar::Int(15)));
        assert_eq!(parse_int_literal("0"), Ok(Scalar::Int(0)));
        assert_eq!(parse_int_literal("3u"), Ok(Scalar::Uint(3)));
        assert_eq!(parse_int_literal("0xFFFFFFFF"), Ok(Scalar::Int(-1)));
        assert_eq!(parse_int_literal("4294967295U"), Ok(Scalar::Uint(u32::MAX)));
        assert_eq!(
            parse_int_literal("4294967296"),
            Err(LiteralError::Overflow("4294967296".to_string()))
        );
        assert!(parse_int_literal("0x100000000").is_err());
        assert_eq!(
            parse_int_literal("99999999999999999999999"),
            Err(LiteralError::Overflow("99999999999999999999999".to_string()))
        );
    }

    #[test]
    fn test_malformed_int_literals() {
        let error = parse_int_literal("09").unwrap_err();
        assert_eq!(error, LiteralError::InvalidDigit { literal: "09".to_string(), digit: '9' });
        assert_eq!(error.code(), DiagnosticCode::MalformedLiteral);
        assert_eq!(error.to_string(), "invalid digit '9' in integer literal '09'");

        assert_eq!(parse_int_literal("0x").map_err(|e| e.code()), Err(DiagnosticCode::MalformedLiteral));
        assert_eq!(parse_int_literal("4294967296").map_err(|e| e.code()), Err(DiagnosticCode::IntegerOverflow));
    }

    #[test]
    fn test_float_literals() {
        assert_eq!(parse_float_literal("1.5f"), Some(1.5));
        assert_eq!(parse_float_literal(".5e2"), Some(50.0));
        assert_eq!(parse_float_literal("2."), Some(2.0));
    }

    #[test]
    fn test_integer_semantics() {
        assert_eq!(binary(BinaryOp::Add, &int(i32::MAX), &int(1)), Some(int(i32::MIN)));
        assert_eq!(binary(BinaryOp::Mod, &int(-7), &int(3)), Some(int(2)));
        assert_eq!(binary(BinaryOp::Div, &int(1), &int(0)), None);
        assert_eq!(binary(BinaryOp::Shl, &int(1), &int(33)), Some(int(2)));
        assert_eq!(binary(BinaryOp::Shr, &int(-8), &int(1)), Some(int(-4)));

        let minus_one = unary(UnaryOp::Neg, &Constant::scalar(Scalar::Uint(1)));
        assert_eq!(minus_one, Some(Constant::scalar(Scalar::Uint(u32::MAX))));
    }

    #[test]
    fn test_float_semantics() {
        let third = binary(BinaryOp::Div, &float(1.0), &float(3.0));
        assert_eq!(third, Some(float(1.0f32 / 3.0)));
        assert_eq!(binary(BinaryOp::Lt, &float(f32::NAN), &float(1.0)), Some(Constant::scalar(Scalar::Bool(false))));
        assert_eq!(binary(BinaryOp::Add, &int(1), &float(1.0)), None);
    }

    #[test]
    fn test_matrix_vector_product() {
        let m = construct(
            &Type::matrix(2, 2),
            &[float(1.0), float(2.0), float(3.0), float(4.0)],
        )
        .unwrap();
        let v = construct(&Type::vector(ScalarKind::Float, 2), &[float(1.0), float(1.0)]).unwrap();

        let mv = binary(BinaryOp::Mul, &m, &v).unwrap();
        assert_eq!(mv.value, Value::Vector(vec![Scalar::Float(4.0), Scalar::Float(6.0)]));

        let vm = binary(BinaryOp::Mul, &v, &m).unwrap();
        assert_eq!(vm.value, Value::Vector(vec![Scalar::Float(3.0), Scalar::Float(7.0)]));
    }

    #[test]
    fn test_matrix_constructors() {
        let scaled = construct(&Type::matrix(2, 2), &[int(2)]).unwrap();
        assert_eq!(scaled.value, Value::Matrix { data: vec![2.0, 0.0, 0.0, 2.0], cols: 2, rows: 2 });

        let grown = construct(&Type::matrix(3, 3), &[scaled]).unwrap();
        assert_eq!(
            grown.value,
            Value::Matrix { data: vec![2.0, 0.0, 0.0, 0.0, 2.0, 0.0, 0.0, 0.0, 1.0], cols: 3, rows: 3 }
        );
    }

    #[test]
    fn test_swizzle_and_index() {
        let v = construct(
            &Type::vector(ScalarKind::Int, 4),
            &[int(1), int(2), int(3), int(4)],
        )
        .unwrap();
        let picked = field_access(v.clone(), "rrgb").unwrap();
        assert_eq!(picked.ty, Type::vector(ScalarKind::Int, 4));
        assert_eq!(
            picked.value,
            Value::Vector(vec![Scalar::Int(1), Scalar::Int(1), Scalar::Int(2), Scalar::Int(3)])
        );
        assert_eq!(index_access(v.clone(), &int(2)), Some(int(3)));
        assert_eq!(index_access(v, &int(4)), None);
    }
}
