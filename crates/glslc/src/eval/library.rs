//! Builtin function library for constant folding
//!
//! Functions are computed in f64 and rounded to f32 once per result
//! component. Component-wise functions are written once over scalars and
//! broadcast across vector and matrix arguments.

use std::f64::consts::PI;

use super::value::{Scalar, Value};

/// Fold a call to the builtin `name`
///
/// Returns `None` when the function has no compile-time value (texture
/// lookups, `modf`) or the arguments do not fit.
pub fn call(name: &str, args: &[Value]) -> Option<Value> {
    match name {
        "length" | "distance" | "dot" | "cross" | "normalize" | "faceforward" | "reflect"
        | "refract" | "matrixCompMult" | "outerProduct" | "transpose" | "determinant"
        | "inverse" | "any" | "all" | "not" | "dFdx" | "dFdy" | "fwidth" | "packSnorm2x16"
        | "unpackSnorm2x16" | "packUnorm2x16" | "unpackUnorm2x16" | "packHalf2x16"
        | "unpackHalf2x16" => whole_argument(name, args),
        _ => componentwise(name, args),
    }
}

fn float(x: f64) -> Scalar {
    Scalar::Float(x as f32)
}

fn floats(value: &Value) -> Vec<f64> {
    value.components().into_iter().map(|s| f64::from(s.as_f32())).collect()
}

/// A float value with the shape of `like` (scalar or vector)
fn shaped(like: &Value, values: Vec<f64>) -> Value {
    match like {
        Value::Scalar(_) => Value::Scalar(float(values[0])),
        _ => Value::Vector(values.into_iter().map(float).collect()),
    }
}

fn dot(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

// =============================================================================
// Whole-argument functions
// =============================================================================

fn whole_argument(name: &str, args: &[Value]) -> Option<Value> {
    let value = match (name, args) {
        ("length", [x]) => {
            let x = floats(x);
            Value::Scalar(float(dot(&x, &x).sqrt()))
        }
        ("distance", [a, b]) => {
            let d: Vec<f64> = floats(a).iter().zip(floats(b)).map(|(x, y)| x - y).collect();
            Value::Scalar(float(dot(&d, &d).sqrt()))
        }
        ("dot", [a, b]) => Value::Scalar(float(dot(&floats(a), &floats(b)))),
        ("cross", [a, b]) => {
            let (a, b) = (floats(a), floats(b));
            if a.len() != 3 || b.len() != 3 {
                return None;
            }
            let c = vec![
                a[1] * b[2] - b[1] * a[2],
                a[2] * b[0] - b[2] * a[0],
                a[0] * b[1] - b[0] * a[1],
            ];
            shaped(&args[0], c)
        }
        ("normalize", [x]) => {
            let v = floats(x);
            let len = dot(&v, &v).sqrt();
            shaped(x, v.iter().map(|c| c / len).collect())
        }
        ("faceforward", [n, i, nref]) => {
            let n_values = floats(n);
            if dot(&floats(nref), &floats(i)) < 0.0 {
                shaped(n, n_values)
            } else {
                shaped(n, n_values.iter().map(|c| -c).collect())
            }
        }
        ("reflect", [i, n]) => {
            let (iv, nv) = (floats(i), floats(n));
            let d = dot(&nv, &iv);
            shaped(i, iv.iter().zip(&nv).map(|(a, b)| a - 2.0 * d * b).collect())
        }
        ("refract", [i, n, eta]) => {
            let (iv, nv) = (floats(i), floats(n));
            let eta = f64::from(eta.as_scalar()?.as_f32());
            let d = dot(&nv, &iv);
            let k = 1.0 - eta * eta * (1.0 - d * d);
            if k < 0.0 {
                shaped(i, vec![0.0; iv.len()])
            } else {
                let scale = eta * d + k.sqrt();
                shaped(i, iv.iter().zip(&nv).map(|(a, b)| eta * a - scale * b).collect())
            }
        }
        ("matrixCompMult", [Value::Matrix { data: a, cols, rows }, Value::Matrix { data: b, .. }]) => {
            let data = a
                .iter()
                .zip(b)
                .map(|(x, y)| (f64::from(*x) * f64::from(*y)) as f32)
                .collect();
            Value::Matrix { data, cols: *cols, rows: *rows }
        }
        ("outerProduct", [c, r]) => {
            let (c, r) = (floats(c), floats(r));
            let mut data = Vec::with_capacity(c.len() * r.len());
            for col in &r {
                for row in &c {
                    data.push((row * col) as f32);
                }
            }
            Value::Matrix { data, cols: r.len() as u8, rows: c.len() as u8 }
        }
        ("transpose", [Value::Matrix { data, cols, rows }]) => {
            let (cols, rows) = (*cols as usize, *rows as usize);
            let mut out = Vec::with_capacity(data.len());
            for new_col in 0..rows {
                for new_row in 0..cols {
                    out.push(data[new_row * rows + new_col]);
                }
            }
            Value::Matrix { data: out, cols: rows as u8, rows: cols as u8 }
        }
        ("determinant", [m @ Value::Matrix { cols, rows, .. }]) if cols == rows => {
            Value::Scalar(float(determinant(&floats(m), *cols as usize)))
        }
        ("inverse", [m @ Value::Matrix { cols, rows, .. }]) if cols == rows => {
            let n = *cols as usize;
            let data = floats(m);
            let det = determinant(&data, n);
            let mut out = Vec::with_capacity(n * n);
            for c in 0..n {
                for r in 0..n {
                    out.push((cofactor(&data, n, r, c) / det) as f32);
                }
            }
            Value::Matrix { data: out, cols: *cols, rows: *rows }
        }
        ("any", [Value::Vector(v)]) => Value::Scalar(Scalar::Bool(v.iter().any(|s| s.as_bool()))),
        ("all", [Value::Vector(v)]) => Value::Scalar(Scalar::Bool(v.iter().all(|s| s.as_bool()))),
        ("not", [Value::Vector(v)]) => {
            Value::Vector(v.iter().map(|s| Scalar::Bool(!s.as_bool())).collect())
        }
        // No rasterizer: every derivative is zero
        ("dFdx" | "dFdy" | "fwidth", [x]) => shaped(x, vec![0.0; x.components().len()]),
        ("packSnorm2x16", [v]) => pack2x16(v, |x| (x.clamp(-1.0, 1.0) * 32767.0).round() as i16 as u16)?,
        ("packUnorm2x16", [v]) => pack2x16(v, |x| (x.clamp(0.0, 1.0) * 65535.0).round() as u16)?,
        ("packHalf2x16", [v]) => pack2x16(v, |x| f32_to_f16(x as f32))?,
        ("unpackSnorm2x16", [p]) => unpack2x16(p, |h| (f64::from(h as i16) / 32767.0).clamp(-1.0, 1.0))?,
        ("unpackUnorm2x16", [p]) => unpack2x16(p, |h| f64::from(h) / 65535.0)?,
        ("unpackHalf2x16", [p]) => unpack2x16(p, |h| f64::from(f16_to_f32(h)))?,
        _ => return None,
    };
    Some(value)
}

fn pack2x16(v: &Value, pack: impl Fn(f64) -> u16) -> Option<Value> {
    match floats(v).as_slice() {
        [lo, hi] => {
            let bits = u32::from(pack(*lo)) | (u32::from(pack(*hi)) << 16);
            Some(Value::Scalar(Scalar::Uint(bits)))
        }
        _ => None,
    }
}

fn unpack2x16(p: &Value, unpack: impl Fn(u16) -> f64) -> Option<Value> {
    match p.as_scalar()? {
        Scalar::Uint(bits) => Some(Value::Vector(vec![
            float(unpack((bits & 0xFFFF) as u16)),
            float(unpack((bits >> 16) as u16)),
        ])),
        _ => None,
    }
}

/// Square column-major matrix without column `skip_col` and row `skip_row`
fn minor(data: &[f64], n: usize, skip_col: usize, skip_row: usize) -> Vec<f64> {
    let mut out = Vec::with_capacity((n - 1) * (n - 1));
    for c in (0..n).filter(|c| *c != skip_col) {
        for r in (0..n).filter(|r| *r != skip_row) {
            out.push(data[c * n + r]);
        }
    }
    out
}

fn cofactor(data: &[f64], n: usize, col: usize, row: usize) -> f64 {
    let sign = if (col + row) % 2 == 0 { 1.0 } else { -1.0 };
    sign * determinant(&minor(data, n, col, row), n - 1)
}

/// Cofactor expansion along the first row
fn determinant(data: &[f64], n: usize) -> f64 {
    match n {
        1 => data[0],
        2 => data[0] * data[3] - data[2] * data[1],
        _ => (0..n).map(|c| data[c * n] * cofactor(data, n, c, 0)).sum(),
    }
}

/// IEEE binary16 bits of `value`, rounding to nearest even
fn f32_to_f16(value: f32) -> u16 {
    let bits = value.to_bits();
    let sign = ((bits >> 16) & 0x8000) as u16;
    let exponent = ((bits >> 23) & 0xFF) as i32;
    let mantissa = bits & 0x7F_FFFF;

    if exponent == 0xFF {
        let nan = if mantissa != 0 { 0x200 } else { 0 };
        return sign | 0x7C00 | nan;
    }

    let half_exponent = exponent - 127 + 15;
    if half_exponent >= 0x1F {
        return sign | 0x7C00;
    }

    if half_exponent <= 0 {
        if half_exponent < -10 {
            return sign;
        }
        let m = mantissa | 0x80_0000;
        let shift = (14 - half_exponent) as u32;
        let half = m >> shift;
        let rest = m & ((1 << shift) - 1);
        let halfway = 1 << (shift - 1);
        let rounded = if rest > halfway || (rest == halfway && half & 1 == 1) { half + 1 } else { half };
        return sign | rounded as u16;
    }

    let half = ((half_exponent as u32) << 10) | (mantissa >> 13);
    let rest = mantissa & 0x1FFF;
    // A carry out of the mantissa correctly bumps the exponent (up to infinity)
    let rounded = if rest > 0x1000 || (rest == 0x1000 && half & 1 == 1) { half + 1 } else { half };
    sign | rounded as u16
}

fn f16_to_f32(bits: u16) -> f32 {
    let sign = if bits & 0x8000 != 0 { -1.0 } else { 1.0 };
    let exponent = (bits >> 10) & 0x1F;
    let mantissa = f64::from(bits & 0x3FF);
    let magnitude = match exponent {
        0 => mantissa * 2f64.powi(-24),
        0x1F if mantissa == 0.0 => f64::INFINITY,
        0x1F => f64::NAN,
        _ => (1.0 + mantissa / 1024.0) * 2f64.powi(i32::from(exponent) - 15),
    };
    (sign * magnitude) as f32
}

// =============================================================================
// Component-wise functions
// =============================================================================

/// Apply a scalar function per component of the vector/matrix arguments
fn componentwise(name: &str, args: &[Value]) -> Option<Value> {
    let Some(shape) = args.iter().find(|a| !matches!(a, Value::Scalar(_))) else {
        let scalars: Option<Vec<Scalar>> = args.iter().map(Value::as_scalar).collect();
        return scalar_function(name, &scalars?).map(Value::Scalar);
    };

    let width = shape.components().len();
    let columns: Vec<Vec<Scalar>> = args.iter().map(Value::components).collect();
    let mut results = Vec::with_capacity(width);
    for i in 0..width {
        let scalars: Option<Vec<Scalar>> = columns
            .iter()
            .map(|c| if c.len() == 1 { Some(c[0]) } else { c.get(i).copied() })
            .collect();
        results.push(scalar_function(name, &scalars?)?);
    }

    Some(match shape {
        Value::Matrix { cols, rows, .. } => Value::Matrix {
            data: results.into_iter().map(Scalar::as_f32).collect(),
            cols: *cols,
            rows: *rows,
        },
        _ => Value::Vector(results),
    })
}

fn scalar_function(name: &str, args: &[Scalar]) -> Option<Scalar> {
    use Scalar::{Bool, Float, Int, Uint};

    let result = match (name, args) {
        ("abs", [Int(x)]) => Int(x.wrapping_abs()),
        ("sign", [Int(x)]) => Int(x.signum()),
        ("min", [Int(x), Int(y)]) => Int(*x.min(y)),
        ("min", [Uint(x), Uint(y)]) => Uint(*x.min(y)),
        ("max", [Int(x), Int(y)]) => Int(*x.max(y)),
        ("max", [Uint(x), Uint(y)]) => Uint(*x.max(y)),
        ("clamp", [Int(x), Int(lo), Int(hi)]) => Int(*x.max(lo).min(hi)),
        ("clamp", [Uint(x), Uint(lo), Uint(hi)]) => Uint(*x.max(lo).min(hi)),

        ("mix", [x, y, Bool(a)]) => {
            if *a {
                *y
            } else {
                *x
            }
        }

        ("isnan", [Float(x)]) => Bool(x.is_nan()),
        ("isinf", [Float(x)]) => Bool(x.is_infinite()),
        ("floatBitsToInt", [Float(x)]) => Int(x.to_bits() as i32),
        ("floatBitsToUint", [Float(x)]) => Uint(x.to_bits()),
        ("intBitsToFloat", [Int(x)]) => Float(f32::from_bits(*x as u32)),
        ("uintBitsToFloat", [Uint(x)]) => Float(f32::from_bits(*x)),

        ("lessThan", [a, b]) => Bool(compare(*a, *b)? == std::cmp::Ordering::Less),
        ("lessThanEqual", [a, b]) => Bool(compare(*a, *b)? != std::cmp::Ordering::Greater),
        ("greaterThan", [a, b]) => Bool(compare(*a, *b)? == std::cmp::Ordering::Greater),
        ("greaterThanEqual", [a, b]) => Bool(compare(*a, *b)? != std::cmp::Ordering::Less),
        ("equal", [a, b]) if a.kind() == b.kind() => Bool(a == b),
        ("notEqual", [a, b]) if a.kind() == b.kind() => Bool(a != b),

        (_, [Float(x)]) => float(unary_float(name, f64::from(*x))?),
        (_, [Float(x), Float(y)]) => float(binary_float(name, f64::from(*x), f64::from(*y))?),
        (_, [Float(x), Float(y), Float(z)]) => {
            float(ternary_float(name, f64::from(*x), f64::from(*y), f64::from(*z))?)
        }
        _ => return None,
    };
    Some(result)
}

/// Ordering of two numeric scalars of one kind
fn compare(a: Scalar, b: Scalar) -> Option<std::cmp::Ordering> {
    match (a, b) {
        (Scalar::Float(x), Scalar::Float(y)) => x.partial_cmp(&y),
        (Scalar::Int(x), Scalar::Int(y)) => Some(x.cmp(&y)),
        (Scalar::Uint(x), Scalar::Uint(y)) => Some(x.cmp(&y)),
        _ => None,
    }
}

fn unary_float(name: &str, x: f64) -> Option<f64> {
    let result = match name {
        "radians" => x * PI / 180.0,
        "degrees" => x * 180.0 / PI,
        "sin" => x.sin(),
        "cos" => x.cos(),
        "tan" => x.tan(),
        "asin" => x.asin(),
        "acos" => x.acos(),
        "atan" => x.atan(),
        "sinh" => x.sinh(),
        "cosh" => x.cosh(),
        "tanh" => x.tanh(),
        "asinh" => x.asinh(),
        "acosh" => x.acosh(),
        "atanh" => x.atanh(),
        "exp" => x.exp(),
        "log" => x.ln(),
        "exp2" => x.exp2(),
        "log2" => x.log2(),
        "sqrt" => x.sqrt(),
        "inversesqrt" => 1.0 / x.sqrt(),
        "abs" => x.abs(),
        "sign" => {
            if x > 0.0 {
                1.0
            } else if x < 0.0 {
                -1.0
            } else {
                0.0
            }
        }
        "floor" => x.floor(),
        "trunc" => x.trunc(),
        "round" => x.round(),
        "roundEven" => x.round_ties_even(),
        "ceil" => x.ceil(),
        "fract" => x - x.floor(),
        _ => return None,
    };
    Some(result)
}

fn binary_float(name: &str, x: f64, y: f64) -> Option<f64> {
    let result = match name {
        "atan" => x.atan2(y),
        "pow" => x.powf(y),
        "mod" => ((x % y) + y) % y,
        "min" => {
            if y < x {
                y
            } else {
                x
            }
        }
        "max" => {
            if x < y {
                y
            } else {
                x
            }
        }
        "step" => {
            if y < x {
                0.0
            } else {
                1.0
            }
        }
        _ => return None,
    };
    Some(result)
}

fn ternary_float(name: &str, x: f64, y: f64, z: f64) -> Option<f64> {
    let result = match name {
        "clamp" => x.max(y).min(z),
        "mix" => x * (1.0 - z) + y * z,
        "smoothstep" => {
            let t = ((z - x) / (y - x)).clamp(0.0, 1.0);
            t * t * (3.0 - 2.0 * t)
        }
        _ => return None,
    };
    Some(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn vec_of(values: &[f32]) -> Value {
        Value::Vector(values.iter().map(|v| Scalar::Float(*v)).collect())
    }

    fn scalar(v: f32) -> Value {
        Value::Scalar(Scalar::Float(v))
    }

    #[test]
    fn test_radians() {
        let result = call("radians", &[scalar(30.0)]);
        assert_eq!(result, Some(scalar((PI / 6.0) as f32)));
    }

    #[test]
    fn test_broadcast_clamp() {
        let result = call("clamp", &[vec_of(&[-1.0, 0.5, 2.0]), scalar(0.0), scalar(1.0)]);
        assert_eq!(result, Some(vec_of(&[0.0, 0.5, 1.0])));
    }

    #[test]
    fn test_mod_negative_dividends() {
        assert_eq!(call("mod", &[scalar(-1.5), scalar(1.0)]), Some(scalar(0.5)));
        // 1 - 1e-30 rounds to 1, which wraps back to 0
        assert_eq!(call("mod", &[scalar(-1e-30), scalar(1.0)]), Some(scalar(0.0)));
        assert_eq!(call("mod", &[scalar(7.0), scalar(3.0)]), Some(scalar(1.0)));
    }

    #[test]
    fn test_mod_broadcast() {
        let result = call("mod", &[vec_of(&[-1.5, 2.5, 4.0]), scalar(2.0)]);
        assert_eq!(result, Some(vec_of(&[0.5, 0.5, 0.0])));

        let result = call("mod", &[vec_of(&[-1.0, 5.0]), vec_of(&[3.0, 4.0])]);
        assert_eq!(result, Some(vec_of(&[2.0, 1.0])));
    }

    #[test]
    fn test_mix_overloads() {
        let x = vec_of(&[0.0, 0.0]);
        let y = vec_of(&[10.0, 10.0]);
        assert_eq!(call("mix", &[x.clone(), y.clone(), scalar(0.25)]), Some(vec_of(&[2.5, 2.5])));

        let select = Value::Vector(vec![Scalar::Bool(true), Scalar::Bool(false)]);
        assert_eq!(call("mix", &[x, y, select]), Some(vec_of(&[10.0, 0.0])));
    }

    #[test]
    fn test_relational_and_bitcast() {
        let result = call("lessThan", &[vec_of(&[1.0, 3.0]), vec_of(&[2.0, 2.0])]);
        assert_eq!(result, Some(Value::Vector(vec![Scalar::Bool(true), Scalar::Bool(false)])));

        let bits = call("floatBitsToUint", &[scalar(1.0)]);
        assert_eq!(bits, Some(Value::Scalar(Scalar::Uint(0x3F80_0000))));
        let back = call("intBitsToFloat", &[Value::Scalar(Scalar::Int(0x3F80_0000))]);
        assert_eq!(back, Some(scalar(1.0)));
    }

    #[test]
    fn test_geometry() {
        assert_eq!(call("length", &[vec_of(&[3.0, 4.0])]), Some(scalar(5.0)));
        assert_eq!(call("dot", &[vec_of(&[1.0, 2.0, 3.0]), vec_of(&[4.0, 5.0, 6.0])]), Some(scalar(32.0)));
        assert_eq!(
            call("cross", &[vec_of(&[1.0, 0.0, 0.0]), vec_of(&[0.0, 1.0, 0.0])]),
            Some(vec_of(&[0.0, 0.0, 1.0]))
        );
        assert_eq!(call("normalize", &[scalar(-3.0)]), Some(scalar(-1.0)));
    }

    #[test]
    fn test_matrix_functions() {
        let m = Value::Matrix { data: vec![4.0, 2.0, 7.0, 6.0], cols: 2, rows: 2 };
        assert_eq!(call("determinant", &[m.clone()]), Some(scalar(10.0)));
        assert_eq!(
            call("inverse", &[m]),
            Some(Value::Matrix { data: vec![0.6, -0.2, -0.7, 0.4], cols: 2, rows: 2 })
        );

        let m3 = Value::Matrix { data: vec![2.0, 0.0, 0.0, 0.0, 3.0, 0.0, 1.0, 0.0, 4.0], cols: 3, rows: 3 };
        assert_eq!(call("determinant", &[m3]), Some(scalar(24.0)));

        let m3x2 = Value::Matrix { data: vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0], cols: 3, rows: 2 };
        assert_eq!(
            call("transpose", &[m3x2]),
            Some(Value::Matrix { data: vec![1.0, 3.0, 5.0, 2.0, 4.0, 6.0], cols: 2, rows: 3 })
        );

        assert_eq!(
            call("outerProduct", &[vec_of(&[1.0, 2.0]), vec_of(&[3.0, 4.0, 5.0])]),
            Some(Value::Matrix { data: vec![3.0, 6.0, 4.0, 8.0, 5.0, 10.0], cols: 3, rows: 2 })
        );
    }

    #[test]
    fn test_packing() {
        assert_eq!(f32_to_f16(1.0), 0x3C00);
        assert_eq!(f32_to_f16(-2.0), 0xC000);
        assert_eq!(f32_to_f16(65520.0), 0x7C00);
        assert_eq!(f16_to_f32(0x3555), 0.333_251_95);

        let packed = call("packHalf2x16", &[vec_of(&[1.0, -2.0])]);
        assert_eq!(packed, Some(Value::Scalar(Scalar::Uint(0xC000_3C00))));
        assert_eq!(call("unpackHalf2x16", &[packed.unwrap()]), Some(vec_of(&[1.0, -2.0])));

        let snorm = call("packSnorm2x16", &[vec_of(&[1.0, -1.0])]);
        assert_eq!(snorm, Some(Value::Scalar(Scalar::Uint(0x8001_7FFF))));
        assert_eq!(call("unpackSnorm2x16", &[snorm.unwrap()]), Some(vec_of(&[1.0, -1.0])));
    }

    #[test]
    fn test_not_constant() {
        assert_eq!(call("texture", &[scalar(0.0)]), None);
        assert_eq!(call("modf", &[scalar(1.5), scalar(0.0)]), None);
    }
}
