//! Operator typing relation and swizzle rules
//!
//! Both the checker and the constant evaluator type operators through these
//! functions, so a folded constant always has the type the checker assigned.
//! There are no implicit conversions: every rule is an exact match on the
//! operand types.

use crate::frontend::ast::{BinaryOp, UnaryOp};
use crate::types::{BasicType, ScalarKind};

/// Result type of `lhs op rhs` over basic types
///
/// Equality of arrays and structs is handled by the caller.
pub fn binary_rule(op: BinaryOp, lhs: BasicType, rhs: BasicType) -> Option<BasicType> {
    use BasicType::{Matrix, Scalar, Vector};

    match op {
        BinaryOp::Add | BinaryOp::Sub | BinaryOp::Mul | BinaryOp::Div => {
            if op == BinaryOp::Mul {
                if let Some(result) = linear_algebra(lhs, rhs) {
                    return Some(result);
                }
            }
            match (lhs, rhs) {
                (Scalar(a), Scalar(b)) if a == b && a.is_numeric() => Some(lhs),
                (Scalar(a), Vector(b, _)) if a == b && a.is_numeric() => Some(rhs),
                (Vector(a, _), Scalar(b)) if a == b && a.is_numeric() => Some(lhs),
                (Vector(a, n), Vector(b, m)) if a == b && n == m && a.is_numeric() => Some(lhs),
                (Scalar(ScalarKind::Float), Matrix { .. }) => Some(rhs),
                (Matrix { .. }, Scalar(ScalarKind::Float)) => Some(lhs),
                (Matrix { .. }, Matrix { .. }) if lhs == rhs && op != BinaryOp::Mul => Some(lhs),
                _ => None,
            }
        }

        BinaryOp::Mod | BinaryOp::BitAnd | BinaryOp::BitOr | BinaryOp::BitXor => {
            match (lhs, rhs) {
                (Scalar(a), Scalar(b)) if a == b && a.is_integer() => Some(lhs),
                (Scalar(a), Vector(b, _)) if a == b && a.is_integer() => Some(rhs),
                (Vector(a, _), Scalar(b)) if a == b && a.is_integer() => Some(lhs),
                (Vector(a, n), Vector(b, m)) if a == b && n == m && a.is_integer() => Some(lhs),
                _ => None,
            }
        }

        BinaryOp::Shl | BinaryOp::Shr => match (lhs, rhs) {
            (Scalar(a), Scalar(b)) if a.is_integer() && b.is_integer() => Some(lhs),
            (Vector(a, _), Scalar(b)) if a.is_integer() && b.is_integer() => Some(lhs),
            (Vector(a, n), Vector(b, m)) if a.is_integer() && b.is_integer() && n == m => {
                Some(lhs)
            }
            _ => None,
        },

        BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge => match (lhs, rhs) {
            (Scalar(a), Scalar(b)) if a == b && a.is_numeric() => Some(Scalar(ScalarKind::Bool)),
            _ => None,
        },

        BinaryOp::Eq | BinaryOp::Ne => match lhs {
            BasicType::Void | BasicType::Sampler(_) => None,
            _ if lhs == rhs => Some(Scalar(ScalarKind::Bool)),
            _ => None,
        },

        BinaryOp::LogAnd | BinaryOp::LogXor | BinaryOp::LogOr => match (lhs, rhs) {
            (Scalar(ScalarKind::Bool), Scalar(ScalarKind::Bool)) => Some(lhs),
            _ => None,
        },
    }
}

/// Matrix products with a matrix on at least one side
fn linear_algebra(lhs: BasicType, rhs: BasicType) -> Option<BasicType> {
    match (lhs, rhs) {
        (BasicType::Matrix { cols: c1, rows: r1 }, BasicType::Matrix { cols: c2, rows: r2 })
            if c1 == r2 =>
        {
            Some(BasicType::Matrix { cols: c2, rows: r1 })
        }
        // Row vector times matrix
        (BasicType::Vector(ScalarKind::Float, n), BasicType::Matrix { cols, rows }) if n == rows => {
            Some(BasicType::with_components(ScalarKind::Float, cols))
        }
        // Matrix times column vector
        (BasicType::Matrix { cols, rows }, BasicType::Vector(ScalarKind::Float, n)) if n == cols => {
            Some(BasicType::with_components(ScalarKind::Float, rows))
        }
        _ => None,
    }
}

/// Every `(lhs, rhs, result)` the relation accepts for `op`
pub fn binary_signatures(op: BinaryOp) -> Vec<(BasicType, BasicType, BasicType)> {
    let all = BasicType::all_values();
    let mut signatures = Vec::new();
    for lhs in &all {
        for rhs in &all {
            if let Some(result) = binary_rule(op, *lhs, *rhs) {
                signatures.push((*lhs, *rhs, result));
            }
        }
    }
    signatures
}

/// Result type of a unary operator
pub fn unary_rule(op: UnaryOp, operand: BasicType) -> Option<BasicType> {
    let kind = operand.component_kind()?;
    let accepted = match op {
        UnaryOp::Plus | UnaryOp::Neg => kind.is_numeric(),
        UnaryOp::Not => operand == BasicType::Scalar(ScalarKind::Bool),
        UnaryOp::BitNot => kind.is_integer() && !matches!(operand, BasicType::Matrix { .. }),
    };
    accepted.then_some(operand)
}

/// Is `field` spelled like a swizzle (`[xyzwrgbastpq]{1,4}`)?
pub fn is_swizzle_like(field: &str) -> bool {
    (1..=4).contains(&field.len()) && field.chars().all(|c| component_index(c).is_some())
}

/// Index and alphabet of a swizzle letter
fn component_index(c: char) -> Option<(usize, usize)> {
    const ALPHABETS: [&str; 3] = ["xyzw", "rgba", "stpq"];
    ALPHABETS
        .iter()
        .enumerate()
        .find_map(|(set, letters)| letters.find(c).map(|index| (set, index)))
}

/// Component indices selected by a swizzle of a `size`-component vector
pub fn swizzle_indices(field: &str, size: u8) -> Result<Vec<usize>, String> {
    if field.is_empty() || field.len() > 4 {
        return Err(format!("swizzle '{}' must select 1 to 4 components", field));
    }

    let mut alphabet = None;
    let mut indices = Vec::with_capacity(field.len());
    for c in field.chars() {
        let (set, index) = component_index(c)
            .ok_or_else(|| format!("'{}' is not a vector component", c))?;
        match alphabet {
            None => alphabet = Some(set),
            Some(existing) if existing != set => {
                return Err(format!(
                    "swizzle '{}' mixes components from different sets",
                    field
                ));
            }
            Some(_) => {}
        }
        if index >= size as usize {
            return Err(format!(
                "component '{}' is out of range for a {}-component vector",
                c, size
            ));
        }
        indices.push(index);
    }
    Ok(indices)
}

/// A swizzle naming the same component twice cannot be assigned to
pub fn has_repeated_component(indices: &[usize]) -> bool {
    indices
        .iter()
        .enumerate()
        .any(|(i, a)| indices[..i].contains(a))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vec(kind: ScalarKind, n: u8) -> BasicType {
        BasicType::Vector(kind, n)
    }

    const FLOAT: BasicType = BasicType::Scalar(ScalarKind::Float);
    const INT: BasicType = BasicType::Scalar(ScalarKind::Int);
    const UINT: BasicType = BasicType::Scalar(ScalarKind::Uint);
    const BOOL: BasicType = BasicType::Scalar(ScalarKind::Bool);

    #[test]
    fn test_arithmetic_is_exact() {
        assert_eq!(binary_rule(BinaryOp::Add, INT, INT), Some(INT));
        assert_eq!(binary_rule(BinaryOp::Add, INT, FLOAT), None);
        assert_eq!(binary_rule(BinaryOp::Add, BOOL, BOOL), None);
        assert_eq!(binary_rule(BinaryOp::Mul, FLOAT, vec(ScalarKind::Float, 3)), Some(vec(ScalarKind::Float, 3)));
        assert_eq!(binary_rule(BinaryOp::Sub, vec(ScalarKind::Int, 2), vec(ScalarKind::Int, 3)), None);
    }

    #[test]
    fn test_matrix_products() {
        let m3x2 = BasicType::Matrix { cols: 3, rows: 2 };
        let m4x3 = BasicType::Matrix { cols: 4, rows: 3 };
        assert_eq!(binary_rule(BinaryOp::Mul, m3x2, m4x3), Some(BasicType::Matrix { cols: 4, rows: 2 }));
        assert_eq!(binary_rule(BinaryOp::Mul, m4x3, m3x2), None);
        assert_eq!(binary_rule(BinaryOp::Mul, m3x2, vec(ScalarKind::Float, 3)), Some(vec(ScalarKind::Float, 2)));
        assert_eq!(binary_rule(BinaryOp::Mul, vec(ScalarKind::Float, 2), m3x2), Some(vec(ScalarKind::Float, 3)));
        assert_eq!(binary_rule(BinaryOp::Add, m3x2, m3x2), Some(m3x2));
        assert_eq!(binary_rule(BinaryOp::Add, m3x2, m4x3), None);
        assert_eq!(binary_rule(BinaryOp::Div, m3x2, FLOAT), Some(m3x2));
    }

    #[test]
    fn test_integer_only_operators() {
        assert_eq!(binary_rule(BinaryOp::Mod, UINT, UINT), Some(UINT));
        assert_eq!(binary_rule(BinaryOp::Mod, INT, UINT), None);
        assert_eq!(binary_rule(BinaryOp::BitAnd, vec(ScalarKind::Int, 3), INT), Some(vec(ScalarKind::Int, 3)));
        assert_eq!(binary_rule(BinaryOp::Mod, FLOAT, FLOAT), None);
        assert_eq!(binary_rule(BinaryOp::Shl, INT, UINT), Some(INT));
        assert_eq!(binary_rule(BinaryOp::Shr, vec(ScalarKind::Uint, 2), vec(ScalarKind::Int, 2)), Some(vec(ScalarKind::Uint, 2)));
        assert_eq!(binary_rule(BinaryOp::Shl, INT, vec(ScalarKind::Int, 2)), None);
    }

    #[test]
    fn test_comparisons() {
        assert_eq!(binary_rule(BinaryOp::Lt, FLOAT, FLOAT), Some(BOOL));
        assert_eq!(binary_rule(BinaryOp::Lt, vec(ScalarKind::Float, 2), vec(ScalarKind::Float, 2)), None);
        assert_eq!(binary_rule(BinaryOp::Eq, vec(ScalarKind::Bool, 4), vec(ScalarKind::Bool, 4)), Some(BOOL));
        assert_eq!(binary_rule(BinaryOp::LogXor, BOOL, BOOL), Some(BOOL));
        assert_eq!(binary_rule(BinaryOp::LogAnd, INT, INT), None);
    }

    #[test]
    fn test_signature_listing() {
        let signatures = binary_signatures(BinaryOp::LogOr);
        assert_eq!(signatures, vec![(BOOL, BOOL, BOOL)]);
        assert!(binary_signatures(BinaryOp::Mul).len() > 50);
    }

    #[test]
    fn test_unary_rules() {
        assert_eq!(unary_rule(UnaryOp::Neg, BasicType::Matrix { cols: 2, rows: 2 }), Some(BasicType::Matrix { cols: 2, rows: 2 }));
        assert_eq!(unary_rule(UnaryOp::Neg, BOOL), None);
        assert_eq!(unary_rule(UnaryOp::Not, BOOL), Some(BOOL));
        assert_eq!(unary_rule(UnaryOp::Not, vec(ScalarKind::Bool, 2)), None);
        assert_eq!(unary_rule(UnaryOp::BitNot, vec(ScalarKind::Uint, 3)), Some(vec(ScalarKind::Uint, 3)));
        assert_eq!(unary_rule(UnaryOp::BitNot, FLOAT), None);
    }

    #[test]
    fn test_swizzles() {
        assert_eq!(swizzle_indices("rrgb", 4), Ok(vec![0, 0, 1, 2]));
        assert_eq!(swizzle_indices("st", 2), Ok(vec![0, 1]));
        assert!(swizzle_indices("xr", 3).is_err());
        assert!(swizzle_indices("z", 2).is_err());
        assert!(swizzle_indices("xyzwx", 4).is_err());
        assert!(is_swizzle_like("xyz"));
        assert!(!is_swizzle_like("length"));
        assert!(has_repeated_component(&[0, 1, 0]));
        assert!(!has_repeated_component(&[2, 1, 0]));
    }
}
