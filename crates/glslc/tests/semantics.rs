//! End-to-end checks through the public pipeline

use std::thread;

use glsl_compiler::eval::{Constant, Scalar, Value};
use glsl_compiler::frontend::ast::{BinaryOp, DeclKind, Declarator, TranslationUnit};
use glsl_compiler::frontend::sema::operators::binary_rule;
use glsl_compiler::types::{BasicType, ScalarKind};
use glsl_compiler::{DiagnosticCode, Stage, check_source};
use pretty_assertions::assert_eq;

fn codes(source: &str, stage: Stage) -> Vec<DiagnosticCode> {
    let output = check_source(source, stage).expect("source should parse");
    output.diagnostics.iter().map(|d| d.code).collect()
}

fn in_function(body: &str) -> Vec<DiagnosticCode> {
    codes(&format!("void f() {{ {} }}", body), Stage::None)
}

fn global<'a>(unit: &'a TranslationUnit, name: &str) -> &'a Declarator {
    unit.declarations
        .iter()
        .find_map(|d| match &d.kind {
            DeclKind::Variables(list) => list.declarators.iter().find(|v| v.name == name),
            _ => None,
        })
        .unwrap_or_else(|| panic!("no global '{}'", name))
}

/// Fold `const <ty> x = <expr>;` after any `prelude` declarations
fn fold_with(prelude: &str, ty: &str, expr: &str) -> Constant {
    let source = format!("{}\nconst {} x = {};", prelude, ty, expr);
    let output = check_source(&source, Stage::None).expect("source should parse");
    assert_eq!(output.diagnostics, vec![], "diagnostics for `{}`", expr);
    global(&output.unit, "x")
        .binding
        .as_ref()
        .and_then(|b| b.constant.clone())
        .unwrap_or_else(|| panic!("`{}` did not fold", expr))
}

fn fold(ty: &str, expr: &str) -> Constant {
    fold_with("", ty, expr)
}

fn floats(values: &[f32]) -> Vec<Scalar> {
    values.iter().map(|f| Scalar::Float(*f)).collect()
}

#[test]
fn test_radians_rounds_once() {
    let constant = fold("float", "radians(30.0)");
    assert_eq!(constant.value, Value::Scalar(Scalar::Float(30.0f64.to_radians() as f32)));
}

#[test]
fn test_uint_conversion_wraps() {
    assert_eq!(fold("uint", "uint(-1)").value, Value::Scalar(Scalar::Uint(u32::MAX)));
    assert_eq!(fold("uint", "uint(-2)").value, Value::Scalar(Scalar::Uint(u32::MAX - 1)));
}

#[test]
fn test_mod_wraps_negative_dividends() {
    assert_eq!(fold("float", "mod(-1.5, 1.0)").value, Value::Scalar(Scalar::Float(0.5)));
    assert_eq!(
        fold("vec2", "mod(vec2(-1.0, 5.0), 3.0)").value,
        Value::Vector(floats(&[2.0, 2.0]))
    );
    assert_eq!(fold("int", "-7 % 3").value, Value::Scalar(Scalar::Int(2)));
}

#[test]
fn test_length_folds_per_shape() {
    assert_eq!(fold("int", "vec3(1.0).length()").value, Value::Scalar(Scalar::Int(3)));
    assert_eq!(fold("int", "mat2x3(1.0).length()").value, Value::Scalar(Scalar::Int(2)));
    assert_eq!(fold("int", "float[4](1.0, 2.0, 3.0, 4.0).length()").value, Value::Scalar(Scalar::Int(4)));
}

#[test]
fn test_constructor_shapes() {
    assert_eq!(
        fold("mat2", "mat2(2)").value,
        Value::Matrix { data: vec![2.0, 0.0, 0.0, 2.0], cols: 2, rows: 2 }
    );
    assert_eq!(
        fold("vec4", "vec4(vec2(1), bvec2(0))").value,
        Value::Vector(floats(&[1.0, 1.0, 0.0, 0.0]))
    );
    assert_eq!(
        fold("vec4", "vec4(1, 2, 3, 4).rrgb").value,
        Value::Vector(floats(&[1.0, 1.0, 2.0, 3.0]))
    );
}

#[test]
fn test_struct_constructor_field() {
    let constant = fold_with("struct S { float f; };", "float", "S(2.0).f");
    assert_eq!(constant.value, Value::Scalar(Scalar::Float(2.0)));
}

#[test]
fn test_rejected_expressions() {
    assert_eq!(in_function("vec4 v = vec4(1.0); vec2 a = v.xg;"), vec![DiagnosticCode::InvalidSwizzle]);
    assert_eq!(in_function("float a = 1 + 1.0;"), vec![DiagnosticCode::OperatorMismatch]);
    assert_eq!(in_function("if (1) { }"), vec![DiagnosticCode::NonBoolCondition]);
    assert_eq!(in_function("1++;"), vec![DiagnosticCode::NotAnLvalue]);
}

#[test]
fn test_matrix_product_shapes() {
    assert_eq!(in_function("mat3 m = mat2x3(1.0) * mat3x2(1.0);"), vec![]);
    assert_eq!(in_function("vec2 v = vec3(1.0) * mat2x3(1.0);"), vec![]);
    assert_eq!(in_function("vec3 v = mat2x3(1.0) * vec2(1.0);"), vec![]);
    assert_eq!(
        in_function("mat2 m = mat2x3(1.0) * mat3x2(1.0);"),
        vec![DiagnosticCode::TypeMismatch]
    );
    assert_eq!(
        in_function("mat2x3(1.0) * mat2x3(1.0);"),
        vec![DiagnosticCode::OperatorMismatch]
    );
}

#[test]
fn test_folding_agrees_with_checking() {
    let operands = [
        (ScalarKind::Int, "7", "3"),
        (ScalarKind::Uint, "7u", "3u"),
        (ScalarKind::Float, "7.0", "3.0"),
        (ScalarKind::Bool, "true", "false"),
    ];

    for op in BinaryOp::ALL {
        for (left_kind, left, _) in operands {
            for (right_kind, _, right) in operands {
                let expr = format!("{} {} {}", left, op.as_str(), right);
                match binary_rule(op, BasicType::Scalar(left_kind), BasicType::Scalar(right_kind)) {
                    Some(result) => {
                        let constant = fold(&result.to_string(), &expr);
                        assert_eq!(constant.ty.to_string(), result.to_string(), "`{}`", expr);
                    }
                    None => assert_eq!(
                        in_function(&format!("{};", expr)),
                        vec![DiagnosticCode::OperatorMismatch],
                        "`{}`",
                        expr
                    ),
                }
            }
        }
    }
}

#[test]
fn test_folded_constants_reparse() {
    let prelude = "struct S { float f; ivec2 i; };";
    let cases = [
        ("vec3", "vec3(1.5, -2.0, 0.1)"),
        ("mat2", "mat2(1, 2, 3, 4)"),
        ("uint", "4294967295u"),
        ("bvec2", "bvec2(true, false)"),
        ("S", "S(1.0, ivec2(3, -4))"),
        ("float[2]", "float[2](1.0 / 3.0, 2.0)"),
    ];

    for (ty, expr) in cases {
        let first = fold_with(prelude, ty, expr);
        let second = fold_with(prelude, ty, &first.to_glsl());
        assert_eq!(first.value, second.value, "`{}` printed as `{}`", expr, first.to_glsl());
        assert_eq!(first.to_glsl(), second.to_glsl());
    }
}

const VERTEX_SHADER: &str = r"
in vec3 position;
in vec2 texcoord;
uniform mat4 mvp;
out vec2 uv;
invariant gl_Position;

void main() {
    uv = texcoord;
    gl_Position = mvp * vec4(position, 1.0);
}
";

const FRAGMENT_SHADER: &str = r"
precision mediump float;
uniform sampler2D tex;
uniform Material {
    vec4 tint;
    float gain;
} material;
in vec2 uv;
out vec4 color;

const int N = 3;
const float weights[N] = float[N](0.25, 0.5, 0.25);

void main() {
    vec4 sum = vec4(0.0);
    for (int i = 0; i < N; ++i) {
        sum += texture(tex, uv + vec2(float(i - 1) * 0.01, 0.0)) * weights[i];
    }
    color = sum * material.tint * material.gain;
    if (color.a < 0.01) discard;
}
";

#[test]
fn test_complete_shaders_are_clean() {
    assert_eq!(codes(VERTEX_SHADER, Stage::Vertex), vec![]);
    assert_eq!(codes(FRAGMENT_SHADER, Stage::Fragment), vec![]);
    assert_eq!(codes(FRAGMENT_SHADER, Stage::Vertex), vec![DiagnosticCode::StageRestriction]);
}

#[test]
fn test_checks_run_concurrently() {
    let handles: Vec<_> = (0..4)
        .map(|i| {
            thread::spawn(move || {
                let (source, stage) = if i % 2 == 0 {
                    (VERTEX_SHADER, Stage::Vertex)
                } else {
                    (FRAGMENT_SHADER, Stage::Fragment)
                };
                codes(source, stage)
            })
        })
        .collect();

    for handle in handles {
        assert_eq!(handle.join().unwrap(), vec![]);
    }
}
