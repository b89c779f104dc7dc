//! Builtin scope
//!
//! The standard library is declared in GLSL (`builtins.glsl`), parsed and
//! bound once per process, then shared read-only by every translation unit.

use lazy_static::lazy_static;

use super::binder::Binder;
use super::scope::{Binding, Scope};
use crate::frontend::parser::Parser;
use crate::types::{BasicType, SamplerDim, SamplerType, ScalarKind};

const BUILTINS_SOURCE: &str = include_str!("builtins.glsl");

lazy_static! {
    static ref BUILTINS: Scope = load_builtins();
}

/// The frozen builtin scope
pub fn builtin_scope() -> &'static Scope {
    &BUILTINS
}

fn load_builtins() -> Scope {
    let mut unit = match Parser::new(BUILTINS_SOURCE).and_then(|mut parser| parser.parse()) {
        Ok(unit) => unit,
        Err(e) => panic!("builtin declarations do not parse: {}", e),
    };

    let mut binder = Binder::for_builtins();
    binder.bind_unit(&mut unit);
    let (scope, diagnostics) = binder.finish();
    assert!(
        diagnostics.is_empty(),
        "builtin declarations do not bind: {:?}",
        diagnostics
    );

    let overloads: usize = scope
        .iter()
        .map(|(_, binding)| match binding {
            Binding::Function(f) => f.overloads.len(),
            _ => 0,
        })
        .sum();
    log::debug!("builtin scope: {} symbols, {} function overloads", scope.len(), overloads);

    scope
}

/// Members of a generic type family, in expansion order
pub fn generic_family(name: &str) -> Option<Vec<BasicType>> {
    let vectors = |kind: ScalarKind| (2..=4).map(move |n| BasicType::Vector(kind, n));
    let gen_type = |kind: ScalarKind| -> Vec<BasicType> {
        std::iter::once(BasicType::Scalar(kind)).chain(vectors(kind)).collect()
    };
    let samplers = |dim: SamplerDim| -> Vec<BasicType> {
        [ScalarKind::Float, ScalarKind::Int, ScalarKind::Uint]
            .into_iter()
            .map(|sampled| BasicType::Sampler(SamplerType { dim, sampled, shadow: false }))
            .collect()
    };

    let members = match name {
        "genType" => gen_type(ScalarKind::Float),
        "genIType" => gen_type(ScalarKind::Int),
        "genUType" => gen_type(ScalarKind::Uint),
        "genBType" => gen_type(ScalarKind::Bool),
        "vec" => vectors(ScalarKind::Float).collect(),
        "ivec" => vectors(ScalarKind::Int).collect(),
        "uvec" => vectors(ScalarKind::Uint).collect(),
        "bvec" => vectors(ScalarKind::Bool).collect(),
        "mat" => [(2, 2), (3, 3), (4, 4), (2, 3), (2, 4), (3, 2), (3, 4), (4, 2), (4, 3)]
            .into_iter()
            .map(|(cols, rows)| BasicType::Matrix { cols, rows })
            .collect(),
        "gsampler2D" => samplers(SamplerDim::Tex2D),
        "gsampler3D" => samplers(SamplerDim::Tex3D),
        "gsamplerCube" => samplers(SamplerDim::Cube),
        "gsampler2DArray" => samplers(SamplerDim::Tex2DArray),
        "gvec4" => [ScalarKind::Float, ScalarKind::Int, ScalarKind::Uint]
            .into_iter()
            .map(|kind| BasicType::Vector(kind, 4))
            .collect(),
        _ => return None,
    };
    Some(members)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::eval::Scalar;
    use crate::frontend::sema::FunctionBinding;
    use crate::types::Type;

    fn function(name: &str) -> &'static FunctionBinding {
        match builtin_scope().lookup(name) {
            Some(Binding::Function(f)) => f,
            other => panic!("'{}' is not a builtin function: {:?}", name, other),
        }
    }

    #[test]
    fn test_generic_families() {
        assert_eq!(generic_family("genType").map(|m| m.len()), Some(4));
        assert_eq!(generic_family("bvec").map(|m| m.len()), Some(3));
        assert_eq!(generic_family("mat").map(|m| m.len()), Some(9));
        assert_eq!(generic_family("gvec4").map(|m| m.len()), Some(3));
        assert_eq!(generic_family("float"), None);
    }

    #[test]
    fn test_clamp_expands_per_family_member() {
        // 4 + 3 per element kind; `clamp(float, float, float)` is shared
        assert_eq!(function("clamp").overloads.len(), 21);

        let vec3 = Type::vector(ScalarKind::Float, 3);
        let overload = function("clamp")
            .find_overload(&[Some(&vec3), Some(&Type::float()), Some(&Type::float())])
            .unwrap();
        assert_eq!(overload.result, Some(vec3));
    }

    #[test]
    fn test_families_advance_together() {
        let isampler = Type::Basic(BasicType::from_name("isampler2D").unwrap());
        let vec2 = Type::vector(ScalarKind::Float, 2);
        let overload = function("texture").find_overload(&[Some(&isampler), Some(&vec2)]).unwrap();
        assert_eq!(overload.result, Some(Type::vector(ScalarKind::Int, 4)));

        let vec3 = Type::vector(ScalarKind::Float, 3);
        let bvec3 = Type::vector(ScalarKind::Bool, 3);
        assert!(function("mix").find_overload(&[Some(&vec3), Some(&vec3), Some(&bvec3)]).is_some());
        let bvec2 = Type::vector(ScalarKind::Bool, 2);
        assert!(function("mix").find_overload(&[Some(&vec3), Some(&vec3), Some(&bvec2)]).is_none());
    }

    #[test]
    fn test_builtin_variables() {
        let Some(Binding::Variable(max)) = builtin_scope().lookup("gl_MaxDrawBuffers") else {
            panic!("gl_MaxDrawBuffers missing");
        };
        assert_eq!(max.constant.as_ref().and_then(|c| c.value.as_scalar()), Some(Scalar::Int(4)));

        let Some(Binding::Variable(position)) = builtin_scope().lookup("gl_Position") else {
            panic!("gl_Position missing");
        };
        assert!(position.is_output());
        assert!(position.is_writable());

        assert!(matches!(builtin_scope().lookup("gl_DepthRangeParameters"), Some(Binding::Struct(_))));
        assert!(function("sin").builtin);
    }

    #[test]
    fn test_scope_is_shareable() {
        fn assert_sync<T: Sync + Send>(_: &T) {}
        assert_sync(builtin_scope());
    }
}
