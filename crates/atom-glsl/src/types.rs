//! Dialect type names → canonical target type names.
//!
//! The canonical names are what a wrapper generator emits and what the
//! material analyzer ([`crate::material`]) classifies. Unknown names (user
//! structures, mostly) map to themselves.

use serde::{Deserialize, Serialize};

// ── Scalar / vector / matrix table ────────────────────────────────────────

const BASE_TYPES: &[(&str, &str)] = &[
    ("bool",    "bool"),
    ("int",     "i32"),
    ("uint",    "u32"),
    ("float",   "f32"),
    ("double",  "f64"),

    ("bvec2",   "Vector2<bool>"),
    ("bvec3",   "Vector3<bool>"),
    ("bvec4",   "Vector4<bool>"),
    ("ivec2",   "Vector2<i32>"),
    ("ivec3",   "Vector3<i32>"),
    ("ivec4",   "Vector4<i32>"),
    ("uvec2",   "Vector2<u32>"),
    ("uvec3",   "Vector3<u32>"),
    ("uvec4",   "Vector4<u32>"),
    ("vec2",    "Vector2<f32>"),
    ("vec3",    "Vector3<f32>"),
    ("vec4",    "Vector4<f32>"),
    ("dvec2",   "Vector2<f64>"),
    ("dvec3",   "Vector3<f64>"),
    ("dvec4",   "Vector4<f64>"),

    ("mat2",    "Matrix2x2<f32>"),
    ("mat3",    "Matrix3x3<f32>"),
    ("mat4",    "Matrix4x4<f32>"),
    ("mat2x2",  "Matrix2x2<f32>"),
    ("mat2x3",  "Matrix2x3<f32>"),
    ("mat2x4",  "Matrix2x4<f32>"),
    ("mat3x2",  "Matrix3x2<f32>"),
    ("mat3x3",  "Matrix3x3<f32>"),
    ("mat3x4",  "Matrix3x4<f32>"),
    ("mat4x2",  "Matrix4x2<f32>"),
    ("mat4x3",  "Matrix4x3<f32>"),
    ("mat4x4",  "Matrix4x4<f32>"),
    ("dmat2",   "Matrix2x2<f64>"),
    ("dmat3",   "Matrix3x3<f64>"),
    ("dmat4",   "Matrix4x4<f64>"),
    ("dmat2x2", "Matrix2x2<f64>"),
    ("dmat2x3", "Matrix2x3<f64>"),
    ("dmat2x4", "Matrix2x4<f64>"),
    ("dmat3x2", "Matrix3x2<f64>"),
    ("dmat3x3", "Matrix3x3<f64>"),
    ("dmat3x4", "Matrix3x4<f64>"),
    ("dmat4x2", "Matrix4x2<f64>"),
    ("dmat4x3", "Matrix4x3<f64>"),
    ("dmat4x4", "Matrix4x4<f64>"),
];

/// Canonical type used for every opaque handle (samplers, images).
pub const HANDLE_TYPE: &str = "i32";

/// Map a dialect type name to its canonical name.
///
/// Samplers and images map to [`HANDLE_TYPE`]; `atomic_uint` maps to `u32`;
/// anything unrecognized is returned unchanged.
pub fn map_type(ty: &str) -> &str {
    if let Some((_, canonical)) = BASE_TYPES.iter().find(|(name, _)| *name == ty) {
        return *canonical;
    }
    if is_sampler(ty) || is_image(ty) {
        return HANDLE_TYPE;
    }
    match ty {
        "atomic_uint" => "u32",
        _ => ty,
    }
}

/// Scalars, vectors and matrices (no opaque types, no `void`).
pub fn is_base_type(ty: &str) -> bool {
    BASE_TYPES.iter().any(|(name, _)| *name == ty)
}

pub fn is_matrix(ty: &str) -> bool {
    is_base_type(ty) && (ty.starts_with("mat") || ty.starts_with("dmat"))
}

pub fn is_sampler(ty: &str) -> bool {
    texture_target(ty).is_some()
}

pub fn is_image(ty: &str) -> bool {
    let Some(rest) = ["iimage", "uimage", "image"].iter().find_map(|p| ty.strip_prefix(p)) else {
        return false;
    };
    dimension_target(rest).is_some()
}

/// `true` for names the mapping leaves untouched: user structures and any
/// other identifier the tables do not know.
pub fn is_custom_type(ty: &str) -> bool {
    map_type(ty) == ty && !matches!(ty, "bool" | "void")
}

/// Every dialect type name the tables know, for completion lists.
pub fn known_type_names() -> impl Iterator<Item = &'static str> {
    BASE_TYPES.iter().map(|(name, _)| *name)
}

// ── Texture targets ───────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TextureTarget {
    Texture1D,
    Texture2D,
    Texture3D,
    TextureCubeMap,
    TextureRectangle,
    Texture1DArray,
    Texture2DArray,
    TextureCubeMapArray,
    TextureBuffer,
    Texture2DMultisample,
    Texture2DMultisampleArray,
}

/// The texture target a sampler type binds to, or `None` for non-samplers.
pub fn texture_target(ty: &str) -> Option<TextureTarget> {
    let (integer, rest) = if let Some(rest) = ty.strip_prefix("isampler") {
        (true, rest)
    } else if let Some(rest) = ty.strip_prefix("usampler") {
        (true, rest)
    } else {
        (false, ty.strip_prefix("sampler")?)
    };

    match rest.strip_suffix("Shadow") {
        // integer samplers have no shadow variants
        Some(_) if integer => None,
        Some(base) => shadow_target(base),
        None => dimension_target(rest),
    }
}

fn dimension_target(suffix: &str) -> Option<TextureTarget> {
    use TextureTarget::*;
    Some(match suffix {
        "1D" => Texture1D,
        "2D" => Texture2D,
        "3D" => Texture3D,
        "Cube" => TextureCubeMap,
        "2DRect" => TextureRectangle,
        "1DArray" => Texture1DArray,
        "2DArray" => Texture2DArray,
        "CubeArray" => TextureCubeMapArray,
        "Buffer" => TextureBuffer,
        "2DMS" => Texture2DMultisample,
        "2DMSArray" => Texture2DMultisampleArray,
        _ => return None,
    })
}

fn shadow_target(base: &str) -> Option<TextureTarget> {
    match base {
        "1D" | "2D" | "Cube" | "2DRect" | "1DArray" | "2DArray" | "CubeArray" => {
            dimension_target(base)
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vectors_and_matrices() {
        assert_eq!(map_type("vec3"), "Vector3<f32>");
        assert_eq!(map_type("ivec2"), "Vector2<i32>");
        assert_eq!(map_type("mat4"), map_type("mat4x4"));
        assert!(is_matrix("mat3x2"));
        assert!(is_matrix("dmat4"));
        assert!(!is_matrix("vec4"));
    }

    #[test]
    fn opaque_handles_map_to_integer() {
        assert_eq!(map_type("sampler2D"), HANDLE_TYPE);
        assert_eq!(map_type("usampler2DArray"), HANDLE_TYPE);
        assert_eq!(map_type("image2D"), HANDLE_TYPE);
        assert_eq!(map_type("atomic_uint"), "u32");
    }

    #[test]
    fn user_types_pass_through() {
        assert_eq!(map_type("LightData"), "LightData");
        assert!(is_custom_type("LightData"));
        assert!(!is_custom_type("vec2"));
        assert!(!is_custom_type("float"));
    }

    #[test]
    fn sampler_targets() {
        assert_eq!(texture_target("samplerCube"), Some(TextureTarget::TextureCubeMap));
        assert_eq!(texture_target("sampler2DShadow"), Some(TextureTarget::Texture2D));
        assert_eq!(texture_target("isampler2DMSArray"), Some(TextureTarget::Texture2DMultisampleArray));
        assert_eq!(texture_target("isampler2DShadow"), None);
        assert_eq!(texture_target("sampler3DShadow"), None);
        assert_eq!(texture_target("vec4"), None);
        assert!(is_sampler("sampler2D"));
        assert!(!is_sampler("image2D"));
    }
}
