//! Static knowledge base: the annotations the engine understands, their
//! values, and documentation for dialect types. Drives hover and completion.

use atom_glsl::types::{is_base_type, is_image, known_type_names, map_type, texture_target};

// ── Annotations ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy)]
pub struct AnnotationInfo {
    pub name: &'static str,
    pub doc: &'static str,
    /// Accepted values, empty when the value is free-form.
    pub values: &'static [ValueInfo],
    /// Only meaningful at the top of an auxiliary resource script.
    pub service: bool,
}

#[derive(Debug, Clone, Copy)]
pub struct ValueInfo {
    pub name: &'static str,
    pub doc: &'static str,
}

const PLACETARGET_VALUES: &[ValueInfo] = &[
    ValueInfo { name: "vertex",   doc: "Keep the declaration in the vertex stage only." },
    ValueInfo { name: "fragment", doc: "Keep the declaration in the fragment stage only." },
    ValueInfo { name: "both",     doc: "Keep one copy of the declaration in each stage." },
];

pub static ANNOTATIONS: &[AnnotationInfo] = &[
    AnnotationInfo {
        name: "placetarget",
        doc: "Moves the declaration below it into the named stage(s) when placement runs.\n\nUntagged declarations are never moved. Methods are inserted right before the stage's `main`; everything else goes to the top of the stage, after its `#version` line.",
        values: PLACETARGET_VALUES,
        service: false,
    },
    AnnotationInfo {
        name: "InterfaceName",
        doc: "Interface the generated renderer implements. Defaults to `I<Name>Renderer`.",
        values: &[],
        service: true,
    },
    AnnotationInfo {
        name: "ComponentName",
        doc: "Component type the script renders.",
        values: &[],
        service: true,
    },
    AnnotationInfo {
        name: "SystemName",
        doc: "System that drives the generated renderer.",
        values: &[],
        service: true,
    },
    AnnotationInfo {
        name: "RequiredComponent",
        doc: "A component the entity must carry. May appear more than once.",
        values: &[],
        service: true,
    },
];

pub fn annotation_by_name(name: &str) -> Option<&'static AnnotationInfo> {
    ANNOTATIONS.iter().find(|a| a.name.eq_ignore_ascii_case(name))
}

// ── Types ─────────────────────────────────────────────────────────────────

/// Opaque types offered by completion next to [`known_type_names`].
pub const OPAQUE_TYPES: &[&str] = &[
    "sampler1D", "sampler2D", "sampler3D", "samplerCube", "sampler2DArray",
    "sampler2DShadow", "samplerCubeShadow", "sampler2DMS", "samplerBuffer",
    "isampler2D", "usampler2D", "image2D", "image3D", "atomic_uint",
];

/// Qualifiers after which a type name is expected.
pub const QUALIFIERS: &[&str] = &[
    "uniform", "const", "in", "out", "inout", "flat", "smooth", "noperspective",
    "centroid", "highp", "mediump", "lowp", "readonly", "writeonly", "coherent",
];

pub fn builtin_type_names() -> impl Iterator<Item = &'static str> {
    known_type_names().chain(OPAQUE_TYPES.iter().copied())
}

/// Markdown documentation for a dialect type, or `None` for names the type
/// tables do not know.
pub fn type_doc(name: &str) -> Option<String> {
    if let Some(target) = texture_target(name) {
        return Some(format!(
            "**{}** · sampler\n\nBinds a `{:?}` texture. Generated wrappers hold it as `{}`.",
            name,
            target,
            map_type(name)
        ));
    }
    if is_image(name) {
        return Some(format!("**{}** · image\n\nGenerated wrappers hold it as `{}`.", name, map_type(name)));
    }
    if is_base_type(name) || name == "atomic_uint" {
        return Some(format!("**{}** → `{}`", name, map_type(name)));
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn annotation_lookup_ignores_case() {
        assert_eq!(annotation_by_name("PlaceTarget").map(|a| a.name), Some("placetarget"));
        assert!(annotation_by_name("Hidden").is_none());
    }

    #[test]
    fn type_docs() {
        assert_eq!(type_doc("vec3").as_deref(), Some("**vec3** → `Vector3<f32>`"));
        assert!(type_doc("sampler2D").is_some_and(|d| d.contains("Texture2D")));
        assert!(type_doc("LightData").is_none());
    }
}
