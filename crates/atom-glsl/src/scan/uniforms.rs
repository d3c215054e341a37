use crate::cursor::{word_positions, Cursor};
use crate::model::{FirstWins, Span, Uniform};
use crate::types::map_type;

use super::{array_suffix, layout_before, Source, PRECISION};

/// `[layout(..)] uniform [precision] type name[N]?;`
///
/// Uniform blocks (`uniform Name { .. }`) are left to the block scanner.
pub(crate) fn scan_uniforms(src: &Source<'_>) -> Vec<Uniform> {
    let clean = src.clean();
    let mut found = FirstWins::new();

    for at in word_positions(clean, "uniform") {
        let mut cur = Cursor::at(clean, at + "uniform".len());
        cur.one_of(PRECISION);
        let Some(ty) = cur.ident() else { continue };
        if ty == "struct" {
            continue;
        }
        let Some(name) = cur.ident() else { continue };
        let Some(array) = array_suffix(&mut cur, src) else { continue };
        if !cur.eat(';') {
            continue;
        }

        let layout = layout_before(clean, at);
        let start = layout.map(|(start, _)| start).unwrap_or(at);
        let span = Span::new(start, cur.pos());
        found.insert(name, Uniform {
            name: name.to_string(),
            ty: ty.to_string(),
            canonical: map_type(ty).to_string(),
            array,
            location: layout.and_then(|(_, l)| l.location),
            full_text: src.text(span),
            span,
            annotations: src.annotations_at(start),
        });
    }
    found.into_vec()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ArraySize;

    fn scan(text: &str) -> Vec<Uniform> {
        scan_uniforms(&Source::new(text))
    }

    #[test]
    fn plain_and_located_uniforms() {
        let u = scan("uniform mat4 model;\nlayout(location = 3) uniform highp vec4 tint;");
        assert_eq!(u.len(), 2);
        assert_eq!(u[0].canonical, "Matrix4x4<f32>");
        assert_eq!(u[1].location, Some(3));
        assert_eq!(u[1].full_text, "layout(location = 3) uniform highp vec4 tint;");
    }

    #[test]
    fn blocks_are_not_uniforms() {
        assert!(scan("uniform Camera { mat4 view; };").is_empty());
        assert!(scan("layout(std140) uniform { mat4 view; } cam;").is_empty());
    }

    #[test]
    fn sampler_arrays_resolve_size() {
        let u = scan("const int COUNT = 4;\nuniform sampler2D maps[COUNT];");
        assert_eq!(u[0].array, Some(ArraySize::Fixed(4)));
        assert_eq!(u[0].canonical, "i32");
    }

    #[test]
    fn annotations_above_are_attached() {
        let u = scan("[placetarget:fragment]\n[Tooltip:Albedo]\nuniform sampler2D albedo;");
        assert_eq!(u[0].annotations.len(), 2);
    }

    #[test]
    fn commented_uniforms_are_ignored() {
        assert!(scan("// uniform float a;\n/* uniform float b; */").is_empty());
    }
}
