use crate::cursor::{word_positions, Cursor};
use crate::model::{FirstWins, Span, UniformBlock};

use super::{array_suffix, layout_before, parse_fields, Source};

/// `[layout(..)] uniform [Name] { fields } [instance];`
///
/// Blocks are keyed by block name, falling back to the instance name. A block
/// with neither is skipped.
pub(crate) fn scan_uniform_blocks(src: &Source<'_>) -> Vec<UniformBlock> {
    let clean = src.clean();
    let mut found = FirstWins::new();

    for at in word_positions(clean, "uniform") {
        let mut cur = Cursor::at(clean, at + "uniform".len());
        let name = cur.ident();
        if !cur.eat('{') {
            continue;
        }
        let open = cur.pos() - 1;
        let Some(close) = src.braces().close_of(open) else { continue };

        cur.set_pos(close + 1);
        let instance_name = cur.ident();
        if instance_name.is_some() && array_suffix(&mut cur, src).is_none() {
            continue;
        }
        if !cur.eat(';') {
            continue;
        }

        let Some(key) = name.or(instance_name) else {
            log::debug!("skipping uniform block without a name at offset {}", at);
            continue;
        };

        let layout = layout_before(clean, at);
        let start = layout.map(|(start, _)| start).unwrap_or(at);
        let span = Span::new(start, cur.pos());
        found.insert(key, UniformBlock {
            name: name.map(str::to_string),
            instance_name: instance_name.map(str::to_string),
            layout: layout.map(|(_, l)| l.memory).unwrap_or_default(),
            binding: layout.and_then(|(_, l)| l.binding),
            fields: parse_fields(src, Span::new(open + 1, close)),
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
    use crate::model::BlockLayout;

    fn scan(text: &str) -> Vec<UniformBlock> {
        scan_uniform_blocks(&Source::new(text))
    }

    #[test]
    fn named_block_with_layout() {
        let src = "[placetarget:both]\nlayout(std140, binding = 1) uniform Camera {\n    mat4 view;\n    mat4 projection;\n};";
        let blocks = scan(src);
        assert_eq!(blocks.len(), 1);
        let b = &blocks[0];
        assert_eq!(b.ident(), "Camera");
        assert_eq!(b.layout, BlockLayout::Std140);
        assert_eq!(b.binding, Some(1));
        assert_eq!(b.fields.len(), 2);
        assert_eq!(b.fields[1].name, "projection");
        assert!(b.full_text.starts_with("layout(std140"));
        assert!(b.full_text.ends_with("};"));
        assert_eq!(b.annotations.len(), 1);
    }

    #[test]
    fn instance_name_is_the_fallback_key() {
        let blocks = scan("uniform { float time; } globals;");
        assert_eq!(blocks[0].name, None);
        assert_eq!(blocks[0].ident(), "globals");
    }

    #[test]
    fn anonymous_blocks_are_skipped() {
        assert!(scan("uniform { float time; };").is_empty());
    }

    #[test]
    fn instance_arrays_are_accepted() {
        let blocks = scan("uniform Light { vec3 pos; } lights[4];");
        assert_eq!(blocks[0].instance_name.as_deref(), Some("lights"));
    }

    #[test]
    fn plain_uniforms_are_not_blocks() {
        assert!(scan("uniform float a;").is_empty());
    }
}
