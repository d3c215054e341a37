//! Declaration scanners.
//!
//! Each scanner runs over a comment-blanked copy of the source (same byte
//! offsets as the raw text) and slices `full_text` back out of the raw text,
//! so records keep their comments and formatting verbatim.
//!
//! Within one scanner the first declaration of a name wins; later duplicates
//! are dropped.

pub(crate) mod blocks;
mod braces;
pub(crate) mod constants;
pub(crate) mod inout;
pub(crate) mod instances;
pub(crate) mod methods;
pub(crate) mod structs;
pub(crate) mod uniforms;
mod version;

use std::collections::BTreeSet;

use crate::annotations::extract_attributes_above;
use crate::cursor::{blank_comments, word_before, Cursor};
use crate::error::StructuralError;
use crate::model::{
    Annotation, ArraySize, BlockLayout, Constant, Field, FirstWins, InOutParam, Method,
    ShaderChunk, Span, Stage, Struct, StructInstance, Uniform, UniformBlock, Version,
};
use crate::resolve::array_size;

pub(crate) use braces::BraceMap;
pub(crate) use methods::find_main_entries;
pub(crate) use structs::StructDef;

pub(crate) const PRECISION: &[&str] = &["highp", "mediump", "lowp"];

// ── Source ────────────────────────────────────────────────────────────────

/// A source text prepared for scanning.
pub(crate) struct Source<'s> {
    raw: &'s str,
    clean: String,
    braces: BraceMap,
    /// Comment-blanked text searched when resolving symbolic array sizes.
    /// `None` means the source itself.
    definitions: Option<&'s str>,
}

impl<'s> Source<'s> {
    pub fn new(raw: &'s str) -> Self {
        let clean = blank_comments(raw);
        let braces = BraceMap::new(&clean);
        Self { raw, clean, braces, definitions: None }
    }

    /// Resolve array sizes against `definitions` instead of this text. Used
    /// for stage sections, whose sizes may be defined in the shared preamble.
    pub fn with_definitions(raw: &'s str, definitions: &'s str) -> Self {
        Self { definitions: Some(definitions), ..Self::new(raw) }
    }

    pub fn raw(&self) -> &'s str {
        self.raw
    }

    pub fn clean(&self) -> &str {
        &self.clean
    }

    pub fn braces(&self) -> &BraceMap {
        &self.braces
    }

    pub fn text(&self, span: Span) -> String {
        self.raw[span.start..span.end].to_string()
    }

    pub fn annotations_at(&self, pos: usize) -> Vec<Annotation> {
        extract_attributes_above(&self.clean, pos)
    }

    pub fn array_size(&self, token: &str) -> ArraySize {
        array_size(self.definitions.unwrap_or(&self.clean), token)
    }

    /// `true` when `span` lies inside some `{ }` pair.
    pub fn is_nested(&self, span: Span) -> bool {
        self.braces.is_enclosed(span)
    }
}

// ── Shared declaration pieces ─────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct LayoutQualifier {
    pub location: Option<u32>,
    pub binding: Option<u32>,
    pub memory: BlockLayout,
}

/// Parse `layout( ... )` at the cursor. Unknown items are ignored.
fn parse_layout(cur: &mut Cursor<'_>) -> Option<LayoutQualifier> {
    if !cur.keyword("layout") || !cur.eat('(') {
        return None;
    }
    let mut layout = LayoutQualifier::default();
    loop {
        let key = cur.ident()?;
        if cur.eat('=') {
            let value = cur.number();
            if value.is_none() {
                cur.ident()?;
            }
            match key {
                "location" => layout.location = value,
                "binding" => layout.binding = value,
                _ => {}
            }
        } else if let Some(memory) = BlockLayout::from_keyword(key) {
            layout.memory = memory;
        }
        if cur.eat(')') {
            return Some(layout);
        }
        if !cur.eat(',') {
            return None;
        }
    }
}

/// A `layout(...)` qualifier ending right before `pos` (whitespace between
/// is allowed). Returns its start offset with the parsed items.
pub(crate) fn layout_before(clean: &str, pos: usize) -> Option<(usize, LayoutQualifier)> {
    let end = clean[..pos].trim_end().len();
    if !clean[..end].ends_with(')') {
        return None;
    }
    let open = clean[..end - 1].rfind('(')?;
    let (start, word) = word_before(clean, open)?;
    if word != "layout" {
        return None;
    }
    let mut cur = Cursor::at(clean, start);
    let layout = parse_layout(&mut cur)?;
    (cur.pos() == end).then_some((start, layout))
}

/// Parse an optional `[size]` suffix. `None` means malformed; `Some(None)`
/// means there was no suffix. Empty brackets are treated as malformed.
pub(crate) fn array_suffix(cur: &mut Cursor<'_>, src: &Source<'_>) -> Option<Option<ArraySize>> {
    if !cur.eat('[') {
        return Some(None);
    }
    let token = cur.until(']')?.trim();
    if token.is_empty() || !token.chars().all(crate::cursor::is_ident_char) {
        return None;
    }
    Some(Some(src.array_size(token)))
}

/// Parse the member declarations of a block or structure body.
///
/// Each `;`-terminated statement may declare several names
/// (`float a, b[2];`); every declarator becomes a [`Field`]
/// sharing the statement's text.
pub(crate) fn parse_fields(src: &Source<'_>, body: Span) -> Vec<Field> {
    const MEMBER_QUALIFIERS: &[&str] = &[
        "highp", "mediump", "lowp", "flat", "smooth", "noperspective", "centroid", "invariant",
        "precise", "row_major", "column_major",
    ];

    let clean = src.clean();
    let mut fields = FirstWins::new();
    let mut stmt_start = body.start;

    while let Some(rel) = clean[stmt_start..body.end].find(';') {
        let stmt_end = stmt_start + rel + 1;
        let start = stmt_start + (clean[stmt_start..stmt_end].len()
            - clean[stmt_start..stmt_end].trim_start().len());
        let span = Span::new(start, stmt_end);
        stmt_start = stmt_end;

        let mut cur = Cursor::at(&clean[..stmt_end], start);
        let _ = layout_at(&mut cur);
        while cur.one_of(MEMBER_QUALIFIERS).is_some() {}
        let Some(ty) = cur.ident() else { continue };

        let annotations = src.annotations_at(start);
        loop {
            let Some(name) = cur.ident() else { break };
            let Some(array) = array_suffix(&mut cur, src) else { break };
            let field = Field {
                name: name.to_string(),
                ty: ty.to_string(),
                canonical: crate::types::map_type(ty).to_string(),
                array,
                full_text: src.text(span),
                span,
                annotations: annotations.clone(),
            };
            fields.insert(name, field);
            if !cur.eat(',') {
                break;
            }
        }
    }
    fields.into_vec()
}

/// Parse a `layout(...)` qualifier if one starts at the cursor.
fn layout_at(cur: &mut Cursor<'_>) -> Option<LayoutQualifier> {
    let saved = cur.pos();
    let parsed = parse_layout(cur);
    if parsed.is_none() {
        cur.set_pos(saved);
    }
    parsed
}

// ── Public entry points ───────────────────────────────────────────────────

pub fn extract_version(source: &str) -> Option<Version> {
    version::scan_version(&Source::new(source))
}

pub fn extract_constants(source: &str) -> Vec<Constant> {
    constants::scan_constants(&Source::new(source))
}

pub fn extract_uniforms(source: &str) -> Vec<Uniform> {
    uniforms::scan_uniforms(&Source::new(source))
}

pub fn extract_uniform_blocks(source: &str) -> Vec<UniformBlock> {
    blocks::scan_uniform_blocks(&Source::new(source))
}

/// Binding slots claimed by `std140` uniform blocks.
pub fn extract_uniform_block_bindings(source: &str) -> BTreeSet<u32> {
    blocks::scan_uniform_blocks(&Source::new(source))
        .into_iter()
        .filter(|b| b.layout == BlockLayout::Std140)
        .filter_map(|b| b.binding)
        .collect()
}

pub fn extract_structures(source: &str) -> Vec<Struct> {
    structs::scan_struct_defs(&Source::new(source))
        .into_iter()
        .map(|def| def.record)
        .collect()
}

/// Struct instances from all three declaration forms: `uniform S name;`,
/// declarators after a definition (`struct S { .. } a, b[2];`) and bare
/// top-level `S name;`.
pub fn extract_struct_instances(source: &str) -> Vec<StructInstance> {
    let src = Source::new(source);
    let defs = structs::scan_struct_defs(&src);
    instances::scan_struct_instances(&src, &defs)
}

pub fn extract_in_out(source: &str) -> Vec<InOutParam> {
    inout::scan_in_out(&Source::new(source))
}

/// Top-level function definitions, `main` included.
///
/// # Errors
///
/// [`StructuralError::UnterminatedMethod`] when a body's braces never
/// balance.
pub fn extract_methods(source: &str) -> Result<Vec<Method>, StructuralError> {
    methods::scan_methods(&Source::new(source))
}

/// Scan one stage section into a [`ShaderChunk`].
///
/// `definitions` is the comment-blanked combined source, used to resolve
/// symbolic array sizes. `fallback_version` is used when the section has no
/// `#version` line of its own.
pub(crate) fn scan_chunk(
    stage: Stage,
    offset: usize,
    text: &str,
    definitions: &str,
    fallback_version: Option<&Version>,
) -> Result<ShaderChunk, StructuralError> {
    let src = Source::with_definitions(text, definitions);
    let defs = structs::scan_struct_defs(&src);
    let struct_instances = instances::scan_struct_instances(&src, &defs);
    Ok(ShaderChunk {
        stage,
        offset,
        text: text.to_string(),
        version: version::scan_version(&src).or_else(|| fallback_version.cloned()),
        constants: constants::scan_constants(&src),
        uniforms: uniforms::scan_uniforms(&src),
        uniform_blocks: blocks::scan_uniform_blocks(&src),
        structures: defs.into_iter().map(|def| def.record).collect(),
        struct_instances,
        in_out: inout::scan_in_out(&src),
        methods: methods::scan_methods(&src)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layout_lookback() {
        let src = "layout(std140, binding = 2) uniform Block { float a; };";
        let at = src.find("uniform").unwrap();
        let (start, layout) = layout_before(src, at).unwrap();
        assert_eq!(start, 0);
        assert_eq!(layout.binding, Some(2));
        assert_eq!(layout.memory, BlockLayout::Std140);
    }

    #[test]
    fn layout_lookback_requires_layout_word() {
        let src = "foo(1) uniform float a;";
        let at = src.find("uniform").unwrap();
        assert_eq!(layout_before(src, at), None);
    }

    #[test]
    fn std140_bindings() {
        let src = "layout(std140, binding = 2) uniform A { float a; };\n\
                   layout(std140, binding = 0) uniform B { float b; };\n\
                   layout(std430, binding = 5) uniform C { float c; };\n\
                   layout(std140, binding = 2) uniform D { float d; };";
        let bindings: Vec<u32> = extract_uniform_block_bindings(src).into_iter().collect();
        assert_eq!(bindings, vec![0, 2]);
    }

    #[test]
    fn fields_with_multiple_declarators() {
        let src = Source::new("{ vec3 a, b[2];\n  // note\n  highp float c; }");
        let body = Span::new(1, src.raw().len() - 1);
        let fields = parse_fields(&src, body);
        let names: Vec<_> = fields.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["a", "b", "c"]);
        assert_eq!(fields[1].array, Some(ArraySize::Fixed(2)));
        assert_eq!(fields[2].full_text, "highp float c;");
        assert_eq!(fields[2].canonical, "f32");
    }
}
