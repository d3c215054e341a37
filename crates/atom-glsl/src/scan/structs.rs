use crate::cursor::{word_before, word_positions, Cursor};
use crate::model::{FirstWins, Span, Struct};

use super::{parse_fields, Source};

/// A structure definition together with the declarators written after its
/// closing brace (`struct S { .. } a, b[2];`).
#[derive(Debug, Clone)]
pub(crate) struct StructDef {
    pub record: Struct,
    /// `(name, array token)` pairs.
    pub declarators: Vec<(String, Option<String>)>,
    /// Preceded by the `uniform` keyword.
    pub is_uniform: bool,
}

/// `struct Name { fields } [declarators];`
///
/// `full_text` runs through the terminating `;` when one follows the closing
/// brace, so inline declarators travel with the definition.
pub(crate) fn scan_struct_defs(src: &Source<'_>) -> Vec<StructDef> {
    let clean = src.clean();
    let mut found = FirstWins::new();

    for at in word_positions(clean, "struct") {
        let mut cur = Cursor::at(clean, at + "struct".len());
        let Some(name) = cur.ident() else { continue };
        if !cur.eat('{') {
            continue;
        }
        let open = cur.pos() - 1;
        let Some(close) = src.braces().close_of(open) else { continue };

        cur.set_pos(close + 1);
        let (end, declarators) = match cur.until(';').and_then(parse_declarators) {
            Some(decls) => (cur.pos(), decls),
            None => (close + 1, Vec::new()),
        };

        let uniform = word_before(clean, at).filter(|(_, w)| *w == "uniform");
        let start = uniform.map(|(s, _)| s).unwrap_or(at);
        let span = Span::new(start, end);
        found.insert(name, StructDef {
            record: Struct {
                name: name.to_string(),
                fields: parse_fields(src, Span::new(open + 1, close)),
                full_text: src.text(span),
                span,
                annotations: src.annotations_at(start),
            },
            declarators,
            is_uniform: uniform.is_some(),
        });
    }
    found.into_vec()
}

/// Parse `a, b[2]` (possibly empty). `None` when the text is anything else,
/// e.g. a following statement because the definition had no `;`.
fn parse_declarators(text: &str) -> Option<Vec<(String, Option<String>)>> {
    let mut out = Vec::new();
    if text.trim().is_empty() {
        return Some(out);
    }
    let mut cur = Cursor::at(text, 0);
    loop {
        let name = cur.ident()?;
        let array = if cur.eat('[') { Some(cur.until(']')?.trim().to_string()) } else { None };
        out.push((name.to_string(), array));
        if !cur.eat(',') {
            break;
        }
    }
    cur.skip_whitespace();
    (cur.pos() == text.len()).then_some(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scan(text: &str) -> Vec<StructDef> {
        scan_struct_defs(&Source::new(text))
    }

    #[test]
    fn definition_with_fields() {
        let defs = scan("struct Light {\n    vec3 position;\n    float radius[2];\n};\nvoid main() {}");
        assert_eq!(defs.len(), 1);
        let s = &defs[0].record;
        assert_eq!(s.name, "Light");
        assert_eq!(s.fields.len(), 2);
        assert!(s.full_text.ends_with("};"));
        assert!(defs[0].declarators.is_empty());
    }

    #[test]
    fn inline_declarators_extend_the_text() {
        let defs = scan("struct P { float x; } a, b[3];");
        assert_eq!(defs[0].record.full_text, "struct P { float x; } a, b[3];");
        assert_eq!(
            defs[0].declarators,
            vec![("a".to_string(), None), ("b".to_string(), Some("3".to_string()))]
        );
    }

    #[test]
    fn missing_semicolon_stops_at_brace() {
        let defs = scan("struct P { float x; }\nuniform float y;");
        assert_eq!(defs[0].record.full_text, "struct P { float x; }");
    }

    #[test]
    fn uniform_prefix_is_recorded() {
        let defs = scan("uniform struct M { float k; } m;");
        assert!(defs[0].is_uniform);
        assert!(defs[0].record.full_text.starts_with("uniform struct"));
    }
}
