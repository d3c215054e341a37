use crate::cursor::{word_before, word_positions, Cursor};
use crate::model::{Direction, FirstWins, InOutParam, Span};
use crate::types::map_type;

use super::{array_suffix, layout_before, Source, PRECISION};

const INTERPOLATION: &[&str] = &["flat", "smooth", "noperspective", "centroid", "invariant"];

/// Stage-level `[layout(..)] [interpolation] in|out [precision] type name[N]?;`
///
/// Function parameters never match (they end in `,` or `)`), and interface
/// blocks (`out Name { .. }`) are skipped.
pub(crate) fn scan_in_out(src: &Source<'_>) -> Vec<InOutParam> {
    let clean = src.clean();
    let mut candidates: Vec<InOutParam> = Vec::new();

    for direction in [Direction::In, Direction::Out] {
        let kw = direction.keyword();
        for at in word_positions(clean, kw) {
            let mut cur = Cursor::at(clean, at + kw.len());
            cur.one_of(PRECISION);
            let Some(ty) = cur.ident() else { continue };
            let Some(name) = cur.ident() else { continue };
            let Some(array) = array_suffix(&mut cur, src) else { continue };
            if !cur.eat(';') {
                continue;
            }

            let interpolation = word_before(clean, at).filter(|(_, w)| INTERPOLATION.contains(w));
            let mut start = interpolation.map(|(s, _)| s).unwrap_or(at);
            let layout = layout_before(clean, start);
            if let Some((s, _)) = layout {
                start = s;
            }
            let span = Span::new(start, cur.pos());
            if src.is_nested(span) {
                continue;
            }
            candidates.push(InOutParam {
                direction,
                location: layout.and_then(|(_, l)| l.location),
                interpolation: interpolation.map(|(_, w)| w.to_string()),
                name: name.to_string(),
                ty: ty.to_string(),
                canonical: map_type(ty).to_string(),
                array,
                full_text: src.text(span),
                span,
                annotations: src.annotations_at(start),
            });
        }
    }

    candidates.sort_by_key(|p| p.span.start);
    let mut found = FirstWins::new();
    for param in candidates {
        let name = param.name.clone();
        found.insert(&name, param);
    }
    found.into_vec()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scan(text: &str) -> Vec<InOutParam> {
        scan_in_out(&Source::new(text))
    }

    #[test]
    fn attributes_and_varyings_in_source_order() {
        let src = "layout(location = 0) in vec3 aPos;\nout vec2 vUv;\nflat in int vId;";
        let params = scan(src);
        let names: Vec<_> = params.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["aPos", "vUv", "vId"]);
        assert_eq!(params[0].location, Some(0));
        assert_eq!(params[0].full_text, "layout(location = 0) in vec3 aPos;");
        assert_eq!(params[1].direction, Direction::Out);
        assert_eq!(params[2].interpolation.as_deref(), Some("flat"));
        assert_eq!(params[2].full_text, "flat in int vId;");
    }

    #[test]
    fn function_parameters_are_not_stage_variables() {
        assert!(scan("void f(in vec3 a, out float b) { }").is_empty());
    }

    #[test]
    fn interface_blocks_are_skipped() {
        assert!(scan("out VS_OUT { vec3 n; } vs;").is_empty());
    }

    #[test]
    fn duplicates_keep_the_first() {
        let params = scan("in vec3 n;\nout vec3 n;");
        assert_eq!(params.len(), 1);
        assert_eq!(params[0].direction, Direction::In);
    }
}
