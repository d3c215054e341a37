use crate::cursor::{split_top_level, word_before, word_positions, Cursor};
use crate::error::StructuralError;
use crate::model::{FirstWins, Method, MethodParam, Span};
use crate::types::map_type;

use super::{Source, PRECISION};

/// Words that can sit right before `(` + `{` without being a function.
const CONTROL_FLOW: &[&str] = &["if", "for", "while", "switch", "do", "else", "return"];

const PARAM_QUALIFIERS: &[&str] = &["in", "out", "inout", "const"];

/// Top-level function definitions, in source order, `main` included.
///
/// Each top-level `{` preceded by `type name ( params )` is a definition.
/// Its body extends to the matching `}`.
pub(crate) fn scan_methods(src: &Source<'_>) -> Result<Vec<Method>, StructuralError> {
    let clean = src.clean();
    let mut found = FirstWins::new();

    for pair in src.braces().top_level() {
        let Some(header) = header_before(clean, pair.open) else { continue };
        let Some(close) = pair.close else {
            return Err(StructuralError::UnterminatedMethod {
                name: header.name.to_string(),
                offset: header.start,
            });
        };

        let span = Span::new(header.start, close + 1);
        found.insert(header.name, Method {
            name: header.name.to_string(),
            return_type: header.return_type.to_string(),
            params: parse_params(src, &clean[header.params.start..header.params.end]),
            full_text: src.text(span),
            span,
            annotations: src.annotations_at(header.start),
        });
    }
    Ok(found.into_vec())
}

struct Header<'s> {
    start: usize,
    return_type: &'s str,
    name: &'s str,
    /// Between the parentheses.
    params: Span,
}

/// Recognize `[precision] type name ( params )` ending right before `open`.
fn header_before(clean: &str, open: usize) -> Option<Header<'_>> {
    let end = clean[..open].trim_end().len();
    if !clean[..end].ends_with(')') {
        return None;
    }
    let lparen = matching_open_paren(clean, end - 1)?;
    let (name_start, name) = word_before(clean, lparen)?;
    if CONTROL_FLOW.contains(&name) || !is_identifier(name) {
        return None;
    }
    let (mut start, return_type) = word_before(clean, name_start)?;
    if !is_identifier(return_type) || matches!(return_type, "return" | "else" | "layout") {
        return None;
    }
    if let Some((s, w)) = word_before(clean, start) {
        if PRECISION.contains(&w) {
            start = s;
        }
    }
    Some(Header { start, return_type, name, params: Span::new(lparen + 1, end - 1) })
}

/// Offset of the `(` matching the `)` at `close`.
fn matching_open_paren(clean: &str, close: usize) -> Option<usize> {
    let mut depth = 0usize;
    for (i, b) in clean.as_bytes()[..=close].iter().enumerate().rev() {
        match b {
            b')' => depth += 1,
            b'(' => {
                depth -= 1;
                if depth == 0 {
                    return Some(i);
                }
            }
            _ => {}
        }
    }
    None
}

fn is_identifier(word: &str) -> bool {
    word.chars().next().is_some_and(crate::cursor::is_ident_start)
}

fn parse_params(src: &Source<'_>, text: &str) -> Vec<MethodParam> {
    let trimmed = text.trim();
    if trimmed.is_empty() || trimmed == "void" {
        return Vec::new();
    }
    split_top_level(trimmed).into_iter().filter_map(|part| parse_param(src, part)).collect()
}

/// `[qualifiers] type name[N]?`, where the `[N]` may also follow the type.
fn parse_param(src: &Source<'_>, part: &str) -> Option<MethodParam> {
    let (words, array) = match (part.find('['), part.rfind(']')) {
        (Some(l), Some(r)) if l < r => {
            let token = part[l + 1..r].trim();
            (format!("{} {}", &part[..l], &part[r + 1..]), Some(src.array_size(token)))
        }
        _ => (part.to_string(), None),
    };
    let tokens: Vec<&str> = words.split_whitespace().collect();
    let qualifier = tokens.iter().find(|t| PARAM_QUALIFIERS.contains(t)).map(|t| t.to_string());
    let typed: Vec<&str> = tokens
        .iter()
        .copied()
        .filter(|t| !PARAM_QUALIFIERS.contains(t) && !PRECISION.contains(t))
        .collect();

    let (ty, name) = match typed.as_slice() {
        [ty] => (*ty, ""),
        [.., ty, name] => (*ty, *name),
        [] => return None,
    };
    Some(MethodParam {
        qualifier,
        ty: ty.to_string(),
        canonical: map_type(ty).to_string(),
        name: name.to_string(),
        array,
    })
}

/// Offsets of every `void main ( [void] ) {` header.
pub(crate) fn find_main_entries(clean: &str) -> Vec<usize> {
    word_positions(clean, "main")
        .into_iter()
        .filter_map(|at| {
            let (start, ret) = word_before(clean, at)?;
            if ret != "void" {
                return None;
            }
            let mut cur = Cursor::at(clean, at + "main".len());
            if !cur.eat('(') {
                return None;
            }
            cur.keyword("void");
            (cur.eat(')') && cur.eat('{')).then_some(start)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ArraySize;

    fn scan(text: &str) -> Result<Vec<Method>, StructuralError> {
        scan_methods(&Source::new(text))
    }

    #[test]
    fn functions_with_params_and_bodies() {
        let src = "float lum(in vec3 c, const float w[3]) {\n    if (c.x > 0.0) { return 1.0; }\n    return dot(c, vec3(w[0]));\n}\nvoid main() { }";
        let methods = scan(src).unwrap();
        assert_eq!(methods.len(), 2);
        let lum = &methods[0];
        assert_eq!(lum.name, "lum");
        assert_eq!(lum.return_type, "float");
        assert_eq!(lum.params.len(), 2);
        assert_eq!(lum.params[0].qualifier.as_deref(), Some("in"));
        assert_eq!(lum.params[0].canonical, "Vector3<f32>");
        assert_eq!(lum.params[1].name, "w");
        assert_eq!(lum.params[1].array, Some(ArraySize::Fixed(3)));
        assert!(lum.full_text.ends_with("return dot(c, vec3(w[0]));\n}"));
        assert_eq!(methods[1].name, "main");
    }

    #[test]
    fn blocks_and_structs_are_not_methods() {
        let src = "struct S { float x; };\nlayout(std140) uniform B { float y; };\nvoid main() {}";
        let methods = scan(src).unwrap();
        assert_eq!(methods.len(), 1);
    }

    #[test]
    fn braces_inside_comments_do_not_count() {
        let src = "void f() {\n    // }\n    /* { */\n}\nvoid main() {}";
        let methods = scan(src).unwrap();
        assert_eq!(methods.len(), 2);
        assert!(methods[0].full_text.contains("/* { */"));
    }

    #[test]
    fn unterminated_body_is_an_error() {
        let err = scan("void main() {}\nvoid broken() {\n    if (x) {\n").unwrap_err();
        assert_eq!(
            err,
            StructuralError::UnterminatedMethod { name: "broken".into(), offset: 15 }
        );
    }

    #[test]
    fn void_parameter_list_is_empty() {
        let methods = scan("void main(void) {}").unwrap();
        assert!(methods[0].params.is_empty());
    }

    #[test]
    fn main_entries() {
        assert_eq!(find_main_entries("void main() {}\nvoid main ( void ){ }").len(), 2);
        assert!(find_main_entries("int main() {}").is_empty());
    }
}
