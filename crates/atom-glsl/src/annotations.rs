//! Bracket annotations: `[Name]` and `[Name:Value]` lines above declarations.

use crate::cursor::{is_ident_char, is_ident_start, line_start};
use crate::model::Annotation;

/// Collect the annotations attached to the declaration starting at
/// `position`.
///
/// Walks upward from the declaration's line. Blank and comment-only lines are
/// skipped. A line holding nothing but annotations contributes them and the
/// walk continues. A line mixing annotations with code contributes its
/// annotations and ends the walk. Any other line ends the walk. Annotations
/// written on the declaration's own line, before it, are included too.
///
/// The result is in top-to-bottom source order.
pub fn extract_attributes_above(source: &str, position: usize) -> Vec<Annotation> {
    let position = position.min(source.len());
    let decl_line = line_start(source, position);
    let mut groups: Vec<Vec<Annotation>> = Vec::new();

    let (same_line, rest) = split_annotations(&source[decl_line..position]);
    if rest.trim().is_empty() && !same_line.is_empty() {
        groups.push(same_line);
    }

    let mut line_end = decl_line;
    while line_end > 0 {
        // `line_end - 1` is the newline closing the previous line
        let prev_start = line_start(source, line_end - 1);
        let line = source[prev_start..line_end - 1].trim();
        line_end = prev_start;

        if line.is_empty() || is_comment_only(line) {
            continue;
        }
        let (found, rest) = split_annotations(line);
        if found.is_empty() {
            break;
        }
        groups.push(found);
        if !rest.trim().is_empty() {
            break;
        }
    }

    groups.into_iter().rev().flatten().collect()
}

pub(crate) fn is_comment_only(line: &str) -> bool {
    line.starts_with("//") || (line.starts_with("/*") && line.ends_with("*/"))
}

/// Pull every annotation out of `line`, returning them with whatever text is
/// left over.
///
/// A `[` glued to an identifier or a closing bracket is an array subscript
/// (`arr[N]`, `float[3]`), not an annotation.
pub fn split_annotations(line: &str) -> (Vec<Annotation>, String) {
    let mut found = Vec::new();
    let mut rest = String::with_capacity(line.len());
    let mut i = 0;
    let mut last_was_subscript = false;

    while i < line.len() {
        let ch = line[i..].chars().next().unwrap_or(' ');
        if ch == '[' {
            let subscript = match line[..i].chars().next_back() {
                Some(c) if is_ident_char(c) || c == ')' => true,
                Some(']') => last_was_subscript,
                _ => false,
            };
            last_was_subscript = subscript;
            if !subscript {
                if let Some((ann, len)) = parse_one(&line[i..]) {
                    found.push(ann);
                    i += len;
                    continue;
                }
            }
        }
        rest.push(ch);
        i += ch.len_utf8();
    }
    (found, rest)
}

/// Parse `[Name]` or `[Name:Value]` at the start of `text`; returns the
/// annotation and the number of bytes it spans.
fn parse_one(text: &str) -> Option<(Annotation, usize)> {
    let close = text.find(']')?;
    let inner = &text[1..close];
    let (key, value) = match inner.split_once(':') {
        Some((k, v)) => (k.trim(), Some(v.trim())),
        None => (inner.trim(), None),
    };
    let mut chars = key.chars();
    if !matches!(chars.next(), Some(c) if is_ident_start(c)) || !chars.all(is_ident_char) {
        return None;
    }
    let raw = &text[..=close];
    Some((
        Annotation { key: key.to_string(), value: value.map(str::to_string), raw: raw.to_string() },
        close + 1,
    ))
}

/// Remove every bracket annotation from `source`, line by line, leaving the
/// rest of each line intact. Lines that held only annotations become empty.
pub fn strip_annotations(source: &str) -> String {
    let mut out = String::with_capacity(source.len());
    for (i, line) in source.split('\n').enumerate() {
        if i > 0 {
            out.push('\n');
        }
        let (found, rest) = split_annotations(line);
        if found.is_empty() {
            out.push_str(line);
        } else if rest.trim().is_empty() {
            // keep a trailing `\r` so CRLF sources stay CRLF
            if line.ends_with('\r') {
                out.push('\r');
            }
        } else {
            out.push_str(&rest);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keys(anns: &[Annotation]) -> Vec<String> {
        anns.iter().map(|a| a.raw.clone()).collect()
    }

    #[test]
    fn collects_stacked_annotations_in_order() {
        let src = "[Tooltip:Base color]\n\n// comment\n[placetarget:vertex]\nuniform vec4 tint;";
        let pos = src.find("uniform").unwrap();
        let anns = extract_attributes_above(src, pos);
        assert_eq!(keys(&anns), vec!["[Tooltip:Base color]", "[placetarget:vertex]"]);
        assert_eq!(anns[0].value.as_deref(), Some("Base color"));
    }

    #[test]
    fn code_line_stops_the_walk() {
        let src = "[A]\nuniform float a;\n[B]\nuniform float b;";
        let pos = src.find("uniform float b").unwrap();
        assert_eq!(keys(&extract_attributes_above(src, pos)), vec!["[B]"]);
    }

    #[test]
    fn mixed_line_contributes_then_stops() {
        let src = "[Outer]\n[Mid] uniform float a;\nuniform float b;";
        let pos = src.find("uniform float b").unwrap();
        assert_eq!(keys(&extract_attributes_above(src, pos)), vec!["[Mid]"]);
    }

    #[test]
    fn array_subscripts_are_not_annotations() {
        let src = "uniform float weights[N];\nuniform float b;";
        let pos = src.find("uniform float b").unwrap();
        assert!(extract_attributes_above(src, pos).is_empty());
    }

    #[test]
    fn same_line_prefix_counts() {
        let src = "[placetarget:both] uniform float a;";
        let pos = src.find("uniform").unwrap();
        assert_eq!(keys(&extract_attributes_above(src, pos)), vec!["[placetarget:both]"]);
    }

    #[test]
    fn flag_annotation_has_no_value() {
        let (found, rest) = split_annotations("[Hidden]");
        assert_eq!(found[0].key, "Hidden");
        assert_eq!(found[0].value, None);
        assert!(rest.is_empty());
    }

    #[test]
    fn strip_removes_annotations_only() {
        let src = "[placetarget:vertex]\nuniform float a[4];\n[X] float b;";
        assert_eq!(strip_annotations(src), "\nuniform float a[4];\n float b;");
    }
}
