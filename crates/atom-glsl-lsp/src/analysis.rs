//! Heuristic source analysis for completion and hover.
//!
//! Files are usually incomplete at the cursor, so completion classifies the
//! cursor with line-local text heuristics instead of the scanners.

use tower_lsp::lsp_types::Position;

use crate::knowledge::QUALIFIERS;

// ── Context kind ──────────────────────────────────────────────────────────

/// What the cursor is positioned inside, used to drive completions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Context {
    /// Inside `[`, before any `:`.
    Annotation,
    /// After the `:` of `[name:`.
    AnnotationValue { annotation: String },
    /// Start of a declaration, possibly after qualifiers.
    Type,
    Unknown,
}

// ── Offsets ───────────────────────────────────────────────────────────────

/// Byte offset of an LSP position (UTF-16 columns), clamped to the text.
pub fn position_to_offset(text: &str, pos: &Position) -> usize {
    let mut line_start = 0;
    for _ in 0..pos.line {
        match text[line_start..].find('\n') {
            Some(i) => line_start += i + 1,
            None => return text.len(),
        }
    }
    let line_end = text[line_start..].find('\n').map(|i| line_start + i).unwrap_or(text.len());

    let mut units = 0u32;
    for (i, ch) in text[line_start..line_end].char_indices() {
        if units >= pos.character {
            return line_start + i;
        }
        units += ch.len_utf16() as u32;
    }
    line_end
}

pub fn offset_to_position(text: &str, offset: usize) -> Position {
    let offset = offset.min(text.len());
    let before = &text[..offset];
    let line = before.matches('\n').count() as u32;
    let line_start = before.rfind('\n').map(|i| i + 1).unwrap_or(0);
    let character = before[line_start..].encode_utf16().count() as u32;
    Position::new(line, character)
}

// ── word_at ───────────────────────────────────────────────────────────────

/// The identifier containing or immediately preceding the cursor.
pub fn word_at<'t>(text: &'t str, pos: &Position) -> Option<&'t str> {
    let at = position_to_offset(text, pos);
    let is_word = |c: char| c.is_ascii_alphanumeric() || c == '_';

    let start = text[..at]
        .char_indices()
        .rev()
        .take_while(|&(_, c)| is_word(c))
        .last()
        .map(|(i, _)| i)
        .unwrap_or(at);
    let end = at + text[at..].find(|c: char| !is_word(c)).unwrap_or(text.len() - at);

    (start < end).then(|| &text[start..end])
}

// ── completion_context ────────────────────────────────────────────────────

/// Classify the cursor position for completion.
pub fn completion_context(text: &str, pos: &Position) -> Context {
    let at = position_to_offset(text, pos);
    let line_start = text[..at].rfind('\n').map(|i| i + 1).unwrap_or(0);
    let before = &text[line_start..at];
    if before.contains("//") {
        return Context::Unknown;
    }

    if let Some(open) = before.rfind('[') {
        let inside = &before[open + 1..];
        if !inside.contains(']') && !glued_to_identifier(&before[..open]) {
            return match inside.split_once(':') {
                Some((name, _)) => Context::AnnotationValue { annotation: name.trim().to_string() },
                None => Context::Annotation,
            };
        }
    }

    // every complete word before the one being typed must be a qualifier
    let trimmed = before.trim_start();
    let mut words: Vec<&str> = trimmed.split_whitespace().collect();
    if !trimmed.is_empty() && !trimmed.ends_with(char::is_whitespace) {
        words.pop();
    }
    let partial_ok = trimmed
        .split_whitespace()
        .last()
        .is_none_or(|w| w.chars().all(|c| c.is_ascii_alphanumeric() || c == '_'));
    if partial_ok && words.iter().all(|w| QUALIFIERS.contains(w) || is_layout(w)) {
        return Context::Type;
    }
    Context::Unknown
}

/// `arr[` is a subscript, not an annotation.
fn glued_to_identifier(before_bracket: &str) -> bool {
    before_bracket
        .chars()
        .next_back()
        .is_some_and(|c| c.is_ascii_alphanumeric() || c == '_' || c == ']')
}

fn is_layout(word: &str) -> bool {
    word.starts_with("layout(") && word.ends_with(')')
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx(text: &str) -> Context {
        let line = text.matches('\n').count() as u32;
        let col = text.rsplit('\n').next().unwrap_or(text).len() as u32;
        completion_context(text, &Position::new(line, col))
    }

    #[test]
    fn annotation_contexts() {
        assert_eq!(ctx("#vertex\n[plac"), Context::Annotation);
        assert_eq!(
            ctx("#vertex\n[placetarget:fr"),
            Context::AnnotationValue { annotation: "placetarget".into() }
        );
        assert_eq!(ctx("float w[4"), Context::Unknown);
    }

    #[test]
    fn type_contexts() {
        assert_eq!(ctx(""), Context::Type);
        assert_eq!(ctx("uniform "), Context::Type);
        assert_eq!(ctx("flat out ve"), Context::Type);
        assert_eq!(ctx("uniform vec3 "), Context::Unknown);
        assert_eq!(ctx("// uniform "), Context::Unknown);
    }

    #[test]
    fn word_under_cursor() {
        let text = "uniform vec3 tint;\nvoid main() {}";
        assert_eq!(word_at(text, &Position::new(0, 10)), Some("vec3"));
        assert_eq!(word_at(text, &Position::new(1, 7)), Some("main"));
        assert_eq!(word_at(text, &Position::new(1, 11)), None);
    }

    #[test]
    fn word_after_non_ascii_text() {
        let text = "uniform float é1;";
        assert_eq!(word_at(text, &Position::new(0, 15)), Some("1"));
        assert_eq!(word_at(text, &Position::new(0, 14)), None);
        assert_eq!(word_at("// ü\nfloat", &Position::new(1, 2)), Some("float"));
    }

    #[test]
    fn offsets_round_trip_through_positions() {
        let text = "a\nbé c\n";
        let pos = offset_to_position(text, text.find('c').unwrap());
        assert_eq!(pos, Position::new(1, 3));
        assert_eq!(position_to_offset(text, &pos), text.find('c').unwrap());
        assert_eq!(position_to_offset(text, &Position::new(9, 0)), text.len());
    }
}
