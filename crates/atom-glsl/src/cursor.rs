//! Byte-offset cursor and low-level text helpers shared by every scanner.
//!
//! Scanners never tokenize a whole file up front. They jump to a candidate
//! keyword and then walk forward with a [`Cursor`], giving up quietly as soon
//! as the text stops looking like the construct they want.

// ── Cursor ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub(crate) struct Cursor<'s> {
    src: &'s str,
    pos: usize,
}

impl<'s> Cursor<'s> {
    pub fn at(src: &'s str, pos: usize) -> Self {
        Self { src, pos: pos.min(src.len()) }
    }

    pub fn pos(&self) -> usize {
        self.pos
    }

    pub fn set_pos(&mut self, pos: usize) {
        self.pos = pos.min(self.src.len());
    }

    pub fn peek(&self) -> Option<char> {
        self.src[self.pos..].chars().next()
    }

    pub fn advance(&mut self) -> Option<char> {
        let ch = self.src[self.pos..].chars().next()?;
        self.pos += ch.len_utf8();
        Some(ch)
    }

    pub fn skip_whitespace(&mut self) {
        while matches!(self.peek(), Some(c) if c.is_whitespace()) {
            self.advance();
        }
    }

    /// Skip whitespace, then consume `ch` if it is next.
    pub fn eat(&mut self, ch: char) -> bool {
        self.skip_whitespace();
        if self.peek() == Some(ch) {
            self.advance();
            true
        } else {
            false
        }
    }

    /// Skip whitespace, then read an identifier.
    pub fn ident(&mut self) -> Option<&'s str> {
        self.skip_whitespace();
        let start = self.pos;
        match self.peek() {
            Some(c) if is_ident_start(c) => {}
            _ => return None,
        }
        while matches!(self.peek(), Some(c) if is_ident_char(c)) {
            self.advance();
        }
        Some(&self.src[start..self.pos])
    }

    /// Consume `kw` as a whole word. The cursor does not move on failure.
    pub fn keyword(&mut self, kw: &str) -> bool {
        let saved = self.pos;
        match self.ident() {
            Some(word) if word == kw => true,
            _ => {
                self.pos = saved;
                false
            }
        }
    }

    /// Consume the next identifier only if it is one of `words`.
    pub fn one_of(&mut self, words: &[&str]) -> Option<&'s str> {
        let saved = self.pos;
        match self.ident() {
            Some(word) if words.contains(&word) => Some(word),
            _ => {
                self.pos = saved;
                None
            }
        }
    }

    /// Skip whitespace, then read an unsigned decimal literal (an optional
    /// `u`/`U` suffix is accepted and dropped).
    pub fn number(&mut self) -> Option<u32> {
        self.skip_whitespace();
        let start = self.pos;
        while matches!(self.peek(), Some(c) if c.is_ascii_digit()) {
            self.advance();
        }
        if start == self.pos {
            return None;
        }
        let digits = &self.src[start..self.pos];
        if matches!(self.peek(), Some('u' | 'U')) {
            self.advance();
        }
        if matches!(self.peek(), Some(c) if is_ident_char(c)) {
            self.pos = start;
            return None;
        }
        digits.parse().ok()
    }

    /// Read everything up to the next `stop` character, consuming `stop`.
    /// Returns the text before it, or `None` if `stop` never appears.
    pub fn until(&mut self, stop: char) -> Option<&'s str> {
        let start = self.pos;
        let rel = self.src[start..].find(stop)?;
        self.pos = start + rel + stop.len_utf8();
        Some(&self.src[start..start + rel])
    }
}

// ── Character classes ─────────────────────────────────────────────────────

pub(crate) fn is_ident_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_'
}

pub(crate) fn is_ident_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

// ── Free helpers ──────────────────────────────────────────────────────────

/// Every offset where `word` occurs as a whole identifier.
pub(crate) fn word_positions(src: &str, word: &str) -> Vec<usize> {
    let mut out = Vec::new();
    let mut from = 0;
    while let Some(rel) = src[from..].find(word) {
        let at = from + rel;
        if is_word_boundary(src, at, at + word.len()) {
            out.push(at);
        }
        from = at + word.len().max(1);
    }
    out
}

/// `true` when `src[start..end]` is not glued to identifier characters on
/// either side.
pub(crate) fn is_word_boundary(src: &str, start: usize, end: usize) -> bool {
    let before = src[..start].chars().next_back();
    let after = src[end..].chars().next();
    !matches!(before, Some(c) if is_ident_char(c)) && !matches!(after, Some(c) if is_ident_char(c))
}

/// Byte offset of the first character of the line containing `pos`.
pub(crate) fn line_start(src: &str, pos: usize) -> usize {
    src[..pos.min(src.len())].rfind('\n').map(|i| i + 1).unwrap_or(0)
}

/// Byte offset just past the newline ending the line containing `pos`
/// (or the end of the text on the last line).
pub(crate) fn next_line_start(src: &str, pos: usize) -> usize {
    src[pos.min(src.len())..]
        .find('\n')
        .map(|i| pos + i + 1)
        .unwrap_or(src.len())
}

/// The identifier ending right before `pos` (whitespace skipped), with its
/// start offset.
pub(crate) fn word_before(src: &str, pos: usize) -> Option<(usize, &str)> {
    let end = src[..pos].trim_end().len();
    let start = src[..end]
        .char_indices()
        .rev()
        .take_while(|&(_, c)| is_ident_char(c))
        .last()
        .map(|(i, _)| i)?;
    Some((start, &src[start..end]))
}

/// Replace `//` and `/* */` comments with spaces, keeping newlines, so that
/// every byte offset in the result matches the same offset in `src`.
pub(crate) fn blank_comments(src: &str) -> String {
    let mut out = String::with_capacity(src.len());
    let mut rest = src;
    while !rest.is_empty() {
        if rest.starts_with("//") {
            let end = rest.find('\n').unwrap_or(rest.len());
            blank_into(&mut out, &rest[..end]);
            rest = &rest[end..];
        } else if rest.starts_with("/*") {
            // unterminated block comments run to the end of the text
            let end = rest[2..].find("*/").map(|i| i + 4).unwrap_or(rest.len());
            blank_into(&mut out, &rest[..end]);
            rest = &rest[end..];
        } else {
            let ch = rest.chars().next().unwrap_or(' ');
            out.push(ch);
            rest = &rest[ch.len_utf8()..];
        }
    }
    out
}

fn blank_into(out: &mut String, comment: &str) {
    for ch in comment.chars() {
        if ch == '\n' {
            out.push('\n');
        } else {
            out.extend(std::iter::repeat_n(' ', ch.len_utf8()));
        }
    }
}

/// Split `text` on commas that are not nested inside `()`, `[]` or `<>`.
pub(crate) fn split_top_level(text: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth: i32 = 0;
    let mut start = 0;
    for (i, ch) in text.char_indices() {
        match ch {
            '(' | '[' | '<' => depth += 1,
            ')' | ']' | '>' => depth = (depth - 1).max(0),
            ',' if depth == 0 => {
                parts.push(&text[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    parts.push(&text[start..]);
    parts
}
