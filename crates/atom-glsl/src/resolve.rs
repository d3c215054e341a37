//! Symbolic array-size resolution through `#define` and `const` scalars.

use crate::cursor::{word_positions, Cursor};
use crate::model::ArraySize;

/// Alias chains longer than this are treated as unresolvable.
const MAX_ALIAS_DEPTH: usize = 32;

/// Turn an array-suffix token into an [`ArraySize`].
///
/// Literals are taken as-is. Identifiers are looked up in `source`; if no
/// definition resolves them a warning is logged and the size is left
/// [`ArraySize::Unsized`].
pub fn array_size(source: &str, token: &str) -> ArraySize {
    let token = token.trim();
    if let Some(n) = parse_literal(token) {
        return ArraySize::Fixed(n);
    }
    match resolve_array_size(source, token) {
        Some(n) => ArraySize::Fixed(n),
        None => {
            log::warn!("unable to resolve array size identifier `{}`", token);
            ArraySize::Unsized { symbol: token.to_string() }
        }
    }
}

/// Resolve `symbol` to an integer by searching `source` for
/// `#define SYMBOL value` or `const int|uint SYMBOL = value;`, following
/// aliases (`const int B = A;`) until a literal is reached.
pub fn resolve_array_size(source: &str, symbol: &str) -> Option<u32> {
    let mut chain = Vec::new();
    resolve_inner(source, symbol, &mut chain)
}

fn resolve_inner(source: &str, symbol: &str, chain: &mut Vec<String>) -> Option<u32> {
    if chain.len() >= MAX_ALIAS_DEPTH || chain.iter().any(|s| s == symbol) {
        log::debug!("array size alias cycle through `{}`", symbol);
        return None;
    }
    chain.push(symbol.to_string());

    let value = define_value(source, symbol).or_else(|| const_value(source, symbol))?;
    match parse_literal(value) {
        Some(n) => Some(n),
        None if is_identifier(value) => resolve_inner(source, value, chain),
        None => None,
    }
}

/// Value text of `#define symbol <value>`.
fn define_value<'s>(source: &'s str, symbol: &str) -> Option<&'s str> {
    source.lines().find_map(|line| {
        let rest = line.trim_start().strip_prefix('#')?;
        let mut cur = Cursor::at(rest, 0);
        if !cur.keyword("define") || cur.ident()? != symbol {
            return None;
        }
        let value = rest[cur.pos()..].trim();
        value.split_whitespace().next()
    })
}

/// Value text of `const int|uint symbol = <value>;`.
fn const_value<'s>(source: &'s str, symbol: &str) -> Option<&'s str> {
    word_positions(source, "const").into_iter().find_map(|at| {
        let mut cur = Cursor::at(source, at + "const".len());
        cur.one_of(&["highp", "mediump", "lowp"]);
        cur.one_of(&["int", "uint"])?;
        if cur.ident()? != symbol || !cur.eat('=') {
            return None;
        }
        Some(cur.until(';')?.trim())
    })
}

fn parse_literal(token: &str) -> Option<u32> {
    token.strip_suffix(['u', 'U']).unwrap_or(token).parse().ok()
}

fn is_identifier(token: &str) -> bool {
    let mut chars = token.chars();
    matches!(chars.next(), Some(c) if crate::cursor::is_ident_start(c))
        && chars.all(crate::cursor::is_ident_char)
}
