use crate::cursor::{word_positions, Cursor};
use crate::model::{Constant, FirstWins, Span};
use crate::types::map_type;

use super::{array_suffix, Source, PRECISION};

/// Top-level `const [precision] type name[N]? = value;` declarations.
/// Function-local constants and `const` parameters are not reported.
pub(crate) fn scan_constants(src: &Source<'_>) -> Vec<Constant> {
    let clean = src.clean();
    let mut found = FirstWins::new();

    for at in word_positions(clean, "const") {
        let mut cur = Cursor::at(clean, at + "const".len());
        cur.one_of(PRECISION);
        let Some(ty) = cur.ident() else { continue };
        let Some(name) = cur.ident() else { continue };
        let Some(array) = array_suffix(&mut cur, src) else { continue };
        if !cur.eat('=') {
            continue;
        }
        let Some(value) = cur.until(';') else { continue };

        let span = Span::new(at, cur.pos());
        if src.is_nested(span) {
            continue;
        }
        found.insert(name, Constant {
            name: name.to_string(),
            ty: ty.to_string(),
            canonical: map_type(ty).to_string(),
            array,
            value: value.trim().to_string(),
            full_text: src.text(span),
            span,
            annotations: src.annotations_at(at),
        });
    }
    found.into_vec()
}
