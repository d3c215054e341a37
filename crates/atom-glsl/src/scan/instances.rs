use crate::cursor::{word_before, word_positions, Cursor};
use crate::model::{FirstWins, Span, StructInstance};

use super::{array_suffix, layout_before, Source, StructDef, PRECISION};

/// Struct-typed variables declared at the top level.
///
/// Three forms are recognized, in this order, sharing one first-wins list:
/// `uniform S name;`, declarators written after a definition, and bare
/// `S name [= init];`. Declarations inside any `{ }` (locals, members) are
/// ignored.
pub(crate) fn scan_struct_instances(src: &Source<'_>, defs: &[StructDef]) -> Vec<StructInstance> {
    let mut found = FirstWins::new();
    uniform_instances(src, defs, &mut found);
    inline_instances(src, defs, &mut found);
    bare_instances(src, defs, &mut found);
    found.into_vec()
}

fn is_struct(defs: &[StructDef], name: &str) -> bool {
    defs.iter().any(|d| d.record.name == name)
}

fn uniform_instances(src: &Source<'_>, defs: &[StructDef], found: &mut FirstWins<StructInstance>) {
    let clean = src.clean();
    for at in word_positions(clean, "uniform") {
        let mut cur = Cursor::at(clean, at + "uniform".len());
        cur.one_of(PRECISION);
        let Some(ty) = cur.ident().filter(|ty| is_struct(defs, ty)) else { continue };
        let Some(name) = cur.ident() else { continue };
        let Some(array) = array_suffix(&mut cur, src) else { continue };
        if !cur.eat(';') {
            continue;
        }
        let start = layout_before(clean, at).map(|(s, _)| s).unwrap_or(at);
        let span = Span::new(start, cur.pos());
        if src.is_nested(span) {
            continue;
        }
        found.insert(name, StructInstance {
            struct_name: ty.to_string(),
            name: name.to_string(),
            is_uniform: true,
            array,
            full_text: src.text(span),
            span,
            annotations: src.annotations_at(start),
        });
    }
}

fn inline_instances(src: &Source<'_>, defs: &[StructDef], found: &mut FirstWins<StructInstance>) {
    for def in defs {
        let record = &def.record;
        if src.is_nested(record.span) {
            continue;
        }
        for (name, token) in &def.declarators {
            found.insert(name, StructInstance {
                struct_name: record.name.clone(),
                name: name.clone(),
                is_uniform: def.is_uniform,
                array: token.as_deref().map(|t| src.array_size(t)),
                full_text: record.full_text.clone(),
                span: record.span,
                annotations: record.annotations.clone(),
            });
        }
    }
}

fn bare_instances(src: &Source<'_>, defs: &[StructDef], found: &mut FirstWins<StructInstance>) {
    let clean = src.clean();
    for def in defs {
        let ty = def.record.name.as_str();
        for at in word_positions(clean, ty) {
            let qualified = word_before(clean, at)
                .is_some_and(|(_, w)| matches!(w, "struct" | "uniform" | "in" | "out" | "inout"));
            if qualified {
                continue;
            }
            let mut cur = Cursor::at(clean, at + ty.len());
            let mut declared = Vec::new();
            let complete = loop {
                let Some(name) = cur.ident() else { break false };
                let Some(array) = array_suffix(&mut cur, src) else { break false };
                declared.push((name, array));
                if cur.eat('=') {
                    break cur.until(';').is_some();
                }
                if cur.eat(';') {
                    break true;
                }
                if !cur.eat(',') {
                    break false;
                }
            };
            if !complete {
                continue;
            }
            let span = Span::new(at, cur.pos());
            if src.is_nested(span) {
                continue;
            }
            let annotations = src.annotations_at(at);
            for (name, array) in declared {
                found.insert(name, StructInstance {
                    struct_name: ty.to_string(),
                    name: name.to_string(),
                    is_uniform: false,
                    array,
                    full_text: src.text(span),
                    span,
                    annotations: annotations.clone(),
                });
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ArraySize;
    use crate::scan::structs::scan_struct_defs;

    fn scan(text: &str) -> Vec<StructInstance> {
        let src = Source::new(text);
        let defs = scan_struct_defs(&src);
        scan_struct_instances(&src, &defs)
    }

    #[test]
    fn uniform_instance() {
        let inst = scan("struct L { vec3 p; };\nuniform L light;");
        assert_eq!(inst.len(), 1);
        assert!(inst[0].is_uniform);
        assert_eq!(inst[0].struct_name, "L");
        assert_eq!(inst[0].full_text, "uniform L light;");
    }

    #[test]
    fn inline_declarators_share_the_definition_text() {
        let inst = scan("struct P { float x; } a, b[3];");
        assert_eq!(inst.len(), 2);
        assert_eq!(inst[1].name, "b");
        assert_eq!(inst[1].array, Some(ArraySize::Fixed(3)));
        assert_eq!(inst[0].full_text, inst[1].full_text);
        assert!(!inst[0].is_uniform);
    }

    #[test]
    fn bare_global_with_initializer() {
        let inst = scan("struct S { float x; };\nS g = S(1.0);\nS h[2];");
        let names: Vec<_> = inst.iter().map(|i| i.name.as_str()).collect();
        assert_eq!(names, vec!["g", "h"]);
        assert_eq!(inst[0].full_text, "S g = S(1.0);");
    }

    #[test]
    fn locals_and_members_are_ignored() {
        let src = "struct S { float x; };\nstruct T { S inner; };\nvoid main() { S local; }";
        assert!(scan(src).is_empty());
    }

    #[test]
    fn functions_returning_structs_are_ignored() {
        assert!(scan("struct S { float x; };\nS make() { return S(0.0); }").is_empty());
    }

    #[test]
    fn first_form_wins_across_passes() {
        let inst = scan("struct S { float x; } s;\nuniform S s;");
        assert_eq!(inst.len(), 1);
        assert!(inst[0].is_uniform);
    }
}
