//! Document outline and declaration lookup over a scanned model.

use atom_glsl::model::{Annotation, ShaderChunk, Span};
use atom_glsl::{ShaderModel, Stage};
use tower_lsp::lsp_types::{DocumentSymbol, Range, SymbolKind};

use crate::analysis::offset_to_position;

/// A declaration flattened out of a chunk, with combined-source offsets.
pub struct Declaration<'m> {
    pub name: &'m str,
    pub detail: String,
    pub kind: SymbolKind,
    pub span: Span,
    pub full_text: &'m str,
    pub annotations: &'m [Annotation],
}

pub fn declarations(chunk: &ShaderChunk) -> Vec<Declaration<'_>> {
    let at = |span: Span| span.shifted(chunk.offset);
    let mut out = Vec::new();

    for c in &chunk.constants {
        out.push(Declaration {
            name: &c.name,
            detail: format!("const {}", c.ty),
            kind: SymbolKind::CONSTANT,
            span: at(c.span),
            full_text: &c.full_text,
            annotations: &c.annotations,
        });
    }
    for u in &chunk.uniforms {
        out.push(Declaration {
            name: &u.name,
            detail: format!("uniform {}", u.ty),
            kind: SymbolKind::VARIABLE,
            span: at(u.span),
            full_text: &u.full_text,
            annotations: &u.annotations,
        });
    }
    for b in &chunk.uniform_blocks {
        let detail = match (b.layout.keyword(), b.binding) {
            (Some(layout), Some(binding)) => format!("uniform block · {} · binding {}", layout, binding),
            (Some(layout), None) => format!("uniform block · {}", layout),
            (None, _) => "uniform block".to_string(),
        };
        out.push(Declaration {
            name: b.ident(),
            detail,
            kind: SymbolKind::INTERFACE,
            span: at(b.span),
            full_text: &b.full_text,
            annotations: &b.annotations,
        });
    }
    for s in &chunk.structures {
        out.push(Declaration {
            name: &s.name,
            detail: format!("struct · {} fields", s.fields.len()),
            kind: SymbolKind::STRUCT,
            span: at(s.span),
            full_text: &s.full_text,
            annotations: &s.annotations,
        });
    }
    for i in &chunk.struct_instances {
        let detail = if i.is_uniform {
            format!("uniform {}", i.struct_name)
        } else {
            i.struct_name.clone()
        };
        out.push(Declaration {
            name: &i.name,
            detail,
            kind: SymbolKind::OBJECT,
            span: at(i.span),
            full_text: &i.full_text,
            annotations: &i.annotations,
        });
    }
    for p in &chunk.in_out {
        out.push(Declaration {
            name: &p.name,
            detail: format!("{} {}", p.direction.keyword(), p.ty),
            kind: SymbolKind::FIELD,
            span: at(p.span),
            full_text: &p.full_text,
            annotations: &p.annotations,
        });
    }
    for m in &chunk.methods {
        let params: Vec<&str> = m.params.iter().map(|p| p.ty.as_str()).collect();
        out.push(Declaration {
            name: &m.name,
            detail: format!("{}({})", m.return_type, params.join(", ")),
            kind: SymbolKind::FUNCTION,
            span: at(m.span),
            full_text: &m.full_text,
            annotations: &m.annotations,
        });
    }

    out.sort_by_key(|d| d.span.start);
    out
}

/// First declaration named `name`, searching the vertex stage first.
pub fn find_declaration<'m>(model: &'m ShaderModel, name: &str) -> Option<(&'m ShaderChunk, Declaration<'m>)> {
    Stage::ALL.into_iter().map(|stage| model.chunk(stage)).find_map(|chunk| {
        declarations(chunk)
            .into_iter()
            .find(|d| d.name == name)
            .map(|d| (chunk, d))
    })
}

fn range(text: &str, span: Span) -> Range {
    Range::new(offset_to_position(text, span.start), offset_to_position(text, span.end))
}

/// One symbol per stage, each holding that stage's declarations.
#[allow(deprecated)] // `DocumentSymbol::deprecated` has to be spelled out
pub fn document_symbols(model: &ShaderModel) -> Vec<DocumentSymbol> {
    let text = model.source.as_str();
    Stage::ALL
        .into_iter()
        .map(|stage| model.chunk(stage))
        .map(|chunk| {
            let children = declarations(chunk)
                .into_iter()
                .map(|d| DocumentSymbol {
                    name: d.name.to_string(),
                    detail: Some(d.detail),
                    kind: d.kind,
                    tags: None,
                    deprecated: None,
                    range: range(text, d.span),
                    selection_range: range(text, d.span),
                    children: None,
                })
                .collect();
            let body = Span::new(chunk.offset, chunk.offset + chunk.text.len());
            DocumentSymbol {
                name: chunk.stage.to_string(),
                detail: chunk.version.as_ref().map(|v| format!("#version {}", v.number)),
                kind: SymbolKind::MODULE,
                tags: None,
                deprecated: None,
                range: range(text, body),
                selection_range: range(text, Span::new(body.start, body.start)),
                children: Some(children),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use atom_glsl::extract_model;

    const SRC: &str = "#version 330\n#vertex\nuniform mat4 mvp;\nout vec2 uv;\nvoid main(){}\n#fragment\nin vec2 uv;\nstruct Light { vec3 color; };\nvoid main(){}\n";

    #[test]
    fn one_symbol_per_stage() {
        let model = extract_model(SRC).unwrap();
        let symbols = document_symbols(&model);
        assert_eq!(symbols.len(), 2);
        assert_eq!(symbols[0].name, "vertex");

        let vertex: Vec<_> = symbols[0].children.iter().flatten().map(|s| s.name.as_str()).collect();
        assert_eq!(vertex, vec!["mvp", "uv", "main"]);
        let fragment: Vec<_> = symbols[1].children.iter().flatten().map(|s| s.name.as_str()).collect();
        assert_eq!(fragment, vec!["uv", "Light", "main"]);
        assert_eq!(symbols[0].children.as_ref().unwrap()[0].range.start.line, 2);
    }

    #[test]
    fn lookup_prefers_the_vertex_stage() {
        let model = extract_model(SRC).unwrap();
        let (chunk, decl) = find_declaration(&model, "uv").unwrap();
        assert_eq!(chunk.stage, Stage::Vertex);
        assert_eq!(decl.full_text, "out vec2 uv;");
        assert!(find_declaration(&model, "missing").is_none());
    }
}
