//! LSP backend: document store, diagnostics, hover, completion, and outline.

use std::collections::HashMap;
use std::sync::Arc;

use atom_glsl::model::{ArraySize, Span};
use atom_glsl::{extract_model, extract_structures, ShaderModel, Stage};
use tokio::sync::RwLock;
use tower_lsp::jsonrpc::Result;
use tower_lsp::lsp_types::*;
use tower_lsp::{Client, LanguageServer};

use crate::analysis::{completion_context, offset_to_position, word_at, Context};
use crate::knowledge::{annotation_by_name, builtin_type_names, type_doc, ANNOTATIONS};
use crate::outline::{document_symbols, find_declaration};

const SOURCE: &str = "atom-glsl";

// ── Backend ───────────────────────────────────────────────────────────────

pub struct Backend {
    client: Client,
    docs: Arc<RwLock<HashMap<Url, String>>>,
}

impl Backend {
    pub fn new(client: Client) -> Self {
        Self {
            client,
            docs: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    async fn update(&self, uri: Url, text: String) {
        let diagnostics = model_diagnostics(&text);
        self.client
            .publish_diagnostics(uri.clone(), diagnostics, None)
            .await;
        self.docs.write().await.insert(uri, text);
    }
}

// ── LanguageServer impl ───────────────────────────────────────────────────

#[tower_lsp::async_trait]
impl LanguageServer for Backend {
    async fn initialize(&self, _params: InitializeParams) -> Result<InitializeResult> {
        Ok(InitializeResult {
            capabilities: ServerCapabilities {
                text_document_sync: Some(TextDocumentSyncCapability::Kind(
                    TextDocumentSyncKind::FULL,
                )),
                hover_provider: Some(HoverProviderCapability::Simple(true)),
                completion_provider: Some(CompletionOptions {
                    trigger_characters: Some(vec![
                        "[".to_string(),
                        ":".to_string(),
                        " ".to_string(),
                    ]),
                    ..Default::default()
                }),
                document_symbol_provider: Some(OneOf::Left(true)),
                ..Default::default()
            },
            server_info: Some(ServerInfo {
                name: "atom-glsl-lsp".to_string(),
                version: Some(env!("CARGO_PKG_VERSION").to_string()),
            }),
        })
    }

    async fn initialized(&self, _params: InitializedParams) {
        self.client
            .log_message(MessageType::INFO, "atom-glsl-lsp ready")
            .await;
    }

    async fn shutdown(&self) -> Result<()> {
        Ok(())
    }

    // ── Document lifecycle ────────────────────────────────────────────────

    async fn did_open(&self, params: DidOpenTextDocumentParams) {
        self.update(params.text_document.uri, params.text_document.text)
            .await;
    }

    async fn did_change(&self, params: DidChangeTextDocumentParams) {
        // FULL sync: the last change carries the whole text.
        if let Some(change) = params.content_changes.into_iter().last() {
            self.update(params.text_document.uri, change.text).await;
        }
    }

    async fn did_close(&self, params: DidCloseTextDocumentParams) {
        self.docs.write().await.remove(&params.text_document.uri);
    }

    // ── Hover ─────────────────────────────────────────────────────────────

    async fn hover(&self, params: HoverParams) -> Result<Option<Hover>> {
        let uri = &params.text_document_position_params.text_document.uri;
        let pos = &params.text_document_position_params.position;

        let docs = self.docs.read().await;
        let text = match docs.get(uri) {
            Some(t) => t,
            None => return Ok(None),
        };

        let word = match word_at(text, pos) {
            Some(w) => w,
            None => return Ok(None),
        };

        if let Some(doc) = type_doc(word) {
            return Ok(Some(markdown_hover(doc)));
        }

        if let Some(info) = annotation_by_name(word) {
            let mut md = format!("**[{}]** · annotation\n\n{}", info.name, info.doc);
            for value in info.values {
                md.push_str(&format!("\n- `{}`: {}", value.name, value.doc));
            }
            return Ok(Some(markdown_hover(md)));
        }

        let Ok(model) = extract_model(text) else {
            return Ok(None);
        };
        if let Some((chunk, decl)) = find_declaration(&model, word) {
            let mut md = format!("```glsl\n{}\n```\n\n{} stage", decl.full_text, chunk.stage);
            if !decl.annotations.is_empty() {
                let tags: Vec<&str> = decl.annotations.iter().map(|a| a.raw.as_str()).collect();
                md.push_str(&format!(" · {}", tags.join(" ")));
            }
            return Ok(Some(markdown_hover(md)));
        }

        Ok(None)
    }

    // ── Completion ────────────────────────────────────────────────────────

    async fn completion(
        &self,
        params: CompletionParams,
    ) -> Result<Option<CompletionResponse>> {
        let uri = &params.text_document_position.text_document.uri;
        let pos = &params.text_document_position.position;

        let docs = self.docs.read().await;
        let text = match docs.get(uri) {
            Some(t) => t,
            None => return Ok(None),
        };

        let items = match completion_context(text, pos) {
            Context::Annotation => annotation_items(),
            Context::AnnotationValue { annotation } => value_items(&annotation),
            Context::Type => type_items(text),
            Context::Unknown => vec![],
        };

        Ok(Some(CompletionResponse::Array(items)))
    }

    // ── Outline ───────────────────────────────────────────────────────────

    async fn document_symbol(
        &self,
        params: DocumentSymbolParams,
    ) -> Result<Option<DocumentSymbolResponse>> {
        let docs = self.docs.read().await;
        let Some(text) = docs.get(&params.text_document.uri) else {
            return Ok(None);
        };
        Ok(extract_model(text)
            .ok()
            .map(|model| DocumentSymbolResponse::Nested(document_symbols(&model))))
    }
}

// ── Diagnostics ───────────────────────────────────────────────────────────

/// Structural errors as errors; unresolved array sizes as warnings.
fn model_diagnostics(text: &str) -> Vec<Diagnostic> {
    match extract_model(text) {
        Ok(model) => unresolved_sizes(&model),
        Err(e) => {
            let start = offset_to_position(text, e.offset().unwrap_or(0));
            let end = Position::new(start.line, start.character + 1);
            vec![diagnostic(Range::new(start, end), DiagnosticSeverity::ERROR, e.to_string())]
        }
    }
}

fn unresolved_sizes(model: &ShaderModel) -> Vec<Diagnostic> {
    let mut out = Vec::new();
    for chunk in Stage::ALL.map(|stage| model.chunk(stage)) {
        let mut sized: Vec<(&Option<ArraySize>, Span)> = Vec::new();
        sized.extend(chunk.constants.iter().map(|c| (&c.array, c.span)));
        sized.extend(chunk.uniforms.iter().map(|u| (&u.array, u.span)));
        sized.extend(chunk.struct_instances.iter().map(|i| (&i.array, i.span)));
        sized.extend(chunk.in_out.iter().map(|p| (&p.array, p.span)));
        for block in &chunk.uniform_blocks {
            sized.extend(block.fields.iter().map(|f| (&f.array, f.span)));
        }
        for s in &chunk.structures {
            sized.extend(s.fields.iter().map(|f| (&f.array, f.span)));
        }
        for m in &chunk.methods {
            sized.extend(m.params.iter().map(|p| (&p.array, m.span)));
        }

        for (array, span) in sized {
            if let Some(ArraySize::Unsized { symbol }) = array {
                let span = span.shifted(chunk.offset);
                let range = Range::new(
                    offset_to_position(&model.source, span.start),
                    offset_to_position(&model.source, span.end),
                );
                out.push(diagnostic(
                    range,
                    DiagnosticSeverity::WARNING,
                    format!("array size `{}` does not resolve to a constant", symbol),
                ));
            }
        }
    }
    out
}

fn diagnostic(range: Range, severity: DiagnosticSeverity, message: String) -> Diagnostic {
    Diagnostic {
        range,
        severity: Some(severity),
        source: Some(SOURCE.to_string()),
        message,
        ..Default::default()
    }
}

// ── Completion item builders ──────────────────────────────────────────────

fn annotation_items() -> Vec<CompletionItem> {
    ANNOTATIONS
        .iter()
        .map(|a| {
            let detail = a.doc.lines().next().unwrap_or("").to_string();
            let mut item = CompletionItem::new_simple(a.name.to_string(), detail);
            item.kind = Some(if a.service {
                CompletionItemKind::PROPERTY
            } else {
                CompletionItemKind::KEYWORD
            });
            item.insert_text = Some(format!("{}:$0", a.name));
            item.insert_text_format = Some(InsertTextFormat::SNIPPET);
            item
        })
        .collect()
}

fn value_items(annotation: &str) -> Vec<CompletionItem> {
    let Some(info) = annotation_by_name(annotation) else {
        return vec![];
    };
    info.values
        .iter()
        .map(|v| {
            let mut item = CompletionItem::new_simple(v.name.to_string(), v.doc.to_string());
            item.kind = Some(CompletionItemKind::ENUM_MEMBER);
            item
        })
        .collect()
}

/// Built-in types, then structures declared anywhere in the file.
fn type_items(text: &str) -> Vec<CompletionItem> {
    let builtin = builtin_type_names().map(|name| {
        let mut item = CompletionItem::new_simple(name.to_string(), String::new());
        item.kind = Some(CompletionItemKind::TYPE_PARAMETER);
        item
    });
    let declared = extract_structures(text).into_iter().map(|s| {
        let mut item = CompletionItem::new_simple(s.name, "struct".to_string());
        item.kind = Some(CompletionItemKind::STRUCT);
        item
    });
    builtin.chain(declared).collect()
}

// ── Misc helpers ──────────────────────────────────────────────────────────

fn markdown_hover(md: String) -> Hover {
    Hover {
        contents: HoverContents::Markup(MarkupContent {
            kind: MarkupKind::Markdown,
            value: md,
        }),
        range: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn structural_errors_become_error_diagnostics() {
        let diags = model_diagnostics("#vertex\nvoid main(){}\n");
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].severity, Some(DiagnosticSeverity::ERROR));
        assert!(diags[0].message.contains("#fragment"));
    }

    #[test]
    fn unresolved_sizes_become_warnings() {
        let src = "#vertex\nuniform float w[COUNT];\nvoid main(){}\n#fragment\nvoid main(){}\n";
        let diags = model_diagnostics(src);
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].severity, Some(DiagnosticSeverity::WARNING));
        assert_eq!(diags[0].range.start, Position::new(1, 0));
        assert!(diags[0].message.contains("COUNT"));
    }

    #[test]
    fn clean_file_has_no_diagnostics() {
        let src = "#define COUNT 4\n#vertex\nuniform float w[COUNT];\nvoid main(){}\n#fragment\nvoid main(){}\n";
        assert!(model_diagnostics(src).is_empty());
    }

    #[test]
    fn placetarget_values_complete() {
        let labels: Vec<_> = value_items("placetarget").into_iter().map(|i| i.label).collect();
        assert_eq!(labels, vec!["vertex", "fragment", "both"]);
        assert!(value_items("InterfaceName").is_empty());
    }

    #[test]
    fn declared_structs_complete_as_types() {
        let items = type_items("struct Light { vec3 color; };");
        assert!(items.iter().any(|i| i.label == "vec3"));
        assert!(items.iter().any(|i| i.label == "Light" && i.kind == Some(CompletionItemKind::STRUCT)));
    }
}
