//! Stage relocation driven by the `placetarget` annotation.
//!
//! Every category runs the same pass over the combined source:
//!
//! 1. find each tagged record's text in the vertex and fragment sections
//!    (exact text first, then a structural match on type and name),
//! 2. queue removal of occurrences in stages the record should not be in,
//!    and of duplicates inside the stages it should be in,
//! 3. queue one grouped insertion per stage that lacks the record,
//! 4. apply the whole batch back to front and re-check the structure.
//!
//! Bracket annotation lines sitting directly on top of a declaration travel
//! with it, so a rewritten source scans back to the same records.

use std::fmt;

use crate::annotations::{is_comment_only, split_annotations};
use crate::cursor::{blank_comments, is_word_boundary, line_start, next_line_start};
use crate::edit::EditBatch;
use crate::error::StructuralError;
use crate::model::{
    merge_annotations, Annotation, ArraySize, Constant, Field, InOutParam, Method, Placement,
    ShaderModel, Span, Stage, Struct, StructInstance, Uniform, UniformBlock,
};
use crate::scan;
use crate::stages::StageLayout;

// ── Categories ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Category {
    Constant,
    Uniform,
    UniformBlock,
    Structure,
    StructInstance,
    InOut,
    Method,
}

/// Where queued text lands inside a stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Anchor {
    /// After the stage's `#version` line, or after the marker line.
    Top,
    /// Right before the stage's `void main()`.
    BeforeMain,
}

impl Category {
    pub fn anchor(self) -> Anchor {
        match self {
            Self::Method => Anchor::BeforeMain,
            _ => Anchor::Top,
        }
    }

    /// Joins several insertions bound for the same stage.
    pub fn separator(self) -> &'static str {
        match self {
            Self::UniformBlock | Self::Structure | Self::Method => "\n\n",
            _ => "\n",
        }
    }

    /// Method bodies are never written from a record; an unmatched method
    /// stays where it is.
    pub fn injectable(self) -> bool {
        self != Self::Method
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Constant => "constant",
            Self::Uniform => "uniform",
            Self::UniformBlock => "uniform block",
            Self::Structure => "structure",
            Self::StructInstance => "struct instance",
            Self::InOut => "in/out parameter",
            Self::Method => "method",
        })
    }
}

// ── Placeable ─────────────────────────────────────────────────────────────

/// A declaration record the resolver can move between stages.
pub trait Placeable: Clone {
    const CATEGORY: Category;

    /// Identity used to merge records from several origins.
    fn key(&self) -> String;
    fn annotations(&self) -> &[Annotation];
    fn annotations_mut(&mut self) -> &mut Vec<Annotation>;
    fn full_text(&self) -> &str;

    /// Declaration text rebuilt from the record's fields.
    fn render(&self) -> Option<String>;

    /// Spans of declarations in `section` that match this record by
    /// structure rather than by exact text.
    fn fallback(&self, _section: &str) -> Vec<Span> {
        Vec::new()
    }

    fn relocatable(&self) -> bool {
        true
    }
}

/// A record queued for placement. `inject` allows inserting it even when
/// the source holds no occurrence of it (records contributed from outside).
#[derive(Debug, Clone, PartialEq)]
pub struct Placed<T> {
    pub record: T,
    pub inject: bool,
}

impl<T> Placed<T> {
    pub fn found(record: T) -> Self {
        Self { record, inject: false }
    }

    pub fn contributed(record: T) -> Self {
        Self { record, inject: true }
    }
}

fn suffix(array: &Option<ArraySize>) -> String {
    array.as_ref().map(|a| format!("[{}]", a)).unwrap_or_default()
}

fn render_fields(fields: &[Field]) -> String {
    fields.iter().map(|f| format!("    {} {}{};\n", f.ty, f.name, suffix(&f.array))).collect()
}

fn spans_where<T>(records: Vec<T>, span: impl Fn(&T) -> Span, keep: impl Fn(&T) -> bool) -> Vec<Span> {
    records.iter().filter(|r| keep(r)).map(span).collect()
}

impl Placeable for Constant {
    const CATEGORY: Category = Category::Constant;

    fn key(&self) -> String {
        self.name.clone()
    }
    fn annotations(&self) -> &[Annotation] {
        &self.annotations
    }
    fn annotations_mut(&mut self) -> &mut Vec<Annotation> {
        &mut self.annotations
    }
    fn full_text(&self) -> &str {
        &self.full_text
    }

    fn render(&self) -> Option<String> {
        Some(format!("const {} {}{} = {};", self.ty, self.name, suffix(&self.array), self.value))
    }

    fn fallback(&self, section: &str) -> Vec<Span> {
        spans_where(scan::extract_constants(section), |c| c.span, |c| {
            c.name == self.name && c.ty == self.ty
        })
    }
}

impl Placeable for Uniform {
    const CATEGORY: Category = Category::Uniform;

    fn key(&self) -> String {
        self.name.clone()
    }
    fn annotations(&self) -> &[Annotation] {
        &self.annotations
    }
    fn annotations_mut(&mut self) -> &mut Vec<Annotation> {
        &mut self.annotations
    }
    fn full_text(&self) -> &str {
        &self.full_text
    }

    fn render(&self) -> Option<String> {
        let layout = self.location.map(|l| format!("layout(location = {}) ", l)).unwrap_or_default();
        Some(format!("{}uniform {} {}{};", layout, self.ty, self.name, suffix(&self.array)))
    }

    fn fallback(&self, section: &str) -> Vec<Span> {
        spans_where(scan::extract_uniforms(section), |u| u.span, |u| {
            u.name == self.name && u.ty == self.ty
        })
    }
}

impl Placeable for UniformBlock {
    const CATEGORY: Category = Category::UniformBlock;

    fn key(&self) -> String {
        self.ident().to_string()
    }
    fn annotations(&self) -> &[Annotation] {
        &self.annotations
    }
    fn annotations_mut(&mut self) -> &mut Vec<Annotation> {
        &mut self.annotations
    }
    fn full_text(&self) -> &str {
        &self.full_text
    }

    fn render(&self) -> Option<String> {
        let mut qualifiers: Vec<String> = Vec::new();
        if let Some(kw) = self.layout.keyword() {
            qualifiers.push(kw.to_string());
        }
        if let Some(binding) = self.binding {
            qualifiers.push(format!("binding = {}", binding));
        }
        let layout = if qualifiers.is_empty() {
            String::new()
        } else {
            format!("layout({}) ", qualifiers.join(", "))
        };
        let name = self.name.as_deref().map(|n| format!("{} ", n)).unwrap_or_default();
        let instance = self.instance_name.as_deref().map(|n| format!(" {}", n)).unwrap_or_default();
        Some(format!("{}uniform {}{{\n{}}}{};", layout, name, render_fields(&self.fields), instance))
    }

    fn fallback(&self, section: &str) -> Vec<Span> {
        spans_where(scan::extract_uniform_blocks(section), |b| b.span, |b| b.ident() == self.ident())
    }
}

impl Placeable for Struct {
    const CATEGORY: Category = Category::Structure;

    fn key(&self) -> String {
        self.name.clone()
    }
    fn annotations(&self) -> &[Annotation] {
        &self.annotations
    }
    fn annotations_mut(&mut self) -> &mut Vec<Annotation> {
        &mut self.annotations
    }
    fn full_text(&self) -> &str {
        &self.full_text
    }

    fn render(&self) -> Option<String> {
        Some(format!("struct {} {{\n{}}};", self.name, render_fields(&self.fields)))
    }

    fn fallback(&self, section: &str) -> Vec<Span> {
        spans_where(scan::extract_structures(section), |s| s.span, |s| s.name == self.name)
    }
}

impl Placeable for StructInstance {
    const CATEGORY: Category = Category::StructInstance;

    fn key(&self) -> String {
        self.name.clone()
    }
    fn annotations(&self) -> &[Annotation] {
        &self.annotations
    }
    fn annotations_mut(&mut self) -> &mut Vec<Annotation> {
        &mut self.annotations
    }
    fn full_text(&self) -> &str {
        &self.full_text
    }

    fn render(&self) -> Option<String> {
        Some(format!("{} {}{};", self.struct_name, self.name, suffix(&self.array)))
    }

    fn fallback(&self, section: &str) -> Vec<Span> {
        spans_where(scan::extract_struct_instances(section), |i| i.span, |i| {
            !i.is_uniform && i.name == self.name && i.struct_name == self.struct_name
        })
    }

    /// Uniform instances follow their uniform; only plain globals move here.
    fn relocatable(&self) -> bool {
        !self.is_uniform
    }
}

impl Placeable for InOutParam {
    const CATEGORY: Category = Category::InOut;

    fn key(&self) -> String {
        format!("{} {}", self.direction.keyword(), self.name)
    }
    fn annotations(&self) -> &[Annotation] {
        &self.annotations
    }
    fn annotations_mut(&mut self) -> &mut Vec<Annotation> {
        &mut self.annotations
    }
    fn full_text(&self) -> &str {
        &self.full_text
    }

    fn render(&self) -> Option<String> {
        let layout = self.location.map(|l| format!("layout(location = {}) ", l)).unwrap_or_default();
        let interpolation =
            self.interpolation.as_deref().map(|i| format!("{} ", i)).unwrap_or_default();
        Some(format!(
            "{}{}{} {} {}{};",
            layout,
            interpolation,
            self.direction.keyword(),
            self.ty,
            self.name,
            suffix(&self.array)
        ))
    }

    fn fallback(&self, section: &str) -> Vec<Span> {
        spans_where(scan::extract_in_out(section), |p| p.span, |p| {
            p.name == self.name && p.direction == self.direction
        })
    }
}

impl Placeable for Method {
    const CATEGORY: Category = Category::Method;

    fn key(&self) -> String {
        self.name.clone()
    }
    fn annotations(&self) -> &[Annotation] {
        &self.annotations
    }
    fn annotations_mut(&mut self) -> &mut Vec<Annotation> {
        &mut self.annotations
    }
    fn full_text(&self) -> &str {
        &self.full_text
    }

    fn render(&self) -> Option<String> {
        None
    }

    fn relocatable(&self) -> bool {
        self.name != "main"
    }
}

// ── The relocation pass ───────────────────────────────────────────────────

#[derive(Debug, Clone, Copy)]
struct Occurrence {
    stage: Stage,
    /// The declaration plus the annotation lines stacked directly on it.
    span: Span,
}

/// Relocate every tagged record of one category.
///
/// Untagged records, and records that are neither found nor injectable, are
/// left alone; the latter are reported with `log::warn!`.
pub fn resolve_placement<T: Placeable>(
    source: &str,
    records: &[Placed<T>],
) -> Result<String, StructuralError> {
    let category = T::CATEGORY;
    let clean = blank_comments(source);
    let layout = StageLayout::locate_clean(&clean)?;

    let mut batch = EditBatch::new();
    let mut queued: [Vec<String>; 2] = [Vec::new(), Vec::new()];

    for placed in records {
        let record = &placed.record;
        let Some(placement) = Placement::from_annotations(record.annotations()) else {
            continue;
        };
        if !record.relocatable() {
            log::debug!("{} `{}` is not relocated directly", category, record.key());
            continue;
        }

        let occurrences = locate(source, &clean, &layout, record);
        let text = match occurrences.first() {
            Some(first) => source[first.span.start..first.span.end].to_string(),
            None => match injection_text(placed) {
                Some(text) => text,
                None => {
                    log::warn!(
                        "{} `{}` tagged {:?} was not found in either stage; left unchanged",
                        category,
                        record.key(),
                        placement
                    );
                    continue;
                }
            },
        };

        for (slot, stage) in Stage::ALL.into_iter().enumerate() {
            let mut here = occurrences.iter().filter(|o| o.stage == stage);
            if placement.wants(stage) {
                match here.next() {
                    Some(_) => {
                        for extra in here {
                            batch.remove(removal_span(source, extra.span));
                        }
                    }
                    None => {
                        if !queued[slot].contains(&text) {
                            queued[slot].push(text.clone());
                        }
                    }
                }
            } else {
                for occurrence in here {
                    batch.remove(removal_span(source, occurrence.span));
                }
            }
        }
    }

    for span in batch.removals() {
        check_conflict(&clean, &layout, span)?;
    }

    for (slot, stage) in Stage::ALL.into_iter().enumerate() {
        if queued[slot].is_empty() {
            continue;
        }
        let at = insertion_point(&clean, &layout, stage, category.anchor());
        let mut text = queued[slot].join(category.separator());
        text.push_str("\n\n");
        if at > 0 && !clean[..at].ends_with('\n') {
            text.insert(0, '\n');
        }
        batch.insert(at, text);
    }

    if batch.is_empty() {
        return Ok(source.to_string());
    }
    log::debug!("{} placement: applying {} edits", category, batch.len());
    let rewritten = batch.apply(source);
    StageLayout::locate(&rewritten)?;
    Ok(rewritten)
}

/// Text searched for: the captured declaration, or a rendering of it when
/// the record carries no text.
fn search_text<T: Placeable>(record: &T) -> Option<String> {
    let text = record.full_text().trim();
    if text.is_empty() { record.render() } else { Some(text.to_string()) }
}

fn injection_text<T: Placeable>(placed: &Placed<T>) -> Option<String> {
    if !placed.inject || !T::CATEGORY.injectable() {
        return None;
    }
    let body = search_text(&placed.record)?;
    let mut text: String =
        placed.record.annotations().iter().map(|a| format!("{}\n", a.raw)).collect();
    text.push_str(&body);
    Some(text)
}

fn locate<T: Placeable>(
    source: &str,
    clean: &str,
    layout: &StageLayout,
    record: &T,
) -> Vec<Occurrence> {
    let mut decls: Vec<(Stage, Span)> = Vec::new();
    if let Some(text) = search_text(record) {
        for (at, _) in source.match_indices(text.as_str()) {
            let end = at + text.len();
            // the first byte differs when the hit sits inside a comment
            if !is_word_boundary(source, at, end) || clean.as_bytes()[at] != source.as_bytes()[at] {
                continue;
            }
            if let Some(stage) = layout.stage_at(at) {
                decls.push((stage, Span::new(at, end)));
            }
        }
    }
    if decls.is_empty() {
        for stage in Stage::ALL {
            let body = layout.get(stage).body;
            for span in record.fallback(&source[body.start..body.end]) {
                decls.push((stage, span.shifted(body.start)));
            }
        }
    }
    decls
        .into_iter()
        .map(|(stage, decl)| Occurrence {
            stage,
            span: Span::new(annotated_start(source, decl.start), decl.end),
        })
        .collect()
}

/// Start of the topmost annotation-only line attached to the declaration at
/// `decl_start` (or `decl_start` itself when there is none).
///
/// Blank and comment-only lines are walked over the same way
/// [`extract_attributes_above`](crate::annotations::extract_attributes_above)
/// walks them, so an annotation never stays behind without its declaration.
fn annotated_start(source: &str, decl_start: usize) -> usize {
    let mut line = line_start(source, decl_start);
    if !source[line..decl_start].trim().is_empty() {
        return decl_start;
    }
    let mut start = decl_start;
    while line > 0 {
        let prev = line_start(source, line - 1);
        let text = source[prev..line - 1].trim();
        line = prev;
        if text.is_empty() || is_comment_only(text) {
            continue;
        }
        let (found, rest) = split_annotations(text);
        if found.is_empty() || !rest.trim().is_empty() {
            break;
        }
        start = prev;
    }
    start
}

/// Widen `span` to whole lines when nothing else shares them.
fn removal_span(source: &str, span: Span) -> Span {
    let first = line_start(source, span.start);
    let after = next_line_start(source, span.end);
    let alone = source[first..span.start].trim().is_empty()
        && source[span.end..after].trim().is_empty();
    if alone { Span::new(first, after) } else { span }
}

fn check_conflict(clean: &str, layout: &StageLayout, span: Span) -> Result<(), StructuralError> {
    let overlaps = |other: Span| span.start < other.end && other.start < span.end;
    for stage in Stage::ALL {
        let bounds = layout.get(stage);
        let marker = Span::new(bounds.marker, bounds.marker + stage.marker().len());
        if overlaps(marker) {
            return Err(StructuralError::EditConflict { what: "stage marker", offset: span.start });
        }
        let header_end = clean[bounds.main..].find('{').map(|i| bounds.main + i + 1);
        let main = Span::new(bounds.main, header_end.unwrap_or(bounds.main + "void main".len()));
        if overlaps(main) {
            return Err(StructuralError::EditConflict { what: "entry point", offset: span.start });
        }
    }
    Ok(())
}

fn insertion_point(clean: &str, layout: &StageLayout, stage: Stage, anchor: Anchor) -> usize {
    let bounds = layout.get(stage);
    match anchor {
        Anchor::Top => {
            let body = &clean[bounds.body.start..bounds.body.end];
            let mut offset = 0;
            for line in body.split_inclusive('\n') {
                if line.trim_start().starts_with("#version") {
                    return bounds.body.start + offset + line.len();
                }
                offset += line.len();
            }
            bounds.body.start
        }
        Anchor::BeforeMain => {
            let line = line_start(clean, bounds.main);
            if clean[line..bounds.main].trim().is_empty() { line } else { bounds.main }
        }
    }
}

// ── Per-category entry points ─────────────────────────────────────────────

fn found_in_source<T: Clone>(records: &[T]) -> Vec<Placed<T>> {
    records.iter().cloned().map(Placed::found).collect()
}

pub fn resolve_constants(source: &str, constants: &[Constant]) -> Result<String, StructuralError> {
    resolve_placement(source, &found_in_source(constants))
}

pub fn resolve_uniforms(source: &str, uniforms: &[Uniform]) -> Result<String, StructuralError> {
    resolve_placement(source, &found_in_source(uniforms))
}

pub fn resolve_uniform_blocks(
    source: &str,
    blocks: &[UniformBlock],
) -> Result<String, StructuralError> {
    resolve_placement(source, &found_in_source(blocks))
}

pub fn resolve_structures(source: &str, structures: &[Struct]) -> Result<String, StructuralError> {
    resolve_placement(source, &found_in_source(structures))
}

/// Uniform-flagged instances are ignored.
pub fn resolve_struct_instances(
    source: &str,
    instances: &[StructInstance],
) -> Result<String, StructuralError> {
    resolve_placement(source, &found_in_source(instances))
}

pub fn resolve_in_out(source: &str, params: &[InOutParam]) -> Result<String, StructuralError> {
    resolve_placement(source, &found_in_source(params))
}

/// Methods are only ever moved as found; an unmatched tagged method is
/// reported and left alone.
pub fn resolve_methods(source: &str, methods: &[Method]) -> Result<String, StructuralError> {
    resolve_placement(source, &found_in_source(methods))
}

// ── Whole-model placement ─────────────────────────────────────────────────

/// Every placeable record of a model, merged by identity.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PlacementSet {
    pub constants: Vec<Placed<Constant>>,
    pub uniforms: Vec<Placed<Uniform>>,
    pub uniform_blocks: Vec<Placed<UniformBlock>>,
    pub structures: Vec<Placed<Struct>>,
    pub struct_instances: Vec<Placed<StructInstance>>,
    pub in_out: Vec<Placed<InOutParam>>,
    pub methods: Vec<Placed<Method>>,
}

fn merge_into<T: Placeable>(list: &mut Vec<Placed<T>>, records: &[T], inject: bool) {
    for record in records {
        let key = record.key();
        match list.iter_mut().find(|p| p.record.key() == key) {
            Some(existing) => merge_annotations(existing.record.annotations_mut(), record.annotations()),
            None => list.push(Placed { record: record.clone(), inject }),
        }
    }
}

/// Merge both stages' records with the model's contributions.
///
/// The first record with a given identity wins (vertex, then fragment, then
/// contributions in order); later ones only add annotations it lacks.
/// Contributed records that are not already in the source may be injected.
pub fn merge_contributions(model: &ShaderModel) -> PlacementSet {
    let mut set = PlacementSet::default();
    for chunk in Stage::ALL.map(|stage| model.chunk(stage)) {
        merge_into(&mut set.constants, &chunk.constants, false);
        merge_into(&mut set.uniforms, &chunk.uniforms, false);
        merge_into(&mut set.uniform_blocks, &chunk.uniform_blocks, false);
        merge_into(&mut set.structures, &chunk.structures, false);
        merge_into(&mut set.struct_instances, &chunk.struct_instances, false);
        merge_into(&mut set.in_out, &chunk.in_out, false);
        merge_into(&mut set.methods, &chunk.methods, false);
    }
    for contribution in &model.contributions {
        merge_into(&mut set.constants, &contribution.constants, true);
        merge_into(&mut set.uniforms, &contribution.uniforms, true);
        merge_into(&mut set.uniform_blocks, &contribution.uniform_blocks, true);
        merge_into(&mut set.structures, &contribution.structures, true);
        merge_into(&mut set.struct_instances, &contribution.struct_instances, true);
        merge_into(&mut set.methods, &contribution.methods, true);
    }
    set
}

/// Run every category, in an order that leaves top-of-stage insertions in
/// dependency order: constants end up first, then structures, blocks,
/// uniforms, instances and in/out parameters.
pub fn resolve_all(source: &str, set: &PlacementSet) -> Result<String, StructuralError> {
    let mut out = resolve_placement(source, &set.methods)?;
    out = resolve_placement(&out, &set.in_out)?;
    out = resolve_placement(&out, &set.struct_instances)?;
    out = resolve_placement(&out, &set.uniforms)?;
    out = resolve_placement(&out, &set.uniform_blocks)?;
    out = resolve_placement(&out, &set.structures)?;
    resolve_placement(&out, &set.constants)
}

/// Relocate the model's own source according to its records and
/// contributions.
pub fn resolve_model_placement(model: &ShaderModel) -> Result<String, StructuralError> {
    resolve_all(&model.source, &merge_contributions(model))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contribution::Contribution;
    use crate::stages::{extract_model, split_stages};
    use crate::test_log::{capture_logs, warned};
    use pretty_assertions::assert_eq;

    fn place(source: &str) -> String {
        let model = extract_model(source).unwrap();
        resolve_model_placement(&model).unwrap()
    }

    #[test]
    fn moves_uniform_into_the_requested_stage() {
        let src = "#version 330\n#vertex\nvoid main(){}\n#fragment\n[placetarget:vertex]\nuniform float a;\nvoid main(){}";
        assert_eq!(
            place(src),
            "#version 330\n#vertex\n[placetarget:vertex]\nuniform float a;\n\nvoid main(){}\n#fragment\nvoid main(){}"
        );
    }

    #[test]
    fn placement_is_idempotent() {
        let src = "#version 330\n#vertex\nin vec3 pos;\nvoid main(){}\n#fragment\n[placetarget:vertex]\nuniform mat4 model;\n[placetarget:both]\nconst float K = 2.0;\nvoid main(){}";
        let once = place(src);
        assert_eq!(place(&once), once);
    }

    #[test]
    fn annotation_above_a_comment_moves_with_its_declaration() {
        let src = "#vertex\n[placetarget:fragment]\n// time\nuniform float t;\nuniform float u;\nvoid main(){}\n#fragment\nvoid main(){}";
        let once = place(src);
        assert_eq!(
            once,
            "#vertex\nuniform float u;\nvoid main(){}\n#fragment\n[placetarget:fragment]\n// time\nuniform float t;\n\nvoid main(){}"
        );
        assert_eq!(place(&once), once);
    }

    #[test]
    fn annotation_above_a_blank_line_moves_with_its_declaration() {
        let src = "#vertex\n[placetarget:fragment]\n\nuniform float t;\nuniform float u;\nvoid main(){}\n#fragment\nvoid main(){}";
        let once = place(src);
        assert_eq!(
            once,
            "#vertex\nuniform float u;\nvoid main(){}\n#fragment\n[placetarget:fragment]\n\nuniform float t;\n\nvoid main(){}"
        );
        assert_eq!(place(&once), once);
    }

    #[test]
    fn exclusive_target_removes_the_other_copy() {
        let src = "#vertex\nuniform float t;\nvoid main(){}\n#fragment\n[placetarget:fragment]\nuniform float t;\nvoid main(){}";
        let out = place(src);
        let (vertex, fragment) = split_stages(&out).unwrap();
        assert!(!vertex.contains("uniform float t;"));
        assert_eq!(fragment.matches("uniform float t;").count(), 1);
    }

    #[test]
    fn both_copies_a_declaration() {
        let src = "#vertex\n[placetarget:both]\nconst float K = 1.0;\nvoid main(){}\n#fragment\nvoid main(){}";
        assert_eq!(
            place(src),
            "#vertex\n[placetarget:both]\nconst float K = 1.0;\nvoid main(){}\n#fragment\n[placetarget:both]\nconst float K = 1.0;\n\nvoid main(){}"
        );
    }

    #[test]
    fn duplicates_inside_a_stage_are_collapsed() {
        let src = "#vertex\nvoid main(){}\n#fragment\n[placetarget:fragment]\nuniform float u;\nuniform float u;\nvoid main(){}";
        let out = place(src);
        let (_, fragment) = split_stages(&out).unwrap();
        assert_eq!(fragment.matches("uniform float u;").count(), 1);
    }

    #[test]
    fn contributed_block_lands_in_both_stages() {
        let src = "#version 330\n#vertex\nvoid main(){}\n#fragment\nvoid main(){}";
        let script = "[placetarget:both]\nlayout(std140, binding = 0) uniform Globals {\n    float time;\n};";
        let contribution = Contribution::parse("Globals", script).unwrap();
        let block_text = contribution.uniform_blocks[0].full_text.clone();

        let model = extract_model(src).unwrap().with_contributions(vec![contribution]);
        let out = resolve_model_placement(&model).unwrap();

        let (vertex, fragment) = split_stages(&out).unwrap();
        assert!(vertex.contains(&block_text));
        assert!(fragment.contains(&block_text));
        assert_eq!(out.matches("void main(){}").count(), 2);
        assert_eq!(resolve_model_placement(&extract_model(&out).unwrap()).unwrap(), out);
    }

    #[test]
    fn unmatched_method_is_left_alone() {
        let src = "#vertex\nvoid main(){}\n#fragment\nvoid main(){}";
        let method = Method {
            name: "helper".into(),
            return_type: "float".into(),
            params: Vec::new(),
            full_text: "float helper() { return 1.0; }".into(),
            span: Span::default(),
            annotations: vec![Annotation::new("placetarget", Some("fragment"))],
        };
        let (out, logged) = capture_logs(|| resolve_methods(src, &[method]));
        assert_eq!(out.unwrap(), src);
        assert!(warned(&logged, &["`helper`", "not found"]));
    }

    #[test]
    fn methods_move_before_main() {
        let src = "#vertex\n[placetarget:fragment]\nfloat f() {\n    return 1.0;\n}\nvoid main(){}\n#fragment\nvoid main(){}";
        assert_eq!(
            place(src),
            "#vertex\nvoid main(){}\n#fragment\n[placetarget:fragment]\nfloat f() {\n    return 1.0;\n}\n\nvoid main(){}"
        );
    }

    #[test]
    fn insertion_follows_a_stage_version_line() {
        let src = "#vertex\n#version 330\nvoid main(){}\n#fragment\n#version 330\n[placetarget:vertex]\nconst int N = 2;\nvoid main(){}";
        assert_eq!(
            place(src),
            "#vertex\n#version 330\n[placetarget:vertex]\nconst int N = 2;\n\nvoid main(){}\n#fragment\n#version 330\nvoid main(){}"
        );
    }

    #[test]
    fn structural_fallback_finds_reformatted_text() {
        let src = "#vertex\nvoid main(){}\n#fragment\nuniform   float   gain;\nvoid main(){}";
        let uniform = Uniform {
            name: "gain".into(),
            ty: "float".into(),
            canonical: "f32".into(),
            array: None,
            location: None,
            full_text: "uniform float gain;".into(),
            span: Span::default(),
            annotations: vec![Annotation::new("placetarget", Some("vertex"))],
        };
        let out = resolve_uniforms(src, &[uniform]).unwrap();
        assert_eq!(out, "#vertex\nuniform   float   gain;\n\nvoid main(){}\n#fragment\nvoid main(){}");
    }

    #[test]
    fn removing_an_entry_point_is_a_conflict() {
        let src = "#vertex\nvoid main(){}\n#fragment\nvoid main(){}";
        let method = Method {
            name: "helper".into(),
            return_type: "void".into(),
            params: Vec::new(),
            full_text: "void main(){}".into(),
            span: Span::default(),
            annotations: vec![Annotation::new("placetarget", Some("vertex"))],
        };
        assert!(matches!(
            resolve_methods(src, &[method]),
            Err(StructuralError::EditConflict { what: "entry point", .. })
        ));
    }

    #[test]
    fn uniform_instances_are_not_moved_directly() {
        let src = "#vertex\nvoid main(){}\n#fragment\nstruct L { float k; };\n[placetarget:vertex]\nuniform L light;\nvoid main(){}";
        let model = extract_model(src).unwrap();
        assert!(model.fragment.struct_instances[0].is_uniform);
        let out = resolve_struct_instances(src, &model.fragment.struct_instances).unwrap();
        assert_eq!(out, src);
    }

    #[test]
    fn untagged_records_are_ignored() {
        let src = "#vertex\nuniform float a;\nvoid main(){}\n#fragment\nuniform float a;\nvoid main(){}";
        assert_eq!(place(src), src);
    }
}
