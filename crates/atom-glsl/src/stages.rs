//! Splitting a combined source into its stage sections, with the structural
//! checks that gate every other operation.

use crate::cursor::{blank_comments, is_word_boundary, line_start, next_line_start};
use crate::error::StructuralError;
use crate::model::{ShaderModel, Span, Stage};
use crate::scan::{self, find_main_entries};

/// Where each stage lives in a combined source. All offsets are absolute.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StageLayout {
    /// Text before the `#vertex` line.
    pub preamble: Span,
    pub vertex: StageBounds,
    pub fragment: StageBounds,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StageBounds {
    /// Offset of the `#` of the stage marker.
    pub marker: usize,
    /// From the line after the marker to the next marker line (or the end).
    pub body: Span,
    /// Offset of `void` in the stage's `void main()`.
    pub main: usize,
}

impl StageLayout {
    /// Locate both stages and verify the combined-source structure: exactly
    /// one `#vertex` and one `#fragment` line, vertex first, and exactly one
    /// `void main()` per stage.
    pub fn locate(source: &str) -> Result<Self, StructuralError> {
        Self::locate_clean(&blank_comments(source))
    }

    pub(crate) fn locate_clean(clean: &str) -> Result<Self, StructuralError> {
        let vertex = single_marker(clean, Stage::Vertex)?;
        let fragment = single_marker(clean, Stage::Fragment)?;
        if fragment < vertex {
            return Err(StructuralError::MarkerOrder { offset: fragment });
        }

        let vertex_body = Span::new(next_line_start(clean, vertex), line_start(clean, fragment));
        let fragment_body = Span::new(next_line_start(clean, fragment), clean.len());
        Ok(Self {
            preamble: Span::new(0, line_start(clean, vertex)),
            vertex: StageBounds {
                marker: vertex,
                body: vertex_body,
                main: single_main(clean, Stage::Vertex, vertex_body)?,
            },
            fragment: StageBounds {
                marker: fragment,
                body: fragment_body,
                main: single_main(clean, Stage::Fragment, fragment_body)?,
            },
        })
    }

    pub fn get(&self, stage: Stage) -> &StageBounds {
        match stage {
            Stage::Vertex => &self.vertex,
            Stage::Fragment => &self.fragment,
        }
    }

    /// The stage whose body contains `pos`, if any.
    pub fn stage_at(&self, pos: usize) -> Option<Stage> {
        Stage::ALL.into_iter().find(|s| {
            let body = self.get(*s).body;
            body.start <= pos && pos < body.end
        })
    }
}

/// Offsets of every marker line for `stage`: the marker must open its line
/// (leading whitespace allowed) and stand as a whole word.
pub(crate) fn marker_positions(clean: &str, stage: Stage) -> Vec<usize> {
    let marker = stage.marker();
    let mut out = Vec::new();
    let mut line = 0;
    while line < clean.len() {
        let next = next_line_start(clean, line);
        let text = &clean[line..next];
        let indent = text.len() - text.trim_start().len();
        let at = line + indent;
        if text.trim_start().starts_with(marker) && is_word_boundary(clean, at, at + marker.len()) {
            out.push(at);
        }
        line = next;
    }
    out
}

fn single_marker(clean: &str, stage: Stage) -> Result<usize, StructuralError> {
    let marker = stage.marker();
    let positions = marker_positions(clean, stage);
    match positions.as_slice() {
        [] => Err(StructuralError::MissingMarker { marker }),
        [one] => Ok(*one),
        [_, second, ..] => Err(StructuralError::DuplicateMarker {
            marker,
            count: positions.len(),
            offset: *second,
        }),
    }
}

fn single_main(clean: &str, stage: Stage, body: Span) -> Result<usize, StructuralError> {
    let entries = find_main_entries(&clean[body.start..body.end]);
    match entries.as_slice() {
        [] => Err(StructuralError::MissingMain { stage }),
        [one] => Ok(body.start + one),
        [_, second, ..] => Err(StructuralError::DuplicateMain {
            stage,
            count: entries.len(),
            offset: body.start + second,
        }),
    }
}

/// The vertex and fragment sections of a combined source, marker lines
/// excluded.
pub fn split_stages(source: &str) -> Result<(&str, &str), StructuralError> {
    let layout = StageLayout::locate(source)?;
    let v = layout.vertex.body;
    let f = layout.fragment.body;
    Ok((&source[v.start..v.end], &source[f.start..f.end]))
}

/// `true` when `source` passes every structural check.
pub fn is_complete_shader_file(source: &str) -> bool {
    StageLayout::locate(source).is_ok()
}

/// Verify the structure of a combined source and scan both stages.
///
/// Stages without their own `#version` line inherit the one from the
/// preamble.
pub fn extract_model(source: &str) -> Result<ShaderModel, StructuralError> {
    let clean = blank_comments(source);
    let layout = StageLayout::locate_clean(&clean)?;
    let preamble = &source[layout.preamble.start..layout.preamble.end];
    let shared_version = scan::extract_version(preamble);

    let scan_stage = |stage: Stage| {
        let body = layout.get(stage).body;
        let chunk = scan::scan_chunk(
            stage,
            body.start,
            &source[body.start..body.end],
            &clean,
            shared_version.as_ref(),
        )
        .map_err(|err| match err {
            StructuralError::UnterminatedMethod { name, offset } => {
                StructuralError::UnterminatedMethod { name, offset: offset + body.start }
            }
            other => other,
        })?;
        log::debug!(
            "{} stage: {} constants, {} uniforms, {} blocks, {} structs, {} instances, {} in/out, {} methods",
            stage,
            chunk.constants.len(),
            chunk.uniforms.len(),
            chunk.uniform_blocks.len(),
            chunk.structures.len(),
            chunk.struct_instances.len(),
            chunk.in_out.len(),
            chunk.methods.len(),
        );
        Ok::<_, StructuralError>(chunk)
    };

    let vertex = scan_stage(Stage::Vertex)?;
    let fragment = scan_stage(Stage::Fragment)?;
    Ok(ShaderModel { source: source.to_string(), vertex, fragment, contributions: Vec::new() })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const MINIMAL: &str = "#version 330\n#vertex\nvoid main(){}\n#fragment\nvoid main(){}";

    #[test]
    fn minimal_file_is_complete() {
        assert!(is_complete_shader_file(MINIMAL));
        let (v, f) = split_stages(MINIMAL).unwrap();
        assert_eq!(v, "void main(){}\n");
        assert_eq!(f, "void main(){}");
    }

    #[test]
    fn missing_fragment_marker() {
        assert_eq!(
            StageLayout::locate("#vertex\nvoid main(){}"),
            Err(StructuralError::MissingMarker { marker: "#fragment" })
        );
    }

    #[test]
    fn duplicate_vertex_marker() {
        let src = "#vertex\nvoid main(){}\n#vertex\n#fragment\nvoid main(){}";
        assert!(matches!(
            StageLayout::locate(src),
            Err(StructuralError::DuplicateMarker { marker: "#vertex", count: 2, .. })
        ));
    }

    #[test]
    fn markers_out_of_order() {
        let src = "#fragment\nvoid main(){}\n#vertex\nvoid main(){}";
        assert!(matches!(StageLayout::locate(src), Err(StructuralError::MarkerOrder { .. })));
    }

    #[test]
    fn two_mains_in_one_stage() {
        let src = "#vertex\nvoid main(){}\nvoid main(){}\n#fragment\nvoid main(){}";
        assert!(matches!(
            StageLayout::locate(src),
            Err(StructuralError::DuplicateMain { stage: Stage::Vertex, count: 2, .. })
        ));
    }

    #[test]
    fn missing_main() {
        let src = "#vertex\nvoid main(){}\n#fragment\nvoid other(){}";
        assert_eq!(
            StageLayout::locate(src),
            Err(StructuralError::MissingMain { stage: Stage::Fragment })
        );
    }

    #[test]
    fn commented_markers_do_not_count() {
        let src = "// #fragment\n#vertex\nvoid main(){}\n#fragment\nvoid main(){}";
        assert!(is_complete_shader_file(src));
    }

    #[test]
    fn model_inherits_preamble_version() {
        let src = "#version 450 core\n#define N 2\n#vertex\nuniform float w[N];\nvoid main(){}\n#fragment\nout vec4 color;\nvoid main(){}";
        let model = extract_model(src).unwrap();
        assert_eq!(model.vertex.version.as_ref().map(|v| v.number), Some(450));
        assert_eq!(model.fragment.version.as_ref().map(|v| v.number), Some(450));
        assert_eq!(model.vertex.uniforms[0].array, Some(crate::model::ArraySize::Fixed(2)));
        assert_eq!(model.fragment.in_out[0].name, "color");
        assert_eq!(model.vertex.methods[0].name, "main");
        assert_eq!(&src[model.fragment.offset..][..15], "out vec4 color;");
    }

    #[test]
    fn unterminated_method_offset_is_absolute() {
        let src = "#vertex\nvoid main(){}\n#fragment\nvoid main(){}\nvoid f(){\n";
        let err = extract_model(src).unwrap_err();
        assert_eq!(err.offset(), src.find("void f"));
    }
}
