use thiserror::Error;

use crate::model::Stage;

/// A combined source that cannot be split into exactly one vertex and one
/// fragment stage, each with exactly one entry point.
///
/// These are fatal: no model and no rewritten source is produced.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StructuralError {
    #[error("combined source has no `{marker}` marker")]
    MissingMarker { marker: &'static str },

    #[error("combined source has {count} `{marker}` markers, expected exactly one")]
    DuplicateMarker {
        marker: &'static str,
        count: usize,
        /// Byte offset of the second marker.
        offset: usize,
    },

    #[error("`#fragment` marker at byte {offset} comes before the `#vertex` marker")]
    MarkerOrder { offset: usize },

    #[error("{stage} stage has no `void main()` entry point")]
    MissingMain { stage: Stage },

    #[error("{stage} stage has {count} `void main()` entry points, expected exactly one")]
    DuplicateMain {
        stage: Stage,
        count: usize,
        /// Byte offset of the second entry point.
        offset: usize,
    },

    #[error("method `{name}` at byte {offset} has no matching closing brace")]
    UnterminatedMethod { name: String, offset: usize },

    #[error("relocation would remove text overlapping the {what} at byte {offset}")]
    EditConflict { what: &'static str, offset: usize },
}

impl StructuralError {
    /// Byte offset in the combined source the error points at, when known.
    pub fn offset(&self) -> Option<usize> {
        match self {
            Self::DuplicateMarker { offset, .. }
            | Self::MarkerOrder { offset }
            | Self::DuplicateMain { offset, .. }
            | Self::UnterminatedMethod { offset, .. }
            | Self::EditConflict { offset, .. } => Some(*offset),
            Self::MissingMarker { .. } | Self::MissingMain { .. } => None,
        }
    }
}
