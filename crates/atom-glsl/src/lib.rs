//! Declaration scanners, stage placement, and material analysis for
//! **combined-stage GLSL** sources.
//!
//! A combined source holds a vertex and a fragment stage in one file,
//! separated by `#vertex` and `#fragment` marker lines, with declarations
//! optionally tagged by bracket annotations such as `[placetarget:both]`.
//!
//! This crate does no I/O, so the CLI and the language server can share it.
//!
//! # Structure
//!
//! | Module | Contents |
//! |--------|----------|
//! | [`annotations`] | Bracket annotations above declarations |
//! | [`contribution`] | `Contribution`, auxiliary resource scripts |
//! | [`edit`] | `EditBatch`, offset-stable text edits |
//! | [`error`] | `StructuralError` |
//! | [`material`] | `analyze_material`, `MaterialDataContainer` |
//! | [`model`] | `ShaderModel`, `ShaderChunk`, declaration records |
//! | [`placement`] | `placetarget` relocation between stages |
//! | [`resolve`] | Array-size symbol resolution |
//! | [`scan`] | One scanner per declaration kind |
//! | [`stages`] | Stage splitting and structural checks |
//! | [`types`] | Dialect → canonical type tables |
//!
//! # Quick start
//!
//! ```rust
//! use atom_glsl::{extract_model, resolve_model_placement, split_stages};
//!
//! let src = "#version 330\n\
//!            #vertex\n\
//!            [placetarget:fragment]\n\
//!            uniform float time;\n\
//!            void main() {}\n\
//!            #fragment\n\
//!            void main() {}\n";
//!
//! let model = extract_model(src).unwrap();
//! assert_eq!(model.vertex.uniforms[0].name, "time");
//!
//! let placed = resolve_model_placement(&model).unwrap();
//! let (vertex, fragment) = split_stages(&placed).unwrap();
//! assert!(!vertex.contains("time"));
//! assert!(fragment.contains("uniform float time;"));
//! ```

pub mod annotations;
pub mod contribution;
mod cursor;
pub mod edit;
pub mod error;
pub mod material;
pub mod model;
pub mod placement;
pub mod resolve;
pub mod scan;
pub mod stages;
#[cfg(test)]
mod test_log;
pub mod types;

pub use annotations::{extract_attributes_above, strip_annotations};
pub use contribution::Contribution;
pub use error::StructuralError;
pub use material::{analyze_material, extract_array_sizes, MaterialDataContainer, WrapperDescriptor};
pub use model::{ArraySize, Placement, ShaderChunk, ShaderModel, Stage};
pub use placement::{merge_contributions, resolve_all, resolve_model_placement, resolve_placement};
pub use scan::{
    extract_constants, extract_in_out, extract_methods, extract_struct_instances,
    extract_structures, extract_uniform_block_bindings, extract_uniform_blocks, extract_uniforms,
    extract_version,
};
pub use stages::{extract_model, is_complete_shader_file, split_stages, StageLayout};
