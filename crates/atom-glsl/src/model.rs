use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::contribution::Contribution;

// ── Stage ─────────────────────────────────────────────────────────────────

/// One half of a combined source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    Vertex,
    Fragment,
}

impl Stage {
    pub const ALL: [Stage; 2] = [Stage::Vertex, Stage::Fragment];

    /// The directive that opens this stage in a combined source.
    pub fn marker(self) -> &'static str {
        match self {
            Stage::Vertex => "#vertex",
            Stage::Fragment => "#fragment",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Stage::Vertex => "vertex",
            Stage::Fragment => "fragment",
        })
    }
}

// ── Span ──────────────────────────────────────────────────────────────────

/// Half-open byte range into the text a record was scanned from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub const fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    pub fn shifted(self, by: usize) -> Self {
        Self::new(self.start + by, self.end + by)
    }
}

// ── Annotations ───────────────────────────────────────────────────────────

/// A bracket annotation such as `[placetarget:vertex]` or `[Hidden]`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Annotation {
    pub key: String,
    pub value: Option<String>,
    /// The annotation exactly as written, brackets included.
    pub raw: String,
}

impl Annotation {
    pub fn new(key: impl Into<String>, value: Option<&str>) -> Self {
        let key = key.into();
        let raw = match value {
            Some(v) => format!("[{}:{}]", key, v),
            None => format!("[{}]", key),
        };
        Self { key, value: value.map(str::to_string), raw }
    }

    /// Case-insensitive key comparison.
    pub fn is(&self, key: &str) -> bool {
        self.key.eq_ignore_ascii_case(key)
    }

    fn same_as(&self, other: &Annotation) -> bool {
        self.is(&other.key) && self.value == other.value
    }
}

/// Append every annotation from `extra` not already present in `into`.
pub fn merge_annotations(into: &mut Vec<Annotation>, extra: &[Annotation]) {
    for ann in extra {
        if !into.iter().any(|a| a.same_as(ann)) {
            into.push(ann.clone());
        }
    }
}

// ── Placement ─────────────────────────────────────────────────────────────

/// The stage(s) a `placetarget` annotation asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Placement {
    Vertex,
    Fragment,
    Both,
}

impl Placement {
    pub const ANNOTATION: &'static str = "placetarget";

    pub fn parse(value: &str) -> Option<Self> {
        let v = value.trim();
        if v.eq_ignore_ascii_case("vertex") {
            Some(Self::Vertex)
        } else if v.eq_ignore_ascii_case("fragment") {
            Some(Self::Fragment)
        } else if v.eq_ignore_ascii_case("both") {
            Some(Self::Both)
        } else {
            None
        }
    }

    pub fn wants(self, stage: Stage) -> bool {
        matches!(
            (self, stage),
            (Self::Both, _) | (Self::Vertex, Stage::Vertex) | (Self::Fragment, Stage::Fragment)
        )
    }

    /// The first `placetarget` annotation with a recognized value.
    pub fn from_annotations(annotations: &[Annotation]) -> Option<Self> {
        annotations
            .iter()
            .filter(|a| a.is(Self::ANNOTATION))
            .find_map(|a| a.value.as_deref().and_then(Self::parse))
    }
}

// ── Array sizes ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArraySize {
    /// A literal size, or a symbol that resolved to one.
    Fixed(u32),
    /// A symbolic size no `#define` or `const` in the source resolves.
    Unsized { symbol: String },
}

impl ArraySize {
    pub fn len(&self) -> Option<u32> {
        match self {
            Self::Fixed(n) => Some(*n),
            Self::Unsized { .. } => None,
        }
    }
}

impl fmt::Display for ArraySize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Fixed(n) => write!(f, "{}", n),
            Self::Unsized { symbol } => f.write_str(symbol),
        }
    }
}

// ── Declaration records ───────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Version {
    pub number: u32,
    pub profile: Option<String>,
    pub full_text: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Constant {
    pub name: String,
    pub ty: String,
    pub canonical: String,
    pub array: Option<ArraySize>,
    /// Initializer expression, without the trailing `;`.
    pub value: String,
    pub full_text: String,
    pub span: Span,
    pub annotations: Vec<Annotation>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Uniform {
    pub name: String,
    pub ty: String,
    pub canonical: String,
    pub array: Option<ArraySize>,
    pub location: Option<u32>,
    pub full_text: String,
    pub span: Span,
    pub annotations: Vec<Annotation>,
}

/// A member of a uniform block or a structure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Field {
    pub name: String,
    pub ty: String,
    pub canonical: String,
    pub array: Option<ArraySize>,
    pub full_text: String,
    pub span: Span,
    pub annotations: Vec<Annotation>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum BlockLayout {
    #[default]
    Ordinary,
    Std140,
    Std430,
    Packed,
    Shared,
}

impl BlockLayout {
    pub fn from_keyword(word: &str) -> Option<Self> {
        match word.to_ascii_lowercase().as_str() {
            "std140" => Some(Self::Std140),
            "std430" => Some(Self::Std430),
            "packed" => Some(Self::Packed),
            "shared" => Some(Self::Shared),
            _ => None,
        }
    }

    pub fn keyword(self) -> Option<&'static str> {
        match self {
            Self::Ordinary => None,
            Self::Std140 => Some("std140"),
            Self::Std430 => Some("std430"),
            Self::Packed => Some("packed"),
            Self::Shared => Some("shared"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UniformBlock {
    pub name: Option<String>,
    pub instance_name: Option<String>,
    pub layout: BlockLayout,
    pub binding: Option<u32>,
    pub fields: Vec<Field>,
    pub full_text: String,
    pub span: Span,
    pub annotations: Vec<Annotation>,
}

impl UniformBlock {
    /// Block name, or the instance name for anonymous blocks.
    pub fn ident(&self) -> &str {
        self.name
            .as_deref()
            .or(self.instance_name.as_deref())
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Struct {
    pub name: String,
    pub fields: Vec<Field>,
    pub full_text: String,
    pub span: Span,
    pub annotations: Vec<Annotation>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StructInstance {
    pub struct_name: String,
    pub name: String,
    pub is_uniform: bool,
    pub array: Option<ArraySize>,
    pub full_text: String,
    pub span: Span,
    pub annotations: Vec<Annotation>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    In,
    Out,
}

impl Direction {
    pub fn keyword(self) -> &'static str {
        match self {
            Self::In => "in",
            Self::Out => "out",
        }
    }
}

/// A stage-level `in` / `out` variable (vertex attributes, varyings,
/// fragment outputs).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InOutParam {
    pub direction: Direction,
    pub location: Option<u32>,
    pub interpolation: Option<String>,
    pub name: String,
    pub ty: String,
    pub canonical: String,
    pub array: Option<ArraySize>,
    pub full_text: String,
    pub span: Span,
    pub annotations: Vec<Annotation>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MethodParam {
    /// `in`, `out`, `inout` or `const`, when present.
    pub qualifier: Option<String>,
    pub ty: String,
    pub canonical: String,
    /// Name with any `[..]` suffix stripped.
    pub name: String,
    pub array: Option<ArraySize>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Method {
    pub name: String,
    pub return_type: String,
    pub params: Vec<MethodParam>,
    /// Header and body, through the matching closing brace.
    pub full_text: String,
    pub span: Span,
    pub annotations: Vec<Annotation>,
}

// ── Chunks and the model root ─────────────────────────────────────────────

/// Everything extracted from one stage of a combined source.
///
/// Record spans are relative to [`ShaderChunk::text`]; add
/// [`ShaderChunk::offset`] to get combined-source offsets.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShaderChunk {
    pub stage: Stage,
    pub offset: usize,
    pub text: String,
    pub version: Option<Version>,
    pub constants: Vec<Constant>,
    pub uniforms: Vec<Uniform>,
    pub uniform_blocks: Vec<UniformBlock>,
    pub structures: Vec<Struct>,
    pub struct_instances: Vec<StructInstance>,
    pub in_out: Vec<InOutParam>,
    pub methods: Vec<Method>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShaderModel {
    pub source: String,
    pub vertex: ShaderChunk,
    pub fragment: ShaderChunk,
    pub contributions: Vec<Contribution>,
}

impl ShaderModel {
    pub fn chunk(&self, stage: Stage) -> &ShaderChunk {
        match stage {
            Stage::Vertex => &self.vertex,
            Stage::Fragment => &self.fragment,
        }
    }

    pub fn with_contributions(mut self, contributions: Vec<Contribution>) -> Self {
        self.contributions = contributions;
        self
    }
}

// ── FirstWins ─────────────────────────────────────────────────────────────

/// Ordered collection keyed by identifier where the first insertion of a
/// key wins and later ones are dropped.
#[derive(Debug)]
pub(crate) struct FirstWins<T> {
    seen: HashSet<String>,
    items: Vec<T>,
}

impl<T> FirstWins<T> {
    pub fn new() -> Self {
        Self { seen: HashSet::new(), items: Vec::new() }
    }

    /// Returns `false` (and drops `item`) if `key` was already taken.
    pub fn insert(&mut self, key: &str, item: T) -> bool {
        if self.seen.insert(key.to_string()) {
            self.items.push(item);
            true
        } else {
            false
        }
    }

    pub fn into_vec(self) -> Vec<T> {
        self.items
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn placement_parse_is_case_insensitive() {
        let anns = vec![Annotation::new("PlaceTarget", Some("Vertex"))];
        assert_eq!(Placement::from_annotations(&anns), Some(Placement::Vertex));
        assert!(Placement::Both.wants(Stage::Fragment));
        assert!(!Placement::Vertex.wants(Stage::Fragment));
    }

    #[test]
    fn unknown_placement_value_is_ignored() {
        let anns = vec![Annotation::new("placetarget", Some("geometry"))];
        assert_eq!(Placement::from_annotations(&anns), None);
    }

    #[test]
    fn merge_skips_duplicates() {
        let mut into = vec![Annotation::new("placetarget", Some("both"))];
        merge_annotations(
            &mut into,
            &[Annotation::new("PLACETARGET", Some("both")), Annotation::new("Hidden", None)],
        );
        assert_eq!(into.len(), 2);
        assert_eq!(into[1].raw, "[Hidden]");
    }

    #[test]
    fn first_insert_wins() {
        let mut list = FirstWins::new();
        assert!(list.insert("a", 1));
        assert!(!list.insert("a", 2));
        assert!(list.insert("b", 3));
        assert_eq!(list.into_vec(), vec![1, 3]);
    }
}
