//! Material-property descriptor trees built from a generated wrapper.
//!
//! The wrapper generator emits, next to each wrapper source, a
//! [`WrapperDescriptor`] listing the wrapper's properties and the struct types
//! they reference. [`analyze_material`] classifies those properties into
//! editable containers, taking array lengths from the wrapper source itself.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::cursor::{blank_comments, split_top_level, word_before, word_positions, Cursor};

// ── Descriptor table ──────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropertyDescriptor {
    pub name: String,
    /// Declared type, e.g. `f32`, `Vector3<f32>`, `Texture`,
    /// `StructArray<LightData>`.
    pub type_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StructDescriptor {
    pub type_name: String,
    pub properties: Vec<PropertyDescriptor>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WrapperDescriptor {
    pub type_name: String,
    pub properties: Vec<PropertyDescriptor>,
    #[serde(default)]
    pub structs: Vec<StructDescriptor>,
}

impl WrapperDescriptor {
    fn find_struct(&self, type_name: &str) -> Option<&StructDescriptor> {
        self.structs.iter().find(|s| s.type_name == type_name)
    }
}

// ── Descriptor tree ───────────────────────────────────────────────────────

/// A default property value as the editor shows it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DefaultValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Vector(Vec<f64>),
    /// Column-major.
    Matrix(Vec<Vec<f64>>),
    Str(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StructElement {
    /// `property[i]`
    pub name: String,
    pub type_name: String,
    pub fields: Vec<MaterialDataContainer>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum MaterialDataContainer {
    #[serde(rename = "Uniform")]
    Primitive { name: String, type_name: String, value: DefaultValue },

    #[serde(rename = "Sampler")]
    Texture {
        name: String,
        type_name: String,
        texture_guid: Option<String>,
    },

    SamplerArray {
        name: String,
        type_name: String,
        size: u32,
        texture_guids: Vec<Option<String>>,
    },

    Struct {
        name: String,
        type_name: String,
        fields: Vec<MaterialDataContainer>,
    },

    StructArray {
        name: String,
        type_name: String,
        element_type: String,
        size: u32,
        elements: Vec<StructElement>,
    },

    #[serde(rename = "Array")]
    PrimitiveArray {
        name: String,
        type_name: String,
        element_type: String,
        size: u32,
        values: Vec<DefaultValue>,
    },
}

impl MaterialDataContainer {
    pub fn name(&self) -> &str {
        match self {
            Self::Primitive { name, .. }
            | Self::Texture { name, .. }
            | Self::SamplerArray { name, .. }
            | Self::Struct { name, .. }
            | Self::StructArray { name, .. }
            | Self::PrimitiveArray { name, .. } => name,
        }
    }
}

// ── Analysis ──────────────────────────────────────────────────────────────

/// Properties that belong to the wrapper's plumbing, not to the material.
fn is_bookkeeping(name: &str) -> bool {
    name.starts_with('_') || name.ends_with("Location") || matches!(name, "Handle" | "IsDirty" | "Owner")
}

/// Build the descriptor tree for `descriptor`, reading array lengths from
/// the wrapper's generated source.
pub fn analyze_material(
    descriptor: &WrapperDescriptor,
    generated_source: &str,
) -> Vec<MaterialDataContainer> {
    let sizes = extract_array_sizes(generated_source);
    let mut analyzer = Analyzer { descriptor, sizes: &sizes, stack: vec![descriptor.type_name.clone()] };
    analyzer.properties(&descriptor.properties)
}

struct Analyzer<'a> {
    descriptor: &'a WrapperDescriptor,
    sizes: &'a HashMap<String, u32>,
    /// Struct types currently being expanded.
    stack: Vec<String>,
}

impl Analyzer<'_> {
    fn properties(&mut self, properties: &[PropertyDescriptor]) -> Vec<MaterialDataContainer> {
        properties
            .iter()
            .filter(|p| !is_bookkeeping(&p.name))
            .filter_map(|p| self.container(p))
            .collect()
    }

    /// `_name`, then `name`, then 1.
    fn array_size(&self, name: &str) -> u32 {
        self.sizes
            .get(&format!("_{}", name))
            .or_else(|| self.sizes.get(name))
            .copied()
            .unwrap_or(1)
    }

    fn container(&mut self, property: &PropertyDescriptor) -> Option<MaterialDataContainer> {
        let name = property.name.clone();
        let type_name = property.type_name.trim().to_string();

        if type_name == "Texture" {
            return Some(MaterialDataContainer::Texture { name, type_name, texture_guid: None });
        }
        if type_name == "SamplerArray" {
            let size = self.array_size(&name);
            return Some(MaterialDataContainer::SamplerArray {
                name,
                type_name,
                size,
                texture_guids: vec![None; size as usize],
            });
        }
        if let Some(element) = generic_argument(&type_name, "StructArray") {
            let element = element.to_string();
            let size = self.array_size(&name);
            let fields = self.struct_fields(&element)?;
            let elements = (0..size)
                .map(|i| StructElement {
                    name: format!("{}[{}]", name, i),
                    type_name: element.clone(),
                    fields: fields.clone(),
                })
                .collect();
            return Some(MaterialDataContainer::StructArray {
                name,
                type_name,
                element_type: element,
                size,
                elements,
            });
        }
        if let Some(element) = generic_argument(&type_name, "LocaleArray") {
            let Some(value) = default_value(element) else {
                log::debug!("`{}`: unsupported array element type `{}`", name, element);
                return None;
            };
            let element = element.to_string();
            let size = self.array_size(&name);
            return Some(MaterialDataContainer::PrimitiveArray {
                name,
                type_name,
                element_type: element,
                size,
                values: vec![value; size as usize],
            });
        }
        if self.descriptor.find_struct(&type_name).is_some() {
            let fields = self.struct_fields(&type_name)?;
            return Some(MaterialDataContainer::Struct { name, type_name, fields });
        }
        if let Some(value) = default_value(&type_name) {
            return Some(MaterialDataContainer::Primitive { name, type_name, value });
        }
        log::debug!("`{}`: type `{}` is not a material property", name, type_name);
        None
    }

    fn struct_fields(&mut self, type_name: &str) -> Option<Vec<MaterialDataContainer>> {
        let Some(def) = self.descriptor.find_struct(type_name) else {
            log::debug!("struct `{}` is missing from the descriptor table", type_name);
            return None;
        };
        if self.stack.iter().any(|t| t == type_name) {
            log::warn!("struct `{}` contains itself; nested fields left empty", type_name);
            return Some(Vec::new());
        }
        self.stack.push(type_name.to_string());
        let fields = self.properties(&def.properties);
        self.stack.pop();
        Some(fields)
    }
}

/// `T` out of `outer<T>`.
fn generic_argument<'t>(type_name: &'t str, outer: &str) -> Option<&'t str> {
    type_name
        .strip_prefix(outer)?
        .trim_start()
        .strip_prefix('<')?
        .strip_suffix('>')
        .map(str::trim)
}

fn default_value(type_name: &str) -> Option<DefaultValue> {
    match type_name {
        "bool" => return Some(DefaultValue::Bool(false)),
        "i32" | "u32" | "i64" | "u64" => return Some(DefaultValue::Int(0)),
        "f32" | "f64" => return Some(DefaultValue::Float(0.0)),
        "String" | "string" => return Some(DefaultValue::Str(String::new())),
        _ => {}
    }
    let (shape, scalar) = type_name.strip_suffix('>')?.split_once('<')?;
    if !matches!(scalar.trim(), "f32" | "f64" | "i32" | "u32") {
        return None;
    }
    if let Some(n) = shape.strip_prefix("Vector") {
        let n: usize = n.parse().ok().filter(|n| (2..=4).contains(n))?;
        return Some(DefaultValue::Vector(vec![0.0; n]));
    }
    let (cols, rows) = shape.strip_prefix("Matrix")?.split_once('x')?;
    let cols: usize = cols.parse().ok().filter(|n| (2..=4).contains(n))?;
    let rows: usize = rows.parse().ok().filter(|n| (2..=4).contains(n))?;
    Some(DefaultValue::Matrix(
        (0..cols)
            .map(|c| (0..rows).map(|r| if r == c { 1.0 } else { 0.0 }).collect())
            .collect(),
    ))
}

// ── Array sizes from the generated source ─────────────────────────────────

/// Longest array a material container will allocate defaults for.
pub const MAX_ARRAY_LEN: u32 = 4096;

/// Array lengths passed to the wrapper's container constructors, keyed by
/// the assigned field name as written:
///
/// - `_maps = new SamplerArray(handle, 4)`
/// - `_weights = new LocaleArray<f32>(8)`
/// - `_lights = StructArray<LightData>(2)`
///
/// `new` is optional. Sizes of zero, and sizes above [`MAX_ARRAY_LEN`], are
/// ignored, so the property falls back to a length of one.
pub fn extract_array_sizes(source: &str) -> HashMap<String, u32> {
    let clean = blank_comments(source);
    let mut sizes = HashMap::new();

    for (ctor, size_arg) in [("SamplerArray", 1), ("LocaleArray", 0), ("StructArray", 0)] {
        for at in word_positions(&clean, ctor) {
            let Some(field) = assigned_field(&clean, at) else { continue };
            let mut cur = Cursor::at(&clean, at + ctor.len());
            if cur.eat('<') && cur.until('>').is_none() {
                continue;
            }
            if !cur.eat('(') {
                continue;
            }
            let Some(args) = call_args(&clean, cur.pos()) else { continue };
            match args.get(size_arg).and_then(|a| parse_size(a)) {
                Some(size) if size > MAX_ARRAY_LEN => {
                    log::warn!(
                        "array length {} for `{}` exceeds {}; ignored",
                        size,
                        field,
                        MAX_ARRAY_LEN
                    );
                }
                Some(size) if size > 0 => {
                    sizes.insert(field.to_string(), size);
                }
                _ => {}
            }
        }
    }
    sizes
}

/// `field = [new] ` ending right before `at`.
fn assigned_field(clean: &str, at: usize) -> Option<&str> {
    let mut pos = at;
    if let Some((start, "new")) = word_before(clean, pos) {
        pos = start;
    }
    let before = clean[..pos].trim_end();
    let eq = before.strip_suffix('=')?;
    if eq.ends_with(['=', '!', '<', '>']) {
        return None;
    }
    word_before(clean, eq.len()).map(|(_, field)| field)
}

/// Top-level arguments of a call whose `(` ends right before `open_end`.
fn call_args(clean: &str, open_end: usize) -> Option<Vec<&str>> {
    let mut depth = 1usize;
    for (i, ch) in clean[open_end..].char_indices() {
        match ch {
            '(' => depth += 1,
            ')' => {
                depth -= 1;
                if depth == 0 {
                    return Some(split_top_level(&clean[open_end..open_end + i]));
                }
            }
            _ => {}
        }
    }
    None
}

/// Leading integer literal, allowing a type suffix such as `usize`.
fn parse_size(arg: &str) -> Option<u32> {
    let arg = arg.trim();
    let digits = arg.len() - arg.trim_start_matches(|c: char| c.is_ascii_digit()).len();
    if digits == 0 {
        return None;
    }
    let (number, suffix) = arg.split_at(digits);
    suffix
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_')
        .then(|| number.parse().ok())
        .flatten()
}
