//! Auxiliary resource scripts that contribute declarations to a combined
//! source from outside it.

use serde::{Deserialize, Serialize};

use crate::annotations::split_annotations;
use crate::error::StructuralError;
use crate::model::{Constant, Method, Struct, StructInstance, Uniform, UniformBlock};
use crate::scan::{self, Source};

/// Service markers describe the script itself, not a declaration. They are
/// collected and stripped before scanning.
const SERVICE_MARKERS: &[&str] =
    &["InterfaceName", "ComponentName", "SystemName", "RequiredComponent"];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Contribution {
    pub name: String,
    pub interface_name: String,
    pub component_name: Option<String>,
    pub system_name: Option<String>,
    pub required_components: Vec<String>,
    /// The script with its service markers removed.
    pub processed_source: String,
    pub constants: Vec<Constant>,
    pub uniforms: Vec<Uniform>,
    pub uniform_blocks: Vec<UniformBlock>,
    pub structures: Vec<Struct>,
    pub struct_instances: Vec<StructInstance>,
    pub methods: Vec<Method>,
}

impl Contribution {
    /// Parse a resource script. `name` is usually the file stem and seeds
    /// the default interface name `I<name>Renderer`.
    pub fn parse(name: &str, source: &str) -> Result<Self, StructuralError> {
        let mut interface_name = None;
        let mut component_name = None;
        let mut system_name = None;
        let mut required_components = Vec::new();
        let mut processed = String::with_capacity(source.len());

        for (i, line) in source.split('\n').enumerate() {
            if i > 0 {
                processed.push('\n');
            }
            let (found, _) = split_annotations(line);
            let mut kept = line.to_string();
            for ann in found.iter().filter(|a| SERVICE_MARKERS.iter().any(|m| a.is(m))) {
                let value = ann.value.as_deref().map(str::trim).unwrap_or_default().to_string();
                if ann.is("InterfaceName") {
                    interface_name.get_or_insert(value);
                } else if ann.is("ComponentName") {
                    component_name.get_or_insert(value);
                } else if ann.is("SystemName") {
                    system_name.get_or_insert(value);
                } else {
                    required_components.push(value);
                }
                kept = kept.replacen(&ann.raw, "", 1);
            }
            if kept.trim().is_empty() && kept.len() != line.len() {
                kept.clear();
            }
            processed.push_str(&kept);
        }

        let src = Source::new(&processed);
        let structs = scan::structs::scan_struct_defs(&src);
        let contribution = Self {
            name: name.to_string(),
            interface_name: interface_name.unwrap_or_else(|| format!("I{}Renderer", name)),
            component_name,
            system_name,
            required_components,
            constants: scan::constants::scan_constants(&src),
            uniforms: scan::uniforms::scan_uniforms(&src),
            uniform_blocks: scan::blocks::scan_uniform_blocks(&src),
            struct_instances: scan::instances::scan_struct_instances(&src, &structs),
            structures: structs.into_iter().map(|def| def.record).collect(),
            methods: scan::methods::scan_methods(&src)?,
            processed_source: processed.clone(),
        };
        log::debug!(
            "contribution `{}`: {} uniforms, {} blocks, {} structs, {} methods",
            contribution.name,
            contribution.uniforms.len(),
            contribution.uniform_blocks.len(),
            contribution.structures.len(),
            contribution.methods.len(),
        );
        Ok(contribution)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SCRIPT: &str = "\
[InterfaceName:IShadowRenderer]
[RequiredComponent:Transform]
[RequiredComponent:Light]

[placetarget:both]
layout(std140, binding = 3) uniform ShadowData {
    mat4 lightSpace;
};

[placetarget:fragment]
float shadowFactor(vec4 p) {
    return p.w > 0.0 ? 1.0 : 0.0;
}
";

    #[test]
    fn service_markers_are_collected_and_stripped() {
        let c = Contribution::parse("Shadow", SCRIPT).unwrap();
        assert_eq!(c.interface_name, "IShadowRenderer");
        assert_eq!(c.required_components, vec!["Transform", "Light"]);
        assert!(!c.processed_source.contains("RequiredComponent"));
        assert!(c.processed_source.contains("[placetarget:both]"));
    }

    #[test]
    fn declarations_keep_their_annotations() {
        let c = Contribution::parse("Shadow", SCRIPT).unwrap();
        assert_eq!(c.uniform_blocks.len(), 1);
        assert_eq!(c.uniform_blocks[0].binding, Some(3));
        assert_eq!(c.uniform_blocks[0].annotations[0].raw, "[placetarget:both]");
        assert_eq!(c.methods.len(), 1);
        assert_eq!(c.methods[0].name, "shadowFactor");
        assert_eq!(c.methods[0].annotations.len(), 1);
    }

    #[test]
    fn default_interface_name() {
        let c = Contribution::parse("Fog", "uniform float density;").unwrap();
        assert_eq!(c.interface_name, "IFogRenderer");
        assert_eq!(c.uniforms[0].name, "density");
        assert_eq!(c.component_name, None);
    }
}
