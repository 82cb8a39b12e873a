use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{MaterialInfo, ShaderNode};

/// State of a single node input socket.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SocketState {
    pub default_value: f32,
    #[serde(default)]
    pub is_linked: bool,
}

/// Whether a material emits light.
///
/// Only node-based materials are considered. A material is emissive if it
/// contains an Emission node that is linked or has a positive strength (or
/// no strength input at all), or a Principled BSDF whose emission strength
/// is positive or linked, or whose emission color is linked.
pub fn is_emissive(material: &MaterialInfo) -> bool {
    if !material.use_nodes {
        return false;
    }

    material.nodes.iter().any(|node| match node {
        ShaderNode::Emission {
            strength,
            output_linked,
        } => *output_linked || strength.is_none_or(|s| s > 0.0),
        ShaderNode::PrincipledBsdf {
            emission_strength,
            emission_color_linked,
        } => {
            *emission_color_linked
                || emission_strength.is_some_and(|socket| socket.default_value > 0.0 || socket.is_linked)
        }
        ShaderNode::Other => false,
    })
}

/// Names of all emissive materials, in input order, without duplicates.
pub fn classify_emissive_materials(materials: &[MaterialInfo]) -> Vec<String> {
    let mut emissive: Vec<String> = Vec::new();
    for material in materials.iter().filter(|m| is_emissive(m)) {
        if !emissive.contains(&material.name) {
            debug!(material = %material.name, "Found emissive material");
            emissive.push(material.name.clone());
        }
    }
    emissive
}
