use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use tracing::{debug, warn};

use super::LightgroupError;

pub const DENOISING_NORMAL: &str = "Denoising Normal";
pub const DENOISING_ALBEDO: &str = "Denoising Albedo";
const DENOISING_DEPTH: &str = "Denoising Depth";
const NOISY_IMAGE: &str = "Noisy Image";

/// Base path of the file output node, relative to the blend file.
pub const OUTPUT_BASE_PATH: &str = "//../../04_Renders/01_Components/{blend_name}_";

/// Node editor spacing between consecutive denoise nodes.
const DENOISE_SPACING: f32 = -250.0;
const DENOISE_X: f32 = 500.0;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RenderEngine {
    Cycles,
    BlenderEevee,
    BlenderWorkbench,
    #[serde(untagged)]
    Other(String),
}

impl fmt::Display for RenderEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Cycles => f.write_str("CYCLES"),
            Self::BlenderEevee => f.write_str("BLENDER_EEVEE"),
            Self::BlenderWorkbench => f.write_str("BLENDER_WORKBENCH"),
            Self::Other(name) => f.write_str(name),
        }
    }
}

/// An output socket of the render layers node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenderPass {
    pub name: String,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

const fn default_enabled() -> bool {
    true
}

impl RenderPass {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            enabled: true,
        }
    }

    pub fn disabled(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            enabled: false,
        }
    }
}

/// Denoise node fed by a lightgroup's combined pass plus the denoising
/// normal and albedo passes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DenoiseNode {
    pub lightgroup: String,
    /// `Combined_<lightgroup>`, or `None` when the render layer has no such
    /// pass and the node stays unconnected.
    pub image_pass: Option<String>,
    pub location: (f32, f32),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "name", rename_all = "snake_case")]
pub enum SlotSource {
    /// Output of the denoise node for this lightgroup.
    Denoised(String),
    /// A render pass, unprocessed.
    Pass(String),
}

/// One layer of the multi-layer file output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputSlot {
    pub name: String,
    pub source: SlotSource,
}

/// Complete compositor setup. The host clears the existing tree, adds a
/// render layers node, the denoise nodes, and a file output node with
/// `slots` in order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompositorPlan {
    pub base_path: String,
    pub denoise_nodes: Vec<DenoiseNode>,
    pub slots: Vec<OutputSlot>,
    /// Lightgroups whose combined pass was not found.
    pub warnings: Vec<String>,
}

impl CompositorPlan {
    pub const SUMMARY: &'static str = "Compositor setup complete";
}

/// Plan the denoise-and-export compositor tree.
///
/// Every lightgroup gets a denoise node. Those with a `Combined_<name>` pass
/// have it wired in and the node's output becomes a slot named after the
/// lightgroup; the rest are left unconnected with a warning. Every other enabled
/// pass, except the raw denoising depth and noisy image, is routed straight
/// to a slot of its own. Once any lightgroup has been denoised the
/// denoising normal and albedo passes count as used and are not exported.
///
/// # Errors
///
/// - [`LightgroupError::UnsupportedEngine`] unless the engine is Cycles
/// - [`LightgroupError::MissingDenoisingData`] if the denoising normal or
///   albedo pass is absent
pub fn plan_compositor(
    engine: &RenderEngine,
    lightgroups: &[String],
    passes: &[RenderPass],
) -> Result<CompositorPlan, LightgroupError> {
    if *engine != RenderEngine::Cycles {
        return Err(LightgroupError::UnsupportedEngine {
            engine: engine.to_string(),
        });
    }

    let has_pass = |name: &str| passes.iter().any(|pass| pass.name == name);
    if !has_pass(DENOISING_NORMAL) || !has_pass(DENOISING_ALBEDO) {
        return Err(LightgroupError::MissingDenoisingData);
    }

    let mut used: HashSet<&str> = HashSet::new();
    let mut denoise_nodes = Vec::new();
    let mut slots = Vec::new();
    let mut warnings = Vec::new();

    for (index, lightgroup) in lightgroups.iter().enumerate() {
        let image_pass = format!("Combined_{lightgroup}");
        let pass = passes.iter().find(|pass| pass.name == image_pass);

        denoise_nodes.push(DenoiseNode {
            lightgroup: lightgroup.clone(),
            image_pass: pass.map(|pass| pass.name.clone()),
            location: (DENOISE_X, index as f32 * DENOISE_SPACING),
        });

        let Some(pass) = pass else {
            warn!(pass = %image_pass, "Could not find output for lightgroup");
            warnings.push(format!("Could not find output for light group '{image_pass}'"));
            continue;
        };

        used.insert(pass.name.as_str());
        used.insert(DENOISING_NORMAL);
        used.insert(DENOISING_ALBEDO);

        slots.push(OutputSlot {
            name: lightgroup.clone(),
            source: SlotSource::Denoised(lightgroup.clone()),
        });
    }

    for pass in passes {
        if !pass.enabled
            || used.contains(pass.name.as_str())
            || pass.name == DENOISING_DEPTH
            || pass.name == NOISY_IMAGE
        {
            continue;
        }
        debug!(pass = %pass.name, "Adding pass to file output");
        slots.push(OutputSlot {
            name: pass.name.clone(),
            source: SlotSource::Pass(pass.name.clone()),
        });
    }

    Ok(CompositorPlan {
        base_path: OUTPUT_BASE_PATH.to_string(),
        denoise_nodes,
        slots,
        warnings,
    })
}
