//! Lightgroup and compositor planning.
//!
//! The host owns the scene; this module only decides what to do with it.
//! The host binding describes its scene as plain data ([`SceneInventory`],
//! [`RenderPass`]), calls one of the planners, and applies the returned
//! plan through its own scene API:
//!
//! - [`plan_lightgroups`] - one lightgroup per light, the world, and every
//!   object using an emissive material
//! - [`plan_assignment`] - put selected objects into an existing or new
//!   lightgroup
//! - [`plan_compositor`] - denoise every lightgroup pass and route all
//!   remaining passes into a single multi-layer file output
//!
//! All inputs are `serde` types so a binding can hand them over as JSON.

mod compositor;
mod emission;
mod planner;

pub use compositor::{
    CompositorPlan, DENOISING_ALBEDO, DENOISING_NORMAL, DenoiseNode, OUTPUT_BASE_PATH, OutputSlot,
    RenderEngine, RenderPass, SlotSource, plan_compositor,
};
pub use emission::{SocketState, classify_emissive_materials, is_emissive};
pub use planner::{
    AssignTarget, AssignmentPlan, LightgroupMember, LightgroupPlan, PlannedLightgroup,
    SelectedObject, WORLD_LIGHTGROUP, clear_report, lightgroup_name, plan_assignment,
    plan_lightgroups, sanitize_lightgroup_name,
};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Failures of the lightgroup planners, reported to the user as-is.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LightgroupError {
    #[error(
        "Compositor setup requires the Cycles render engine (current: {engine}). Please switch to Cycles and try again."
    )]
    UnsupportedEngine { engine: String },

    #[error("Denoising outputs not found. Enable 'Denoising Data' in render settings.")]
    MissingDenoisingData,

    #[error("Lightgroup name cannot be empty")]
    EmptyName,

    #[error("No objects selected")]
    NoSelection,
}

/// A shader node, reduced to what emission detection looks at.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ShaderNode {
    /// A pure Emission shader.
    Emission {
        /// Value of the Strength input; `None` when the node has no such input.
        #[serde(default)]
        strength: Option<f32>,
        /// Any output of the node is linked.
        #[serde(default)]
        output_linked: bool,
    },
    /// A Principled BSDF.
    PrincipledBsdf {
        #[serde(default)]
        emission_strength: Option<SocketState>,
        #[serde(default)]
        emission_color_linked: bool,
    },
    /// Any other node.
    Other,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MaterialInfo {
    pub name: String,
    #[serde(default)]
    pub use_nodes: bool,
    #[serde(default)]
    pub nodes: Vec<ShaderNode>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectInfo {
    pub name: String,
    /// Material in each slot; empty slots are `None`.
    #[serde(default)]
    pub material_slots: Vec<Option<String>>,
}

/// Everything [`plan_lightgroups`] needs to know about a scene.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SceneInventory {
    /// Light objects in scene order.
    #[serde(default)]
    pub lights: Vec<String>,
    /// Whether the scene has a world to assign.
    #[serde(default = "default_has_world")]
    pub has_world: bool,
    #[serde(default)]
    pub materials: Vec<MaterialInfo>,
    /// All objects, in data order.
    #[serde(default)]
    pub objects: Vec<ObjectInfo>,
}

const fn default_has_world() -> bool {
    true
}
