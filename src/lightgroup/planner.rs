use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::emission::classify_emissive_materials;
use super::{LightgroupError, SceneInventory};

/// Lightgroup the world is assigned to.
pub const WORLD_LIGHTGROUP: &str = "World";

/// Lightgroup name for a light or object.
///
/// Render passes are named after lightgroups and the host rejects dots in
/// them, so dots become underscores.
pub fn lightgroup_name(name: &str) -> String {
    name.replace('.', "_")
}

/// Normalize a lightgroup name typed by the user: trimmed, non-empty, and
/// without dots.
pub fn sanitize_lightgroup_name(name: &str) -> Result<String, LightgroupError> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(LightgroupError::EmptyName);
    }
    Ok(lightgroup_name(trimmed))
}

/// What gets assigned to a planned lightgroup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "name", rename_all = "snake_case")]
pub enum LightgroupMember {
    Light(String),
    World,
    EmissiveObject(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlannedLightgroup {
    pub name: String,
    pub member: LightgroupMember,
}

/// Lightgroups to create, in creation order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LightgroupPlan {
    pub lightgroups: Vec<PlannedLightgroup>,
    /// Emissive materials found while planning.
    pub emissive_materials: Vec<String>,
}

impl LightgroupPlan {
    pub fn names(&self) -> Vec<&str> {
        self.lightgroups.iter().map(|lg| lg.name.as_str()).collect()
    }

    pub fn summary(&self) -> String {
        format!("Created {} lightgroups", self.lightgroups.len())
    }
}

/// Plan one lightgroup per light, one for the world, and one per object
/// that uses an emissive material.
///
/// Objects are considered in inventory order and each appears at most once,
/// however many emissive slots it has.
pub fn plan_lightgroups(inventory: &SceneInventory) -> LightgroupPlan {
    let mut plan = LightgroupPlan::default();

    for light in &inventory.lights {
        plan.lightgroups.push(PlannedLightgroup {
            name: lightgroup_name(light),
            member: LightgroupMember::Light(light.clone()),
        });
    }

    if inventory.has_world {
        plan.lightgroups.push(PlannedLightgroup {
            name: WORLD_LIGHTGROUP.to_string(),
            member: LightgroupMember::World,
        });
    }

    plan.emissive_materials = classify_emissive_materials(&inventory.materials);

    let mut seen: Vec<&str> = Vec::new();
    for object in &inventory.objects {
        let uses_emission = object
            .material_slots
            .iter()
            .flatten()
            .any(|material| plan.emissive_materials.contains(material));
        if !uses_emission || seen.contains(&object.name.as_str()) {
            continue;
        }

        debug!(object = %object.name, "Found object using emission");
        seen.push(&object.name);
        plan.lightgroups.push(PlannedLightgroup {
            name: lightgroup_name(&object.name),
            member: LightgroupMember::EmissiveObject(object.name.clone()),
        });
    }

    info!(count = plan.lightgroups.len(), "Planned lightgroups");
    plan
}

/// Report line for clearing `count` lightgroups.
pub fn clear_report(count: usize) -> String {
    if count == 0 {
        "No lightgroups to clear".to_string()
    } else {
        format!("Cleared {count} lightgroup(s)")
    }
}

/// Target of an assignment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "name", rename_all = "snake_case")]
pub enum AssignTarget {
    Existing(String),
    /// Create a lightgroup with this (unsanitized) name first.
    New(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectedObject {
    pub name: String,
    /// The object type supports lightgroup membership.
    pub can_have_lightgroup: bool,
}

/// Result of [`plan_assignment`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssignmentPlan {
    pub lightgroup: String,
    /// `lightgroup` has to be created before assigning.
    pub create: bool,
    pub assigned: Vec<String>,
    pub skipped: Vec<String>,
}

impl AssignmentPlan {
    /// Report lines, in the order the user should see them.
    pub fn reports(&self) -> Vec<String> {
        let mut reports = Vec::new();
        if self.create {
            reports.push(format!("Created new lightgroup: {}", self.lightgroup));
        }
        if !self.assigned.is_empty() {
            reports.push(format!("Assigned {} object(s) to '{}'", self.assigned.len(), self.lightgroup));
        }
        if !self.skipped.is_empty() {
            reports.push(format!(
                "Skipped {} object(s) that cannot be assigned to lightgroups",
                self.skipped.len()
            ));
        }
        reports
    }
}

/// Plan assigning the selected objects to a lightgroup.
///
/// Objects that cannot carry a lightgroup are skipped, not rejected.
pub fn plan_assignment(
    selected: &[SelectedObject],
    target: &AssignTarget,
) -> Result<AssignmentPlan, LightgroupError> {
    if selected.is_empty() {
        return Err(LightgroupError::NoSelection);
    }

    let (lightgroup, create) = match target {
        AssignTarget::Existing(name) => (name.clone(), false),
        AssignTarget::New(name) => (sanitize_lightgroup_name(name)?, true),
    };

    let (assignable, rejected): (Vec<_>, Vec<_>) =
        selected.iter().partition(|object| object.can_have_lightgroup);

    Ok(AssignmentPlan {
        lightgroup,
        create,
        assigned: assignable.into_iter().map(|o| o.name.clone()).collect(),
        skipped: rejected.into_iter().map(|o| o.name.clone()).collect(),
    })
}
