//! Lightgroup and compositor planning driven by JSON scene descriptions,
//! the way a host binding hands them over.

use anyhow::Result;
use lightgroup_tools::lightgroup::{
    CompositorPlan, LightgroupError, RenderEngine, RenderPass, SceneInventory, SlotSource, plan_compositor,
    plan_lightgroups,
};

const SCENE: &str = r#"{
    "lights": ["Key", "Rim.001"],
    "materials": [
        {"name": "Neon", "use_nodes": true, "nodes": [
            {"type": "emission", "strength": 4.0, "output_linked": true}
        ]},
        {"name": "Screen", "use_nodes": true, "nodes": [
            {"type": "principled_bsdf", "emission_strength": {"default_value": 0.0, "is_linked": true}}
        ]},
        {"name": "Floor", "use_nodes": true, "nodes": [
            {"type": "principled_bsdf", "emission_strength": {"default_value": 0.0}},
            {"type": "other"}
        ]}
    ],
    "objects": [
        {"name": "Ground", "material_slots": ["Floor"]},
        {"name": "Sign", "material_slots": ["Floor", "Neon"]},
        {"name": "Monitor", "material_slots": [null, "Screen"]}
    ]
}"#;

#[test]
fn test_scene_to_compositor() -> Result<()> {
    let inventory: SceneInventory = serde_json::from_str(SCENE)?;
    let plan = plan_lightgroups(&inventory);
    assert_eq!(plan.names(), vec!["Key", "Rim_001", "World", "Sign", "Monitor"]);
    assert_eq!(plan.emissive_materials, vec!["Neon".to_string(), "Screen".to_string()]);

    let lightgroups: Vec<String> = plan.names().into_iter().map(str::to_string).collect();
    let mut passes = vec![
        RenderPass::new("Image"),
        RenderPass::new("Denoising Normal"),
        RenderPass::new("Denoising Albedo"),
        RenderPass::new("Denoising Depth"),
    ];
    passes.extend(lightgroups.iter().map(|name| RenderPass::new(format!("Combined_{name}"))));

    let compositor = plan_compositor(&RenderEngine::Cycles, &lightgroups, &passes)?;
    assert_eq!(compositor.denoise_nodes.len(), 5);
    assert!(compositor.warnings.is_empty());

    let denoised = compositor
        .slots
        .iter()
        .filter(|slot| matches!(slot.source, SlotSource::Denoised(_)))
        .count();
    assert_eq!(denoised, 5);
    assert_eq!(compositor.slots.last().map(|slot| slot.name.as_str()), Some("Image"));
    assert_eq!(CompositorPlan::SUMMARY, "Compositor setup complete");
    Ok(())
}

#[test]
fn test_compositor_requires_cycles() {
    let engine: RenderEngine = serde_json::from_str("\"BLENDER_WORKBENCH\"").unwrap();
    let err = plan_compositor(&engine, &[], &[]).unwrap_err();
    assert_eq!(
        err,
        LightgroupError::UnsupportedEngine {
            engine: "BLENDER_WORKBENCH".to_string()
        }
    );
    assert!(err.to_string().contains("requires the Cycles render engine"));
}
