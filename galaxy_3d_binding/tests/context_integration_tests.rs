//! Integration tests for pipeline states and the device context
//!
//! Records whole frames against the mock device and checks the commands it saw.
//! No GPU required.
//!
//! Run with: cargo test --test context_integration_tests


use galaxy_3d_binding::galaxy3d::binding::{
    BindShaderResourcesFlags, BindingModel, D3D11Model, PipelineResourceDesc, PipelineResourceSignature,
    PipelineResourceSignatureDesc, PipelineType, ResourceMapping, ShaderResourceType, ShaderStage, ShaderStages,
    StateTransitionMode, VariableType, VulkanModel,
};
use galaxy_3d_binding::galaxy3d::context::DeviceContext;
use galaxy_3d_binding::galaxy3d::device::{DrawAttribs, RenderDevice};
use galaxy_3d_binding::galaxy3d::log::LogSeverity;
use galaxy_3d_binding::galaxy3d::pipeline::{
    PipelineState, PipelineStateDesc, Shader, ShaderCache, ShaderDesc, ShaderResourceDesc,
};
use galaxy_3d_binding::galaxy3d::Config;
use serial_test::serial;
use std::sync::Arc;
use test_utils::{mock_devices, CapturingLogger};

fn shader(cache: &ShaderCache, name: &str, stage: ShaderStage, resources: Vec<ShaderResourceDesc>) -> Arc<Shader> {
    Shader::with_cache(
        ShaderDesc {
            name: name.to_string(),
            stage,
            bytecode: vec![0x0723_0203, 0x0001_0000, stage.index() as u32],
            resources,
        },
        cache,
    )
    .unwrap()
}

fn res(stages: ShaderStages, name: &str, resource_type: ShaderResourceType, var_type: VariableType) -> PipelineResourceDesc {
    PipelineResourceDesc::new(stages, name, resource_type, var_type)
}

/// Pipeline sampling one texture, with a signature named `signature_name`
///
/// `extra` adds a resource to the signature only, which makes signatures with
/// and without it incompatible.
fn textured_pipeline<B: BindingModel>(
    device: &Arc<dyn RenderDevice>,
    signature_name: &str,
    extra: Option<PipelineResourceDesc>,
) -> Arc<PipelineState<B>> {
    let cache = ShaderCache::new();
    let vs = shader(
        &cache,
        "MeshVS",
        ShaderStage::Vertex,
        vec![ShaderResourceDesc::new("g_Camera", ShaderResourceType::ConstantBuffer)],
    );
    let ps = shader(
        &cache,
        "MeshPS",
        ShaderStage::Pixel,
        vec![ShaderResourceDesc::new("g_Texture", ShaderResourceType::TextureSrv)],
    );

    let mut desc = PipelineResourceSignatureDesc::new(signature_name)
        .with_resource(res(ShaderStages::VERTEX, "g_Camera", ShaderResourceType::ConstantBuffer, VariableType::Static))
        .with_resource(res(ShaderStages::PIXEL, "g_Texture", ShaderResourceType::TextureSrv, VariableType::Mutable));
    if let Some(extra) = extra {
        desc = desc.with_resource(extra);
    }
    let signature = PipelineResourceSignature::<B>::new(device.clone(), desc).unwrap();

    PipelineState::new(
        device.clone(),
        PipelineStateDesc::new(signature_name, PipelineType::Graphics)
            .with_shader(vs)
            .with_shader(ps)
            .with_signature(signature),
    )
    .unwrap()
}

fn validating() -> Config {
    Config {
        enable_validation: true,
        ..Config::default()
    }
}

// ============================================================================
// COMMIT
// ============================================================================

#[test]
#[serial]
fn test_integration_incompatible_srb_is_not_committed() {
    let (mock, device) = mock_devices();
    let first = textured_pipeline::<VulkanModel>(&device, "P1", None);
    let second = textured_pipeline::<VulkanModel>(
        &device,
        "P2",
        Some(res(ShaderStages::PIXEL, "g_Detail", ShaderResourceType::TextureSrv, VariableType::Mutable)),
    );
    let srb = first.create_shader_resource_binding(false).unwrap();

    let mut context = DeviceContext::<VulkanModel>::new("Immediate", device, &validating()).unwrap();
    context.set_pipeline_state(&second);
    mock.clear_commands();

    let logger = CapturingLogger::install();
    assert!(!context.commit_shader_resources(&srb, StateTransitionMode::Transition));
    assert!(mock.commands().is_empty());
    assert!(logger.contains(LogSeverity::Error, "is not compatible with signature 'P2'"));
    assert!(!srb.static_resources_initialized());

    context.draw(&DrawAttribs::new(3));
    assert!(mock.commands().is_empty());
    assert_eq!(context.stats().skipped, 1);
}

#[test]
#[serial]
fn test_integration_full_frame_on_flat_model() {
    let (mock, device) = mock_devices();
    let pipeline = textured_pipeline::<D3D11Model>(&device, "Mesh", None);

    let mut statics = ResourceMapping::new();
    statics.set_resource("g_Camera", mock.uniform_buffer("Camera"));
    pipeline.bind_static_resources(ShaderStages::VERTEX, &statics, BindShaderResourcesFlags::UPDATE_STATIC);

    let srb = pipeline.create_shader_resource_binding(true).unwrap();
    let mut mapping = ResourceMapping::new();
    mapping.set_resource("g_Texture", mock.texture_srv("Bricks"));
    srb.bind_resources(ShaderStages::PIXEL, &mapping, BindShaderResourcesFlags::UPDATE_MUTABLE);

    let logger = CapturingLogger::install();
    let mut context = DeviceContext::<D3D11Model>::new("Immediate", device, &validating()).unwrap();
    context.begin().unwrap();
    context.set_pipeline_state(&pipeline);
    assert!(context.commit_shader_resources(&srb, StateTransitionMode::Transition));
    context.draw(&DrawAttribs::new(36));
    let fence = context.flush().unwrap();

    assert_eq!(logger.errors(), 0);
    assert_eq!(logger.warnings(), 0);
    assert_eq!(fence, 1);
    assert_eq!(
        mock.commands_with_prefix("bind_slots"),
        vec!["bind_slots:Vertex:CBV:0:1".to_string(), "bind_slots:Pixel:SRV:0:1".to_string()]
    );
    assert_eq!(mock.commands_with_prefix("transition").len(), 2);
    assert_eq!(mock.commands_with_prefix("draw"), vec!["draw:36".to_string()]);
    assert_eq!(mock.commands_with_prefix("submit"), vec!["submit:1".to_string()]);

    let stats = context.stats();
    assert_eq!(stats.draws, 1);
    assert_eq!(stats.commits, 1);
    assert_eq!(stats.barriers, 2);
}

#[test]
#[serial]
fn test_integration_frames_on_descriptor_set_model() {
    let (mock, device) = mock_devices();
    let pipeline = textured_pipeline::<VulkanModel>(&device, "Mesh", None);

    let mut statics = ResourceMapping::new();
    statics.set_resource("g_Camera", mock.uniform_buffer("Camera"));
    pipeline.bind_static_resources(ShaderStages::VERTEX, &statics, BindShaderResourcesFlags::UPDATE_STATIC);

    let srb = pipeline.create_shader_resource_binding(true).unwrap();
    let mut mapping = ResourceMapping::new();
    mapping.set_resource("g_Texture", mock.texture_srv("Bricks"));
    srb.bind_resources(ShaderStages::PIXEL, &mapping, BindShaderResourcesFlags::UPDATE_MUTABLE);

    let mut context = DeviceContext::<VulkanModel>::new("Immediate", device.clone(), &validating()).unwrap();
    for _frame in 0..3 {
        context.begin().unwrap();
        context.set_pipeline_state(&pipeline);
        assert!(context.commit_shader_resources(&srb, StateTransitionMode::Transition));
        context.draw(&DrawAttribs::new(3));
        context.flush().unwrap();
        context.finish_frame();
    }

    // The descriptor set is written once and reused by later frames
    let sets = mock.commands_with_prefix("bind_descriptor_set");
    assert_eq!(sets.len(), 3);
    assert!(sets[0].contains(":write:"));
    assert!(sets[1..].iter().all(|c| c.contains(":reuse:")));
    assert_eq!(mock.commands_with_prefix("submit").len(), 3);

    context.wait_for_idle().unwrap();
    assert!(device.release_queue().is_empty());
    assert_eq!(context.stats().draws, 3);
    assert_eq!(context.stats().skipped, 0);
}
