use super::*;
use crate::binding::attribs::CacheLocation;
use crate::binding::models::{D3D11Model, VulkanModel};
use crate::binding::resource_cache::CacheLayout;
use crate::binding::resource_desc::{
    ImmutableSamplerDesc, PipelineResourceDesc, PipelineResourceSignatureDesc, SamplerDesc, ShaderResourceType,
};
use crate::device::mock_device::MockDevice;
use crate::device::{DeviceObject, RenderDevice};
use crate::error::Error;
use crate::log::LogSeverity;
use crate::testing::CapturingLogger;
use serial_test::serial;

fn devices() -> (Arc<MockDevice>, Arc<dyn RenderDevice>) {
    let mock = Arc::new(MockDevice::new());
    let device: Arc<dyn RenderDevice> = mock.clone();
    (mock, device)
}

fn res(stages: ShaderStages, name: &str, resource_type: ShaderResourceType, var_type: VariableType) -> PipelineResourceDesc {
    PipelineResourceDesc::new(stages, name, resource_type, var_type)
}

fn material_desc(name: &str) -> PipelineResourceSignatureDesc {
    PipelineResourceSignatureDesc::new(name)
        .with_resource(res(ShaderStages::VERTEX | ShaderStages::PIXEL, "g_Constants", ShaderResourceType::ConstantBuffer, VariableType::Static))
        .with_resource(res(ShaderStages::PIXEL, "g_Texture", ShaderResourceType::TextureSrv, VariableType::Mutable))
        .with_resource(res(ShaderStages::VERTEX, "g_Instances", ShaderResourceType::BufferSrv, VariableType::Dynamic))
}

fn table_layout() -> CacheLayout {
    CacheLayout::Tables { sizes: vec![2] }
}

// ============================================================================
// CACHE POOL
// ============================================================================

#[test]
fn test_pool_grows_by_granularity() {
    let mut pool = ResourceCachePool::new(3);
    let mut inits = 0;
    let (slot, cache) = pool
        .acquire(|cache| {
            inits += 1;
            cache.initialize(&table_layout())
        })
        .unwrap();
    assert_eq!(slot, 0);
    assert!(cache.is_initialized());
    assert_eq!(inits, 3);
    assert_eq!(pool.capacity(), 3);
    assert_eq!(pool.in_use(), 1);

    // The next two come from the existing block
    let _b = pool.acquire(|cache| cache.initialize(&table_layout())).unwrap();
    let _c = pool.acquire(|cache| cache.initialize(&table_layout())).unwrap();
    assert_eq!(pool.capacity(), 3);
    let _d = pool.acquire(|cache| cache.initialize(&table_layout())).unwrap();
    assert_eq!(pool.capacity(), 6);
    assert_eq!(pool.in_use(), 4);
}

#[test]
fn test_pool_release_resets_cache() {
    let device = MockDevice::new();
    let mut pool = ResourceCachePool::new(2);
    let (slot, mut cache) = pool.acquire(|cache| cache.initialize(&table_layout())).unwrap();
    let location = CacheLocation::Table { table: 0, offset: 1 };
    cache.set_resource(&location, 0, Some(DeviceObject::from(device.sampler())));
    assert_eq!(cache.bound_object_count(), 1);

    pool.release(slot, cache);
    assert_eq!(pool.in_use(), 0);

    let (again, cache) = pool.acquire(|cache| cache.initialize(&table_layout())).unwrap();
    assert_eq!(again, slot);
    assert_eq!(cache.bound_object_count(), 0);
    assert!(cache.is_initialized());
}

#[test]
fn test_pool_init_failure_releases_slot() {
    let mut pool = ResourceCachePool::new(2);
    let result = pool.acquire(|_| Err(Error::OutOfMemory));
    assert!(matches!(result, Err(Error::OutOfMemory)));
    assert_eq!(pool.in_use(), 0);
    assert_eq!(pool.capacity(), 0);
}

// ============================================================================
// VARIABLES
// ============================================================================

#[test]
fn test_srb_exposes_mutable_and_dynamic_variables() {
    let (_, device) = devices();
    let sig = PipelineResourceSignature::<D3D11Model>::new(device, material_desc("material")).unwrap();
    let srb = sig.create_shader_resource_binding(false).unwrap();

    assert_eq!(srb.pipeline_type(), Some(PipelineType::Graphics));
    assert_eq!(srb.binding_index(), 0);
    assert_eq!(srb.variable_count(ShaderStage::Pixel), 1);
    assert_eq!(srb.variable_count(ShaderStage::Vertex), 1);
    assert_eq!(srb.variable_count(ShaderStage::Compute), 0);

    assert!(srb.get_variable_by_name(ShaderStage::Pixel, "g_Constants").is_none());
    assert!(srb.get_variable_by_name(ShaderStage::Vertex, "g_Texture").is_none());
    let instances = srb.get_variable_by_index(ShaderStage::Vertex, 0).unwrap();
    assert_eq!(instances.name(), "g_Instances");
    assert_eq!(instances.get_type(), VariableType::Dynamic);
    assert!(srb.get_variable_by_index(ShaderStage::Vertex, 1).is_none());
}

#[test]
fn test_immutable_sampler_variable_is_hidden() {
    let (_, device) = devices();
    let desc = PipelineResourceSignatureDesc::new("vk")
        .with_resource(res(ShaderStages::PIXEL, "g_Texture", ShaderResourceType::TextureSrv, VariableType::Mutable))
        .with_resource(res(ShaderStages::PIXEL, "g_Sampler", ShaderResourceType::Sampler, VariableType::Mutable))
        .with_resource(res(ShaderStages::PIXEL, "g_Shadow", ShaderResourceType::Sampler, VariableType::Mutable))
        .with_immutable_sampler(ImmutableSamplerDesc::new(ShaderStages::PIXEL, "g_Sampler", SamplerDesc::linear_clamp()));
    let sig = PipelineResourceSignature::<VulkanModel>::new(device, desc).unwrap();
    let srb = sig.create_shader_resource_binding(false).unwrap();

    assert!(srb.get_variable_by_name(ShaderStage::Pixel, "g_Sampler").is_none());
    assert!(srb.get_variable_by_name(ShaderStage::Pixel, "g_Shadow").is_some());
    assert_eq!(srb.variable_count(ShaderStage::Pixel), 2);
}

#[test]
fn test_flat_assigned_sampler_is_set_through_texture() {
    let (mock, device) = devices();
    let desc = PipelineResourceSignatureDesc::new("combined")
        .with_combined_samplers("_sampler")
        .with_resource(res(ShaderStages::PIXEL, "g_Texture", ShaderResourceType::TextureSrv, VariableType::Mutable))
        .with_resource(res(ShaderStages::PIXEL, "g_Texture_sampler", ShaderResourceType::Sampler, VariableType::Mutable));
    let sig = PipelineResourceSignature::<D3D11Model>::new(device, desc).unwrap();
    let srb = sig.create_shader_resource_binding(false).unwrap();

    assert_eq!(srb.variable_count(ShaderStage::Pixel), 1);
    assert!(srb.get_variable_by_name(ShaderStage::Pixel, "g_Texture_sampler").is_none());

    let sampler = mock.sampler();
    let view = mock.texture_view("albedo", crate::device::TextureViewType::ShaderResource, Some(sampler.clone()));
    let texture = srb.get_variable_by_name(ShaderStage::Pixel, "g_Texture").unwrap();
    assert!(texture.set(Some(view.into())));

    let sampler_location = sig.attribs(1).srb_location;
    let bound = srb.with_cache(|cache| cache.get_object(&sampler_location, 0));
    assert!(bound.is_some_and(|obj| obj.ptr_eq(&DeviceObject::from(sampler))));
}

#[test]
fn test_bind_resources_filters_stages() {
    let (mock, device) = devices();
    let sig = PipelineResourceSignature::<D3D11Model>::new(device, material_desc("material")).unwrap();
    let srb = sig.create_shader_resource_binding(false).unwrap();

    let mut mapping = ResourceMapping::new();
    mapping.set_resource("g_Texture", mock.texture_srv("albedo"));
    mapping.set_resource(
        "g_Instances",
        mock.buffer_view("instances", crate::device::BufferMode::Structured, crate::device::BufferViewType::ShaderResource),
    );

    assert!(srb.check_resources(ShaderStages::PIXEL, &mapping, BindShaderResourcesFlags::UPDATE_ALL));
    srb.bind_resources(ShaderStages::PIXEL, &mapping, BindShaderResourcesFlags::UPDATE_ALL);
    assert!(!srb.check_resources(ShaderStages::PIXEL, &mapping, BindShaderResourcesFlags::UPDATE_ALL));

    let texture = srb.get_variable_by_name(ShaderStage::Pixel, "g_Texture").unwrap();
    let instances = srb.get_variable_by_name(ShaderStage::Vertex, "g_Instances").unwrap();
    assert!(texture.is_bound(0));
    assert!(!instances.is_bound(0));
    assert!(srb.check_resources(ShaderStages::VERTEX, &mapping, BindShaderResourcesFlags::UPDATE_DYNAMIC));
    assert!(!srb.check_resources(ShaderStages::VERTEX, &mapping, BindShaderResourcesFlags::UPDATE_MUTABLE));
}

// ============================================================================
// STATIC RESOURCES
// ============================================================================

#[test]
#[serial]
fn test_initialize_static_resources_only_once() {
    let logger = CapturingLogger::install();
    let (mock, device) = devices();
    let sig = PipelineResourceSignature::<D3D11Model>::new(device, material_desc("material")).unwrap();
    let constants = sig.get_static_variable_by_name(ShaderStage::Vertex, "g_Constants").unwrap();
    assert!(constants.set(Some(mock.uniform_buffer("frame").into())));

    let srb = sig.create_shader_resource_binding(false).unwrap();
    assert!(!srb.static_resources_initialized());
    sig.initialize_static_srb_resources(&srb);
    assert!(srb.static_resources_initialized());
    assert_eq!(logger.warnings(), 0);

    // Rebinding the static variable does not reach the already initialized SRB
    assert!(constants.set_with_flags(Some(mock.uniform_buffer("other").into()), crate::binding::SetShaderResourceFlags::ALLOW_OVERWRITE));
    srb.initialize_static_resources(None);
    assert_eq!(logger.count_containing(LogSeverity::Warn, "already initialized"), 1);

    let location = sig.attribs(0).srb_location;
    let bound = srb.with_cache(|cache| cache.get_object(&location, 0));
    assert_eq!(bound.map(|obj| obj.name()), Some("frame".to_string()));
}

#[test]
#[serial]
fn test_commit_path_copy_does_not_warn() {
    let logger = CapturingLogger::install();
    let (mock, device) = devices();
    let sig = PipelineResourceSignature::<D3D11Model>::new(device, material_desc("material")).unwrap();
    let constants = sig.get_static_variable_by_name(ShaderStage::Pixel, "g_Constants").unwrap();
    assert!(constants.set(Some(mock.uniform_buffer("frame").into())));

    let srb = sig.create_shader_resource_binding(true).unwrap();
    srb.copy_static_resources_once(None);
    srb.copy_static_resources_once(None);
    assert_eq!(logger.warnings(), 0);
    assert_eq!(logger.errors(), 0);
}

#[test]
#[serial]
fn test_incompatible_signature_is_refused() {
    let logger = CapturingLogger::install();
    let (_, device) = devices();
    let sig = PipelineResourceSignature::<D3D11Model>::new(device.clone(), material_desc("material")).unwrap();
    let mut other_desc = material_desc("other");
    other_desc.resources[1].array_size = 3;
    let other = PipelineResourceSignature::<D3D11Model>::new(device, other_desc).unwrap();

    let srb = sig.create_shader_resource_binding(false).unwrap();
    srb.initialize_static_resources(Some(&*other));
    assert!(!srb.static_resources_initialized());
    assert!(logger.contains(LogSeverity::Error, "incompatible signature 'other'"));
}

#[test]
fn test_compatible_signature_provides_static_resources() {
    let (mock, device) = devices();
    let sig = PipelineResourceSignature::<D3D11Model>::new(device.clone(), material_desc("material")).unwrap();
    let twin = PipelineResourceSignature::<D3D11Model>::new(device, material_desc("twin")).unwrap();
    let constants = twin.get_static_variable_by_name(ShaderStage::Pixel, "g_Constants").unwrap();
    assert!(constants.set(Some(mock.uniform_buffer("twin_frame").into())));

    let srb = sig.create_shader_resource_binding(false).unwrap();
    twin.initialize_static_srb_resources(&srb);
    assert!(srb.static_resources_initialized());
    let location = sig.attribs(0).srb_location;
    assert!(srb.with_cache(|cache| cache.is_resource_bound(&location, 0)));
}
