use super::*;
use crate::binding::attribs::BindPoints;
use crate::binding::binding_model::DescriptorKind;
use crate::binding::resource_desc::{PipelineResourceFlags, ShaderResourceType, ShaderStage, ShaderStages};
use crate::device::mock_device::MockDevice;
use crate::device::{BufferMode, LayoutBinding};
use crate::log::LogSeverity;
use crate::testing::CapturingLogger;
use serial_test::serial;

fn flat_layout() -> CacheLayout {
    let mut counts = [[0; MAX_BINDING_RANGES]; MAX_SHADER_STAGES];
    counts[ShaderStage::Vertex.index()][0] = 2;
    counts[ShaderStage::Pixel.index()][0] = 2;
    counts[ShaderStage::Pixel.index()][1] = 4;
    CacheLayout::Stages { counts }
}

fn vertex_pixel_location(range: u8, vs: u16, ps: u16) -> CacheLocation {
    let mut bind_points = BindPoints::default();
    bind_points.set(ShaderStage::Vertex, vs);
    bind_points.set(ShaderStage::Pixel, ps);
    CacheLocation::Stages { range, bind_points }
}

fn table_cache(sizes: Vec<u32>) -> ShaderResourceCache {
    let mut cache = ShaderResourceCache::new(CacheContentType::Srb);
    cache.initialize(&CacheLayout::Tables { sizes }).unwrap();
    cache
}

// ============================================================================
// INITIALIZE
// ============================================================================

#[test]
fn test_initialize_twice_fails() {
    let mut cache = ShaderResourceCache::new(CacheContentType::Signature);
    assert!(!cache.is_initialized());
    cache.initialize(&flat_layout()).unwrap();
    assert!(cache.is_initialized());
    assert!(cache.initialize(&flat_layout()).is_err());
}

#[test]
fn test_layout_total_slots() {
    assert_eq!(flat_layout().total_slots(), 8);
    assert_eq!(CacheLayout::Tables { sizes: vec![3, 0, 2] }.total_slots(), 5);
}

#[test]
fn test_table_sizes_follow_layout() {
    let cache = table_cache(vec![3, 1]);
    assert_eq!(cache.table_count(), 2);
    assert_eq!(cache.table(0).unwrap().len(), 3);
    assert_eq!(cache.table(1).unwrap().len(), 1);
    assert!(cache.table(2).is_none());
    assert!(cache.stage_table(0, 0).is_none());
}

// ============================================================================
// SET / RESET
// ============================================================================

#[test]
fn test_flat_set_writes_every_stage() {
    let device = MockDevice::new();
    let buffer = device.uniform_buffer("cb");
    let mut cache = ShaderResourceCache::new(CacheContentType::Srb);
    cache.initialize(&flat_layout()).unwrap();

    let location = vertex_pixel_location(0, 1, 0);
    cache.set_resource(&location, 0, Some(DeviceObject::Buffer(buffer.clone())));

    let vs = cache.stage_table(ShaderStage::Vertex.index(), 0).unwrap();
    let ps = cache.stage_table(ShaderStage::Pixel.index(), 0).unwrap();
    assert!(vs.resources()[1].is_bound());
    assert!(!vs.resources()[0].is_bound());
    assert!(ps.resources()[0].is_bound());
    assert_eq!(ps.resources()[0].handle(), buffer.native_handle());
    assert!(cache.is_resource_bound(&location, 0));
    assert_eq!(cache.bound_object_count(), 2);
}

#[test]
fn test_owner_and_handle_change_together() {
    let device = MockDevice::new();
    let mut cache = table_cache(vec![2]);
    let location = CacheLocation::Table { table: 0, offset: 0 };

    cache.set_resource(&location, 1, Some(DeviceObject::Sampler(device.sampler())));
    let entry = cache.get_resource(&location, 1).unwrap();
    assert!(entry.object().is_some());
    assert!(!entry.handle().is_null());

    cache.reset_resource(&location, 1);
    let entry = cache.get_resource(&location, 1).unwrap();
    assert!(entry.object().is_none());
    assert!(entry.handle().is_null());

    let entry = cache.get_resource(&location, 0).unwrap();
    assert_eq!(entry.object().is_some(), !entry.handle().is_null());
}

#[test]
fn test_buffer_range_and_dynamic_offset() {
    let device = MockDevice::new();
    let mut cache = table_cache(vec![1]);
    let location = CacheLocation::Table { table: 0, offset: 0 };

    cache.set_buffer_range(&location, 0, Some(DeviceObject::Buffer(device.uniform_buffer("cb"))), 64, 128);
    cache.clear_dirty(0);
    cache.set_dynamic_offset(&location, 0, 32);

    let entry = cache.get_resource(&location, 0).unwrap();
    assert_eq!(entry.buffer_offset(), 64);
    assert_eq!(entry.buffer_size(), 128);
    assert_eq!(entry.dynamic_offset(), 32);
    // dynamic offsets do not invalidate the descriptor set
    assert!(!cache.is_table_dirty(0));

    // rebinding resets the range
    cache.set_resource(&location, 0, Some(DeviceObject::Buffer(device.uniform_buffer("cb2"))));
    let entry = cache.get_resource(&location, 0).unwrap();
    assert_eq!(entry.buffer_offset(), 0);
    assert_eq!(entry.dynamic_offset(), 0);
    assert!(cache.is_table_dirty(0));
}

#[test]
fn test_copy_resource_reports_bound_state() {
    let device = MockDevice::new();
    let mut src = table_cache(vec![2]);
    let mut dst = table_cache(vec![4]);
    let src_loc = CacheLocation::Table { table: 0, offset: 0 };
    let dst_loc = CacheLocation::Table { table: 0, offset: 2 };

    src.set_resource(&src_loc, 0, Some(DeviceObject::Buffer(device.uniform_buffer("cb"))));
    assert!(dst.copy_resource(&src, &src_loc, &dst_loc, 0));
    assert!(!dst.copy_resource(&src, &src_loc, &dst_loc, 1));
    assert!(dst.is_resource_bound(&dst_loc, 0));
    assert!(!dst.is_resource_bound(&dst_loc, 1));
}

#[test]
fn test_descriptor_set_assignment_and_reset() {
    let device = MockDevice::new();
    let mut cache = table_cache(vec![1, 1]);
    assert!(cache.descriptor_set(1).is_null());
    cache.assign_descriptor_set(1, NativeHandle(42));
    cache.clear_dirty(1);
    assert_eq!(cache.descriptor_set(1), NativeHandle(42));
    assert!(!cache.is_table_dirty(1));

    cache.set_resource(&CacheLocation::Table { table: 0, offset: 0 }, 0, Some(DeviceObject::Sampler(device.sampler())));
    cache.reset();
    assert_eq!(cache.bound_object_count(), 0);
    assert!(cache.descriptor_set(1).is_null());
    assert!(cache.is_table_dirty(1));
}

#[test]
fn test_dynamic_offsets_in_binding_order() {
    let device = MockDevice::new();
    let mut cache = table_cache(vec![3]);
    cache.set_dynamic_buffer_count(2);
    let location = CacheLocation::Table { table: 0, offset: 0 };
    cache.set_buffer_range(&location, 0, Some(DeviceObject::Buffer(device.uniform_buffer("a"))), 256, 0);
    cache.set_dynamic_offset(&location, 0, 16);
    cache.set_resource(&location, 1, Some(DeviceObject::Buffer(device.uniform_buffer("b"))));

    let binding = |binding: u32, cache_offset: u32, array_size: u32, kind: DescriptorKind| LayoutBinding {
        binding,
        cache_offset,
        array_size,
        resource_type: ShaderResourceType::ConstantBuffer,
        flags: PipelineResourceFlags::empty(),
        stages: ShaderStages::VERTEX,
        descriptor_kind: kind,
        immutable_samplers: Vec::new(),
    };
    let layout = DescriptorSetLayoutInfo {
        bindings: vec![
            binding(0, 0, 2, DescriptorKind::UniformBufferDynamic),
            binding(1, 2, 1, DescriptorKind::UniformBuffer),
        ],
        dynamic_buffer_count: 2,
    };
    assert_eq!(cache.dynamic_offsets(0, &layout).unwrap(), vec![272, 0]);
    assert_eq!(cache.dynamic_buffer_count(), 2);
}

#[test]
#[serial]
fn test_dynamic_offset_beyond_32_bits_is_refused() {
    let device = MockDevice::new();
    let mut cache = table_cache(vec![1]);
    let location = CacheLocation::Table { table: 0, offset: 0 };
    cache.set_buffer_range(&location, 0, Some(DeviceObject::Buffer(device.uniform_buffer("huge"))), 1 << 32, 256);
    cache.set_dynamic_offset(&location, 0, 64);

    let layout = DescriptorSetLayoutInfo {
        bindings: vec![LayoutBinding {
            binding: 3,
            cache_offset: 0,
            array_size: 1,
            resource_type: ShaderResourceType::ConstantBuffer,
            flags: PipelineResourceFlags::empty(),
            stages: ShaderStages::VERTEX,
            descriptor_kind: DescriptorKind::UniformBufferDynamic,
            immutable_samplers: Vec::new(),
        }],
        dynamic_buffer_count: 1,
    };
    let logger = CapturingLogger::install();
    assert!(cache.dynamic_offsets(0, &layout).is_err());
    assert!(logger.contains(LogSeverity::Error, "exceeds 32 bits"));

    // Just below the limit still fits
    cache.set_buffer_range(&location, 0, Some(DeviceObject::Buffer(device.uniform_buffer("large"))), u32::MAX as u64 - 64, 256);
    cache.set_dynamic_offset(&location, 0, 64);
    assert_eq!(cache.dynamic_offsets(0, &layout).unwrap(), vec![u32::MAX]);
}

#[test]
fn test_effective_offset_adds_dynamic_offset() {
    let device = MockDevice::new();
    let mut cache = table_cache(vec![1]);
    let location = CacheLocation::Table { table: 0, offset: 0 };
    cache.set_buffer_range(&location, 0, Some(DeviceObject::Buffer(device.uniform_buffer("cb"))), 256, 128);
    cache.set_dynamic_offset(&location, 0, 32);
    let entry = cache.get_resource(&location, 0).unwrap();
    assert_eq!(entry.effective_offset(), Some(288));
}

// ============================================================================
// TRANSITIONS
// ============================================================================

#[test]
fn test_transition_emits_barriers_once() {
    let device = MockDevice::new();
    let buffer = device.uniform_buffer("cb_transition");
    let mut cache = ShaderResourceCache::new(CacheContentType::Srb);
    cache.initialize(&flat_layout()).unwrap();
    // Bound in two stages, transitioned once
    cache.set_resource(&vertex_pixel_location(0, 0, 0), 0, Some(DeviceObject::Buffer(buffer.clone())));

    let barriers = cache.transition_resources(StateTransitionMode::Transition);
    assert_eq!(barriers.len(), 1);
    assert_eq!(barriers[0].old_state, ResourceState::UNDEFINED);
    assert_eq!(barriers[0].new_state, ResourceState::CONSTANT_BUFFER);
    assert_eq!(buffer.state(), ResourceState::CONSTANT_BUFFER);

    assert!(cache.transition_resources(StateTransitionMode::Transition).is_empty());
}

#[test]
fn test_transition_required_states() {
    let device = MockDevice::new();
    let mut cache = table_cache(vec![4]);
    let location = CacheLocation::Table { table: 0, offset: 0 };
    let srv = device.texture_srv("tex_srv_state");
    let uav = device.buffer_view("buf_uav_state", BufferMode::Structured, BufferViewType::UnorderedAccess);
    let tlas = device.tlas("tlas_state");
    cache.set_resource(&location, 0, Some(DeviceObject::TextureView(srv.clone())));
    cache.set_resource(&location, 1, Some(DeviceObject::BufferView(uav.clone())));
    cache.set_resource(&location, 2, Some(DeviceObject::Tlas(tlas.clone())));
    cache.set_resource(&location, 3, Some(DeviceObject::Sampler(device.sampler())));

    let barriers = cache.transition_resources(StateTransitionMode::Transition);
    assert_eq!(barriers.len(), 3);
    assert_eq!(srv.texture().state(), ResourceState::SHADER_RESOURCE);
    assert_eq!(uav.buffer().state(), ResourceState::UNORDERED_ACCESS);
    assert_eq!(tlas.state(), ResourceState::RAY_TRACING);
}

#[test]
fn test_unknown_state_is_not_transitioned() {
    let device = MockDevice::new();
    let buffer = device.uniform_buffer("cb_unknown");
    buffer.set_state(ResourceState::UNKNOWN);
    let mut cache = table_cache(vec![1]);
    cache.set_resource(&CacheLocation::Table { table: 0, offset: 0 }, 0, Some(DeviceObject::Buffer(buffer.clone())));
    assert!(cache.transition_resources(StateTransitionMode::Transition).is_empty());
    assert_eq!(buffer.state(), ResourceState::UNKNOWN);
}

#[test]
fn test_none_mode_does_nothing() {
    let device = MockDevice::new();
    let buffer = device.uniform_buffer("cb_none");
    let mut cache = table_cache(vec![1]);
    cache.set_resource(&CacheLocation::Table { table: 0, offset: 0 }, 0, Some(DeviceObject::Buffer(buffer.clone())));
    assert!(cache.transition_resources(StateTransitionMode::None).is_empty());
    assert_eq!(buffer.state(), ResourceState::UNDEFINED);
}

#[test]
#[serial]
fn test_verify_reports_mismatch_and_leaves_state() {
    let logger = CapturingLogger::install();
    let device = MockDevice::new();
    let buffer = device.uniform_buffer("cb_verify_mismatch");
    let mut cache = table_cache(vec![1]);
    cache.set_resource(&CacheLocation::Table { table: 0, offset: 0 }, 0, Some(DeviceObject::Buffer(buffer.clone())));

    let barriers = cache.transition_resources(StateTransitionMode::Verify);
    assert!(barriers.is_empty());
    assert_eq!(buffer.state(), ResourceState::UNDEFINED);
    assert_eq!(logger.count_containing(LogSeverity::Error, "cb_verify_mismatch"), 1);

    buffer.set_state(ResourceState::CONSTANT_BUFFER);
    logger.clear();
    cache.transition_resources(StateTransitionMode::Verify);
    assert_eq!(logger.count_containing(LogSeverity::Error, "cb_verify_mismatch"), 0);
}
