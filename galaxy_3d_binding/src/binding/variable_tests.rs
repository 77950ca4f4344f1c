use super::*;
use std::sync::Arc;

use crate::binding::models::{D3D11Model, VulkanModel};
use crate::binding::resource_desc::{PipelineResourceSignatureDesc, ShaderStage, ShaderStages};
use crate::device::mock_device::MockDevice;
use crate::device::{BindFlags, RenderDevice, Usage};
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

fn variables_desc() -> PipelineResourceSignatureDesc {
    PipelineResourceSignatureDesc::new("Variables")
        .with_resource(res(ShaderStages::PIXEL, "g_Static", ShaderResourceType::ConstantBuffer, VariableType::Static))
        .with_resource(res(ShaderStages::PIXEL, "g_Mutable", ShaderResourceType::TextureSrv, VariableType::Mutable))
        .with_resource(res(ShaderStages::PIXEL, "g_Dynamic", ShaderResourceType::ConstantBuffer, VariableType::Dynamic))
        .with_resource(
            res(ShaderStages::PIXEL, "g_Array", ShaderResourceType::TextureSrv, VariableType::Mutable).with_array_size(4),
        )
        .with_resource(
            res(ShaderStages::PIXEL, "g_Fixed", ShaderResourceType::ConstantBuffer, VariableType::Dynamic)
                .with_flags(PipelineResourceFlags::NO_DYNAMIC_BUFFERS),
        )
}

// ============================================================================
// SET / GET
// ============================================================================

#[test]
fn test_set_and_get() {
    let (mock, device) = devices();
    let signature = PipelineResourceSignature::<D3D11Model>::new(device, variables_desc()).unwrap();
    let srb = signature.create_shader_resource_binding(false).unwrap();
    let variable = srb.get_variable_by_name(ShaderStage::Pixel, "g_Mutable").unwrap();

    assert_eq!(variable.name(), "g_Mutable");
    assert_eq!(variable.get_type(), VariableType::Mutable);
    assert!(!variable.is_bound(0));

    let view = DeviceObject::from(mock.texture_srv("Albedo"));
    assert!(variable.set(Some(view.clone())));
    assert!(variable.is_bound(0));
    assert!(variable.get(0).unwrap().ptr_eq(&view));
}

#[test]
fn test_out_of_range_element_is_not_bound() {
    let (_mock, device) = devices();
    let signature = PipelineResourceSignature::<D3D11Model>::new(device, variables_desc()).unwrap();
    let srb = signature.create_shader_resource_binding(false).unwrap();
    let variable = srb.get_variable_by_name(ShaderStage::Pixel, "g_Mutable").unwrap();

    assert!(!variable.is_bound(7));
    assert!(variable.get(7).is_none());
}

#[test]
#[serial]
fn test_mutable_rebind_is_refused() {
    let (mock, device) = devices();
    let signature = PipelineResourceSignature::<D3D11Model>::new(device, variables_desc()).unwrap();
    let srb = signature.create_shader_resource_binding(false).unwrap();
    let variable = srb.get_variable_by_name(ShaderStage::Pixel, "g_Mutable").unwrap();

    let first = DeviceObject::from(mock.texture_srv("First"));
    let second = DeviceObject::from(mock.texture_srv("Second"));
    assert!(variable.set(Some(first.clone())));

    let logger = CapturingLogger::install();
    assert!(!variable.set(Some(second.clone())));
    assert!(logger.contains(LogSeverity::Error, "already bound to 'First'"));
    assert!(variable.get(0).unwrap().ptr_eq(&first));

    // Unbinding is a change too
    assert!(!variable.set(None));
    assert!(variable.is_bound(0));

    // Rebinding the same object is not
    assert!(variable.set(Some(first.clone())));

    assert!(variable.set_with_flags(Some(second.clone()), SetShaderResourceFlags::ALLOW_OVERWRITE));
    assert!(variable.get(0).unwrap().ptr_eq(&second));
}

#[test]
fn test_dynamic_rebind_is_allowed() {
    let (mock, device) = devices();
    let signature = PipelineResourceSignature::<D3D11Model>::new(device, variables_desc()).unwrap();
    let srb = signature.create_shader_resource_binding(false).unwrap();
    let variable = srb.get_variable_by_name(ShaderStage::Pixel, "g_Dynamic").unwrap();

    assert!(variable.set(Some(DeviceObject::from(mock.uniform_buffer("A")))));
    let b = DeviceObject::from(mock.uniform_buffer("B"));
    assert!(variable.set(Some(b.clone())));
    assert!(variable.get(0).unwrap().ptr_eq(&b));
    assert!(variable.set(None));
    assert!(!variable.is_bound(0));
}

#[test]
#[serial]
fn test_wrong_object_kind_is_refused() {
    let (mock, device) = devices();
    let signature = PipelineResourceSignature::<D3D11Model>::new(device, variables_desc()).unwrap();
    let srb = signature.create_shader_resource_binding(false).unwrap();
    let variable = srb.get_variable_by_name(ShaderStage::Pixel, "g_Mutable").unwrap();

    let logger = CapturingLogger::install();
    assert!(!variable.set(Some(DeviceObject::from(mock.uniform_buffer("NotAView")))));
    assert_eq!(logger.errors(), 1);
    assert!(logger.contains(LogSeverity::Error, "g_Mutable"));
    assert!(!variable.is_bound(0));
}

// ============================================================================
// ARRAYS
// ============================================================================

#[test]
fn test_set_array() {
    let (mock, device) = devices();
    let signature = PipelineResourceSignature::<D3D11Model>::new(device, variables_desc()).unwrap();
    let srb = signature.create_shader_resource_binding(false).unwrap();
    let variable = srb.get_variable_by_name(ShaderStage::Pixel, "g_Array").unwrap();
    assert_eq!(variable.array_size(), 4);

    let views: Vec<Option<DeviceObject>> = (0..2)
        .map(|i| Some(DeviceObject::from(mock.texture_srv(&format!("Layer{i}")))))
        .collect();
    assert!(variable.set_array(&views, 1, SetShaderResourceFlags::empty()));
    assert!(!variable.is_bound(0));
    assert!(variable.is_bound(1));
    assert!(variable.is_bound(2));
    assert!(!variable.is_bound(3));
}

#[test]
#[serial]
fn test_array_range_overflow_is_refused_as_a_whole() {
    let (mock, device) = devices();
    let signature = PipelineResourceSignature::<D3D11Model>::new(device, variables_desc()).unwrap();
    let srb = signature.create_shader_resource_binding(false).unwrap();
    let variable = srb.get_variable_by_name(ShaderStage::Pixel, "g_Array").unwrap();

    let views: Vec<Option<DeviceObject>> = (0..3)
        .map(|i| Some(DeviceObject::from(mock.texture_srv(&format!("Layer{i}")))))
        .collect();
    let logger = CapturingLogger::install();
    assert!(!variable.set_array(&views, 2, SetShaderResourceFlags::empty()));
    assert!(logger.contains(LogSeverity::Error, "out of range"));
    assert!((0..4).all(|elem| !variable.is_bound(elem)));

    assert!(!variable.bind(views[0].clone(), 4, SetShaderResourceFlags::empty()));
}

#[test]
#[serial]
fn test_set_array_reports_partial_failure() {
    let (mock, device) = devices();
    let signature = PipelineResourceSignature::<D3D11Model>::new(device, variables_desc()).unwrap();
    let srb = signature.create_shader_resource_binding(false).unwrap();
    let variable = srb.get_variable_by_name(ShaderStage::Pixel, "g_Array").unwrap();

    let objects = vec![
        Some(DeviceObject::from(mock.texture_srv("Good"))),
        Some(DeviceObject::from(mock.uniform_buffer("Bad"))),
    ];
    let _logger = CapturingLogger::install();
    assert!(!variable.set_array(&objects, 0, SetShaderResourceFlags::empty()));
    assert!(variable.is_bound(0));
    assert!(!variable.is_bound(1));
}

// ============================================================================
// BUFFER RANGES AND OFFSETS
// ============================================================================

#[test]
fn test_set_buffer_range() {
    let (mock, device) = devices();
    let signature = PipelineResourceSignature::<D3D11Model>::new(device, variables_desc()).unwrap();
    let srb = signature.create_shader_resource_binding(false).unwrap();
    let variable = srb.get_variable_by_name(ShaderStage::Pixel, "g_Dynamic").unwrap();

    assert!(variable.set_buffer_range(Some(DeviceObject::from(mock.uniform_buffer("Ranged"))), 64, 128, 0));
    let location = signature.attribs(variable.resource_index()).srb_location;
    srb.with_cache(|cache| {
        let cached = cache.get_resource(&location, 0).unwrap();
        assert_eq!(cached.buffer_offset(), 64);
        assert_eq!(cached.buffer_size(), 128);
    });
}

#[test]
#[serial]
fn test_set_buffer_range_checks_bounds_and_type() {
    let (mock, device) = devices();
    let signature = PipelineResourceSignature::<D3D11Model>::new(device, variables_desc()).unwrap();
    let srb = signature.create_shader_resource_binding(false).unwrap();
    let buffer = DeviceObject::from(mock.uniform_buffer("Small"));

    let logger = CapturingLogger::install();
    let constants = srb.get_variable_by_name(ShaderStage::Pixel, "g_Dynamic").unwrap();
    assert!(!constants.set_buffer_range(Some(buffer.clone()), 200, 100, 0));
    assert!(logger.contains(LogSeverity::Error, "outside of buffer 'Small'"));
    assert!(!constants.set_buffer_range(Some(buffer.clone()), 256, 0, 0));
    assert!(!constants.is_bound(0));

    // Size 0 reaches the end of the buffer
    assert!(constants.set_buffer_range(Some(buffer.clone()), 128, 0, 0));

    logger.clear();
    let texture = srb.get_variable_by_name(ShaderStage::Pixel, "g_Mutable").unwrap();
    assert!(!texture.set_buffer_range(Some(buffer), 0, 16, 0));
    assert!(logger.contains(LogSeverity::Error, "only allowed for constant buffers"));
}

#[test]
fn test_set_buffer_offset() {
    let (mock, device) = devices();
    let signature = PipelineResourceSignature::<VulkanModel>::new(device, variables_desc()).unwrap();
    let srb = signature.create_shader_resource_binding(false).unwrap();
    let variable = srb.get_variable_by_name(ShaderStage::Pixel, "g_Dynamic").unwrap();
    let buffer = DeviceObject::from(mock.buffer("PerDraw", Usage::Dynamic, BindFlags::UNIFORM_BUFFER));

    assert!(variable.set(Some(buffer.clone())));
    assert!(variable.set_buffer_offset(256, 0));
    let location = signature.attribs(variable.resource_index()).srb_location;
    srb.with_cache(|cache| {
        let cached = cache.get_resource(&location, 0).unwrap();
        assert_eq!(cached.dynamic_offset(), 256);
        assert!(cached.object().unwrap().ptr_eq(&buffer));
    });
}

#[test]
#[serial]
fn test_set_buffer_offset_refusals() {
    let (_mock, device) = devices();
    let signature = PipelineResourceSignature::<VulkanModel>::new(device, variables_desc()).unwrap();
    let srb = signature.create_shader_resource_binding(false).unwrap();

    let logger = CapturingLogger::install();
    let fixed = srb.get_variable_by_name(ShaderStage::Pixel, "g_Fixed").unwrap();
    assert!(!fixed.set_buffer_offset(16, 0));
    let texture = srb.get_variable_by_name(ShaderStage::Pixel, "g_Mutable").unwrap();
    assert!(!texture.set_buffer_offset(16, 0));
    let static_var = signature.get_static_variable_by_name(ShaderStage::Pixel, "g_Static").unwrap();
    assert!(!static_var.set_buffer_offset(16, 0));
    assert_eq!(logger.count_containing(LogSeverity::Error, "SetBufferOffset is not allowed"), 3);
}

// ============================================================================
// ASSIGNED SAMPLERS
// ============================================================================

#[test]
#[serial]
fn test_view_without_sampler_leaves_assigned_sampler_unbound() {
    let (mock, device) = devices();
    let desc = PipelineResourceSignatureDesc::new("Assigned")
        .with_resource(res(ShaderStages::PIXEL, "g_Tex", ShaderResourceType::TextureSrv, VariableType::Mutable))
        .with_resource(res(ShaderStages::PIXEL, "g_Tex_sampler", ShaderResourceType::Sampler, VariableType::Mutable))
        .with_combined_samplers("_sampler");
    let signature = PipelineResourceSignature::<D3D11Model>::new(device, desc).unwrap();
    let srb = signature.create_shader_resource_binding(false).unwrap();
    let variable = srb.get_variable_by_name(ShaderStage::Pixel, "g_Tex").unwrap();

    let logger = CapturingLogger::install();
    assert!(variable.set(Some(DeviceObject::from(mock.texture_srv("Plain")))));
    assert!(logger.contains(LogSeverity::Warn, "has no default sampler"));

    let sampler_index = signature.find_resource(ShaderStage::Pixel, "g_Tex_sampler").unwrap();
    let location = signature.attribs(sampler_index).srb_location;
    srb.with_cache(|cache| assert!(!cache.is_resource_bound(&location, 0)));
}
