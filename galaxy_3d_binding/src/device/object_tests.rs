use super::*;
use crate::device::mock_device::MockDevice;

// ============================================================================
// NATIVE HANDLE / STATE
// ============================================================================

#[test]
fn test_native_handle_null() {
    assert!(NativeHandle::NULL.is_null());
    assert!(NativeHandle::default().is_null());
    assert!(!NativeHandle(7).is_null());
}

#[test]
fn test_unknown_state_is_empty() {
    assert!(!ResourceState::UNKNOWN.is_known());
    assert!(ResourceState::SHADER_RESOURCE.is_known());
}

#[test]
fn test_state_tracker_set_get() {
    let tracker = StateTracker::new(ResourceState::UNDEFINED);
    assert_eq!(tracker.get(), ResourceState::UNDEFINED);
    tracker.set(ResourceState::UNORDERED_ACCESS);
    assert_eq!(tracker.get(), ResourceState::UNORDERED_ACCESS);
}

// ============================================================================
// DEVICE OBJECT
// ============================================================================

#[test]
fn test_device_object_kind_and_handle() {
    let device = MockDevice::new();
    let buffer = device.uniform_buffer("cb");
    let object = DeviceObject::from(buffer.clone());
    assert_eq!(object.kind(), DeviceObjectKind::Buffer);
    assert_eq!(object.native_handle(), buffer.native_handle());
    assert_eq!(object.name(), "cb");
    assert!(object.as_buffer().is_some());
    assert!(object.as_sampler().is_none());
}

#[test]
fn test_device_object_ptr_eq() {
    let device = MockDevice::new();
    let a = device.uniform_buffer("a");
    let b = device.uniform_buffer("a");
    let a1 = DeviceObject::Buffer(a.clone());
    let a2 = DeviceObject::Buffer(a);
    let b1 = DeviceObject::Buffer(b);
    assert!(a1.ptr_eq(&a2));
    assert!(!a1.ptr_eq(&b1));
}

#[test]
fn test_device_object_names() {
    let device = MockDevice::new();
    let view = DeviceObject::from(device.texture_srv("albedo"));
    assert_eq!(view.kind(), DeviceObjectKind::TextureView);
    assert!(view.name().contains("albedo"));

    let tlas = DeviceObject::from(device.tlas("scene"));
    assert_eq!(tlas.kind(), DeviceObjectKind::Tlas);
    assert_eq!(tlas.name(), "scene");
}

#[test]
fn test_texture_view_resolved_dimension_uses_texture() {
    let device = MockDevice::new();
    let texture = device.texture("cube", ResourceDimension::TexCube, 1);
    let view = crate::device::RenderDevice::create_texture_view(
        &device,
        &texture,
        &TextureViewDesc {
            view_type: TextureViewType::ShaderResource,
            dimension: ResourceDimension::Undefined,
        },
        None,
    )
    .unwrap();
    assert_eq!(view.resolved_dimension(), ResourceDimension::TexCube);
}
