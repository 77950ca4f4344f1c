//! Device objects that can be bound to shader resource variables
//!
//! Buffers, textures, views, samplers and top-level acceleration structures are
//! created by a backend (`RenderDevice`) and handed out as `Arc<dyn Trait>`. The binding
//! layer only needs their descriptions, their native handle and their tracked state.

use std::fmt;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use crate::binding::SamplerDesc;

// ============================================================================
// Native handle
// ============================================================================

/// Backend-native handle of a device object (VkBuffer, VkImageView, ID3D11Buffer*, ...)
///
/// Stored as a plain integer. It never owns the object it refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, PartialOrd, Ord)]
pub struct NativeHandle(pub u64);

impl NativeHandle {
    pub const NULL: NativeHandle = NativeHandle(0);

    pub fn is_null(&self) -> bool {
        self.0 == 0
    }
}

// ============================================================================
// Resource state
// ============================================================================

bitflags::bitflags! {
    /// Resource state used for transitions and verification
    ///
    /// `UNKNOWN` (no bits) means the state is not tracked by the engine; such
    /// resources are neither transitioned nor verified.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct ResourceState: u32 {
        const UNDEFINED        = 1 << 0;
        const CONSTANT_BUFFER  = 1 << 1;
        const SHADER_RESOURCE  = 1 << 2;
        const UNORDERED_ACCESS = 1 << 3;
        const INPUT_ATTACHMENT = 1 << 4;
        const RAY_TRACING      = 1 << 5;
        const RENDER_TARGET    = 1 << 6;
        const COPY_DEST        = 1 << 7;
        const COMMON           = 1 << 8;
    }
}

impl ResourceState {
    pub const UNKNOWN: ResourceState = ResourceState::empty();

    pub fn is_known(&self) -> bool {
        !self.is_empty()
    }
}

/// Atomic resource state holder for device object implementations
#[derive(Debug, Default)]
pub struct StateTracker(AtomicU32);

impl StateTracker {
    pub fn new(state: ResourceState) -> Self {
        Self(AtomicU32::new(state.bits()))
    }

    pub fn get(&self) -> ResourceState {
        ResourceState::from_bits_truncate(self.0.load(Ordering::Acquire))
    }

    pub fn set(&self, state: ResourceState) {
        self.0.store(state.bits(), Ordering::Release);
    }
}

// ============================================================================
// Buffers
// ============================================================================

/// Buffer usage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Usage {
    /// Initialized once, never updated
    Immutable,
    /// Updated occasionally with GPU copies
    #[default]
    Default,
    /// Rewritten every frame through a ring of versions; cannot be bound with fixed offsets
    Dynamic,
    /// CPU-visible staging memory
    Staging,
}

bitflags::bitflags! {
    /// How a resource may be bound to the pipeline
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct BindFlags: u32 {
        const VERTEX_BUFFER    = 1 << 0;
        const INDEX_BUFFER     = 1 << 1;
        const UNIFORM_BUFFER   = 1 << 2;
        const SHADER_RESOURCE  = 1 << 3;
        const UNORDERED_ACCESS = 1 << 4;
        const RENDER_TARGET    = 1 << 5;
        const DEPTH_STENCIL    = 1 << 6;
        const INPUT_ATTACHMENT = 1 << 7;
        const RAY_TRACING      = 1 << 8;
    }
}

/// How buffer views interpret the buffer contents
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum BufferMode {
    #[default]
    Undefined,
    /// Typed view with a texel format
    Formatted,
    /// Array of structures with a fixed stride
    Structured,
    /// Byte address buffer
    Raw,
}

/// Buffer description
#[derive(Debug, Clone, PartialEq, Default)]
pub struct BufferDesc {
    pub name: String,
    pub size: u64,
    pub usage: Usage,
    pub bind_flags: BindFlags,
    pub mode: BufferMode,
    pub element_byte_stride: u32,
}

/// Buffer device object
pub trait Buffer: Send + Sync {
    fn desc(&self) -> &BufferDesc;
    fn native_handle(&self) -> NativeHandle;
    fn state(&self) -> ResourceState;
    fn set_state(&self, state: ResourceState);
}

/// Buffer view type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BufferViewType {
    ShaderResource,
    UnorderedAccess,
}

/// Buffer view description
#[derive(Debug, Clone, PartialEq)]
pub struct BufferViewDesc {
    pub view_type: BufferViewType,
    pub byte_offset: u64,
    /// 0 means "to the end of the buffer"
    pub byte_width: u64,
}

/// Buffer view device object
pub trait BufferView: Send + Sync {
    fn desc(&self) -> &BufferViewDesc;
    fn buffer(&self) -> &Arc<dyn Buffer>;
    fn native_handle(&self) -> NativeHandle;
}

// ============================================================================
// Textures
// ============================================================================

/// Resource dimension
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ResourceDimension {
    #[default]
    Undefined,
    Buffer,
    Tex1D,
    Tex1DArray,
    Tex2D,
    Tex2DArray,
    Tex3D,
    TexCube,
    TexCubeArray,
}

/// Texture format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[allow(non_camel_case_types)]
pub enum TextureFormat {
    #[default]
    Unknown,
    R8G8B8A8_UNORM,
    R8G8B8A8_SRGB,
    B8G8R8A8_UNORM,
    B8G8R8A8_SRGB,
    R16G16B16A16_SFLOAT,
    R32G32B32A32_SFLOAT,
    R32_SFLOAT,
    R32_UINT,
    D32_FLOAT,
    D24_UNORM_S8_UINT,
}

/// Texture description
#[derive(Debug, Clone, PartialEq)]
pub struct TextureDesc {
    pub name: String,
    pub dimension: ResourceDimension,
    pub width: u32,
    pub height: u32,
    pub depth_or_array_size: u32,
    pub mip_levels: u32,
    pub sample_count: u32,
    pub format: TextureFormat,
    pub bind_flags: BindFlags,
}

impl Default for TextureDesc {
    fn default() -> Self {
        Self {
            name: String::new(),
            dimension: ResourceDimension::Tex2D,
            width: 1,
            height: 1,
            depth_or_array_size: 1,
            mip_levels: 1,
            sample_count: 1,
            format: TextureFormat::R8G8B8A8_UNORM,
            bind_flags: BindFlags::SHADER_RESOURCE,
        }
    }
}

/// Texture device object
pub trait Texture: Send + Sync {
    fn desc(&self) -> &TextureDesc;
    fn native_handle(&self) -> NativeHandle;
    fn state(&self) -> ResourceState;
    fn set_state(&self, state: ResourceState);
}

/// Texture view type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextureViewType {
    ShaderResource,
    RenderTarget,
    DepthStencil,
    UnorderedAccess,
}

/// Texture view description
#[derive(Debug, Clone, PartialEq)]
pub struct TextureViewDesc {
    pub view_type: TextureViewType,
    /// `Undefined` means "same as the texture"
    pub dimension: ResourceDimension,
}

/// Texture view device object
pub trait TextureView: Send + Sync {
    fn desc(&self) -> &TextureViewDesc;
    fn texture(&self) -> &Arc<dyn Texture>;
    /// Default sampler attached to the view, bound automatically to assigned sampler slots
    fn sampler(&self) -> Option<Arc<dyn Sampler>>;
    fn native_handle(&self) -> NativeHandle;

    /// View dimension with `Undefined` resolved to the texture's dimension
    fn resolved_dimension(&self) -> ResourceDimension {
        match self.desc().dimension {
            ResourceDimension::Undefined => self.texture().desc().dimension,
            dim => dim,
        }
    }
}

// ============================================================================
// Samplers and acceleration structures
// ============================================================================

/// Sampler device object
pub trait Sampler: Send + Sync {
    fn desc(&self) -> &SamplerDesc;
    fn native_handle(&self) -> NativeHandle;
}

/// Top-level acceleration structure device object
pub trait TopLevelAS: Send + Sync {
    fn name(&self) -> &str;
    fn native_handle(&self) -> NativeHandle;
    fn state(&self) -> ResourceState;
    fn set_state(&self, state: ResourceState);
}

// ============================================================================
// DeviceObject
// ============================================================================

/// Kind of a bindable device object
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeviceObjectKind {
    Buffer,
    BufferView,
    TextureView,
    Sampler,
    Tlas,
}

/// Any object that can be stored in a shader resource cache
#[derive(Clone)]
pub enum DeviceObject {
    Buffer(Arc<dyn Buffer>),
    BufferView(Arc<dyn BufferView>),
    TextureView(Arc<dyn TextureView>),
    Sampler(Arc<dyn Sampler>),
    Tlas(Arc<dyn TopLevelAS>),
}

impl DeviceObject {
    pub fn kind(&self) -> DeviceObjectKind {
        match self {
            DeviceObject::Buffer(_) => DeviceObjectKind::Buffer,
            DeviceObject::BufferView(_) => DeviceObjectKind::BufferView,
            DeviceObject::TextureView(_) => DeviceObjectKind::TextureView,
            DeviceObject::Sampler(_) => DeviceObjectKind::Sampler,
            DeviceObject::Tlas(_) => DeviceObjectKind::Tlas,
        }
    }

    pub fn native_handle(&self) -> NativeHandle {
        match self {
            DeviceObject::Buffer(b) => b.native_handle(),
            DeviceObject::BufferView(v) => v.native_handle(),
            DeviceObject::TextureView(v) => v.native_handle(),
            DeviceObject::Sampler(s) => s.native_handle(),
            DeviceObject::Tlas(t) => t.native_handle(),
        }
    }

    /// Address of the shared allocation, used for identity comparisons
    fn data_ptr(&self) -> *const () {
        match self {
            DeviceObject::Buffer(b) => Arc::as_ptr(b) as *const (),
            DeviceObject::BufferView(v) => Arc::as_ptr(v) as *const (),
            DeviceObject::TextureView(v) => Arc::as_ptr(v) as *const (),
            DeviceObject::Sampler(s) => Arc::as_ptr(s) as *const (),
            DeviceObject::Tlas(t) => Arc::as_ptr(t) as *const (),
        }
    }

    /// Whether both values refer to the same object
    pub fn ptr_eq(&self, other: &DeviceObject) -> bool {
        self.kind() == other.kind() && self.data_ptr() == other.data_ptr()
    }

    /// Human-readable name for log messages
    pub fn name(&self) -> String {
        match self {
            DeviceObject::Buffer(b) => b.desc().name.clone(),
            DeviceObject::BufferView(v) => format!("view of buffer '{}'", v.buffer().desc().name),
            DeviceObject::TextureView(v) => format!("view of texture '{}'", v.texture().desc().name),
            DeviceObject::Sampler(_) => "sampler".to_string(),
            DeviceObject::Tlas(t) => t.name().to_string(),
        }
    }

    pub fn as_buffer(&self) -> Option<&Arc<dyn Buffer>> {
        match self {
            DeviceObject::Buffer(b) => Some(b),
            _ => None,
        }
    }

    pub fn as_texture_view(&self) -> Option<&Arc<dyn TextureView>> {
        match self {
            DeviceObject::TextureView(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_buffer_view(&self) -> Option<&Arc<dyn BufferView>> {
        match self {
            DeviceObject::BufferView(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_sampler(&self) -> Option<&Arc<dyn Sampler>> {
        match self {
            DeviceObject::Sampler(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Debug for DeviceObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}({}, {:#x})", self.kind(), self.name(), self.native_handle().0)
    }
}

impl From<Arc<dyn Buffer>> for DeviceObject {
    fn from(value: Arc<dyn Buffer>) -> Self {
        DeviceObject::Buffer(value)
    }
}

impl From<Arc<dyn BufferView>> for DeviceObject {
    fn from(value: Arc<dyn BufferView>) -> Self {
        DeviceObject::BufferView(value)
    }
}

impl From<Arc<dyn TextureView>> for DeviceObject {
    fn from(value: Arc<dyn TextureView>) -> Self {
        DeviceObject::TextureView(value)
    }
}

impl From<Arc<dyn Sampler>> for DeviceObject {
    fn from(value: Arc<dyn Sampler>) -> Self {
        DeviceObject::Sampler(value)
    }
}

impl From<Arc<dyn TopLevelAS>> for DeviceObject {
    fn from(value: Arc<dyn TopLevelAS>) -> Self {
        DeviceObject::Tlas(value)
    }
}

#[cfg(test)]
#[path = "object_tests.rs"]
mod tests;
