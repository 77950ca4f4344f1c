//! Device object factory trait

use std::any::Any;
use std::sync::Arc;

use crate::binding::{DescriptorKind, PipelineResourceFlags, PipelineType, ShaderResourceType, ShaderStages, SamplerDesc};
use crate::device::command::{CommandQueue, CommandRecorder};
use crate::device::object::{
    Buffer, BufferDesc, BufferView, BufferViewDesc, NativeHandle, Sampler, Texture, TextureDesc, TextureView,
    TextureViewDesc,
};
use crate::device::release_queue::ReleaseQueue;
use crate::error::Result;
use crate::pipeline::Shader;

// ============================================================================
// Native pipeline layout
// ============================================================================

/// One binding of a descriptor set / root table
#[derive(Clone)]
pub struct LayoutBinding {
    pub binding: u32,
    /// Slot of element 0 within the table contents
    pub cache_offset: u32,
    pub array_size: u32,
    pub resource_type: ShaderResourceType,
    pub flags: PipelineResourceFlags,
    pub stages: ShaderStages,
    pub descriptor_kind: DescriptorKind,
    /// Immutable samplers baked into the layout (one per array element, or empty)
    pub immutable_samplers: Vec<Arc<dyn Sampler>>,
}

impl std::fmt::Debug for LayoutBinding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LayoutBinding")
            .field("binding", &self.binding)
            .field("cache_offset", &self.cache_offset)
            .field("array_size", &self.array_size)
            .field("descriptor_kind", &self.descriptor_kind)
            .field("stages", &self.stages)
            .field("immutable_samplers", &self.immutable_samplers.len())
            .finish()
    }
}

/// Layout of one descriptor set / root table
#[derive(Debug, Clone, Default)]
pub struct DescriptorSetLayoutInfo {
    pub bindings: Vec<LayoutBinding>,
    /// Number of elements bound with dynamic offsets
    pub dynamic_buffer_count: u32,
}

/// Native layout of a whole pipeline, sets ordered by set index
#[derive(Debug, Clone, Default)]
pub struct PipelineLayoutInfo {
    pub sets: Vec<DescriptorSetLayoutInfo>,
}

/// Everything a backend needs to create a native pipeline
pub struct NativePipelineInfo<'a> {
    pub name: &'a str,
    pub pipeline_type: PipelineType,
    pub shaders: &'a [Arc<Shader>],
    pub layout: PipelineLayoutInfo,
    pub num_render_targets: u32,
}

/// Compiled backend pipeline (VkPipeline + layout, ID3D12PipelineState, shader set)
pub trait NativePipeline: Send + Sync {
    fn name(&self) -> &str;
    fn pipeline_type(&self) -> PipelineType;
    fn native_handle(&self) -> NativeHandle;
    fn as_any(&self) -> &dyn Any;
}

// ============================================================================
// RenderDevice
// ============================================================================

/// Backend device: creates every object the binding layer works with
pub trait RenderDevice: Send + Sync {
    fn create_buffer(&self, desc: &BufferDesc) -> Result<Arc<dyn Buffer>>;

    fn create_buffer_view(&self, buffer: &Arc<dyn Buffer>, desc: &BufferViewDesc) -> Result<Arc<dyn BufferView>>;

    fn create_texture(&self, desc: &TextureDesc) -> Result<Arc<dyn Texture>>;

    /// Create a texture view, optionally carrying a default sampler
    fn create_texture_view(
        &self,
        texture: &Arc<dyn Texture>,
        desc: &TextureViewDesc,
        sampler: Option<Arc<dyn Sampler>>,
    ) -> Result<Arc<dyn TextureView>>;

    fn create_sampler(&self, desc: &SamplerDesc) -> Result<Arc<dyn Sampler>>;

    fn create_pipeline(&self, info: &NativePipelineInfo<'_>) -> Result<Arc<dyn NativePipeline>>;

    fn create_command_recorder(&self) -> Result<Box<dyn CommandRecorder>>;

    fn command_queue(&self) -> Arc<dyn CommandQueue>;

    /// Queue of objects waiting for the GPU to finish with them
    fn release_queue(&self) -> Arc<ReleaseQueue>;
}
