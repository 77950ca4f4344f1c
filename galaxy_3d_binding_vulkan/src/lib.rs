/*!
# Galaxy 3D Binding - Vulkan Backend

Vulkan implementation of the Galaxy 3D binding device traits.

This crate provides a headless `RenderDevice` built on the Ash Vulkan bindings,
with gpu-allocator for memory management and spirq for SPIR-V reflection.
Signatures created with `VulkanModel` map one-to-one to descriptor set layouts:
set 0 holds static and mutable resources, set 1 dynamic resources.

```no_run
use galaxy_3d_binding::galaxy3d::Config;
use galaxy_3d_binding_vulkan::VulkanDevice;

let device = VulkanDevice::new(&Config::default())?;
# Ok::<(), galaxy_3d_binding::galaxy3d::Error>(())
```
*/

mod debug;
mod vulkan_buffer;
mod vulkan_command_recorder;
mod vulkan_context;
mod vulkan_descriptor_pool;
mod vulkan_device;
mod vulkan_format;
mod vulkan_pipeline;
mod vulkan_queue;
mod vulkan_reflect;
mod vulkan_texture;

pub use vulkan_buffer::{VulkanBuffer, VulkanBufferView};
pub use vulkan_command_recorder::{
    descriptor_writes, DescriptorInfo, DescriptorWrite, VulkanCommandRecorder, RECORDER_BUFFER_COUNT,
};
pub use vulkan_context::GpuContext;
pub use vulkan_descriptor_pool::{DescriptorPoolManager, DEFAULT_SETS_PER_POOL};
pub use vulkan_device::VulkanDevice;
pub use vulkan_format::*;
pub use vulkan_pipeline::{VulkanPipeline, RENDER_TARGET_FORMAT};
pub use vulkan_queue::VulkanQueue;
pub use vulkan_reflect::{reflect_spirv, resource_type_of};
pub use vulkan_texture::{VulkanSampler, VulkanTexture, VulkanTextureView};

// Re-export debug utilities
pub use debug::{reset_validation_stats, validation_stats, ValidationStats};
