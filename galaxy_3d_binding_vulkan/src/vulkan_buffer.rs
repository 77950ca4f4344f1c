/// VulkanBuffer / VulkanBufferView - Vulkan implementations of the Buffer and BufferView traits

use ash::vk;
use ash::vk::Handle;
use galaxy_3d_binding::galaxy3d::device::{
    Buffer, BufferDesc, BufferMode, BufferView, BufferViewDesc, NativeHandle, ResourceState, StateTracker,
};
use galaxy_3d_binding::galaxy3d::{Error, Result};
use galaxy_3d_binding::{engine_bail, engine_err, engine_error};
use gpu_allocator::vulkan::{Allocation, AllocationCreateDesc, AllocationScheme};
use gpu_allocator::MemoryLocation;
use std::sync::{Arc, PoisonError};

use crate::vulkan_context::GpuContext;
use crate::vulkan_format::{buffer_usage_to_vk, texel_format_for_stride};

/// Vulkan buffer, host-visible so it can be written with `write`
pub struct VulkanBuffer {
    /// Shared GPU context (device, allocator, queue)
    ctx: Arc<GpuContext>,
    desc: BufferDesc,
    pub(crate) buffer: vk::Buffer,
    /// GPU memory allocation
    allocation: Option<Allocation>,
    state: StateTracker,
}

impl VulkanBuffer {
    pub(crate) fn create(ctx: Arc<GpuContext>, desc: &BufferDesc) -> Result<Self> {
        if desc.size == 0 {
            engine_bail!("galaxy3d::vulkan", "Buffer '{}' has zero size", desc.name);
        }

        unsafe {
            let buffer_info = vk::BufferCreateInfo::default()
                .size(desc.size)
                .usage(buffer_usage_to_vk(desc.bind_flags, desc.mode))
                .sharing_mode(vk::SharingMode::EXCLUSIVE);

            let buffer = ctx
                .device
                .create_buffer(&buffer_info, None)
                .map_err(|e| engine_err!("galaxy3d::vulkan", "Failed to create buffer '{}': {:?}", desc.name, e))?;

            let requirements = ctx.device.get_buffer_memory_requirements(buffer);

            let allocation = ctx
                .allocator
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .allocate(&AllocationCreateDesc {
                    name: &desc.name,
                    requirements,
                    location: MemoryLocation::CpuToGpu,
                    linear: true,
                    allocation_scheme: AllocationScheme::GpuAllocatorManaged,
                });
            let allocation = match allocation {
                Ok(allocation) => allocation,
                Err(e) => {
                    ctx.device.destroy_buffer(buffer, None);
                    engine_error!("galaxy3d::vulkan", "Failed to allocate memory for buffer '{}': {:?}", desc.name, e);
                    return Err(Error::OutOfMemory);
                }
            };

            if let Err(e) = ctx.device.bind_buffer_memory(buffer, allocation.memory(), allocation.offset()) {
                let _ = ctx.allocator.lock().unwrap_or_else(PoisonError::into_inner).free(allocation);
                ctx.device.destroy_buffer(buffer, None);
                return Err(engine_err!("galaxy3d::vulkan", "Failed to bind buffer memory: {:?}", e));
            }

            Ok(Self {
                ctx,
                desc: desc.clone(),
                buffer,
                allocation: Some(allocation),
                state: StateTracker::new(ResourceState::UNDEFINED),
            })
        }
    }

    /// Copy `data` into the buffer at `offset`
    pub fn write(&self, offset: u64, data: &[u8]) -> Result<()> {
        if offset + data.len() as u64 > self.desc.size {
            engine_bail!(
                "galaxy3d::vulkan",
                "Write of {} bytes at offset {} overflows buffer '{}' ({} bytes)",
                data.len(),
                offset,
                self.desc.name,
                self.desc.size
            );
        }
        let mapped = self
            .allocation
            .as_ref()
            .and_then(|allocation| allocation.mapped_ptr())
            .ok_or_else(|| engine_err!("galaxy3d::vulkan", "Buffer '{}' is not CPU-accessible", self.desc.name))?;
        unsafe {
            std::ptr::copy_nonoverlapping(
                data.as_ptr(),
                (mapped.as_ptr() as *mut u8).add(offset as usize),
                data.len(),
            );
        }
        Ok(())
    }
}

impl Buffer for VulkanBuffer {
    fn desc(&self) -> &BufferDesc {
        &self.desc
    }

    fn native_handle(&self) -> NativeHandle {
        NativeHandle(self.buffer.as_raw())
    }

    fn state(&self) -> ResourceState {
        self.state.get()
    }

    fn set_state(&self, state: ResourceState) {
        self.state.set(state);
    }
}

impl Drop for VulkanBuffer {
    fn drop(&mut self) {
        unsafe {
            if let Some(allocation) = self.allocation.take() {
                let mut allocator = self.ctx.allocator.lock().unwrap_or_else(PoisonError::into_inner);
                allocator.free(allocation).ok();
            }
            self.ctx.device.destroy_buffer(self.buffer, None);
        }
    }
}

/// Range of a buffer seen by shaders
///
/// Formatted buffers get a `VkBufferView` (texel buffer). Structured and raw buffers
/// are bound directly; their native handle is the buffer itself.
pub struct VulkanBufferView {
    ctx: Arc<GpuContext>,
    desc: BufferViewDesc,
    buffer: Arc<dyn Buffer>,
    texel_view: vk::BufferView,
}

impl VulkanBufferView {
    pub(crate) fn create(ctx: Arc<GpuContext>, buffer: &Arc<dyn Buffer>, desc: &BufferViewDesc) -> Result<Self> {
        let buffer_desc = buffer.desc();
        if desc.byte_offset + desc.byte_width > buffer_desc.size || desc.byte_offset >= buffer_desc.size {
            engine_error!(
                "galaxy3d::vulkan",
                "View range [{}, +{}) is outside buffer '{}' ({} bytes)",
                desc.byte_offset,
                desc.byte_width,
                buffer_desc.name,
                buffer_desc.size
            );
            return Err(Error::InvalidResource(format!(
                "buffer view outside buffer '{}'",
                buffer_desc.name
            )));
        }

        let texel_view = if buffer_desc.mode == BufferMode::Formatted {
            let range = if desc.byte_width == 0 { vk::WHOLE_SIZE } else { desc.byte_width };
            let info = vk::BufferViewCreateInfo::default()
                .buffer(vk::Buffer::from_raw(buffer.native_handle().0))
                .format(texel_format_for_stride(buffer_desc.element_byte_stride))
                .offset(desc.byte_offset)
                .range(range);
            unsafe {
                ctx.device.create_buffer_view(&info, None).map_err(|e| {
                    engine_err!("galaxy3d::vulkan", "Failed to create view of buffer '{}': {:?}", buffer_desc.name, e)
                })?
            }
        } else {
            vk::BufferView::null()
        };

        Ok(Self {
            ctx,
            desc: desc.clone(),
            buffer: buffer.clone(),
            texel_view,
        })
    }
}

impl BufferView for VulkanBufferView {
    fn desc(&self) -> &BufferViewDesc {
        &self.desc
    }

    fn buffer(&self) -> &Arc<dyn Buffer> {
        &self.buffer
    }

    fn native_handle(&self) -> NativeHandle {
        if self.texel_view == vk::BufferView::null() {
            self.buffer.native_handle()
        } else {
            NativeHandle(self.texel_view.as_raw())
        }
    }
}

impl Drop for VulkanBufferView {
    fn drop(&mut self) {
        if self.texel_view != vk::BufferView::null() {
            unsafe { self.ctx.device.destroy_buffer_view(self.texel_view, None) };
        }
    }
}
