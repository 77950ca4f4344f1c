/// VulkanTexture / VulkanTextureView / VulkanSampler - Vulkan implementations of the
/// Texture, TextureView and Sampler traits

use ash::vk;
use ash::vk::Handle;
use galaxy_3d_binding::galaxy3d::binding::SamplerDesc;
use galaxy_3d_binding::galaxy3d::device::{
    NativeHandle, ResourceDimension, ResourceState, Sampler, StateTracker, Texture, TextureDesc, TextureFormat,
    TextureView, TextureViewDesc, TextureViewType,
};
use galaxy_3d_binding::galaxy3d::{Error, Result};
use galaxy_3d_binding::{engine_bail, engine_err, engine_error};
use gpu_allocator::vulkan::{Allocation, AllocationCreateDesc, AllocationScheme};
use gpu_allocator::MemoryLocation;
use std::sync::{Arc, PoisonError};

use crate::vulkan_context::GpuContext;
use crate::vulkan_format::{
    format_aspect, image_type_to_vk, image_usage_to_vk, image_view_type_to_vk, sample_count_to_vk,
    sampler_create_info, texture_format_to_vk,
};

/// Vulkan image in device-local memory
pub struct VulkanTexture {
    ctx: Arc<GpuContext>,
    desc: TextureDesc,
    pub(crate) image: vk::Image,
    allocation: Option<Allocation>,
    state: StateTracker,
}

impl VulkanTexture {
    pub(crate) fn create(ctx: Arc<GpuContext>, desc: &TextureDesc) -> Result<Self> {
        if desc.width == 0 || desc.height == 0 || desc.depth_or_array_size == 0 || desc.mip_levels == 0 {
            engine_bail!(
                "galaxy3d::vulkan",
                "Texture '{}' has an empty extent ({}x{}x{}, {} mips)",
                desc.name,
                desc.width,
                desc.height,
                desc.depth_or_array_size,
                desc.mip_levels
            );
        }
        if desc.format == TextureFormat::Unknown {
            engine_bail!("galaxy3d::vulkan", "Texture '{}' has no format", desc.name);
        }

        let is_3d = desc.dimension == ResourceDimension::Tex3D;
        let is_cube = matches!(desc.dimension, ResourceDimension::TexCube | ResourceDimension::TexCubeArray);
        let extent = vk::Extent3D {
            width: desc.width,
            height: desc.height,
            depth: if is_3d { desc.depth_or_array_size } else { 1 },
        };
        let array_layers = if is_3d { 1 } else { desc.depth_or_array_size };

        let mut image_info = vk::ImageCreateInfo::default()
            .image_type(image_type_to_vk(desc.dimension))
            .format(texture_format_to_vk(desc.format))
            .extent(extent)
            .mip_levels(desc.mip_levels)
            .array_layers(array_layers)
            .samples(sample_count_to_vk(desc.sample_count))
            .tiling(vk::ImageTiling::OPTIMAL)
            .usage(image_usage_to_vk(desc.bind_flags))
            .sharing_mode(vk::SharingMode::EXCLUSIVE)
            .initial_layout(vk::ImageLayout::UNDEFINED);
        if is_cube {
            image_info = image_info.flags(vk::ImageCreateFlags::CUBE_COMPATIBLE);
        }

        unsafe {
            let image = ctx
                .device
                .create_image(&image_info, None)
                .map_err(|e| engine_err!("galaxy3d::vulkan", "Failed to create image '{}': {:?}", desc.name, e))?;

            let requirements = ctx.device.get_image_memory_requirements(image);
            let allocation = ctx
                .allocator
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .allocate(&AllocationCreateDesc {
                    name: &desc.name,
                    requirements,
                    location: MemoryLocation::GpuOnly,
                    linear: false,
                    allocation_scheme: AllocationScheme::GpuAllocatorManaged,
                });
            let allocation = match allocation {
                Ok(allocation) => allocation,
                Err(e) => {
                    ctx.device.destroy_image(image, None);
                    engine_error!("galaxy3d::vulkan", "Failed to allocate memory for image '{}': {:?}", desc.name, e);
                    return Err(Error::OutOfMemory);
                }
            };

            if let Err(e) = ctx.device.bind_image_memory(image, allocation.memory(), allocation.offset()) {
                let _ = ctx.allocator.lock().unwrap_or_else(PoisonError::into_inner).free(allocation);
                ctx.device.destroy_image(image, None);
                return Err(engine_err!("galaxy3d::vulkan", "Failed to bind image memory: {:?}", e));
            }

            Ok(Self {
                ctx,
                desc: desc.clone(),
                image,
                allocation: Some(allocation),
                state: StateTracker::new(ResourceState::UNDEFINED),
            })
        }
    }
}

impl Texture for VulkanTexture {
    fn desc(&self) -> &TextureDesc {
        &self.desc
    }

    fn native_handle(&self) -> NativeHandle {
        NativeHandle(self.image.as_raw())
    }

    fn state(&self) -> ResourceState {
        self.state.get()
    }

    fn set_state(&self, state: ResourceState) {
        self.state.set(state);
    }
}

impl Drop for VulkanTexture {
    fn drop(&mut self) {
        unsafe {
            if let Some(allocation) = self.allocation.take() {
                let mut allocator = self.ctx.allocator.lock().unwrap_or_else(PoisonError::into_inner);
                allocator.free(allocation).ok();
            }
            self.ctx.device.destroy_image(self.image, None);
        }
    }
}

/// Image view over every mip and layer of a texture
pub struct VulkanTextureView {
    ctx: Arc<GpuContext>,
    desc: TextureViewDesc,
    texture: Arc<dyn Texture>,
    sampler: Option<Arc<dyn Sampler>>,
    view: vk::ImageView,
}

impl VulkanTextureView {
    pub(crate) fn create(
        ctx: Arc<GpuContext>,
        texture: &Arc<dyn Texture>,
        desc: &TextureViewDesc,
        sampler: Option<Arc<dyn Sampler>>,
    ) -> Result<Self> {
        let texture_desc = texture.desc();
        let dimension = match desc.dimension {
            ResourceDimension::Undefined => texture_desc.dimension,
            dimension => dimension,
        };
        let mut aspect = format_aspect(texture_desc.format);
        if desc.view_type != TextureViewType::DepthStencil {
            // Sampled depth-stencil views read depth only
            aspect &= !vk::ImageAspectFlags::STENCIL;
        }
        let layer_count = if dimension == ResourceDimension::Tex3D {
            1
        } else {
            texture_desc.depth_or_array_size
        };

        let view_info = vk::ImageViewCreateInfo::default()
            .image(vk::Image::from_raw(texture.native_handle().0))
            .view_type(image_view_type_to_vk(dimension))
            .format(texture_format_to_vk(texture_desc.format))
            .subresource_range(vk::ImageSubresourceRange {
                aspect_mask: aspect,
                base_mip_level: 0,
                level_count: texture_desc.mip_levels,
                base_array_layer: 0,
                layer_count,
            });

        let view = unsafe {
            ctx.device.create_image_view(&view_info, None).map_err(|e| {
                engine_err!("galaxy3d::vulkan", "Failed to create view of image '{}': {:?}", texture_desc.name, e)
            })?
        };

        Ok(Self {
            ctx,
            desc: desc.clone(),
            texture: texture.clone(),
            sampler,
            view,
        })
    }
}

impl TextureView for VulkanTextureView {
    fn desc(&self) -> &TextureViewDesc {
        &self.desc
    }

    fn texture(&self) -> &Arc<dyn Texture> {
        &self.texture
    }

    fn sampler(&self) -> Option<Arc<dyn Sampler>> {
        self.sampler.clone()
    }

    fn native_handle(&self) -> NativeHandle {
        NativeHandle(self.view.as_raw())
    }
}

impl Drop for VulkanTextureView {
    fn drop(&mut self) {
        unsafe { self.ctx.device.destroy_image_view(self.view, None) };
    }
}

/// VkSampler built from a `SamplerDesc`
pub struct VulkanSampler {
    ctx: Arc<GpuContext>,
    desc: SamplerDesc,
    sampler: vk::Sampler,
}

impl VulkanSampler {
    pub(crate) fn create(ctx: Arc<GpuContext>, desc: &SamplerDesc) -> Result<Self> {
        let create_info = sampler_create_info(desc, ctx.limits.max_sampler_anisotropy);
        let sampler = unsafe {
            ctx.device
                .create_sampler(&create_info, None)
                .map_err(|e| engine_err!("galaxy3d::vulkan", "Failed to create sampler: {:?}", e))?
        };
        Ok(Self {
            ctx,
            desc: desc.clone(),
            sampler,
        })
    }
}

impl Sampler for VulkanSampler {
    fn desc(&self) -> &SamplerDesc {
        &self.desc
    }

    fn native_handle(&self) -> NativeHandle {
        NativeHandle(self.sampler.as_raw())
    }
}

impl Drop for VulkanSampler {
    fn drop(&mut self) {
        unsafe { self.ctx.device.destroy_sampler(self.sampler, None) };
    }
}
