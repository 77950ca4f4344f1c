/// VulkanDevice - Vulkan implementation of the RenderDevice trait
///
/// Headless: no surface or swapchain is created. The device uses a single queue
/// that supports graphics and compute, Vulkan 1.3 dynamic rendering and timeline
/// semaphores.

use ash::vk;
use galaxy_3d_binding::galaxy3d::binding::SamplerDesc;
use galaxy_3d_binding::galaxy3d::device::{
    Buffer, BufferDesc, BufferView, BufferViewDesc, CommandQueue, CommandRecorder, NativePipeline,
    NativePipelineInfo, ReleaseQueue, RenderDevice, Sampler, Texture, TextureDesc, TextureView, TextureViewDesc,
};
use galaxy_3d_binding::galaxy3d::{Config, Error, Result};
use galaxy_3d_binding::{engine_error, engine_info, engine_warn};
use gpu_allocator::vulkan::{Allocator, AllocatorCreateDesc};
use std::ffi::{CStr, CString};
use std::sync::Arc;

use crate::vulkan_buffer::{VulkanBuffer, VulkanBufferView};
use crate::vulkan_command_recorder::VulkanCommandRecorder;
use crate::vulkan_context::GpuContext;
use crate::vulkan_descriptor_pool::{DescriptorPoolManager, DEFAULT_SETS_PER_POOL};
use crate::vulkan_pipeline::VulkanPipeline;
use crate::vulkan_queue::VulkanQueue;
use crate::vulkan_texture::{VulkanSampler, VulkanTexture, VulkanTextureView};

const VALIDATION_LAYER: &CStr = c"VK_LAYER_KHRONOS_validation";

fn init_error(what: &str, e: impl std::fmt::Debug) -> Error {
    engine_error!("galaxy3d::vulkan", "Failed to {}: {:?}", what, e);
    Error::InitializationFailed(format!("Failed to {}: {:?}", what, e))
}

/// Vulkan render device
pub struct VulkanDevice {
    ctx: Arc<GpuContext>,
    queue: Arc<VulkanQueue>,
    descriptor_pools: Arc<DescriptorPoolManager>,
    release_queue: Arc<ReleaseQueue>,
}

impl VulkanDevice {
    /// Create a device on the first GPU with a graphics+compute queue
    ///
    /// Validation layers are enabled when `config.enable_validation` is set and
    /// the crate is built with the `vulkan-validation` feature.
    pub fn new(config: &Config) -> Result<Self> {
        unsafe {
            let entry = ash::Entry::load().map_err(|e| init_error("load Vulkan library", e))?;

            let validation = cfg!(feature = "vulkan-validation") && config.enable_validation;
            if config.enable_validation && !validation {
                engine_warn!(
                    "galaxy3d::vulkan",
                    "Validation requested but the crate was built without the 'vulkan-validation' feature"
                );
            }

            let app_name = CString::new(config.app_name.as_str()).unwrap_or_default();
            let (major, minor, patch) = config.app_version;
            let app_info = vk::ApplicationInfo::default()
                .application_name(&app_name)
                .application_version(vk::make_api_version(0, major, minor, patch))
                .engine_name(c"Galaxy3D")
                .engine_version(vk::make_api_version(0, 0, 1, 0))
                .api_version(vk::API_VERSION_1_3);

            let mut extension_names = Vec::new();
            let mut layer_names = Vec::new();
            if validation {
                extension_names.push(ash::ext::debug_utils::NAME.as_ptr());
                layer_names.push(VALIDATION_LAYER.as_ptr());
            }

            let create_info = vk::InstanceCreateInfo::default()
                .application_info(&app_info)
                .enabled_layer_names(&layer_names)
                .enabled_extension_names(&extension_names);
            let instance = entry
                .create_instance(&create_info, None)
                .map_err(|e| init_error("create Vulkan instance", e))?;

            let (debug_utils_loader, debug_messenger) = if validation {
                let debug_utils = ash::ext::debug_utils::Instance::new(&entry, &instance);
                let debug_info = vk::DebugUtilsMessengerCreateInfoEXT::default()
                    .message_severity(crate::debug::severity_flags(false))
                    .message_type(
                        vk::DebugUtilsMessageTypeFlagsEXT::GENERAL
                            | vk::DebugUtilsMessageTypeFlagsEXT::VALIDATION
                            | vk::DebugUtilsMessageTypeFlagsEXT::PERFORMANCE,
                    )
                    .pfn_user_callback(Some(crate::debug::vulkan_debug_callback));
                match debug_utils.create_debug_utils_messenger(&debug_info, None) {
                    Ok(messenger) => (Some(debug_utils), Some(messenger)),
                    Err(e) => {
                        instance.destroy_instance(None);
                        return Err(init_error("create debug messenger", e));
                    }
                }
            } else {
                (None, None)
            };

            let destroy_instance = |instance: &ash::Instance| {
                if let (Some(loader), Some(messenger)) = (&debug_utils_loader, debug_messenger) {
                    loader.destroy_debug_utils_messenger(messenger, None);
                }
                instance.destroy_instance(None);
            };

            let (physical_device, queue_family) = match Self::pick_physical_device(&instance) {
                Ok(found) => found,
                Err(e) => {
                    destroy_instance(&instance);
                    return Err(e);
                }
            };

            let device = match Self::create_logical_device(&instance, physical_device, queue_family) {
                Ok(device) => device,
                Err(e) => {
                    destroy_instance(&instance);
                    return Err(e);
                }
            };
            let queue = device.get_device_queue(queue_family, 0);

            let allocator = match Allocator::new(&AllocatorCreateDesc {
                instance: instance.clone(),
                device: device.clone(),
                physical_device,
                debug_settings: Default::default(),
                buffer_device_address: false,
                allocation_sizes: Default::default(),
            }) {
                Ok(allocator) => allocator,
                Err(e) => {
                    device.destroy_device(None);
                    destroy_instance(&instance);
                    return Err(init_error("create GPU allocator", e));
                }
            };

            let properties = instance.get_physical_device_properties(physical_device);
            let device_name = CStr::from_ptr(properties.device_name.as_ptr()).to_string_lossy().into_owned();

            // From here on the context owns and destroys the device and instance
            let ctx = Arc::new(GpuContext::new(
                entry,
                instance,
                physical_device,
                device,
                allocator,
                queue,
                queue_family,
                debug_utils_loader,
                debug_messenger,
            ));
            let queue = Arc::new(VulkanQueue::new(ctx.clone())?);
            let descriptor_pools = Arc::new(DescriptorPoolManager::new(ctx.clone(), DEFAULT_SETS_PER_POOL)?);

            engine_info!(
                "galaxy3d::vulkan",
                "Vulkan device '{}' created (queue family {}, validation {})",
                device_name,
                queue_family,
                if validation { "on" } else { "off" }
            );

            Ok(Self {
                ctx,
                queue,
                descriptor_pools,
                release_queue: Arc::new(ReleaseQueue::new()),
            })
        }
    }

    unsafe fn pick_physical_device(instance: &ash::Instance) -> Result<(vk::PhysicalDevice, u32)> {
        let physical_devices = instance
            .enumerate_physical_devices()
            .map_err(|e| init_error("enumerate physical devices", e))?;

        for physical_device in physical_devices {
            let properties = instance.get_physical_device_properties(physical_device);
            if properties.api_version < vk::API_VERSION_1_3 {
                continue;
            }
            let family = instance
                .get_physical_device_queue_family_properties(physical_device)
                .iter()
                .position(|qf| qf.queue_flags.contains(vk::QueueFlags::GRAPHICS | vk::QueueFlags::COMPUTE));
            if let Some(family) = family {
                return Ok((physical_device, family as u32));
            }
        }

        engine_error!("galaxy3d::vulkan", "No Vulkan 1.3 GPU with a graphics+compute queue found");
        Err(Error::InitializationFailed(
            "No Vulkan 1.3 GPU with a graphics+compute queue found".to_string(),
        ))
    }

    unsafe fn create_logical_device(
        instance: &ash::Instance,
        physical_device: vk::PhysicalDevice,
        queue_family: u32,
    ) -> Result<ash::Device> {
        let queue_priorities = [1.0];
        let queue_create_infos = [vk::DeviceQueueCreateInfo::default()
            .queue_family_index(queue_family)
            .queue_priorities(&queue_priorities)];

        let supported = instance.get_physical_device_features(physical_device);
        let features = vk::PhysicalDeviceFeatures::default()
            .sampler_anisotropy(supported.sampler_anisotropy == vk::TRUE);
        let mut features12 = vk::PhysicalDeviceVulkan12Features::default().timeline_semaphore(true);
        let mut features13 = vk::PhysicalDeviceVulkan13Features::default().dynamic_rendering(true);

        let device_create_info = vk::DeviceCreateInfo::default()
            .queue_create_infos(&queue_create_infos)
            .enabled_features(&features)
            .push_next(&mut features12)
            .push_next(&mut features13);

        instance
            .create_device(physical_device, &device_create_info, None)
            .map_err(|e| init_error("create logical device", e))
    }

    /// Shared GPU state
    pub fn context(&self) -> &Arc<GpuContext> {
        &self.ctx
    }

    pub fn descriptor_pools(&self) -> &Arc<DescriptorPoolManager> {
        &self.descriptor_pools
    }

    /// Buffer whose contents can be written from the CPU
    pub fn create_vulkan_buffer(&self, desc: &BufferDesc) -> Result<Arc<VulkanBuffer>> {
        Ok(Arc::new(VulkanBuffer::create(self.ctx.clone(), desc)?))
    }

    /// Command recorder with the Vulkan-only rendering scope API
    pub fn create_vulkan_recorder(&self) -> Result<VulkanCommandRecorder> {
        VulkanCommandRecorder::new(self.ctx.clone(), self.queue.clone(), self.descriptor_pools.clone())
    }
}

impl RenderDevice for VulkanDevice {
    fn create_buffer(&self, desc: &BufferDesc) -> Result<Arc<dyn Buffer>> {
        Ok(Arc::new(VulkanBuffer::create(self.ctx.clone(), desc)?))
    }

    fn create_buffer_view(&self, buffer: &Arc<dyn Buffer>, desc: &BufferViewDesc) -> Result<Arc<dyn BufferView>> {
        Ok(Arc::new(VulkanBufferView::create(self.ctx.clone(), buffer, desc)?))
    }

    fn create_texture(&self, desc: &TextureDesc) -> Result<Arc<dyn Texture>> {
        Ok(Arc::new(VulkanTexture::create(self.ctx.clone(), desc)?))
    }

    fn create_texture_view(
        &self,
        texture: &Arc<dyn Texture>,
        desc: &TextureViewDesc,
        sampler: Option<Arc<dyn Sampler>>,
    ) -> Result<Arc<dyn TextureView>> {
        Ok(Arc::new(VulkanTextureView::create(self.ctx.clone(), texture, desc, sampler)?))
    }

    fn create_sampler(&self, desc: &SamplerDesc) -> Result<Arc<dyn Sampler>> {
        Ok(Arc::new(VulkanSampler::create(self.ctx.clone(), desc)?))
    }

    fn create_pipeline(&self, info: &NativePipelineInfo<'_>) -> Result<Arc<dyn NativePipeline>> {
        Ok(Arc::new(VulkanPipeline::create(self.ctx.clone(), info)?))
    }

    fn create_command_recorder(&self) -> Result<Box<dyn CommandRecorder>> {
        Ok(Box::new(self.create_vulkan_recorder()?))
    }

    fn command_queue(&self) -> Arc<dyn CommandQueue> {
        self.queue.clone()
    }

    fn release_queue(&self) -> Arc<ReleaseQueue> {
        self.release_queue.clone()
    }
}

impl Drop for VulkanDevice {
    fn drop(&mut self) {
        if let Err(e) = self.queue.wait_idle() {
            engine_error!("galaxy3d::vulkan", "Failed to wait for the queue before device drop: {}", e);
        }
        // Retired descriptor sets go back to their pools before the pools are destroyed
        self.release_queue.release_all();
    }
}
