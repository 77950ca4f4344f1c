/// GpuContext - Shared GPU state for all Vulkan objects
///
/// Buffers, textures, views, samplers, pipelines, descriptor pools and the queue
/// hold an `Arc<GpuContext>`. The device and the instance are destroyed when the
/// last of them is dropped, so no object can outlive the device it was created on.

use ash::vk;
use galaxy_3d_binding::engine_trace;
use gpu_allocator::vulkan::Allocator;
use std::mem::ManuallyDrop;
use std::sync::{Arc, Mutex};

/// Shared GPU context
pub struct GpuContext {
    /// Vulkan logical device
    pub device: ash::Device,

    /// GPU memory allocator (shared, requires mutex for thread safety)
    /// Wrapped in ManuallyDrop so it is dropped BEFORE the device is destroyed
    pub allocator: ManuallyDrop<Arc<Mutex<Allocator>>>,

    /// Queue used for graphics, compute and copies
    pub queue: vk::Queue,

    /// Family of `queue`
    pub queue_family: u32,

    pub physical_device: vk::PhysicalDevice,

    /// Limits of the physical device (alignments, max bound sets)
    pub limits: vk::PhysicalDeviceLimits,

    instance: ash::Instance,

    /// Kept alive until the instance is destroyed
    _entry: ash::Entry,

    /// Debug utils loader (validation only)
    debug_utils_loader: Option<ash::ext::debug_utils::Instance>,

    /// Debug messenger handle (validation only)
    debug_messenger: Option<vk::DebugUtilsMessengerEXT>,
}

impl GpuContext {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        entry: ash::Entry,
        instance: ash::Instance,
        physical_device: vk::PhysicalDevice,
        device: ash::Device,
        allocator: Allocator,
        queue: vk::Queue,
        queue_family: u32,
        debug_utils_loader: Option<ash::ext::debug_utils::Instance>,
        debug_messenger: Option<vk::DebugUtilsMessengerEXT>,
    ) -> Self {
        let limits = unsafe { instance.get_physical_device_properties(physical_device).limits };
        Self {
            device,
            allocator: ManuallyDrop::new(Arc::new(Mutex::new(allocator))),
            queue,
            queue_family,
            physical_device,
            limits,
            instance,
            _entry: entry,
            debug_utils_loader,
            debug_messenger,
        }
    }
}

impl Drop for GpuContext {
    fn drop(&mut self) {
        unsafe {
            let _ = self.device.device_wait_idle();

            // Allocator must release its memory blocks while the device is alive
            ManuallyDrop::drop(&mut self.allocator);

            self.device.destroy_device(None);

            // Print validation statistics before the messenger goes away
            if self.debug_messenger.is_some() {
                crate::debug::log_validation_stats_report();
            }
            if let (Some(loader), Some(messenger)) = (&self.debug_utils_loader, self.debug_messenger) {
                loader.destroy_debug_utils_messenger(messenger, None);
            }

            self.instance.destroy_instance(None);
        }
        engine_trace!("galaxy3d::vulkan", "GPU context destroyed");
    }
}
