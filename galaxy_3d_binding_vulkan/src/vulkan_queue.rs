/// VulkanQueue - Vulkan implementation of the CommandQueue trait
///
/// Fence values are the values of one timeline semaphore: submission N signals N,
/// and the semaphore counter is the last completed value.

use ash::vk;
use galaxy_3d_binding::galaxy3d::device::{CommandQueue, CommandRecorder};
use galaxy_3d_binding::galaxy3d::Result;
use galaxy_3d_binding::{engine_bail, engine_err, engine_trace};
use std::sync::{Arc, Mutex, PoisonError};

use crate::vulkan_command_recorder::VulkanCommandRecorder;
use crate::vulkan_context::GpuContext;

pub struct VulkanQueue {
    ctx: Arc<GpuContext>,
    timeline: vk::Semaphore,
    /// Value the next submission signals; also serializes `vkQueueSubmit`
    next_value: Mutex<u64>,
}

impl VulkanQueue {
    pub(crate) fn new(ctx: Arc<GpuContext>) -> Result<Self> {
        let mut type_info = vk::SemaphoreTypeCreateInfo::default()
            .semaphore_type(vk::SemaphoreType::TIMELINE)
            .initial_value(0);
        let create_info = vk::SemaphoreCreateInfo::default().push_next(&mut type_info);
        let timeline = unsafe {
            ctx.device
                .create_semaphore(&create_info, None)
                .map_err(|e| engine_err!("galaxy3d::vulkan", "Failed to create timeline semaphore: {:?}", e))?
        };
        Ok(Self {
            ctx,
            timeline,
            next_value: Mutex::new(1),
        })
    }

    pub(crate) fn submit_command_buffer(&self, command_buffer: vk::CommandBuffer) -> Result<u64> {
        let mut next_value = self.next_value.lock().unwrap_or_else(PoisonError::into_inner);
        let value = *next_value;

        let signal_values = [value];
        let signal_semaphores = [self.timeline];
        let command_buffers = [command_buffer];
        let mut timeline_info = vk::TimelineSemaphoreSubmitInfo::default().signal_semaphore_values(&signal_values);
        let submit_info = vk::SubmitInfo::default()
            .command_buffers(&command_buffers)
            .signal_semaphores(&signal_semaphores)
            .push_next(&mut timeline_info);

        unsafe {
            self.ctx
                .device
                .queue_submit(self.ctx.queue, &[submit_info], vk::Fence::null())
                .map_err(|e| engine_err!("galaxy3d::vulkan", "Failed to submit commands to GPU queue: {:?}", e))?;
        }
        *next_value += 1;
        engine_trace!("galaxy3d::vulkan", "Submitted command buffer, fence value {}", value);
        Ok(value)
    }
}

impl CommandQueue for VulkanQueue {
    fn submit(&self, recorder: &mut dyn CommandRecorder) -> Result<u64> {
        let Some(recorder) = recorder.as_any_mut().downcast_mut::<VulkanCommandRecorder>() else {
            engine_bail!("galaxy3d::vulkan", "submit() expects a VulkanCommandRecorder");
        };
        let command_buffer = recorder.submission_buffer()?;
        let value = self.submit_command_buffer(command_buffer)?;
        recorder.mark_submitted(value);
        Ok(value)
    }

    fn next_fence_value(&self) -> u64 {
        *self.next_value.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn completed_fence_value(&self) -> u64 {
        unsafe { self.ctx.device.get_semaphore_counter_value(self.timeline) }.unwrap_or(0)
    }

    fn wait_for_fence(&self, value: u64) -> Result<()> {
        let last_submitted = self.next_fence_value() - 1;
        if value > last_submitted {
            engine_bail!(
                "galaxy3d::vulkan",
                "Cannot wait for fence value {}, last submission signals {}",
                value,
                last_submitted
            );
        }
        let semaphores = [self.timeline];
        let values = [value];
        let wait_info = vk::SemaphoreWaitInfo::default().semaphores(&semaphores).values(&values);
        unsafe {
            self.ctx
                .device
                .wait_semaphores(&wait_info, u64::MAX)
                .map_err(|e| engine_err!("galaxy3d::vulkan", "Failed to wait for fence value {}: {:?}", value, e))
        }
    }

    fn wait_idle(&self) -> Result<()> {
        let _submissions = self.next_value.lock().unwrap_or_else(PoisonError::into_inner);
        unsafe {
            self.ctx
                .device
                .queue_wait_idle(self.ctx.queue)
                .map_err(|e| engine_err!("galaxy3d::vulkan", "Failed to wait for queue idle: {:?}", e))
        }
    }
}

impl Drop for VulkanQueue {
    fn drop(&mut self) {
        unsafe {
            let _ = self.ctx.device.queue_wait_idle(self.ctx.queue);
            self.ctx.device.destroy_semaphore(self.timeline, None);
        }
    }
}
