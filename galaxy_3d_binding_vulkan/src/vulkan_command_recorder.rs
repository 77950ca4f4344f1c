/// VulkanCommandRecorder - Vulkan implementation of the CommandRecorder trait
///
/// Records into a small ring of command buffers so a new recording can start
/// while the previous submissions are still executing. Descriptor sets are
/// written once and reused until their contents change; replaced sets are
/// handed back as stale objects and freed when their submission completes.
/// The device objects referenced by bound sets and index buffers are handed
/// back with them, so they outlive the commands that use them.

use ash::vk;
use ash::vk::Handle;
use galaxy_3d_binding::galaxy3d::binding::{CachedResource, DescriptorKind};
use galaxy_3d_binding::galaxy3d::device::{
    CommandQueue, CommandRecorder, DescriptorSetCommit, DeviceObject, DispatchAttribs, DrawAttribs,
    DrawIndexedAttribs, IndexType, NativeHandle, NativePipeline, ResourceState, SlotBinding, StaleObject,
    StateTransition, TextureView, TransitionTarget,
};
use galaxy_3d_binding::galaxy3d::{Error, Result};
use galaxy_3d_binding::{engine_bail, engine_err, engine_error, engine_warn};
use std::any::Any;
use std::sync::Arc;

use crate::vulkan_context::GpuContext;
use crate::vulkan_descriptor_pool::{DescriptorPoolManager, RetiredDescriptorSet};
use crate::vulkan_format::{descriptor_image_layout, descriptor_type_to_vk, format_aspect, resource_state_to_vk};
use crate::vulkan_pipeline::VulkanPipeline;
use crate::vulkan_queue::VulkanQueue;

/// Command buffers in flight per recorder
pub const RECORDER_BUFFER_COUNT: usize = 3;

// ============================================================================
// Descriptor writes
// ============================================================================

/// Contents of one descriptor
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DescriptorInfo {
    Buffer {
        buffer: vk::Buffer,
        offset: u64,
        range: u64,
    },
    Image {
        view: vk::ImageView,
        sampler: vk::Sampler,
        layout: vk::ImageLayout,
    },
    Sampler(vk::Sampler),
    TexelBuffer(vk::BufferView),
    AccelStruct(vk::AccelerationStructureKHR),
}

/// One array element to write
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DescriptorWrite {
    pub binding: u32,
    pub array_element: u32,
    pub descriptor_type: vk::DescriptorType,
    pub info: DescriptorInfo,
}

fn whole_or(size: u64) -> u64 {
    if size == 0 {
        vk::WHOLE_SIZE
    } else {
        size
    }
}

/// Buffer range of a cached buffer or buffer view
///
/// Dynamic descriptors start at offset 0: their bound offset is part of the
/// dynamic offset passed at bind time.
fn buffer_info(resource: &CachedResource, dynamic: bool) -> Option<DescriptorInfo> {
    match resource.object()? {
        DeviceObject::Buffer(buffer) => Some(DescriptorInfo::Buffer {
            buffer: vk::Buffer::from_raw(buffer.native_handle().0),
            offset: if dynamic { 0 } else { resource.buffer_offset() },
            range: whole_or(resource.buffer_size()),
        }),
        DeviceObject::BufferView(view) => Some(DescriptorInfo::Buffer {
            buffer: vk::Buffer::from_raw(view.buffer().native_handle().0),
            offset: view.desc().byte_offset,
            range: whole_or(view.desc().byte_width),
        }),
        _ => None,
    }
}

/// Descriptors to write for a set, one per bound array element
///
/// Unbound elements and immutable samplers are left out.
pub fn descriptor_writes(commit: &DescriptorSetCommit<'_>) -> Vec<DescriptorWrite> {
    let mut writes = Vec::new();
    for binding in &commit.layout.bindings {
        let kind = binding.descriptor_kind;
        let has_immutable_samplers = !binding.immutable_samplers.is_empty();
        if kind == DescriptorKind::Sampler && has_immutable_samplers {
            continue;
        }
        for elem in 0..binding.array_size {
            let Some(resource) = commit.resources.get((binding.cache_offset + elem) as usize) else {
                continue;
            };
            if !resource.is_bound() {
                continue;
            }
            let info = match kind {
                DescriptorKind::UniformBuffer
                | DescriptorKind::StorageBuffer
                | DescriptorKind::StorageBufferReadOnly => buffer_info(resource, false),
                DescriptorKind::UniformBufferDynamic
                | DescriptorKind::StorageBufferDynamic
                | DescriptorKind::StorageBufferDynamicReadOnly => buffer_info(resource, true),
                DescriptorKind::UniformTexelBuffer | DescriptorKind::StorageTexelBuffer => {
                    Some(DescriptorInfo::TexelBuffer(vk::BufferView::from_raw(resource.handle().0)))
                }
                DescriptorKind::SeparateImage
                | DescriptorKind::StorageImage
                | DescriptorKind::InputAttachment
                | DescriptorKind::InputAttachmentGeneral => Some(DescriptorInfo::Image {
                    view: vk::ImageView::from_raw(resource.handle().0),
                    sampler: vk::Sampler::null(),
                    layout: descriptor_image_layout(kind),
                }),
                DescriptorKind::CombinedImageSampler => {
                    let sampler = if has_immutable_samplers {
                        vk::Sampler::null()
                    } else {
                        vk::Sampler::from_raw(resource.view_sampler_handle().0)
                    };
                    Some(DescriptorInfo::Image {
                        view: vk::ImageView::from_raw(resource.handle().0),
                        sampler,
                        layout: descriptor_image_layout(kind),
                    })
                }
                DescriptorKind::Sampler => Some(DescriptorInfo::Sampler(vk::Sampler::from_raw(resource.handle().0))),
                DescriptorKind::AccelerationStructure => Some(DescriptorInfo::AccelStruct(
                    vk::AccelerationStructureKHR::from_raw(resource.handle().0),
                )),
            };
            if let Some(info) = info {
                writes.push(DescriptorWrite {
                    binding: binding.binding,
                    array_element: elem,
                    descriptor_type: descriptor_type_to_vk(kind),
                    info,
                });
            }
        }
    }
    writes
}

// ============================================================================
// Recorder
// ============================================================================

struct CommandSlot {
    command_buffer: vk::CommandBuffer,
    /// Fence value of the last submission of this buffer, 0 if never submitted
    fence_value: u64,
}

pub struct VulkanCommandRecorder {
    ctx: Arc<GpuContext>,
    queue: Arc<VulkanQueue>,
    descriptor_pools: Arc<DescriptorPoolManager>,
    command_pool: vk::CommandPool,
    slots: Vec<CommandSlot>,
    current: usize,
    recording: bool,
    /// Ended and not yet submitted
    ready: bool,
    rendering: bool,
    stale: Vec<StaleObject>,
    /// Device objects referenced by the current recording
    retained: Vec<DeviceObject>,
}

impl VulkanCommandRecorder {
    pub(crate) fn new(
        ctx: Arc<GpuContext>,
        queue: Arc<VulkanQueue>,
        descriptor_pools: Arc<DescriptorPoolManager>,
    ) -> Result<Self> {
        unsafe {
            let pool_info = vk::CommandPoolCreateInfo::default()
                .queue_family_index(ctx.queue_family)
                .flags(vk::CommandPoolCreateFlags::RESET_COMMAND_BUFFER);
            let command_pool = ctx.device.create_command_pool(&pool_info, None).map_err(|e| {
                engine_error!("galaxy3d::vulkan", "Failed to create command pool: {:?}", e);
                Error::BackendError(format!("Failed to create command pool: {:?}", e))
            })?;

            let allocate_info = vk::CommandBufferAllocateInfo::default()
                .command_pool(command_pool)
                .level(vk::CommandBufferLevel::PRIMARY)
                .command_buffer_count(RECORDER_BUFFER_COUNT as u32);
            let command_buffers = match ctx.device.allocate_command_buffers(&allocate_info) {
                Ok(buffers) => buffers,
                Err(e) => {
                    ctx.device.destroy_command_pool(command_pool, None);
                    return Err(engine_err!("galaxy3d::vulkan", "Failed to allocate command buffers: {:?}", e));
                }
            };

            Ok(Self {
                ctx,
                queue,
                descriptor_pools,
                command_pool,
                slots: command_buffers
                    .into_iter()
                    .map(|command_buffer| CommandSlot {
                        command_buffer,
                        fence_value: 0,
                    })
                    .collect(),
                current: RECORDER_BUFFER_COUNT - 1,
                recording: false,
                ready: false,
                rendering: false,
                stale: Vec::new(),
                retained: Vec::new(),
            })
        }
    }

    fn command_buffer(&self) -> vk::CommandBuffer {
        self.slots[self.current].command_buffer
    }

    /// Command buffer to submit; fails unless a recording was ended and not submitted yet
    pub(crate) fn submission_buffer(&self) -> Result<vk::CommandBuffer> {
        if !self.ready {
            engine_bail!("galaxy3d::vulkan", "Cannot submit a command buffer that is still recording or empty");
        }
        Ok(self.command_buffer())
    }

    pub(crate) fn mark_submitted(&mut self, fence_value: u64) {
        self.slots[self.current].fence_value = fence_value;
        self.ready = false;
    }

    pub fn is_recording(&self) -> bool {
        self.recording
    }

    /// Start rendering into `targets` (color attachments, cleared to `clear_color`)
    ///
    /// Draws are only recorded between `begin_rendering` and `end_rendering`.
    pub fn begin_rendering(
        &mut self,
        targets: &[Arc<dyn TextureView>],
        width: u32,
        height: u32,
        clear_color: [f32; 4],
    ) -> Result<()> {
        if !self.recording {
            engine_bail!("galaxy3d::vulkan", "begin_rendering() called outside a recording");
        }
        if self.rendering {
            engine_bail!("galaxy3d::vulkan", "begin_rendering() called while already rendering");
        }

        // Render targets are moved to the attachment layout here
        let transitions: Vec<StateTransition> = targets
            .iter()
            .filter(|view| view.texture().state() != ResourceState::RENDER_TARGET)
            .map(|view| StateTransition {
                target: TransitionTarget::Texture(view.texture().clone()),
                old_state: view.texture().state(),
                new_state: ResourceState::RENDER_TARGET,
            })
            .collect();
        self.transition(&transitions);
        for view in targets {
            view.texture().set_state(ResourceState::RENDER_TARGET);
            self.retained.push(DeviceObject::TextureView(view.clone()));
        }

        let attachments: Vec<vk::RenderingAttachmentInfo<'_>> = targets
            .iter()
            .map(|view| {
                vk::RenderingAttachmentInfo::default()
                    .image_view(vk::ImageView::from_raw(view.native_handle().0))
                    .image_layout(vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL)
                    .load_op(vk::AttachmentLoadOp::CLEAR)
                    .store_op(vk::AttachmentStoreOp::STORE)
                    .clear_value(vk::ClearValue {
                        color: vk::ClearColorValue { float32: clear_color },
                    })
            })
            .collect();
        let area = vk::Rect2D {
            offset: vk::Offset2D { x: 0, y: 0 },
            extent: vk::Extent2D { width, height },
        };
        let rendering_info = vk::RenderingInfo::default()
            .render_area(area)
            .layer_count(1)
            .color_attachments(&attachments);

        let command_buffer = self.command_buffer();
        unsafe {
            self.ctx.device.cmd_begin_rendering(command_buffer, &rendering_info);
            self.ctx.device.cmd_set_viewport(
                command_buffer,
                0,
                &[vk::Viewport {
                    x: 0.0,
                    y: 0.0,
                    width: width as f32,
                    height: height as f32,
                    min_depth: 0.0,
                    max_depth: 1.0,
                }],
            );
            self.ctx.device.cmd_set_scissor(command_buffer, 0, &[area]);
        }
        self.rendering = true;
        Ok(())
    }

    pub fn end_rendering(&mut self) {
        if self.rendering {
            unsafe { self.ctx.device.cmd_end_rendering(self.command_buffer()) };
            self.rendering = false;
        }
    }

    fn write_descriptor_set(&mut self, set: vk::DescriptorSet, writes: &[DescriptorWrite]) {
        // Infos are referenced by pointer, so they are all built before the writes
        let mut vk_writes: Vec<vk::WriteDescriptorSet<'_>> = Vec::with_capacity(writes.len());
        let mut accel_writes: Vec<(u32, u32, vk::AccelerationStructureKHR)> = Vec::new();
        let buffer_infos: Vec<vk::DescriptorBufferInfo> = writes
            .iter()
            .map(|w| match w.info {
                DescriptorInfo::Buffer { buffer, offset, range } => vk::DescriptorBufferInfo { buffer, offset, range },
                _ => vk::DescriptorBufferInfo::default(),
            })
            .collect();
        let image_infos: Vec<vk::DescriptorImageInfo> = writes
            .iter()
            .map(|w| match w.info {
                DescriptorInfo::Image { view, sampler, layout } => vk::DescriptorImageInfo {
                    sampler,
                    image_view: view,
                    image_layout: layout,
                },
                DescriptorInfo::Sampler(sampler) => vk::DescriptorImageInfo {
                    sampler,
                    ..Default::default()
                },
                _ => vk::DescriptorImageInfo::default(),
            })
            .collect();
        let texel_views: Vec<vk::BufferView> = writes
            .iter()
            .map(|w| match w.info {
                DescriptorInfo::TexelBuffer(view) => view,
                _ => vk::BufferView::null(),
            })
            .collect();

        for (index, write) in writes.iter().enumerate() {
            let vk_write = vk::WriteDescriptorSet::default()
                .dst_set(set)
                .dst_binding(write.binding)
                .dst_array_element(write.array_element)
                .descriptor_type(write.descriptor_type);
            let vk_write = match write.info {
                DescriptorInfo::Buffer { .. } => vk_write.buffer_info(std::slice::from_ref(&buffer_infos[index])),
                DescriptorInfo::Image { .. } | DescriptorInfo::Sampler(_) => {
                    vk_write.image_info(std::slice::from_ref(&image_infos[index]))
                }
                DescriptorInfo::TexelBuffer(_) => vk_write.texel_buffer_view(std::slice::from_ref(&texel_views[index])),
                DescriptorInfo::AccelStruct(accel) => {
                    accel_writes.push((write.binding, write.array_element, accel));
                    continue;
                }
            };
            vk_writes.push(vk_write);
        }

        unsafe {
            self.ctx.device.update_descriptor_sets(&vk_writes, &[]);
        }

        for (binding, array_element, accel) in accel_writes {
            self.write_acceleration_structure(set, binding, array_element, accel);
        }
    }

    fn write_acceleration_structure(
        &mut self,
        set: vk::DescriptorSet,
        binding: u32,
        array_element: u32,
        accel: vk::AccelerationStructureKHR,
    ) {
        let structures = [accel];
        let mut accel_info =
            vk::WriteDescriptorSetAccelerationStructureKHR::default().acceleration_structures(&structures);
        let mut write = vk::WriteDescriptorSet::default()
            .dst_set(set)
            .dst_binding(binding)
            .dst_array_element(array_element)
            .descriptor_type(vk::DescriptorType::ACCELERATION_STRUCTURE_KHR)
            .push_next(&mut accel_info);
        write.descriptor_count = 1;
        unsafe {
            self.ctx.device.update_descriptor_sets(&[write], &[]);
        }
    }
}

impl CommandRecorder for VulkanCommandRecorder {
    fn begin(&mut self) -> Result<()> {
        if self.recording {
            engine_bail!("galaxy3d::vulkan", "begin() called while already recording");
        }

        let next = (self.current + 1) % self.slots.len();
        let pending = self.slots[next].fence_value;
        if pending > self.queue.completed_fence_value() {
            self.queue.wait_for_fence(pending)?;
        }
        self.current = next;

        unsafe {
            let command_buffer = self.command_buffer();
            self.ctx
                .device
                .reset_command_buffer(command_buffer, vk::CommandBufferResetFlags::empty())
                .map_err(|e| engine_err!("galaxy3d::vulkan", "Failed to reset command buffer: {:?}", e))?;
            let begin_info =
                vk::CommandBufferBeginInfo::default().flags(vk::CommandBufferUsageFlags::ONE_TIME_SUBMIT);
            self.ctx
                .device
                .begin_command_buffer(command_buffer, &begin_info)
                .map_err(|e| engine_err!("galaxy3d::vulkan", "Failed to begin command buffer: {:?}", e))?;
        }

        self.recording = true;
        self.ready = false;
        Ok(())
    }

    fn end(&mut self) -> Result<()> {
        if !self.recording {
            engine_bail!("galaxy3d::vulkan", "end() called without begin()");
        }
        if self.rendering {
            engine_warn!("galaxy3d::vulkan", "Command buffer ended inside a rendering scope, closing it");
            self.end_rendering();
        }
        unsafe {
            self.ctx
                .device
                .end_command_buffer(self.command_buffer())
                .map_err(|e| engine_err!("galaxy3d::vulkan", "Failed to end command buffer: {:?}", e))?;
        }
        self.recording = false;
        self.ready = true;
        Ok(())
    }

    fn bind_pipeline(&mut self, pipeline: &dyn NativePipeline) {
        let Some(pipeline) = pipeline.as_any().downcast_ref::<VulkanPipeline>() else {
            engine_error!("galaxy3d::vulkan", "Pipeline '{}' was not created by the Vulkan device", pipeline.name());
            return;
        };
        unsafe {
            self.ctx
                .device
                .cmd_bind_pipeline(self.command_buffer(), pipeline.bind_point(), pipeline.pipeline);
        }
    }

    fn transition(&mut self, barriers: &[StateTransition]) {
        if barriers.is_empty() {
            return;
        }
        let mut src_stages = vk::PipelineStageFlags::empty();
        let mut dst_stages = vk::PipelineStageFlags::empty();
        let mut memory_barriers = Vec::new();
        let mut buffer_barriers = Vec::new();
        let mut image_barriers = Vec::new();

        for barrier in barriers {
            let (src_access, src_stage, old_layout) = resource_state_to_vk(barrier.old_state);
            let (dst_access, dst_stage, new_layout) = resource_state_to_vk(barrier.new_state);
            src_stages |= src_stage;
            dst_stages |= dst_stage;

            match &barrier.target {
                TransitionTarget::Buffer(buffer) => buffer_barriers.push(
                    vk::BufferMemoryBarrier::default()
                        .src_access_mask(src_access)
                        .dst_access_mask(dst_access)
                        .src_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
                        .dst_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
                        .buffer(vk::Buffer::from_raw(buffer.native_handle().0))
                        .offset(0)
                        .size(vk::WHOLE_SIZE),
                ),
                TransitionTarget::Texture(texture) => image_barriers.push(
                    vk::ImageMemoryBarrier::default()
                        .src_access_mask(src_access)
                        .dst_access_mask(dst_access)
                        .old_layout(old_layout)
                        .new_layout(new_layout)
                        .src_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
                        .dst_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
                        .image(vk::Image::from_raw(texture.native_handle().0))
                        .subresource_range(vk::ImageSubresourceRange {
                            aspect_mask: format_aspect(texture.desc().format),
                            base_mip_level: 0,
                            level_count: vk::REMAINING_MIP_LEVELS,
                            base_array_layer: 0,
                            layer_count: vk::REMAINING_ARRAY_LAYERS,
                        }),
                ),
                TransitionTarget::Tlas(_) => memory_barriers.push(
                    vk::MemoryBarrier::default()
                        .src_access_mask(src_access)
                        .dst_access_mask(dst_access),
                ),
            }
        }

        unsafe {
            self.ctx.device.cmd_pipeline_barrier(
                self.command_buffer(),
                src_stages,
                dst_stages,
                vk::DependencyFlags::empty(),
                &memory_barriers,
                &buffer_barriers,
                &image_barriers,
            );
        }
    }

    fn bind_slots(&mut self, binding: &SlotBinding) {
        engine_error!(
            "galaxy3d::vulkan",
            "Flat slot binding ({} {}) is not supported by the Vulkan device, use descriptor sets",
            binding.stage.name(),
            binding.range_name
        );
    }

    fn bind_descriptor_set(&mut self, pipeline: &dyn NativePipeline, commit: &DescriptorSetCommit<'_>) -> Result<NativeHandle> {
        if !self.recording {
            engine_bail!("galaxy3d::vulkan", "bind_descriptor_set() called outside a recording");
        }
        let Some(pipeline) = pipeline.as_any().downcast_ref::<VulkanPipeline>() else {
            engine_bail!("galaxy3d::vulkan", "Pipeline '{}' was not created by the Vulkan device", pipeline.name());
        };
        if commit.dynamic_offsets.len() as u32 != commit.layout.dynamic_buffer_count {
            engine_bail!(
                "galaxy3d::vulkan",
                "Set {} of pipeline '{}' expects {} dynamic offsets, got {}",
                commit.set_index,
                pipeline.name(),
                commit.layout.dynamic_buffer_count,
                commit.dynamic_offsets.len()
            );
        }

        let set = if commit.dirty || commit.existing.is_null() {
            let Some(layout) = pipeline.set_layout(commit.set_index) else {
                engine_bail!(
                    "galaxy3d::vulkan",
                    "Pipeline '{}' has no descriptor set layout {}",
                    pipeline.name(),
                    commit.set_index
                );
            };
            let set = self.descriptor_pools.allocate(layout)?;
            self.write_descriptor_set(set, &descriptor_writes(commit));
            if !commit.existing.is_null() {
                self.stale.push(Box::new(RetiredDescriptorSet {
                    manager: self.descriptor_pools.clone(),
                    set: vk::DescriptorSet::from_raw(commit.existing.0),
                }));
            }
            set
        } else {
            vk::DescriptorSet::from_raw(commit.existing.0)
        };
        self.retained.extend(commit.referenced_objects().cloned());

        unsafe {
            self.ctx.device.cmd_bind_descriptor_sets(
                self.command_buffer(),
                pipeline.bind_point(),
                pipeline.pipeline_layout,
                commit.set_index,
                &[set],
                &commit.dynamic_offsets,
            );
        }
        Ok(NativeHandle(set.as_raw()))
    }

    fn draw(&mut self, attribs: &DrawAttribs) {
        if !self.rendering {
            engine_error!("galaxy3d::vulkan", "Draw skipped: no rendering scope is active (call begin_rendering)");
            return;
        }
        unsafe {
            self.ctx.device.cmd_draw(
                self.command_buffer(),
                attribs.num_vertices,
                attribs.num_instances,
                attribs.first_vertex,
                attribs.first_instance,
            );
        }
    }

    fn draw_indexed(&mut self, attribs: &DrawIndexedAttribs) {
        if !self.rendering {
            engine_error!("galaxy3d::vulkan", "DrawIndexed skipped: no rendering scope is active (call begin_rendering)");
            return;
        }
        let index_type = match attribs.index_type {
            IndexType::U16 => vk::IndexType::UINT16,
            IndexType::U32 => vk::IndexType::UINT32,
        };
        self.retained.push(DeviceObject::Buffer(attribs.index_buffer.clone()));
        unsafe {
            let command_buffer = self.command_buffer();
            self.ctx.device.cmd_bind_index_buffer(
                command_buffer,
                vk::Buffer::from_raw(attribs.index_buffer.native_handle().0),
                0,
                index_type,
            );
            self.ctx.device.cmd_draw_indexed(
                command_buffer,
                attribs.num_indices,
                attribs.num_instances,
                attribs.first_index,
                attribs.base_vertex,
                attribs.first_instance,
            );
        }
    }

    fn dispatch(&mut self, attribs: &DispatchAttribs) {
        if self.rendering {
            engine_error!("galaxy3d::vulkan", "Dispatch skipped: not allowed inside a rendering scope");
            return;
        }
        unsafe {
            self.ctx.device.cmd_dispatch(
                self.command_buffer(),
                attribs.group_count_x,
                attribs.group_count_y,
                attribs.group_count_z,
            );
        }
    }

    fn take_stale_objects(&mut self) -> Vec<StaleObject> {
        let mut stale = std::mem::take(&mut self.stale);
        if !self.retained.is_empty() {
            stale.push(Box::new(std::mem::take(&mut self.retained)));
        }
        stale
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

impl Drop for VulkanCommandRecorder {
    fn drop(&mut self) {
        // Buffers of this pool may still be executing
        let last = self.slots.iter().map(|slot| slot.fence_value).max().unwrap_or(0);
        if last > self.queue.completed_fence_value() {
            if let Err(err) = self.queue.wait_for_fence(last) {
                engine_error!("galaxy3d::vulkan", "Recorder dropped while its commands execute: {}", err);
            }
        }
        unsafe {
            self.ctx.device.destroy_command_pool(self.command_pool, None);
        }
    }
}

#[cfg(test)]
#[path = "vulkan_command_recorder_tests.rs"]
mod tests;
