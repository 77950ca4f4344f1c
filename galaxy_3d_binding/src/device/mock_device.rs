//! Mock device for tests (no GPU required)
//!
//! Every object gets a unique non-null native handle. Recorders append one string per
//! command to a log shared with the device, so tests can assert on what a commit
//! or draw produced.

use std::any::Any;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use crate::binding::{PipelineType, SamplerDesc};
use crate::device::command::{
    CommandQueue, CommandRecorder, DescriptorSetCommit, DispatchAttribs, DrawAttribs, DrawIndexedAttribs,
    SlotBinding, StateTransition,
};
use crate::device::object::{
    BindFlags, Buffer, BufferDesc, BufferMode, BufferView, BufferViewDesc, BufferViewType, DeviceObject, NativeHandle,
    ResourceDimension, ResourceState, Sampler, StateTracker, Texture, TextureDesc, TextureView, TextureViewDesc,
    TextureViewType, TopLevelAS, Usage,
};
use crate::device::release_queue::{ReleaseQueue, StaleObject};
use crate::device::render_device::{NativePipeline, NativePipelineInfo, PipelineLayoutInfo, RenderDevice};
use crate::engine_bail;
use crate::error::Result;

type CommandLog = Arc<Mutex<Vec<String>>>;
type SlotLog = Arc<Mutex<Vec<SlotBinding>>>;

fn push(log: &CommandLog, command: String) {
    log.lock().unwrap_or_else(PoisonError::into_inner).push(command);
}

// ============================================================================
// Mock objects
// ============================================================================

pub struct MockBuffer {
    desc: BufferDesc,
    handle: NativeHandle,
    state: StateTracker,
}

impl Buffer for MockBuffer {
    fn desc(&self) -> &BufferDesc {
        &self.desc
    }
    fn native_handle(&self) -> NativeHandle {
        self.handle
    }
    fn state(&self) -> ResourceState {
        self.state.get()
    }
    fn set_state(&self, state: ResourceState) {
        self.state.set(state)
    }
}

pub struct MockBufferView {
    desc: BufferViewDesc,
    buffer: Arc<dyn Buffer>,
    handle: NativeHandle,
}

impl BufferView for MockBufferView {
    fn desc(&self) -> &BufferViewDesc {
        &self.desc
    }
    fn buffer(&self) -> &Arc<dyn Buffer> {
        &self.buffer
    }
    fn native_handle(&self) -> NativeHandle {
        self.handle
    }
}

pub struct MockTexture {
    desc: TextureDesc,
    handle: NativeHandle,
    state: StateTracker,
}

impl Texture for MockTexture {
    fn desc(&self) -> &TextureDesc {
        &self.desc
    }
    fn native_handle(&self) -> NativeHandle {
        self.handle
    }
    fn state(&self) -> ResourceState {
        self.state.get()
    }
    fn set_state(&self, state: ResourceState) {
        self.state.set(state)
    }
}

pub struct MockTextureView {
    desc: TextureViewDesc,
    texture: Arc<dyn Texture>,
    sampler: Option<Arc<dyn Sampler>>,
    handle: NativeHandle,
}

impl TextureView for MockTextureView {
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
        self.handle
    }
}

pub struct MockSampler {
    desc: SamplerDesc,
    handle: NativeHandle,
}

impl Sampler for MockSampler {
    fn desc(&self) -> &SamplerDesc {
        &self.desc
    }
    fn native_handle(&self) -> NativeHandle {
        self.handle
    }
}

pub struct MockTlas {
    name: String,
    handle: NativeHandle,
    state: StateTracker,
}

impl TopLevelAS for MockTlas {
    fn name(&self) -> &str {
        &self.name
    }
    fn native_handle(&self) -> NativeHandle {
        self.handle
    }
    fn state(&self) -> ResourceState {
        self.state.get()
    }
    fn set_state(&self, state: ResourceState) {
        self.state.set(state)
    }
}

pub struct MockPipeline {
    pub name: String,
    pub pipeline_type: PipelineType,
    pub layout: PipelineLayoutInfo,
    handle: NativeHandle,
}

impl NativePipeline for MockPipeline {
    fn name(&self) -> &str {
        &self.name
    }
    fn pipeline_type(&self) -> PipelineType {
        self.pipeline_type
    }
    fn native_handle(&self) -> NativeHandle {
        self.handle
    }
    fn as_any(&self) -> &dyn Any {
        self
    }
}

// ============================================================================
// MockRecorder
// ============================================================================

/// Records commands as strings such as `"bind_slots:Pixel:SRV:0:2"`
pub struct MockRecorder {
    log: CommandLog,
    slot_log: SlotLog,
    handles: Arc<AtomicU64>,
    stale: Vec<StaleObject>,
    /// Objects referenced by the current recording
    retained: Vec<DeviceObject>,
    recording: bool,
}

impl MockRecorder {
    pub fn is_recording(&self) -> bool {
        self.recording
    }
}

impl CommandRecorder for MockRecorder {
    fn begin(&mut self) -> Result<()> {
        if self.recording {
            engine_bail!("galaxy3d::MockRecorder", "begin() called while already recording");
        }
        self.recording = true;
        push(&self.log, "begin".to_string());
        Ok(())
    }

    fn end(&mut self) -> Result<()> {
        if !self.recording {
            engine_bail!("galaxy3d::MockRecorder", "end() called without begin()");
        }
        self.recording = false;
        push(&self.log, "end".to_string());
        Ok(())
    }

    fn bind_pipeline(&mut self, pipeline: &dyn NativePipeline) {
        push(&self.log, format!("bind_pipeline:{}", pipeline.name()));
    }

    fn transition(&mut self, barriers: &[StateTransition]) {
        for barrier in barriers {
            push(
                &self.log,
                format!("transition:{}:{:?}->{:?}", barrier.target.name(), barrier.old_state, barrier.new_state),
            );
        }
    }

    fn bind_slots(&mut self, binding: &SlotBinding) {
        push(
            &self.log,
            format!(
                "bind_slots:{}:{}:{}:{}",
                binding.stage.name(),
                binding.range_name,
                binding.first_slot,
                binding.handles.len()
            ),
        );
        self.slot_log.lock().unwrap_or_else(PoisonError::into_inner).push(binding.clone());
    }

    fn bind_descriptor_set(&mut self, _pipeline: &dyn NativePipeline, commit: &DescriptorSetCommit<'_>) -> Result<NativeHandle> {
        let (handle, action) = if commit.dirty || commit.existing.is_null() {
            if !commit.existing.is_null() {
                self.stale.push(Box::new(commit.existing));
            }
            (NativeHandle(self.handles.fetch_add(1, Ordering::Relaxed)), "write")
        } else {
            (commit.existing, "reuse")
        };
        self.retained.extend(commit.referenced_objects().cloned());
        push(
            &self.log,
            format!(
                "bind_descriptor_set:{}:{}:{}",
                commit.set_index,
                action,
                commit.dynamic_offsets.len()
            ),
        );
        Ok(handle)
    }

    fn draw(&mut self, attribs: &DrawAttribs) {
        push(&self.log, format!("draw:{}", attribs.num_vertices));
    }

    fn draw_indexed(&mut self, attribs: &DrawIndexedAttribs) {
        self.retained.push(DeviceObject::Buffer(attribs.index_buffer.clone()));
        push(&self.log, format!("draw_indexed:{}", attribs.num_indices));
    }

    fn dispatch(&mut self, attribs: &DispatchAttribs) {
        push(
            &self.log,
            format!("dispatch:{}x{}x{}", attribs.group_count_x, attribs.group_count_y, attribs.group_count_z),
        );
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

// ============================================================================
// MockQueue
// ============================================================================

/// Queue whose fences complete only when waited on or signaled explicitly
pub struct MockQueue {
    log: CommandLog,
    next_fence: AtomicU64,
    completed_fence: AtomicU64,
}

impl MockQueue {
    /// Pretend the GPU finished every submission up to `value`
    pub fn signal(&self, value: u64) {
        self.completed_fence.fetch_max(value, Ordering::AcqRel);
    }
}

impl CommandQueue for MockQueue {
    fn submit(&self, recorder: &mut dyn CommandRecorder) -> Result<u64> {
        let recorder = match recorder.as_any_mut().downcast_mut::<MockRecorder>() {
            Some(recorder) => recorder,
            None => engine_bail!("galaxy3d::MockQueue", "submit() expects a MockRecorder"),
        };
        if recorder.is_recording() {
            engine_bail!("galaxy3d::MockQueue", "Cannot submit a command buffer that is still recording");
        }
        let fence = self.next_fence.fetch_add(1, Ordering::AcqRel);
        push(&self.log, format!("submit:{}", fence));
        Ok(fence)
    }

    fn next_fence_value(&self) -> u64 {
        self.next_fence.load(Ordering::Acquire)
    }

    fn completed_fence_value(&self) -> u64 {
        self.completed_fence.load(Ordering::Acquire)
    }

    fn wait_for_fence(&self, value: u64) -> Result<()> {
        let last_submitted = self.next_fence_value() - 1;
        self.signal(value.min(last_submitted));
        Ok(())
    }

    fn wait_idle(&self) -> Result<()> {
        self.signal(self.next_fence_value() - 1);
        Ok(())
    }
}

// ============================================================================
// MockDevice
// ============================================================================

/// GPU-less `RenderDevice`
pub struct MockDevice {
    handles: Arc<AtomicU64>,
    log: CommandLog,
    slot_log: SlotLog,
    queue: Arc<MockQueue>,
    release_queue: Arc<ReleaseQueue>,
    pipelines_created: AtomicU64,
}

impl MockDevice {
    pub fn new() -> Self {
        let log: CommandLog = Arc::new(Mutex::new(Vec::new()));
        Self {
            handles: Arc::new(AtomicU64::new(1)),
            queue: Arc::new(MockQueue {
                log: log.clone(),
                next_fence: AtomicU64::new(1),
                completed_fence: AtomicU64::new(0),
            }),
            log,
            slot_log: Arc::new(Mutex::new(Vec::new())),
            release_queue: Arc::new(ReleaseQueue::new()),
            pipelines_created: AtomicU64::new(0),
        }
    }

    fn next_handle(&self) -> NativeHandle {
        NativeHandle(self.handles.fetch_add(1, Ordering::Relaxed))
    }

    /// Commands recorded so far by every recorder of this device
    pub fn commands(&self) -> Vec<String> {
        self.log.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Recorded commands starting with `prefix`
    pub fn commands_with_prefix(&self, prefix: &str) -> Vec<String> {
        self.commands().into_iter().filter(|c| c.starts_with(prefix)).collect()
    }

    pub fn clear_commands(&self) {
        self.log.lock().unwrap_or_else(PoisonError::into_inner).clear();
        self.slot_log.lock().unwrap_or_else(PoisonError::into_inner).clear();
    }

    /// Every `bind_slots` call recorded so far, with its handles and buffer ranges
    pub fn slot_bindings(&self) -> Vec<SlotBinding> {
        self.slot_log.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    pub fn mock_queue(&self) -> Arc<MockQueue> {
        self.queue.clone()
    }

    pub fn pipelines_created(&self) -> u64 {
        self.pipelines_created.load(Ordering::Relaxed)
    }

    // ===== CONVENIENCE FACTORIES =====

    /// Default-usage buffer bindable as a constant buffer
    pub fn uniform_buffer(&self, name: &str) -> Arc<dyn Buffer> {
        self.buffer(name, Usage::Default, BindFlags::UNIFORM_BUFFER)
    }

    pub fn buffer(&self, name: &str, usage: Usage, bind_flags: BindFlags) -> Arc<dyn Buffer> {
        Arc::new(MockBuffer {
            desc: BufferDesc {
                name: name.to_string(),
                size: 256,
                usage,
                bind_flags,
                mode: BufferMode::Undefined,
                element_byte_stride: 0,
            },
            handle: self.next_handle(),
            state: StateTracker::new(ResourceState::UNDEFINED),
        })
    }

    /// Structured/raw/formatted buffer and a view of it
    pub fn buffer_view(&self, name: &str, mode: BufferMode, view_type: BufferViewType) -> Arc<dyn BufferView> {
        let buffer: Arc<dyn Buffer> = Arc::new(MockBuffer {
            desc: BufferDesc {
                name: name.to_string(),
                size: 1024,
                usage: Usage::Default,
                bind_flags: BindFlags::SHADER_RESOURCE | BindFlags::UNORDERED_ACCESS,
                mode,
                element_byte_stride: 16,
            },
            handle: self.next_handle(),
            state: StateTracker::new(ResourceState::UNDEFINED),
        });
        Arc::new(MockBufferView {
            desc: BufferViewDesc {
                view_type,
                byte_offset: 0,
                byte_width: 0,
            },
            buffer,
            handle: self.next_handle(),
        })
    }

    pub fn texture(&self, name: &str, dimension: ResourceDimension, sample_count: u32) -> Arc<dyn Texture> {
        Arc::new(MockTexture {
            desc: TextureDesc {
                name: name.to_string(),
                dimension,
                sample_count,
                bind_flags: BindFlags::SHADER_RESOURCE | BindFlags::UNORDERED_ACCESS,
                ..TextureDesc::default()
            },
            handle: self.next_handle(),
            state: StateTracker::new(ResourceState::UNDEFINED),
        })
    }

    /// 2D texture and its shader resource view
    pub fn texture_srv(&self, name: &str) -> Arc<dyn TextureView> {
        self.texture_view(name, TextureViewType::ShaderResource, None)
    }

    pub fn texture_view(
        &self,
        name: &str,
        view_type: TextureViewType,
        sampler: Option<Arc<dyn Sampler>>,
    ) -> Arc<dyn TextureView> {
        let texture = self.texture(name, ResourceDimension::Tex2D, 1);
        Arc::new(MockTextureView {
            desc: TextureViewDesc {
                view_type,
                dimension: ResourceDimension::Undefined,
            },
            texture,
            sampler,
            handle: self.next_handle(),
        })
    }

    pub fn sampler(&self) -> Arc<dyn Sampler> {
        Arc::new(MockSampler {
            desc: SamplerDesc::default(),
            handle: self.next_handle(),
        })
    }

    pub fn tlas(&self, name: &str) -> Arc<dyn TopLevelAS> {
        Arc::new(MockTlas {
            name: name.to_string(),
            handle: self.next_handle(),
            state: StateTracker::new(ResourceState::UNDEFINED),
        })
    }
}

impl Default for MockDevice {
    fn default() -> Self {
        Self::new()
    }
}

impl RenderDevice for MockDevice {
    fn create_buffer(&self, desc: &BufferDesc) -> Result<Arc<dyn Buffer>> {
        if desc.size == 0 {
            engine_bail!("galaxy3d::MockDevice", "Buffer '{}' has zero size", desc.name);
        }
        Ok(Arc::new(MockBuffer {
            desc: desc.clone(),
            handle: self.next_handle(),
            state: StateTracker::new(ResourceState::UNDEFINED),
        }))
    }

    fn create_buffer_view(&self, buffer: &Arc<dyn Buffer>, desc: &BufferViewDesc) -> Result<Arc<dyn BufferView>> {
        Ok(Arc::new(MockBufferView {
            desc: desc.clone(),
            buffer: buffer.clone(),
            handle: self.next_handle(),
        }))
    }

    fn create_texture(&self, desc: &TextureDesc) -> Result<Arc<dyn Texture>> {
        if desc.width == 0 || desc.height == 0 {
            engine_bail!("galaxy3d::MockDevice", "Texture '{}' has zero extent", desc.name);
        }
        Ok(Arc::new(MockTexture {
            desc: desc.clone(),
            handle: self.next_handle(),
            state: StateTracker::new(ResourceState::UNDEFINED),
        }))
    }

    fn create_texture_view(
        &self,
        texture: &Arc<dyn Texture>,
        desc: &TextureViewDesc,
        sampler: Option<Arc<dyn Sampler>>,
    ) -> Result<Arc<dyn TextureView>> {
        Ok(Arc::new(MockTextureView {
            desc: desc.clone(),
            texture: texture.clone(),
            sampler,
            handle: self.next_handle(),
        }))
    }

    fn create_sampler(&self, desc: &SamplerDesc) -> Result<Arc<dyn Sampler>> {
        Ok(Arc::new(MockSampler {
            desc: desc.clone(),
            handle: self.next_handle(),
        }))
    }

    fn create_pipeline(&self, info: &NativePipelineInfo<'_>) -> Result<Arc<dyn NativePipeline>> {
        self.pipelines_created.fetch_add(1, Ordering::Relaxed);
        Ok(Arc::new(MockPipeline {
            name: info.name.to_string(),
            pipeline_type: info.pipeline_type,
            layout: info.layout.clone(),
            handle: self.next_handle(),
        }))
    }

    fn create_command_recorder(&self) -> Result<Box<dyn CommandRecorder>> {
        Ok(Box::new(MockRecorder {
            log: self.log.clone(),
            slot_log: self.slot_log.clone(),
            handles: self.handles.clone(),
            stale: Vec::new(),
            retained: Vec::new(),
            recording: false,
        }))
    }

    fn command_queue(&self) -> Arc<dyn CommandQueue> {
        self.queue.clone()
    }

    fn release_queue(&self) -> Arc<ReleaseQueue> {
        self.release_queue.clone()
    }
}

#[cfg(test)]
#[path = "mock_device_tests.rs"]
mod tests;
