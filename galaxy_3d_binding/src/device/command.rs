//! Command recording and queue submission interfaces

use std::any::Any;
use std::sync::Arc;

use crate::binding::{CachedResource, ShaderStage};
use crate::device::object::{Buffer, DeviceObject, NativeHandle, ResourceState, Texture, TopLevelAS};
use crate::device::render_device::{DescriptorSetLayoutInfo, NativePipeline};
use crate::error::Result;

// ============================================================================
// State transitions
// ============================================================================

/// Resource whose state is changed by a barrier
#[derive(Clone)]
pub enum TransitionTarget {
    Buffer(Arc<dyn Buffer>),
    Texture(Arc<dyn Texture>),
    Tlas(Arc<dyn TopLevelAS>),
}

impl TransitionTarget {
    pub fn name(&self) -> String {
        match self {
            TransitionTarget::Buffer(b) => b.desc().name.clone(),
            TransitionTarget::Texture(t) => t.desc().name.clone(),
            TransitionTarget::Tlas(t) => t.name().to_string(),
        }
    }

    pub fn native_handle(&self) -> NativeHandle {
        match self {
            TransitionTarget::Buffer(b) => b.native_handle(),
            TransitionTarget::Texture(t) => t.native_handle(),
            TransitionTarget::Tlas(t) => t.native_handle(),
        }
    }

    pub fn state(&self) -> ResourceState {
        match self {
            TransitionTarget::Buffer(b) => b.state(),
            TransitionTarget::Texture(t) => t.state(),
            TransitionTarget::Tlas(t) => t.state(),
        }
    }

    pub fn set_state(&self, state: ResourceState) {
        match self {
            TransitionTarget::Buffer(b) => b.set_state(state),
            TransitionTarget::Texture(t) => t.set_state(state),
            TransitionTarget::Tlas(t) => t.set_state(state),
        }
    }
}

/// One barrier
#[derive(Clone)]
pub struct StateTransition {
    pub target: TransitionTarget,
    pub old_state: ResourceState,
    pub new_state: ResourceState,
}

impl std::fmt::Debug for StateTransition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {:?} -> {:?}", self.target.name(), self.old_state, self.new_state)
    }
}

// ============================================================================
// Binding commands
// ============================================================================

/// Consecutive slots of one register range in one stage (flat binding models)
#[derive(Debug, Clone)]
pub struct SlotBinding {
    pub stage: ShaderStage,
    pub range: u8,
    pub range_name: &'static str,
    /// First native slot, base bindings already applied
    pub first_slot: u32,
    pub handles: Vec<NativeHandle>,
    /// (offset, size) per slot for constant buffers; empty for other ranges
    pub buffer_ranges: Vec<(u64, u64)>,
}

/// Contents of one descriptor set / root table to bind (shared binding models)
pub struct DescriptorSetCommit<'a> {
    /// Set or root table index, base bindings already applied
    pub set_index: u32,
    pub layout: &'a DescriptorSetLayoutInfo,
    /// Table contents, indexed by `LayoutBinding::cache_offset`
    pub resources: &'a [CachedResource],
    /// Contents changed since the set was last written
    pub dirty: bool,
    /// Set allocated by a previous commit, NULL if none
    pub existing: NativeHandle,
    /// One offset per dynamic buffer element, in binding order
    pub dynamic_offsets: Vec<u32>,
}

impl DescriptorSetCommit<'_> {
    /// Objects the bound set refers to; they must stay alive until the submission completes
    pub fn referenced_objects(&self) -> impl Iterator<Item = &DeviceObject> + '_ {
        self.resources.iter().filter_map(CachedResource::object)
    }
}

// ============================================================================
// Draw / dispatch
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DrawAttribs {
    pub num_vertices: u32,
    pub num_instances: u32,
    pub first_vertex: u32,
    pub first_instance: u32,
}

impl DrawAttribs {
    pub fn new(num_vertices: u32) -> Self {
        Self {
            num_vertices,
            num_instances: 1,
            first_vertex: 0,
            first_instance: 0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexType {
    U16,
    U32,
}

#[derive(Clone)]
pub struct DrawIndexedAttribs {
    pub index_buffer: Arc<dyn Buffer>,
    pub index_type: IndexType,
    pub num_indices: u32,
    pub num_instances: u32,
    pub first_index: u32,
    pub base_vertex: i32,
    pub first_instance: u32,
}

impl DrawIndexedAttribs {
    pub fn new(index_buffer: Arc<dyn Buffer>, index_type: IndexType, num_indices: u32) -> Self {
        Self {
            index_buffer,
            index_type,
            num_indices,
            num_instances: 1,
            first_index: 0,
            base_vertex: 0,
            first_instance: 0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DispatchAttribs {
    pub group_count_x: u32,
    pub group_count_y: u32,
    pub group_count_z: u32,
}

impl DispatchAttribs {
    pub fn new(x: u32, y: u32, z: u32) -> Self {
        Self {
            group_count_x: x,
            group_count_y: y,
            group_count_z: z,
        }
    }
}

// ============================================================================
// CommandRecorder
// ============================================================================

/// Native command buffer / command list being recorded
///
/// A recorder is owned by one device context and is never shared between threads
/// while recording.
pub trait CommandRecorder: Send {
    fn begin(&mut self) -> Result<()>;
    fn end(&mut self) -> Result<()>;
    fn bind_pipeline(&mut self, pipeline: &dyn NativePipeline);
    fn transition(&mut self, barriers: &[StateTransition]);
    fn bind_slots(&mut self, binding: &SlotBinding);

    /// Write (when dirty or unallocated) and bind one descriptor set
    ///
    /// Returns the set handle, which the caller stores and passes back as `existing`.
    fn bind_descriptor_set(&mut self, pipeline: &dyn NativePipeline, commit: &DescriptorSetCommit<'_>) -> Result<NativeHandle>;

    fn draw(&mut self, attribs: &DrawAttribs);
    fn draw_indexed(&mut self, attribs: &DrawIndexedAttribs);
    fn dispatch(&mut self, attribs: &DispatchAttribs);

    /// Objects that must outlive the submission of what was recorded
    ///
    /// This covers native objects retired while recording (replaced descriptor sets)
    /// and the device objects referenced by bound sets and index buffers.
    fn take_stale_objects(&mut self) -> Vec<Box<dyn Any + Send + Sync>>;

    fn as_any_mut(&mut self) -> &mut dyn Any;
}

// ============================================================================
// CommandQueue
// ============================================================================

/// Submission queue with monotonically increasing fence values
pub trait CommandQueue: Send + Sync {
    /// Submit a recorded command buffer, returning the fence value signaled on completion
    fn submit(&self, recorder: &mut dyn CommandRecorder) -> Result<u64>;

    /// Fence value the next submission will signal
    fn next_fence_value(&self) -> u64;

    fn completed_fence_value(&self) -> u64;

    /// Block until `value` is reached
    fn wait_for_fence(&self, value: u64) -> Result<()>;

    fn wait_idle(&self) -> Result<()>;
}
