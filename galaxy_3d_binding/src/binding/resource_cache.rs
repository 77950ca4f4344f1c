//! Shader resource cache
//!
//! Dense, offset-addressed storage of bound objects. The cache knows nothing about
//! names or variables: signatures compute a `CacheLocation` for every resource and
//! the variable layer reads and writes through it.
//!
//! Flat binding models store one table per (stage, range), shared binding models one
//! table per descriptor set / root table.

use rustc_hash::FxHashSet;

use crate::binding::attribs::CacheLocation;
use crate::binding::binding_model::MAX_BINDING_RANGES;
use crate::binding::resource_desc::{StateTransitionMode, MAX_SHADER_STAGES};
use crate::device::{
    BufferViewType, DeviceObject, DescriptorSetLayoutInfo, NativeHandle, ResourceState, StateTransition,
    TextureViewType, TransitionTarget,
};
use crate::error::{Error, Result};

const FLAT_TABLE_COUNT: usize = MAX_SHADER_STAGES * MAX_BINDING_RANGES;

/// What a cache stores
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheContentType {
    /// Static resources of a signature
    Signature,
    /// Resources of one shader resource binding
    Srb,
}

/// Table sizes a cache is initialized with
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheLayout {
    /// Slot count per (stage, range)
    Stages {
        counts: [[u32; MAX_BINDING_RANGES]; MAX_SHADER_STAGES],
    },
    /// Slot count per table
    Tables { sizes: Vec<u32> },
}

impl CacheLayout {
    pub fn total_slots(&self) -> u32 {
        match self {
            CacheLayout::Stages { counts } => counts.iter().flatten().sum(),
            CacheLayout::Tables { sizes } => sizes.iter().sum(),
        }
    }
}

// ============================================================================
// CachedResource
// ============================================================================

/// One cache slot
///
/// The owning object and its native handle are only ever written together.
#[derive(Clone, Default)]
pub struct CachedResource {
    object: Option<DeviceObject>,
    handle: NativeHandle,
    buffer_offset: u64,
    buffer_size: u64,
    dynamic_offset: u32,
}

impl CachedResource {
    fn assign(&mut self, object: Option<DeviceObject>) {
        self.handle = object.as_ref().map(|o| o.native_handle()).unwrap_or(NativeHandle::NULL);
        self.object = object;
        self.buffer_offset = 0;
        self.buffer_size = 0;
        self.dynamic_offset = 0;
        debug_assert_eq!(self.object.is_some(), !self.handle.is_null());
    }

    pub fn object(&self) -> Option<&DeviceObject> {
        self.object.as_ref()
    }

    pub fn handle(&self) -> NativeHandle {
        self.handle
    }

    pub fn is_bound(&self) -> bool {
        self.object.is_some()
    }

    pub fn buffer_offset(&self) -> u64 {
        self.buffer_offset
    }

    /// Bound range size, 0 for the whole buffer
    pub fn buffer_size(&self) -> u64 {
        self.buffer_size
    }

    pub fn dynamic_offset(&self) -> u32 {
        self.dynamic_offset
    }

    /// Offset the shader reads from: the bound range start plus the dynamic offset
    pub fn effective_offset(&self) -> Option<u64> {
        self.buffer_offset.checked_add(u64::from(self.dynamic_offset))
    }

    /// Native handle of the sampler a texture view carries, NULL otherwise
    pub fn view_sampler_handle(&self) -> NativeHandle {
        match &self.object {
            Some(DeviceObject::TextureView(view)) => {
                view.sampler().map(|s| s.native_handle()).unwrap_or(NativeHandle::NULL)
            }
            _ => NativeHandle::NULL,
        }
    }
}

impl std::fmt::Debug for CachedResource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.object {
            Some(object) => write!(f, "{:?}", object),
            None => write!(f, "<null>"),
        }
    }
}

// ============================================================================
// CacheTable
// ============================================================================

#[derive(Debug, Default)]
pub struct CacheTable {
    resources: Vec<CachedResource>,
    dirty: bool,
    descriptor_set: NativeHandle,
}

impl CacheTable {
    pub fn resources(&self) -> &[CachedResource] {
        &self.resources
    }

    pub fn len(&self) -> usize {
        self.resources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }
}

// ============================================================================
// ShaderResourceCache
// ============================================================================

pub struct ShaderResourceCache {
    content_type: CacheContentType,
    tables: Vec<CacheTable>,
    flat: bool,
    initialized: bool,
    dynamic_buffer_count: u32,
}

impl ShaderResourceCache {
    pub fn new(content_type: CacheContentType) -> Self {
        Self {
            content_type,
            tables: Vec::new(),
            flat: false,
            initialized: false,
            dynamic_buffer_count: 0,
        }
    }

    pub fn content_type(&self) -> CacheContentType {
        self.content_type
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Allocate the tables
    ///
    /// # Errors
    ///
    /// Returns an error when the cache is already initialized.
    pub fn initialize(&mut self, layout: &CacheLayout) -> Result<()> {
        if self.initialized {
            return Err(Error::InitializationFailed(
                "Shader resource cache is already initialized".to_string(),
            ));
        }
        match layout {
            CacheLayout::Stages { counts } => {
                self.flat = true;
                self.tables = (0..FLAT_TABLE_COUNT)
                    .map(|i| CacheTable {
                        resources: vec![CachedResource::default(); counts[i / MAX_BINDING_RANGES][i % MAX_BINDING_RANGES] as usize],
                        dirty: true,
                        descriptor_set: NativeHandle::NULL,
                    })
                    .collect();
            }
            CacheLayout::Tables { sizes } => {
                self.flat = false;
                self.tables = sizes
                    .iter()
                    .map(|&size| CacheTable {
                        resources: vec![CachedResource::default(); size as usize],
                        dirty: true,
                        descriptor_set: NativeHandle::NULL,
                    })
                    .collect();
            }
        }
        self.initialized = true;
        Ok(())
    }

    /// Table index and slot of every copy of element `elem`
    fn slots(&self, location: &CacheLocation, elem: u32) -> Vec<(usize, usize)> {
        match location {
            CacheLocation::Stages { range, bind_points } => bind_points
                .iter()
                .map(|(stage, slot)| {
                    (stage.index() * MAX_BINDING_RANGES + *range as usize, slot as usize + elem as usize)
                })
                .collect(),
            CacheLocation::Table { table, offset } => vec![(*table as usize, (*offset + elem) as usize)],
        }
    }

    /// First copy of element `elem`
    fn first_slot(&self, location: &CacheLocation, elem: u32) -> Option<(usize, usize)> {
        match location {
            CacheLocation::Stages { range, bind_points } => bind_points
                .iter()
                .next()
                .map(|(stage, slot)| (stage.index() * MAX_BINDING_RANGES + *range as usize, slot as usize + elem as usize)),
            CacheLocation::Table { table, offset } => Some((*table as usize, (*offset + elem) as usize)),
        }
    }

    fn slot_mut(&mut self, table: usize, slot: usize) -> Option<&mut CachedResource> {
        let entry = self.tables.get_mut(table).and_then(|t| {
            t.dirty = true;
            t.resources.get_mut(slot)
        });
        if entry.is_none() {
            crate::engine_error!(
                "galaxy3d::ResourceCache",
                "Cache slot {} of table {} is out of range",
                slot,
                table
            );
        }
        entry
    }

    fn for_each_slot(&mut self, location: &CacheLocation, elem: u32, mut f: impl FnMut(&mut CachedResource)) {
        for (table, slot) in self.slots(location, elem) {
            if let Some(entry) = self.slot_mut(table, slot) {
                f(entry);
            }
        }
    }

    // ===== WRITE =====

    /// Bind `object` to element `elem` in every stage of `location`
    pub fn set_resource(&mut self, location: &CacheLocation, elem: u32, object: Option<DeviceObject>) {
        self.for_each_slot(location, elem, |entry| entry.assign(object.clone()));
    }

    pub fn reset_resource(&mut self, location: &CacheLocation, elem: u32) {
        self.set_resource(location, elem, None);
    }

    /// Bind a constant buffer sub-range; a `size` of 0 means "to the end of the buffer"
    pub fn set_buffer_range(&mut self, location: &CacheLocation, elem: u32, object: Option<DeviceObject>, offset: u64, size: u64) {
        self.for_each_slot(location, elem, |entry| {
            entry.assign(object.clone());
            if entry.is_bound() {
                entry.buffer_offset = offset;
                entry.buffer_size = size;
            }
        });
    }

    pub fn set_dynamic_offset(&mut self, location: &CacheLocation, elem: u32, offset: u32) {
        for (table, slot) in self.slots(location, elem) {
            // Dynamic offsets do not require rewriting the descriptor set
            if let Some(entry) = self.tables.get_mut(table).and_then(|t| t.resources.get_mut(slot)) {
                entry.dynamic_offset = offset;
            }
        }
    }

    /// Copy element `elem` from `src` at `src_location`; returns whether the source was bound
    pub fn copy_resource(
        &mut self,
        src: &ShaderResourceCache,
        src_location: &CacheLocation,
        dst_location: &CacheLocation,
        elem: u32,
    ) -> bool {
        let source = match src.get_entry(src_location, elem) {
            Some(entry) => entry.clone(),
            None => return false,
        };
        let bound = source.is_bound();
        self.for_each_slot(dst_location, elem, |entry| *entry = source.clone());
        bound
    }

    // ===== READ =====

    fn get_entry(&self, location: &CacheLocation, elem: u32) -> Option<&CachedResource> {
        let (table, slot) = self.first_slot(location, elem)?;
        self.tables.get(table).and_then(|t| t.resources.get(slot))
    }

    pub fn get_resource(&self, location: &CacheLocation, elem: u32) -> Option<&CachedResource> {
        self.get_entry(location, elem)
    }

    pub fn get_object(&self, location: &CacheLocation, elem: u32) -> Option<DeviceObject> {
        self.get_entry(location, elem).and_then(|e| e.object().cloned())
    }

    /// Whether element `elem` is bound, judged by the first active stage
    pub fn is_resource_bound(&self, location: &CacheLocation, elem: u32) -> bool {
        let bound = self.get_entry(location, elem).is_some_and(|e| e.is_bound());
        #[cfg(debug_assertions)]
        for (table, slot) in self.slots(location, elem) {
            if let Some(entry) = self.tables.get(table).and_then(|t| t.resources.get(slot)) {
                debug_assert_eq!(entry.is_bound(), bound, "stage copies of a cache element disagree");
            }
        }
        bound
    }

    pub fn table_count(&self) -> usize {
        self.tables.len()
    }

    pub fn table(&self, index: usize) -> Option<&CacheTable> {
        self.tables.get(index)
    }

    /// Flat models: table of one (stage, range)
    pub fn stage_table(&self, stage: usize, range: u8) -> Option<&CacheTable> {
        if !self.flat {
            return None;
        }
        self.tables.get(stage * MAX_BINDING_RANGES + range as usize)
    }

    pub fn is_table_dirty(&self, index: usize) -> bool {
        self.tables.get(index).is_some_and(|t| t.dirty)
    }

    pub fn clear_dirty(&mut self, index: usize) {
        if let Some(table) = self.tables.get_mut(index) {
            table.dirty = false;
        }
    }

    /// Late-bound native descriptor set of a table
    pub fn descriptor_set(&self, index: usize) -> NativeHandle {
        self.tables.get(index).map(|t| t.descriptor_set).unwrap_or(NativeHandle::NULL)
    }

    pub fn assign_descriptor_set(&mut self, index: usize, set: NativeHandle) {
        if let Some(table) = self.tables.get_mut(index) {
            table.descriptor_set = set;
        }
    }

    pub fn dynamic_buffer_count(&self) -> u32 {
        self.dynamic_buffer_count
    }

    pub fn set_dynamic_buffer_count(&mut self, count: u32) {
        self.dynamic_buffer_count = count;
    }

    /// Dynamic offsets of a table in binding order
    ///
    /// # Errors
    ///
    /// Returns `InvalidResource` when an offset does not fit the 32-bit dynamic
    /// offsets of the native API.
    pub fn dynamic_offsets(&self, index: usize, layout: &DescriptorSetLayoutInfo) -> Result<Vec<u32>> {
        let mut offsets = Vec::with_capacity(layout.dynamic_buffer_count as usize);
        let Some(table) = self.tables.get(index) else {
            return Ok(offsets);
        };
        for binding in layout.bindings.iter().filter(|b| b.descriptor_kind.has_dynamic_offset()) {
            for elem in 0..binding.array_size {
                let Some(entry) = table.resources.get((binding.cache_offset + elem) as usize) else {
                    offsets.push(0);
                    continue;
                };
                let offset = entry.effective_offset().and_then(|offset| u32::try_from(offset).ok());
                match offset {
                    Some(offset) => offsets.push(offset),
                    None => {
                        let message = format!(
                            "Dynamic offset of binding {} element {} (range offset {} + dynamic offset {}) exceeds 32 bits",
                            binding.binding, elem, entry.buffer_offset, entry.dynamic_offset
                        );
                        crate::engine_error!("galaxy3d::ResourceCache", "{}", message);
                        return Err(Error::InvalidResource(message));
                    }
                }
            }
        }
        Ok(offsets)
    }

    /// Number of bound slots (a flat resource visible in two stages counts twice)
    pub fn bound_object_count(&self) -> usize {
        self.tables.iter().flat_map(|t| t.resources.iter()).filter(|e| e.is_bound()).count()
    }

    /// Unbind everything and forget descriptor sets, keeping the table sizes
    pub fn reset(&mut self) {
        for table in &mut self.tables {
            for entry in &mut table.resources {
                entry.assign(None);
            }
            table.dirty = true;
            table.descriptor_set = NativeHandle::NULL;
        }
    }

    // ===== STATE TRANSITIONS =====

    /// Transition or verify the state of every bound resource
    ///
    /// In `Transition` mode, returns the barriers to record and updates the tracked
    /// states. In `Verify` mode, reports every mismatch and returns no barriers.
    pub fn transition_resources(&self, mode: StateTransitionMode) -> Vec<StateTransition> {
        let mut barriers = Vec::new();
        if mode == StateTransitionMode::None {
            return barriers;
        }
        let mut seen = FxHashSet::default();
        for entry in self.tables.iter().flat_map(|t| t.resources.iter()) {
            let Some(object) = entry.object() else { continue };
            let Some((target, required)) = required_state(object) else { continue };
            if !seen.insert(target.native_handle()) {
                continue;
            }
            let current = target.state();
            if !current.is_known() || current == required {
                continue;
            }
            match mode {
                StateTransitionMode::Transition => {
                    target.set_state(required);
                    barriers.push(StateTransition {
                        target,
                        old_state: current,
                        new_state: required,
                    });
                }
                StateTransitionMode::Verify => {
                    crate::engine_error!(
                        "galaxy3d::ResourceCache",
                        "Resource '{}' is in state {:?}, but {:?} is required. Use StateTransitionMode::Transition or transition it explicitly.",
                        target.name(),
                        current,
                        required
                    );
                }
                StateTransitionMode::None => {}
            }
        }
        barriers
    }
}

/// Resource whose state matters for `object` and the state it must be in
fn required_state(object: &DeviceObject) -> Option<(TransitionTarget, ResourceState)> {
    match object {
        DeviceObject::Buffer(buffer) => Some((TransitionTarget::Buffer(buffer.clone()), ResourceState::CONSTANT_BUFFER)),
        DeviceObject::BufferView(view) => {
            let state = match view.desc().view_type {
                BufferViewType::ShaderResource => ResourceState::SHADER_RESOURCE,
                BufferViewType::UnorderedAccess => ResourceState::UNORDERED_ACCESS,
            };
            Some((TransitionTarget::Buffer(view.buffer().clone()), state))
        }
        DeviceObject::TextureView(view) => {
            let state = match view.desc().view_type {
                TextureViewType::ShaderResource => ResourceState::SHADER_RESOURCE,
                TextureViewType::UnorderedAccess => ResourceState::UNORDERED_ACCESS,
                TextureViewType::RenderTarget | TextureViewType::DepthStencil => return None,
            };
            Some((TransitionTarget::Texture(view.texture().clone()), state))
        }
        DeviceObject::Tlas(tlas) => Some((TransitionTarget::Tlas(tlas.clone()), ResourceState::RAY_TRACING)),
        DeviceObject::Sampler(_) => None,
    }
}

#[cfg(test)]
#[path = "resource_cache_tests.rs"]
mod tests;
