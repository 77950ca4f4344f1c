//! Per-resource layout attributes computed when a signature is built

use std::hash::{Hash, Hasher};
use std::sync::Arc;

use crate::binding::binding_model::{BaseBindings, DescriptorKind};
use crate::binding::resource_desc::{ShaderStage, ShaderStages, MAX_SHADER_STAGES};
use crate::device::Sampler;

// ============================================================================
// BindPoints
// ============================================================================

/// Native slot of a resource in every stage it is visible in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct BindPoints {
    active: ShaderStages,
    slots: [u16; MAX_SHADER_STAGES],
}

impl BindPoints {
    pub fn set(&mut self, stage: ShaderStage, slot: u16) {
        self.active |= stage.flag();
        self.slots[stage.index()] = slot;
    }

    pub fn get(&self, stage: ShaderStage) -> Option<u16> {
        if self.active.contains(stage.flag()) {
            Some(self.slots[stage.index()])
        } else {
            None
        }
    }

    pub fn active_stages(&self) -> ShaderStages {
        self.active
    }

    pub fn first_active(&self) -> Option<ShaderStage> {
        self.active.first()
    }

    pub fn is_empty(&self) -> bool {
        self.active.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (ShaderStage, u16)> + '_ {
        self.active.stages().map(move |stage| (stage, self.slots[stage.index()]))
    }

    /// Bind points moved by the base bindings of `range`; `None` when a slot leaves the u16 range
    pub fn shifted(&self, base: &BaseBindings, range: u8) -> Option<BindPoints> {
        let mut shifted = *self;
        for stage in self.active.stages() {
            let slot = u32::from(self.slots[stage.index()]).checked_add(base.get(stage.index(), range))?;
            shifted.slots[stage.index()] = u16::try_from(slot).ok()?;
        }
        Some(shifted)
    }
}

// ============================================================================
// CacheLocation
// ============================================================================

/// Where the elements of a resource live in a resource cache
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CacheLocation {
    /// Flat model: element `i` is stored at `bind_points[stage] + i` of every active stage
    Stages { range: u8, bind_points: BindPoints },
    /// Shared model: element `i` is stored at `offset + i` of `table`
    Table { table: u8, offset: u32 },
}

// ============================================================================
// ResourceAttribs
// ============================================================================

/// Layout of one signature resource
#[derive(Debug, Clone)]
pub struct ResourceAttribs {
    /// Register range (flat) or table kind (shared)
    pub range: u8,
    pub group: u8,
    pub bind_points: BindPoints,
    /// Flat: slot in the first active stage. Shared: offset within the table.
    pub cache_offset: u32,
    /// Shared: binding index within the descriptor set / table
    pub binding_index: u32,
    pub descriptor_kind: DescriptorKind,
    /// Location in SRB caches
    pub srb_location: CacheLocation,
    /// Location in the signature's static cache, static resources only
    pub static_location: Option<CacheLocation>,
    /// Index of the separate sampler assigned to a texture SRV
    pub assigned_sampler: Option<u32>,
    /// Index of the immutable sampler the resource resolved to
    pub immutable_sampler: Option<u32>,
}

impl ResourceAttribs {
    pub fn is_immutable_sampler_assigned(&self) -> bool {
        self.immutable_sampler.is_some()
    }

    /// Layout equality; the assigned sampler index is not part of it
    pub fn is_compatible_with(&self, other: &ResourceAttribs) -> bool {
        self.range == other.range
            && self.group == other.group
            && self.bind_points == other.bind_points
            && self.cache_offset == other.cache_offset
            && self.binding_index == other.binding_index
            && self.descriptor_kind == other.descriptor_kind
            && self.srb_location == other.srb_location
            && self.static_location == other.static_location
            && self.immutable_sampler.is_some() == other.immutable_sampler.is_some()
    }

    /// Hash consistent with `is_compatible_with`
    pub fn hash_layout<H: Hasher>(&self, state: &mut H) {
        self.range.hash(state);
        self.group.hash(state);
        self.bind_points.hash(state);
        self.cache_offset.hash(state);
        self.binding_index.hash(state);
        self.descriptor_kind.hash(state);
        self.immutable_sampler.is_some().hash(state);
    }
}

// ============================================================================
// ImmutableSamplerAttribs
// ============================================================================

/// Layout and device object of one immutable sampler
#[derive(Clone, Default)]
pub struct ImmutableSamplerAttribs {
    /// Largest array size of the resources that use this sampler
    pub array_size: u32,
    pub bind_points: BindPoints,
    /// Cache slots, for models that keep immutable samplers in the cache
    pub location: Option<CacheLocation>,
    /// Table and binding of a sampler no resource references (shared models)
    pub table_binding: Option<(u8, u32)>,
    pub sampler: Option<Arc<dyn Sampler>>,
}

impl ImmutableSamplerAttribs {
    pub fn is_allocated(&self) -> bool {
        self.location.is_some()
    }
}

impl std::fmt::Debug for ImmutableSamplerAttribs {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImmutableSamplerAttribs")
            .field("array_size", &self.array_size)
            .field("bind_points", &self.bind_points)
            .field("location", &self.location)
            .field("table_binding", &self.table_binding)
            .field("sampler", &self.sampler.as_ref().map(|s| s.native_handle()))
            .finish()
    }
}

#[cfg(test)]
#[path = "attribs_tests.rs"]
mod tests;
