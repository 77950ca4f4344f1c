//! Signature layout computation
//!
//! Turns a sorted resource list into bind points, cache locations and table layouts.
//! Flat models allocate per-stage registers from running counters; shared models
//! pack resources into compacted tables, ordered by group.

use crate::binding::attribs::{BindPoints, CacheLocation, ImmutableSamplerAttribs, ResourceAttribs};
use crate::binding::binding_model::{BindingCounts, BindingModel, SlotScope, MAX_BINDING_RANGES};
use crate::binding::resource_cache::CacheLayout;
use crate::binding::resource_desc::{
    ImmutableSamplerDesc, PipelineResourceDesc, PipelineResourceFlags, PipelineResourceSignatureDesc,
    ShaderResourceType, ShaderStages, VariableType, MAX_SHADER_STAGES,
};
use crate::error::{Error, Result};

/// Output of the layout computation
#[derive(Debug)]
pub(crate) struct SignatureLayout {
    pub attribs: Vec<ResourceAttribs>,
    pub immutable_samplers: Vec<ImmutableSamplerAttribs>,
    pub binding_counts: BindingCounts,
    pub srb_cache: CacheLayout,
    /// `None` when the signature has no static resources
    pub static_cache: Option<CacheLayout>,
    /// Range kind of every compacted table (shared models)
    pub table_ranges: Vec<u8>,
    /// Dynamic-offset elements per compacted table
    pub table_dynamic_buffers: Vec<u32>,
    pub dynamic_buffer_count: u32,
}

// ============================================================================
// Name matching
// ============================================================================

/// `resource_name` equals `name`, or `name` followed by `suffix`
fn matches_with_suffix(resource_name: &str, name: &str, suffix: Option<&str>) -> bool {
    if resource_name == name {
        return true;
    }
    match suffix {
        Some(suffix) => resource_name
            .strip_prefix(name)
            .is_some_and(|rest| rest == suffix),
        None => false,
    }
}

/// Immutable sampler visible in one of `stages` whose name matches `resource_name`
pub(crate) fn find_immutable_sampler(
    samplers: &[ImmutableSamplerDesc],
    stages: ShaderStages,
    resource_name: &str,
    suffix: Option<&str>,
) -> Option<usize> {
    samplers.iter().position(|s| {
        s.stages.intersects(stages) && matches_with_suffix(resource_name, &s.sampler_or_texture_name, suffix)
    })
}

/// Sampler resource `<texture><suffix>` assigned to a texture SRV
pub(crate) fn find_assigned_sampler(
    resources: &[PipelineResourceDesc],
    texture: &PipelineResourceDesc,
    suffix: &str,
) -> Option<usize> {
    let sampler_name = format!("{}{}", texture.name, suffix);
    resources.iter().position(|r| {
        r.resource_type == ShaderResourceType::Sampler && r.stages.intersects(texture.stages) && r.name == sampler_name
    })
}

/// Whether a resource can reference an immutable sampler
fn uses_immutable_sampler(desc: &PipelineResourceDesc, combined: bool) -> bool {
    match desc.resource_type {
        ShaderResourceType::Sampler => true,
        ShaderResourceType::TextureSrv => combined || desc.flags.contains(PipelineResourceFlags::COMBINED_SAMPLER),
        _ => false,
    }
}

/// Immutable sampler referenced by every resource, and each sampler's array size
fn resolve_immutable_samplers(desc: &PipelineResourceSignatureDesc) -> (Vec<Option<usize>>, Vec<ImmutableSamplerAttribs>) {
    let suffix = desc.combined_sampler_suffix();
    let mut samplers = vec![ImmutableSamplerAttribs::default(); desc.immutable_samplers.len()];
    let refs = desc
        .resources
        .iter()
        .map(|res| {
            if !uses_immutable_sampler(res, desc.use_combined_texture_samplers) {
                return None;
            }
            let found = find_immutable_sampler(&desc.immutable_samplers, res.stages, &res.name, suffix);
            if let Some(s) = found {
                samplers[s].array_size = samplers[s].array_size.max(res.array_size);
            }
            found
        })
        .collect();
    (refs, samplers)
}

// ============================================================================
// Entry point
// ============================================================================

/// Compute the layout of a validated description whose resources are sorted by variable type
pub(crate) fn compute_layout<B: BindingModel>(desc: &PipelineResourceSignatureDesc) -> Result<SignatureLayout> {
    debug_assert!(desc.resources.windows(2).all(|w| w[0].var_type <= w[1].var_type));
    match B::SCOPE {
        SlotScope::PerStage => compute_flat_layout::<B>(desc),
        SlotScope::Shared => compute_shared_layout::<B>(desc),
    }
}

// ============================================================================
// Flat layout
// ============================================================================

struct SlotCounters<B: BindingModel> {
    next: [[u32; MAX_BINDING_RANGES]; MAX_SHADER_STAGES],
    _model: std::marker::PhantomData<B>,
}

impl<B: BindingModel> SlotCounters<B> {
    fn new() -> Self {
        Self {
            next: [[0; MAX_BINDING_RANGES]; MAX_SHADER_STAGES],
            _model: std::marker::PhantomData,
        }
    }

    /// Reserve `count` consecutive slots of `range` in every stage of `stages`
    fn alloc(&mut self, name: &str, stages: ShaderStages, range: u8, count: u32) -> Result<BindPoints> {
        let mut bind_points = BindPoints::default();
        for stage in stages.stages() {
            let next = &mut self.next[stage.index()][range as usize];
            let end = *next + count;
            if end > B::max_slots(range) || end > u16::MAX as u32 {
                return Err(Error::InvalidSignature(format!(
                    "'{}' needs {} {} slot(s) in the {} stage starting at {}, but only {} are available",
                    name,
                    count,
                    B::range_name(range),
                    stage.name(),
                    *next,
                    B::max_slots(range)
                )));
            }
            bind_points.set(stage, *next as u16);
            *next = end;
        }
        Ok(bind_points)
    }
}

fn compute_flat_layout<B: BindingModel>(desc: &PipelineResourceSignatureDesc) -> Result<SignatureLayout> {
    let suffix = desc.combined_sampler_suffix();
    let (imtbl_refs, mut immutable_samplers) = resolve_immutable_samplers(desc);
    let sampler_range = B::sampler_range();
    let mut counters = SlotCounters::<B>::new();
    let mut attribs = Vec::with_capacity(desc.resources.len());

    for (i, res) in desc.resources.iter().enumerate() {
        let range = B::range_of(res);

        let assigned_sampler = match (res.resource_type, suffix) {
            (ShaderResourceType::TextureSrv, Some(suffix)) => {
                find_assigned_sampler(&desc.resources, res, suffix).map(|s| s as u32)
            }
            _ => None,
        };

        let immutable_sampler = imtbl_refs[i];
        if let Some(s) = immutable_sampler {
            if B::IMMUTABLE_SAMPLERS_IN_CACHE && !immutable_samplers[s].is_allocated() {
                let sam_desc = &desc.immutable_samplers[s];
                let array_size = immutable_samplers[s].array_size.max(1);
                let bind_points = counters.alloc(&sam_desc.sampler_or_texture_name, sam_desc.stages, sampler_range, array_size)?;
                immutable_samplers[s].bind_points = bind_points;
                immutable_samplers[s].location = Some(CacheLocation::Stages { range: sampler_range, bind_points });
            }
        }

        // A sampler resolved to an immutable sampler aliases its slots
        let aliased = match immutable_sampler {
            Some(s) if res.resource_type == ShaderResourceType::Sampler && B::IMMUTABLE_SAMPLERS_IN_CACHE => {
                Some(immutable_samplers[s].bind_points)
            }
            _ => None,
        };
        let bind_points = match aliased {
            Some(bind_points) => bind_points,
            None => counters.alloc(&res.name, res.stages, range, res.array_size)?,
        };

        let first = bind_points.first_active().and_then(|s| bind_points.get(s)).unwrap_or(0) as u32;
        let location = CacheLocation::Stages { range, bind_points };
        attribs.push(ResourceAttribs {
            range,
            group: B::group_of(res),
            bind_points,
            cache_offset: first,
            binding_index: first,
            descriptor_kind: B::descriptor_kind(res),
            srb_location: location,
            static_location: (res.var_type == VariableType::Static).then_some(location),
            assigned_sampler,
            immutable_sampler: immutable_sampler.map(|s| s as u32),
        });
    }

    // Immutable samplers no resource referenced
    if B::IMMUTABLE_SAMPLERS_IN_CACHE && !desc.use_combined_texture_samplers {
        for (s, sam_desc) in desc.immutable_samplers.iter().enumerate() {
            if immutable_samplers[s].is_allocated() {
                continue;
            }
            immutable_samplers[s].array_size = 1;
            let bind_points = counters.alloc(&sam_desc.sampler_or_texture_name, sam_desc.stages, sampler_range, 1)?;
            immutable_samplers[s].bind_points = bind_points;
            immutable_samplers[s].location = Some(CacheLocation::Stages { range: sampler_range, bind_points });
        }
    }

    let binding_counts = BindingCounts {
        slots: counters.next,
        tables: 0,
    };

    // Static cache: static resources and immutable samplers
    let has_static = desc.resources.iter().any(|r| r.var_type == VariableType::Static);
    let static_cache = has_static.then(|| {
        let mut counts = [[0u32; MAX_BINDING_RANGES]; MAX_SHADER_STAGES];
        let mut grow = |bind_points: &BindPoints, range: u8, size: u32| {
            for (stage, slot) in bind_points.iter() {
                let count = &mut counts[stage.index()][range as usize];
                *count = (*count).max(slot as u32 + size);
            }
        };
        for (res, attr) in desc.resources.iter().zip(&attribs) {
            if res.var_type == VariableType::Static {
                grow(&attr.bind_points, attr.range, res.array_size);
            }
        }
        for sampler in &immutable_samplers {
            if let Some(CacheLocation::Stages { range, bind_points }) = &sampler.location {
                grow(bind_points, *range, sampler.array_size);
            }
        }
        CacheLayout::Stages { counts }
    });

    Ok(SignatureLayout {
        attribs,
        immutable_samplers,
        binding_counts,
        srb_cache: CacheLayout::Stages { counts: binding_counts.slots },
        static_cache,
        table_ranges: Vec::new(),
        table_dynamic_buffers: Vec::new(),
        dynamic_buffer_count: 0,
    })
}

// ============================================================================
// Shared layout
// ============================================================================

fn compute_shared_layout<B: BindingModel>(desc: &PipelineResourceSignatureDesc) -> Result<SignatureLayout> {
    let (imtbl_refs, mut immutable_samplers) = resolve_immutable_samplers(desc);
    let suffix = desc.combined_sampler_suffix();
    let groups = B::GROUP_COUNT;
    let sampler_range = B::sampler_range() as usize;

    // Immutable samplers no resource references get a binding of their own
    let standalone: Vec<usize> = if desc.use_combined_texture_samplers {
        Vec::new()
    } else {
        (0..desc.immutable_samplers.len())
            .filter(|&s| !imtbl_refs.contains(&Some(s)))
            .collect()
    };

    // Pass 1: bindings and cache slots per (range, group)
    let mut binding_count = vec![vec![0u32; groups]; B::RANGE_COUNT];
    let mut slot_count = vec![vec![0u32; groups]; B::RANGE_COUNT];
    for res in &desc.resources {
        let (range, group) = (B::range_of(res) as usize, B::group_of(res) as usize);
        binding_count[range][group] += 1;
        slot_count[range][group] += res.array_size;
    }

    // Compact the non-empty ranges into tables
    let mut table_of_range = vec![None; B::RANGE_COUNT];
    let mut table_ranges = Vec::new();
    for range in 0..B::RANGE_COUNT {
        let holds_samplers = range == sampler_range && !standalone.is_empty();
        if holds_samplers || binding_count[range].iter().any(|&c| c > 0) {
            table_of_range[range] = Some(table_ranges.len() as u8);
            table_ranges.push(range as u8);
        }
    }

    // Group start offsets within each table
    let mut next_binding = vec![vec![0u32; groups]; B::RANGE_COUNT];
    let mut next_slot = vec![vec![0u32; groups]; B::RANGE_COUNT];
    for range in 0..B::RANGE_COUNT {
        for group in 1..groups {
            next_binding[range][group] = next_binding[range][group - 1] + binding_count[range][group - 1];
            next_slot[range][group] = next_slot[range][group - 1] + slot_count[range][group - 1];
        }
    }

    let mut table_dynamic_buffers = vec![0u32; table_ranges.len()];
    let mut next_static_slot = 0u32;
    let mut attribs = Vec::with_capacity(desc.resources.len());

    // Pass 2: assign
    for (i, res) in desc.resources.iter().enumerate() {
        let range = B::range_of(res);
        let group = B::group_of(res);
        let table = table_of_range[range as usize]
            .ok_or_else(|| Error::InvalidSignature(format!("resource '{}' has no table", res.name)))?;

        let binding_index = next_binding[range as usize][group as usize];
        next_binding[range as usize][group as usize] += 1;
        let cache_offset = next_slot[range as usize][group as usize];
        next_slot[range as usize][group as usize] += res.array_size;

        if B::is_dynamic_offset_group(group) {
            table_dynamic_buffers[table as usize] += res.array_size;
        }

        let static_location = (res.var_type == VariableType::Static).then(|| {
            let offset = next_static_slot;
            next_static_slot += res.array_size;
            CacheLocation::Table { table: 0, offset }
        });

        let mut bind_points = BindPoints::default();
        for stage in res.stages.stages() {
            bind_points.set(stage, binding_index as u16);
        }

        let assigned_sampler = match (res.resource_type, suffix) {
            (ShaderResourceType::TextureSrv, Some(suffix)) => {
                find_assigned_sampler(&desc.resources, res, suffix).map(|s| s as u32)
            }
            _ => None,
        };

        attribs.push(ResourceAttribs {
            range,
            group,
            bind_points,
            cache_offset,
            binding_index,
            descriptor_kind: B::descriptor_kind(res),
            srb_location: CacheLocation::Table { table, offset: cache_offset },
            static_location,
            assigned_sampler,
            immutable_sampler: imtbl_refs[i].map(|s| s as u32),
        });
    }

    // Standalone samplers follow every resource binding of the sampler table and use no cache slots
    if let Some(table) = table_of_range[sampler_range] {
        let mut next = binding_count[sampler_range].iter().sum::<u32>();
        for &s in &standalone {
            let mut bind_points = BindPoints::default();
            for stage in desc.immutable_samplers[s].stages.stages() {
                bind_points.set(stage, next as u16);
            }
            immutable_samplers[s].array_size = 1;
            immutable_samplers[s].bind_points = bind_points;
            immutable_samplers[s].table_binding = Some((table, next));
            next += 1;
        }
    }

    let table_sizes: Vec<u32> = table_ranges
        .iter()
        .map(|&range| slot_count[range as usize].iter().sum())
        .collect();

    let binding_counts = BindingCounts {
        slots: [[0; MAX_BINDING_RANGES]; MAX_SHADER_STAGES],
        tables: table_ranges.len() as u32,
    };

    Ok(SignatureLayout {
        attribs,
        immutable_samplers,
        binding_counts,
        srb_cache: CacheLayout::Tables { sizes: table_sizes },
        static_cache: (next_static_slot > 0).then(|| CacheLayout::Tables { sizes: vec![next_static_slot] }),
        dynamic_buffer_count: table_dynamic_buffers.iter().sum(),
        table_ranges,
        table_dynamic_buffers,
    })
}

#[cfg(test)]
#[path = "layout_tests.rs"]
mod tests;
