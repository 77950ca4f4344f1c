//! Pipeline resource signature
//!
//! A signature declares the resources a pipeline uses and decides, once, where each
//! of them lives: native bind points, cache locations and descriptor set / root
//! table layouts. It owns the static resource cache shared by every SRB created
//! from it, and the pool SRB caches are allocated from.

use std::hash::{Hash, Hasher};
use std::marker::PhantomData;
use std::ops::Range;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use rustc_hash::FxHasher;

use crate::binding::attribs::{CacheLocation, ImmutableSamplerAttribs, ResourceAttribs};
use crate::binding::binding_model::{
    BaseBindings, BindingCounts, BindingModel, DescriptorKind, SlotScope, MAX_BINDING_RANGES,
};
use crate::binding::layout::compute_layout;
use crate::binding::resource_cache::{CacheContentType, CacheLayout, ShaderResourceCache};
use crate::binding::resource_desc::{
    BindShaderResourcesFlags, ImmutableSamplerDesc, PipelineResourceDesc, PipelineResourceFlags,
    PipelineResourceSignatureDesc, PipelineType, ShaderResourceType, ShaderStage, ShaderStages, VariableType, MAX_SHADER_STAGES, NUM_VARIABLE_TYPES,
};
use crate::binding::resource_mapping::ResourceMapping;
use crate::binding::srb::{ResourceCachePool, ShaderResourceBinding};
use crate::binding::validation::validate_signature_desc;
use crate::binding::variable::ShaderResourceVariable;
use crate::binding::variable_manager::ShaderVariableManager;
use crate::binding::verify::{verify_texture_view, BindTarget};
use crate::device::{
    BufferMode, DescriptorSetLayoutInfo, DeviceObject, LayoutBinding, PipelineLayoutInfo, RenderDevice,
};
use crate::engine::Engine;
use crate::error::{Error, Result};
use crate::pipeline::ShaderResourceDesc;

/// Lock a cache mutex, recovering the data if a panicking thread poisoned it
pub(crate) fn lock_cache(cache: &Mutex<ShaderResourceCache>) -> MutexGuard<'_, ShaderResourceCache> {
    cache.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Declarative resource layout shared by pipeline states and SRBs
pub struct PipelineResourceSignature<B: BindingModel> {
    device: Arc<dyn RenderDevice>,
    desc: PipelineResourceSignatureDesc,
    /// `None` for a signature without resources
    pipeline_type: Option<PipelineType>,
    attribs: Vec<ResourceAttribs>,
    immutable_samplers: Vec<ImmutableSamplerAttribs>,
    /// `resource_offsets[v]..resource_offsets[v + 1]` are the resources of variable type `v`
    resource_offsets: [u32; NUM_VARIABLE_TYPES + 1],
    binding_counts: BindingCounts,
    srb_cache_layout: CacheLayout,
    table_ranges: Vec<u8>,
    table_layouts: Vec<DescriptorSetLayoutInfo>,
    dynamic_buffer_count: u32,
    static_cache: Option<Mutex<ShaderResourceCache>>,
    static_managers: Vec<ShaderVariableManager>,
    srb_granularity: u32,
    cache_pool: Mutex<ResourceCachePool>,
    hash: u64,
    _model: PhantomData<B>,
}

impl<B: BindingModel> PipelineResourceSignature<B> {
    /// Validate `desc`, compute its layout and create its immutable samplers
    ///
    /// # Errors
    ///
    /// Returns `InvalidSignature` for an invalid description or a layout that does not
    /// fit the binding model, and propagates device errors from sampler creation.
    pub fn new(device: Arc<dyn RenderDevice>, mut desc: PipelineResourceSignatureDesc) -> Result<Arc<Self>> {
        // ========== VALIDATION ==========
        validate_signature_desc::<B>(&desc).map_err(Self::log_error)?;

        // ========== SORT BY VARIABLE TYPE ==========
        desc.resources.sort_by_key(|r| r.var_type);
        let mut resource_offsets = [0u32; NUM_VARIABLE_TYPES + 1];
        for var_type in VariableType::ALL {
            let count = desc.resources.iter().filter(|r| r.var_type == var_type).count() as u32;
            resource_offsets[var_type.index() + 1] = resource_offsets[var_type.index()] + count;
        }

        // ========== LAYOUT ==========
        let mut layout = compute_layout::<B>(&desc).map_err(|e| match e {
            Error::InvalidSignature(msg) => Self::log_error(Error::InvalidSignature(format!("'{}': {}", desc.name, msg))),
            other => Self::log_error(other),
        })?;

        // ========== IMMUTABLE SAMPLERS ==========
        for (attribs, sampler_desc) in layout.immutable_samplers.iter_mut().zip(&desc.immutable_samplers) {
            attribs.sampler = Some(device.create_sampler(&sampler_desc.desc)?);
        }

        let table_layouts = match B::SCOPE {
            SlotScope::PerStage => Vec::new(),
            SlotScope::Shared => build_table_layouts(&desc, &layout.attribs, &layout.immutable_samplers, &layout.table_dynamic_buffers),
        };

        let all_stages = desc
            .resources
            .iter()
            .map(|r| r.stages)
            .chain(desc.immutable_samplers.iter().map(|s| s.stages))
            .fold(ShaderStages::empty(), |acc, stages| acc | stages);
        let pipeline_type = if all_stages.is_empty() {
            None
        } else if all_stages.contains(ShaderStages::COMPUTE) {
            Some(PipelineType::Compute)
        } else {
            Some(PipelineType::Graphics)
        };

        // ========== STATIC CACHE ==========
        let static_cache = match &layout.static_cache {
            Some(static_layout) => {
                let mut cache = ShaderResourceCache::new(CacheContentType::Signature);
                cache.initialize(static_layout)?;
                if B::IMMUTABLE_SAMPLERS_IN_CACHE {
                    write_immutable_samplers(&mut cache, &layout.immutable_samplers);
                }
                Some(Mutex::new(cache))
            }
            None => None,
        };
        let static_managers = if static_cache.is_some() {
            all_stages
                .stages()
                .map(|stage| {
                    ShaderVariableManager::from_parts::<B>(
                        &desc,
                        &layout.attribs,
                        stage,
                        &[VariableType::Static],
                        CacheContentType::Signature,
                    )
                })
                .filter(|m| m.variable_count() > 0)
                .collect()
        } else {
            Vec::new()
        };

        let hash = compute_hash(&desc, &layout.attribs, &layout.immutable_samplers);
        let srb_granularity = match desc.srb_allocation_granularity {
            0 => Engine::config().srb_allocation_granularity,
            granularity => granularity,
        };

        crate::engine_debug!(
            "galaxy3d::Signature",
            "Created {} signature '{}': {} resources, {} immutable samplers, {} cache slots per SRB",
            B::NAME,
            desc.name,
            desc.resources.len(),
            desc.immutable_samplers.len(),
            layout.srb_cache.total_slots()
        );

        Ok(Arc::new(Self {
            device,
            pipeline_type,
            attribs: layout.attribs,
            immutable_samplers: layout.immutable_samplers,
            resource_offsets,
            binding_counts: layout.binding_counts,
            cache_pool: Mutex::new(ResourceCachePool::new(srb_granularity)),
            srb_cache_layout: layout.srb_cache,
            table_ranges: layout.table_ranges,
            table_layouts,
            dynamic_buffer_count: layout.dynamic_buffer_count,
            static_cache,
            static_managers,
            srb_granularity,
            hash,
            desc,
            _model: PhantomData,
        }))
    }

    fn log_error(error: Error) -> Error {
        crate::engine_error!("galaxy3d::Signature", "{}", error);
        error
    }

    // ===== DESCRIPTION =====

    pub fn desc(&self) -> &PipelineResourceSignatureDesc {
        &self.desc
    }

    pub fn name(&self) -> &str {
        &self.desc.name
    }

    pub fn binding_index(&self) -> u8 {
        self.desc.binding_index
    }

    pub fn pipeline_type(&self) -> Option<PipelineType> {
        self.pipeline_type
    }

    pub fn device(&self) -> &Arc<dyn RenderDevice> {
        &self.device
    }

    pub fn resource_count(&self) -> u32 {
        self.desc.resources.len() as u32
    }

    pub fn resource(&self, index: u32) -> &PipelineResourceDesc {
        &self.desc.resources[index as usize]
    }

    pub fn attribs(&self, index: u32) -> &ResourceAttribs {
        &self.attribs[index as usize]
    }

    pub(crate) fn all_attribs(&self) -> &[ResourceAttribs] {
        &self.attribs
    }

    /// Indices of the resources of one variable type
    pub fn resource_index_range(&self, var_type: VariableType) -> Range<u32> {
        self.resource_offsets[var_type.index()]..self.resource_offsets[var_type.index() + 1]
    }

    pub fn num_resources(&self, var_type: VariableType) -> u32 {
        self.resource_index_range(var_type).len() as u32
    }

    pub fn immutable_sampler_count(&self) -> u32 {
        self.immutable_samplers.len() as u32
    }

    pub fn immutable_sampler(&self, index: u32) -> &ImmutableSamplerAttribs {
        &self.immutable_samplers[index as usize]
    }

    pub fn immutable_sampler_desc(&self, index: u32) -> &ImmutableSamplerDesc {
        &self.desc.immutable_samplers[index as usize]
    }

    /// Index of the resource named `name` that is visible in `stage`
    pub fn find_resource(&self, stage: ShaderStage, name: &str) -> Option<u32> {
        self.desc
            .resources
            .iter()
            .position(|r| r.stages.contains(stage.flag()) && r.name == name)
            .map(|i| i as u32)
    }

    /// Whether the signature declares nothing at all
    pub fn is_empty(&self) -> bool {
        self.desc.resources.is_empty() && self.desc.immutable_samplers.is_empty()
    }

    // ===== LAYOUT =====

    pub fn binding_counts(&self) -> &BindingCounts {
        &self.binding_counts
    }

    /// Advance `base` past the bind points and tables this signature uses
    pub fn shift_bindings(&self, base: &mut BaseBindings) {
        for stage in 0..MAX_SHADER_STAGES {
            for range in 0..MAX_BINDING_RANGES {
                base.slots[stage][range] = base.slots[stage][range].saturating_add(self.binding_counts.slots[stage][range]);
            }
        }
        base.first_table += self.binding_counts.tables;
    }

    pub fn srb_cache_layout(&self) -> &CacheLayout {
        &self.srb_cache_layout
    }

    /// Range kind of every table, shared models only
    pub fn table_ranges(&self) -> &[u8] {
        &self.table_ranges
    }

    /// Native layout of every table, shared models only
    pub fn table_layouts(&self) -> &[DescriptorSetLayoutInfo] {
        &self.table_layouts
    }

    pub fn layout_info(&self) -> PipelineLayoutInfo {
        PipelineLayoutInfo {
            sets: self.table_layouts.clone(),
        }
    }

    /// Number of elements bound with dynamic offsets
    pub fn dynamic_buffer_count(&self) -> u32 {
        self.dynamic_buffer_count
    }

    pub fn srb_allocation_granularity(&self) -> u32 {
        self.srb_granularity
    }

    pub fn hash(&self) -> u64 {
        self.hash
    }

    // ===== COMPATIBILITY =====

    /// Whether SRBs of `self` can be committed with pipelines using `other`
    pub fn is_compatible_with(&self, other: &Self) -> bool {
        if std::ptr::eq(self, other) {
            return true;
        }
        if self.hash != other.hash
            || self.desc.binding_index != other.desc.binding_index
            || self.desc.resources.len() != other.desc.resources.len()
            || self.desc.immutable_samplers.len() != other.desc.immutable_samplers.len()
        {
            return false;
        }

        let resources_match = self
            .desc
            .resources
            .iter()
            .zip(&other.desc.resources)
            .zip(self.attribs.iter().zip(&other.attribs))
            .all(|((r0, r1), (a0, a1))| {
                r0.stages == r1.stages
                    && r0.resource_type == r1.resource_type
                    && r0.var_type == r1.var_type
                    && r0.array_size == r1.array_size
                    && r0.flags == r1.flags
                    && a0.is_compatible_with(a1)
            });

        resources_match
            && self
                .desc
                .immutable_samplers
                .iter()
                .zip(&other.desc.immutable_samplers)
                .zip(self.immutable_samplers.iter().zip(&other.immutable_samplers))
                .all(|((s0, s1), (a0, a1))| s0.stages == s1.stages && s0.desc == s1.desc && a0.table_binding == a1.table_binding)
    }

    // ===== STATIC RESOURCES =====

    pub fn has_static_resources(&self) -> bool {
        self.static_cache.is_some()
    }

    fn static_manager(&self, stage: ShaderStage) -> Option<&ShaderVariableManager> {
        self.static_managers.iter().find(|m| m.stage() == stage)
    }

    pub fn static_variable_count(&self, stage: ShaderStage) -> u32 {
        self.static_manager(stage).map(|m| m.variable_count()).unwrap_or(0)
    }

    pub fn get_static_variable_by_name(&self, stage: ShaderStage, name: &str) -> Option<ShaderResourceVariable<'_, B>> {
        let cache = self.static_cache.as_ref()?;
        self.static_manager(stage)?.get_variable_by_name(self, cache, name)
    }

    pub fn get_static_variable_by_index(&self, stage: ShaderStage, index: u32) -> Option<ShaderResourceVariable<'_, B>> {
        let cache = self.static_cache.as_ref()?;
        self.static_manager(stage)?.get_variable_by_index(self, cache, index)
    }

    /// Bind static variables of `stages` from `mapping`
    pub fn bind_static_resources(&self, stages: ShaderStages, mapping: &ResourceMapping, flags: BindShaderResourcesFlags) {
        let Some(cache) = self.static_cache.as_ref() else {
            return;
        };
        for manager in self.static_managers.iter().filter(|m| stages.contains(m.stage().flag())) {
            manager.bind_resources(self, cache, mapping, flags);
        }
    }

    /// Run `f` on the static cache, if the signature has one
    pub fn with_static_cache<R>(&self, f: impl FnOnce(&ShaderResourceCache) -> R) -> Option<R> {
        self.static_cache.as_ref().map(|cache| f(&*lock_cache(cache)))
    }

    /// Copy every static resource into an SRB cache
    ///
    /// Returns `false` and reports each static element that is not bound.
    pub fn copy_static_resources(&self, dst: &mut ShaderResourceCache) -> bool {
        let Some(static_cache) = self.static_cache.as_ref() else {
            return true;
        };
        let src = lock_cache(static_cache);
        let mut all_bound = true;
        for index in self.resource_index_range(VariableType::Static) {
            let desc = self.resource(index);
            let attribs = self.attribs(index);
            if desc.resource_type == ShaderResourceType::Sampler && attribs.is_immutable_sampler_assigned() {
                continue;
            }
            let Some(src_location) = attribs.static_location else {
                continue;
            };
            for elem in 0..desc.array_size {
                if !dst.copy_resource(&src, &src_location, &attribs.srb_location, elem) {
                    crate::engine_error!(
                        "galaxy3d::Signature",
                        "No resource is bound to static variable '{}' (element {}) of signature '{}'",
                        desc.name,
                        elem,
                        self.desc.name
                    );
                    all_bound = false;
                }
            }
        }
        all_bound
    }

    // ===== SRB =====

    /// Size an SRB cache and write the immutable samplers it holds
    ///
    /// # Errors
    ///
    /// Returns an error when the cache is already initialized.
    pub fn init_srb_resource_cache(&self, cache: &mut ShaderResourceCache) -> Result<()> {
        cache.initialize(&self.srb_cache_layout)?;
        cache.set_dynamic_buffer_count(self.dynamic_buffer_count);
        if B::IMMUTABLE_SAMPLERS_IN_CACHE {
            write_immutable_samplers(cache, &self.immutable_samplers);
        }
        Ok(())
    }

    /// Take an initialized SRB cache, from the pool when the granularity is above 1
    pub(crate) fn allocate_srb_cache(&self) -> Result<(Option<u32>, ShaderResourceCache)> {
        if self.srb_granularity <= 1 {
            let mut cache = ShaderResourceCache::new(CacheContentType::Srb);
            self.init_srb_resource_cache(&mut cache)?;
            return Ok((None, cache));
        }
        let mut pool = self.cache_pool.lock().unwrap_or_else(PoisonError::into_inner);
        let (slot, mut cache) = pool.acquire(|cache| self.init_srb_resource_cache(cache))?;
        if B::IMMUTABLE_SAMPLERS_IN_CACHE {
            write_immutable_samplers(&mut cache, &self.immutable_samplers);
        }
        Ok((Some(slot), cache))
    }

    pub(crate) fn release_srb_cache(&self, slot: u32, cache: ShaderResourceCache) {
        let mut pool = self.cache_pool.lock().unwrap_or_else(PoisonError::into_inner);
        pool.release(slot, cache);
    }

    /// Number of SRB caches handed out by the pool
    pub fn pooled_srb_count(&self) -> u32 {
        self.cache_pool.lock().unwrap_or_else(PoisonError::into_inner).in_use()
    }

    /// Create an SRB, optionally copying the static resources into it right away
    pub fn create_shader_resource_binding(
        self: &Arc<Self>,
        init_static_resources: bool,
    ) -> Result<Arc<ShaderResourceBinding<B>>> {
        let srb = ShaderResourceBinding::new(self.clone())?;
        if init_static_resources {
            srb.initialize_static_resources(None);
        }
        Ok(Arc::new(srb))
    }

    /// Copy this signature's static resources into `srb`
    pub fn initialize_static_srb_resources(&self, srb: &ShaderResourceBinding<B>) {
        srb.initialize_static_resources(Some(self));
    }

    // ===== DEVELOPMENT VALIDATION =====

    /// Check the objects bound to resource `index` against what a shader declares
    ///
    /// Reports every mismatch and returns whether the binding is valid.
    pub fn dvp_validate_committed_resource(
        &self,
        shader_name: &str,
        shader_resource: &ShaderResourceDesc,
        index: u32,
        cache: &ShaderResourceCache,
    ) -> bool {
        let desc = self.resource(index);
        let attribs = self.attribs(index);
        if shader_resource.array_size > desc.array_size {
            crate::engine_error!(
                "galaxy3d::Signature",
                "Shader '{}' declares '{}' with array size {}, but signature '{}' only has {}",
                shader_name,
                shader_resource.name,
                shader_resource.array_size,
                self.desc.name,
                desc.array_size
            );
            return false;
        }

        let mut valid = true;
        for elem in 0..shader_resource.array_size.min(desc.array_size) {
            let Some(object) = cache.get_object(&attribs.srb_location, elem) else {
                continue;
            };
            let target = BindTarget {
                signature: &self.desc.name,
                desc,
                elem,
            };
            match &object {
                DeviceObject::TextureView(_) => {
                    let expected = Some((shader_resource.dimension, shader_resource.is_multisample));
                    valid &= verify_texture_view(&target, &object, expected);
                }
                DeviceObject::BufferView(view) => {
                    let mode = view.buffer().desc().mode;
                    let expects_formatted = shader_resource.buffer_mode == BufferMode::Formatted;
                    if shader_resource.buffer_mode != BufferMode::Undefined && expects_formatted != (mode == BufferMode::Formatted) {
                        crate::engine_error!(
                            "galaxy3d::Signature",
                            "Shader '{}' expects a {:?} buffer for '{}[{}]', but a {:?} buffer is bound",
                            shader_name,
                            shader_resource.buffer_mode,
                            desc.name,
                            elem,
                            mode
                        );
                        valid = false;
                    }
                }
                _ => {}
            }
        }
        valid
    }
}

/// `true` when both are missing or empty, or both are compatible
pub fn signatures_compatible<B: BindingModel>(
    a: Option<&PipelineResourceSignature<B>>,
    b: Option<&PipelineResourceSignature<B>>,
) -> bool {
    let a = a.filter(|s| !s.is_empty());
    let b = b.filter(|s| !s.is_empty());
    match (a, b) {
        (None, None) => true,
        (Some(a), Some(b)) => a.is_compatible_with(b),
        _ => false,
    }
}

// ============================================================================
// Helpers
// ============================================================================

/// Write every allocated immutable sampler into its cache slots
fn write_immutable_samplers(cache: &mut ShaderResourceCache, samplers: &[ImmutableSamplerAttribs]) {
    for sampler_attribs in samplers {
        let (Some(location), Some(sampler)) = (&sampler_attribs.location, &sampler_attribs.sampler) else {
            continue;
        };
        for elem in 0..sampler_attribs.array_size {
            cache.set_resource(location, elem, Some(DeviceObject::Sampler(sampler.clone())));
        }
    }
}

/// Native layout of every table of a shared-model signature
fn build_table_layouts(
    desc: &PipelineResourceSignatureDesc,
    attribs: &[ResourceAttribs],
    immutable_samplers: &[ImmutableSamplerAttribs],
    table_dynamic_buffers: &[u32],
) -> Vec<DescriptorSetLayoutInfo> {
    let mut layouts: Vec<DescriptorSetLayoutInfo> = table_dynamic_buffers
        .iter()
        .map(|&dynamic_buffer_count| DescriptorSetLayoutInfo {
            bindings: Vec::new(),
            dynamic_buffer_count,
        })
        .collect();

    for (res, attr) in desc.resources.iter().zip(attribs) {
        let CacheLocation::Table { table, .. } = attr.srb_location else {
            continue;
        };
        let bakes_sampler = res.resource_type == ShaderResourceType::Sampler
            || attr.descriptor_kind == DescriptorKind::CombinedImageSampler;
        let samplers = match attr.immutable_sampler {
            Some(s) if bakes_sampler => immutable_samplers[s as usize]
                .sampler
                .as_ref()
                .map(|sampler| vec![sampler.clone(); res.array_size as usize])
                .unwrap_or_default(),
            _ => Vec::new(),
        };
        if let Some(layout) = layouts.get_mut(table as usize) {
            layout.bindings.push(LayoutBinding {
                binding: attr.binding_index,
                cache_offset: attr.cache_offset,
                array_size: res.array_size,
                resource_type: res.resource_type,
                flags: res.flags,
                stages: res.stages,
                descriptor_kind: attr.descriptor_kind,
                immutable_samplers: samplers,
            });
        }
    }

    for (sampler_desc, sampler_attribs) in desc.immutable_samplers.iter().zip(immutable_samplers) {
        let (Some((table, binding)), Some(sampler)) = (sampler_attribs.table_binding, &sampler_attribs.sampler) else {
            continue;
        };
        if let Some(layout) = layouts.get_mut(table as usize) {
            layout.bindings.push(LayoutBinding {
                binding,
                cache_offset: 0,
                array_size: 1,
                resource_type: ShaderResourceType::Sampler,
                flags: PipelineResourceFlags::empty(),
                stages: sampler_desc.stages,
                descriptor_kind: DescriptorKind::from_resource(ShaderResourceType::Sampler, PipelineResourceFlags::empty()),
                immutable_samplers: vec![sampler.clone()],
            });
        }
    }

    for layout in &mut layouts {
        layout.bindings.sort_by_key(|b| b.binding);
    }
    layouts
}

/// Layout hash; resource names do not take part in it
fn compute_hash(
    desc: &PipelineResourceSignatureDesc,
    attribs: &[ResourceAttribs],
    immutable_samplers: &[ImmutableSamplerAttribs],
) -> u64 {
    let mut hasher = FxHasher::default();
    desc.binding_index.hash(&mut hasher);
    desc.resources.len().hash(&mut hasher);
    for (res, attr) in desc.resources.iter().zip(attribs) {
        res.stages.hash(&mut hasher);
        res.resource_type.hash(&mut hasher);
        res.var_type.hash(&mut hasher);
        res.array_size.hash(&mut hasher);
        res.flags.hash(&mut hasher);
        attr.hash_layout(&mut hasher);
    }
    desc.immutable_samplers.len().hash(&mut hasher);
    for (sampler, sampler_attribs) in desc.immutable_samplers.iter().zip(immutable_samplers) {
        sampler.stages.hash(&mut hasher);
        sampler.desc.hash(&mut hasher);
        sampler_attribs.table_binding.hash(&mut hasher);
    }
    hasher.finish()
}

#[cfg(test)]
#[path = "signature_tests.rs"]
mod tests;
