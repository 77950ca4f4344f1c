//! Pipeline state: shaders, the signatures they bind through and the native pipeline
//!
//! A pipeline state resolves every resource its shaders declare against its
//! signatures when it is created, and commits SRBs into a command recorder.

use std::sync::Arc;

use crate::binding::{
    signatures_compatible, BaseBindings, BindShaderResourcesFlags, BindingModel, CacheLocation, ImmutableSamplerDesc,
    PipelineResourceDesc, PipelineResourceFlags, PipelineResourceSignature, PipelineResourceSignatureDesc,
    PipelineType, ResourceMapping, ShaderResourceBinding, ShaderResourceCache, ShaderResourceType,
    ShaderResourceVariable, ShaderStage, ShaderStages, SlotScope, StateTransitionMode, VariableType,
    DEFAULT_COMBINED_SAMPLER_SUFFIX, MAX_RESOURCE_SIGNATURES,
};
use crate::device::{
    BufferMode, CommandRecorder, DescriptorSetCommit, NativeHandle, NativePipeline, NativePipelineInfo,
    PipelineLayoutInfo, RenderDevice, SlotBinding,
};
use crate::error::{Error, Result};
use crate::pipeline::shader::{Shader, ShaderResourceDesc};

// ===== DESCRIPTORS =====

/// Variable type and flags of a named resource of an implicit signature
#[derive(Debug, Clone)]
pub struct ShaderResourceVariableDesc {
    pub stages: ShaderStages,
    pub name: String,
    pub var_type: VariableType,
    pub flags: PipelineResourceFlags,
}

impl ShaderResourceVariableDesc {
    pub fn new(stages: ShaderStages, name: impl Into<String>, var_type: VariableType) -> Self {
        Self {
            stages,
            name: name.into(),
            var_type,
            flags: PipelineResourceFlags::empty(),
        }
    }

    pub fn with_flags(mut self, flags: PipelineResourceFlags) -> Self {
        self.flags = flags;
        self
    }
}

/// How an implicit signature is built from shader reflection
#[derive(Debug, Clone)]
pub struct PipelineResourceLayoutDesc {
    /// Variable type of every resource without an override in `variables`
    pub default_var_type: VariableType,
    pub variables: Vec<ShaderResourceVariableDesc>,
    pub immutable_samplers: Vec<ImmutableSamplerDesc>,
    pub use_combined_texture_samplers: bool,
    pub combined_sampler_suffix: String,
}

impl Default for PipelineResourceLayoutDesc {
    fn default() -> Self {
        Self {
            default_var_type: VariableType::Static,
            variables: Vec::new(),
            immutable_samplers: Vec::new(),
            use_combined_texture_samplers: false,
            combined_sampler_suffix: DEFAULT_COMBINED_SAMPLER_SUFFIX.to_string(),
        }
    }
}

impl PipelineResourceLayoutDesc {
    /// Override of the variable `name` as seen from `stage`
    fn variable(&self, stage: ShaderStage, name: &str) -> Option<&ShaderResourceVariableDesc> {
        self.variables.iter().find(|v| v.name == name && v.stages.contains(stage.flag()))
    }
}

/// Descriptor for creating a pipeline state
pub struct PipelineStateDesc<B: BindingModel> {
    pub name: String,
    pub pipeline_type: PipelineType,
    pub shaders: Vec<Arc<Shader>>,
    /// Explicit signatures; when empty, one is built from reflection and `resource_layout`
    pub signatures: Vec<Arc<PipelineResourceSignature<B>>>,
    pub resource_layout: PipelineResourceLayoutDesc,
    pub num_render_targets: u32,
    /// SRB cache granularity of the implicit signature; 0 uses the engine config
    pub srb_allocation_granularity: u32,
}

impl<B: BindingModel> PipelineStateDesc<B> {
    pub fn new(name: impl Into<String>, pipeline_type: PipelineType) -> Self {
        Self {
            name: name.into(),
            pipeline_type,
            shaders: Vec::new(),
            signatures: Vec::new(),
            resource_layout: PipelineResourceLayoutDesc::default(),
            num_render_targets: if pipeline_type == PipelineType::Graphics { 1 } else { 0 },
            srb_allocation_granularity: 0,
        }
    }

    pub fn with_shader(mut self, shader: Arc<Shader>) -> Self {
        self.shaders.push(shader);
        self
    }

    pub fn with_signature(mut self, signature: Arc<PipelineResourceSignature<B>>) -> Self {
        self.signatures.push(signature);
        self
    }

    pub fn with_resource_layout(mut self, layout: PipelineResourceLayoutDesc) -> Self {
        self.resource_layout = layout;
        self
    }

    pub fn with_num_render_targets(mut self, count: u32) -> Self {
        self.num_render_targets = count;
        self
    }
}

/// Shader resource resolved to a signature resource
#[derive(Debug, Clone, Copy)]
struct ResolvedResource {
    shader: usize,
    shader_resource: usize,
    binding_index: u8,
    signature_resource: u32,
}

/// What a successful commit did
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct CommitInfo {
    pub barriers: usize,
}

// ===== PIPELINE STATE =====

pub struct PipelineState<B: BindingModel> {
    name: String,
    pipeline_type: PipelineType,
    shaders: Vec<Arc<Shader>>,
    /// Indexed by binding index
    signatures: Vec<Option<Arc<PipelineResourceSignature<B>>>>,
    /// First bind points of every signature, indexed by binding index
    base_bindings: Vec<BaseBindings>,
    resolved: Vec<ResolvedResource>,
    implicit_signature: bool,
    native: Arc<dyn NativePipeline>,
}

fn invalid(message: String) -> Error {
    crate::engine_error!("galaxy3d::PipelineState", "{}", message);
    Error::InvalidPipelineState(message)
}

impl<B: BindingModel> PipelineState<B> {
    /// Resolve the shaders' resources and create the native pipeline
    ///
    /// # Errors
    ///
    /// Returns `InvalidPipelineState` when the shaders or signatures are inconsistent,
    /// and propagates signature and device errors.
    pub fn new(device: Arc<dyn RenderDevice>, desc: PipelineStateDesc<B>) -> Result<Arc<Self>> {
        // ========== VALIDATION 1: Shader stages ==========
        if desc.shaders.is_empty() {
            return Err(invalid(format!("Pipeline state '{}' has no shaders", desc.name)));
        }
        let allowed = desc.pipeline_type.allowed_stages();
        let mut seen = ShaderStages::empty();
        for shader in &desc.shaders {
            let flag = shader.stage().flag();
            if !allowed.contains(flag) {
                return Err(invalid(format!(
                    "Shader '{}' ({} stage) can not be used in {:?} pipeline state '{}'",
                    shader.name(),
                    shader.stage().name(),
                    desc.pipeline_type,
                    desc.name
                )));
            }
            if seen.contains(flag) {
                return Err(invalid(format!(
                    "Pipeline state '{}' has more than one {} shader",
                    desc.name,
                    shader.stage().name()
                )));
            }
            seen |= flag;
        }

        // ========== SIGNATURES ==========
        let implicit_signature = desc.signatures.is_empty();
        let signature_list = if implicit_signature {
            let signature_desc = implicit_signature_desc(&desc)?;
            vec![PipelineResourceSignature::<B>::new(device.clone(), signature_desc)?]
        } else {
            desc.signatures.clone()
        };

        // ========== VALIDATION 2: Binding indices and pipeline types ==========
        let mut signatures: Vec<Option<Arc<PipelineResourceSignature<B>>>> = Vec::new();
        for signature in signature_list {
            let index = signature.binding_index() as usize;
            if index >= MAX_RESOURCE_SIGNATURES as usize {
                return Err(invalid(format!(
                    "Signature '{}' uses binding index {}, the maximum is {}",
                    signature.name(),
                    index,
                    MAX_RESOURCE_SIGNATURES - 1
                )));
            }
            if let Some(signature_type) = signature.pipeline_type() {
                if signature_type != desc.pipeline_type {
                    return Err(invalid(format!(
                        "Signature '{}' is a {:?} signature and can not be used in {:?} pipeline state '{}'",
                        signature.name(),
                        signature_type,
                        desc.pipeline_type,
                        desc.name
                    )));
                }
            }
            if signatures.len() <= index {
                signatures.resize(index + 1, None);
            }
            if let Some(existing) = &signatures[index] {
                return Err(invalid(format!(
                    "Signatures '{}' and '{}' of pipeline state '{}' share binding index {}",
                    existing.name(),
                    signature.name(),
                    desc.name,
                    index
                )));
            }
            signatures[index] = Some(signature);
        }

        // ========== VALIDATION 3: Every shader resource resolves ==========
        let mut resolved = Vec::new();
        for (shader_index, shader) in desc.shaders.iter().enumerate() {
            for (resource_index, resource) in shader.resources().iter().enumerate() {
                if let Some((binding_index, signature_resource)) =
                    resolve_resource(&signatures, shader, resource, &desc.name)?
                {
                    resolved.push(ResolvedResource {
                        shader: shader_index,
                        shader_resource: resource_index,
                        binding_index,
                        signature_resource,
                    });
                }
            }
        }

        // ========== BASE BINDINGS AND NATIVE LAYOUT ==========
        let initial = B::initial_base_bindings(desc.pipeline_type, desc.num_render_targets);
        let mut base = initial;
        let mut base_bindings = Vec::with_capacity(signatures.len());
        let mut layout = PipelineLayoutInfo::default();
        for signature in &signatures {
            base_bindings.push(base);
            if let Some(signature) = signature {
                signature.shift_bindings(&mut base);
                layout.sets.extend(signature.table_layouts().iter().cloned());
            }
        }
        for stage in ShaderStage::ALL {
            for range in 0..B::RANGE_COUNT as u8 {
                let reserved = initial.get(stage.index(), range);
                let end = base.get(stage.index(), range);
                let max = B::max_slots(range);
                if end > reserved && end > max {
                    return Err(invalid(format!(
                        "Pipeline state '{}' uses {} {} slots in the {} stage ({} reserved + {} from signatures), but the {} binding model has {}",
                        desc.name,
                        end,
                        B::range_name(range),
                        stage.name(),
                        reserved,
                        end - reserved,
                        B::NAME,
                        max
                    )));
                }
            }
        }

        // ========== NATIVE PIPELINE ==========
        let native = device.create_pipeline(&NativePipelineInfo {
            name: &desc.name,
            pipeline_type: desc.pipeline_type,
            shaders: &desc.shaders,
            layout,
            num_render_targets: desc.num_render_targets,
        })?;

        crate::engine_debug!(
            "galaxy3d::PipelineState",
            "Created {:?} pipeline state '{}' ({} shaders, {} resolved resources, {} layout)",
            desc.pipeline_type,
            desc.name,
            desc.shaders.len(),
            resolved.len(),
            B::NAME
        );

        Ok(Arc::new(Self {
            name: desc.name,
            pipeline_type: desc.pipeline_type,
            shaders: desc.shaders,
            signatures,
            base_bindings,
            resolved,
            implicit_signature,
            native,
        }))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn pipeline_type(&self) -> PipelineType {
        self.pipeline_type
    }

    pub fn shaders(&self) -> &[Arc<Shader>] {
        &self.shaders
    }

    pub fn native(&self) -> &Arc<dyn NativePipeline> {
        &self.native
    }

    /// Whether the signature was built from shader reflection
    pub fn has_implicit_signature(&self) -> bool {
        self.implicit_signature
    }

    // ===== SIGNATURES =====

    /// One past the highest binding index in use
    pub fn signature_count(&self) -> u32 {
        self.signatures.len() as u32
    }

    pub fn signature(&self, binding_index: u8) -> Option<&Arc<PipelineResourceSignature<B>>> {
        self.signatures.get(binding_index as usize).and_then(Option::as_ref)
    }

    pub fn base_bindings(&self, binding_index: u8) -> Option<&BaseBindings> {
        self.base_bindings.get(binding_index as usize)
    }

    /// Whether SRBs committed for `other` can be used with `self`
    pub fn is_compatible_with(&self, other: &Self) -> bool {
        if std::ptr::eq(self, other) {
            return true;
        }
        self.signatures.len() == other.signatures.len()
            && self
                .signatures
                .iter()
                .zip(&other.signatures)
                .all(|(a, b)| signatures_compatible(a.as_deref(), b.as_deref()))
    }

    /// Create an SRB of the only signature of the pipeline state
    pub fn create_shader_resource_binding(&self, init_static_resources: bool) -> Result<Arc<ShaderResourceBinding<B>>> {
        let mut present = self.signatures.iter().flatten();
        match (present.next(), present.next()) {
            (Some(signature), None) => signature.create_shader_resource_binding(init_static_resources),
            _ => Err(invalid(format!(
                "Pipeline state '{}' does not have exactly one signature; create SRBs from its signatures directly",
                self.name
            ))),
        }
    }

    // ===== STATIC RESOURCES =====

    pub fn bind_static_resources(&self, stages: ShaderStages, mapping: &ResourceMapping, flags: BindShaderResourcesFlags) {
        for signature in self.signatures.iter().flatten() {
            signature.bind_static_resources(stages, mapping, flags);
        }
    }

    pub fn static_variable_count(&self, stage: ShaderStage) -> u32 {
        self.signatures.iter().flatten().map(|s| s.static_variable_count(stage)).sum()
    }

    pub fn get_static_variable_by_name(&self, stage: ShaderStage, name: &str) -> Option<ShaderResourceVariable<'_, B>> {
        self.signatures
            .iter()
            .flatten()
            .find_map(|s| s.get_static_variable_by_name(stage, name))
    }

    /// Variables are numbered across signatures in binding index order
    pub fn get_static_variable_by_index(&self, stage: ShaderStage, index: u32) -> Option<ShaderResourceVariable<'_, B>> {
        let mut index = index;
        for signature in self.signatures.iter().flatten() {
            let count = signature.static_variable_count(stage);
            if index < count {
                return signature.get_static_variable_by_index(stage, index);
            }
            index -= count;
        }
        None
    }

    // ===== COMMIT =====

    /// Write the bindings of `srb` into `recorder`
    ///
    /// Returns `false` without recording anything when the SRB does not match the
    /// signature at its binding index.
    pub fn commit_shader_resources(
        &self,
        recorder: &mut dyn CommandRecorder,
        srb: &ShaderResourceBinding<B>,
        mode: StateTransitionMode,
        dev_validation: bool,
    ) -> bool {
        self.commit(recorder, srb, mode, dev_validation).is_some()
    }

    pub(crate) fn commit(
        &self,
        recorder: &mut dyn CommandRecorder,
        srb: &ShaderResourceBinding<B>,
        mode: StateTransitionMode,
        dev_validation: bool,
    ) -> Option<CommitInfo> {
        let binding_index = srb.binding_index();
        let Some(signature) = self.signature(binding_index) else {
            crate::engine_error!(
                "galaxy3d::PipelineState",
                "Pipeline state '{}' has no signature at binding index {} (SRB of signature '{}')",
                self.name,
                binding_index,
                srb.signature().name()
            );
            return None;
        };
        if !signature.is_compatible_with(srb.signature()) {
            crate::engine_error!(
                "galaxy3d::PipelineState",
                "SRB of signature '{}' is not compatible with signature '{}' of pipeline state '{}'",
                srb.signature().name(),
                signature.name(),
                self.name
            );
            return None;
        }

        srb.copy_static_resources_once(Some(signature.as_ref()));

        srb.with_cache(|cache| {
            if dev_validation {
                self.validate_committed_resources(signature, binding_index, cache);
            }

            let barriers = cache.transition_resources(mode);
            if !barriers.is_empty() {
                recorder.transition(&barriers);
            }

            let base = self.base_bindings[binding_index as usize];
            match B::SCOPE {
                SlotScope::PerStage => self.bind_slots(recorder, signature, &base, cache),
                SlotScope::Shared => self.bind_tables(recorder, signature, &base, cache),
            }
            Some(CommitInfo {
                barriers: barriers.len(),
            })
        })
    }

    /// Transition the resources of `srb` into the states its shaders need
    pub fn transition_shader_resources(&self, recorder: &mut dyn CommandRecorder, srb: &ShaderResourceBinding<B>) -> usize {
        let barriers = srb.with_cache(|cache| cache.transition_resources(StateTransitionMode::Transition));
        if !barriers.is_empty() {
            recorder.transition(&barriers);
        }
        barriers.len()
    }

    fn validate_committed_resources(
        &self,
        signature: &PipelineResourceSignature<B>,
        binding_index: u8,
        cache: &ShaderResourceCache,
    ) {
        for var_type in [VariableType::Mutable, VariableType::Dynamic] {
            for index in signature.resource_index_range(var_type) {
                let desc = signature.resource(index);
                let attribs = signature.attribs(index);
                if desc.resource_type == ShaderResourceType::Sampler && attribs.is_immutable_sampler_assigned() {
                    continue;
                }
                if desc.flags.contains(PipelineResourceFlags::RUNTIME_ARRAY) {
                    continue;
                }
                for elem in 0..desc.array_size {
                    if !cache.is_resource_bound(&attribs.srb_location, elem) {
                        crate::engine_warn!(
                            "galaxy3d::PipelineState",
                            "No resource is bound to {} variable '{}' (element {}) of signature '{}' committed with pipeline state '{}'",
                            var_type.name(),
                            desc.name,
                            elem,
                            signature.name(),
                            self.name
                        );
                    }
                }
            }
        }

        for resolved in self.resolved.iter().filter(|r| r.binding_index == binding_index) {
            let shader = &self.shaders[resolved.shader];
            let shader_resource = &shader.resources()[resolved.shader_resource];
            signature.dvp_validate_committed_resource(shader.name(), shader_resource, resolved.signature_resource, cache);
        }
    }

    /// Flat models: one slot range per (stage, register range)
    fn bind_slots(
        &self,
        recorder: &mut dyn CommandRecorder,
        signature: &PipelineResourceSignature<B>,
        base: &BaseBindings,
        cache: &ShaderResourceCache,
    ) {
        let counts = signature.binding_counts();
        for stage in ShaderStage::ALL {
            for range in 0..B::RANGE_COUNT as u8 {
                if counts.get(stage.index(), range) == 0 {
                    continue;
                }
                let Some(table) = cache.stage_table(stage.index(), range) else {
                    continue;
                };
                let handles: Vec<NativeHandle> = table.resources().iter().map(|r| r.handle()).collect();
                let buffer_ranges = if holds_constant_buffers(signature, stage, range) {
                    // Flat models have no dynamic offsets: they are folded into the range start
                    let ranges: Option<Vec<(u64, u64)>> = table
                        .resources()
                        .iter()
                        .map(|r| r.effective_offset().map(|offset| (offset, r.buffer_size())))
                        .collect();
                    let Some(ranges) = ranges else {
                        crate::engine_error!(
                            "galaxy3d::PipelineState",
                            "{} {} slots of signature '{}' not bound: a buffer offset overflows",
                            stage.name(),
                            B::range_name(range),
                            signature.name()
                        );
                        continue;
                    };
                    ranges
                } else {
                    Vec::new()
                };
                recorder.bind_slots(&SlotBinding {
                    stage,
                    range,
                    range_name: B::range_name(range),
                    first_slot: base.get(stage.index(), range),
                    handles,
                    buffer_ranges,
                });
            }
        }
    }

    /// Shared models: one descriptor set per table
    fn bind_tables(
        &self,
        recorder: &mut dyn CommandRecorder,
        signature: &PipelineResourceSignature<B>,
        base: &BaseBindings,
        cache: &mut ShaderResourceCache,
    ) {
        for (index, layout) in signature.table_layouts().iter().enumerate() {
            let Ok(dynamic_offsets) = cache.dynamic_offsets(index, layout) else {
                crate::engine_error!(
                    "galaxy3d::PipelineState",
                    "Descriptor set {} of signature '{}' not bound",
                    base.first_table + index as u32,
                    signature.name()
                );
                continue;
            };
            let result = {
                let Some(table) = cache.table(index) else {
                    continue;
                };
                let commit = DescriptorSetCommit {
                    set_index: base.first_table + index as u32,
                    layout,
                    resources: table.resources(),
                    dirty: cache.is_table_dirty(index),
                    existing: cache.descriptor_set(index),
                    dynamic_offsets,
                };
                recorder.bind_descriptor_set(self.native.as_ref(), &commit)
            };
            match result {
                Ok(set) => {
                    cache.assign_descriptor_set(index, set);
                    cache.clear_dirty(index);
                }
                Err(err) => {
                    crate::engine_error!(
                        "galaxy3d::PipelineState",
                        "Failed to bind descriptor set {} of signature '{}': {}",
                        base.first_table + index as u32,
                        signature.name(),
                        err
                    );
                }
            }
        }
    }
}

fn holds_constant_buffers<B: BindingModel>(signature: &PipelineResourceSignature<B>, stage: ShaderStage, range: u8) -> bool {
    (0..signature.resource_count()).any(|index| {
        let desc = signature.resource(index);
        desc.resource_type == ShaderResourceType::ConstantBuffer
            && desc.stages.contains(stage.flag())
            && matches!(signature.attribs(index).srb_location, CacheLocation::Stages { range: r, .. } if r == range)
    })
}

// ===== RESOLUTION =====

/// Signature resource a shader resource binds through
///
/// `Ok(None)` means the resource is a sampler resolved to an immutable sampler baked into the layout.
fn resolve_resource<B: BindingModel>(
    signatures: &[Option<Arc<PipelineResourceSignature<B>>>],
    shader: &Shader,
    resource: &ShaderResourceDesc,
    pso_name: &str,
) -> Result<Option<(u8, u32)>> {
    let stage = shader.stage();
    for signature in signatures.iter().flatten() {
        let Some(index) = signature.find_resource(stage, &resource.name) else {
            continue;
        };
        let desc = signature.resource(index);
        if desc.resource_type != resource.resource_type {
            return Err(invalid(format!(
                "Shader '{}' declares '{}' as a {}, but signature '{}' defines it as a {}",
                shader.name(),
                resource.name,
                resource.resource_type.name(),
                signature.name(),
                desc.resource_type.name()
            )));
        }
        if resource.array_size > desc.array_size && !desc.flags.contains(PipelineResourceFlags::RUNTIME_ARRAY) {
            return Err(invalid(format!(
                "Shader '{}' declares '{}' with array size {}, but signature '{}' only has {}",
                shader.name(),
                resource.name,
                resource.array_size,
                signature.name(),
                desc.array_size
            )));
        }
        return Ok(Some((signature.binding_index(), index)));
    }

    if resource.resource_type == ShaderResourceType::Sampler
        && signatures
            .iter()
            .flatten()
            .any(|s| has_immutable_sampler(s.desc(), stage, &resource.name))
    {
        return Ok(None);
    }

    Err(invalid(format!(
        "Resource '{}' of shader '{}' is not defined by any signature of pipeline state '{}'",
        resource.name,
        shader.name(),
        pso_name
    )))
}

fn has_immutable_sampler(desc: &PipelineResourceSignatureDesc, stage: ShaderStage, name: &str) -> bool {
    let suffix = desc.combined_sampler_suffix();
    desc.immutable_samplers.iter().filter(|s| s.stages.contains(stage.flag())).any(|s| {
        s.sampler_or_texture_name == name
            || suffix.is_some_and(|suffix| name.strip_suffix(suffix) == Some(s.sampler_or_texture_name.as_str()))
    })
}

// ===== IMPLICIT SIGNATURE =====

/// Signature description merging the resources of every shader of `desc`
fn implicit_signature_desc<B: BindingModel>(desc: &PipelineStateDesc<B>) -> Result<PipelineResourceSignatureDesc> {
    let layout = &desc.resource_layout;
    let mut signature = PipelineResourceSignatureDesc::new(format!("Implicit signature of PSO '{}'", desc.name));
    signature.use_combined_texture_samplers = layout.use_combined_texture_samplers;
    signature.combined_sampler_suffix = layout.combined_sampler_suffix.clone();
    signature.immutable_samplers = layout.immutable_samplers.clone();
    signature.srb_allocation_granularity = desc.srb_allocation_granularity;

    for shader in &desc.shaders {
        let stage = shader.stage();
        for resource in shader.resources() {
            let variable = layout.variable(stage, &resource.name);
            let var_type = variable.map(|v| v.var_type).unwrap_or(layout.default_var_type);
            let mut flags = variable.map(|v| v.flags).unwrap_or_else(PipelineResourceFlags::empty);
            if resource.buffer_mode == BufferMode::Formatted
                && matches!(resource.resource_type, ShaderResourceType::BufferSrv | ShaderResourceType::BufferUav)
            {
                flags |= PipelineResourceFlags::FORMATTED_BUFFER;
            }

            match signature.resources.iter_mut().find(|r| r.name == resource.name) {
                Some(existing) => {
                    if existing.resource_type != resource.resource_type || existing.var_type != var_type {
                        return Err(invalid(format!(
                            "Resource '{}' of pipeline state '{}' is declared as a {} {} and as a {} {} in different shaders",
                            resource.name,
                            desc.name,
                            existing.var_type.name(),
                            existing.resource_type.name(),
                            var_type.name(),
                            resource.resource_type.name()
                        )));
                    }
                    existing.stages |= stage.flag();
                    existing.array_size = existing.array_size.max(resource.array_size);
                    existing.flags |= flags;
                }
                None => signature.resources.push(
                    PipelineResourceDesc::new(stage.flag(), resource.name.clone(), resource.resource_type, var_type)
                        .with_array_size(resource.array_size)
                        .with_flags(flags),
                ),
            }
        }
    }
    Ok(signature)
}

#[cfg(test)]
#[path = "pipeline_state_tests.rs"]
mod tests;
