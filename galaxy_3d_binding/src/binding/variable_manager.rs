//! Per-stage variable lookup over a signature's resources

use std::sync::Mutex;

use crate::binding::attribs::ResourceAttribs;
use crate::binding::binding_model::{BindingModel, SlotScope};
use crate::binding::resource_cache::{CacheContentType, ShaderResourceCache};
use crate::binding::resource_desc::{
    BindShaderResourcesFlags, PipelineResourceSignatureDesc, SetShaderResourceFlags, ShaderResourceType, ShaderStage,
    VariableType,
};
use crate::binding::resource_mapping::ResourceMapping;
use crate::binding::signature::{lock_cache, PipelineResourceSignature};
use crate::binding::variable::ShaderResourceVariable;

/// Variables of one shader stage, filtered by variable type
#[derive(Debug, Clone)]
pub struct ShaderVariableManager {
    stage: ShaderStage,
    content: CacheContentType,
    /// Signature resource index of every variable
    resources: Vec<u32>,
}

impl ShaderVariableManager {
    /// Manager over the resources of `signature` visible in `stage` whose type is in `allowed`
    pub fn new<B: BindingModel>(
        signature: &PipelineResourceSignature<B>,
        stage: ShaderStage,
        allowed: &[VariableType],
        content: CacheContentType,
    ) -> Self {
        Self::from_parts::<B>(signature.desc(), signature.all_attribs(), stage, allowed, content)
    }

    pub(crate) fn from_parts<B: BindingModel>(
        desc: &PipelineResourceSignatureDesc,
        attribs: &[ResourceAttribs],
        stage: ShaderStage,
        allowed: &[VariableType],
        content: CacheContentType,
    ) -> Self {
        // Samplers paired with textures are set through the texture in flat models
        let paired_samplers: Vec<u32> = match B::SCOPE {
            SlotScope::PerStage => attribs.iter().filter_map(|a| a.assigned_sampler).collect(),
            SlotScope::Shared => Vec::new(),
        };
        let resources = desc
            .resources
            .iter()
            .zip(attribs)
            .enumerate()
            .filter(|(i, (res, attr))| {
                let is_sampler = res.resource_type == ShaderResourceType::Sampler;
                res.stages.contains(stage.flag())
                    && allowed.contains(&res.var_type)
                    && !(is_sampler && attr.is_immutable_sampler_assigned())
                    && !(is_sampler && paired_samplers.contains(&(*i as u32)))
            })
            .map(|(i, _)| i as u32)
            .collect();
        Self {
            stage,
            content,
            resources,
        }
    }

    pub fn stage(&self) -> ShaderStage {
        self.stage
    }

    pub fn variable_count(&self) -> u32 {
        self.resources.len() as u32
    }

    /// Signature resource index of variable `index`
    pub fn resource_index(&self, index: u32) -> Option<u32> {
        self.resources.get(index as usize).copied()
    }

    /// Exact name lookup; `None` when no variable has this name
    pub fn get_variable_by_name<'a, B: BindingModel>(
        &self,
        signature: &'a PipelineResourceSignature<B>,
        cache: &'a Mutex<ShaderResourceCache>,
        name: &str,
    ) -> Option<ShaderResourceVariable<'a, B>> {
        let index = self
            .resources
            .iter()
            .position(|&r| signature.resource(r).name == name)?;
        self.get_variable_by_index(signature, cache, index as u32)
    }

    pub fn get_variable_by_index<'a, B: BindingModel>(
        &self,
        signature: &'a PipelineResourceSignature<B>,
        cache: &'a Mutex<ShaderResourceCache>,
        index: u32,
    ) -> Option<ShaderResourceVariable<'a, B>> {
        let resource_index = self.resource_index(index)?;
        Some(ShaderResourceVariable::new(signature, cache, self.content, resource_index, index))
    }

    fn effective_flags(flags: BindShaderResourcesFlags) -> BindShaderResourcesFlags {
        if flags.intersects(BindShaderResourcesFlags::UPDATE_ALL) {
            flags
        } else {
            flags | BindShaderResourcesFlags::UPDATE_ALL
        }
    }

    /// Bind every variable whose type is selected by `flags` from `mapping`
    pub fn bind_resources<B: BindingModel>(
        &self,
        signature: &PipelineResourceSignature<B>,
        cache: &Mutex<ShaderResourceCache>,
        mapping: &ResourceMapping,
        flags: BindShaderResourcesFlags,
    ) {
        let flags = Self::effective_flags(flags);
        let set_flags = if flags.contains(BindShaderResourcesFlags::ALLOW_OVERWRITE) {
            SetShaderResourceFlags::ALLOW_OVERWRITE
        } else {
            SetShaderResourceFlags::empty()
        };

        for index in 0..self.variable_count() {
            let Some(variable) = self.get_variable_by_index(signature, cache, index) else {
                continue;
            };
            if !flags.contains(variable.get_type().update_flag()) {
                continue;
            }
            for elem in 0..variable.array_size() {
                let bound = variable.is_bound(elem);
                if bound && flags.contains(BindShaderResourcesFlags::KEEP_EXISTING) {
                    continue;
                }
                match mapping.get_resource(variable.name(), elem) {
                    Some(object) => {
                        variable.bind(Some(object.clone()), elem, set_flags);
                    }
                    None => {
                        if !bound && flags.contains(BindShaderResourcesFlags::VERIFY_ALL_RESOLVED) {
                            crate::engine_error!(
                                "galaxy3d::ShaderVariable",
                                "Unable to resolve resource '{}' (element {}) of signature '{}' in the {} stage",
                                variable.name(),
                                elem,
                                signature.name(),
                                self.stage.name()
                            );
                        }
                    }
                }
            }
        }
    }

    /// Whether `bind_resources` with the same arguments would change any binding
    pub fn check_resources<B: BindingModel>(
        &self,
        signature: &PipelineResourceSignature<B>,
        cache: &Mutex<ShaderResourceCache>,
        mapping: &ResourceMapping,
        flags: BindShaderResourcesFlags,
    ) -> bool {
        let flags = Self::effective_flags(flags);
        let cache = lock_cache(cache);
        self.resources.iter().any(|&r| {
            let desc = signature.resource(r);
            let attribs = signature.attribs(r);
            let location = match self.content {
                CacheContentType::Signature => attribs.static_location,
                CacheContentType::Srb => Some(attribs.srb_location),
            };
            let Some(location) = location else {
                return false;
            };
            flags.contains(desc.var_type.update_flag())
                && (0..desc.array_size).any(|elem| {
                    let bound = cache.get_object(&location, elem);
                    if bound.is_some() && flags.contains(BindShaderResourcesFlags::KEEP_EXISTING) {
                        return false;
                    }
                    match (mapping.get_resource(&desc.name, elem), bound) {
                        (Some(object), Some(bound)) => !object.ptr_eq(&bound),
                        (Some(_), None) => true,
                        (None, _) => false,
                    }
                })
        })
    }
}

#[cfg(test)]
#[path = "variable_manager_tests.rs"]
mod tests;
