//! Construction-time validation of signature descriptions

use rustc_hash::FxHashMap;

use crate::binding::binding_model::BindingModel;
use crate::binding::resource_desc::{
    PipelineResourceSignatureDesc, ShaderResourceType, ShaderStages, MAX_RESOURCE_SIGNATURES,
};
use crate::error::{Error, Result};

/// Largest number of resources a signature may declare
pub const MAX_SIGNATURE_RESOURCES: usize = 0xFFFF;

fn invalid(desc: &PipelineResourceSignatureDesc, message: String) -> Error {
    Error::InvalidSignature(format!("'{}': {}", desc.name, message))
}

/// Check a signature description before its layout is computed
pub fn validate_signature_desc<B: BindingModel>(desc: &PipelineResourceSignatureDesc) -> Result<()> {
    if desc.binding_index >= MAX_RESOURCE_SIGNATURES {
        return Err(invalid(
            desc,
            format!(
                "binding index ({}) exceeds the maximum allowed value ({})",
                desc.binding_index,
                MAX_RESOURCE_SIGNATURES - 1
            ),
        ));
    }
    if desc.resources.len() > MAX_SIGNATURE_RESOURCES {
        return Err(invalid(
            desc,
            format!(
                "the number of resources ({}) exceeds the maximum allowed value ({})",
                desc.resources.len(),
                MAX_SIGNATURE_RESOURCES
            ),
        ));
    }
    if desc.use_combined_texture_samplers && desc.combined_sampler_suffix.is_empty() {
        return Err(invalid(desc, "combined sampler suffix must not be empty".to_string()));
    }

    let mut by_name: FxHashMap<&str, Vec<usize>> = FxHashMap::default();

    for (i, res) in desc.resources.iter().enumerate() {
        if res.name.is_empty() {
            return Err(invalid(desc, format!("resource {} has an empty name", i)));
        }
        if res.stages.is_empty() {
            return Err(invalid(desc, format!("resource '{}' is not visible in any shader stage", res.name)));
        }
        if res.array_size == 0 {
            return Err(invalid(desc, format!("resource '{}' has zero array size", res.name)));
        }
        let disallowed = res.flags - res.resource_type.allowed_flags();
        if !disallowed.is_empty() {
            return Err(invalid(
                desc,
                format!(
                    "flags {:?} of resource '{}' are not allowed for a {}",
                    disallowed,
                    res.name,
                    res.resource_type.name()
                ),
            ));
        }

        let same_name = by_name.entry(res.name.as_str()).or_default();
        for &other in same_name.iter() {
            if desc.resources[other].stages.intersects(res.stages) {
                return Err(invalid(
                    desc,
                    format!(
                        "resource '{}' is declared more than once in stages {:?}",
                        res.name,
                        desc.resources[other].stages & res.stages
                    ),
                ));
            }
        }
        same_name.push(i);

        B::validate_resource(res).map_err(|e| match e {
            Error::InvalidSignature(msg) => invalid(desc, msg),
            other => other,
        })?;
    }

    if let Some(suffix) = desc.combined_sampler_suffix() {
        for tex in desc.resources.iter().filter(|r| r.resource_type == ShaderResourceType::TextureSrv) {
            let sampler_name = format!("{}{}", tex.name, suffix);
            for sampler in desc
                .resources
                .iter()
                .filter(|r| r.resource_type == ShaderResourceType::Sampler && r.name == sampler_name && r.stages.intersects(tex.stages))
            {
                if sampler.stages != tex.stages {
                    return Err(invalid(
                        desc,
                        format!(
                            "texture '{}' and its assigned sampler '{}' must be visible in the same stages ({:?} vs {:?})",
                            tex.name, sampler.name, tex.stages, sampler.stages
                        ),
                    ));
                }
                if sampler.var_type != tex.var_type {
                    return Err(invalid(
                        desc,
                        format!(
                            "texture '{}' is {}, but its assigned sampler '{}' is {}",
                            tex.name,
                            tex.var_type.name(),
                            sampler.name,
                            sampler.var_type.name()
                        ),
                    ));
                }
            }
        }
    }

    for (i, sampler) in desc.immutable_samplers.iter().enumerate() {
        if sampler.sampler_or_texture_name.is_empty() {
            return Err(invalid(desc, format!("immutable sampler {} has an empty name", i)));
        }
        if sampler.stages.is_empty() {
            return Err(invalid(
                desc,
                format!("immutable sampler '{}' is not visible in any shader stage", sampler.sampler_or_texture_name),
            ));
        }
    }

    let all_stages = desc
        .resources
        .iter()
        .map(|r| r.stages)
        .chain(desc.immutable_samplers.iter().map(|s| s.stages))
        .fold(ShaderStages::empty(), |acc, stages| acc | stages);
    if all_stages.contains(ShaderStages::COMPUTE) && all_stages.intersects(ShaderStages::ALL_GRAPHICS) {
        return Err(invalid(
            desc,
            format!("compute and graphics stages can not be mixed in one signature ({:?})", all_stages),
        ));
    }

    Ok(())
}

#[cfg(test)]
#[path = "validation_tests.rs"]
mod tests;
