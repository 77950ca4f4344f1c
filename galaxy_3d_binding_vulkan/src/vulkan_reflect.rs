/// SPIR-V reflection
///
/// Extracts the descriptor resources of a SPIR-V module with spirq, in the form
/// `Shader::new` expects. Push constants and vertex inputs are not reported.

use galaxy_3d_binding::galaxy3d::binding::{ShaderResourceType, ShaderStage};
use galaxy_3d_binding::galaxy3d::device::BufferMode;
use galaxy_3d_binding::galaxy3d::pipeline::ShaderResourceDesc;
use galaxy_3d_binding::galaxy3d::Result;
use galaxy_3d_binding::{engine_debug, engine_err, engine_warn};
use spirq::ty::{AccessType, DescriptorType};
use spirq::var::Variable;

/// Resource type and buffer mode of a SPIR-V descriptor type
pub fn resource_type_of(desc_ty: &DescriptorType) -> (ShaderResourceType, BufferMode) {
    match desc_ty {
        DescriptorType::UniformBuffer() => (ShaderResourceType::ConstantBuffer, BufferMode::Undefined),
        DescriptorType::StorageBuffer(AccessType::ReadOnly) => (ShaderResourceType::BufferSrv, BufferMode::Undefined),
        DescriptorType::StorageBuffer(_) => (ShaderResourceType::BufferUav, BufferMode::Undefined),
        DescriptorType::UniformTexelBuffer() => (ShaderResourceType::BufferSrv, BufferMode::Formatted),
        DescriptorType::StorageTexelBuffer(_) => (ShaderResourceType::BufferUav, BufferMode::Formatted),
        DescriptorType::SampledImage() | DescriptorType::CombinedImageSampler() => {
            (ShaderResourceType::TextureSrv, BufferMode::Undefined)
        }
        DescriptorType::StorageImage(_) => (ShaderResourceType::TextureUav, BufferMode::Undefined),
        DescriptorType::Sampler() => (ShaderResourceType::Sampler, BufferMode::Undefined),
        DescriptorType::InputAttachment(_) => (ShaderResourceType::InputAttachment, BufferMode::Undefined),
        DescriptorType::AccelStruct() => (ShaderResourceType::AccelStruct, BufferMode::Undefined),
    }
}

/// Descriptor resources declared by `code`, referenced or not
///
/// Unnamed descriptors cannot be matched against a signature and are skipped
/// with a warning. Runtime arrays are reported with an array size of 0.
pub fn reflect_spirv(code: &[u32], stage: ShaderStage) -> Result<Vec<ShaderResourceDesc>> {
    let entry_points = spirq::ReflectConfig::new()
        .spv(code)
        .ref_all_rscs(true)
        .reflect()
        .map_err(|e| engine_err!("galaxy3d::vulkan", "SPIR-V reflection failed: {:?}", e))?;

    let mut resources: Vec<ShaderResourceDesc> = Vec::new();
    for entry_point in &entry_points {
        for var in entry_point.vars.iter() {
            let Variable::Descriptor { name, desc_ty, nbind, .. } = var else {
                continue;
            };
            let Some(name) = name.clone().filter(|n| !n.is_empty()) else {
                engine_warn!(
                    "galaxy3d::vulkan",
                    "Skipping unnamed {:?} descriptor in {} shader",
                    desc_ty,
                    stage.name()
                );
                continue;
            };
            // Entry points of one module share their descriptors
            if resources.iter().any(|r| r.name == name) {
                continue;
            }
            let (resource_type, buffer_mode) = resource_type_of(desc_ty);
            resources.push(
                ShaderResourceDesc::new(name, resource_type)
                    .with_array_size(*nbind)
                    .with_buffer_mode(buffer_mode),
            );
        }
    }

    engine_debug!(
        "galaxy3d::vulkan",
        "Reflected {} resources from {} shader",
        resources.len(),
        stage.name()
    );
    Ok(resources)
}

#[cfg(test)]
#[path = "vulkan_reflect_tests.rs"]
mod tests;
