//! Native binding model abstraction
//!
//! The signature, cache, variable manager and SRB are generic over a `BindingModel`.
//! A model classifies resources into ranges (register kinds for flat models, table kinds
//! for set-based models) and groups, and answers the handful of questions where
//! D3D11-like, D3D12-like and Vulkan-like binding differ.

use crate::binding::resource_desc::{
    PipelineResourceDesc, PipelineResourceFlags, PipelineType, ShaderResourceType, MAX_SHADER_STAGES,
};
use crate::error::Result;

/// Upper bound of `BindingModel::RANGE_COUNT` over every model
pub const MAX_BINDING_RANGES: usize = 4;

/// How bind points are addressed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotScope {
    /// Every shader stage has its own register space per range (D3D11)
    PerStage,
    /// Resources live in tables/descriptor sets shared by all stages (D3D12, Vulkan)
    Shared,
}

/// Native descriptor kind of a resource
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DescriptorKind {
    UniformBuffer,
    UniformBufferDynamic,
    SeparateImage,
    CombinedImageSampler,
    UniformTexelBuffer,
    StorageTexelBuffer,
    StorageBuffer,
    StorageBufferDynamic,
    StorageBufferReadOnly,
    StorageBufferDynamicReadOnly,
    StorageImage,
    Sampler,
    InputAttachment,
    InputAttachmentGeneral,
    AccelerationStructure,
}

impl DescriptorKind {
    /// Descriptor kind for a resource type and its flags
    pub fn from_resource(resource_type: ShaderResourceType, flags: PipelineResourceFlags) -> Self {
        let no_dynamic = flags.contains(PipelineResourceFlags::NO_DYNAMIC_BUFFERS);
        let formatted = flags.contains(PipelineResourceFlags::FORMATTED_BUFFER);
        match resource_type {
            ShaderResourceType::ConstantBuffer => {
                if no_dynamic {
                    DescriptorKind::UniformBuffer
                } else {
                    DescriptorKind::UniformBufferDynamic
                }
            }
            ShaderResourceType::TextureSrv => {
                if flags.contains(PipelineResourceFlags::COMBINED_SAMPLER) {
                    DescriptorKind::CombinedImageSampler
                } else {
                    DescriptorKind::SeparateImage
                }
            }
            ShaderResourceType::BufferSrv => {
                if formatted {
                    DescriptorKind::UniformTexelBuffer
                } else if no_dynamic {
                    DescriptorKind::StorageBufferReadOnly
                } else {
                    DescriptorKind::StorageBufferDynamicReadOnly
                }
            }
            ShaderResourceType::TextureUav => DescriptorKind::StorageImage,
            ShaderResourceType::BufferUav => {
                if formatted {
                    DescriptorKind::StorageTexelBuffer
                } else if no_dynamic {
                    DescriptorKind::StorageBuffer
                } else {
                    DescriptorKind::StorageBufferDynamic
                }
            }
            ShaderResourceType::Sampler => DescriptorKind::Sampler,
            ShaderResourceType::InputAttachment => {
                if flags.contains(PipelineResourceFlags::GENERAL_INPUT_ATTACHMENT) {
                    DescriptorKind::InputAttachmentGeneral
                } else {
                    DescriptorKind::InputAttachment
                }
            }
            ShaderResourceType::AccelStruct => DescriptorKind::AccelerationStructure,
        }
    }

    pub fn is_dynamic_uniform(self) -> bool {
        self == DescriptorKind::UniformBufferDynamic
    }

    pub fn is_dynamic_storage(self) -> bool {
        matches!(self, DescriptorKind::StorageBufferDynamic | DescriptorKind::StorageBufferDynamicReadOnly)
    }

    /// Whether descriptors of this kind consume a dynamic offset at bind time
    pub fn has_dynamic_offset(self) -> bool {
        self.is_dynamic_uniform() || self.is_dynamic_storage()
    }
}

/// First bind point of every (stage, range) pair, plus the first table index
///
/// A pipeline state combining several signatures shifts each signature by the
/// binding counts of the signatures before it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BaseBindings {
    pub slots: [[u32; MAX_BINDING_RANGES]; MAX_SHADER_STAGES],
    pub first_table: u32,
}

impl BaseBindings {
    pub fn get(&self, stage: usize, range: u8) -> u32 {
        self.slots[stage][range as usize]
    }
}

/// Number of bind points a signature consumes per (stage, range) and the number of its tables
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
pub struct BindingCounts {
    pub slots: [[u32; MAX_BINDING_RANGES]; MAX_SHADER_STAGES],
    pub tables: u32,
}

impl BindingCounts {
    pub fn get(&self, stage: usize, range: u8) -> u32 {
        self.slots[stage][range as usize]
    }
}

/// Backend binding model
pub trait BindingModel: Send + Sync + 'static {
    /// Name used in log messages
    const NAME: &'static str;
    const SCOPE: SlotScope;
    /// Number of ranges returned by `range_of` (at most `MAX_BINDING_RANGES`)
    const RANGE_COUNT: usize;
    /// Number of groups returned by `group_of`
    const GROUP_COUNT: usize;
    /// Whether immutable samplers occupy resource cache slots
    const IMMUTABLE_SAMPLERS_IN_CACHE: bool;

    /// Register range (flat models) or table kind (shared models) of a resource
    fn range_of(desc: &PipelineResourceDesc) -> u8;

    /// Group within a table; cache offsets and binding indices follow group order
    fn group_of(_desc: &PipelineResourceDesc) -> u8 {
        0
    }

    fn range_name(range: u8) -> &'static str;

    /// Number of native slots available in a range
    fn max_slots(_range: u8) -> u32 {
        u32::MAX
    }

    /// Range where samplers live
    fn sampler_range() -> u8;

    /// Model-specific validation of one resource
    fn validate_resource(_desc: &PipelineResourceDesc) -> Result<()> {
        Ok(())
    }

    /// Base bindings of the first signature of a pipeline
    fn initial_base_bindings(_pipeline_type: PipelineType, _num_render_targets: u32) -> BaseBindings {
        BaseBindings::default()
    }

    /// Whether resources in `group` are bound with dynamic offsets
    fn is_dynamic_offset_group(_group: u8) -> bool {
        false
    }

    fn descriptor_kind(desc: &PipelineResourceDesc) -> DescriptorKind {
        DescriptorKind::from_resource(desc.resource_type, desc.flags)
    }
}

#[cfg(test)]
#[path = "binding_model_tests.rs"]
mod tests;
