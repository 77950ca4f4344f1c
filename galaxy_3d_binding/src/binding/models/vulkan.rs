//! Descriptor set model

use crate::binding::binding_model::{BindingModel, SlotScope};
use crate::binding::resource_desc::{PipelineResourceDesc, VariableType};

pub const VULKAN_SET_STATIC_MUTABLE: u8 = 0;
pub const VULKAN_SET_DYNAMIC: u8 = 1;

pub const VULKAN_GROUP_DYNAMIC_UNIFORM: u8 = 0;
pub const VULKAN_GROUP_DYNAMIC_STORAGE: u8 = 1;
pub const VULKAN_GROUP_OTHER: u8 = 2;

/// Vulkan-style binding: one descriptor set for static and mutable resources, one for
/// dynamic resources
///
/// Inside a set, dynamic uniform buffers come first, then dynamic storage buffers,
/// then everything else, so dynamic offsets can be gathered in binding order.
pub struct VulkanModel;

impl BindingModel for VulkanModel {
    const NAME: &'static str = "Vulkan";
    const SCOPE: SlotScope = SlotScope::Shared;
    const RANGE_COUNT: usize = 2;
    const GROUP_COUNT: usize = 3;
    const IMMUTABLE_SAMPLERS_IN_CACHE: bool = false;

    fn range_of(desc: &PipelineResourceDesc) -> u8 {
        if desc.var_type == VariableType::Dynamic {
            VULKAN_SET_DYNAMIC
        } else {
            VULKAN_SET_STATIC_MUTABLE
        }
    }

    fn group_of(desc: &PipelineResourceDesc) -> u8 {
        let kind = Self::descriptor_kind(desc);
        if kind.is_dynamic_uniform() {
            VULKAN_GROUP_DYNAMIC_UNIFORM
        } else if kind.is_dynamic_storage() {
            VULKAN_GROUP_DYNAMIC_STORAGE
        } else {
            VULKAN_GROUP_OTHER
        }
    }

    fn range_name(range: u8) -> &'static str {
        match range {
            VULKAN_SET_STATIC_MUTABLE => "static/mutable set",
            VULKAN_SET_DYNAMIC => "dynamic set",
            _ => "Unknown",
        }
    }

    fn sampler_range() -> u8 {
        VULKAN_SET_STATIC_MUTABLE
    }

    fn is_dynamic_offset_group(group: u8) -> bool {
        group == VULKAN_GROUP_DYNAMIC_UNIFORM || group == VULKAN_GROUP_DYNAMIC_STORAGE
    }
}
