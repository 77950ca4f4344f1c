//! Pipeline resource signatures and shader variable binding
//!
//! A `PipelineResourceSignature` describes the resources of a pipeline and computes
//! their native layout for a `BindingModel`. Static resources are bound on the
//! signature; mutable and dynamic resources are bound on `ShaderResourceBinding`s
//! created from it.

mod attribs;
mod binding_model;
mod layout;
pub mod models;
mod resource_cache;
mod resource_desc;
mod resource_mapping;
mod signature;
mod srb;
mod validation;
mod variable;
mod variable_manager;
mod verify;

pub use attribs::{BindPoints, CacheLocation, ImmutableSamplerAttribs, ResourceAttribs};
pub use binding_model::{BaseBindings, BindingCounts, BindingModel, DescriptorKind, SlotScope, MAX_BINDING_RANGES};
pub use models::{D3D11Model, D3D12Model, VulkanModel};
pub use resource_cache::{CacheContentType, CacheLayout, CacheTable, CachedResource, ShaderResourceCache};
pub use resource_desc::*;
pub use resource_mapping::ResourceMapping;
pub use signature::{signatures_compatible, PipelineResourceSignature};
pub use srb::ShaderResourceBinding;
pub use validation::{validate_signature_desc, MAX_SIGNATURE_RESOURCES};
pub use variable::ShaderResourceVariable;
pub use variable_manager::ShaderVariableManager;

