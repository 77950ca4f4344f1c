//! Root table model: CBV/SRV/UAV and sampler heaps, split by update frequency

use crate::binding::binding_model::{BindingModel, SlotScope};
use crate::binding::resource_desc::{PipelineResourceDesc, ShaderResourceType, VariableType};

pub const D3D12_TABLE_STATIC_RESOURCES: u8 = 0;
pub const D3D12_TABLE_STATIC_SAMPLERS: u8 = 1;
pub const D3D12_TABLE_DYNAMIC_RESOURCES: u8 = 2;
pub const D3D12_TABLE_DYNAMIC_SAMPLERS: u8 = 3;

/// D3D12-style binding: up to four root descriptor tables
///
/// Static and mutable resources share one table per heap type, dynamic resources
/// get their own. Immutable samplers become static samplers of the root signature.
pub struct D3D12Model;

impl BindingModel for D3D12Model {
    const NAME: &'static str = "D3D12";
    const SCOPE: SlotScope = SlotScope::Shared;
    const RANGE_COUNT: usize = 4;
    const GROUP_COUNT: usize = 1;
    const IMMUTABLE_SAMPLERS_IN_CACHE: bool = false;

    fn range_of(desc: &PipelineResourceDesc) -> u8 {
        let sampler = desc.resource_type == ShaderResourceType::Sampler;
        match (desc.var_type == VariableType::Dynamic, sampler) {
            (false, false) => D3D12_TABLE_STATIC_RESOURCES,
            (false, true) => D3D12_TABLE_STATIC_SAMPLERS,
            (true, false) => D3D12_TABLE_DYNAMIC_RESOURCES,
            (true, true) => D3D12_TABLE_DYNAMIC_SAMPLERS,
        }
    }

    fn range_name(range: u8) -> &'static str {
        match range {
            D3D12_TABLE_STATIC_RESOURCES => "CBV_SRV_UAV (static/mutable)",
            D3D12_TABLE_STATIC_SAMPLERS => "Sampler (static/mutable)",
            D3D12_TABLE_DYNAMIC_RESOURCES => "CBV_SRV_UAV (dynamic)",
            D3D12_TABLE_DYNAMIC_SAMPLERS => "Sampler (dynamic)",
            _ => "Unknown",
        }
    }

    fn sampler_range() -> u8 {
        D3D12_TABLE_STATIC_SAMPLERS
    }
}
