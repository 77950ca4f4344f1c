//! Flat register model: one register space per shader stage and register kind

use crate::binding::binding_model::{BaseBindings, BindingModel, SlotScope};
use crate::binding::resource_desc::{PipelineResourceDesc, PipelineType, ShaderResourceType, ShaderStage, ShaderStages};
use crate::error::{Error, Result};

pub const D3D11_RANGE_CBV: u8 = 0;
pub const D3D11_RANGE_SRV: u8 = 1;
pub const D3D11_RANGE_SAMPLER: u8 = 2;
pub const D3D11_RANGE_UAV: u8 = 3;

const MAX_CONSTANT_BUFFERS: u32 = 14;
const MAX_SHADER_RESOURCES: u32 = 128;
const MAX_SAMPLERS: u32 = 16;
const MAX_UNORDERED_ACCESS_VIEWS: u32 = 8;

/// D3D11-style binding: CBV/SRV/Sampler/UAV registers per stage
pub struct D3D11Model;

impl BindingModel for D3D11Model {
    const NAME: &'static str = "D3D11";
    const SCOPE: SlotScope = SlotScope::PerStage;
    const RANGE_COUNT: usize = 4;
    const GROUP_COUNT: usize = 1;
    const IMMUTABLE_SAMPLERS_IN_CACHE: bool = true;

    fn range_of(desc: &PipelineResourceDesc) -> u8 {
        match desc.resource_type {
            ShaderResourceType::ConstantBuffer => D3D11_RANGE_CBV,
            ShaderResourceType::TextureSrv
            | ShaderResourceType::BufferSrv
            | ShaderResourceType::InputAttachment
            | ShaderResourceType::AccelStruct => D3D11_RANGE_SRV,
            ShaderResourceType::Sampler => D3D11_RANGE_SAMPLER,
            ShaderResourceType::TextureUav | ShaderResourceType::BufferUav => D3D11_RANGE_UAV,
        }
    }

    fn range_name(range: u8) -> &'static str {
        match range {
            D3D11_RANGE_CBV => "CBV",
            D3D11_RANGE_SRV => "SRV",
            D3D11_RANGE_SAMPLER => "Sampler",
            D3D11_RANGE_UAV => "UAV",
            _ => "Unknown",
        }
    }

    fn max_slots(range: u8) -> u32 {
        match range {
            D3D11_RANGE_CBV => MAX_CONSTANT_BUFFERS,
            D3D11_RANGE_SRV => MAX_SHADER_RESOURCES,
            D3D11_RANGE_SAMPLER => MAX_SAMPLERS,
            D3D11_RANGE_UAV => MAX_UNORDERED_ACCESS_VIEWS,
            _ => 0,
        }
    }

    fn sampler_range() -> u8 {
        D3D11_RANGE_SAMPLER
    }

    fn validate_resource(desc: &PipelineResourceDesc) -> Result<()> {
        match desc.resource_type {
            ShaderResourceType::TextureUav | ShaderResourceType::BufferUav => {
                let allowed = ShaderStages::PIXEL | ShaderStages::COMPUTE;
                if !allowed.contains(desc.stages) {
                    return Err(Error::InvalidSignature(format!(
                        "UAV '{}' is visible in {:?}, but D3D11 only supports UAVs in pixel and compute shaders",
                        desc.name, desc.stages
                    )));
                }
                Ok(())
            }
            ShaderResourceType::AccelStruct => Err(Error::InvalidSignature(format!(
                "acceleration structure '{}' is not supported by the D3D11 binding model",
                desc.name
            ))),
            _ => Ok(()),
        }
    }

    /// Pixel shader UAVs share register space with render targets
    fn initial_base_bindings(pipeline_type: PipelineType, num_render_targets: u32) -> BaseBindings {
        let mut base = BaseBindings::default();
        if pipeline_type == PipelineType::Graphics {
            base.slots[ShaderStage::Pixel.index()][D3D11_RANGE_UAV as usize] = num_render_targets;
        }
        base
    }
}
