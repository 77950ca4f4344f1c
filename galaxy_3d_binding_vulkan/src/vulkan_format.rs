/// Conversions between binding layer types and Vulkan types
///
/// Everything here is a pure function so it can be tested without a GPU.

use ash::vk;
use galaxy_3d_binding::galaxy3d::binding::{
    AddressMode, BorderColor, ComparisonFunc, DescriptorKind, FilterMode, SamplerDesc, ShaderStage, ShaderStages,
};
use galaxy_3d_binding::galaxy3d::device::{
    BindFlags, BufferMode, DescriptorSetLayoutInfo, ResourceDimension, ResourceState, TextureFormat,
};

// ============================================================================
// Descriptors
// ============================================================================

pub fn descriptor_type_to_vk(kind: DescriptorKind) -> vk::DescriptorType {
    match kind {
        DescriptorKind::UniformBuffer => vk::DescriptorType::UNIFORM_BUFFER,
        DescriptorKind::UniformBufferDynamic => vk::DescriptorType::UNIFORM_BUFFER_DYNAMIC,
        DescriptorKind::SeparateImage => vk::DescriptorType::SAMPLED_IMAGE,
        DescriptorKind::CombinedImageSampler => vk::DescriptorType::COMBINED_IMAGE_SAMPLER,
        DescriptorKind::UniformTexelBuffer => vk::DescriptorType::UNIFORM_TEXEL_BUFFER,
        DescriptorKind::StorageTexelBuffer => vk::DescriptorType::STORAGE_TEXEL_BUFFER,
        DescriptorKind::StorageBuffer | DescriptorKind::StorageBufferReadOnly => vk::DescriptorType::STORAGE_BUFFER,
        DescriptorKind::StorageBufferDynamic | DescriptorKind::StorageBufferDynamicReadOnly => {
            vk::DescriptorType::STORAGE_BUFFER_DYNAMIC
        }
        DescriptorKind::StorageImage => vk::DescriptorType::STORAGE_IMAGE,
        DescriptorKind::Sampler => vk::DescriptorType::SAMPLER,
        DescriptorKind::InputAttachment | DescriptorKind::InputAttachmentGeneral => {
            vk::DescriptorType::INPUT_ATTACHMENT
        }
        DescriptorKind::AccelerationStructure => vk::DescriptorType::ACCELERATION_STRUCTURE_KHR,
    }
}

/// Image layout a descriptor of this kind expects
pub fn descriptor_image_layout(kind: DescriptorKind) -> vk::ImageLayout {
    match kind {
        DescriptorKind::StorageImage | DescriptorKind::InputAttachmentGeneral => vk::ImageLayout::GENERAL,
        _ => vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL,
    }
}

pub fn shader_stage_to_vk(stage: ShaderStage) -> vk::ShaderStageFlags {
    match stage {
        ShaderStage::Vertex => vk::ShaderStageFlags::VERTEX,
        ShaderStage::Pixel => vk::ShaderStageFlags::FRAGMENT,
        ShaderStage::Geometry => vk::ShaderStageFlags::GEOMETRY,
        ShaderStage::Hull => vk::ShaderStageFlags::TESSELLATION_CONTROL,
        ShaderStage::Domain => vk::ShaderStageFlags::TESSELLATION_EVALUATION,
        ShaderStage::Compute => vk::ShaderStageFlags::COMPUTE,
    }
}

pub fn stages_to_vk(stages: ShaderStages) -> vk::ShaderStageFlags {
    stages
        .stages()
        .fold(vk::ShaderStageFlags::empty(), |flags, stage| flags | shader_stage_to_vk(stage))
}

/// One `VkDescriptorSetLayoutBinding`, owning its immutable sampler handles
#[derive(Debug, Clone, PartialEq)]
pub struct VkLayoutBinding {
    pub binding: u32,
    pub descriptor_type: vk::DescriptorType,
    pub descriptor_count: u32,
    pub stage_flags: vk::ShaderStageFlags,
    /// Empty, or exactly `descriptor_count` samplers
    pub immutable_samplers: Vec<vk::Sampler>,
}

impl VkLayoutBinding {
    pub fn to_vk(&self) -> vk::DescriptorSetLayoutBinding<'_> {
        let binding = vk::DescriptorSetLayoutBinding::default()
            .binding(self.binding)
            .descriptor_type(self.descriptor_type)
            .descriptor_count(self.descriptor_count)
            .stage_flags(self.stage_flags);
        if self.immutable_samplers.is_empty() {
            binding
        } else {
            binding.immutable_samplers(&self.immutable_samplers)
        }
    }
}

/// Vulkan bindings of one descriptor set layout
///
/// A single immutable sampler declared for an array is repeated for every element.
pub fn layout_bindings(info: &DescriptorSetLayoutInfo) -> Vec<VkLayoutBinding> {
    info.bindings
        .iter()
        .map(|binding| {
            let takes_sampler = matches!(
                binding.descriptor_kind,
                DescriptorKind::Sampler | DescriptorKind::CombinedImageSampler
            );
            let immutable_samplers = if takes_sampler && !binding.immutable_samplers.is_empty() {
                (0..binding.array_size as usize)
                    .map(|elem| {
                        let sampler = binding
                            .immutable_samplers
                            .get(elem)
                            .unwrap_or(&binding.immutable_samplers[0]);
                        <vk::Sampler as vk::Handle>::from_raw(sampler.native_handle().0)
                    })
                    .collect()
            } else {
                Vec::new()
            };
            VkLayoutBinding {
                binding: binding.binding,
                descriptor_type: descriptor_type_to_vk(binding.descriptor_kind),
                descriptor_count: binding.array_size,
                stage_flags: stages_to_vk(binding.stages),
                immutable_samplers,
            }
        })
        .collect()
}

/// Pool sizes covering `max_sets` sets of typical binding layouts
pub fn descriptor_pool_sizes(max_sets: u32) -> Vec<vk::DescriptorPoolSize> {
    [
        (vk::DescriptorType::UNIFORM_BUFFER, 2),
        (vk::DescriptorType::UNIFORM_BUFFER_DYNAMIC, 2),
        (vk::DescriptorType::SAMPLED_IMAGE, 4),
        (vk::DescriptorType::COMBINED_IMAGE_SAMPLER, 4),
        (vk::DescriptorType::SAMPLER, 2),
        (vk::DescriptorType::STORAGE_BUFFER, 2),
        (vk::DescriptorType::STORAGE_BUFFER_DYNAMIC, 1),
        (vk::DescriptorType::STORAGE_IMAGE, 1),
        (vk::DescriptorType::UNIFORM_TEXEL_BUFFER, 1),
        (vk::DescriptorType::STORAGE_TEXEL_BUFFER, 1),
        (vk::DescriptorType::INPUT_ATTACHMENT, 1),
    ]
    .into_iter()
    .map(|(ty, per_set)| vk::DescriptorPoolSize {
        ty,
        descriptor_count: per_set * max_sets,
    })
    .collect()
}

// ============================================================================
// Buffers and textures
// ============================================================================

pub fn buffer_usage_to_vk(bind_flags: BindFlags, mode: BufferMode) -> vk::BufferUsageFlags {
    let formatted = mode == BufferMode::Formatted;
    let mut usage = vk::BufferUsageFlags::TRANSFER_SRC | vk::BufferUsageFlags::TRANSFER_DST;
    if bind_flags.contains(BindFlags::VERTEX_BUFFER) {
        usage |= vk::BufferUsageFlags::VERTEX_BUFFER;
    }
    if bind_flags.contains(BindFlags::INDEX_BUFFER) {
        usage |= vk::BufferUsageFlags::INDEX_BUFFER;
    }
    if bind_flags.contains(BindFlags::UNIFORM_BUFFER) {
        usage |= vk::BufferUsageFlags::UNIFORM_BUFFER;
    }
    if bind_flags.contains(BindFlags::SHADER_RESOURCE) {
        usage |= if formatted {
            vk::BufferUsageFlags::UNIFORM_TEXEL_BUFFER
        } else {
            vk::BufferUsageFlags::STORAGE_BUFFER
        };
    }
    if bind_flags.contains(BindFlags::UNORDERED_ACCESS) {
        usage |= if formatted {
            vk::BufferUsageFlags::STORAGE_TEXEL_BUFFER
        } else {
            vk::BufferUsageFlags::STORAGE_BUFFER
        };
    }
    usage
}

/// Texel format of a formatted buffer view, chosen from the element stride
pub fn texel_format_for_stride(element_byte_stride: u32) -> vk::Format {
    match element_byte_stride {
        8 => vk::Format::R32G32_UINT,
        16 => vk::Format::R32G32B32A32_UINT,
        _ => vk::Format::R32_UINT,
    }
}

pub fn texture_format_to_vk(format: TextureFormat) -> vk::Format {
    match format {
        TextureFormat::Unknown => vk::Format::UNDEFINED,
        TextureFormat::R8G8B8A8_UNORM => vk::Format::R8G8B8A8_UNORM,
        TextureFormat::R8G8B8A8_SRGB => vk::Format::R8G8B8A8_SRGB,
        TextureFormat::B8G8R8A8_UNORM => vk::Format::B8G8R8A8_UNORM,
        TextureFormat::B8G8R8A8_SRGB => vk::Format::B8G8R8A8_SRGB,
        TextureFormat::R16G16B16A16_SFLOAT => vk::Format::R16G16B16A16_SFLOAT,
        TextureFormat::R32G32B32A32_SFLOAT => vk::Format::R32G32B32A32_SFLOAT,
        TextureFormat::R32_SFLOAT => vk::Format::R32_SFLOAT,
        TextureFormat::R32_UINT => vk::Format::R32_UINT,
        TextureFormat::D32_FLOAT => vk::Format::D32_SFLOAT,
        TextureFormat::D24_UNORM_S8_UINT => vk::Format::D24_UNORM_S8_UINT,
    }
}

pub fn format_aspect(format: TextureFormat) -> vk::ImageAspectFlags {
    match format {
        TextureFormat::D32_FLOAT => vk::ImageAspectFlags::DEPTH,
        TextureFormat::D24_UNORM_S8_UINT => vk::ImageAspectFlags::DEPTH | vk::ImageAspectFlags::STENCIL,
        _ => vk::ImageAspectFlags::COLOR,
    }
}

pub fn image_type_to_vk(dimension: ResourceDimension) -> vk::ImageType {
    match dimension {
        ResourceDimension::Tex1D | ResourceDimension::Tex1DArray => vk::ImageType::TYPE_1D,
        ResourceDimension::Tex3D => vk::ImageType::TYPE_3D,
        _ => vk::ImageType::TYPE_2D,
    }
}

pub fn image_view_type_to_vk(dimension: ResourceDimension) -> vk::ImageViewType {
    match dimension {
        ResourceDimension::Tex1D => vk::ImageViewType::TYPE_1D,
        ResourceDimension::Tex1DArray => vk::ImageViewType::TYPE_1D_ARRAY,
        ResourceDimension::Tex2DArray => vk::ImageViewType::TYPE_2D_ARRAY,
        ResourceDimension::Tex3D => vk::ImageViewType::TYPE_3D,
        ResourceDimension::TexCube => vk::ImageViewType::CUBE,
        ResourceDimension::TexCubeArray => vk::ImageViewType::CUBE_ARRAY,
        _ => vk::ImageViewType::TYPE_2D,
    }
}

pub fn image_usage_to_vk(bind_flags: BindFlags) -> vk::ImageUsageFlags {
    let mut usage = vk::ImageUsageFlags::TRANSFER_DST | vk::ImageUsageFlags::TRANSFER_SRC;
    if bind_flags.contains(BindFlags::SHADER_RESOURCE) {
        usage |= vk::ImageUsageFlags::SAMPLED;
    }
    if bind_flags.contains(BindFlags::UNORDERED_ACCESS) {
        usage |= vk::ImageUsageFlags::STORAGE;
    }
    if bind_flags.contains(BindFlags::RENDER_TARGET) {
        usage |= vk::ImageUsageFlags::COLOR_ATTACHMENT;
    }
    if bind_flags.contains(BindFlags::DEPTH_STENCIL) {
        usage |= vk::ImageUsageFlags::DEPTH_STENCIL_ATTACHMENT;
    }
    if bind_flags.contains(BindFlags::INPUT_ATTACHMENT) {
        usage |= vk::ImageUsageFlags::INPUT_ATTACHMENT;
    }
    usage
}

pub fn sample_count_to_vk(count: u32) -> vk::SampleCountFlags {
    match count {
        2 => vk::SampleCountFlags::TYPE_2,
        4 => vk::SampleCountFlags::TYPE_4,
        8 => vk::SampleCountFlags::TYPE_8,
        16 => vk::SampleCountFlags::TYPE_16,
        _ => vk::SampleCountFlags::TYPE_1,
    }
}

// ============================================================================
// Samplers
// ============================================================================

pub fn filter_to_vk(filter: FilterMode) -> vk::Filter {
    match filter {
        FilterMode::Nearest => vk::Filter::NEAREST,
        FilterMode::Linear => vk::Filter::LINEAR,
    }
}

pub fn mipmap_mode_to_vk(filter: FilterMode) -> vk::SamplerMipmapMode {
    match filter {
        FilterMode::Nearest => vk::SamplerMipmapMode::NEAREST,
        FilterMode::Linear => vk::SamplerMipmapMode::LINEAR,
    }
}

pub fn address_mode_to_vk(mode: AddressMode) -> vk::SamplerAddressMode {
    match mode {
        AddressMode::Repeat => vk::SamplerAddressMode::REPEAT,
        AddressMode::MirroredRepeat => vk::SamplerAddressMode::MIRRORED_REPEAT,
        AddressMode::ClampToEdge => vk::SamplerAddressMode::CLAMP_TO_EDGE,
        AddressMode::ClampToBorder => vk::SamplerAddressMode::CLAMP_TO_BORDER,
    }
}

pub fn compare_op_to_vk(func: ComparisonFunc) -> vk::CompareOp {
    match func {
        ComparisonFunc::Never => vk::CompareOp::NEVER,
        ComparisonFunc::Less => vk::CompareOp::LESS,
        ComparisonFunc::Equal => vk::CompareOp::EQUAL,
        ComparisonFunc::LessEqual => vk::CompareOp::LESS_OR_EQUAL,
        ComparisonFunc::Greater => vk::CompareOp::GREATER,
        ComparisonFunc::NotEqual => vk::CompareOp::NOT_EQUAL,
        ComparisonFunc::GreaterEqual => vk::CompareOp::GREATER_OR_EQUAL,
        ComparisonFunc::Always => vk::CompareOp::ALWAYS,
    }
}

pub fn border_color_to_vk(color: BorderColor) -> vk::BorderColor {
    match color {
        BorderColor::TransparentBlack => vk::BorderColor::FLOAT_TRANSPARENT_BLACK,
        BorderColor::OpaqueBlack => vk::BorderColor::FLOAT_OPAQUE_BLACK,
        BorderColor::OpaqueWhite => vk::BorderColor::FLOAT_OPAQUE_WHITE,
    }
}

/// Sampler create info; anisotropy is clamped to `max_supported_anisotropy`
pub fn sampler_create_info(desc: &SamplerDesc, max_supported_anisotropy: f32) -> vk::SamplerCreateInfo<'static> {
    let mut create_info = vk::SamplerCreateInfo::default()
        .mag_filter(filter_to_vk(desc.mag_filter))
        .min_filter(filter_to_vk(desc.min_filter))
        .mipmap_mode(mipmap_mode_to_vk(desc.mip_filter))
        .address_mode_u(address_mode_to_vk(desc.address_u))
        .address_mode_v(address_mode_to_vk(desc.address_v))
        .address_mode_w(address_mode_to_vk(desc.address_w))
        .mip_lod_bias(desc.mip_lod_bias)
        .min_lod(desc.min_lod)
        .max_lod(desc.max_lod.min(vk::LOD_CLAMP_NONE))
        .border_color(border_color_to_vk(desc.border_color))
        .unnormalized_coordinates(false);

    create_info = match desc.comparison {
        Some(func) => create_info.compare_enable(true).compare_op(compare_op_to_vk(func)),
        None => create_info.compare_enable(false).compare_op(vk::CompareOp::ALWAYS),
    };

    if desc.max_anisotropy > 1 {
        create_info
            .anisotropy_enable(true)
            .max_anisotropy((desc.max_anisotropy as f32).min(max_supported_anisotropy))
    } else {
        create_info.anisotropy_enable(false).max_anisotropy(1.0)
    }
}

// ============================================================================
// Barriers
// ============================================================================

/// Access mask, pipeline stages and image layout of a resource state
pub fn resource_state_to_vk(state: ResourceState) -> (vk::AccessFlags, vk::PipelineStageFlags, vk::ImageLayout) {
    let shader_stages = vk::PipelineStageFlags::VERTEX_SHADER
        | vk::PipelineStageFlags::FRAGMENT_SHADER
        | vk::PipelineStageFlags::COMPUTE_SHADER;

    if state.contains(ResourceState::UNORDERED_ACCESS) {
        (
            vk::AccessFlags::SHADER_READ | vk::AccessFlags::SHADER_WRITE,
            shader_stages,
            vk::ImageLayout::GENERAL,
        )
    } else if state.contains(ResourceState::RENDER_TARGET) {
        (
            vk::AccessFlags::COLOR_ATTACHMENT_READ | vk::AccessFlags::COLOR_ATTACHMENT_WRITE,
            vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT,
            vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL,
        )
    } else if state.contains(ResourceState::COPY_DEST) {
        (
            vk::AccessFlags::TRANSFER_WRITE,
            vk::PipelineStageFlags::TRANSFER,
            vk::ImageLayout::TRANSFER_DST_OPTIMAL,
        )
    } else if state.contains(ResourceState::INPUT_ATTACHMENT) {
        (
            vk::AccessFlags::INPUT_ATTACHMENT_READ,
            vk::PipelineStageFlags::FRAGMENT_SHADER,
            vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL,
        )
    } else if state.contains(ResourceState::SHADER_RESOURCE) {
        (vk::AccessFlags::SHADER_READ, shader_stages, vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL)
    } else if state.contains(ResourceState::CONSTANT_BUFFER) {
        (vk::AccessFlags::UNIFORM_READ, shader_stages, vk::ImageLayout::UNDEFINED)
    } else if state.contains(ResourceState::RAY_TRACING) {
        (
            vk::AccessFlags::ACCELERATION_STRUCTURE_READ_KHR,
            vk::PipelineStageFlags::RAY_TRACING_SHADER_KHR,
            vk::ImageLayout::UNDEFINED,
        )
    } else if state.contains(ResourceState::COMMON) {
        (
            vk::AccessFlags::MEMORY_READ | vk::AccessFlags::MEMORY_WRITE,
            vk::PipelineStageFlags::ALL_COMMANDS,
            vk::ImageLayout::GENERAL,
        )
    } else {
        (vk::AccessFlags::empty(), vk::PipelineStageFlags::TOP_OF_PIPE, vk::ImageLayout::UNDEFINED)
    }
}

#[cfg(test)]
#[path = "vulkan_format_tests.rs"]
mod tests;
