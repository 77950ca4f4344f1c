use super::*;
use galaxy_3d_binding::galaxy3d::binding::{
    ImmutableSamplerDesc, PipelineResourceDesc, PipelineResourceFlags, PipelineResourceSignature,
    PipelineResourceSignatureDesc, SamplerDesc, ShaderResourceBinding, ShaderResourceType, ShaderStage,
    ShaderStages, VariableType, VulkanModel,
};
use galaxy_3d_binding::galaxy3d::device::mock_device::MockDevice;
use galaxy_3d_binding::galaxy3d::device::{BufferMode, BufferViewType, RenderDevice, TextureViewType};

fn res(stages: ShaderStages, name: &str, resource_type: ShaderResourceType) -> PipelineResourceDesc {
    PipelineResourceDesc::new(stages, name, resource_type, VariableType::Mutable)
}

fn build(desc: PipelineResourceSignatureDesc) -> (Arc<MockDevice>, Arc<PipelineResourceSignature<VulkanModel>>, Arc<ShaderResourceBinding<VulkanModel>>) {
    let mock = Arc::new(MockDevice::new());
    let device: Arc<dyn RenderDevice> = mock.clone();
    let sig = PipelineResourceSignature::<VulkanModel>::new(device, desc).unwrap();
    let srb = sig.create_shader_resource_binding(false).unwrap();
    (mock, sig, srb)
}

/// Writes for set 0 of `srb`
fn writes_of(sig: &PipelineResourceSignature<VulkanModel>, srb: &ShaderResourceBinding<VulkanModel>) -> Vec<DescriptorWrite> {
    let layout = &sig.table_layouts()[0];
    srb.with_cache(|cache| {
        let commit = DescriptorSetCommit {
            set_index: 0,
            layout,
            resources: cache.table(0).unwrap().resources(),
            dirty: true,
            existing: NativeHandle::NULL,
            dynamic_offsets: Vec::new(),
        };
        descriptor_writes(&commit)
    })
}

fn binding_of(sig: &PipelineResourceSignature<VulkanModel>, stage: ShaderStage, name: &str) -> u32 {
    let index = sig.find_resource(stage, name).unwrap();
    sig.attribs(index).binding_index
}

// ============================================================================
// BUFFERS
// ============================================================================

#[test]
fn test_unbound_resources_are_not_written() {
    let desc = PipelineResourceSignatureDesc::new("empty")
        .with_resource(res(ShaderStages::PIXEL, "g_Constants", ShaderResourceType::ConstantBuffer))
        .with_resource(res(ShaderStages::PIXEL, "g_Texture", ShaderResourceType::TextureSrv));
    let (_, sig, srb) = build(desc);

    assert!(writes_of(&sig, &srb).is_empty());
}

#[test]
fn test_dynamic_uniform_buffer_starts_at_zero() {
    let desc = PipelineResourceSignatureDesc::new("dynamic")
        .with_resource(res(ShaderStages::VERTEX, "g_Constants", ShaderResourceType::ConstantBuffer));
    let (mock, sig, srb) = build(desc);
    let buffer = mock.uniform_buffer("constants");
    let var = srb.get_variable_by_name(ShaderStage::Vertex, "g_Constants").unwrap();
    assert!(var.set_buffer_range(Some(buffer.clone().into()), 64, 128, 0));

    let writes = writes_of(&sig, &srb);
    assert_eq!(writes.len(), 1);
    assert_eq!(writes[0].descriptor_type, vk::DescriptorType::UNIFORM_BUFFER_DYNAMIC);
    assert_eq!(
        writes[0].info,
        DescriptorInfo::Buffer {
            buffer: vk::Buffer::from_raw(buffer.native_handle().0),
            offset: 0,
            range: 128,
        }
    );
}

#[test]
fn test_static_uniform_buffer_keeps_its_offset() {
    let desc = PipelineResourceSignatureDesc::new("plain").with_resource(
        res(ShaderStages::VERTEX, "g_Constants", ShaderResourceType::ConstantBuffer)
            .with_flags(PipelineResourceFlags::NO_DYNAMIC_BUFFERS),
    );
    let (mock, sig, srb) = build(desc);
    let buffer = mock.uniform_buffer("constants");
    let var = srb.get_variable_by_name(ShaderStage::Vertex, "g_Constants").unwrap();
    assert!(var.set_buffer_range(Some(buffer.clone().into()), 64, 0, 0));

    let writes = writes_of(&sig, &srb);
    assert_eq!(writes[0].descriptor_type, vk::DescriptorType::UNIFORM_BUFFER);
    assert_eq!(
        writes[0].info,
        DescriptorInfo::Buffer {
            buffer: vk::Buffer::from_raw(buffer.native_handle().0),
            offset: 64,
            range: vk::WHOLE_SIZE,
        }
    );
}

#[test]
fn test_storage_buffer_view_writes_the_underlying_buffer() {
    let desc = PipelineResourceSignatureDesc::new("storage").with_resource(
        res(ShaderStages::VERTEX, "g_Instances", ShaderResourceType::BufferSrv)
            .with_flags(PipelineResourceFlags::NO_DYNAMIC_BUFFERS),
    );
    let (mock, sig, srb) = build(desc);
    let view = mock.buffer_view("instances", BufferMode::Structured, BufferViewType::ShaderResource);
    let var = srb.get_variable_by_name(ShaderStage::Vertex, "g_Instances").unwrap();
    assert!(var.set(Some(view.clone().into())));

    let writes = writes_of(&sig, &srb);
    assert_eq!(writes.len(), 1);
    assert_eq!(writes[0].descriptor_type, vk::DescriptorType::STORAGE_BUFFER);
    assert_eq!(
        writes[0].info,
        DescriptorInfo::Buffer {
            buffer: vk::Buffer::from_raw(view.buffer().native_handle().0),
            offset: 0,
            range: vk::WHOLE_SIZE,
        }
    );
}

#[test]
fn test_formatted_buffer_writes_texel_view() {
    let desc = PipelineResourceSignatureDesc::new("texel").with_resource(
        res(ShaderStages::PIXEL, "g_Lookup", ShaderResourceType::BufferSrv)
            .with_flags(PipelineResourceFlags::FORMATTED_BUFFER),
    );
    let (mock, sig, srb) = build(desc);
    let view = mock.buffer_view("lookup", BufferMode::Formatted, BufferViewType::ShaderResource);
    let var = srb.get_variable_by_name(ShaderStage::Pixel, "g_Lookup").unwrap();
    assert!(var.set(Some(view.clone().into())));

    let writes = writes_of(&sig, &srb);
    assert_eq!(writes[0].descriptor_type, vk::DescriptorType::UNIFORM_TEXEL_BUFFER);
    assert_eq!(
        writes[0].info,
        DescriptorInfo::TexelBuffer(vk::BufferView::from_raw(view.native_handle().0))
    );
}

// ============================================================================
// IMAGES AND SAMPLERS
// ============================================================================

#[test]
fn test_array_elements_are_written_individually() {
    let desc = PipelineResourceSignatureDesc::new("array").with_resource(
        res(ShaderStages::PIXEL, "g_Textures", ShaderResourceType::TextureSrv).with_array_size(4),
    );
    let (mock, sig, srb) = build(desc);
    let var = srb.get_variable_by_name(ShaderStage::Pixel, "g_Textures").unwrap();
    let first = mock.texture_srv("first");
    let third = mock.texture_srv("third");
    assert!(var.bind(Some(first.clone().into()), 0, Default::default()));
    assert!(var.bind(Some(third.clone().into()), 2, Default::default()));

    let writes = writes_of(&sig, &srb);
    let elements: Vec<u32> = writes.iter().map(|w| w.array_element).collect();
    assert_eq!(elements, vec![0, 2]);
    assert_eq!(
        writes[1].info,
        DescriptorInfo::Image {
            view: vk::ImageView::from_raw(third.native_handle().0),
            sampler: vk::Sampler::null(),
            layout: vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL,
        }
    );
}

#[test]
fn test_storage_image_uses_general_layout() {
    let desc = PipelineResourceSignatureDesc::new("uav")
        .with_resource(res(ShaderStages::COMPUTE, "g_Output", ShaderResourceType::TextureUav));
    let (mock, sig, srb) = build(desc);
    let view = mock.texture_view("output", TextureViewType::UnorderedAccess, None);
    let var = srb.get_variable_by_name(ShaderStage::Compute, "g_Output").unwrap();
    assert!(var.set(Some(view.into())));

    let writes = writes_of(&sig, &srb);
    assert_eq!(writes[0].descriptor_type, vk::DescriptorType::STORAGE_IMAGE);
    assert!(matches!(writes[0].info, DescriptorInfo::Image { layout: vk::ImageLayout::GENERAL, .. }));
}

#[test]
fn test_immutable_samplers_are_not_written() {
    let desc = PipelineResourceSignatureDesc::new("samplers")
        .with_resource(res(ShaderStages::PIXEL, "g_Sampler", ShaderResourceType::Sampler))
        .with_resource(res(ShaderStages::PIXEL, "g_Shadow", ShaderResourceType::Sampler))
        .with_immutable_sampler(ImmutableSamplerDesc::new(ShaderStages::PIXEL, "g_Sampler", SamplerDesc::linear_clamp()));
    let (mock, sig, srb) = build(desc);
    let shadow = mock.sampler();
    let var = srb.get_variable_by_name(ShaderStage::Pixel, "g_Shadow").unwrap();
    assert!(var.set(Some(shadow.clone().into())));

    let writes = writes_of(&sig, &srb);
    assert_eq!(writes.len(), 1);
    assert_eq!(writes[0].binding, binding_of(&sig, ShaderStage::Pixel, "g_Shadow"));
    assert_eq!(writes[0].info, DescriptorInfo::Sampler(vk::Sampler::from_raw(shadow.native_handle().0)));
}

#[test]
fn test_combined_sampler_comes_from_the_view() {
    let desc = PipelineResourceSignatureDesc::new("combined").with_resource(
        res(ShaderStages::PIXEL, "g_Albedo", ShaderResourceType::TextureSrv)
            .with_flags(PipelineResourceFlags::COMBINED_SAMPLER),
    );
    let (mock, sig, srb) = build(desc);
    let sampler = mock.sampler();
    let view = mock.texture_view("albedo", TextureViewType::ShaderResource, Some(sampler.clone()));
    let var = srb.get_variable_by_name(ShaderStage::Pixel, "g_Albedo").unwrap();
    assert!(var.set(Some(view.clone().into())));

    let writes = writes_of(&sig, &srb);
    assert_eq!(writes[0].descriptor_type, vk::DescriptorType::COMBINED_IMAGE_SAMPLER);
    assert_eq!(
        writes[0].info,
        DescriptorInfo::Image {
            view: vk::ImageView::from_raw(view.native_handle().0),
            sampler: vk::Sampler::from_raw(sampler.native_handle().0),
            layout: vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL,
        }
    );
}

#[test]
fn test_combined_sampler_with_immutable_sampler_writes_image_only() {
    let desc = PipelineResourceSignatureDesc::new("combined_immutable")
        .with_resource(
            res(ShaderStages::PIXEL, "g_Albedo", ShaderResourceType::TextureSrv)
                .with_flags(PipelineResourceFlags::COMBINED_SAMPLER),
        )
        .with_immutable_sampler(ImmutableSamplerDesc::new(ShaderStages::PIXEL, "g_Albedo", SamplerDesc::linear_clamp()));
    let (mock, sig, srb) = build(desc);
    let view = mock.texture_view("albedo", TextureViewType::ShaderResource, Some(mock.sampler()));
    let var = srb.get_variable_by_name(ShaderStage::Pixel, "g_Albedo").unwrap();
    assert!(var.set(Some(view.into())));

    let writes = writes_of(&sig, &srb);
    assert_eq!(writes.len(), 1);
    assert!(matches!(writes[0].info, DescriptorInfo::Image { sampler, .. } if sampler == vk::Sampler::null()));
}

#[test]
fn test_acceleration_structure_write() {
    let desc = PipelineResourceSignatureDesc::new("rt")
        .with_resource(res(ShaderStages::COMPUTE, "g_Scene", ShaderResourceType::AccelStruct));
    let (mock, sig, srb) = build(desc);
    let tlas = mock.tlas("scene");
    let var = srb.get_variable_by_name(ShaderStage::Compute, "g_Scene").unwrap();
    assert!(var.set(Some(tlas.clone().into())));

    let writes = writes_of(&sig, &srb);
    assert_eq!(writes[0].descriptor_type, vk::DescriptorType::ACCELERATION_STRUCTURE_KHR);
    assert_eq!(
        writes[0].info,
        DescriptorInfo::AccelStruct(vk::AccelerationStructureKHR::from_raw(tlas.native_handle().0))
    );
}
