use super::*;

// ============================================================================
// SHADER STAGES
// ============================================================================

#[test]
fn test_stage_index_and_flag_agree() {
    for (i, stage) in ShaderStage::ALL.iter().enumerate() {
        assert_eq!(stage.index(), i);
        assert_eq!(stage.flag().bits(), 1 << i);
        assert_eq!(ShaderStage::from_index(i), Some(*stage));
    }
    assert_eq!(ShaderStage::from_index(MAX_SHADER_STAGES), None);
}

#[test]
fn test_stages_iterates_in_index_order() {
    let set = ShaderStages::COMPUTE | ShaderStages::VERTEX | ShaderStages::PIXEL;
    let stages: Vec<_> = set.stages().collect();
    assert_eq!(stages, vec![ShaderStage::Vertex, ShaderStage::Pixel, ShaderStage::Compute]);
    assert_eq!(set.first(), Some(ShaderStage::Vertex));
    assert_eq!(set.count(), 3);
}

#[test]
fn test_empty_stages() {
    assert_eq!(ShaderStages::empty().first(), None);
    assert_eq!(ShaderStages::empty().stages().count(), 0);
}

#[test]
fn test_all_graphics_excludes_compute() {
    assert!(!ShaderStages::ALL_GRAPHICS.contains(ShaderStages::COMPUTE));
    assert_eq!(ShaderStages::ALL_GRAPHICS.count(), 5);
    assert_eq!(PipelineType::Compute.allowed_stages(), ShaderStages::COMPUTE);
}

// ============================================================================
// VARIABLE TYPES
// ============================================================================

#[test]
fn test_variable_type_ordering() {
    assert!(VariableType::Static < VariableType::Mutable);
    assert!(VariableType::Mutable < VariableType::Dynamic);
    assert_eq!(VariableType::default(), VariableType::Mutable);
}

#[test]
fn test_variable_type_update_flags_cover_update_all() {
    let all = VariableType::ALL
        .iter()
        .fold(BindShaderResourcesFlags::empty(), |acc, t| acc | t.update_flag());
    assert_eq!(all, BindShaderResourcesFlags::UPDATE_ALL);
}

// ============================================================================
// ALLOWED FLAGS
// ============================================================================

#[test]
fn test_no_dynamic_buffers_only_on_buffers() {
    assert!(ShaderResourceType::ConstantBuffer.allowed_flags().contains(PipelineResourceFlags::NO_DYNAMIC_BUFFERS));
    assert!(ShaderResourceType::BufferSrv.allowed_flags().contains(PipelineResourceFlags::NO_DYNAMIC_BUFFERS));
    assert!(ShaderResourceType::BufferUav.allowed_flags().contains(PipelineResourceFlags::NO_DYNAMIC_BUFFERS));
    assert!(!ShaderResourceType::TextureSrv.allowed_flags().contains(PipelineResourceFlags::NO_DYNAMIC_BUFFERS));
}

#[test]
fn test_combined_sampler_only_on_texture_srv() {
    assert!(ShaderResourceType::TextureSrv.allowed_flags().contains(PipelineResourceFlags::COMBINED_SAMPLER));
    assert!(!ShaderResourceType::Sampler.allowed_flags().contains(PipelineResourceFlags::COMBINED_SAMPLER));
}

#[test]
fn test_input_attachment_flags() {
    let flags = ShaderResourceType::InputAttachment.allowed_flags();
    assert_eq!(flags, PipelineResourceFlags::GENERAL_INPUT_ATTACHMENT);
    assert!(!flags.contains(PipelineResourceFlags::RUNTIME_ARRAY));
}

// ============================================================================
// DESCRIPTIONS
// ============================================================================

#[test]
fn test_resource_desc_builder() {
    let desc = PipelineResourceDesc::new(ShaderStages::PIXEL, "g_Textures", ShaderResourceType::TextureSrv, VariableType::Dynamic)
        .with_array_size(4)
        .with_flags(PipelineResourceFlags::COMBINED_SAMPLER);
    assert_eq!(desc.name, "g_Textures");
    assert_eq!(desc.array_size, 4);
    assert_eq!(desc.flags, PipelineResourceFlags::COMBINED_SAMPLER);
}

#[test]
fn test_signature_desc_combined_suffix() {
    let desc = PipelineResourceSignatureDesc::new("sig");
    assert_eq!(desc.combined_sampler_suffix(), None);
    assert_eq!(desc.combined_sampler_suffix, DEFAULT_COMBINED_SAMPLER_SUFFIX);

    let desc = desc.with_combined_samplers("_smp");
    assert_eq!(desc.combined_sampler_suffix(), Some("_smp"));
}

#[test]
fn test_sampler_desc_hash_matches_equality() {
    use rustc_hash::FxHasher;

    fn hash_of(desc: &SamplerDesc) -> u64 {
        let mut hasher = FxHasher::default();
        desc.hash(&mut hasher);
        hasher.finish()
    }

    let a = SamplerDesc::linear_clamp();
    let b = SamplerDesc::linear_clamp();
    let c = SamplerDesc::point_wrap();
    assert_eq!(a, b);
    assert_eq!(hash_of(&a), hash_of(&b));
    assert_ne!(a, c);
}
