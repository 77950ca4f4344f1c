use super::*;
use rustc_hash::FxHasher;

fn attribs(bind_points: BindPoints, assigned_sampler: Option<u32>) -> ResourceAttribs {
    ResourceAttribs {
        range: 1,
        group: 0,
        bind_points,
        cache_offset: 2,
        binding_index: 0,
        descriptor_kind: DescriptorKind::SeparateImage,
        srb_location: CacheLocation::Stages { range: 1, bind_points },
        static_location: None,
        assigned_sampler,
        immutable_sampler: None,
    }
}

fn layout_hash(a: &ResourceAttribs) -> u64 {
    let mut hasher = FxHasher::default();
    a.hash_layout(&mut hasher);
    hasher.finish()
}

// ============================================================================
// BIND POINTS
// ============================================================================

#[test]
fn test_bind_points_default_is_empty() {
    let bp = BindPoints::default();
    assert!(bp.is_empty());
    assert_eq!(bp.first_active(), None);
    assert_eq!(bp.get(ShaderStage::Vertex), None);
}

#[test]
fn test_bind_points_set_and_get() {
    let mut bp = BindPoints::default();
    bp.set(ShaderStage::Pixel, 3);
    bp.set(ShaderStage::Vertex, 7);
    assert_eq!(bp.get(ShaderStage::Pixel), Some(3));
    assert_eq!(bp.get(ShaderStage::Vertex), Some(7));
    assert_eq!(bp.get(ShaderStage::Compute), None);
    assert_eq!(bp.first_active(), Some(ShaderStage::Vertex));
    assert_eq!(bp.active_stages(), ShaderStages::VERTEX | ShaderStages::PIXEL);
    let pairs: Vec<_> = bp.iter().collect();
    assert_eq!(pairs, vec![(ShaderStage::Vertex, 7), (ShaderStage::Pixel, 3)]);
}

#[test]
fn test_bind_points_shifted_by_base() {
    let mut bp = BindPoints::default();
    bp.set(ShaderStage::Pixel, 1);
    bp.set(ShaderStage::Compute, 0);

    let mut base = BaseBindings::default();
    base.slots[ShaderStage::Pixel.index()][3] = 4;

    let shifted = bp.shifted(&base, 3).unwrap();
    assert_eq!(shifted.get(ShaderStage::Pixel), Some(5));
    assert_eq!(shifted.get(ShaderStage::Compute), Some(0));
    // other ranges are not affected
    assert_eq!(bp.shifted(&base, 0), Some(bp));
}

#[test]
fn test_bind_points_shift_out_of_range() {
    let mut bp = BindPoints::default();
    bp.set(ShaderStage::Pixel, 10);

    let mut base = BaseBindings::default();
    base.slots[ShaderStage::Pixel.index()][1] = u16::MAX as u32 - 10;
    assert_eq!(bp.shifted(&base, 1).unwrap().get(ShaderStage::Pixel), Some(u16::MAX));

    base.slots[ShaderStage::Pixel.index()][1] += 1;
    assert!(bp.shifted(&base, 1).is_none());
}

// ============================================================================
// COMPATIBILITY
// ============================================================================

#[test]
fn test_assigned_sampler_excluded_from_compatibility() {
    let mut bp = BindPoints::default();
    bp.set(ShaderStage::Pixel, 2);
    let a = attribs(bp, Some(1));
    let b = attribs(bp, Some(5));
    assert!(a.is_compatible_with(&b));
    assert!(b.is_compatible_with(&a));
    assert_eq!(layout_hash(&a), layout_hash(&b));
}

#[test]
fn test_different_bind_points_are_incompatible() {
    let mut bp1 = BindPoints::default();
    bp1.set(ShaderStage::Pixel, 2);
    let mut bp2 = BindPoints::default();
    bp2.set(ShaderStage::Pixel, 3);
    let a = attribs(bp1, None);
    let b = attribs(bp2, None);
    assert!(!a.is_compatible_with(&b));
    assert!(!b.is_compatible_with(&a));
}

#[test]
fn test_immutable_sampler_flag_is_compared() {
    let mut bp = BindPoints::default();
    bp.set(ShaderStage::Pixel, 0);
    let a = attribs(bp, None);
    let mut b = attribs(bp, None);
    b.immutable_sampler = Some(0);
    assert!(b.is_immutable_sampler_assigned());
    assert!(!a.is_compatible_with(&b));
}

#[test]
fn test_immutable_sampler_attribs_allocation() {
    let mut attribs = ImmutableSamplerAttribs::default();
    assert!(!attribs.is_allocated());
    attribs.location = Some(CacheLocation::Table { table: 0, offset: 0 });
    assert!(attribs.is_allocated());
}
