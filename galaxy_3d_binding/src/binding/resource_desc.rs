//! Declarative resource descriptions
//!
//! A `PipelineResourceSignatureDesc` lists every resource a group of shaders can see,
//! together with its variable type and immutable samplers. Nothing here knows about
//! native binding slots; those are computed by the signature layout.

use std::hash::{Hash, Hasher};

// ============================================================================
// Shader stages
// ============================================================================

/// Number of shader stages a resource can be visible in
pub const MAX_SHADER_STAGES: usize = 6;

/// Maximum number of signatures a pipeline state can combine
pub const MAX_RESOURCE_SIGNATURES: u8 = 8;

/// Single shader stage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ShaderStage {
    Vertex,
    Pixel,
    Geometry,
    Hull,
    Domain,
    Compute,
}

impl ShaderStage {
    pub const ALL: [ShaderStage; MAX_SHADER_STAGES] = [
        ShaderStage::Vertex,
        ShaderStage::Pixel,
        ShaderStage::Geometry,
        ShaderStage::Hull,
        ShaderStage::Domain,
        ShaderStage::Compute,
    ];

    /// Dense index in `[0, MAX_SHADER_STAGES)`
    pub fn index(self) -> usize {
        self as usize
    }

    pub fn flag(self) -> ShaderStages {
        ShaderStages::from_bits_truncate(1 << self.index())
    }

    pub fn from_index(index: usize) -> Option<ShaderStage> {
        Self::ALL.get(index).copied()
    }

    pub fn name(self) -> &'static str {
        match self {
            ShaderStage::Vertex => "Vertex",
            ShaderStage::Pixel => "Pixel",
            ShaderStage::Geometry => "Geometry",
            ShaderStage::Hull => "Hull",
            ShaderStage::Domain => "Domain",
            ShaderStage::Compute => "Compute",
        }
    }
}

bitflags::bitflags! {
    /// Set of shader stages a resource is visible in
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct ShaderStages: u32 {
        const VERTEX   = 1 << 0;
        const PIXEL    = 1 << 1;
        const GEOMETRY = 1 << 2;
        const HULL     = 1 << 3;
        const DOMAIN   = 1 << 4;
        const COMPUTE  = 1 << 5;

        const ALL_GRAPHICS = Self::VERTEX.bits()
            | Self::PIXEL.bits()
            | Self::GEOMETRY.bits()
            | Self::HULL.bits()
            | Self::DOMAIN.bits();
    }
}

impl ShaderStages {
    /// Individual stages contained in the set, in stage index order
    pub fn stages(self) -> impl Iterator<Item = ShaderStage> {
        ShaderStage::ALL.into_iter().filter(move |stage| self.contains(stage.flag()))
    }

    /// Lowest stage contained in the set
    pub fn first(self) -> Option<ShaderStage> {
        self.stages().next()
    }

    pub fn count(self) -> usize {
        self.bits().count_ones() as usize
    }
}

impl From<ShaderStage> for ShaderStages {
    fn from(stage: ShaderStage) -> Self {
        stage.flag()
    }
}

/// Pipeline kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PipelineType {
    #[default]
    Graphics,
    Compute,
}

impl PipelineType {
    /// Stages a pipeline of this type can contain
    pub fn allowed_stages(self) -> ShaderStages {
        match self {
            PipelineType::Graphics => ShaderStages::ALL_GRAPHICS,
            PipelineType::Compute => ShaderStages::COMPUTE,
        }
    }
}

// ============================================================================
// Resource and variable types
// ============================================================================

/// Kind of shader resource
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShaderResourceType {
    ConstantBuffer,
    TextureSrv,
    BufferSrv,
    TextureUav,
    BufferUav,
    Sampler,
    InputAttachment,
    AccelStruct,
}

impl ShaderResourceType {
    pub fn name(self) -> &'static str {
        match self {
            ShaderResourceType::ConstantBuffer => "constant buffer",
            ShaderResourceType::TextureSrv => "texture SRV",
            ShaderResourceType::BufferSrv => "buffer SRV",
            ShaderResourceType::TextureUav => "texture UAV",
            ShaderResourceType::BufferUav => "buffer UAV",
            ShaderResourceType::Sampler => "sampler",
            ShaderResourceType::InputAttachment => "input attachment",
            ShaderResourceType::AccelStruct => "acceleration structure",
        }
    }

    /// Flags that may be combined with this resource type
    pub fn allowed_flags(self) -> PipelineResourceFlags {
        let common = PipelineResourceFlags::RUNTIME_ARRAY;
        match self {
            ShaderResourceType::ConstantBuffer => common | PipelineResourceFlags::NO_DYNAMIC_BUFFERS,
            ShaderResourceType::TextureSrv => common | PipelineResourceFlags::COMBINED_SAMPLER,
            ShaderResourceType::BufferSrv | ShaderResourceType::BufferUav => {
                common | PipelineResourceFlags::NO_DYNAMIC_BUFFERS | PipelineResourceFlags::FORMATTED_BUFFER
            }
            ShaderResourceType::TextureUav | ShaderResourceType::Sampler | ShaderResourceType::AccelStruct => common,
            ShaderResourceType::InputAttachment => PipelineResourceFlags::GENERAL_INPUT_ATTACHMENT,
        }
    }
}

/// Variable type, ordered Static < Mutable < Dynamic
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub enum VariableType {
    /// Set once on the signature, shared by every SRB
    Static,
    /// Set once per SRB
    #[default]
    Mutable,
    /// Expected to change between draws
    Dynamic,
}

pub const NUM_VARIABLE_TYPES: usize = 3;

impl VariableType {
    pub const ALL: [VariableType; NUM_VARIABLE_TYPES] =
        [VariableType::Static, VariableType::Mutable, VariableType::Dynamic];

    pub fn index(self) -> usize {
        self as usize
    }

    /// Matching `UPDATE_*` bit of `BindShaderResourcesFlags`
    pub fn update_flag(self) -> BindShaderResourcesFlags {
        match self {
            VariableType::Static => BindShaderResourcesFlags::UPDATE_STATIC,
            VariableType::Mutable => BindShaderResourcesFlags::UPDATE_MUTABLE,
            VariableType::Dynamic => BindShaderResourcesFlags::UPDATE_DYNAMIC,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            VariableType::Static => "static",
            VariableType::Mutable => "mutable",
            VariableType::Dynamic => "dynamic",
        }
    }
}

bitflags::bitflags! {
    /// Per-resource flags
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct PipelineResourceFlags: u8 {
        /// Buffers bound to the variable are never USAGE_DYNAMIC and never use dynamic offsets
        const NO_DYNAMIC_BUFFERS       = 1 << 0;
        /// Texture SRV is sampled through an assigned `<name><suffix>` sampler
        const COMBINED_SAMPLER         = 1 << 1;
        /// Buffer views are typed (formatted) views
        const FORMATTED_BUFFER         = 1 << 2;
        /// Array size is only known at run time
        const RUNTIME_ARRAY            = 1 << 3;
        /// Input attachment in general image layout
        const GENERAL_INPUT_ATTACHMENT = 1 << 4;
    }
}

bitflags::bitflags! {
    /// Flags for bulk binding from a resource mapping
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct BindShaderResourcesFlags: u32 {
        const UPDATE_STATIC       = 1 << 0;
        const UPDATE_MUTABLE      = 1 << 1;
        const UPDATE_DYNAMIC      = 1 << 2;
        const UPDATE_ALL          = Self::UPDATE_STATIC.bits()
            | Self::UPDATE_MUTABLE.bits()
            | Self::UPDATE_DYNAMIC.bits();
        /// Leave already bound elements untouched
        const KEEP_EXISTING       = 1 << 3;
        /// Report every element that cannot be resolved from the mapping
        const VERIFY_ALL_RESOLVED = 1 << 4;
        /// Allow replacing bound static and mutable resources
        const ALLOW_OVERWRITE     = 1 << 5;
    }
}

bitflags::bitflags! {
    /// Flags for a single variable binding
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct SetShaderResourceFlags: u32 {
        /// Allow replacing a bound static or mutable resource
        const ALLOW_OVERWRITE = 1 << 0;
    }
}

/// What commit does with the state of bound resources
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum StateTransitionMode {
    /// Leave resource states alone
    #[default]
    None,
    /// Emit barriers to move resources into the required state
    Transition,
    /// Report resources that are not in the required state, without fixing them
    Verify,
}

// ============================================================================
// Resource description
// ============================================================================

/// One resource of a signature
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PipelineResourceDesc {
    pub name: String,
    pub stages: ShaderStages,
    pub array_size: u32,
    pub resource_type: ShaderResourceType,
    pub var_type: VariableType,
    pub flags: PipelineResourceFlags,
}

impl PipelineResourceDesc {
    pub fn new(
        stages: ShaderStages,
        name: impl Into<String>,
        resource_type: ShaderResourceType,
        var_type: VariableType,
    ) -> Self {
        Self {
            name: name.into(),
            stages,
            array_size: 1,
            resource_type,
            var_type,
            flags: PipelineResourceFlags::empty(),
        }
    }

    pub fn with_array_size(mut self, array_size: u32) -> Self {
        self.array_size = array_size;
        self
    }

    pub fn with_flags(mut self, flags: PipelineResourceFlags) -> Self {
        self.flags = flags;
        self
    }
}

// ============================================================================
// Samplers
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum FilterMode {
    Nearest,
    #[default]
    Linear,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum AddressMode {
    #[default]
    Repeat,
    MirroredRepeat,
    ClampToEdge,
    ClampToBorder,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ComparisonFunc {
    Never,
    Less,
    Equal,
    LessEqual,
    Greater,
    NotEqual,
    GreaterEqual,
    Always,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum BorderColor {
    #[default]
    TransparentBlack,
    OpaqueBlack,
    OpaqueWhite,
}

/// Sampler description
#[derive(Debug, Clone, PartialEq)]
pub struct SamplerDesc {
    pub min_filter: FilterMode,
    pub mag_filter: FilterMode,
    pub mip_filter: FilterMode,
    pub address_u: AddressMode,
    pub address_v: AddressMode,
    pub address_w: AddressMode,
    /// 0 or 1 disables anisotropic filtering
    pub max_anisotropy: u32,
    pub comparison: Option<ComparisonFunc>,
    pub mip_lod_bias: f32,
    pub min_lod: f32,
    pub max_lod: f32,
    pub border_color: BorderColor,
}

impl Default for SamplerDesc {
    fn default() -> Self {
        Self {
            min_filter: FilterMode::Linear,
            mag_filter: FilterMode::Linear,
            mip_filter: FilterMode::Linear,
            address_u: AddressMode::Repeat,
            address_v: AddressMode::Repeat,
            address_w: AddressMode::Repeat,
            max_anisotropy: 0,
            comparison: None,
            mip_lod_bias: 0.0,
            min_lod: 0.0,
            max_lod: f32::MAX,
            border_color: BorderColor::TransparentBlack,
        }
    }
}

impl SamplerDesc {
    pub fn linear_clamp() -> Self {
        Self {
            address_u: AddressMode::ClampToEdge,
            address_v: AddressMode::ClampToEdge,
            address_w: AddressMode::ClampToEdge,
            ..Self::default()
        }
    }

    pub fn point_wrap() -> Self {
        Self {
            min_filter: FilterMode::Nearest,
            mag_filter: FilterMode::Nearest,
            mip_filter: FilterMode::Nearest,
            ..Self::default()
        }
    }
}

impl Eq for SamplerDesc {}

impl Hash for SamplerDesc {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.min_filter.hash(state);
        self.mag_filter.hash(state);
        self.mip_filter.hash(state);
        self.address_u.hash(state);
        self.address_v.hash(state);
        self.address_w.hash(state);
        self.max_anisotropy.hash(state);
        self.comparison.hash(state);
        self.mip_lod_bias.to_bits().hash(state);
        self.min_lod.to_bits().hash(state);
        self.max_lod.to_bits().hash(state);
        self.border_color.hash(state);
    }
}

/// Sampler baked into the signature
///
/// `sampler_or_texture_name` names either a sampler resource or, with combined
/// samplers, the texture it is assigned to.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ImmutableSamplerDesc {
    pub stages: ShaderStages,
    pub sampler_or_texture_name: String,
    pub desc: SamplerDesc,
}

impl ImmutableSamplerDesc {
    pub fn new(stages: ShaderStages, name: impl Into<String>, desc: SamplerDesc) -> Self {
        Self {
            stages,
            sampler_or_texture_name: name.into(),
            desc,
        }
    }
}

// ============================================================================
// Signature description
// ============================================================================

pub const DEFAULT_COMBINED_SAMPLER_SUFFIX: &str = "_sampler";

/// Pipeline resource signature description
#[derive(Debug, Clone)]
pub struct PipelineResourceSignatureDesc {
    pub name: String,
    pub resources: Vec<PipelineResourceDesc>,
    pub immutable_samplers: Vec<ImmutableSamplerDesc>,
    /// Position of the signature in a pipeline state, `< MAX_RESOURCE_SIGNATURES`
    pub binding_index: u8,
    pub use_combined_texture_samplers: bool,
    pub combined_sampler_suffix: String,
    /// Number of SRB caches allocated at once; 0 uses the engine config
    pub srb_allocation_granularity: u32,
}

impl Default for PipelineResourceSignatureDesc {
    fn default() -> Self {
        Self {
            name: String::new(),
            resources: Vec::new(),
            immutable_samplers: Vec::new(),
            binding_index: 0,
            use_combined_texture_samplers: false,
            combined_sampler_suffix: DEFAULT_COMBINED_SAMPLER_SUFFIX.to_string(),
            srb_allocation_granularity: 0,
        }
    }
}

impl PipelineResourceSignatureDesc {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn with_resource(mut self, resource: PipelineResourceDesc) -> Self {
        self.resources.push(resource);
        self
    }

    pub fn with_immutable_sampler(mut self, sampler: ImmutableSamplerDesc) -> Self {
        self.immutable_samplers.push(sampler);
        self
    }

    pub fn with_combined_samplers(mut self, suffix: impl Into<String>) -> Self {
        self.use_combined_texture_samplers = true;
        self.combined_sampler_suffix = suffix.into();
        self
    }

    pub fn with_binding_index(mut self, binding_index: u8) -> Self {
        self.binding_index = binding_index;
        self
    }

    pub fn with_srb_allocation_granularity(mut self, granularity: u32) -> Self {
        self.srb_allocation_granularity = granularity;
        self
    }

    /// Suffix used to pair textures with samplers, `None` without combined samplers
    pub fn combined_sampler_suffix(&self) -> Option<&str> {
        if self.use_combined_texture_samplers {
            Some(self.combined_sampler_suffix.as_str())
        } else {
            None
        }
    }
}

#[cfg(test)]
#[path = "resource_desc_tests.rs"]
mod tests;
