//! Shaders, their reflection records and the shared bytecode cache
//!
//! Bytecode is content-addressed: two shaders created from identical code share
//! one `ShaderBytecode` allocation while either of them is alive.

use std::hash::Hasher;
use std::sync::{Arc, Mutex, PoisonError, Weak};

use rustc_hash::{FxHashMap, FxHasher};

use crate::binding::{ShaderResourceType, ShaderStage};
use crate::device::{BufferMode, ResourceDimension};
use crate::engine::Engine;
use crate::error::Result;

// ===== REFLECTION =====

/// One resource a shader declares, as reported by reflection
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShaderResourceDesc {
    pub name: String,
    pub resource_type: ShaderResourceType,
    pub array_size: u32,
    /// Texture dimension; `Undefined` when the shader does not constrain it
    pub dimension: ResourceDimension,
    pub is_multisample: bool,
    /// Buffer view mode; `Undefined` when the shader does not constrain it
    pub buffer_mode: BufferMode,
}

impl ShaderResourceDesc {
    pub fn new(name: impl Into<String>, resource_type: ShaderResourceType) -> Self {
        Self {
            name: name.into(),
            resource_type,
            array_size: 1,
            dimension: ResourceDimension::Undefined,
            is_multisample: false,
            buffer_mode: BufferMode::Undefined,
        }
    }

    pub fn with_array_size(mut self, array_size: u32) -> Self {
        self.array_size = array_size;
        self
    }

    pub fn with_dimension(mut self, dimension: ResourceDimension, is_multisample: bool) -> Self {
        self.dimension = dimension;
        self.is_multisample = is_multisample;
        self
    }

    pub fn with_buffer_mode(mut self, buffer_mode: BufferMode) -> Self {
        self.buffer_mode = buffer_mode;
        self
    }
}

// ===== BYTECODE CACHE =====

/// Immutable shader code shared through the `ShaderCache`
#[derive(Debug, PartialEq, Eq)]
pub struct ShaderBytecode {
    hash: u64,
    code: Vec<u32>,
}

impl ShaderBytecode {
    pub fn hash(&self) -> u64 {
        self.hash
    }

    pub fn code(&self) -> &[u32] {
        &self.code
    }

    /// Code as bytes, for backends that take a byte slice
    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.code)
    }
}

fn hash_code(code: &[u32]) -> u64 {
    let mut hasher = FxHasher::default();
    hasher.write(bytemuck::cast_slice(code));
    hasher.write_usize(code.len());
    hasher.finish()
}

/// Process-wide bytecode deduplication
///
/// Entries are weak: the cache never keeps bytecode alive on its own.
#[derive(Debug, Default)]
pub struct ShaderCache {
    entries: Mutex<FxHashMap<u64, Weak<ShaderBytecode>>>,
}

impl ShaderCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Shared bytecode equal to `code`, inserting it when no live entry matches
    pub fn get_or_insert(&self, code: Vec<u32>) -> Arc<ShaderBytecode> {
        let hash = hash_code(&code);
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(existing) = entries.get(&hash).and_then(Weak::upgrade) {
            if existing.code == code {
                return existing;
            }
            crate::engine_warn!("galaxy3d::ShaderCache", "Bytecode hash collision ({:#018x}); replacing entry", hash);
        }
        let bytecode = Arc::new(ShaderBytecode { hash, code });
        entries.insert(hash, Arc::downgrade(&bytecode));
        bytecode
    }

    /// Number of entries, including dead ones not purged yet
    pub fn len(&self) -> usize {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop entries whose bytecode is no longer referenced; returns how many were dropped
    pub fn purge(&self) -> usize {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        let before = entries.len();
        entries.retain(|_, bytecode| bytecode.strong_count() > 0);
        before - entries.len()
    }

    pub fn clear(&self) {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner).clear();
    }
}

// ===== SHADER =====

/// Descriptor for creating a shader
#[derive(Debug, Clone)]
pub struct ShaderDesc {
    pub name: String,
    pub stage: ShaderStage,
    /// Compiled code (SPIR-V words, or the backend's equivalent)
    pub bytecode: Vec<u32>,
    /// Reflection of the resources the shader declares
    pub resources: Vec<ShaderResourceDesc>,
}

/// Shader with deduplicated bytecode and its reflected resources
#[derive(Debug)]
pub struct Shader {
    name: String,
    stage: ShaderStage,
    bytecode: Arc<ShaderBytecode>,
    resources: Vec<ShaderResourceDesc>,
}

impl Shader {
    /// Create a shader, sharing its bytecode through `Engine::shader_cache()`
    pub fn new(desc: ShaderDesc) -> Result<Arc<Self>> {
        Self::with_cache(desc, &Engine::shader_cache())
    }

    /// Create a shader against an explicit bytecode cache
    pub fn with_cache(desc: ShaderDesc, cache: &ShaderCache) -> Result<Arc<Self>> {
        // ========== VALIDATION ==========
        if desc.bytecode.is_empty() {
            crate::engine_bail!("galaxy3d::Shader", "Shader '{}' has no bytecode", desc.name);
        }
        for (i, res) in desc.resources.iter().enumerate() {
            if res.name.is_empty() {
                crate::engine_bail!("galaxy3d::Shader", "Resource {} of shader '{}' has no name", i, desc.name);
            }
            if desc.resources[..i].iter().any(|other| other.name == res.name) {
                crate::engine_bail!(
                    "galaxy3d::Shader",
                    "Shader '{}' declares resource '{}' more than once",
                    desc.name,
                    res.name
                );
            }
        }

        let bytecode = cache.get_or_insert(desc.bytecode);
        Ok(Arc::new(Self {
            name: desc.name,
            stage: desc.stage,
            bytecode,
            resources: desc.resources,
        }))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn stage(&self) -> ShaderStage {
        self.stage
    }

    pub fn bytecode(&self) -> &Arc<ShaderBytecode> {
        &self.bytecode
    }

    pub fn resources(&self) -> &[ShaderResourceDesc] {
        &self.resources
    }

    pub fn find_resource(&self, name: &str) -> Option<&ShaderResourceDesc> {
        self.resources.iter().find(|r| r.name == name)
    }
}

#[cfg(test)]
#[path = "shader_tests.rs"]
mod tests;
