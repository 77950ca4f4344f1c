//! Shader resource binding
//!
//! An SRB owns the cache of a signature's mutable and dynamic resources. Static
//! resources are copied in from the signature once, either explicitly or on the
//! first commit.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use crate::binding::resource_cache::{CacheContentType, ShaderResourceCache};
use crate::binding::resource_desc::{BindShaderResourcesFlags, PipelineType, ShaderStage, ShaderStages, VariableType};
use crate::binding::resource_mapping::ResourceMapping;
use crate::binding::signature::{lock_cache, PipelineResourceSignature};
use crate::binding::variable::ShaderResourceVariable;
use crate::binding::variable_manager::ShaderVariableManager;
use crate::binding::binding_model::BindingModel;
use crate::error::Result;
use crate::utils::SlotAllocator;

// ============================================================================
// ResourceCachePool
// ============================================================================

/// Initialized SRB caches, grown `granularity` at a time
pub(crate) struct ResourceCachePool {
    granularity: u32,
    slots: SlotAllocator,
    caches: Vec<Option<ShaderResourceCache>>,
}

impl ResourceCachePool {
    pub fn new(granularity: u32) -> Self {
        Self {
            granularity: granularity.max(1),
            slots: SlotAllocator::new(),
            caches: Vec::new(),
        }
    }

    /// Take a cache; `init` sizes every cache created when the pool grows
    pub fn acquire(
        &mut self,
        mut init: impl FnMut(&mut ShaderResourceCache) -> Result<()>,
    ) -> Result<(u32, ShaderResourceCache)> {
        let slot = self.slots.alloc();
        if slot as usize >= self.caches.len() {
            for _ in 0..self.granularity {
                let mut cache = ShaderResourceCache::new(CacheContentType::Srb);
                if let Err(e) = init(&mut cache) {
                    self.slots.free(slot);
                    return Err(e);
                }
                self.caches.push(Some(cache));
            }
            crate::engine_trace!("galaxy3d::SRB", "Cache pool grew to {} entries", self.caches.len());
        }
        match self.caches[slot as usize].take() {
            Some(cache) => Ok((slot, cache)),
            None => {
                self.slots.free(slot);
                crate::engine_bail!("galaxy3d::SRB", "Cache pool slot {} is already in use", slot)
            }
        }
    }

    /// Unbind everything in `cache` and put it back
    pub fn release(&mut self, slot: u32, mut cache: ShaderResourceCache) {
        cache.reset();
        if let Some(entry) = self.caches.get_mut(slot as usize) {
            *entry = Some(cache);
            self.slots.free(slot);
        }
    }

    pub fn in_use(&self) -> u32 {
        self.slots.in_use()
    }

    pub fn capacity(&self) -> usize {
        self.caches.len()
    }
}

// ============================================================================
// ShaderResourceBinding
// ============================================================================

/// Mutable and dynamic resources of one signature instance
pub struct ShaderResourceBinding<B: BindingModel> {
    signature: Arc<PipelineResourceSignature<B>>,
    cache: Mutex<ShaderResourceCache>,
    managers: Vec<ShaderVariableManager>,
    static_resources_initialized: AtomicBool,
    pool_slot: Option<u32>,
}

impl<B: BindingModel> ShaderResourceBinding<B> {
    pub(crate) fn new(signature: Arc<PipelineResourceSignature<B>>) -> Result<Self> {
        let (pool_slot, cache) = signature.allocate_srb_cache()?;
        let stages = (0..signature.resource_count())
            .map(|i| signature.resource(i).stages)
            .fold(ShaderStages::empty(), |acc, stages| acc | stages);
        let managers = stages
            .stages()
            .map(|stage| {
                ShaderVariableManager::new(
                    &signature,
                    stage,
                    &[VariableType::Mutable, VariableType::Dynamic],
                    CacheContentType::Srb,
                )
            })
            .filter(|m| m.variable_count() > 0)
            .collect();

        Ok(Self {
            signature,
            cache: Mutex::new(cache),
            managers,
            static_resources_initialized: AtomicBool::new(false),
            pool_slot,
        })
    }

    pub fn signature(&self) -> &Arc<PipelineResourceSignature<B>> {
        &self.signature
    }

    pub fn pipeline_type(&self) -> Option<PipelineType> {
        self.signature.pipeline_type()
    }

    pub fn binding_index(&self) -> u8 {
        self.signature.binding_index()
    }

    // ===== STATIC RESOURCES =====

    /// Copy the static resources of `signature` (or of the SRB's own signature)
    ///
    /// Only the first call copies; later calls report a warning and do nothing.
    pub fn initialize_static_resources(&self, signature: Option<&PipelineResourceSignature<B>>) {
        if self.static_resources_initialized() {
            crate::engine_warn!(
                "galaxy3d::SRB",
                "Static resources of an SRB of signature '{}' are already initialized",
                self.signature.name()
            );
            return;
        }
        self.copy_static_resources_once(signature);
    }

    /// Copy static resources unless that already happened; used by commit
    pub(crate) fn copy_static_resources_once(&self, signature: Option<&PipelineResourceSignature<B>>) {
        let signature = signature.unwrap_or(self.signature.as_ref());
        if !signature.is_compatible_with(&self.signature) {
            crate::engine_error!(
                "galaxy3d::SRB",
                "Can not initialize static resources of an SRB of signature '{}' from incompatible signature '{}'",
                self.signature.name(),
                signature.name()
            );
            return;
        }
        if self.static_resources_initialized.swap(true, Ordering::AcqRel) {
            return;
        }
        if signature.has_static_resources() {
            let mut cache = lock_cache(&self.cache);
            signature.copy_static_resources(&mut cache);
        }
    }

    pub fn static_resources_initialized(&self) -> bool {
        self.static_resources_initialized.load(Ordering::Acquire)
    }

    // ===== VARIABLES =====

    fn manager(&self, stage: ShaderStage) -> Option<&ShaderVariableManager> {
        self.managers.iter().find(|m| m.stage() == stage)
    }

    pub fn variable_count(&self, stage: ShaderStage) -> u32 {
        self.manager(stage).map(|m| m.variable_count()).unwrap_or(0)
    }

    pub fn get_variable_by_name(&self, stage: ShaderStage, name: &str) -> Option<ShaderResourceVariable<'_, B>> {
        self.manager(stage)?.get_variable_by_name(&self.signature, &self.cache, name)
    }

    pub fn get_variable_by_index(&self, stage: ShaderStage, index: u32) -> Option<ShaderResourceVariable<'_, B>> {
        self.manager(stage)?.get_variable_by_index(&self.signature, &self.cache, index)
    }

    /// Bind mutable and dynamic variables of `stages` from `mapping`
    pub fn bind_resources(&self, stages: ShaderStages, mapping: &ResourceMapping, flags: BindShaderResourcesFlags) {
        for manager in self.managers.iter().filter(|m| stages.contains(m.stage().flag())) {
            manager.bind_resources(&self.signature, &self.cache, mapping, flags);
        }
    }

    /// Whether `bind_resources` with the same arguments would change anything
    pub fn check_resources(&self, stages: ShaderStages, mapping: &ResourceMapping, flags: BindShaderResourcesFlags) -> bool {
        self.managers
            .iter()
            .filter(|m| stages.contains(m.stage().flag()))
            .any(|m| m.check_resources(&self.signature, &self.cache, mapping, flags))
    }

    /// Run `f` with exclusive access to the cache
    pub fn with_cache<R>(&self, f: impl FnOnce(&mut ShaderResourceCache) -> R) -> R {
        f(&mut lock_cache(&self.cache))
    }
}

impl<B: BindingModel> Drop for ShaderResourceBinding<B> {
    fn drop(&mut self) {
        if let Some(slot) = self.pool_slot {
            let cache = std::mem::replace(
                self.cache.get_mut().unwrap_or_else(std::sync::PoisonError::into_inner),
                ShaderResourceCache::new(CacheContentType::Srb),
            );
            self.signature.release_srb_cache(slot, cache);
        }
    }
}

#[cfg(test)]
#[path = "srb_tests.rs"]
mod tests;
