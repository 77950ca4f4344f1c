/// DescriptorPoolManager - Growable set of descriptor pools
///
/// Sets are allocated from the newest pool first, then from older pools that
/// had sets freed, and a new pool is created when all of them are exhausted.
/// Every set remembers its pool so it can be freed by handle alone.

use ash::vk;
use ash::vk::Handle;
use galaxy_3d_binding::galaxy3d::{Error, Result};
use galaxy_3d_binding::{engine_err, engine_error, engine_info};
use rustc_hash::FxHashMap;
use std::sync::{Arc, Mutex, PoisonError};

use crate::vulkan_context::GpuContext;
use crate::vulkan_format::descriptor_pool_sizes;

/// Sets per pool used by `VulkanDevice`
pub const DEFAULT_SETS_PER_POOL: u32 = 1024;

struct PoolState {
    pools: Vec<vk::DescriptorPool>,
    /// Raw set handle -> pool it was allocated from
    owners: FxHashMap<u64, vk::DescriptorPool>,
}

pub struct DescriptorPoolManager {
    ctx: Arc<GpuContext>,
    sets_per_pool: u32,
    state: Mutex<PoolState>,
}

impl DescriptorPoolManager {
    pub(crate) fn new(ctx: Arc<GpuContext>, sets_per_pool: u32) -> Result<Self> {
        let first = Self::create_pool(&ctx, sets_per_pool)?;
        Ok(Self {
            ctx,
            sets_per_pool,
            state: Mutex::new(PoolState {
                pools: vec![first],
                owners: FxHashMap::default(),
            }),
        })
    }

    fn create_pool(ctx: &GpuContext, sets_per_pool: u32) -> Result<vk::DescriptorPool> {
        let pool_sizes = descriptor_pool_sizes(sets_per_pool);
        let info = vk::DescriptorPoolCreateInfo::default()
            .flags(vk::DescriptorPoolCreateFlags::FREE_DESCRIPTOR_SET)
            .pool_sizes(&pool_sizes)
            .max_sets(sets_per_pool);

        unsafe {
            ctx.device.create_descriptor_pool(&info, None).map_err(|e| {
                engine_error!("galaxy3d::vulkan", "Failed to create descriptor pool: {:?}", e);
                Error::InitializationFailed(format!("Failed to create descriptor pool: {:?}", e))
            })
        }
    }

    fn try_allocate(&self, pool: vk::DescriptorPool, layout: vk::DescriptorSetLayout) -> std::result::Result<vk::DescriptorSet, vk::Result> {
        let layouts = [layout];
        let info = vk::DescriptorSetAllocateInfo::default()
            .descriptor_pool(pool)
            .set_layouts(&layouts);
        unsafe { self.ctx.device.allocate_descriptor_sets(&info) }.map(|sets| sets[0])
    }

    /// Allocate one set with `layout`, growing the pool list if needed
    pub fn allocate(&self, layout: vk::DescriptorSetLayout) -> Result<vk::DescriptorSet> {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);

        for index in (0..state.pools.len()).rev() {
            let pool = state.pools[index];
            match self.try_allocate(pool, layout) {
                Ok(set) => {
                    state.owners.insert(set.as_raw(), pool);
                    return Ok(set);
                }
                Err(vk::Result::ERROR_OUT_OF_POOL_MEMORY) | Err(vk::Result::ERROR_FRAGMENTED_POOL) => continue,
                Err(e) => return Err(engine_err!("galaxy3d::vulkan", "Failed to allocate descriptor set: {:?}", e)),
            }
        }

        let pool = Self::create_pool(&self.ctx, self.sets_per_pool)?;
        state.pools.push(pool);
        engine_info!(
            "galaxy3d::vulkan",
            "Descriptor pools exhausted, created new pool (total: {})",
            state.pools.len()
        );
        let set = self.try_allocate(pool, layout).map_err(|e| {
            engine_err!("galaxy3d::vulkan", "Failed to allocate descriptor set after pool growth: {:?}", e)
        })?;
        state.owners.insert(set.as_raw(), pool);
        Ok(set)
    }

    /// Return a set to the pool it came from; unknown handles are ignored
    pub fn free(&self, set: vk::DescriptorSet) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(pool) = state.owners.remove(&set.as_raw()) {
            unsafe {
                let _ = self.ctx.device.free_descriptor_sets(pool, &[set]);
            }
        }
    }

    pub fn pool_count(&self) -> usize {
        self.state.lock().unwrap_or_else(PoisonError::into_inner).pools.len()
    }

    /// Number of sets currently allocated
    pub fn live_sets(&self) -> usize {
        self.state.lock().unwrap_or_else(PoisonError::into_inner).owners.len()
    }
}

impl Drop for DescriptorPoolManager {
    fn drop(&mut self) {
        let state = self.state.get_mut().unwrap_or_else(PoisonError::into_inner);
        unsafe {
            for pool in state.pools.drain(..) {
                self.ctx.device.destroy_descriptor_pool(pool, None);
            }
        }
        state.owners.clear();
    }
}

/// Descriptor set replaced by a newer one, freed when the GPU is done with it
///
/// Handed to the device context as a stale object; dropping it frees the set.
pub(crate) struct RetiredDescriptorSet {
    pub(crate) manager: Arc<DescriptorPoolManager>,
    pub(crate) set: vk::DescriptorSet,
}

impl Drop for RetiredDescriptorSet {
    fn drop(&mut self) {
        self.manager.free(self.set);
    }
}
