//! Deferred release of objects still referenced by in-flight command buffers
//!
//! Objects are tagged with the fence value of the submission that may still use
//! them and are dropped once the queue reports that value as completed.

use std::any::Any;
use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Boxed object kept alive until its fence completes
pub type StaleObject = Box<dyn Any + Send + Sync>;

/// Fence-tagged FIFO of stale objects
#[derive(Default)]
pub struct ReleaseQueue {
    entries: Mutex<VecDeque<(u64, StaleObject)>>,
}

impl ReleaseQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Lock the entries, recovering them if a panicking thread poisoned the lock
    fn lock_entries(&self) -> MutexGuard<'_, VecDeque<(u64, StaleObject)>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Keep `object` alive until `fence_value` is completed
    pub fn defer_release(&self, fence_value: u64, object: StaleObject) {
        self.lock_entries().push_back((fence_value, object));
    }

    /// Drop every object whose fence value is `<= completed`, returning how many were released
    ///
    /// Objects are released in submission order; a later object with a smaller fence
    /// value is released as soon as every object queued before it has been.
    pub fn purge(&self, completed: u64) -> usize {
        let released: Vec<StaleObject> = {
            let mut entries = self.lock_entries();
            let mut released = Vec::new();
            while entries.front().is_some_and(|(fence, _)| *fence <= completed) {
                if let Some((_, object)) = entries.pop_front() {
                    released.push(object);
                }
            }
            released
        };
        // Dropped outside the lock: destructors may queue further releases
        let count = released.len();
        drop(released);
        if count > 0 {
            crate::engine_trace!("galaxy3d::ReleaseQueue", "Released {} objects (completed fence {})", count, completed);
        }
        count
    }

    /// Drop everything, used when the device is idle
    pub fn release_all(&self) -> usize {
        let released: Vec<(u64, StaleObject)> = self.lock_entries().drain(..).collect();
        released.len()
    }

    pub fn len(&self) -> usize {
        self.lock_entries().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
#[path = "release_queue_tests.rs"]
mod tests;
