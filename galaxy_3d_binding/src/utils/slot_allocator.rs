use std::cmp::Reverse;
use std::collections::BinaryHeap;

/// Hands out stable `u32` slot indices, recycling the lowest free one first.
///
/// Used by pooled SRB caches: slot `i` addresses entry `i` of the pool's
/// storage, which grows to `capacity()` entries.
///
/// # Example
///
/// ```ignore
/// let mut slots = SlotAllocator::new();
/// let a = slots.alloc();  // 0
/// let b = slots.alloc();  // 1
/// slots.free(a);
/// let c = slots.alloc();  // 0 again
/// ```
#[derive(Debug, Default)]
pub struct SlotAllocator {
    free: BinaryHeap<Reverse<u32>>,
    capacity: u32,
    in_use: u32,
}

impl SlotAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Lowest free slot, or a fresh one past the current capacity
    pub fn alloc(&mut self) -> u32 {
        self.in_use += 1;
        match self.free.pop() {
            Some(Reverse(slot)) => slot,
            None => {
                self.capacity += 1;
                self.capacity - 1
            }
        }
    }

    /// Return a slot; `false` if it was never handed out
    pub fn free(&mut self, slot: u32) -> bool {
        if slot >= self.capacity || self.in_use == 0 {
            return false;
        }
        debug_assert!(!self.free.iter().any(|Reverse(s)| *s == slot), "slot {} freed twice", slot);
        self.in_use -= 1;
        self.free.push(Reverse(slot));
        true
    }

    /// Number of slots ever handed out; never decreases
    pub fn capacity(&self) -> u32 {
        self.capacity
    }

    pub fn in_use(&self) -> u32 {
        self.in_use
    }

    pub fn is_empty(&self) -> bool {
        self.in_use == 0
    }
}

#[cfg(test)]
#[path = "slot_allocator_tests.rs"]
mod tests;
