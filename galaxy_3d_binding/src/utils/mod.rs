//! Small helpers shared by the binding layer and its tests

mod image_diff;
mod slot_allocator;

pub use image_diff::*;
pub use slot_allocator::SlotAllocator;
