//! Binding model implementations

mod d3d11;
mod d3d12;
mod vulkan;

pub use d3d11::*;
pub use d3d12::*;
pub use vulkan::*;
