//! Shaders and pipeline states

mod pipeline_state;
mod shader;

pub use pipeline_state::*;
pub use shader::*;
