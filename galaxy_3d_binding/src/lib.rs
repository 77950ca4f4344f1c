/*!
# Galaxy 3D Binding

Pipeline resource signatures and shader variable binding for the Galaxy 3D engine.

This crate provides the backend-agnostic binding layer: applications declare the
resources their shaders use in signatures, bind device objects to named variables,
and commit the resulting resource caches into a device context. Backend
implementations (Vulkan, mock) provide the device objects and command recording.

## Architecture

- **PipelineResourceSignature**: Declares resources, computes their binding
  locations and owns the static resource cache
- **ShaderResourceCache**: Storage of bound objects, per stage and range or per
  descriptor table
- **ShaderResourceVariable**: Named handle used to bind objects, with
  validation against the declaration
- **ShaderResourceBinding**: Per-draw set of mutable and dynamic variables
- **PipelineState**: Shaders resolved against their signatures
- **DeviceContext**: Commits SRBs and checks them before draws and dispatches

The binding model (D3D11 flat slots, D3D12 root tables, Vulkan descriptor sets)
is a type parameter of the signature and everything built from it.
*/

// Internal modules
mod error;
mod engine;
mod config;
pub mod log;
pub mod binding;
pub mod device;
pub mod pipeline;
pub mod context;
pub mod utils;

#[cfg(test)]
pub(crate) mod testing;

// Main galaxy3d namespace module
pub mod galaxy3d {
    // Error types
    pub use crate::error::{Error, Result};

    // Engine state and configuration
    pub use crate::engine::Engine;
    pub use crate::config::Config;

    // Logging sub-module (types only, NOT macros)
    pub mod log {
        pub use crate::log::{Logger, LogEntry, LogSeverity, DefaultLogger};
        // engine_* macros are exported at the crate root
    }

    // Signatures, caches, variables and binding models
    pub mod binding {
        pub use crate::binding::*;
    }

    // Device abstraction and the mock device
    pub mod device {
        pub use crate::device::*;
    }

    // Shaders and pipeline states
    pub mod pipeline {
        pub use crate::pipeline::*;
    }

    // Command recording context
    pub mod context {
        pub use crate::context::*;
    }

    // Image comparison and slot allocation helpers
    pub mod utils {
        pub use crate::utils::*;
    }
}
