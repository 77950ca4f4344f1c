//! Error types for the Galaxy3D binding layer
//!
//! Construction-time failures (signatures, pipeline states, caches) are returned as
//! `Err`. Bind-time and commit-time problems are logged and handled locally instead.

use std::fmt;

/// Result type for Galaxy3D operations
pub type Result<T> = std::result::Result<T, Error>;

/// Galaxy3D errors
#[derive(Debug, Clone)]
pub enum Error {
    /// Backend-specific error (Vulkan, Direct3D, etc.)
    BackendError(String),

    /// Out of GPU memory
    OutOfMemory,

    /// Invalid resource (buffer, view, sampler, shader, etc.)
    InvalidResource(String),

    /// Initialization failed (engine, device, caches)
    InitializationFailed(String),

    /// Invalid pipeline resource signature description or layout
    InvalidSignature(String),

    /// Invalid pipeline state description
    InvalidPipelineState(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::BackendError(msg) => write!(f, "Backend error: {}", msg),
            Error::OutOfMemory => write!(f, "Out of GPU memory"),
            Error::InvalidResource(msg) => write!(f, "Invalid resource: {}", msg),
            Error::InitializationFailed(msg) => write!(f, "Initialization failed: {}", msg),
            Error::InvalidSignature(msg) => write!(f, "Invalid pipeline resource signature: {}", msg),
            Error::InvalidPipelineState(msg) => write!(f, "Invalid pipeline state: {}", msg),
        }
    }
}

impl std::error::Error for Error {}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
