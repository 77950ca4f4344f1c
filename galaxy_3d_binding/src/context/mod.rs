//! Command recording context

mod device_context;

pub use device_context::*;
