//! Device objects, native pipelines, command recording and submission

mod command;
pub mod mock_device;
mod object;
mod release_queue;
mod render_device;

pub use command::*;
pub use object::*;
pub use release_queue::*;
pub use render_device::*;
