//! Thin Vulkan wrappers used by the engine.
//!
//! Every type owns its Vulkan handles and releases them on drop; the
//! logical device is shared via `Arc` so resources can outlive the scope
//! that created them without outliving the device.

pub mod buffer;
pub mod command;
pub mod descriptor;
pub mod device;
pub mod error;
pub mod instance;
pub mod memory;
pub mod pipeline;
pub mod render_pass;
pub mod shader;
pub mod swapchain;
pub mod sync;
pub mod vertex;

pub use error::{RhiError, RhiResult};

// Re-export ash's vk module so dependents don't need a direct ash dependency.
pub use ash::vk;
