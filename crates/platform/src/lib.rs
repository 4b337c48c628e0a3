//! Platform layer: window management and Vulkan surface creation.
//!
//! Wraps winit windowing and produces the `VkSurfaceKHR` the renderer
//! presents to.

mod window;

pub use window::{Surface, Window};
