//! Window and surface management.

use std::sync::Arc;

use ash::khr::surface;
use ash::vk;
use raw_window_handle::{HasDisplayHandle, HasWindowHandle, RawDisplayHandle};
use tracing::{debug, info};
use winit::dpi::LogicalSize;
use winit::event_loop::ActiveEventLoop;
use winit::window::Window as WinitWindow;

use glint_core::{Error, Result};

/// Vulkan surface with its extension loader.
///
/// Destroying the surface requires the instance to still be alive, so the
/// owner must drop this before the instance wrapper.
pub struct Surface {
    handle: vk::SurfaceKHR,
    loader: surface::Instance,
}

impl Surface {
    /// Returns the raw surface handle.
    #[inline]
    pub fn handle(&self) -> vk::SurfaceKHR {
        self.handle
    }

    /// Returns the surface extension loader.
    #[inline]
    pub fn loader(&self) -> &surface::Instance {
        &self.loader
    }
}

impl Drop for Surface {
    fn drop(&mut self) {
        unsafe {
            self.loader.destroy_surface(self.handle, None);
        }
        debug!("Surface destroyed");
    }
}

/// Application window.
///
/// Cheap to clone; all clones refer to the same underlying winit window.
#[derive(Clone)]
pub struct Window {
    inner: Arc<WinitWindow>,
}

impl Window {
    /// Creates a window with the given logical size and title.
    pub fn new(event_loop: &ActiveEventLoop, width: u32, height: u32, title: &str) -> Result<Self> {
        let attributes = WinitWindow::default_attributes()
            .with_title(title)
            .with_inner_size(LogicalSize::new(width, height));

        let inner = event_loop
            .create_window(attributes)
            .map_err(|e| Error::Window(e.to_string()))?;

        info!(width, height, title, "Window created");

        Ok(Self {
            inner: Arc::new(inner),
        })
    }

    /// Current framebuffer size in physical pixels.
    ///
    /// Either dimension may be zero while the window is minimized.
    pub fn framebuffer_size(&self) -> (u32, u32) {
        let size = self.inner.inner_size();
        (size.width, size.height)
    }

    /// Asks the window system for another redraw.
    pub fn request_redraw(&self) {
        self.inner.request_redraw();
    }

    /// Raw display handle, needed to enumerate instance extensions.
    pub fn display_handle(&self) -> Result<RawDisplayHandle> {
        Ok(self
            .inner
            .display_handle()
            .map_err(|e| Error::Window(e.to_string()))?
            .as_raw())
    }

    /// Creates a Vulkan surface for this window.
    pub fn create_surface(&self, entry: &ash::Entry, instance: &ash::Instance) -> Result<Surface> {
        let display = self
            .inner
            .display_handle()
            .map_err(|e| Error::Window(e.to_string()))?
            .as_raw();
        let window = self
            .inner
            .window_handle()
            .map_err(|e| Error::Window(e.to_string()))?
            .as_raw();

        let handle =
            unsafe { ash_window::create_surface(entry, instance, display, window, None) }
                .map_err(|e| Error::Vulkan(format!("surface creation failed: {e}")))?;
        let loader = surface::Instance::new(entry, instance);

        debug!("Surface created");

        Ok(Surface { handle, loader })
    }
}
