//! Logical device and queue management.
//!
//! The engine runs on a single queue: the first physical device exposing a
//! graphics-capable queue family that can present to the surface wins, and
//! one queue is created from that family.

use std::sync::Arc;

use ash::khr::{surface, swapchain};
use ash::vk;
use tracing::{debug, info};

use crate::error::{RhiError, RhiResult};
use crate::instance::Instance;

/// Logical device with its graphics queue and cached memory properties.
pub struct Device {
    device: ash::Device,
    physical_device: vk::PhysicalDevice,
    memory_properties: vk::PhysicalDeviceMemoryProperties,
    graphics_queue: vk::Queue,
    queue_family_index: u32,
}

impl Device {
    /// Picks a physical device and creates the logical device.
    pub fn new(
        instance: &Instance,
        surface: vk::SurfaceKHR,
        surface_loader: &surface::Instance,
    ) -> RhiResult<Arc<Self>> {
        let (physical_device, queue_family_index) =
            pick_physical_device(instance.handle(), surface, surface_loader)?;

        let properties = unsafe {
            instance
                .handle()
                .get_physical_device_properties(physical_device)
        };
        let device_name = properties
            .device_name_as_c_str()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|_| "<unknown>".to_string());

        let queue_priorities = [1.0f32];
        let queue_info = vk::DeviceQueueCreateInfo::default()
            .queue_family_index(queue_family_index)
            .queue_priorities(&queue_priorities);

        let extensions = [swapchain::NAME.as_ptr()];
        let features = vk::PhysicalDeviceFeatures::default();

        let create_info = vk::DeviceCreateInfo::default()
            .queue_create_infos(std::slice::from_ref(&queue_info))
            .enabled_extension_names(&extensions)
            .enabled_features(&features);

        let device = unsafe {
            instance
                .handle()
                .create_device(physical_device, &create_info, None)?
        };
        let graphics_queue = unsafe { device.get_device_queue(queue_family_index, 0) };
        let memory_properties = unsafe {
            instance
                .handle()
                .get_physical_device_memory_properties(physical_device)
        };

        info!(device = %device_name, queue_family = queue_family_index, "Logical device created");

        Ok(Arc::new(Self {
            device,
            physical_device,
            memory_properties,
            graphics_queue,
            queue_family_index,
        }))
    }

    /// Returns the raw logical device.
    #[inline]
    pub fn handle(&self) -> &ash::Device {
        &self.device
    }

    /// Returns the physical device this logical device was created from.
    #[inline]
    pub fn physical_device(&self) -> vk::PhysicalDevice {
        self.physical_device
    }

    /// Memory properties captured at device creation.
    #[inline]
    pub fn memory_properties(&self) -> &vk::PhysicalDeviceMemoryProperties {
        &self.memory_properties
    }

    /// Returns the graphics (and present) queue.
    #[inline]
    pub fn graphics_queue(&self) -> vk::Queue {
        self.graphics_queue
    }

    /// Returns the queue family index the graphics queue belongs to.
    #[inline]
    pub fn queue_family_index(&self) -> u32 {
        self.queue_family_index
    }

    /// Blocks until the device finishes all pending work.
    pub fn wait_idle(&self) -> RhiResult<()> {
        unsafe { self.device.device_wait_idle()? };
        Ok(())
    }

    /// Blocks until the graphics queue drains.
    pub fn queue_wait_idle(&self) -> RhiResult<()> {
        unsafe { self.device.queue_wait_idle(self.graphics_queue)? };
        Ok(())
    }
}

impl Drop for Device {
    fn drop(&mut self) {
        unsafe {
            let _ = self.device.device_wait_idle();
            self.device.destroy_device(None);
        }
        debug!("Logical device destroyed");
    }
}

/// First enumerated device with a graphics queue family that can present.
fn pick_physical_device(
    instance: &ash::Instance,
    surface: vk::SurfaceKHR,
    surface_loader: &surface::Instance,
) -> RhiResult<(vk::PhysicalDevice, u32)> {
    let devices = unsafe { instance.enumerate_physical_devices()? };

    for physical_device in devices {
        let families =
            unsafe { instance.get_physical_device_queue_family_properties(physical_device) };
        for (index, family) in families.iter().enumerate() {
            if !family.queue_flags.contains(vk::QueueFlags::GRAPHICS) {
                continue;
            }
            let can_present = unsafe {
                surface_loader.get_physical_device_surface_support(
                    physical_device,
                    index as u32,
                    surface,
                )?
            };
            if can_present {
                return Ok((physical_device, index as u32));
            }
        }
    }

    Err(RhiError::NoSuitableDevice)
}
