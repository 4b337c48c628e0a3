//! Presentation chain: swapchain, image views and framebuffers.
//!
//! The three resources are created and destroyed together. Each swapchain
//! image is tracked as one [`ChainImage`] record holding its view and
//! framebuffer, so the collections cannot drift out of step. When the
//! surface goes stale the whole chain is torn down and rebuilt; a
//! generation counter records how many rebuilds have happened.

use std::sync::Arc;

use ash::khr::{surface, swapchain};
use ash::vk;
use tracing::{debug, info};

use crate::device::Device;
use crate::error::{RhiError, RhiResult};

/// One swapchain image together with its view and render target.
pub struct ChainImage {
    pub image: vk::Image,
    pub view: vk::ImageView,
    pub framebuffer: vk::Framebuffer,
}

/// What the surface currently supports.
pub struct SurfaceSupport {
    pub capabilities: vk::SurfaceCapabilitiesKHR,
    pub formats: Vec<vk::SurfaceFormatKHR>,
    pub present_modes: Vec<vk::PresentModeKHR>,
}

impl SurfaceSupport {
    /// Queries capabilities, formats and present modes for the surface.
    pub fn query(
        physical_device: vk::PhysicalDevice,
        surface: vk::SurfaceKHR,
        surface_loader: &surface::Instance,
    ) -> RhiResult<Self> {
        unsafe {
            Ok(Self {
                capabilities: surface_loader
                    .get_physical_device_surface_capabilities(physical_device, surface)?,
                formats: surface_loader
                    .get_physical_device_surface_formats(physical_device, surface)?,
                present_modes: surface_loader
                    .get_physical_device_surface_present_modes(physical_device, surface)?,
            })
        }
    }
}

/// Queries the surface and returns the format the chain will use.
///
/// The render pass needs the format before the chain exists; format
/// selection is deterministic, so both ends agree across rebuilds.
pub fn select_surface_format(
    physical_device: vk::PhysicalDevice,
    surface: vk::SurfaceKHR,
    surface_loader: &surface::Instance,
) -> RhiResult<vk::SurfaceFormatKHR> {
    let formats = unsafe {
        surface_loader.get_physical_device_surface_formats(physical_device, surface)?
    };
    if formats.is_empty() {
        return Err(RhiError::SwapchainError(
            "surface reports no formats".to_string(),
        ));
    }
    Ok(choose_surface_format(&formats))
}

/// The swapchain and its per-image render targets.
pub struct PresentationChain {
    device: Arc<Device>,
    loader: swapchain::Device,
    swapchain: vk::SwapchainKHR,
    images: Vec<ChainImage>,
    format: vk::SurfaceFormatKHR,
    extent: vk::Extent2D,
    present_mode: vk::PresentModeKHR,
    generation: u64,
}

impl PresentationChain {
    /// Builds the chain: swapchain, then one view and one framebuffer per
    /// image, against `render_pass`.
    ///
    /// `fallback_extent` is the current framebuffer size, used when the
    /// surface leaves the extent up to the application.
    pub fn new(
        device: Arc<Device>,
        instance: &ash::Instance,
        surface: vk::SurfaceKHR,
        surface_loader: &surface::Instance,
        render_pass: vk::RenderPass,
        fallback_extent: (u32, u32),
    ) -> RhiResult<Self> {
        let loader = swapchain::Device::new(instance, device.handle());

        let built = build_chain(
            &device,
            &loader,
            surface,
            surface_loader,
            render_pass,
            fallback_extent,
        )?;

        Ok(Self {
            device,
            loader,
            swapchain: built.swapchain,
            images: built.images,
            format: built.format,
            extent: built.extent,
            present_mode: built.present_mode,
            generation: 0,
        })
    }

    /// Tears the chain down and builds it again from the surface's
    /// current state, bumping the generation counter.
    ///
    /// The caller must have waited for the device to go idle first; the
    /// old chain is fully destroyed before the new one is created, so no
    /// two chains for the surface are ever alive at once.
    pub fn rebuild(
        &mut self,
        surface: vk::SurfaceKHR,
        surface_loader: &surface::Instance,
        render_pass: vk::RenderPass,
        fallback_extent: (u32, u32),
    ) -> RhiResult<()> {
        self.destroy_targets();

        let built = build_chain(
            &self.device,
            &self.loader,
            surface,
            surface_loader,
            render_pass,
            fallback_extent,
        )?;

        self.swapchain = built.swapchain;
        self.images = built.images;
        self.format = built.format;
        self.extent = built.extent;
        self.present_mode = built.present_mode;
        self.generation += 1;

        info!(
            generation = self.generation,
            width = self.extent.width,
            height = self.extent.height,
            "Presentation chain rebuilt"
        );

        Ok(())
    }

    /// Acquires the next image, signaling `semaphore` when it is ready.
    ///
    /// Returns `None` when the swapchain is out of date and must be
    /// rebuilt. A suboptimal acquire still yields an image; the following
    /// present reports the staleness.
    ///
    /// Errors with [`RhiError::ChainTornDown`] after a failed rebuild,
    /// until a later rebuild succeeds.
    pub fn acquire(&self, semaphore: vk::Semaphore) -> RhiResult<Option<u32>> {
        if self.swapchain == vk::SwapchainKHR::null() {
            return Err(RhiError::ChainTornDown);
        }
        match unsafe {
            self.loader
                .acquire_next_image(self.swapchain, u64::MAX, semaphore, vk::Fence::null())
        } {
            Ok((index, _suboptimal)) => Ok(Some(index)),
            Err(vk::Result::ERROR_OUT_OF_DATE_KHR) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Presents `image_index` after `wait_semaphore` signals.
    ///
    /// Returns `true` when the chain has gone stale and must be rebuilt.
    pub fn present(
        &self,
        queue: vk::Queue,
        image_index: u32,
        wait_semaphore: vk::Semaphore,
    ) -> RhiResult<bool> {
        if self.swapchain == vk::SwapchainKHR::null() {
            return Err(RhiError::ChainTornDown);
        }
        let wait_semaphores = [wait_semaphore];
        let swapchains = [self.swapchain];
        let image_indices = [image_index];

        let present_info = vk::PresentInfoKHR::default()
            .wait_semaphores(&wait_semaphores)
            .swapchains(&swapchains)
            .image_indices(&image_indices);

        match unsafe {
            self.loader
                .queue_present(queue, &present_info)
        } {
            Ok(suboptimal) => Ok(suboptimal),
            Err(vk::Result::ERROR_OUT_OF_DATE_KHR) => Ok(true),
            Err(e) => Err(e.into()),
        }
    }

    /// Framebuffer for the image at `index`.
    #[inline]
    pub fn framebuffer(&self, index: u32) -> vk::Framebuffer {
        self.images[index as usize].framebuffer
    }

    /// Number of images in the chain.
    #[inline]
    pub fn image_count(&self) -> usize {
        self.images.len()
    }

    /// Surface format the chain was built with.
    #[inline]
    pub fn format(&self) -> vk::SurfaceFormatKHR {
        self.format
    }

    /// Current image extent.
    #[inline]
    pub fn extent(&self) -> vk::Extent2D {
        self.extent
    }

    /// Present mode in use.
    #[inline]
    pub fn present_mode(&self) -> vk::PresentModeKHR {
        self.present_mode
    }

    /// How many times the chain has been rebuilt.
    #[inline]
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Destroys framebuffers, views and the swapchain, in that order.
    ///
    /// Nulls the swapchain handle afterwards: if a rebuild fails between
    /// teardown and the new build, the chain stays in a torn-down state
    /// that `acquire`/`present` reject and `Drop` can pass through safely
    /// (destroying a null swapchain is a no-op).
    fn destroy_targets(&mut self) {
        unsafe {
            for record in self.images.drain(..) {
                self.device
                    .handle()
                    .destroy_framebuffer(record.framebuffer, None);
                self.device.handle().destroy_image_view(record.view, None);
            }
            self.loader.destroy_swapchain(self.swapchain, None);
        }
        self.swapchain = vk::SwapchainKHR::null();
    }
}

impl Drop for PresentationChain {
    fn drop(&mut self) {
        self.destroy_targets();
        debug!("Presentation chain destroyed");
    }
}

struct BuiltChain {
    swapchain: vk::SwapchainKHR,
    images: Vec<ChainImage>,
    format: vk::SurfaceFormatKHR,
    extent: vk::Extent2D,
    present_mode: vk::PresentModeKHR,
}

fn build_chain(
    device: &Device,
    loader: &swapchain::Device,
    surface: vk::SurfaceKHR,
    surface_loader: &surface::Instance,
    render_pass: vk::RenderPass,
    fallback_extent: (u32, u32),
) -> RhiResult<BuiltChain> {
    let support = SurfaceSupport::query(device.physical_device(), surface, surface_loader)?;
    if support.formats.is_empty() || support.present_modes.is_empty() {
        return Err(RhiError::SwapchainError(
            "surface reports no formats or present modes".to_string(),
        ));
    }

    let format = choose_surface_format(&support.formats);
    let present_mode = choose_present_mode(&support.present_modes);
    let extent = choose_extent(&support.capabilities, fallback_extent);
    let image_count = determine_image_count(&support.capabilities);

    let create_info = vk::SwapchainCreateInfoKHR::default()
        .surface(surface)
        .min_image_count(image_count)
        .image_format(format.format)
        .image_color_space(format.color_space)
        .image_extent(extent)
        .image_array_layers(1)
        .image_usage(vk::ImageUsageFlags::COLOR_ATTACHMENT)
        .image_sharing_mode(vk::SharingMode::EXCLUSIVE)
        .pre_transform(support.capabilities.current_transform)
        .composite_alpha(vk::CompositeAlphaFlagsKHR::OPAQUE)
        .present_mode(present_mode)
        .clipped(true);

    let swapchain = unsafe { loader.create_swapchain(&create_info, None)? };

    let raw_images = match unsafe { loader.get_swapchain_images(swapchain) } {
        Ok(images) => images,
        Err(e) => {
            unsafe { loader.destroy_swapchain(swapchain, None) };
            return Err(e.into());
        }
    };

    let mut images: Vec<ChainImage> = Vec::with_capacity(raw_images.len());
    for &image in &raw_images {
        let view = match create_image_view(device, image, format.format) {
            Ok(view) => view,
            Err(e) => {
                unwind_partial(device, loader, swapchain, &mut images);
                return Err(e);
            }
        };
        let framebuffer = match create_framebuffer(device, render_pass, view, extent) {
            Ok(framebuffer) => framebuffer,
            Err(e) => {
                unsafe { device.handle().destroy_image_view(view, None) };
                unwind_partial(device, loader, swapchain, &mut images);
                return Err(e);
            }
        };
        images.push(ChainImage {
            image,
            view,
            framebuffer,
        });
    }

    info!(
        images = images.len(),
        width = extent.width,
        height = extent.height,
        format = ?format.format,
        present_mode = ?present_mode,
        "Presentation chain created"
    );

    Ok(BuiltChain {
        swapchain,
        images,
        format,
        extent,
        present_mode,
    })
}

/// Reverse-order cleanup for a chain that failed partway through.
fn unwind_partial(
    device: &Device,
    loader: &swapchain::Device,
    swapchain: vk::SwapchainKHR,
    images: &mut Vec<ChainImage>,
) {
    unsafe {
        for record in images.drain(..) {
            device.handle().destroy_framebuffer(record.framebuffer, None);
            device.handle().destroy_image_view(record.view, None);
        }
        loader.destroy_swapchain(swapchain, None);
    }
}

fn create_image_view(
    device: &Device,
    image: vk::Image,
    format: vk::Format,
) -> RhiResult<vk::ImageView> {
    let create_info = vk::ImageViewCreateInfo::default()
        .image(image)
        .view_type(vk::ImageViewType::TYPE_2D)
        .format(format)
        .components(vk::ComponentMapping {
            r: vk::ComponentSwizzle::IDENTITY,
            g: vk::ComponentSwizzle::IDENTITY,
            b: vk::ComponentSwizzle::IDENTITY,
            a: vk::ComponentSwizzle::IDENTITY,
        })
        .subresource_range(vk::ImageSubresourceRange {
            aspect_mask: vk::ImageAspectFlags::COLOR,
            base_mip_level: 0,
            level_count: 1,
            base_array_layer: 0,
            layer_count: 1,
        });

    Ok(unsafe { device.handle().create_image_view(&create_info, None)? })
}

fn create_framebuffer(
    device: &Device,
    render_pass: vk::RenderPass,
    view: vk::ImageView,
    extent: vk::Extent2D,
) -> RhiResult<vk::Framebuffer> {
    let attachments = [view];
    let create_info = vk::FramebufferCreateInfo::default()
        .render_pass(render_pass)
        .attachments(&attachments)
        .width(extent.width)
        .height(extent.height)
        .layers(1);

    Ok(unsafe { device.handle().create_framebuffer(&create_info, None)? })
}

/// Prefers `B8G8R8A8_SRGB` with the sRGB nonlinear color space, otherwise
/// takes the first format the surface reports.
///
/// The caller guarantees `formats` is non-empty.
pub fn choose_surface_format(formats: &[vk::SurfaceFormatKHR]) -> vk::SurfaceFormatKHR {
    formats
        .iter()
        .copied()
        .find(|f| {
            f.format == vk::Format::B8G8R8A8_SRGB
                && f.color_space == vk::ColorSpaceKHR::SRGB_NONLINEAR
        })
        .unwrap_or(formats[0])
}

/// `MAILBOX` when offered, otherwise `FIFO` (always available).
pub fn choose_present_mode(modes: &[vk::PresentModeKHR]) -> vk::PresentModeKHR {
    if modes.contains(&vk::PresentModeKHR::MAILBOX) {
        vk::PresentModeKHR::MAILBOX
    } else {
        vk::PresentModeKHR::FIFO
    }
}

/// The surface's current extent when it pins one, otherwise the fallback
/// framebuffer size clamped per axis to the supported range.
pub fn choose_extent(
    capabilities: &vk::SurfaceCapabilitiesKHR,
    fallback: (u32, u32),
) -> vk::Extent2D {
    if capabilities.current_extent.width != u32::MAX {
        capabilities.current_extent
    } else {
        vk::Extent2D {
            width: fallback.0.clamp(
                capabilities.min_image_extent.width,
                capabilities.max_image_extent.width,
            ),
            height: fallback.1.clamp(
                capabilities.min_image_extent.height,
                capabilities.max_image_extent.height,
            ),
        }
    }
}

/// One more than the minimum image count, clamped to the maximum when the
/// surface declares one (zero means unbounded).
pub fn determine_image_count(capabilities: &vk::SurfaceCapabilitiesKHR) -> u32 {
    let mut count = capabilities.min_image_count + 1;
    if capabilities.max_image_count > 0 && count > capabilities.max_image_count {
        count = capabilities.max_image_count;
    }
    count
}

#[cfg(test)]
mod tests {
    use super::*;

    fn format(format: vk::Format, color_space: vk::ColorSpaceKHR) -> vk::SurfaceFormatKHR {
        vk::SurfaceFormatKHR {
            format,
            color_space,
        }
    }

    #[test]
    fn test_choose_surface_format_prefers_srgb() {
        let formats = [
            format(vk::Format::R8G8B8A8_UNORM, vk::ColorSpaceKHR::SRGB_NONLINEAR),
            format(vk::Format::B8G8R8A8_SRGB, vk::ColorSpaceKHR::SRGB_NONLINEAR),
        ];
        let chosen = choose_surface_format(&formats);
        assert_eq!(chosen.format, vk::Format::B8G8R8A8_SRGB);
        assert_eq!(chosen.color_space, vk::ColorSpaceKHR::SRGB_NONLINEAR);
    }

    #[test]
    fn test_choose_surface_format_requires_matching_color_space() {
        // Right format, wrong color space: falls back to the first entry.
        let formats = [
            format(vk::Format::R8G8B8A8_UNORM, vk::ColorSpaceKHR::SRGB_NONLINEAR),
            format(vk::Format::B8G8R8A8_SRGB, vk::ColorSpaceKHR::EXTENDED_SRGB_LINEAR_EXT),
        ];
        let chosen = choose_surface_format(&formats);
        assert_eq!(chosen.format, vk::Format::R8G8B8A8_UNORM);
    }

    #[test]
    fn test_choose_surface_format_fallback_is_first() {
        let formats = [
            format(vk::Format::R16G16B16A16_SFLOAT, vk::ColorSpaceKHR::SRGB_NONLINEAR),
            format(vk::Format::R8G8B8A8_UNORM, vk::ColorSpaceKHR::SRGB_NONLINEAR),
        ];
        let chosen = choose_surface_format(&formats);
        assert_eq!(chosen.format, vk::Format::R16G16B16A16_SFLOAT);
    }

    #[test]
    fn test_choose_present_mode_prefers_mailbox() {
        let modes = [
            vk::PresentModeKHR::FIFO,
            vk::PresentModeKHR::MAILBOX,
            vk::PresentModeKHR::IMMEDIATE,
        ];
        assert_eq!(choose_present_mode(&modes), vk::PresentModeKHR::MAILBOX);
    }

    #[test]
    fn test_choose_present_mode_falls_back_to_fifo() {
        let modes = [vk::PresentModeKHR::FIFO, vk::PresentModeKHR::IMMEDIATE];
        assert_eq!(choose_present_mode(&modes), vk::PresentModeKHR::FIFO);
    }

    #[test]
    fn test_choose_extent_uses_current_when_pinned() {
        let capabilities = vk::SurfaceCapabilitiesKHR {
            current_extent: vk::Extent2D {
                width: 800,
                height: 600,
            },
            ..Default::default()
        };
        let extent = choose_extent(&capabilities, (1920, 1080));
        assert_eq!(extent.width, 800);
        assert_eq!(extent.height, 600);
    }

    #[test]
    fn test_choose_extent_clamps_fallback() {
        let capabilities = vk::SurfaceCapabilitiesKHR {
            current_extent: vk::Extent2D {
                width: u32::MAX,
                height: u32::MAX,
            },
            min_image_extent: vk::Extent2D {
                width: 100,
                height: 100,
            },
            max_image_extent: vk::Extent2D {
                width: 1600,
                height: 900,
            },
            ..Default::default()
        };

        // Too large clamps down, too small clamps up, per axis.
        let extent = choose_extent(&capabilities, (1920, 50));
        assert_eq!(extent.width, 1600);
        assert_eq!(extent.height, 100);

        let extent = choose_extent(&capabilities, (640, 480));
        assert_eq!(extent.width, 640);
        assert_eq!(extent.height, 480);
    }

    #[test]
    fn test_determine_image_count_adds_one() {
        let capabilities = vk::SurfaceCapabilitiesKHR {
            min_image_count: 2,
            max_image_count: 8,
            ..Default::default()
        };
        assert_eq!(determine_image_count(&capabilities), 3);
    }

    #[test]
    fn test_determine_image_count_clamps_to_max() {
        let capabilities = vk::SurfaceCapabilitiesKHR {
            min_image_count: 3,
            max_image_count: 3,
            ..Default::default()
        };
        assert_eq!(determine_image_count(&capabilities), 3);
    }

    #[test]
    fn test_determine_image_count_zero_max_is_unbounded() {
        let capabilities = vk::SurfaceCapabilitiesKHR {
            min_image_count: 4,
            max_image_count: 0,
            ..Default::default()
        };
        assert_eq!(determine_image_count(&capabilities), 5);
    }
}
