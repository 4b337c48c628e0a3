//! Engine lifecycle and the per-frame render step.

use std::mem::ManuallyDrop;
use std::path::PathBuf;
use std::sync::Arc;

use tracing::{debug, info, warn};

use glint_platform::{Surface, Window};
use glint_rhi::buffer::{BufferUsage, HostBuffer};
use glint_rhi::descriptor::{self, DescriptorPool, DescriptorSetLayout};
use glint_rhi::device::Device;
use glint_rhi::instance::Instance;
use glint_rhi::pipeline::{Pipeline, PipelineLayout};
use glint_rhi::render_pass::RenderPass;
use glint_rhi::shader::{Shader, ShaderStage};
use glint_rhi::swapchain::{self, PresentationChain};
use glint_rhi::vertex::{Vertex, MAX_VERTEX_COUNT};
use glint_rhi::{vk, RhiError, RhiResult};

use crate::error::EngineResult;
use crate::frame::FrameScheduler;
use crate::geometry::GeometryBinding;
use crate::view::ViewUniform;

/// Clear color used until the application sets one: opaque blue.
pub const DEFAULT_CLEAR_COLOR: [f32; 4] = [0.0, 0.0, 1.0, 1.0];

/// Startup parameters.
#[derive(Clone, Debug)]
pub struct EngineConfig {
    /// Initial window width in logical pixels.
    pub width: u32,
    /// Initial window height in logical pixels.
    pub height: u32,
    /// Window title, also reported as the Vulkan application name.
    pub title: String,
    /// Path to the vertex shader SPIR-V binary.
    pub vertex_shader: PathBuf,
    /// Path to the fragment shader SPIR-V binary.
    pub fragment_shader: PathBuf,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            width: 800,
            height: 600,
            title: "glint".to_string(),
            vertex_shader: PathBuf::from("shaders/triangle.vert.spv"),
            fragment_shader: PathBuf::from("shaders/triangle.frag.spv"),
        }
    }
}

/// What a render iteration did.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FrameOutcome {
    /// A frame was rendered and presented.
    Presented,
    /// The window has zero area; nothing was recorded or submitted.
    Skipped,
    /// The presentation chain went stale and was rebuilt. No frame was
    /// presented this iteration; the next one retries.
    Rebuilt,
}

/// Pipeline plus everything needed to recreate it at a new extent.
struct PipelineState {
    pipeline: Pipeline,
    layout: PipelineLayout,
    vertex_shader: Shader,
    fragment_shader: Shader,
}

impl PipelineState {
    fn new(
        device: Arc<Device>,
        config: &EngineConfig,
        set_layout: vk::DescriptorSetLayout,
        render_pass: vk::RenderPass,
        extent: vk::Extent2D,
    ) -> EngineResult<Self> {
        let vertex_shader = Shader::from_spirv_file(
            device.clone(),
            &config.vertex_shader,
            ShaderStage::Vertex,
            "main",
        )?;
        let fragment_shader = Shader::from_spirv_file(
            device.clone(),
            &config.fragment_shader,
            ShaderStage::Fragment,
            "main",
        )?;
        let layout = PipelineLayout::new(device.clone(), &[set_layout])?;
        let pipeline = Pipeline::create_graphics(
            device,
            &vertex_shader,
            &fragment_shader,
            &layout,
            render_pass,
            extent,
        )?;

        Ok(Self {
            pipeline,
            layout,
            vertex_shader,
            fragment_shader,
        })
    }

    /// Rebuilds the pipeline for a new extent. The viewport is static, so
    /// every chain rebuild requires this.
    fn recreate(
        &mut self,
        device: Arc<Device>,
        render_pass: vk::RenderPass,
        extent: vk::Extent2D,
    ) -> EngineResult<()> {
        self.pipeline = Pipeline::create_graphics(
            device,
            &self.vertex_shader,
            &self.fragment_shader,
            &self.layout,
            render_pass,
            extent,
        )?;
        Ok(())
    }
}

/// The engine: owns the whole Vulkan context for one window.
///
/// Teardown order matters, so the Vulkan members live in `ManuallyDrop`
/// and are released explicitly in [`Drop`], in strict reverse of
/// construction, after a device idle wait.
pub struct Engine {
    window: Window,
    instance: ManuallyDrop<Instance>,
    surface: ManuallyDrop<Surface>,
    device: ManuallyDrop<Arc<Device>>,
    render_pass: ManuallyDrop<RenderPass>,
    chain: ManuallyDrop<PresentationChain>,
    scheduler: ManuallyDrop<FrameScheduler>,
    vertex_buffer: ManuallyDrop<HostBuffer>,
    uniform_buffer: ManuallyDrop<HostBuffer>,
    descriptor_layout: ManuallyDrop<DescriptorSetLayout>,
    descriptor_pool: ManuallyDrop<DescriptorPool>,
    descriptor_set: vk::DescriptorSet,
    pipeline: Option<PipelineState>,
    geometry: GeometryBinding,
    clear_color: [f32; 4],
}

impl Engine {
    /// Brings up the full rendering context for `window`.
    ///
    /// Construction order: instance, surface, device, render pass,
    /// presentation chain, frame scheduler, vertex and uniform buffers,
    /// descriptors, pipeline. A failure at any step unwinds the stages
    /// already built, in reverse.
    ///
    /// Missing shader files are not fatal: the engine logs a warning and
    /// runs clear-only, skipping the draw each frame.
    pub fn new(window: &Window, config: &EngineConfig) -> EngineResult<Self> {
        let instance = Instance::new(&config.title, window.display_handle()?)?;
        let surface = window.create_surface(instance.entry(), instance.handle())?;
        let device = Device::new(&instance, surface.handle(), surface.loader())?;

        let surface_format = swapchain::select_surface_format(
            device.physical_device(),
            surface.handle(),
            surface.loader(),
        )?;
        let render_pass = RenderPass::new(device.clone(), surface_format.format)?;

        let chain = PresentationChain::new(
            device.clone(),
            instance.handle(),
            surface.handle(),
            surface.loader(),
            render_pass.handle(),
            window.framebuffer_size(),
        )?;

        let scheduler = FrameScheduler::new(device.clone())?;

        let vertex_buffer = HostBuffer::new(
            device.clone(),
            (MAX_VERTEX_COUNT * Vertex::STRIDE) as vk::DeviceSize,
            BufferUsage::Vertex,
        )?;
        let uniform_buffer = HostBuffer::new(
            device.clone(),
            ViewUniform::SIZE as vk::DeviceSize,
            BufferUsage::Uniform,
        )?;
        // The shader must never read garbage, even before the first
        // set_view_matrix call.
        uniform_buffer.write(0, bytemuck::bytes_of(&ViewUniform::identity()))?;

        let bindings = [descriptor::uniform_buffer_binding(
            0,
            vk::ShaderStageFlags::VERTEX,
        )];
        let descriptor_layout = DescriptorSetLayout::new(device.clone(), &bindings)?;
        let pool_sizes = [vk::DescriptorPoolSize {
            ty: vk::DescriptorType::UNIFORM_BUFFER,
            descriptor_count: 1,
        }];
        let descriptor_pool = DescriptorPool::new(device.clone(), &pool_sizes, 1)?;
        let descriptor_set = descriptor_pool.allocate(&descriptor_layout)?;
        descriptor::write_uniform_buffer(
            &device,
            descriptor_set,
            0,
            uniform_buffer.handle(),
            ViewUniform::SIZE as vk::DeviceSize,
        );

        let pipeline = match PipelineState::new(
            device.clone(),
            config,
            descriptor_layout.handle(),
            render_pass.handle(),
            chain.extent(),
        ) {
            Ok(state) => Some(state),
            Err(e) => {
                warn!(error = %e, "Graphics pipeline unavailable, rendering clear color only");
                None
            }
        };

        info!(images = chain.image_count(), "Engine created");

        Ok(Self {
            window: window.clone(),
            instance: ManuallyDrop::new(instance),
            surface: ManuallyDrop::new(surface),
            device: ManuallyDrop::new(device),
            render_pass: ManuallyDrop::new(render_pass),
            chain: ManuallyDrop::new(chain),
            scheduler: ManuallyDrop::new(scheduler),
            vertex_buffer: ManuallyDrop::new(vertex_buffer),
            uniform_buffer: ManuallyDrop::new(uniform_buffer),
            descriptor_layout: ManuallyDrop::new(descriptor_layout),
            descriptor_pool: ManuallyDrop::new(descriptor_pool),
            descriptor_set,
            pipeline,
            geometry: GeometryBinding::with_capacity(MAX_VERTEX_COUNT as u32),
            clear_color: DEFAULT_CLEAR_COLOR,
        })
    }

    /// Sets the clear color. Stored verbatim; values are not clamped.
    pub fn set_clear_color(&mut self, color: [f32; 4]) {
        self.clear_color = color;
    }

    /// Current clear color.
    #[inline]
    pub fn clear_color(&self) -> [f32; 4] {
        self.clear_color
    }

    /// Uploads geometry to the vertex buffer.
    ///
    /// Rejects uploads above [`MAX_VERTEX_COUNT`] without touching the
    /// buffer; the previously uploaded geometry keeps drawing. On success
    /// the active count switches to the new upload.
    pub fn set_vertices(&mut self, vertices: &[Vertex]) -> EngineResult<()> {
        let count = self.geometry.admit(vertices.len())?;
        self.vertex_buffer.write(0, bytemuck::cast_slice(vertices))?;
        self.geometry.commit(count);
        debug!(count, "Geometry uploaded");
        Ok(())
    }

    /// Number of vertices the next frame will draw.
    #[inline]
    pub fn active_vertex_count(&self) -> u32 {
        self.geometry.active()
    }

    /// Uploads a new view matrix to the uniform buffer.
    pub fn set_view_matrix(&mut self, view: glam::Mat4) -> EngineResult<()> {
        let uniform = ViewUniform::new(view);
        self.uniform_buffer.write(0, bytemuck::bytes_of(&uniform))?;
        Ok(())
    }

    /// How many times the presentation chain has been rebuilt.
    #[inline]
    pub fn chain_generation(&self) -> u64 {
        self.chain.generation()
    }

    /// Runs one iteration of the frame state machine.
    ///
    /// Acquire, record, submit, present, drain. A stale acquire or
    /// present rebuilds the chain instead of presenting; the caller's
    /// next iteration retries, so staleness never surfaces as an error.
    /// Other failures propagate for the loop to log and move past.
    pub fn render_frame(&mut self) -> EngineResult<FrameOutcome> {
        let (width, height) = self.window.framebuffer_size();
        if width == 0 || height == 0 {
            return Ok(FrameOutcome::Skipped);
        }

        let image_index = match self.scheduler.acquire(&self.chain) {
            Ok(Some(index)) => index,
            // A stale chain, or one left torn down by a failed rebuild,
            // is rebuilt now and the frame retried next iteration.
            Ok(None) | Err(RhiError::ChainTornDown) => {
                self.rebuild_chain()?;
                return Ok(FrameOutcome::Rebuilt);
            }
            Err(e) => return Err(e.into()),
        };

        self.record(image_index)?;
        self.scheduler.submit()?;

        // Drain unconditionally before acting on the present result: the
        // submit is on the queue whether the present succeeded or not,
        // and the command buffer must not be reset while still in flight.
        let presented = self.scheduler.present(&self.chain, image_index);
        let drained = self.scheduler.drain();

        let outcome = settle_present(presented, drained)?;
        if outcome == FrameOutcome::Rebuilt {
            self.rebuild_chain()?;
        }
        Ok(outcome)
    }

    /// Records the frame's command buffer against the acquired image.
    fn record(&self, image_index: u32) -> EngineResult<()> {
        let cmd = self.scheduler.command_buffer();
        cmd.reset()?;
        cmd.begin_one_time()?;
        cmd.begin_render_pass(
            self.render_pass.handle(),
            self.chain.framebuffer(image_index),
            self.chain.extent(),
            self.clear_color,
        );

        if self.geometry.active() > 0 {
            if let Some(state) = &self.pipeline {
                cmd.bind_graphics_pipeline(state.pipeline.handle());
                cmd.bind_vertex_buffer(self.vertex_buffer.handle());
                cmd.bind_descriptor_set(state.layout.handle(), self.descriptor_set);
                cmd.draw(self.geometry.active());
            }
        }

        cmd.end_render_pass();
        cmd.end()?;
        Ok(())
    }

    /// Waits for the device and rebuilds everything sized by the surface:
    /// the presentation chain and, because its viewport is static, the
    /// graphics pipeline.
    fn rebuild_chain(&mut self) -> EngineResult<()> {
        self.device.wait_idle()?;
        self.chain.rebuild(
            self.surface.handle(),
            self.surface.loader(),
            self.render_pass.handle(),
            self.window.framebuffer_size(),
        )?;

        if let Some(state) = self.pipeline.as_mut() {
            state.recreate(
                (*self.device).clone(),
                self.render_pass.handle(),
                self.chain.extent(),
            )?;
        }

        Ok(())
    }
}

/// Folds the present and drain results into the frame outcome.
///
/// Expects the drain to have already run. A present failure wins over a
/// drain failure, which is only logged; a stale present maps to
/// [`FrameOutcome::Rebuilt`] so the caller rebuilds the chain.
fn settle_present(presented: RhiResult<bool>, drained: RhiResult<()>) -> RhiResult<FrameOutcome> {
    match presented {
        Ok(true) => {
            drained?;
            Ok(FrameOutcome::Rebuilt)
        }
        Ok(false) => {
            drained?;
            Ok(FrameOutcome::Presented)
        }
        Err(e) => {
            if let Err(drain_err) = drained {
                warn!(error = %drain_err, "Queue drain failed after present error");
            }
            Err(e)
        }
    }
}

impl Drop for Engine {
    fn drop(&mut self) {
        if let Err(e) = self.device.wait_idle() {
            warn!(error = %e, "Device wait failed during engine teardown");
        }

        // Strict reverse of construction. The descriptor set goes with
        // its pool.
        self.pipeline = None;
        unsafe {
            ManuallyDrop::drop(&mut self.descriptor_pool);
            ManuallyDrop::drop(&mut self.descriptor_layout);
            ManuallyDrop::drop(&mut self.uniform_buffer);
            ManuallyDrop::drop(&mut self.vertex_buffer);
            ManuallyDrop::drop(&mut self.scheduler);
            ManuallyDrop::drop(&mut self.chain);
            ManuallyDrop::drop(&mut self.render_pass);
            ManuallyDrop::drop(&mut self.device);
            ManuallyDrop::drop(&mut self.surface);
            ManuallyDrop::drop(&mut self.instance);
        }

        debug!("Engine destroyed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_settle_present_reports_outcomes() {
        assert_eq!(
            settle_present(Ok(false), Ok(())).unwrap(),
            FrameOutcome::Presented
        );
        assert_eq!(
            settle_present(Ok(true), Ok(())).unwrap(),
            FrameOutcome::Rebuilt
        );
    }

    #[test]
    fn test_settle_present_error_wins_over_drain_error() {
        // Both calls failed; the present error is the one reported.
        let presented = Err(RhiError::Vulkan(vk::Result::ERROR_SURFACE_LOST_KHR));
        let drained = Err(RhiError::Vulkan(vk::Result::ERROR_DEVICE_LOST));
        let err = settle_present(presented, drained).unwrap_err();
        assert!(matches!(
            err,
            RhiError::Vulkan(vk::Result::ERROR_SURFACE_LOST_KHR)
        ));
    }

    #[test]
    fn test_settle_present_surfaces_drain_failure() {
        let drained = Err(RhiError::Vulkan(vk::Result::ERROR_DEVICE_LOST));
        let err = settle_present(Ok(false), drained).unwrap_err();
        assert!(matches!(
            err,
            RhiError::Vulkan(vk::Result::ERROR_DEVICE_LOST)
        ));
    }
}
