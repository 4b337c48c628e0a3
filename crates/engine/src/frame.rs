//! Frame scheduling for a single frame in flight.
//!
//! Two binary semaphores carry the whole frame: the acquire signals
//! `image_acquired`, the submit waits on it at the color-attachment stage
//! and signals `render_finished`, and the present waits on that. After
//! every presented frame the graphics queue is drained, which is what
//! makes reusing the one command buffer safe; no fences are involved.

use std::sync::Arc;

use glint_rhi::command::{CommandBuffer, CommandPool};
use glint_rhi::device::Device;
use glint_rhi::swapchain::PresentationChain;
use glint_rhi::sync::Semaphore;
use glint_rhi::{vk, RhiResult};

/// Sync objects and the command buffer for the one in-flight frame.
pub struct FrameScheduler {
    device: Arc<Device>,
    // Kept alive for the command buffer; both are freed on drop.
    _command_pool: CommandPool,
    command_buffer: CommandBuffer,
    image_acquired: Semaphore,
    render_finished: Semaphore,
}

impl FrameScheduler {
    /// Creates the command pool, one primary command buffer and both
    /// semaphores.
    pub fn new(device: Arc<Device>) -> RhiResult<Self> {
        let command_pool = CommandPool::new(device.clone(), device.queue_family_index())?;
        let command_buffer = command_pool.allocate()?;
        let image_acquired = Semaphore::new(device.clone())?;
        let render_finished = Semaphore::new(device.clone())?;

        Ok(Self {
            device,
            _command_pool: command_pool,
            command_buffer,
            image_acquired,
            render_finished,
        })
    }

    /// Acquires the next chain image, or `None` when the chain is stale.
    pub fn acquire(&self, chain: &PresentationChain) -> RhiResult<Option<u32>> {
        chain.acquire(self.image_acquired.handle())
    }

    /// The frame's command buffer.
    #[inline]
    pub fn command_buffer(&self) -> &CommandBuffer {
        &self.command_buffer
    }

    /// Submits the recorded command buffer: waits for the acquired image
    /// at the color-attachment stage and signals `render_finished`.
    pub fn submit(&self) -> RhiResult<()> {
        let wait_semaphores = [self.image_acquired.handle()];
        let wait_stages = [vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT];
        let command_buffers = [self.command_buffer.handle()];
        let signal_semaphores = [self.render_finished.handle()];

        let submit_info = vk::SubmitInfo::default()
            .wait_semaphores(&wait_semaphores)
            .wait_dst_stage_mask(&wait_stages)
            .command_buffers(&command_buffers)
            .signal_semaphores(&signal_semaphores);

        unsafe {
            self.device.handle().queue_submit(
                self.device.graphics_queue(),
                std::slice::from_ref(&submit_info),
                vk::Fence::null(),
            )?;
        }
        Ok(())
    }

    /// Presents the image once rendering finishes.
    ///
    /// Returns `true` when the chain has gone stale.
    pub fn present(&self, chain: &PresentationChain, image_index: u32) -> RhiResult<bool> {
        chain.present(
            self.device.graphics_queue(),
            image_index,
            self.render_finished.handle(),
        )
    }

    /// Waits for the graphics queue to drain.
    ///
    /// Runs after every presented frame. This is the engine's only
    /// throughput limiter, and it guarantees the command buffer is free
    /// for the next iteration.
    pub fn drain(&self) -> RhiResult<()> {
        self.device.queue_wait_idle()
    }
}
