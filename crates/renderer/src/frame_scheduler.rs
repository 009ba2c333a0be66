//! Per-frame orchestration: acquisition, synchronization, recording
//! brackets, submission, presentation, and swapchain recreation.
//!
//! The scheduler pipelines up to [`MAX_FRAMES_IN_FLIGHT`] frames. Each
//! slot carries its own semaphore pair and fence; command buffers are
//! allocated one per presentable image and reassigned as images are
//! acquired. Slot index and image index are tracked separately and are
//! generally different values.
//!
//! Lifecycle per loop iteration:
//!
//! ```text
//! begin_frame()            -> None: stale surface or minimized, skip
//!                          -> Some(ctx): frame open, command buffer recording
//! begin_render_pass(&ctx)
//!   ... draw submission ...
//! end_render_pass(&ctx)
//! end_frame(ctx)           submits, presents, recreates if stale/resized
//! ```

use std::sync::Arc;

use ash::vk;
use tracing::{debug, info, warn};

use glimmer_rhi::MAX_FRAMES_IN_FLIGHT;
use glimmer_rhi::command::{CommandBuffer, CommandPool};
use glimmer_rhi::device::Device;
use glimmer_rhi::swapchain::{AcquiredImage, PresentOutcome};
use glimmer_rhi::sync::{Fence, Semaphore};

use crate::error::{RenderError, RenderResult};
use crate::pacing::{FramePacer, FramePhase, ImagesInFlight};
use crate::swap_resources::SwapResources;

/// Surface the scheduler presents to, as seen from the frame loop.
///
/// The scheduler never blocks on the window. While the extent is zero
/// (minimized) it defers recreation and skips frames; the event loop
/// keeps running and delivers the resize that makes the extent usable
/// again.
pub trait PresentTarget {
    fn current_extent(&self) -> vk::Extent2D;
    /// Returns true once per latched resize, clearing the flag.
    fn take_resize_request(&self) -> bool;
}

/// Whether an extent can back swap resources. Minimized windows report
/// zero in one or both dimensions.
pub fn extent_is_renderable(extent: vk::Extent2D) -> bool {
    extent.width > 0 && extent.height > 0
}

/// Synchronization bundle for one in-flight frame slot.
struct FrameSlot {
    image_available: Semaphore,
    render_finished: Semaphore,
    // Signaled at creation so the first wait on the slot passes.
    in_flight: Fence,
}

impl FrameSlot {
    fn new(device: Arc<Device>) -> RenderResult<Self> {
        Ok(Self {
            image_available: Semaphore::new(device.clone())?,
            render_finished: Semaphore::new(device.clone())?,
            in_flight: Fence::new(device, true)?,
        })
    }
}

/// Handle to the currently open frame, produced by a successful
/// `begin_frame` and consumed by exactly one `end_frame`.
#[derive(Clone, Copy, Debug)]
pub struct FrameContext {
    /// Presentable image being rendered into.
    pub image_index: u32,
    /// In-flight slot the frame records through.
    pub slot: usize,
    /// Seconds since the previous frame, as supplied by the caller.
    pub frame_time: f32,
    command_buffer: vk::CommandBuffer,
}

impl FrameContext {
    /// Raw handle of the frame's recording target, used to validate
    /// render-pass bracketing calls.
    #[inline]
    pub fn command_buffer(&self) -> vk::CommandBuffer {
        self.command_buffer
    }
}

/// Drives acquisition, recording, submission, and presentation, and
/// owns the swap resources it recreates on resize.
pub struct FrameScheduler {
    device: Arc<Device>,
    instance: ash::Instance,
    surface: vk::SurfaceKHR,
    surface_loader: ash::khr::surface::Instance,
    swap: SwapResources,
    command_pool: CommandPool,
    /// One command buffer per presentable image.
    command_buffers: Vec<CommandBuffer>,
    slots: Vec<FrameSlot>,
    images_in_flight: ImagesInFlight,
    pacer: FramePacer,
    /// Suboptimal acquire observed this frame; recreation is deferred
    /// to `end_frame`.
    swap_stale: bool,
}

impl FrameScheduler {
    pub fn new(
        instance: &ash::Instance,
        device: Arc<Device>,
        surface: vk::SurfaceKHR,
        surface_loader: &ash::khr::surface::Instance,
        extent: vk::Extent2D,
    ) -> RenderResult<Self> {
        let swap = SwapResources::create(
            instance,
            device.clone(),
            surface,
            surface_loader,
            extent,
            None,
        )?;

        let command_pool = CommandPool::new(device.clone())?;
        let command_buffers = command_pool.allocate(swap.image_count() as u32)?;

        let slots = (0..MAX_FRAMES_IN_FLIGHT)
            .map(|_| FrameSlot::new(device.clone()))
            .collect::<RenderResult<Vec<_>>>()?;

        let images_in_flight = ImagesInFlight::new(swap.image_count());

        info!(
            "Frame scheduler ready: {} in-flight slot(s), {} presentable image(s)",
            MAX_FRAMES_IN_FLIGHT,
            swap.image_count()
        );

        Ok(Self {
            device,
            instance: instance.clone(),
            surface,
            surface_loader: surface_loader.clone(),
            swap,
            command_pool,
            command_buffers,
            slots,
            images_in_flight,
            pacer: FramePacer::new(MAX_FRAMES_IN_FLIGHT),
            swap_stale: false,
        })
    }

    #[inline]
    pub fn swap_resources(&self) -> &SwapResources {
        &self.swap
    }

    /// Extent of the images currently being rendered into.
    #[inline]
    pub fn extent(&self) -> vk::Extent2D {
        self.swap.extent()
    }

    /// Opens a frame and starts command recording.
    ///
    /// Returns `Ok(None)` when no frame can be rendered this iteration:
    /// either the window is minimized (zero extent, recreation stays
    /// pending) or the surface was stale at acquisition and swap
    /// resources were recreated. Neither is an error; the caller skips
    /// the iteration.
    ///
    /// # Errors
    ///
    /// `ContractViolation` if a frame is already open; any device
    /// failure other than surface staleness is fatal and propagated.
    pub fn begin_frame<T: PresentTarget + ?Sized>(
        &mut self,
        target: &T,
        frame_time: f32,
    ) -> RenderResult<Option<FrameContext>> {
        if self.pacer.phase() != FramePhase::Idle {
            return Err(RenderError::ContractViolation(
                "begin_frame called while a frame is already open",
            ));
        }

        // Minimized window: keep the stale flag latched and skip the
        // frame rather than acquire against a zero-sized surface.
        if !extent_is_renderable(target.current_extent()) {
            self.swap_stale = true;
            return Ok(None);
        }

        let slot = self.pacer.slot();
        self.slots[slot].in_flight.wait(u64::MAX)?;

        let acquired = self
            .swap
            .acquire_next_image(self.slots[slot].image_available.handle())?;

        let (image_index, suboptimal) = match acquired {
            AcquiredImage::Available { index, suboptimal } => (index, suboptimal),
            AcquiredImage::OutOfDate => {
                debug!("Surface out of date at acquire; recreating swap resources");
                self.recreate(target)?;
                return Ok(None);
            }
        };

        if suboptimal {
            // Keep rendering this frame; rebuild after presenting it.
            self.swap_stale = true;
        }

        // If an earlier slot still has a submission pending against this
        // image, its fence gates our reuse.
        if let Some(prev_slot) = self.images_in_flight.claim(image_index, slot)
            && prev_slot != slot
        {
            self.slots[prev_slot].in_flight.wait(u64::MAX)?;
        }

        // Reset only after a successful acquire, so a skipped iteration
        // leaves the slot fence signaled and the next wait passes.
        self.slots[slot].in_flight.reset()?;

        let cmd = &self.command_buffers[image_index as usize];
        cmd.reset()?;
        cmd.begin()?;

        self.pacer
            .begin(image_index)
            .map_err(RenderError::ContractViolation)?;

        Ok(Some(FrameContext {
            image_index,
            slot,
            frame_time,
            command_buffer: cmd.handle(),
        }))
    }

    /// Recording interface of the open frame.
    pub fn current_command_buffer(&self) -> RenderResult<&CommandBuffer> {
        let index = self.pacer.image_index().ok_or(RenderError::ContractViolation(
            "no frame is open",
        ))?;
        Ok(&self.command_buffers[index as usize])
    }

    /// Opens the main render pass on the frame's framebuffer and sets
    /// the dynamic viewport/scissor to the current extent.
    pub fn begin_render_pass(&mut self, ctx: &FrameContext) -> RenderResult<()> {
        self.check_context(ctx)?;
        self.pacer
            .enter_pass()
            .map_err(RenderError::ContractViolation)?;

        let clear_values = [
            vk::ClearValue {
                color: vk::ClearColorValue {
                    float32: [0.01, 0.01, 0.01, 1.0],
                },
            },
            vk::ClearValue {
                depth_stencil: vk::ClearDepthStencilValue {
                    depth: 1.0,
                    stencil: 0,
                },
            },
        ];

        let cmd = &self.command_buffers[ctx.image_index as usize];
        cmd.begin_render_pass(
            self.swap.render_pass(),
            self.swap.framebuffer(ctx.image_index),
            &clear_values,
        );
        cmd.set_viewport_scissor(self.swap.extent());
        Ok(())
    }

    pub fn end_render_pass(&mut self, ctx: &FrameContext) -> RenderResult<()> {
        self.check_context(ctx)?;
        self.pacer
            .exit_pass()
            .map_err(RenderError::ContractViolation)?;
        self.command_buffers[ctx.image_index as usize].end_render_pass();
        Ok(())
    }

    /// Closes recording, submits, presents, and recreates swap
    /// resources when the surface went stale or a resize is pending.
    ///
    /// The frame returns to idle unconditionally once accepted, even
    /// when recreation follows.
    pub fn end_frame<T: PresentTarget + ?Sized>(
        &mut self,
        target: &T,
        ctx: FrameContext,
    ) -> RenderResult<()> {
        if self.pacer.phase() == FramePhase::InRenderPass {
            return Err(RenderError::ContractViolation(
                "end_frame called with a render pass still open",
            ));
        }
        self.check_context(&ctx)?;

        let cmd = &self.command_buffers[ctx.image_index as usize];
        cmd.end()?;

        let slot = &self.slots[ctx.slot];
        let wait_semaphores = [slot.image_available.handle()];
        let wait_stages = [vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT];
        let command_buffers = [cmd.handle()];
        let signal_semaphores = [slot.render_finished.handle()];

        let submit_info = vk::SubmitInfo::default()
            .wait_semaphores(&wait_semaphores)
            .wait_dst_stage_mask(&wait_stages)
            .command_buffers(&command_buffers)
            .signal_semaphores(&signal_semaphores);

        // SAFETY: all handles in submit_info are alive for the duration
        // of the call, and the fence belongs to this slot.
        unsafe {
            self.device
                .submit_graphics(&[submit_info], slot.in_flight.handle())?;
        }

        let outcome = self.swap.present(
            self.device.present_queue(),
            ctx.image_index,
            slot.render_finished.handle(),
        )?;

        let stale = match outcome {
            PresentOutcome::Presented { suboptimal } => suboptimal,
            PresentOutcome::OutOfDate => true,
        };

        self.pacer.end().map_err(RenderError::ContractViolation)?;

        if stale || self.swap_stale || target.take_resize_request() {
            self.recreate(target)?;
        }

        Ok(())
    }

    /// Identity of the active render pass. Pipeline owners compare this
    /// against the pass they were built for and rebuild on mismatch.
    pub fn render_pass_handle(&self) -> vk::RenderPass {
        self.swap.render_pass().handle()
    }

    /// Tears down and rebuilds everything extent-dependent.
    ///
    /// With a zero extent (minimized window) nothing is rebuilt: the
    /// stale flag stays latched and recreation is retried once the
    /// event loop reports a usable size. Otherwise waits for full
    /// device idle, then replaces the swap resources with the old
    /// instance as donor. Failure at any step is fatal.
    fn recreate<T: PresentTarget + ?Sized>(&mut self, target: &T) -> RenderResult<()> {
        let extent = target.current_extent();
        if !extent_is_renderable(extent) {
            debug!("Recreation deferred: window extent is zero");
            self.swap_stale = true;
            return Ok(());
        }

        self.device.wait_idle()?;

        let new_swap = SwapResources::create(
            &self.instance,
            self.device.clone(),
            self.surface,
            &self.surface_loader,
            extent,
            Some(&self.swap),
        )?;
        let old = std::mem::replace(&mut self.swap, new_swap);
        let old_count = old.image_count();
        drop(old);

        // The platform may change the image count across recreation;
        // the command buffer pool tracks it exactly.
        let new_count = self.swap.image_count();
        if new_count != old_count {
            warn!(
                "Presentable image count changed: {} -> {}",
                old_count, new_count
            );
            let buffers = std::mem::take(&mut self.command_buffers);
            self.command_pool.free(buffers);
            self.command_buffers = self.command_pool.allocate(new_count as u32)?;
        }
        self.images_in_flight.reset(new_count);
        self.swap_stale = false;

        info!(
            "Swap resources recreated at {}x{}",
            extent.width, extent.height
        );
        Ok(())
    }

    fn check_context(&self, ctx: &FrameContext) -> RenderResult<()> {
        let open_index = self.pacer.image_index().ok_or(RenderError::ContractViolation(
            "no frame is open",
        ))?;
        let open_handle = self.command_buffers[open_index as usize].handle();
        if !context_matches(ctx, open_index, open_handle) {
            return Err(RenderError::ContractViolation(
                "frame context does not match the currently open frame",
            ));
        }
        Ok(())
    }
}

/// Whether `ctx` identifies the currently open frame: same image and
/// the same recording handle that `begin_frame` handed out.
fn context_matches(ctx: &FrameContext, open_index: u32, open_handle: vk::CommandBuffer) -> bool {
    ctx.image_index == open_index && ctx.command_buffer == open_handle
}

impl Drop for FrameScheduler {
    fn drop(&mut self) {
        // All slots may still have work in flight.
        if let Err(e) = self.device.wait_idle() {
            tracing::error!("wait_idle failed during scheduler teardown: {e}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ash::vk::Handle;

    fn context(image_index: u32, raw_handle: u64) -> FrameContext {
        FrameContext {
            image_index,
            slot: 0,
            frame_time: 0.016,
            command_buffer: vk::CommandBuffer::from_raw(raw_handle),
        }
    }

    #[test]
    fn matching_context_is_accepted() {
        let ctx = context(1, 0x10);
        assert!(context_matches(&ctx, 1, vk::CommandBuffer::from_raw(0x10)));
    }

    #[test]
    fn foreign_recording_handle_is_rejected() {
        let ctx = context(1, 0x10);
        assert!(!context_matches(&ctx, 1, vk::CommandBuffer::from_raw(0x20)));
    }

    #[test]
    fn stale_image_index_is_rejected() {
        let ctx = context(0, 0x10);
        assert!(!context_matches(&ctx, 2, vk::CommandBuffer::from_raw(0x10)));
    }

    #[test]
    fn zero_extent_is_not_renderable() {
        assert!(!extent_is_renderable(vk::Extent2D {
            width: 0,
            height: 0,
        }));
    }

    #[test]
    fn single_zero_dimension_is_not_renderable() {
        assert!(!extent_is_renderable(vk::Extent2D {
            width: 0,
            height: 600,
        }));
        assert!(!extent_is_renderable(vk::Extent2D {
            width: 800,
            height: 0,
        }));
    }

    #[test]
    fn nonzero_extent_is_renderable() {
        assert!(extent_is_renderable(vk::Extent2D {
            width: 1,
            height: 1,
        }));
        assert!(extent_is_renderable(vk::Extent2D {
            width: 800,
            height: 600,
        }));
    }
}
