//! Presentation resources: swapchain, render pass, depth buffer, and
//! framebuffers, destroyed and rebuilt wholesale on resize.

use std::sync::Arc;

use ash::vk;
use tracing::{debug, info};

use glimmer_rhi::RhiResult;
use glimmer_rhi::device::Device;
use glimmer_rhi::render_pass::{Framebuffer, RenderPass};
use glimmer_rhi::swapchain::{AcquiredImage, PresentOutcome, Swapchain};

use crate::depth_buffer::{DEPTH_FORMAT, DepthBuffer};

/// Everything whose lifetime is bound to the presentation surface's
/// current size.
///
/// The render pass lives behind an `Arc` so pipelines can observe its
/// identity: as long as attachment formats are unchanged across a
/// rebuild, the old pass is carried over and pipelines stay valid.
pub struct SwapResources {
    swapchain: Swapchain,
    render_pass: Arc<RenderPass>,
    depth_buffer: DepthBuffer,
    framebuffers: Vec<Framebuffer>,
}

impl SwapResources {
    /// Builds the full presentation set for `extent`.
    ///
    /// `previous` is the outgoing instance during recreation. It donates
    /// its swapchain handle to the driver and, when the new surface
    /// format still matches, its render pass object, keeping pipeline
    /// identity stable across resizes. The donor is dropped by the
    /// caller after this returns.
    ///
    /// # Errors
    ///
    /// Fails with a zero-extent error if either dimension is zero; the
    /// caller must stall minimized windows before invoking. Any other
    /// failure is fatal to the instance.
    pub fn create(
        instance: &ash::Instance,
        device: Arc<Device>,
        surface: vk::SurfaceKHR,
        surface_loader: &ash::khr::surface::Instance,
        extent: vk::Extent2D,
        previous: Option<&SwapResources>,
    ) -> RhiResult<Self> {
        let swapchain = Swapchain::new(
            instance,
            device.clone(),
            surface,
            surface_loader,
            extent,
            previous.map(|p| &p.swapchain),
        )?;

        let color_format = swapchain.surface_format().format;
        let render_pass = match previous {
            Some(prev) if prev.render_pass.is_compatible_with(color_format, DEPTH_FORMAT) => {
                debug!("Carrying render pass over across swapchain rebuild");
                prev.render_pass.clone()
            }
            _ => Arc::new(RenderPass::new(device.clone(), color_format, DEPTH_FORMAT)?),
        };

        let depth_buffer = DepthBuffer::new(device.clone(), swapchain.extent())?;

        let framebuffers = (0..swapchain.image_count())
            .map(|i| {
                Framebuffer::new(
                    device.clone(),
                    &render_pass,
                    swapchain.image_view(i),
                    depth_buffer.image_view(),
                    swapchain.extent(),
                )
            })
            .collect::<RhiResult<Vec<_>>>()?;

        info!(
            "Swap resources created: {} image(s) at {}x{}",
            framebuffers.len(),
            swapchain.extent().width,
            swapchain.extent().height
        );

        Ok(Self {
            swapchain,
            render_pass,
            depth_buffer,
            framebuffers,
        })
    }

    /// Number of presentable images, fixed for this instance's lifetime.
    #[inline]
    pub fn image_count(&self) -> usize {
        self.swapchain.image_count()
    }

    #[inline]
    pub fn render_pass(&self) -> &Arc<RenderPass> {
        &self.render_pass
    }

    #[inline]
    pub fn extent(&self) -> vk::Extent2D {
        self.swapchain.extent()
    }

    pub fn aspect_ratio(&self) -> f32 {
        let extent = self.extent();
        extent.width as f32 / extent.height as f32
    }

    #[inline]
    pub fn framebuffer(&self, image_index: u32) -> &Framebuffer {
        &self.framebuffers[image_index as usize]
    }

    pub fn acquire_next_image(&self, semaphore: vk::Semaphore) -> RhiResult<AcquiredImage> {
        self.swapchain.acquire_next_image(semaphore)
    }

    pub fn present(
        &self,
        queue: vk::Queue,
        image_index: u32,
        wait_semaphore: vk::Semaphore,
    ) -> RhiResult<PresentOutcome> {
        self.swapchain.present(queue, image_index, wait_semaphore)
    }
}
