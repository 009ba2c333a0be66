//! Swapchain creation, recreation, and presentation.
//!
//! # Overview
//!
//! [`Swapchain`] owns the surface's presentable images and their views. It
//! is built for a specific extent and never resized in place: on resize the
//! caller constructs a replacement, handing the outgoing instance in as a
//! donor so the driver can recycle resources through `old_swapchain`.
//!
//! Acquisition and presentation report surface staleness through dedicated
//! result types ([`AcquiredImage`], [`PresentOutcome`]) rather than errors,
//! because an out-of-date surface is an expected, recoverable condition.
//!
//! The format/present-mode/extent/image-count selection policies are free
//! functions over plain capability structs so they can be unit tested
//! without a device.

use std::sync::Arc;

use ash::vk;
use tracing::{debug, info};

use crate::device::Device;
use crate::error::{RhiError, RhiResult};

/// Surface capability snapshot used for swapchain creation.
pub struct SurfaceSupport {
    /// Surface capabilities (image counts, extent bounds, transforms).
    pub capabilities: vk::SurfaceCapabilitiesKHR,
    /// Supported surface formats.
    pub formats: Vec<vk::SurfaceFormatKHR>,
    /// Supported presentation modes.
    pub present_modes: Vec<vk::PresentModeKHR>,
}

impl SurfaceSupport {
    /// Queries surface support for a physical device.
    pub fn query(
        physical_device: vk::PhysicalDevice,
        surface: vk::SurfaceKHR,
        surface_loader: &ash::khr::surface::Instance,
    ) -> RhiResult<Self> {
        let capabilities = unsafe {
            surface_loader.get_physical_device_surface_capabilities(physical_device, surface)?
        };
        let formats = unsafe {
            surface_loader.get_physical_device_surface_formats(physical_device, surface)?
        };
        let present_modes = unsafe {
            surface_loader.get_physical_device_surface_present_modes(physical_device, surface)?
        };

        Ok(Self {
            capabilities,
            formats,
            present_modes,
        })
    }

    /// Whether the surface can back a swapchain at all.
    #[inline]
    pub fn is_adequate(&self) -> bool {
        !self.formats.is_empty() && !self.present_modes.is_empty()
    }
}

/// Result of a swapchain image acquisition.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AcquiredImage {
    /// An image is available for rendering.
    Available {
        /// Index of the acquired presentable image.
        index: u32,
        /// The surface no longer matches the window exactly; rendering may
        /// proceed, but the caller should recreate after presenting.
        suboptimal: bool,
    },
    /// The surface is stale; the swapchain must be recreated before any
    /// image can be acquired.
    OutOfDate,
}

/// Result of presenting a swapchain image.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PresentOutcome {
    /// The image was queued for presentation.
    Presented {
        /// The surface is usable but no longer optimal.
        suboptimal: bool,
    },
    /// The surface is stale; recreate before the next frame.
    OutOfDate,
}

/// Vulkan swapchain wrapper owning the presentable images and their views.
pub struct Swapchain {
    device: Arc<Device>,
    loader: ash::khr::swapchain::Device,
    handle: vk::SwapchainKHR,
    images: Vec<vk::Image>,
    image_views: Vec<vk::ImageView>,
    surface_format: vk::SurfaceFormatKHR,
    extent: vk::Extent2D,
}

impl Swapchain {
    /// Creates a swapchain sized to `window_extent`.
    ///
    /// # Arguments
    ///
    /// * `previous` - The outgoing swapchain during recreation. Its handle
    ///   is passed to the driver as `old_swapchain` so in-flight
    ///   presentation can complete while the replacement is built; the
    ///   donor stays fully owned by the caller and is dropped afterwards.
    ///
    /// # Errors
    ///
    /// Returns [`RhiError::ZeroExtent`] if either dimension of
    /// `window_extent` is zero, and [`RhiError::Surface`] when the surface
    /// reports no usable formats or present modes. Any driver failure is
    /// propagated as-is.
    pub fn new(
        instance: &ash::Instance,
        device: Arc<Device>,
        surface: vk::SurfaceKHR,
        surface_loader: &ash::khr::surface::Instance,
        window_extent: vk::Extent2D,
        previous: Option<&Swapchain>,
    ) -> RhiResult<Self> {
        if window_extent.width == 0 || window_extent.height == 0 {
            return Err(RhiError::ZeroExtent {
                width: window_extent.width,
                height: window_extent.height,
            });
        }

        let support = SurfaceSupport::query(device.physical_device(), surface, surface_loader)?;
        if !support.is_adequate() {
            return Err(RhiError::Surface(
                "surface reports no formats or present modes".into(),
            ));
        }

        let surface_format = choose_surface_format(&support.formats);
        let present_mode = choose_present_mode(&support.present_modes);
        let extent = choose_extent(&support.capabilities, window_extent);
        let image_count = determine_image_count(&support.capabilities);

        let old_swapchain = previous.map_or(vk::SwapchainKHR::null(), |sc| sc.handle);

        let mut create_info = vk::SwapchainCreateInfoKHR::default()
            .surface(surface)
            .min_image_count(image_count)
            .image_format(surface_format.format)
            .image_color_space(surface_format.color_space)
            .image_extent(extent)
            .image_array_layers(1)
            .image_usage(vk::ImageUsageFlags::COLOR_ATTACHMENT)
            .pre_transform(support.capabilities.current_transform)
            .composite_alpha(vk::CompositeAlphaFlagsKHR::OPAQUE)
            .present_mode(present_mode)
            .clipped(true)
            .old_swapchain(old_swapchain);

        let families = device.queue_families();
        let family_indices = [
            families.graphics_family.unwrap_or_default(),
            families.present_family.unwrap_or_default(),
        ];
        if family_indices[0] != family_indices[1] {
            create_info = create_info
                .image_sharing_mode(vk::SharingMode::CONCURRENT)
                .queue_family_indices(&family_indices);
        } else {
            create_info = create_info.image_sharing_mode(vk::SharingMode::EXCLUSIVE);
        }

        let loader = ash::khr::swapchain::Device::new(instance, device.handle());
        let handle = unsafe { loader.create_swapchain(&create_info, None)? };
        let images = unsafe { loader.get_swapchain_images(handle)? };
        let image_views = create_image_views(&device, &images, surface_format.format)?;

        info!(
            "Swapchain created: {}x{}, {} images, {:?}/{:?}",
            extent.width,
            extent.height,
            images.len(),
            surface_format.format,
            present_mode,
        );

        Ok(Self {
            device,
            loader,
            handle,
            images,
            image_views,
            surface_format,
            extent,
        })
    }

    /// Acquires the next presentable image, signaling `semaphore` when the
    /// image is ready for rendering.
    ///
    /// Blocks at most as long as the driver needs to free an image; uses an
    /// unbounded timeout by policy.
    pub fn acquire_next_image(&self, semaphore: vk::Semaphore) -> RhiResult<AcquiredImage> {
        let result = unsafe {
            self.loader
                .acquire_next_image(self.handle, u64::MAX, semaphore, vk::Fence::null())
        };

        match result {
            Ok((index, suboptimal)) => Ok(AcquiredImage::Available { index, suboptimal }),
            Err(vk::Result::ERROR_OUT_OF_DATE_KHR) => Ok(AcquiredImage::OutOfDate),
            Err(e) => Err(e.into()),
        }
    }

    /// Queues `image_index` for presentation after `wait_semaphore` signals.
    pub fn present(
        &self,
        queue: vk::Queue,
        image_index: u32,
        wait_semaphore: vk::Semaphore,
    ) -> RhiResult<PresentOutcome> {
        let wait_semaphores = [wait_semaphore];
        let swapchains = [self.handle];
        let indices = [image_index];

        let present_info = vk::PresentInfoKHR::default()
            .wait_semaphores(&wait_semaphores)
            .swapchains(&swapchains)
            .image_indices(&indices);

        let result = unsafe { self.loader.queue_present(queue, &present_info) };
        match result {
            Ok(suboptimal) => Ok(PresentOutcome::Presented { suboptimal }),
            Err(vk::Result::ERROR_OUT_OF_DATE_KHR) => Ok(PresentOutcome::OutOfDate),
            Err(e) => Err(e.into()),
        }
    }

    /// Number of presentable images, fixed for this instance's lifetime.
    #[inline]
    pub fn image_count(&self) -> usize {
        self.images.len()
    }

    /// Returns the image view for a presentable image.
    #[inline]
    pub fn image_view(&self, index: usize) -> vk::ImageView {
        self.image_views[index]
    }

    /// Returns the surface format the images were created with.
    #[inline]
    pub fn surface_format(&self) -> vk::SurfaceFormatKHR {
        self.surface_format
    }

    /// Returns the extent the images were created with.
    #[inline]
    pub fn extent(&self) -> vk::Extent2D {
        self.extent
    }
}

impl Drop for Swapchain {
    fn drop(&mut self) {
        unsafe {
            for &view in &self.image_views {
                self.device.handle().destroy_image_view(view, None);
            }
            self.loader.destroy_swapchain(self.handle, None);
        }
        debug!("Swapchain destroyed");
    }
}

fn create_image_views(
    device: &Device,
    images: &[vk::Image],
    format: vk::Format,
) -> RhiResult<Vec<vk::ImageView>> {
    images
        .iter()
        .map(|&image| {
            let create_info = vk::ImageViewCreateInfo::default()
                .image(image)
                .view_type(vk::ImageViewType::TYPE_2D)
                .format(format)
                .subresource_range(
                    vk::ImageSubresourceRange::default()
                        .aspect_mask(vk::ImageAspectFlags::COLOR)
                        .base_mip_level(0)
                        .level_count(1)
                        .base_array_layer(0)
                        .layer_count(1),
                );

            let view = unsafe { device.handle().create_image_view(&create_info, None)? };
            Ok(view)
        })
        .collect()
}

/// Picks the surface format, preferring sRGB BGRA.
pub fn choose_surface_format(formats: &[vk::SurfaceFormatKHR]) -> vk::SurfaceFormatKHR {
    formats
        .iter()
        .copied()
        .find(|f| {
            f.format == vk::Format::B8G8R8A8_SRGB
                && f.color_space == vk::ColorSpaceKHR::SRGB_NONLINEAR
        })
        .unwrap_or_else(|| formats[0])
}

/// Picks the present mode: mailbox when available, otherwise FIFO.
///
/// FIFO is the only mode guaranteed by the API, so the fallback always
/// exists.
pub fn choose_present_mode(modes: &[vk::PresentModeKHR]) -> vk::PresentModeKHR {
    if modes.contains(&vk::PresentModeKHR::MAILBOX) {
        vk::PresentModeKHR::MAILBOX
    } else {
        vk::PresentModeKHR::FIFO
    }
}

/// Resolves the swapchain extent from the capabilities and window size.
///
/// When the surface reports a fixed `current_extent` it must be used
/// verbatim; the sentinel `u32::MAX` means the window size decides, clamped
/// to the supported range.
pub fn choose_extent(
    capabilities: &vk::SurfaceCapabilitiesKHR,
    window_extent: vk::Extent2D,
) -> vk::Extent2D {
    if capabilities.current_extent.width != u32::MAX {
        capabilities.current_extent
    } else {
        vk::Extent2D {
            width: window_extent.width.clamp(
                capabilities.min_image_extent.width,
                capabilities.max_image_extent.width,
            ),
            height: window_extent.height.clamp(
                capabilities.min_image_extent.height,
                capabilities.max_image_extent.height,
            ),
        }
    }
}

/// Requests one image more than the minimum to reduce driver stalls,
/// respecting the maximum (`0` meaning unbounded).
pub fn determine_image_count(capabilities: &vk::SurfaceCapabilitiesKHR) -> u32 {
    let mut count = capabilities.min_image_count + 1;
    if capabilities.max_image_count > 0 {
        count = count.min(capabilities.max_image_count);
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

    fn capabilities(min: u32, max: u32) -> vk::SurfaceCapabilitiesKHR {
        vk::SurfaceCapabilitiesKHR {
            min_image_count: min,
            max_image_count: max,
            ..Default::default()
        }
    }

    #[test]
    fn surface_format_prefers_bgra_srgb() {
        let formats = [
            format(vk::Format::R8G8B8A8_UNORM, vk::ColorSpaceKHR::SRGB_NONLINEAR),
            format(vk::Format::B8G8R8A8_SRGB, vk::ColorSpaceKHR::SRGB_NONLINEAR),
        ];
        let chosen = choose_surface_format(&formats);
        assert_eq!(chosen.format, vk::Format::B8G8R8A8_SRGB);
        assert_eq!(chosen.color_space, vk::ColorSpaceKHR::SRGB_NONLINEAR);
    }

    #[test]
    fn surface_format_falls_back_to_first() {
        let formats = [
            format(vk::Format::R8G8B8A8_UNORM, vk::ColorSpaceKHR::SRGB_NONLINEAR),
            format(
                vk::Format::R16G16B16A16_SFLOAT,
                vk::ColorSpaceKHR::SRGB_NONLINEAR,
            ),
        ];
        let chosen = choose_surface_format(&formats);
        assert_eq!(chosen.format, vk::Format::R8G8B8A8_UNORM);
    }

    #[test]
    fn present_mode_prefers_mailbox() {
        let modes = [vk::PresentModeKHR::FIFO, vk::PresentModeKHR::MAILBOX];
        assert_eq!(choose_present_mode(&modes), vk::PresentModeKHR::MAILBOX);
    }

    #[test]
    fn present_mode_defaults_to_fifo() {
        let modes = [vk::PresentModeKHR::FIFO, vk::PresentModeKHR::IMMEDIATE];
        assert_eq!(choose_present_mode(&modes), vk::PresentModeKHR::FIFO);
    }

    #[test]
    fn extent_uses_surface_current_extent_when_fixed() {
        let caps = vk::SurfaceCapabilitiesKHR {
            current_extent: vk::Extent2D {
                width: 1024,
                height: 768,
            },
            ..Default::default()
        };
        let extent = choose_extent(
            &caps,
            vk::Extent2D {
                width: 800,
                height: 600,
            },
        );
        assert_eq!(extent.width, 1024);
        assert_eq!(extent.height, 768);
    }

    #[test]
    fn extent_clamps_window_size_when_flexible() {
        let caps = vk::SurfaceCapabilitiesKHR {
            current_extent: vk::Extent2D {
                width: u32::MAX,
                height: u32::MAX,
            },
            min_image_extent: vk::Extent2D {
                width: 640,
                height: 480,
            },
            max_image_extent: vk::Extent2D {
                width: 1920,
                height: 1080,
            },
            ..Default::default()
        };

        let too_small = choose_extent(
            &caps,
            vk::Extent2D {
                width: 100,
                height: 100,
            },
        );
        assert_eq!(too_small.width, 640);
        assert_eq!(too_small.height, 480);

        let too_large = choose_extent(
            &caps,
            vk::Extent2D {
                width: 4000,
                height: 4000,
            },
        );
        assert_eq!(too_large.width, 1920);
        assert_eq!(too_large.height, 1080);

        let in_range = choose_extent(
            &caps,
            vk::Extent2D {
                width: 800,
                height: 600,
            },
        );
        assert_eq!(in_range.width, 800);
        assert_eq!(in_range.height, 600);
    }

    #[test]
    fn image_count_is_min_plus_one() {
        assert_eq!(determine_image_count(&capabilities(2, 8)), 3);
    }

    #[test]
    fn image_count_respects_maximum() {
        assert_eq!(determine_image_count(&capabilities(3, 3)), 3);
    }

    #[test]
    fn image_count_unbounded_maximum() {
        // max_image_count == 0 means no upper bound
        assert_eq!(determine_image_count(&capabilities(2, 0)), 3);
    }

    #[test]
    fn image_count_never_below_two_for_presentable_surfaces() {
        // A present-capable surface reports min_image_count >= 1, so the
        // requested count is always at least 2.
        for min in 1..=4 {
            assert!(determine_image_count(&capabilities(min, 0)) >= 2);
        }
    }

    #[test]
    fn image_count_stable_across_repeated_queries() {
        // Recreation at a constant extent re-queries the same capabilities;
        // the policy must be deterministic.
        let caps = capabilities(2, 8);
        let first = determine_image_count(&caps);
        for _ in 0..10 {
            assert_eq!(determine_image_count(&caps), first);
        }
    }
}
