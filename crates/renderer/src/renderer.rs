//! Top-level renderer tying device setup, the frame scheduler, and the
//! draw systems together.

use std::sync::Arc;

use ash::vk;
use tracing::info;

use glimmer_platform::{Surface, Window};
use glimmer_resources::Mesh;
use glimmer_rhi::command::CommandPool;
use glimmer_rhi::device::Device;
use glimmer_rhi::instance::Instance;
use glimmer_rhi::physical_device::select_physical_device;
use glimmer_rhi::vertex::Vertex;
use glimmer_scene::{Camera, SceneObject};

use crate::error::{RenderError, RenderResult};
use crate::frame_scheduler::{FrameScheduler, PresentTarget};
use crate::global_ubo::{GlobalDescriptors, GlobalUbo};
use crate::systems::{MeshSystem, PointLightSystem, collect_lights};

impl PresentTarget for Window {
    fn current_extent(&self) -> vk::Extent2D {
        self.inner_extent()
    }

    fn take_resize_request(&self) -> bool {
        Window::take_resize_request(self)
    }
}

/// Owns the whole GPU stack for one window.
///
/// Field order is drop order: the scheduler (and with it the swapchain)
/// goes before the surface, the surface before the instance.
pub struct Renderer {
    scheduler: FrameScheduler,
    mesh_system: MeshSystem,
    point_light_system: PointLightSystem,
    globals: GlobalDescriptors,
    transfer_pool: CommandPool,
    device: Arc<Device>,
    _surface: Surface,
    _instance: Instance,
}

impl Renderer {
    pub fn new(window: &Window) -> RenderResult<Self> {
        let display_handle = window
            .display_handle()
            .map_err(|e| glimmer_core::Error::Window(e.to_string()))?;

        let instance = Instance::new(display_handle.as_raw(), cfg!(debug_assertions))?;
        let surface = window.create_surface(instance.entry(), instance.handle())?;

        let physical = select_physical_device(instance.handle(), surface.handle(), surface.loader())?;
        let device = Device::new(&instance, &physical)?;

        let scheduler = FrameScheduler::new(
            instance.handle(),
            device.clone(),
            surface.handle(),
            surface.loader(),
            window.inner_extent(),
        )?;

        let globals = GlobalDescriptors::new(device.clone())?;

        let render_pass = scheduler.swap_resources().render_pass().clone();
        let mesh_system = MeshSystem::new(device.clone(), globals.set_layout(), &render_pass)?;
        let point_light_system =
            PointLightSystem::new(device.clone(), globals.set_layout(), &render_pass)?;

        let transfer_pool = CommandPool::new_transient(device.clone())?;

        info!("Renderer initialized");

        Ok(Self {
            scheduler,
            mesh_system,
            point_light_system,
            globals,
            transfer_pool,
            device,
            _surface: surface,
            _instance: instance,
        })
    }

    /// Uploads geometry to device-local memory.
    pub fn create_mesh(
        &self,
        (vertices, indices): (Vec<Vertex>, Vec<u32>),
    ) -> RenderResult<Arc<Mesh>> {
        Ok(Mesh::from_geometry(
            self.device.clone(),
            &self.transfer_pool,
            (vertices, indices),
        )?)
    }

    pub fn aspect_ratio(&self) -> f32 {
        self.scheduler.swap_resources().aspect_ratio()
    }

    /// Runs one frame: acquire, record the scene, submit, present.
    ///
    /// Returns without drawing when the surface was stale at
    /// acquisition; the caller simply tries again next iteration.
    pub fn render_frame(
        &mut self,
        window: &Window,
        camera: &Camera,
        objects: &[SceneObject],
        frame_time: f32,
    ) -> RenderResult<()> {
        // Swap recreation on a previous frame may have replaced the
        // render pass; pipelines follow its identity.
        let render_pass = self.scheduler.swap_resources().render_pass().clone();
        self.mesh_system.rebuild_if_needed(&render_pass)?;
        self.point_light_system.rebuild_if_needed(&render_pass)?;

        let Some(ctx) = self.scheduler.begin_frame(window, frame_time)? else {
            return Ok(());
        };

        let (point_lights, num_lights) = collect_lights(objects);
        let ubo = GlobalUbo {
            projection: camera.projection_matrix().to_cols_array_2d(),
            view: camera.view_matrix().to_cols_array_2d(),
            point_lights,
            num_lights,
            ..GlobalUbo::default()
        };
        self.globals.update(ctx.slot, &ubo)?;

        self.scheduler.begin_render_pass(&ctx)?;
        {
            let cmd = self.scheduler.current_command_buffer()?;
            let global_set = self.globals.set(ctx.slot);
            self.mesh_system.render(cmd, global_set, objects);
            self.point_light_system.render(cmd, global_set, num_lights);
        }
        self.scheduler.end_render_pass(&ctx)?;
        self.scheduler.end_frame(window, ctx)?;

        Ok(())
    }

    /// Blocks until the GPU has drained all submitted work. Call before
    /// dropping scene resources at shutdown.
    pub fn wait_idle(&self) -> RenderResult<()> {
        self.device.wait_idle().map_err(RenderError::from)
    }
}
