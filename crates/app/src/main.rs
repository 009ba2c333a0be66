//! Glimmer demo application: a cube and a ground plane under a couple
//! of orbiting point lights, with a free-fly keyboard camera.

use anyhow::Result;
use glam::Vec3;
use tracing::{error, info};
use winit::application::ApplicationHandler;
use winit::event::WindowEvent;
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::window::WindowId;

use glimmer_core::Timer;
use glimmer_platform::{CameraController, InputState, Window};
use glimmer_renderer::Renderer;
use glimmer_resources::geometry;
use glimmer_scene::{Camera, SceneObject};

struct App {
    window: Option<Window>,
    renderer: Option<Renderer>,
    scene: Vec<SceneObject>,
    camera: Camera,
    controller: CameraController,
    input: InputState,
    timer: Timer,
}

impl App {
    fn new() -> Self {
        let mut camera = Camera::new(std::f32::consts::FRAC_PI_3, 16.0 / 9.0, 0.1, 100.0);
        camera.position = Vec3::new(0.0, 1.0, -4.0);

        Self {
            window: None,
            renderer: None,
            scene: Vec::new(),
            camera,
            controller: CameraController::default(),
            input: InputState::new(),
            timer: Timer::new(),
        }
    }

    fn build_scene(renderer: &Renderer) -> anyhow::Result<Vec<SceneObject>> {
        let cube = renderer.create_mesh(geometry::cube())?;
        let floor = renderer.create_mesh(geometry::plane(10.0, [0.4, 0.4, 0.45]))?;

        let mut cube_object = SceneObject::with_mesh(cube);
        cube_object.transform.translation = Vec3::new(0.0, 0.5, 0.0);

        let mut floor_object = SceneObject::with_mesh(floor);
        floor_object.transform.translation = Vec3::ZERO;

        let mut red_light = SceneObject::point_light(1.5, 0.1, Vec3::new(1.0, 0.2, 0.2));
        red_light.transform.translation = Vec3::new(1.5, 1.5, -1.0);

        let mut blue_light = SceneObject::point_light(1.5, 0.1, Vec3::new(0.2, 0.4, 1.0));
        blue_light.transform.translation = Vec3::new(-1.5, 1.5, 1.0);

        Ok(vec![cube_object, floor_object, red_light, blue_light])
    }

    fn tick(&mut self) {
        let dt = self.timer.delta_secs();

        self.controller.update(&self.input, &mut self.camera, dt);

        let (Some(window), Some(renderer)) = (&self.window, &mut self.renderer) else {
            return;
        };
        self.camera.set_aspect(renderer.aspect_ratio());

        if let Err(e) = renderer.render_frame(window, &self.camera, &self.scene, dt) {
            error!("Render error: {e}");
        }

        window.request_redraw();
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }
        let window = match Window::new(event_loop, 1280, 720, "glimmer") {
            Ok(window) => window,
            Err(e) => {
                error!("Failed to create window: {e}");
                event_loop.exit();
                return;
            }
        };
        match Renderer::new(&window) {
            Ok(renderer) => {
                match Self::build_scene(&renderer) {
                    Ok(scene) => self.scene = scene,
                    Err(e) => {
                        error!("Failed to build scene: {e}");
                        event_loop.exit();
                        return;
                    }
                }
                info!("Initialization complete, entering main loop");
                self.renderer = Some(renderer);
                self.window = Some(window);
                self.timer.reset();
            }
            Err(e) => {
                error!("Failed to create renderer: {e}");
                event_loop.exit();
            }
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        match event {
            WindowEvent::CloseRequested => {
                info!("Close requested, shutting down");
                if let Some(renderer) = &self.renderer
                    && let Err(e) = renderer.wait_idle()
                {
                    error!("wait_idle failed during shutdown: {e}");
                }
                event_loop.exit();
            }
            WindowEvent::Resized(size) => {
                info!("Window resized to {}x{}", size.width, size.height);
                if let Some(window) = &self.window {
                    window.notify_resized();
                }
            }
            WindowEvent::RedrawRequested => {
                self.tick();
            }
            WindowEvent::KeyboardInput { event, .. } => {
                use winit::keyboard::PhysicalKey;
                if let PhysicalKey::Code(key) = event.physical_key {
                    if event.state.is_pressed() {
                        self.input.on_key_pressed(key);
                    } else {
                        self.input.on_key_released(key);
                    }
                }
            }
            _ => {}
        }
    }

    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        self.input.begin_frame();
        if let Some(window) = &self.window {
            window.request_redraw();
        }
    }
}

fn main() -> Result<()> {
    glimmer_core::init_logging();
    info!("Starting glimmer");

    let event_loop = EventLoop::new()?;
    event_loop.set_control_flow(ControlFlow::Poll);

    let mut app = App::new();
    event_loop.run_app(&mut app)?;

    Ok(())
}
