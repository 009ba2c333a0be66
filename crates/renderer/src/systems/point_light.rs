//! Renders point lights as camera-facing billboards and gathers them
//! into the global uniform buffer.

use std::sync::Arc;

use ash::vk;
use tracing::debug;

use glimmer_rhi::command::CommandBuffer;
use glimmer_rhi::device::Device;
use glimmer_rhi::pipeline::{
    CullMode, GraphicsPipelineBuilder, Pipeline, PipelineConfig, PipelineLayout,
};
use glimmer_rhi::render_pass::RenderPass;
use glimmer_rhi::shader::{Shader, ShaderStage};
use glimmer_rhi::RhiResult;
use glimmer_scene::{MAX_POINT_LIGHTS, PointLight, SceneObject};

/// Copies every light-emitting object into a fixed-size array for the
/// global uniform buffer. Emitters beyond the capacity are dropped.
pub fn collect_lights(objects: &[SceneObject]) -> ([PointLight; MAX_POINT_LIGHTS], u32) {
    let mut lights =
        [PointLight::new(glam::Vec3::ZERO, glam::Vec3::ZERO, 0.0, 0.0); MAX_POINT_LIGHTS];
    let mut count = 0usize;
    for object in objects {
        let Some(emitter) = &object.light else { continue };
        if count == MAX_POINT_LIGHTS {
            break;
        }
        lights[count] = PointLight::new(
            object.transform.translation,
            object.color,
            emitter.intensity,
            emitter.radius,
        );
        count += 1;
    }
    (lights, count as u32)
}

/// Billboard pipeline for light sources. No vertex input: the vertex
/// shader synthesizes a quad (two triangles) from `gl_VertexIndex`.
pub struct PointLightSystem {
    device: Arc<Device>,
    vertex_shader: Shader,
    fragment_shader: Shader,
    layout: PipelineLayout,
    pipeline: Pipeline,
    built_for: vk::RenderPass,
}

impl PointLightSystem {
    pub fn new(
        device: Arc<Device>,
        global_set_layout: vk::DescriptorSetLayout,
        render_pass: &RenderPass,
    ) -> RhiResult<Self> {
        let vertex_shader = Shader::from_spirv_file(
            device.clone(),
            "shaders/point_light.vert.spv",
            ShaderStage::Vertex,
        )?;
        let fragment_shader = Shader::from_spirv_file(
            device.clone(),
            "shaders/point_light.frag.spv",
            ShaderStage::Fragment,
        )?;

        let layout = PipelineLayout::new(device.clone(), &[global_set_layout], &[])?;

        let pipeline = Self::build_pipeline(
            device.clone(),
            &vertex_shader,
            &fragment_shader,
            &layout,
            render_pass,
        )?;
        let built_for = render_pass.handle();

        Ok(Self {
            device,
            vertex_shader,
            fragment_shader,
            layout,
            pipeline,
            built_for,
        })
    }

    fn build_pipeline(
        device: Arc<Device>,
        vertex_shader: &Shader,
        fragment_shader: &Shader,
        layout: &PipelineLayout,
        render_pass: &RenderPass,
    ) -> RhiResult<Pipeline> {
        let config = PipelineConfig {
            cull_mode: CullMode::None,
            blend_enabled: true,
            // Lights read depth but do not occlude each other.
            depth_write: false,
            ..PipelineConfig::default()
        };

        GraphicsPipelineBuilder::new()
            .vertex_shader(vertex_shader)
            .fragment_shader(fragment_shader)
            .config(config)
            .build(device, layout, render_pass)
    }

    pub fn rebuild_if_needed(&mut self, render_pass: &RenderPass) -> RhiResult<()> {
        if self.built_for == render_pass.handle() {
            return Ok(());
        }
        debug!("Render pass changed; rebuilding point light pipeline");
        self.pipeline = Self::build_pipeline(
            self.device.clone(),
            &self.vertex_shader,
            &self.fragment_shader,
            &self.layout,
            render_pass,
        )?;
        self.built_for = render_pass.handle();
        Ok(())
    }

    /// One six-vertex instanced billboard per light; light data comes
    /// from the global uniform buffer, indexed by `gl_InstanceIndex`.
    pub fn render(&self, cmd: &CommandBuffer, global_set: vk::DescriptorSet, num_lights: u32) {
        if num_lights == 0 {
            return;
        }
        cmd.bind_graphics_pipeline(self.pipeline.handle());
        cmd.bind_descriptor_sets(self.layout.handle(), 0, &[global_set]);
        cmd.draw(6, num_lights);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;
    use glimmer_scene::LightEmitter;

    fn light_at(position: Vec3, intensity: f32) -> SceneObject {
        let mut object = SceneObject::point_light(intensity, 0.25, Vec3::ONE);
        object.transform.translation = position;
        object
    }

    #[test]
    fn collects_only_emitters() {
        let objects = vec![
            light_at(Vec3::X, 1.0),
            SceneObject::point_light(0.0, 0.1, Vec3::ONE),
        ];
        let mut plain = SceneObject::point_light(1.0, 0.1, Vec3::ONE);
        plain.light = None;
        let mut objects = objects;
        objects.push(plain);

        let (_, count) = collect_lights(&objects);
        assert_eq!(count, 2);
    }

    #[test]
    fn light_positions_follow_transforms() {
        let objects = vec![light_at(Vec3::new(1.0, 2.0, 3.0), 4.0)];
        let (lights, count) = collect_lights(&objects);
        assert_eq!(count, 1);
        assert_eq!(lights[0].position(), Vec3::new(1.0, 2.0, 3.0));
        assert_eq!(lights[0].intensity(), 4.0);
        assert_eq!(lights[0].radius(), 0.25);
    }

    #[test]
    fn overflowing_emitters_are_dropped() {
        let objects: Vec<_> = (0..MAX_POINT_LIGHTS + 5)
            .map(|i| light_at(Vec3::splat(i as f32), 1.0))
            .collect();
        let (_, count) = collect_lights(&objects);
        assert_eq!(count, MAX_POINT_LIGHTS as u32);
    }
}
