//! Draws mesh-bearing scene objects with per-object push constants.

use std::sync::Arc;

use ash::vk;
use bytemuck::{Pod, Zeroable};
use tracing::debug;

use glimmer_rhi::command::CommandBuffer;
use glimmer_rhi::device::Device;
use glimmer_rhi::pipeline::{GraphicsPipelineBuilder, Pipeline, PipelineConfig, PipelineLayout};
use glimmer_rhi::render_pass::RenderPass;
use glimmer_rhi::shader::{Shader, ShaderStage};
use glimmer_rhi::vertex::Vertex;
use glimmer_rhi::RhiResult;
use glimmer_scene::SceneObject;

/// Per-object push constant block, shared by the vertex and fragment
/// stages.
#[repr(C)]
#[derive(Clone, Copy, Debug, Pod, Zeroable)]
pub struct MeshPushConstants {
    pub model: [[f32; 4]; 4],
    pub normal: [[f32; 4]; 4],
}

/// Pipeline and layout for lit mesh rendering.
///
/// The pipeline depends on the render pass it was built against; when
/// swap recreation replaces the pass, [`MeshSystem::rebuild_if_needed`]
/// recompiles it. The layout (set 0 globals + push range) survives.
pub struct MeshSystem {
    device: Arc<Device>,
    vertex_shader: Shader,
    fragment_shader: Shader,
    layout: PipelineLayout,
    pipeline: Pipeline,
    built_for: vk::RenderPass,
}

impl MeshSystem {
    pub fn new(
        device: Arc<Device>,
        global_set_layout: vk::DescriptorSetLayout,
        render_pass: &RenderPass,
    ) -> RhiResult<Self> {
        let vertex_shader = Shader::from_spirv_file(
            device.clone(),
            "shaders/mesh.vert.spv",
            ShaderStage::Vertex,
        )?;
        let fragment_shader = Shader::from_spirv_file(
            device.clone(),
            "shaders/mesh.frag.spv",
            ShaderStage::Fragment,
        )?;

        let push_range = vk::PushConstantRange::default()
            .stage_flags(vk::ShaderStageFlags::VERTEX | vk::ShaderStageFlags::FRAGMENT)
            .offset(0)
            .size(std::mem::size_of::<MeshPushConstants>() as u32);

        let layout = PipelineLayout::new(device.clone(), &[global_set_layout], &[push_range])?;

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
        GraphicsPipelineBuilder::new()
            .vertex_shader(vertex_shader)
            .fragment_shader(fragment_shader)
            .vertex_input(
                Vertex::binding_description(),
                Vertex::attribute_descriptions(),
            )
            .config(PipelineConfig::default())
            .build(device, layout, render_pass)
    }

    /// Recompiles the pipeline when the render pass identity changed
    /// across swap recreation.
    pub fn rebuild_if_needed(&mut self, render_pass: &RenderPass) -> RhiResult<()> {
        if self.built_for == render_pass.handle() {
            return Ok(());
        }
        debug!("Render pass changed; rebuilding mesh pipeline");
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

    /// Records draws for every mesh-bearing object. Must be called
    /// inside an open render pass.
    pub fn render(
        &self,
        cmd: &CommandBuffer,
        global_set: vk::DescriptorSet,
        objects: &[SceneObject],
    ) {
        cmd.bind_graphics_pipeline(self.pipeline.handle());
        cmd.bind_descriptor_sets(self.layout.handle(), 0, &[global_set]);

        for object in objects {
            let Some(mesh) = &object.mesh else { continue };

            let push = MeshPushConstants {
                model: object.transform.matrix().to_cols_array_2d(),
                normal: object.transform.normal_matrix().to_cols_array_2d(),
            };
            cmd.push_constants(
                self.layout.handle(),
                vk::ShaderStageFlags::VERTEX | vk::ShaderStageFlags::FRAGMENT,
                &push,
            );
            mesh.bind(cmd);
            mesh.draw(cmd);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn push_constants_fit_the_guaranteed_minimum() {
        // Vulkan guarantees at least 128 bytes of push constant space.
        assert_eq!(std::mem::size_of::<MeshPushConstants>(), 128);
    }
}
