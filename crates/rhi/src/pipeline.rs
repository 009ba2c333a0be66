//! Graphics pipeline construction.
//!
//! # Overview
//!
//! Pipelines are immutable once compiled and are targeted at a specific
//! render pass object. Fixed-function state comes from the declarative
//! [`PipelineConfig`]; viewport and scissor are dynamic by default so a
//! window resize does not by itself force a pipeline rebuild; only a
//! change of render-pass identity does.
//!
//! # Example
//!
//! ```no_run
//! use glimmer_rhi::pipeline::{GraphicsPipelineBuilder, PipelineConfig};
//! # fn example(
//! #     device: std::sync::Arc<glimmer_rhi::device::Device>,
//! #     vert: &glimmer_rhi::shader::Shader,
//! #     frag: &glimmer_rhi::shader::Shader,
//! #     layout: &glimmer_rhi::pipeline::PipelineLayout,
//! #     render_pass: &glimmer_rhi::render_pass::RenderPass,
//! # ) -> Result<(), glimmer_rhi::RhiError> {
//! let pipeline = GraphicsPipelineBuilder::new()
//!     .vertex_shader(vert)
//!     .fragment_shader(frag)
//!     .config(PipelineConfig::default())
//!     .build(device, layout, render_pass)?;
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;

use ash::vk;
use tracing::debug;

use crate::command::CommandBuffer;
use crate::device::Device;
use crate::error::{RhiError, RhiResult};
use crate::render_pass::RenderPass;
use crate::shader::Shader;

/// Primitive assembly topology.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum PrimitiveTopology {
    PointList,
    LineList,
    #[default]
    TriangleList,
}

impl PrimitiveTopology {
    pub fn to_vk(self) -> vk::PrimitiveTopology {
        match self {
            PrimitiveTopology::PointList => vk::PrimitiveTopology::POINT_LIST,
            PrimitiveTopology::LineList => vk::PrimitiveTopology::LINE_LIST,
            PrimitiveTopology::TriangleList => vk::PrimitiveTopology::TRIANGLE_LIST,
        }
    }
}

/// Face culling mode.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum CullMode {
    None,
    Front,
    #[default]
    Back,
}

impl CullMode {
    pub fn to_vk(self) -> vk::CullModeFlags {
        match self {
            CullMode::None => vk::CullModeFlags::NONE,
            CullMode::Front => vk::CullModeFlags::FRONT,
            CullMode::Back => vk::CullModeFlags::BACK,
        }
    }
}

/// Winding order considered front-facing.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum FrontFace {
    Clockwise,
    #[default]
    CounterClockwise,
}

impl FrontFace {
    pub fn to_vk(self) -> vk::FrontFace {
        match self {
            FrontFace::Clockwise => vk::FrontFace::CLOCKWISE,
            FrontFace::CounterClockwise => vk::FrontFace::COUNTER_CLOCKWISE,
        }
    }
}

/// Declarative fixed-function configuration for a graphics pipeline.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PipelineConfig {
    pub topology: PrimitiveTopology,
    pub cull_mode: CullMode,
    pub front_face: FrontFace,
    pub depth_test: bool,
    pub depth_write: bool,
    pub blend_enabled: bool,
    /// When set (the default), viewport and scissor are dynamic state and
    /// must be issued at render-pass begin.
    pub dynamic_viewport_scissor: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            topology: PrimitiveTopology::TriangleList,
            cull_mode: CullMode::Back,
            front_face: FrontFace::CounterClockwise,
            depth_test: true,
            depth_write: true,
            blend_enabled: false,
            dynamic_viewport_scissor: true,
        }
    }
}

/// Pipeline layout (descriptor set layouts + push constant ranges).
pub struct PipelineLayout {
    device: Arc<Device>,
    layout: vk::PipelineLayout,
}

impl PipelineLayout {
    pub fn new(
        device: Arc<Device>,
        set_layouts: &[vk::DescriptorSetLayout],
        push_constant_ranges: &[vk::PushConstantRange],
    ) -> RhiResult<Self> {
        let create_info = vk::PipelineLayoutCreateInfo::default()
            .set_layouts(set_layouts)
            .push_constant_ranges(push_constant_ranges);

        let layout = unsafe { device.handle().create_pipeline_layout(&create_info, None)? };
        debug!(
            "Created pipeline layout ({} set layout(s), {} push range(s))",
            set_layouts.len(),
            push_constant_ranges.len()
        );

        Ok(Self { device, layout })
    }

    /// Returns the Vulkan pipeline layout handle.
    #[inline]
    pub fn handle(&self) -> vk::PipelineLayout {
        self.layout
    }
}

impl Drop for PipelineLayout {
    fn drop(&mut self) {
        unsafe {
            self.device
                .handle()
                .destroy_pipeline_layout(self.layout, None);
        }
        debug!("Destroyed pipeline layout");
    }
}

/// Compiled graphics pipeline, bound once per render pass.
pub struct Pipeline {
    device: Arc<Device>,
    pipeline: vk::Pipeline,
    layout: vk::PipelineLayout,
}

impl Pipeline {
    /// Returns the Vulkan pipeline handle.
    #[inline]
    pub fn handle(&self) -> vk::Pipeline {
        self.pipeline
    }

    /// The layout the pipeline was created with.
    #[inline]
    pub fn layout(&self) -> vk::PipelineLayout {
        self.layout
    }

    /// Binds the pipeline for graphics.
    pub fn bind(&self, cmd: &CommandBuffer) {
        cmd.bind_graphics_pipeline(self.pipeline);
    }
}

impl Drop for Pipeline {
    fn drop(&mut self) {
        unsafe {
            self.device.handle().destroy_pipeline(self.pipeline, None);
        }
        debug!("Destroyed graphics pipeline");
    }
}

/// Builder assembling a graphics pipeline against a render pass.
#[derive(Default)]
pub struct GraphicsPipelineBuilder<'a> {
    vertex_shader: Option<&'a Shader>,
    fragment_shader: Option<&'a Shader>,
    config: PipelineConfig,
    vertex_binding: Option<vk::VertexInputBindingDescription>,
    vertex_attributes: Vec<vk::VertexInputAttributeDescription>,
    static_extent: Option<vk::Extent2D>,
}

impl<'a> GraphicsPipelineBuilder<'a> {
    pub fn new() -> Self {
        Self {
            config: PipelineConfig::default(),
            ..Default::default()
        }
    }

    pub fn vertex_shader(mut self, shader: &'a Shader) -> Self {
        self.vertex_shader = Some(shader);
        self
    }

    pub fn fragment_shader(mut self, shader: &'a Shader) -> Self {
        self.fragment_shader = Some(shader);
        self
    }

    pub fn config(mut self, config: PipelineConfig) -> Self {
        self.config = config;
        self
    }

    /// Sets the vertex input layout. Pipelines without vertex input
    /// (fullscreen or billboard shaders) simply skip this.
    pub fn vertex_input(
        mut self,
        binding: vk::VertexInputBindingDescription,
        attributes: Vec<vk::VertexInputAttributeDescription>,
    ) -> Self {
        self.vertex_binding = Some(binding);
        self.vertex_attributes = attributes;
        self
    }

    /// Fixed viewport extent, required only when
    /// `dynamic_viewport_scissor` is disabled.
    pub fn static_extent(mut self, extent: vk::Extent2D) -> Self {
        self.static_extent = Some(extent);
        self
    }

    /// Compiles the pipeline.
    ///
    /// # Errors
    ///
    /// Returns [`RhiError::Pipeline`] if a shader stage is missing or a
    /// static viewport was requested without an extent.
    pub fn build(
        self,
        device: Arc<Device>,
        layout: &PipelineLayout,
        render_pass: &RenderPass,
    ) -> RhiResult<Pipeline> {
        let vertex_shader = self
            .vertex_shader
            .ok_or_else(|| RhiError::Pipeline("missing vertex shader".into()))?;
        let fragment_shader = self
            .fragment_shader
            .ok_or_else(|| RhiError::Pipeline("missing fragment shader".into()))?;

        let stages = [
            vertex_shader.stage_create_info(),
            fragment_shader.stage_create_info(),
        ];

        let bindings: Vec<vk::VertexInputBindingDescription> =
            self.vertex_binding.into_iter().collect();
        let vertex_input_state = vk::PipelineVertexInputStateCreateInfo::default()
            .vertex_binding_descriptions(&bindings)
            .vertex_attribute_descriptions(&self.vertex_attributes);

        let input_assembly = vk::PipelineInputAssemblyStateCreateInfo::default()
            .topology(self.config.topology.to_vk())
            .primitive_restart_enable(false);

        let viewports;
        let scissors;
        let dynamic_states;
        let mut viewport_state = vk::PipelineViewportStateCreateInfo::default();
        let mut dynamic_state = vk::PipelineDynamicStateCreateInfo::default();
        if self.config.dynamic_viewport_scissor {
            viewport_state = viewport_state.viewport_count(1).scissor_count(1);
            dynamic_states = [vk::DynamicState::VIEWPORT, vk::DynamicState::SCISSOR];
            dynamic_state = dynamic_state.dynamic_states(&dynamic_states);
        } else {
            let extent = self.static_extent.ok_or_else(|| {
                RhiError::Pipeline("static viewport requested without an extent".into())
            })?;
            viewports = [vk::Viewport::default()
                .width(extent.width as f32)
                .height(extent.height as f32)
                .max_depth(1.0)];
            scissors = [vk::Rect2D {
                offset: vk::Offset2D { x: 0, y: 0 },
                extent,
            }];
            viewport_state = viewport_state.viewports(&viewports).scissors(&scissors);
        }

        let rasterization = vk::PipelineRasterizationStateCreateInfo::default()
            .depth_clamp_enable(false)
            .rasterizer_discard_enable(false)
            .polygon_mode(vk::PolygonMode::FILL)
            .line_width(1.0)
            .cull_mode(self.config.cull_mode.to_vk())
            .front_face(self.config.front_face.to_vk());

        let multisample = vk::PipelineMultisampleStateCreateInfo::default()
            .rasterization_samples(vk::SampleCountFlags::TYPE_1);

        let depth_stencil = vk::PipelineDepthStencilStateCreateInfo::default()
            .depth_test_enable(self.config.depth_test)
            .depth_write_enable(self.config.depth_write)
            .depth_compare_op(vk::CompareOp::LESS)
            .depth_bounds_test_enable(false)
            .stencil_test_enable(false);

        let blend_attachment = if self.config.blend_enabled {
            vk::PipelineColorBlendAttachmentState::default()
                .blend_enable(true)
                .src_color_blend_factor(vk::BlendFactor::SRC_ALPHA)
                .dst_color_blend_factor(vk::BlendFactor::ONE_MINUS_SRC_ALPHA)
                .color_blend_op(vk::BlendOp::ADD)
                .src_alpha_blend_factor(vk::BlendFactor::ONE)
                .dst_alpha_blend_factor(vk::BlendFactor::ZERO)
                .alpha_blend_op(vk::BlendOp::ADD)
                .color_write_mask(vk::ColorComponentFlags::RGBA)
        } else {
            vk::PipelineColorBlendAttachmentState::default()
                .blend_enable(false)
                .color_write_mask(vk::ColorComponentFlags::RGBA)
        };
        let blend_attachments = [blend_attachment];
        let color_blend = vk::PipelineColorBlendStateCreateInfo::default()
            .logic_op_enable(false)
            .attachments(&blend_attachments);

        let create_info = vk::GraphicsPipelineCreateInfo::default()
            .stages(&stages)
            .vertex_input_state(&vertex_input_state)
            .input_assembly_state(&input_assembly)
            .viewport_state(&viewport_state)
            .rasterization_state(&rasterization)
            .multisample_state(&multisample)
            .depth_stencil_state(&depth_stencil)
            .color_blend_state(&color_blend)
            .dynamic_state(&dynamic_state)
            .layout(layout.handle())
            .render_pass(render_pass.handle())
            .subpass(0);

        let pipelines = unsafe {
            device
                .handle()
                .create_graphics_pipelines(vk::PipelineCache::null(), &[create_info], None)
                .map_err(|(_, e)| RhiError::from(e))?
        };

        let pipeline = pipelines.into_iter().next().ok_or_else(|| {
            RhiError::Pipeline("driver returned no pipeline object".into())
        })?;
        debug!("Created graphics pipeline");

        Ok(Pipeline {
            pipeline,
            layout: layout.handle(),
            device,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn topology_maps_to_vulkan() {
        assert_eq!(
            PrimitiveTopology::TriangleList.to_vk(),
            vk::PrimitiveTopology::TRIANGLE_LIST
        );
        assert_eq!(
            PrimitiveTopology::LineList.to_vk(),
            vk::PrimitiveTopology::LINE_LIST
        );
        assert_eq!(
            PrimitiveTopology::PointList.to_vk(),
            vk::PrimitiveTopology::POINT_LIST
        );
    }

    #[test]
    fn cull_mode_maps_to_vulkan() {
        assert_eq!(CullMode::None.to_vk(), vk::CullModeFlags::NONE);
        assert_eq!(CullMode::Front.to_vk(), vk::CullModeFlags::FRONT);
        assert_eq!(CullMode::Back.to_vk(), vk::CullModeFlags::BACK);
    }

    #[test]
    fn front_face_maps_to_vulkan() {
        assert_eq!(FrontFace::Clockwise.to_vk(), vk::FrontFace::CLOCKWISE);
        assert_eq!(
            FrontFace::CounterClockwise.to_vk(),
            vk::FrontFace::COUNTER_CLOCKWISE
        );
    }

    #[test]
    fn default_config_is_opaque_triangle_rendering() {
        let config = PipelineConfig::default();
        assert_eq!(config.topology, PrimitiveTopology::TriangleList);
        assert_eq!(config.cull_mode, CullMode::Back);
        assert_eq!(config.front_face, FrontFace::CounterClockwise);
        assert!(config.depth_test);
        assert!(config.depth_write);
        assert!(!config.blend_enabled);
        assert!(config.dynamic_viewport_scissor);
    }
}
