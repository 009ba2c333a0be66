//! Global per-frame uniform data and its descriptor plumbing.

use std::sync::Arc;

use ash::vk;
use bytemuck::{Pod, Zeroable};

use glimmer_rhi::MAX_FRAMES_IN_FLIGHT;
use glimmer_rhi::buffer::{Buffer, BufferUsage};
use glimmer_rhi::descriptor::{
    DescriptorPool, DescriptorSetLayout, uniform_buffer_binding, write_uniform_buffer,
};
use glimmer_rhi::device::Device;
use glimmer_rhi::RhiResult;
use glimmer_scene::{MAX_POINT_LIGHTS, PointLight};

/// Per-frame globals, std140 layout matching the shaders' set 0
/// binding 0.
#[repr(C)]
#[derive(Clone, Copy, Debug, Pod, Zeroable)]
pub struct GlobalUbo {
    pub projection: [[f32; 4]; 4],
    pub view: [[f32; 4]; 4],
    /// RGB ambient term, alpha is its intensity.
    pub ambient_color: [f32; 4],
    pub point_lights: [PointLight; MAX_POINT_LIGHTS],
    pub num_lights: u32,
    pub _padding: [u32; 3],
}

impl Default for GlobalUbo {
    fn default() -> Self {
        Self {
            projection: glam::Mat4::IDENTITY.to_cols_array_2d(),
            view: glam::Mat4::IDENTITY.to_cols_array_2d(),
            ambient_color: [1.0, 1.0, 1.0, 0.02],
            point_lights: [PointLight::zeroed(); MAX_POINT_LIGHTS],
            num_lights: 0,
            _padding: [0; 3],
        }
    }
}

/// One uniform buffer and descriptor set per in-flight slot, so a
/// frame's globals can be written while the previous frame still reads
/// its own copy.
pub struct GlobalDescriptors {
    layout: DescriptorSetLayout,
    // Pool must outlive the sets allocated from it.
    _pool: DescriptorPool,
    buffers: Vec<Buffer>,
    sets: Vec<vk::DescriptorSet>,
}

impl GlobalDescriptors {
    pub fn new(device: Arc<Device>) -> RhiResult<Self> {
        let bindings = [uniform_buffer_binding(
            0,
            vk::ShaderStageFlags::VERTEX | vk::ShaderStageFlags::FRAGMENT,
        )];
        let layout = DescriptorSetLayout::new(device.clone(), &bindings)?;

        let pool_sizes = [vk::DescriptorPoolSize::default()
            .ty(vk::DescriptorType::UNIFORM_BUFFER)
            .descriptor_count(MAX_FRAMES_IN_FLIGHT as u32)];
        let pool = DescriptorPool::new(device.clone(), MAX_FRAMES_IN_FLIGHT as u32, &pool_sizes)?;

        let mut buffers = Vec::with_capacity(MAX_FRAMES_IN_FLIGHT);
        for _ in 0..MAX_FRAMES_IN_FLIGHT {
            buffers.push(Buffer::new(
                device.clone(),
                std::mem::size_of::<GlobalUbo>() as vk::DeviceSize,
                BufferUsage::Uniform,
            )?);
        }

        let layouts = vec![layout.handle(); MAX_FRAMES_IN_FLIGHT];
        let sets = pool.allocate(&layouts)?;
        for (set, buffer) in sets.iter().zip(&buffers) {
            write_uniform_buffer(&device, *set, buffer.handle());
        }

        Ok(Self {
            layout,
            _pool: pool,
            buffers,
            sets,
        })
    }

    #[inline]
    pub fn set_layout(&self) -> vk::DescriptorSetLayout {
        self.layout.handle()
    }

    #[inline]
    pub fn set(&self, slot: usize) -> vk::DescriptorSet {
        self.sets[slot]
    }

    /// Writes `ubo` into the slot's buffer through its persistent
    /// mapping.
    pub fn update(&mut self, slot: usize, ubo: &GlobalUbo) -> RhiResult<()> {
        self.buffers[slot].write(std::slice::from_ref(ubo))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ubo_layout_matches_std140() {
        // mat4 + mat4 + vec4 + 10 * (vec4 + vec4) + uint + 3 pad
        assert_eq!(std::mem::size_of::<GlobalUbo>(), 64 + 64 + 16 + 320 + 16);
        assert_eq!(std::mem::align_of::<GlobalUbo>(), 4);
    }

    #[test]
    fn light_array_offset_is_after_matrices_and_ambient() {
        assert_eq!(std::mem::offset_of!(GlobalUbo, point_lights), 144);
        assert_eq!(std::mem::offset_of!(GlobalUbo, num_lights), 464);
    }

    #[test]
    fn default_ubo_has_no_lights() {
        let ubo = GlobalUbo::default();
        assert_eq!(ubo.num_lights, 0);
        assert!(ubo.ambient_color[3] > 0.0);
    }
}
