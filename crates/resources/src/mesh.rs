//! GPU meshes built from vertex and index data.

use std::sync::Arc;

use ash::vk;
use glimmer_rhi::buffer::{Buffer, BufferUsage};
use glimmer_rhi::command::{CommandBuffer, CommandPool};
use glimmer_rhi::device::Device;
use glimmer_rhi::vertex::Vertex;
use glimmer_rhi::{RhiError, RhiResult};
use tracing::debug;

/// Vertex (and optionally index) buffers for one piece of geometry.
///
/// Buffers are device-local; uploading goes through a staging copy on
/// the supplied transient command pool.
pub struct Mesh {
    vertex_buffer: Buffer,
    index_buffer: Option<Buffer>,
    vertex_count: u32,
    index_count: u32,
}

impl Mesh {
    pub fn new(
        device: Arc<Device>,
        pool: &CommandPool,
        vertices: &[Vertex],
        indices: &[u32],
    ) -> RhiResult<Self> {
        if vertices.len() < 3 {
            return Err(RhiError::InvalidResource(format!(
                "mesh needs at least 3 vertices, got {}",
                vertices.len()
            )));
        }

        let vertex_buffer =
            Buffer::device_local_with_data(device.clone(), pool, vertices, BufferUsage::Vertex)?;
        let index_buffer = if indices.is_empty() {
            None
        } else {
            Some(Buffer::device_local_with_data(
                device,
                pool,
                indices,
                BufferUsage::Index,
            )?)
        };

        debug!(
            vertices = vertices.len(),
            indices = indices.len(),
            "uploaded mesh"
        );

        Ok(Self {
            vertex_buffer,
            index_buffer,
            vertex_count: vertices.len() as u32,
            index_count: indices.len() as u32,
        })
    }

    /// Builds a mesh from a geometry builder's output.
    pub fn from_geometry(
        device: Arc<Device>,
        pool: &CommandPool,
        (vertices, indices): (Vec<Vertex>, Vec<u32>),
    ) -> RhiResult<Arc<Self>> {
        Ok(Arc::new(Self::new(device, pool, &vertices, &indices)?))
    }

    pub fn bind(&self, cmd: &CommandBuffer) {
        cmd.bind_vertex_buffer(self.vertex_buffer.handle());
        if let Some(indices) = &self.index_buffer {
            cmd.bind_index_buffer(indices.handle(), vk::IndexType::UINT32);
        }
    }

    pub fn draw(&self, cmd: &CommandBuffer) {
        if self.index_buffer.is_some() {
            cmd.draw_indexed(self.index_count, 1);
        } else {
            cmd.draw(self.vertex_count, 1);
        }
    }

    pub fn vertex_count(&self) -> u32 {
        self.vertex_count
    }

    pub fn index_count(&self) -> u32 {
        self.index_count
    }
}
