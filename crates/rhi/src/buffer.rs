//! GPU buffer allocation and upload.
//!
//! # Overview
//!
//! [`Buffer`] pairs a `vk::Buffer` with a gpu-allocator allocation. Vertex
//! and index buffers live in device-local memory and are filled through a
//! staging copy; uniform buffers stay host-visible and are rewritten every
//! frame through their persistent mapping.

use std::sync::Arc;

use ash::vk;
use gpu_allocator::MemoryLocation;
use gpu_allocator::vulkan::{Allocation, AllocationCreateDesc, AllocationScheme};
use tracing::debug;

use crate::command::CommandPool;
use crate::device::Device;
use crate::error::{RhiError, RhiResult};

/// What a buffer is for; decides usage flags and memory location.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BufferUsage {
    /// Device-local vertex buffer, filled via staging.
    Vertex,
    /// Device-local index buffer, filled via staging.
    Index,
    /// Host-visible uniform buffer, rewritten per frame.
    Uniform,
    /// Host-visible staging source for uploads.
    Staging,
}

impl BufferUsage {
    /// Vulkan usage flags for this buffer kind.
    pub fn usage_flags(self) -> vk::BufferUsageFlags {
        match self {
            BufferUsage::Vertex => {
                vk::BufferUsageFlags::VERTEX_BUFFER | vk::BufferUsageFlags::TRANSFER_DST
            }
            BufferUsage::Index => {
                vk::BufferUsageFlags::INDEX_BUFFER | vk::BufferUsageFlags::TRANSFER_DST
            }
            BufferUsage::Uniform => vk::BufferUsageFlags::UNIFORM_BUFFER,
            BufferUsage::Staging => vk::BufferUsageFlags::TRANSFER_SRC,
        }
    }

    /// Memory location for this buffer kind.
    pub fn memory_location(self) -> MemoryLocation {
        match self {
            BufferUsage::Vertex | BufferUsage::Index => MemoryLocation::GpuOnly,
            BufferUsage::Uniform | BufferUsage::Staging => MemoryLocation::CpuToGpu,
        }
    }

    /// Allocation debug name.
    pub fn name(self) -> &'static str {
        match self {
            BufferUsage::Vertex => "vertex buffer",
            BufferUsage::Index => "index buffer",
            BufferUsage::Uniform => "uniform buffer",
            BufferUsage::Staging => "staging buffer",
        }
    }
}

/// GPU buffer with its backing allocation.
pub struct Buffer {
    device: Arc<Device>,
    buffer: vk::Buffer,
    allocation: Option<Allocation>,
    size: vk::DeviceSize,
    usage: BufferUsage,
}

impl Buffer {
    /// Creates an uninitialized buffer of `size` bytes.
    ///
    /// # Errors
    ///
    /// Returns [`RhiError::InvalidResource`] for a zero size, or an
    /// allocation error from gpu-allocator.
    pub fn new(device: Arc<Device>, size: vk::DeviceSize, usage: BufferUsage) -> RhiResult<Self> {
        if size == 0 {
            return Err(RhiError::InvalidResource(
                "buffer size must be nonzero".into(),
            ));
        }

        let create_info = vk::BufferCreateInfo::default()
            .size(size)
            .usage(usage.usage_flags())
            .sharing_mode(vk::SharingMode::EXCLUSIVE);

        let buffer = unsafe { device.handle().create_buffer(&create_info, None)? };
        let requirements = unsafe { device.handle().get_buffer_memory_requirements(buffer) };

        let allocation = device
            .allocator()
            .lock()
            .expect("allocator mutex poisoned")
            .allocate(&AllocationCreateDesc {
                name: usage.name(),
                requirements,
                location: usage.memory_location(),
                linear: true,
                allocation_scheme: AllocationScheme::GpuAllocatorManaged,
            })?;

        unsafe {
            device
                .handle()
                .bind_buffer_memory(buffer, allocation.memory(), allocation.offset())?;
        }

        debug!("Created {} ({} bytes)", usage.name(), size);

        Ok(Self {
            device,
            buffer,
            allocation: Some(allocation),
            size,
            usage,
        })
    }

    /// Creates a host-visible buffer and fills it with `data`.
    pub fn new_with_data<T: bytemuck::Pod>(
        device: Arc<Device>,
        data: &[T],
        usage: BufferUsage,
    ) -> RhiResult<Self> {
        let mut buffer = Self::new(device, std::mem::size_of_val(data) as vk::DeviceSize, usage)?;
        buffer.write(data)?;
        Ok(buffer)
    }

    /// Creates a device-local buffer and uploads `data` through a staging
    /// copy submitted on `pool`.
    pub fn device_local_with_data<T: bytemuck::Pod>(
        device: Arc<Device>,
        pool: &CommandPool,
        data: &[T],
        usage: BufferUsage,
    ) -> RhiResult<Self> {
        let size = std::mem::size_of_val(data) as vk::DeviceSize;
        let staging = Self::new_with_data(device.clone(), data, BufferUsage::Staging)?;
        let buffer = Self::new(device, size, usage)?;

        pool.submit_one_shot(|cmd| {
            cmd.copy_buffer(staging.handle(), buffer.handle(), size);
            Ok(())
        })?;

        Ok(buffer)
    }

    /// Writes `data` through the persistent mapping.
    ///
    /// # Errors
    ///
    /// Fails if the buffer is not host-visible or `data` does not fit.
    pub fn write<T: bytemuck::Pod>(&mut self, data: &[T]) -> RhiResult<()> {
        let bytes: &[u8] = bytemuck::cast_slice(data);
        if bytes.len() as vk::DeviceSize > self.size {
            return Err(RhiError::InvalidResource(format!(
                "write of {} bytes exceeds buffer size {}",
                bytes.len(),
                self.size
            )));
        }

        let allocation = self
            .allocation
            .as_mut()
            .ok_or_else(|| RhiError::InvalidResource("buffer already freed".into()))?;
        let mapped = allocation.mapped_ptr().ok_or_else(|| {
            RhiError::InvalidResource("buffer memory is not host-visible".into())
        })?;

        unsafe {
            std::ptr::copy_nonoverlapping(
                bytes.as_ptr(),
                mapped.as_ptr() as *mut u8,
                bytes.len(),
            );
        }
        Ok(())
    }

    /// Returns the Vulkan buffer handle.
    #[inline]
    pub fn handle(&self) -> vk::Buffer {
        self.buffer
    }

    /// Buffer size in bytes.
    #[inline]
    pub fn size(&self) -> vk::DeviceSize {
        self.size
    }

    /// The usage this buffer was created for.
    #[inline]
    pub fn usage(&self) -> BufferUsage {
        self.usage
    }
}

impl Drop for Buffer {
    fn drop(&mut self) {
        if let Some(allocation) = self.allocation.take() {
            let _ = self
                .device
                .allocator()
                .lock()
                .expect("allocator mutex poisoned")
                .free(allocation);
        }
        unsafe {
            self.device.handle().destroy_buffer(self.buffer, None);
        }
        debug!("Destroyed {}", self.usage.name());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vertex_and_index_buffers_are_device_local_transfer_targets() {
        for usage in [BufferUsage::Vertex, BufferUsage::Index] {
            assert_eq!(usage.memory_location(), MemoryLocation::GpuOnly);
            assert!(usage
                .usage_flags()
                .contains(vk::BufferUsageFlags::TRANSFER_DST));
        }
        assert!(BufferUsage::Vertex
            .usage_flags()
            .contains(vk::BufferUsageFlags::VERTEX_BUFFER));
        assert!(BufferUsage::Index
            .usage_flags()
            .contains(vk::BufferUsageFlags::INDEX_BUFFER));
    }

    #[test]
    fn uniform_and_staging_buffers_are_host_visible() {
        for usage in [BufferUsage::Uniform, BufferUsage::Staging] {
            assert_eq!(usage.memory_location(), MemoryLocation::CpuToGpu);
        }
        assert!(BufferUsage::Uniform
            .usage_flags()
            .contains(vk::BufferUsageFlags::UNIFORM_BUFFER));
        assert!(BufferUsage::Staging
            .usage_flags()
            .contains(vk::BufferUsageFlags::TRANSFER_SRC));
    }
}
