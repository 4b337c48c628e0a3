//! Host-visible buffers.
//!
//! All geometry and uniform data lives in host-visible, host-coherent
//! memory and is updated with map/copy/unmap. There is no staging path.

use std::sync::Arc;

use ash::vk;
use tracing::{debug, trace};

use crate::device::Device;
use crate::error::{RhiError, RhiResult};
use crate::memory::select_memory_type;

/// What a host buffer is bound as.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BufferUsage {
    /// Vertex input.
    Vertex,
    /// Uniform data read by shaders.
    Uniform,
}

impl BufferUsage {
    /// Converts to Vulkan buffer usage flags.
    pub fn to_vk_usage(self) -> vk::BufferUsageFlags {
        match self {
            BufferUsage::Vertex => vk::BufferUsageFlags::VERTEX_BUFFER,
            BufferUsage::Uniform => vk::BufferUsageFlags::UNIFORM_BUFFER,
        }
    }

    /// Human-readable name for logging.
    pub fn name(self) -> &'static str {
        match self {
            BufferUsage::Vertex => "vertex",
            BufferUsage::Uniform => "uniform",
        }
    }
}

/// A buffer backed by host-visible, host-coherent device memory.
///
/// A constructed `HostBuffer` always holds both the buffer and its bound
/// memory; there is no partially initialized state to check for. Both
/// handles are released on drop, memory first.
pub struct HostBuffer {
    device: Arc<Device>,
    buffer: vk::Buffer,
    memory: vk::DeviceMemory,
    capacity: vk::DeviceSize,
    usage: BufferUsage,
}

impl HostBuffer {
    /// Creates a buffer of `capacity` bytes and binds host-visible memory
    /// to it.
    ///
    /// Each step that can fail cleans up everything the earlier steps
    /// built, in reverse order, so an error never leaks a handle:
    /// buffer creation ([`RhiError::BufferCreateFailed`]), memory type
    /// selection ([`RhiError::MemoryTypeUnavailable`]), allocation
    /// ([`RhiError::AllocationFailed`]) and binding
    /// ([`RhiError::BindFailed`]).
    pub fn new(
        device: Arc<Device>,
        capacity: vk::DeviceSize,
        usage: BufferUsage,
    ) -> RhiResult<Self> {
        let buffer_info = vk::BufferCreateInfo::default()
            .size(capacity)
            .usage(usage.to_vk_usage())
            .sharing_mode(vk::SharingMode::EXCLUSIVE);

        let buffer = unsafe { device.handle().create_buffer(&buffer_info, None) }
            .map_err(RhiError::BufferCreateFailed)?;

        let requirements = unsafe { device.handle().get_buffer_memory_requirements(buffer) };

        let memory_type_index = match select_memory_type(
            device.memory_properties(),
            requirements.memory_type_bits,
            vk::MemoryPropertyFlags::HOST_VISIBLE | vk::MemoryPropertyFlags::HOST_COHERENT,
        ) {
            Some(index) => index,
            None => {
                unsafe { device.handle().destroy_buffer(buffer, None) };
                return Err(RhiError::MemoryTypeUnavailable {
                    type_bits: requirements.memory_type_bits,
                });
            }
        };

        let alloc_info = vk::MemoryAllocateInfo::default()
            .allocation_size(requirements.size)
            .memory_type_index(memory_type_index);

        let memory = match unsafe { device.handle().allocate_memory(&alloc_info, None) } {
            Ok(memory) => memory,
            Err(e) => {
                unsafe { device.handle().destroy_buffer(buffer, None) };
                return Err(RhiError::AllocationFailed(e));
            }
        };

        if let Err(e) = unsafe { device.handle().bind_buffer_memory(buffer, memory, 0) } {
            unsafe {
                device.handle().free_memory(memory, None);
                device.handle().destroy_buffer(buffer, None);
            }
            return Err(RhiError::BindFailed(e));
        }

        debug!(
            capacity,
            memory_type = memory_type_index,
            usage = usage.name(),
            "Created host buffer"
        );

        Ok(Self {
            device,
            buffer,
            memory,
            capacity,
            usage,
        })
    }

    /// Copies `bytes` into the buffer at `offset`.
    ///
    /// The bounds check runs before any Vulkan call, so an oversized write
    /// leaves the buffer contents untouched. Exactly the written range is
    /// mapped, and it is unmapped again before returning.
    pub fn write(&self, offset: vk::DeviceSize, bytes: &[u8]) -> RhiResult<()> {
        let len = bytes.len() as vk::DeviceSize;
        if offset + len > self.capacity {
            return Err(RhiError::CapacityExceeded {
                requested: len,
                offset,
                capacity: self.capacity,
            });
        }
        if bytes.is_empty() {
            return Ok(());
        }

        unsafe {
            let ptr = self.device.handle().map_memory(
                self.memory,
                offset,
                len,
                vk::MemoryMapFlags::empty(),
            )?;
            std::ptr::copy_nonoverlapping(bytes.as_ptr(), ptr.cast::<u8>(), bytes.len());
            self.device.handle().unmap_memory(self.memory);
        }

        trace!(len, offset, usage = self.usage.name(), "Host buffer write");
        Ok(())
    }

    /// Copies `len` bytes out of the buffer, mainly for debugging and
    /// verification.
    pub fn read_back(&self, offset: vk::DeviceSize, len: usize) -> RhiResult<Vec<u8>> {
        let size = len as vk::DeviceSize;
        if offset + size > self.capacity {
            return Err(RhiError::CapacityExceeded {
                requested: size,
                offset,
                capacity: self.capacity,
            });
        }

        let mut out = vec![0u8; len];
        if len > 0 {
            unsafe {
                let ptr = self.device.handle().map_memory(
                    self.memory,
                    offset,
                    size,
                    vk::MemoryMapFlags::empty(),
                )?;
                std::ptr::copy_nonoverlapping(ptr.cast::<u8>(), out.as_mut_ptr(), len);
                self.device.handle().unmap_memory(self.memory);
            }
        }
        Ok(out)
    }

    /// Returns the raw buffer handle.
    #[inline]
    pub fn handle(&self) -> vk::Buffer {
        self.buffer
    }

    /// Returns the buffer capacity in bytes.
    #[inline]
    pub fn capacity(&self) -> vk::DeviceSize {
        self.capacity
    }

    /// Returns the usage this buffer was created with.
    #[inline]
    pub fn usage(&self) -> BufferUsage {
        self.usage
    }
}

impl Drop for HostBuffer {
    fn drop(&mut self) {
        unsafe {
            self.device.handle().free_memory(self.memory, None);
            self.device.handle().destroy_buffer(self.buffer, None);
        }
        debug!(usage = self.usage.name(), "Host buffer destroyed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_buffer_usage_to_vk() {
        assert_eq!(
            BufferUsage::Vertex.to_vk_usage(),
            vk::BufferUsageFlags::VERTEX_BUFFER
        );
        assert_eq!(
            BufferUsage::Uniform.to_vk_usage(),
            vk::BufferUsageFlags::UNIFORM_BUFFER
        );
    }

    #[test]
    fn test_buffer_usage_name() {
        assert_eq!(BufferUsage::Vertex.name(), "vertex");
        assert_eq!(BufferUsage::Uniform.name(), "uniform");
    }
}
