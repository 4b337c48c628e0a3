//! RHI error types.

use ash::vk;
use thiserror::Error;

/// Errors produced by the Vulkan wrappers.
#[derive(Debug, Error)]
pub enum RhiError {
    /// A Vulkan call returned an error code.
    #[error("vulkan call failed: {0}")]
    Vulkan(#[from] vk::Result),

    /// The Vulkan loader library could not be loaded.
    #[error("failed to load vulkan: {0}")]
    Loading(#[from] ash::LoadingError),

    /// Instance creation failed for a non-Vulkan reason.
    #[error("instance error: {0}")]
    InstanceError(String),

    /// No physical device offers a graphics queue that can present.
    #[error("no suitable physical device found")]
    NoSuitableDevice,

    /// `vkCreateBuffer` failed.
    #[error("buffer creation failed: {0}")]
    BufferCreateFailed(vk::Result),

    /// No memory type satisfies both the requirement bits and the
    /// requested property flags.
    #[error("no compatible memory type for requirement bits {type_bits:#b}")]
    MemoryTypeUnavailable { type_bits: u32 },

    /// `vkAllocateMemory` failed.
    #[error("device memory allocation failed: {0}")]
    AllocationFailed(vk::Result),

    /// `vkBindBufferMemory` failed.
    #[error("buffer memory bind failed: {0}")]
    BindFailed(vk::Result),

    /// A buffer write would run past the end of the allocation.
    #[error("write of {requested} bytes at offset {offset} exceeds capacity {capacity}")]
    CapacityExceeded {
        requested: u64,
        offset: u64,
        capacity: u64,
    },

    /// The surface reported no usable configuration.
    #[error("swapchain error: {0}")]
    SwapchainError(String),

    /// The chain was torn down by a failed rebuild; it must be rebuilt
    /// before it can acquire or present again.
    #[error("presentation chain is torn down; rebuild it before use")]
    ChainTornDown,

    /// Shader loading or module creation failed.
    #[error("shader error: {0}")]
    ShaderError(String),
}

/// Result alias for RHI operations.
pub type RhiResult<T> = std::result::Result<T, RhiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capacity_exceeded_display() {
        let err = RhiError::CapacityExceeded {
            requested: 128,
            offset: 64,
            capacity: 100,
        };
        assert_eq!(
            err.to_string(),
            "write of 128 bytes at offset 64 exceeds capacity 100"
        );
    }

    #[test]
    fn test_memory_type_unavailable_display() {
        let err = RhiError::MemoryTypeUnavailable { type_bits: 0b0110 };
        assert!(err.to_string().contains("0b110"));
    }

    #[test]
    fn test_chain_torn_down_display() {
        assert_eq!(
            RhiError::ChainTornDown.to_string(),
            "presentation chain is torn down; rebuild it before use"
        );
    }

    #[test]
    fn test_vulkan_error_conversion() {
        let err: RhiError = vk::Result::ERROR_DEVICE_LOST.into();
        assert!(matches!(err, RhiError::Vulkan(vk::Result::ERROR_DEVICE_LOST)));
    }
}
