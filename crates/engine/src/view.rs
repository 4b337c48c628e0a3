//! View uniform data.
//!
//! Must match the shader's uniform block at binding 0: a single column-
//! major 4x4 matrix, 64 bytes.

use bytemuck::{Pod, Zeroable};
use glam::Mat4;

/// Uniform block holding the view matrix.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, Pod, Zeroable)]
pub struct ViewUniform {
    /// View transform applied to every vertex.
    pub view: Mat4,
}

impl ViewUniform {
    /// Size of the block in bytes.
    pub const SIZE: usize = std::mem::size_of::<Self>();

    /// Wraps a view matrix.
    pub fn new(view: Mat4) -> Self {
        Self { view }
    }

    /// Identity view.
    pub fn identity() -> Self {
        Self {
            view: Mat4::IDENTITY,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_view_uniform_size() {
        // 16 floats.
        assert_eq!(ViewUniform::SIZE, 64);
    }

    #[test]
    fn test_view_uniform_alignment() {
        assert_eq!(std::mem::align_of::<ViewUniform>(), 16);
    }

    #[test]
    fn test_view_uniform_bytes() {
        let uniform = ViewUniform::identity();
        let bytes = bytemuck::bytes_of(&uniform);
        assert_eq!(bytes.len(), ViewUniform::SIZE);
        // Column-major identity: first float is 1.0.
        assert_eq!(&bytes[0..4], &1.0f32.to_le_bytes());
    }
}
