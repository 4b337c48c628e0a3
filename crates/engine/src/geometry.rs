//! Geometry bookkeeping for the vertex buffer.

use crate::error::{EngineError, EngineResult};

/// Tracks how many vertices of the fixed-capacity vertex buffer are live.
///
/// Uploads are admitted first and committed only after the buffer write
/// succeeded, so a rejected or failed upload never changes what gets
/// drawn.
#[derive(Debug)]
pub struct GeometryBinding {
    active: u32,
    capacity: u32,
}

impl GeometryBinding {
    /// Creates a binding with zero active vertices.
    pub fn with_capacity(capacity: u32) -> Self {
        Self {
            active: 0,
            capacity,
        }
    }

    /// Checks that `requested` vertices fit the buffer.
    ///
    /// Does not change the active count.
    pub fn admit(&self, requested: usize) -> EngineResult<u32> {
        if requested > self.capacity as usize {
            return Err(EngineError::TooManyVertices {
                requested,
                capacity: self.capacity as usize,
            });
        }
        Ok(requested as u32)
    }

    /// Records a completed upload of `count` vertices.
    pub fn commit(&mut self, count: u32) {
        self.active = count;
    }

    /// Number of vertices the next frame will draw.
    #[inline]
    pub fn active(&self) -> u32 {
        self.active
    }

    /// Capacity in vertices.
    #[inline]
    pub fn capacity(&self) -> u32 {
        self.capacity
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_admit_at_capacity() {
        let geometry = GeometryBinding::with_capacity(1024);
        assert_eq!(geometry.admit(1024).unwrap(), 1024);
    }

    #[test]
    fn test_admit_over_capacity() {
        let geometry = GeometryBinding::with_capacity(1024);
        let err = geometry.admit(1025).unwrap_err();
        assert!(matches!(
            err,
            EngineError::TooManyVertices {
                requested: 1025,
                capacity: 1024
            }
        ));
    }

    #[test]
    fn test_admit_does_not_change_active() {
        let mut geometry = GeometryBinding::with_capacity(16);
        geometry.commit(7);
        let _ = geometry.admit(12).unwrap();
        assert_eq!(geometry.active(), 7);
        let _ = geometry.admit(100).unwrap_err();
        assert_eq!(geometry.active(), 7);
    }

    #[test]
    fn test_commit_updates_active() {
        let mut geometry = GeometryBinding::with_capacity(16);
        assert_eq!(geometry.active(), 0);
        geometry.commit(3);
        assert_eq!(geometry.active(), 3);
        geometry.commit(0);
        assert_eq!(geometry.active(), 0);
    }

    #[test]
    fn test_admit_empty_upload() {
        let geometry = GeometryBinding::with_capacity(16);
        assert_eq!(geometry.admit(0).unwrap(), 0);
    }
}
