//! Engine error types.

use thiserror::Error;

use glint_rhi::RhiError;

/// Errors surfaced by engine construction and the public API.
#[derive(Debug, Error)]
pub enum EngineError {
    /// An RHI operation failed.
    #[error(transparent)]
    Rhi(#[from] RhiError),

    /// Window or surface handling failed.
    #[error(transparent)]
    Platform(#[from] glint_core::Error),

    /// An upload was rejected because it would overflow the vertex buffer.
    /// The previously uploaded geometry stays in effect.
    #[error("{requested} vertices exceed the buffer capacity of {capacity}")]
    TooManyVertices { requested: usize, capacity: usize },

    /// The winit event loop failed.
    #[error("event loop error: {0}")]
    EventLoop(String),
}

/// Result alias for engine operations.
pub type EngineResult<T> = std::result::Result<T, EngineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_too_many_vertices_display() {
        let err = EngineError::TooManyVertices {
            requested: 1025,
            capacity: 1024,
        };
        assert_eq!(
            err.to_string(),
            "1025 vertices exceed the buffer capacity of 1024"
        );
    }
}
