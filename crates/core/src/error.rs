//! Common error type shared across the workspace.

use thiserror::Error;

/// Errors raised by platform and engine bring-up code.
#[derive(Debug, Error)]
pub enum Error {
    /// Window creation or window system interaction failed.
    #[error("window error: {0}")]
    Window(String),

    /// A Vulkan call outside the RHI wrappers failed.
    #[error("vulkan error: {0}")]
    Vulkan(String),

    /// File I/O failed.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result alias using the common [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_window_error_display() {
        let err = Error::Window("no display".to_string());
        assert_eq!(err.to_string(), "window error: no display");
    }

    #[test]
    fn test_io_error_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let err: Error = io.into();
        assert!(matches!(err, Error::Io(_)));
    }
}
