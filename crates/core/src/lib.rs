//! Shared foundation for the engine workspace.
//!
//! Provides the common error type, logging bring-up and the frame clock
//! used by the render loop.

pub mod clock;
pub mod error;
pub mod logging;

pub use clock::FrameClock;
pub use error::{Error, Result};
pub use logging::init_logging;
