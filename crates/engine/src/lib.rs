//! Minimal real-time engine over Vulkan.
//!
//! One window, one device, one graphics queue, one frame in flight. The
//! application supplies a per-frame callback; the engine clears the
//! screen, draws whatever geometry has been uploaded and presents.
//!
//! ```no_run
//! use glint_engine::{run, EngineConfig};
//!
//! fn main() -> Result<(), glint_engine::EngineError> {
//!     run(EngineConfig::default(), |engine, _dt| {
//!         engine.set_clear_color([0.0, 0.0, 1.0, 1.0]);
//!     })
//! }
//! ```

pub mod engine;
pub mod error;
pub mod frame;
pub mod geometry;
pub mod run;
pub mod view;

pub use engine::{Engine, EngineConfig};
pub use error::{EngineError, EngineResult};
pub use run::run;
pub use view::ViewUniform;

pub use glint_rhi::vertex::{Vertex, MAX_VERTEX_COUNT};
