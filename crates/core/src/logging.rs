//! Logging initialization.
//!
//! Installs a `tracing` subscriber with an environment-controlled filter.
//! The default level is `info`; set `RUST_LOG` to override it.

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

/// Initializes the global tracing subscriber.
///
/// Call once at startup, before any other engine code runs. Calling it a
/// second time panics, so it belongs in `main`, not in library code.
pub fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().compact())
        .init();

    tracing::debug!("Logging initialized");
}
