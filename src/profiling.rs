//! # Profiling Guide
//!
//! The registry emits `tracing` events at all times: `debug` for registrations,
//! precedence edges, resets and tick summaries, `trace` for entity creation and
//! destruction, `warn` for storage conflicts between unordered systems.
//!
//! Enable the `profiling` feature to also get a span per tick and per system,
//! plus the subscriber helpers in this module:
//!
//! ```toml
//! [dependencies]
//! packed_ecs = { version = "0.1", features = ["profiling"] }
//! ```
//!
//! ```ignore
//! let _guard = packed_ecs::profiling::init_file_subscriber("trace.json")?;
//!
//! let registry = Registry::new();
//! // register components and systems
//! registry.run()?;
//! // keep `_guard` alive until the end of main so buffered lines are flushed
//! ```
//!
//! Systems can add their own spans the same way the scheduler does:
//!
//! ```ignore
//! fn run(&mut self, access: &Access<'_>, query: &Query<'_>, _: &Subflow) -> Result<()> {
//!     #[cfg(feature = "profiling")]
//!     let _span = tracing::info_span!("movement", entities = query.entities().len()).entered();
//!     // system logic here
//!     Ok(())
//! }
//! ```
//!
//! ## Performance Tips
//!
//! 1. Profile in release mode for accurate metrics
//! 2. Use `RUST_LOG=packed_ecs=trace` with the stdout subscriber to see entity churn

#[cfg(feature = "profiling")]
use std::{fs::File, path::Path};

#[cfg(feature = "profiling")]
use tracing_appender::non_blocking::WorkerGuard;
#[cfg(feature = "profiling")]
use tracing_subscriber::{fmt::format::FmtSpan, prelude::*, EnvFilter};

#[cfg(feature = "profiling")]
use crate::error::{EcsError, Result};

/// Install a global subscriber writing JSON lines to `path`.
///
/// Writes go through a background thread; dropping the returned guard
/// flushes it.
#[cfg(feature = "profiling")]
pub fn init_file_subscriber(path: impl AsRef<Path>) -> Result<WorkerGuard> {
    let file = File::create(path)?;
    let (non_blocking, guard) = tracing_appender::non_blocking(file);
    tracing_subscriber::fmt()
        .json()
        .with_writer(non_blocking)
        .with_ansi(false)
        .with_max_level(tracing::Level::TRACE)
        .with_span_events(FmtSpan::CLOSE)
        .try_init()
        .map_err(|e| EcsError::ConfigError(e.to_string()))?;
    Ok(guard)
}

/// Install a global stdout subscriber filtered by `RUST_LOG`
#[cfg(feature = "profiling")]
pub fn init_stdout_subscriber() -> Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(EnvFilter::from_default_env())
        .try_init()
        .map_err(|e| EcsError::ConfigError(e.to_string()))
}
