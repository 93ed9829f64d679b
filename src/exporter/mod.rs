//! The incremental export engine.
//!
//! # Overview
//!
//! One pass of the exporter walks every configured area (and exchange pair)
//! sequentially:
//!
//! 1. **Plan**: [`window::next_window`] decides the next `[start, end)`
//!    request window from the persisted checkpoint, or reports the area as
//!    caught up
//! 2. **Fetch**: the source client retrieves the window
//! 3. **Build**: [`measurement`] turns each fixed-resolution slot of the
//!    response into one normalized measurement
//! 4. **Persist**: the sink stores the measurement, then the checkpoint is
//!    advanced and written. This happens per slot, never batched, so an
//!    interrupted run resumes exactly after the last stored slot
//! 5. **Pause**: a courtesy delay before the next window, during which a
//!    shutdown request ends the pass cleanly
//!
//! [`service::ExportService`] drives the cycle; the collaborators behind the
//! source, sink, and state seams are injected, which is also how the
//! integration tests script whole passes.

pub mod measurement;
pub mod service;
pub mod window;

pub use service::ExportService;

use crate::config::ConfigError;
use crate::entsoe::EntsoeError;
use crate::sink::SinkError;
use crate::state::StateError;

/// Errors that abort an export run.
///
/// The source's "no matching data found" answer never surfaces here; the
/// loop consumes it as the end of an area's pass.
#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    /// Configuration error
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Source error
    #[error("source error: {0}")]
    Source(#[from] EntsoeError),

    /// Sink write error
    #[error("sink error: {0}")]
    Sink(#[from] SinkError),

    /// Checkpoint state error
    #[error("state error: {0}")]
    State(#[from] StateError),
}
