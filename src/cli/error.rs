//! CLI error types and conversions

use crate::config::ConfigError;
use crate::entsoe::EntsoeError;
use crate::exporter::ExportError;
use crate::sink::SinkError;
use crate::state::StateError;

/// CLI errors.
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    /// Configuration error
    #[error("configuration error: {0}")]
    ConfigError(#[from] ConfigError),

    /// Source client error
    #[error("source error: {0}")]
    EntsoeError(#[from] EntsoeError),

    /// Sink error
    #[error("sink error: {0}")]
    SinkError(#[from] SinkError),

    /// State store error
    #[error("state error: {0}")]
    StateError(#[from] StateError),

    /// Export run error
    #[error("export error: {0}")]
    ExportError(#[from] ExportError),
}
