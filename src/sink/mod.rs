//! Measurement persistence.
//!
//! The [`MeasurementSink`] trait is the seam toward the data warehouse; the
//! in-tree implementation appends to a CSV file. Sinks are expected to be
//! append-only and to tolerate duplicate inserts: after a crash between a
//! sink write and the matching checkpoint write, the retried run re-inserts
//! that slot. Deduplication, if needed, happens downstream.

use crate::Measurement;
use async_trait::async_trait;

pub mod csv;

pub use csv::CsvMeasurementSink;

/// Sink errors.
#[derive(Debug, thiserror::Error)]
pub enum SinkError {
    /// IO error
    #[error("IO error: {0}")]
    Io(String),

    /// CSV write error
    #[error("CSV error: {0}")]
    Csv(String),
}

/// Result type for sink operations.
pub type SinkResult<T> = Result<T, SinkError>;

/// Destination for normalized measurements.
#[async_trait]
pub trait MeasurementSink: Send + Sync {
    /// Persist one measurement. Must be durable when it returns Ok: the
    /// caller advances its checkpoint right after.
    async fn insert_measurement(&self, measurement: &Measurement) -> SinkResult<()>;
}
