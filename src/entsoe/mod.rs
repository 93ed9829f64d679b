//! ENTSO-E transparency platform client.
//!
//! The [`EntsoeClient`] trait is the seam between the export loop and the
//! source: the HTTP implementation lives in [`client`], the wire types in
//! [`types`]. "No matching data found" is a first-class error variant because
//! the platform answers that way for windows it has nothing for (for example
//! when queried right up to the current slot) and the loop treats it as a
//! clean end of the catch-up pass, not a failure.

use async_trait::async_trait;

pub mod client;
pub mod types;

pub use client::EntsoeHttpClient;
pub use types::{
    Area, GenerationResponse, GenerationTimeSeries, MeasurementUnit, MktPsrType,
    PhysicalFlowResponse, PhysicalFlowTimeSeries, Resolution, SeriesPeriod, SeriesPoint,
    TimeInterval,
};

/// Source client errors.
#[derive(Debug, thiserror::Error)]
pub enum EntsoeError {
    /// The platform has no data for the requested window. Expected; the
    /// caller ends its pass cleanly.
    #[error("no matching data found")]
    NoMatchingDataFound,

    /// Missing API token at construction time.
    #[error("token is empty, provide a valid api token for the transparency platform")]
    MissingToken,

    /// Network-level failure after retries were exhausted.
    #[error("network error: {0}")]
    Network(String),

    /// Response carried an unexpected HTTP status.
    #[error("request returned unexpected status code {status}")]
    UnexpectedStatus {
        /// The HTTP status code received.
        status: u16,
    },

    /// Response body could not be deserialized.
    #[error("parse error: {0}")]
    Parse(String),
}

/// Result type for source client operations.
pub type EntsoeResult<T> = Result<T, EntsoeError>;

/// Client for the ENTSO-E transparency platform.
#[async_trait]
pub trait EntsoeClient: Send + Sync {
    /// Fetch aggregated generation per production type for one bidding zone.
    ///
    /// The response's own time period can be narrower than the requested
    /// window when the platform has not published the full range yet.
    async fn get_aggregated_generation_per_type(
        &self,
        area: Area,
        time_interval: &TimeInterval,
    ) -> EntsoeResult<GenerationResponse>;

    /// Fetch physical cross-border flows between two bidding zones.
    async fn get_physical_cross_border_flow(
        &self,
        in_area: Area,
        out_area: Area,
        time_interval: &TimeInterval,
    ) -> EntsoeResult<PhysicalFlowResponse>;
}
