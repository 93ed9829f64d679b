//! # Electricity Mix Exporter Library
//!
//! Incrementally exports electricity generation and cross-border flow data
//! from the ENTSO-E transparency platform into normalized per-time-slot
//! measurements. Designed to run as a small headless job that catches up from
//! a persisted high-water mark, so interrupted or scheduled runs only fetch
//! data that is actually new.
//!
//! ## Features
//!
//! - **Incremental sync**: per-area checkpoint advanced after every persisted
//!   time slot, so a crash loses at most the in-flight slot
//! - **Catch-up pacing**: bounded request windows with a courtesy pause
//!   between them to respect the source's rate limits
//! - **Partial-series tolerance**: a truncated time series degrades that
//!   series only, never the whole slot
//! - **Graceful shutdown**: Ctrl+C finishes the slot in flight and stops
//!   before the next window
//!
//! ## Architecture
//!
//! The library is organized into several core modules:
//!
//! - [`config`] - Area and exchange configuration loading and validation
//! - [`entsoe`] - ENTSO-E API client and wire types
//! - [`exporter`] - Window planning, slot building, and the sync loop
//! - [`sink`] - Measurement persistence (CSV writer)
//! - [`state`] - Checkpoint state persistence with atomic writes
//! - [`shutdown`] - Graceful shutdown coordination
//!
//! The types below are the normalized output contract shared by all sinks.

#![warn(missing_docs)]
#![warn(clippy::all)]

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// CLI command implementations
pub mod cli;

/// Configuration loading and validation
pub mod config;

/// ENTSO-E API client and wire types
pub mod entsoe;

/// Window planning, measurement building, and the sync loop
pub mod exporter;

/// Metric names and recording helpers
pub mod metrics;

/// Graceful shutdown coordination shared across modules
pub mod shutdown;

/// Measurement persistence
pub mod sink;

/// Checkpoint state persistence
pub mod state;

/// Source tag stamped on every measurement.
pub const SOURCE_ENTSOE: &str = "ENTSOE";

/// A normalized measurement for one time slot.
///
/// Carries one [`Sample`] per contributing source time series, in source
/// order. A measurement with zero samples is structurally valid; it just
/// carries no information for that slot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Measurement {
    /// Generated identifier (UUID v4).
    pub id: String,
    /// Origin of the data, e.g. [`SOURCE_ENTSOE`].
    pub source: String,
    /// Country code of the bidding zone the measurement belongs to.
    pub area: String,
    /// Country code of the peer zone, set on cross-border flow measurements.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exchange_with_area: Option<String>,
    /// One sample per contributing source series, in source order.
    pub samples: Vec<Sample>,
    /// Start of the time slot this measurement covers.
    pub measured_at_time: DateTime<Utc>,
}

/// One normalized value within a [`Measurement`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    /// Normalized energy type.
    pub energy_type: EnergyType,
    /// Raw source production-type code, preserved for audit.
    pub original_energy_type: String,
    /// Whether [`Sample::energy_type`] counts as renewable.
    pub is_renewable: bool,
    /// Metric semantics of the value; generation data is a gauge.
    pub metric_type: MetricType,
    /// Whether the value flows into or out of the zone.
    pub sample_direction: SampleDirection,
    /// Unit of the value.
    pub sample_unit: SampleUnit,
    /// The measured quantity.
    pub value: f64,
}

/// Normalized energy type derived from the source production-type code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EnergyType {
    /// Source code missing or not in the lookup table.
    Unknown,
    /// Hard or brown coal.
    Coal,
    /// Natural or coal-derived gas.
    Gas,
    /// Oil, oil shale, or peat.
    Oil,
    /// Biomass.
    Biomass,
    /// Nuclear.
    Nuclear,
    /// Waste incineration.
    Waste,
    /// Geothermal.
    Geothermal,
    /// Pumped storage, run-of-river, reservoir, or marine.
    Hydro,
    /// Solar.
    Solar,
    /// Offshore wind.
    WindOffshore,
    /// Onshore wind.
    WindOnshore,
    /// Renewable sources without a dedicated code.
    OtherRenewable,
}

impl EnergyType {
    /// Classify a source production-type (psr) code.
    ///
    /// Total over all inputs: codes outside the table classify as
    /// [`EnergyType::Unknown`] rather than failing.
    pub fn from_psr_code(code: &str) -> Self {
        match code {
            "B01" => EnergyType::Biomass,
            "B02" | "B05" => EnergyType::Coal,
            "B03" | "B04" => EnergyType::Gas,
            "B06" | "B07" | "B08" => EnergyType::Oil,
            "B09" => EnergyType::Geothermal,
            "B10" | "B11" | "B12" | "B13" => EnergyType::Hydro,
            "B14" => EnergyType::Nuclear,
            "B15" => EnergyType::OtherRenewable,
            "B16" => EnergyType::Solar,
            "B17" => EnergyType::Waste,
            "B18" => EnergyType::WindOffshore,
            "B19" => EnergyType::WindOnshore,
            _ => EnergyType::Unknown,
        }
    }

    /// Whether this energy type counts as renewable.
    pub fn is_renewable(self) -> bool {
        matches!(
            self,
            EnergyType::Geothermal
                | EnergyType::Hydro
                | EnergyType::Solar
                | EnergyType::WindOffshore
                | EnergyType::WindOnshore
                | EnergyType::OtherRenewable
        )
    }

    /// Stable string form used in sink output.
    pub fn as_str(self) -> &'static str {
        match self {
            EnergyType::Unknown => "Unknown",
            EnergyType::Coal => "Coal",
            EnergyType::Gas => "Gas",
            EnergyType::Oil => "Oil",
            EnergyType::Biomass => "Biomass",
            EnergyType::Nuclear => "Nuclear",
            EnergyType::Waste => "Waste",
            EnergyType::Geothermal => "Geothermal",
            EnergyType::Hydro => "Hydro",
            EnergyType::Solar => "Solar",
            EnergyType::WindOffshore => "WindOffshore",
            EnergyType::WindOnshore => "WindOnshore",
            EnergyType::OtherRenewable => "OtherRenewable",
        }
    }
}

impl fmt::Display for EnergyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Whether a sample flows into or out of the zone it was measured for.
///
/// The source signals direction through which of two zone fields is present
/// on a series; modeling it as a closed variant keeps the mapping total.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SampleDirection {
    /// Flowing into the zone (generation, or import on an exchange).
    In,
    /// Flowing out of the zone (consumption, or export on an exchange).
    Out,
    /// Neither zone field was present on the series.
    Unknown,
}

impl fmt::Display for SampleDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SampleDirection::In => f.write_str("In"),
            SampleDirection::Out => f.write_str("Out"),
            SampleDirection::Unknown => f.write_str("Unknown"),
        }
    }
}

/// Unit of a sample value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SampleUnit {
    /// Source reported a unit outside the mapping.
    Unknown,
    /// Megawatt.
    MegaWatt,
}

impl fmt::Display for SampleUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SampleUnit::Unknown => f.write_str("Unknown"),
            SampleUnit::MegaWatt => f.write_str("MegaWatt"),
        }
    }
}

/// Metric semantics of a sample value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MetricType {
    /// Semantics unknown.
    Unknown,
    /// Monotonically increasing value.
    Counter,
    /// Point-in-time value.
    Gauge,
}

impl fmt::Display for MetricType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MetricType::Unknown => f.write_str("Unknown"),
            MetricType::Counter => f.write_str("Counter"),
            MetricType::Gauge => f.write_str("Gauge"),
        }
    }
}
