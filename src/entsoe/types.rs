//! Wire types for the ENTSO-E transparency platform.
//!
//! Field renames follow the platform's XML element names verbatim
//! (`time_Period.timeInterval`, `inBiddingZone_Domain.mRID`, ...). Interval
//! timestamps use the platform's minute-precision layout `2021-01-01T00:00Z`,
//! which is not RFC 3339 and needs a custom (de)serializer.

use crate::SampleDirection;
use chrono::{DateTime, NaiveDateTime, Utc};
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// Timestamp layout used in interval elements and query parameters.
const TIME_INTERVAL_LAYOUT: &str = "%Y-%m-%dT%H:%MZ";

/// Bidding zone (EIC area code).
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub enum Area {
    /// Belgium.
    #[serde(rename = "10YBE----------2")]
    Belgium,
    /// Denmark (DK1).
    #[serde(rename = "10YDK-1--------W")]
    Denmark,
    /// Germany (DE-LU).
    #[serde(rename = "10Y1001A1001A83F")]
    Germany,
    /// Great Britain.
    #[serde(rename = "10YGB----------A")]
    GreatBritain,
    /// Netherlands.
    #[serde(rename = "10YNL----------L")]
    Netherlands,
    /// Norway (NO0).
    #[serde(rename = "10YNO-0--------C")]
    Norway,
    /// Any EIC code outside the supported set.
    #[default]
    #[serde(other)]
    Unknown,
}

impl Area {
    /// The EIC code as sent in query parameters. Empty for [`Area::Unknown`].
    pub fn as_eic_code(&self) -> &'static str {
        match self {
            Area::Belgium => "10YBE----------2",
            Area::Denmark => "10YDK-1--------W",
            Area::Germany => "10Y1001A1001A83F",
            Area::GreatBritain => "10YGB----------A",
            Area::Netherlands => "10YNL----------L",
            Area::Norway => "10YNO-0--------C",
            Area::Unknown => "",
        }
    }

    /// ISO country code for the zone. Empty for [`Area::Unknown`].
    pub fn country_code(&self) -> &'static str {
        match self {
            Area::Belgium => "BE",
            Area::Denmark => "DK",
            Area::Germany => "DE",
            Area::GreatBritain => "GB",
            Area::Netherlands => "NL",
            Area::Norway => "NO",
            Area::Unknown => "",
        }
    }
}

impl fmt::Display for Area {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_eic_code())
    }
}

/// An exclusive-end `[start, end)` pair of UTC timestamps.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeInterval {
    /// Inclusive start.
    pub start: DateTime<Utc>,
    /// Exclusive end.
    pub end: DateTime<Utc>,
}

impl TimeInterval {
    /// Render as the `start/end` form used in query parameters.
    pub fn format_as_parameter(&self) -> String {
        format!(
            "{}/{}",
            self.start.format(TIME_INTERVAL_LAYOUT),
            self.end.format(TIME_INTERVAL_LAYOUT)
        )
    }

    /// Number of whole slots of `resolution_minutes` the interval covers.
    pub fn slot_count(&self, resolution_minutes: u32) -> i64 {
        if resolution_minutes == 0 {
            return 0;
        }
        (self.end - self.start).num_minutes() / i64::from(resolution_minutes)
    }
}

fn parse_interval_time(value: &str) -> Result<DateTime<Utc>, chrono::ParseError> {
    NaiveDateTime::parse_from_str(value, TIME_INTERVAL_LAYOUT).map(|t| t.and_utc())
}

impl<'de> Deserialize<'de> for TimeInterval {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        struct Raw {
            start: String,
            end: String,
        }
        let raw = Raw::deserialize(deserializer)?;
        Ok(TimeInterval {
            start: parse_interval_time(&raw.start).map_err(D::Error::custom)?,
            end: parse_interval_time(&raw.end).map_err(D::Error::custom)?,
        })
    }
}

impl Serialize for TimeInterval {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        #[derive(Serialize)]
        struct Raw {
            start: String,
            end: String,
        }
        Raw {
            start: self.start.format(TIME_INTERVAL_LAYOUT).to_string(),
            end: self.end.format(TIME_INTERVAL_LAYOUT).to_string(),
        }
        .serialize(serializer)
    }
}

/// Unit reported on a source series.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum MeasurementUnit {
    /// Megawatt. The platform spells it `MAW`.
    #[serde(rename = "MAW")]
    MegaWatt,
    /// Unit missing or outside the mapping.
    #[default]
    #[serde(other)]
    Unknown,
}

impl MeasurementUnit {
    /// Map to the normalized sample unit. Total: unmapped units become
    /// [`crate::SampleUnit::Unknown`].
    pub fn sample_unit(&self) -> crate::SampleUnit {
        match self {
            MeasurementUnit::MegaWatt => crate::SampleUnit::MegaWatt,
            MeasurementUnit::Unknown => crate::SampleUnit::Unknown,
        }
    }
}

/// Declared resolution of a series period.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Resolution {
    /// Quarter-hourly points.
    #[serde(rename = "PT15M")]
    Pt15M,
    /// Hourly points.
    #[serde(rename = "PT60M")]
    Pt60M,
    /// Resolution missing or outside the mapping.
    #[default]
    #[serde(other)]
    Unknown,
}

/// One `(position, quantity)` point within a series period.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SeriesPoint {
    /// 1-based position within the period.
    pub position: u32,
    /// The reported quantity.
    pub quantity: f64,
}

/// The period of a series: its interval, resolution, and points.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeriesPeriod {
    /// Interval the points cover, exclusive end.
    #[serde(rename = "timeInterval")]
    pub time_interval: TimeInterval,
    /// Declared point resolution.
    #[serde(rename = "resolution", default)]
    pub resolution: Resolution,
    /// Ordered points. Positions are 1-based and increase without gaps in
    /// the common case; a period may carry fewer points than its interval
    /// implies.
    #[serde(rename = "Point", default)]
    pub points: Vec<SeriesPoint>,
}

/// Production-type wrapper element.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MktPsrType {
    /// Raw production-type code, e.g. `B16` for solar.
    #[serde(rename = "psrType", default)]
    pub psr_type: String,
}

/// Aggregated generation per type, for one requested zone and window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationResponse {
    /// Document type, `A75` for actual generation per type.
    #[serde(rename = "type", default)]
    pub document_type: String,
    /// Process type, `A16` for realised values.
    #[serde(rename = "process.processType", default)]
    pub process_type: String,
    /// The window the platform actually answered for.
    #[serde(rename = "time_Period.timeInterval")]
    pub time_period: TimeInterval,
    /// One series per production type and direction.
    #[serde(rename = "TimeSeries", default)]
    pub time_series: Vec<GenerationTimeSeries>,
}

/// One generation series: a production type, a direction marker, and points.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationTimeSeries {
    /// Series identifier within the document.
    #[serde(rename = "mRID", default)]
    pub m_rid: i64,
    /// Present when the series reflects generation into the zone.
    #[serde(rename = "inBiddingZone_Domain.mRID")]
    pub in_bidding_zone: Option<Area>,
    /// Present when the series reflects consumption out of the zone.
    #[serde(rename = "outBiddingZone_Domain.mRID")]
    pub out_bidding_zone: Option<Area>,
    /// Unit of the quantities.
    #[serde(rename = "quantity_Measure_Unit.name", default)]
    pub quantity_measurement_unit: MeasurementUnit,
    /// Production-type classification.
    #[serde(rename = "MktPSRType", default)]
    pub mkt_psr_type: MktPsrType,
    /// The series' interval and points.
    #[serde(rename = "Period")]
    pub period: SeriesPeriod,
}

impl GenerationTimeSeries {
    /// Direction of the series, derived from which zone marker is present.
    /// The markers are mutually exclusive by platform convention; when both
    /// are absent the direction is unknown.
    pub fn direction(&self) -> SampleDirection {
        if self.in_bidding_zone.is_some() {
            SampleDirection::In
        } else if self.out_bidding_zone.is_some() {
            SampleDirection::Out
        } else {
            SampleDirection::Unknown
        }
    }
}

/// Physical cross-border flows between two zones.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhysicalFlowResponse {
    /// The window the platform actually answered for.
    #[serde(rename = "period.timeInterval")]
    pub time_period: TimeInterval,
    /// One series per flow direction.
    #[serde(rename = "TimeSeries", default)]
    pub time_series: Vec<PhysicalFlowTimeSeries>,
}

/// One physical-flow series between an out-zone and an in-zone.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhysicalFlowTimeSeries {
    /// Series identifier within the document.
    #[serde(rename = "mRID", default)]
    pub m_rid: i64,
    /// Zone the energy flows into.
    #[serde(rename = "in_Domain.mRID")]
    pub in_domain: Option<Area>,
    /// Zone the energy flows out of.
    #[serde(rename = "out_Domain.mRID")]
    pub out_domain: Option<Area>,
    /// Unit of the quantities.
    #[serde(rename = "quantity_Measure_Unit.name", default)]
    pub quantity_measurement_unit: MeasurementUnit,
    /// The series' interval and points.
    #[serde(rename = "Period")]
    pub period: SeriesPeriod,
}

impl PhysicalFlowTimeSeries {
    /// Direction of the flow relative to `home`: import is `In`, export is
    /// `Out`, a series touching neither domain is `Unknown`.
    pub fn direction_for(&self, home: Area) -> SampleDirection {
        if self.in_domain == Some(home) {
            SampleDirection::In
        } else if self.out_domain == Some(home) {
            SampleDirection::Out
        } else {
            SampleDirection::Unknown
        }
    }
}
