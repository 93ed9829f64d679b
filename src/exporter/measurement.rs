//! Builds one normalized measurement per time slot from a source response.
//!
//! A slot collects one sample from every series whose interval covers the
//! slot's start. Series run on their own intervals within the response, so a
//! series can start later or end earlier than the response window; those
//! simply contribute nothing to slots outside their range. A series that
//! declares an interval but ships fewer points is skipped for the affected
//! slots with a warning: one degraded series must not block ingestion of
//! the others.

use crate::config::{AreaConfig, ExchangeConfig};
use crate::entsoe::{GenerationResponse, PhysicalFlowResponse, TimeInterval};
use crate::{metrics, EnergyType, Measurement, MetricType, Sample, SOURCE_ENTSOE};
use chrono::{DateTime, Utc};
use tracing::warn;
use uuid::Uuid;

/// Index of the point covering `slot_start`, or `None` when the series'
/// interval does not cover the slot at all. The end is exclusive: a series
/// ending exactly at the slot start contributes nothing to that slot.
fn point_index_for_slot(
    series_interval: &TimeInterval,
    slot_start: DateTime<Utc>,
    resolution_minutes: u32,
) -> Option<usize> {
    if series_interval.start > slot_start || series_interval.end <= slot_start {
        return None;
    }
    let minutes = (slot_start - series_interval.start).num_minutes();
    Some((minutes / i64::from(resolution_minutes)) as usize)
}

/// Build the generation measurement for one time slot.
///
/// Sample order follows source series order; it carries no meaning but keeps
/// output reproducible.
pub fn generation_measurement_for_slot(
    response: &GenerationResponse,
    slot_start: DateTime<Utc>,
    area_config: &AreaConfig,
) -> Measurement {
    let mut measurement = Measurement {
        id: Uuid::new_v4().to_string(),
        source: SOURCE_ENTSOE.to_string(),
        area: area_config.area.country_code().to_string(),
        exchange_with_area: None,
        samples: Vec::new(),
        measured_at_time: slot_start,
    };

    for series in &response.time_series {
        let Some(index) = point_index_for_slot(
            &series.period.time_interval,
            slot_start,
            area_config.resolution_minutes,
        ) else {
            continue;
        };

        match series.period.points.get(index) {
            Some(point) => {
                let energy_type = EnergyType::from_psr_code(&series.mkt_psr_type.psr_type);
                measurement.samples.push(Sample {
                    energy_type,
                    original_energy_type: series.mkt_psr_type.psr_type.clone(),
                    is_renewable: energy_type.is_renewable(),
                    metric_type: MetricType::Gauge,
                    sample_direction: series.direction(),
                    sample_unit: series.quantity_measurement_unit.sample_unit(),
                    value: point.quantity,
                });
            }
            None => {
                // Undocumented source behavior; skipping just this series
                // for this slot is a policy choice, not a source contract.
                warn!(
                    series = series.m_rid,
                    psr_type = %series.mkt_psr_type.psr_type,
                    points = series.period.points.len(),
                    index,
                    "Series has fewer points than its interval implies, skipping it for this slot"
                );
                metrics::record_short_series_skipped();
            }
        }
    }

    measurement
}

/// Build the cross-border flow measurement for one time slot.
///
/// Flow series carry no production type; their samples classify as
/// [`EnergyType::Unknown`] and keep an empty audit code. Direction is
/// derived relative to the home area.
pub fn exchange_measurement_for_slot(
    response: &PhysicalFlowResponse,
    slot_start: DateTime<Utc>,
    area_config: &AreaConfig,
    exchange_config: &ExchangeConfig,
) -> Measurement {
    let mut measurement = Measurement {
        id: Uuid::new_v4().to_string(),
        source: SOURCE_ENTSOE.to_string(),
        area: area_config.area.country_code().to_string(),
        exchange_with_area: Some(exchange_config.area.country_code().to_string()),
        samples: Vec::new(),
        measured_at_time: slot_start,
    };

    for series in &response.time_series {
        let Some(index) = point_index_for_slot(
            &series.period.time_interval,
            slot_start,
            exchange_config.resolution_minutes,
        ) else {
            continue;
        };

        match series.period.points.get(index) {
            Some(point) => {
                measurement.samples.push(Sample {
                    energy_type: EnergyType::Unknown,
                    original_energy_type: String::new(),
                    is_renewable: false,
                    metric_type: MetricType::Gauge,
                    sample_direction: series.direction_for(area_config.area),
                    sample_unit: series.quantity_measurement_unit.sample_unit(),
                    value: point.quantity,
                });
            }
            None => {
                warn!(
                    series = series.m_rid,
                    points = series.period.points.len(),
                    index,
                    "Flow series has fewer points than its interval implies, skipping it for this slot"
                );
                metrics::record_short_series_skipped();
            }
        }
    }

    measurement
}
