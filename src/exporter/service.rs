//! The export service: drives the fetch/build/persist cycle per area.
//!
//! Areas run strictly sequentially, exchanges after their area. Sequential
//! execution keeps checkpoint writes serialized without extra coordination;
//! the per-area checkpoints would allow parallel areas, but nothing here
//! needs it. Within an area the invariant is per-slot: the checkpoint is
//! written only after the sink accepted the slot's measurement, so a retried
//! run re-attempts exactly the slots whose sink write never succeeded.

use crate::config::{AreaConfig, Config, ExchangeConfig};
use crate::entsoe::{EntsoeClient, EntsoeError, GenerationResponse, PhysicalFlowResponse};
use crate::exporter::measurement::{exchange_measurement_for_slot, generation_measurement_for_slot};
use crate::exporter::window::{next_window, LookBack};
use crate::exporter::ExportError;
use crate::metrics;
use crate::shutdown::SharedShutdown;
use crate::sink::MeasurementSink;
use crate::state::{State, StateClient};
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// Pause between request windows. A courtesy delay toward the source's rate
/// limits; the shutdown signal is polled for the whole pause.
const RATE_LIMIT_PAUSE: Duration = Duration::from_secs(15);

/// Wall-clock source. Injected so tests can pin the catch-up horizon.
pub type Clock = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

/// Orchestrates the export of all configured areas and exchange pairs.
pub struct ExportService {
    entsoe_client: Arc<dyn EntsoeClient>,
    sink: Arc<dyn MeasurementSink>,
    state_client: Arc<dyn StateClient>,
    shutdown: SharedShutdown,
    rate_limit_pause: Duration,
    clock: Clock,
}

impl ExportService {
    /// Create a new export service.
    pub fn new(
        entsoe_client: Arc<dyn EntsoeClient>,
        sink: Arc<dyn MeasurementSink>,
        state_client: Arc<dyn StateClient>,
        shutdown: SharedShutdown,
    ) -> Self {
        Self {
            entsoe_client,
            sink,
            state_client,
            shutdown,
            rate_limit_pause: RATE_LIMIT_PAUSE,
            clock: Arc::new(Utc::now),
        }
    }

    /// Override the pause between request windows.
    pub fn with_rate_limit_pause(mut self, pause: Duration) -> Self {
        self.rate_limit_pause = pause;
        self
    }

    /// Override the wall clock.
    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    /// Run one export pass over every configured area and exchange pair.
    ///
    /// Returns Ok when every area is caught up or a shutdown was requested;
    /// any source, sink, or state failure aborts the whole run.
    pub async fn run(&self, config: &Config) -> Result<(), ExportError> {
        let mut state = self.state_client.read_state()?.unwrap_or_default();

        for area_config in &config.areas {
            self.run_for_area(area_config, &mut state).await?;
            for exchange_config in &area_config.exchanges {
                self.run_for_exchange(area_config, exchange_config, &mut state)
                    .await?;
            }
        }

        Ok(())
    }

    /// Catch up one area's generation data.
    async fn run_for_area(
        &self,
        area_config: &AreaConfig,
        state: &mut State,
    ) -> Result<(), ExportError> {
        info!(
            area = %area_config.area,
            country = ?area_config.country,
            "Retrieving generation measurements for area"
        );

        loop {
            if self.shutdown.is_shutdown_requested() {
                warn!("Shutdown requested, not planning another window");
                return Ok(());
            }

            let now = (self.clock)();
            let Some(window) = next_window(
                area_config.resolution_minutes,
                look_back(area_config),
                state.last_generation(area_config.area),
                now,
            ) else {
                info!(area = %area_config.area, "Start and end are equal, exiting");
                return Ok(());
            };

            let response = match self
                .entsoe_client
                .get_aggregated_generation_per_type(area_config.area, &window)
                .await
            {
                Ok(response) => response,
                Err(EntsoeError::NoMatchingDataFound) => {
                    info!("No data has been found, exiting");
                    return Ok(());
                }
                Err(e) => return Err(e.into()),
            };
            metrics::record_window_fetched(area_config.area.country_code());

            if response.time_series.is_empty() {
                info!("No timeseries have been returned, exiting");
                return Ok(());
            }

            let nr_of_slots = response
                .time_period
                .slot_count(area_config.resolution_minutes);
            if nr_of_slots == 0 {
                info!("No new measurements were inserted, exiting");
                return Ok(());
            }

            for slot_index in 0..nr_of_slots {
                self.handle_generation_slot(&response, slot_index, area_config, state)
                    .await?;
            }

            if !self.pause_between_windows().await {
                return Ok(());
            }
        }
    }

    /// Catch up one cross-border exchange pair.
    async fn run_for_exchange(
        &self,
        area_config: &AreaConfig,
        exchange_config: &ExchangeConfig,
        state: &mut State,
    ) -> Result<(), ExportError> {
        info!(
            area = %area_config.area,
            exchange_with = %exchange_config.area,
            "Retrieving exchange measurements for area pair"
        );

        loop {
            if self.shutdown.is_shutdown_requested() {
                warn!("Shutdown requested, not planning another window");
                return Ok(());
            }

            let now = (self.clock)();
            let Some(window) = next_window(
                exchange_config.resolution_minutes,
                // Exchanges carry no look-back of their own; first runs
                // inherit the parent area's horizon.
                look_back(area_config),
                state.last_exchange(area_config.area, exchange_config.area),
                now,
            ) else {
                info!(area = %area_config.area, "Start and end are equal, exiting");
                return Ok(());
            };

            let response = match self
                .entsoe_client
                .get_physical_cross_border_flow(area_config.area, exchange_config.area, &window)
                .await
            {
                Ok(response) => response,
                Err(EntsoeError::NoMatchingDataFound) => {
                    info!("No data has been found, exiting");
                    return Ok(());
                }
                Err(e) => return Err(e.into()),
            };
            metrics::record_window_fetched(area_config.area.country_code());

            if response.time_series.is_empty() {
                info!("No timeseries have been returned, exiting");
                return Ok(());
            }

            let nr_of_slots = response
                .time_period
                .slot_count(exchange_config.resolution_minutes);
            if nr_of_slots == 0 {
                info!("No new measurements were inserted, exiting");
                return Ok(());
            }

            for slot_index in 0..nr_of_slots {
                self.handle_exchange_slot(&response, slot_index, area_config, exchange_config, state)
                    .await?;
            }

            if !self.pause_between_windows().await {
                return Ok(());
            }
        }
    }

    /// Build, persist, and checkpoint one generation slot.
    async fn handle_generation_slot(
        &self,
        response: &GenerationResponse,
        slot_index: i64,
        area_config: &AreaConfig,
        state: &mut State,
    ) -> Result<(), ExportError> {
        let slot_start = response.time_period.start
            + ChronoDuration::minutes(slot_index * i64::from(area_config.resolution_minutes));

        let measurement = generation_measurement_for_slot(response, slot_start, area_config);
        let sample_count = measurement.samples.len();

        self.sink.insert_measurement(&measurement).await?;

        state.record_generation(area_config.area, measurement.measured_at_time);
        self.state_client.store_state(state)?;

        metrics::record_measurement_inserted(&measurement.area, sample_count);
        Ok(())
    }

    /// Build, persist, and checkpoint one exchange slot.
    async fn handle_exchange_slot(
        &self,
        response: &PhysicalFlowResponse,
        slot_index: i64,
        area_config: &AreaConfig,
        exchange_config: &ExchangeConfig,
        state: &mut State,
    ) -> Result<(), ExportError> {
        let slot_start = response.time_period.start
            + ChronoDuration::minutes(slot_index * i64::from(exchange_config.resolution_minutes));

        let measurement =
            exchange_measurement_for_slot(response, slot_start, area_config, exchange_config);
        let sample_count = measurement.samples.len();

        self.sink.insert_measurement(&measurement).await?;

        state.record_exchange(
            area_config.area,
            exchange_config.area,
            measurement.measured_at_time,
        );
        self.state_client.store_state(state)?;

        metrics::record_measurement_inserted(&measurement.area, sample_count);
        Ok(())
    }

    /// Pause before the next window. Returns false when shutdown was
    /// requested during the pause and the caller should stop planning.
    async fn pause_between_windows(&self) -> bool {
        info!(
            pause_secs = self.rate_limit_pause.as_secs(),
            "Sleeping before retrieving more data, to avoid rate limiting"
        );
        tokio::select! {
            _ = self.shutdown.wait_for_shutdown() => {
                warn!("Shutdown requested, finishing without planning another window");
                false
            }
            _ = tokio::time::sleep(self.rate_limit_pause) => true,
        }
    }
}

/// First-run look-back horizon of an area.
fn look_back(area_config: &AreaConfig) -> LookBack {
    LookBack {
        years: area_config.start_years_ago,
        months: area_config.start_months_ago,
        days: area_config.start_days_ago,
    }
}
