//! Integration tests for the export service loop.
//!
//! Collaborators are scripted in memory: the source client pops prepared
//! responses, the sink records every measurement, the state client keeps the
//! checkpoint history so tests can assert it advanced slot by slot.

use async_trait::async_trait;
use chrono::{DateTime, Duration as ChronoDuration, TimeZone, Utc};
use electricity_mix_exporter::config::{AreaConfig, Config, CountryCode, ExchangeConfig, Source};
use electricity_mix_exporter::entsoe::{
    Area, EntsoeClient, EntsoeError, EntsoeResult, GenerationResponse, GenerationTimeSeries,
    MeasurementUnit, MktPsrType, PhysicalFlowResponse, PhysicalFlowTimeSeries, Resolution,
    SeriesPeriod, SeriesPoint, TimeInterval,
};
use electricity_mix_exporter::exporter::{ExportError, ExportService};
use electricity_mix_exporter::shutdown::{ShutdownCoordinator, SharedShutdown};
use electricity_mix_exporter::sink::{MeasurementSink, SinkError, SinkResult};
use electricity_mix_exporter::state::{State, StateClient, StateError};
use electricity_mix_exporter::{Measurement, SampleDirection};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

// ─── Scripted collaborators ──────────────────────────────────────────────────

/// Source client that pops prepared responses and records every request.
#[derive(Default)]
struct ScriptedEntsoeClient {
    generation: Mutex<VecDeque<EntsoeResult<GenerationResponse>>>,
    flows: Mutex<VecDeque<EntsoeResult<PhysicalFlowResponse>>>,
    requests: Mutex<Vec<(Area, TimeInterval)>>,
}

impl ScriptedEntsoeClient {
    fn push_generation(&self, response: EntsoeResult<GenerationResponse>) {
        self.generation.lock().unwrap().push_back(response);
    }

    fn push_flow(&self, response: EntsoeResult<PhysicalFlowResponse>) {
        self.flows.lock().unwrap().push_back(response);
    }

    fn requests(&self) -> Vec<(Area, TimeInterval)> {
        self.requests.lock().unwrap().clone()
    }

    fn remaining_generation(&self) -> usize {
        self.generation.lock().unwrap().len()
    }
}

#[async_trait]
impl EntsoeClient for ScriptedEntsoeClient {
    async fn get_aggregated_generation_per_type(
        &self,
        area: Area,
        time_interval: &TimeInterval,
    ) -> EntsoeResult<GenerationResponse> {
        self.requests.lock().unwrap().push((area, *time_interval));
        self.generation
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Err(EntsoeError::NoMatchingDataFound))
    }

    async fn get_physical_cross_border_flow(
        &self,
        in_area: Area,
        _out_area: Area,
        time_interval: &TimeInterval,
    ) -> EntsoeResult<PhysicalFlowResponse> {
        self.requests.lock().unwrap().push((in_area, *time_interval));
        self.flows
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Err(EntsoeError::NoMatchingDataFound))
    }
}

/// Sink that records measurements, optionally failing from the n-th insert,
/// optionally raising the shutdown signal after the n-th insert.
#[derive(Default)]
struct RecordingSink {
    measurements: Mutex<Vec<Measurement>>,
    fail_from: Option<usize>,
    shutdown_after: Option<(usize, SharedShutdown)>,
}

impl RecordingSink {
    fn measurements(&self) -> Vec<Measurement> {
        self.measurements.lock().unwrap().clone()
    }
}

#[async_trait]
impl MeasurementSink for RecordingSink {
    async fn insert_measurement(&self, measurement: &Measurement) -> SinkResult<()> {
        let mut measurements = self.measurements.lock().unwrap();
        if let Some(fail_from) = self.fail_from {
            if measurements.len() >= fail_from {
                return Err(SinkError::Io("sink unavailable".to_string()));
            }
        }
        measurements.push(measurement.clone());
        if let Some((after, shutdown)) = &self.shutdown_after {
            if measurements.len() >= *after {
                shutdown.request_shutdown();
            }
        }
        Ok(())
    }
}

/// State client that keeps the full history of stored states.
#[derive(Default)]
struct MemoryStateClient {
    state: Mutex<Option<State>>,
    history: Mutex<Vec<State>>,
}

impl MemoryStateClient {
    fn with_state(state: State) -> Self {
        Self {
            state: Mutex::new(Some(state)),
            history: Mutex::default(),
        }
    }

    fn current(&self) -> Option<State> {
        self.state.lock().unwrap().clone()
    }

    fn history(&self) -> Vec<State> {
        self.history.lock().unwrap().clone()
    }
}

impl StateClient for MemoryStateClient {
    fn read_state(&self) -> Result<Option<State>, StateError> {
        Ok(self.state.lock().unwrap().clone())
    }

    fn store_state(&self, state: &State) -> Result<(), StateError> {
        *self.state.lock().unwrap() = Some(state.clone());
        self.history.lock().unwrap().push(state.clone());
        Ok(())
    }
}

// ─── Fixture helpers ─────────────────────────────────────────────────────────

fn utc(y: i32, mo: u32, d: u32, h: u32, mi: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(y, mo, d, h, mi, 0).unwrap()
}

fn netherlands_config() -> AreaConfig {
    AreaConfig {
        area: Area::Netherlands,
        country: CountryCode::NL,
        source: Source::Entsoe,
        resolution_minutes: 15,
        start_days_ago: 3,
        ..AreaConfig::default()
    }
}

fn config_with(areas: Vec<AreaConfig>) -> Config {
    Config { areas }
}

/// One generation series with `point_count` quarter-hour points from `start`.
fn generation_series(psr_type: &str, start: DateTime<Utc>, point_count: usize) -> GenerationTimeSeries {
    GenerationTimeSeries {
        m_rid: 1,
        in_bidding_zone: Some(Area::Netherlands),
        out_bidding_zone: None,
        quantity_measurement_unit: MeasurementUnit::MegaWatt,
        mkt_psr_type: MktPsrType {
            psr_type: psr_type.to_string(),
        },
        period: SeriesPeriod {
            time_interval: TimeInterval {
                start,
                end: start + ChronoDuration::minutes(15 * point_count as i64),
            },
            resolution: Resolution::Pt15M,
            points: (0..point_count)
                .map(|i| SeriesPoint {
                    position: (i + 1) as u32,
                    quantity: 100.0 + i as f64,
                })
                .collect(),
        },
    }
}

/// A 24-hour response with 19 fully populated series (codes B01..B19).
fn full_day_response(start: DateTime<Utc>) -> GenerationResponse {
    let series = (1..=19)
        .map(|i| generation_series(&format!("B{i:02}"), start, 96))
        .collect();
    GenerationResponse {
        document_type: "A75".to_string(),
        process_type: "A16".to_string(),
        time_period: TimeInterval {
            start,
            end: start + ChronoDuration::days(1),
        },
        time_series: series,
    }
}

struct Harness {
    client: Arc<ScriptedEntsoeClient>,
    sink: Arc<RecordingSink>,
    state_client: Arc<MemoryStateClient>,
    service: ExportService,
}

fn harness(
    client: ScriptedEntsoeClient,
    sink: RecordingSink,
    state_client: MemoryStateClient,
    now: DateTime<Utc>,
) -> Harness {
    let client = Arc::new(client);
    let sink = Arc::new(sink);
    let state_client = Arc::new(state_client);
    let shutdown = ShutdownCoordinator::shared();
    let service = ExportService::new(
        client.clone(),
        sink.clone(),
        state_client.clone(),
        shutdown.clone(),
    )
    .with_rate_limit_pause(Duration::from_millis(1))
    .with_clock(Arc::new(move || now));
    Harness {
        client,
        sink,
        state_client,
        service,
    }
}

// ─── Scenarios ───────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_full_day_catch_up_persists_every_slot() {
    let now = utc(2021, 1, 4, 0, 0);
    let response_start = utc(2021, 1, 1, 0, 0);

    let client = ScriptedEntsoeClient::default();
    client.push_generation(Ok(full_day_response(response_start)));
    client.push_generation(Err(EntsoeError::NoMatchingDataFound));

    let h = harness(client, RecordingSink::default(), MemoryStateClient::default(), now);
    h.service
        .run(&config_with(vec![netherlands_config()]))
        .await
        .unwrap();

    // Exactly 96 measurements, 19 samples each, in slot order.
    let measurements = h.sink.measurements();
    assert_eq!(measurements.len(), 96);
    for (i, m) in measurements.iter().enumerate() {
        assert_eq!(
            m.measured_at_time,
            response_start + ChronoDuration::minutes(15 * i as i64),
            "slot {i}"
        );
        assert_eq!(m.samples.len(), 19, "slot {i}");
        assert_eq!(m.area, "NL");
        assert_eq!(m.exchange_with_area, None);
    }

    // First request covers the 3-day look-back up to the truncated now.
    let requests = h.client.requests();
    assert_eq!(requests.len(), 2);
    assert_eq!(requests[0].1.start, utc(2021, 1, 1, 0, 0));
    assert_eq!(requests[0].1.end, now);
    // Second request resumes one slot after the checkpoint.
    assert_eq!(requests[1].1.start, utc(2021, 1, 2, 0, 0));

    // Checkpoint was written after every slot and advanced one resolution
    // unit at a time, never regressing.
    let history = h.state_client.history();
    assert_eq!(history.len(), 96);
    for (i, state) in history.iter().enumerate() {
        assert_eq!(
            state.last_generation(Area::Netherlands),
            Some(response_start + ChronoDuration::minutes(15 * i as i64)),
            "write {i}"
        );
    }
    assert_eq!(
        h.state_client.current().unwrap().last_generation(Area::Netherlands),
        Some(utc(2021, 1, 1, 23, 45))
    );
}

#[tokio::test]
async fn test_short_series_degrades_only_its_own_slots() {
    let now = utc(2021, 1, 4, 0, 0);
    let response_start = utc(2021, 1, 1, 0, 0);

    let mut response = full_day_response(response_start);
    // One series ships only 92 of the 96 declared points.
    response.time_series[4].period.points.truncate(92);

    let client = ScriptedEntsoeClient::default();
    client.push_generation(Ok(response));
    client.push_generation(Err(EntsoeError::NoMatchingDataFound));

    let h = harness(client, RecordingSink::default(), MemoryStateClient::default(), now);
    h.service
        .run(&config_with(vec![netherlands_config()]))
        .await
        .unwrap();

    let measurements = h.sink.measurements();
    assert_eq!(measurements.len(), 96);
    for (i, m) in measurements.iter().enumerate() {
        let expected = if i < 92 { 19 } else { 18 };
        assert_eq!(m.samples.len(), expected, "slot {i}");
    }
    // The degraded series (B05) is absent from the affected slots only.
    assert!(measurements[91]
        .samples
        .iter()
        .any(|s| s.original_energy_type == "B05"));
    assert!(!measurements[92]
        .samples
        .iter()
        .any(|s| s.original_energy_type == "B05"));
}

#[tokio::test]
async fn test_caught_up_checkpoint_issues_no_fetch() {
    let now = utc(2021, 1, 4, 0, 0);

    let mut state = State::default();
    state.record_generation(Area::Netherlands, now - ChronoDuration::minutes(15));

    let h = harness(
        ScriptedEntsoeClient::default(),
        RecordingSink::default(),
        MemoryStateClient::with_state(state),
        now,
    );
    h.service
        .run(&config_with(vec![netherlands_config()]))
        .await
        .unwrap();

    assert!(h.client.requests().is_empty());
    assert!(h.sink.measurements().is_empty());
    assert!(h.state_client.history().is_empty());
}

#[tokio::test]
async fn test_sink_failure_aborts_and_freezes_checkpoint() {
    let now = utc(2021, 1, 4, 0, 0);
    let response_start = utc(2021, 1, 1, 0, 0);

    let client = ScriptedEntsoeClient::default();
    client.push_generation(Ok(full_day_response(response_start)));

    let sink = RecordingSink {
        fail_from: Some(10),
        ..RecordingSink::default()
    };

    let h = harness(client, sink, MemoryStateClient::default(), now);
    let result = h.service.run(&config_with(vec![netherlands_config()])).await;

    assert!(matches!(result, Err(ExportError::Sink(_))));

    // Ten slots made it into the sink; the checkpoint stops at the last one
    // whose write succeeded, so a retried run re-attempts slot 10.
    assert_eq!(h.sink.measurements().len(), 10);
    assert_eq!(h.state_client.history().len(), 10);
    assert_eq!(
        h.state_client.current().unwrap().last_generation(Area::Netherlands),
        Some(response_start + ChronoDuration::minutes(15 * 9))
    );
}

#[tokio::test]
async fn test_shutdown_during_pause_stops_before_next_window() {
    let now = utc(2021, 1, 4, 0, 0);
    let response_start = utc(2021, 1, 1, 0, 0);
    let shutdown = ShutdownCoordinator::shared();

    let client = ScriptedEntsoeClient::default();
    client.push_generation(Ok(full_day_response(response_start)));
    // A second window is scripted but must never be fetched.
    client.push_generation(Ok(full_day_response(utc(2021, 1, 2, 0, 0))));

    let sink = RecordingSink {
        shutdown_after: Some((96, shutdown.clone())),
        ..RecordingSink::default()
    };

    let client = Arc::new(client);
    let sink = Arc::new(sink);
    let state_client = Arc::new(MemoryStateClient::default());
    let service = ExportService::new(
        client.clone(),
        sink.clone(),
        state_client.clone(),
        shutdown,
    )
    .with_rate_limit_pause(Duration::from_secs(30))
    .with_clock(Arc::new(move || now));

    // Returns promptly despite the long pause: success, not an error.
    service
        .run(&config_with(vec![netherlands_config()]))
        .await
        .unwrap();

    // The slot in flight finished, nothing new was planned.
    assert_eq!(sink.measurements().len(), 96);
    assert_eq!(client.requests().len(), 1);
    assert_eq!(client.remaining_generation(), 1);
}

#[tokio::test]
async fn test_zero_series_response_ends_the_pass() {
    let now = utc(2021, 1, 4, 0, 0);
    let client = ScriptedEntsoeClient::default();
    client.push_generation(Ok(GenerationResponse {
        document_type: "A75".to_string(),
        process_type: "A16".to_string(),
        time_period: TimeInterval {
            start: utc(2021, 1, 1, 0, 0),
            end: utc(2021, 1, 2, 0, 0),
        },
        time_series: Vec::new(),
    }));

    let h = harness(client, RecordingSink::default(), MemoryStateClient::default(), now);
    h.service
        .run(&config_with(vec![netherlands_config()]))
        .await
        .unwrap();

    assert_eq!(h.client.requests().len(), 1);
    assert!(h.sink.measurements().is_empty());
}

#[tokio::test]
async fn test_source_transport_error_is_fatal() {
    let now = utc(2021, 1, 4, 0, 0);
    let client = ScriptedEntsoeClient::default();
    client.push_generation(Err(EntsoeError::UnexpectedStatus { status: 503 }));

    let h = harness(client, RecordingSink::default(), MemoryStateClient::default(), now);
    let result = h.service.run(&config_with(vec![netherlands_config()])).await;

    assert!(matches!(result, Err(ExportError::Source(_))));
    assert!(h.sink.measurements().is_empty());
}

#[tokio::test]
async fn test_exchange_pair_runs_after_generation() {
    let now = utc(2021, 1, 4, 0, 0);
    let flow_start = utc(2021, 1, 1, 0, 0);

    let mut area = netherlands_config();
    area.exchanges = vec![ExchangeConfig {
        area: Area::Belgium,
        country: CountryCode::BE,
        source: Source::Entsoe,
        resolution_minutes: 60,
    }];

    let client = ScriptedEntsoeClient::default();
    // Generation is already exhausted at the source.
    client.push_generation(Err(EntsoeError::NoMatchingDataFound));
    client.push_flow(Ok(PhysicalFlowResponse {
        time_period: TimeInterval {
            start: flow_start,
            end: flow_start + ChronoDuration::days(1),
        },
        time_series: vec![PhysicalFlowTimeSeries {
            m_rid: 1,
            in_domain: Some(Area::Netherlands),
            out_domain: Some(Area::Belgium),
            quantity_measurement_unit: MeasurementUnit::MegaWatt,
            period: SeriesPeriod {
                time_interval: TimeInterval {
                    start: flow_start,
                    end: flow_start + ChronoDuration::days(1),
                },
                resolution: Resolution::Pt60M,
                points: (0..24)
                    .map(|i| SeriesPoint {
                        position: (i + 1) as u32,
                        quantity: 250.0 + i as f64,
                    })
                    .collect(),
            },
        }],
    }));
    client.push_flow(Err(EntsoeError::NoMatchingDataFound));

    let h = harness(client, RecordingSink::default(), MemoryStateClient::default(), now);
    h.service.run(&config_with(vec![area])).await.unwrap();

    let measurements = h.sink.measurements();
    assert_eq!(measurements.len(), 24);
    for (i, m) in measurements.iter().enumerate() {
        assert_eq!(m.area, "NL");
        assert_eq!(m.exchange_with_area.as_deref(), Some("BE"));
        assert_eq!(
            m.measured_at_time,
            flow_start + ChronoDuration::minutes(60 * i as i64)
        );
        assert_eq!(m.samples.len(), 1);
        assert_eq!(m.samples[0].sample_direction, SampleDirection::In);
        assert_eq!(m.samples[0].value, 250.0 + i as f64);
    }

    // The exchange checkpoint advanced; the generation one never moved.
    let state = h.state_client.current().unwrap();
    assert_eq!(state.last_generation(Area::Netherlands), None);
    assert_eq!(
        state.last_exchange(Area::Netherlands, Area::Belgium),
        Some(flow_start + ChronoDuration::minutes(60 * 23))
    );
}

#[tokio::test]
async fn test_areas_run_sequentially_in_config_order() {
    let now = utc(2021, 1, 4, 0, 0);

    let mut belgium = netherlands_config();
    belgium.area = Area::Belgium;
    belgium.country = CountryCode::BE;

    let client = ScriptedEntsoeClient::default();
    client.push_generation(Err(EntsoeError::NoMatchingDataFound));
    client.push_generation(Err(EntsoeError::NoMatchingDataFound));

    let h = harness(client, RecordingSink::default(), MemoryStateClient::default(), now);
    h.service
        .run(&config_with(vec![netherlands_config(), belgium]))
        .await
        .unwrap();

    let areas: Vec<Area> = h.client.requests().iter().map(|(a, _)| *a).collect();
    assert_eq!(areas, vec![Area::Netherlands, Area::Belgium]);
}

#[tokio::test]
async fn test_pre_requested_shutdown_plans_nothing() {
    let now = utc(2021, 1, 4, 0, 0);
    let client = Arc::new(ScriptedEntsoeClient::default());
    let sink = Arc::new(RecordingSink::default());
    let state_client = Arc::new(MemoryStateClient::default());
    let shutdown = ShutdownCoordinator::shared();
    shutdown.request_shutdown();

    let service = ExportService::new(
        client.clone(),
        sink.clone(),
        state_client.clone(),
        shutdown,
    )
    .with_clock(Arc::new(move || now));

    service
        .run(&config_with(vec![netherlands_config()]))
        .await
        .unwrap();
    assert!(client.requests().is_empty());
}
