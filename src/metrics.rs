//! Observability metrics for the export loop.
//!
//! Uses the `metrics` facade for low-overhead collection; an embedding
//! process can install whatever recorder fits its environment. Without a
//! recorder the macros are no-ops, which is the right default for a
//! run-to-completion batch job.

use metrics::{counter, describe_counter, describe_histogram, histogram, Unit};

/// Measurements successfully handed to the sink.
pub const MEASUREMENTS_INSERTED: &str = "exporter_measurements_inserted_total";

/// Samples carried per inserted measurement.
pub const SAMPLES_PER_MEASUREMENT: &str = "exporter_samples_per_measurement";

/// Request windows fetched from the source.
pub const WINDOWS_FETCHED: &str = "exporter_windows_fetched_total";

/// Series skipped for a slot because they carried fewer points than declared.
pub const SHORT_SERIES_SKIPPED: &str = "exporter_short_series_skipped_total";

/// Register metric descriptions.
///
/// Call once at startup; safe to skip when no recorder is installed.
pub fn describe_metrics() {
    describe_counter!(
        MEASUREMENTS_INSERTED,
        Unit::Count,
        "Total number of measurements handed to the sink"
    );
    describe_histogram!(
        SAMPLES_PER_MEASUREMENT,
        Unit::Count,
        "Number of samples carried per inserted measurement"
    );
    describe_counter!(
        WINDOWS_FETCHED,
        Unit::Count,
        "Total number of request windows fetched from the source"
    );
    describe_counter!(
        SHORT_SERIES_SKIPPED,
        Unit::Count,
        "Total number of series skipped for a slot due to missing points"
    );
}

/// Record one inserted measurement and its sample count.
pub fn record_measurement_inserted(area: &str, sample_count: usize) {
    counter!(MEASUREMENTS_INSERTED, "area" => area.to_string()).increment(1);
    histogram!(SAMPLES_PER_MEASUREMENT).record(sample_count as f64);
}

/// Record one fetched request window.
pub fn record_window_fetched(area: &str) {
    counter!(WINDOWS_FETCHED, "area" => area.to_string()).increment(1);
}

/// Record a series skipped for a slot because it was short.
pub fn record_short_series_skipped() {
    counter!(SHORT_SERIES_SKIPPED).increment(1);
}
