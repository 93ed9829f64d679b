//! CSV measurement sink.
//!
//! Appends one row per sample. The file is opened in append mode and the
//! header is only written when the file is new, so repeated runs keep
//! extending the same output. Every measurement is flushed before the call
//! returns: the caller checkpoints immediately after a successful insert,
//! and a buffered row lost in a crash would otherwise be skipped forever.

use crate::sink::{MeasurementSink, SinkError, SinkResult};
use crate::Measurement;
use async_trait::async_trait;
use csv::{Writer, WriterBuilder};
use serde::Serialize;
use std::fs::{File, OpenOptions};
use std::io::BufWriter;
use std::path::Path;
use std::sync::Mutex;
use tracing::{debug, info};

const DEFAULT_BUFFER_SIZE: usize = 8192; // 8KB buffer

const HEADER: [&str; 12] = [
    "measurement_id",
    "source",
    "area",
    "exchange_with_area",
    "measured_at_time",
    "energy_type",
    "original_energy_type",
    "is_renewable",
    "metric_type",
    "sample_direction",
    "sample_unit",
    "value",
];

/// CSV record for one sample of a measurement.
#[derive(Debug, Serialize)]
struct SampleRecord {
    measurement_id: String,
    source: String,
    area: String,
    exchange_with_area: String,
    measured_at_time: String,
    energy_type: String,
    original_energy_type: String,
    is_renewable: bool,
    metric_type: String,
    sample_direction: String,
    sample_unit: String,
    value: f64,
}

/// Appends measurements to a CSV file.
pub struct CsvMeasurementSink {
    writer: Mutex<Writer<BufWriter<File>>>,
}

impl CsvMeasurementSink {
    /// Open (or create) the output file for appending.
    pub fn new<P: AsRef<Path>>(path: P) -> SinkResult<Self> {
        let path = path.as_ref();
        info!(path = %path.display(), "Opening CSV measurement sink");

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| SinkError::Io(format!("failed to create directory: {e}")))?;
        }

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(|e| SinkError::Io(format!("failed to open file: {e}")))?;
        let is_new = file
            .metadata()
            .map_err(|e| SinkError::Io(e.to_string()))?
            .len()
            == 0;

        let mut writer = WriterBuilder::new()
            .has_headers(false)
            .from_writer(BufWriter::with_capacity(DEFAULT_BUFFER_SIZE, file));

        if is_new {
            writer
                .write_record(HEADER)
                .map_err(|e| SinkError::Csv(format!("failed to write header: {e}")))?;
        }

        Ok(Self {
            writer: Mutex::new(writer),
        })
    }
}

#[async_trait]
impl MeasurementSink for CsvMeasurementSink {
    async fn insert_measurement(&self, measurement: &Measurement) -> SinkResult<()> {
        let mut writer = self
            .writer
            .lock()
            .map_err(|_| SinkError::Io("sink writer lock poisoned".to_string()))?;

        for sample in &measurement.samples {
            let record = SampleRecord {
                measurement_id: measurement.id.clone(),
                source: measurement.source.clone(),
                area: measurement.area.clone(),
                exchange_with_area: measurement
                    .exchange_with_area
                    .clone()
                    .unwrap_or_default(),
                measured_at_time: measurement.measured_at_time.to_rfc3339(),
                energy_type: sample.energy_type.to_string(),
                original_energy_type: sample.original_energy_type.clone(),
                is_renewable: sample.is_renewable,
                metric_type: sample.metric_type.to_string(),
                sample_direction: sample.sample_direction.to_string(),
                sample_unit: sample.sample_unit.to_string(),
                value: sample.value,
            };
            writer
                .serialize(&record)
                .map_err(|e| SinkError::Csv(format!("failed to write sample: {e}")))?;
        }

        writer
            .flush()
            .map_err(|e| SinkError::Io(format!("failed to flush: {e}")))?;

        debug!(
            measurement_id = %measurement.id,
            samples = measurement.samples.len(),
            "Measurement appended to CSV sink"
        );
        Ok(())
    }
}
