//! Run command implementation

use crate::cli::CliError;
use crate::config;
use crate::entsoe::EntsoeHttpClient;
use crate::exporter::ExportService;
use crate::shutdown::SharedShutdown;
use crate::sink::CsvMeasurementSink;
use crate::state::FileStateClient;
use clap::Args;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

/// Arguments for the `run` command.
#[derive(Debug, Args)]
pub struct RunArgs {
    /// Path to the YAML config file listing areas to export
    #[arg(long, env = "CONFIG_PATH", default_value = "config.yaml")]
    pub config_path: PathBuf,

    /// Path of the JSON file holding the last-retrieved state
    #[arg(long, env = "STATE_FILE_PATH", default_value = "last-measurement.json")]
    pub state_file_path: PathBuf,

    /// Path of the CSV file measurements are appended to
    #[arg(long, env = "OUTPUT_PATH", default_value = "measurements.csv")]
    pub output_path: PathBuf,

    /// API token for the ENTSO-E transparency platform
    #[arg(long, env = "ENTSOE_TOKEN", hide_env_values = true)]
    pub entsoe_token: String,

    /// Seconds to pause between request windows
    #[arg(long, default_value_t = 15)]
    pub rate_limit_pause_secs: u64,
}

impl RunArgs {
    /// Execute one export pass over all configured areas.
    pub async fn execute(&self, shutdown: SharedShutdown) -> Result<(), CliError> {
        let config = config::load_config(&self.config_path)?;

        let entsoe_client = Arc::new(EntsoeHttpClient::new(self.entsoe_token.as_str())?);
        let sink = Arc::new(CsvMeasurementSink::new(&self.output_path)?);
        let state_client = Arc::new(FileStateClient::new(&self.state_file_path));

        let service = ExportService::new(entsoe_client, sink, state_client, shutdown)
            .with_rate_limit_pause(Duration::from_secs(self.rate_limit_pause_secs));

        service.run(&config).await?;

        info!("Export pass finished");
        Ok(())
    }
}
