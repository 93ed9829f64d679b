//! Validate command implementation

use crate::cli::CliError;
use crate::config::{Config, ConfigError};
use clap::Args;
use std::path::PathBuf;
use tracing::{error, info, warn};

/// Arguments for the `validate` command.
#[derive(Debug, Args)]
pub struct ValidateArgs {
    /// Path to the YAML config file to validate
    #[arg(long, env = "CONFIG_PATH", default_value = "config.yaml")]
    pub config_path: PathBuf,
}

impl ValidateArgs {
    /// Validate the config file, reporting every error and warning.
    pub async fn execute(&self) -> Result<(), CliError> {
        let contents =
            std::fs::read_to_string(&self.config_path).map_err(|source| ConfigError::Io {
                path: self.config_path.display().to_string(),
                source,
            })?;
        let mut config: Config =
            serde_yaml::from_str(&contents).map_err(ConfigError::Parse)?;
        config.set_defaults();

        let outcome = config.validate();
        for warning in &outcome.warnings {
            warn!("Config warning: {warning}");
        }
        for problem in &outcome.errors {
            error!("Config error: {problem}");
        }

        if !outcome.is_valid() {
            return Err(ConfigError::Invalid(outcome.errors.join("; ")).into());
        }

        info!(
            path = %self.config_path.display(),
            areas = config.areas.len(),
            "Config is valid"
        );
        Ok(())
    }
}
