//! Area and exchange configuration.
//!
//! The config file is YAML: a list of areas to export, each optionally
//! carrying cross-border exchange pairs. Loading applies defaults first and
//! validates afterwards, so a file can stay minimal:
//!
//! ```yaml
//! areas:
//!   - area: 10YNL----------L
//!     country: NL
//!     startDaysAgo: 3
//!     exchanges:
//!       - area: 10YBE----------2
//!         country: BE
//! ```

use crate::entsoe::Area;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, warn};

/// Default slot resolution for generation data, in minutes.
const DEFAULT_GENERATION_RESOLUTION_MINUTES: u32 = 15;

/// Default slot resolution for cross-border exchange data, in minutes.
/// Physical flows are published hourly for most borders.
const DEFAULT_EXCHANGE_RESOLUTION_MINUTES: u32 = 60;

/// Configuration errors. All of them abort startup.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The config file could not be read.
    #[error("failed to read config file {path}: {source}")]
    Io {
        /// Path that was attempted.
        path: String,
        /// Underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// The config file is not valid YAML for the expected shape.
    #[error("failed to parse config file: {0}")]
    Parse(#[from] serde_yaml::Error),

    /// The config parsed but failed validation.
    #[error("config is invalid: {0}")]
    Invalid(String),
}

/// The whole configuration: one entry per area to export.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Areas to synchronize, processed sequentially.
    #[serde(default)]
    pub areas: Vec<AreaConfig>,
}

/// One area to synchronize.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase", deny_unknown_fields)]
pub struct AreaConfig {
    /// Bidding zone to query.
    pub area: Area,
    /// Country code the measurements are tagged with.
    pub country: CountryCode,
    /// Data source for this area.
    pub source: Source,
    /// Slot resolution in minutes. Defaults to 15.
    pub resolution_minutes: u32,
    /// Calendar years to look back on the first run.
    pub start_years_ago: u32,
    /// Calendar months to look back on the first run.
    pub start_months_ago: u32,
    /// Calendar days to look back on the first run.
    pub start_days_ago: u32,
    /// Cross-border exchange pairs to synchronize for this area.
    pub exchanges: Vec<ExchangeConfig>,
}

/// One cross-border exchange peer for an area.
///
/// Carries its own source and resolution; the look-back is inherited from
/// the parent area when no checkpoint exists yet.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase", deny_unknown_fields)]
pub struct ExchangeConfig {
    /// Peer bidding zone.
    pub area: Area,
    /// Country code of the peer zone.
    pub country: CountryCode,
    /// Data source for this pair.
    pub source: Source,
    /// Slot resolution in minutes. Defaults to 60.
    pub resolution_minutes: u32,
}

/// Country a zone's measurements are tagged with.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum CountryCode {
    /// Netherlands.
    NL,
    /// Belgium.
    BE,
    /// Germany.
    DE,
    /// Denmark.
    DK,
    /// Great Britain.
    GB,
    /// Norway.
    NO,
    /// Not configured.
    #[default]
    #[serde(other)]
    Unknown,
}

/// Supported data sources.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Source {
    /// The ENTSO-E transparency platform.
    #[serde(rename = "entsoe")]
    Entsoe,
    /// Not configured.
    #[default]
    #[serde(other)]
    Unknown,
}

/// Validation outcome: hard errors and operator-facing warnings.
#[derive(Debug, Default)]
pub struct ValidationOutcome {
    /// Problems that make the config unusable.
    pub errors: Vec<String>,
    /// Suspicious but workable settings.
    pub warnings: Vec<String>,
}

impl ValidationOutcome {
    /// Whether the config can be used.
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }
}

impl Config {
    /// Fill in defaults for every area and exchange entry.
    pub fn set_defaults(&mut self) {
        for area in &mut self.areas {
            area.set_defaults();
        }
    }

    /// Validate the configuration after defaults have been applied.
    pub fn validate(&self) -> ValidationOutcome {
        let mut outcome = ValidationOutcome::default();
        if self.areas.is_empty() {
            outcome
                .errors
                .push("no areas have been configured, set at least one area".to_string());
        }
        for area in &self.areas {
            area.validate(&mut outcome);
        }
        outcome
    }
}

impl AreaConfig {
    /// Fill in defaults for this area and its exchanges.
    pub fn set_defaults(&mut self) {
        if self.source == Source::Unknown {
            self.source = Source::Entsoe;
        }
        if self.resolution_minutes == 0 {
            self.resolution_minutes = DEFAULT_GENERATION_RESOLUTION_MINUTES;
        }
        for exchange in &mut self.exchanges {
            exchange.set_defaults();
        }
    }

    fn validate(&self, outcome: &mut ValidationOutcome) {
        if self.area == Area::Unknown {
            outcome
                .errors
                .push("area is unknown, set with `area: 10YNL----------L`".to_string());
        }
        if self.source == Source::Unknown {
            outcome
                .errors
                .push("source for area is unknown, set with `source: entsoe`".to_string());
        }
        if self.country == CountryCode::Unknown {
            outcome
                .errors
                .push("country for area is unknown, set with `country: NL`".to_string());
        }
        if self.resolution_minutes == 0 {
            outcome.errors.push(
                "resolution for area is unknown, set with `resolutionMinutes: 15`".to_string(),
            );
        }
        if self.start_years_ago == 0 && self.start_months_ago == 0 && self.start_days_ago == 0 {
            outcome.warnings.push(format!(
                "area {} has no look-back configured; the first pass will export nothing until a checkpoint exists",
                self.area
            ));
        }
        for exchange in &self.exchanges {
            exchange.validate(outcome);
        }
    }
}

impl ExchangeConfig {
    /// Fill in defaults for this exchange entry.
    pub fn set_defaults(&mut self) {
        if self.source == Source::Unknown {
            self.source = Source::Entsoe;
        }
        if self.resolution_minutes == 0 {
            self.resolution_minutes = DEFAULT_EXCHANGE_RESOLUTION_MINUTES;
        }
    }

    fn validate(&self, outcome: &mut ValidationOutcome) {
        if self.area == Area::Unknown {
            outcome
                .errors
                .push("area for exchange is unknown, set with `area: 10YBE----------2`".to_string());
        }
        if self.source == Source::Unknown {
            outcome
                .errors
                .push("source for exchange is unknown, set with `source: entsoe`".to_string());
        }
        if self.country == CountryCode::Unknown {
            outcome
                .errors
                .push("country for exchange is unknown, set with `country: BE`".to_string());
        }
        if self.resolution_minutes == 0 {
            outcome.errors.push(
                "resolution for exchange is unknown, set with `resolutionMinutes: 60`".to_string(),
            );
        }
    }
}

/// Load, default, and validate a config file.
///
/// Warnings are logged; errors abort with [`ConfigError::Invalid`].
pub fn load_config(path: impl AsRef<Path>) -> Result<Config, ConfigError> {
    let path = path.as_ref();
    debug!(path = %path.display(), "Reading config file");

    let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.display().to_string(),
        source,
    })?;

    let mut config: Config = serde_yaml::from_str(&contents)?;
    config.set_defaults();

    let outcome = config.validate();
    for warning in &outcome.warnings {
        warn!(path = %path.display(), "Config warning: {warning}");
    }
    if !outcome.is_valid() {
        return Err(ConfigError::Invalid(outcome.errors.join("; ")));
    }

    Ok(config)
}
