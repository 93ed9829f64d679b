//! CLI command implementations

use clap::{Parser, Subcommand};

pub mod error;
pub mod run;
pub mod validate;

pub use error::CliError;
pub use run::RunArgs;
pub use validate::ValidateArgs;

/// Incremental exporter for ENTSO-E electricity generation data.
#[derive(Debug, Parser)]
#[command(name = "electricity-mix-exporter", version, about)]
pub struct Cli {
    /// Command to execute.
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Export measurements for all configured areas until caught up
    Run(RunArgs),
    /// Validate a config file and exit
    Validate(ValidateArgs),
}
