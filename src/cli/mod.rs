pub mod about;
pub mod app;
pub mod config;
pub mod config_editor;
pub mod file_picker;
pub mod generate;
pub mod generation;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use clap_complete::Shell;

use crate::models::OutputFormat;

#[derive(Parser)]
#[command(
    name = "kdp-invoice",
    version,
    about = "Monthly invoice generator for KDP royalty payment reports."
)]
pub struct Cli {
    /// Configuration file (default: ~/.config/kdp-invoice/config.json)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Open the interactive app (the default with no subcommand).
    App,
    /// Generate the invoice for one month of a KDP payment report.
    Generate {
        /// Path to the KDP report (.xlsx, .xls or .ods)
        file: PathBuf,
        /// Invoice year (default: year of the previous month)
        #[arg(long)]
        year: Option<i32>,
        /// Invoice month, 1-12 (default: previous month)
        #[arg(long, value_parser = clap::value_parser!(u32).range(1..=12))]
        month: Option<u32>,
        /// Output format
        #[arg(long, value_enum, default_value = "both")]
        format: OutputFormat,
        /// Invoice number, replacing the configured numbering
        #[arg(long)]
        number: Option<String>,
        /// Observed payment date printed on the invoice
        #[arg(long = "payment-date")]
        payment_date: Option<String>,
        /// Open the generated files afterwards
        #[arg(long)]
        open: bool,
    },
    /// Inspect or edit the configuration file.
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
    /// Show version information.
    Info,
    /// Print a shell completion script.
    Completions {
        shell: Shell,
    },
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Print the configuration.
    Show,
    /// Print the configuration file location.
    Path,
    /// Write a starter configuration with placeholders to fill in.
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
    /// Validate every field and check generation can run.
    Check,
    /// Set one field, e.g. `config set entreprise.siret "123 456 789 00012"`.
    Set {
        /// section.field
        key: String,
        value: String,
    },
}
