pub mod config;
pub mod init;
pub mod report;
pub mod run;
pub mod stages;
pub mod status;

use std::path::PathBuf;

use clap::{ArgAction, Parser, Subcommand};

use crate::error::Result;
use crate::settings::{
    load_settings_from, settings_path, Overrides, Settings, SUMMARY_FILE, TRANSFORMED_FILE,
    VALIDATION_FILE,
};

#[derive(Parser)]
#[command(
    name = "ledger-migrate",
    version,
    about = "Load ledger reference extracts, derive balances and gate on data quality."
)]
pub struct Cli {
    /// Settings file (default: ~/.config/ledger-migrate/settings.json)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Store file to create or read
    #[arg(long, global = true)]
    pub store: Option<PathBuf>,

    /// Directory holding accounts.csv and journal_entries.csv
    #[arg(long = "reference-dir", global = true)]
    pub reference_dir: Option<PathBuf>,

    /// Directory the CSVs and report are written to
    #[arg(long = "output-dir", global = true)]
    pub output_dir: Option<PathBuf>,

    /// More log output on stderr (-v info, -vv debug)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Create the store from the reference CSVs if it does not exist yet.
    Init,
    /// Derive the per-entry ledger view.
    Transform {
        /// Output file name inside the output directory
        #[arg(long, default_value = TRANSFORMED_FILE)]
        output: String,
    },
    /// List up to ten transactions whose debits and credits differ.
    Validate {
        /// Output file name inside the output directory
        #[arg(long, default_value = VALIDATION_FILE)]
        output: String,
    },
    /// Compute final balances per account over valid, balanced transactions.
    Summarize {
        /// Output file name inside the output directory
        #[arg(long, default_value = SUMMARY_FILE)]
        output: String,
    },
    /// Check the invalid-row percentage and write report.txt.
    Report {
        /// Maximum tolerated percentage of invalid rows
        #[arg(long)]
        threshold: Option<f64>,
        /// Delete the intermediate CSVs once the report is written
        #[arg(long = "discard-intermediates")]
        discard_intermediates: bool,
    },
    /// Run every stage in order, stopping at the first failure.
    Run {
        /// Maximum tolerated percentage of invalid rows
        #[arg(long)]
        threshold: Option<f64>,
        /// Delete the intermediate CSVs once the report is written
        #[arg(long = "discard-intermediates")]
        discard_intermediates: bool,
    },
    /// Show resolved paths, store contents and produced files.
    Status,
    /// Inspect or write the settings file.
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Print the resolved settings as JSON.
    Show,
    /// Write the resolved settings to the settings file.
    Init,
}

impl Cli {
    pub fn config_path(&self) -> PathBuf {
        self.config.clone().unwrap_or_else(settings_path)
    }

    /// Settings file values with command-line flags layered on top.
    pub fn settings(&self) -> Result<Settings> {
        let (threshold_pct, discard_intermediates) = match &self.command {
            Commands::Report {
                threshold,
                discard_intermediates,
            }
            | Commands::Run {
                threshold,
                discard_intermediates,
            } => (*threshold, *discard_intermediates),
            _ => (None, false),
        };
        let overrides = Overrides {
            store_path: self.store.clone(),
            reference_dir: self.reference_dir.clone(),
            output_dir: self.output_dir.clone(),
            threshold_pct,
            discard_intermediates,
        };
        Ok(overrides.apply(load_settings_from(&self.config_path())?))
    }
}
