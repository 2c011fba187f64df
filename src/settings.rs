use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{MigrationError, Result};

pub const ACCOUNTS_FILE: &str = "accounts.csv";
pub const JOURNAL_ENTRIES_FILE: &str = "journal_entries.csv";
pub const TRANSFORMED_FILE: &str = "transformed.csv";
pub const VALIDATION_FILE: &str = "validation.csv";
pub const SUMMARY_FILE: &str = "summary.csv";
pub const REPORT_FILE: &str = "report.txt";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default = "default_store_path")]
    pub store_path: PathBuf,
    #[serde(default = "default_reference_dir")]
    pub reference_dir: PathBuf,
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
    #[serde(default = "default_threshold_pct")]
    pub threshold_pct: f64,
    #[serde(default = "default_retain_intermediates")]
    pub retain_intermediates: bool,
}

fn default_store_path() -> PathBuf {
    default_reference_dir().join("local.db")
}

fn default_reference_dir() -> PathBuf {
    PathBuf::from("data").join("reference")
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("data").join("processed")
}

fn default_threshold_pct() -> f64 {
    5.0
}

fn default_retain_intermediates() -> bool {
    true
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            store_path: default_store_path(),
            reference_dir: default_reference_dir(),
            output_dir: default_output_dir(),
            threshold_pct: default_threshold_pct(),
            retain_intermediates: default_retain_intermediates(),
        }
    }
}

impl Settings {
    pub fn accounts_csv(&self) -> PathBuf {
        self.reference_dir.join(ACCOUNTS_FILE)
    }

    pub fn journal_entries_csv(&self) -> PathBuf {
        self.reference_dir.join(JOURNAL_ENTRIES_FILE)
    }

    pub fn output_path(&self, filename: &str) -> PathBuf {
        self.output_dir.join(filename)
    }
}

/// Command-line values that take precedence over the settings file.
#[derive(Debug, Default, Clone)]
pub struct Overrides {
    pub store_path: Option<PathBuf>,
    pub reference_dir: Option<PathBuf>,
    pub output_dir: Option<PathBuf>,
    pub threshold_pct: Option<f64>,
    pub discard_intermediates: bool,
}

impl Overrides {
    pub fn apply(self, mut settings: Settings) -> Settings {
        if let Some(p) = self.store_path {
            settings.store_path = p;
        }
        if let Some(p) = self.reference_dir {
            settings.reference_dir = p;
        }
        if let Some(p) = self.output_dir {
            settings.output_dir = p;
        }
        if let Some(t) = self.threshold_pct {
            settings.threshold_pct = t;
        }
        if self.discard_intermediates {
            settings.retain_intermediates = false;
        }
        settings
    }
}

fn config_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config")
        .join("ledger-migrate")
}

pub fn settings_path() -> PathBuf {
    config_dir().join("settings.json")
}

/// A missing file yields defaults; a malformed one is an error.
pub fn load_settings_from(path: &Path) -> Result<Settings> {
    if !path.exists() {
        return Ok(Settings::default());
    }
    let content = std::fs::read_to_string(path)?;
    serde_json::from_str(&content)
        .map_err(|e| MigrationError::Settings(format!("{}: {e}", path.display())))
}

pub fn save_settings(settings: &Settings, path: &Path) -> Result<()> {
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir)?;
    }
    let json = serde_json::to_string_pretty(settings)
        .map_err(|e| MigrationError::Settings(e.to_string()))?;
    std::fs::write(path, format!("{json}\n"))?;
    Ok(())
}
