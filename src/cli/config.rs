use std::path::Path;

use crate::error::{MigrationError, Result};
use crate::settings::{save_settings, Settings};

pub fn show(settings: &Settings) -> Result<()> {
    let json = serde_json::to_string_pretty(settings)
        .map_err(|e| MigrationError::Settings(e.to_string()))?;
    println!("{json}");
    Ok(())
}

pub fn init(settings: &Settings, path: &Path) -> Result<()> {
    save_settings(settings, path)?;
    println!("Wrote settings to {}", path.display());
    Ok(())
}
