use colored::Colorize;

use crate::error::Result;
use crate::importer::{ensure_store, StoreStatus};
use crate::settings::Settings;

pub fn run(settings: &Settings) -> Result<()> {
    match ensure_store(settings)? {
        StoreStatus::Created {
            accounts,
            journal_entries,
        } => {
            println!(
                "{} {} ({accounts} accounts, {journal_entries} journal entries)",
                "Created".green().bold(),
                settings.store_path.display()
            );
        }
        StoreStatus::AlreadyPresent => {
            println!(
                "{} already exists, no action needed.",
                settings.store_path.display()
            );
        }
    }
    Ok(())
}
