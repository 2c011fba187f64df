use colored::Colorize;

use crate::error::Result;
use crate::quality::generate_report;
use crate::settings::{Settings, SUMMARY_FILE, TRANSFORMED_FILE, VALIDATION_FILE};

pub fn run(settings: &Settings) -> Result<()> {
    let out = generate_report(
        &settings.output_path(TRANSFORMED_FILE),
        &settings.output_path(VALIDATION_FILE),
        &settings.output_path(SUMMARY_FILE),
        settings.threshold_pct,
        settings,
    )?;
    match out {
        Some(path) => {
            println!("{}", "Quality gate passed".green().bold());
            println!("Report generated: {}", path.display());
        }
        None => println!("No transformed records; report skipped."),
    }
    Ok(())
}
