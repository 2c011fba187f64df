use colored::Colorize;

use crate::error::Result;
use crate::pipeline::{run_all, Stage, ALL_STAGES};
use crate::settings::Settings;

pub fn run(settings: &Settings) -> Result<()> {
    let total = ALL_STAGES.len();
    let mut step = 0;
    run_all(settings, |stage, out| {
        step += 1;
        let counter = format!("[{step}/{total}]").dimmed();
        match (stage, out) {
            (_, Some(path)) => println!("{counter} {}: {}", stage.label(), path.display()),
            (Stage::Report, None) => {
                println!("{counter} No transformed records; report skipped.")
            }
            (_, None) => println!("{counter} {} done", stage.key()),
        }
    })?;
    println!("{}", "Pipeline finished".green().bold());
    Ok(())
}
