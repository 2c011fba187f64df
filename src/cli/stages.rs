use crate::error::Result;
use crate::pipeline;
use crate::settings::Settings;

pub fn transform(settings: &Settings, output: &str) -> Result<()> {
    let out = pipeline::transform_records(settings, output)?;
    println!("Transformed file: {}", out.display());
    Ok(())
}

pub fn validate(settings: &Settings, output: &str) -> Result<()> {
    let out = pipeline::validate_balances(settings, output)?;
    println!("Validated file: {}", out.display());
    Ok(())
}

pub fn summarize(settings: &Settings, output: &str) -> Result<()> {
    let out = pipeline::summarize_accounts(settings, output)?;
    println!("Summary file: {}", out.display());
    Ok(())
}
