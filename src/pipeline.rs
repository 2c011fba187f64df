use std::path::{Path, PathBuf};

use comfy_table::{Cell, Table};

use crate::db::with_store;
use crate::error::Result;
use crate::fmt::number;
use crate::importer::{ensure_store, StoreStatus};
use crate::models::{CsvRow, SummaryRow};
use crate::quality::generate_report;
use crate::queries;
use crate::settings::{Settings, SUMMARY_FILE, TRANSFORMED_FILE, VALIDATION_FILE};

// ---------------------------------------------------------------------------
// CSV output
// ---------------------------------------------------------------------------

/// Write rows with a header line, creating the parent directory if needed.
/// An empty slice still produces the header.
pub fn write_csv<T: CsvRow>(path: &Path, rows: &[T]) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    let mut wtr = csv::WriterBuilder::new()
        .has_headers(false)
        .from_path(path)?;
    wtr.write_record(T::HEADER)?;
    for row in rows {
        wtr.serialize(row)?;
    }
    wtr.flush()?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Stages
// ---------------------------------------------------------------------------

pub fn transform_records(settings: &Settings, output_filename: &str) -> Result<PathBuf> {
    let rows = with_store(&settings.store_path, queries::fetch_transformed)?;
    let out = settings.output_path(output_filename);
    write_csv(&out, &rows)?;
    tracing::info!("transform: {} rows written to {}", rows.len(), out.display());
    Ok(out)
}

pub fn validate_balances(settings: &Settings, output_filename: &str) -> Result<PathBuf> {
    let rows = with_store(&settings.store_path, queries::fetch_unbalanced)?;
    let out = settings.output_path(output_filename);
    write_csv(&out, &rows)?;
    let note = unbalanced_note(rows.len());
    if rows.len() >= queries::UNBALANCED_LIMIT {
        tracing::warn!("validate: {note}");
    } else {
        tracing::info!("validate: {note}");
    }
    Ok(out)
}

fn unbalanced_note(n: usize) -> String {
    match n {
        0 => "all transactions balanced".to_string(),
        n if n >= queries::UNBALANCED_LIMIT => {
            format!("unbalanced transactions reached the limit of {n}")
        }
        n => format!("{n} unbalanced transactions"),
    }
}

pub fn summarize_accounts(settings: &Settings, output_filename: &str) -> Result<PathBuf> {
    let rows = with_store(&settings.store_path, queries::fetch_account_summary)?;
    println!("=== Accounts summary ===\n{}", summary_table(&rows));
    let out = settings.output_path(output_filename);
    write_csv(&out, &rows)?;
    tracing::info!("summarize: {} accounts written to {}", rows.len(), out.display());
    Ok(out)
}

fn summary_table(rows: &[SummaryRow]) -> Table {
    let mut table = Table::new();
    table.set_header(vec!["Account", "Final balance"]);
    for row in rows {
        table.add_row(vec![
            Cell::new(row.account_name.as_deref().unwrap_or("(none)")),
            Cell::new(number(row.final_balance)),
        ]);
    }
    table
}

// ---------------------------------------------------------------------------
// Stage kinds, dispatched by enum and run in declaration order
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Stage {
    EnsureStore,
    Transform,
    Validate,
    Summarize,
    Report,
}

pub const ALL_STAGES: &[Stage] = &[
    Stage::EnsureStore,
    Stage::Transform,
    Stage::Validate,
    Stage::Summarize,
    Stage::Report,
];

impl Stage {
    pub fn key(&self) -> &'static str {
        match self {
            Self::EnsureStore => "ensure-store",
            Self::Transform => "transform",
            Self::Validate => "validate",
            Self::Summarize => "summarize",
            Self::Report => "report",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::EnsureStore => "Store",
            Self::Transform => "Transformed file",
            Self::Validate => "Validated file",
            Self::Summarize => "Summary file",
            Self::Report => "Report generated",
        }
    }

    /// Run with default file names. Returns the path written, if any.
    pub fn run(&self, settings: &Settings) -> Result<Option<PathBuf>> {
        match self {
            Self::EnsureStore => {
                if let StoreStatus::Created { accounts, journal_entries } = ensure_store(settings)? {
                    println!("Local store created ({accounts} accounts, {journal_entries} journal entries).");
                }
                Ok(Some(settings.store_path.clone()))
            }
            Self::Transform => transform_records(settings, TRANSFORMED_FILE).map(Some),
            Self::Validate => validate_balances(settings, VALIDATION_FILE).map(Some),
            Self::Summarize => summarize_accounts(settings, SUMMARY_FILE).map(Some),
            Self::Report => generate_report(
                &settings.output_path(TRANSFORMED_FILE),
                &settings.output_path(VALIDATION_FILE),
                &settings.output_path(SUMMARY_FILE),
                settings.threshold_pct,
                settings,
            ),
        }
    }
}

/// Run every stage in order, stopping at the first failure. `on_stage` is
/// called after each stage completes.
pub fn run_all(
    settings: &Settings,
    mut on_stage: impl FnMut(Stage, Option<&Path>),
) -> Result<Vec<(Stage, Option<PathBuf>)>> {
    let mut written = Vec::with_capacity(ALL_STAGES.len());
    for stage in ALL_STAGES {
        tracing::info!("stage {} starting", stage.key());
        let out = stage.run(settings).inspect_err(|e| {
            tracing::error!("stage {} failed: {e}", stage.key());
        })?;
        on_stage(*stage, out.as_deref());
        written.push((*stage, out));
    }
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::MigrationError;
    use crate::importer::tests::{test_settings, write_reference, ACCOUNTS_CSV, JOURNAL_CSV};
    use crate::models::ValidationRow;
    use crate::settings::REPORT_FILE;

    fn ready_store(dir: &Path, journal: &str) -> Settings {
        let settings = test_settings(dir);
        write_reference(&settings, ACCOUNTS_CSV, journal);
        ensure_store(&settings).unwrap();
        settings
    }

    #[test]
    fn test_write_csv_header_only_when_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("validation.csv");
        write_csv::<ValidationRow>(&path, &[]).unwrap();
        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content, "transaction_id,total_debits,total_credits\n");
    }

    #[test]
    fn test_transform_writes_full_schema() {
        let dir = tempfile::tempdir().unwrap();
        let settings = ready_store(dir.path(), JOURNAL_CSV);
        let out = transform_records(&settings, "transformed.csv").unwrap();
        assert_eq!(out, settings.output_dir.join("transformed.csv"));

        let mut rdr = csv::Reader::from_path(&out).unwrap();
        let headers: Vec<String> = rdr.headers().unwrap().iter().map(str::to_string).collect();
        assert_eq!(headers, crate::models::TransformedRow::HEADER);
        let records: Vec<csv::StringRecord> = rdr.records().map(|r| r.unwrap()).collect();
        assert_eq!(records.len(), 4);
        assert_eq!(&records[0][0], "T1");
        assert_eq!(&records[0][1], "2024-01-10");
        assert_eq!(&records[0][3], "Cash");
        assert_eq!(&records[0][6], "1");
    }

    #[test]
    fn test_transform_without_store_is_connect_error() {
        let dir = tempfile::tempdir().unwrap();
        let settings = test_settings(dir.path());
        let err = transform_records(&settings, "transformed.csv").unwrap_err();
        assert!(matches!(err, MigrationError::Connect { .. }));
        assert!(!settings.output_path("transformed.csv").exists());
    }

    #[test]
    fn test_validate_writes_unbalanced() {
        let dir = tempfile::tempdir().unwrap();
        let journal = format!("{JOURNAL_CSV}T3,2024-03-01,1001,25\n");
        let settings = ready_store(dir.path(), &journal);
        let out = validate_balances(&settings, "validation.csv").unwrap();
        let content = std::fs::read_to_string(out).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[1].starts_with("T3,25"));
    }

    #[test]
    fn test_summarize_writes_balances() {
        let dir = tempfile::tempdir().unwrap();
        let settings = ready_store(dir.path(), JOURNAL_CSV);
        let out = summarize_accounts(&settings, "summary.csv").unwrap();
        let mut rdr = csv::Reader::from_path(out).unwrap();
        let rows: Vec<(String, f64)> = rdr
            .records()
            .map(|r| {
                let r = r.unwrap();
                (r[0].to_string(), r[1].parse().unwrap())
            })
            .collect();
        assert_eq!(rows, vec![("Cash".to_string(), 60.0), ("Revenue".to_string(), -60.0)]);
    }

    #[test]
    fn test_summary_table_uses_plain_figures() {
        let rows = vec![
            SummaryRow {
                account_name: Some("Cash".to_string()),
                final_balance: 1250.5,
            },
            SummaryRow {
                account_name: None,
                final_balance: -60.0,
            },
        ];
        let text = summary_table(&rows).to_string();
        assert!(text.contains("1250.5"));
        assert!(text.contains("-60"));
        assert!(text.contains("(none)"));
        assert!(!text.contains('$'));
    }

    #[test]
    fn test_unbalanced_note_wording() {
        assert_eq!(unbalanced_note(0), "all transactions balanced");
        assert_eq!(unbalanced_note(3), "3 unbalanced transactions");
        assert_eq!(
            unbalanced_note(queries::UNBALANCED_LIMIT),
            "unbalanced transactions reached the limit of 10"
        );
    }

    #[test]
    fn test_run_all_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let settings = test_settings(dir.path());
        write_reference(&settings, ACCOUNTS_CSV, JOURNAL_CSV);
        let written = run_all(&settings, |_, _| {}).unwrap();
        let keys: Vec<&str> = written.iter().map(|(s, _)| s.key()).collect();
        assert_eq!(keys, vec!["ensure-store", "transform", "validate", "summarize", "report"]);
        assert_eq!(written[4].1, Some(settings.output_path(REPORT_FILE)));
        assert!(settings.output_path(REPORT_FILE).exists());
    }

    #[test]
    fn test_run_all_stops_at_quality_gate() {
        let dir = tempfile::tempdir().unwrap();
        let journal = format!("{JOURNAL_CSV}T9,2019-01-01,1001,5\nT9,2019-01-01,1001,-5\n");
        let settings = test_settings(dir.path());
        write_reference(&settings, ACCOUNTS_CSV, &journal);
        let err = run_all(&settings, |_, _| {}).unwrap_err();
        assert!(matches!(err, MigrationError::QualityGate { .. }));
        assert!(!settings.output_path(REPORT_FILE).exists());
    }
}
