use std::collections::HashSet;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;

use crate::error::{MigrationError, Result};
use crate::fmt::render_table;
use crate::settings::{Settings, REPORT_FILE};

const DATE_COLUMN: &str = "transaction_date";
const FLAG_COLUMN: &str = "is_valid_transaction";
const ID_COLUMN: &str = "transaction_id";

// ---------------------------------------------------------------------------
// Datasets
// ---------------------------------------------------------------------------

/// A CSV held as text, addressed by header name.
#[derive(Debug, Clone, Default)]
pub struct Dataset {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl Dataset {
    pub fn column(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    fn require(&self, name: &str) -> Result<usize> {
        self.column(name).ok_or_else(|| {
            MigrationError::Schema(format!("column '{name}' not found in transformed dataset"))
        })
    }

    pub fn render(&self) -> String {
        render_table(&self.headers, &self.rows)
    }
}

pub fn load_dataset(path: &Path) -> Result<Dataset> {
    let mut rdr = csv::Reader::from_path(path)?;
    let headers = rdr.headers()?.iter().map(str::to_string).collect();
    let mut rows = Vec::new();
    for record in rdr.records() {
        rows.push(record?.iter().map(str::to_string).collect());
    }
    Ok(Dataset { headers, rows })
}

/// Normalise `transaction_date` to ISO dates. Empty values stay empty.
fn parse_dates(dataset: &mut Dataset) -> Result<()> {
    let Some(idx) = dataset.column(DATE_COLUMN) else {
        return Ok(());
    };
    for row in &mut dataset.rows {
        let Some(raw) = row.get_mut(idx) else { continue };
        let value = raw.trim();
        if value.is_empty() {
            continue;
        }
        let date = NaiveDate::parse_from_str(value, "%Y-%m-%d")
            .or_else(|_| {
                chrono::NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S").map(|dt| dt.date())
            })
            .map_err(|_| MigrationError::Schema(format!("invalid {DATE_COLUMN} '{value}'")))?;
        *raw = date.format("%Y-%m-%d").to_string();
    }
    Ok(())
}

fn parse_flag(raw: &str) -> Result<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "1.0" | "true" => Ok(true),
        "0" | "0.0" | "false" => Ok(false),
        other => Err(MigrationError::Schema(format!(
            "invalid {FLAG_COLUMN} value '{other}'"
        ))),
    }
}

// ---------------------------------------------------------------------------
// Quality report
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct QualityReport {
    pub total: usize,
    pub invalid_count: usize,
    pub valid_after_filtering: usize,
    pub pct_invalid: f64,
    pub transformed: Dataset,
    pub validation: Dataset,
}

impl QualityReport {
    pub fn check_threshold(&self, threshold_pct: f64) -> Result<()> {
        if self.pct_invalid > threshold_pct {
            return Err(MigrationError::QualityGate {
                pct_invalid: self.pct_invalid,
                threshold_pct,
            });
        }
        Ok(())
    }
}

/// Returns `None` when there are no transformed rows.
pub fn build_quality_report(transformed: Dataset, validation: Dataset) -> Result<Option<QualityReport>> {
    if transformed.is_empty() {
        return Ok(None);
    }
    let total = transformed.len();
    let flag_idx = transformed.require(FLAG_COLUMN)?;
    let id_idx = transformed.require(ID_COLUMN)?;

    let unbalanced: HashSet<&str> = match validation.column(ID_COLUMN) {
        Some(idx) => validation
            .rows
            .iter()
            .filter_map(|r| r.get(idx).map(String::as_str))
            .collect(),
        None => HashSet::new(),
    };

    let mut invalid_count = 0usize;
    let mut valid_after_filtering = 0usize;
    for row in &transformed.rows {
        let flag = parse_flag(row.get(flag_idx).map(String::as_str).unwrap_or(""))?;
        if !flag {
            invalid_count += 1;
        } else if !unbalanced.contains(row.get(id_idx).map(String::as_str).unwrap_or("")) {
            valid_after_filtering += 1;
        }
    }
    let pct_invalid = 100.0 * invalid_count as f64 / total as f64;

    Ok(Some(QualityReport {
        total,
        invalid_count,
        valid_after_filtering,
        pct_invalid,
        transformed,
        validation,
    }))
}

pub fn render_report(report: &QualityReport) -> String {
    let mut out = String::new();
    out.push_str("=== Data Migration Valid Transactions Report ===\n\n");
    out.push_str(&format!("Total records processed: {}\n", report.total));
    out.push_str(&format!(
        "Valid records after filtering: {}\n",
        report.valid_after_filtering
    ));
    out.push_str(&format!("Invalid percentage: {:.2}%\n\n", report.pct_invalid));
    out.push_str("=== Transformed Transactions ===\n");
    out.push_str(&report.transformed.render());
    out.push_str("\n\n");
    out.push_str("=== Validation Transactions ===\n");
    out.push_str(&report.validation.render());
    out.push('\n');
    out
}

// ---------------------------------------------------------------------------
// Report stage
// ---------------------------------------------------------------------------

/// Gate the transformed data on its invalid-row percentage and write
/// `report.txt`. Returns `Ok(None)` without writing when there is no data.
pub fn generate_report(
    transformed_path: &Path,
    validated_path: &Path,
    summary_path: &Path,
    threshold_pct: f64,
    settings: &Settings,
) -> Result<Option<PathBuf>> {
    let mut transformed = load_dataset(transformed_path)?;
    parse_dates(&mut transformed)?;
    let validation = load_dataset(validated_path)?;

    let Some(report) = build_quality_report(transformed, validation)? else {
        tracing::info!("report: no transformed rows, nothing to check");
        return Ok(None);
    };
    tracing::info!(
        "report: {} records, {} invalid ({:.2}%)",
        report.total,
        report.invalid_count,
        report.pct_invalid
    );
    report.check_threshold(threshold_pct)?;

    let out = settings.output_path(REPORT_FILE);
    if let Some(parent) = out.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(&out, render_report(&report))?;

    if !settings.retain_intermediates {
        remove_intermediates(&[transformed_path, validated_path, summary_path]);
    }
    Ok(Some(out))
}

/// Best effort: a file that cannot be removed is logged and left behind.
pub fn remove_intermediates(paths: &[&Path]) {
    for path in paths {
        match std::fs::remove_file(path) {
            Ok(()) => tracing::info!("removed {}", path.display()),
            Err(e) => tracing::warn!("could not remove {}: {e}", path.display()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::importer::tests::test_settings;

    const TRANSFORMED_HEADER: &str =
        "transaction_id,transaction_date,account_number,account_name,debit_amount,credit_amount,is_valid_transaction\n";
    const VALIDATION_HEADER: &str = "transaction_id,total_debits,total_credits\n";

    struct Fixture {
        _dir: tempfile::TempDir,
        settings: Settings,
        transformed: PathBuf,
        validation: PathBuf,
        summary: PathBuf,
    }

    fn fixture(transformed: &str, validation: &str) -> Fixture {
        let dir = tempfile::tempdir().unwrap();
        let settings = test_settings(dir.path());
        std::fs::create_dir_all(&settings.output_dir).unwrap();
        let t = settings.output_path("transformed.csv");
        let v = settings.output_path("validation.csv");
        let s = settings.output_path("summary.csv");
        std::fs::write(&t, transformed).unwrap();
        std::fs::write(&v, validation).unwrap();
        std::fs::write(&s, "account_name,final_balance\n").unwrap();
        Fixture {
            _dir: dir,
            settings,
            transformed: t,
            validation: v,
            summary: s,
        }
    }

    /// `total` rows of which the first `invalid` are flagged 0.
    fn transformed_csv(total: usize, invalid: usize) -> String {
        let mut csv = TRANSFORMED_HEADER.to_string();
        for i in 0..total {
            let flag = if i < invalid { 0 } else { 1 };
            csv.push_str(&format!("T{i},2024-01-01,1001,Cash,10.0,0.0,{flag}\n"));
        }
        csv
    }

    fn run(f: &Fixture, threshold: f64) -> Result<Option<PathBuf>> {
        generate_report(&f.transformed, &f.validation, &f.summary, threshold, &f.settings)
    }

    #[test]
    fn test_threshold_exceeded_fails() {
        let f = fixture(&transformed_csv(100, 6), VALIDATION_HEADER);
        let err = run(&f, 5.0).unwrap_err();
        assert!(matches!(
            err,
            MigrationError::QualityGate { pct_invalid, threshold_pct }
                if pct_invalid == 6.0 && threshold_pct == 5.0
        ));
        assert!(!f.settings.output_path(REPORT_FILE).exists());
    }

    #[test]
    fn test_threshold_met_writes_report() {
        let f = fixture(&transformed_csv(100, 4), VALIDATION_HEADER);
        let out = run(&f, 5.0).unwrap().unwrap();
        let text = std::fs::read_to_string(out).unwrap();
        assert!(text.starts_with("=== Data Migration Valid Transactions Report ===\n\n"));
        assert!(text.contains("Total records processed: 100\n"));
        assert!(text.contains("Valid records after filtering: 96\n"));
        assert!(text.contains("Invalid percentage: 4.00%\n"));
        assert!(text.contains("=== Transformed Transactions ===\n"));
        assert!(text.contains("=== Validation Transactions ===\n"));
    }

    #[test]
    fn test_threshold_equal_passes() {
        let f = fixture(&transformed_csv(20, 1), VALIDATION_HEADER);
        assert!(run(&f, 5.0).unwrap().is_some());
    }

    #[test]
    fn test_empty_input_writes_nothing() {
        let f = fixture(TRANSFORMED_HEADER, VALIDATION_HEADER);
        assert_eq!(run(&f, 5.0).unwrap(), None);
        assert!(!f.settings.output_path(REPORT_FILE).exists());
    }

    #[test]
    fn test_missing_flag_column_is_schema_error() {
        let f = fixture("transaction_id,transaction_date\nT1,2024-01-01\n", VALIDATION_HEADER);
        let err = run(&f, 5.0).unwrap_err();
        assert!(matches!(err, MigrationError::Schema(ref m) if m.contains("is_valid_transaction")));
        assert!(!f.settings.output_path(REPORT_FILE).exists());
    }

    #[test]
    fn test_missing_id_column_is_schema_error() {
        let f = fixture("transaction_date,is_valid_transaction\n2024-01-01,1\n", VALIDATION_HEADER);
        let err = run(&f, 5.0).unwrap_err();
        assert!(matches!(err, MigrationError::Schema(ref m) if m.contains("transaction_id")));
    }

    #[test]
    fn test_unbalanced_ids_removed_from_valid_set() {
        let transformed = format!(
            "{TRANSFORMED_HEADER}T1,2024-01-01,1001,Cash,10.0,0.0,1\n\
             T1,2024-01-01,2001,Revenue,0.0,5.0,1\n\
             T2,2024-01-02,1001,Cash,3.0,0.0,1\n\
             T2,2024-01-02,2001,Revenue,0.0,3.0,1\n"
        );
        let validation = format!("{VALIDATION_HEADER}T1,10.0,5.0\n");
        let f = fixture(&transformed, &validation);
        let text = std::fs::read_to_string(run(&f, 5.0).unwrap().unwrap()).unwrap();
        assert!(text.contains("Total records processed: 4\n"));
        assert!(text.contains("Valid records after filtering: 2\n"));
        assert!(text.contains("Invalid percentage: 0.00%\n"));
        let validation_section = text.split("=== Validation Transactions ===").nth(1).unwrap();
        assert!(validation_section.contains("T1"));
        assert!(validation_section.contains("total_debits"));
    }

    #[test]
    fn test_bad_date_is_schema_error() {
        let transformed = format!("{TRANSFORMED_HEADER}T1,31/12/2024,1001,Cash,1.0,0.0,1\n");
        let f = fixture(&transformed, VALIDATION_HEADER);
        assert!(matches!(run(&f, 5.0), Err(MigrationError::Schema(_))));
    }

    #[test]
    fn test_boolean_flags_are_normalised() {
        assert!(parse_flag("TRUE").unwrap());
        assert!(!parse_flag("false").unwrap());
        assert!(parse_flag("1").unwrap());
        assert!(parse_flag("maybe").is_err());
    }

    #[test]
    fn test_intermediates_retained_by_default() {
        let f = fixture(&transformed_csv(10, 0), VALIDATION_HEADER);
        run(&f, 5.0).unwrap();
        assert!(f.transformed.exists());
        assert!(f.validation.exists());
        assert!(f.summary.exists());
    }

    #[test]
    fn test_intermediates_removed_when_not_retained() {
        let mut f = fixture(&transformed_csv(10, 0), VALIDATION_HEADER);
        f.settings.retain_intermediates = false;
        let out = run(&f, 5.0).unwrap().unwrap();
        assert!(out.exists());
        assert!(!f.transformed.exists());
        assert!(!f.validation.exists());
        assert!(!f.summary.exists());
    }

    #[test]
    fn test_intermediates_kept_when_gate_fails() {
        let mut f = fixture(&transformed_csv(10, 5), VALIDATION_HEADER);
        f.settings.retain_intermediates = false;
        assert!(run(&f, 5.0).is_err());
        assert!(f.transformed.exists());
    }
}
