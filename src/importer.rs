use std::collections::HashSet;
use std::path::{Path, PathBuf};

use rusqlite::types::Value;
use rusqlite::Connection;

use crate::db::{get_connection, quote_ident};
use crate::error::{MigrationError, Result};
use crate::settings::Settings;

pub const ACCOUNTS_TABLE: &str = "accounts";
pub const JOURNAL_ENTRIES_TABLE: &str = "journal_entries";

const ACCOUNTS_COLUMNS: &[&str] = &["account_number", "account_name"];
const JOURNAL_ENTRIES_COLUMNS: &[&str] =
    &["transaction_id", "transaction_date", "account_number", "amount"];

// ---------------------------------------------------------------------------
// Reference CSVs
// ---------------------------------------------------------------------------

/// A reference extract held in memory before it is copied into the store.
#[derive(Debug, Clone)]
pub struct ReferenceTable {
    pub name: &'static str,
    pub headers: Vec<String>,
    pub records: Vec<csv::StringRecord>,
}

impl ReferenceTable {
    fn column(&self, idx: usize) -> impl Iterator<Item = &str> {
        self.records.iter().map(move |r| r.get(idx).unwrap_or(""))
    }

    /// Every non-empty cell of `column` must parse as a number.
    pub fn require_numeric(&self, column: &str) -> Result<()> {
        let Some(idx) = self.headers.iter().position(|h| h == column) else {
            return Ok(());
        };
        for (i, record) in self.records.iter().enumerate() {
            let value = record.get(idx).unwrap_or("").trim();
            if !value.is_empty() && value.parse::<f64>().is_err() {
                // header is line 1
                return Err(MigrationError::Schema(format!(
                    "{}.{column}: non-numeric value '{value}' on line {}",
                    self.name,
                    i + 2
                )));
            }
        }
        Ok(())
    }
}

pub fn read_reference_csv(
    path: &Path,
    name: &'static str,
    required: &[&str],
) -> Result<ReferenceTable> {
    let mut rdr = csv::Reader::from_path(path)?;
    let headers: Vec<String> = rdr.headers()?.iter().map(str::to_string).collect();

    let mut seen = HashSet::new();
    for h in &headers {
        if !seen.insert(h.as_str()) {
            return Err(MigrationError::Schema(format!(
                "{}: duplicate column '{h}'",
                path.display()
            )));
        }
    }
    let missing: Vec<&str> = required
        .iter()
        .copied()
        .filter(|c| !seen.contains(c))
        .collect();
    if !missing.is_empty() {
        return Err(MigrationError::Schema(format!(
            "{}: missing required columns: {}",
            path.display(),
            missing.join(", ")
        )));
    }

    let records = rdr.records().collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(ReferenceTable {
        name,
        headers,
        records,
    })
}

// ---------------------------------------------------------------------------
// Column type inference
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ColumnType {
    Integer,
    Real,
    Text,
}

impl ColumnType {
    pub fn sql_name(&self) -> &'static str {
        match self {
            Self::Integer => "INTEGER",
            Self::Real => "REAL",
            Self::Text => "TEXT",
        }
    }

    fn to_value(self, raw: &str) -> Value {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Value::Null;
        }
        match self {
            Self::Integer => trimmed
                .parse()
                .map(Value::Integer)
                .unwrap_or_else(|_| Value::Text(raw.to_string())),
            Self::Real => trimmed
                .parse()
                .map(Value::Real)
                .unwrap_or_else(|_| Value::Text(raw.to_string())),
            Self::Text => Value::Text(raw.to_string()),
        }
    }
}

/// Integers with gaps widen to REAL, anything non-numeric is TEXT, and a
/// column with no values at all is TEXT.
pub fn infer_column_type<'a>(values: impl Iterator<Item = &'a str>) -> ColumnType {
    let mut any = false;
    let mut has_empty = false;
    let mut all_int = true;
    let mut all_num = true;
    for v in values {
        let v = v.trim();
        if v.is_empty() {
            has_empty = true;
            continue;
        }
        any = true;
        if v.parse::<i64>().is_err() {
            all_int = false;
            if v.parse::<f64>().is_err() {
                all_num = false;
                break;
            }
        }
    }
    match (any, all_int, all_num) {
        (false, _, _) => ColumnType::Text,
        (true, true, _) if !has_empty => ColumnType::Integer,
        (true, _, true) => ColumnType::Real,
        _ => ColumnType::Text,
    }
}

// ---------------------------------------------------------------------------
// Loading
// ---------------------------------------------------------------------------

/// Drop and recreate one table from a reference extract. Returns rows loaded.
pub fn load_csv_table(conn: &Connection, table: &ReferenceTable) -> Result<usize> {
    let types: Vec<ColumnType> = (0..table.headers.len())
        .map(|i| infer_column_type(table.column(i)))
        .collect();
    for (h, t) in table.headers.iter().zip(&types) {
        tracing::debug!("{}.{h}: {}", table.name, t.sql_name());
    }

    let ident = quote_ident(table.name);
    let columns: Vec<String> = table
        .headers
        .iter()
        .zip(&types)
        .map(|(h, t)| format!("{} {}", quote_ident(h), t.sql_name()))
        .collect();
    conn.execute_batch(&format!(
        "DROP TABLE IF EXISTS {ident}; CREATE TABLE {ident} ({});",
        columns.join(", ")
    ))?;

    let placeholders: Vec<String> = (1..=types.len()).map(|i| format!("?{i}")).collect();
    let mut stmt = conn.prepare(&format!(
        "INSERT INTO {ident} VALUES ({})",
        placeholders.join(", ")
    ))?;
    for record in &table.records {
        let values = types
            .iter()
            .enumerate()
            .map(|(i, t)| t.to_value(record.get(i).unwrap_or("")));
        stmt.execute(rusqlite::params_from_iter(values))?;
    }
    Ok(table.records.len())
}

/// Replace every given table inside a single transaction.
pub fn load_reference_tables(conn: &mut Connection, tables: &[ReferenceTable]) -> Result<Vec<usize>> {
    let tx = conn.transaction()?;
    let mut counts = Vec::with_capacity(tables.len());
    for table in tables {
        counts.push(load_csv_table(&tx, table)?);
    }
    tx.commit()?;
    Ok(counts)
}

// ---------------------------------------------------------------------------
// ensure_store
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub enum StoreStatus {
    Created {
        accounts: usize,
        journal_entries: usize,
    },
    AlreadyPresent,
}

fn staging_path(store: &Path) -> PathBuf {
    let mut name = store.as_os_str().to_owned();
    name.push(".partial");
    PathBuf::from(name)
}

fn build_store(path: &Path, tables: &[ReferenceTable]) -> Result<Vec<usize>> {
    let mut conn = get_connection(path)?;
    let counts = load_reference_tables(&mut conn, tables)?;
    conn.close().map_err(|(_, e)| MigrationError::Db(e))?;
    Ok(counts)
}

/// Create the store from the reference CSVs unless the file already exists.
/// Existing stores are left untouched, whatever the CSVs now contain.
pub fn ensure_store(settings: &Settings) -> Result<StoreStatus> {
    let store = &settings.store_path;
    if store.exists() {
        tracing::info!("store {} already exists, no action needed", store.display());
        return Ok(StoreStatus::AlreadyPresent);
    }
    if let Some(parent) = store.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }

    tracing::info!("store {} not found, creating from reference files", store.display());
    let tables = [
        read_reference_csv(&settings.accounts_csv(), ACCOUNTS_TABLE, ACCOUNTS_COLUMNS)?,
        read_reference_csv(
            &settings.journal_entries_csv(),
            JOURNAL_ENTRIES_TABLE,
            JOURNAL_ENTRIES_COLUMNS,
        )?,
    ];
    tables[1].require_numeric("amount")?;

    let staging = staging_path(store);
    if staging.exists() {
        std::fs::remove_file(&staging)?;
    }
    let counts = match build_store(&staging, &tables) {
        Ok(counts) => counts,
        Err(e) => {
            if let Err(rm) = std::fs::remove_file(&staging) {
                tracing::warn!("could not remove {}: {rm}", staging.display());
            }
            return Err(e);
        }
    };
    std::fs::rename(&staging, store)?;

    tracing::info!(
        "store created: {} accounts, {} journal entries",
        counts[0],
        counts[1]
    );
    Ok(StoreStatus::Created {
        accounts: counts[0],
        journal_entries: counts[1],
    })
}
