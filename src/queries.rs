use rusqlite::{Connection, Statement};

use crate::db::value_to_string;
use crate::error::{MigrationError, Result};
use crate::models::{CsvRow, SummaryRow, TransformedRow, ValidationRow};

pub const UNBALANCED_LIMIT: usize = 10;

// ---------------------------------------------------------------------------
// Fixed queries
// ---------------------------------------------------------------------------

pub const TRANSFORM_QUERY: &str = "
SELECT
    a.transaction_id AS transaction_id,
    DATE(a.transaction_date) AS transaction_date,
    a.account_number AS account_number,
    b.account_name AS account_name,
    CASE WHEN a.amount > 0 THEN a.amount ELSE 0 END AS debit_amount,
    CASE WHEN a.amount < 0 THEN ABS(a.amount) ELSE 0 END AS credit_amount,
    CASE
        WHEN strftime('%Y', DATE(a.transaction_date)) = '2024' AND b.account_number IS NOT NULL
        THEN 1
        ELSE 0
    END AS is_valid_transaction
FROM journal_entries a
LEFT JOIN accounts b ON a.account_number = b.account_number
ORDER BY a.rowid
";

/// Unbalanced transactions, capped at ten. Ordered by id so the cap always
/// keeps the same ten.
pub const UNBALANCED_QUERY: &str = "
WITH transformed AS (
    SELECT
        transaction_id,
        CASE WHEN amount > 0 THEN amount ELSE 0 END AS debit_amount,
        CASE WHEN amount < 0 THEN ABS(amount) ELSE 0 END AS credit_amount
    FROM journal_entries
)
SELECT
    transaction_id,
    SUM(debit_amount) AS total_debits,
    SUM(credit_amount) AS total_credits
FROM transformed
GROUP BY transaction_id
HAVING SUM(debit_amount) != SUM(credit_amount)
ORDER BY transaction_id
LIMIT 10
";

pub const ACCOUNT_SUMMARY_QUERY: &str = "
WITH
entries AS (
    SELECT
        a.transaction_id,
        DATE(a.transaction_date) AS transaction_date,
        a.account_number,
        b.account_name,
        CASE WHEN a.amount > 0 THEN a.amount ELSE 0 END AS debit_amount,
        CASE WHEN a.amount < 0 THEN ABS(a.amount) ELSE 0 END AS credit_amount,
        CASE
            WHEN strftime('%Y', DATE(a.transaction_date)) = '2024' AND b.account_number IS NOT NULL
            THEN 1
            ELSE 0
        END AS is_valid_transaction
    FROM journal_entries a
    LEFT JOIN accounts b ON a.account_number = b.account_number
),
balanced AS (
    SELECT transaction_id
    FROM entries
    GROUP BY transaction_id
    HAVING SUM(debit_amount) = SUM(credit_amount)
)
SELECT
    account_name,
    SUM(debit_amount) - SUM(credit_amount) AS final_balance
FROM entries
WHERE transaction_id IN (SELECT transaction_id FROM balanced) AND is_valid_transaction = 1
GROUP BY account_name
ORDER BY account_name
";

// ---------------------------------------------------------------------------
// Result-set checks
// ---------------------------------------------------------------------------

/// Reject a result set that does not expose every column of `T`.
fn ensure_columns<T: CsvRow>(stmt: &Statement<'_>) -> Result<()> {
    let names = stmt.column_names();
    let missing: Vec<&str> = T::HEADER
        .iter()
        .copied()
        .filter(|c| !names.contains(c))
        .collect();
    if missing.is_empty() {
        Ok(())
    } else {
        Err(MigrationError::Schema(format!(
            "query result is missing columns: {}",
            missing.join(", ")
        )))
    }
}

fn required_text(value: Option<String>, column: &str) -> rusqlite::Result<String> {
    value.ok_or_else(|| {
        rusqlite::Error::InvalidColumnType(0, column.to_string(), rusqlite::types::Type::Null)
    })
}

// ---------------------------------------------------------------------------
// Fetchers
// ---------------------------------------------------------------------------

pub fn fetch_transformed(conn: &Connection) -> Result<Vec<TransformedRow>> {
    let mut stmt = conn.prepare(TRANSFORM_QUERY)?;
    ensure_columns::<TransformedRow>(&stmt)?;
    let rows = stmt.query_map([], |row| {
        Ok(TransformedRow {
            transaction_id: required_text(value_to_string(row.get_ref(0)?), "transaction_id")?,
            transaction_date: row.get(1)?,
            account_number: value_to_string(row.get_ref(2)?),
            account_name: value_to_string(row.get_ref(3)?),
            debit_amount: row.get(4)?,
            credit_amount: row.get(5)?,
            is_valid_transaction: row.get(6)?,
        })
    })?;
    Ok(rows.collect::<std::result::Result<Vec<_>, _>>()?)
}

pub fn fetch_unbalanced(conn: &Connection) -> Result<Vec<ValidationRow>> {
    let mut stmt = conn.prepare(UNBALANCED_QUERY)?;
    ensure_columns::<ValidationRow>(&stmt)?;
    let rows = stmt.query_map([], |row| {
        Ok(ValidationRow {
            transaction_id: required_text(value_to_string(row.get_ref(0)?), "transaction_id")?,
            total_debits: row.get(1)?,
            total_credits: row.get(2)?,
        })
    })?;
    Ok(rows.collect::<std::result::Result<Vec<_>, _>>()?)
}

pub fn fetch_account_summary(conn: &Connection) -> Result<Vec<SummaryRow>> {
    let mut stmt = conn.prepare(ACCOUNT_SUMMARY_QUERY)?;
    ensure_columns::<SummaryRow>(&stmt)?;
    let rows = stmt.query_map([], |row| {
        Ok(SummaryRow {
            account_name: value_to_string(row.get_ref(0)?),
            final_balance: row.get(1)?,
        })
    })?;
    Ok(rows.collect::<std::result::Result<Vec<_>, _>>()?)
}
