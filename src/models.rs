use serde::Serialize;

/// A row type written to one of the pipeline CSVs. The header is fixed so an
/// empty result still produces a header-only file.
pub trait CsvRow: Serialize {
    const HEADER: &'static [&'static str];
}

/// One journal entry joined to its account, with derived debit/credit split.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TransformedRow {
    pub transaction_id: String,
    pub transaction_date: Option<String>,
    pub account_number: Option<String>,
    pub account_name: Option<String>,
    pub debit_amount: f64,
    pub credit_amount: f64,
    pub is_valid_transaction: i64,
}

impl CsvRow for TransformedRow {
    const HEADER: &'static [&'static str] = &[
        "transaction_id",
        "transaction_date",
        "account_number",
        "account_name",
        "debit_amount",
        "credit_amount",
        "is_valid_transaction",
    ];
}

/// A transaction whose debits and credits do not net to zero.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidationRow {
    pub transaction_id: String,
    pub total_debits: f64,
    pub total_credits: f64,
}

impl CsvRow for ValidationRow {
    const HEADER: &'static [&'static str] = &["transaction_id", "total_debits", "total_credits"];
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SummaryRow {
    pub account_name: Option<String>,
    pub final_balance: f64,
}

impl CsvRow for SummaryRow {
    const HEADER: &'static [&'static str] = &["account_name", "final_balance"];
}
