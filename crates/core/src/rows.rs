//! Recipient row cleaning and email-column detection.

use indexmap::IndexMap;
use serde_json::Value;

use crate::error::CoreError;

/// A recipient row: column name to cell value, in source column order.
pub type Row = IndexMap<String, Value>;

/// Message reported when no column looks like an email address column.
pub const MSG_NO_EMAIL_COLUMN: &str = "Could not find an email column in the CSV.";

/// Clean a batch of raw rows.
///
/// Keys are trimmed and empty keys dropped, string values are trimmed,
/// other values pass through unchanged. Rows left with no columns are
/// discarded.
pub fn normalize_rows(raw: Vec<Row>) -> Vec<Row> {
    raw.into_iter()
        .map(normalize_row)
        .filter(|row| !row.is_empty())
        .collect()
}

/// Clean a single raw row. See [`normalize_rows`].
pub fn normalize_row(raw: Row) -> Row {
    raw.into_iter()
        .filter_map(|(key, value)| {
            let key = key.trim();
            if key.is_empty() {
                return None;
            }
            let value = match value {
                Value::String(s) => Value::String(s.trim().to_string()),
                other => other,
            };
            Some((key.to_string(), value))
        })
        .collect()
}

/// Pick the column holding recipient addresses.
///
/// Scans column names in order: the first containing `email`
/// (case-insensitive) wins, then the first containing `mail`.
pub fn detect_email_column(row: &Row) -> Result<String, CoreError> {
    let find = |needle: &str| {
        row.keys()
            .find(|name| name.to_lowercase().contains(needle))
            .cloned()
    };

    find("email")
        .or_else(|| find("mail"))
        .ok_or_else(|| CoreError::Validation(MSG_NO_EMAIL_COLUMN.to_string()))
}

/// Render a cell as text for addressing and personalization.
///
/// Strings are trimmed, null is empty, numbers and booleans use their
/// display form, arrays and objects render as compact JSON.
pub fn cell_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.trim().to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        other => other.to_string(),
    }
}

/// The recipient address of a row under `column`, or an empty string.
pub fn recipient_address(row: &Row, column: &str) -> String {
    row.get(column).map(cell_text).unwrap_or_default()
}

/// Keep only rows that carry a non-empty address under `column`, in order.
pub fn eligible_recipients(rows: Vec<Row>, column: &str) -> Vec<Row> {
    rows.into_iter()
        .filter(|row| !recipient_address(row, column).is_empty())
        .collect()
}

/// Column names of a row, in order.
pub fn column_names(row: &Row) -> Vec<String> {
    row.keys().cloned().collect()
}
