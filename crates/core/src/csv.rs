//! CSV row source.
//!
//! Decodes an uploaded recipient list into header-keyed rows. Problems are
//! collected into [`ParsedRows::errors`] instead of aborting, so the caller
//! can decide whether a partially readable file is acceptable (submission
//! validation rejects any file with errors).

use std::collections::HashSet;

use serde::Serialize;

use crate::rows::Row;

/// Byte-order mark some spreadsheet exports prepend to UTF-8 files.
const UTF8_BOM: char = '\u{feff}';

/// Category of a CSV decoding problem.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CsvErrorKind {
    InvalidEncoding,
    MissingQuotes,
    TooFewFields,
    TooManyFields,
}

/// A single decoding problem.
///
/// `row` is the 1-based data row (the header is not counted), or `None`
/// for problems that concern the whole file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, thiserror::Error)]
#[error("{message}")]
pub struct CsvError {
    pub kind: CsvErrorKind,
    pub row: Option<usize>,
    pub message: String,
}

/// Result of decoding a CSV file: the rows that could be read plus every
/// problem encountered along the way.
#[derive(Debug, Clone, Default)]
pub struct ParsedRows {
    pub rows: Vec<Row>,
    pub errors: Vec<CsvError>,
}

/// Parse CSV bytes using the first record as column names.
///
/// Blank lines are skipped. Quoted fields may contain commas, newlines and
/// doubled quotes. A record shorter than the header is kept with the
/// missing columns absent; a longer record has its extra cells dropped.
/// Both cases are also reported as errors.
pub fn parse_csv(data: &[u8]) -> ParsedRows {
    let text = match std::str::from_utf8(data) {
        Ok(text) => text,
        Err(e) => {
            return ParsedRows {
                rows: Vec::new(),
                errors: vec![CsvError {
                    kind: CsvErrorKind::InvalidEncoding,
                    row: None,
                    message: format!("Invalid UTF-8: {e}"),
                }],
            };
        }
    };
    let text = text.strip_prefix(UTF8_BOM).unwrap_or(text);

    let (records, unterminated) = split_records(text);
    let mut records = records.into_iter().filter(|r| !is_blank(r));

    let mut parsed = ParsedRows::default();
    let Some(headers) = records.next() else {
        return parsed;
    };
    let headers = unique_headers(headers);

    for (index, values) in records.enumerate() {
        let row_number = index + 1;

        if values.len() < headers.len() {
            parsed.errors.push(CsvError {
                kind: CsvErrorKind::TooFewFields,
                row: Some(row_number),
                message: format!(
                    "Row {row_number}: expected {} fields but found {}",
                    headers.len(),
                    values.len()
                ),
            });
        } else if values.len() > headers.len() {
            parsed.errors.push(CsvError {
                kind: CsvErrorKind::TooManyFields,
                row: Some(row_number),
                message: format!(
                    "Row {row_number}: expected {} fields but found {}",
                    headers.len(),
                    values.len()
                ),
            });
        }

        let row: Row = headers
            .iter()
            .zip(values)
            .map(|(header, value)| (header.clone(), serde_json::Value::String(value)))
            .collect();
        parsed.rows.push(row);
    }

    if unterminated {
        parsed.errors.push(CsvError {
            kind: CsvErrorKind::MissingQuotes,
            row: Some(parsed.rows.len().max(1)),
            message: "Quoted field is never closed".to_string(),
        });
    }

    parsed
}

/// Rename repeated column names to `name_1`, `name_2`, ... so no cell is
/// overwritten. Names are compared after trimming; blank names are left for
/// the normalizer to drop.
fn unique_headers(headers: Vec<String>) -> Vec<String> {
    let mut taken: HashSet<String> = headers
        .iter()
        .map(|h| h.trim().to_string())
        .filter(|h| !h.is_empty())
        .collect();
    let mut first = HashSet::new();

    headers
        .into_iter()
        .map(|header| {
            let name = header.trim();
            if name.is_empty() || first.insert(name.to_string()) {
                return header;
            }
            let renamed = (1..)
                .map(|n| format!("{name}_{n}"))
                .find(|candidate| !taken.contains(candidate))
                .unwrap_or_default();
            taken.insert(renamed.clone());
            renamed
        })
        .collect()
}

/// A record produced by an empty line.
fn is_blank(record: &[String]) -> bool {
    record.len() == 1 && record[0].trim().is_empty()
}

/// Split text into records of raw fields.
///
/// Returns the records plus whether the input ended inside a quoted field.
fn split_records(text: &str) -> (Vec<Vec<String>>, bool) {
    let mut records = Vec::new();
    let mut record = Vec::new();
    let mut field = String::new();
    let mut in_quotes = false;
    let mut chars = text.chars().peekable();

    while let Some(ch) = chars.next() {
        if in_quotes {
            if ch == '"' {
                if chars.peek() == Some(&'"') {
                    // Escaped quote.
                    field.push('"');
                    chars.next();
                } else {
                    in_quotes = false;
                }
            } else {
                field.push(ch);
            }
            continue;
        }

        match ch {
            '"' => in_quotes = true,
            ',' => record.push(std::mem::take(&mut field)),
            '\r' | '\n' => {
                if ch == '\r' && chars.peek() == Some(&'\n') {
                    chars.next();
                }
                record.push(std::mem::take(&mut field));
                records.push(std::mem::take(&mut record));
            }
            _ => field.push(ch),
        }
    }

    if !field.is_empty() || !record.is_empty() || in_quotes {
        record.push(field);
        records.push(record);
    }

    (records, in_quotes)
}
