//! Per-recipient message personalization.
//!
//! Templates reference row columns as `$(column name)`. Substitution is a
//! single left-to-right pass: inserted values are never scanned again, so a
//! cell containing `$(other)` appears literally in the output.
//!
//! No HTML escaping is performed. The personalized text is used verbatim as
//! the message body, so markup in row data reaches the recipient unchanged.

use std::sync::LazyLock;

use regex::{Captures, Regex};

use crate::rows::{cell_text, Row};

/// Regex pattern matching `$(name)` placeholders. Names may contain any
/// character except the closing parenthesis.
pub const PLACEHOLDER_PATTERN: &str = r"\$\(([^)]*)\)";

static PLACEHOLDER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(PLACEHOLDER_PATTERN).expect("valid regex"));

/// Substitute every placeholder in `template` with the matching cell of
/// `row`. Absent columns and null cells become the empty string.
///
/// # Examples
///
/// ```
/// use mailcast_core::rows::Row;
/// use mailcast_core::template::personalize;
///
/// let mut row = Row::new();
/// row.insert("name".into(), "Ann".into());
///
/// assert_eq!(personalize("Hi $(name)", &row), "Hi Ann");
/// assert_eq!(personalize("Hi $(name)", &Row::new()), "Hi ");
/// ```
pub fn personalize(template: &str, row: &Row) -> String {
    PLACEHOLDER_RE
        .replace_all(template, |caps: &Captures| {
            let name = caps[1].trim();
            row.get(name).map(cell_text).unwrap_or_default()
        })
        .into_owned()
}

/// List the column names a template refers to.
///
/// Returns a de-duplicated, sorted list of names (without the `$( )`).
pub fn placeholders(template: &str) -> Vec<String> {
    let mut names: Vec<String> = PLACEHOLDER_RE
        .captures_iter(template)
        .map(|caps| caps[1].trim().to_string())
        .collect();
    names.sort();
    names.dedup();
    names
}
