//! Campaign submission validation.
//!
//! Turns the raw fields of a submission into a [`ValidatedCampaign`], or
//! rejects it with a single caller-facing [`CoreError::Validation`]
//! message. Checks run in a fixed order and the first failure wins.

use crate::campaign::sender_header;
use crate::csv::parse_csv;
use crate::error::CoreError;
use crate::relay::RelayConnection;
use crate::rows::{column_names, detect_email_column, eligible_recipients, normalize_rows, Row};

// ---------------------------------------------------------------------------
// Messages
// ---------------------------------------------------------------------------

pub const MSG_FILE_REQUIRED: &str = "A CSV file with recipients is required.";
pub const MSG_SENDER_REQUIRED: &str = "Sender email is required.";
pub const MSG_PASSWORD_REQUIRED: &str = "SMTP password is required.";
pub const MSG_SUBJECT_REQUIRED: &str = "Subject is required.";
pub const MSG_TEMPLATE_REQUIRED: &str = "Email template is required.";
pub const MSG_NO_ROWS: &str = "The CSV file contains no rows.";
pub const MSG_NO_RECIPIENTS: &str = "No rows with an email address were found.";

// ---------------------------------------------------------------------------
// Input / output
// ---------------------------------------------------------------------------

/// Raw submission fields as received from the request layer.
#[derive(Debug, Clone, Default)]
pub struct CampaignRequest {
    /// Uploaded CSV bytes, if a file was attached.
    pub csv: Option<Vec<u8>>,
    pub sender_email: String,
    pub sender_name: String,
    /// Relay login; defaults to the sender address.
    pub smtp_user: Option<String>,
    pub smtp_password: String,
    pub smtp_host: Option<String>,
    pub smtp_port: Option<u16>,
    pub subject: String,
    pub template: String,
    /// Per-recipient delay override in milliseconds.
    pub delay_ms: Option<u64>,
}

/// Server-side limits and defaults applied during validation.
#[derive(Debug, Clone)]
pub struct SubmissionLimits {
    pub max_recipients: usize,
    pub default_delay_ms: u64,
    pub max_delay_ms: u64,
    pub default_smtp_host: String,
    pub default_smtp_port: u16,
}

/// A submission that passed every check, ready to become a campaign.
#[derive(Debug, Clone)]
pub struct ValidatedCampaign {
    pub subject: String,
    pub template: String,
    /// Eligible recipient rows, in input order.
    pub recipients: Vec<Row>,
    pub email_column: String,
    /// Column names of the first cleaned row.
    pub columns: Vec<String>,
    pub relay: RelayConnection,
    pub sender: String,
    pub delay_ms: u64,
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

fn reject(message: impl Into<String>) -> CoreError {
    CoreError::Validation(message.into())
}

/// Validate a submission and decode its recipient list.
pub fn validate_submission(
    request: CampaignRequest,
    limits: &SubmissionLimits,
) -> Result<ValidatedCampaign, CoreError> {
    let csv = match request.csv {
        Some(bytes) if !bytes.is_empty() => bytes,
        _ => return Err(reject(MSG_FILE_REQUIRED)),
    };

    let sender_email = request.sender_email.trim().to_string();
    if sender_email.is_empty() {
        return Err(reject(MSG_SENDER_REQUIRED));
    }
    if request.smtp_password.trim().is_empty() {
        return Err(reject(MSG_PASSWORD_REQUIRED));
    }
    let subject = request.subject.trim().to_string();
    if subject.is_empty() {
        return Err(reject(MSG_SUBJECT_REQUIRED));
    }
    if request.template.trim().is_empty() {
        return Err(reject(MSG_TEMPLATE_REQUIRED));
    }

    let parsed = parse_csv(&csv);
    if let Some(first) = parsed.errors.first() {
        return Err(reject(format!("Could not parse CSV: {first}")));
    }

    let rows = normalize_rows(parsed.rows);
    let Some(first_row) = rows.first() else {
        return Err(reject(MSG_NO_ROWS));
    };

    let email_column = detect_email_column(first_row)?;
    let columns = column_names(first_row);

    let recipients = eligible_recipients(rows, &email_column);
    if recipients.is_empty() {
        return Err(reject(MSG_NO_RECIPIENTS));
    }
    if recipients.len() > limits.max_recipients {
        return Err(reject(format!(
            "Too many recipients: {} (maximum is {}).",
            recipients.len(),
            limits.max_recipients
        )));
    }

    let username = request
        .smtp_user
        .map(|u| u.trim().to_string())
        .filter(|u| !u.is_empty())
        .unwrap_or_else(|| sender_email.clone());
    let host = request
        .smtp_host
        .map(|h| h.trim().to_string())
        .filter(|h| !h.is_empty())
        .unwrap_or_else(|| limits.default_smtp_host.clone());

    Ok(ValidatedCampaign {
        subject,
        template: request.template,
        recipients,
        email_column,
        columns,
        relay: RelayConnection {
            host,
            port: request.smtp_port.unwrap_or(limits.default_smtp_port),
            username,
            password: request.smtp_password,
        },
        sender: sender_header(&request.sender_name, &sender_email),
        delay_ms: request
            .delay_ms
            .unwrap_or(limits.default_delay_ms)
            .min(limits.max_delay_ms),
    })
}
