//! Campaign data model: lifecycle status, outcome log, and the public
//! snapshot pushed to observers.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use crate::types::{CampaignId, Timestamp};

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Default number of log entries retained per campaign.
pub const DEFAULT_MAX_LOG_ENTRIES: usize = 200;

/// Log message for a recipient row without an address.
pub const MSG_MISSING_EMAIL: &str = "missing email address";

// ---------------------------------------------------------------------------
// Status
// ---------------------------------------------------------------------------

/// Campaign lifecycle status.
///
/// `Queued -> Running -> Completed | Failed`. A relay verification failure
/// goes straight from `Queued` to `Failed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CampaignStatus {
    Queued,
    Running,
    Completed,
    Failed,
}

impl CampaignStatus {
    /// Stable string representation matching serde's `rename_all = "snake_case"`.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Queued => "queued",
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }

    /// Whether no further transitions can happen.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

impl std::fmt::Display for CampaignStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Log
// ---------------------------------------------------------------------------

/// Outcome kind of a log entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogKind {
    Success,
    Error,
}

/// Outcome for one recipient, or a campaign-level error (`email` is `None`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    pub kind: LogKind,
    pub email: Option<String>,
    pub message: Option<String>,
    pub at: Timestamp,
}

impl LogEntry {
    /// A successful delivery to `email`.
    pub fn success(email: impl Into<String>) -> Self {
        Self {
            kind: LogKind::Success,
            email: Some(email.into()),
            message: None,
            at: chrono::Utc::now(),
        }
    }

    /// A failure, either for one recipient or for the whole campaign.
    pub fn error(email: Option<String>, message: impl Into<String>) -> Self {
        Self {
            kind: LogKind::Error,
            email,
            message: Some(message.into()),
            at: chrono::Utc::now(),
        }
    }
}

/// Bounded, most-recent-first outcome log.
#[derive(Debug, Clone)]
pub struct CampaignLog {
    entries: VecDeque<LogEntry>,
    capacity: usize,
}

impl CampaignLog {
    /// Create an empty log holding at most `capacity` entries (minimum 1).
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Record an entry at the front, dropping the oldest once full.
    pub fn push(&mut self, entry: LogEntry) {
        self.entries.push_front(entry);
        self.entries.truncate(self.capacity);
    }

    /// Entries, newest first.
    pub fn entries(&self) -> impl Iterator<Item = &LogEntry> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for CampaignLog {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_LOG_ENTRIES)
    }
}

// ---------------------------------------------------------------------------
// Snapshot
// ---------------------------------------------------------------------------

/// Public, serializable view of a campaign's current state.
///
/// This is the payload returned by the snapshot query and pushed to every
/// live observer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CampaignSnapshot {
    pub id: CampaignId,
    pub status: CampaignStatus,
    pub subject: String,
    pub total: usize,
    pub sent: usize,
    pub failed: usize,
    pub created_at: Timestamp,
    pub started_at: Option<Timestamp>,
    pub completed_at: Option<Timestamp>,
    pub delay_ms: u64,
    pub email_column: String,
    pub columns: Vec<String>,
    /// Newest first.
    pub logs: Vec<LogEntry>,
}

impl CampaignSnapshot {
    /// Recipients with a recorded outcome.
    pub fn processed(&self) -> usize {
        self.sent + self.failed
    }
}

/// Format the `From` header: `Name <address>` or the bare address.
///
/// Names with characters outside letters, digits, spaces and `-_.'` are
/// quoted so the header stays parseable.
pub fn sender_header(display_name: &str, address: &str) -> String {
    let name = display_name.trim();
    if name.is_empty() {
        return address.to_string();
    }

    let plain = name
        .chars()
        .all(|c| c.is_alphanumeric() || matches!(c, ' ' | '-' | '_' | '.' | '\''));
    if plain {
        format!("{name} <{address}>")
    } else {
        let escaped = name.replace('\\', "\\\\").replace('"', "\\\"");
        format!("\"{escaped}\" <{address}>")
    }
}
