//! The in-memory campaign: immutable inputs plus lock-guarded progress.
//!
//! All mutation goes through [`Campaign::record`], which applies the change
//! and publishes the resulting snapshot while still holding the state lock.
//! Observers therefore see snapshots in exactly the order changes happened.

use std::sync::atomic::{AtomicBool, Ordering};

use axum::extract::ws::Message;
use mailcast_core::campaign::{CampaignLog, CampaignSnapshot, CampaignStatus};
use mailcast_core::relay::RelayConnection;
use mailcast_core::rows::Row;
use mailcast_core::submission::ValidatedCampaign;
use mailcast_core::types::{CampaignId, Timestamp};
use tokio::sync::Mutex;

use crate::engine::progress::{ObserverReceiver, ObserverSet};

/// Mutable progress of a campaign.
#[derive(Debug)]
pub struct CampaignState {
    pub status: CampaignStatus,
    pub sent: usize,
    pub failed: usize,
    pub log: CampaignLog,
    pub started_at: Option<Timestamp>,
    pub completed_at: Option<Timestamp>,
    observers: ObserverSet,
}

/// One campaign run against a fixed recipient list and template.
#[derive(Debug)]
pub struct Campaign {
    pub id: CampaignId,
    pub subject: String,
    pub template: String,
    /// Eligible recipient rows in input order.
    pub recipients: Vec<Row>,
    pub email_column: String,
    pub columns: Vec<String>,
    pub relay: RelayConnection,
    /// Formatted `From` header.
    pub sender: String,
    pub delay_ms: u64,
    pub created_at: Timestamp,
    claimed: AtomicBool,
    state: Mutex<CampaignState>,
}

impl Campaign {
    /// Build a queued campaign from a validated submission.
    pub fn new(validated: ValidatedCampaign, max_log_entries: usize) -> Self {
        Self {
            id: uuid::Uuid::new_v4(),
            subject: validated.subject,
            template: validated.template,
            recipients: validated.recipients,
            email_column: validated.email_column,
            columns: validated.columns,
            relay: validated.relay,
            sender: validated.sender,
            delay_ms: validated.delay_ms,
            created_at: chrono::Utc::now(),
            claimed: AtomicBool::new(false),
            state: Mutex::new(CampaignState {
                status: CampaignStatus::Queued,
                sent: 0,
                failed: 0,
                log: CampaignLog::new(max_log_entries),
                started_at: None,
                completed_at: None,
                observers: ObserverSet::new(),
            }),
        }
    }

    pub fn total(&self) -> usize {
        self.recipients.len()
    }

    /// Take the single dispatch slot. Only the first caller gets `true`.
    pub fn claim(&self) -> bool {
        self.claimed
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    /// Current public snapshot.
    pub async fn snapshot(&self) -> CampaignSnapshot {
        let state = self.state.lock().await;
        self.snapshot_of(&state)
    }

    /// Apply a change to the progress state and publish the result.
    pub async fn record<F>(&self, change: F) -> CampaignSnapshot
    where
        F: FnOnce(&mut CampaignState),
    {
        let mut state = self.state.lock().await;
        change(&mut state);
        let snapshot = self.snapshot_of(&state);
        if let Some(frame) = self.frame(&snapshot) {
            state.observers.broadcast(&frame);
        }
        snapshot
    }

    /// Attach an observer and queue the current snapshot as its first frame.
    ///
    /// Returns `None` when the campaign has already been destroyed.
    pub async fn attach(&self, conn_id: String) -> Option<ObserverReceiver> {
        let mut state = self.state.lock().await;
        let rx = state.observers.attach(conn_id.clone())?;
        let snapshot = self.snapshot_of(&state);
        if let Some(frame) = self.frame(&snapshot) {
            state.observers.send_to(&conn_id, frame);
        }
        tracing::debug!(
            campaign_id = %self.id,
            conn_id = %conn_id,
            observers = state.observers.len(),
            "Observer attached",
        );
        Some(rx)
    }

    pub async fn detach(&self, conn_id: &str) {
        let mut state = self.state.lock().await;
        state.observers.detach(conn_id);
        tracing::debug!(campaign_id = %self.id, conn_id = %conn_id, "Observer detached");
    }

    /// Close every observer and refuse new ones.
    pub async fn close_observers(&self) -> usize {
        self.state.lock().await.observers.close()
    }

    pub async fn ping_observers(&self) {
        self.state.lock().await.observers.ping_all();
    }

    pub async fn observer_count(&self) -> usize {
        self.state.lock().await.observers.len()
    }

    fn snapshot_of(&self, state: &CampaignState) -> CampaignSnapshot {
        CampaignSnapshot {
            id: self.id,
            status: state.status,
            subject: self.subject.clone(),
            total: self.total(),
            sent: state.sent,
            failed: state.failed,
            created_at: self.created_at,
            started_at: state.started_at,
            completed_at: state.completed_at,
            delay_ms: self.delay_ms,
            email_column: self.email_column.clone(),
            columns: self.columns.clone(),
            logs: state.log.entries().cloned().collect(),
        }
    }

    fn frame(&self, snapshot: &CampaignSnapshot) -> Option<Message> {
        match serde_json::to_string(snapshot) {
            Ok(json) => Some(Message::Text(json.into())),
            Err(e) => {
                tracing::error!(campaign_id = %self.id, error = %e, "Failed to serialize snapshot");
                None
            }
        }
    }
}
