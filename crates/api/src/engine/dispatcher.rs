//! Per-campaign dispatch loop.
//!
//! One task per campaign. Sends are strictly sequential within a campaign;
//! separate campaigns run concurrently on the runtime.

use std::sync::Arc;
use std::time::Duration;

use mailcast_core::campaign::{CampaignStatus, LogEntry, MSG_MISSING_EMAIL};
use mailcast_core::relay::OutgoingEmail;
use mailcast_core::rows::recipient_address;
use mailcast_core::template::personalize;
use mailcast_delivery::Relay;
use tokio::task::JoinHandle;

use crate::engine::campaign::Campaign;

/// Drives campaigns through `queued -> running -> completed | failed`.
pub struct CampaignDispatcher {
    relay: Arc<dyn Relay>,
}

impl CampaignDispatcher {
    pub fn new(relay: Arc<dyn Relay>) -> Self {
        Self { relay }
    }

    /// Start dispatching `campaign` in the background.
    ///
    /// Returns `None` if the campaign was already claimed by another
    /// dispatch. The returned handle resolves once the campaign is terminal.
    pub fn spawn(&self, campaign: Arc<Campaign>) -> Option<JoinHandle<()>> {
        if !campaign.claim() {
            tracing::warn!(campaign_id = %campaign.id, "Campaign already dispatched, ignoring");
            return None;
        }

        let relay = Arc::clone(&self.relay);
        Some(tokio::spawn(async move {
            let worker = tokio::spawn(run(relay, Arc::clone(&campaign)));
            if let Err(e) = worker.await {
                tracing::error!(campaign_id = %campaign.id, error = %e, "Dispatch task aborted");
                fail(&campaign, format!("Dispatch aborted: {e}")).await;
            }
        }))
    }
}

/// Run one campaign to a terminal state.
async fn run(relay: Arc<dyn Relay>, campaign: Arc<Campaign>) {
    let id = campaign.id;

    if let Err(e) = relay.verify(&campaign.relay).await {
        tracing::warn!(campaign_id = %id, error = %e, "SMTP verification failed");
        fail(&campaign, format!("SMTP verification failed: {e}")).await;
        return;
    }

    campaign
        .record(|s| {
            s.status = CampaignStatus::Running;
            s.started_at = Some(chrono::Utc::now());
        })
        .await;
    tracing::info!(campaign_id = %id, total = campaign.total(), "Campaign started");

    let delay = Duration::from_millis(campaign.delay_ms);
    let last = campaign.total().saturating_sub(1);

    for (index, row) in campaign.recipients.iter().enumerate() {
        let to = recipient_address(row, &campaign.email_column);
        if to.is_empty() {
            campaign
                .record(|s| {
                    s.failed += 1;
                    s.log.push(LogEntry::error(None, MSG_MISSING_EMAIL));
                })
                .await;
            tracing::debug!(campaign_id = %id, index, "Recipient has no address");
            continue;
        }

        let email = OutgoingEmail {
            from: campaign.sender.clone(),
            to: to.clone(),
            subject: campaign.subject.clone(),
            html: personalize(&campaign.template, row),
        };

        match relay.send(&campaign.relay, &email).await {
            Ok(()) => {
                campaign
                    .record(|s| {
                        s.sent += 1;
                        s.log.push(LogEntry::success(to.clone()));
                    })
                    .await;
                tracing::debug!(campaign_id = %id, email = %to, "Email sent");
            }
            Err(e) if e.is_fatal() => {
                tracing::error!(campaign_id = %id, email = %to, error = %e, "Relay unavailable, aborting campaign");
                fail(&campaign, format!("Relay became unavailable: {e}")).await;
                return;
            }
            Err(e) => {
                campaign
                    .record(|s| {
                        s.failed += 1;
                        s.log.push(LogEntry::error(Some(to.clone()), e.to_string()));
                    })
                    .await;
                tracing::warn!(campaign_id = %id, email = %to, error = %e, "Email rejected");
            }
        }

        if !delay.is_zero() && index < last {
            tokio::time::sleep(delay).await;
        }
    }

    let snapshot = campaign
        .record(|s| {
            s.status = CampaignStatus::Completed;
            s.completed_at = Some(chrono::Utc::now());
        })
        .await;
    tracing::info!(
        campaign_id = %id,
        sent = snapshot.sent,
        failed = snapshot.failed,
        "Campaign completed",
    );
}

/// Move a campaign to `failed` with a campaign-level log entry.
///
/// Recipients without an outcome yet are counted as failed. A campaign that
/// is already terminal is left untouched.
async fn fail(campaign: &Campaign, reason: String) {
    let total = campaign.total();
    campaign
        .record(|s| {
            if s.status.is_terminal() {
                return;
            }
            s.status = CampaignStatus::Failed;
            s.failed = total - s.sent;
            s.completed_at = Some(chrono::Utc::now());
            s.log.push(LogEntry::error(None, reason));
        })
        .await;
}
