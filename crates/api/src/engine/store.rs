//! Process-wide campaign registry.
//!
//! Every created campaign gets a one-shot reaper task that removes it a
//! fixed time after creation, whatever its status. The reaper holds only
//! the campaign id and a weak handle to the store, and tolerates the id
//! being gone already.

use std::collections::HashMap;
use std::sync::{Arc, Weak};
use std::time::Duration;

use mailcast_core::types::CampaignId;
use tokio::sync::RwLock;

use crate::engine::campaign::Campaign;

/// Registry of live campaigns keyed by id.
pub struct CampaignStore {
    campaigns: RwLock<HashMap<CampaignId, Arc<Campaign>>>,
    ttl: Duration,
}

impl CampaignStore {
    /// Create an empty store whose campaigns live for `ttl`.
    pub fn new(ttl: Duration) -> Self {
        Self {
            campaigns: RwLock::new(HashMap::new()),
            ttl,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Register a campaign and schedule its destruction.
    pub async fn create(self: &Arc<Self>, campaign: Campaign) -> Arc<Campaign> {
        let campaign = Arc::new(campaign);
        let id = campaign.id;
        self.campaigns.write().await.insert(id, Arc::clone(&campaign));
        self.schedule_reap(id);
        tracing::info!(campaign_id = %id, total = campaign.total(), "Campaign created");
        campaign
    }

    pub async fn get(&self, id: &CampaignId) -> Option<Arc<Campaign>> {
        self.campaigns.read().await.get(id).cloned()
    }

    /// Remove a campaign and close its observers.
    ///
    /// Returns `false` when the id was not registered. A dispatch task still
    /// holding the campaign keeps running; its publishes reach no one.
    pub async fn destroy(&self, id: &CampaignId) -> bool {
        let removed = self.campaigns.write().await.remove(id);
        match removed {
            Some(campaign) => {
                let closed = campaign.close_observers().await;
                tracing::info!(campaign_id = %id, observers = closed, "Campaign destroyed");
                true
            }
            None => false,
        }
    }

    pub async fn len(&self) -> usize {
        self.campaigns.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.campaigns.read().await.is_empty()
    }

    /// Send a Ping frame to every observer of every campaign.
    pub async fn ping_observers(&self) -> usize {
        let campaigns = self.all().await;
        let mut observers = 0;
        for campaign in &campaigns {
            campaign.ping_observers().await;
            observers += campaign.observer_count().await;
        }
        observers
    }

    /// Close every observer of every campaign. Used on server shutdown.
    pub async fn shutdown_all(&self) {
        let campaigns = self.all().await;
        let mut closed = 0;
        for campaign in &campaigns {
            closed += campaign.close_observers().await;
        }
        tracing::info!(campaigns = campaigns.len(), observers = closed, "Closed all observers");
    }

    async fn all(&self) -> Vec<Arc<Campaign>> {
        self.campaigns.read().await.values().cloned().collect()
    }

    fn schedule_reap(self: &Arc<Self>, id: CampaignId) {
        let store: Weak<Self> = Arc::downgrade(self);
        let ttl = self.ttl;
        tokio::spawn(async move {
            tokio::time::sleep(ttl).await;
            let Some(store) = store.upgrade() else {
                return;
            };
            if !store.destroy(&id).await {
                tracing::debug!(campaign_id = %id, "Campaign already gone at expiry");
            }
        });
    }
}
