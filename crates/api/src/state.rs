use std::sync::Arc;

use crate::config::ServerConfig;
use crate::engine::{CampaignDispatcher, CampaignStore};

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// This is cheaply cloneable (inner data is behind `Arc`).
#[derive(Clone)]
pub struct AppState {
    /// Server configuration.
    pub config: Arc<ServerConfig>,
    /// Registry of live campaigns.
    pub store: Arc<CampaignStore>,
    /// Starts background dispatch for accepted campaigns.
    pub dispatcher: Arc<CampaignDispatcher>,
}
