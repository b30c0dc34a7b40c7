//! Campaign execution engine.
//!
//! - [`campaign`]: the in-memory campaign (job) object and its state.
//! - [`progress`]: per-campaign observer set that snapshots fan out to.
//! - [`store`]: process-wide registry with time-to-live reaping.
//! - [`dispatcher`]: the per-campaign send loop.

pub mod campaign;
pub mod dispatcher;
pub mod progress;
pub mod store;

pub use campaign::Campaign;
pub use dispatcher::CampaignDispatcher;
pub use progress::{ObserverReceiver, ObserverSet};
pub use store::CampaignStore;
