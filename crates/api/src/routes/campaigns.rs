use axum::routing::{get, post};
use axum::Router;

use crate::handlers::campaigns;
use crate::state::AppState;
use crate::ws;

/// Routes mounted at `/api/v1/campaigns`.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(campaigns::submit_campaign))
        .route("/{id}", get(campaigns::get_campaign))
        .route("/{id}/stream", get(ws::stream_campaign))
}
