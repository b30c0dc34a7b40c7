pub mod campaigns;
pub mod health;

use axum::Router;

use crate::state::AppState;

/// Build the `/api/v1` route tree.
///
/// Route hierarchy:
///
/// ```text
/// /campaigns                   POST submit (multipart)
/// /campaigns/{id}              GET snapshot
/// /campaigns/{id}/stream       GET WebSocket progress stream
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new().nest("/campaigns", campaigns::router())
}
