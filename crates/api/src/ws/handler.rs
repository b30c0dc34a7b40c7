use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::ws::rejection::WebSocketUpgradeRejection;
use axum::extract::{Path, State};
use axum::response::{IntoResponse, Response};
use futures::{SinkExt, StreamExt};

use crate::engine::Campaign;
use crate::error::AppError;
use crate::handlers::campaigns::find_campaign;
use crate::state::AppState;

/// GET /api/v1/campaigns/{id}/stream
///
/// Upgrades to a WebSocket that receives the campaign snapshot as JSON text
/// frames: the current one right away, then one per change. Unknown ids are
/// answered with 404 before any upgrade happens.
pub async fn stream_campaign(
    State(state): State<AppState>,
    Path(id): Path<String>,
    ws: Result<WebSocketUpgrade, WebSocketUpgradeRejection>,
) -> Response {
    let campaign = match find_campaign(&state, &id).await {
        Ok(campaign) => campaign,
        Err(e) => return e.into_response(),
    };
    let ws = match ws {
        Ok(ws) => ws,
        Err(rejection) => {
            return AppError::BadRequest(rejection.body_text()).into_response();
        }
    };

    ws.on_upgrade(move |socket| handle_socket(socket, campaign))
}

/// Serve one observer connection until either side goes away.
///
/// The sender task drains the observer channel into the socket; the
/// receiver task watches for the client closing. The first to finish ends
/// the connection and the observer is detached.
async fn handle_socket(socket: WebSocket, campaign: Arc<Campaign>) {
    let conn_id = uuid::Uuid::new_v4().to_string();

    let Some(mut rx) = campaign.attach(conn_id.clone()).await else {
        tracing::debug!(campaign_id = %campaign.id, conn_id = %conn_id, "Campaign closed before attach");
        return;
    };
    tracing::info!(campaign_id = %campaign.id, conn_id = %conn_id, "Stream connected");

    let (mut sink, mut stream) = socket.split();

    let sender_conn_id = conn_id.clone();
    let mut send_task = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            let closing = matches!(msg, Message::Close(_));
            if sink.send(msg).await.is_err() {
                tracing::debug!(conn_id = %sender_conn_id, "WebSocket sink closed");
                break;
            }
            if closing {
                break;
            }
        }
    });

    let receiver_conn_id = conn_id.clone();
    let mut recv_task = tokio::spawn(async move {
        while let Some(result) = stream.next().await {
            match result {
                Ok(Message::Close(_)) => break,
                Ok(Message::Pong(_)) => {
                    tracing::trace!(conn_id = %receiver_conn_id, "Pong received");
                }
                Ok(_) => {}
                Err(e) => {
                    tracing::debug!(conn_id = %receiver_conn_id, error = %e, "WebSocket receive error");
                    break;
                }
            }
        }
    });

    tokio::select! {
        _ = &mut send_task => recv_task.abort(),
        _ = &mut recv_task => send_task.abort(),
    }

    campaign.detach(&conn_id).await;
    tracing::info!(campaign_id = %campaign.id, conn_id = %conn_id, "Stream disconnected");
}
