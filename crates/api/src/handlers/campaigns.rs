//! Handlers for campaign submission and snapshot queries.

use std::sync::Arc;

use axum::extract::{Multipart, Path, State};
use axum::http::StatusCode;
use axum::Json;
use mailcast_core::campaign::CampaignSnapshot;
use mailcast_core::error::CoreError;
use mailcast_core::submission::{validate_submission, CampaignRequest};
use mailcast_core::template::placeholders;
use mailcast_core::types::CampaignId;
use serde::Serialize;

use crate::engine::Campaign;
use crate::error::{AppError, AppResult};
use crate::response::DataResponse;
use crate::state::AppState;

pub const MSG_INVALID_PORT: &str = "SMTP port must be a number between 1 and 65535.";
pub const MSG_INVALID_DELAY: &str = "Delay must be a whole number of milliseconds.";

/// Response body for an accepted campaign.
#[derive(Debug, Serialize)]
pub struct CreatedCampaign {
    pub id: CampaignId,
    pub snapshot: CampaignSnapshot,
    /// Column names the template refers to, sorted.
    pub placeholders: Vec<String>,
}

/// POST /api/v1/campaigns
///
/// Accepts a multipart form with the recipient CSV and campaign settings,
/// registers the campaign and starts dispatching it in the background.
pub async fn submit_campaign(
    State(state): State<AppState>,
    multipart: Multipart,
) -> AppResult<(StatusCode, Json<DataResponse<CreatedCampaign>>)> {
    let request = read_form(multipart).await?;
    let validated = validate_submission(request, &state.config.campaign.limits())?;

    let campaign = Campaign::new(validated, state.config.campaign.max_log_entries);
    let campaign = state.store.create(campaign).await;
    let snapshot = campaign.snapshot().await;
    state.dispatcher.spawn(Arc::clone(&campaign));

    Ok((
        StatusCode::CREATED,
        Json(DataResponse {
            data: CreatedCampaign {
                id: campaign.id,
                snapshot,
                placeholders: placeholders(&campaign.template),
            },
        }),
    ))
}

/// GET /api/v1/campaigns/{id}
pub async fn get_campaign(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Json<DataResponse<CampaignSnapshot>>> {
    let campaign = find_campaign(&state, &id).await?;
    Ok(Json(DataResponse {
        data: campaign.snapshot().await,
    }))
}

/// Look up a campaign by its path id. Malformed ids are reported as not
/// found, the same as unknown ones.
pub async fn find_campaign(state: &AppState, id: &str) -> AppResult<Arc<Campaign>> {
    let not_found = || {
        AppError::Core(CoreError::NotFound {
            entity: "Campaign",
            id: id.to_string(),
        })
    };
    let campaign_id: CampaignId = id.parse().map_err(|_| not_found())?;
    state.store.get(&campaign_id).await.ok_or_else(not_found)
}

/// Collect the multipart fields into a [`CampaignRequest`].
///
/// Unknown fields are ignored. Numeric fields that do not parse are
/// validation errors; blank ones fall back to the defaults.
async fn read_form(mut multipart: Multipart) -> AppResult<CampaignRequest> {
    let mut request = CampaignRequest::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(e.to_string()))?
    {
        let name = field.name().unwrap_or_default().to_string();
        if name == "file" {
            let bytes = field
                .bytes()
                .await
                .map_err(|e| AppError::BadRequest(e.to_string()))?;
            request.csv = Some(bytes.to_vec());
            continue;
        }

        let value = field
            .text()
            .await
            .map_err(|e| AppError::BadRequest(e.to_string()))?;
        match name.as_str() {
            "sender_email" => request.sender_email = value,
            "sender_name" => request.sender_name = value,
            "smtp_user" => request.smtp_user = Some(value),
            "smtp_password" => request.smtp_password = value,
            "smtp_host" => request.smtp_host = Some(value),
            "smtp_port" => request.smtp_port = parse_port(&value)?,
            "subject" => request.subject = value,
            "template" => request.template = value,
            "delay_ms" => request.delay_ms = parse_delay(&value)?,
            other => tracing::debug!(field = other, "Ignoring unknown form field"),
        }
    }

    Ok(request)
}

fn parse_port(raw: &str) -> Result<Option<u16>, CoreError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(None);
    }
    match raw.parse::<u16>() {
        Ok(port) if port > 0 => Ok(Some(port)),
        _ => Err(CoreError::Validation(MSG_INVALID_PORT.into())),
    }
}

fn parse_delay(raw: &str) -> Result<Option<u64>, CoreError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(None);
    }
    raw.parse::<u64>()
        .map(Some)
        .map_err(|_| CoreError::Validation(MSG_INVALID_DELAY.into()))
}
