//! Route handler functions.

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use mindbridge_core::config::StorageBackend;

use crate::error::ApiError;
use crate::state::AppState;
use crate::webhook::{VerifyParams, WebhookPayload};

/// GET /webhook - subscription handshake.
pub async fn verify_webhook(
    State(state): State<AppState>,
    Query(params): Query<VerifyParams>,
) -> Result<String, ApiError> {
    match params.accepted_challenge(&state.verify_token) {
        Some(challenge) => {
            info!("Webhook verified");
            Ok(challenge.to_string())
        }
        None => {
            warn!(mode = ?params.mode, "Webhook verification failed");
            Err(ApiError::Forbidden(
                "Failed validation. Make sure the validation tokens match.".to_string(),
            ))
        }
    }
}

/// POST /webhook - event delivery.
///
/// Acknowledges immediately; every messaging event is handled on its own
/// task so a slow engine never delays the platform's delivery.
pub async fn receive_webhook(
    State(state): State<AppState>,
    Json(payload): Json<WebhookPayload>,
) -> StatusCode {
    if payload.object != "page" {
        debug!(object = %payload.object, "Ignoring non-page delivery");
        return StatusCode::OK;
    }

    for entry in payload.entry {
        if entry.id != *state.page_id {
            warn!(page_id = %entry.id, "No bot configured for page, skipping entry");
            continue;
        }
        for event in entry.messaging {
            let handlers = state.handlers.clone();
            tokio::spawn(async move {
                handlers.dispatch(event).await;
            });
        }
    }

    StatusCode::OK
}

/// GET /system/ping - liveness check.
pub async fn ping() -> &'static str {
    "PONG"
}

/// Response body for GET /health.
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub storage: StorageBackend,
    pub uptime_secs: u64,
}

/// GET /health - service health and configuration summary.
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        storage: state.storage,
        uptime_secs: state.start_time.elapsed().as_secs(),
    })
}
