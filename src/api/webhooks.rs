// src/api/webhooks.rs — Inbound conversation-provider webhook
//
// The body is taken as raw bytes so that every malformed payload maps to
// 400 with a JSON error, rather than an extractor rejection.

use axum::body::Bytes;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;

use crate::api::types::{ErrorResponse, WebhookIgnored, WebhookProcessed};
use crate::api::ApiState;
use crate::infra::errors::IngestError;
use crate::ingest::{self, ValidPayload};

/// POST /api/v1/webhooks/conversation
pub async fn receive_conversation_event(State(state): State<ApiState>, body: Bytes) -> Response {
    match handle(&state, &body).await {
        Ok(resp) => resp,
        Err(e) if e.is_client_error() => {
            tracing::warn!("Rejected webhook: {e}");
            error_response(StatusCode::BAD_REQUEST, e.to_string())
        }
        Err(e) => {
            tracing::error!("Webhook processing failed: {e}");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
        }
    }
}

async fn handle(state: &ApiState, body: &[u8]) -> Result<Response, IngestError> {
    let value: serde_json::Value =
        serde_json::from_slice(body).map_err(|e| IngestError::InvalidBody(e.to_string()))?;

    match ingest::validate(&value)? {
        ValidPayload::Ignored {
            conversation_id,
            event_type,
        } => {
            tracing::debug!("Ignoring '{event_type}' event for {conversation_id}");
            Ok((
                StatusCode::OK,
                Json(WebhookIgnored {
                    success: true,
                    ignored: true,
                    event_type,
                }),
            )
                .into_response())
        }
        ValidPayload::Transcript {
            conversation_id,
            timestamp,
            messages,
        } => {
            tracing::info!(
                "Transcript ready for {conversation_id} (sent {})",
                timestamp.as_deref().unwrap_or("unknown")
            );
            let report = ingest::ingest(
                &state.store,
                state.scoring.as_deref(),
                &conversation_id,
                messages,
            )
            .await?;
            Ok((StatusCode::OK, Json(WebhookProcessed::from(report))).into_response())
        }
    }
}

fn error_response(status: StatusCode, error: String) -> Response {
    (status, Json(ErrorResponse { error })).into_response()
}
