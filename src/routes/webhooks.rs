use axum::body::Bytes;
use axum::extract::State;
use axum::http::HeaderMap;
use serde_json::json;
use subtle::ConstantTimeEq;

use crate::error::AppError;
use crate::response::ApiResponse;
use crate::state::SharedState;
use crate::webhooks::{GatewayEvent, HandlerError};

pub const SECRET_HEADER: &str = "x-webhook-secret";

fn verify_secret(expected: Option<&str>, headers: &HeaderMap) -> Result<(), AppError> {
    let Some(expected) = expected else {
        return Ok(());
    };

    let provided = headers
        .get(SECRET_HEADER)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();

    if bool::from(provided.as_bytes().ct_eq(expected.as_bytes())) {
        Ok(())
    } else {
        Err(AppError::Unauthorized("Invalid webhook secret".to_string()))
    }
}

/// Receives gateway pushes. Unknown events are acknowledged so the gateway stops retrying.
pub async fn gateway_event(
    State(state): State<SharedState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<ApiResponse<serde_json::Value>, AppError> {
    verify_secret(state.config.webhook_secret.as_deref(), &headers)?;

    let event: GatewayEvent = serde_json::from_slice(&body)
        .map_err(|e| AppError::BadRequest(format!("Invalid event payload: {e}")))?;

    let Some(handler) = state.webhook_handlers.get(&event.event) else {
        tracing::debug!(event = %event.event, session = %event.session, "Ignoring gateway event");
        return Ok(ApiResponse::ok(json!({ "event": event.event, "handled": false })));
    };

    let result = handler
        .handle(&state.pool, &event)
        .await
        .map_err(|e| match e {
            HandlerError::Invalid(msg) => AppError::BadRequest(msg),
            HandlerError::Database(err) => AppError::Database(err),
        })?;

    Ok(ApiResponse::ok(json!({
        "event": event.event,
        "handled": true,
        "result": result,
    })))
}
