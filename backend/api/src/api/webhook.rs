//! Processor webhook route.
//!
//! Signature verification happens against the raw body bytes, before
//! any JSON parsing. Internal failures return 500 so the processor's
//! redelivery acts as the retry loop — handling is idempotent, so a
//! redelivered event can only help.

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::HeaderMap;
use axum::Json;
use serde::Serialize;
use tracing::info;

use crate::errors::{ApiError, Result};
use crate::processor::verify_webhook_signature;
use crate::webhook::{handle_event, WebhookEvent};
use crate::db;

use super::ApiState;

#[derive(Debug, Serialize)]
pub struct WebhookAck {
    pub received: bool,
}

/// `POST /api/payments/webhook`
pub async fn processor_webhook(
    State(state): State<Arc<ApiState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<WebhookAck>> {
    let signature = headers
        .get("stripe-signature")
        .and_then(|value| value.to_str().ok())
        .ok_or_else(|| ApiError::Signature("missing stripe-signature header".to_string()))?;

    verify_webhook_signature(
        &body,
        signature,
        &state.config.stripe_webhook_secret,
        state.config.webhook_tolerance_secs,
        db::unix_now(),
    )?;

    let event: WebhookEvent = serde_json::from_slice(&body)
        .map_err(|e| ApiError::Validation(format!("malformed webhook payload: {e}")))?;

    let outcome = handle_event(&state.pool, state.config.escrow_hold_secs(), &event).await?;
    info!("webhook {} ({}): {outcome:?}", event.id, event.event_type);

    Ok(Json(WebhookAck { received: true }))
}
