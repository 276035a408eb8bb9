//! Axum REST API — state, router, and shared extractors.

pub mod payments;
pub mod tasks;
pub mod webhook;

use std::sync::Arc;

use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Serialize;
use sqlx::SqlitePool;

use crate::config::Config;
use crate::errors::ApiError;
use crate::processor::PaymentProcessor;
use crate::verification::CompletionVerifier;

pub struct ApiState {
    pub pool: SqlitePool,
    pub config: Config,
    pub processor: Arc<dyn PaymentProcessor>,
    pub verifier: Arc<dyn CompletionVerifier>,
}

pub fn router(state: Arc<ApiState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/payments/create-intent", post(payments::create_intent))
        .route(
            "/api/payments/release-escrow",
            post(payments::release_escrow),
        )
        .route("/api/payments/webhook", post(webhook::processor_webhook))
        .route("/api/payments/:id", get(payments::get_payment))
        .route("/api/users/:id/earnings", get(payments::user_earnings))
        .route("/api/tasks/verify", post(tasks::verify_task))
        .with_state(state)
}

// ─────────────────────────────────────────────────────────
// Extractors
// ─────────────────────────────────────────────────────────

/// Caller identity, injected as `x-user-id` by the upstream auth
/// gateway. Session issuance and validation live there, not here.
pub struct AuthedUser(pub String);

#[async_trait]
impl<S> FromRequestParts<S> for AuthedUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .headers
            .get("x-user-id")
            .and_then(|value| value.to_str().ok())
            .filter(|value| !value.is_empty())
            .map(|value| AuthedUser(value.to_string()))
            .ok_or_else(|| ApiError::Unauthorized("authentication required".to_string()))
    }
}

// ─────────────────────────────────────────────────────────
// Handlers
// ─────────────────────────────────────────────────────────

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
}

/// `GET /health`
pub async fn health() -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}
