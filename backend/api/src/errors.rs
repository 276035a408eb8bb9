//! Application-wide error types and their HTTP mapping.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;
use tracing::error;

use taskpay_policy::{cents_to_dollars, AmountError};

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Stored value corrupt: {0}")]
    Corrupt(#[from] taskpay_policy::ParseError),

    #[error("{0}")]
    Validation(String),

    #[error(transparent)]
    Amount(#[from] AmountError),

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("Payment processor error: {0}")]
    Processor(String),

    #[error("Verifier error: {0}")]
    Verifier(String),

    #[error("Webhook signature rejected: {0}")]
    Signature(String),
}

pub type Result<T> = std::result::Result<T, ApiError>;

/// JSON error envelope returned by every handler.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    /// Corrected amount in dollars, present on amount-bound violations.
    #[serde(rename = "suggestedAmount", skip_serializing_if = "Option::is_none")]
    pub suggested_amount: Option<f64>,
}

impl ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::Validation(_) | Self::Amount(_) | Self::Signature(_) => StatusCode::BAD_REQUEST,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::Processor(_) | Self::Verifier(_) => StatusCode::BAD_GATEWAY,
            Self::Database(_)
            | Self::Migrate(_)
            | Self::Http(_)
            | Self::Json(_)
            | Self::Config(_)
            | Self::Corrupt(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            error!("request failed: {self}");
        }

        let suggested_amount = match &self {
            Self::Amount(err) => err.suggestion_cents().map(cents_to_dollars),
            _ => None,
        };

        // Internal details stay in the logs; clients get a generic line.
        let message = if status == StatusCode::INTERNAL_SERVER_ERROR {
            "internal server error".to_string()
        } else {
            self.to_string()
        };

        (
            status,
            Json(ErrorResponse {
                error: message,
                suggested_amount,
            }),
        )
            .into_response()
    }
}

// ─────────────────────────────────────────────────────────
// Unit tests
// ─────────────────────────────────────────────────────────
