//! Application configuration loaded from environment variables.

use crate::errors::{ApiError, Result};

#[derive(Debug, Clone)]
pub struct Config {
    /// Path to the SQLite database file
    pub database_url: String,
    /// Port for the REST API server
    pub api_port: u16,
    /// Secret key for the card processor API
    pub stripe_secret_key: String,
    /// Signing secret for incoming processor webhooks
    pub stripe_webhook_secret: String,
    /// Maximum accepted age (seconds) of a webhook signature timestamp
    pub webhook_tolerance_secs: i64,
    /// Endpoint of the AI completion-verification service
    pub ai_verifier_url: String,
    /// Optional bearer token for the verification service
    pub ai_verifier_api_key: Option<String>,
    /// Hours funds stay escrowed before becoming auto-releasable
    pub escrow_hold_hours: i64,
    /// How often (in seconds) the sweeper scans for due escrows
    pub sweep_interval_secs: u64,
    /// Maximum escrows released per sweep pass
    pub sweep_batch_size: u32,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Ok(Config {
            database_url: env_var("DATABASE_URL")
                .unwrap_or_else(|_| "sqlite:./taskpay.db".to_string()),
            api_port: env_var("API_PORT")
                .unwrap_or_else(|_| "3001".to_string())
                .parse()
                .map_err(|_| ApiError::Config("Invalid API_PORT".to_string()))?,
            stripe_secret_key: env_var("STRIPE_SECRET_KEY").map_err(|_| {
                ApiError::Config("STRIPE_SECRET_KEY environment variable is required".to_string())
            })?,
            stripe_webhook_secret: env_var("STRIPE_WEBHOOK_SECRET").map_err(|_| {
                ApiError::Config(
                    "STRIPE_WEBHOOK_SECRET environment variable is required".to_string(),
                )
            })?,
            webhook_tolerance_secs: env_var("WEBHOOK_TOLERANCE_SECS")
                .unwrap_or_else(|_| "300".to_string())
                .parse()
                .map_err(|_| ApiError::Config("Invalid WEBHOOK_TOLERANCE_SECS".to_string()))?,
            ai_verifier_url: env_var("AI_VERIFIER_URL").map_err(|_| {
                ApiError::Config("AI_VERIFIER_URL environment variable is required".to_string())
            })?,
            ai_verifier_api_key: env_var("AI_VERIFIER_API_KEY").ok(),
            escrow_hold_hours: env_var("ESCROW_HOLD_HOURS")
                .unwrap_or_else(|_| "48".to_string())
                .parse()
                .map_err(|_| ApiError::Config("Invalid ESCROW_HOLD_HOURS".to_string()))?,
            sweep_interval_secs: env_var("SWEEP_INTERVAL_SECS")
                .unwrap_or_else(|_| "60".to_string())
                .parse()
                .map_err(|_| ApiError::Config("Invalid SWEEP_INTERVAL_SECS".to_string()))?,
            sweep_batch_size: env_var("SWEEP_BATCH_SIZE")
                .unwrap_or_else(|_| "25".to_string())
                .parse()
                .map_err(|_| ApiError::Config("Invalid SWEEP_BATCH_SIZE".to_string()))?,
        })
    }

    /// Escrow hold duration in seconds.
    pub fn escrow_hold_secs(&self) -> i64 {
        self.escrow_hold_hours * 3_600
    }
}

fn env_var(key: &str) -> Result<String> {
    std::env::var(key).map_err(|_| ApiError::Config(format!("Missing env var: {key}")))
}
