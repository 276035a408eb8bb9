//! TaskPay payments backend — entry point.
//!
//! Boots the SQLite store, the Stripe and AI-verifier clients, a
//! background escrow sweeper, and the Axum REST API.

use std::sync::Arc;

use axum::Router;
use reqwest::Client;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;
use tracing_subscriber::EnvFilter;

use taskpay_api::api::{self, ApiState};
use taskpay_api::config::Config;
use taskpay_api::db;
use taskpay_api::escrow::{self, SweeperState};
use taskpay_api::processor::{PaymentProcessor, StripeClient};
use taskpay_api::verification::{CompletionVerifier, HttpVerifier};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialise structured logging (RUST_LOG controls verbosity).
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    // Load optional .env file (ignored if missing).
    let _ = dotenvy::dotenv();

    // Load config from environment.
    let config = Config::from_env().map_err(|e| anyhow::anyhow!("{e}"))?;

    // Set up the SQLite connection pool and run migrations.
    let pool = db::init_pool(&config.database_url).await?;

    // HTTP client shared by the processor and verifier clients.
    let client = Client::builder()
        .timeout(std::time::Duration::from_secs(30))
        .build()?;

    let processor: Arc<dyn PaymentProcessor> = Arc::new(StripeClient::new(
        client.clone(),
        config.stripe_secret_key.clone(),
    ));
    let verifier: Arc<dyn CompletionVerifier> = Arc::new(HttpVerifier::new(
        client,
        config.ai_verifier_url.clone(),
        config.ai_verifier_api_key.clone(),
    ));

    // ─── Background escrow sweeper ────────────────────────
    let sweeper = Arc::new(SweeperState {
        pool: pool.clone(),
        config: config.clone(),
        processor: processor.clone(),
    });
    tokio::spawn(escrow::run(sweeper));

    // ─── REST API ─────────────────────────────────────────
    let state = Arc::new(ApiState {
        pool,
        config: config.clone(),
        processor,
        verifier,
    });

    let app: Router = api::router(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http());

    let addr = format!("0.0.0.0:{}", config.api_port);
    info!("API listening on http://{addr}");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
