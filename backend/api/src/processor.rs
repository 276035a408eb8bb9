//! Card-processor client — Stripe wire protocol over plain REST.
//!
//! The service talks to the processor through the [`PaymentProcessor`]
//! trait so tests can substitute an in-memory implementation; the only
//! production implementation is [`StripeClient`].
//!
//! Payment intents are created with `capture_method=manual`: the payer's
//! funds are authorized and held (our `escrowed` state), and captured
//! only when the escrow releases.

use std::collections::HashMap;

use async_trait::async_trait;
use hmac::{Hmac, Mac};
use reqwest::Client;
use serde::Deserialize;
use sha2::Sha256;
use tracing::debug;
use uuid::Uuid;

use crate::errors::{ApiError, Result};

const STRIPE_API_BASE: &str = "https://api.stripe.com";

/// Parameters for a new payment intent.
#[derive(Debug, Clone)]
pub struct IntentRequest {
    pub amount_cents: i64,
    pub application_fee_cents: i64,
    pub customer_id: String,
    pub description: Option<String>,
    /// Carried on the intent and echoed back by every webhook, so the
    /// webhook path can reconcile or even re-create the payment row.
    pub metadata: HashMap<String, String>,
}

/// The processor's handle to a created intent.
#[derive(Debug, Clone)]
pub struct IntentHandle {
    pub id: String,
    pub client_secret: String,
}

#[async_trait]
pub trait PaymentProcessor: Send + Sync {
    /// Find or create the processor-side customer for a user.
    async fn ensure_customer(&self, user_id: &str, email: Option<&str>) -> Result<String>;

    /// Create a manual-capture payment intent.
    async fn create_intent(&self, request: &IntentRequest) -> Result<IntentHandle>;

    /// Capture previously authorized funds for the full amount.
    async fn capture_intent(&self, intent_id: &str) -> Result<()>;
}

// ─────────────────────────────────────────────────────────
// Stripe REST client
// ─────────────────────────────────────────────────────────

#[derive(Clone)]
pub struct StripeClient {
    http: Client,
    secret_key: String,
    api_base: String,
}

#[derive(Debug, Deserialize)]
struct StripeIntent {
    id: String,
    client_secret: Option<String>,
    status: String,
}

#[derive(Debug, Deserialize)]
struct StripeCustomer {
    id: String,
}

#[derive(Debug, Deserialize)]
struct StripeErrorEnvelope {
    error: StripeErrorBody,
}

#[derive(Debug, Deserialize)]
struct StripeErrorBody {
    message: Option<String>,
    #[serde(rename = "type")]
    error_type: Option<String>,
}

impl StripeClient {
    pub fn new(http: Client, secret_key: String) -> Self {
        Self {
            http,
            secret_key,
            api_base: STRIPE_API_BASE.to_string(),
        }
    }

    /// Point the client at a different API host (test servers).
    pub fn with_api_base(mut self, api_base: String) -> Self {
        self.api_base = api_base;
        self
    }

    async fn post_form<T: for<'de> Deserialize<'de>>(
        &self,
        path: &str,
        params: &[(String, String)],
    ) -> Result<T> {
        let response = self
            .http
            .post(format!("{}{path}", self.api_base))
            .bearer_auth(&self.secret_key)
            // One key per outbound call: a retried request cannot
            // create a second intent or customer.
            .header("Idempotency-Key", Uuid::new_v4().to_string())
            .form(params)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = match response.json::<StripeErrorEnvelope>().await {
                Ok(envelope) => format!(
                    "{} ({})",
                    envelope.error.message.unwrap_or_else(|| "unknown".into()),
                    envelope.error.error_type.unwrap_or_else(|| status.to_string()),
                ),
                Err(_) => status.to_string(),
            };
            return Err(ApiError::Processor(message));
        }

        Ok(response.json::<T>().await?)
    }
}

/// Build the form body for an intent-creation call.
fn intent_form(request: &IntentRequest) -> Vec<(String, String)> {
    let mut params = vec![
        ("amount".to_string(), request.amount_cents.to_string()),
        ("currency".to_string(), "usd".to_string()),
        ("customer".to_string(), request.customer_id.clone()),
        ("capture_method".to_string(), "manual".to_string()),
        (
            "automatic_payment_methods[enabled]".to_string(),
            "true".to_string(),
        ),
        (
            "application_fee_amount".to_string(),
            request.application_fee_cents.to_string(),
        ),
    ];
    if let Some(description) = &request.description {
        params.push(("description".to_string(), description.clone()));
    }
    let mut keys: Vec<&String> = request.metadata.keys().collect();
    keys.sort();
    for key in keys {
        params.push((format!("metadata[{key}]"), request.metadata[key].clone()));
    }
    params
}

#[async_trait]
impl PaymentProcessor for StripeClient {
    async fn ensure_customer(&self, user_id: &str, email: Option<&str>) -> Result<String> {
        let mut params = vec![("metadata[user_id]".to_string(), user_id.to_string())];
        if let Some(email) = email {
            params.push(("email".to_string(), email.to_string()));
        }
        let customer: StripeCustomer = self.post_form("/v1/customers", &params).await?;
        debug!("created processor customer {} for {user_id}", customer.id);
        Ok(customer.id)
    }

    async fn create_intent(&self, request: &IntentRequest) -> Result<IntentHandle> {
        let intent: StripeIntent = self
            .post_form("/v1/payment_intents", &intent_form(request))
            .await?;
        let client_secret = intent.client_secret.ok_or_else(|| {
            ApiError::Processor(format!("intent {} returned no client secret", intent.id))
        })?;
        Ok(IntentHandle {
            id: intent.id,
            client_secret,
        })
    }

    async fn capture_intent(&self, intent_id: &str) -> Result<()> {
        let intent: StripeIntent = self
            .post_form(&format!("/v1/payment_intents/{intent_id}/capture"), &[])
            .await?;
        if intent.status != "succeeded" {
            return Err(ApiError::Processor(format!(
                "capture of {intent_id} left status {:?}",
                intent.status
            )));
        }
        Ok(())
    }
}

// ─────────────────────────────────────────────────────────
// Webhook signatures
// ─────────────────────────────────────────────────────────

type HmacSha256 = Hmac<Sha256>;

/// Verify a processor webhook signature header of the form
/// `t=<unix>,v1=<hex>[,v1=<hex>…]`.
///
/// The signed payload is `"{t}.{body}"`; any matching `v1` entry within
/// the tolerance window passes. Comparison is constant-time.
pub fn verify_webhook_signature(
    payload: &[u8],
    header: &str,
    secret: &str,
    tolerance_secs: i64,
    now: i64,
) -> Result<()> {
    let mut timestamp: Option<i64> = None;
    let mut candidates: Vec<&str> = Vec::new();

    for part in header.split(',') {
        match part.trim().split_once('=') {
            Some(("t", value)) => {
                timestamp = value.parse().ok();
            }
            Some(("v1", value)) => candidates.push(value),
            _ => {}
        }
    }

    let timestamp =
        timestamp.ok_or_else(|| ApiError::Signature("missing timestamp".to_string()))?;
    if candidates.is_empty() {
        return Err(ApiError::Signature("missing v1 signature".to_string()));
    }
    if (now - timestamp).abs() > tolerance_secs {
        return Err(ApiError::Signature(format!(
            "timestamp {timestamp} outside tolerance window"
        )));
    }

    for candidate in candidates {
        let Ok(candidate_bytes) = hex::decode(candidate) else {
            continue;
        };
        let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
            .map_err(|e| ApiError::Signature(e.to_string()))?;
        mac.update(timestamp.to_string().as_bytes());
        mac.update(b".");
        mac.update(payload);
        if mac.verify_slice(&candidate_bytes).is_ok() {
            return Ok(());
        }
    }

    Err(ApiError::Signature("no matching signature".to_string()))
}

// ─────────────────────────────────────────────────────────
// Unit tests
// ─────────────────────────────────────────────────────────
