//! Payment routes: intent creation, escrow release, and reads.

use std::collections::HashMap;
use std::str::FromStr;
use std::sync::Arc;

use axum::extract::{Path, State};
use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::error;

use taskpay_policy::{
    calculate_fees, cents_to_dollars, dollars_to_cents, format_usd, validate_task_amount,
    FeeBreakdownDisplay, PaymentStatus, TaskType,
};

use crate::db;
use crate::errors::{ApiError, Result};
use crate::escrow::{self, ReleaseReason};
use crate::models::{EarningsRow, NewPayment, PaymentRecord};
use crate::processor::IntentRequest;

use super::ApiState;

// ─────────────────────────────────────────────────────────
// Create intent
// ─────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateIntentRequest {
    pub task_id: Option<String>,
    pub task_type: Option<String>,
    pub amount: Option<f64>,
    #[serde(default)]
    pub description: Option<String>,
    pub user_id: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateIntentResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_secret: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment_intent_id: Option<String>,
    pub fee_breakdown: FeeBreakdownDisplay,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

fn required(value: Option<String>, name: &str) -> Result<String> {
    value
        .filter(|v| !v.is_empty())
        .ok_or_else(|| ApiError::Validation(format!("{name} is required")))
}

/// `POST /api/payments/create-intent`
pub async fn create_intent(
    State(state): State<Arc<ApiState>>,
    Json(body): Json<CreateIntentRequest>,
) -> Result<Json<CreateIntentResponse>> {
    let task_id = required(body.task_id, "taskId")?;
    let user_id = required(body.user_id, "userId")?;
    let task_type_raw = required(body.task_type, "taskType")?;
    let amount = body
        .amount
        .ok_or_else(|| ApiError::Validation("amount is required".to_string()))?;

    let task_type = TaskType::from_str(&task_type_raw)
        .map_err(|_| ApiError::Validation(format!("unknown task type {task_type_raw:?}")))?;

    let gross_cents = dollars_to_cents(amount);
    validate_task_amount(gross_cents, task_type)?;

    let fees = calculate_fees(gross_cents, task_type);

    // Barter tasks exchange goods, not money: nothing to authorize.
    if task_type == TaskType::Barter {
        return Ok(Json(CreateIntentResponse {
            success: true,
            client_secret: None,
            payment_intent_id: None,
            fee_breakdown: fees.display(),
            message: Some("Barter tasks carry no payment".to_string()),
        }));
    }

    let profile = db::ensure_profile(&state.pool, &user_id, None).await?;
    let customer_id = match profile.customer_id {
        Some(customer_id) => customer_id,
        None => {
            let customer_id = state
                .processor
                .ensure_customer(&user_id, profile.email.as_deref())
                .await?;
            db::set_profile_customer(&state.pool, &user_id, &customer_id).await?;
            customer_id
        }
    };

    let intent = state
        .processor
        .create_intent(&IntentRequest {
            amount_cents: fees.gross_cents,
            application_fee_cents: fees.platform_fee_cents,
            customer_id,
            description: body.description,
            metadata: HashMap::from([
                ("task_id".to_string(), task_id.clone()),
                ("task_type".to_string(), task_type.as_str().to_string()),
                ("user_id".to_string(), user_id.clone()),
                (
                    "platform_fee_cents".to_string(),
                    fees.platform_fee_cents.to_string(),
                ),
                ("net_cents".to_string(), fees.net_cents.to_string()),
            ]),
        })
        .await?;

    // Best-effort persist: the payer already holds a usable client
    // secret, and the authorization webhook rebuilds the row from
    // intent metadata if this write is lost.
    let payment = NewPayment {
        id: intent.id.clone(),
        task_id,
        user_id,
        fees,
        status: PaymentStatus::Pending,
        release_scheduled_at: None,
        completed_at: None,
    };
    if let Err(e) = persist_payment(&state, &payment).await {
        error!(
            "payment row {} not persisted (webhook will rebuild it): {e}",
            payment.id
        );
    }

    Ok(Json(CreateIntentResponse {
        success: true,
        client_secret: Some(intent.client_secret),
        payment_intent_id: Some(intent.id),
        fee_breakdown: fees.display(),
        message: None,
    }))
}

async fn persist_payment(state: &ApiState, payment: &NewPayment) -> Result<()> {
    let mut conn = state.pool.acquire().await?;
    db::insert_payment(&mut conn, payment).await?;
    Ok(())
}

// ─────────────────────────────────────────────────────────
// Release escrow
// ─────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReleaseEscrowRequest {
    pub payment_id: Option<String>,
    #[serde(default)]
    pub task_id: Option<String>,
    #[serde(default)]
    pub reason: Option<ReleaseReason>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReleaseEscrowResponse {
    pub success: bool,
    pub message: String,
    pub payment_id: String,
    pub released_amount: f64,
    pub release_reason: &'static str,
}

/// `POST /api/payments/release-escrow`
pub async fn release_escrow(
    State(state): State<Arc<ApiState>>,
    Json(body): Json<ReleaseEscrowRequest>,
) -> Result<Json<ReleaseEscrowResponse>> {
    let payment_id = required(body.payment_id, "paymentId")?;

    let outcome = escrow::release_payment(
        &state.pool,
        state.processor.as_ref(),
        &payment_id,
        body.task_id.as_deref(),
        body.reason,
    )
    .await?;

    Ok(Json(ReleaseEscrowResponse {
        success: true,
        message: format!(
            "Released {} to the payee",
            format_usd(outcome.net_cents)
        ),
        payment_id: outcome.payment_id,
        released_amount: cents_to_dollars(outcome.released_cents),
        release_reason: outcome.reason.as_str(),
    }))
}

// ─────────────────────────────────────────────────────────
// Reads
// ─────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentResponse {
    pub payment: PaymentRecord,
    pub fee_breakdown: FeeBreakdownDisplay,
}

/// `GET /api/payments/:id`
pub async fn get_payment(
    State(state): State<Arc<ApiState>>,
    Path(id): Path<String>,
) -> Result<Json<PaymentResponse>> {
    let payment = db::get_payment(&state.pool, &id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("payment {id} not found")))?;
    let fee_breakdown = payment.breakdown()?.display();
    Ok(Json(PaymentResponse {
        payment,
        fee_breakdown,
    }))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EarningsResponse {
    pub user_id: String,
    pub count: usize,
    pub total_cents: i64,
    pub total: String,
    pub earnings: Vec<EarningsRow>,
}

/// `GET /api/users/:id/earnings`
pub async fn user_earnings(
    State(state): State<Arc<ApiState>>,
    Path(user_id): Path<String>,
) -> Result<Json<EarningsResponse>> {
    let earnings = db::earnings_for_user(&state.pool, &user_id).await?;
    let total_cents: i64 = earnings.iter().map(|row| row.amount_cents).sum();
    Ok(Json(EarningsResponse {
        user_id,
        count: earnings.len(),
        total_cents,
        total: format_usd(total_cents),
        earnings,
    }))
}
