//! Task verification gate.
//!
//! Submitting a completion runs the external AI check and, when it
//! approves a platform-funded task, pays the participant out directly —
//! through the same fee policy as every other payment path.

use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use taskpay_policy::{
    calculate_fees, FeeBreakdownDisplay, FundingSource, ParticipantStatus, PaymentStatus,
};

use crate::db;
use crate::errors::{ApiError, Result};
use crate::models::NewPayment;
use crate::verification::{Submission, Verdict};

use super::{ApiState, AuthedUser};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyTaskRequest {
    pub task_id: Option<String>,
    #[serde(default, alias = "verificationPhoto")]
    pub after_photo: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyTaskResponse {
    pub success: bool,
    pub verification: Verdict,
    pub participant_status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment: Option<PayoutSummary>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PayoutSummary {
    pub payment_id: String,
    pub fee_breakdown: FeeBreakdownDisplay,
}

/// `POST /api/tasks/verify`
pub async fn verify_task(
    State(state): State<Arc<ApiState>>,
    AuthedUser(user_id): AuthedUser,
    Json(body): Json<VerifyTaskRequest>,
) -> Result<Json<VerifyTaskResponse>> {
    let task_id = body
        .task_id
        .filter(|id| !id.is_empty())
        .ok_or_else(|| ApiError::Validation("taskId is required".to_string()))?;

    let profile = db::get_profile(&state.pool, &user_id)
        .await?
        .ok_or_else(|| ApiError::Forbidden("profile not found".to_string()))?;
    if !profile.is_phone_verified() {
        return Err(ApiError::Forbidden(
            "phone verification required before submitting completions".to_string(),
        ));
    }

    let task = db::get_task(&state.pool, &task_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("task {task_id} not found")))?;

    let participant = db::get_participant(&state.pool, &task_id, &user_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("you are not a participant of this task".to_string()))?;

    let participant_status = participant.status()?;
    if !participant_status.may_submit_verification() {
        return Err(ApiError::Validation(format!(
            "participant status {participant_status} cannot submit a completion"
        )));
    }

    let verdict = state
        .verifier
        .verify(&Submission {
            task_id: &task_id,
            after_photo: body.after_photo.as_deref(),
            notes: body.notes.as_deref(),
        })
        .await?;

    let new_status = if verdict.approved {
        ParticipantStatus::Verified
    } else {
        ParticipantStatus::PendingReview
    };

    // Participant outcome, payout, earnings, and task completion land
    // in one transaction.
    let now = db::unix_now();
    let mut tx = state.pool.begin().await?;

    db::record_participant_verification(
        &mut tx,
        &task_id,
        &user_id,
        new_status.as_str(),
        body.after_photo.as_deref(),
        body.notes.as_deref(),
        now,
    )
    .await?;

    let mut payout = None;
    if verdict.approved
        && task.funding_source()? == FundingSource::Platform
        && task.earning_potential_cents > 0
    {
        let fees = calculate_fees(task.earning_potential_cents, task.task_type()?);
        let payment = NewPayment {
            id: format!("pay_{}", Uuid::new_v4().simple()),
            task_id: task_id.clone(),
            user_id: user_id.clone(),
            fees,
            status: PaymentStatus::Completed,
            release_scheduled_at: None,
            completed_at: Some(now),
        };
        db::insert_payment(&mut tx, &payment).await?;
        db::insert_earnings_once(
            &mut tx,
            &user_id,
            &task_id,
            &payment.id,
            fees.net_cents,
            fees.task_type.as_str(),
            "platform_payout",
        )
        .await?;
        db::mark_task_completed(&mut tx, &task_id, PaymentStatus::Completed.as_str()).await?;

        info!(
            "platform payout {} for task {task_id} to {user_id}",
            payment.id
        );
        payout = Some(PayoutSummary {
            payment_id: payment.id,
            fee_breakdown: fees.display(),
        });
    }

    tx.commit().await?;

    Ok(Json(VerifyTaskResponse {
        success: true,
        verification: verdict,
        participant_status: new_status.as_str(),
        payment: payout,
    }))
}
