//! Escrow release — the claim → capture → settle routine shared by the
//! manual release route and the background sweeper.
//!
//! ## Ordering
//!
//! The row is claimed (`escrowed → released`, a conditional update)
//! *before* the processor capture. A concurrent second caller loses the
//! claim and never reaches the processor, so double capture is
//! impossible. If the capture itself fails the claim is reverted;
//! should that revert also fail, the row is left `released` without
//! captured funds and the discrepancy is logged for reconciliation —
//! the narrow residue of the old wide-open race.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use tracing::{error, info, warn};

use taskpay_policy::PaymentStatus;

use crate::config::Config;
use crate::db;
use crate::errors::{ApiError, Result};
use crate::processor::PaymentProcessor;

/// Why a release was requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReleaseReason {
    /// An operator or the task host triggered it by hand.
    ManualRelease,
    /// The task finished; no need to wait out the hold.
    TaskCompleted,
    /// The sweeper found the hold period elapsed.
    AutoRelease,
}

impl ReleaseReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ManualRelease => "manual_release",
            Self::TaskCompleted => "task_completed",
            Self::AutoRelease => "auto_release",
        }
    }

    /// Manual triggers bypass the hold timer.
    fn overrides_schedule(&self) -> bool {
        matches!(self, Self::ManualRelease | Self::TaskCompleted)
    }
}

/// An escrowed payment may release once its scheduled time has passed
/// or when the reason overrides the schedule.
pub fn is_release_eligible(
    release_scheduled_at: Option<i64>,
    reason: Option<ReleaseReason>,
    now: i64,
) -> bool {
    if reason.is_some_and(|r| r.overrides_schedule()) {
        return true;
    }
    release_scheduled_at.is_some_and(|at| now >= at)
}

/// Result of a successful release, echoed to the caller.
#[derive(Debug, Clone)]
pub struct ReleaseOutcome {
    pub payment_id: String,
    pub released_cents: i64,
    pub net_cents: i64,
    pub reason: ReleaseReason,
}

/// Release one escrowed payment.
pub async fn release_payment(
    pool: &SqlitePool,
    processor: &dyn PaymentProcessor,
    payment_id: &str,
    task_id: Option<&str>,
    reason: Option<ReleaseReason>,
) -> Result<ReleaseOutcome> {
    let payment = db::get_payment(pool, payment_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("payment {payment_id} not found")))?;

    let status = payment.status()?;
    if status != PaymentStatus::Escrowed {
        return Err(ApiError::Conflict(format!(
            "payment {payment_id} is {status}, not escrowed"
        )));
    }

    let now = db::unix_now();
    if !is_release_eligible(payment.release_scheduled_at, reason, now) {
        return Err(ApiError::Validation(
            "escrow is not eligible for release yet".to_string(),
        ));
    }

    // Claim before capture: whoever wins this update is the only caller
    // that talks to the processor.
    if !db::claim_release(pool, payment_id, now).await? {
        return Err(ApiError::Conflict(format!(
            "payment {payment_id} was released by a concurrent request"
        )));
    }

    if let Err(capture_err) = processor.capture_intent(payment_id).await {
        match db::revert_release_claim(pool, payment_id, db::unix_now()).await {
            Ok(true) => warn!("capture of {payment_id} failed, claim reverted: {capture_err}"),
            Ok(false) | Err(_) => error!(
                "capture of {payment_id} failed AND the claim could not be reverted; \
                 row needs manual reconciliation"
            ),
        }
        return Err(capture_err);
    }

    // Settle the books. The capture already happened; these writes are
    // grouped so they land together or roll back together.
    let mut tx = pool.begin().await?;
    db::insert_earnings_once(
        &mut tx,
        &payment.user_id,
        &payment.task_id,
        &payment.id,
        payment.net_cents,
        &payment.task_type,
        "escrow_release",
    )
    .await?;
    if let Some(task_id) = task_id {
        db::mark_task_completed(&mut tx, task_id, PaymentStatus::Released.as_str()).await?;
    }
    tx.commit().await?;

    let reason = reason.unwrap_or(ReleaseReason::AutoRelease);
    info!(
        "released {} to {} ({})",
        payment.id,
        payment.user_id,
        reason.as_str()
    );

    Ok(ReleaseOutcome {
        payment_id: payment.id,
        released_cents: payment.gross_cents,
        net_cents: payment.net_cents,
        reason,
    })
}

// ─────────────────────────────────────────────────────────
// Auto-release sweeper
// ─────────────────────────────────────────────────────────

pub struct SweeperState {
    pub pool: SqlitePool,
    pub config: Config,
    pub processor: Arc<dyn PaymentProcessor>,
}

/// Run the sweeper loop as a background [`tokio`] task.
pub async fn run(state: Arc<SweeperState>) {
    info!(
        "Escrow sweeper starting — every {}s, batch {}",
        state.config.sweep_interval_secs, state.config.sweep_batch_size
    );

    loop {
        match sweep_once(&state).await {
            Ok(released) if released > 0 => {
                info!("Sweep released {released} escrow(s)");
            }
            Ok(_) => {}
            Err(e) => {
                error!("Sweep error: {e}");
            }
        }

        tokio::time::sleep(Duration::from_secs(state.config.sweep_interval_secs)).await;
    }
}

/// Release every due escrow, one payment at a time. A failure on one
/// payment is logged and does not stop the rest of the batch.
async fn sweep_once(state: &SweeperState) -> Result<usize> {
    let due = db::due_escrow_payments(
        &state.pool,
        db::unix_now(),
        state.config.sweep_batch_size,
    )
    .await?;

    let mut released = 0usize;
    for payment in due {
        match release_payment(
            &state.pool,
            state.processor.as_ref(),
            &payment.id,
            Some(&payment.task_id),
            Some(ReleaseReason::AutoRelease),
        )
        .await
        {
            Ok(_) => released += 1,
            Err(e) => {
                error!("Auto-release of {} failed: {e}", payment.id);
            }
        }
    }
    Ok(released)
}

// ─────────────────────────────────────────────────────────
// Unit tests
// ─────────────────────────────────────────────────────────
