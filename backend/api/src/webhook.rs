//! Processor webhook events — parsing and idempotent dispatch.
//!
//! Every event's effects run inside one transaction together with the
//! dedup insert into `processed_events`, so a redelivered event either
//! replays as a no-op (id already recorded) or retries cleanly (the
//! failed attempt rolled its dedup marker back too).

use std::collections::HashMap;
use std::str::FromStr;

use serde::Deserialize;
use sqlx::SqlitePool;
use tracing::{info, warn};

use taskpay_policy::{calculate_fees, PaymentStatus, TaskType};

use crate::db;
use crate::errors::Result;
use crate::models::NewPayment;

/// All processor event types this service acts on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    /// Funds authorized under manual capture — the escrow begins.
    AmountCapturableUpdated,
    /// Funds captured.
    Succeeded,
    /// Definitive payment failure.
    PaymentFailed,
    /// Payer must complete an extra step (3DS etc.).
    RequiresAction,
    /// An event type we don't handle; acknowledged and skipped.
    Unknown,
}

impl EventKind {
    pub fn from_type(event_type: &str) -> Self {
        match event_type {
            "payment_intent.amount_capturable_updated" => Self::AmountCapturableUpdated,
            "payment_intent.succeeded" => Self::Succeeded,
            "payment_intent.payment_failed" => Self::PaymentFailed,
            "payment_intent.requires_action" => Self::RequiresAction,
            _ => Self::Unknown,
        }
    }
}

/// How a delivery was handled, for logging and the handler's response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventOutcome {
    Processed,
    /// Event id seen before; effects skipped.
    Duplicate,
    /// Unhandled event type.
    Ignored,
}

// ─────────────────────────────────────────────────────────
// Payload shapes
// ─────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct WebhookEvent {
    pub id: String,
    #[serde(rename = "type")]
    pub event_type: String,
    pub data: EventData,
}

#[derive(Debug, Deserialize)]
pub struct EventData {
    pub object: IntentObject,
}

/// The payment-intent object embedded in the event envelope.
#[derive(Debug, Deserialize)]
pub struct IntentObject {
    pub id: String,
    #[serde(default)]
    pub amount: i64,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
    #[serde(default)]
    pub latest_charge: Option<String>,
    #[serde(default)]
    pub last_payment_error: Option<LastPaymentError>,
}

#[derive(Debug, Deserialize)]
pub struct LastPaymentError {
    pub message: Option<String>,
}

impl IntentObject {
    /// Rebuild a payment row from the intent's metadata, for deliveries
    /// that arrive before (or instead of) the create-intent persist.
    /// Fees are recomputed from the policy crate, never trusted from
    /// the wire.
    fn payment_from_metadata(&self, status: PaymentStatus, now: i64) -> Option<NewPayment> {
        let task_id = self.metadata.get("task_id")?.clone();
        let user_id = self.metadata.get("user_id")?.clone();
        let task_type = TaskType::from_str(self.metadata.get("task_type")?).ok()?;

        Some(NewPayment {
            id: self.id.clone(),
            task_id,
            user_id,
            fees: calculate_fees(self.amount, task_type),
            status,
            release_scheduled_at: None,
            completed_at: (status == PaymentStatus::Completed).then_some(now),
        })
    }
}

// ─────────────────────────────────────────────────────────
// Dispatch
// ─────────────────────────────────────────────────────────

/// Apply one verified event. Idempotent per event id.
pub async fn handle_event(
    pool: &SqlitePool,
    escrow_hold_secs: i64,
    event: &WebhookEvent,
) -> Result<EventOutcome> {
    let kind = EventKind::from_type(&event.event_type);
    if kind == EventKind::Unknown {
        info!("ignoring webhook event type {}", event.event_type);
        return Ok(EventOutcome::Ignored);
    }

    let mut tx = pool.begin().await?;

    if !db::mark_event_processed(&mut tx, &event.id, &event.event_type).await? {
        info!("duplicate delivery of {} skipped", event.id);
        return Ok(EventOutcome::Duplicate);
    }

    let now = db::unix_now();
    let intent = &event.data.object;

    match kind {
        EventKind::AmountCapturableUpdated => {
            apply_escrow_start(&mut tx, intent, escrow_hold_secs, now).await?;
        }
        EventKind::Succeeded => {
            apply_succeeded(&mut tx, intent, now).await?;
        }
        EventKind::PaymentFailed => {
            let reason = intent
                .last_payment_error
                .as_ref()
                .and_then(|e| e.message.as_deref());
            if !db::mark_failed(&mut tx, &intent.id, reason, now).await? {
                warn!("failure event for {} found no transitionable row", intent.id);
            }
        }
        EventKind::RequiresAction => {
            if !db::mark_requires_action(&mut tx, &intent.id, now).await? {
                warn!(
                    "requires_action event for {} found no pending row",
                    intent.id
                );
            }
        }
        EventKind::Unknown => unreachable!(),
    }

    tx.commit().await?;
    Ok(EventOutcome::Processed)
}

/// Funds authorized: the payment enters escrow and its auto-release
/// clock starts.
async fn apply_escrow_start(
    tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>,
    intent: &IntentObject,
    escrow_hold_secs: i64,
    now: i64,
) -> Result<()> {
    if db::get_payment(&mut **tx, &intent.id).await?.is_none() {
        // The create-intent persist is best-effort; rebuild the row
        // from metadata when it lost the race or failed outright.
        match intent.payment_from_metadata(PaymentStatus::Pending, now) {
            Some(payment) => {
                db::insert_payment(&mut *tx, &payment).await?;
                info!("rebuilt payment row {} from intent metadata", intent.id);
            }
            None => {
                warn!("authorization for {} carries no usable metadata", intent.id);
                return Ok(());
            }
        }
    }

    if db::mark_escrowed(&mut *tx, &intent.id, now + escrow_hold_secs, now).await? {
        info!("payment {} escrowed, release in {escrow_hold_secs}s", intent.id);
    }
    Ok(())
}

/// Funds captured outside the escrow-release path: complete the payment
/// and credit the payee.
async fn apply_succeeded(
    tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>,
    intent: &IntentObject,
    now: i64,
) -> Result<()> {
    let record = match db::get_payment(&mut **tx, &intent.id).await? {
        Some(record) => record,
        None => match intent.payment_from_metadata(PaymentStatus::Completed, now) {
            Some(payment) => {
                db::insert_payment(&mut *tx, &payment).await?;
                credit_earnings(tx, &payment.user_id, &payment.task_id, &payment.id,
                    payment.fees.net_cents, payment.fees.task_type.as_str()).await?;
                db::mark_task_completed(&mut *tx, &payment.task_id, "completed").await?;
                info!("rebuilt completed payment {} from intent metadata", intent.id);
                return Ok(());
            }
            None => {
                warn!("success event for {} carries no usable metadata", intent.id);
                return Ok(());
            }
        },
    };

    // Escrowed funds are captured by the release routine, which owns
    // the released bookkeeping; its capture confirmation needs nothing
    // from us. Terminal rows are equally done.
    let status = record.status()?;
    if status == PaymentStatus::Escrowed || status.is_terminal() {
        return Ok(());
    }

    if db::mark_completed(&mut *tx, &intent.id, intent.latest_charge.as_deref(), now).await? {
        db::mark_task_completed(&mut *tx, &record.task_id, "completed").await?;
        credit_earnings(
            tx,
            &record.user_id,
            &record.task_id,
            &record.id,
            record.net_cents,
            &record.task_type,
        )
        .await?;
        info!("payment {} completed", intent.id);
    }
    Ok(())
}

async fn credit_earnings(
    tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>,
    user_id: &str,
    task_id: &str,
    payment_id: &str,
    net_cents: i64,
    task_type: &str,
) -> Result<()> {
    db::insert_earnings_once(
        &mut *tx,
        user_id,
        task_id,
        payment_id,
        net_cents,
        task_type,
        "task_payment",
    )
    .await?;
    Ok(())
}

// ─────────────────────────────────────────────────────────
// Unit tests
// ─────────────────────────────────────────────────────────
