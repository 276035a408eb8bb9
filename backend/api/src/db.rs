//! Database layer — migrations, queries, and guarded status writes.
//!
//! ## Design decisions
//!
//! ### Conditional updates instead of read-then-write
//!
//! Every status mutation is a single `UPDATE … WHERE id = ? AND status
//! IN (…)` whose allowed source statuses mirror
//! [`PaymentStatus::can_transition_to`]. The caller learns from the
//! affected-row count whether it won the transition; two concurrent
//! writers can never both succeed.
//!
//! ### Transaction-composable writes
//!
//! Functions that participate in multi-row flows take `&mut
//! SqliteConnection`, so a release or verification can bundle its
//! payment, earnings, task, and participant writes into one
//! transaction.

use sqlx::sqlite::SqlitePoolOptions;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::info;

use taskpay_policy::PaymentStatus;

use crate::errors::Result;
use crate::models::{
    EarningsRow, NewPayment, ParticipantRow, PaymentRecord, ProfileRow, TaskRow,
};

/// Establish a SQLite connection pool and run pending migrations.
pub async fn init_pool(database_url: &str) -> Result<SqlitePool> {
    // Make sure the file is created if it doesn't exist yet.
    let url = if database_url.starts_with("sqlite:") {
        database_url.to_string()
    } else {
        format!("sqlite:{database_url}")
    };

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect(&url)
        .await?;

    sqlx::migrate!("./migrations").run(&pool).await?;
    info!("Database migrations applied successfully");
    Ok(pool)
}

/// Current wall-clock time as a Unix epoch in seconds.
pub fn unix_now() -> i64 {
    chrono::Utc::now().timestamp()
}

// ─────────────────────────────────────────────────────────
// Payments
// ─────────────────────────────────────────────────────────

/// Persist a payment row. Returns `false` when a row with this id
/// already exists (webhook repair racing the create-intent handler).
pub async fn insert_payment(conn: &mut SqliteConnection, payment: &NewPayment) -> Result<bool> {
    let breakdown_json = serde_json::to_string(&payment.fees)?;
    let rows = sqlx::query(
        r#"
        INSERT OR IGNORE INTO payments
            (id, task_id, user_id, task_type, gross_cents, platform_fee_cents,
             processing_fee_cents, net_cents, status, fee_breakdown,
             release_scheduled_at, completed_at)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
        "#,
    )
    .bind(&payment.id)
    .bind(&payment.task_id)
    .bind(&payment.user_id)
    .bind(payment.fees.task_type.as_str())
    .bind(payment.fees.gross_cents)
    .bind(payment.fees.platform_fee_cents)
    .bind(payment.fees.processing_fee_cents)
    .bind(payment.fees.net_cents)
    .bind(payment.status.as_str())
    .bind(breakdown_json)
    .bind(payment.release_scheduled_at)
    .bind(payment.completed_at)
    .execute(conn)
    .await?
    .rows_affected();
    Ok(rows > 0)
}

/// Generic over the executor so it works both on the pool and inside a
/// transaction.
pub async fn get_payment<'e, E>(executor: E, id: &str) -> Result<Option<PaymentRecord>>
where
    E: sqlx::SqliteExecutor<'e>,
{
    let row = sqlx::query_as::<_, PaymentRecord>("SELECT * FROM payments WHERE id = ?1")
        .bind(id)
        .fetch_optional(executor)
        .await?;
    Ok(row)
}

/// `pending | requires_action → escrowed`, stamping the release
/// schedule. Returns whether this caller performed the transition.
pub async fn mark_escrowed(
    conn: &mut SqliteConnection,
    id: &str,
    release_scheduled_at: i64,
    now: i64,
) -> Result<bool> {
    let rows = sqlx::query(
        r#"
        UPDATE payments
        SET    status = 'escrowed', release_scheduled_at = ?2, updated_at = ?3
        WHERE  id = ?1 AND status IN ('pending', 'requires_action')
        "#,
    )
    .bind(id)
    .bind(release_scheduled_at)
    .bind(now)
    .execute(conn)
    .await?
    .rows_affected();
    Ok(rows > 0)
}

/// Atomically claim an escrowed payment for release:
/// `escrowed → released`. Exactly one concurrent caller can win this.
pub async fn claim_release(pool: &SqlitePool, id: &str, released_at: i64) -> Result<bool> {
    let rows = sqlx::query(
        r#"
        UPDATE payments
        SET    status = 'released', released_at = ?2, disputed = 0, updated_at = ?2
        WHERE  id = ?1 AND status = 'escrowed'
        "#,
    )
    .bind(id)
    .bind(released_at)
    .execute(pool)
    .await?
    .rows_affected();
    Ok(rows > 0)
}

/// Compensation for a failed capture: put a claimed payment back to
/// `escrowed` so a later attempt can retry.
pub async fn revert_release_claim(pool: &SqlitePool, id: &str, now: i64) -> Result<bool> {
    let rows = sqlx::query(
        r#"
        UPDATE payments
        SET    status = 'escrowed', released_at = NULL, updated_at = ?2
        WHERE  id = ?1 AND status = 'released'
        "#,
    )
    .bind(id)
    .bind(now)
    .execute(pool)
    .await?
    .rows_affected();
    Ok(rows > 0)
}

/// `pending | requires_action → completed`, stamping the charge.
pub async fn mark_completed(
    conn: &mut SqliteConnection,
    id: &str,
    charge_id: Option<&str>,
    now: i64,
) -> Result<bool> {
    let rows = sqlx::query(
        r#"
        UPDATE payments
        SET    status = 'completed', completed_at = ?3, charge_id = ?2, updated_at = ?3
        WHERE  id = ?1 AND status IN ('pending', 'requires_action')
        "#,
    )
    .bind(id)
    .bind(charge_id)
    .bind(now)
    .execute(conn)
    .await?
    .rows_affected();
    Ok(rows > 0)
}

/// `pending | requires_action | escrowed → failed` with the processor's
/// failure message.
pub async fn mark_failed(
    conn: &mut SqliteConnection,
    id: &str,
    reason: Option<&str>,
    now: i64,
) -> Result<bool> {
    let rows = sqlx::query(
        r#"
        UPDATE payments
        SET    status = 'failed', failed_at = ?3, failure_reason = ?2, updated_at = ?3
        WHERE  id = ?1 AND status IN ('pending', 'requires_action', 'escrowed')
        "#,
    )
    .bind(id)
    .bind(reason)
    .bind(now)
    .execute(conn)
    .await?
    .rows_affected();
    Ok(rows > 0)
}

/// `pending → requires_action`.
pub async fn mark_requires_action(conn: &mut SqliteConnection, id: &str, now: i64) -> Result<bool> {
    let rows = sqlx::query(
        r#"
        UPDATE payments
        SET    status = 'requires_action', updated_at = ?2
        WHERE  id = ?1 AND status = 'pending'
        "#,
    )
    .bind(id)
    .bind(now)
    .execute(conn)
    .await?
    .rows_affected();
    Ok(rows > 0)
}

/// Escrowed payments whose scheduled release time has passed, oldest
/// first.
pub async fn due_escrow_payments(
    pool: &SqlitePool,
    now: i64,
    limit: u32,
) -> Result<Vec<PaymentRecord>> {
    let rows = sqlx::query_as::<_, PaymentRecord>(
        r#"
        SELECT *
        FROM   payments
        WHERE  status = ?1 AND release_scheduled_at IS NOT NULL AND release_scheduled_at <= ?2
        ORDER  BY release_scheduled_at ASC
        LIMIT  ?3
        "#,
    )
    .bind(PaymentStatus::Escrowed.as_str())
    .bind(now)
    .bind(limit)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

// ─────────────────────────────────────────────────────────
// Earnings
// ─────────────────────────────────────────────────────────

/// Append an earnings row for a payment. The UNIQUE(payment_id)
/// constraint makes this idempotent; returns whether a row was written.
#[allow(clippy::too_many_arguments)]
pub async fn insert_earnings_once(
    conn: &mut SqliteConnection,
    user_id: &str,
    task_id: &str,
    payment_id: &str,
    amount_cents: i64,
    task_type: &str,
    source: &str,
) -> Result<bool> {
    let rows = sqlx::query(
        r#"
        INSERT OR IGNORE INTO user_earnings
            (user_id, task_id, payment_id, amount_cents, task_type, source)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6)
        "#,
    )
    .bind(user_id)
    .bind(task_id)
    .bind(payment_id)
    .bind(amount_cents)
    .bind(task_type)
    .bind(source)
    .execute(conn)
    .await?
    .rows_affected();
    Ok(rows > 0)
}

/// All earnings rows for a user, newest first.
pub async fn earnings_for_user(pool: &SqlitePool, user_id: &str) -> Result<Vec<EarningsRow>> {
    let rows = sqlx::query_as::<_, EarningsRow>(
        r#"
        SELECT *
        FROM   user_earnings
        WHERE  user_id = ?1
        ORDER  BY created_at DESC, id DESC
        "#,
    )
    .bind(user_id)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

// ─────────────────────────────────────────────────────────
// Tasks & participants
// ─────────────────────────────────────────────────────────

pub async fn get_task(pool: &SqlitePool, id: &str) -> Result<Option<TaskRow>> {
    let row = sqlx::query_as::<_, TaskRow>("SELECT * FROM tasks WHERE id = ?1")
        .bind(id)
        .fetch_optional(pool)
        .await?;
    Ok(row)
}

/// Mark a task finished and record how its payment resolved.
pub async fn mark_task_completed(
    conn: &mut SqliteConnection,
    task_id: &str,
    payment_status: &str,
) -> Result<()> {
    sqlx::query("UPDATE tasks SET status = 'completed', payment_status = ?2 WHERE id = ?1")
        .bind(task_id)
        .bind(payment_status)
        .execute(conn)
        .await?;
    Ok(())
}

pub async fn get_participant(
    pool: &SqlitePool,
    task_id: &str,
    user_id: &str,
) -> Result<Option<ParticipantRow>> {
    let row = sqlx::query_as::<_, ParticipantRow>(
        "SELECT * FROM task_participants WHERE task_id = ?1 AND user_id = ?2",
    )
    .bind(task_id)
    .bind(user_id)
    .fetch_optional(pool)
    .await?;
    Ok(row)
}

/// Store the verification outcome on the participant row.
pub async fn record_participant_verification(
    conn: &mut SqliteConnection,
    task_id: &str,
    user_id: &str,
    status: &str,
    photo: Option<&str>,
    notes: Option<&str>,
    verified_at: i64,
) -> Result<()> {
    sqlx::query(
        r#"
        UPDATE task_participants
        SET    status = ?3, verification_photo = ?4, verification_notes = ?5, verified_at = ?6
        WHERE  task_id = ?1 AND user_id = ?2
        "#,
    )
    .bind(task_id)
    .bind(user_id)
    .bind(status)
    .bind(photo)
    .bind(notes)
    .bind(verified_at)
    .execute(conn)
    .await?;
    Ok(())
}

// ─────────────────────────────────────────────────────────
// Profiles
// ─────────────────────────────────────────────────────────

/// Fetch a profile, lazily creating a minimal row on first contact.
pub async fn ensure_profile(
    pool: &SqlitePool,
    user_id: &str,
    email: Option<&str>,
) -> Result<ProfileRow> {
    sqlx::query("INSERT OR IGNORE INTO profiles (id, email) VALUES (?1, ?2)")
        .bind(user_id)
        .bind(email)
        .execute(pool)
        .await?;

    let row = sqlx::query_as::<_, ProfileRow>("SELECT * FROM profiles WHERE id = ?1")
        .bind(user_id)
        .fetch_one(pool)
        .await?;
    Ok(row)
}

pub async fn get_profile(pool: &SqlitePool, user_id: &str) -> Result<Option<ProfileRow>> {
    let row = sqlx::query_as::<_, ProfileRow>("SELECT * FROM profiles WHERE id = ?1")
        .bind(user_id)
        .fetch_optional(pool)
        .await?;
    Ok(row)
}

/// Remember the processor customer handle created for a user.
pub async fn set_profile_customer(
    pool: &SqlitePool,
    user_id: &str,
    customer_id: &str,
) -> Result<()> {
    sqlx::query("UPDATE profiles SET customer_id = ?2 WHERE id = ?1")
        .bind(user_id)
        .bind(customer_id)
        .execute(pool)
        .await?;
    Ok(())
}

// ─────────────────────────────────────────────────────────
// Webhook dedup
// ─────────────────────────────────────────────────────────

/// Record a processor event id. Returns `false` when the event was
/// already processed — the caller must then skip its effects. Run this
/// inside the same transaction as those effects so the two commit or
/// roll back together.
pub async fn mark_event_processed(
    conn: &mut SqliteConnection,
    event_id: &str,
    event_type: &str,
) -> Result<bool> {
    let rows = sqlx::query(
        "INSERT OR IGNORE INTO processed_events (event_id, event_type) VALUES (?1, ?2)",
    )
    .bind(event_id)
    .bind(event_type)
    .execute(conn)
    .await?
    .rows_affected();
    Ok(rows > 0)
}
