#![allow(dead_code)]

//! Shared fixtures: in-memory database, mock processor/verifier, and
//! row seeding helpers.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::SqlitePool;

use taskpay_api::config::Config;
use taskpay_api::db;
use taskpay_api::errors::{ApiError, Result};
use taskpay_api::models::NewPayment;
use taskpay_api::processor::{IntentHandle, IntentRequest, PaymentProcessor};
use taskpay_api::verification::{CompletionVerifier, Submission, Verdict};
use taskpay_policy::{calculate_fees, PaymentStatus, TaskType};

/// Fresh in-memory database with migrations applied. A single pooled
/// connection that never expires, so every query sees the same store.
pub async fn test_pool() -> SqlitePool {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect("sqlite::memory:")
        .await
        .expect("in-memory sqlite");
    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("migrations");
    pool
}

pub fn test_config() -> Config {
    Config {
        database_url: "sqlite::memory:".to_string(),
        api_port: 0,
        stripe_secret_key: "sk_test_123".to_string(),
        stripe_webhook_secret: "whsec_test".to_string(),
        webhook_tolerance_secs: 300,
        ai_verifier_url: "http://verifier.invalid".to_string(),
        ai_verifier_api_key: None,
        escrow_hold_hours: 48,
        sweep_interval_secs: 60,
        sweep_batch_size: 25,
    }
}

// ─────────────────────────────────────────────────────────
// Mock processor
// ─────────────────────────────────────────────────────────

#[derive(Default)]
pub struct MockProcessor {
    pub captures: Mutex<Vec<String>>,
    pub fail_captures: AtomicBool,
    intent_counter: AtomicUsize,
}

impl MockProcessor {
    pub fn capture_count(&self) -> usize {
        self.captures.lock().unwrap().len()
    }

    pub fn refuse_captures(&self) {
        self.fail_captures.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl PaymentProcessor for MockProcessor {
    async fn ensure_customer(&self, user_id: &str, _email: Option<&str>) -> Result<String> {
        Ok(format!("cus_{user_id}"))
    }

    async fn create_intent(&self, _request: &IntentRequest) -> Result<IntentHandle> {
        let n = self.intent_counter.fetch_add(1, Ordering::SeqCst);
        Ok(IntentHandle {
            id: format!("pi_test_{n}"),
            client_secret: format!("pi_test_{n}_secret"),
        })
    }

    async fn capture_intent(&self, intent_id: &str) -> Result<()> {
        if self.fail_captures.load(Ordering::SeqCst) {
            return Err(ApiError::Processor("capture declined".to_string()));
        }
        self.captures.lock().unwrap().push(intent_id.to_string());
        Ok(())
    }
}

// ─────────────────────────────────────────────────────────
// Mock verifier
// ─────────────────────────────────────────────────────────

pub struct MockVerifier {
    pub approved: bool,
}

#[async_trait]
impl CompletionVerifier for MockVerifier {
    async fn verify(&self, _submission: &Submission<'_>) -> Result<Verdict> {
        Ok(Verdict {
            approved: self.approved,
            confidence: if self.approved { 0.94 } else { 0.41 },
            reasoning: "mock verdict".to_string(),
        })
    }
}

// ─────────────────────────────────────────────────────────
// Seeding helpers
// ─────────────────────────────────────────────────────────

pub async fn seed_task(
    pool: &SqlitePool,
    id: &str,
    task_type: TaskType,
    funding_source: &str,
    earning_potential_cents: i64,
) {
    sqlx::query(
        r#"
        INSERT INTO tasks (id, created_by, task_type, funding_source, earning_potential_cents)
        VALUES (?1, 'host_1', ?2, ?3, ?4)
        "#,
    )
    .bind(id)
    .bind(task_type.as_str())
    .bind(funding_source)
    .bind(earning_potential_cents)
    .execute(pool)
    .await
    .expect("seed task");
}

pub async fn seed_participant(pool: &SqlitePool, task_id: &str, user_id: &str, status: &str) {
    sqlx::query("INSERT INTO task_participants (task_id, user_id, status) VALUES (?1, ?2, ?3)")
        .bind(task_id)
        .bind(user_id)
        .bind(status)
        .execute(pool)
        .await
        .expect("seed participant");
}

pub async fn seed_profile(pool: &SqlitePool, user_id: &str, phone_verified: bool) {
    sqlx::query("INSERT INTO profiles (id, email, phone_verified) VALUES (?1, ?2, ?3)")
        .bind(user_id)
        .bind(format!("{user_id}@example.com"))
        .bind(phone_verified as i64)
        .execute(pool)
        .await
        .expect("seed profile");
}

/// Insert a pending payment and move it to `escrowed` with the given
/// release schedule, through the same code paths production uses.
pub async fn seed_escrowed_payment(
    pool: &SqlitePool,
    id: &str,
    task_id: &str,
    user_id: &str,
    gross_cents: i64,
    task_type: TaskType,
    release_scheduled_at: i64,
) {
    seed_pending_payment(pool, id, task_id, user_id, gross_cents, task_type).await;
    let mut conn = pool.acquire().await.expect("conn");
    let escrowed = db::mark_escrowed(&mut conn, id, release_scheduled_at, db::unix_now())
        .await
        .expect("mark escrowed");
    assert!(escrowed, "seed payment did not transition to escrowed");
}

pub async fn seed_pending_payment(
    pool: &SqlitePool,
    id: &str,
    task_id: &str,
    user_id: &str,
    gross_cents: i64,
    task_type: TaskType,
) {
    let mut conn = pool.acquire().await.expect("conn");
    let inserted = db::insert_payment(
        &mut conn,
        &NewPayment {
            id: id.to_string(),
            task_id: task_id.to_string(),
            user_id: user_id.to_string(),
            fees: calculate_fees(gross_cents, task_type),
            status: PaymentStatus::Pending,
            release_scheduled_at: None,
            completed_at: None,
        },
    )
    .await
    .expect("insert payment");
    assert!(inserted, "seed payment id collided");
}

pub async fn earnings_count(pool: &SqlitePool, payment_id: &str) -> i64 {
    sqlx::query_scalar("SELECT COUNT(*) FROM user_earnings WHERE payment_id = ?1")
        .bind(payment_id)
        .fetch_one(pool)
        .await
        .expect("count earnings")
}

pub async fn payment_status(pool: &SqlitePool, payment_id: &str) -> String {
    sqlx::query_scalar("SELECT status FROM payments WHERE id = ?1")
        .bind(payment_id)
        .fetch_one(pool)
        .await
        .expect("payment status")
}

pub async fn task_status(pool: &SqlitePool, task_id: &str) -> (String, Option<String>) {
    sqlx::query_as("SELECT status, payment_status FROM tasks WHERE id = ?1")
        .bind(task_id)
        .fetch_one(pool)
        .await
        .expect("task status")
}
