//! Verification gate: participant eligibility, the AI verdict, and the
//! platform payout sharing one transaction and one fee policy.

mod common;

use std::sync::Arc;

use axum::extract::State;
use axum::Json;

use taskpay_api::api::tasks::{verify_task, VerifyTaskRequest};
use taskpay_api::api::{ApiState, AuthedUser};
use taskpay_api::errors::ApiError;
use taskpay_policy::TaskType;

use common::*;

fn state(pool: sqlx::SqlitePool, approved: bool) -> Arc<ApiState> {
    Arc::new(ApiState {
        pool,
        config: test_config(),
        processor: Arc::new(MockProcessor::default()),
        verifier: Arc::new(MockVerifier { approved }),
    })
}

fn request(task_id: &str) -> Json<VerifyTaskRequest> {
    Json(VerifyTaskRequest {
        task_id: Some(task_id.to_string()),
        after_photo: Some("https://cdn.example/after.jpg".to_string()),
        notes: Some("raked and bagged".to_string()),
    })
}

#[tokio::test]
async fn approved_platform_task_pays_out_through_the_fee_policy() {
    let pool = test_pool().await;
    seed_task(&pool, "task_1", TaskType::Solo, "platform", 5_000).await;
    seed_participant(&pool, "task_1", "user_1", "accepted").await;
    seed_profile(&pool, "user_1", true).await;

    let state = state(pool.clone(), true);
    let Json(response) = verify_task(
        State(state),
        AuthedUser("user_1".to_string()),
        request("task_1"),
    )
    .await
    .expect("verification succeeds");

    assert!(response.success);
    assert!(response.verification.approved);
    assert_eq!(response.participant_status, "verified");

    let payout = response.payment.expect("platform payout created");
    // $50 solo: $1.50 platform fee, $0.30 processing, $48.20 net.
    assert_eq!(payout.fee_breakdown.platform_fee, "$1.50");
    assert_eq!(payout.fee_breakdown.net, "$48.20");

    assert_eq!(payment_status(&pool, &payout.payment_id).await, "completed");
    assert_eq!(earnings_count(&pool, &payout.payment_id).await, 1);
    let (status, payment_status) = task_status(&pool, "task_1").await;
    assert_eq!(status, "completed");
    assert_eq!(payment_status.as_deref(), Some("completed"));
}

#[tokio::test]
async fn rejected_completion_goes_to_review_without_payout() {
    let pool = test_pool().await;
    seed_task(&pool, "task_1", TaskType::Solo, "platform", 5_000).await;
    seed_participant(&pool, "task_1", "user_1", "applied").await;
    seed_profile(&pool, "user_1", true).await;

    let state = state(pool.clone(), false);
    let Json(response) = verify_task(
        State(state),
        AuthedUser("user_1".to_string()),
        request("task_1"),
    )
    .await
    .unwrap();

    assert_eq!(response.participant_status, "pending_review");
    assert!(response.payment.is_none());

    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM payments")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(count, 0);

    // The evidence is kept for the human reviewer.
    let (status, photo): (String, Option<String>) = sqlx::query_as(
        "SELECT status, verification_photo FROM task_participants WHERE task_id = 'task_1'",
    )
    .fetch_one(&pool)
    .await
    .unwrap();
    assert_eq!(status, "pending_review");
    assert!(photo.is_some());
}

#[tokio::test]
async fn peer_funded_tasks_never_pay_out_here() {
    let pool = test_pool().await;
    seed_task(&pool, "task_1", TaskType::Community, "peer", 5_000).await;
    seed_participant(&pool, "task_1", "user_1", "accepted").await;
    seed_profile(&pool, "user_1", true).await;

    let state = state(pool.clone(), true);
    let Json(response) = verify_task(
        State(state),
        AuthedUser("user_1".to_string()),
        request("task_1"),
    )
    .await
    .unwrap();

    // Verified, but the money moves through the escrow flow instead.
    assert_eq!(response.participant_status, "verified");
    assert!(response.payment.is_none());
}

#[tokio::test]
async fn unverified_phone_is_forbidden() {
    let pool = test_pool().await;
    seed_task(&pool, "task_1", TaskType::Solo, "platform", 5_000).await;
    seed_participant(&pool, "task_1", "user_1", "accepted").await;
    seed_profile(&pool, "user_1", false).await;

    let err = verify_task(
        State(state(pool, true)),
        AuthedUser("user_1".to_string()),
        request("task_1"),
    )
    .await
    .expect_err("phone-unverified caller");
    assert!(matches!(err, ApiError::Forbidden(_)), "got {err:?}");
}

#[tokio::test]
async fn non_participants_and_finished_participants_are_rejected() {
    let pool = test_pool().await;
    seed_task(&pool, "task_1", TaskType::Solo, "platform", 5_000).await;
    seed_profile(&pool, "user_1", true).await;

    let err = verify_task(
        State(state(pool.clone(), true)),
        AuthedUser("user_1".to_string()),
        request("task_1"),
    )
    .await
    .expect_err("not a participant");
    assert!(matches!(err, ApiError::NotFound(_)), "got {err:?}");

    seed_participant(&pool, "task_1", "user_1", "verified").await;
    let err = verify_task(
        State(state(pool, true)),
        AuthedUser("user_1".to_string()),
        request("task_1"),
    )
    .await
    .expect_err("already verified");
    assert!(matches!(err, ApiError::Validation(_)), "got {err:?}");
}

#[tokio::test]
async fn unknown_task_is_not_found() {
    let pool = test_pool().await;
    seed_profile(&pool, "user_1", true).await;

    let err = verify_task(
        State(state(pool, true)),
        AuthedUser("user_1".to_string()),
        request("task_missing"),
    )
    .await
    .expect_err("unknown task");
    assert!(matches!(err, ApiError::NotFound(_)), "got {err:?}");
}
