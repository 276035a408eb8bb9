//! Lifecycle tests: the payment state machine, participant gating, and
//! the breakdown invariants swept across the schedule.

use std::str::FromStr;

use crate::invariants;
use crate::{
    calculate_fees, minimum_task_amount_cents, ParticipantStatus, PaymentStatus, TaskType,
};

#[test]
fn forward_transitions_are_legal() {
    use PaymentStatus::*;
    invariants::assert_valid_status_transition(Pending, Escrowed);
    invariants::assert_valid_status_transition(Pending, RequiresAction);
    invariants::assert_valid_status_transition(Pending, Completed);
    invariants::assert_valid_status_transition(Pending, Failed);
    invariants::assert_valid_status_transition(RequiresAction, Escrowed);
    invariants::assert_valid_status_transition(RequiresAction, Completed);
    invariants::assert_valid_status_transition(Escrowed, Released);
    invariants::assert_valid_status_transition(Escrowed, Failed);
}

#[test]
fn backward_and_terminal_transitions_are_rejected() {
    use PaymentStatus::*;
    assert!(!Escrowed.can_transition_to(Pending));
    assert!(!Released.can_transition_to(Escrowed));
    assert!(!Completed.can_transition_to(Released));
    assert!(!Failed.can_transition_to(Pending));
    // A released payment cannot be released again.
    assert!(!Released.can_transition_to(Released));

    for status in [Completed, Failed, Released] {
        invariants::assert_terminal_is_final(status);
    }
}

#[test]
fn pending_cannot_skip_to_released() {
    // Release requires the funds to have been escrowed first.
    assert!(!PaymentStatus::Pending.can_transition_to(PaymentStatus::Released));
}

#[test]
fn only_applied_or_accepted_may_submit() {
    assert!(ParticipantStatus::Applied.may_submit_verification());
    assert!(ParticipantStatus::Accepted.may_submit_verification());
    for status in [
        ParticipantStatus::AutoApproved,
        ParticipantStatus::PendingVerification,
        ParticipantStatus::PendingReview,
        ParticipantStatus::Completed,
        ParticipantStatus::Verified,
    ] {
        assert!(!status.may_submit_verification(), "{status} may submit");
    }
}

#[test]
fn status_strings_round_trip() {
    for status in [
        PaymentStatus::Pending,
        PaymentStatus::Escrowed,
        PaymentStatus::RequiresAction,
        PaymentStatus::Completed,
        PaymentStatus::Failed,
        PaymentStatus::Released,
    ] {
        assert_eq!(PaymentStatus::from_str(status.as_str()), Ok(status));
    }
}

#[test]
fn legacy_task_type_spellings_collapse() {
    assert_eq!(TaskType::from_str("shared"), Ok(TaskType::Community));
    assert_eq!(
        TaskType::from_str("corporate_sponsored"),
        Ok(TaskType::Corporate)
    );
    // Canonical names stay canonical on the way back out.
    assert_eq!(TaskType::Community.as_str(), "community");
    assert_eq!(TaskType::Corporate.as_str(), "corporate");
    assert!(TaskType::from_str("freelance").is_err());
}

#[test]
fn breakdown_invariants_hold_across_the_schedule() {
    for ty in TaskType::ALL {
        let minimum = minimum_task_amount_cents(ty);
        for gross in [0, 1, minimum.saturating_sub(1), minimum, 5_000, 1_000_000] {
            invariants::assert_all_breakdown_invariants(&calculate_fees(gross, ty));
        }
    }
}

#[test]
fn financial_fields_do_not_drift_through_serialization() {
    let original = calculate_fees(25_000, TaskType::Community);
    let stored = serde_json::to_string(&original).unwrap();
    let reloaded = serde_json::from_str(&stored).unwrap();
    invariants::assert_financials_immutable(&original, &reloaded);
}
