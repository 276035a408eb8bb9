#![allow(dead_code)]

//! Assertion helpers shared by the policy test modules. Each check is a
//! standing rule of the payment core; tests call them after every
//! simulated mutation.

use crate::fees::FeeBreakdown;
use crate::types::PaymentStatus;

/// INV-1: A breakdown's parts must sum to its gross whenever the payee
/// nets anything at all (the zero-clamp may absorb dust below the fixed
/// fee).
pub fn assert_breakdown_sums_to_gross(fees: &FeeBreakdown) {
    if fees.net_cents > 0 {
        assert_eq!(
            fees.platform_fee_cents + fees.processing_fee_cents + fees.net_cents,
            fees.gross_cents,
            "INV-1 violated: {} + {} + {} != {}",
            fees.platform_fee_cents,
            fees.processing_fee_cents,
            fees.net_cents,
            fees.gross_cents
        );
    }
}

/// INV-2: Net amounts are never negative.
pub fn assert_net_non_negative(fees: &FeeBreakdown) {
    assert!(
        fees.net_cents >= 0,
        "INV-2 violated: negative net {} for gross {}",
        fees.net_cents,
        fees.gross_cents
    );
}

/// INV-3: Fees are never negative and never exceed the gross.
pub fn assert_fees_within_gross(fees: &FeeBreakdown) {
    assert!(
        fees.platform_fee_cents >= 0 && fees.processing_fee_cents >= 0,
        "INV-3 violated: negative fee in {fees:?}"
    );
    if fees.net_cents > 0 {
        assert!(
            fees.platform_fee_cents + fees.processing_fee_cents <= fees.gross_cents,
            "INV-3 violated: fees exceed gross in {fees:?}"
        );
    }
}

/// INV-4: Status transition validity. Only the forward-only lifecycle
/// transitions are legal; terminal states admit none.
pub fn assert_valid_status_transition(from: PaymentStatus, to: PaymentStatus) {
    assert!(
        from.can_transition_to(to),
        "INV-4 violated: invalid status transition from {from:?} to {to:?}"
    );
}

/// INV-5: Terminal statuses can transition nowhere.
pub fn assert_terminal_is_final(status: PaymentStatus) {
    if status.is_terminal() {
        for next in [
            PaymentStatus::Pending,
            PaymentStatus::Escrowed,
            PaymentStatus::RequiresAction,
            PaymentStatus::Completed,
            PaymentStatus::Failed,
            PaymentStatus::Released,
        ] {
            assert!(
                !status.can_transition_to(next),
                "INV-5 violated: terminal {status:?} transitions to {next:?}"
            );
        }
    }
}

/// INV-6: A payment's financial fields never change after creation;
/// only status and timestamps may move.
pub fn assert_financials_immutable(original: &FeeBreakdown, current: &FeeBreakdown) {
    assert_eq!(
        original.gross_cents, current.gross_cents,
        "INV-6 violated: gross changed"
    );
    assert_eq!(
        original.platform_fee_cents, current.platform_fee_cents,
        "INV-6 violated: platform fee changed"
    );
    assert_eq!(
        original.processing_fee_cents, current.processing_fee_cents,
        "INV-6 violated: processing fee changed"
    );
    assert_eq!(
        original.net_cents, current.net_cents,
        "INV-6 violated: net changed"
    );
}

/// Run the stateless breakdown invariants together.
pub fn assert_all_breakdown_invariants(fees: &FeeBreakdown) {
    assert_breakdown_sums_to_gross(fees);
    assert_net_non_negative(fees);
    assert_fees_within_gross(fees);
}
