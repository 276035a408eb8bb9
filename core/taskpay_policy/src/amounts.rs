//! # Amount bounds
//!
//! Minimum and maximum transaction amounts per task category.
//!
//! The minimum is not a configured constant: it is derived by inverting
//! the fee schedule so that the payee always nets at least
//! [`MIN_NET_CENTS`] after fees. When the schedule changes, the minimum
//! follows automatically.

use thiserror::Error;

use crate::fees::{calculate_fees, fee_schedule, format_usd};
use crate::types::TaskType;

/// Smallest net a payee may receive from a billable payment: $1.00.
pub const MIN_NET_CENTS: i64 = 100;

/// Largest gross amount accepted for any task: $10,000.00.
pub const MAX_TASK_AMOUNT_CENTS: i64 = 1_000_000;

/// A rejected amount, with a corrected suggestion where one exists.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AmountError {
    #[error(
        "amount is below the {task_type} minimum of {}; try {}",
        format_usd(*.minimum_cents),
        format_usd(*.suggestion_cents)
    )]
    BelowMinimum {
        task_type: TaskType,
        minimum_cents: i64,
        suggestion_cents: i64,
    },

    #[error("amount exceeds the maximum of {}", format_usd(*.maximum_cents))]
    AboveMaximum { maximum_cents: i64 },

    #[error("amount must not be negative")]
    Negative,
}

impl AmountError {
    /// The corrected amount to offer the caller, when one exists.
    pub fn suggestion_cents(&self) -> Option<i64> {
        match self {
            Self::BelowMinimum {
                suggestion_cents, ..
            } => Some(*suggestion_cents),
            Self::AboveMaximum { maximum_cents } => Some(*maximum_cents),
            Self::Negative => None,
        }
    }
}

/// Smallest gross (in cents) whose net is at least [`MIN_NET_CENTS`]
/// under the category's fee schedule. Barter has no minimum.
pub fn minimum_task_amount_cents(task_type: TaskType) -> i64 {
    let schedule = fee_schedule(task_type);
    if schedule.fee_bps == 0 && schedule.processing_fee_cents == 0 {
        return 0;
    }

    // Closed-form lower bound ignoring rounding, then walk to the exact
    // boundary cent. Rounding of the platform fee shifts it by at most
    // a cent in either direction.
    let mut gross =
        (MIN_NET_CENTS + schedule.processing_fee_cents) * 10_000 / (10_000 - schedule.fee_bps);
    while calculate_fees(gross, task_type).net_cents < MIN_NET_CENTS {
        gross += 1;
    }
    while gross > 0 && calculate_fees(gross - 1, task_type).net_cents >= MIN_NET_CENTS {
        gross -= 1;
    }
    gross
}

/// Suggested amount for callers who submitted too little: 10% above the
/// minimum, rounded up to the next cent.
pub fn suggested_task_amount_cents(task_type: TaskType) -> i64 {
    let minimum = minimum_task_amount_cents(task_type);
    (minimum * 11 + 9) / 10
}

/// Validate a gross amount against the category's bounds.
pub fn validate_task_amount(gross_cents: i64, task_type: TaskType) -> Result<(), AmountError> {
    if gross_cents < 0 {
        return Err(AmountError::Negative);
    }
    if gross_cents > MAX_TASK_AMOUNT_CENTS {
        return Err(AmountError::AboveMaximum {
            maximum_cents: MAX_TASK_AMOUNT_CENTS,
        });
    }
    let minimum = minimum_task_amount_cents(task_type);
    if gross_cents < minimum {
        return Err(AmountError::BelowMinimum {
            task_type,
            minimum_cents: minimum,
            suggestion_cents: suggested_task_amount_cents(task_type),
        });
    }
    Ok(())
}

// ─────────────────────────────────────────────────────────
// Unit tests
// ─────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minimums_net_at_least_one_dollar() {
        for ty in [TaskType::Solo, TaskType::Community, TaskType::Corporate] {
            let minimum = minimum_task_amount_cents(ty);
            let at = calculate_fees(minimum, ty);
            assert!(
                at.net_cents >= MIN_NET_CENTS,
                "{ty}: net {} below floor at the minimum",
                at.net_cents
            );
            // Exact boundary: one cent less must net under a dollar.
            let below = calculate_fees(minimum - 1, ty);
            assert!(
                below.net_cents < MIN_NET_CENTS,
                "{ty}: minimum {} is not tight",
                minimum
            );
        }
    }

    #[test]
    fn corporate_minimum_is_exact_at_boundary() {
        let minimum = minimum_task_amount_cents(TaskType::Corporate);
        assert_eq!(minimum, 153);
        assert_eq!(calculate_fees(minimum, TaskType::Corporate).net_cents, 100);
    }

    #[test]
    fn barter_has_no_minimum() {
        assert_eq!(minimum_task_amount_cents(TaskType::Barter), 0);
        assert!(validate_task_amount(0, TaskType::Barter).is_ok());
    }

    #[test]
    fn fifty_cents_community_rejected_with_usable_suggestion() {
        let err = validate_task_amount(50, TaskType::Community).unwrap_err();
        let suggestion = err.suggestion_cents().expect("suggestion expected");
        // The suggestion must itself pass validation when resubmitted.
        assert!(validate_task_amount(suggestion, TaskType::Community).is_ok());
        let message = err.to_string();
        assert!(message.contains("minimum"), "unhelpful message: {message}");
    }

    #[test]
    fn suggestion_is_ten_percent_above_minimum_rounded_up() {
        // Solo minimum is 134¢; 147.4 rounds up to 148.
        assert_eq!(minimum_task_amount_cents(TaskType::Solo), 134);
        assert_eq!(suggested_task_amount_cents(TaskType::Solo), 148);
    }

    #[test]
    fn maximum_applies_to_every_type() {
        for ty in TaskType::ALL {
            assert_eq!(
                validate_task_amount(MAX_TASK_AMOUNT_CENTS + 1, ty),
                Err(AmountError::AboveMaximum {
                    maximum_cents: MAX_TASK_AMOUNT_CENTS
                })
            );
            assert!(validate_task_amount(MAX_TASK_AMOUNT_CENTS, ty).is_ok());
        }
    }

    #[test]
    fn negative_amounts_rejected() {
        assert_eq!(
            validate_task_amount(-1, TaskType::Solo),
            Err(AmountError::Negative)
        );
    }
}
