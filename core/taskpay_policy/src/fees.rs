//! # Fee schedule
//!
//! The single authoritative fee table and the cent-exact breakdown math.
//!
//! ## Design decisions
//!
//! ### Integer cents everywhere
//!
//! Gross amounts cross the API boundary as dollars but are converted to
//! integer cents immediately and never touch floating point again.
//! Percentages are held as basis points (`300` = 3.00%) so the platform
//! fee is a single integer multiply-divide with half-up rounding.
//!
//! ### One table
//!
//! Every payment-creating path (intent creation, escrow release,
//! verification payouts) calls [`calculate_fees`]; there is no second
//! copy of these numbers anywhere in the workspace.

use serde::{Deserialize, Serialize};

use crate::types::TaskType;

/// Fee parameters for one task category.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeeSchedule {
    /// Platform fee in basis points of the gross amount.
    pub fee_bps: i64,
    /// Fixed processing fee in cents, charged once per payment.
    pub processing_fee_cents: i64,
    /// Human-readable description surfaced in API responses.
    pub description: &'static str,
}

/// Look up the fee parameters for a task category.
pub const fn fee_schedule(task_type: TaskType) -> FeeSchedule {
    match task_type {
        TaskType::Solo => FeeSchedule {
            fee_bps: 300,
            processing_fee_cents: 30,
            description: "3% platform fee for solo tasks",
        },
        TaskType::Community => FeeSchedule {
            fee_bps: 700,
            processing_fee_cents: 30,
            description: "7% platform fee for community tasks",
        },
        TaskType::Barter => FeeSchedule {
            fee_bps: 0,
            processing_fee_cents: 0,
            description: "No fees on barter exchanges",
        },
        TaskType::Corporate => FeeSchedule {
            fee_bps: 1500,
            processing_fee_cents: 30,
            description: "15% platform fee for corporate tasks",
        },
    }
}

/// Cent-exact decomposition of a gross amount.
///
/// Invariant: `platform_fee_cents + processing_fee_cents + net_cents ==
/// gross_cents` except when the zero-clamp on `net_cents` engages (gross
/// too small to cover the fixed fee).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeeBreakdown {
    pub task_type: TaskType,
    pub gross_cents: i64,
    pub platform_fee_cents: i64,
    pub processing_fee_cents: i64,
    pub net_cents: i64,
}

/// Formatted-currency rendering of a [`FeeBreakdown`] for API responses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeeBreakdownDisplay {
    pub task_type: TaskType,
    pub gross: String,
    pub platform_fee: String,
    pub processing_fee: String,
    pub net: String,
    pub description: &'static str,
}

impl FeeBreakdown {
    pub fn display(&self) -> FeeBreakdownDisplay {
        FeeBreakdownDisplay {
            task_type: self.task_type,
            gross: format_usd(self.gross_cents),
            platform_fee: format_usd(self.platform_fee_cents),
            processing_fee: format_usd(self.processing_fee_cents),
            net: format_usd(self.net_cents),
            description: fee_schedule(self.task_type).description,
        }
    }
}

/// Decompose `gross_cents` into platform fee, processing fee, and net.
///
/// Total for every input: negative gross is treated as zero and the net
/// is clamped at zero. Callers that need to *reject* out-of-range
/// amounts do so through [`crate::validate_task_amount`] first.
pub fn calculate_fees(gross_cents: i64, task_type: TaskType) -> FeeBreakdown {
    let schedule = fee_schedule(task_type);
    let gross = gross_cents.max(0);

    let platform_fee = round_half_up_bps(gross, schedule.fee_bps);
    let net = (gross - platform_fee - schedule.processing_fee_cents).max(0);

    FeeBreakdown {
        task_type,
        gross_cents: gross,
        platform_fee_cents: platform_fee,
        processing_fee_cents: schedule.processing_fee_cents,
        net_cents: net,
    }
}

/// `round(cents * bps / 10_000)` with ties away from zero, for
/// non-negative inputs. i128 intermediate keeps the multiply safe up to
/// any representable amount.
fn round_half_up_bps(cents: i64, bps: i64) -> i64 {
    ((cents as i128 * bps as i128 + 5_000) / 10_000) as i64
}

/// Convert a dollar amount from the wire into integer cents.
pub fn dollars_to_cents(dollars: f64) -> i64 {
    (dollars * 100.0).round() as i64
}

/// Convert integer cents back to dollars for wire responses.
pub fn cents_to_dollars(cents: i64) -> f64 {
    cents as f64 / 100.0
}

/// Render cents as a USD currency string: `9670` → `"$96.70"`.
pub fn format_usd(cents: i64) -> String {
    let sign = if cents < 0 { "-" } else { "" };
    let abs = cents.unsigned_abs();
    format!("{sign}${}.{:02}", abs / 100, abs % 100)
}

// ─────────────────────────────────────────────────────────
// Unit tests
// ─────────────────────────────────────────────────────────
