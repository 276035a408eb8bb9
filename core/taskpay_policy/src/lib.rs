//! # TaskPay Policy
//!
//! This is the rules crate of the **TaskPay** payments backend. Every
//! path that creates or mutates money consults this crate; no fee
//! percentage, amount bound, or status transition is defined anywhere
//! else.
//!
//! | Concern          | Module / Entry Point(s)                        |
//! |------------------|------------------------------------------------|
//! | Task categories  | [`TaskType`]                                   |
//! | Fee schedule     | [`fee_schedule`], [`calculate_fees`]           |
//! | Amount bounds    | [`validate_task_amount`], [`minimum_task_amount_cents`] |
//! | Payment FSM      | [`PaymentStatus::can_transition_to`]           |
//! | Participant FSM  | [`ParticipantStatus::may_submit_verification`] |
//! | Formatting       | [`format_usd`], [`FeeBreakdown::display`]      |
//!
//! ## Architecture
//!
//! The crate is pure: no I/O, no async, all monetary arithmetic in
//! integer cents. The backend service layers persistence and external
//! processors on top of these rules.

mod amounts;
mod fees;
mod types;

#[cfg(test)]
mod invariants;
#[cfg(test)]
mod test_lifecycle;

pub use amounts::{
    minimum_task_amount_cents, suggested_task_amount_cents, validate_task_amount, AmountError,
    MAX_TASK_AMOUNT_CENTS, MIN_NET_CENTS,
};
pub use fees::{
    calculate_fees, cents_to_dollars, dollars_to_cents, fee_schedule, format_usd, FeeBreakdown,
    FeeBreakdownDisplay, FeeSchedule,
};
pub use types::{FundingSource, ParseError, ParticipantStatus, PaymentStatus, TaskType};
