//! # Types
//!
//! Shared enumerations used across every payment-creating path.
//!
//! ## Design decisions
//!
//! ### One task-type vocabulary
//!
//! The marketplace historically spelled its categories three different
//! ways (`community` vs `shared`, `corporate` vs `corporate_sponsored`).
//! [`TaskType`] is the single spelling; the legacy names are accepted as
//! parse/deserialize aliases and never emitted.
//!
//! ### Status as a Finite-State Machine
//!
//! [`PaymentStatus`] enforces a strict forward-only lifecycle:
//!
//! ```text
//! Pending ──► Escrowed ──► Released
//!    │   └──► RequiresAction ──► Escrowed | Completed | Failed
//!    ├──► Completed
//!    └──► Failed
//! Escrowed ──► Failed
//! ```
//!
//! Backward transitions and transitions out of terminal states
//! (`Completed`, `Failed`, `Released`) are rejected by
//! [`PaymentStatus::can_transition_to`]; the database layer applies the
//! same rule as a conditional update so concurrent writers cannot race
//! past it.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Returned when a stored or wire string does not name a known variant.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unrecognized {kind}: {value:?}")]
pub struct ParseError {
    pub kind: &'static str,
    pub value: String,
}

/// Marketplace task category. Determines the fee schedule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskType {
    /// Single-participant task.
    Solo,
    /// Community-hosted task, multiple participants.
    #[serde(alias = "shared")]
    Community,
    /// Goods/services exchange; no money moves, no fees apply.
    Barter,
    /// Corporate-sponsored task.
    #[serde(alias = "corporate_sponsored")]
    Corporate,
}

impl TaskType {
    /// Identifier string as stored in the database.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Solo => "solo",
            Self::Community => "community",
            Self::Barter => "barter",
            Self::Corporate => "corporate",
        }
    }

    /// All billable and non-billable categories.
    pub const ALL: [TaskType; 4] = [Self::Solo, Self::Community, Self::Barter, Self::Corporate];
}

impl FromStr for TaskType {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "solo" => Ok(Self::Solo),
            // "shared" is the legacy spelling used by early verify handlers.
            "community" | "shared" => Ok(Self::Community),
            "barter" => Ok(Self::Barter),
            "corporate" | "corporate_sponsored" => Ok(Self::Corporate),
            other => Err(ParseError {
                kind: "task type",
                value: other.to_string(),
            }),
        }
    }
}

impl fmt::Display for TaskType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lifecycle status of a payment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    /// Intent created; awaiting payer confirmation.
    Pending,
    /// Funds authorized and held; awaiting release.
    Escrowed,
    /// Payer must complete an additional processor step (3DS etc.).
    RequiresAction,
    /// Funds captured outside the escrow path.
    Completed,
    /// Processor reported a definitive failure.
    Failed,
    /// Escrowed funds captured and paid out.
    Released,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Escrowed => "escrowed",
            Self::RequiresAction => "requires_action",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Released => "released",
        }
    }

    /// Whether the lifecycle permits moving from `self` to `next`.
    ///
    /// This is the single authority every mutating path consults; the
    /// persistence layer additionally guards the same rule with a
    /// conditional update keyed on the expected current status.
    pub fn can_transition_to(&self, next: PaymentStatus) -> bool {
        use PaymentStatus::*;
        matches!(
            (self, next),
            (Pending, Escrowed)
                | (Pending, RequiresAction)
                | (Pending, Completed)
                | (Pending, Failed)
                | (RequiresAction, Escrowed)
                | (RequiresAction, Completed)
                | (RequiresAction, Failed)
                | (Escrowed, Released)
                | (Escrowed, Failed)
        )
    }

    /// Terminal statuses admit no further transitions.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Released)
    }
}

impl FromStr for PaymentStatus {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "escrowed" => Ok(Self::Escrowed),
            "requires_action" => Ok(Self::RequiresAction),
            "completed" => Ok(Self::Completed),
            "failed" => Ok(Self::Failed),
            "released" => Ok(Self::Released),
            other => Err(ParseError {
                kind: "payment status",
                value: other.to_string(),
            }),
        }
    }
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Status of a user's participation in a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParticipantStatus {
    Applied,
    Accepted,
    AutoApproved,
    PendingVerification,
    /// Completion submitted but the verifier did not approve it;
    /// awaiting a human reviewer.
    PendingReview,
    Completed,
    /// Completion submitted and approved.
    Verified,
}

impl ParticipantStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Applied => "applied",
            Self::Accepted => "accepted",
            Self::AutoApproved => "auto_approved",
            Self::PendingVerification => "pending_verification",
            Self::PendingReview => "pending_review",
            Self::Completed => "completed",
            Self::Verified => "verified",
        }
    }

    /// Only participants who applied or were accepted may submit a
    /// completion for verification.
    pub fn may_submit_verification(&self) -> bool {
        matches!(self, Self::Applied | Self::Accepted)
    }
}

impl FromStr for ParticipantStatus {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "applied" => Ok(Self::Applied),
            "accepted" => Ok(Self::Accepted),
            "auto_approved" => Ok(Self::AutoApproved),
            "pending_verification" => Ok(Self::PendingVerification),
            "pending_review" => Ok(Self::PendingReview),
            "completed" => Ok(Self::Completed),
            "verified" => Ok(Self::Verified),
            other => Err(ParseError {
                kind: "participant status",
                value: other.to_string(),
            }),
        }
    }
}

impl fmt::Display for ParticipantStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Who funds a task's earning potential.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FundingSource {
    /// The platform pays out directly on verified completion.
    Platform,
    /// Another user pays through the escrow flow.
    Peer,
}

impl FundingSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Platform => "platform",
            Self::Peer => "peer",
        }
    }
}

impl FromStr for FundingSource {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "platform" => Ok(Self::Platform),
            "peer" => Ok(Self::Peer),
            other => Err(ParseError {
                kind: "funding source",
                value: other.to_string(),
            }),
        }
    }
}

impl fmt::Display for FundingSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
