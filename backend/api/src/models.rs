//! Database row types.
//!
//! Enumerated columns (statuses, task types) are stored as their
//! canonical strings and parsed back through the policy crate, so a row
//! with an unrecognized value surfaces as a `Corrupt` error instead of
//! silently flowing onward.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use taskpay_policy::{
    FeeBreakdown, FundingSource, ParticipantStatus, PaymentStatus, TaskType,
};

use crate::errors::Result;

/// A payment row as stored in / read from the database.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct PaymentRecord {
    pub id: String,
    pub task_id: String,
    pub user_id: String,
    pub task_type: String,
    pub gross_cents: i64,
    pub platform_fee_cents: i64,
    pub processing_fee_cents: i64,
    pub net_cents: i64,
    pub status: String,
    pub fee_breakdown: String,
    pub charge_id: Option<String>,
    pub failure_reason: Option<String>,
    pub disputed: i64,
    pub release_scheduled_at: Option<i64>,
    pub released_at: Option<i64>,
    pub completed_at: Option<i64>,
    pub failed_at: Option<i64>,
    pub created_at: i64,
    pub updated_at: i64,
}

impl PaymentRecord {
    pub fn status(&self) -> Result<PaymentStatus> {
        Ok(PaymentStatus::from_str(&self.status)?)
    }

    pub fn task_type(&self) -> Result<TaskType> {
        Ok(TaskType::from_str(&self.task_type)?)
    }

    /// Reconstruct the breakdown from the row's cent columns. The
    /// serialized `fee_breakdown` column is kept for audit; the columns
    /// are authoritative.
    pub fn breakdown(&self) -> Result<FeeBreakdown> {
        Ok(FeeBreakdown {
            task_type: self.task_type()?,
            gross_cents: self.gross_cents,
            platform_fee_cents: self.platform_fee_cents,
            processing_fee_cents: self.processing_fee_cents,
            net_cents: self.net_cents,
        })
    }
}

/// Fields required to create a payment row.
#[derive(Debug, Clone)]
pub struct NewPayment {
    pub id: String,
    pub task_id: String,
    pub user_id: String,
    pub fees: FeeBreakdown,
    pub status: PaymentStatus,
    pub release_scheduled_at: Option<i64>,
    pub completed_at: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct TaskRow {
    pub id: String,
    pub created_by: String,
    pub task_type: String,
    pub funding_source: String,
    pub earning_potential_cents: i64,
    pub status: String,
    pub payment_status: Option<String>,
    pub created_at: i64,
}

impl TaskRow {
    pub fn task_type(&self) -> Result<TaskType> {
        Ok(TaskType::from_str(&self.task_type)?)
    }

    pub fn funding_source(&self) -> Result<FundingSource> {
        Ok(FundingSource::from_str(&self.funding_source)?)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct ParticipantRow {
    pub id: i64,
    pub task_id: String,
    pub user_id: String,
    pub status: String,
    pub verification_photo: Option<String>,
    pub verification_notes: Option<String>,
    pub verified_at: Option<i64>,
}

impl ParticipantRow {
    pub fn status(&self) -> Result<ParticipantStatus> {
        Ok(ParticipantStatus::from_str(&self.status)?)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct ProfileRow {
    pub id: String,
    pub email: Option<String>,
    pub customer_id: Option<String>,
    pub phone_verified: i64,
    pub created_at: i64,
}

impl ProfileRow {
    pub fn is_phone_verified(&self) -> bool {
        self.phone_verified != 0
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct EarningsRow {
    pub id: i64,
    pub user_id: String,
    pub task_id: String,
    pub payment_id: String,
    pub amount_cents: i64,
    pub task_type: String,
    pub source: String,
    pub created_at: i64,
}
