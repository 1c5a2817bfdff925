use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::booking::BookingStatus;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentStatus {
    Pending,
    Successful,
    Failed,
    Refunded,
}

impl PaymentStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, PaymentStatus::Pending)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "PENDING",
            PaymentStatus::Successful => "SUCCESSFUL",
            PaymentStatus::Failed => "FAILED",
            PaymentStatus::Refunded => "REFUNDED",
        }
    }
}

/// REFUNDED is reachable only from SUCCESSFUL; everything else funnels
/// out of PENDING exactly once.
pub fn transition_allowed(from: PaymentStatus, to: PaymentStatus) -> bool {
    matches!(
        (from, to),
        (PaymentStatus::Pending, PaymentStatus::Successful)
            | (PaymentStatus::Pending, PaymentStatus::Failed)
            | (PaymentStatus::Successful, PaymentStatus::Refunded)
    )
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Payment {
    pub id: Uuid,
    pub reference: String,
    pub booking_id: Uuid,
    pub amount_minor: i64,
    pub status: PaymentStatus,
    pub gateway_reference: Option<String>,
    pub authorization_url: Option<String>,
    pub paid_at: Option<chrono::DateTime<chrono::Utc>>,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfirmOrigin {
    Webhook,
    Poll,
}

impl ConfirmOrigin {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConfirmOrigin::Webhook => "webhook",
            ConfirmOrigin::Poll => "poll",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PaymentInitialized {
    pub payment_reference: String,
    pub authorization_url: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ConfirmOutcome {
    pub booking_status: BookingStatus,
    pub payment_status: PaymentStatus,
}

pub fn new_reference() -> String {
    format!("PY-{}", Uuid::new_v4().simple())
}
