use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BookingStatus {
    Pending,
    Confirmed,
    Cancelled,
    Expired,
}

impl BookingStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, BookingStatus::Pending)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            BookingStatus::Pending => "PENDING",
            BookingStatus::Confirmed => "CONFIRMED",
            BookingStatus::Cancelled => "CANCELLED",
            BookingStatus::Expired => "EXPIRED",
        }
    }
}

/// Single source of truth for the booking lifecycle; status
/// compare-and-swaps admit nothing outside this table.
pub fn transition_allowed(from: BookingStatus, to: BookingStatus) -> bool {
    matches!(
        (from, to),
        (BookingStatus::Pending, BookingStatus::Confirmed)
            | (BookingStatus::Pending, BookingStatus::Cancelled)
            | (BookingStatus::Pending, BookingStatus::Expired)
            | (BookingStatus::Confirmed, BookingStatus::Cancelled)
    )
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Booking {
    pub id: Uuid,
    pub reference: String,
    pub event_id: Uuid,
    pub user_id: Uuid,
    pub quantity: i32,
    pub status: BookingStatus,
    pub total_amount_minor: i64,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub reservation_deadline: chrono::DateTime<chrono::Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct BookingCreated {
    pub booking_id: Uuid,
    pub reference: String,
    pub total_amount_minor: i64,
    pub reservation_deadline: chrono::DateTime<chrono::Utc>,
}

pub fn new_reference() -> String {
    format!("BK-{}", Uuid::new_v4().simple())
}
