use anyhow::Result;
use uuid::Uuid;

use crate::domain::booking::{Booking, BookingStatus};
use crate::domain::event::Event;
use crate::domain::payment::{Payment, PaymentStatus};

pub mod memory;
pub mod postgres;

#[derive(Debug, Clone)]
pub enum ReserveOutcome {
    Reserved(Event),
    Insufficient(Event),
    NotFound,
}

/// Result of a compare-and-swap transition. `Rejected` carries the row as
/// it stood when the swap lost, so callers can absorb duplicates.
#[derive(Debug, Clone)]
pub enum Transition<T> {
    Applied(T),
    Rejected(T),
    NotFound,
}

/// Atomicity contract over the record store. Conditional updates here are
/// the serialization points: per-event for the inventory counter, and
/// per-reference for the payment confirmation claim.
#[async_trait::async_trait]
pub trait BookingStore: Send + Sync {
    async fn insert_event(&self, event: &Event) -> Result<()>;
    async fn get_event(&self, event_id: Uuid) -> Result<Option<Event>>;

    /// Atomic conditional decrement: succeeds only if the counter still
    /// covers `quantity` at write time. Never oversells.
    async fn reserve_inventory(&self, event_id: Uuid, quantity: i32) -> Result<ReserveOutcome>;

    /// Saturating increment: the counter never exceeds capacity, so a
    /// double release from an upstream retry is harmless.
    async fn release_inventory(&self, event_id: Uuid, quantity: i32) -> Result<()>;

    async fn insert_booking(&self, booking: &Booking) -> Result<()>;
    async fn get_booking(&self, booking_id: Uuid) -> Result<Option<Booking>>;
    async fn get_booking_by_reference(&self, reference: &str) -> Result<Option<Booking>>;

    async fn transition_booking(
        &self,
        booking_id: Uuid,
        from: &[BookingStatus],
        to: BookingStatus,
    ) -> Result<Transition<Booking>>;

    /// Atomically flips PENDING bookings whose deadline has passed to
    /// EXPIRED and returns them for inventory release.
    async fn expire_due_bookings(
        &self,
        now: chrono::DateTime<chrono::Utc>,
        limit: usize,
    ) -> Result<Vec<Booking>>;

    async fn insert_payment(&self, payment: &Payment) -> Result<()>;
    async fn get_payment_by_reference(&self, reference: &str) -> Result<Option<Payment>>;

    /// Most recent PENDING payment for a booking, if any.
    async fn latest_open_payment(&self, booking_id: Uuid) -> Result<Option<Payment>>;

    /// The booking's settling payment, if one reached SUCCESSFUL.
    async fn successful_payment(&self, booking_id: Uuid) -> Result<Option<Payment>>;

    async fn transition_payment(
        &self,
        reference: &str,
        from: PaymentStatus,
        to: PaymentStatus,
        gateway_reference: Option<String>,
        paid_at: Option<chrono::DateTime<chrono::Utc>>,
    ) -> Result<Transition<Payment>>;
}
