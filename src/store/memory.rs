use std::collections::HashMap;
use std::sync::Arc;

use anyhow::Result;
use tokio::sync::{Mutex, RwLock};
use uuid::Uuid;

use crate::domain::booking::{self, Booking, BookingStatus};
use crate::domain::event::Event;
use crate::domain::payment::{self, Payment, PaymentStatus};
use crate::store::{BookingStore, ReserveOutcome, Transition};

/// In-process store with the same atomicity contract as the Postgres
/// implementation. Each event's counter sits behind its own mutex, so
/// reservations on different events never serialize against each other.
#[derive(Clone, Default)]
pub struct MemoryStore {
    events: Arc<RwLock<HashMap<Uuid, Arc<Mutex<Event>>>>>,
    bookings: Arc<RwLock<HashMap<Uuid, Booking>>>,
    booking_refs: Arc<RwLock<HashMap<String, Uuid>>>,
    payments: Arc<RwLock<HashMap<String, Payment>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl BookingStore for MemoryStore {
    async fn insert_event(&self, event: &Event) -> Result<()> {
        self.events
            .write()
            .await
            .insert(event.id, Arc::new(Mutex::new(event.clone())));
        Ok(())
    }

    async fn get_event(&self, event_id: Uuid) -> Result<Option<Event>> {
        let cell = self.events.read().await.get(&event_id).cloned();
        match cell {
            Some(cell) => Ok(Some(cell.lock().await.clone())),
            None => Ok(None),
        }
    }

    async fn reserve_inventory(&self, event_id: Uuid, quantity: i32) -> Result<ReserveOutcome> {
        let cell = self.events.read().await.get(&event_id).cloned();
        let Some(cell) = cell else {
            return Ok(ReserveOutcome::NotFound);
        };
        let mut event = cell.lock().await;
        if event.available < quantity {
            return Ok(ReserveOutcome::Insufficient(event.clone()));
        }
        event.available -= quantity;
        Ok(ReserveOutcome::Reserved(event.clone()))
    }

    async fn release_inventory(&self, event_id: Uuid, quantity: i32) -> Result<()> {
        let cell = self.events.read().await.get(&event_id).cloned();
        if let Some(cell) = cell {
            let mut event = cell.lock().await;
            event.available = event.capacity.min(event.available + quantity);
        }
        Ok(())
    }

    async fn insert_booking(&self, booking: &Booking) -> Result<()> {
        self.booking_refs
            .write()
            .await
            .insert(booking.reference.clone(), booking.id);
        self.bookings.write().await.insert(booking.id, booking.clone());
        Ok(())
    }

    async fn get_booking(&self, booking_id: Uuid) -> Result<Option<Booking>> {
        Ok(self.bookings.read().await.get(&booking_id).cloned())
    }

    async fn get_booking_by_reference(&self, reference: &str) -> Result<Option<Booking>> {
        let id = self.booking_refs.read().await.get(reference).copied();
        match id {
            Some(id) => Ok(self.bookings.read().await.get(&id).cloned()),
            None => Ok(None),
        }
    }

    async fn transition_booking(
        &self,
        booking_id: Uuid,
        from: &[BookingStatus],
        to: BookingStatus,
    ) -> Result<Transition<Booking>> {
        let mut bookings = self.bookings.write().await;
        let Some(current) = bookings.get_mut(&booking_id) else {
            return Ok(Transition::NotFound);
        };
        if !from.contains(&current.status) || !booking::transition_allowed(current.status, to) {
            return Ok(Transition::Rejected(current.clone()));
        }
        current.status = to;
        Ok(Transition::Applied(current.clone()))
    }

    async fn expire_due_bookings(
        &self,
        now: chrono::DateTime<chrono::Utc>,
        limit: usize,
    ) -> Result<Vec<Booking>> {
        let mut bookings = self.bookings.write().await;
        let mut expired = Vec::new();
        for booking in bookings.values_mut() {
            if expired.len() >= limit {
                break;
            }
            if booking.status == BookingStatus::Pending && booking.reservation_deadline <= now {
                booking.status = BookingStatus::Expired;
                expired.push(booking.clone());
            }
        }
        Ok(expired)
    }

    async fn insert_payment(&self, payment: &Payment) -> Result<()> {
        self.payments
            .write()
            .await
            .insert(payment.reference.clone(), payment.clone());
        Ok(())
    }

    async fn get_payment_by_reference(&self, reference: &str) -> Result<Option<Payment>> {
        Ok(self.payments.read().await.get(reference).cloned())
    }

    async fn latest_open_payment(&self, booking_id: Uuid) -> Result<Option<Payment>> {
        let payments = self.payments.read().await;
        Ok(payments
            .values()
            .filter(|p| p.booking_id == booking_id && p.status == PaymentStatus::Pending)
            .max_by_key(|p| p.created_at)
            .cloned())
    }

    async fn successful_payment(&self, booking_id: Uuid) -> Result<Option<Payment>> {
        let payments = self.payments.read().await;
        Ok(payments
            .values()
            .find(|p| p.booking_id == booking_id && p.status == PaymentStatus::Successful)
            .cloned())
    }

    async fn transition_payment(
        &self,
        reference: &str,
        from: PaymentStatus,
        to: PaymentStatus,
        gateway_reference: Option<String>,
        paid_at: Option<chrono::DateTime<chrono::Utc>>,
    ) -> Result<Transition<Payment>> {
        let mut payments = self.payments.write().await;
        let Some(current) = payments.get_mut(reference) else {
            return Ok(Transition::NotFound);
        };
        if current.status != from || !payment::transition_allowed(from, to) {
            return Ok(Transition::Rejected(current.clone()));
        }
        current.status = to;
        if gateway_reference.is_some() {
            current.gateway_reference = gateway_reference;
        }
        if paid_at.is_some() {
            current.paid_at = paid_at;
        }
        Ok(Transition::Applied(current.clone()))
    }
}
