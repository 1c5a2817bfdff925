use std::sync::Arc;
use std::time::Duration;

use uuid::Uuid;

use crate::cache::{self, Cache};
use crate::domain::booking::{self, Booking, BookingCreated, BookingStatus};
use crate::domain::event::{EventAvailability, EventStatus};
use crate::domain::payment::PaymentStatus;
use crate::error::BookingError;
use crate::store::{BookingStore, ReserveOutcome, Transition};

#[derive(Clone)]
pub struct BookingService {
    pub store: Arc<dyn BookingStore>,
    pub cache: Arc<dyn Cache>,
    pub hold_ttl: chrono::Duration,
    pub max_quantity_per_request: i32,
    pub cache_ttl: Duration,
}

impl BookingService {
    pub async fn start_booking(
        &self,
        event_id: Uuid,
        user_id: Uuid,
        quantity: i32,
    ) -> Result<BookingCreated, BookingError> {
        if quantity < 1 || quantity > self.max_quantity_per_request {
            return Err(BookingError::Validation(format!(
                "quantity must be between 1 and {}",
                self.max_quantity_per_request
            )));
        }

        let event = self
            .store
            .get_event(event_id)
            .await?
            .ok_or(BookingError::NotFound("event"))?;
        if event.status != EventStatus::Published {
            return Err(BookingError::Validation(
                "event is not open for booking".to_string(),
            ));
        }

        let event = match self.store.reserve_inventory(event_id, quantity).await? {
            ReserveOutcome::Reserved(event) => event,
            ReserveOutcome::Insufficient(_) => return Err(BookingError::InsufficientInventory),
            ReserveOutcome::NotFound => return Err(BookingError::NotFound("event")),
        };

        let now = chrono::Utc::now();
        let new_booking = Booking {
            id: Uuid::new_v4(),
            reference: booking::new_reference(),
            event_id,
            user_id,
            quantity,
            status: BookingStatus::Pending,
            total_amount_minor: event.price_minor * i64::from(quantity),
            created_at: now,
            reservation_deadline: now + self.hold_ttl,
        };

        if let Err(e) = self.store.insert_booking(&new_booking).await {
            // Compensate the reservation: the decrement committed but the
            // booking row did not.
            self.store.release_inventory(event_id, quantity).await?;
            return Err(BookingError::Internal(e));
        }

        tracing::info!(
            booking_id = %new_booking.id,
            reference = %new_booking.reference,
            event_id = %event_id,
            quantity,
            "booking started"
        );
        self.invalidate_booking_caches(&new_booking).await;

        Ok(BookingCreated {
            booking_id: new_booking.id,
            reference: new_booking.reference,
            total_amount_minor: new_booking.total_amount_minor,
            reservation_deadline: new_booking.reservation_deadline,
        })
    }

    pub async fn cancel_booking(
        &self,
        booking_id: Uuid,
        actor_id: Uuid,
        reason: &str,
    ) -> Result<Booking, BookingError> {
        let transition = self
            .store
            .transition_booking(
                booking_id,
                &[BookingStatus::Pending, BookingStatus::Confirmed],
                BookingStatus::Cancelled,
            )
            .await?;

        let cancelled = match transition {
            Transition::Applied(b) => b,
            Transition::Rejected(current) => {
                return Err(BookingError::InvalidStateTransition(format!(
                    "cannot cancel a booking in state {}",
                    current.status.as_str()
                )));
            }
            Transition::NotFound => return Err(BookingError::NotFound("booking")),
        };

        self.store
            .release_inventory(cancelled.event_id, cancelled.quantity)
            .await?;

        // A cancelled CONFIRMED booking carries a settled payment; flag it
        // REFUNDED for reconciliation. Money movement happens outside.
        if let Some(payment) = self.store.successful_payment(booking_id).await? {
            self.store
                .transition_payment(
                    &payment.reference,
                    PaymentStatus::Successful,
                    PaymentStatus::Refunded,
                    None,
                    None,
                )
                .await?;
        }

        tracing::info!(
            booking_id = %booking_id,
            actor_id = %actor_id,
            reason,
            "booking cancelled"
        );
        self.invalidate_booking_caches(&cancelled).await;
        Ok(cancelled)
    }

    /// Called only by the confirmation guard after the payment has been
    /// independently verified SUCCESSFUL. Idempotent on repeat.
    pub async fn complete_booking(
        &self,
        booking_id: Uuid,
        payment_reference: &str,
    ) -> Result<Booking, BookingError> {
        let transition = self
            .store
            .transition_booking(booking_id, &[BookingStatus::Pending], BookingStatus::Confirmed)
            .await?;

        match transition {
            Transition::Applied(confirmed) => {
                tracing::info!(
                    booking_id = %booking_id,
                    payment_reference,
                    "booking confirmed"
                );
                self.invalidate_booking_caches(&confirmed).await;
                Ok(confirmed)
            }
            Transition::Rejected(current) if current.status == BookingStatus::Confirmed => {
                Ok(current)
            }
            Transition::Rejected(current) => Err(BookingError::InvalidStateTransition(format!(
                "payment {} settled a booking in state {}",
                payment_reference,
                current.status.as_str()
            ))),
            Transition::NotFound => Err(BookingError::NotFound("booking")),
        }
    }

    pub async fn get_event_availability(
        &self,
        event_id: Uuid,
    ) -> Result<EventAvailability, BookingError> {
        let key = cache::event_availability_key(event_id);
        if let Ok(Some(cached)) = self.cache.get(&key).await {
            if let Ok(availability) = serde_json::from_str::<EventAvailability>(&cached) {
                return Ok(availability);
            }
        }

        let event = self
            .store
            .get_event(event_id)
            .await?
            .ok_or(BookingError::NotFound("event"))?;
        let availability = event.availability();

        if let Ok(payload) = serde_json::to_string(&availability) {
            if let Err(e) = self.cache.set(&key, &payload, self.cache_ttl).await {
                tracing::warn!(key = %key, error = %e, "cache write failed");
            }
        }
        Ok(availability)
    }

    pub async fn get_booking_by_reference(
        &self,
        reference: &str,
    ) -> Result<Booking, BookingError> {
        let key = cache::booking_reference_key(reference);
        if let Ok(Some(cached)) = self.cache.get(&key).await {
            if let Ok(found) = serde_json::from_str::<Booking>(&cached) {
                return Ok(found);
            }
        }

        let found = self
            .store
            .get_booking_by_reference(reference)
            .await?
            .ok_or(BookingError::NotFound("booking"))?;

        if let Ok(payload) = serde_json::to_string(&found) {
            if let Err(e) = self.cache.set(&key, &payload, self.cache_ttl).await {
                tracing::warn!(key = %key, error = %e, "cache write failed");
            }
        }
        Ok(found)
    }

    /// Lazy counterpart of the sweep: expires one PENDING booking whose
    /// deadline has passed, releasing its hold. A lost CAS means someone
    /// else already moved it; nothing further to do.
    pub async fn expire_booking(&self, booking_id: Uuid) -> Result<(), BookingError> {
        let transition = self
            .store
            .transition_booking(booking_id, &[BookingStatus::Pending], BookingStatus::Expired)
            .await?;
        if let Transition::Applied(expired) = transition {
            self.store
                .release_inventory(expired.event_id, expired.quantity)
                .await?;
            tracing::info!(
                booking_id = %expired.id,
                reference = %expired.reference,
                "booking expired, inventory released"
            );
            self.invalidate_booking_caches(&expired).await;
        }
        Ok(())
    }

    /// Sweeps PENDING bookings past their reservation deadline: flips them
    /// to EXPIRED and hands their quantity back to the ledger.
    pub async fn expire_due(&self, limit: usize) -> Result<usize, BookingError> {
        let expired = self
            .store
            .expire_due_bookings(chrono::Utc::now(), limit)
            .await?;
        for stale in &expired {
            self.store
                .release_inventory(stale.event_id, stale.quantity)
                .await?;
            tracing::info!(
                booking_id = %stale.id,
                reference = %stale.reference,
                "booking expired, inventory released"
            );
            self.invalidate_booking_caches(stale).await;
        }
        Ok(expired.len())
    }

    async fn invalidate_booking_caches(&self, subject: &Booking) {
        cache::invalidate(
            self.cache.as_ref(),
            &[
                cache::event_availability_key(subject.event_id),
                cache::booking_reference_key(&subject.reference),
            ],
            &[cache::user_bookings_prefix(subject.user_id)],
        )
        .await;
    }
}
