use std::sync::Arc;

use uuid::Uuid;

use crate::domain::booking::{Booking, BookingStatus};
use crate::domain::payment::{
    self, ConfirmOrigin, ConfirmOutcome, Payment, PaymentInitialized, PaymentStatus,
};
use crate::error::BookingError;
use crate::gateways::{GatewayPaymentStatus, InitializeRequest, PaymentGateway};
use crate::notify::{encode_qr, BookingConfirmedNote, Notifier, QrGenerator};
use crate::service::booking_service::BookingService;
use crate::store::{BookingStore, Transition};

#[derive(Clone)]
pub struct PaymentService {
    pub store: Arc<dyn BookingStore>,
    pub gateway: Arc<dyn PaymentGateway>,
    pub notifier: Arc<dyn Notifier>,
    pub qr: Arc<dyn QrGenerator>,
    pub booking_service: BookingService,
    /// How long an open payment intent keeps being re-served before a
    /// retry mints a fresh one.
    pub reuse_window: chrono::Duration,
}

impl PaymentService {
    pub async fn initialize_payment(
        &self,
        booking_id: Uuid,
        callback_url: &str,
    ) -> Result<PaymentInitialized, BookingError> {
        let booking = self
            .store
            .get_booking(booking_id)
            .await?
            .ok_or(BookingError::NotFound("booking"))?;

        if booking.status != BookingStatus::Pending {
            return Err(BookingError::InvalidStateTransition(format!(
                "cannot take payment for a booking in state {}",
                booking.status.as_str()
            )));
        }

        let now = chrono::Utc::now();
        if booking.reservation_deadline <= now {
            // The hold has lapsed; expire it here rather than collect
            // money against inventory that is about to be released.
            self.booking_service.expire_booking(booking_id).await?;
            return Err(BookingError::InvalidStateTransition(
                "reservation deadline has passed".to_string(),
            ));
        }

        // Retry-safe: an open intent inside the reuse window is re-served
        // instead of minting another row with money implications.
        if let Some(open) = self.store.latest_open_payment(booking_id).await? {
            if open.created_at + self.reuse_window > now {
                if let Some(url) = open.authorization_url.clone() {
                    tracing::info!(
                        booking_id = %booking_id,
                        payment_reference = %open.reference,
                        "reusing open payment intent"
                    );
                    return Ok(PaymentInitialized {
                        payment_reference: open.reference,
                        authorization_url: url,
                    });
                }
            }
        }

        let reference = payment::new_reference();
        let initialized = self
            .gateway
            .initialize(InitializeRequest {
                amount_minor: booking.total_amount_minor,
                reference: reference.clone(),
                callback_url: callback_url.to_string(),
            })
            .await?;

        let record = Payment {
            id: Uuid::new_v4(),
            reference: reference.clone(),
            booking_id,
            amount_minor: booking.total_amount_minor,
            status: PaymentStatus::Pending,
            gateway_reference: Some(initialized.gateway_reference.clone()),
            authorization_url: Some(initialized.authorization_url.clone()),
            paid_at: None,
            created_at: now,
        };
        self.store.insert_payment(&record).await?;

        tracing::info!(
            booking_id = %booking_id,
            payment_reference = %reference,
            gateway = self.gateway.name(),
            "payment initialized"
        );
        Ok(PaymentInitialized {
            payment_reference: reference,
            authorization_url: initialized.authorization_url,
        })
    }

    /// Convergence point for the gateway webhook and the client poll. The
    /// claimed status of a push payload is never trusted; the outcome is
    /// re-verified against the gateway before any state moves. Exactly one
    /// caller wins the PENDING -> terminal compare-and-swap and performs
    /// the side effects; everyone else observes the settled state.
    pub async fn confirm(
        &self,
        payment_reference: &str,
        origin: ConfirmOrigin,
    ) -> Result<ConfirmOutcome, BookingError> {
        let found = self
            .store
            .get_payment_by_reference(payment_reference)
            .await?
            .ok_or(BookingError::NotFound("payment"))?;

        if found.status.is_terminal() {
            return self.settled_outcome(&found).await;
        }

        let verified = self.gateway.verify(payment_reference).await?;

        match verified.status {
            GatewayPaymentStatus::Successful if verified.amount_minor == found.amount_minor => {
                self.settle_successful(&found, verified.gateway_reference, verified.paid_at, origin)
                    .await
            }
            GatewayPaymentStatus::Successful => {
                tracing::warn!(
                    payment_reference,
                    expected = found.amount_minor,
                    reported = verified.amount_minor,
                    "verified amount does not match payment; failing attempt"
                );
                self.settle_failed(&found).await
            }
            GatewayPaymentStatus::Failed => self.settle_failed(&found).await,
            GatewayPaymentStatus::Pending => {
                let booking = self
                    .store
                    .get_booking(found.booking_id)
                    .await?
                    .ok_or(BookingError::NotFound("booking"))?;
                Ok(ConfirmOutcome {
                    booking_status: booking.status,
                    payment_status: found.status,
                })
            }
        }
    }

    async fn settle_successful(
        &self,
        found: &Payment,
        gateway_reference: String,
        paid_at: Option<chrono::DateTime<chrono::Utc>>,
        origin: ConfirmOrigin,
    ) -> Result<ConfirmOutcome, BookingError> {
        let claim = self
            .store
            .transition_payment(
                &found.reference,
                PaymentStatus::Pending,
                PaymentStatus::Successful,
                Some(gateway_reference),
                Some(paid_at.unwrap_or_else(chrono::Utc::now)),
            )
            .await?;

        let settled = match claim {
            Transition::Applied(p) => p,
            // Lost the race: the winner owns the side effects.
            Transition::Rejected(p) => return self.settled_outcome(&p).await,
            Transition::NotFound => return Err(BookingError::NotFound("payment")),
        };

        tracing::info!(
            payment_reference = %settled.reference,
            origin = origin.as_str(),
            "payment settled successful"
        );

        let confirmed = self
            .booking_service
            .complete_booking(settled.booking_id, &settled.reference)
            .await?;

        self.dispatch_confirmation(&confirmed, &settled).await;

        Ok(ConfirmOutcome {
            booking_status: confirmed.status,
            payment_status: settled.status,
        })
    }

    async fn settle_failed(&self, found: &Payment) -> Result<ConfirmOutcome, BookingError> {
        let claim = self
            .store
            .transition_payment(
                &found.reference,
                PaymentStatus::Pending,
                PaymentStatus::Failed,
                None,
                None,
            )
            .await?;

        let settled = match claim {
            Transition::Applied(p) => p,
            Transition::Rejected(p) => return self.settled_outcome(&p).await,
            Transition::NotFound => return Err(BookingError::NotFound("payment")),
        };

        tracing::info!(payment_reference = %settled.reference, "payment settled failed");

        // The booking stays PENDING so the user may retry; the expiry
        // sweeper reclaims the hold if the deadline lapses first.
        let booking = self
            .store
            .get_booking(settled.booking_id)
            .await?
            .ok_or(BookingError::NotFound("booking"))?;
        Ok(ConfirmOutcome {
            booking_status: booking.status,
            payment_status: settled.status,
        })
    }

    /// Idempotent absorption: report the terminal state without repeating
    /// any side effect.
    async fn settled_outcome(&self, settled: &Payment) -> Result<ConfirmOutcome, BookingError> {
        let booking = self
            .store
            .get_booking(settled.booking_id)
            .await?
            .ok_or(BookingError::NotFound("booking"))?;
        Ok(ConfirmOutcome {
            booking_status: booking.status,
            payment_status: settled.status,
        })
    }

    async fn dispatch_confirmation(&self, confirmed: &Booking, settled: &Payment) {
        let qr_png_base64 = match self.qr.generate(&confirmed.reference).await {
            Ok(bytes) => Some(encode_qr(&bytes)),
            Err(e) => {
                tracing::warn!(reference = %confirmed.reference, error = %e, "qr generation failed");
                None
            }
        };

        let note = BookingConfirmedNote {
            booking_id: confirmed.id,
            booking_reference: confirmed.reference.clone(),
            user_id: confirmed.user_id,
            event_id: confirmed.event_id,
            quantity: confirmed.quantity,
            total_amount_minor: confirmed.total_amount_minor,
            payment_reference: settled.reference.clone(),
            confirmed_at: settled.paid_at.unwrap_or_else(chrono::Utc::now),
            qr_png_base64,
        };

        if let Err(e) = self.notifier.booking_confirmed(note).await {
            tracing::warn!(
                booking_reference = %confirmed.reference,
                error = %e,
                "confirmation notification failed"
            );
        }
    }
}
