use anyhow::Result;
use sqlx::{PgPool, Row};
use uuid::Uuid;

use crate::domain::booking::{Booking, BookingStatus};
use crate::domain::event::{Event, EventStatus};
use crate::domain::payment::{Payment, PaymentStatus};
use crate::store::{BookingStore, ReserveOutcome, Transition};

#[derive(Clone)]
pub struct PgStore {
    pub pool: PgPool,
}

const BOOKING_COLUMNS: &str =
    "id, reference, event_id, user_id, quantity, status, total_amount_minor, created_at, reservation_deadline";
const PAYMENT_COLUMNS: &str =
    "id, reference, booking_id, amount_minor, status, gateway_reference, authorization_url, paid_at, created_at";

fn booking_from_row(row: &sqlx::postgres::PgRow) -> Booking {
    Booking {
        id: row.get("id"),
        reference: row.get("reference"),
        event_id: row.get("event_id"),
        user_id: row.get("user_id"),
        quantity: row.get("quantity"),
        status: parse_booking_status(row.get("status")),
        total_amount_minor: row.get("total_amount_minor"),
        created_at: row.get("created_at"),
        reservation_deadline: row.get("reservation_deadline"),
    }
}

fn payment_from_row(row: &sqlx::postgres::PgRow) -> Payment {
    Payment {
        id: row.get("id"),
        reference: row.get("reference"),
        booking_id: row.get("booking_id"),
        amount_minor: row.get("amount_minor"),
        status: parse_payment_status(row.get("status")),
        gateway_reference: row.get("gateway_reference"),
        authorization_url: row.get("authorization_url"),
        paid_at: row.get("paid_at"),
        created_at: row.get("created_at"),
    }
}

fn event_from_row(row: &sqlx::postgres::PgRow) -> Event {
    Event {
        id: row.get("id"),
        name: row.get("name"),
        capacity: row.get("capacity"),
        available: row.get("available"),
        price_minor: row.get("price_minor"),
        status: if row.get::<String, _>("status") == "PUBLISHED" {
            EventStatus::Published
        } else {
            EventStatus::Closed
        },
    }
}

fn parse_booking_status(s: String) -> BookingStatus {
    match s.as_str() {
        "CONFIRMED" => BookingStatus::Confirmed,
        "CANCELLED" => BookingStatus::Cancelled,
        "EXPIRED" => BookingStatus::Expired,
        _ => BookingStatus::Pending,
    }
}

fn parse_payment_status(s: String) -> PaymentStatus {
    match s.as_str() {
        "SUCCESSFUL" => PaymentStatus::Successful,
        "FAILED" => PaymentStatus::Failed,
        "REFUNDED" => PaymentStatus::Refunded,
        _ => PaymentStatus::Pending,
    }
}

#[async_trait::async_trait]
impl BookingStore for PgStore {
    async fn insert_event(&self, event: &Event) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO events (id, name, capacity, available, price_minor, status)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(event.id)
        .bind(&event.name)
        .bind(event.capacity)
        .bind(event.available)
        .bind(event.price_minor)
        .bind(match event.status {
            EventStatus::Published => "PUBLISHED",
            EventStatus::Closed => "CLOSED",
        })
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get_event(&self, event_id: Uuid) -> Result<Option<Event>> {
        let row = sqlx::query(
            "SELECT id, name, capacity, available, price_minor, status FROM events WHERE id = $1",
        )
        .bind(event_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(|r| event_from_row(&r)))
    }

    async fn reserve_inventory(&self, event_id: Uuid, quantity: i32) -> Result<ReserveOutcome> {
        let row = sqlx::query(
            r#"
            UPDATE events
            SET available = available - $2
            WHERE id = $1 AND available >= $2
            RETURNING id, name, capacity, available, price_minor, status
            "#,
        )
        .bind(event_id)
        .bind(quantity)
        .fetch_optional(&self.pool)
        .await?;

        if let Some(row) = row {
            return Ok(ReserveOutcome::Reserved(event_from_row(&row)));
        }
        match self.get_event(event_id).await? {
            Some(event) => Ok(ReserveOutcome::Insufficient(event)),
            None => Ok(ReserveOutcome::NotFound),
        }
    }

    async fn release_inventory(&self, event_id: Uuid, quantity: i32) -> Result<()> {
        sqlx::query(
            "UPDATE events SET available = LEAST(capacity, available + $2) WHERE id = $1",
        )
        .bind(event_id)
        .bind(quantity)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn insert_booking(&self, booking: &Booking) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO bookings
                (id, reference, event_id, user_id, quantity, status, total_amount_minor, created_at, reservation_deadline)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(booking.id)
        .bind(&booking.reference)
        .bind(booking.event_id)
        .bind(booking.user_id)
        .bind(booking.quantity)
        .bind(booking.status.as_str())
        .bind(booking.total_amount_minor)
        .bind(booking.created_at)
        .bind(booking.reservation_deadline)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get_booking(&self, booking_id: Uuid) -> Result<Option<Booking>> {
        let row = sqlx::query(&format!(
            "SELECT {BOOKING_COLUMNS} FROM bookings WHERE id = $1"
        ))
        .bind(booking_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(|r| booking_from_row(&r)))
    }

    async fn get_booking_by_reference(&self, reference: &str) -> Result<Option<Booking>> {
        let row = sqlx::query(&format!(
            "SELECT {BOOKING_COLUMNS} FROM bookings WHERE reference = $1"
        ))
        .bind(reference)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(|r| booking_from_row(&r)))
    }

    async fn transition_booking(
        &self,
        booking_id: Uuid,
        from: &[BookingStatus],
        to: BookingStatus,
    ) -> Result<Transition<Booking>> {
        let from_strs: Vec<String> = from.iter().map(|s| s.as_str().to_string()).collect();
        let row = sqlx::query(&format!(
            "UPDATE bookings SET status = $2 WHERE id = $1 AND status = ANY($3) RETURNING {BOOKING_COLUMNS}"
        ))
        .bind(booking_id)
        .bind(to.as_str())
        .bind(&from_strs)
        .fetch_optional(&self.pool)
        .await?;

        if let Some(row) = row {
            return Ok(Transition::Applied(booking_from_row(&row)));
        }
        match self.get_booking(booking_id).await? {
            Some(current) => Ok(Transition::Rejected(current)),
            None => Ok(Transition::NotFound),
        }
    }

    async fn expire_due_bookings(
        &self,
        now: chrono::DateTime<chrono::Utc>,
        limit: usize,
    ) -> Result<Vec<Booking>> {
        let rows = sqlx::query(&format!(
            r#"
            UPDATE bookings SET status = 'EXPIRED'
            WHERE id IN (
                SELECT id FROM bookings
                WHERE status = 'PENDING' AND reservation_deadline <= $1
                ORDER BY reservation_deadline ASC
                LIMIT $2
                FOR UPDATE SKIP LOCKED
            )
            RETURNING {BOOKING_COLUMNS}
            "#
        ))
        .bind(now)
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.iter().map(booking_from_row).collect())
    }

    async fn insert_payment(&self, payment: &Payment) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO payments
                (id, reference, booking_id, amount_minor, status, gateway_reference, authorization_url, paid_at, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(payment.id)
        .bind(&payment.reference)
        .bind(payment.booking_id)
        .bind(payment.amount_minor)
        .bind(payment.status.as_str())
        .bind(&payment.gateway_reference)
        .bind(&payment.authorization_url)
        .bind(payment.paid_at)
        .bind(payment.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get_payment_by_reference(&self, reference: &str) -> Result<Option<Payment>> {
        let row = sqlx::query(&format!(
            "SELECT {PAYMENT_COLUMNS} FROM payments WHERE reference = $1"
        ))
        .bind(reference)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(|r| payment_from_row(&r)))
    }

    async fn latest_open_payment(&self, booking_id: Uuid) -> Result<Option<Payment>> {
        let row = sqlx::query(&format!(
            r#"
            SELECT {PAYMENT_COLUMNS} FROM payments
            WHERE booking_id = $1 AND status = 'PENDING'
            ORDER BY created_at DESC
            LIMIT 1
            "#
        ))
        .bind(booking_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(|r| payment_from_row(&r)))
    }

    async fn successful_payment(&self, booking_id: Uuid) -> Result<Option<Payment>> {
        let row = sqlx::query(&format!(
            "SELECT {PAYMENT_COLUMNS} FROM payments WHERE booking_id = $1 AND status = 'SUCCESSFUL' LIMIT 1"
        ))
        .bind(booking_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(|r| payment_from_row(&r)))
    }

    async fn transition_payment(
        &self,
        reference: &str,
        from: PaymentStatus,
        to: PaymentStatus,
        gateway_reference: Option<String>,
        paid_at: Option<chrono::DateTime<chrono::Utc>>,
    ) -> Result<Transition<Payment>> {
        let row = sqlx::query(&format!(
            r#"
            UPDATE payments
            SET status = $2,
                gateway_reference = COALESCE($3, gateway_reference),
                paid_at = COALESCE($4, paid_at)
            WHERE reference = $1 AND status = $5
            RETURNING {PAYMENT_COLUMNS}
            "#
        ))
        .bind(reference)
        .bind(to.as_str())
        .bind(gateway_reference)
        .bind(paid_at)
        .bind(from.as_str())
        .fetch_optional(&self.pool)
        .await?;

        if let Some(row) = row {
            return Ok(Transition::Applied(payment_from_row(&row)));
        }
        match self.get_payment_by_reference(reference).await? {
            Some(current) => Ok(Transition::Rejected(current)),
            None => Ok(Transition::NotFound),
        }
    }
}
