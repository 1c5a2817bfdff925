use booking_engine::domain::booking::{self, BookingStatus};
use booking_engine::domain::payment::{self, PaymentStatus};

#[test]
fn pending_booking_reaches_every_terminal_state() {
    assert!(booking::transition_allowed(BookingStatus::Pending, BookingStatus::Confirmed));
    assert!(booking::transition_allowed(BookingStatus::Pending, BookingStatus::Cancelled));
    assert!(booking::transition_allowed(BookingStatus::Pending, BookingStatus::Expired));
}

#[test]
fn confirmed_booking_can_only_be_cancelled() {
    assert!(booking::transition_allowed(BookingStatus::Confirmed, BookingStatus::Cancelled));
    assert!(!booking::transition_allowed(BookingStatus::Confirmed, BookingStatus::Pending));
    assert!(!booking::transition_allowed(BookingStatus::Confirmed, BookingStatus::Expired));
    assert!(!booking::transition_allowed(BookingStatus::Confirmed, BookingStatus::Confirmed));
}

#[test]
fn cancelled_and_expired_bookings_are_frozen() {
    for from in [BookingStatus::Cancelled, BookingStatus::Expired] {
        for to in [
            BookingStatus::Pending,
            BookingStatus::Confirmed,
            BookingStatus::Cancelled,
            BookingStatus::Expired,
        ] {
            assert!(!booking::transition_allowed(from, to), "{from:?} -> {to:?} must be rejected");
        }
    }
}

#[test]
fn booking_terminality_matches_the_table() {
    assert!(!BookingStatus::Pending.is_terminal());
    assert!(BookingStatus::Confirmed.is_terminal());
    assert!(BookingStatus::Cancelled.is_terminal());
    assert!(BookingStatus::Expired.is_terminal());
}

#[test]
fn payment_leaves_pending_exactly_once() {
    assert!(payment::transition_allowed(PaymentStatus::Pending, PaymentStatus::Successful));
    assert!(payment::transition_allowed(PaymentStatus::Pending, PaymentStatus::Failed));
    assert!(!payment::transition_allowed(PaymentStatus::Pending, PaymentStatus::Refunded));
    assert!(!payment::transition_allowed(PaymentStatus::Failed, PaymentStatus::Successful));
    assert!(!payment::transition_allowed(PaymentStatus::Failed, PaymentStatus::Pending));
}

#[test]
fn refund_is_only_reachable_from_successful() {
    assert!(payment::transition_allowed(PaymentStatus::Successful, PaymentStatus::Refunded));
    assert!(!payment::transition_allowed(PaymentStatus::Successful, PaymentStatus::Failed));
    assert!(!payment::transition_allowed(PaymentStatus::Refunded, PaymentStatus::Successful));
    assert!(!payment::transition_allowed(PaymentStatus::Refunded, PaymentStatus::Pending));
}
