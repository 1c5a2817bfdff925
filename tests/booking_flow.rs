use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use booking_engine::cache::memory::MemoryCache;
use booking_engine::domain::booking::BookingStatus;
use booking_engine::domain::event::{Event, EventStatus};
use booking_engine::domain::payment::{ConfirmOrigin, PaymentStatus};
use booking_engine::error::BookingError;
use booking_engine::gateways::mock::{MockBehavior, MockGateway};
use booking_engine::notify::{BookingConfirmedNote, Notifier, QrGenerator};
use booking_engine::service::booking_service::BookingService;
use booking_engine::service::payment_service::PaymentService;
use booking_engine::store::memory::MemoryStore;
use booking_engine::store::BookingStore;
use uuid::Uuid;

#[derive(Default)]
struct CountingNotifier {
    dispatched: AtomicUsize,
}

#[async_trait::async_trait]
impl Notifier for CountingNotifier {
    async fn booking_confirmed(&self, _note: BookingConfirmedNote) -> anyhow::Result<()> {
        self.dispatched.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

struct StaticQr;

#[async_trait::async_trait]
impl QrGenerator for StaticQr {
    async fn generate(&self, _booking_reference: &str) -> anyhow::Result<Vec<u8>> {
        Ok(vec![0x89, 0x50, 0x4e, 0x47])
    }
}

struct TestApp {
    store: Arc<MemoryStore>,
    gateway: Arc<MockGateway>,
    notifier: Arc<CountingNotifier>,
    bookings: BookingService,
    payments: PaymentService,
}

fn app() -> TestApp {
    app_with_hold_minutes(15)
}

fn app_with_hold_minutes(hold_minutes: i64) -> TestApp {
    let store = Arc::new(MemoryStore::new());
    let cache = Arc::new(MemoryCache::new());
    let gateway = MockGateway::new(MockBehavior::AlwaysSuccessful);
    let notifier = Arc::new(CountingNotifier::default());

    let bookings = BookingService {
        store: store.clone(),
        cache,
        hold_ttl: chrono::Duration::minutes(hold_minutes),
        max_quantity_per_request: 10,
        cache_ttl: std::time::Duration::from_secs(60),
    };
    let payments = PaymentService {
        store: store.clone(),
        gateway: gateway.clone(),
        notifier: notifier.clone(),
        qr: Arc::new(StaticQr),
        booking_service: bookings.clone(),
        reuse_window: chrono::Duration::minutes(10),
    };

    TestApp {
        store,
        gateway,
        notifier,
        bookings,
        payments,
    }
}

async fn seed_event(app: &TestApp, capacity: i32, price_minor: i64) -> Uuid {
    let ev = Event {
        id: Uuid::new_v4(),
        name: "main hall".to_string(),
        capacity,
        available: capacity,
        price_minor,
        status: EventStatus::Published,
    };
    app.store.insert_event(&ev).await.unwrap();
    ev.id
}

async fn available(app: &TestApp, event_id: Uuid) -> i32 {
    app.store.get_event(event_id).await.unwrap().unwrap().available
}

#[tokio::test]
async fn happy_path_reserve_pay_confirm() {
    let app = app();
    let event_id = seed_event(&app, 5, 2_000).await;
    let user_id = Uuid::new_v4();

    let created = app.bookings.start_booking(event_id, user_id, 2).await.unwrap();
    assert_eq!(created.total_amount_minor, 4_000);
    assert_eq!(available(&app, event_id).await, 3);

    let init = app
        .payments
        .initialize_payment(created.booking_id, "https://example.test/callback")
        .await
        .unwrap();
    assert!(init.authorization_url.contains(&init.payment_reference));

    let outcome = app
        .payments
        .confirm(&init.payment_reference, ConfirmOrigin::Poll)
        .await
        .unwrap();
    assert_eq!(outcome.booking_status, BookingStatus::Confirmed);
    assert_eq!(outcome.payment_status, PaymentStatus::Successful);

    // Confirmation settles the money, not the inventory.
    assert_eq!(available(&app, event_id).await, 3);
    assert_eq!(app.notifier.dispatched.load(Ordering::SeqCst), 1);

    let stored = app
        .bookings
        .get_booking_by_reference(&created.reference)
        .await
        .unwrap();
    assert_eq!(stored.status, BookingStatus::Confirmed);
}

#[tokio::test]
async fn cancel_before_payment_restores_inventory() {
    let app = app();
    let event_id = seed_event(&app, 5, 2_000).await;
    let user_id = Uuid::new_v4();

    let created = app.bookings.start_booking(event_id, user_id, 2).await.unwrap();
    assert_eq!(available(&app, event_id).await, 3);

    let cancelled = app
        .bookings
        .cancel_booking(created.booking_id, user_id, "changed plans")
        .await
        .unwrap();
    assert_eq!(cancelled.status, BookingStatus::Cancelled);
    assert_eq!(available(&app, event_id).await, 5);

    let again = app
        .bookings
        .cancel_booking(created.booking_id, user_id, "double click")
        .await;
    assert!(matches!(again, Err(BookingError::InvalidStateTransition(_))));
    assert_eq!(available(&app, event_id).await, 5);
}

#[tokio::test]
async fn cancel_confirmed_booking_releases_and_flags_refund() {
    let app = app();
    let event_id = seed_event(&app, 5, 1_000).await;
    let user_id = Uuid::new_v4();

    let created = app.bookings.start_booking(event_id, user_id, 3).await.unwrap();
    let init = app
        .payments
        .initialize_payment(created.booking_id, "https://example.test/cb")
        .await
        .unwrap();
    app.payments
        .confirm(&init.payment_reference, ConfirmOrigin::Webhook)
        .await
        .unwrap();

    app.bookings
        .cancel_booking(created.booking_id, user_id, "event rescheduled")
        .await
        .unwrap();

    assert_eq!(available(&app, event_id).await, 5);
    let settled = app
        .store
        .get_payment_by_reference(&init.payment_reference)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(settled.status, PaymentStatus::Refunded);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn last_ticket_goes_to_exactly_one_buyer() {
    let app = app();
    let event_id = seed_event(&app, 1, 2_500).await;

    let first = {
        let bookings = app.bookings.clone();
        tokio::spawn(async move { bookings.start_booking(event_id, Uuid::new_v4(), 1).await })
    };
    let second = {
        let bookings = app.bookings.clone();
        tokio::spawn(async move { bookings.start_booking(event_id, Uuid::new_v4(), 1).await })
    };

    let results = [first.await.unwrap(), second.await.unwrap()];
    let won = results.iter().filter(|r| r.is_ok()).count();
    let lost = results
        .iter()
        .filter(|r| matches!(r, Err(BookingError::InsufficientInventory)))
        .count();

    assert_eq!(won, 1);
    assert_eq!(lost, 1);
    assert_eq!(available(&app, event_id).await, 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn webhook_and_poll_race_confirms_once() {
    let app = app();
    let event_id = seed_event(&app, 5, 2_000).await;

    let created = app
        .bookings
        .start_booking(event_id, Uuid::new_v4(), 1)
        .await
        .unwrap();
    let init = app
        .payments
        .initialize_payment(created.booking_id, "https://example.test/cb")
        .await
        .unwrap();

    let webhook = {
        let payments = app.payments.clone();
        let reference = init.payment_reference.clone();
        tokio::spawn(async move { payments.confirm(&reference, ConfirmOrigin::Webhook).await })
    };
    let poll = {
        let payments = app.payments.clone();
        let reference = init.payment_reference.clone();
        tokio::spawn(async move { payments.confirm(&reference, ConfirmOrigin::Poll).await })
    };

    // Duplicate confirmation is absorbed, never an error.
    webhook.await.unwrap().unwrap();
    poll.await.unwrap().unwrap();

    assert_eq!(app.notifier.dispatched.load(Ordering::SeqCst), 1);

    let booking = app.store.get_booking(created.booking_id).await.unwrap().unwrap();
    assert_eq!(booking.status, BookingStatus::Confirmed);
    let payment = app
        .store
        .get_payment_by_reference(&init.payment_reference)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(payment.status, PaymentStatus::Successful);

    // A later replay of the same webhook payload is also a no-op.
    let replay = app
        .payments
        .confirm(&init.payment_reference, ConfirmOrigin::Webhook)
        .await
        .unwrap();
    assert_eq!(replay.payment_status, PaymentStatus::Successful);
    assert_eq!(app.notifier.dispatched.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn failed_verification_leaves_booking_pending_for_retry() {
    let app = app();
    let event_id = seed_event(&app, 5, 2_000).await;

    let created = app
        .bookings
        .start_booking(event_id, Uuid::new_v4(), 1)
        .await
        .unwrap();
    let init = app
        .payments
        .initialize_payment(created.booking_id, "https://example.test/cb")
        .await
        .unwrap();

    app.gateway.set_behavior(MockBehavior::AlwaysFailed).await;
    let outcome = app
        .payments
        .confirm(&init.payment_reference, ConfirmOrigin::Poll)
        .await
        .unwrap();
    assert_eq!(outcome.payment_status, PaymentStatus::Failed);
    assert_eq!(outcome.booking_status, BookingStatus::Pending);
    assert_eq!(app.notifier.dispatched.load(Ordering::SeqCst), 0);

    // The failed attempt is terminal, so a retry mints a fresh intent.
    app.gateway.set_behavior(MockBehavior::AlwaysSuccessful).await;
    let retry = app
        .payments
        .initialize_payment(created.booking_id, "https://example.test/cb")
        .await
        .unwrap();
    assert_ne!(retry.payment_reference, init.payment_reference);

    let outcome = app
        .payments
        .confirm(&retry.payment_reference, ConfirmOrigin::Poll)
        .await
        .unwrap();
    assert_eq!(outcome.booking_status, BookingStatus::Confirmed);
}

#[tokio::test]
async fn open_payment_intent_is_reused_within_window() {
    let app = app();
    let event_id = seed_event(&app, 5, 2_000).await;

    let created = app
        .bookings
        .start_booking(event_id, Uuid::new_v4(), 1)
        .await
        .unwrap();

    let first = app
        .payments
        .initialize_payment(created.booking_id, "https://example.test/cb")
        .await
        .unwrap();
    let second = app
        .payments
        .initialize_payment(created.booking_id, "https://example.test/cb")
        .await
        .unwrap();

    assert_eq!(first.payment_reference, second.payment_reference);
    assert_eq!(first.authorization_url, second.authorization_url);
    assert_eq!(app.gateway.initialize_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn gateway_timeout_fails_closed() {
    let app = app();
    let event_id = seed_event(&app, 5, 2_000).await;

    let created = app
        .bookings
        .start_booking(event_id, Uuid::new_v4(), 1)
        .await
        .unwrap();

    app.gateway.set_behavior(MockBehavior::AlwaysTimeout).await;
    let init = app
        .payments
        .initialize_payment(created.booking_id, "https://example.test/cb")
        .await;
    assert!(matches!(init, Err(BookingError::Gateway(_))));
    assert!(app
        .store
        .latest_open_payment(created.booking_id)
        .await
        .unwrap()
        .is_none());

    // Retry after the outage succeeds against the same still-held booking.
    app.gateway.set_behavior(MockBehavior::AlwaysSuccessful).await;
    let init = app
        .payments
        .initialize_payment(created.booking_id, "https://example.test/cb")
        .await
        .unwrap();

    app.gateway.set_behavior(MockBehavior::AlwaysTimeout).await;
    let confirm = app
        .payments
        .confirm(&init.payment_reference, ConfirmOrigin::Poll)
        .await;
    assert!(matches!(confirm, Err(BookingError::Gateway(_))));
    let payment = app
        .store
        .get_payment_by_reference(&init.payment_reference)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(payment.status, PaymentStatus::Pending);
}

#[tokio::test]
async fn amount_mismatch_is_never_confirmed() {
    let app = app();
    let event_id = seed_event(&app, 5, 2_000).await;

    let created = app
        .bookings
        .start_booking(event_id, Uuid::new_v4(), 1)
        .await
        .unwrap();
    let init = app
        .payments
        .initialize_payment(created.booking_id, "https://example.test/cb")
        .await
        .unwrap();

    // Gateway reports success for a different amount than the intent.
    app.gateway.script_amount(&init.payment_reference, 1).await;
    let outcome = app
        .payments
        .confirm(&init.payment_reference, ConfirmOrigin::Webhook)
        .await
        .unwrap();
    assert_eq!(outcome.payment_status, PaymentStatus::Failed);
    assert_eq!(outcome.booking_status, BookingStatus::Pending);
    assert_eq!(app.notifier.dispatched.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn still_pending_at_gateway_changes_nothing() {
    let app = app();
    let event_id = seed_event(&app, 5, 2_000).await;

    let created = app
        .bookings
        .start_booking(event_id, Uuid::new_v4(), 1)
        .await
        .unwrap();
    let init = app
        .payments
        .initialize_payment(created.booking_id, "https://example.test/cb")
        .await
        .unwrap();

    app.gateway.set_behavior(MockBehavior::StillPending).await;
    let outcome = app
        .payments
        .confirm(&init.payment_reference, ConfirmOrigin::Poll)
        .await
        .unwrap();
    assert_eq!(outcome.payment_status, PaymentStatus::Pending);
    assert_eq!(outcome.booking_status, BookingStatus::Pending);
}

#[tokio::test]
async fn unknown_reference_is_not_found() {
    let app = app();
    let missing = app.payments.confirm("PY-missing", ConfirmOrigin::Poll).await;
    assert!(matches!(missing, Err(BookingError::NotFound(_))));
}

#[tokio::test]
async fn lapsed_hold_expires_and_rejects_payment() {
    let app = app_with_hold_minutes(-1);
    let event_id = seed_event(&app, 5, 2_000).await;

    let created = app
        .bookings
        .start_booking(event_id, Uuid::new_v4(), 2)
        .await
        .unwrap();
    assert_eq!(available(&app, event_id).await, 3);

    let init = app
        .payments
        .initialize_payment(created.booking_id, "https://example.test/cb")
        .await;
    assert!(matches!(init, Err(BookingError::InvalidStateTransition(_))));

    let booking = app.store.get_booking(created.booking_id).await.unwrap().unwrap();
    assert_eq!(booking.status, BookingStatus::Expired);
    assert_eq!(available(&app, event_id).await, 5);
}

#[tokio::test]
async fn expiry_sweep_releases_stale_holds() {
    let app = app_with_hold_minutes(-1);
    let event_id = seed_event(&app, 5, 2_000).await;

    app.bookings
        .start_booking(event_id, Uuid::new_v4(), 2)
        .await
        .unwrap();
    app.bookings
        .start_booking(event_id, Uuid::new_v4(), 1)
        .await
        .unwrap();
    assert_eq!(available(&app, event_id).await, 2);

    let expired = app.bookings.expire_due(100).await.unwrap();
    assert_eq!(expired, 2);
    assert_eq!(available(&app, event_id).await, 5);

    // Sweeping again finds nothing to do.
    assert_eq!(app.bookings.expire_due(100).await.unwrap(), 0);
}

#[tokio::test]
async fn quantity_bounds_are_enforced_before_touching_state() {
    let app = app();
    let event_id = seed_event(&app, 5, 2_000).await;

    for qty in [0, -3, 11] {
        let refused = app.bookings.start_booking(event_id, Uuid::new_v4(), qty).await;
        assert!(matches!(refused, Err(BookingError::Validation(_))));
    }
    assert_eq!(available(&app, event_id).await, 5);

    let missing = app
        .bookings
        .start_booking(Uuid::new_v4(), Uuid::new_v4(), 1)
        .await;
    assert!(matches!(missing, Err(BookingError::NotFound(_))));
}

#[tokio::test]
async fn availability_reads_never_lag_behind_mutations() {
    let app = app();
    let event_id = seed_event(&app, 5, 2_000).await;

    // Prime the cache, then mutate.
    let before = app.bookings.get_event_availability(event_id).await.unwrap();
    assert_eq!(before.available, 5);

    let created = app
        .bookings
        .start_booking(event_id, Uuid::new_v4(), 2)
        .await
        .unwrap();
    let after = app.bookings.get_event_availability(event_id).await.unwrap();
    assert_eq!(after.available, 3);

    // Same discipline for booking reads across a status change.
    let pending = app
        .bookings
        .get_booking_by_reference(&created.reference)
        .await
        .unwrap();
    assert_eq!(pending.status, BookingStatus::Pending);

    app.bookings
        .cancel_booking(created.booking_id, Uuid::new_v4(), "test")
        .await
        .unwrap();
    let cancelled = app
        .bookings
        .get_booking_by_reference(&created.reference)
        .await
        .unwrap();
    assert_eq!(cancelled.status, BookingStatus::Cancelled);
    assert_eq!(
        app.bookings.get_event_availability(event_id).await.unwrap().available,
        5
    );
}
