use booking_engine::domain::event::{Event, EventStatus};
use booking_engine::store::memory::MemoryStore;
use booking_engine::store::{BookingStore, ReserveOutcome};
use uuid::Uuid;

fn event(capacity: i32) -> Event {
    Event {
        id: Uuid::new_v4(),
        name: "load test night".to_string(),
        capacity,
        available: capacity,
        price_minor: 5_000,
        status: EventStatus::Published,
    }
}

#[tokio::test]
async fn reserve_decrements_and_rejects_oversell() {
    let store = MemoryStore::new();
    let ev = event(5);
    store.insert_event(&ev).await.unwrap();

    match store.reserve_inventory(ev.id, 3).await.unwrap() {
        ReserveOutcome::Reserved(updated) => assert_eq!(updated.available, 2),
        other => panic!("expected reservation, got {other:?}"),
    }

    match store.reserve_inventory(ev.id, 3).await.unwrap() {
        ReserveOutcome::Insufficient(current) => assert_eq!(current.available, 2),
        other => panic!("expected insufficient, got {other:?}"),
    }

    let current = store.get_event(ev.id).await.unwrap().unwrap();
    assert_eq!(current.available, 2);
}

#[tokio::test]
async fn reserve_unknown_event_reports_not_found() {
    let store = MemoryStore::new();
    assert!(matches!(
        store.reserve_inventory(Uuid::new_v4(), 1).await.unwrap(),
        ReserveOutcome::NotFound
    ));
}

#[tokio::test]
async fn release_saturates_at_capacity() {
    let store = MemoryStore::new();
    let ev = event(4);
    store.insert_event(&ev).await.unwrap();

    store.reserve_inventory(ev.id, 2).await.unwrap();
    store.release_inventory(ev.id, 2).await.unwrap();
    // A duplicate release from an upstream retry must not push the
    // counter past capacity.
    store.release_inventory(ev.id, 2).await.unwrap();

    let current = store.get_event(ev.id).await.unwrap().unwrap();
    assert_eq!(current.available, current.capacity);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_reservations_never_oversell() {
    let store = MemoryStore::new();
    let ev = event(10);
    store.insert_event(&ev).await.unwrap();

    let mut handles = Vec::new();
    for _ in 0..8 {
        let store = store.clone();
        let event_id = ev.id;
        handles.push(tokio::spawn(async move {
            store.reserve_inventory(event_id, 3).await.unwrap()
        }));
    }

    let mut reserved = 0;
    let mut rejected = 0;
    for handle in handles {
        match handle.await.unwrap() {
            ReserveOutcome::Reserved(_) => reserved += 1,
            ReserveOutcome::Insufficient(_) => rejected += 1,
            ReserveOutcome::NotFound => panic!("event exists"),
        }
    }

    // 10 seats, 3 per request: exactly three reservations fit.
    assert_eq!(reserved, 3);
    assert_eq!(rejected, 5);

    let current = store.get_event(ev.id).await.unwrap().unwrap();
    assert_eq!(current.available, 1);
    assert!(current.available >= 0 && current.available <= current.capacity);
}
