mod common;

use std::sync::Arc;
use std::time::Duration;

use dispatch_console::board::{BoardController, BoardSettings, NewDeliveryDetection};
use dispatch_console::error::AppError;
use dispatch_console::models::delivery::{DeliveryId, DeliveryStatus, DeliveryType};
use dispatch_console::observability::metrics::Metrics;

use common::{FakeBackend, delivery};

const POLL: Duration = Duration::from_secs(3);

fn controller(backend: Arc<FakeBackend>, detection: NewDeliveryDetection) -> Arc<BoardController> {
    let settings = BoardSettings {
        detection,
        ..BoardSettings::default()
    };
    Arc::new(BoardController::new(backend, settings, POLL, 16, Metrics::new()).unwrap())
}

async fn first_load(backend: &FakeBackend) {
    while backend.calls("list_deliveries") == 0 {
        tokio::task::yield_now().await;
    }
}

#[tokio::test(start_paused = true)]
async fn new_delivery_raises_alert_for_five_seconds() {
    let backend = FakeBackend::with_pending(5);
    let board = controller(backend.clone(), NewDeliveryDetection::IdDiff);
    board.mount().await;
    first_load(&backend).await;

    let snapshot = board.snapshot().await;
    assert_eq!(snapshot.counts.pending, 5);
    assert!(!snapshot.new_delivery_alert);

    backend.insert(delivery("d05", DeliveryStatus::Pending));
    tokio::time::sleep(POLL + Duration::from_millis(10)).await;

    let snapshot = board.snapshot().await;
    assert_eq!(snapshot.counts.pending, 6);
    assert!(snapshot.new_delivery_alert);

    tokio::time::sleep(Duration::from_millis(4_900)).await;
    assert!(board.snapshot().await.new_delivery_alert);

    tokio::time::sleep(Duration::from_millis(200)).await;
    assert!(!board.snapshot().await.new_delivery_alert);

    board.unmount().await;
}

#[tokio::test(start_paused = true)]
async fn swap_between_polls_only_alerts_on_id_diff() {
    for (detection, expected) in [
        (NewDeliveryDetection::IdDiff, true),
        (NewDeliveryDetection::NetGrowth, false),
    ] {
        let backend = FakeBackend::with_pending(3);
        let board = controller(backend.clone(), detection);
        board.mount().await;
        first_load(&backend).await;

        backend.deliveries.remove(&DeliveryId::from("d00"));
        backend.insert(delivery("d99", DeliveryStatus::Pending));
        board.refresh().await.unwrap();

        assert_eq!(
            board.snapshot().await.new_delivery_alert,
            expected,
            "{detection}"
        );
        board.unmount().await;
    }
}

#[tokio::test(start_paused = true)]
async fn poller_stops_on_unmount() {
    let backend = FakeBackend::with_pending(1);
    let board = controller(backend.clone(), NewDeliveryDetection::IdDiff);
    board.mount().await;
    first_load(&backend).await;

    tokio::time::sleep(POLL * 2 + Duration::from_millis(10)).await;
    let polled = backend.calls("list_deliveries");
    assert_eq!(polled, 3);

    board.unmount().await;
    tokio::time::sleep(POLL * 3).await;
    assert_eq!(backend.calls("list_deliveries"), polled);
    assert!(!board.is_mounted().await);
}

#[tokio::test(start_paused = true)]
async fn refresh_finishing_after_unmount_is_discarded() {
    let backend = FakeBackend::with_pending(4);
    let board = controller(backend.clone(), NewDeliveryDetection::IdDiff);

    let hold = backend.gate.write().await;
    board.mount().await;

    let stale = tokio::spawn({
        let board = board.clone();
        async move { board.refresh().await }
    });
    tokio::task::yield_now().await;

    board.unmount().await;
    drop(hold);
    stale.await.unwrap().unwrap();

    let snapshot = board.snapshot().await;
    assert_eq!(snapshot.counts.total(), 0);
    assert!(snapshot.items.is_empty());
}

#[tokio::test(start_paused = true)]
async fn notify_is_rejected_while_one_is_in_flight() {
    let mut assigned = delivery("d00", DeliveryStatus::Pending);
    assigned.price = Some(100);
    assigned.delivery_type = Some(DeliveryType::Free);
    assigned.driver_id = Some("drv-1".into());
    let backend = FakeBackend::new();
    backend.insert(assigned);
    let board = controller(backend.clone(), NewDeliveryDetection::IdDiff);
    board.mount().await;
    first_load(&backend).await;

    let hold = backend.gate.write().await;
    let first = tokio::spawn({
        let board = board.clone();
        async move { board.notify_driver(DeliveryId::from("d00")).await }
    });
    tokio::task::yield_now().await;

    let snapshot = board.snapshot().await;
    assert!(!snapshot.items[0].actions.notify_driver);
    assert_eq!(snapshot.pending_writes, 1);

    match board.notify_driver(DeliveryId::from("d00")).await {
        Err(AppError::BusinessRuleViolation(msg)) => assert!(msg.contains("in progress")),
        other => panic!("unexpected: {other:?}"),
    }

    drop(hold);
    first.await.unwrap().unwrap();

    let snapshot = board.snapshot().await;
    assert!(snapshot.items[0].delivery.notified);
    assert!(!snapshot.items[0].actions.notify_driver);
    assert!(board.notify_driver(DeliveryId::from("d00")).await.is_err());
    assert_eq!(backend.calls("notify_driver"), 1);

    board.unmount().await;
}

#[tokio::test(start_paused = true)]
async fn abandoned_notify_still_settles() {
    let mut assigned = delivery("d00", DeliveryStatus::Pending);
    assigned.price = Some(100);
    assigned.delivery_type = Some(DeliveryType::Payable);
    assigned.driver_id = Some("drv-1".into());
    let backend = FakeBackend::new();
    backend.insert(assigned);
    let board = controller(backend.clone(), NewDeliveryDetection::IdDiff);
    board.mount().await;
    first_load(&backend).await;

    let hold = backend.gate.write().await;
    let caller = tokio::spawn({
        let board = board.clone();
        async move { board.notify_driver(DeliveryId::from("d00")).await }
    });
    while board.snapshot().await.pending_writes == 0 {
        tokio::task::yield_now().await;
    }
    caller.abort();
    assert!(caller.await.unwrap_err().is_cancelled());

    drop(hold);
    while backend.calls("notify_driver") == 0 {
        tokio::task::yield_now().await;
    }

    let snapshot = board.snapshot().await;
    assert_eq!(snapshot.pending_writes, 0);
    assert!(snapshot.items[0].delivery.notified);

    match board.notify_driver(DeliveryId::from("d00")).await {
        Err(AppError::BusinessRuleViolation(msg)) => assert!(msg.contains("already notified")),
        other => panic!("unexpected: {other:?}"),
    }
    assert_eq!(backend.calls("notify_driver"), 1);

    board.unmount().await;
}

#[test]
fn zero_poll_interval_or_buffer_is_rejected() {
    let settings = BoardSettings::default();
    let result = BoardController::new(
        FakeBackend::new(),
        settings.clone(),
        Duration::ZERO,
        16,
        Metrics::new(),
    );
    assert!(matches!(result, Err(AppError::Internal(_))));

    let result = BoardController::new(FakeBackend::new(), settings, POLL, 0, Metrics::new());
    assert!(matches!(result, Err(AppError::Internal(_))));
}

#[tokio::test(start_paused = true)]
async fn snapshots_are_broadcast_to_subscribers() {
    let backend = FakeBackend::with_pending(2);
    let board = controller(backend.clone(), NewDeliveryDetection::IdDiff);
    let mut updates = board.subscribe();
    board.mount().await;
    first_load(&backend).await;

    board.set_filter(DeliveryStatus::Successful).await;

    let mut last = None;
    while let Ok(snapshot) = updates.try_recv() {
        last = Some(snapshot);
    }
    let last = last.expect("at least one snapshot");
    assert_eq!(last.filter, DeliveryStatus::Successful);
    assert_eq!(last.counts.pending, 2);

    board.unmount().await;
}
