// Unit tests for the status publisher

use crate::dispatch::OwnerId;
use crate::status::{ConnectionStatus, StatusPublisher};

use std::sync::{Arc, Mutex};

#[test]
fn given_new_publisher_when_read_then_disconnected() {
    let publisher = StatusPublisher::new();

    assert_eq!(publisher.current(), ConnectionStatus::Disconnected);
    assert_eq!(*publisher.watch().borrow(), ConnectionStatus::Disconnected);
}

/// **VALUE**: Observers see every transition, synchronously and in order, and
/// repeated publishes of the same value are not reported.
///
/// **WHY THIS MATTERS**: The UI shows a connectivity badge driven only by these
/// callbacks. Missing a transition leaves it stuck on the wrong state.
///
/// **BUG THIS CATCHES**: Would catch notifications being buffered or coalesced,
/// or duplicates flooding observers on every reconnect tick.
#[test]
fn given_observer_when_cycle_published_then_sees_each_transition_once() {
    // GIVEN: One observer
    let publisher = StatusPublisher::new();
    let seen = Arc::new(Mutex::new(Vec::new()));
    let seen_clone = Arc::clone(&seen);
    publisher.subscribe(OwnerId::new(), move |status| {
        seen_clone.lock().unwrap().push(status)
    });

    // WHEN: Publishing a full cycle with a duplicate in the middle
    assert!(publisher.publish(ConnectionStatus::Connecting));
    assert!(publisher.publish(ConnectionStatus::Connected));
    assert!(!publisher.publish(ConnectionStatus::Connected));
    assert!(publisher.publish(ConnectionStatus::Disconnected));

    // THEN: Three notifications, in order, before publish returned
    assert_eq!(
        *seen.lock().unwrap(),
        vec![
            ConnectionStatus::Connecting,
            ConnectionStatus::Connected,
            ConnectionStatus::Disconnected
        ]
    );
    assert_eq!(publisher.current(), ConnectionStatus::Disconnected);
}

#[test]
fn given_removed_observer_when_published_then_not_called() {
    let publisher = StatusPublisher::new();
    let owner = OwnerId::new();
    let calls = Arc::new(Mutex::new(0));
    let calls_clone = Arc::clone(&calls);
    publisher.subscribe(owner, move |_| *calls_clone.lock().unwrap() += 1);

    assert_eq!(publisher.unsubscribe(owner), 1);
    publisher.publish(ConnectionStatus::Connecting);

    assert_eq!(*calls.lock().unwrap(), 0);
}

#[test]
fn given_panicking_observer_when_published_then_others_still_notified() {
    let publisher = StatusPublisher::new();
    let seen = Arc::new(Mutex::new(Vec::new()));
    publisher.subscribe(OwnerId::new(), |_| panic!("observer bug"));
    let seen_clone = Arc::clone(&seen);
    publisher.subscribe(OwnerId::new(), move |status| {
        seen_clone.lock().unwrap().push(status)
    });

    publisher.publish(ConnectionStatus::Connecting);

    assert_eq!(*seen.lock().unwrap(), vec![ConnectionStatus::Connecting]);
    assert_eq!(publisher.current(), ConnectionStatus::Connecting);
}

#[tokio::test]
async fn given_watch_receiver_when_published_then_wakes_with_latest() {
    let publisher = StatusPublisher::new();
    let mut rx = publisher.watch();

    publisher.publish(ConnectionStatus::Connecting);
    rx.changed().await.unwrap();

    assert_eq!(*rx.borrow_and_update(), ConnectionStatus::Connecting);
}
