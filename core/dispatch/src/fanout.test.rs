#![allow(clippy::unwrap_used)]

use pretty_assertions::assert_eq;

use super::*;

fn notification(event_id: &str) -> SessionNotification {
    SessionNotification {
        kind: NotificationKind::EventAccepted,
        response: None,
        event_id: Some(event_id.to_string()),
        correlation_id: None,
        timestamp: Utc::now(),
    }
}

#[tokio::test]
async fn test_subscriber_receives_in_order() {
    let fanout = SessionFanout::new(16);
    let mut sub = fanout.subscribe();

    for i in 0..5 {
        fanout.notify(notification(&format!("e{i}")));
    }

    for i in 0..5 {
        match sub.recv().await.unwrap() {
            Notice::Notification(n) => {
                assert_eq!(n.event_id.as_deref(), Some(format!("e{i}").as_str()));
            }
            Notice::ConsumerLagged { .. } => panic!("unexpected lag"),
        }
    }
}

#[tokio::test]
async fn test_slow_subscriber_gets_lag_notice() {
    let fanout = SessionFanout::new(2);
    let mut sub = fanout.subscribe();

    // Overflow the two-slot buffer; the oldest notifications drop.
    for i in 0..6 {
        fanout.notify(notification(&format!("e{i}")));
    }

    match sub.recv().await.unwrap() {
        Notice::ConsumerLagged { skipped } => assert_eq!(skipped, 4),
        Notice::Notification(_) => panic!("expected lag notice first"),
    }
    // The newest notifications are still delivered, in order.
    match sub.recv().await.unwrap() {
        Notice::Notification(n) => assert_eq!(n.event_id.as_deref(), Some("e4")),
        Notice::ConsumerLagged { .. } => panic!("unexpected second lag"),
    }
}

#[tokio::test]
async fn test_subscribers_are_independent() {
    let fanout = SessionFanout::new(16);
    let mut fast = fanout.subscribe();
    let mut slow = fanout.subscribe();

    fanout.notify(notification("e0"));

    assert!(matches!(fast.recv().await, Some(Notice::Notification(_))));
    assert!(matches!(slow.recv().await, Some(Notice::Notification(_))));
}

#[tokio::test]
async fn test_notify_without_subscribers_does_not_block() {
    let fanout = SessionFanout::new(4);
    fanout.notify(notification("e0"));
    assert_eq!(fanout.subscriber_count(), 0);
}

#[tokio::test]
async fn test_drain() {
    let fanout = SessionFanout::new(16);
    let mut sub = fanout.subscribe();

    fanout.notify(notification("a"));
    fanout.notify(notification("b"));

    let drained = sub.drain();
    assert_eq!(drained.len(), 2);
}
