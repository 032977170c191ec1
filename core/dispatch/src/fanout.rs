//! Fan-out of notifications to subscribed orchestrator sessions.
//!
//! Subscribers get a bounded buffer; a slow subscriber that overflows its
//! buffer loses the oldest notifications and receives an explicit
//! [`Notice::ConsumerLagged`] instead of silently missing them.
//! Per-subscriber ordering is preserved; there is no cross-subscriber
//! ordering guarantee.

use chrono::DateTime;
use chrono::Utc;
use coderelay_protocol::Response;
use serde::Serialize;
use tokio::sync::broadcast;

/// A notification delivered to subscribers.
#[derive(Debug, Clone, Serialize)]
pub struct SessionNotification {
    /// What happened.
    pub kind: NotificationKind,
    /// Response payload, for response notifications.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response: Option<Response>,
    /// Event id, for event lifecycle notifications.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub event_id: Option<String>,
    /// Correlation id of the originating request, when known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub correlation_id: Option<String>,
    /// When the notification was produced.
    pub timestamp: DateTime<Utc>,
}

/// Notification kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    /// A human response arrived via the webhook.
    ResponseReceived,
    /// An event was accepted into the spool.
    EventAccepted,
    /// The memory monitor requested cleanup.
    CleanupRequested,
}

/// What a subscriber pulls from its queue.
#[derive(Debug, Clone)]
pub enum Notice {
    /// The next notification, in order.
    Notification(SessionNotification),
    /// The subscriber lagged; `skipped` notifications were dropped.
    ConsumerLagged { skipped: u64 },
}

/// One subscriber's receiving half.
pub struct Subscriber {
    rx: broadcast::Receiver<SessionNotification>,
}

impl Subscriber {
    /// Wait for the next notice.
    ///
    /// Returns `None` once the fan-out is dropped and the queue is empty.
    pub async fn recv(&mut self) -> Option<Notice> {
        match self.rx.recv().await {
            Ok(n) => Some(Notice::Notification(n)),
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                Some(Notice::ConsumerLagged { skipped })
            }
            Err(broadcast::error::RecvError::Closed) => None,
        }
    }

    /// Drain everything currently queued without waiting.
    pub fn drain(&mut self) -> Vec<Notice> {
        let mut out = Vec::new();
        loop {
            match self.rx.try_recv() {
                Ok(n) => out.push(Notice::Notification(n)),
                Err(broadcast::error::TryRecvError::Lagged(skipped)) => {
                    out.push(Notice::ConsumerLagged { skipped });
                }
                Err(_) => break,
            }
        }
        out
    }
}

/// The fan-out hub.
pub struct SessionFanout {
    tx: broadcast::Sender<SessionNotification>,
}

impl SessionFanout {
    /// Create a hub with the given per-subscriber buffer size.
    pub fn new(buffer: usize) -> Self {
        let (tx, _) = broadcast::channel(buffer.max(1));
        Self { tx }
    }

    /// Register a new subscriber.
    pub fn subscribe(&self) -> Subscriber {
        Subscriber {
            rx: self.tx.subscribe(),
        }
    }

    /// Number of live subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    /// Deliver a notification to every subscriber; non-blocking.
    pub fn notify(&self, notification: SessionNotification) {
        // Err means no live subscribers; that is fine.
        let _ = self.tx.send(notification);
    }

    /// Convenience constructor for a response notification.
    pub fn response_notification(response: Response) -> SessionNotification {
        SessionNotification {
            correlation_id: response.correlation_id.clone(),
            kind: NotificationKind::ResponseReceived,
            response: Some(response),
            event_id: None,
            timestamp: Utc::now(),
        }
    }
}

#[cfg(test)]
#[path = "fanout.test.rs"]
mod tests;
