//! The dispatch pipeline: validate, fill, rate-limit, spool, notify.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;
use std::time::Duration;

use snafu::IntoError;

use chrono::DateTime;
use chrono::Utc;
use coderelay_config::LimitsConfig;
use coderelay_config::RateLimitConfig;
use coderelay_error::Severity;
use coderelay_protocol::Event;
use coderelay_protocol::EventData;
use coderelay_protocol::EventType;
use coderelay_protocol::Response;
use coderelay_spool::SpoolSet;

use crate::error::DispatchError;
use crate::error::Result;
use crate::error::dispatch_error;
use crate::fanout::NotificationKind;
use crate::fanout::SessionFanout;
use crate::fanout::SessionNotification;
use crate::rate::RateLimiter;

/// Accepted-event receipt returned to the tool layer.
#[derive(Debug, Clone, serde::Serialize)]
pub struct DispatchReceipt {
    /// Assigned event id.
    pub event_id: String,
    /// Always true for a returned receipt; failures are errors.
    pub accepted: bool,
}

/// The dispatch pipeline.
///
/// Owns events exclusively from intake until the spool append returns;
/// after that the spool owns the bytes and the worker consumes them.
pub struct DispatchPipeline {
    spool: Arc<SpoolSet>,
    limits: LimitsConfig,
    rate: RateLimiter,
    queue_high_water: usize,
    fanout: SessionFanout,
    /// Per-source high-water timestamp, for the monotonicity invariant.
    last_timestamps: Mutex<HashMap<String, DateTime<Utc>>>,
    /// When set, low-priority events are refused (graceful degradation).
    paused_low_priority: AtomicBool,
    /// When set, all intake is refused (shutdown).
    closed: AtomicBool,
}

impl DispatchPipeline {
    /// Create a pipeline over a spool.
    pub fn new(
        spool: Arc<SpoolSet>,
        limits: LimitsConfig,
        rate_config: &RateLimitConfig,
        fanout_buffer: usize,
    ) -> Self {
        Self {
            spool,
            limits,
            rate: RateLimiter::new(rate_config),
            queue_high_water: rate_config.queue_high_water,
            fanout: SessionFanout::new(fanout_buffer),
            last_timestamps: Mutex::new(HashMap::new()),
            paused_low_priority: AtomicBool::new(false),
            closed: AtomicBool::new(false),
        }
    }

    /// The fan-out hub for session subscriptions.
    pub fn fanout(&self) -> &SessionFanout {
        &self.fanout
    }

    /// The underlying spool set.
    pub fn spool(&self) -> &Arc<SpoolSet> {
        &self.spool
    }

    /// Validate and accept one event.
    pub fn send_event(&self, mut event: Event) -> Result<DispatchReceipt> {
        if self.closed.load(Ordering::SeqCst) {
            return dispatch_error::ShuttingDownSnafu.fail();
        }

        self.validate_event(&event)?;

        if self.paused_low_priority.load(Ordering::SeqCst) && is_low_priority(&event) {
            return dispatch_error::ValidationSnafu {
                message: "low-priority events are paused".to_string(),
            }
            .fail();
        }

        // Fill defaults and clamp the per-source timestamp forward.
        if event.id.is_empty() {
            event.id = uuid::Uuid::new_v4().to_string();
        }
        if event.task_id.is_empty() {
            event.task_id = uuid::Uuid::new_v4().to_string();
        }
        self.clamp_timestamp(&mut event);

        // An empty bucket only matters once the backlog is deep.
        if !self.rate.try_acquire(&event.source) {
            let queued = self.spool.events().len().map_err(into_spool_err)?;
            if queued >= self.queue_high_water {
                return dispatch_error::BackpressureSnafu {
                    target: event.source.clone(),
                    queued,
                }
                .fail();
            }
        }

        let event_id = self
            .spool
            .events()
            .append(&event)
            .map_err(into_spool_err)?;

        tracing::info!(
            event_id = %event_id,
            event_type = %event.event_type,
            source = %event.source,
            "event accepted"
        );
        self.fanout.notify(SessionNotification {
            kind: NotificationKind::EventAccepted,
            response: None,
            event_id: Some(event_id.clone()),
            correlation_id: None,
            timestamp: Utc::now(),
        });

        Ok(DispatchReceipt {
            event_id,
            accepted: true,
        })
    }

    /// Free-form informational message.
    pub fn send_message(&self, text: impl Into<String>, source: impl Into<String>) -> Result<DispatchReceipt> {
        let text = text.into();
        let title = text.chars().take(60).collect::<String>();
        self.send_event(Event::new(
            EventType::InfoNotification,
            source,
            title,
            text,
        ))
    }

    /// Task-completion helper.
    pub fn send_task_completion(
        &self,
        task_id: impl Into<String>,
        title: impl Into<String>,
        results: Option<String>,
        duration_ms: Option<i64>,
    ) -> Result<DispatchReceipt> {
        let mut event = Event::new(
            EventType::TaskCompletion,
            "claude-code",
            title,
            results.clone().unwrap_or_default(),
        )
        .with_task_id(task_id);
        event.data = EventData {
            status: Some("completed".to_string()),
            results,
            duration_ms,
            ..Default::default()
        };
        self.send_event(event)
    }

    /// Performance-alert helper.
    pub fn send_performance_alert(
        &self,
        title: impl Into<String>,
        current_value: f64,
        threshold: f64,
        severity: Severity,
    ) -> Result<DispatchReceipt> {
        let title = title.into();
        let mut event = Event::new(
            EventType::PerformanceAlert,
            "performance-monitor",
            title.clone(),
            format!("{title}: {current_value} over threshold {threshold}"),
        );
        event.data = EventData {
            severity: Some(severity),
            current_value: Some(current_value),
            threshold: Some(threshold),
            ..Default::default()
        };
        self.send_event(event)
    }

    /// Approval-request helper.
    pub fn send_approval_request(
        &self,
        title: impl Into<String>,
        description: impl Into<String>,
        options: Vec<String>,
        timeout_minutes: Option<i64>,
        task_id: Option<String>,
    ) -> Result<DispatchReceipt> {
        let mut event = Event::new(EventType::ApprovalRequest, "claude-code", title, description);
        if let Some(task_id) = task_id {
            event = event.with_task_id(task_id);
        }
        let options = if options.is_empty() {
            vec!["Approve".to_string(), "Deny".to_string()]
        } else {
            options
        };
        event.data = EventData {
            response_options: Some(options),
            timeout_minutes,
            ..Default::default()
        };
        self.send_event(event)
    }

    /// Most recent responses, newest first, up to `limit`.
    pub fn get_responses(&self, limit: usize) -> Result<Vec<Response>> {
        let mut responses: Vec<Response> = self
            .spool
            .responses()
            .iterate(None)
            .map_err(into_spool_err)?
            .into_iter()
            .map(|r| r.record)
            .collect();
        responses.sort_by_key(|r| std::cmp::Reverse(r.timestamp));
        responses.truncate(limit);
        Ok(responses)
    }

    /// Responses received within the last `since` interval, oldest first.
    pub fn process_pending_responses(&self, since: Duration) -> Result<Vec<Response>> {
        let cutoff = Utc::now()
            - chrono::Duration::from_std(since).unwrap_or_else(|_| chrono::Duration::hours(1));
        let mut responses: Vec<Response> = self
            .spool
            .responses()
            .iterate(None)
            .map_err(into_spool_err)?
            .into_iter()
            .map(|r| r.record)
            .filter(|r| r.timestamp >= cutoff)
            .collect();
        responses.sort_by_key(|r| r.timestamp);
        Ok(responses)
    }

    /// Remove stored responses older than `older_than`.
    pub fn clear_old_responses(&self, older_than: Duration) -> Result<usize> {
        self.spool
            .responses()
            .prune(older_than)
            .map_err(into_spool_err)
    }

    /// Record an inbound response and notify subscribers.
    ///
    /// Called by the webhook; the pipeline owns the spool handoff and the
    /// fan-out so ordering is preserved per subscriber.
    pub fn accept_response(&self, response: Response) -> Result<()> {
        self.spool
            .responses()
            .append(&response)
            .map_err(into_spool_err)?;
        self.fanout
            .notify(SessionFanout::response_notification(response));
        Ok(())
    }

    /// Pause or resume low-priority intake (graceful degradation).
    pub fn pause_low_priority(&self, paused: bool) {
        self.paused_low_priority.store(paused, Ordering::SeqCst);
        tracing::info!(paused, "low-priority intake toggled");
    }

    /// Refuse all further intake; used during shutdown.
    pub fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }

    /// Validate an event against the configured bounds without accepting
    /// it.
    ///
    /// Callers that must order validation ahead of other checks (the tool
    /// layer rejects bad input before it consults worker health) use this
    /// directly; `send_event` always re-validates on intake.
    pub fn validate_event(&self, event: &Event) -> Result<()> {
        if event.source.trim().is_empty() {
            return dispatch_error::ValidationSnafu {
                message: "source must not be empty".to_string(),
            }
            .fail();
        }
        if event.title.trim().is_empty() {
            return dispatch_error::ValidationSnafu {
                message: "title must not be empty".to_string(),
            }
            .fail();
        }
        if event.title.chars().count() > self.limits.max_title_chars {
            return dispatch_error::ValidationSnafu {
                message: format!(
                    "title exceeds {} characters",
                    self.limits.max_title_chars
                ),
            }
            .fail();
        }
        if event.description.chars().count() > self.limits.max_description_chars {
            return dispatch_error::ValidationSnafu {
                message: format!(
                    "description exceeds {} characters",
                    self.limits.max_description_chars
                ),
            }
            .fail();
        }

        let size = event.serialized_size();
        if size > self.limits.max_event_bytes {
            return dispatch_error::SizeLimitSnafu {
                size,
                limit: self.limits.max_event_bytes,
            }
            .fail();
        }
        Ok(())
    }

    /// Enforce per-source timestamp monotonicity within this process.
    fn clamp_timestamp(&self, event: &mut Event) {
        let mut last = self
            .last_timestamps
            .lock()
            .unwrap_or_else(|e| e.into_inner());
        match last.get_mut(&event.source) {
            Some(entry) => {
                if event.timestamp <= *entry {
                    event.timestamp = *entry + chrono::Duration::milliseconds(1);
                }
                *entry = event.timestamp;
            }
            None => {
                last.insert(event.source.clone(), event.timestamp);
            }
        }
    }
}

fn into_spool_err(source: coderelay_spool::SpoolError) -> DispatchError {
    dispatch_error::SpoolSnafu.into_error(source)
}

/// Low-priority events are pausable under degradation.
fn is_low_priority(event: &Event) -> bool {
    let info_type = matches!(
        event.event_type,
        EventType::InfoNotification | EventType::ProgressUpdate | EventType::TaskProgress
    );
    let low_severity = event
        .data
        .severity
        .map_or(true, |s| s == Severity::Low);
    info_type && low_severity
}

#[cfg(test)]
#[path = "pipeline.test.rs"]
mod tests;
