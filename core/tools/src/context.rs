//! Shared context handed to every tool execution.

use std::sync::Arc;
use std::sync::Mutex;

use chrono::DateTime;
use chrono::Utc;
use coderelay_bridge::BridgeSupervisor;
use coderelay_bridge::WorkerState;
use coderelay_dispatch::DispatchPipeline;
use coderelay_error::ErrorContext;
use coderelay_error::ErrorRecord;
use coderelay_error::StatusCode;
use coderelay_resilience::CircuitState;
use coderelay_resilience::classify::Classifier;
use coderelay_resilience::recovery::ExecutionStatus;
use coderelay_resilience::recovery::RecoveryOrchestrator;
use serde::Serialize;

use crate::tool::ToolFailure;

/// One todo entry tracked for the orchestrator session.
#[derive(Debug, Clone, Serialize)]
pub struct TodoItem {
    /// Entry id.
    pub id: String,
    /// The task text.
    pub text: String,
    /// Whether it is done.
    pub done: bool,
    /// Creation time.
    pub created_at: DateTime<Utc>,
}

/// Context shared by all tools.
pub struct ToolContext {
    /// Event intake and response queries.
    pub dispatch: Arc<DispatchPipeline>,
    /// Worker lifecycle control.
    pub supervisor: Arc<BridgeSupervisor>,
    /// Classifier fed by worker failures seen at the tool boundary.
    pub classifier: Arc<Classifier>,
    /// Recovery executor driven when a send finds the worker down.
    pub orchestrator: Arc<RecoveryOrchestrator>,
    /// Session todo list.
    todos: Mutex<Vec<TodoItem>>,
}

impl ToolContext {
    /// Assemble a context.
    pub fn new(
        dispatch: Arc<DispatchPipeline>,
        supervisor: Arc<BridgeSupervisor>,
        classifier: Arc<Classifier>,
        orchestrator: Arc<RecoveryOrchestrator>,
    ) -> Arc<Self> {
        Arc::new(Self {
            dispatch,
            supervisor,
            classifier,
            orchestrator,
            todos: Mutex::new(Vec::new()),
        })
    }

    /// Gate for chat-bound sends: make sure the worker can consume what
    /// is about to be spooled.
    ///
    /// A stopped worker is fine (events queue until it is started); a
    /// crashed or unhealthy one drives the recovery plan right here, so
    /// the caller sees the terminal outcome. When recovery does not
    /// restore the worker, the call fails with `BRIDGE_NOT_RUNNING`.
    pub async fn ensure_worker_available(&self, operation: &str) -> Result<(), ToolFailure> {
        let state = self.supervisor.status().state;
        if !matches!(state, WorkerState::Failed | WorkerState::Unhealthy) {
            return Ok(());
        }

        // A tripped bridge circuit means recovery already gave up; fail
        // fast instead of queueing another execution.
        if self.supervisor.circuit().state() == CircuitState::Open {
            return Err(ToolFailure::new(
                StatusCode::BridgeNotRunning,
                "bridge worker is down and its circuit is open",
            )
            .with_metadata("circuit", serde_json::json!("open")));
        }

        let mut record = ErrorRecord::new(
            StatusCode::BridgeNotRunning,
            format!("worker is {} during {operation}", state.as_str()),
            ErrorContext::new(operation, "bridge"),
        );
        let verdict = self.classifier.classify(&record);
        tracing::warn!(
            operation,
            severity = %verdict.severity,
            "worker down at send, running recovery"
        );

        let report = self.orchestrator.execute(&mut record).await;
        if report.status == ExecutionStatus::Completed {
            tracing::info!(operation, "worker recovered, send continues");
            return Ok(());
        }

        Err(ToolFailure::new(
            StatusCode::BridgeNotRunning,
            "bridge worker is not running and recovery did not restore it",
        )
        .with_metadata(
            "recovery_status",
            serde_json::to_value(report.status).unwrap_or_default(),
        )
        .with_metadata("plan", serde_json::json!(report.plan_id)))
    }

    /// Add a todo entry, returning it.
    pub fn add_todo(&self, text: impl Into<String>) -> TodoItem {
        let item = TodoItem {
            id: uuid::Uuid::new_v4().to_string(),
            text: text.into(),
            done: false,
            created_at: Utc::now(),
        };
        self.lock_todos().push(item.clone());
        item
    }

    /// All todo entries.
    pub fn list_todos(&self) -> Vec<TodoItem> {
        self.lock_todos().clone()
    }

    /// Mark a todo entry done; false when the id is unknown.
    pub fn complete_todo(&self, id: &str) -> bool {
        let mut todos = self.lock_todos();
        match todos.iter_mut().find(|t| t.id == id) {
            Some(item) => {
                item.done = true;
                true
            }
            None => false,
        }
    }

    fn lock_todos(&self) -> std::sync::MutexGuard<'_, Vec<TodoItem>> {
        self.todos.lock().unwrap_or_else(|e| e.into_inner())
    }
}
