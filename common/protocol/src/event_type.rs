//! The closed set of event tags plus an extension escape hatch.
//!
//! Tags serialize as their snake_case wire string. Unknown wire strings
//! deserialize into [`EventType::Extension`] and round-trip losslessly, so
//! newer producers never break older consumers.

use serde::Deserialize;
use serde::Deserializer;
use serde::Serialize;
use serde::Serializer;
use strum::EnumIter;
use strum::IntoEnumIterator;

macro_rules! define_event_types {
    ($(
        $(#[$attr:meta])*
        $name:ident => $wire:literal
    ),* $(,)?) => {
        /// Canonical event tags accepted by the dispatch pipeline.
        #[derive(Debug, Clone, PartialEq, Eq, Hash, EnumIter)]
        pub enum EventType {
            $($(#[$attr])* $name,)*
            /// Forward-compatibility escape hatch for unknown tags.
            Extension(String),
        }

        impl EventType {
            /// Wire string for this tag.
            pub fn as_str(&self) -> &str {
                match self {
                    $(Self::$name => $wire,)*
                    Self::Extension(s) => s,
                }
            }

            /// Parse a wire string; unknown strings become `Extension`.
            pub fn parse(s: &str) -> Self {
                match s {
                    $($wire => Self::$name,)*
                    other => Self::Extension(other.to_string()),
                }
            }
        }
    };
}

define_event_types! {
    // Task lifecycle
    /// A task has started.
    TaskStarted => "task_started",
    /// Incremental task progress.
    TaskProgress => "task_progress",
    /// A task finished successfully.
    TaskCompletion => "task_completion",
    /// A task failed.
    TaskFailed => "task_failed",
    /// A task was cancelled before completion.
    TaskCancelled => "task_cancelled",

    // Code operations
    /// Code was generated.
    CodeGeneration => "code_generation",
    /// Code was analyzed.
    CodeAnalysis => "code_analysis",
    /// Code was refactored.
    CodeRefactoring => "code_refactoring",
    /// A code review was produced.
    CodeReview => "code_review",
    /// Code tests were exercised.
    CodeTesting => "code_testing",
    /// Code was deployed.
    CodeDeployment => "code_deployment",

    // Build & test outcomes
    /// A build has started.
    BuildStarted => "build_started",
    /// A build finished successfully.
    BuildCompleted => "build_completed",
    /// A build failed.
    BuildFailed => "build_failed",
    /// A test suite run finished.
    TestSuiteRun => "test_suite_run",
    /// A test run passed.
    TestPassed => "test_passed",
    /// A test run failed.
    TestFailed => "test_failed",
    /// Lint results are available.
    LintCheck => "lint_check",
    /// Type-check results are available.
    TypeCheck => "type_check",

    // File operations
    /// A file was created.
    FileCreated => "file_created",
    /// A file was modified.
    FileModified => "file_modified",
    /// A file was deleted.
    FileDeleted => "file_deleted",

    // Git operations
    /// A commit was created.
    GitCommit => "git_commit",
    /// A push completed.
    GitPush => "git_push",
    /// A merge completed.
    GitMerge => "git_merge",
    /// A branch was created or switched.
    GitBranch => "git_branch",
    /// A pull request was opened.
    PullRequestCreated => "pull_request_created",

    // Interaction
    /// A human approval is requested.
    ApprovalRequest => "approval_request",
    /// A human responded to a request.
    UserResponse => "user_response",
    /// A shell command was executed.
    CommandExecuted => "command_executed",

    // Alerts & monitoring
    /// A performance threshold was crossed.
    PerformanceAlert => "performance_alert",
    /// A security-relevant condition was detected.
    SecurityAlert => "security_alert",
    /// An error occurred in the orchestrator.
    ErrorOccurred => "error_occurred",
    /// Periodic system health report.
    SystemHealth => "system_health",
    /// Resource usage report.
    ResourceUsage => "resource_usage",

    // Sessions & lifecycle
    /// An orchestrator session started.
    SessionStarted => "session_started",
    /// An orchestrator session ended.
    SessionEnded => "session_ended",
    /// The bridge worker changed state.
    BridgeStatusChange => "bridge_status_change",
    /// Configuration was reloaded.
    ConfigChanged => "config_changed",

    // Generic notifications
    /// Informational message.
    InfoNotification => "info_notification",
    /// Attention-requiring message.
    AlertNotification => "alert_notification",
    /// Generic progress update.
    ProgressUpdate => "progress_update",
}

impl EventType {
    /// All closed tags, in declaration order (excludes `Extension`).
    pub fn known() -> Vec<EventType> {
        EventType::iter()
            .filter(|t| !matches!(t, EventType::Extension(_)))
            .collect()
    }

    /// Whether this tag is part of the closed set.
    pub fn is_known(&self) -> bool {
        !matches!(self, EventType::Extension(_))
    }
}

impl std::fmt::Display for EventType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl Serialize for EventType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for EventType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Ok(EventType::parse(&s))
    }
}

#[cfg(test)]
#[path = "event_type.test.rs"]
mod tests;
