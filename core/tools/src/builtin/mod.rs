//! Built-in tools, one operation each.

mod bridge_control;
mod get_task_status;
mod list_event_types;
mod responses;
mod send_approval_request;
mod send_event;
mod send_message;
mod send_performance_alert;
mod send_task_completion;
mod todo;

pub use bridge_control::CheckBridgeProcessTool;
pub use bridge_control::EnsureBridgeRunningTool;
pub use bridge_control::GetBridgeStatusTool;
pub use bridge_control::RestartBridgeTool;
pub use bridge_control::StartBridgeTool;
pub use bridge_control::StopBridgeTool;
pub use get_task_status::GetTaskStatusTool;
pub use list_event_types::ListEventTypesTool;
pub use responses::ClearOldResponsesTool;
pub use responses::GetResponsesTool;
pub use responses::ProcessPendingResponsesTool;
pub use send_approval_request::SendApprovalRequestTool;
pub use send_event::SendEventTool;
pub use send_message::SendMessageTool;
pub use send_performance_alert::SendPerformanceAlertTool;
pub use send_task_completion::SendTaskCompletionTool;
pub use todo::TodoTool;
