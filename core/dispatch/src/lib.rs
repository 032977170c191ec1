//! coderelay-dispatch - Event intake, validation and fan-out.
//!
//! The pipeline owns every event from the tool call until the spool
//! append returns, enforces size and rate limits, and fans notifications
//! out to subscribed sessions over bounded buffers.

mod error;
mod fanout;
mod pipeline;
mod rate;

pub use error::DispatchError;
pub use error::Result;
pub use fanout::Notice;
pub use fanout::NotificationKind;
pub use fanout::SessionFanout;
pub use fanout::SessionNotification;
pub use fanout::Subscriber;
pub use pipeline::DispatchPipeline;
pub use pipeline::DispatchReceipt;
pub use rate::RateLimiter;
