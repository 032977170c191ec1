//! coderelay-webhook - Inbound approval callbacks over HTTP.

mod payload;
mod rate;
mod server;

pub use payload::CallbackPayload;
pub use payload::CallbackReply;
pub use payload::ErrorReply;
pub use payload::HealthReply;
pub use rate::SourceRateLimiter;
pub use server::API_KEY_HEADER;
pub use server::ChatAcknowledger;
pub use server::DispatchAcknowledger;
pub use server::WebhookState;
pub use server::router;
pub use server::serve;
