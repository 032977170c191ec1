//! coderelay-resilience - Failure handling for every outbound call.
//!
//! Four cooperating pieces:
//! - [`BackoffPolicy`]: jittered exponential delays.
//! - [`CircuitBreaker`] / [`CircuitMap`]: per-operation failure isolation.
//! - [`Resilient`]: the timeout + retry + circuit middleware.
//! - [`classify`] and [`recovery`]: pattern classification and plan-driven
//!   recovery for errors the middleware could not absorb.

mod backoff;
mod circuit;
pub mod classify;
mod middleware;
pub mod recovery;

pub use backoff::BackoffPolicy;
pub use circuit::Admission;
pub use circuit::CircuitBreaker;
pub use circuit::CircuitMap;
pub use circuit::CircuitSnapshot;
pub use circuit::CircuitState;
pub use middleware::NoopObserver;
pub use middleware::OpFailure;
pub use middleware::OutcomeObserver;
pub use middleware::Resilient;
pub use middleware::ResilientOptions;
