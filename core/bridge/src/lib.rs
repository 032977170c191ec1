//! coderelay-bridge - Supervisor for the external chat worker process.

mod error;
mod supervisor;

pub use error::BridgeError;
pub use error::Result;
pub use supervisor::BridgeStatus;
pub use supervisor::BridgeSupervisor;
pub use supervisor::WorkerState;
