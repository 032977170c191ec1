//! coderelay-memwatch - Area-scoped memory monitoring and alerts.

mod dumps;
mod monitor;

pub use dumps::HeapDumpWriter;
pub use monitor::AlertKind;
pub use monitor::CleanupRequest;
pub use monitor::CountProbe;
pub use monitor::MemoryAlert;
pub use monitor::MemoryArea;
pub use monitor::MemoryMonitor;
pub use monitor::MemoryReading;
pub use monitor::MemorySnapshot;
pub use monitor::MemorySource;
pub use monitor::ProcessMemorySource;
