//! coderelay-health - Multi-level health assessment and the metrics hub.

mod check;
mod checks;
mod metrics;

pub use check::HealthCheck;
pub use check::HealthLevel;
pub use check::HealthRegistry;
pub use check::HealthStatus;
pub use check::LevelReport;
pub use check::OverallHealth;
pub use checks::BaselineCheck;
pub use checks::BoolProbe;
pub use checks::NumProbe;
pub use checks::PortCheck;
pub use checks::ProbeCheck;
pub use checks::SpoolIntegrityCheck;
pub use metrics::Histogram;
pub use metrics::MetricSample;
pub use metrics::MetricsRegistry;
pub use metrics::MetricsSnapshot;
