use std::sync::Arc;

use pretty_assertions::assert_eq;

use super::*;

struct FixedCheck {
    name: &'static str,
    level: HealthLevel,
    status: HealthStatus,
}

#[async_trait]
impl HealthCheck for FixedCheck {
    fn name(&self) -> &str {
        self.name
    }

    fn level(&self) -> HealthLevel {
        self.level
    }

    async fn run(&self) -> LevelReport {
        LevelReport::healthy(self.name, self.level).with_status(self.status)
    }
}

fn check(name: &'static str, level: HealthLevel, status: HealthStatus) -> Arc<dyn HealthCheck> {
    Arc::new(FixedCheck {
        name,
        level,
        status,
    })
}

#[tokio::test]
async fn test_aggregate_is_worst_status() {
    let mut registry = HealthRegistry::new();
    registry.register(check("ports", HealthLevel::Connectivity, HealthStatus::Healthy));
    registry.register(check("latency", HealthLevel::Performance, HealthStatus::Degraded));
    registry.register(check("spool", HealthLevel::DataIntegrity, HealthStatus::Healthy));

    let overall = registry.assess().await;
    assert_eq!(overall.status, HealthStatus::Degraded);
}

#[tokio::test]
async fn test_unhealthy_dominates() {
    let mut registry = HealthRegistry::new();
    registry.register(check("a", HealthLevel::Connectivity, HealthStatus::Degraded));
    registry.register(check("b", HealthLevel::Service, HealthStatus::Unhealthy));

    let overall = registry.assess().await;
    assert_eq!(overall.status, HealthStatus::Unhealthy);
}

#[tokio::test]
async fn test_empty_registry_is_healthy() {
    let registry = HealthRegistry::new();
    let overall = registry.assess().await;
    assert_eq!(overall.status, HealthStatus::Healthy);
    assert!(overall.reports.is_empty());
}

#[tokio::test]
async fn test_reports_ordered_by_level() {
    let mut registry = HealthRegistry::new();
    registry.register(check("deep", HealthLevel::DataIntegrity, HealthStatus::Healthy));
    registry.register(check("shallow", HealthLevel::Connectivity, HealthStatus::Healthy));

    let overall = registry.assess().await;
    assert_eq!(overall.reports[0].name, "shallow");
    assert_eq!(overall.reports[1].name, "deep");
}

#[test]
fn test_level_tags() {
    assert_eq!(HealthLevel::Connectivity.tag(), "L1");
    assert_eq!(HealthLevel::DataIntegrity.tag(), "L5");
}
