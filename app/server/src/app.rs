//! Component wiring and lifecycle.

use std::sync::Arc;
use std::time::Duration;

use coderelay_bridge::BridgeSupervisor;
use coderelay_config::Config;
use coderelay_dispatch::DispatchPipeline;
use coderelay_health::BaselineCheck;
use coderelay_health::HealthRegistry;
use coderelay_health::HealthLevel;
use coderelay_health::HealthStatus;
use coderelay_health::MetricsRegistry;
use coderelay_health::PortCheck;
use coderelay_health::ProbeCheck;
use coderelay_health::SpoolIntegrityCheck;
use coderelay_memwatch::HeapDumpWriter;
use coderelay_memwatch::MemoryArea;
use coderelay_memwatch::MemoryMonitor;
use coderelay_memwatch::ProcessMemorySource;
use coderelay_resilience::BackoffPolicy;
use coderelay_resilience::CircuitMap;
use coderelay_resilience::Resilient;
use coderelay_resilience::ResilientOptions;
use coderelay_resilience::classify::Classifier;
use coderelay_resilience::recovery::HandlerRegistry;
use coderelay_resilience::recovery::RecoveryOrchestrator;
use coderelay_resilience::recovery::default_plans;
use coderelay_spool::SpoolOptions;
use coderelay_spool::SpoolSet;
use coderelay_tools::ToolContext;
use coderelay_tools::ToolRegistry;
use coderelay_webhook::DispatchAcknowledger;
use coderelay_webhook::WebhookState;
use tokio_util::sync::CancellationToken;

/// Everything the binary runs.
pub struct App {
    pub config: Config,
    pub dispatch: Arc<DispatchPipeline>,
    pub supervisor: Arc<BridgeSupervisor>,
    pub orchestrator: Arc<RecoveryOrchestrator>,
    pub classifier: Arc<Classifier>,
    pub middleware: Arc<Resilient>,
    pub metrics: Arc<MetricsRegistry>,
    pub health: Arc<HealthRegistry>,
    pub monitor: Arc<MemoryMonitor>,
    pub tools: ToolRegistry,
    pub webhook_state: Arc<WebhookState>,
    pub shutdown: CancellationToken,
}

impl App {
    /// Build the component graph from a validated config.
    pub fn build(config: Config) -> anyhow::Result<Self> {
        let spool = Arc::new(SpoolSet::open(
            &config.spool.dir,
            SpoolOptions::from(&config.spool),
        )?);

        let dispatch = Arc::new(DispatchPipeline::new(
            spool.clone(),
            config.limits.clone(),
            &config.rate_limit,
            256,
        ));

        let circuits = Arc::new(CircuitMap::new(config.circuit.clone()));
        let supervisor = BridgeSupervisor::new(config.bridge.clone(), circuits.get("bridge"));

        let metrics = Arc::new(MetricsRegistry::new(4096));
        let middleware = Arc::new(
            Resilient::new(
                ResilientOptions {
                    max_attempts: config.retry.max_attempts,
                    attempt_timeout: Duration::from_secs(30),
                },
                BackoffPolicy::from(&config.retry),
                circuits.clone(),
            )
            .with_observer(metrics.clone()),
        );

        let classifier = Arc::new(Classifier::with_defaults());

        // Strategy handlers that touch the environment.
        let restart_supervisor = supervisor.clone();
        let degrade_dispatch = dispatch.clone();
        let fallback_spool = spool.clone();
        let handlers = HandlerRegistry::new(circuits.clone(), config.circuit.cool_down)
            .with_restart(Arc::new(move |_record| {
                let supervisor = restart_supervisor.clone();
                Box::pin(async move {
                    supervisor.restart().await.map_err(|e| e.to_string())
                })
            }))
            .with_degradation(Arc::new(move |_record| {
                let dispatch = degrade_dispatch.clone();
                Box::pin(async move {
                    dispatch.pause_low_priority(true);
                    Ok(())
                })
            }))
            .with_fallback(Arc::new(move |record| {
                // Keep the failing payload on disk so nothing is lost.
                let spool = fallback_spool.clone();
                Box::pin(async move {
                    let event = coderelay_protocol::Event::new(
                        coderelay_protocol::EventType::ErrorOccurred,
                        "recovery",
                        "Operation failed, payload preserved",
                        record.message.clone(),
                    );
                    spool
                        .events()
                        .append(&event)
                        .map(|_| ())
                        .map_err(|e| e.to_string())
                })
            }));

        let orchestrator = Arc::new(RecoveryOrchestrator::new(
            default_plans(),
            handlers,
            BackoffPolicy::from(&config.retry),
            classifier.clone(),
            config.recovery.max_concurrent,
            config.recovery.plan_deadline,
        ));

        // Memory monitor with the spool file-count probe.
        let probe_spool = spool.clone();
        let monitor = Arc::new(
            MemoryMonitor::new(config.memory.clone(), Arc::new(ProcessMemorySource::current()))
                .with_probe(
                    MemoryArea::EventFiles,
                    Arc::new(move || probe_spool.events().len().unwrap_or(0) as u64),
                )
                .with_heap_dumps(HeapDumpWriter::new(config.heap_dumps.clone())),
        );

        // Health checks, shallow to deep.
        let mut health = HealthRegistry::new();
        health.register(Arc::new(PortCheck::new(
            "webhook_port",
            config.webhook.bind.clone(),
        )));
        let service_supervisor = supervisor.clone();
        health.register(Arc::new(ProbeCheck::new(
            "worker_process",
            HealthLevel::Service,
            Arc::new(move || service_supervisor.status().pid.is_some()),
            HealthStatus::Degraded,
        )));
        let heap_monitor = monitor.clone();
        let heap_cap = config.memory.max_heap_mb as f64;
        health.register(Arc::new(BaselineCheck::new(
            "heap_mb",
            Arc::new(move || {
                heap_monitor
                    .snapshot_all()
                    .first()
                    .map(|s| s.heap_bytes as f64 / (1024.0 * 1024.0))
                    .unwrap_or(0.0)
            }),
            heap_cap * 0.8,
            heap_cap,
        )));
        let integration_supervisor = supervisor.clone();
        health.register(Arc::new(ProbeCheck::new(
            "chat_reachable",
            HealthLevel::Integration,
            Arc::new(move || integration_supervisor.status().healthy),
            HealthStatus::Degraded,
        )));
        health.register(Arc::new(SpoolIntegrityCheck::new(
            config.spool.dir.join("events"),
        )));

        let health = Arc::new(health);

        let tool_ctx = ToolContext::new(
            dispatch.clone(),
            supervisor.clone(),
            classifier.clone(),
            orchestrator.clone(),
        );
        let tools = ToolRegistry::with_builtins(tool_ctx);

        let webhook_state = WebhookState::new(
            dispatch.clone(),
            Arc::new(DispatchAcknowledger::new(dispatch.clone())),
            config.auth.clone(),
            config.log.clone(),
            config.rate_limit.webhook_per_minute,
        );

        Ok(Self {
            config,
            dispatch,
            supervisor,
            orchestrator,
            classifier,
            middleware,
            metrics,
            health,
            monitor,
            tools,
            webhook_state,
            shutdown: CancellationToken::new(),
        })
    }

    /// Spawn the background loops (supervisor poll, bridge watchdog,
    /// memory monitor, cleanup consumer, periodic health assessment).
    pub fn spawn_background(&self) -> Vec<tokio::task::JoinHandle<()>> {
        let mut handles = Vec::new();

        handles.push(tokio::spawn(self.supervisor.clone().run_poll_loop()));
        handles.push(tokio::spawn(bridge_watchdog(
            self.supervisor.clone(),
            self.middleware.clone(),
            self.classifier.clone(),
            self.orchestrator.clone(),
            self.shutdown.clone(),
        )));

        // Periodic health assessment feeding the metrics hub.
        let health = self.health.clone();
        let metrics = self.metrics.clone();
        let shutdown = self.shutdown.clone();
        handles.push(tokio::spawn(async move {
            loop {
                tokio::select! {
                    () = shutdown.cancelled() => return,
                    () = tokio::time::sleep(Duration::from_secs(60)) => {}
                }
                let overall = health.assess().await;
                let level = match overall.status {
                    HealthStatus::Healthy => 0.0,
                    HealthStatus::Degraded => 1.0,
                    HealthStatus::Unhealthy => 2.0,
                };
                metrics.gauge("health.status", level);
            }
        }));

        let (stop_tx, stop_rx) = tokio::sync::watch::channel(false);
        handles.push(tokio::spawn(self.monitor.clone().run_loop(stop_rx)));
        let shutdown = self.shutdown.clone();
        handles.push(tokio::spawn(async move {
            shutdown.cancelled().await;
            let _ = stop_tx.send(true);
        }));

        // Cleanup requests turn into spool prunes; the monitor itself
        // never touches the spool.
        let mut cleanup = self.monitor.cleanup_requests();
        let spool = self.dispatch.spool().clone();
        let ttl = self.config.spool.ttl;
        let shutdown = self.shutdown.clone();
        handles.push(tokio::spawn(async move {
            loop {
                tokio::select! {
                    () = shutdown.cancelled() => return,
                    request = cleanup.recv() => {
                        match request {
                            Ok(request) => {
                                tracing::info!(area = request.area.as_str(), "cleanup requested");
                                let _ = spool.events().prune(ttl);
                                let _ = spool.responses().prune(ttl);
                            }
                            Err(_) => return,
                        }
                    }
                }
            }
        }));

        handles
    }

    /// Cooperative shutdown: stop intake, drain, stop worker.
    pub async fn graceful_shutdown(&self, drain_deadline: Duration) {
        tracing::info!("shutting down");
        self.dispatch.close();

        // Drain: wait for the consumer to catch up, bounded by deadline.
        let spool = self.dispatch.spool().clone();
        let _ = tokio::time::timeout(drain_deadline, async move {
            loop {
                match spool.events().replay() {
                    Ok(pending) if pending.is_empty() => return,
                    Ok(_) => tokio::time::sleep(Duration::from_millis(200)).await,
                    Err(_) => return,
                }
            }
        })
        .await;

        self.shutdown.cancel();
        self.supervisor.shutdown();
        if self.supervisor.check_process().await {
            let _ = self.supervisor.stop().await;
        }

        // Flush a final metrics snapshot into the log.
        let snapshot = self.metrics.snapshot();
        tracing::info!(
            counters = snapshot.counters.len(),
            gauges = snapshot.gauges.len(),
            "metrics flushed"
        );
    }
}

/// Watches the worker through the resilience middleware.
///
/// Every probe goes through retry + circuit; an exhausted probe becomes a
/// typed record, is classified, and is handed to the recovery
/// orchestrator (which restarts the worker or escalates per plan).
async fn bridge_watchdog(
    supervisor: Arc<BridgeSupervisor>,
    middleware: Arc<Resilient>,
    classifier: Arc<Classifier>,
    orchestrator: Arc<RecoveryOrchestrator>,
    shutdown: CancellationToken,
) {
    use coderelay_bridge::WorkerState;
    use coderelay_error::ErrorContext;
    use coderelay_error::ErrorRecord;
    use coderelay_error::StatusCode;
    use coderelay_resilience::OpFailure;

    let mut status = supervisor.watch_status();
    loop {
        tokio::select! {
            () = shutdown.cancelled() => return,
            changed = status.changed() => {
                if changed.is_err() {
                    return;
                }
            }
        }

        let state = status.borrow_and_update().state;
        if !matches!(state, WorkerState::Failed | WorkerState::Unhealthy) {
            continue;
        }

        let probe_supervisor = supervisor.clone();
        let outcome = middleware
            .call("bridge_health", move || {
                let supervisor = probe_supervisor.clone();
                async move {
                    if supervisor.health_ok().await {
                        Ok(())
                    } else {
                        Err(OpFailure::new(ErrorRecord::new(
                            StatusCode::BridgeHealthFailed,
                            "worker health endpoint not answering",
                            ErrorContext::new("bridge_health", "bridge"),
                        )))
                    }
                }
            })
            .await;

        let Err(mut record) = outcome else {
            continue;
        };
        // The middleware may report its own condition (circuit open,
        // timeout); reclassify either way and let a plan decide.
        if record.code != StatusCode::BridgeHealthFailed {
            record.context.component = "bridge".to_string();
        }
        let verdict = classifier.classify(&record);
        tracing::warn!(
            severity = %verdict.severity,
            strategy = %verdict.strategy,
            "bridge unhealthy, running recovery"
        );
        let report = orchestrator.execute(&mut record).await;
        tracing::info!(status = ?report.status, plan = report.plan_id.as_deref().unwrap_or("<none>"), "bridge recovery finished");
    }
}
