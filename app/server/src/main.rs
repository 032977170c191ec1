//! coderelay server binary.
//!
//! Exit codes: 0 clean stop, 1 startup failure (misconfiguration),
//! 2 unrecoverable runtime fault after drain.

mod app;

use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use clap::Parser;

use crate::app::App;

#[derive(Debug, Parser)]
#[command(name = "coderelay", about = "Bridge between a coding assistant and a chat bot")]
struct Cli {
    /// Path to the TOML config file.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Override the webhook bind address.
    #[arg(long)]
    bind: Option<String>,

    /// Hard shutdown deadline in seconds.
    #[arg(long, default_value_t = 30)]
    drain_secs: u64,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let mut config = match coderelay_config::load(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("config error: {e}");
            return ExitCode::from(1);
        }
    };
    if let Some(bind) = cli.bind {
        config.webhook.bind = bind;
    }
    if let Err(e) = config.validate() {
        eprintln!("config error: {e}");
        return ExitCode::from(1);
    }

    init_tracing(&config.log.level);

    let runtime = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("runtime error: {e}");
            return ExitCode::from(1);
        }
    };

    match runtime.block_on(run(config, cli.config, Duration::from_secs(cli.drain_secs))) {
        Ok(()) => ExitCode::SUCCESS,
        Err(RunError::Startup(e)) => {
            tracing::error!(error = %e, "startup failed");
            ExitCode::from(1)
        }
        Err(RunError::Runtime(e)) => {
            tracing::error!(error = %e, "unrecoverable runtime fault");
            ExitCode::from(2)
        }
    }
}

enum RunError {
    Startup(anyhow::Error),
    Runtime(anyhow::Error),
}

async fn run(
    config: coderelay_config::Config,
    config_path: Option<PathBuf>,
    drain: Duration,
) -> Result<(), RunError> {
    let app = App::build(config).map_err(RunError::Startup)?;

    let background = app.spawn_background();

    // Watch the config file; changes do not mutate running components,
    // they surface as invalidation events.
    let _watcher = config_path.as_deref().and_then(|path| {
        match coderelay_config::ConfigWatcher::start(path) {
            Ok(watcher) => {
                let mut rx = watcher.subscribe();
                tokio::spawn(async move {
                    while rx.changed().await.is_ok() {
                        if let Some(invalidated) = rx.borrow_and_update().clone() {
                            tracing::warn!(
                                path = %invalidated.path.display(),
                                generation = invalidated.generation,
                                "config changed on disk; restart to apply"
                            );
                        }
                    }
                });
                Some(watcher)
            }
            Err(e) => {
                tracing::warn!(error = %e, "config watcher unavailable");
                None
            }
        }
    });

    // Webhook listener with graceful shutdown.
    let webhook_shutdown = app.shutdown.clone();
    let bind = app.config.webhook.bind.clone();
    let webhook_state = app.webhook_state.clone();
    let webhook = tokio::spawn(async move {
        coderelay_webhook::serve(&bind, webhook_state, async move {
            webhook_shutdown.cancelled().await;
        })
        .await
    });

    tracing::info!(
        spool = %app.config.spool.dir.display(),
        webhook = %app.config.webhook.bind,
        tools = app.tools.list().len(),
        "coderelay up"
    );

    // Run until a signal or the webhook dies unexpectedly.
    let outcome: Result<(), RunError> = tokio::select! {
        _ = tokio::signal::ctrl_c() => Ok(()),
        joined = webhook => match joined {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) => Err(RunError::Runtime(e.into())),
            Err(e) => Err(RunError::Runtime(e.into())),
        },
    };

    app.graceful_shutdown(drain).await;
    for handle in background {
        handle.abort();
    }
    outcome
}

fn init_tracing(level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_new(level)
        .or_else(|_| EnvFilter::try_new("info"))
        .unwrap_or_default();
    tracing_subscriber::fmt().with_env_filter(filter).init();
}
