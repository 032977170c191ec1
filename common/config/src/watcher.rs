//! Config file watcher publishing invalidation events.
//!
//! Components never re-read configuration themselves; they subscribe to
//! the watch channel and decide how to react to an invalidation (most
//! restart their internals on the next natural boundary).

use std::path::Path;
use std::path::PathBuf;

use notify::RecommendedWatcher;
use notify::RecursiveMode;
use notify::Watcher;
use tokio::sync::watch;

use crate::error::ConfigError;
use crate::error::Result;

/// Notification that the config file changed on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigInvalidated {
    /// The path that changed.
    pub path: PathBuf,
    /// Change counter, strictly increasing.
    pub generation: u64,
}

/// Watches one config file and publishes invalidations.
pub struct ConfigWatcher {
    // Held for its Drop; dropping stops the native watcher.
    _watcher: RecommendedWatcher,
    rx: watch::Receiver<Option<ConfigInvalidated>>,
}

impl ConfigWatcher {
    /// Start watching `path`.
    pub fn start(path: &Path) -> Result<Self> {
        let (tx, rx) = watch::channel(None);
        let watched = path.to_path_buf();

        let mut generation: u64 = 0;
        let mut watcher = notify::recommended_watcher(move |res: notify::Result<notify::Event>| {
            match res {
                Ok(event) if event.kind.is_modify() || event.kind.is_create() => {
                    generation += 1;
                    let _ = tx.send(Some(ConfigInvalidated {
                        path: watched.clone(),
                        generation,
                    }));
                }
                Ok(_) => {}
                Err(e) => {
                    tracing::warn!(error = %e, "config watcher error");
                }
            }
        })
        .map_err(|e| ConfigError::Watcher(e.to_string()))?;

        watcher
            .watch(path, RecursiveMode::NonRecursive)
            .map_err(|e| ConfigError::Watcher(e.to_string()))?;

        Ok(Self {
            _watcher: watcher,
            rx,
        })
    }

    /// Subscribe to invalidation events.
    pub fn subscribe(&self) -> watch::Receiver<Option<ConfigInvalidated>> {
        self.rx.clone()
    }
}
