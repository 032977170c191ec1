//! The paired event and response spools under one base directory.

use std::fs;
use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;

use coderelay_protocol::Event;
use coderelay_protocol::Response;

use crate::error::Result;
use crate::error::io_err;
use crate::spool::Spool;
use crate::spool::SpoolOptions;

/// Both spool subtrees plus the retention sidecar.
///
/// ```text
/// {base}/
///   events/
///   responses/
///   retention.toml
/// ```
pub struct SpoolSet {
    base: PathBuf,
    events: Arc<Spool<Event>>,
    responses: Arc<Spool<Response>>,
}

impl SpoolSet {
    /// Open both subtrees, writing the retention sidecar.
    pub fn open(base: impl Into<PathBuf>, options: SpoolOptions) -> Result<Self> {
        let base = base.into();
        let events = Arc::new(Spool::open(base.join("events"), options.clone())?);
        let responses = Arc::new(Spool::open(base.join("responses"), options.clone())?);
        write_retention_sidecar(&base, &options)?;
        Ok(Self {
            base,
            events,
            responses,
        })
    }

    /// Base directory.
    pub fn base(&self) -> &Path {
        &self.base
    }

    /// The event subtree.
    pub fn events(&self) -> &Arc<Spool<Event>> {
        &self.events
    }

    /// The response subtree.
    pub fn responses(&self) -> &Arc<Spool<Response>> {
        &self.responses
    }
}

fn write_retention_sidecar(base: &Path, options: &SpoolOptions) -> Result<()> {
    let path = base.join("retention.toml");
    let body = format!(
        "# Written at spool open; describes the active retention policy.\n\
         ttl_secs = {}\nmax_records = {}\ncompression_threshold_bytes = {}\n",
        options.ttl.as_secs(),
        options.max_records,
        options.compression_threshold_bytes,
    );
    fs::write(&path, body).map_err(|e| io_err(&path, &e))
}

#[cfg(test)]
#[path = "store.test.rs"]
mod tests;
