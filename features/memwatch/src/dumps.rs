//! Heap dump capture with bounded retention.
//!
//! The "dump" is a JSON summary of what the monitor knew at alert time;
//! it is cheap enough to write in-process and enough to correlate an
//! incident with its memory shape after the fact.

use std::fs;
use std::io;
use std::path::PathBuf;

use chrono::Utc;
use coderelay_config::HeapDumpConfig;

use crate::monitor::MemoryArea;

/// Writes heap dump files, keeping at most `max` around.
pub struct HeapDumpWriter {
    config: HeapDumpConfig,
}

impl HeapDumpWriter {
    /// Create a writer; no-op when dumps are disabled.
    pub fn new(config: HeapDumpConfig) -> Self {
        Self { config }
    }

    /// Write one dump; returns its path.
    ///
    /// Disabled writers return `NotFound` so callers can treat "no dump"
    /// uniformly.
    pub fn write(&self, area: MemoryArea, reason: &str) -> io::Result<PathBuf> {
        if !self.config.enabled {
            return Err(io::Error::new(io::ErrorKind::NotFound, "dumps disabled"));
        }
        fs::create_dir_all(&self.config.dir)?;

        let name = format!(
            "heap-{}-{}.json",
            Utc::now().format("%Y%m%dT%H%M%S%.3f"),
            area.as_str()
        );
        let path = self.config.dir.join(name);
        let body = serde_json::json!({
            "area": area.as_str(),
            "reason": reason,
            "pid": std::process::id(),
            "written_at": Utc::now(),
        });
        fs::write(&path, serde_json::to_vec_pretty(&body).unwrap_or_default())?;

        self.enforce_retention()?;
        Ok(path)
    }

    /// Remove oldest dumps past the retention cap.
    fn enforce_retention(&self) -> io::Result<()> {
        let mut dumps: Vec<PathBuf> = fs::read_dir(&self.config.dir)?
            .filter_map(|e| e.ok().map(|e| e.path()))
            .filter(|p| {
                p.file_name()
                    .and_then(|n| n.to_str())
                    .is_some_and(|n| n.starts_with("heap-") && n.ends_with(".json"))
            })
            .collect();
        dumps.sort();
        while dumps.len() > self.config.max {
            let oldest = dumps.remove(0);
            let _ = fs::remove_file(oldest);
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "dumps.test.rs"]
mod tests;
