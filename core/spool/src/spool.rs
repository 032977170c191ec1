//! Append-only, file-per-record spool with a single reader cursor.
//!
//! Layout under the base directory:
//!
//! ```text
//! {dir}/
//!   {timestamp_ms}-{id}.json       uncompressed record
//!   {timestamp_ms}-{id}.json.gz    compressed record
//!   cursor.json                    last-acked record name
//! ```
//!
//! Timestamps are zero-padded so lexicographic file order equals append
//! order. The writer is exclusive; prune takes the same lock, so it can
//! never race an in-flight append.

use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::marker::PhantomData;
use std::path::Path;
use std::path::PathBuf;
use std::sync::Mutex;
use std::time::Duration;

use chrono::DateTime;
use chrono::Utc;
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::codec;
use crate::error::Result;
use crate::error::SpoolError;
use crate::error::io_err;
use crate::error::spool_error;

/// A record that can live in a spool.
pub trait SpoolItem: Serialize + DeserializeOwned {
    /// Unique record id.
    fn item_id(&self) -> &str;
    /// Record creation time.
    fn item_timestamp(&self) -> DateTime<Utc>;
}

impl SpoolItem for coderelay_protocol::Event {
    fn item_id(&self) -> &str {
        &self.id
    }

    fn item_timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }
}

impl SpoolItem for coderelay_protocol::Response {
    fn item_id(&self) -> &str {
        &self.id
    }

    fn item_timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }
}

/// A record read back from the spool.
#[derive(Debug, Clone)]
pub struct SpooledRecord<T> {
    /// Record file stem (`{timestamp_ms}-{id}`); doubles as the cursor.
    pub name: String,
    /// Record id.
    pub id: String,
    /// Whether the record was stored compressed.
    pub compressed: bool,
    /// The record itself.
    pub record: T,
}

/// Spool retention and compression knobs.
#[derive(Debug, Clone)]
pub struct SpoolOptions {
    /// Time-to-live for records.
    pub ttl: Duration,
    /// Absolute record count cap.
    pub max_records: usize,
    /// Serialized size above which a record is compressed.
    pub compression_threshold_bytes: usize,
}

impl From<&coderelay_config::SpoolConfig> for SpoolOptions {
    fn from(cfg: &coderelay_config::SpoolConfig) -> Self {
        Self {
            ttl: cfg.ttl,
            max_records: cfg.max_records,
            compression_threshold_bytes: cfg.compression_threshold_bytes,
        }
    }
}

/// One spool subtree (events or responses).
pub struct Spool<T> {
    dir: PathBuf,
    options: SpoolOptions,
    /// Guards writes and prunes; readers only touch immutable files.
    write_lock: Mutex<()>,
    _marker: PhantomData<T>,
}

impl<T: SpoolItem> Spool<T> {
    /// Open (creating if needed) a spool rooted at `dir`.
    pub fn open(dir: impl Into<PathBuf>, options: SpoolOptions) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir).map_err(|e| io_err(&dir, &e))?;
        Ok(Self {
            dir,
            options,
            write_lock: Mutex::new(()),
            _marker: PhantomData,
        })
    }

    /// Base directory of this spool.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Append a record, returning its id.
    ///
    /// The file is written whole then fsynced; a crash mid-write leaves a
    /// temp file the reader ignores.
    pub fn append(&self, record: &T) -> Result<String> {
        let _guard = self.write_lock.lock().unwrap_or_else(|e| e.into_inner());
        self.append_locked(record)
    }

    /// Append a batch, fsyncing the directory once at the end.
    pub fn append_batch(&self, records: &[T]) -> Result<Vec<String>> {
        let _guard = self.write_lock.lock().unwrap_or_else(|e| e.into_inner());
        let mut ids = Vec::with_capacity(records.len());
        for record in records {
            ids.push(self.append_locked(record)?);
        }
        self.sync_dir()?;
        Ok(ids)
    }

    fn append_locked(&self, record: &T) -> Result<String> {
        let id = record.item_id().to_string();
        let name = record_name(record.item_timestamp(), &id);
        let payload = serde_json::to_vec(record).map_err(|e| {
            spool_error::MalformedSnafu {
                name: name.clone(),
                message: e.to_string(),
            }
            .build()
        })?;

        let (bytes, ext) = if payload.len() > self.options.compression_threshold_bytes {
            (codec::compress(&name, &payload)?, codec::COMPRESSED_EXT)
        } else {
            (payload, codec::PLAIN_EXT)
        };

        let path = self.dir.join(format!("{name}.{ext}"));
        let tmp = self.dir.join(format!(".{name}.{ext}.tmp"));

        let mut file = fs::File::create(&tmp).map_err(|e| io_err(&tmp, &e))?;
        file.write_all(&bytes).map_err(|e| io_err(&tmp, &e))?;
        file.sync_all().map_err(|e| io_err(&tmp, &e))?;
        fs::rename(&tmp, &path).map_err(|e| io_err(&path, &e))?;

        tracing::debug!(record = %name, bytes = bytes.len(), compressed = ext == codec::COMPRESSED_EXT, "spooled record");
        Ok(id)
    }

    /// Read all records with name strictly greater than `cursor`, in
    /// append order.
    pub fn iterate(&self, cursor: Option<&str>) -> Result<Vec<SpooledRecord<T>>> {
        let mut out = Vec::new();
        for (name, path) in self.list_files()? {
            if let Some(cursor) = cursor {
                if name.as_str() <= cursor {
                    continue;
                }
            }
            out.push(self.read_record(&name, &path)?);
        }
        Ok(out)
    }

    /// Replay from the persisted cursor (used after restart).
    pub fn replay(&self) -> Result<Vec<SpooledRecord<T>>> {
        let cursor = self.load_cursor()?;
        self.iterate(cursor.as_deref())
    }

    /// Mark everything up to and including `id` as consumed.
    pub fn ack(&self, id: &str) -> Result<()> {
        let name = self
            .list_files()?
            .into_keys()
            .find(|name| name_matches_id(name, id))
            .ok_or_else(|| spool_error::NotFoundSnafu { id: id.to_string() }.build())?;
        self.store_cursor(&name)
    }

    /// Last-acked cursor, if any.
    pub fn load_cursor(&self) -> Result<Option<String>> {
        let path = self.cursor_path();
        if !path.exists() {
            return Ok(None);
        }
        let raw = fs::read_to_string(&path).map_err(|e| io_err(&path, &e))?;
        let state: CursorState = serde_json::from_str(&raw).map_err(|e| {
            spool_error::MalformedSnafu {
                name: "cursor.json".to_string(),
                message: e.to_string(),
            }
            .build()
        })?;
        Ok(Some(state.last_acked))
    }

    /// Remove records older than `older_than` or beyond the count cap,
    /// whichever bites first. Acked records go first; unacked records are
    /// only removed by the count cap.
    pub fn prune(&self, older_than: Duration) -> Result<usize> {
        let _guard = self.write_lock.lock().unwrap_or_else(|e| e.into_inner());
        let files = self.list_files()?;
        let cursor = self.load_cursor()?;
        let now_ms = Utc::now().timestamp_millis();
        let ttl_ms = older_than.min(self.options.ttl).as_millis() as i64;

        let mut removed = 0usize;
        let mut remaining: Vec<(String, PathBuf)> = Vec::new();
        for (name, path) in files {
            // TTL wins over replay: an expired record is gone even if the
            // consumer never acked it.
            let expired = record_timestamp_ms(&name)
                .map(|ts| now_ms - ts > ttl_ms)
                .unwrap_or(true);
            if expired {
                fs::remove_file(&path).map_err(|e| io_err(&path, &e))?;
                removed += 1;
            } else {
                remaining.push((name, path));
            }
        }

        // Enforce the absolute cap, oldest acked first, then oldest.
        if remaining.len() > self.options.max_records {
            let excess = remaining.len() - self.options.max_records;
            let acked_first = {
                let mut acked: Vec<&(String, PathBuf)> = Vec::new();
                let mut unacked: Vec<&(String, PathBuf)> = Vec::new();
                for pair in &remaining {
                    let is_acked =
                        cursor.as_deref().is_some_and(|c| pair.0.as_str() <= c);
                    if is_acked {
                        acked.push(pair);
                    } else {
                        unacked.push(pair);
                    }
                }
                acked.into_iter().chain(unacked).collect::<Vec<_>>()
            };
            for (_, path) in acked_first.into_iter().take(excess) {
                fs::remove_file(path).map_err(|e| io_err(path, &e))?;
                removed += 1;
            }
        }

        if removed > 0 {
            tracing::info!(removed, dir = %self.dir.display(), "pruned spool records");
        }
        Ok(removed)
    }

    /// Number of record files currently on disk.
    pub fn len(&self) -> Result<usize> {
        Ok(self.list_files()?.len())
    }

    /// True when the spool holds no records.
    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    fn read_record(&self, name: &str, path: &Path) -> Result<SpooledRecord<T>> {
        let bytes = fs::read(path).map_err(|e| io_err(path, &e))?;
        let compressed = path
            .to_string_lossy()
            .ends_with(codec::COMPRESSED_EXT);
        let payload = if compressed {
            codec::decompress(name, &bytes)?
        } else {
            bytes
        };
        let record: T = serde_json::from_slice(&payload).map_err(|e| {
            spool_error::MalformedSnafu {
                name: name.to_string(),
                message: e.to_string(),
            }
            .build()
        })?;
        Ok(SpooledRecord {
            name: name.to_string(),
            id: record.item_id().to_string(),
            compressed,
            record,
        })
    }

    /// Record files by name, sorted (BTreeMap keeps append order).
    fn list_files(&self) -> Result<BTreeMap<String, PathBuf>> {
        let mut out = BTreeMap::new();
        let entries = fs::read_dir(&self.dir).map_err(|e| io_err(&self.dir, &e))?;
        for entry in entries {
            let entry = entry.map_err(|e| io_err(&self.dir, &e))?;
            let path = entry.path();
            let file_name = entry.file_name().to_string_lossy().to_string();
            if file_name.starts_with('.') || file_name == "cursor.json" {
                continue;
            }
            let Some(name) = file_name
                .strip_suffix(".json.gz")
                .or_else(|| file_name.strip_suffix(".json"))
            else {
                continue;
            };
            out.insert(name.to_string(), path);
        }
        Ok(out)
    }

    fn store_cursor(&self, name: &str) -> Result<()> {
        let path = self.cursor_path();
        let tmp = self.dir.join(".cursor.json.tmp");
        let state = CursorState {
            last_acked: name.to_string(),
            acked_at: Utc::now(),
        };
        let bytes = serde_json::to_vec_pretty(&state).map_err(|e| {
            spool_error::MalformedSnafu {
                name: "cursor.json".to_string(),
                message: e.to_string(),
            }
            .build()
        })?;
        let mut file = fs::File::create(&tmp).map_err(|e| io_err(&tmp, &e))?;
        file.write_all(&bytes).map_err(|e| io_err(&tmp, &e))?;
        file.sync_all().map_err(|e| io_err(&tmp, &e))?;
        fs::rename(&tmp, &path).map_err(|e| io_err(&path, &e))?;
        Ok(())
    }

    fn cursor_path(&self) -> PathBuf {
        self.dir.join("cursor.json")
    }

    fn sync_dir(&self) -> Result<()> {
        // Directory fsync is best-effort on platforms that support it.
        if let Ok(dir) = fs::File::open(&self.dir) {
            let _ = dir.sync_all();
        }
        Ok(())
    }
}

#[derive(Debug, serde::Serialize, serde::Deserialize)]
struct CursorState {
    last_acked: String,
    acked_at: DateTime<Utc>,
}

/// `{timestamp_ms}-{id}`, zero-padded for lexicographic ordering.
fn record_name(timestamp: DateTime<Utc>, id: &str) -> String {
    format!("{:013}-{id}", timestamp.timestamp_millis().max(0))
}

fn record_timestamp_ms(name: &str) -> Option<i64> {
    name.split('-').next()?.parse().ok()
}

fn name_matches_id(name: &str, id: &str) -> bool {
    name.split_once('-').is_some_and(|(_, rest)| rest == id)
}

#[cfg(test)]
#[path = "spool.test.rs"]
mod tests;
