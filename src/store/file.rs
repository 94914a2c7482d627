//! File-backed store backend
//!
//! Persists each record as a JSON file under an XDG-compliant cache
//! directory (`~/.cache/grillwx/` on Linux), one subdirectory per regime
//! partition, one file per key. Writes go through a temp file and rename so
//! a reader never sees a half-written record. Unlike a best-effort cache,
//! read failures other than "file absent" are surfaced as `StoreError`,
//! never folded into a miss.

use super::{CacheRecord, StoreBackend, StoreError};
use crate::regime::Regime;
use directories::ProjectDirs;
use std::fs;
use std::io::ErrorKind;
use std::path::PathBuf;
use std::sync::Mutex;

/// JSON-file store rooted at a cache directory
#[derive(Debug)]
pub struct FileStore {
    root: PathBuf,
    // Serializes check-then-write sequences within the process
    write_lock: Mutex<()>,
}

impl FileStore {
    /// Creates a store under the XDG cache directory.
    ///
    /// Returns `None` if the platform cache directory cannot be determined
    /// (e.g. no home directory).
    pub fn new() -> Option<Self> {
        let dirs = ProjectDirs::from("", "", "grillwx")?;
        Some(Self::with_dir(dirs.cache_dir().to_path_buf()))
    }

    /// Creates a store rooted at an explicit directory.
    pub fn with_dir(root: PathBuf) -> Self {
        Self {
            root,
            write_lock: Mutex::new(()),
        }
    }

    fn record_path(&self, partition: Regime, key: &str) -> PathBuf {
        self.root
            .join(partition.to_string())
            .join(format!("{}.json", key))
    }

    fn write_record(
        &self,
        partition: Regime,
        key: &str,
        record: &CacheRecord,
    ) -> Result<(), StoreError> {
        let path = self.record_path(partition, key);
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir)?;
        }

        let json =
            serde_json::to_string_pretty(record).map_err(|source| StoreError::Encode {
                key: key.to_string(),
                source,
            })?;

        // Temp file + rename keeps the visible record whole at all times
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, json)?;
        fs::rename(&tmp, &path)?;
        Ok(())
    }
}

impl StoreBackend for FileStore {
    fn find_one(&self, partition: Regime, key: &str) -> Result<Option<CacheRecord>, StoreError> {
        let path = self.record_path(partition, key);
        let content = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(StoreError::Io(err)),
        };
        let record = serde_json::from_str(&content).map_err(|source| StoreError::Corrupt {
            key: key.to_string(),
            source,
        })?;
        Ok(Some(record))
    }

    fn upsert(&self, partition: Regime, key: &str, record: CacheRecord) -> Result<(), StoreError> {
        let _guard = self.write_lock.lock().map_err(|_| StoreError::Poisoned)?;
        self.write_record(partition, key, &record)
    }

    fn insert_if_absent(
        &self,
        partition: Regime,
        key: &str,
        record: CacheRecord,
    ) -> Result<bool, StoreError> {
        let _guard = self.write_lock.lock().map_err(|_| StoreError::Poisoned)?;
        if self.record_path(partition, key).exists() {
            return Ok(false);
        }
        self.write_record(partition, key, &record)?;
        Ok(true)
    }
}
