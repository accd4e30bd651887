//! Persistence Module
//!
//! Durable storage for the persistent tier. The whole tier lives in one
//! versioned record under [`STORAGE_KEY`] and is rewritten on every change.

use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use crate::cache::{CacheEntry, StrategyTable};
use crate::error::StorageError;

/// Storage key of the persistent tier record.
pub const STORAGE_KEY: &str = "apiCache";

/// Current layout version of the persisted record.
pub const RECORD_VERSION: u64 = 1;

// == Durable Storage ==
/// String key/value storage that survives restarts.
pub trait DurableStorage: Send + Sync + fmt::Debug {
    /// Returns `Ok(None)` when nothing is stored under `key`.
    fn read(&self, key: &str) -> Result<Option<String>, StorageError>;

    fn write(&self, key: &str, value: &str) -> Result<(), StorageError>;

    /// Removing a missing key is not an error.
    fn remove(&self, key: &str) -> Result<(), StorageError>;
}

// == File Storage ==
/// Stores each key as `<dir>/<key>.json`.
#[derive(Debug, Clone)]
pub struct FileStorage {
    dir: PathBuf,
}

impl FileStorage {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.json", key))
    }
}

impl DurableStorage for FileStorage {
    fn read(&self, key: &str) -> Result<Option<String>, StorageError> {
        match fs::read_to_string(self.path_for(key)) {
            Ok(contents) => Ok(Some(contents)),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    fn write(&self, key: &str, value: &str) -> Result<(), StorageError> {
        fs::create_dir_all(&self.dir)?;

        // Write then rename so a crash never leaves a half-written record
        let path = self.path_for(key);
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, value)?;
        fs::rename(&tmp, &path)?;
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        match fs::remove_file(self.path_for(key)) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err.into()),
        }
    }
}

// == Memory Storage ==
/// In-process storage, for tests and embedders without a disk.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    records: Mutex<HashMap<String, String>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Storage pre-seeded with one record.
    pub fn with_record(key: &str, value: impl Into<String>) -> Self {
        let storage = Self::new();
        storage.records_mut().insert(key.to_string(), value.into());
        storage
    }

    fn records_mut(&self) -> std::sync::MutexGuard<'_, HashMap<String, String>> {
        self.records.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl DurableStorage for MemoryStorage {
    fn read(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.records_mut().get(key).cloned())
    }

    fn write(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.records_mut().insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.records_mut().remove(key);
        Ok(())
    }
}

// == Record Codec ==
#[derive(Serialize)]
struct PersistedRecord<'a> {
    version: u64,
    entries: &'a HashMap<String, CacheEntry>,
}

/// Serializes the persistent tier into a versioned record.
pub fn encode_record(entries: &HashMap<String, CacheEntry>) -> Result<String, StorageError> {
    let record = PersistedRecord {
        version: RECORD_VERSION,
        entries,
    };
    Ok(serde_json::to_string(&record)?)
}

/// Decoded persistent tier plus the number of entries dropped as invalid.
#[derive(Debug, Default)]
pub struct DecodedRecord {
    pub entries: HashMap<String, CacheEntry>,
    pub dropped: usize,
}

/// Parses a persisted record.
///
/// A record without `version` is the legacy bare key→entry map and is
/// migrated as-is. Invalid entries are dropped, not reported as errors.
pub fn decode_record(raw: &str, strategies: &StrategyTable) -> Result<DecodedRecord, StorageError> {
    let value: Value = serde_json::from_str(raw)?;
    let object = value
        .as_object()
        .ok_or_else(|| StorageError::Corrupt("record is not a JSON object".to_string()))?;

    let raw_entries = match object.get("version") {
        None => object,
        Some(version) => {
            let version = version
                .as_u64()
                .ok_or_else(|| StorageError::Corrupt("version is not a number".to_string()))?;
            if version != RECORD_VERSION {
                return Err(StorageError::UnsupportedVersion(version));
            }
            object
                .get("entries")
                .and_then(Value::as_object)
                .ok_or_else(|| StorageError::Corrupt("entries is not a JSON object".to_string()))?
        }
    };

    let mut decoded = DecodedRecord::default();
    for (key, raw_entry) in raw_entries {
        match CacheEntry::from_raw(raw_entry, strategies) {
            Some(entry) => {
                decoded.entries.insert(key.clone(), entry);
            }
            None => {
                debug!("Dropping invalid persisted cache entry: {}", key);
                decoded.dropped += 1;
            }
        }
    }

    Ok(decoded)
}
