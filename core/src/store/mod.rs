//! Persistence of the widget's mutable state.
//!
//! RULE: Only this module talks to storage.
//! The engine asks PersistentState for its history and used-code set;
//! it never touches a KvStore directly.
//!
//! Storage may be broken at any time. Reads that fail (missing key,
//! unreadable value, undecodable JSON) all start from empty; writes that
//! fail are logged and dropped. The widget stays usable either way.

mod sqlite;

pub use sqlite::SqliteStore;

use crate::{
    error::{DrawError, DrawResult},
    history::{HistoryLog, HistoryRecord},
    redemption::UsedCodeSet,
    types::{HISTORY_KEY, USED_CODES_KEY},
};
use serde::{de::DeserializeOwned, Serialize};
use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};

/// String-keyed storage of string values, scoped to one namespace.
pub trait KvStore: Send {
    fn load(&self, key: &str) -> DrawResult<Option<String>>;
    fn persist(&mut self, key: &str, value: &str) -> DrawResult<()>;
    fn remove(&mut self, key: &str) -> DrawResult<()>;
}

/// Process-local store. Clones share the same entries, so a test can
/// inspect what an engine wrote or hand it to a second engine.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: Arc<Mutex<HashMap<String, String>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn poisoned(key: &str) -> DrawError {
        DrawError::StorageRead {
            key:    key.to_string(),
            reason: "memory store lock poisoned".into(),
        }
    }
}

impl KvStore for MemoryStore {
    fn load(&self, key: &str) -> DrawResult<Option<String>> {
        let entries = self.entries.lock().map_err(|_| Self::poisoned(key))?;
        Ok(entries.get(key).cloned())
    }

    fn persist(&mut self, key: &str, value: &str) -> DrawResult<()> {
        let mut entries = self.entries.lock().map_err(|_| Self::poisoned(key))?;
        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&mut self, key: &str) -> DrawResult<()> {
        let mut entries = self.entries.lock().map_err(|_| Self::poisoned(key))?;
        entries.remove(key);
        Ok(())
    }
}

/// Fail-open access to the history and used-code entries.
pub struct PersistentState {
    store: Box<dyn KvStore>,
}

impl PersistentState {
    pub fn new(store: Box<dyn KvStore>) -> Self {
        Self { store }
    }

    pub fn load_history(&self, limit: usize) -> HistoryLog {
        match self.read_json::<Vec<HistoryRecord>>(HISTORY_KEY) {
            Ok(Some(records)) => HistoryLog::from_records(records, limit),
            Ok(None) => HistoryLog::new(limit),
            Err(e) => {
                log::warn!("{e}; starting with empty history");
                HistoryLog::new(limit)
            }
        }
    }

    /// Returns whether the write reached storage.
    pub fn save_history(&mut self, history: &HistoryLog) -> bool {
        self.write_json(HISTORY_KEY, history.records())
    }

    pub fn clear_history(&mut self) -> bool {
        match self.store.remove(HISTORY_KEY) {
            Ok(()) => true,
            Err(e) => {
                log::error!("clearing history failed: {e}");
                false
            }
        }
    }

    pub fn load_used_codes(&self) -> UsedCodeSet {
        match self.read_json::<UsedCodeSet>(USED_CODES_KEY) {
            Ok(Some(codes)) => codes,
            Ok(None) => UsedCodeSet::new(),
            Err(e) => {
                log::warn!("{e}; starting with empty used-code set");
                UsedCodeSet::new()
            }
        }
    }

    pub fn save_used_codes(&mut self, codes: &UsedCodeSet) -> bool {
        self.write_json(USED_CODES_KEY, codes)
    }

    fn read_json<T: DeserializeOwned>(&self, key: &str) -> DrawResult<Option<T>> {
        let read_error = |reason: String| DrawError::StorageRead { key: key.to_string(), reason };
        let Some(raw) = self.store.load(key).map_err(|e| read_error(e.to_string()))? else {
            return Ok(None);
        };
        serde_json::from_str(&raw)
            .map(Some)
            .map_err(|e| read_error(e.to_string()))
    }

    fn write_json<T: Serialize + ?Sized>(&mut self, key: &str, value: &T) -> bool {
        let result = serde_json::to_string(value)
            .map_err(DrawError::from)
            .and_then(|json| self.store.persist(key, &json))
            .map_err(|e| DrawError::StoragePersist {
                key:    key.to_string(),
                reason: e.to_string(),
            });
        match result {
            Ok(()) => true,
            Err(e) => {
                log::error!("{e}");
                false
            }
        }
    }
}
