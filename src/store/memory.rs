//! In-memory store backend
//!
//! A process-local map per partition. Satisfies the backend contract for
//! tests and for rigs that do not need cache persistence across restarts.

use super::{CacheRecord, StoreBackend, StoreError};
use crate::regime::Regime;
use std::collections::HashMap;
use std::sync::Mutex;

type Partition = HashMap<String, CacheRecord>;

/// HashMap-backed store, one map per regime partition
#[derive(Debug, Default)]
pub struct MemoryStore {
    partitions: Mutex<HashMap<Regime, Partition>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of records in a partition. Test helper for asserting write
    /// policies did not duplicate records.
    pub fn len(&self, partition: Regime) -> usize {
        self.partitions
            .lock()
            .map(|maps| maps.get(&partition).map_or(0, |m| m.len()))
            .unwrap_or(0)
    }

    /// Whether a partition holds no records.
    pub fn is_empty(&self, partition: Regime) -> bool {
        self.len(partition) == 0
    }
}

impl StoreBackend for MemoryStore {
    fn find_one(&self, partition: Regime, key: &str) -> Result<Option<CacheRecord>, StoreError> {
        let maps = self.partitions.lock().map_err(|_| StoreError::Poisoned)?;
        Ok(maps.get(&partition).and_then(|m| m.get(key)).cloned())
    }

    fn upsert(&self, partition: Regime, key: &str, record: CacheRecord) -> Result<(), StoreError> {
        let mut maps = self.partitions.lock().map_err(|_| StoreError::Poisoned)?;
        maps.entry(partition)
            .or_default()
            .insert(key.to_string(), record);
        Ok(())
    }

    fn insert_if_absent(
        &self,
        partition: Regime,
        key: &str,
        record: CacheRecord,
    ) -> Result<bool, StoreError> {
        let mut maps = self.partitions.lock().map_err(|_| StoreError::Poisoned)?;
        let map = maps.entry(partition).or_default();
        if map.contains_key(key) {
            return Ok(false);
        }
        map.insert(key.to_string(), record);
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use serde_json::json;

    fn record(key: &str) -> CacheRecord {
        CacheRecord {
            fetched_at: Utc::now(),
            regime_key: key.to_string(),
            payload: json!({}),
            timezone: "UTC".to_string(),
        }
    }

    #[test]
    fn test_find_one_missing_is_none_not_error() {
        let store = MemoryStore::new();
        let found = store.find_one(Regime::Forecast, "2024-03-10").unwrap();
        assert!(found.is_none());
    }

    #[test]
    fn test_upsert_then_find() {
        let store = MemoryStore::new();
        store.upsert(Regime::Forecast, "2024-03-10", record("2024-03-10")).unwrap();
        let found = store.find_one(Regime::Forecast, "2024-03-10").unwrap();
        assert!(found.is_some());
        assert_eq!(store.len(Regime::Forecast), 1);
    }

    #[test]
    fn test_insert_if_absent_reports_occupancy() {
        let store = MemoryStore::new();
        let inserted = store
            .insert_if_absent(Regime::Historical, "2024-03-09", record("2024-03-09"))
            .unwrap();
        assert!(inserted);

        let inserted = store
            .insert_if_absent(Regime::Historical, "2024-03-09", record("2024-03-09"))
            .unwrap();
        assert!(!inserted, "Occupied key must not be rewritten");
        assert_eq!(store.len(Regime::Historical), 1);
    }
}
