//! Tiered cache store
//!
//! Three independently addressed partitions, one per regime, each with its
//! own write policy:
//!
//! - CURRENT: a single slot, overwritten on every write
//! - FORECAST: keyed by calendar date, upserted (intraday supersession)
//! - HISTORICAL: keyed by calendar date, written once and never clobbered
//!
//! The storage medium sits behind [`StoreBackend`]; the policy lives in
//! [`TieredStore`]. Backends write whole records only — a record is never
//! updated field-by-field.

mod file;
mod memory;

pub use file::FileStore;
pub use memory::MemoryStore;

use crate::budget::RateBudget;
use crate::regime::{Regime, CURRENT_SLOT};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A cached raw API response with its bookkeeping fields
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheRecord {
    /// When the response was fetched
    pub fetched_at: DateTime<Utc>,
    /// The partition key this record was stored under
    pub regime_key: String,
    /// The raw API response document, stored whole
    pub payload: serde_json::Value,
    /// The IANA timezone name declared by the response
    pub timezone: String,
}

/// Errors from the persistence collaborator.
///
/// A read failure is surfaced as an error, never folded into "absent": the
/// caller must be able to tell a miss from a broken store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Underlying I/O failure reading or writing a record
    #[error("store I/O failure: {0}")]
    Io(#[from] std::io::Error),

    /// A stored record exists but cannot be decoded
    #[error("stored record '{key}' is corrupt: {source}")]
    Corrupt {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    /// A record could not be encoded for storage
    #[error("failed to encode record '{key}': {source}")]
    Encode {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    /// The store's internal lock was poisoned by a panicking writer
    #[error("store lock poisoned")]
    Poisoned,
}

/// The persistence collaborator contract.
///
/// Any document store, embedded key-value store, or in-memory map can sit
/// behind this. Implementations must make each write atomic per record: a
/// reader never observes a half-written record.
pub trait StoreBackend: Send + Sync {
    /// Looks up a record by partition and key.
    fn find_one(&self, partition: Regime, key: &str) -> Result<Option<CacheRecord>, StoreError>;

    /// Inserts or replaces the record under the key.
    fn upsert(&self, partition: Regime, key: &str, record: CacheRecord) -> Result<(), StoreError>;

    /// Inserts the record only if the key is vacant. Returns whether the
    /// record was written; an occupied key is a no-op, not an error.
    fn insert_if_absent(
        &self,
        partition: Regime,
        key: &str,
        record: CacheRecord,
    ) -> Result<bool, StoreError>;
}

impl<S: StoreBackend + ?Sized> StoreBackend for std::sync::Arc<S> {
    fn find_one(&self, partition: Regime, key: &str) -> Result<Option<CacheRecord>, StoreError> {
        (**self).find_one(partition, key)
    }

    fn upsert(&self, partition: Regime, key: &str, record: CacheRecord) -> Result<(), StoreError> {
        (**self).upsert(partition, key, record)
    }

    fn insert_if_absent(
        &self,
        partition: Regime,
        key: &str,
        record: CacheRecord,
    ) -> Result<bool, StoreError> {
        (**self).insert_if_absent(partition, key, record)
    }
}

/// Write-policy layer over a [`StoreBackend`]
#[derive(Debug)]
pub struct TieredStore<S> {
    backend: S,
    budget: RateBudget,
}

impl<S: StoreBackend> TieredStore<S> {
    pub fn new(backend: S, budget: RateBudget) -> Self {
        Self { backend, budget }
    }

    /// Looks up the record for (regime, key), surfacing store failures.
    pub fn lookup(&self, regime: Regime, key: &str) -> Result<Option<CacheRecord>, StoreError> {
        self.backend.find_one(regime, key)
    }

    /// Whether a record still satisfies the regime's TTL at `now`.
    ///
    /// HISTORICAL records are always fresh once present; the past does not
    /// change. A `fetched_at` in the future (clock adjustment) counts as
    /// age zero rather than tripping the staleness check.
    pub fn is_fresh(&self, record: &CacheRecord, regime: Regime, now: DateTime<Utc>) -> bool {
        match self.budget.ttl(regime) {
            None => true,
            Some(ttl) => {
                let age = (now - record.fetched_at).to_std().unwrap_or_default();
                age <= ttl
            }
        }
    }

    /// Writes a record under the regime's policy.
    pub fn write(&self, regime: Regime, key: &str, record: CacheRecord) -> Result<(), StoreError> {
        match regime {
            // One slot; the previous value is discarded, not archived
            Regime::Current => self.backend.upsert(regime, CURRENT_SLOT, record),
            // A later intraday fetch supersedes the earlier one
            Regime::Forecast => self.backend.upsert(regime, key, record),
            // Immutable fact once observed; occupied key is a no-op
            Regime::Historical => self
                .backend
                .insert_if_absent(regime, key, record)
                .map(|_| ()),
        }
    }
}
