//! In-process fast cache tier.
//!
//! A concurrent map with no background maintenance; expiry is enforced by
//! the manager at read time.

use super::{CacheNamespace, CacheRecord};
use dashmap::DashMap;

/// Fast in-process tier.
pub struct MemoryTier {
    records: DashMap<(CacheNamespace, String), CacheRecord>,
}

impl MemoryTier {
    /// Create an empty fast tier.
    pub fn new() -> Self {
        Self {
            records: DashMap::new(),
        }
    }

    /// Look up a record; expiry is the caller's concern.
    pub fn get(&self, namespace: CacheNamespace, key: &str) -> Option<CacheRecord> {
        self.records
            .get(&(namespace, key.to_string()))
            .map(|r| r.clone())
    }

    /// Insert or replace a record.
    pub fn insert(&self, namespace: CacheNamespace, key: &str, record: CacheRecord) {
        self.records.insert((namespace, key.to_string()), record);
    }

    /// Remove a record if present.
    pub fn remove(&self, namespace: CacheNamespace, key: &str) {
        self.records.remove(&(namespace, key.to_string()));
    }

    /// Remove every record whose key starts with `prefix`, in all namespaces.
    pub fn remove_prefix(&self, prefix: &str) {
        self.records.retain(|(_, key), _| !key.starts_with(prefix));
    }

    /// Number of records currently held.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the tier holds no records.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl Default for MemoryTier {
    fn default() -> Self {
        Self::new()
    }
}
