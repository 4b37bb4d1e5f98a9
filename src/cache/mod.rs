//! Two-tier, TTL-bounded, content-addressed cache.
//!
//! Every expensive artifact (embeddings, transcripts, query results) goes
//! through the [`CacheManager`]: a fast in-process tier backed by a durable
//! SQLite tier. Keys are derived from content, never random, so identical
//! inputs always land on the same record. Expiry is lazy: the read that
//! finds a stale record evicts it from both tiers.

mod memory;
mod sqlite;

pub use memory::MemoryTier;
pub use sqlite::SqliteTier;

use crate::config::Settings;
use crate::error::Result;
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use dashmap::DashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, instrument};

/// Artifact kind, kept separate so keys cannot collide across kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CacheNamespace {
    Embedding,
    Transcript,
    Query,
}

impl CacheNamespace {
    pub fn as_str(&self) -> &'static str {
        match self {
            CacheNamespace::Embedding => "embedding",
            CacheNamespace::Transcript => "transcript",
            CacheNamespace::Query => "query",
        }
    }
}

impl std::fmt::Display for CacheNamespace {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A cached value with its creation time and time-to-live.
#[derive(Debug, Clone)]
pub struct CacheRecord {
    /// Opaque serialized payload.
    pub value: Vec<u8>,
    /// When the record was written.
    pub created_at: DateTime<Utc>,
    /// Lifetime in seconds; past it the record behaves as a miss.
    pub ttl_seconds: u64,
}

impl CacheRecord {
    /// A record is expired once `now > created_at + ttl`.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        let ttl = ChronoDuration::seconds(self.ttl_seconds.min(i64::MAX as u64) as i64);
        now > self.created_at + ttl
    }
}

/// Two-tier cache manager shared by all document pipelines.
///
/// Same-key operations are serialized through a per-key async mutex;
/// distinct keys proceed fully in parallel. There is no global lock.
pub struct CacheManager {
    memory: MemoryTier,
    durable: SqliteTier,
    locks: DashMap<String, Arc<Mutex<()>>>,
}

impl CacheManager {
    /// Create a cache manager with the durable tier from settings.
    pub fn new(settings: &Settings) -> Result<Self> {
        Ok(Self {
            memory: MemoryTier::new(),
            durable: SqliteTier::new(&settings.cache_path())?,
            locks: DashMap::new(),
        })
    }

    /// Create a fully in-memory cache manager (useful for testing).
    pub fn in_memory() -> Result<Self> {
        Ok(Self {
            memory: MemoryTier::new(),
            durable: SqliteTier::in_memory()?,
            locks: DashMap::new(),
        })
    }

    fn key_lock(&self, namespace: CacheNamespace, key: &str) -> Arc<Mutex<()>> {
        let full = format!("{}:{}", namespace, key);
        self.locks
            .entry(full)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// Look up a value. Fast tier first; a durable hit is promoted into the
    /// fast tier. An expired record is evicted from both tiers and reported
    /// as a miss.
    #[instrument(skip(self), fields(namespace = %namespace))]
    pub async fn get(&self, namespace: CacheNamespace, key: &str) -> Result<Option<Vec<u8>>> {
        let lock = self.key_lock(namespace, key);
        let _guard = lock.lock().await;
        self.get_locked(namespace, key)
    }

    /// Write a value through both tiers.
    #[instrument(skip(self, value), fields(namespace = %namespace, bytes = value.len()))]
    pub async fn put(
        &self,
        namespace: CacheNamespace,
        key: &str,
        value: Vec<u8>,
        ttl: Duration,
    ) -> Result<()> {
        let lock = self.key_lock(namespace, key);
        let _guard = lock.lock().await;
        self.put_locked(namespace, key, value, ttl)
    }

    /// Return the cached value for `key`, or run `compute`, store its result
    /// with `ttl`, and return it. The per-key lock is held across the whole
    /// lookup-compute-store sequence, so one key computes at most once while
    /// other keys proceed in parallel.
    pub async fn get_or_compute<F, Fut>(
        &self,
        namespace: CacheNamespace,
        key: &str,
        ttl: Duration,
        compute: F,
    ) -> Result<Vec<u8>>
    where
        F: FnOnce() -> Fut + Send,
        Fut: Future<Output = Result<Vec<u8>>> + Send,
    {
        let lock = self.key_lock(namespace, key);
        let _guard = lock.lock().await;

        if let Some(value) = self.get_locked(namespace, key)? {
            return Ok(value);
        }

        let value = compute().await?;
        self.put_locked(namespace, key, value.clone(), ttl)?;
        Ok(value)
    }

    /// Remove one record from both tiers.
    pub async fn invalidate(&self, namespace: CacheNamespace, key: &str) -> Result<()> {
        let lock = self.key_lock(namespace, key);
        let _guard = lock.lock().await;
        self.memory.remove(namespace, key);
        self.durable.delete(namespace, key)?;
        Ok(())
    }

    /// Remove every record whose key starts with `prefix`, in all
    /// namespaces and both tiers. Used to drop one document's artifacts
    /// before re-processing.
    pub async fn invalidate_prefix(&self, prefix: &str) -> Result<()> {
        self.memory.remove_prefix(prefix);
        let deleted = self.durable.delete_prefix(prefix)?;
        debug!("Invalidated {} durable records under prefix {}", deleted, prefix);
        Ok(())
    }

    fn get_locked(&self, namespace: CacheNamespace, key: &str) -> Result<Option<Vec<u8>>> {
        let now = Utc::now();

        if let Some(record) = self.memory.get(namespace, key) {
            if record.is_expired(now) {
                self.memory.remove(namespace, key);
                self.durable.delete(namespace, key)?;
                return Ok(None);
            }
            return Ok(Some(record.value));
        }

        match self.durable.get(namespace, key)? {
            Some(record) => {
                if record.is_expired(now) {
                    self.durable.delete(namespace, key)?;
                    return Ok(None);
                }
                // promote for subsequent reads
                self.memory.insert(namespace, key, record.clone());
                Ok(Some(record.value))
            }
            None => Ok(None),
        }
    }

    fn put_locked(
        &self,
        namespace: CacheNamespace,
        key: &str,
        value: Vec<u8>,
        ttl: Duration,
    ) -> Result<()> {
        let record = CacheRecord {
            value,
            created_at: Utc::now(),
            ttl_seconds: ttl.as_secs(),
        };
        self.memory.insert(namespace, key, record.clone());
        self.durable.put(namespace, key, &record)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn test_put_then_get() {
        let cache = CacheManager::in_memory().unwrap();
        cache
            .put(
                CacheNamespace::Embedding,
                "k",
                b"value".to_vec(),
                Duration::from_secs(60),
            )
            .await
            .unwrap();

        let got = cache.get(CacheNamespace::Embedding, "k").await.unwrap();
        assert_eq!(got, Some(b"value".to_vec()));
    }

    #[tokio::test]
    async fn test_expired_record_is_a_miss_and_evicted() {
        let cache = CacheManager::in_memory().unwrap();
        cache
            .put(
                CacheNamespace::Query,
                "short-lived",
                b"v".to_vec(),
                Duration::from_secs(0),
            )
            .await
            .unwrap();

        tokio::time::sleep(Duration::from_millis(50)).await;

        assert!(cache
            .get(CacheNamespace::Query, "short-lived")
            .await
            .unwrap()
            .is_none());
        // eviction happened in both tiers on that read
        assert!(cache.memory.get(CacheNamespace::Query, "short-lived").is_none());
        assert!(cache
            .durable
            .get(CacheNamespace::Query, "short-lived")
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_durable_hit_is_promoted() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cache.db");

        let mut settings = Settings::default();
        settings.cache.sqlite_path = path.to_string_lossy().to_string();

        {
            let cache = CacheManager::new(&settings).unwrap();
            cache
                .put(
                    CacheNamespace::Embedding,
                    "warm",
                    b"persisted".to_vec(),
                    Duration::from_secs(600),
                )
                .await
                .unwrap();
        }

        // fresh process: empty fast tier, same durable file
        let cache = CacheManager::new(&settings).unwrap();
        assert!(cache.memory.is_empty());

        let got = cache.get(CacheNamespace::Embedding, "warm").await.unwrap();
        assert_eq!(got, Some(b"persisted".to_vec()));
        assert_eq!(cache.memory.len(), 1);
    }

    #[tokio::test]
    async fn test_invalidate_prefix_hits_both_tiers() {
        let cache = CacheManager::in_memory().unwrap();
        let ttl = Duration::from_secs(60);
        cache
            .put(CacheNamespace::Transcript, "doc-1", b"t".to_vec(), ttl)
            .await
            .unwrap();
        cache
            .put(CacheNamespace::Query, "doc-1:q", b"r".to_vec(), ttl)
            .await
            .unwrap();
        cache
            .put(CacheNamespace::Query, "doc-2:q", b"r2".to_vec(), ttl)
            .await
            .unwrap();

        cache.invalidate_prefix("doc-1").await.unwrap();

        assert!(cache.get(CacheNamespace::Transcript, "doc-1").await.unwrap().is_none());
        assert!(cache.get(CacheNamespace::Query, "doc-1:q").await.unwrap().is_none());
        assert!(cache.get(CacheNamespace::Query, "doc-2:q").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_concurrent_puts_leave_one_value_visible() {
        let cache = Arc::new(CacheManager::in_memory().unwrap());
        let ttl = Duration::from_secs(60);

        let mut handles = Vec::new();
        for i in 0..16u8 {
            let cache = Arc::clone(&cache);
            handles.push(tokio::spawn(async move {
                let value = vec![i; 128];
                cache
                    .put(CacheNamespace::Embedding, "contested", value, ttl)
                    .await
                    .unwrap();
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        let got = cache
            .get(CacheNamespace::Embedding, "contested")
            .await
            .unwrap()
            .unwrap();
        // exactly one write is visible, never a corrupted hybrid
        assert_eq!(got.len(), 128);
        assert!(got.iter().all(|b| *b == got[0]));

        // both tiers agree after the dust settles
        let durable = cache
            .durable
            .get(CacheNamespace::Embedding, "contested")
            .unwrap()
            .unwrap();
        assert_eq!(durable.value, got);
    }

    #[tokio::test]
    async fn test_get_or_compute_runs_once_per_key() {
        let cache = Arc::new(CacheManager::in_memory().unwrap());
        let calls = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for _ in 0..8 {
            let cache = Arc::clone(&cache);
            let calls = Arc::clone(&calls);
            handles.push(tokio::spawn(async move {
                cache
                    .get_or_compute(
                        CacheNamespace::Embedding,
                        "memoized",
                        Duration::from_secs(60),
                        || async move {
                            calls.fetch_add(1, Ordering::SeqCst);
                            Ok(b"computed".to_vec())
                        },
                    )
                    .await
                    .unwrap()
            }));
        }

        for handle in handles {
            assert_eq!(handle.await.unwrap(), b"computed".to_vec());
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
