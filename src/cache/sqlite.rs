//! Durable SQLite cache tier.
//!
//! Stores records as `(namespace, key) -> (value, created_at, ttl_seconds)`
//! so cached artifacts survive a process restart.

use super::{CacheNamespace, CacheRecord};
use crate::error::{GjenlydError, Result};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection};
use std::path::Path;
use std::sync::Mutex;
use tracing::{debug, info};

/// Durable tier backed by SQLite.
pub struct SqliteTier {
    conn: Mutex<Connection>,
}

impl SqliteTier {
    /// Open (or create) the durable tier at the given path.
    pub fn new(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)?;

        // WAL keeps concurrent readers cheap
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;
        Self::create_schema(&conn)?;

        info!("Initialized durable cache tier at {:?}", path);

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Create an in-memory durable tier (useful for testing).
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Self::create_schema(&conn)?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn create_schema(conn: &Connection) -> Result<()> {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS records (
                namespace TEXT NOT NULL,
                key TEXT NOT NULL,
                value BLOB NOT NULL,
                created_at TEXT NOT NULL,
                ttl_seconds INTEGER NOT NULL,
                PRIMARY KEY (namespace, key)
            );

            CREATE INDEX IF NOT EXISTS idx_records_key ON records(key);
            "#,
        )?;
        Ok(())
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| GjenlydError::Cache(format!("failed to acquire lock: {}", e)))
    }

    /// Look up a record; expiry is the caller's concern.
    pub fn get(&self, namespace: CacheNamespace, key: &str) -> Result<Option<CacheRecord>> {
        let conn = self.lock()?;

        let result = conn.query_row(
            "SELECT value, created_at, ttl_seconds FROM records WHERE namespace = ?1 AND key = ?2",
            params![namespace.as_str(), key],
            |row| {
                let value: Vec<u8> = row.get(0)?;
                let created_at: String = row.get(1)?;
                let ttl_seconds: u64 = row.get(2)?;
                Ok((value, created_at, ttl_seconds))
            },
        );

        match result {
            Ok((value, created_str, ttl_seconds)) => {
                let created_at = DateTime::parse_from_rfc3339(&created_str)
                    .map(|dt| dt.with_timezone(&Utc))
                    .unwrap_or_else(|_| Utc::now());
                Ok(Some(CacheRecord {
                    value,
                    created_at,
                    ttl_seconds,
                }))
            }
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Insert or replace a record.
    pub fn put(&self, namespace: CacheNamespace, key: &str, record: &CacheRecord) -> Result<()> {
        let conn = self.lock()?;

        conn.execute(
            r#"
            INSERT OR REPLACE INTO records (namespace, key, value, created_at, ttl_seconds)
            VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
            params![
                namespace.as_str(),
                key,
                record.value,
                record.created_at.to_rfc3339(),
                record.ttl_seconds,
            ],
        )?;

        debug!("Durable tier stored {}:{}", namespace, key);
        Ok(())
    }

    /// Remove a record if present.
    pub fn delete(&self, namespace: CacheNamespace, key: &str) -> Result<()> {
        let conn = self.lock()?;
        conn.execute(
            "DELETE FROM records WHERE namespace = ?1 AND key = ?2",
            params![namespace.as_str(), key],
        )?;
        Ok(())
    }

    /// Remove every record whose key starts with `prefix`, in all namespaces.
    pub fn delete_prefix(&self, prefix: &str) -> Result<usize> {
        let conn = self.lock()?;
        let deleted = conn.execute(
            "DELETE FROM records WHERE substr(key, 1, length(?1)) = ?1",
            params![prefix],
        )?;
        debug!("Durable tier dropped {} records under {}", deleted, prefix);
        Ok(deleted)
    }

    /// Number of records currently stored.
    pub fn len(&self) -> Result<usize> {
        let conn = self.lock()?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM records", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    /// Whether the tier holds no records.
    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }
}
