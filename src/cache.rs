use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool};
use sqlx::Row;
use std::str::FromStr;

use crate::error::OptimizerError;

/// `get(key) -> entry?`, `put(key, entry, ttl)`. Two independent namespaces
/// are used in practice: the distance-matrix cache and the optimization-
/// result cache; callers pick the namespace via the prefix baked into
/// `cache_key`.
#[async_trait]
pub trait Cache: Send + Sync {
    async fn get(&self, key: &str) -> Option<String>;
    async fn put(&self, key: &str, value: &str, ttl: Duration);
}

/// SQLite-backed cache. Write-through, tolerant of concurrent writers
/// (last-writer-wins at a given key).
pub struct SqliteCache {
    pool: SqlitePool,
}

impl SqliteCache {
    pub async fn connect(database_url: &str) -> Result<Self, OptimizerError> {
        let options = SqliteConnectOptions::from_str(database_url)
            .map_err(|e| OptimizerError::InternalError(format!("bad cache DSN: {e}")))?
            .create_if_missing(true);
        let pool = SqlitePool::connect_with(options)
            .await
            .map_err(|e| OptimizerError::InternalError(format!("cache connect failed: {e}")))?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS cache_entries (
                cache_key TEXT PRIMARY KEY,
                value TEXT NOT NULL,
                expires_at TEXT NOT NULL
            )
            "#,
        )
        .execute(&pool)
        .await
        .map_err(|e| OptimizerError::InternalError(format!("cache migration failed: {e}")))?;

        Ok(Self { pool })
    }
}

#[async_trait]
impl Cache for SqliteCache {
    async fn get(&self, key: &str) -> Option<String> {
        let row = sqlx::query("SELECT value, expires_at FROM cache_entries WHERE cache_key = ?")
            .bind(key)
            .fetch_optional(&self.pool)
            .await
            .ok()
            .flatten()?;

        let expires_at: String = row.try_get("expires_at").ok()?;
        let expires_at: DateTime<Utc> = expires_at.parse().ok()?;
        if expires_at < Utc::now() {
            return None;
        }
        row.try_get("value").ok()
    }

    async fn put(&self, key: &str, value: &str, ttl: Duration) {
        let expires_at = Utc::now() + chrono::Duration::seconds(ttl.as_secs() as i64);
        let _ = sqlx::query(
            r#"
            INSERT INTO cache_entries (cache_key, value, expires_at)
            VALUES (?, ?, ?)
            ON CONFLICT(cache_key) DO UPDATE SET value = excluded.value, expires_at = excluded.expires_at
            "#,
        )
        .bind(key)
        .bind(value)
        .bind(expires_at.to_rfc3339())
        .execute(&self.pool)
        .await;
    }
}

/// In-process cache used by tests and by `Config::testing` deployments that
/// do not want a SQLite file on disk. A poisoned lock degrades to a miss.
#[derive(Default)]
pub struct InMemoryCache {
    entries: std::sync::Mutex<std::collections::HashMap<String, (String, DateTime<Utc>)>>,
}

impl InMemoryCache {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Cache for InMemoryCache {
    async fn get(&self, key: &str) -> Option<String> {
        let entries = self.entries.lock().ok()?;
        let (value, expires_at) = entries.get(key)?;
        if *expires_at < Utc::now() {
            return None;
        }
        Some(value.clone())
    }

    async fn put(&self, key: &str, value: &str, ttl: Duration) {
        if let Ok(mut entries) = self.entries.lock() {
            let expires_at = Utc::now() + chrono::Duration::seconds(ttl.as_secs() as i64);
            entries.insert(key.to_string(), (value.to_string(), expires_at));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn in_memory_cache_round_trips() {
        let cache = InMemoryCache::new();
        cache.put("k", "v", Duration::from_secs(60)).await;
        assert_eq!(cache.get("k").await.as_deref(), Some("v"));
    }

    #[tokio::test]
    async fn in_memory_cache_expires_entries() {
        let cache = InMemoryCache::new();
        cache.put("k", "v", Duration::from_secs(0)).await;
        tokio::time::sleep(Duration::from_millis(5)).await;
        assert_eq!(cache.get("k").await, None);
    }

    #[tokio::test]
    async fn in_memory_cache_miss_on_unknown_key() {
        let cache = InMemoryCache::new();
        assert_eq!(cache.get("missing").await, None);
    }
}
