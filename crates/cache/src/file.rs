//! Durable on-disk cache

use crate::clock::{expiry, Clock, SystemClock};
use crate::Cache;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use provmirror_errors::{Error, StorageError};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::fs;

static TEMP_COUNTER: AtomicU64 = AtomicU64::new(0);

/// On-disk envelope around a cached record
#[derive(Serialize, Deserialize)]
struct Envelope {
    expires_at: DateTime<Utc>,
    value: serde_json::Value,
}

/// Cache persisted as one JSON file per key, surviving restarts
#[derive(Clone)]
pub struct FileCache {
    cache_dir: PathBuf,
    clock: Arc<dyn Clock>,
}

impl FileCache {
    /// Create a new cache rooted at `cache_dir`
    pub fn new(cache_dir: impl AsRef<Path>) -> Self {
        Self::with_clock(cache_dir, Arc::new(SystemClock))
    }

    pub fn with_clock(cache_dir: impl AsRef<Path>, clock: Arc<dyn Clock>) -> Self {
        Self {
            cache_dir: cache_dir.as_ref().to_path_buf(),
            clock,
        }
    }

    /// Entry file for a key; keys are hashed so any string is a valid key
    fn entry_path(&self, key: &str) -> PathBuf {
        let name = blake3::hash(key.as_bytes()).to_hex();
        self.cache_dir.join(format!("{name}.json"))
    }
}

impl std::fmt::Debug for FileCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileCache")
            .field("cache_dir", &self.cache_dir)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl Cache for FileCache {
    async fn get_raw(&self, key: &str) -> Option<Vec<u8>> {
        let path = self.entry_path(key);
        let content = fs::read(&path).await.ok()?;

        let Ok(envelope) = serde_json::from_slice::<Envelope>(&content) else {
            tracing::debug!(key, path = %path.display(), "removing corrupted cache entry");
            let _ = fs::remove_file(&path).await;
            return None;
        };

        if envelope.expires_at <= self.clock.now() {
            let _ = fs::remove_file(&path).await;
            return None;
        }

        serde_json::to_vec(&envelope.value).ok()
    }

    async fn set_raw(&self, key: &str, value: Vec<u8>, ttl: Duration) -> Result<(), Error> {
        fs::create_dir_all(&self.cache_dir)
            .await
            .map_err(|e| StorageError::IoError {
                message: format!("failed to create cache dir: {e}"),
            })?;

        let envelope = Envelope {
            expires_at: expiry(self.clock.now(), ttl),
            value: serde_json::from_slice(&value)?,
        };
        let json = serde_json::to_vec(&envelope)?;

        let path = self.entry_path(key);

        // Write to temporary file first
        let temp_path = path.with_extension(format!(
            "{}.{}.tmp",
            std::process::id(),
            TEMP_COUNTER.fetch_add(1, Ordering::Relaxed)
        ));
        fs::write(&temp_path, &json)
            .await
            .map_err(|e| StorageError::IoError {
                message: format!("failed to write cache: {e}"),
            })?;

        // Atomic rename
        fs::rename(&temp_path, &path)
            .await
            .map_err(|e| StorageError::IoError {
                message: format!("failed to rename cache file: {e}"),
            })?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{CacheExt, ManualClock};
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_cache_operations() {
        let temp = tempdir().unwrap();
        let clock = ManualClock::default();
        let cache = FileCache::with_clock(temp.path(), Arc::new(clock.clone()));

        // Initially no entry
        assert!(cache.get::<String>("acme-widget-versions").await.is_none());

        cache
            .set("acme-widget-versions", &"listing".to_string(), Duration::from_secs(3600))
            .await
            .unwrap();
        assert_eq!(
            cache.get::<String>("acme-widget-versions").await.as_deref(),
            Some("listing")
        );

        clock.advance(Duration::from_secs(3600));
        assert!(cache.get::<String>("acme-widget-versions").await.is_none());
    }

    #[tokio::test]
    async fn test_survives_new_instance() {
        let temp = tempdir().unwrap();
        FileCache::new(temp.path())
            .set("k", &42u32, Duration::from_secs(60))
            .await
            .unwrap();

        let reopened = FileCache::new(temp.path());
        assert_eq!(reopened.get::<u32>("k").await, Some(42));
    }

    #[tokio::test]
    async fn test_corrupted_entry_is_a_miss() {
        let temp = tempdir().unwrap();
        let cache = FileCache::new(temp.path());
        cache.set("k", &1u8, Duration::from_secs(60)).await.unwrap();

        tokio::fs::write(cache.entry_path("k"), b"{not json").await.unwrap();
        assert_eq!(cache.get::<u8>("k").await, None);
        assert!(!cache.entry_path("k").exists());
    }
}
