//! Two-tier key/value cache: an in-process map in front of one JSON file per key.
//!
//! Freshness is decided at read time from the caller-supplied TTL, so the same
//! stored payload can serve callers with different staleness tolerances.
//! Expired or unreadable records are treated as absent, never as errors.

use crate::domain::ports::Clock;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> f64 {
        chrono::Utc::now().timestamp_millis() as f64 / 1000.0
    }
}

/// On-disk (and in-memory) record layout.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheRecord {
    pub stored_at: f64,
    pub payload: Value,
}

impl CacheRecord {
    fn is_fresh(&self, now: f64, ttl: Duration) -> bool {
        now - self.stored_at <= ttl.as_secs_f64()
    }
}

/// Maps a cache key to a file name that is safe on every platform we ship to.
pub fn cache_file_name(key: &str) -> String {
    let safe: String = key
        .chars()
        .map(|c| match c {
            '/' | '?' | '&' | '=' => '_',
            other => other,
        })
        .collect();
    format!("{}.json", safe)
}

pub struct OfferCache {
    memory: DashMap<String, CacheRecord>,
    dir: Option<PathBuf>,
    default_ttl: Duration,
    clock: Arc<dyn Clock>,
    write_seq: AtomicU64,
}

impl OfferCache {
    /// Cache backed by files under `dir`.
    pub fn new(dir: impl Into<PathBuf>, default_ttl: Duration) -> Self {
        Self::with_clock(Some(dir.into()), default_ttl, Arc::new(SystemClock))
    }

    /// Process-local cache without a durable tier.
    pub fn in_memory(default_ttl: Duration) -> Self {
        Self::with_clock(None, default_ttl, Arc::new(SystemClock))
    }

    pub fn with_clock(dir: Option<PathBuf>, default_ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            memory: DashMap::new(),
            dir,
            default_ttl,
            clock,
            write_seq: AtomicU64::new(0),
        }
    }

    fn path_for(&self, key: &str) -> Option<PathBuf> {
        self.dir.as_ref().map(|dir| dir.join(cache_file_name(key)))
    }

    /// Returns the payload stored under `key` if it is at most `ttl` old.
    pub fn get(&self, key: &str, ttl: Duration) -> Option<Value> {
        let now = self.clock.now();

        if let Some(record) = self.memory.get(key) {
            if record.is_fresh(now, ttl) {
                tracing::debug!("cache hit (memory): {}", key);
                return Some(record.payload.clone());
            }
        }

        let path = self.path_for(key)?;
        let record = match read_record(&path) {
            Some(record) => record,
            None => {
                tracing::debug!("cache miss: {}", key);
                return None;
            }
        };

        if !record.is_fresh(now, ttl) {
            tracing::debug!("cache expired: {}", key);
            return None;
        }

        tracing::debug!("cache hit (disk): {}", key);
        let payload = record.payload.clone();
        self.memory.insert(key.to_string(), record);
        Some(payload)
    }

    /// [`OfferCache::get`] with the process-wide default TTL.
    pub fn get_default(&self, key: &str) -> Option<Value> {
        self.get(key, self.default_ttl)
    }

    /// Typed read; a payload that no longer deserializes counts as a miss.
    pub fn get_as<T: serde::de::DeserializeOwned>(&self, key: &str, ttl: Duration) -> Option<T> {
        let payload = self.get(key, ttl)?;
        match serde_json::from_value(payload) {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::warn!("ignoring cached payload for {}: {}", key, e);
                None
            }
        }
    }

    /// Stores `payload` in memory, then on disk. Last writer wins.
    pub fn set(&self, key: &str, payload: Value) {
        let record = CacheRecord {
            stored_at: self.clock.now(),
            payload,
        };

        self.memory.insert(key.to_string(), record.clone());

        if let Some(path) = self.path_for(key) {
            if let Err(e) = self.write_record(&path, &record) {
                tracing::warn!("failed to persist cache entry {}: {}", key, e);
            }
        }
    }

    pub fn set_as<T: Serialize>(&self, key: &str, value: &T) {
        match serde_json::to_value(value) {
            Ok(payload) => self.set(key, payload),
            Err(e) => tracing::warn!("cannot cache {}: {}", key, e),
        }
    }

    /// Drops expired in-memory entries. Files are left for the next reader.
    pub fn evict_expired(&self, ttl: Duration) -> usize {
        let now = self.clock.now();
        let before = self.memory.len();
        self.memory.retain(|_, record| record.is_fresh(now, ttl));
        before - self.memory.len()
    }

    pub fn len(&self) -> usize {
        self.memory.len()
    }

    pub fn is_empty(&self) -> bool {
        self.memory.is_empty()
    }

    fn write_record(&self, path: &Path, record: &CacheRecord) -> std::io::Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        // Write then rename so concurrent readers never see a half-written file.
        let seq = self.write_seq.fetch_add(1, Ordering::Relaxed);
        let tmp = path.with_extension(format!("tmp.{}.{}", std::process::id(), seq));
        let data = serde_json::to_vec(record)?;
        fs::write(&tmp, data)?;
        fs::rename(&tmp, path)
    }
}

fn read_record(path: &Path) -> Option<CacheRecord> {
    let data = fs::read(path).ok()?;
    match serde_json::from_slice(&data) {
        Ok(record) => Some(record),
        Err(e) => {
            tracing::warn!("corrupt cache file {}: {}", path.display(), e);
            None
        }
    }
}


#[cfg(test)]
mod tests {
    use super::test_support::ManualClock;
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    fn cache_in(dir: &TempDir, clock: Arc<ManualClock>) -> OfferCache {
        OfferCache::with_clock(
            Some(dir.path().to_path_buf()),
            Duration::from_secs(300),
            clock,
        )
    }

    #[test]
    fn test_cache_file_name_is_filesystem_safe() {
        assert_eq!(
            cache_file_name("offers/search?origin=PAR&dest=ATH"),
            "offers_search_origin_PAR_dest_ATH.json"
        );
    }

    #[test]
    fn test_fresh_entry_is_returned_from_memory_and_disk() {
        let dir = TempDir::new().unwrap();
        let clock = Arc::new(ManualClock::new(1_000.0));
        let cache = cache_in(&dir, clock.clone());

        cache.set("k1", json!({"a": 1}));
        assert_eq!(cache.get("k1", Duration::from_secs(10)), Some(json!({"a": 1})));

        // A new instance over the same directory sees the durable record.
        let reopened = cache_in(&dir, clock);
        assert_eq!(reopened.get("k1", Duration::from_secs(10)), Some(json!({"a": 1})));
        assert_eq!(reopened.len(), 1);
    }

    #[test]
    fn test_ttl_is_evaluated_per_read() {
        let dir = TempDir::new().unwrap();
        let clock = Arc::new(ManualClock::new(1_000.0));
        let cache = cache_in(&dir, clock.clone());

        cache.set("k", json!([1, 2, 3]));
        clock.advance(60.0);

        assert!(cache.get("k", Duration::from_secs(30)).is_none());
        assert!(cache.get("k", Duration::from_secs(60)).is_some());
        assert!(cache.get("k", Duration::from_secs(3600)).is_some());
    }

    #[test]
    fn test_expired_entry_is_absent_until_rewritten() {
        let dir = TempDir::new().unwrap();
        let clock = Arc::new(ManualClock::new(1_000.0));
        let cache = cache_in(&dir, clock.clone());

        cache.set("k", json!("old"));
        clock.advance(301.0);
        assert!(cache.get_default("k").is_none());

        cache.set("k", json!("new"));
        assert_eq!(cache.get_default("k"), Some(json!("new")));
    }

    #[test]
    fn test_corrupt_record_is_a_miss() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join(cache_file_name("broken")), b"{not json").unwrap();

        let cache = cache_in(&dir, Arc::new(ManualClock::new(1_000.0)));
        assert!(cache.get("broken", Duration::from_secs(300)).is_none());
    }

    #[test]
    fn test_durable_record_format() {
        let dir = TempDir::new().unwrap();
        let cache = cache_in(&dir, Arc::new(ManualClock::new(1_234.5)));
        cache.set("fmt", json!({"x": true}));

        let raw = std::fs::read_to_string(dir.path().join("fmt.json")).unwrap();
        let value: Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(value["storedAt"], json!(1_234.5));
        assert_eq!(value["payload"], json!({"x": true}));
    }

    #[test]
    fn test_evict_expired_only_touches_memory() {
        let clock = Arc::new(ManualClock::new(0.0));
        let cache = OfferCache::with_clock(None, Duration::from_secs(5), clock.clone());
        cache.set("a", json!(1));
        clock.advance(10.0);
        cache.set("b", json!(2));

        assert_eq!(cache.evict_expired(Duration::from_secs(5)), 1);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_concurrent_writers_last_one_wins() {
        let dir = TempDir::new().unwrap();
        let cache = Arc::new(OfferCache::new(dir.path(), Duration::from_secs(300)));

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let cache = Arc::clone(&cache);
                std::thread::spawn(move || cache.set("shared", json!(i)))
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let value = cache.get_default("shared").unwrap();
        assert!(value.as_i64().unwrap() < 8);
    }
}
