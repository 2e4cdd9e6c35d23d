//! In-memory TTL store for cached responses
//!
//! Provides a `TtlStore` that keeps JSON payloads keyed by string, each with
//! the time it was stored and its own time-to-live. Expired entries are never
//! returned and are purged the first time a read finds them.

use chrono::{DateTime, Duration, Utc};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::debug;

use super::clock::{Clock, SystemClock};

/// A single stored payload
#[derive(Debug, Clone)]
struct CacheEntry {
    /// The cached response body
    payload: Value,
    /// When the payload was stored
    stored_at: DateTime<Utc>,
    /// How long the payload stays live, in seconds
    ttl_seconds: u64,
}

impl CacheEntry {
    fn is_live(&self, now: DateTime<Utc>) -> bool {
        // Clamp so an absurd TTL cannot overflow chrono's range.
        let ttl = Duration::seconds(self.ttl_seconds.min(i64::MAX as u64 / 1000) as i64);
        now - self.stored_at < ttl
    }

    fn age(&self, now: DateTime<Utc>) -> Duration {
        now - self.stored_at
    }
}

/// Process-local cache of JSON payloads with per-entry expiry
///
/// Cloning a `TtlStore` yields another handle to the same entries. The map is
/// guarded by a mutex and every read-check-write sequence runs under a single
/// lock acquisition; the lock is never held across an await point.
///
/// When `max_entries` is set, inserting a new key into a full store first
/// drops expired entries and then, if still full, evicts the entry with the
/// oldest `stored_at`.
#[derive(Debug, Clone)]
pub struct TtlStore {
    entries: Arc<Mutex<HashMap<String, CacheEntry>>>,
    clock: Arc<dyn Clock>,
    max_entries: Option<usize>,
}

impl Default for TtlStore {
    fn default() -> Self {
        Self::new()
    }
}

impl TtlStore {
    /// Creates an unbounded store backed by the system clock
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    /// Creates an unbounded store that reads time from `clock`
    ///
    /// Useful for testing expiry without sleeping.
    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: Arc::new(Mutex::new(HashMap::new())),
            clock,
            max_entries: None,
        }
    }

    /// Caps the number of entries; `0` leaves the store unbounded
    pub fn with_max_entries(mut self, max_entries: usize) -> Self {
        self.max_entries = (max_entries > 0).then_some(max_entries);
        self
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, CacheEntry>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Reads a live payload
    ///
    /// # Arguments
    /// * `key` - The cache key to read
    ///
    /// # Returns
    /// * `Some(Value)` if an entry exists and is younger than its TTL
    /// * `None` if the entry is missing or expired (an expired entry is removed)
    pub fn get(&self, key: &str) -> Option<Value> {
        let now = self.clock.now();
        let mut entries = self.lock();

        match entries.get(key) {
            Some(entry) if entry.is_live(now) => Some(entry.payload.clone()),
            Some(_) => {
                entries.remove(key);
                debug!(key, "purged expired cache entry on read");
                None
            }
            None => None,
        }
    }

    /// Stores a payload, replacing any previous entry for the key
    ///
    /// # Arguments
    /// * `key` - Unique identifier for the entry (e.g., "crypto_bitcoin,ethereum")
    /// * `payload` - The JSON body to cache
    /// * `ttl_seconds` - How long the entry stays live
    pub fn set(&self, key: &str, payload: Value, ttl_seconds: u64) {
        let now = self.clock.now();
        let mut entries = self.lock();

        if let Some(max) = self.max_entries {
            if !entries.contains_key(key) && entries.len() >= max {
                entries.retain(|_, entry| entry.is_live(now));

                if entries.len() >= max {
                    let oldest = entries
                        .iter()
                        .min_by_key(|(_, entry)| entry.stored_at)
                        .map(|(k, _)| k.clone());
                    if let Some(oldest) = oldest {
                        entries.remove(&oldest);
                        debug!(key = %oldest, "evicted oldest cache entry at capacity");
                    }
                }
            }
        }

        entries.insert(
            key.to_string(),
            CacheEntry {
                payload,
                stored_at: now,
                ttl_seconds,
            },
        );
    }

    /// Removes one entry, returning whether it existed
    pub fn delete(&self, key: &str) -> bool {
        self.lock().remove(key).is_some()
    }

    /// Removes every entry whose key contains `pattern`
    ///
    /// This is plain substring containment, not a glob or prefix match, so
    /// `"poll"` also removes `"polls-list:..."`. An empty pattern matches
    /// every key.
    ///
    /// # Returns
    /// The number of entries removed
    pub fn delete_matching(&self, pattern: &str) -> usize {
        let mut entries = self.lock();
        let before = entries.len();
        entries.retain(|key, _| !key.contains(pattern));
        before - entries.len()
    }

    /// Removes every entry
    pub fn clear_all(&self) {
        self.lock().clear();
    }

    /// Removes entries whose TTL has elapsed
    ///
    /// # Returns
    /// The number of entries removed
    pub fn purge_expired(&self) -> usize {
        let now = self.clock.now();
        let mut entries = self.lock();
        let before = entries.len();
        entries.retain(|_, entry| entry.is_live(now));
        before - entries.len()
    }

    /// Removes entries matching `pattern` that were stored more than `max_age` ago
    ///
    /// Used by the periodic sweep; liveness is not considered, only age.
    ///
    /// # Returns
    /// The number of entries removed
    pub fn purge_stale(&self, pattern: &str, max_age: Duration) -> usize {
        let now = self.clock.now();
        let mut entries = self.lock();
        let before = entries.len();
        entries.retain(|key, entry| !(key.contains(pattern) && entry.age(now) > max_age));
        before - entries.len()
    }

    /// Number of stored entries, including expired ones not yet purged
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Returns true if nothing is stored
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Sorted snapshot of the stored keys
    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.lock().keys().cloned().collect();
        keys.sort();
        keys
    }
}
