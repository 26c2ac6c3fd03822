//! In-memory [`CacheStore`] backend.
//!
//! Mirrors the observable semantics of the Redis backend closely enough to
//! back the full test suite: lazy expiry on access, counters stored as
//! stringified integers, TTL applied only when an increment creates its
//! counter.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use parking_lot::Mutex;

use portico_state::error::CacheError;
use portico_state::store::CacheStore;

#[derive(Debug, Clone)]
struct Entry {
    value: String,
    expires_at: Option<Instant>,
}

impl Entry {
    fn expired(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|at| at <= now)
    }
}

/// In-memory cache store.
#[derive(Debug, Default)]
pub struct MemoryCacheStore {
    entries: Mutex<HashMap<String, Entry>>,
}

impl MemoryCacheStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Read a live entry, dropping it if it has expired.
    fn live_entry(entries: &mut HashMap<String, Entry>, key: &str, now: Instant) -> Option<Entry> {
        match entries.get(key) {
            Some(entry) if entry.expired(now) => {
                entries.remove(key);
                None
            }
            Some(entry) => Some(entry.clone()),
            None => None,
        }
    }
}

#[async_trait]
impl CacheStore for MemoryCacheStore {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        let mut entries = self.entries.lock();
        Ok(Self::live_entry(&mut entries, key, Instant::now()).map(|e| e.value))
    }

    async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> Result<(), CacheError> {
        let entry = Entry {
            value: value.to_owned(),
            expires_at: ttl.map(|d| Instant::now() + d),
        };
        self.entries.lock().insert(key.to_owned(), entry);
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<bool, CacheError> {
        let mut entries = self.entries.lock();
        let existed = Self::live_entry(&mut entries, key, Instant::now()).is_some();
        entries.remove(key);
        Ok(existed)
    }

    async fn increment(
        &self,
        key: &str,
        delta: i64,
        ttl_if_new: Option<Duration>,
    ) -> Result<i64, CacheError> {
        let now = Instant::now();
        let mut entries = self.entries.lock();

        let current = Self::live_entry(&mut entries, key, now);
        let new_value = match &current {
            Some(entry) => {
                let parsed: i64 = entry
                    .value
                    .parse()
                    .map_err(|_| CacheError::Backend(format!("key '{key}' is not a counter")))?;
                parsed + delta
            }
            None => delta,
        };

        let expires_at = match current {
            Some(entry) => entry.expires_at,
            None => ttl_if_new.map(|d| now + d),
        };

        entries.insert(
            key.to_owned(),
            Entry {
                value: new_value.to_string(),
                expires_at,
            },
        );
        Ok(new_value)
    }

    async fn ttl(&self, key: &str) -> Result<Option<Duration>, CacheError> {
        let now = Instant::now();
        let mut entries = self.entries.lock();
        Ok(Self::live_entry(&mut entries, key, now)
            .and_then(|e| e.expires_at)
            .map(|at| at.saturating_duration_since(now)))
    }

    async fn ping(&self) -> Result<(), CacheError> {
        Ok(())
    }
}
