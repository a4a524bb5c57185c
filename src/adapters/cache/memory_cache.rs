use std::num::NonZeroUsize;
use std::sync::{RwLock, RwLockWriteGuard};
use std::time::{Duration, Instant};

use lru::LruCache;

use crate::ports::cache::RecordCache;

const FALLBACK_CAPACITY: NonZeroUsize = NonZeroUsize::new(256).unwrap();

struct Entry {
    payload: String,
    stored_at: Instant,
    ttl: Duration,
}

impl Entry {
    fn is_stale(&self, now: Instant) -> bool {
        now.duration_since(self.stored_at) >= self.ttl
    }
}

/// Serialized store records, least recently used evicted first. Each entry
/// carries its own TTL.
pub struct MemoryCache {
    entries: RwLock<LruCache<String, Entry>>,
}

impl MemoryCache {
    pub fn new(max_entries: usize) -> Self {
        let capacity = NonZeroUsize::new(max_entries).unwrap_or_else(|| {
            tracing::warn!(
                fallback = FALLBACK_CAPACITY.get(),
                "cache.max_entries is 0, using fallback capacity"
            );
            FALLBACK_CAPACITY
        });
        Self {
            entries: RwLock::new(LruCache::new(capacity)),
        }
    }

    /// A poisoned lock turns the cache into a pass-through.
    fn entries(&self, op: &'static str) -> Option<RwLockWriteGuard<'_, LruCache<String, Entry>>> {
        match self.entries.write() {
            Ok(guard) => Some(guard),
            Err(_) => {
                tracing::error!(op, "Record cache lock poisoned, bypassing cache");
                None
            }
        }
    }
}

impl RecordCache for MemoryCache {
    fn get(&self, key: &str) -> Option<String> {
        let mut entries = self.entries("get")?;
        if entries.peek(key)?.is_stale(Instant::now()) {
            entries.pop(key);
            tracing::debug!(key, "Cache entry expired");
            return None;
        }
        entries.get(key).map(|entry| entry.payload.clone())
    }

    fn set(&self, key: &str, value: &str, ttl: Duration) {
        if let Some(mut entries) = self.entries("set") {
            entries.put(
                key.to_owned(),
                Entry {
                    payload: value.to_owned(),
                    stored_at: Instant::now(),
                    ttl,
                },
            );
        }
    }
}
