use std::collections::HashMap;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use serde_json::Value;
use sha2::{Digest, Sha256};

#[derive(Debug, Clone)]
struct CacheEntry {
    stored_at: Instant,
    payload: Value,
}

/// TTL-bound memoization of response payloads, keyed by a stable hash of the
/// request JSON. Constructed once at startup and handed to the router state;
/// a zero TTL disables caching entirely.
#[derive(Debug)]
pub struct ResponseCache {
    ttl: Duration,
    entries: Mutex<HashMap<String, CacheEntry>>,
}

impl ResponseCache {
    pub fn new(ttl: Duration) -> Self {
        ResponseCache {
            ttl,
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Derives the cache key for a request payload. serde_json objects keep
    /// their keys sorted, so serialization is canonical: semantically equal
    /// requests hash identically no matter the field insertion order.
    pub fn key_for(payload: &Value) -> String {
        let digest = Sha256::digest(payload.to_string().as_bytes());
        format!("{:x}", digest)
    }

    pub fn get(&self, key: &str) -> Option<Value> {
        if self.ttl.is_zero() {
            return None;
        }

        let mut entries = self.entries.lock();
        match entries.get(key) {
            Some(entry) if entry.stored_at.elapsed() < self.ttl => Some(entry.payload.clone()),
            Some(_) => {
                entries.remove(key);
                None
            }
            None => None,
        }
    }

    pub fn set(&self, key: String, payload: Value) {
        if self.ttl.is_zero() {
            return;
        }

        let entry = CacheEntry {
            stored_at: Instant::now(),
            payload,
        };
        self.entries.lock().insert(key, entry);
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    #[allow(dead_code)]
    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    /// Resets the cache; test lifecycles use this between cases.
    #[allow(dead_code)]
    pub fn clear(&self) {
        self.entries.lock().clear();
    }
}
