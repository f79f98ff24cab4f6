//! Time-bounded memo for aggregate results.

use dashmap::DashMap;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

use crate::observability::metrics;

/// Cache key: method name plus a stable serialization of its params.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    method: String,
    params: String,
}

impl CacheKey {
    /// Derive a key. Equal params always produce the same key regardless of
    /// object key order.
    pub fn new(method: &str, params: &impl Serialize) -> Self {
        let params = serde_json::to_value(params)
            .map(|v| canonical(&v))
            .unwrap_or_default();
        Self {
            method: method.to_string(),
            params,
        }
    }

    pub fn method(&self) -> &str {
        &self.method
    }

    pub fn params(&self) -> &str {
        &self.params
    }
}

/// Compact JSON with object keys sorted at every level.
fn canonical(value: &Value) -> String {
    match value {
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            let fields: Vec<String> = keys
                .into_iter()
                .map(|k| format!("{}:{}", Value::String(k.clone()), canonical(&map[k])))
                .collect();
            format!("{{{}}}", fields.join(","))
        }
        Value::Array(items) => {
            let items: Vec<String> = items.iter().map(canonical).collect();
            format!("[{}]", items.join(","))
        }
        other => other.to_string(),
    }
}

/// A stored value and when it was stored.
#[derive(Debug, Clone)]
struct CacheEntry {
    data: Value,
    stored_at: Instant,
}

/// A thread-safe TTL cache.
#[derive(Debug, Clone)]
pub struct TtlCache {
    inner: Arc<DashMap<CacheKey, CacheEntry>>,
    ttl: Duration,
}

impl TtlCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            inner: Arc::new(DashMap::new()),
            ttl,
        }
    }

    /// Fresh value for `key`, or `None`. Expired entries are ignored, not removed.
    pub fn get(&self, key: &CacheKey) -> Option<Value> {
        let fresh = self
            .inner
            .get(key)
            .filter(|r| r.value().stored_at.elapsed() < self.ttl)
            .map(|r| r.value().data.clone());

        metrics::record_cache_lookup(fresh.is_some());
        tracing::trace!(method = %key.method, hit = fresh.is_some(), "Cache lookup");
        fresh
    }

    /// Store `data` under `key`, overwriting and restamping.
    pub fn set(&self, key: CacheKey, data: Value) {
        self.inner.insert(
            key,
            CacheEntry {
                data,
                stored_at: Instant::now(),
            },
        );
        metrics::record_cache_size(self.inner.len());
    }

    pub fn invalidate(&self, key: &CacheKey) {
        if self.inner.remove(key).is_some() {
            tracing::debug!(method = %key.method, params = %key.params, "Cache entry invalidated");
        }
        metrics::record_cache_size(self.inner.len());
    }

    /// Drop every entry for `method`, whatever its params.
    pub fn invalidate_method(&self, method: &str) {
        self.inner.retain(|k, _| k.method != method);
        tracing::debug!(method = %method, "Cache entries invalidated for method");
        metrics::record_cache_size(self.inner.len());
    }

    pub fn invalidate_all(&self) {
        self.inner.clear();
        tracing::debug!("Cache cleared");
        metrics::record_cache_size(0);
    }

    /// Physically remove expired entries.
    pub fn purge_expired(&self) -> usize {
        let before = self.inner.len();
        self.inner.retain(|_, e| e.stored_at.elapsed() < self.ttl);
        let removed = before.saturating_sub(self.inner.len());
        metrics::record_cache_size(self.inner.len());
        removed
    }

    /// Physically stored entries, fresh or not.
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// (fresh, expired) entry counts.
    pub fn summary(&self) -> (usize, usize) {
        let mut fresh = 0;
        let mut expired = 0;
        for r in self.inner.iter() {
            if r.value().stored_at.elapsed() < self.ttl {
                fresh += 1;
            } else {
                expired += 1;
            }
        }
        (fresh, expired)
    }
}
