//! Deterministic result cache with per-entry expiry.
//!
//! Keys are derived from the tool name, the argument *content*, and
//! the active context id. Argument mappings are canonicalized before
//! hashing: object keys contribute in sorted order at every nesting
//! level, while sequence order is preserved. Two calls with the same
//! content therefore hash identically regardless of key insertion
//! order, and switching context always changes the key.
//!
//! Expired entries are evicted lazily, on the read that observes them.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use indexmap::IndexMap;
use serde_json::{Map as JsonMap, Value};
use sha2::{Digest, Sha256};
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::debug;

use graphlink_types::ToolResult;

/// Default TTL for tools added to the policy without an explicit one.
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(60);

/// Compute the cache key for one invocation.
pub fn cache_key(tool: &str, arguments: &JsonMap<String, Value>, context_id: &str) -> String {
    let mut hasher = Sha256::new();
    hash_str(&mut hasher, tool);
    hash_str(&mut hasher, context_id);
    hash_object(&mut hasher, arguments);
    let digest = hasher.finalize();
    digest.iter().map(|byte| format!("{:02x}", byte)).collect()
}

fn hash_str(hasher: &mut Sha256, s: &str) {
    hasher.update((s.len() as u64).to_le_bytes());
    hasher.update(s.as_bytes());
}

fn hash_object(hasher: &mut Sha256, map: &JsonMap<String, Value>) {
    let mut keys: Vec<&String> = map.keys().collect();
    keys.sort();
    hasher.update([b'{']);
    hasher.update((keys.len() as u64).to_le_bytes());
    for key in keys {
        hash_str(hasher, key);
        hash_value(hasher, &map[key]);
    }
}

fn hash_value(hasher: &mut Sha256, value: &Value) {
    match value {
        Value::Null => hasher.update([b'n']),
        Value::Bool(b) => {
            hasher.update([b'b', *b as u8]);
        }
        Value::Number(n) => {
            hasher.update([b'#']);
            hash_str(hasher, &n.to_string());
        }
        Value::String(s) => {
            hasher.update([b's']);
            hash_str(hasher, s);
        }
        Value::Array(items) => {
            hasher.update([b'[']);
            hasher.update((items.len() as u64).to_le_bytes());
            for item in items {
                hash_value(hasher, item);
            }
        }
        Value::Object(map) => hash_object(hasher, map),
    }
}

struct CacheEntry {
    value: ToolResult,
    expires_at: Instant,
}

/// TTL cache mapping (tool, arguments, context) to a computed result.
///
/// The cache is agnostic to which tools are cacheable; callers consult
/// a [`CachePolicy`] before touching it at all.
pub struct ResultCache {
    entries: Mutex<HashMap<String, CacheEntry>>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl ResultCache {
    /// Create an empty cache.
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    /// Return the cached value if present and unexpired. An entry that
    /// is found but expired is evicted and reported absent.
    pub async fn lookup(
        &self,
        tool: &str,
        arguments: &JsonMap<String, Value>,
        context_id: &str,
    ) -> Option<ToolResult> {
        let key = cache_key(tool, arguments, context_id);
        let mut entries = self.entries.lock().await;
        match entries.get(&key) {
            Some(entry) if entry.expires_at > Instant::now() => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                debug!(tool, "cache hit");
                Some(entry.value.clone())
            }
            Some(_) => {
                entries.remove(&key);
                self.misses.fetch_add(1, Ordering::Relaxed);
                debug!(tool, "cache entry expired");
                None
            }
            None => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
        }
    }

    /// Insert or overwrite an entry expiring `ttl` from now.
    pub async fn store(
        &self,
        tool: &str,
        arguments: &JsonMap<String, Value>,
        value: ToolResult,
        ttl: Duration,
        context_id: &str,
    ) {
        let key = cache_key(tool, arguments, context_id);
        let mut entries = self.entries.lock().await;
        entries.insert(
            key,
            CacheEntry {
                value,
                expires_at: Instant::now() + ttl,
            },
        );
    }

    /// Remove every entry unconditionally.
    pub async fn clear(&self) {
        self.entries.lock().await.clear();
    }

    /// Snapshot the cache counters.
    pub async fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            entries: self.entries.lock().await.len(),
        }
    }
}

impl Default for ResultCache {
    fn default() -> Self {
        Self::new()
    }
}

/// Point-in-time cache counters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheStats {
    /// Lookups answered from the cache.
    pub hits: u64,
    /// Lookups that found nothing usable.
    pub misses: u64,
    /// Live entries, including any not yet lazily evicted.
    pub entries: usize,
}

impl CacheStats {
    /// Hit rate derived on read; `"0%"` before any lookup.
    pub fn hit_rate(&self) -> String {
        let total = self.hits + self.misses;
        if total == 0 {
            "0%".to_string()
        } else {
            format!("{:.0}%", self.hits as f64 / total as f64 * 100.0)
        }
    }
}

/// Allow-list of cacheable tool names with per-tool TTLs.
#[derive(Debug, Clone)]
pub struct CachePolicy {
    ttls: IndexMap<String, Duration>,
}

impl CachePolicy {
    /// Policy with no cacheable tools.
    pub fn empty() -> Self {
        Self { ttls: IndexMap::new() }
    }

    /// Mark a tool cacheable with an explicit TTL.
    pub fn allow(&mut self, tool: impl Into<String>, ttl: Duration) {
        self.ttls.insert(tool.into(), ttl);
    }

    /// Mark a tool cacheable with [`DEFAULT_CACHE_TTL`].
    pub fn allow_default(&mut self, tool: impl Into<String>) {
        self.allow(tool, DEFAULT_CACHE_TTL);
    }

    /// TTL for a tool, or `None` when the tool is not cacheable.
    pub fn ttl_for(&self, tool: &str) -> Option<Duration> {
        self.ttls.get(tool).copied()
    }
}

impl Default for CachePolicy {
    /// Built-in allow-list: slow-changing catalog/shape queries only.
    fn default() -> Self {
        let mut policy = Self::empty();
        policy.allow("get-schema", Duration::from_secs(300));
        policy.allow("describe-graph", Duration::from_secs(120));
        policy.allow("list-indexes", Duration::from_secs(60));
        policy
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn args(value: Value) -> JsonMap<String, Value> {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn key_ignores_object_key_order_at_every_depth() {
        let a = args(json!({"filter": {"lhs": 1, "rhs": 2}, "limit": 10}));
        let b = args(json!({"limit": 10, "filter": {"rhs": 2, "lhs": 1}}));
        assert_eq!(cache_key("query", &a, "ctx"), cache_key("query", &b, "ctx"));
    }

    #[test]
    fn key_changes_with_any_value() {
        let a = args(json!({"limit": 10}));
        let b = args(json!({"limit": 11}));
        assert_ne!(cache_key("query", &a, "ctx"), cache_key("query", &b, "ctx"));
    }

    #[test]
    fn key_preserves_sequence_order() {
        let a = args(json!({"ids": [1, 2]}));
        let b = args(json!({"ids": [2, 1]}));
        assert_ne!(cache_key("query", &a, "ctx"), cache_key("query", &b, "ctx"));
    }

    #[test]
    fn key_changes_with_context() {
        let a = args(json!({"limit": 10}));
        assert_ne!(cache_key("query", &a, "ctx-1"), cache_key("query", &a, "ctx-2"));
    }

    #[test]
    fn similar_scalars_do_not_collide() {
        // "1" (string) vs 1 (number) vs true must all differ.
        let s = args(json!({"v": "1"}));
        let n = args(json!({"v": 1}));
        let b = args(json!({"v": true}));
        let keys = [
            cache_key("t", &s, "c"),
            cache_key("t", &n, "c"),
            cache_key("t", &b, "c"),
        ];
        assert_ne!(keys[0], keys[1]);
        assert_ne!(keys[1], keys[2]);
        assert_ne!(keys[0], keys[2]);
    }

    #[tokio::test]
    async fn store_then_lookup_round_trips() {
        let cache = ResultCache::new();
        let arguments = args(json!({"q": "MATCH (n) RETURN n"}));
        cache
            .store("query", &arguments, ToolResult::text("rows"), Duration::from_secs(60), "ctx")
            .await;

        let found = cache.lookup("query", &arguments, "ctx").await;
        assert_eq!(found, Some(ToolResult::text("rows")));
        // Different context misses.
        assert!(cache.lookup("query", &arguments, "other").await.is_none());
    }

    #[tokio::test]
    async fn expired_entries_are_evicted_on_read() {
        let cache = ResultCache::new();
        let arguments = args(json!({"q": 1}));
        cache
            .store("query", &arguments, ToolResult::text("v"), Duration::from_millis(50), "ctx")
            .await;

        assert!(cache.lookup("query", &arguments, "ctx").await.is_some());
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(cache.lookup("query", &arguments, "ctx").await.is_none());
        assert_eq!(cache.stats().await.entries, 0);
    }

    #[tokio::test]
    async fn clear_removes_everything() {
        let cache = ResultCache::new();
        let arguments = args(json!({"q": 1}));
        cache
            .store("query", &arguments, ToolResult::text("v"), Duration::from_secs(60), "ctx")
            .await;
        cache.clear().await;
        assert!(cache.lookup("query", &arguments, "ctx").await.is_none());
    }

    #[tokio::test]
    async fn hit_rate_is_derived_on_read() {
        let cache = ResultCache::new();
        assert_eq!(cache.stats().await.hit_rate(), "0%");

        let arguments = args(json!({"q": 1}));
        cache
            .store("query", &arguments, ToolResult::text("v"), Duration::from_secs(60), "ctx")
            .await;
        cache.lookup("query", &arguments, "ctx").await;
        cache.lookup("query", &arguments, "other").await;
        assert_eq!(cache.stats().await.hit_rate(), "50%");
    }

    #[test]
    fn policy_allow_list_controls_eligibility() {
        let policy = CachePolicy::default();
        assert_eq!(policy.ttl_for("get-schema"), Some(Duration::from_secs(300)));
        assert!(policy.ttl_for("run-query").is_none());

        let mut policy = policy;
        policy.allow_default("run-query");
        assert_eq!(policy.ttl_for("run-query"), Some(DEFAULT_CACHE_TTL));
    }
}
