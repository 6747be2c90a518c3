use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use redis::AsyncCommands;
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};
use tracing::{debug, warn};
use uuid::Uuid;

/// Key-value backend behind the read-through cache.
/// Production uses Redis; tests swap in an in-memory fake.
#[async_trait]
pub trait CacheBackend: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>>;
    async fn set(&self, key: &str, value: &str, ttl_secs: u64) -> Result<()>;
    /// Deletes every key starting with `prefix`; returns how many were removed.
    async fn delete_prefix(&self, prefix: &str) -> Result<u64>;
}

/// Redis-backed implementation. Prefix invalidation is a SCAN + DEL loop,
/// never KEYS, so it stays incremental on a shared instance.
pub struct RedisBackend {
    client: redis::Client,
}

impl RedisBackend {
    pub fn new(client: redis::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl CacheBackend for RedisBackend {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let raw: Option<String> = conn.get(key).await?;
        Ok(raw)
    }

    async fn set(&self, key: &str, value: &str, ttl_secs: u64) -> Result<()> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        conn.set_ex::<_, _, ()>(key, value, ttl_secs).await?;
        Ok(())
    }

    async fn delete_prefix(&self, prefix: &str) -> Result<u64> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let pattern = format!("{prefix}*");
        let mut cursor: u64 = 0;
        let mut removed: u64 = 0;
        loop {
            let (next, keys): (u64, Vec<String>) = redis::cmd("SCAN")
                .arg(cursor)
                .arg("MATCH")
                .arg(&pattern)
                .arg("COUNT")
                .arg(100)
                .query_async(&mut conn)
                .await?;
            if !keys.is_empty() {
                removed += conn.del::<_, u64>(&keys).await?;
            }
            if next == 0 {
                break;
            }
            cursor = next;
        }
        Ok(removed)
    }
}

/// Read-through cache with deterministic keys and fault absorption.
///
/// Keys are laid out as `{resource}:owner:{owner_id}:{sha256(query)}` so that
/// a single prefix scoped to `{resource}:owner:{owner_id}:` captures every
/// list, default and by-id entry for that owner, however the query varies.
/// Backend failures never propagate: a failed read is a miss, a failed write
/// or invalidation is logged and swallowed.
#[derive(Clone)]
pub struct KeyCache {
    backend: Arc<dyn CacheBackend>,
    ttl_secs: u64,
}

impl KeyCache {
    pub fn new(backend: Arc<dyn CacheBackend>, ttl_secs: u64) -> Self {
        Self { backend, ttl_secs }
    }

    /// Deterministic cache key: the query is serialized with deep-sorted map
    /// keys, so semantically identical queries hash identically regardless of
    /// field ordering.
    pub fn key(&self, resource: &str, owner_id: Uuid, query: &Value) -> String {
        let canonical = canonical_string(query);
        let digest = Sha256::digest(canonical.as_bytes());
        format!("{resource}:owner:{owner_id}:{}", hex::encode(digest))
    }

    pub async fn get_json<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        match self.backend.get(key).await {
            Ok(Some(raw)) => match serde_json::from_str(&raw) {
                Ok(value) => {
                    debug!("cache hit: {key}");
                    Some(value)
                }
                Err(e) => {
                    warn!("cache entry for {key} failed to decode, treating as miss: {e}");
                    None
                }
            },
            Ok(None) => None,
            Err(e) => {
                warn!("cache read for {key} failed, treating as miss: {e}");
                None
            }
        }
    }

    pub async fn set_json<T: Serialize>(&self, key: &str, value: &T) {
        let raw = match serde_json::to_string(value) {
            Ok(raw) => raw,
            Err(e) => {
                warn!("cache value for {key} failed to encode, skipping: {e}");
                return;
            }
        };
        if let Err(e) = self.backend.set(key, &raw, self.ttl_secs).await {
            warn!("cache write for {key} failed, skipping: {e}");
        }
    }

    /// Drops every cached entry for one owner within one resource family.
    /// Called after every mutation, after the store write has committed.
    pub async fn invalidate_owner(&self, resource: &str, owner_id: Uuid) {
        let prefix = format!("{resource}:owner:{owner_id}:");
        match self.backend.delete_prefix(&prefix).await {
            Ok(removed) => debug!("invalidated {removed} cache entries under {prefix}"),
            Err(e) => warn!("cache invalidation under {prefix} failed, skipping: {e}"),
        }
    }
}

/// Serializes a JSON value with object keys sorted at every depth.
/// Explicit rather than relying on map ordering, which flips if any
/// dependency enables serde_json's `preserve_order` feature.
fn canonical_string(value: &Value) -> String {
    let mut out = String::new();
    write_canonical(value, &mut out);
    out
}

fn write_canonical(value: &Value, out: &mut String) {
    match value {
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            out.push('{');
            for (i, key) in keys.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                out.push_str(&Value::String((*key).clone()).to_string());
                out.push(':');
                write_canonical(&map[*key], out);
            }
            out.push('}');
        }
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_canonical(item, out);
            }
            out.push(']');
        }
        other => out.push_str(&other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn cache() -> KeyCache {
        KeyCache::new(
            Arc::new(crate::documents::testutil::MemoryCache::default()),
            300,
        )
    }

    #[test]
    fn test_canonical_sorts_keys() {
        let a = json!({"b": 1, "a": {"d": 4, "c": 3}});
        assert_eq!(canonical_string(&a), r#"{"a":{"c":3,"d":4},"b":1}"#);
    }

    #[test]
    fn test_key_order_independent() {
        let cache = cache();
        let owner = Uuid::new_v4();
        let k1 = cache.key("resumes", owner, &json!({"b": 1, "a": 2}));
        let k2 = cache.key("resumes", owner, &json!({"a": 2, "b": 1}));
        assert_eq!(k1, k2);
    }

    #[test]
    fn test_key_scoped_to_resource_and_owner() {
        let cache = cache();
        let owner = Uuid::new_v4();
        let other = Uuid::new_v4();
        let query = json!({"page": 1});
        let key = cache.key("resumes", owner, &query);
        assert!(key.starts_with(&format!("resumes:owner:{owner}:")));
        assert_ne!(key, cache.key("cover-letters", owner, &query));
        assert_ne!(key, cache.key("resumes", other, &query));
    }

    #[tokio::test]
    async fn test_roundtrip_and_prefix_invalidation() {
        let cache = cache();
        let owner = Uuid::new_v4();
        let other = Uuid::new_v4();
        let k1 = cache.key("resumes", owner, &json!({"op": "list", "page": 1}));
        let k2 = cache.key("resumes", owner, &json!({"op": "list", "page": 2}));
        let k3 = cache.key("resumes", other, &json!({"op": "list", "page": 1}));
        cache.set_json(&k1, &json!({"v": 1})).await;
        cache.set_json(&k2, &json!({"v": 2})).await;
        cache.set_json(&k3, &json!({"v": 3})).await;

        assert_eq!(cache.get_json::<Value>(&k1).await, Some(json!({"v": 1})));

        cache.invalidate_owner("resumes", owner).await;
        assert_eq!(cache.get_json::<Value>(&k1).await, None);
        assert_eq!(cache.get_json::<Value>(&k2).await, None);
        // other owner's entries survive
        assert_eq!(cache.get_json::<Value>(&k3).await, Some(json!({"v": 3})));
    }

    #[tokio::test]
    async fn test_backend_faults_absorbed() {
        let cache = KeyCache::new(
            Arc::new(crate::documents::testutil::FailingCache),
            300,
        );
        let key = cache.key("resumes", Uuid::new_v4(), &json!({"op": "get"}));
        // none of these panic or surface the backend error
        cache.set_json(&key, &json!({"v": 1})).await;
        assert_eq!(cache.get_json::<Value>(&key).await, None);
        cache.invalidate_owner("resumes", Uuid::new_v4()).await;
    }
}
