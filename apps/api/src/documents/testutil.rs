//! In-memory fakes so the service and cache layers can be exercised without
//! Postgres or Redis. The store mirrors the Postgres implementation's
//! observable behavior: clamped pagination, case-insensitive title search,
//! and `created_at desc, id desc` ordering for promotion.

use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chrono::{Duration, Utc};
use serde_json::json;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::cache::CacheBackend;
use crate::documents::model::{
    DocumentPatch, DocumentRow, ListParams, NewDocument, SortBy, SortOrder,
};
use crate::documents::store::DocumentStore;
use crate::errors::AppError;

#[derive(Default)]
pub struct MemoryStore {
    rows: Mutex<Vec<DocumentRow>>,
    // Strictly increasing creation order; wall-clock alone can collide within
    // a fast test, which would make promotion order flaky.
    seq: AtomicI64,
}

impl MemoryStore {
    pub async fn all_for(&self, owner_id: Uuid) -> Vec<DocumentRow> {
        self.rows
            .lock()
            .await
            .iter()
            .filter(|d| d.owner_id == owner_id)
            .cloned()
            .collect()
    }

    /// Mutates a row without going through the service, for staleness tests.
    pub async fn rename_directly(&self, id: Uuid, title: &str) {
        let mut rows = self.rows.lock().await;
        if let Some(row) = rows.iter_mut().find(|d| d.id == id) {
            row.title = title.to_string();
        }
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn insert(&self, doc: NewDocument) -> Result<DocumentRow, AppError> {
        let seq = self.seq.fetch_add(1, Ordering::SeqCst);
        let now = Utc::now() + Duration::microseconds(seq);
        let row = DocumentRow {
            id: Uuid::new_v4(),
            owner_id: doc.owner_id,
            title: doc.title,
            is_default: doc.is_default,
            payload: doc.payload,
            created_at: now,
            updated_at: now,
        };
        self.rows.lock().await.push(row.clone());
        Ok(row)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<DocumentRow>, AppError> {
        Ok(self.rows.lock().await.iter().find(|d| d.id == id).cloned())
    }

    async fn find_by_owner(
        &self,
        owner_id: Uuid,
        params: &ListParams,
    ) -> Result<(Vec<DocumentRow>, u64), AppError> {
        let search = params
            .search
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_lowercase);
        let mut matching: Vec<DocumentRow> = self
            .rows
            .lock()
            .await
            .iter()
            .filter(|d| d.owner_id == owner_id)
            .filter(|d| match &search {
                Some(needle) => d.title.to_lowercase().contains(needle),
                None => true,
            })
            .cloned()
            .collect();

        matching.sort_by(|a, b| {
            let ordering = match params.sort_by() {
                SortBy::CreatedAt => a.created_at.cmp(&b.created_at),
                SortBy::UpdatedAt => a.updated_at.cmp(&b.updated_at),
                SortBy::Title => a.title.cmp(&b.title),
            };
            let ordering = match params.sort_order() {
                SortOrder::Asc => ordering,
                SortOrder::Desc => ordering.reverse(),
            };
            ordering.then(b.id.cmp(&a.id))
        });

        let total = matching.len() as u64;
        let items: Vec<DocumentRow> = matching
            .into_iter()
            .skip(params.offset() as usize)
            .take(params.limit() as usize)
            .collect();
        Ok((items, total))
    }

    async fn update(
        &self,
        id: Uuid,
        patch: DocumentPatch,
    ) -> Result<Option<DocumentRow>, AppError> {
        let mut rows = self.rows.lock().await;
        let Some(row) = rows.iter_mut().find(|d| d.id == id) else {
            return Ok(None);
        };
        if let Some(title) = patch.title {
            row.title = title;
        }
        if let Some(is_default) = patch.is_default {
            row.is_default = is_default;
        }
        if let Some(payload) = patch.payload {
            row.payload = payload;
        }
        row.updated_at = Utc::now();
        Ok(Some(row.clone()))
    }

    async fn delete(&self, id: Uuid) -> Result<bool, AppError> {
        let mut rows = self.rows.lock().await;
        let before = rows.len();
        rows.retain(|d| d.id != id);
        Ok(rows.len() < before)
    }

    async fn count_by_owner(&self, owner_id: Uuid) -> Result<u64, AppError> {
        Ok(self
            .rows
            .lock()
            .await
            .iter()
            .filter(|d| d.owner_id == owner_id)
            .count() as u64)
    }

    async fn unset_defaults(&self, owner_id: Uuid, except: Option<Uuid>) -> Result<u64, AppError> {
        let mut rows = self.rows.lock().await;
        let mut cleared = 0;
        for row in rows
            .iter_mut()
            .filter(|d| d.owner_id == owner_id && d.is_default && Some(d.id) != except)
        {
            row.is_default = false;
            row.updated_at = Utc::now();
            cleared += 1;
        }
        Ok(cleared)
    }

    async fn find_default(&self, owner_id: Uuid) -> Result<Option<DocumentRow>, AppError> {
        Ok(self
            .rows
            .lock()
            .await
            .iter()
            .find(|d| d.owner_id == owner_id && d.is_default)
            .cloned())
    }

    async fn most_recent(&self, owner_id: Uuid) -> Result<Option<DocumentRow>, AppError> {
        Ok(self
            .rows
            .lock()
            .await
            .iter()
            .filter(|d| d.owner_id == owner_id)
            .max_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)))
            .cloned())
    }
}

#[derive(Default)]
pub struct MemoryCache {
    entries: Mutex<HashMap<String, String>>,
}

#[async_trait]
impl CacheBackend for MemoryCache {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.entries.lock().await.get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str, _ttl_secs: u64) -> Result<()> {
        self.entries
            .lock()
            .await
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn delete_prefix(&self, prefix: &str) -> Result<u64> {
        let mut entries = self.entries.lock().await;
        let before = entries.len();
        entries.retain(|key, _| !key.starts_with(prefix));
        Ok((before - entries.len()) as u64)
    }
}

/// A backend that is always down, for fault-absorption tests.
pub struct FailingCache;

#[async_trait]
impl CacheBackend for FailingCache {
    async fn get(&self, _key: &str) -> Result<Option<String>> {
        Err(anyhow!("cache backend unavailable"))
    }

    async fn set(&self, _key: &str, _value: &str, _ttl_secs: u64) -> Result<()> {
        Err(anyhow!("cache backend unavailable"))
    }

    async fn delete_prefix(&self, _prefix: &str) -> Result<u64> {
        Err(anyhow!("cache backend unavailable"))
    }
}

pub fn row_for(owner_id: Uuid, title: &str, is_default: bool) -> DocumentRow {
    let now = Utc::now();
    DocumentRow {
        id: Uuid::new_v4(),
        owner_id,
        title: title.to_string(),
        is_default,
        payload: json!({}),
        created_at: now,
        updated_at: now,
    }
}
