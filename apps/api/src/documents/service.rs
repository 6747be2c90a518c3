use std::sync::Arc;

use serde_json::{json, Value};
use tracing::info;
use uuid::Uuid;

use crate::cache::KeyCache;
use crate::documents::defaults;
use crate::documents::kind::DocumentKind;
use crate::documents::model::{
    validate_title, DocumentPage, DocumentPatch, DocumentRow, ListParams, NewDocument,
    MAX_TITLE_LEN,
};
use crate::documents::ownership::ensure_owner;
use crate::documents::store::DocumentStore;
use crate::errors::AppError;

/// One generic service instead of three near-identical per-type ones.
/// Instantiated once per `DocumentKind` with an injected store and cache.
///
/// Every mutation follows the same discipline: validate, guard, maintain the
/// default-flag invariant, write to the store, and only then invalidate the
/// owner's cache family. The write happens-before the invalidation; the
/// reverse order would let a racing reader refill the cache with stale data
/// that no later miss would ever correct.
pub struct DocumentService {
    kind: DocumentKind,
    store: Arc<dyn DocumentStore>,
    cache: KeyCache,
}

impl DocumentService {
    pub fn new(kind: DocumentKind, store: Arc<dyn DocumentStore>, cache: KeyCache) -> Self {
        Self { kind, store, cache }
    }

    /// Owner-scoped paginated listing. No ownership guard: the query is
    /// scoped to the owner at the storage layer, not post-filtered.
    pub async fn list(&self, owner_id: Uuid, params: &ListParams) -> Result<DocumentPage, AppError> {
        let query = json!({
            "op": "list",
            "page": params.page(),
            "limit": params.limit(),
            "sort_by": params.sort_by(),
            "sort_order": params.sort_order(),
            "search": params.search.as_deref().map(str::trim).filter(|s| !s.is_empty()),
        });
        let key = self.cache.key(self.kind.resource(), owner_id, &query);
        if let Some(page) = self.cache.get_json::<DocumentPage>(&key).await {
            return Ok(page);
        }

        let (items, total) = self.store.find_by_owner(owner_id, params).await?;
        let page = DocumentPage::new(items, total, params);
        self.cache.set_json(&key, &page).await;
        Ok(page)
    }

    /// Single read, guard-checked on the cache-hit path as well: the cached
    /// row carries its owner id and is re-verified on every hit.
    pub async fn get_by_id(&self, owner_id: Uuid, id: Uuid) -> Result<DocumentRow, AppError> {
        let key = self
            .cache
            .key(self.kind.resource(), owner_id, &json!({"op": "get", "id": id}));
        if let Some(doc) = self.cache.get_json::<DocumentRow>(&key).await {
            ensure_owner(&doc, owner_id)?;
            return Ok(doc);
        }

        let doc = self
            .store
            .find_by_id(id)
            .await?
            .ok_or_else(|| self.not_found(id))?;
        ensure_owner(&doc, owner_id)?;
        self.cache.set_json(&key, &doc).await;
        Ok(doc)
    }

    /// The owner's current default document, if any. Misses are not cached,
    /// so a promotion becomes visible on the next read.
    pub async fn get_default(&self, owner_id: Uuid) -> Result<DocumentRow, AppError> {
        let key = self
            .cache
            .key(self.kind.resource(), owner_id, &json!({"op": "default"}));
        if let Some(doc) = self.cache.get_json::<DocumentRow>(&key).await {
            ensure_owner(&doc, owner_id)?;
            return Ok(doc);
        }

        let doc = self.store.find_default(owner_id).await?.ok_or_else(|| {
            AppError::NotFound(format!("no default {} for this user", self.kind.label()))
        })?;
        self.cache.set_json(&key, &doc).await;
        Ok(doc)
    }

    pub async fn create(
        &self,
        owner_id: Uuid,
        title: &str,
        is_default: bool,
        payload: Value,
    ) -> Result<DocumentRow, AppError> {
        let title = validate_title(title)?;
        self.kind.validate_payload(&payload)?;

        if is_default {
            defaults::clear_existing(self.store.as_ref(), owner_id, None).await?;
        }
        let doc = self
            .store
            .insert(NewDocument {
                owner_id,
                title,
                is_default,
                payload,
            })
            .await?;
        info!("created {} {} for user {owner_id}", self.kind.label(), doc.id);

        self.invalidate(owner_id).await;
        Ok(doc)
    }

    pub async fn update(
        &self,
        owner_id: Uuid,
        id: Uuid,
        mut patch: DocumentPatch,
    ) -> Result<DocumentRow, AppError> {
        if let Some(title) = patch.title.as_deref() {
            patch.title = Some(validate_title(title)?);
        }
        if let Some(payload) = &patch.payload {
            self.kind.validate_payload(payload)?;
        }

        let existing = self
            .store
            .find_by_id(id)
            .await?
            .ok_or_else(|| self.not_found(id))?;
        ensure_owner(&existing, owner_id)?;

        if patch.is_default == Some(true) {
            defaults::clear_existing(self.store.as_ref(), owner_id, Some(id)).await?;
        }
        let doc = self
            .store
            .update(id, patch)
            .await?
            .ok_or_else(|| self.not_found(id))?;

        self.invalidate(owner_id).await;
        Ok(doc)
    }

    pub async fn remove(&self, owner_id: Uuid, id: Uuid) -> Result<(), AppError> {
        let existing = self
            .store
            .find_by_id(id)
            .await?
            .ok_or_else(|| self.not_found(id))?;
        ensure_owner(&existing, owner_id)?;

        if !self.store.delete(id).await? {
            return Err(self.not_found(id));
        }
        info!("deleted {} {id} for user {owner_id}", self.kind.label());

        // Deleting the default leaves the owner without one; the most
        // recently created survivor takes over.
        if existing.is_default {
            if let Some(promoted) =
                defaults::promote_survivor(self.store.as_ref(), owner_id).await?
            {
                info!(
                    "promoted {} {} to default for user {owner_id}",
                    self.kind.label(),
                    promoted.id
                );
            }
        }

        self.invalidate(owner_id).await;
        Ok(())
    }

    /// Copies an existing document. The copy is never the default, so only
    /// list entries are affected, but those are covered by the same owner
    /// prefix as everything else.
    pub async fn duplicate(
        &self,
        owner_id: Uuid,
        id: Uuid,
        new_title: Option<&str>,
    ) -> Result<DocumentRow, AppError> {
        let source = self
            .store
            .find_by_id(id)
            .await?
            .ok_or_else(|| self.not_found(id))?;
        ensure_owner(&source, owner_id)?;

        let title = match new_title {
            Some(title) => validate_title(title)?,
            None => copy_title(&source.title),
        };
        let doc = self
            .store
            .insert(NewDocument {
                owner_id,
                title,
                is_default: false,
                payload: source.payload.clone(),
            })
            .await?;

        self.invalidate(owner_id).await;
        Ok(doc)
    }

    pub async fn set_default(&self, owner_id: Uuid, id: Uuid) -> Result<DocumentRow, AppError> {
        let existing = self
            .store
            .find_by_id(id)
            .await?
            .ok_or_else(|| self.not_found(id))?;
        ensure_owner(&existing, owner_id)?;

        let doc = defaults::promote(self.store.as_ref(), owner_id, id).await?;
        info!(
            "set default {} to {id} for user {owner_id}",
            self.kind.label()
        );

        self.invalidate(owner_id).await;
        Ok(doc)
    }

    /// Uncached: cheap at the store and callers expect it always fresh.
    pub async fn count(&self, owner_id: Uuid) -> Result<u64, AppError> {
        self.store.count_by_owner(owner_id).await
    }

    async fn invalidate(&self, owner_id: Uuid) {
        self.cache
            .invalidate_owner(self.kind.resource(), owner_id)
            .await;
    }

    fn not_found(&self, id: Uuid) -> AppError {
        AppError::NotFound(format!("{} {id} not found", self.kind.label()))
    }
}

/// Derived title for a duplicate, truncating the original so the suffix
/// still fits within the title bound.
fn copy_title(original: &str) -> String {
    const SUFFIX: &str = " (Copy)";
    let budget = MAX_TITLE_LEN - SUFFIX.chars().count();
    let base: String = original.chars().take(budget).collect();
    format!("{base}{SUFFIX}")
}
