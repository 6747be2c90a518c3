use async_trait::async_trait;
use uuid::Uuid;

use crate::documents::model::{DocumentPatch, DocumentRow, ListParams, NewDocument};
use crate::errors::AppError;

/// Durable CRUD for one document kind. Each service instance gets its own
/// store bound to the kind's table; the trait keeps the service testable
/// against an in-memory fake without Postgres.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Inserts a new row, assigning id and timestamps.
    async fn insert(&self, doc: NewDocument) -> Result<DocumentRow, AppError>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<DocumentRow>, AppError>;

    /// Owner-scoped page plus the total matching count.
    async fn find_by_owner(
        &self,
        owner_id: Uuid,
        params: &ListParams,
    ) -> Result<(Vec<DocumentRow>, u64), AppError>;

    /// Merges non-`None` patch fields and bumps `updated_at`.
    /// Returns `None` when the id does not resolve.
    async fn update(&self, id: Uuid, patch: DocumentPatch)
        -> Result<Option<DocumentRow>, AppError>;

    /// Returns `false` when the id does not resolve.
    async fn delete(&self, id: Uuid) -> Result<bool, AppError>;

    async fn count_by_owner(&self, owner_id: Uuid) -> Result<u64, AppError>;

    /// Clears `is_default` on every row of the owner except the given one.
    /// Returns how many rows were cleared.
    async fn unset_defaults(&self, owner_id: Uuid, except: Option<Uuid>) -> Result<u64, AppError>;

    async fn find_default(&self, owner_id: Uuid) -> Result<Option<DocumentRow>, AppError>;

    /// The owner's most recently created row, ties broken by id descending so
    /// promotion after delete is deterministic.
    async fn most_recent(&self, owner_id: Uuid) -> Result<Option<DocumentRow>, AppError>;
}
