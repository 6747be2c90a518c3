//! Default-flag invariant: per owner and document kind, at most one row has
//! `is_default = true` at any observable instant.
//!
//! No cross-row transaction is assumed, so promotion is "unset all, then set
//! one". A reader racing a promotion can observe zero defaults for a moment,
//! never two. Concurrent promotions for the same owner resolve to whichever
//! set step completes last.

use uuid::Uuid;

use crate::documents::model::{DocumentPatch, DocumentRow};
use crate::documents::store::DocumentStore;
use crate::errors::AppError;

/// Pre-write step for a create or update that flags a row default: clears
/// every other default the owner holds. `except` is the row being updated,
/// `None` on create (the new row does not exist yet).
pub async fn clear_existing(
    store: &dyn DocumentStore,
    owner_id: Uuid,
    except: Option<Uuid>,
) -> Result<(), AppError> {
    store.unset_defaults(owner_id, except).await?;
    Ok(())
}

/// Explicit promotion. Fail-closed: the unset step runs first, and if it
/// errors the set step never runs, leaving the previous default in place
/// rather than applying half of the swap.
pub async fn promote(
    store: &dyn DocumentStore,
    owner_id: Uuid,
    id: Uuid,
) -> Result<DocumentRow, AppError> {
    store.unset_defaults(owner_id, Some(id)).await?;
    let patch = DocumentPatch {
        is_default: Some(true),
        ..Default::default()
    };
    store
        .update(id, patch)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("document {id} not found")))
}

/// Post-delete step after removing the owner's default: the most recently
/// created survivor (ties broken by id, so the choice is deterministic)
/// becomes the new default. With no survivors the owner simply has none.
pub async fn promote_survivor(
    store: &dyn DocumentStore,
    owner_id: Uuid,
) -> Result<Option<DocumentRow>, AppError> {
    let Some(survivor) = store.most_recent(owner_id).await? else {
        return Ok(None);
    };
    let patch = DocumentPatch {
        is_default: Some(true),
        ..Default::default()
    };
    Ok(store.update(survivor.id, patch).await?)
}
