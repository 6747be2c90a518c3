use uuid::Uuid;

use crate::documents::model::DocumentRow;
use crate::errors::AppError;

/// Rejects access to a document the requesting user does not own.
///
/// Runs on every targeted read and write, whether the row came from the
/// store or from the cache: cached rows carry `owner_id` precisely so this
/// check can be repeated on a hit instead of trusting the cache to have
/// pre-filtered by owner.
pub fn ensure_owner(doc: &DocumentRow, user_id: Uuid) -> Result<(), AppError> {
    if doc.owner_id != user_id {
        return Err(AppError::Forbidden);
    }
    Ok(())
}
