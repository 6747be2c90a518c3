use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::documents::kind::DocumentKind;
use crate::documents::model::{DocumentPatch, DocumentRow, ListParams, NewDocument};
use crate::documents::store::DocumentStore;
use crate::errors::AppError;

/// Postgres-backed store for one document kind. The table name comes from
/// the closed `DocumentKind` set; all values go through binds.
pub struct PgDocumentStore {
    pool: PgPool,
    kind: DocumentKind,
}

impl PgDocumentStore {
    pub fn new(pool: PgPool, kind: DocumentKind) -> Self {
        Self { pool, kind }
    }

    fn table(&self) -> &'static str {
        self.kind.table()
    }
}

#[async_trait]
impl DocumentStore for PgDocumentStore {
    async fn insert(&self, doc: NewDocument) -> Result<DocumentRow, AppError> {
        let row = sqlx::query_as::<_, DocumentRow>(&format!(
            r#"
            INSERT INTO {} (id, owner_id, title, is_default, payload, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, NOW(), NOW())
            RETURNING *
            "#,
            self.table()
        ))
        .bind(Uuid::new_v4())
        .bind(doc.owner_id)
        .bind(&doc.title)
        .bind(doc.is_default)
        .bind(&doc.payload)
        .fetch_one(&self.pool)
        .await?;
        Ok(row)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<DocumentRow>, AppError> {
        let row = sqlx::query_as::<_, DocumentRow>(&format!(
            "SELECT * FROM {} WHERE id = $1",
            self.table()
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    async fn find_by_owner(
        &self,
        owner_id: Uuid,
        params: &ListParams,
    ) -> Result<(Vec<DocumentRow>, u64), AppError> {
        // Sort column and direction come from whitelisting enums, never from
        // raw input; id breaks ties so page boundaries are stable.
        let order = format!("{} {}", params.sort_by().column(), params.sort_order().sql());
        let limit = i64::from(params.limit());
        let offset = params.offset() as i64;
        let search = params
            .search
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty());

        let (rows, total) = match search {
            Some(search) => {
                let pattern = format!("%{search}%");
                let rows = sqlx::query_as::<_, DocumentRow>(&format!(
                    "SELECT * FROM {} WHERE owner_id = $1 AND title ILIKE $2 \
                     ORDER BY {order}, id DESC LIMIT $3 OFFSET $4",
                    self.table()
                ))
                .bind(owner_id)
                .bind(&pattern)
                .bind(limit)
                .bind(offset)
                .fetch_all(&self.pool)
                .await?;
                let total: i64 = sqlx::query_scalar(&format!(
                    "SELECT COUNT(*) FROM {} WHERE owner_id = $1 AND title ILIKE $2",
                    self.table()
                ))
                .bind(owner_id)
                .bind(&pattern)
                .fetch_one(&self.pool)
                .await?;
                (rows, total)
            }
            None => {
                let rows = sqlx::query_as::<_, DocumentRow>(&format!(
                    "SELECT * FROM {} WHERE owner_id = $1 \
                     ORDER BY {order}, id DESC LIMIT $2 OFFSET $3",
                    self.table()
                ))
                .bind(owner_id)
                .bind(limit)
                .bind(offset)
                .fetch_all(&self.pool)
                .await?;
                let total: i64 = sqlx::query_scalar(&format!(
                    "SELECT COUNT(*) FROM {} WHERE owner_id = $1",
                    self.table()
                ))
                .bind(owner_id)
                .fetch_one(&self.pool)
                .await?;
                (rows, total)
            }
        };

        Ok((rows, total as u64))
    }

    async fn update(
        &self,
        id: Uuid,
        patch: DocumentPatch,
    ) -> Result<Option<DocumentRow>, AppError> {
        let row = sqlx::query_as::<_, DocumentRow>(&format!(
            r#"
            UPDATE {} SET
                title = COALESCE($2, title),
                is_default = COALESCE($3, is_default),
                payload = COALESCE($4, payload),
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
            self.table()
        ))
        .bind(id)
        .bind(patch.title)
        .bind(patch.is_default)
        .bind(patch.payload)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    async fn delete(&self, id: Uuid) -> Result<bool, AppError> {
        let result = sqlx::query(&format!("DELETE FROM {} WHERE id = $1", self.table()))
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn count_by_owner(&self, owner_id: Uuid) -> Result<u64, AppError> {
        let count: i64 = sqlx::query_scalar(&format!(
            "SELECT COUNT(*) FROM {} WHERE owner_id = $1",
            self.table()
        ))
        .bind(owner_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(count as u64)
    }

    async fn unset_defaults(&self, owner_id: Uuid, except: Option<Uuid>) -> Result<u64, AppError> {
        let result = match except {
            Some(except) => {
                sqlx::query(&format!(
                    "UPDATE {} SET is_default = FALSE, updated_at = NOW() \
                     WHERE owner_id = $1 AND is_default = TRUE AND id <> $2",
                    self.table()
                ))
                .bind(owner_id)
                .bind(except)
                .execute(&self.pool)
                .await?
            }
            None => {
                sqlx::query(&format!(
                    "UPDATE {} SET is_default = FALSE, updated_at = NOW() \
                     WHERE owner_id = $1 AND is_default = TRUE",
                    self.table()
                ))
                .bind(owner_id)
                .execute(&self.pool)
                .await?
            }
        };
        Ok(result.rows_affected())
    }

    async fn find_default(&self, owner_id: Uuid) -> Result<Option<DocumentRow>, AppError> {
        let row = sqlx::query_as::<_, DocumentRow>(&format!(
            "SELECT * FROM {} WHERE owner_id = $1 AND is_default = TRUE LIMIT 1",
            self.table()
        ))
        .bind(owner_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    async fn most_recent(&self, owner_id: Uuid) -> Result<Option<DocumentRow>, AppError> {
        let row = sqlx::query_as::<_, DocumentRow>(&format!(
            "SELECT * FROM {} WHERE owner_id = $1 ORDER BY created_at DESC, id DESC LIMIT 1",
            self.table()
        ))
        .bind(owner_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }
}
