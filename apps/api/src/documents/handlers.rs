//! One handler set for all three document resources. Each resource gets its
//! own `Router` instance carrying its own `DocumentService` as state, so the
//! handlers never branch on kind.
//!
//! Authentication happens upstream; handlers receive the already-resolved
//! `user_id` and parse it (like every externally supplied id) before the
//! core is touched, so malformed ids become a typed 400 instead of reaching
//! storage.

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use uuid::Uuid;

use crate::documents::model::{
    DocumentPage, DocumentPatch, DocumentRow, ListParams, SortBy, SortOrder,
};
use crate::documents::service::DocumentService;
use crate::errors::AppError;

pub fn router(service: Arc<DocumentService>) -> Router {
    Router::new()
        .route("/", get(handle_list).post(handle_create))
        .route("/default", get(handle_get_default))
        .route("/count", get(handle_count))
        .route(
            "/:id",
            get(handle_get).put(handle_update).delete(handle_remove),
        )
        .route("/:id/duplicate", post(handle_duplicate))
        .route("/:id/default", post(handle_set_default))
        .with_state(service)
}

fn parse_id(raw: &str) -> Result<Uuid, AppError> {
    Uuid::parse_str(raw).map_err(|_| AppError::InvalidIdentifier(raw.to_string()))
}

#[derive(Deserialize)]
pub struct UserIdQuery {
    pub user_id: String,
}

#[derive(Deserialize)]
pub struct ListRequest {
    pub user_id: String,
    pub page: Option<u32>,
    pub limit: Option<u32>,
    pub sort_by: Option<SortBy>,
    pub sort_order: Option<SortOrder>,
    pub search: Option<String>,
}

#[derive(Deserialize)]
pub struct CreateRequest {
    pub user_id: String,
    pub title: String,
    #[serde(default)]
    pub is_default: bool,
    #[serde(default = "empty_object")]
    pub payload: Value,
}

#[derive(Deserialize)]
pub struct UpdateRequest {
    pub user_id: String,
    pub title: Option<String>,
    pub is_default: Option<bool>,
    pub payload: Option<Value>,
}

#[derive(Deserialize)]
pub struct DuplicateRequest {
    pub user_id: String,
    pub title: Option<String>,
}

#[derive(Serialize)]
pub struct CountResponse {
    pub count: u64,
}

fn empty_object() -> Value {
    json!({})
}

/// GET / — paginated, owner-scoped listing.
async fn handle_list(
    State(service): State<Arc<DocumentService>>,
    Query(req): Query<ListRequest>,
) -> Result<Json<DocumentPage>, AppError> {
    let user_id = parse_id(&req.user_id)?;
    let params = ListParams {
        page: req.page,
        limit: req.limit,
        sort_by: req.sort_by,
        sort_order: req.sort_order,
        search: req.search,
    };
    Ok(Json(service.list(user_id, &params).await?))
}

/// POST / — create, 201 on success.
async fn handle_create(
    State(service): State<Arc<DocumentService>>,
    Json(req): Json<CreateRequest>,
) -> Result<(StatusCode, Json<DocumentRow>), AppError> {
    let user_id = parse_id(&req.user_id)?;
    let doc = service
        .create(user_id, &req.title, req.is_default, req.payload)
        .await?;
    Ok((StatusCode::CREATED, Json(doc)))
}

/// GET /default — the owner's default document, 404 when none exists.
async fn handle_get_default(
    State(service): State<Arc<DocumentService>>,
    Query(req): Query<UserIdQuery>,
) -> Result<Json<DocumentRow>, AppError> {
    let user_id = parse_id(&req.user_id)?;
    Ok(Json(service.get_default(user_id).await?))
}

/// GET /count — uncached document count for the owner.
async fn handle_count(
    State(service): State<Arc<DocumentService>>,
    Query(req): Query<UserIdQuery>,
) -> Result<Json<CountResponse>, AppError> {
    let user_id = parse_id(&req.user_id)?;
    let count = service.count(user_id).await?;
    Ok(Json(CountResponse { count }))
}

/// GET /:id
async fn handle_get(
    State(service): State<Arc<DocumentService>>,
    Path(id): Path<String>,
    Query(req): Query<UserIdQuery>,
) -> Result<Json<DocumentRow>, AppError> {
    let user_id = parse_id(&req.user_id)?;
    let id = parse_id(&id)?;
    Ok(Json(service.get_by_id(user_id, id).await?))
}

/// PUT /:id — partial update; absent fields are left untouched.
async fn handle_update(
    State(service): State<Arc<DocumentService>>,
    Path(id): Path<String>,
    Json(req): Json<UpdateRequest>,
) -> Result<Json<DocumentRow>, AppError> {
    let user_id = parse_id(&req.user_id)?;
    let id = parse_id(&id)?;
    let patch = DocumentPatch {
        title: req.title,
        is_default: req.is_default,
        payload: req.payload,
    };
    Ok(Json(service.update(user_id, id, patch).await?))
}

/// DELETE /:id — 204; promotes a replacement default when needed.
async fn handle_remove(
    State(service): State<Arc<DocumentService>>,
    Path(id): Path<String>,
    Query(req): Query<UserIdQuery>,
) -> Result<StatusCode, AppError> {
    let user_id = parse_id(&req.user_id)?;
    let id = parse_id(&id)?;
    service.remove(user_id, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /:id/duplicate — copy with a derived title, 201 on success.
async fn handle_duplicate(
    State(service): State<Arc<DocumentService>>,
    Path(id): Path<String>,
    Json(req): Json<DuplicateRequest>,
) -> Result<(StatusCode, Json<DocumentRow>), AppError> {
    let user_id = parse_id(&req.user_id)?;
    let id = parse_id(&id)?;
    let doc = service
        .duplicate(user_id, id, req.title.as_deref())
        .await?;
    Ok((StatusCode::CREATED, Json(doc)))
}

/// POST /:id/default — explicit promotion.
async fn handle_set_default(
    State(service): State<Arc<DocumentService>>,
    Path(id): Path<String>,
    Json(req): Json<UserIdQuery>,
) -> Result<Json<DocumentRow>, AppError> {
    let user_id = parse_id(&req.user_id)?;
    let id = parse_id(&id)?;
    Ok(Json(service.set_default(user_id, id).await?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_malformed_id_rejected_before_core() {
        assert!(matches!(
            parse_id("not-a-uuid"),
            Err(AppError::InvalidIdentifier(_))
        ));
        assert!(parse_id("2c5ea4c0-4067-11e9-8bad-9b1deb4d3b7d").is_ok());
    }
}
