pub mod health;

use axum::{routing::get, Router};

use crate::documents::handlers;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        .nest("/api/v1/resumes", handlers::router(state.resumes))
        .nest("/api/v1/cover-letters", handlers::router(state.cover_letters))
        .nest(
            "/api/v1/disclosure-letters",
            handlers::router(state.disclosure_letters),
        )
}
