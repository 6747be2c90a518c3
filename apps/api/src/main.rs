mod cache;
mod config;
mod db;
mod documents;
mod errors;
mod routes;
mod state;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::cache::{KeyCache, RedisBackend};
use crate::config::Config;
use crate::db::create_pool;
use crate::documents::kind::DocumentKind;
use crate::documents::pg::PgDocumentStore;
use crate::documents::service::DocumentService;
use crate::routes::build_router;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on missing required env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("dossier_api={}", &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Dossier API v{}", env!("CARGO_PKG_VERSION"));

    // Initialize PostgreSQL
    let pool = create_pool(&config.database_url).await?;

    // Initialize Redis-backed cache
    let redis = redis::Client::open(config.redis_url.clone())?;
    let cache = KeyCache::new(Arc::new(RedisBackend::new(redis)), config.cache_ttl_secs);
    info!("Redis cache initialized (ttl: {}s)", config.cache_ttl_secs);

    // One generic service per document type, each with its own table and
    // cache-key family
    let service_for = |kind: DocumentKind| {
        Arc::new(DocumentService::new(
            kind,
            Arc::new(PgDocumentStore::new(pool.clone(), kind)),
            cache.clone(),
        ))
    };
    let state = AppState {
        resumes: service_for(DocumentKind::Resume),
        cover_letters: service_for(DocumentKind::CoverLetter),
        disclosure_letters: service_for(DocumentKind::DisclosureLetter),
    };

    // Build router
    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive()); // TODO: tighten CORS in production

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
