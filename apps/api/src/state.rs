use std::sync::Arc;

use crate::documents::service::DocumentService;

/// Shared application state, built once at startup and handed to the router.
/// Each document type gets its own service instance wired to its own table
/// and cache-key family; the store and cache are injected, never reached
/// through globals.
#[derive(Clone)]
pub struct AppState {
    pub resumes: Arc<DocumentService>,
    pub cover_letters: Arc<DocumentService>,
    pub disclosure_letters: Arc<DocumentService>,
}
