//! The per-user default-document store: generic persistence, ownership
//! guard, default-flag invariant and cache-coherent orchestration, written
//! once and instantiated per document kind.

pub mod defaults;
pub mod handlers;
pub mod kind;
pub mod model;
pub mod ownership;
pub mod pg;
pub mod service;
pub mod store;

#[cfg(test)]
pub mod testutil;
