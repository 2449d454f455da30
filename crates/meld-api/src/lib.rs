//! JSON REST API for the Meld resolution engine.
//!
//! Exposes an axum [`Router`] backed by a [`meld_resolve::Resolver`] over
//! the SQLite store. Auth, TLS, and transport concerns are the caller's
//! responsibility.
//!
//! The handlers bind the concrete [`SqliteStore`] backend: the store trait
//! uses native `async fn`, so its futures only prove `Send` (which axum
//! requires) at a concrete instantiation.
//!
//! # Mounting
//!
//! ```rust,ignore
//! .nest("/api", meld_api::api_router(resolver.clone()))
//! ```

pub mod error;
pub mod extractions;
pub mod merges;
pub mod resolution;
pub mod suggestions;

use axum::{
  Router,
  routing::{get, post},
};
use meld_resolve::Resolver;
use meld_store_sqlite::SqliteStore;

pub use error::ApiError;

/// The engine type served by this API.
pub type Engine = Resolver<SqliteStore>;

/// Build a fully-materialised API router for `resolver`.
///
/// The returned `Router<()>` can be nested into any parent router
/// regardless of its own state type.
pub fn api_router(resolver: Engine) -> Router<()> {
  Router::new()
    // Resolution
    .route("/resolution/run", post(resolution::run))
    .route("/stats", get(resolution::stats))
    // Extraction ingestion
    .route("/extractions", post(extractions::ingest))
    // Merge review
    .route("/merges", get(merges::list_pending))
    .route("/merges/{id}/accept", post(merges::accept))
    .route("/merges/{id}/reject", post(merges::reject))
    // Suggestion review
    .route("/suggestions", get(suggestions::list))
    .route("/suggestions/generate", post(suggestions::generate))
    .route("/suggestions/cleanup", post(suggestions::cleanup))
    .route("/suggestions/{id}/accept", post(suggestions::accept))
    .route("/suggestions/{id}/reject", post(suggestions::reject))
    .with_state(resolver)
}
