//! Feature modules implementing the staging API
//!
//! Each feature is a vertical slice with its own commands, queries, and
//! routes:
//! - `commands/` - Write operations (import, update, delete, promote)
//! - `queries/` - Read operations (list, stats, export, template)
//! - `routes.rs` - HTTP route definitions
//!
//! Commands are plain data structures with a `validate()` method; handlers
//! are standalone async functions carrying the business logic.

pub mod shared;
pub mod staging;

use std::sync::Arc;

use axum::Router;

use crate::config::ImportConfig;
use crate::features::staging::InFlight;
use crate::stores::{LocationResolver, MosqueStore, StagingStore};

/// Shared state for all feature routes.
///
/// The staging store is the service's own state; the location resolver and
/// mosque store reach the remote platform API. All three sit behind traits
/// so handlers can be driven against in-process fakes in tests.
#[derive(Clone)]
pub struct FeatureState {
    pub staging: Arc<dyn StagingStore>,
    pub locations: Arc<dyn LocationResolver>,
    pub mosques: Arc<dyn MosqueStore>,
    /// Record ids with a promote or delete currently pending.
    pub inflight: InFlight,
    pub import: ImportConfig,
}

/// Creates the main API router with all feature routes mounted.
pub fn router(state: FeatureState) -> Router<()> {
    Router::new()
        .nest("/staging", staging::staging_routes().with_state(state))
}
