//! Store seams for the pipeline
//!
//! The staging store is the only local state the service owns. The location
//! resolver and the authoritative mosque store are external collaborators on
//! the remote platform API; they sit behind traits so the promotion engine
//! can be exercised against fakes in tests.

use async_trait::async_trait;
use imar_common::StoreError;
use thiserror::Error;

use crate::models::{
    BatchSummary, LocationLabels, LocationLevel, MosqueId, NewMosqueRecord, ResolvedLocation,
    StagedFields, StagedRecord,
};

pub mod http;
pub mod memory;

pub use http::{HttpLocationResolver, HttpMosqueStore, RemoteApi};
pub use memory::InMemoryStagingStore;

/// Why a record left the staging store.
///
/// Both removals are terminal for the identifier; the distinction only feeds
/// the derived batch status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Removal {
    Promoted,
    Deleted,
}

/// The staging area: batches plus the records that have not yet been
/// promoted or deleted.
///
/// `take` is the per-row atomic compare-and-delete the promotion engine and
/// deletion rely on: when a promote and a delete race on one identifier,
/// exactly one observes the record and the other gets `None`.
#[async_trait]
pub trait StagingStore: Send + Sync {
    /// Create a batch with its records in one step. Callers never observe a
    /// batch without its records.
    async fn create_batch(
        &self,
        source_filename: &str,
        rows: Vec<StagedFields>,
    ) -> (BatchSummary, Vec<StagedRecord>);

    /// Fetch a staged record by id.
    async fn get(&self, id: i64) -> Option<StagedRecord>;

    /// Replace a staged record's fields. Returns the stored record, or
    /// `None` if the id has already left staging.
    async fn save(&self, record: StagedRecord) -> Option<StagedRecord>;

    /// Atomically remove and return a staged record, recording why it left.
    async fn take(&self, id: i64, removal: Removal) -> Option<StagedRecord>;

    /// Page through staged records, optionally restricted to one batch.
    /// Returns the page plus the total matching count.
    async fn list(
        &self,
        batch_id: Option<i64>,
        offset: i64,
        limit: i64,
    ) -> (Vec<StagedRecord>, i64);

    /// Every staged record, in id order. Used by export and stats.
    async fn all(&self, batch_id: Option<i64>) -> Vec<StagedRecord>;

    /// Ids of the records still staged in a batch, in id order.
    async fn batch_record_ids(&self, batch_id: i64) -> Vec<i64>;

    /// Metadata for one batch, if it exists.
    async fn batch(&self, batch_id: i64) -> Option<BatchSummary>;

    /// Metadata for every known batch, newest first.
    async fn batches(&self) -> Vec<BatchSummary>;
}

/// Failure to resolve a free-text location tuple.
#[derive(Debug, Error)]
pub enum ResolveError {
    /// The named level had no match in the authoritative hierarchy.
    #[error("no {level} matches '{label}'")]
    Unresolved { level: LocationLevel, label: String },

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Maps a (governorate, district, sub-district, neighborhood) text tuple to
/// resolved numeric identifiers.
#[async_trait]
pub trait LocationResolver: Send + Sync {
    async fn resolve(&self, labels: &LocationLabels) -> Result<ResolvedLocation, ResolveError>;
}

/// The authoritative mosque dataset. Promotion only ever creates; the
/// pipeline holds no reference to a record after reporting its id.
#[async_trait]
pub trait MosqueStore: Send + Sync {
    async fn create(&self, record: NewMosqueRecord) -> Result<MosqueId, StoreError>;
}
