//! Promote one staged record
//!
//! The full per-record promotion sequence: resolve the free-text location
//! against the authoritative hierarchy, create the authoritative mosque
//! record, then remove the staged row. The staged row is only removed
//! after the authoritative create succeeds, so any earlier failure leaves
//! it in staging unchanged and retryable.
//!
//! The removal is the store's atomic `take`: a promote and a delete racing
//! on the same id resolve deterministically, with the loser observing
//! `NotFound`. This also makes promotion idempotent from the caller's view:
//! a repeated promote of an already-promoted id reports `NotFound` and
//! cannot create a second authoritative record.

use serde::Serialize;

use crate::features::FeatureState;
use crate::models::{BatchSummary, LocationLevel, MosqueId, NewMosqueRecord};
use crate::stores::{Removal, ResolveError};
use imar_common::StoreError;

/// Command to promote one staged record.
#[derive(Debug, Clone)]
pub struct PromoteStagedRecordCommand {
    pub id: i64,
}

/// Response from a successful promotion.
#[derive(Debug, Clone, Serialize)]
pub struct PromoteStagedRecordResponse {
    /// The staged id that was consumed.
    pub staged_id: i64,
    /// Identifier assigned by the authoritative store.
    pub mosque_id: MosqueId,
    /// The record's batch after the promotion, with its rederived status.
    pub batch: Option<BatchSummary>,
}

/// Errors that can occur when promoting a staged record.
#[derive(Debug, thiserror::Error)]
pub enum PromoteStagedRecordError {
    #[error("staged record {0} not found")]
    NotFound(i64),

    #[error("an operation is already in progress for staged record {0}")]
    OperationInProgress(i64),

    /// The location labels could not be mapped to the authoritative
    /// hierarchy. The staged record is unchanged; the operator can edit
    /// the labels and retry.
    #[error("no {level} matches '{label}'")]
    UnresolvedLocation { level: LocationLevel, label: String },

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Handles the promote command.
#[tracing::instrument(skip(state), fields(record_id = command.id))]
pub async fn handle(
    state: &FeatureState,
    command: PromoteStagedRecordCommand,
) -> Result<PromoteStagedRecordResponse, PromoteStagedRecordError> {
    let id = command.id;
    let _guard = state
        .inflight
        .begin(id)
        .ok_or(PromoteStagedRecordError::OperationInProgress(id))?;

    let record = state
        .staging
        .get(id)
        .await
        .ok_or(PromoteStagedRecordError::NotFound(id))?;

    let resolved = match state.locations.resolve(&record.fields.location).await {
        Ok(resolved) => resolved,
        Err(ResolveError::Unresolved { level, label }) => {
            tracing::warn!(record_id = id, %level, %label, "promotion blocked by unresolved location");
            return Err(PromoteStagedRecordError::UnresolvedLocation { level, label });
        },
        Err(ResolveError::Store(err)) => return Err(err.into()),
    };

    let mosque_id = state
        .mosques
        .create(NewMosqueRecord::from_staged(record.fields, resolved))
        .await?;

    // The create succeeded; the staged row must go even if it raced with a
    // delete, in which case the other side already removed it.
    let removed = state.staging.take(id, Removal::Promoted).await;
    if removed.is_none() {
        tracing::warn!(record_id = id, %mosque_id, "staged row already removed after promotion");
    }

    let batch = state.staging.batch(record.batch_id).await;

    tracing::info!(record_id = id, %mosque_id, "staged record promoted");
    Ok(PromoteStagedRecordResponse {
        staged_id: id,
        mosque_id,
        batch,
    })
}
