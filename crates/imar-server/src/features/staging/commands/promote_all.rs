//! Promote a whole batch
//!
//! Runs the single-record promotion sequence over every record still
//! staged in one batch, isolating failures: a record that cannot be
//! promoted is reported and left in staging, and the sweep moves on to the
//! next one. Records are processed one full promote-then-remove sequence
//! at a time, which keeps the per-record atomicity guarantee intact.
//!
//! There is no cancellation: once started, every record is attempted. The
//! operator retries individual failures afterwards.

use serde::Serialize;

use crate::features::staging::commands::promote_one::{
    self, PromoteStagedRecordCommand, PromoteStagedRecordError,
};
use crate::features::FeatureState;
use crate::models::{BatchSummary, MosqueId};

/// Command to promote every remaining record of a batch.
#[derive(Debug, Clone)]
pub struct PromoteBatchCommand {
    pub batch_id: i64,
}

/// One record successfully promoted during the sweep.
#[derive(Debug, Clone, Serialize)]
pub struct PromotedRecord {
    pub staged_id: i64,
    pub mosque_id: MosqueId,
}

/// One record that failed and remains in staging.
#[derive(Debug, Clone, Serialize)]
pub struct FailedPromotion {
    pub staged_id: i64,
    pub error: String,
}

/// Response from a batch promotion sweep.
#[derive(Debug, Clone, Serialize)]
pub struct PromoteBatchResponse {
    pub batch: BatchSummary,
    pub promoted: Vec<PromotedRecord>,
    pub failed: Vec<FailedPromotion>,
}

/// Errors that can occur when promoting a batch.
#[derive(Debug, thiserror::Error)]
pub enum PromoteBatchError {
    #[error("batch {0} not found")]
    NotFound(i64),
}

/// Handles the batch promotion command.
///
/// The id list is snapshotted up front: records imported into other
/// batches, or edits racing with the sweep, are unaffected. Individual
/// failures never abort the sweep.
#[tracing::instrument(skip(state), fields(batch_id = command.batch_id))]
pub async fn handle(
    state: &FeatureState,
    command: PromoteBatchCommand,
) -> Result<PromoteBatchResponse, PromoteBatchError> {
    let batch_id = command.batch_id;
    state
        .staging
        .batch(batch_id)
        .await
        .ok_or(PromoteBatchError::NotFound(batch_id))?;

    let ids = state.staging.batch_record_ids(batch_id).await;

    let mut promoted = Vec::new();
    let mut failed = Vec::new();
    for id in ids {
        match promote_one::handle(state, PromoteStagedRecordCommand { id }).await {
            Ok(response) => promoted.push(PromotedRecord {
                staged_id: response.staged_id,
                mosque_id: response.mosque_id,
            }),
            // Deleted or promoted concurrently since the snapshot; nothing
            // left to do for this id.
            Err(PromoteStagedRecordError::NotFound(_)) => {},
            Err(err) => failed.push(FailedPromotion {
                staged_id: id,
                error: err.to_string(),
            }),
        }
    }

    let batch = state
        .staging
        .batch(batch_id)
        .await
        .ok_or(PromoteBatchError::NotFound(batch_id))?;

    tracing::info!(
        batch_id,
        promoted = promoted.len(),
        failed = failed.len(),
        "batch promotion sweep finished"
    );

    Ok(PromoteBatchResponse {
        batch,
        promoted,
        failed,
    })
}
