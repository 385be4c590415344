//! Delete staged record command
//!
//! Unconditionally removes a record from staging. Deletion never touches
//! the authoritative store: a staged record has no authoritative
//! counterpart until promotion, and after promotion it is no longer here
//! to delete.

use serde::Serialize;

use crate::features::FeatureState;
use crate::models::BatchSummary;
use crate::stores::Removal;

/// Command to delete a staged record.
#[derive(Debug, Clone)]
pub struct DeleteStagedRecordCommand {
    pub id: i64,
}

/// Response from a successful deletion.
#[derive(Debug, Clone, Serialize)]
pub struct DeleteStagedRecordResponse {
    pub id: i64,
    /// The record's batch after the deletion, with its rederived status.
    pub batch: Option<BatchSummary>,
}

/// Errors that can occur when deleting a staged record.
#[derive(Debug, thiserror::Error)]
pub enum DeleteStagedRecordError {
    /// The id is not in staging: never imported, already promoted, or
    /// already deleted. All three look the same from here.
    #[error("staged record {0} not found")]
    NotFound(i64),

    #[error("an operation is already in progress for staged record {0}")]
    OperationInProgress(i64),
}

/// Handles the delete command.
#[tracing::instrument(skip(state), fields(record_id = command.id))]
pub async fn handle(
    state: &FeatureState,
    command: DeleteStagedRecordCommand,
) -> Result<DeleteStagedRecordResponse, DeleteStagedRecordError> {
    let id = command.id;
    let _guard = state
        .inflight
        .begin(id)
        .ok_or(DeleteStagedRecordError::OperationInProgress(id))?;

    let removed = state
        .staging
        .take(id, Removal::Deleted)
        .await
        .ok_or(DeleteStagedRecordError::NotFound(id))?;

    let batch = state.staging.batch(removed.batch_id).await;

    tracing::info!(record_id = id, batch_id = removed.batch_id, "staged record deleted");
    Ok(DeleteStagedRecordResponse { id, batch })
}
