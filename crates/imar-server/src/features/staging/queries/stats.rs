//! Staging statistics query
//!
//! Pure projection over the staged set: counts, the reconstruction versus
//! restoration split, and the summed estimated cost. Nothing here mutates
//! state; the numbers are recomputed on every call.

use serde::{Deserialize, Serialize};

use crate::features::FeatureState;
use crate::models::BatchSummary;

/// Query for staging statistics, optionally scoped to one batch.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StagingStatsQuery {
    pub batch_id: Option<i64>,
}

/// Aggregate figures over the staged records in scope.
#[derive(Debug, Clone, Serialize)]
pub struct StagingStatsResponse {
    /// Records currently staged.
    pub staged_count: u64,
    pub reconstruction_count: u64,
    pub restoration_count: u64,
    pub total_estimated_cost: f64,
    /// Batches in scope with their derived statuses.
    pub batches: Vec<BatchSummary>,
}

/// Errors that can occur when computing staging statistics.
#[derive(Debug, thiserror::Error)]
pub enum StagingStatsError {
    #[error("batch {0} not found")]
    BatchNotFound(i64),
}

/// Handles the stats query.
#[tracing::instrument(skip(state), fields(batch_id = query.batch_id))]
pub async fn handle(
    state: &FeatureState,
    query: StagingStatsQuery,
) -> Result<StagingStatsResponse, StagingStatsError> {
    let batches = match query.batch_id {
        Some(batch_id) => {
            let batch = state
                .staging
                .batch(batch_id)
                .await
                .ok_or(StagingStatsError::BatchNotFound(batch_id))?;
            vec![batch]
        },
        None => state.staging.batches().await,
    };

    let records = state.staging.all(query.batch_id).await;

    let mut reconstruction_count = 0u64;
    let mut total_estimated_cost = 0.0f64;
    for record in &records {
        if record.fields.is_reconstruction {
            reconstruction_count += 1;
        }
        total_estimated_cost += record.fields.estimated_cost;
    }

    let staged_count = records.len() as u64;
    Ok(StagingStatsResponse {
        staged_count,
        reconstruction_count,
        restoration_count: staged_count - reconstruction_count,
        total_estimated_cost,
        batches,
    })
}
