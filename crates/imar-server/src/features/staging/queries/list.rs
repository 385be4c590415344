//! List staged records query

use serde::{Deserialize, Serialize};

use crate::features::shared::pagination::{PaginationMetadata, PaginationParams};
use crate::features::FeatureState;
use crate::models::{BatchSummary, StagedRecord};

/// Query for a page of staged records, optionally scoped to one batch.
///
/// Pagination fields are inlined rather than nested; query strings do not
/// flatten reliably.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListStagedRecordsQuery {
    pub batch_id: Option<i64>,
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

impl ListStagedRecordsQuery {
    fn pagination(&self) -> PaginationParams {
        PaginationParams::new(self.page, self.per_page)
    }
}

/// Response from listing staged records.
#[derive(Debug, Clone, Serialize)]
pub struct ListStagedRecordsResponse {
    pub items: Vec<StagedRecord>,
    pub pagination: PaginationMetadata,
    /// Batches covering the listed records: the requested one, or every
    /// known batch when unscoped.
    pub batches: Vec<BatchSummary>,
}

/// Errors that can occur when listing staged records.
#[derive(Debug, thiserror::Error)]
pub enum ListStagedRecordsError {
    #[error("invalid pagination: {0}")]
    InvalidPagination(&'static str),

    #[error("batch {0} not found")]
    BatchNotFound(i64),
}

/// Handles the list query.
#[tracing::instrument(skip(state, query), fields(batch_id = query.batch_id))]
pub async fn handle(
    state: &FeatureState,
    query: ListStagedRecordsQuery,
) -> Result<ListStagedRecordsResponse, ListStagedRecordsError> {
    let pagination = query.pagination();
    pagination
        .validate()
        .map_err(ListStagedRecordsError::InvalidPagination)?;

    let batches = match query.batch_id {
        Some(batch_id) => {
            let batch = state
                .staging
                .batch(batch_id)
                .await
                .ok_or(ListStagedRecordsError::BatchNotFound(batch_id))?;
            vec![batch]
        },
        None => state.staging.batches().await,
    };

    let (items, total) = state
        .staging
        .list(query.batch_id, pagination.offset(), pagination.per_page())
        .await;

    let pagination = PaginationMetadata::new(pagination.page(), pagination.per_page(), total);

    Ok(ListStagedRecordsResponse {
        items,
        pagination,
        batches,
    })
}
