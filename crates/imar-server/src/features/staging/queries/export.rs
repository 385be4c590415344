//! Export the staging set as a workbook
//!
//! Rebuilds a spreadsheet with the template's exact columns from whatever
//! is currently staged, so an exported file can be re-imported unchanged.
//! Generated identifiers and batch membership are deliberately not
//! exported; they would not survive a round trip anyway.

use serde::Deserialize;

use crate::features::FeatureState;
use crate::spreadsheet::schema::{fields_to_row, headers};
use crate::spreadsheet::write::{build_workbook, Cell, WriteError};

/// Query for exporting staged records, optionally scoped to one batch.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ExportStagingQuery {
    pub batch_id: Option<i64>,
}

/// Errors that can occur when exporting.
#[derive(Debug, thiserror::Error)]
pub enum ExportStagingError {
    #[error("batch {0} not found")]
    BatchNotFound(i64),

    #[error("failed to build workbook: {0}")]
    Workbook(#[from] WriteError),
}

/// Handles the export query, returning the workbook bytes.
#[tracing::instrument(skip(state), fields(batch_id = query.batch_id))]
pub async fn handle(
    state: &FeatureState,
    query: ExportStagingQuery,
) -> Result<Vec<u8>, ExportStagingError> {
    if let Some(batch_id) = query.batch_id {
        state
            .staging
            .batch(batch_id)
            .await
            .ok_or(ExportStagingError::BatchNotFound(batch_id))?;
    }

    let records = state.staging.all(query.batch_id).await;

    let mut rows = Vec::with_capacity(records.len() + 1);
    rows.push(
        headers()
            .into_iter()
            .map(|h| Cell::Text(h.to_string()))
            .collect::<Vec<_>>(),
    );
    for record in &records {
        rows.push(fields_to_row(&record.fields));
    }

    tracing::debug!(exported = records.len(), "staging set exported");
    Ok(build_workbook(&rows)?)
}
