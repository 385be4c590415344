//! Import spreadsheet command
//!
//! Parses an uploaded workbook into a new batch of staged records. Rows
//! that fail to parse are reported back alongside the batch; they never
//! sink the valid rows. A file with zero valid rows creates nothing.

use serde::Serialize;

use crate::features::FeatureState;
use crate::models::{BatchSummary, StagedRecord};
use crate::spreadsheet::{parse_records, RowError, SpreadsheetError};

/// Extensions accepted for upload, matched case-insensitively.
const ACCEPTED_EXTENSIONS: [&str; 2] = ["xlsx", "xls"];

/// Command to import a spreadsheet into a new staging batch.
#[derive(Debug, Clone)]
pub struct ImportSpreadsheetCommand {
    /// Filename as supplied by the uploader; drives the extension check
    /// and is recorded on the batch.
    pub filename: String,

    /// Raw file bytes.
    pub bytes: Vec<u8>,
}

/// Response from a successful import.
#[derive(Debug, Clone, Serialize)]
pub struct ImportSpreadsheetResponse {
    pub batch: BatchSummary,
    pub records: Vec<StagedRecord>,
    /// Rows rejected during parsing, in worksheet order.
    pub row_errors: Vec<RowError>,
}

/// Errors that can occur when importing a spreadsheet.
#[derive(Debug, thiserror::Error)]
pub enum ImportSpreadsheetError {
    #[error("unsupported file type '{0}': expected .xlsx or .xls")]
    UnsupportedFileType(String),

    #[error("file exceeds the maximum upload size of {max_bytes} bytes")]
    FileTooLarge { max_bytes: usize },

    #[error(transparent)]
    Spreadsheet(#[from] SpreadsheetError),

    /// The file parsed but produced no valid rows; no batch is created.
    #[error("spreadsheet contains no valid rows")]
    EmptyImport { row_errors: Vec<RowError> },
}

impl ImportSpreadsheetCommand {
    /// Validates filename extension and size before any parsing happens.
    #[tracing::instrument(skip(self), fields(filename = %self.filename, bytes = self.bytes.len()))]
    pub fn validate(&self, max_file_size_bytes: usize) -> Result<(), ImportSpreadsheetError> {
        let extension = self
            .filename
            .rsplit('.')
            .next()
            .filter(|ext| *ext != self.filename)
            .map(str::to_lowercase)
            .unwrap_or_default();

        if !ACCEPTED_EXTENSIONS.contains(&extension.as_str()) {
            return Err(ImportSpreadsheetError::UnsupportedFileType(
                self.filename.clone(),
            ));
        }

        if self.bytes.len() > max_file_size_bytes {
            return Err(ImportSpreadsheetError::FileTooLarge {
                max_bytes: max_file_size_bytes,
            });
        }

        Ok(())
    }
}

/// Handles the import command.
///
/// Parsing happens entirely before the batch is created, so a caller never
/// observes a half-ingested batch.
#[tracing::instrument(skip(state, command), fields(filename = %command.filename))]
pub async fn handle(
    state: &FeatureState,
    command: ImportSpreadsheetCommand,
) -> Result<ImportSpreadsheetResponse, ImportSpreadsheetError> {
    command.validate(state.import.max_file_size_bytes)?;

    let parsed = parse_records(&command.bytes)?;

    let mut fields = Vec::new();
    let mut row_errors = Vec::new();
    for (_, result) in parsed {
        match result {
            Ok(row) => fields.push(row),
            Err(err) => row_errors.push(err),
        }
    }

    if fields.is_empty() {
        return Err(ImportSpreadsheetError::EmptyImport { row_errors });
    }

    let (batch, records) = state
        .staging
        .create_batch(&command.filename, fields)
        .await;

    tracing::info!(
        batch_id = batch.id,
        imported = records.len(),
        rejected = row_errors.len(),
        "spreadsheet imported into staging"
    );

    Ok(ImportSpreadsheetResponse {
        batch,
        records,
        row_errors,
    })
}
