//! Staging API routes
//!
//! Wires the staging commands and queries to Axum HTTP handlers.
//!
//! # Route Structure
//!
//! - `GET /api/v1/staging/records` - List staged records with pagination
//! - `POST /api/v1/staging/import` - Upload a spreadsheet into a new batch
//! - `PATCH /api/v1/staging/records/:id` - Edit a staged record
//! - `DELETE /api/v1/staging/records/:id` - Delete a staged record
//! - `POST /api/v1/staging/records/:id/promote` - Promote one record
//! - `POST /api/v1/staging/batches/:id/promote` - Promote a whole batch
//! - `GET /api/v1/staging/stats` - Aggregate staging statistics
//! - `GET /api/v1/staging/export` - Download the staging set as xlsx
//! - `GET /api/v1/staging/template` - Download the empty import template

use axum::{
    extract::{Multipart, Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{delete, get, patch, post},
    Json, Router,
};
use serde_json::json;

use crate::api::response::{ApiResponse, ErrorResponse};
use crate::features::FeatureState;

use super::commands::{
    DeleteStagedRecordCommand, DeleteStagedRecordError, ImportSpreadsheetCommand,
    ImportSpreadsheetError, PromoteBatchCommand, PromoteBatchError, PromoteStagedRecordCommand,
    PromoteStagedRecordError, UpdateStagedRecordCommand, UpdateStagedRecordError,
};
use super::queries::{
    ExportStagingError, ExportStagingQuery, ListStagedRecordsError, ListStagedRecordsQuery,
    StagingStatsError, StagingStatsQuery,
};
use imar_common::StoreError;

// ============================================================================
// Router Configuration
// ============================================================================

/// Creates the staging router with all routes configured.
pub fn staging_routes() -> Router<FeatureState> {
    Router::new()
        .route("/records", get(list_records))
        .route("/records/:id", patch(update_record))
        .route("/records/:id", delete(delete_record))
        .route("/records/:id/promote", post(promote_record))
        .route("/batches/:id/promote", post(promote_batch))
        .route("/import", post(import_spreadsheet))
        .route("/stats", get(staging_stats))
        .route("/export", get(export_staging))
        .route("/template", get(download_template))
}

// ============================================================================
// Command Handlers (Write Operations)
// ============================================================================

/// Upload a spreadsheet and create a staging batch from it.
///
/// Expects a multipart body with a `file` part carrying the workbook.
///
/// # Response
///
/// - `201 Created` - Batch created; body lists records and per-row errors
/// - `400 Bad Request` - Unsupported file type or unreadable file
/// - `413 Payload Too Large` - File exceeds the configured limit
/// - `422 Unprocessable Entity` - No valid rows in the file
#[tracing::instrument(skip(state, multipart))]
async fn import_spreadsheet(
    State(state): State<FeatureState>,
    mut multipart: Multipart,
) -> Result<Response, StagingApiError> {
    let mut upload: Option<(String, Vec<u8>)> = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| StagingApiError::Upload(e.to_string()))?
    {
        if field.name() == Some("file") {
            let filename = field
                .file_name()
                .map(str::to_string)
                .ok_or_else(|| StagingApiError::Upload("file part has no filename".to_string()))?;
            let bytes = field
                .bytes()
                .await
                .map_err(|e| StagingApiError::Upload(e.to_string()))?;
            upload = Some((filename, bytes.to_vec()));
            break;
        }
    }

    let (filename, bytes) = upload
        .ok_or_else(|| StagingApiError::Upload("multipart body has no 'file' part".to_string()))?;

    let command = ImportSpreadsheetCommand { filename, bytes };
    let response = super::commands::import::handle(&state, command).await?;

    tracing::info!(
        batch_id = response.batch.id,
        imported = response.records.len(),
        "spreadsheet imported via API"
    );

    Ok((StatusCode::CREATED, Json(ApiResponse::success(response))).into_response())
}

/// Edit a staged record.
///
/// # Response
///
/// - `200 OK` - Updated record
/// - `400 Bad Request` - Validation error (per-field details)
/// - `404 Not Found` - Record no longer in staging
#[tracing::instrument(skip(state, command), fields(record_id = id))]
async fn update_record(
    State(state): State<FeatureState>,
    Path(id): Path<i64>,
    Json(mut command): Json<UpdateStagedRecordCommand>,
) -> Result<Response, StagingApiError> {
    command.id = id;

    let record = super::commands::update::handle(&state, command).await?;

    tracing::info!(record_id = record.id, "staged record updated via API");
    Ok((StatusCode::OK, Json(ApiResponse::success(record))).into_response())
}

/// Delete a staged record.
///
/// # Response
///
/// - `200 OK` - Record removed from staging
/// - `404 Not Found` - Record no longer in staging
/// - `409 Conflict` - A promote or delete is already in flight for it
#[tracing::instrument(skip(state), fields(record_id = id))]
async fn delete_record(
    State(state): State<FeatureState>,
    Path(id): Path<i64>,
) -> Result<Response, StagingApiError> {
    let command = DeleteStagedRecordCommand { id };
    let response = super::commands::delete::handle(&state, command).await?;

    Ok((StatusCode::OK, Json(ApiResponse::success(response))).into_response())
}

/// Promote one staged record into the authoritative dataset.
///
/// # Response
///
/// - `200 OK` - Promoted; body carries the new authoritative id
/// - `404 Not Found` - Record no longer in staging (including repeats)
/// - `409 Conflict` - A promote or delete is already in flight for it
/// - `422 Unprocessable Entity` - Location could not be resolved
/// - `502/503` - Upstream store rejected or unavailable
#[tracing::instrument(skip(state), fields(record_id = id))]
async fn promote_record(
    State(state): State<FeatureState>,
    Path(id): Path<i64>,
) -> Result<Response, StagingApiError> {
    let command = PromoteStagedRecordCommand { id };
    let response = super::commands::promote_one::handle(&state, command).await?;

    Ok((StatusCode::OK, Json(ApiResponse::success(response))).into_response())
}

/// Promote every remaining record of a batch.
///
/// # Response
///
/// - `200 OK` - Sweep finished; body lists promoted and failed records
/// - `404 Not Found` - Unknown batch
#[tracing::instrument(skip(state), fields(batch_id = id))]
async fn promote_batch(
    State(state): State<FeatureState>,
    Path(id): Path<i64>,
) -> Result<Response, StagingApiError> {
    let command = PromoteBatchCommand { batch_id: id };
    let response = super::commands::promote_all::handle(&state, command).await?;

    Ok((StatusCode::OK, Json(ApiResponse::success(response))).into_response())
}

// ============================================================================
// Query Handlers (Read Operations)
// ============================================================================

/// List staged records with pagination, optionally scoped to one batch.
#[tracing::instrument(skip(state, query))]
async fn list_records(
    State(state): State<FeatureState>,
    Query(query): Query<ListStagedRecordsQuery>,
) -> Result<Response, StagingApiError> {
    let response = super::queries::list::handle(&state, query).await?;

    let meta = json!({
        "pagination": response.pagination,
        "batches": response.batches,
    });

    Ok(
        (StatusCode::OK, Json(ApiResponse::success_with_meta(response.items, meta)))
            .into_response(),
    )
}

/// Aggregate statistics over the staging area.
#[tracing::instrument(skip(state, query))]
async fn staging_stats(
    State(state): State<FeatureState>,
    Query(query): Query<StagingStatsQuery>,
) -> Result<Response, StagingApiError> {
    let response = super::queries::stats::handle(&state, query).await?;

    Ok((StatusCode::OK, Json(ApiResponse::success(response))).into_response())
}

const XLSX_CONTENT_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

/// Download the current staging set as a workbook.
#[tracing::instrument(skip(state, query))]
async fn export_staging(
    State(state): State<FeatureState>,
    Query(query): Query<ExportStagingQuery>,
) -> Result<Response, StagingApiError> {
    let bytes = super::queries::export::handle(&state, query).await?;

    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, XLSX_CONTENT_TYPE),
            (
                header::CONTENT_DISPOSITION,
                "attachment; filename=\"staging-export.xlsx\"",
            ),
        ],
        bytes,
    )
        .into_response())
}

/// Download the empty import template.
#[tracing::instrument]
async fn download_template() -> Result<Response, StagingApiError> {
    let bytes = super::queries::template::handle()
        .map_err(|e| StagingApiError::Export(ExportStagingError::Workbook(e)))?;

    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, XLSX_CONTENT_TYPE),
            (
                header::CONTENT_DISPOSITION,
                "attachment; filename=\"import-template.xlsx\"",
            ),
        ],
        bytes,
    )
        .into_response())
}

// ============================================================================
// Error Handling
// ============================================================================

/// Unified error type for staging API endpoints.
#[derive(Debug)]
enum StagingApiError {
    Upload(String),
    Import(ImportSpreadsheetError),
    Update(UpdateStagedRecordError),
    Delete(DeleteStagedRecordError),
    Promote(PromoteStagedRecordError),
    PromoteBatch(PromoteBatchError),
    List(ListStagedRecordsError),
    Stats(StagingStatsError),
    Export(ExportStagingError),
}

impl From<ImportSpreadsheetError> for StagingApiError {
    fn from(err: ImportSpreadsheetError) -> Self {
        Self::Import(err)
    }
}

impl From<UpdateStagedRecordError> for StagingApiError {
    fn from(err: UpdateStagedRecordError) -> Self {
        Self::Update(err)
    }
}

impl From<DeleteStagedRecordError> for StagingApiError {
    fn from(err: DeleteStagedRecordError) -> Self {
        Self::Delete(err)
    }
}

impl From<PromoteStagedRecordError> for StagingApiError {
    fn from(err: PromoteStagedRecordError) -> Self {
        Self::Promote(err)
    }
}

impl From<PromoteBatchError> for StagingApiError {
    fn from(err: PromoteBatchError) -> Self {
        Self::PromoteBatch(err)
    }
}

impl From<ListStagedRecordsError> for StagingApiError {
    fn from(err: ListStagedRecordsError) -> Self {
        Self::List(err)
    }
}

impl From<StagingStatsError> for StagingApiError {
    fn from(err: StagingStatsError) -> Self {
        Self::Stats(err)
    }
}

impl From<ExportStagingError> for StagingApiError {
    fn from(err: ExportStagingError) -> Self {
        Self::Export(err)
    }
}

impl IntoResponse for StagingApiError {
    fn into_response(self) -> Response {
        match self {
            StagingApiError::Upload(message) => {
                let error = ErrorResponse::new("INVALID_UPLOAD", message);
                (StatusCode::BAD_REQUEST, Json(error)).into_response()
            },

            // Import errors
            StagingApiError::Import(err @ ImportSpreadsheetError::UnsupportedFileType(_)) => {
                let error = ErrorResponse::new("UNSUPPORTED_FILE_TYPE", err.to_string());
                (StatusCode::BAD_REQUEST, Json(error)).into_response()
            },
            StagingApiError::Import(err @ ImportSpreadsheetError::FileTooLarge { .. }) => {
                let error = ErrorResponse::new("FILE_TOO_LARGE", err.to_string());
                (StatusCode::PAYLOAD_TOO_LARGE, Json(error)).into_response()
            },
            StagingApiError::Import(ImportSpreadsheetError::Spreadsheet(err)) => {
                let error = ErrorResponse::new("INVALID_SPREADSHEET", err.to_string());
                (StatusCode::BAD_REQUEST, Json(error)).into_response()
            },
            StagingApiError::Import(ImportSpreadsheetError::EmptyImport { row_errors }) => {
                let error = ErrorResponse::with_details(
                    "EMPTY_IMPORT",
                    "spreadsheet contains no valid rows; no batch was created",
                    json!({ "row_errors": row_errors }),
                );
                (StatusCode::UNPROCESSABLE_ENTITY, Json(error)).into_response()
            },

            // Update errors
            StagingApiError::Update(err @ UpdateStagedRecordError::NoFieldsToUpdate) => {
                let error = ErrorResponse::new("VALIDATION_ERROR", err.to_string());
                (StatusCode::BAD_REQUEST, Json(error)).into_response()
            },
            StagingApiError::Update(UpdateStagedRecordError::Validation(fields)) => {
                let error = ErrorResponse::with_details(
                    "VALIDATION_ERROR",
                    "one or more fields failed validation",
                    json!({ "fields": fields }),
                );
                (StatusCode::BAD_REQUEST, Json(error)).into_response()
            },
            StagingApiError::Update(err @ UpdateStagedRecordError::NotFound(_)) => {
                not_found(err.to_string())
            },

            // Delete errors
            StagingApiError::Delete(err @ DeleteStagedRecordError::NotFound(_)) => {
                not_found(err.to_string())
            },
            StagingApiError::Delete(err @ DeleteStagedRecordError::OperationInProgress(_)) => {
                conflict(err.to_string())
            },

            // Promote errors
            StagingApiError::Promote(err @ PromoteStagedRecordError::NotFound(_)) => {
                not_found(err.to_string())
            },
            StagingApiError::Promote(err @ PromoteStagedRecordError::OperationInProgress(_)) => {
                conflict(err.to_string())
            },
            StagingApiError::Promote(PromoteStagedRecordError::UnresolvedLocation {
                level,
                label,
            }) => {
                let error = ErrorResponse::with_details(
                    "UNRESOLVED_LOCATION",
                    format!("no {} matches '{}'", level, label),
                    json!({ "level": level, "label": label }),
                );
                (StatusCode::UNPROCESSABLE_ENTITY, Json(error)).into_response()
            },
            StagingApiError::Promote(PromoteStagedRecordError::Store(err)) => {
                store_error(err)
            },

            StagingApiError::PromoteBatch(err @ PromoteBatchError::NotFound(_)) => {
                not_found(err.to_string())
            },

            // Query errors
            StagingApiError::List(err @ ListStagedRecordsError::InvalidPagination(_)) => {
                let error = ErrorResponse::new("VALIDATION_ERROR", err.to_string());
                (StatusCode::BAD_REQUEST, Json(error)).into_response()
            },
            StagingApiError::List(err @ ListStagedRecordsError::BatchNotFound(_)) => {
                not_found(err.to_string())
            },
            StagingApiError::Stats(err @ StagingStatsError::BatchNotFound(_)) => {
                not_found(err.to_string())
            },
            StagingApiError::Export(err @ ExportStagingError::BatchNotFound(_)) => {
                not_found(err.to_string())
            },
            StagingApiError::Export(ExportStagingError::Workbook(err)) => {
                tracing::error!("workbook generation failed: {}", err);
                let error = ErrorResponse::new("INTERNAL_ERROR", "failed to generate workbook");
                (StatusCode::INTERNAL_SERVER_ERROR, Json(error)).into_response()
            },
        }
    }
}

fn not_found(message: String) -> Response {
    let error = ErrorResponse::new("NOT_FOUND", message);
    (StatusCode::NOT_FOUND, Json(error)).into_response()
}

fn conflict(message: String) -> Response {
    let error = ErrorResponse::new("OPERATION_IN_PROGRESS", message);
    (StatusCode::CONFLICT, Json(error)).into_response()
}

fn store_error(err: StoreError) -> Response {
    if err.is_retryable() {
        tracing::error!("upstream store unavailable: {}", err);
        let error = ErrorResponse::new(
            "UPSTREAM_UNAVAILABLE",
            "the authoritative store is unavailable; retry later",
        );
        (StatusCode::SERVICE_UNAVAILABLE, Json(error)).into_response()
    } else {
        tracing::error!("upstream store rejected the request: {}", err);
        let error = ErrorResponse::new("UPSTREAM_REJECTED", err.to_string());
        (StatusCode::BAD_GATEWAY, Json(error)).into_response()
    }
}
