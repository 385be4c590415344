//! Staged bulk-import and promotion pipeline
//!
//! Mosque records are bulk-ingested from spreadsheet uploads into a
//! staging area, optionally edited, then promoted individually or per
//! batch into the authoritative dataset. Batch status is a projection
//! over what happened to a batch's records; nothing sets it directly.

pub mod commands;
pub mod inflight;
pub mod queries;
pub mod routes;

pub use commands::{
    DeleteStagedRecordCommand, DeleteStagedRecordError, DeleteStagedRecordResponse,
    ImportSpreadsheetCommand, ImportSpreadsheetError, ImportSpreadsheetResponse,
    PromoteBatchCommand, PromoteBatchError, PromoteBatchResponse, PromoteStagedRecordCommand,
    PromoteStagedRecordError, PromoteStagedRecordResponse, UpdateStagedRecordCommand,
    UpdateStagedRecordError,
};
pub use inflight::InFlight;
pub use queries::{
    ExportStagingError, ExportStagingQuery, ListStagedRecordsError, ListStagedRecordsQuery,
    ListStagedRecordsResponse, StagingStatsError, StagingStatsQuery, StagingStatsResponse,
};
pub use routes::staging_routes;
