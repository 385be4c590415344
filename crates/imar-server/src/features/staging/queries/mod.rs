//! Read operations on the staging area

pub mod export;
pub mod list;
pub mod stats;
pub mod template;

pub use export::{ExportStagingError, ExportStagingQuery};
pub use list::{ListStagedRecordsError, ListStagedRecordsQuery, ListStagedRecordsResponse};
pub use stats::{StagingStatsError, StagingStatsQuery, StagingStatsResponse};
