//! Write operations on the staging area

pub mod delete;
pub mod import;
pub mod promote_all;
pub mod promote_one;
pub mod update;

pub use delete::{DeleteStagedRecordCommand, DeleteStagedRecordError, DeleteStagedRecordResponse};
pub use import::{ImportSpreadsheetCommand, ImportSpreadsheetError, ImportSpreadsheetResponse};
pub use promote_all::{PromoteBatchCommand, PromoteBatchError, PromoteBatchResponse};
pub use promote_one::{
    PromoteStagedRecordCommand, PromoteStagedRecordError, PromoteStagedRecordResponse,
};
pub use update::{UpdateStagedRecordCommand, UpdateStagedRecordError};
