//! Spreadsheet codec for the staging pipeline
//!
//! - [`schema`]: the explicit column table (header name -> field). Column
//!   order in the source file is not significant; headers are matched by
//!   name so reordered files cannot silently corrupt data.
//! - [`read`]: `.xlsx`/`.xls` ingestion producing per-row results
//! - [`write`]: minimal OOXML emitter used by export and the template

pub mod read;
pub mod schema;
pub mod write;

pub use read::{parse_records, RowError, SpreadsheetError};
pub use schema::Column;
pub use write::{build_workbook, Cell};
