//! Import template download
//!
//! An empty workbook carrying only the canonical header row, handed to
//! operators so uploads arrive with the expected columns.

use crate::spreadsheet::schema::headers;
use crate::spreadsheet::write::{build_workbook, Cell, WriteError};

/// Builds the empty import template.
pub fn handle() -> Result<Vec<u8>, WriteError> {
    let header: Vec<Cell> = headers()
        .into_iter()
        .map(|h| Cell::Text(h.to_string()))
        .collect();
    build_workbook(&[header])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spreadsheet::parse_records;

    #[test]
    fn test_template_parses_with_zero_rows() {
        let bytes = handle().unwrap();
        let rows = parse_records(&bytes).unwrap();
        assert!(rows.is_empty());
    }
}
