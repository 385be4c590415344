//! Spreadsheet ingestion
//!
//! Decodes an uploaded workbook and turns each data row into either a set of
//! staged fields or a row error. Row errors are collected, never thrown: a
//! bad row must not sink the rest of the file.

use calamine::{open_workbook_auto_from_rs, Data, Reader};
use serde::Serialize;
use std::collections::HashMap;
use std::io::Cursor;
use thiserror::Error;

use crate::models::{LocationLabels, StagedFields};
use crate::spreadsheet::schema::{
    match_header, parse_damage_level, parse_work_type, Column, SCHEMA,
};

/// File-level ingestion failure.
#[derive(Debug, Error)]
pub enum SpreadsheetError {
    /// The bytes could not be decoded as a supported workbook format.
    #[error("file could not be read as a spreadsheet: {0}")]
    Unreadable(String),

    /// The workbook has no worksheet or no header row.
    #[error("spreadsheet contains no header row")]
    NoHeader,

    /// Required columns are absent from the header row.
    #[error("missing required columns: {}", .0.join(", "))]
    MissingColumns(Vec<String>),
}

/// One rejected row, reported back to the operator.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct RowError {
    /// 1-based row number in the worksheet.
    pub row: u32,
    pub message: String,
}

/// Parse a workbook into per-row results.
///
/// The header row is the first non-empty row; every later non-empty row
/// yields either parsed fields or a [`RowError`]. Rows are processed one at
/// a time off the decoded sheet, so peak memory tracks the sheet size, not
/// the number of parsed records held as intermediate structures.
pub fn parse_records(
    bytes: &[u8],
) -> Result<Vec<(u32, Result<StagedFields, RowError>)>, SpreadsheetError> {
    let cursor = Cursor::new(bytes.to_vec());
    let mut workbook =
        open_workbook_auto_from_rs(cursor).map_err(|e| SpreadsheetError::Unreadable(e.to_string()))?;

    let range = workbook
        .worksheet_range_at(0)
        .ok_or(SpreadsheetError::NoHeader)?
        .map_err(|e| SpreadsheetError::Unreadable(e.to_string()))?;

    let mut rows = range.rows().enumerate();

    // Header: first row with at least one matching column.
    let columns = loop {
        let (_, row) = rows.next().ok_or(SpreadsheetError::NoHeader)?;
        let columns = map_header(row);
        if !columns.is_empty() {
            break columns;
        }
    };

    let missing: Vec<String> = SCHEMA
        .iter()
        .filter(|spec| spec.required && !columns.values().any(|c| *c == spec.column))
        .map(|spec| spec.header.to_string())
        .collect();
    if !missing.is_empty() {
        return Err(SpreadsheetError::MissingColumns(missing));
    }

    let mut results = Vec::new();
    for (index, row) in rows {
        if row.iter().all(is_blank) {
            continue;
        }
        let row_number = (index + 1) as u32;
        results.push((row_number, parse_row(row_number, row, &columns)));
    }

    Ok(results)
}

/// Map cell positions to schema columns for one header row.
fn map_header(row: &[Data]) -> HashMap<usize, Column> {
    row.iter()
        .enumerate()
        .filter_map(|(index, cell)| match_header(&cell_text(cell)).map(|col| (index, col)))
        .collect()
}

fn parse_row(
    row_number: u32,
    row: &[Data],
    columns: &HashMap<usize, Column>,
) -> Result<StagedFields, RowError> {
    let mut values: HashMap<Column, String> = HashMap::new();
    for (index, column) in columns {
        if let Some(cell) = row.get(*index) {
            values.insert(*column, cell_text(cell));
        }
    }

    let mut problems: Vec<String> = Vec::new();

    let required = |column: Column, label: &str, problems: &mut Vec<String>| -> String {
        let value = values.get(&column).cloned().unwrap_or_default();
        if value.trim().is_empty() {
            problems.push(format!("{} is required", label));
        }
        value.trim().to_string()
    };

    let name_ar = required(Column::NameAr, "mosque name (ar)", &mut problems);
    let name_en = required(Column::NameEn, "mosque name (en)", &mut problems);
    let governorate = required(Column::Governorate, "governorate", &mut problems);
    let district = required(Column::District, "district", &mut problems);
    let sub_district = required(Column::SubDistrict, "sub-district", &mut problems);
    let neighborhood = required(Column::Neighborhood, "neighborhood", &mut problems);

    let damage_raw = values.get(&Column::DamageLevel).cloned().unwrap_or_default();
    let damage_level = if damage_raw.trim().is_empty() {
        problems.push("damage level is required".to_string());
        None
    } else {
        let parsed = parse_damage_level(&damage_raw);
        if parsed.is_none() {
            problems.push(format!("unrecognized damage level '{}'", damage_raw.trim()));
        }
        parsed
    };

    let cost_raw = values.get(&Column::EstimatedCost).cloned().unwrap_or_default();
    let estimated_cost = parse_cost(&cost_raw).unwrap_or_else(|message| {
        problems.push(message);
        0.0
    });

    let work_raw = values.get(&Column::WorkType).cloned().unwrap_or_default();
    let is_reconstruction = parse_work_type(&work_raw).unwrap_or_else(|| {
        problems.push(format!("unrecognized work type '{}'", work_raw.trim()));
        false
    });

    if !problems.is_empty() {
        return Err(RowError {
            row: row_number,
            message: problems.join("; "),
        });
    }

    Ok(StagedFields {
        name_ar,
        name_en,
        location: LocationLabels {
            governorate,
            district,
            sub_district,
            neighborhood,
        },
        address: non_empty(values.get(&Column::Address)),
        // problems is empty, so the parse above succeeded
        damage_level: damage_level.unwrap_or(crate::models::DamageLevel::Partial),
        estimated_cost,
        is_reconstruction,
        committee_name: values
            .get(&Column::Committee)
            .map(|v| v.trim().to_string())
            .unwrap_or_default(),
        notes: non_empty(values.get(&Column::Notes)),
    })
}

fn non_empty(value: Option<&String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Empty cells are 0; anything else must parse to a non-negative number.
fn parse_cost(raw: &str) -> Result<f64, String> {
    let trimmed = raw.trim().replace(',', "");
    if trimmed.is_empty() {
        return Ok(0.0);
    }
    match trimmed.parse::<f64>() {
        Ok(value) if value.is_finite() && value >= 0.0 => Ok(value),
        Ok(_) => Err(format!("estimated cost '{}' must be non-negative", raw.trim())),
        Err(_) => Err(format!("estimated cost '{}' is not a number", raw.trim())),
    }
}

fn is_blank(cell: &Data) -> bool {
    match cell {
        Data::Empty => true,
        Data::String(s) => s.trim().is_empty(),
        _ => false,
    }
}

fn cell_text(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) => s.clone(),
        Data::Float(f) => {
            if f.fract() == 0.0 && f.abs() < 1e15 {
                format!("{}", *f as i64)
            } else {
                f.to_string()
            }
        },
        Data::Int(i) => i.to_string(),
        Data::Bool(b) => b.to_string(),
        other => other.to_string(),
    }
}
