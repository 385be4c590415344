//! Column schema for mosque import spreadsheets
//!
//! One table drives header matching on import, the template download, and
//! the export layout. Canonical headers are Arabic (what the field teams
//! use); English aliases are accepted on import.

use crate::models::{DamageLevel, StagedFields};
use crate::spreadsheet::write::Cell;

/// The logical columns of an import spreadsheet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Column {
    NameAr,
    NameEn,
    Governorate,
    District,
    SubDistrict,
    Neighborhood,
    Address,
    DamageLevel,
    EstimatedCost,
    WorkType,
    Committee,
    Notes,
}

/// One entry of the schema table.
pub struct ColumnSpec {
    pub column: Column,
    /// Canonical header, written by template and export.
    pub header: &'static str,
    /// Accepted alternatives, matched case-insensitively after trimming.
    pub aliases: &'static [&'static str],
    /// Whether the column must be present in the header row.
    pub required: bool,
}

/// The schema table, in template/export column order.
pub const SCHEMA: [ColumnSpec; 12] = [
    ColumnSpec {
        column: Column::NameAr,
        header: "اسم المسجد (عربي)",
        aliases: &["name_ar", "mosque name (ar)", "arabic name"],
        required: true,
    },
    ColumnSpec {
        column: Column::NameEn,
        header: "اسم المسجد (إنجليزي)",
        aliases: &["name_en", "mosque name (en)", "english name"],
        required: true,
    },
    ColumnSpec {
        column: Column::Governorate,
        header: "المحافظة",
        aliases: &["governorate"],
        required: true,
    },
    ColumnSpec {
        column: Column::District,
        header: "المنطقة",
        aliases: &["district"],
        required: true,
    },
    ColumnSpec {
        column: Column::SubDistrict,
        header: "الناحية",
        aliases: &["sub_district", "sub-district", "subdistrict"],
        required: true,
    },
    ColumnSpec {
        column: Column::Neighborhood,
        header: "الحي",
        aliases: &["neighborhood", "neighbourhood"],
        required: true,
    },
    ColumnSpec {
        column: Column::Address,
        header: "العنوان",
        aliases: &["address"],
        required: false,
    },
    ColumnSpec {
        column: Column::DamageLevel,
        header: "مستوى الضرر",
        aliases: &["damage_level", "damage level"],
        required: true,
    },
    ColumnSpec {
        column: Column::EstimatedCost,
        header: "التكلفة التقديرية",
        aliases: &["estimated_cost", "estimated cost", "cost"],
        required: true,
    },
    ColumnSpec {
        column: Column::WorkType,
        header: "نوع العمل",
        aliases: &["work_type", "work type"],
        required: true,
    },
    ColumnSpec {
        column: Column::Committee,
        header: "اللجنة المسؤولة",
        aliases: &["committee", "committee_name", "committee name"],
        required: true,
    },
    ColumnSpec {
        column: Column::Notes,
        header: "ملاحظات",
        aliases: &["notes"],
        required: false,
    },
];

/// Match a raw header cell against the schema table.
pub fn match_header(raw: &str) -> Option<Column> {
    let normalized = raw.trim().to_lowercase();
    if normalized.is_empty() {
        return None;
    }
    SCHEMA
        .iter()
        .find(|spec| {
            spec.header == normalized.as_str()
                || spec.header == raw.trim()
                || spec.aliases.contains(&normalized.as_str())
        })
        .map(|spec| spec.column)
}

/// Canonical headers in template/export order.
pub fn headers() -> Vec<&'static str> {
    SCHEMA.iter().map(|spec| spec.header).collect()
}

/// Parse a damage-level cell. Accepts the Arabic survey vocabulary and the
/// English enum names.
pub fn parse_damage_level(raw: &str) -> Option<DamageLevel> {
    match raw.trim().to_lowercase().as_str() {
        "جزئي" | "partial" => Some(DamageLevel::Partial),
        "كامل" | "complete" | "كلي" => Some(DamageLevel::Complete),
        _ => None,
    }
}

/// Parse a work-type cell into the reconstruction flag.
/// Empty defaults to restoration.
pub fn parse_work_type(raw: &str) -> Option<bool> {
    match raw.trim().to_lowercase().as_str() {
        "" => Some(false),
        "إعادة إعمار" | "اعادة اعمار" | "إعمار" | "reconstruction" | "true" | "yes"
        | "نعم" | "1" => Some(true),
        "ترميم" | "restoration" | "false" | "no" | "لا" | "0" => Some(false),
        _ => None,
    }
}

/// Human label written back by export.
pub fn work_type_label(is_reconstruction: bool) -> &'static str {
    if is_reconstruction {
        "إعادة إعمار"
    } else {
        "ترميم"
    }
}

/// Human label written back by export.
pub fn damage_level_label(level: DamageLevel) -> &'static str {
    match level {
        DamageLevel::Partial => "جزئي",
        DamageLevel::Complete => "كامل",
    }
}

/// A staged record's fields as an export row, in schema order.
pub fn fields_to_row(fields: &StagedFields) -> Vec<Cell> {
    vec![
        Cell::Text(fields.name_ar.clone()),
        Cell::Text(fields.name_en.clone()),
        Cell::Text(fields.location.governorate.clone()),
        Cell::Text(fields.location.district.clone()),
        Cell::Text(fields.location.sub_district.clone()),
        Cell::Text(fields.location.neighborhood.clone()),
        Cell::Text(fields.address.clone().unwrap_or_default()),
        Cell::Text(damage_level_label(fields.damage_level).to_string()),
        Cell::Number(fields.estimated_cost),
        Cell::Text(work_type_label(fields.is_reconstruction).to_string()),
        Cell::Text(fields.committee_name.clone()),
        Cell::Text(fields.notes.clone().unwrap_or_default()),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_match_header_canonical_arabic() {
        assert_eq!(match_header("المحافظة"), Some(Column::Governorate));
        assert_eq!(match_header(" مستوى الضرر "), Some(Column::DamageLevel));
    }

    #[test]
    fn test_match_header_english_aliases() {
        assert_eq!(match_header("Governorate"), Some(Column::Governorate));
        assert_eq!(match_header("SUB-DISTRICT"), Some(Column::SubDistrict));
        assert_eq!(match_header("estimated cost"), Some(Column::EstimatedCost));
        assert_eq!(match_header("unknown column"), None);
        assert_eq!(match_header(""), None);
    }

    #[test]
    fn test_parse_damage_level_vocabulary() {
        assert_eq!(parse_damage_level("جزئي"), Some(DamageLevel::Partial));
        assert_eq!(parse_damage_level("كامل"), Some(DamageLevel::Complete));
        assert_eq!(parse_damage_level("Partial"), Some(DamageLevel::Partial));
        assert_eq!(parse_damage_level("severe"), None);
    }

    #[test]
    fn test_parse_work_type_vocabulary() {
        assert_eq!(parse_work_type("إعادة إعمار"), Some(true));
        assert_eq!(parse_work_type("ترميم"), Some(false));
        assert_eq!(parse_work_type("reconstruction"), Some(true));
        assert_eq!(parse_work_type(""), Some(false));
        assert_eq!(parse_work_type("maybe"), None);
    }

    #[test]
    fn test_every_header_matches_itself() {
        // Export writes canonical headers; import must accept them back.
        for spec in &SCHEMA {
            assert_eq!(match_header(spec.header), Some(spec.column));
        }
    }
}
