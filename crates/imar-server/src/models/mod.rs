//! Domain types for the staged import and promotion pipeline
//!
//! A [`StagedRecord`] exists only while it sits in the staging store: it is
//! created by the ingestor, mutated by the edit layer, and destroyed either
//! by promotion (which produces an authoritative mosque record upstream) or
//! by operator deletion. A [`Batch`] groups the records that came from one
//! spreadsheet upload; its status is derived from what happened to its
//! records, never set directly.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Damage classification of a mosque, as recorded in the field survey.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DamageLevel {
    Partial,
    Complete,
}

impl std::fmt::Display for DamageLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DamageLevel::Partial => write!(f, "partial"),
            DamageLevel::Complete => write!(f, "complete"),
        }
    }
}

/// Free-text location labels as they appear in the spreadsheet.
///
/// Not resolved to identifiers until promotion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocationLabels {
    pub governorate: String,
    pub district: String,
    pub sub_district: String,
    pub neighborhood: String,
}

/// One level of the location hierarchy, used in resolution errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LocationLevel {
    Governorate,
    District,
    SubDistrict,
    Neighborhood,
}

impl std::fmt::Display for LocationLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LocationLevel::Governorate => write!(f, "governorate"),
            LocationLevel::District => write!(f, "district"),
            LocationLevel::SubDistrict => write!(f, "sub-district"),
            LocationLevel::Neighborhood => write!(f, "neighborhood"),
        }
    }
}

/// Numeric location identifiers resolved against the authoritative hierarchy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedLocation {
    pub governorate_id: i64,
    pub district_id: i64,
    pub sub_district_id: i64,
    pub neighborhood_id: i64,
}

/// The editable field set of a staged record.
///
/// Shared between freshly parsed spreadsheet rows and records already in
/// staging; identity and batch membership live on [`StagedRecord`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StagedFields {
    pub name_ar: String,
    pub name_en: String,
    #[serde(flatten)]
    pub location: LocationLabels,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    pub damage_level: DamageLevel,
    pub estimated_cost: f64,
    /// true = reconstruction, false = restoration
    pub is_reconstruction: bool,
    pub committee_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

/// A mosque record awaiting promotion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StagedRecord {
    pub id: i64,
    /// Immutable once assigned at ingestion.
    pub batch_id: i64,
    pub created_at: DateTime<Utc>,
    #[serde(flatten)]
    pub fields: StagedFields,
}

/// Derived batch status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BatchStatus {
    /// At least one record is still staged.
    Reviewing,
    /// Every record was promoted or deleted, and at least one was promoted.
    Completed,
    /// Every record was deleted without any promotion.
    Rejected,
}

/// Batch metadata plus the derived status, as served to clients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchSummary {
    pub id: i64,
    pub source_filename: String,
    pub created_at: DateTime<Utc>,
    pub status: BatchStatus,
    /// Records still awaiting promotion or deletion.
    pub remaining: u64,
}

/// Initial status of a promoted mosque record in the authoritative store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MosqueStatus {
    UnderReview,
    Published,
}

/// Optional geocoordinates carried by authoritative records.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
}

/// Payload sent to the authoritative mosque store on promotion.
///
/// The upstream store assigns the permanent identifier; the pipeline holds
/// no reference to the created record beyond reporting it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewMosqueRecord {
    pub name_ar: String,
    pub name_en: String,
    pub location: ResolvedLocation,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    pub damage_level: DamageLevel,
    pub estimated_cost: f64,
    pub is_reconstruction: bool,
    pub committee_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub coordinates: Option<GeoPoint>,
    pub status: MosqueStatus,
}

impl NewMosqueRecord {
    /// Build the authoritative payload from a staged record and its
    /// resolved location. Coordinates are not captured at staging time.
    pub fn from_staged(fields: StagedFields, location: ResolvedLocation) -> Self {
        Self {
            name_ar: fields.name_ar,
            name_en: fields.name_en,
            location,
            address: fields.address,
            damage_level: fields.damage_level,
            estimated_cost: fields.estimated_cost,
            is_reconstruction: fields.is_reconstruction,
            committee_name: fields.committee_name,
            notes: fields.notes,
            coordinates: None,
            status: MosqueStatus::UnderReview,
        }
    }
}

/// Identifier of a promoted mosque record.
pub type MosqueId = Uuid;
