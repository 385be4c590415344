//! Update staged record command
//!
//! Partial edit of one staged record: a fixed struct with one optional
//! field per editable column. Every supplied field is re-validated on the
//! server regardless of client-side checks; failures are collected per
//! field and reported together.

use serde::{Deserialize, Serialize};

use crate::features::shared::validation::{
    validate_cost, validate_optional_text, validate_required_text, FieldError,
};
use crate::features::FeatureState;
use crate::models::{DamageLevel, StagedRecord};

/// Command to update a staged record. Absent fields are left unchanged.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateStagedRecordCommand {
    /// Set from the path parameter, not the body.
    #[serde(skip)]
    pub id: i64,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub name_ar: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name_en: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub governorate: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub district: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sub_district: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub neighborhood: Option<String>,
    /// Double option: absent = unchanged, null = clear.
    #[serde(
        default,
        deserialize_with = "present_field",
        skip_serializing_if = "Option::is_none"
    )]
    pub address: Option<Option<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub damage_level: Option<DamageLevel>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub estimated_cost: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_reconstruction: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub committee_name: Option<String>,
    #[serde(
        default,
        deserialize_with = "present_field",
        skip_serializing_if = "Option::is_none"
    )]
    pub notes: Option<Option<String>>,
}

/// Distinguishes an absent key (outer `None`, unchanged) from an explicit
/// `null` (Some(None), clear the field).
fn present_field<'de, T, D>(deserializer: D) -> Result<Option<T>, D::Error>
where
    T: serde::Deserialize<'de>,
    D: serde::Deserializer<'de>,
{
    T::deserialize(deserializer).map(Some)
}

/// Errors that can occur when updating a staged record.
#[derive(Debug, thiserror::Error)]
pub enum UpdateStagedRecordError {
    #[error("no fields to update")]
    NoFieldsToUpdate,

    #[error("validation failed for {} field(s)", .0.len())]
    Validation(Vec<FieldError>),

    #[error("staged record {0} not found")]
    NotFound(i64),
}

impl UpdateStagedRecordCommand {
    /// Validates every supplied field, collecting all failures.
    pub fn validate(&self) -> Result<(), UpdateStagedRecordError> {
        if !self.has_changes() {
            return Err(UpdateStagedRecordError::NoFieldsToUpdate);
        }

        let mut errors = Vec::new();
        let mut check = |result: Result<(), FieldError>| {
            if let Err(err) = result {
                errors.push(err);
            }
        };

        if let Some(value) = &self.name_ar {
            check(validate_required_text("name_ar", value));
        }
        if let Some(value) = &self.name_en {
            check(validate_required_text("name_en", value));
        }
        if let Some(value) = &self.governorate {
            check(validate_required_text("governorate", value));
        }
        if let Some(value) = &self.district {
            check(validate_required_text("district", value));
        }
        if let Some(value) = &self.sub_district {
            check(validate_required_text("sub_district", value));
        }
        if let Some(value) = &self.neighborhood {
            check(validate_required_text("neighborhood", value));
        }
        if let Some(value) = &self.address {
            check(validate_optional_text("address", value.as_deref()));
        }
        if let Some(value) = self.estimated_cost {
            check(validate_cost("estimated_cost", value));
        }
        if let Some(value) = &self.committee_name {
            check(validate_required_text("committee_name", value));
        }
        if let Some(value) = &self.notes {
            check(validate_optional_text("notes", value.as_deref()));
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(UpdateStagedRecordError::Validation(errors))
        }
    }

    fn has_changes(&self) -> bool {
        self.name_ar.is_some()
            || self.name_en.is_some()
            || self.governorate.is_some()
            || self.district.is_some()
            || self.sub_district.is_some()
            || self.neighborhood.is_some()
            || self.address.is_some()
            || self.damage_level.is_some()
            || self.estimated_cost.is_some()
            || self.is_reconstruction.is_some()
            || self.committee_name.is_some()
            || self.notes.is_some()
    }

    /// Apply the supplied fields onto an existing record.
    fn apply(self, record: &mut StagedRecord) {
        let fields = &mut record.fields;
        if let Some(value) = self.name_ar {
            fields.name_ar = value.trim().to_string();
        }
        if let Some(value) = self.name_en {
            fields.name_en = value.trim().to_string();
        }
        if let Some(value) = self.governorate {
            fields.location.governorate = value.trim().to_string();
        }
        if let Some(value) = self.district {
            fields.location.district = value.trim().to_string();
        }
        if let Some(value) = self.sub_district {
            fields.location.sub_district = value.trim().to_string();
        }
        if let Some(value) = self.neighborhood {
            fields.location.neighborhood = value.trim().to_string();
        }
        if let Some(value) = self.address {
            fields.address = value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        }
        if let Some(value) = self.damage_level {
            fields.damage_level = value;
        }
        if let Some(value) = self.estimated_cost {
            fields.estimated_cost = value;
        }
        if let Some(value) = self.is_reconstruction {
            fields.is_reconstruction = value;
        }
        if let Some(value) = self.committee_name {
            fields.committee_name = value.trim().to_string();
        }
        if let Some(value) = self.notes {
            fields.notes = value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        }
    }
}

/// Handles the update command.
///
/// Editing and promotion race safely: if the record leaves staging between
/// the read and the save, the save observes `None` and the edit reports
/// `NotFound` rather than resurrecting the record.
#[tracing::instrument(skip(state, command), fields(record_id = command.id))]
pub async fn handle(
    state: &FeatureState,
    command: UpdateStagedRecordCommand,
) -> Result<StagedRecord, UpdateStagedRecordError> {
    command.validate()?;

    let id = command.id;
    let mut record = state
        .staging
        .get(id)
        .await
        .ok_or(UpdateStagedRecordError::NotFound(id))?;

    command.apply(&mut record);

    let saved = state
        .staging
        .save(record)
        .await
        .ok_or(UpdateStagedRecordError::NotFound(id))?;

    tracing::info!(record_id = saved.id, "staged record updated");
    Ok(saved)
}
