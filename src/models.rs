//
// models.rs
// Dicom-Catalog-rs
//
// Defines serializable data structures for parsed header fields and catalog records.
//
// Thales Matheus Mendonça Santos - October 2026

use serde::{Deserialize, Serialize};

/// The six display strings pulled out of a DICOM header, defaults already applied.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParsedFields {
    pub patient_name: String,
    pub study_date: String,
    pub patient_birth_date: String,
    pub study_description: String,
    pub patient_id: String,
    pub institution_name: String,
}

/// One catalog entry: the parsed fields plus identity and the file-store reference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudyRecord {
    pub id: i64,
    pub patient_name: String,
    pub study_date: String,
    pub patient_birth_date: String,
    pub study_description: String,
    pub patient_id: String,
    pub institution_name: String,
    pub stored_file_name: String,
}

impl StudyRecord {
    pub fn from_parsed(id: i64, fields: ParsedFields, stored_file_name: String) -> Self {
        Self {
            id,
            patient_name: fields.patient_name,
            study_date: fields.study_date,
            patient_birth_date: fields.patient_birth_date,
            study_description: fields.study_description,
            patient_id: fields.patient_id,
            institution_name: fields.institution_name,
            stored_file_name,
        }
    }
}
