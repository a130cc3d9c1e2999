//
// header.rs
// Dicom-Catalog-rs
//
// Decodes the metadata header of a stored DICOM file into the six catalog fields.
//
// Thales Matheus Mendonça Santos - October 2026

use std::path::Path;

use dicom::core::Tag;
use dicom::dictionary_std::tags;
use dicom::object::{DefaultDicomObject, OpenFileOptions};
use tracing::debug;

use crate::dicom_access::ElementAccess;
use crate::error::{CatalogError, Result};
use crate::models::ParsedFields;

/// The header attributes the catalog records, each with its fallback text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeaderField {
    PatientName,
    StudyDate,
    PatientBirthDate,
    StudyDescription,
    PatientId,
    InstitutionName,
}

impl HeaderField {
    pub const ALL: [HeaderField; 6] = [
        HeaderField::PatientName,
        HeaderField::StudyDate,
        HeaderField::PatientBirthDate,
        HeaderField::StudyDescription,
        HeaderField::PatientId,
        HeaderField::InstitutionName,
    ];

    pub fn tag(self) -> Tag {
        match self {
            HeaderField::PatientName => tags::PATIENT_NAME,
            HeaderField::StudyDate => tags::STUDY_DATE,
            HeaderField::PatientBirthDate => tags::PATIENT_BIRTH_DATE,
            HeaderField::StudyDescription => tags::STUDY_DESCRIPTION,
            HeaderField::PatientId => tags::PATIENT_ID,
            HeaderField::InstitutionName => tags::INSTITUTION_NAME,
        }
    }

    /// Value recorded when the tag is missing from the header.
    pub fn default_text(self) -> &'static str {
        match self {
            HeaderField::PatientName => "Unknown",
            HeaderField::StudyDate => "No date",
            HeaderField::PatientBirthDate => "Unknown",
            HeaderField::StudyDescription => "No description",
            HeaderField::PatientId => "No ID",
            HeaderField::InstitutionName => "Unknown",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            HeaderField::PatientName => "Patient Name",
            HeaderField::StudyDate => "Study Date",
            HeaderField::PatientBirthDate => "Birth Date",
            HeaderField::StudyDescription => "Study Description",
            HeaderField::PatientId => "Patient ID",
            HeaderField::InstitutionName => "Institution",
        }
    }
}

fn text_or_default<T: ElementAccess>(obj: &T, field: HeaderField) -> String {
    obj.element_text(field.tag())
        .unwrap_or_else(|| field.default_text().to_string())
}

/// Pulls the six catalog fields out of an already decoded object.
pub fn extract_fields<T: ElementAccess>(obj: &T) -> ParsedFields {
    ParsedFields {
        patient_name: text_or_default(obj, HeaderField::PatientName),
        study_date: text_or_default(obj, HeaderField::StudyDate),
        patient_birth_date: text_or_default(obj, HeaderField::PatientBirthDate),
        study_description: text_or_default(obj, HeaderField::StudyDescription),
        patient_id: text_or_default(obj, HeaderField::PatientId),
        institution_name: text_or_default(obj, HeaderField::InstitutionName),
    }
}

/// Opens a stored DICOM file and extracts its catalog fields.
///
/// Only the header is decoded: reading stops before Pixel Data. Missing tags fall
/// back to [`HeaderField::default_text`]; only a file that is not DICOM at all
/// (no preamble, bad magic, truncated meta group or dataset) is an error.
pub fn parse(path: &Path) -> Result<ParsedFields> {
    let obj: DefaultDicomObject = OpenFileOptions::new()
        .read_until(tags::PIXEL_DATA)
        .open_file(path)
        .map_err(|e| CatalogError::Parse {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

    let fields = extract_fields(&obj);
    debug!(path = %path.display(), patient = %fields.patient_name, "parsed DICOM header");
    Ok(fields)
}

/// Field/value pairs in display order, for CLI output.
pub fn labeled(fields: &ParsedFields) -> [(&'static str, &str); 6] {
    [
        (HeaderField::PatientName.label(), fields.patient_name.as_str()),
        (HeaderField::StudyDate.label(), fields.study_date.as_str()),
        (HeaderField::PatientBirthDate.label(), fields.patient_birth_date.as_str()),
        (HeaderField::StudyDescription.label(), fields.study_description.as_str()),
        (HeaderField::PatientId.label(), fields.patient_id.as_str()),
        (HeaderField::InstitutionName.label(), fields.institution_name.as_str()),
    ]
}
