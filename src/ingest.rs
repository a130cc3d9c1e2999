//
// ingest.rs
// Dicom-Catalog-rs
//
// Ingestion pipeline: store the uploaded bytes, parse the stored file's header, catalog the result.
//
// Thales Matheus Mendonça Santos - October 2026

use std::path::Path;

use tracing::{info, warn};

use crate::catalog::Catalog;
use crate::error::{CatalogError, Result};
use crate::header;
use crate::models::StudyRecord;
use crate::storage::{DuplicatePolicy, FileStore};

/// File store and catalog wired together; cheap to clone and share across workers.
#[derive(Clone)]
pub struct Ingestor {
    store: FileStore,
    catalog: Catalog,
}

impl Ingestor {
    pub fn new(store: FileStore, catalog: Catalog) -> Self {
        Self { store, catalog }
    }

    pub fn store(&self) -> &FileStore {
        &self.store
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// A copy sharing the same catalog whose file store uses `policy`.
    pub fn with_duplicate_policy(&self, policy: DuplicatePolicy) -> Self {
        Self {
            store: self.store.with_policy(policy),
            catalog: self.catalog.clone(),
        }
    }

    /// Runs one upload through `Received -> Stored -> Parsed -> Cataloged`.
    ///
    /// A parse failure ends the request after `Stored`: the blob stays in the file
    /// store and no record is created.
    pub fn ingest(&self, file_name: &str, bytes: &[u8]) -> Result<StudyRecord> {
        info!(file_name, size = bytes.len(), "received upload");

        let (stored_name, path) = self.store.put(file_name, bytes)?;
        info!(stored = %stored_name, "stored upload");

        let fields = match header::parse(&path) {
            Ok(fields) => fields,
            Err(err) => {
                warn!(stored = %stored_name, error = %err, "header parse failed; stored file left without a catalog entry");
                return Err(err);
            }
        };

        let record = self.catalog.ingest(fields, &stored_name)?;
        info!(id = record.id, patient = %record.patient_name, stored = %stored_name, "cataloged study");
        Ok(record)
    }

    /// Ingests a file already on local disk, named after its final path component.
    pub fn ingest_path(&self, path: &Path) -> Result<StudyRecord> {
        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| {
                CatalogError::storage_read(
                    &path.display().to_string(),
                    std::io::Error::new(
                        std::io::ErrorKind::InvalidInput,
                        "path has no UTF-8 file name",
                    ),
                )
            })?;
        self.ingest_path_as(path, file_name)
    }

    /// Ingests a file already on local disk under an explicit stored name.
    pub fn ingest_path_as(&self, path: &Path, file_name: &str) -> Result<StudyRecord> {
        let bytes = std::fs::read(path)
            .map_err(|e| CatalogError::storage_read(&path.display().to_string(), e))?;
        self.ingest(file_name, &bytes)
    }

    pub fn search(&self, query: &str) -> Result<Vec<StudyRecord>> {
        self.catalog.search(query)
    }
}
