//
// error.rs
// Dicom-Catalog-rs
//
// Error type shared by the file store, header parser, catalog and ingestion pipeline.
//
// Thales Matheus Mendonça Santos - October 2026

use std::io;
use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CatalogError {
    /// The blob could not be written to the file store; nothing was cataloged.
    #[error("failed to store {name}: {source}")]
    StorageWrite {
        name: String,
        #[source]
        source: io::Error,
    },

    #[error("failed to read stored file {name}: {source}")]
    StorageRead {
        name: String,
        #[source]
        source: io::Error,
    },

    /// The stored file is not a well-formed DICOM file.
    #[error("{} is not a readable DICOM file: {reason}", path.display())]
    Parse { path: PathBuf, reason: String },

    #[error("catalog persistence failed: {0}")]
    Persistence(#[from] rusqlite::Error),

    #[error("catalog connection is unavailable after a panic in another request")]
    CatalogUnavailable,

    #[error("study {0} not found")]
    NotFound(i64),
}

impl CatalogError {
    pub(crate) fn storage_write(name: &str, source: io::Error) -> Self {
        CatalogError::StorageWrite {
            name: name.to_string(),
            source,
        }
    }

    pub(crate) fn storage_read(name: &str, source: io::Error) -> Self {
        CatalogError::StorageRead {
            name: name.to_string(),
            source,
        }
    }
}

pub type Result<T, E = CatalogError> = std::result::Result<T, E>;
