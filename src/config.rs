use std::path::PathBuf;

use anyhow::{Context, Result};

use crate::catalog::Catalog;
use crate::ingest::Ingestor;
use crate::storage::{DuplicatePolicy, FileStore};

/// Where uploads and the catalog database live, and how duplicate names are handled.
#[derive(Debug, Clone)]
pub struct CatalogConfig {
    pub data_dir: PathBuf,
    /// Defaults to `<data_dir>/studies.db`.
    pub database: Option<PathBuf>,
    pub duplicate_policy: DuplicatePolicy,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            database: None,
            duplicate_policy: DuplicatePolicy::default(),
        }
    }
}

impl CatalogConfig {
    pub fn upload_dir(&self) -> PathBuf {
        self.data_dir.join("uploads")
    }

    pub fn database_path(&self) -> PathBuf {
        self.database
            .clone()
            .unwrap_or_else(|| self.data_dir.join("studies.db"))
    }

    /// Creates the directories if needed and opens the file store and catalog.
    pub fn open(&self) -> Result<Ingestor> {
        let store = FileStore::new(self.upload_dir(), self.duplicate_policy)
            .with_context(|| format!("Failed to prepare upload directory {:?}", self.upload_dir()))?;
        let database = self.database_path();
        if let Some(parent) = database.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create database directory {:?}", parent))?;
        }
        let catalog = Catalog::open(&database)
            .with_context(|| format!("Failed to open catalog database {:?}", database))?;
        Ok(Ingestor::new(store, catalog))
    }
}
