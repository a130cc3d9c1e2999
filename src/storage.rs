//
// storage.rs
// Dicom-Catalog-rs
//
// File store for uploaded DICOM blobs: verbatim names, a configurable duplicate policy and a root guard.
//
// Thales Matheus Mendonça Santos - October 2026

use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Component, Path, PathBuf};

use tracing::{debug, warn};

use crate::error::{CatalogError, Result};

/// What `put` does when the suggested name is already taken.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum DuplicatePolicy {
    /// Replace the existing blob (last writer wins).
    #[default]
    Overwrite,
    /// Fail the request with `AlreadyExists`.
    Reject,
    /// Store under `<stem>-<n>.<ext>` using the first free `n`.
    Suffix,
}

#[derive(Clone, Debug)]
pub struct FileStore {
    root: PathBuf,
    policy: DuplicatePolicy,
}

impl FileStore {
    pub fn new(root: impl AsRef<Path>, policy: DuplicatePolicy) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        // Create the upload directory eagerly so subsequent saves do not fail at runtime.
        fs::create_dir_all(&root)
            .map_err(|e| CatalogError::storage_write(&root.display().to_string(), e))?;
        Ok(Self { root, policy })
    }

    pub fn policy(&self) -> DuplicatePolicy {
        self.policy
    }

    /// The same root with a different duplicate policy.
    pub fn with_policy(&self, policy: DuplicatePolicy) -> Self {
        Self {
            root: self.root.clone(),
            policy,
        }
    }

    /// Writes `bytes` verbatim and returns the stored name and its full path.
    ///
    /// The file is synced before this returns, and the handle is closed on every path.
    pub fn put(&self, name: &str, bytes: &[u8]) -> Result<(String, PathBuf)> {
        check_file_name(name).map_err(|e| CatalogError::storage_write(name, e))?;

        match self.policy {
            DuplicatePolicy::Overwrite => {
                let path = self.root.join(name);
                if path.exists() {
                    warn!(name, "overwriting existing stored file");
                }
                let file = File::create(&path).map_err(|e| CatalogError::storage_write(name, e))?;
                write_synced(file, bytes).map_err(|e| CatalogError::storage_write(name, e))?;
                Ok((name.to_string(), path))
            }
            DuplicatePolicy::Reject => {
                let path = self.root.join(name);
                let file = create_new(&path).map_err(|e| CatalogError::storage_write(name, e))?;
                write_synced(file, bytes).map_err(|e| CatalogError::storage_write(name, e))?;
                Ok((name.to_string(), path))
            }
            DuplicatePolicy::Suffix => self.put_with_suffix(name, bytes),
        }
    }

    fn put_with_suffix(&self, name: &str, bytes: &[u8]) -> Result<(String, PathBuf)> {
        let original = Path::new(name);
        let stem = original
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or(name);
        let extension = original.extension().and_then(|s| s.to_str());

        let mut attempt = 0_u32;
        loop {
            let candidate = match (attempt, extension) {
                (0, _) => name.to_string(),
                (n, Some(ext)) => format!("{}-{}.{}", stem, n, ext),
                (n, None) => format!("{}-{}", stem, n),
            };
            let path = self.root.join(&candidate);
            // Exclusive create: two writers can never claim the same candidate.
            match create_new(&path) {
                Ok(file) => {
                    write_synced(file, bytes)
                        .map_err(|e| CatalogError::storage_write(&candidate, e))?;
                    if attempt > 0 {
                        debug!(requested = name, stored = %candidate, "stored under suffixed name");
                    }
                    return Ok((candidate, path));
                }
                Err(e) if e.kind() == io::ErrorKind::AlreadyExists => attempt += 1,
                Err(e) => return Err(CatalogError::storage_write(&candidate, e)),
            }
        }
    }

    /// Full path of a stored blob, guaranteed to sit inside the store root.
    pub fn resolve(&self, name: &str) -> Result<PathBuf> {
        let candidate = self.root.join(name);
        let canonical_root = self
            .root
            .canonicalize()
            .unwrap_or_else(|_| self.root.clone());
        let canonical = candidate
            .canonicalize()
            .map_err(|e| CatalogError::storage_read(name, e))?;
        // Guard against path traversal by enforcing the canonical root prefix.
        if !canonical.starts_with(&canonical_root) {
            return Err(CatalogError::storage_read(
                name,
                io::Error::new(
                    io::ErrorKind::PermissionDenied,
                    "attempt to access file outside storage root",
                ),
            ));
        }
        Ok(canonical)
    }

    pub fn read(&self, path: &Path) -> Result<Vec<u8>> {
        fs::read(path).map_err(|e| CatalogError::storage_read(&path.display().to_string(), e))
    }
}

/// Accepts only a single, normal path component; everything else is `InvalidInput`.
fn check_file_name(name: &str) -> io::Result<()> {
    let mut components = Path::new(name).components();
    match (components.next(), components.next()) {
        (Some(Component::Normal(_)), None) if !name.contains(['/', '\\']) => Ok(()),
        _ => Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("{:?} is not a plain file name", name),
        )),
    }
}

fn create_new(path: &Path) -> io::Result<File> {
    OpenOptions::new().write(true).create_new(true).open(path)
}

fn write_synced(mut file: File, bytes: &[u8]) -> io::Result<()> {
    file.write_all(bytes)?;
    file.sync_all()
}
