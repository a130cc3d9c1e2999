use std::path::{Component, Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};

use anyhow::Result;
use rayon::prelude::*;
use tracing::{error, info};
use walkdir::WalkDir;

use crate::ingest::Ingestor;
use crate::storage::DuplicatePolicy;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ImportSummary {
    pub imported: usize,
    pub failed: usize,
}

/// Every `*.dcm` file below `dir`, sorted so imports are reproducible.
pub fn dicom_files(dir: &Path) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = WalkDir::new(dir)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .filter(|e| {
            e.path()
                .extension()
                .map_or(false, |ext| ext.eq_ignore_ascii_case("dcm"))
        })
        .map(|e| e.into_path())
        .collect();
    files.sort();
    files
}

/// Stored name for `path`: its location below `root` with components joined by `_`,
/// so `series1/IM0001.dcm` becomes `series1_IM0001.dcm`.
pub fn stored_name(root: &Path, path: &Path) -> Option<String> {
    let relative = path.strip_prefix(root).ok()?;
    let parts = relative
        .components()
        .map(|c| match c {
            Component::Normal(part) => part.to_str(),
            _ => None,
        })
        .collect::<Option<Vec<_>>>()?;
    if parts.is_empty() {
        return None;
    }
    Some(parts.join("_"))
}

/// Ingests every DICOM file under `dir` in parallel. Failures are logged and counted.
///
/// Flattened names can still collide (`a_b/c.dcm` and `a/b_c.dcm`), so an
/// overwriting store is switched to suffixing for the duration of the import.
pub fn import_directory(ingestor: &Ingestor, dir: &Path) -> Result<ImportSummary> {
    let files = dicom_files(dir);
    info!(directory = %dir.display(), files = files.len(), "starting import");

    let ingestor = match ingestor.store().policy() {
        DuplicatePolicy::Overwrite => ingestor.with_duplicate_policy(DuplicatePolicy::Suffix),
        _ => ingestor.clone(),
    };

    let imported = AtomicUsize::new(0);
    let failed = AtomicUsize::new(0);

    files.par_iter().for_each(|path| {
        let result = match stored_name(dir, path) {
            Some(name) => ingestor.ingest_path_as(path, &name),
            None => ingestor.ingest_path(path),
        };
        match result {
            Ok(record) => {
                imported.fetch_add(1, Ordering::Relaxed);
                info!(path = %path.display(), id = record.id, stored = %record.stored_file_name, "imported");
            }
            Err(e) => {
                failed.fetch_add(1, Ordering::Relaxed);
                error!(path = %path.display(), error = %e, "import failed");
            }
        }
    });

    Ok(ImportSummary {
        imported: imported.into_inner(),
        failed: failed.into_inner(),
    })
}
