//
// catalog.rs
// Dicom-Catalog-rs
//
// SQLite-backed study catalog: append-only inserts with monotonically increasing ids and patient-name search.
//
// Thales Matheus Mendonça Santos - October 2026

use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use rusqlite::{params, Connection, OptionalExtension, Row};
use tracing::{debug, info};

use crate::error::{CatalogError, Result};
use crate::models::{ParsedFields, StudyRecord};

// AUTOINCREMENT keeps ids strictly increasing and never hands out a deleted id again.
const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS studies (
    id                 INTEGER PRIMARY KEY AUTOINCREMENT,
    patient_name       TEXT NOT NULL,
    study_date         TEXT NOT NULL,
    patient_birth_date TEXT NOT NULL,
    study_description  TEXT NOT NULL,
    patient_id         TEXT NOT NULL,
    institution_name   TEXT NOT NULL,
    stored_file_name   TEXT NOT NULL
);";

const SELECT_COLUMNS: &str = "SELECT id, patient_name, study_date, patient_birth_date, \
     study_description, patient_id, institution_name, stored_file_name FROM studies";

/// Owned handle on the catalog database.
///
/// Clones share one connection; every operation takes the lock for its whole
/// duration, which serializes id assignment.
#[derive(Clone)]
pub struct Catalog {
    conn: Arc<Mutex<Connection>>,
}

impl Catalog {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let conn = Connection::open(path)?;
        conn.busy_timeout(Duration::from_secs(5))?;
        info!(database = %path.display(), "opened study catalog");
        Self::with_connection(conn)
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self> {
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| CatalogError::CatalogUnavailable)
    }

    /// Appends a record for `fields` and returns it with its new id.
    ///
    /// The insert is committed before this returns, so the record is visible to
    /// every later `search`.
    pub fn ingest(&self, fields: ParsedFields, stored_file_name: &str) -> Result<StudyRecord> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        tx.execute(
            "INSERT INTO studies (patient_name, study_date, patient_birth_date,
             study_description, patient_id, institution_name, stored_file_name)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                fields.patient_name,
                fields.study_date,
                fields.patient_birth_date,
                fields.study_description,
                fields.patient_id,
                fields.institution_name,
                stored_file_name,
            ],
        )?;
        let id = tx.last_insert_rowid();
        tx.commit()?;

        Ok(StudyRecord::from_parsed(
            id,
            fields,
            stored_file_name.to_string(),
        ))
    }

    /// Records whose patient name contains `query` (case-sensitive), in id order.
    /// An empty query returns the whole catalog.
    pub fn search(&self, query: &str) -> Result<Vec<StudyRecord>> {
        let conn = self.lock()?;
        let records = if query.is_empty() {
            let mut stmt = conn.prepare(&format!("{} ORDER BY id", SELECT_COLUMNS))?;
            let rows = stmt.query_map([], record_from_row)?;
            rows.collect::<rusqlite::Result<Vec<_>>>()?
        } else {
            // instr() is a plain byte match: case-sensitive, and '%'/'_' are literal.
            let mut stmt = conn.prepare(&format!(
                "{} WHERE instr(patient_name, ?1) > 0 ORDER BY id",
                SELECT_COLUMNS
            ))?;
            let rows = stmt.query_map(params![query], record_from_row)?;
            rows.collect::<rusqlite::Result<Vec<_>>>()?
        };

        debug!(query, matches = records.len(), "catalog search");
        Ok(records)
    }

    pub fn get(&self, id: i64) -> Result<StudyRecord> {
        let conn = self.lock()?;
        let record = conn
            .query_row(
                &format!("{} WHERE id = ?1", SELECT_COLUMNS),
                params![id],
                record_from_row,
            )
            .optional()?;
        record.ok_or(CatalogError::NotFound(id))
    }

    pub fn count(&self) -> Result<u64> {
        let conn = self.lock()?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM studies", [], |row| row.get(0))?;
        Ok(count as u64)
    }
}

fn record_from_row(row: &Row<'_>) -> rusqlite::Result<StudyRecord> {
    Ok(StudyRecord {
        id: row.get(0)?,
        patient_name: row.get(1)?,
        study_date: row.get(2)?,
        patient_birth_date: row.get(3)?,
        study_description: row.get(4)?,
        patient_id: row.get(5)?,
        institution_name: row.get(6)?,
        stored_file_name: row.get(7)?,
    })
}
