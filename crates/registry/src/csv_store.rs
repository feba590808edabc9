//! CSV-backed registration store.
//!
//! Rows are `id, type, url, layer_name, system_id, dimensions, timestamp`
//! without a header. Older files lack the timestamp column.

use std::fs::File;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use tempfile::NamedTempFile;
use thiserror::Error;
use tracing::{debug, info};
use wmtsproxy_common::ProxyError;

use crate::record::{serialize_dimensions, unserialize_dimensions, RegistrationRecord};

/// Columns every row must have.
const REQUIRED_FIELDS: usize = 6;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("No configuration for \"{0}\" found")]
    NotFound(String),

    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Malformed record in line {line}: {reason}")]
    Malformed { line: u64, reason: String },
}

impl From<StoreError> for ProxyError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(_) => ProxyError::service(err.to_string()),
            other => ProxyError::service("Unable to load configuration").with_cause(other),
        }
    }
}

/// Persistent registrations.
pub trait RegistrationStore: Send + Sync {
    /// First record with `id`.
    fn get(&self, id: &str) -> Result<RegistrationRecord, StoreError>;

    /// Insert a record, replacing one with the same id.
    fn put(&self, record: &RegistrationRecord) -> Result<(), StoreError>;

    /// All records in storage order.
    fn list(&self) -> Result<Vec<RegistrationRecord>, StoreError>;

    /// Identifiers of all records.
    fn ids(&self) -> Result<Vec<String>, StoreError> {
        Ok(self.list()?.into_iter().map(|r| r.id).collect())
    }
}

/// Registrations kept in one CSV file.
///
/// `put` holds a lock for the whole read, merge and write sequence and
/// replaces the file atomically.
pub struct CsvRecordStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl CsvRecordStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn io_error(&self, source: io::Error) -> StoreError {
        StoreError::Io {
            path: self.path.clone(),
            source,
        }
    }

    /// Read every record, an absent file is an empty store.
    fn read_all(&self) -> Result<Vec<RegistrationRecord>, StoreError> {
        let file = match File::open(&self.path) {
            Ok(file) => file,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(self.io_error(e)),
        };

        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_reader(file);

        let mut records = Vec::new();
        for row in reader.records() {
            records.push(parse_row(&row?)?);
        }
        Ok(records)
    }

    fn write_all(&self, records: &[RegistrationRecord]) -> Result<(), StoreError> {
        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(Vec::new());
        for record in records {
            let dimensions = serialize_dimensions(&record.dimensions);
            let timestamp = record.timestamp.to_string();
            writer.write_record([
                record.id.as_str(),
                record.kind.as_str(),
                record.url.as_str(),
                record.layer_name.as_str(),
                record.system_id.as_str(),
                dimensions.as_str(),
                timestamp.as_str(),
            ])?;
        }
        let data = writer
            .into_inner()
            .map_err(|e| self.io_error(e.into_error()))?;

        let dir = match self.path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir,
            _ => Path::new("."),
        };
        std::fs::create_dir_all(dir).map_err(|e| self.io_error(e))?;
        let mut tmp = NamedTempFile::new_in(dir).map_err(|e| self.io_error(e))?;
        tmp.write_all(&data).map_err(|e| self.io_error(e))?;
        tmp.persist(&self.path).map_err(|e| self.io_error(e.error))?;
        Ok(())
    }
}

impl RegistrationStore for CsvRecordStore {
    fn get(&self, id: &str) -> Result<RegistrationRecord, StoreError> {
        self.read_all()?
            .into_iter()
            .find(|r| r.id == id)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))
    }

    fn put(&self, record: &RegistrationRecord) -> Result<(), StoreError> {
        let _guard = self.lock.lock().unwrap_or_else(|poisoned| poisoned.into_inner());

        let mut records = self.read_all()?;
        match records.iter_mut().find(|r| r.id == record.id) {
            Some(existing) => {
                debug!(id = %record.id, "Replacing registration");
                *existing = record.clone();
            }
            None => records.push(record.clone()),
        }
        self.write_all(&records)?;

        info!(id = %record.id, kind = %record.kind, total = records.len(), "Stored registration");
        Ok(())
    }

    fn list(&self) -> Result<Vec<RegistrationRecord>, StoreError> {
        self.read_all()
    }
}

fn parse_row(row: &csv::StringRecord) -> Result<RegistrationRecord, StoreError> {
    let line = row.position().map(|p| p.line()).unwrap_or_default();
    let malformed = |reason: String| StoreError::Malformed { line, reason };

    if row.len() < REQUIRED_FIELDS {
        return Err(malformed(format!(
            "expected at least {} fields, found {}",
            REQUIRED_FIELDS,
            row.len()
        )));
    }

    let kind = row[1]
        .parse()
        .map_err(|_| malformed(format!("unknown type \"{}\"", &row[1])))?;
    let timestamp = match row.get(6).map(str::trim) {
        None | Some("") => 0.0,
        Some(value) => value
            .parse()
            .map_err(|_| malformed(format!("invalid timestamp \"{}\"", value)))?,
    };

    Ok(RegistrationRecord {
        id: row[0].to_string(),
        kind,
        url: row[2].to_string(),
        layer_name: row[3].to_string(),
        system_id: row[4].to_string(),
        dimensions: unserialize_dimensions(&row[5]),
        timestamp,
    })
}
