// Append-only CSV history of measurements.
// Appends rewrite into a sibling temp file and rename over the store, so a reader in any
// process sees either the previous file or the new one, never a half-written row.

mod row;

pub use row::{HEADER, ValidationError};

use crate::models::{Dataset, MeasurementRecord};
use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use thiserror::Error;
use tracing::{debug, instrument, warn};

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("result store {} not found", .0.display())]
    NotFound(PathBuf),

    #[error("result store {} has no valid records ({dropped} rows dropped)", .path.display())]
    EmptyDataset { path: PathBuf, dropped: usize },

    #[error("result store {} is missing required column {column}", .path.display())]
    Schema { path: PathBuf, column: &'static str },

    #[error("result store {} has header {found:?}; appends need the standard column layout", .path.display())]
    HeaderMismatch { path: PathBuf, found: String },

    #[error("result store I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("result store CSV error: {0}")]
    Csv(#[from] csv::Error),
}

#[derive(Debug, Clone)]
pub struct ResultStore {
    path: PathBuf,
    write_lock: Arc<Mutex<()>>,
}

impl ResultStore {
    /// The file is created on the first append; it does not need to exist yet.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Arc::new(Mutex::new(())),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Appends one record on the blocking pool.
    pub async fn append(&self, record: &MeasurementRecord) -> Result<(), StorageError> {
        let store = self.clone();
        let record = record.clone();
        tokio::task::spawn_blocking(move || store.append_blocking(&record))
            .await
            .map_err(|e| StorageError::Io(io::Error::other(e)))?
    }

    #[instrument(skip(self, record), fields(repo = "results", operation = "append", path = %self.path.display()))]
    pub fn append_blocking(&self, record: &MeasurementRecord) -> Result<(), StorageError> {
        // Poisoning only means another append panicked; the file itself is untouched then.
        let _guard = self
            .write_lock
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        let dir = self.dir();
        fs::create_dir_all(dir)?;

        let mut content = match fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => Vec::new(),
            Err(e) => return Err(e.into()),
        };
        if content.strip_prefix(UTF8_BOM).unwrap_or(&content).is_empty() {
            debug!("creating result store");
            content = encode_line(&HEADER)?;
        } else {
            self.check_header(&content)?;
            if !content.ends_with(b"\n") {
                content.push(b'\n');
            }
        }
        content.extend(encode_line(&row::encode(record))?);

        let tmp = self.temp_path();
        if let Err(e) = write_synced(&tmp, &content).and_then(|_| fs::rename(&tmp, &self.path)) {
            let _ = fs::remove_file(&tmp);
            return Err(e.into());
        }
        sync_dir(dir)?;
        debug!(timestamp = %record.timestamp, "record appended");
        Ok(())
    }

    /// Every valid record in insertion order. Malformed rows are logged, counted and skipped.
    #[instrument(skip(self), fields(repo = "results", operation = "load_all", path = %self.path.display()))]
    pub fn load_all(&self) -> Result<Dataset, StorageError> {
        let bytes = match fs::read(&self.path) {
            Ok(b) => b,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(StorageError::NotFound(self.path.clone()));
            }
            Err(e) => return Err(e.into()),
        };
        let body = bytes.strip_prefix(UTF8_BOM).unwrap_or(&bytes);

        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_reader(body);
        let columns =
            row::Columns::resolve(reader.headers()?).map_err(|column| StorageError::Schema {
                path: self.path.clone(),
                column,
            })?;

        let mut records = Vec::new();
        let mut dropped = 0usize;
        for result in reader.records() {
            let line = match result {
                Ok(line) => line,
                Err(e) => {
                    dropped += 1;
                    warn!(error = %e, "skipping unreadable row");
                    continue;
                }
            };
            match row::decode(&line, &columns) {
                Ok(record) => records.push(record),
                Err(e) => {
                    dropped += 1;
                    warn!(
                        line = line.position().map_or(0, |p| p.line()),
                        error = %e,
                        "skipping malformed row"
                    );
                }
            }
        }

        if records.is_empty() {
            return Err(StorageError::EmptyDataset {
                path: self.path.clone(),
                dropped,
            });
        }
        debug!(records = records.len(), dropped, "result store loaded");
        Ok(Dataset::new(records, dropped))
    }

    /// Rows are always written in `HEADER` order, so an existing file must carry exactly that header.
    fn check_header(&self, content: &[u8]) -> Result<(), StorageError> {
        let body = content.strip_prefix(UTF8_BOM).unwrap_or(content);
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_reader(body);
        let mut header = csv::StringRecord::new();
        reader.read_record(&mut header)?;
        if header.iter().map(str::trim).eq(HEADER) {
            return Ok(());
        }
        Err(StorageError::HeaderMismatch {
            path: self.path.clone(),
            found: header.iter().collect::<Vec<_>>().join(","),
        })
    }

    fn dir(&self) -> &Path {
        match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        }
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

fn encode_line<I, T>(fields: I) -> Result<Vec<u8>, StorageError>
where
    I: IntoIterator<Item = T>,
    T: AsRef<[u8]>,
{
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(Vec::new());
    writer.write_record(fields)?;
    writer
        .into_inner()
        .map_err(|e| StorageError::Io(io::Error::other(e.to_string())))
}

fn write_synced(path: &Path, content: &[u8]) -> io::Result<()> {
    let mut file = File::create(path)?;
    file.write_all(content)?;
    file.sync_all()
}

/// Persists the rename itself by syncing the directory entry.
#[cfg(unix)]
fn sync_dir(dir: &Path) -> io::Result<()> {
    File::open(dir)?.sync_all()
}

#[cfg(not(unix))]
fn sync_dir(_dir: &Path) -> io::Result<()> {
    Ok(())
}
