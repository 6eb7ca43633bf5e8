// History Log Storage
//
// Durability contract for the image history plus the two backends the
// service ships with: a JSON file rewritten whole on every append, and a
// process-local in-memory log.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, warn};
use uuid::Uuid;

use super::{HistoryLog, HistoryRecord};

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("i/o error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("malformed history document at {}: {source}", .path.display())]
    Malformed {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to serialize history: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Storage backend for the image history.
///
/// `try_*` operations report failures. `load` and `append` never fail from
/// the caller's point of view: a load failure reads as an empty log and an
/// append failure is only logged.
pub trait HistoryStore: Send + Sync {
    /// Load the full log in insertion order. A store that has never been
    /// written to yields an empty log, not an error.
    fn try_load(&self) -> Result<HistoryLog, StoreError>;

    /// Append one record at the end of the log and persist it.
    fn try_append(&self, record: HistoryRecord) -> Result<(), StoreError>;

    fn load(&self) -> HistoryLog {
        self.try_load().unwrap_or_else(|e| {
            warn!(error = %e, "failed to load history, treating it as empty");
            HistoryLog::new()
        })
    }

    fn append(&self, record: HistoryRecord) {
        if let Err(e) = self.try_append(record) {
            error!(error = %e, "failed to persist history record");
        }
    }
}

/// On-disk shape: `{ "history": [ ... ] }`.
#[derive(Deserialize)]
struct HistoryDocument {
    #[serde(default)]
    history: Option<HistoryLog>,
}

#[derive(Serialize)]
struct HistoryDocumentRef<'a> {
    history: &'a HistoryLog,
}

/// History persisted as one pretty-printed JSON file.
///
/// Every append re-reads the file, pushes the record and replaces the file
/// through a rename. Appends through the same instance are serialized;
/// separate instances or processes sharing a file can still lose updates.
#[derive(Debug)]
pub struct FileHistoryStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl FileHistoryStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_log(&self) -> Result<HistoryLog, StoreError> {
        let bytes = match fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "no history file yet");
                return Ok(HistoryLog::new());
            }
            Err(source) => {
                return Err(StoreError::Io {
                    path: self.path.clone(),
                    source,
                })
            }
        };

        let document: HistoryDocument =
            serde_json::from_slice(&bytes).map_err(|source| StoreError::Malformed {
                path: self.path.clone(),
                source,
            })?;

        Ok(document.history.unwrap_or_default())
    }

    fn write_log(&self, log: &HistoryLog) -> Result<(), StoreError> {
        let json = serde_json::to_vec_pretty(&HistoryDocumentRef { history: log })?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|source| StoreError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }

        let staging = self.staging_path();
        fs::write(&staging, &json).map_err(|source| StoreError::Io {
            path: staging.clone(),
            source,
        })?;

        if let Err(source) = fs::rename(&staging, &self.path) {
            let _ = fs::remove_file(&staging);
            return Err(StoreError::Io {
                path: self.path.clone(),
                source,
            });
        }

        debug!(path = %self.path.display(), records = log.len(), "history written");
        Ok(())
    }

    // Sibling of the backing file so the final rename stays on one filesystem.
    fn staging_path(&self) -> PathBuf {
        let name = self
            .path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "history.json".to_owned());
        self.path
            .with_file_name(format!(".{name}.{}.tmp", Uuid::new_v4().simple()))
    }
}

impl HistoryStore for FileHistoryStore {
    fn try_load(&self) -> Result<HistoryLog, StoreError> {
        self.read_log()
    }

    /// A malformed backing file is reported and left untouched.
    fn try_append(&self, record: HistoryRecord) -> Result<(), StoreError> {
        let _guard = self.write_lock.lock();
        let mut log = self.read_log()?;
        log.append(record);
        self.write_log(&log)
    }

    /// Lenient append: an unreadable or malformed file is replaced by a log
    /// holding just the new record.
    fn append(&self, record: HistoryRecord) {
        let _guard = self.write_lock.lock();
        let mut log = self.load();
        log.append(record);
        if let Err(e) = self.write_log(&log) {
            error!(error = %e, "failed to persist history record");
        }
    }
}

/// Non-durable store, lost when the process exits.
#[derive(Debug, Default)]
pub struct InMemoryHistoryStore {
    log: RwLock<HistoryLog>,
}

impl InMemoryHistoryStore {
    pub fn new(log: HistoryLog) -> Self {
        Self {
            log: RwLock::new(log),
        }
    }
}

impl HistoryStore for InMemoryHistoryStore {
    fn try_load(&self) -> Result<HistoryLog, StoreError> {
        Ok(self.log.read().clone())
    }

    fn try_append(&self, record: HistoryRecord) -> Result<(), StoreError> {
        self.log.write().append(record);
        Ok(())
    }
}
