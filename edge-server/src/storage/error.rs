use std::path::{Path, PathBuf};
use thiserror::Error;

/// Storage errors shared by every JSON document the core writes
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Lock timeout: {}", .0.display())]
    LockTimeout(PathBuf),

    #[error("Corrupted file {}: {reason}", path.display())]
    Corrupted { path: PathBuf, reason: String },

    #[error("Unrecoverable data file: {0}")]
    Unrecoverable(String),
}

impl StorageError {
    pub fn io(path: impl AsRef<Path>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }

    pub fn is_lock_timeout(&self) -> bool {
        matches!(self, Self::LockTimeout(_))
    }
}

pub type StorageResult<T> = Result<T, StorageError>;
