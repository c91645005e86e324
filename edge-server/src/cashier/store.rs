//! Snapshot Store
//!
//! The sessions file is the authoritative store: a pretty-printed JSON array
//! of every cashier session ever opened. All mutations go through
//! [`SnapshotStore::with_lock`] around a read-modify-write.

use super::backup::BackupManager;
use crate::storage::{FileLock, StorageError, StorageResult, to_pretty_json, write_atomic};
use shared::models::Session;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// State of the primary file before recovery kicks in
enum Primary {
    Loaded(Vec<Session>),
    Missing,
    Empty,
    Malformed(String),
}

#[derive(Debug)]
pub struct SnapshotStore {
    path: PathBuf,
    lock_path: PathBuf,
    lock_timeout: Duration,
    backups: BackupManager,
}

impl SnapshotStore {
    pub fn new(
        path: impl Into<PathBuf>,
        backup_dir: impl Into<PathBuf>,
        lock_timeout: Duration,
    ) -> Self {
        let path = path.into();
        let lock_path = path.with_extension("lock");
        Self {
            path,
            lock_path,
            lock_timeout,
            backups: BackupManager::new(backup_dir),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn backups(&self) -> &BackupManager {
        &self.backups
    }

    fn read_primary(&self) -> StorageResult<Primary> {
        let text = match fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Primary::Missing),
            Err(e) => return Err(StorageError::io(&self.path, e)),
        };
        if text.trim().is_empty() {
            return Ok(Primary::Empty);
        }
        match serde_json::from_str::<Vec<Session>>(&text) {
            Ok(sessions) if sessions.is_empty() => Ok(Primary::Empty),
            Ok(sessions) => Ok(Primary::Loaded(sessions)),
            Err(e) => Ok(Primary::Malformed(e.to_string())),
        }
    }

    /// Load every session
    ///
    /// A healthy primary is read without the lock. Recovery rewrites the
    /// primary, so it runs under the sessions lock; callers already inside
    /// [`SnapshotStore::with_lock`] use [`SnapshotStore::read_locked`].
    pub fn read(&self) -> StorageResult<Vec<Session>> {
        if let Primary::Loaded(sessions) = self.read_primary()? {
            return Ok(sessions);
        }
        self.with_lock(|| self.read_locked())
    }

    /// Load every session, recovering from backups when the primary is
    /// missing, empty or malformed; the caller holds the sessions lock
    ///
    /// A fresh install (no primary content and no backup) yields an empty
    /// list. A malformed primary with no valid backup is fatal: returning an
    /// empty list would erase history.
    pub fn read_locked(&self) -> StorageResult<Vec<Session>> {
        let primary = match self.read_primary()? {
            Primary::Loaded(sessions) => return Ok(sessions),
            other => other,
        };

        if let Primary::Malformed(reason) = &primary {
            tracing::error!(path = %self.path.display(), %reason, "Sessions file is malformed, trying backups");
        }

        match self.backups.restore_latest()? {
            Some((backup, sessions)) => {
                self.write(&sessions)?;
                tracing::warn!(
                    backup = %backup.display(),
                    sessions = sessions.len(),
                    "Sessions file recovered from backup"
                );
                Ok(sessions)
            }
            None => match primary {
                Primary::Malformed(reason) => Err(StorageError::Unrecoverable(format!(
                    "{} is unreadable ({}) and no backup could be restored",
                    self.path.display(),
                    reason
                ))),
                _ => Ok(Vec::new()),
            },
        }
    }

    /// Atomic rewrite of the primary file
    pub fn write(&self, sessions: &[Session]) -> StorageResult<()> {
        let bytes = to_pretty_json(sessions)?;
        write_atomic(&self.path, &bytes)
    }

    /// Run `body` holding the cross-process sessions lock
    pub fn with_lock<R, E>(&self, body: impl FnOnce() -> Result<R, E>) -> Result<R, E>
    where
        E: From<StorageError>,
    {
        let _guard = FileLock::acquire(&self.lock_path, self.lock_timeout)?;
        body()
    }

    /// Backup the given snapshot; failures are logged, never propagated
    pub fn backup_quietly(&self, sessions: &[Session]) {
        if let Err(e) = self.backups.backup(sessions) {
            tracing::warn!(error = %e, "Cashier backup failed");
        }
    }
}
