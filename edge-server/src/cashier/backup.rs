//! 收银快照备份与恢复
//!
//! 备份文件 `backup_cashier_YYYYMMDD_HHMMSS.json` 内容为
//! `{timestamp, sessions}` 的 JSON 再做 base64 编码（仅为混淆，不是加密，
//! 为兼容已有备份目录必须保持该格式）。
//!
//! - 快照哈希未变化时跳过写入
//! - 每次写入后清理超过 30 天的备份
//! - 恢复时按时间倒序遍历，兼容纯 JSON 的旧备份

use crate::storage::{StorageError, StorageResult, write_atomic};
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use chrono::{DateTime, Local, NaiveDateTime};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use shared::models::Session;
use std::fs;
use std::path::{Path, PathBuf};

/// Backups older than this are deleted on every write
pub const BACKUP_RETENTION_DAYS: i64 = 30;

const BACKUP_PREFIX: &str = "backup_cashier_";
const BACKUP_SUFFIX: &str = ".json";
const BACKUP_STAMP: &str = "%Y%m%d_%H%M%S";

#[derive(Serialize)]
struct SnapshotRef<'a> {
    timestamp: String,
    sessions: &'a [Session],
}

#[derive(Deserialize)]
struct Snapshot {
    sessions: Vec<Session>,
}

/// Stable hash of the serialized session list
pub fn snapshot_hash(sessions: &[Session]) -> StorageResult<String> {
    let bytes = serde_json::to_vec(sessions)?;
    Ok(hex::encode(Sha256::digest(&bytes)))
}

/// Decode a backup body: base64-wrapped JSON, or plain JSON for legacy files
pub fn decode_backup(raw: &[u8]) -> Option<Vec<Session>> {
    let text = std::str::from_utf8(raw).ok()?.trim();
    if let Ok(decoded) = BASE64.decode(text)
        && let Ok(snapshot) = serde_json::from_slice::<Snapshot>(&decoded)
    {
        return Some(snapshot.sessions);
    }
    serde_json::from_str::<Snapshot>(text)
        .ok()
        .map(|snapshot| snapshot.sessions)
}

/// Backup file on disk
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackupFile {
    pub path: PathBuf,
    pub taken_at: NaiveDateTime,
}

/// Writes, rotates and restores cashier snapshot backups
#[derive(Debug)]
pub struct BackupManager {
    dir: PathBuf,
    last_hash: Mutex<Option<String>>,
}

impl BackupManager {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            last_hash: Mutex::new(None),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Write a backup unless the snapshot is unchanged since the last one
    ///
    /// Returns the written path, or `None` when skipped.
    pub fn backup(&self, sessions: &[Session]) -> StorageResult<Option<PathBuf>> {
        let hash = snapshot_hash(sessions)?;
        let mut last = self.last_hash.lock();
        if last.is_none() {
            // First backup of this process: compare with what is already on disk
            *last = self.newest_hash();
        }
        if last.as_deref() == Some(hash.as_str()) {
            tracing::debug!("Cashier snapshot unchanged, backup skipped");
            return Ok(None);
        }

        let now = Local::now();
        let snapshot = SnapshotRef {
            timestamp: now.format(shared::util::HUMAN_FORMAT).to_string(),
            sessions,
        };
        let encoded = BASE64.encode(serde_json::to_vec(&snapshot)?);
        let path = self.dir.join(format!(
            "{}{}{}",
            BACKUP_PREFIX,
            now.format(BACKUP_STAMP),
            BACKUP_SUFFIX
        ));
        write_atomic(&path, encoded.as_bytes())?;
        *last = Some(hash);
        drop(last);

        tracing::info!(path = %path.display(), sessions = sessions.len(), "Cashier backup written");
        self.rotate(now.naive_local());
        Ok(Some(path))
    }

    /// Backups newest first
    pub fn list(&self) -> StorageResult<Vec<BackupFile>> {
        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(StorageError::io(&self.dir, e)),
        };

        let mut files: Vec<BackupFile> = entries
            .filter_map(Result::ok)
            .map(|entry| entry.path())
            .filter_map(|path| {
                let name = path.file_name()?.to_str()?;
                if !name.starts_with(BACKUP_PREFIX) || !name.ends_with(BACKUP_SUFFIX) {
                    return None;
                }
                let taken_at = backup_time(&path)?;
                Some(BackupFile { path, taken_at })
            })
            .collect();
        files.sort_by(|a, b| b.taken_at.cmp(&a.taken_at).then_with(|| b.path.cmp(&a.path)));
        Ok(files)
    }

    pub fn has_backups(&self) -> bool {
        self.list().map(|l| !l.is_empty()).unwrap_or(false)
    }

    /// First backup, newest first, that decodes into a session list
    pub fn restore_latest(&self) -> StorageResult<Option<(PathBuf, Vec<Session>)>> {
        for file in self.list()? {
            let raw = match fs::read(&file.path) {
                Ok(raw) => raw,
                Err(e) => {
                    tracing::warn!(path = %file.path.display(), error = %e, "Unreadable backup skipped");
                    continue;
                }
            };
            match decode_backup(&raw) {
                Some(sessions) => {
                    tracing::info!(
                        path = %file.path.display(),
                        sessions = sessions.len(),
                        "Cashier snapshot restored from backup"
                    );
                    return Ok(Some((file.path, sessions)));
                }
                None => {
                    tracing::warn!(path = %file.path.display(), "Invalid backup skipped");
                }
            }
        }
        Ok(None)
    }

    /// Delete backups older than the retention window
    pub fn rotate(&self, now: NaiveDateTime) -> usize {
        let files = match self.list() {
            Ok(files) => files,
            Err(e) => {
                tracing::warn!(error = %e, "Backup rotation skipped");
                return 0;
            }
        };

        let cutoff = now - chrono::Duration::days(BACKUP_RETENTION_DAYS);
        let mut removed = 0;
        for file in files.into_iter().filter(|f| f.taken_at < cutoff) {
            match fs::remove_file(&file.path) {
                Ok(()) => removed += 1,
                Err(e) => {
                    tracing::warn!(path = %file.path.display(), error = %e, "Failed to delete old backup")
                }
            }
        }
        if removed > 0 {
            tracing::info!(removed, "Old cashier backups rotated");
        }
        removed
    }

    fn newest_hash(&self) -> Option<String> {
        let newest = self.list().ok()?.into_iter().next()?;
        let raw = fs::read(&newest.path).ok()?;
        let sessions = decode_backup(&raw)?;
        snapshot_hash(&sessions).ok()
    }
}

/// Timestamp from the file name, falling back to the modification time
fn backup_time(path: &Path) -> Option<NaiveDateTime> {
    let from_name = path
        .file_stem()
        .and_then(|s| s.to_str())
        .and_then(|s| s.strip_prefix(BACKUP_PREFIX))
        .and_then(|stamp| NaiveDateTime::parse_from_str(stamp, BACKUP_STAMP).ok());
    from_name.or_else(|| {
        let modified = fs::metadata(path).and_then(|m| m.modified()).ok()?;
        Some(DateTime::<Local>::from(modified).naive_local())
    })
}
