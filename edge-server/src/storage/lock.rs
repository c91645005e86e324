//! 跨进程文件锁
//!
//! 通过 `O_CREAT|O_EXCL` 创建哨兵文件实现互斥，轮询等待直到超时。
//! 持有者 drop 时删除哨兵；超过 5 分钟的哨兵视为崩溃进程遗留，先改名再清除。

use super::error::{StorageError, StorageResult};
use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::thread;
use std::time::{Duration, Instant, SystemTime};

/// Default acquisition timeout
pub const DEFAULT_LOCK_TIMEOUT: Duration = Duration::from_secs(10);

const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Sentinels older than this belong to a crashed process
const STALE_AFTER: Duration = Duration::from_secs(300);

/// Exclusive cross-process lock held for the lifetime of the value
#[derive(Debug)]
pub struct FileLock {
    path: PathBuf,
}

impl FileLock {
    /// Acquire the lock, polling every 100 ms until `timeout` elapses
    pub fn acquire(path: impl Into<PathBuf>, timeout: Duration) -> StorageResult<Self> {
        let path = path.into();
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent).map_err(|e| StorageError::io(parent, e))?;
        }

        let deadline = Instant::now() + timeout;
        loop {
            match OpenOptions::new().write(true).create_new(true).open(&path) {
                Ok(mut file) => {
                    // Owner info is diagnostic only
                    let _ = writeln!(file, "{} {}", std::process::id(), shared::util::now_millis());
                    tracing::trace!(lock = %path.display(), "Lock acquired");
                    return Ok(Self { path });
                }
                Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                    if is_stale(&path) {
                        break_stale(&path);
                        continue;
                    }
                    if Instant::now() >= deadline {
                        tracing::warn!(lock = %path.display(), ?timeout, "Lock acquisition timed out");
                        return Err(StorageError::LockTimeout(path));
                    }
                    thread::sleep(POLL_INTERVAL);
                }
                Err(e) => return Err(StorageError::io(&path, e)),
            }
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for FileLock {
    fn drop(&mut self) {
        if let Err(e) = fs::remove_file(&self.path)
            && e.kind() != ErrorKind::NotFound
        {
            tracing::error!(lock = %self.path.display(), error = %e, "Failed to release lock");
        }
    }
}

/// Move the sentinel aside before judging it, so a fresh sentinel created
/// after the staleness check is never deleted
fn break_stale(path: &Path) {
    let claimed = path.with_extension(format!(
        "stale-{}-{}",
        std::process::id(),
        shared::util::now_millis()
    ));
    if fs::rename(path, &claimed).is_err() {
        // released or broken by someone else
        return;
    }
    if is_stale(&claimed) {
        tracing::warn!(lock = %path.display(), "Removed abandoned lock sentinel");
    } else if let Err(e) = fs::hard_link(&claimed, path) {
        tracing::error!(lock = %path.display(), error = %e, "Failed to restore live lock sentinel");
    }
    let _ = fs::remove_file(&claimed);
}

fn is_stale(path: &Path) -> bool {
    fs::metadata(path)
        .and_then(|m| m.modified())
        .ok()
        .and_then(|modified| SystemTime::now().duration_since(modified).ok())
        .is_some_and(|age| age > STALE_AFTER)
}
