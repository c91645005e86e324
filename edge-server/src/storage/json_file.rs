//! Typed JSON documents with atomic rewrite

use super::error::{StorageError, StorageResult};
use super::lock::FileLock;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::fs::{self, File};
use std::io::Write;
use std::marker::PhantomData;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Serialize as pretty JSON indented with four spaces
pub fn to_pretty_json<T: Serialize + ?Sized>(value: &T) -> serde_json::Result<Vec<u8>> {
    let mut buf = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut ser = serde_json::Serializer::with_formatter(&mut buf, formatter);
    value.serialize(&mut ser)?;
    Ok(buf)
}

/// Write `bytes` to a sibling temp file, flush it to disk, then rename over `path`
///
/// Readers only ever see the old or the new content, never a partial file.
pub fn write_atomic(path: &Path, bytes: &[u8]) -> StorageResult<()> {
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    };
    fs::create_dir_all(&dir).map_err(|e| StorageError::io(&dir, e))?;

    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "data".to_string());
    let tmp = dir.join(format!(
        ".{}.{}.tmp",
        file_name,
        uuid::Uuid::new_v4().simple()
    ));

    let written = (|| {
        let mut file = File::create(&tmp)?;
        file.write_all(bytes)?;
        file.sync_all()
    })();
    if let Err(e) = written {
        let _ = fs::remove_file(&tmp);
        return Err(StorageError::io(&tmp, e));
    }

    if let Err(e) = fs::rename(&tmp, path) {
        let _ = fs::remove_file(&tmp);
        return Err(StorageError::io(path, e));
    }
    Ok(())
}

/// One JSON document on disk, guarded by its own lock sentinel
///
/// `load_or_default` treats a missing or blank file as the empty document.
/// Malformed content is an error: silently replacing it would erase data.
#[derive(Debug)]
pub struct JsonFile<T> {
    path: PathBuf,
    lock_path: PathBuf,
    lock_timeout: Duration,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Clone for JsonFile<T> {
    fn clone(&self) -> Self {
        Self {
            path: self.path.clone(),
            lock_path: self.lock_path.clone(),
            lock_timeout: self.lock_timeout,
            _marker: PhantomData,
        }
    }
}

impl<T> JsonFile<T>
where
    T: Serialize + DeserializeOwned + Default,
{
    pub fn new(path: impl Into<PathBuf>, lock_timeout: Duration) -> Self {
        let path = path.into();
        let mut lock_name = path.as_os_str().to_owned();
        lock_name.push(".lock");
        Self {
            lock_path: PathBuf::from(lock_name),
            path,
            lock_timeout,
            _marker: PhantomData,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// Acquire this document's lock; hold the guard across load and save
    pub fn lock(&self) -> StorageResult<FileLock> {
        FileLock::acquire(&self.lock_path, self.lock_timeout)
    }

    pub fn load_or_default(&self) -> StorageResult<T> {
        let text = match fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(T::default()),
            Err(e) => return Err(StorageError::io(&self.path, e)),
        };
        if text.trim().is_empty() {
            return Ok(T::default());
        }
        serde_json::from_str(&text).map_err(|e| StorageError::Corrupted {
            path: self.path.clone(),
            reason: e.to_string(),
        })
    }

    pub fn save(&self, value: &T) -> StorageResult<()> {
        let bytes = to_pretty_json(value)?;
        write_atomic(&self.path, &bytes)
    }

    /// Read-modify-write under the document lock; nothing is written when `f` fails
    pub fn update<R, E>(&self, f: impl FnOnce(&mut T) -> Result<R, E>) -> Result<R, E>
    where
        E: From<StorageError>,
    {
        let _guard = self.lock()?;
        let mut doc = self.load_or_default()?;
        let out = f(&mut doc)?;
        self.save(&doc)?;
        Ok(out)
    }
}
