//! Audit sinks
//!
//! The audit trail never fails a financial operation: callers go through
//! [`emit`], which logs and swallows sink errors.

use super::types::{AuditEntry, Severity};
use parking_lot::Mutex;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AuditError {
    #[error("Audit I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Audit serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Destination of audit entries
pub trait AuditSink: Send + Sync {
    fn record(&self, entry: AuditEntry) -> Result<(), AuditError>;
}

/// Record an entry, logging instead of propagating failures
pub fn emit(sink: &dyn AuditSink, entry: AuditEntry) {
    let action = entry.acao;
    if let Err(e) = sink.record(entry) {
        tracing::warn!(action = %action, error = %e, "Failed to record audit entry");
    }
}

/// Appends one JSON object per line to `audit_log.jsonl`
#[derive(Debug)]
pub struct JsonlAuditSink {
    path: PathBuf,
    write_guard: Mutex<()>,
}

impl JsonlAuditSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_guard: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl AuditSink for JsonlAuditSink {
    fn record(&self, entry: AuditEntry) -> Result<(), AuditError> {
        let mut line = serde_json::to_string(&entry)?;
        line.push('\n');

        let _guard = self.write_guard.lock();
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)?;
        }
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        file.write_all(line.as_bytes())?;

        tracing::debug!(action = %entry.acao, entity = %entry.entidade, "Audit entry recorded");
        Ok(())
    }
}

/// In-memory sink for tests and tooling
#[derive(Debug, Default)]
pub struct MemoryAuditSink {
    entries: Mutex<Vec<AuditEntry>>,
}

impl MemoryAuditSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> Vec<AuditEntry> {
        self.entries.lock().clone()
    }

    pub fn warnings(&self) -> Vec<AuditEntry> {
        self.entries
            .lock()
            .iter()
            .filter(|e| e.nivel_severidade == Severity::Warning)
            .cloned()
            .collect()
    }

    pub fn clear(&self) {
        self.entries.lock().clear();
    }
}

impl AuditSink for MemoryAuditSink {
    fn record(&self, entry: AuditEntry) -> Result<(), AuditError> {
        self.entries.lock().push(entry);
        Ok(())
    }
}
