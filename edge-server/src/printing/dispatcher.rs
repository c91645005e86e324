//! Print dispatch seam
//!
//! Fire-and-forget: a failed print never rolls back the financial operation
//! that produced it.

use super::types::{DEFAULT_WIDTH, PrintJob};
use parking_lot::Mutex;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PrintError {
    #[error("Printer offline: {0}")]
    PrinterOffline(String),

    #[error("Print failed: {0}")]
    PrintFailed(String),
}

pub trait PrintDispatcher: Send + Sync {
    fn dispatch(&self, job: PrintJob) -> Result<(), PrintError>;
}

/// Dispatch and swallow failures
pub fn dispatch_best_effort(dispatcher: &dyn PrintDispatcher, job: PrintJob) {
    let title = job.title.clone();
    let kind = job.kind;
    if let Err(e) = dispatcher.dispatch(job) {
        tracing::warn!(error = %e, title = %title, kind = ?kind, "Print dispatch failed");
    }
}

/// Renders the job into the log; used when no printer bridge is configured
#[derive(Debug, Default)]
pub struct LogPrintDispatcher;

impl PrintDispatcher for LogPrintDispatcher {
    fn dispatch(&self, job: PrintJob) -> Result<(), PrintError> {
        tracing::info!(
            kind = ?job.kind,
            title = %job.title,
            total = job.total,
            "Print job\n{}",
            job.render_text(DEFAULT_WIDTH)
        );
        Ok(())
    }
}

/// Keeps dispatched jobs in memory
#[derive(Debug, Default)]
pub struct MemoryPrintDispatcher {
    jobs: Mutex<Vec<PrintJob>>,
}

impl MemoryPrintDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn jobs(&self) -> Vec<PrintJob> {
        self.jobs.lock().clone()
    }
}

impl PrintDispatcher for MemoryPrintDispatcher {
    fn dispatch(&self, job: PrintJob) -> Result<(), PrintError> {
        self.jobs.lock().push(job);
        Ok(())
    }
}
