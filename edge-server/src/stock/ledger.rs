//! Stock ledger seam
//!
//! The stock surface (conferences, requisitions, NFe import) lives outside
//! this crate; the core only appends consumption entries and action logs.

use crate::storage::{JsonFile, StorageError};
use shared::models::{OrderItem, StockEntry, StockLogEntry};
use shared::util;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StockError {
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Stock write rejected: {0}")]
    Rejected(String),
}

/// Stock-entry appender and stock log sink
pub trait StockLedger: Send + Sync {
    fn append_entry(&self, entry: StockEntry) -> Result<(), StockError>;

    /// Remove entries by id, returning how many were removed
    fn remove_entries(&self, ids: &[String]) -> Result<usize, StockError>;

    fn log_action(&self, entry: StockLogEntry) -> Result<(), StockError>;
}

/// `stock_entries.json` + `stock_logs.json`
pub struct JsonStockLedger {
    entries: JsonFile<Vec<StockEntry>>,
    logs: JsonFile<Vec<StockLogEntry>>,
}

impl JsonStockLedger {
    pub fn new(entries: impl Into<PathBuf>, logs: impl Into<PathBuf>, lock_timeout: Duration) -> Self {
        Self {
            entries: JsonFile::new(entries, lock_timeout),
            logs: JsonFile::new(logs, lock_timeout),
        }
    }

    pub fn entries(&self) -> Result<Vec<StockEntry>, StockError> {
        Ok(self.entries.load_or_default()?)
    }

    pub fn logs(&self) -> Result<Vec<StockLogEntry>, StockError> {
        Ok(self.logs.load_or_default()?)
    }
}

impl StockLedger for JsonStockLedger {
    fn append_entry(&self, entry: StockEntry) -> Result<(), StockError> {
        self.entries.update(|entries| {
            entries.push(entry);
            Ok::<_, StockError>(())
        })
    }

    fn remove_entries(&self, ids: &[String]) -> Result<usize, StockError> {
        self.entries.update(|entries| {
            let before = entries.len();
            entries.retain(|e| !ids.contains(&e.id));
            Ok::<_, StockError>(before - entries.len())
        })
    }

    fn log_action(&self, entry: StockLogEntry) -> Result<(), StockError> {
        self.logs.update(|logs| {
            logs.push(entry);
            Ok::<_, StockError>(())
        })
    }
}

/// Record consumption of `items` (negative qty) with one log line each
///
/// All or nothing: on failure the entries created so far are removed before
/// the error is returned.
pub fn deduct_items(
    ledger: &dyn StockLedger,
    items: &[OrderItem],
    reason: &str,
    user: &str,
) -> Result<Vec<String>, StockError> {
    let mut created = Vec::with_capacity(items.len());
    for item in items {
        if let Err(e) = deduct_one(ledger, item, reason, user, &mut created) {
            tracing::error!(error = %e, product = %item.name, "Stock deduction failed, unwinding");
            if !created.is_empty()
                && let Err(undo) = ledger.remove_entries(&created)
            {
                tracing::error!(error = %undo, entries = ?created, "Failed to remove stock entries while unwinding");
            }
            return Err(e);
        }
    }
    tracing::debug!(count = created.len(), reason = %reason, "Stock deducted");
    Ok(created)
}

fn deduct_one(
    ledger: &dyn StockLedger,
    item: &OrderItem,
    reason: &str,
    user: &str,
    created: &mut Vec<String>,
) -> Result<(), StockError> {
    let entry = StockEntry {
        id: uuid::Uuid::new_v4().to_string(),
        product: item.name.clone(),
        product_id: item.product_id.clone(),
        qty: -item.qty.abs(),
        date: util::human_now(),
        reason: reason.to_string(),
        user: user.to_string(),
    };
    let id = entry.id.clone();
    ledger.append_entry(entry)?;
    created.push(id);
    ledger.log_action(StockLogEntry {
        timestamp: util::human_now(),
        user: user.to_string(),
        action: "saida".to_string(),
        product: item.name.clone(),
        qty: item.qty.abs(),
        details: reason.to_string(),
    })
}
