//! 待开票队列 (`fiscal_pool.json`)
//!
//! 只追加；重复条目由开票 worker 通过外部键去重。

use super::error::AccountsResult;
use crate::storage::{JsonFile, StorageError};
use shared::models::{FiscalPoolEntry, FiscalStatus, NewFiscalEntry};
use shared::util;
use std::path::PathBuf;
use std::time::Duration;

fn pool_entry(new: NewFiscalEntry, created_at: &str) -> FiscalPoolEntry {
    let suffix = uuid::Uuid::new_v4().simple().to_string();
    FiscalPoolEntry {
        id: format!("FP_{}_{}", util::compact_now(), &suffix[..8]),
        origin: new.origin,
        original_id: new.original_id,
        total_amount: new.total_amount,
        items: new.items,
        payment_methods: new.payment_methods,
        customer_info: new.customer_info,
        notes: new.notes,
        user: new.user,
        created_at: created_at.to_string(),
        status: FiscalStatus::Pending,
    }
}

#[derive(Debug, Clone)]
pub struct FiscalPool {
    file: JsonFile<Vec<FiscalPoolEntry>>,
}

impl FiscalPool {
    pub fn new(path: impl Into<PathBuf>, lock_timeout: Duration) -> Self {
        Self {
            file: JsonFile::new(path, lock_timeout),
        }
    }

    pub fn entries(&self) -> AccountsResult<Vec<FiscalPoolEntry>> {
        Ok(self.file.load_or_default()?)
    }

    /// Queue one receipt, unconditionally
    pub fn add_to_pool(&self, entry: NewFiscalEntry) -> AccountsResult<FiscalPoolEntry> {
        let entry = pool_entry(entry, &util::human_now());
        self.file.update(|pool| {
            pool.push(entry.clone());
            Ok::<_, StorageError>(())
        })?;
        tracing::info!(
            fiscal_id = %entry.id,
            origin = %entry.origin,
            total = entry.total_amount,
            "Fiscal pool entry added"
        );
        Ok(entry)
    }

    /// Queue what `plan` finds missing, planned and written under one lock
    ///
    /// `plan` sees the pool as it is on disk, so overlapping callers never
    /// queue the same receipts twice. Nothing is written when it returns
    /// no entries.
    pub fn add_missing(
        &self,
        plan: impl FnOnce(&[FiscalPoolEntry]) -> Vec<NewFiscalEntry>,
    ) -> AccountsResult<Vec<FiscalPoolEntry>> {
        let _guard = self.file.lock()?;
        let mut pool = self.file.load_or_default()?;
        let now = util::human_now();
        let added: Vec<FiscalPoolEntry> = plan(&pool).into_iter().map(|e| pool_entry(e, &now)).collect();
        if added.is_empty() {
            return Ok(added);
        }
        pool.extend(added.iter().cloned());
        self.file.save(&pool)?;
        tracing::info!(count = added.len(), "Fiscal pool entries added");
        Ok(added)
    }
}
