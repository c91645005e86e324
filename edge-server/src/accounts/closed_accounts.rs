//! 结账归档 (`closed_accounts.json`)
//!
//! 记录一经写入不再修改，唯一例外是重开标记。

use super::error::{AccountsError, AccountsResult};
use crate::cashier::{DEFAULT_PER_PAGE, Page, paginate};
use crate::storage::{JsonFile, StorageError};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use shared::models::{AccountOrigin, AccountStatus, ClosedAccount, NewClosedAccount};
use shared::util::{self, DATE_FORMAT};
use std::path::PathBuf;
use std::time::Duration;

/// Status filter of [`AccountFilter`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusFilter {
    #[default]
    All,
    Closed,
    Reopened,
}

impl StatusFilter {
    fn accepts(&self, status: AccountStatus) -> bool {
        match self {
            StatusFilter::All => true,
            StatusFilter::Closed => status == AccountStatus::Closed,
            StatusFilter::Reopened => status == AccountStatus::Reopened,
        }
    }
}

/// Closed account search
///
/// Dates are `dd/mm/yyyy` and inclusive; `user` is a case-insensitive
/// substring of `closed_by`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AccountFilter {
    #[serde(default)]
    pub date_from: Option<String>,
    #[serde(default)]
    pub date_to: Option<String>,
    #[serde(default)]
    pub min_value: Option<f64>,
    #[serde(default)]
    pub max_value: Option<f64>,
    #[serde(default)]
    pub user: Option<String>,
    #[serde(default)]
    pub origin: Option<AccountOrigin>,
    #[serde(default)]
    pub status: StatusFilter,
    #[serde(default)]
    pub page: usize,
    #[serde(default)]
    pub per_page: usize,
}

fn parse_date(value: Option<&str>, field: &str) -> AccountsResult<Option<NaiveDate>> {
    match value.map(str::trim).filter(|v| !v.is_empty()) {
        None => Ok(None),
        Some(v) => NaiveDate::parse_from_str(v, DATE_FORMAT)
            .map(Some)
            .map_err(|_| AccountsError::InvalidFilter(format!("{field} must be dd/mm/yyyy, got {v:?}"))),
    }
}

#[derive(Debug, Clone)]
pub struct ClosedAccountStore {
    file: JsonFile<Vec<ClosedAccount>>,
}

impl ClosedAccountStore {
    pub fn new(path: impl Into<PathBuf>, lock_timeout: Duration) -> Self {
        Self {
            file: JsonFile::new(path, lock_timeout),
        }
    }

    pub fn all(&self) -> AccountsResult<Vec<ClosedAccount>> {
        Ok(self.file.load_or_default()?)
    }

    pub fn get(&self, id: &str) -> AccountsResult<Option<ClosedAccount>> {
        Ok(self.all()?.into_iter().find(|a| a.id == id))
    }

    /// Archive a paid bill as `CLOSED_{YYYYMMDDHHMMSS}_{original_id}`
    ///
    /// Two closes of the same original within one second get a numeric suffix.
    pub fn save(&self, record: NewClosedAccount) -> AccountsResult<ClosedAccount> {
        let saved = self.file.update(|accounts| {
            let base = format!("CLOSED_{}_{}", util::compact_now(), record.original_id);
            let mut id = base.clone();
            let mut n = 1;
            while accounts.iter().any(|a| a.id == id) {
                n += 1;
                id = format!("{base}_{n}");
            }
            let account = ClosedAccount {
                id,
                origin: record.origin,
                original_id: record.original_id,
                items: record.items,
                total: record.total,
                payments: record.payments,
                closed_at: util::human_now(),
                closed_by: record.closed_by,
                details: record.details,
                status: AccountStatus::Closed,
                reopened_by: None,
                reopened_at: None,
                reopen_reason: None,
            };
            accounts.push(account.clone());
            Ok::<_, StorageError>(account)
        })?;

        tracing::info!(
            closed_id = %saved.id,
            origin = %saved.origin,
            total = saved.total,
            "Closed account saved"
        );
        Ok(saved)
    }

    /// Flag an account as reopened; the record itself stays
    pub fn mark_reopened(&self, id: &str, user: &str, reason: &str) -> AccountsResult<ClosedAccount> {
        let reopened = self.file.update(|accounts| {
            let account = accounts
                .iter_mut()
                .find(|a| a.id == id)
                .ok_or_else(|| AccountsError::NotFound(id.to_string()))?;
            if account.status == AccountStatus::Reopened {
                return Err(AccountsError::AlreadyReopened(id.to_string()));
            }
            account.status = AccountStatus::Reopened;
            account.reopened_by = Some(user.to_string());
            account.reopened_at = Some(util::human_now());
            account.reopen_reason = Some(reason.to_string());
            Ok(account.clone())
        })?;

        tracing::info!(closed_id = %id, user = %user, "Closed account reopened");
        Ok(reopened)
    }

    /// Filtered accounts, newest id first
    pub fn search(&self, filter: &AccountFilter) -> AccountsResult<Page<ClosedAccount>> {
        let from = parse_date(filter.date_from.as_deref(), "date_from")?;
        let to = parse_date(filter.date_to.as_deref(), "date_to")?;
        let user = filter
            .user
            .as_deref()
            .map(|u| u.trim().to_lowercase())
            .filter(|u| !u.is_empty());

        let mut rows: Vec<ClosedAccount> = self
            .all()?
            .into_iter()
            .filter(|a| filter.status.accepts(a.status))
            .filter(|a| filter.origin.is_none_or(|o| a.origin == o))
            .filter(|a| filter.min_value.is_none_or(|min| a.total >= min))
            .filter(|a| filter.max_value.is_none_or(|max| a.total <= max))
            .filter(|a| {
                user.as_deref()
                    .is_none_or(|u| a.closed_by.to_lowercase().contains(u))
            })
            .filter(|a| {
                if from.is_none() && to.is_none() {
                    return true;
                }
                // undated records never match a date range
                let Some(day) = util::parse_human(&a.closed_at).map(|t| t.date()) else {
                    return false;
                };
                from.is_none_or(|f| day >= f) && to.is_none_or(|t| day <= t)
            })
            .collect();
        rows.sort_by(|a, b| b.id.cmp(&a.id));

        let per_page = if filter.per_page == 0 {
            DEFAULT_PER_PAGE
        } else {
            filter.per_page
        };
        Ok(paginate(rows, filter.page, per_page))
    }
}
