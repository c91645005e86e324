//! 结账归档与税票队列
//!
//! - [`ClosedAccountStore`] - `closed_accounts.json`，保存 / 重开标记 / 搜索
//! - [`FiscalPool`] - `fiscal_pool.json`，只追加
//! - [`RestitutionService`] - 从归档与收银会话补录缺失的税票

mod closed_accounts;
mod error;
mod fiscal_pool;
pub mod restitution;

pub use closed_accounts::{AccountFilter, ClosedAccountStore, StatusFilter};
pub use error::{AccountsError, AccountsResult};
pub use fiscal_pool::FiscalPool;
pub use restitution::{ORPHAN_WINDOW_SECS, RestitutionReport, RestitutionService, plan_backfill};
