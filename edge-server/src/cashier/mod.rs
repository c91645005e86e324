//! 收银模块
//!
//! # 组成
//!
//! ```text
//! CashierEngine ── 会话开/关、交易、收银间转账、冲正
//!   ├─ SnapshotStore   cashier_sessions.json（锁 + 原子写 + 恢复）
//!   ├─ BackupManager   base64 快照备份，30 天轮换
//!   ├─ ledger          现金分类规则与余额
//!   └─ display         多支付方式合并显示 + 分页
//! ```
//!
//! 所有写操作都在会话文件锁内完成：锁 → 读 → 改 → 原子写 → 备份。

pub mod backup;
pub mod display;
mod engine;
mod error;
pub mod ledger;
mod scheduler;
mod store;

#[cfg(test)]
mod tests;

pub use backup::{BACKUP_RETENTION_DAYS, BackupManager};
pub use display::{DEFAULT_PER_PAGE, DisplayRow, GroupedRow, Page, SubTransaction, paginate};
pub use engine::{
    CLOSED_EXPORT_FILE, CashierEngine, FundTransfer, PaymentGroupReceipt, REVERSAL_CATEGORY,
    RestoreOutcome, SYSTEM_AUTO_USER, SessionFilter, TRANSFER_METHOD, TRANSFER_RECEIVED,
    TRANSFER_SENT,
};
pub use error::{CashierError, CashierResult};
pub use ledger::{SessionSummary, cash_balance, total_balance};
pub use scheduler::BackupScheduler;
pub use store::SnapshotStore;
