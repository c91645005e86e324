//! 结账
//!
//! 餐桌加菜 / 部分付款 / 结账、客房挂账结算、归档重开。
//!
//! 结账写入顺序：收银支付组 → 餐桌 / 挂账 → 销售历史 → 结账归档 → 税票队列 → 打印。

mod batch;
mod error;
mod service;


pub use batch::{BATCH_TTL, BatchGuard};
pub use error::{BillingError, BillingResult};
pub use service::{BillingService, CloseTable, ItemsAdded, ReopenedAccount, RoomSettled, TableClosed};
