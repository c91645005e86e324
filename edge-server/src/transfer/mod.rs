//! 餐桌 ⇄ 客房 挂账
//!
//! # 组成
//!
//! ```text
//! TransferCoordinator
//!   ├─ rooms     房号规范化（原样 / 补零 / 去零）
//!   ├─ charges   服务费、折扣、提成拆分
//!   └─ stores    table_orders / room_occupancy / room_charges / sales_history
//! ```
//!
//! 多文件写入在 transfer 锁内按固定顺序进行，后续步骤失败时回滚前面的写入。

pub mod charges;
mod coordinator;
mod error;
pub mod rooms;
mod stores;

#[cfg(test)]
mod tests;

pub use charges::{
    BillTotals, DEFAULT_WAITER, PlannedCharge, SERVICE_FEE_RATE, TransferMode, bill_totals,
    plan_charges, plan_minibar,
};
pub use coordinator::{
    ChargeReturn, FREE_TABLE_RANGE, ROOM_CHARGE_METHOD, ROOM_TABLE_MAX, RoomTransfer,
    TransferCoordinator, free_tables, is_room_table,
};
pub use error::{TransferError, TransferResult};
pub use rooms::normalize_room;
pub use stores::{HotelStores, OccupancyMap, TableMap};
