//! 库存出库记录

mod ledger;

pub use ledger::{JsonStockLedger, StockError, StockLedger, deduct_items};
