//! Receipt and Report Printing Module
//!
//! - Receipts on table close
//! - Room charge slips on table-to-room transfer
//! - Closing report on cashier close

mod dispatcher;
pub mod types;

pub use dispatcher::{
    LogPrintDispatcher, MemoryPrintDispatcher, PrintDispatcher, PrintError, dispatch_best_effort,
};
pub use types::*;
