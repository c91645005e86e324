//! Data models
//!
//! Shared between edge-server and the web layer. Every struct mirrors the
//! JSON files the back office has always written; optional fields default so
//! files produced by earlier versions keep loading.

pub mod cashier;
pub mod closed_account;
pub mod fiscal_pool;
pub mod room_charge;
pub mod stock;
pub mod table_order;

// Re-exports
pub use cashier::*;
pub use closed_account::*;
pub use fiscal_pool::*;
pub use room_charge::*;
pub use stock::*;
pub use table_order::*;
