//! Shared types for the back-office cashier core
//!
//! Data model shared between the edge server engine and the web layer:
//! cashier sessions and transactions, table orders, room charges,
//! closed accounts and fiscal pool entries.

pub mod models;
pub mod util;

// Re-exports
pub use serde::{Deserialize, Serialize};
