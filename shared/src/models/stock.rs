//! Stock and sales history records written by the core

use super::table_order::TableOrder;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Stock movement; `qty` is negative for consumption
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StockEntry {
    pub id: String,
    pub product: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub product_id: Option<String>,
    pub qty: f64,
    pub date: String,
    #[serde(default)]
    pub reason: String,
    #[serde(default)]
    pub user: String,
}

/// Stock action log line
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StockLogEntry {
    pub timestamp: String,
    pub user: String,
    pub action: String,
    pub product: String,
    pub qty: f64,
    #[serde(default)]
    pub details: String,
}

/// Sales history record (`sales_history.json`)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SalesRecord {
    pub id: String,
    pub table_id: String,
    pub order: TableOrder,
    pub payment_method: String,
    pub final_total: f64,
    pub closed_at: String,
    pub closed_by: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub room_number: Option<String>,
    #[serde(default)]
    pub details: Map<String, Value>,
}
