//! Fiscal Pool Model (待开票队列)
//!
//! Receipts queued for emission. The pool is append-only; the emission worker
//! owns idempotency through its own external keys.

use super::closed_account::AccountOrigin;
use super::table_order::OrderItem;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Payment method keywords that always require a fiscal receipt
const ELECTRONIC_METHODS: &[&str] = &[
    "cartão", "cartao", "crédito", "credito", "débito", "debito", "pix",
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FiscalPayment {
    pub method: String,
    pub amount: f64,
    pub is_fiscal: bool,
}

impl FiscalPayment {
    /// Electronic tenders are always fiscal; cash and others are left to the
    /// emission worker's configuration.
    pub fn from_method(method: impl Into<String>, amount: f64) -> Self {
        let method = method.into();
        let lower = method.to_lowercase();
        let is_fiscal = ELECTRONIC_METHODS.iter().any(|m| lower.contains(m));
        Self {
            method,
            amount,
            is_fiscal,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum FiscalStatus {
    #[default]
    Pending,
    Emitted,
    Failed,
}

/// Queued receipt
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FiscalPoolEntry {
    pub id: String,
    pub origin: AccountOrigin,
    pub original_id: String,
    pub total_amount: f64,
    #[serde(default)]
    pub items: Vec<OrderItem>,
    #[serde(default)]
    pub payment_methods: Vec<FiscalPayment>,
    #[serde(default)]
    pub customer_info: Map<String, Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(default)]
    pub user: String,
    pub created_at: String,
    #[serde(default)]
    pub status: FiscalStatus,
}

/// Payload for [`FiscalPoolEntry`] creation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewFiscalEntry {
    pub origin: AccountOrigin,
    pub original_id: String,
    pub total_amount: f64,
    pub items: Vec<OrderItem>,
    pub payment_methods: Vec<FiscalPayment>,
    pub user: String,
    #[serde(default)]
    pub customer_info: Map<String, Value>,
    #[serde(default)]
    pub notes: Option<String>,
}
