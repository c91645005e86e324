//! Closed Account Model (结账归档)
//!
//! Immutable snapshot of a paid bill. The only mutation ever applied is the
//! reopen marker.

use super::table_order::OrderItem;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Where a closed bill (or fiscal receipt) came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccountOrigin {
    RestaurantTable,
    ReceptionRoom,
    ReceptionCharge,
    /// Sale found in a cashier session with no archival counterpart
    CashierOrphan,
}

impl AccountOrigin {
    pub fn as_str(&self) -> &'static str {
        match self {
            AccountOrigin::RestaurantTable => "restaurant_table",
            AccountOrigin::ReceptionRoom => "reception_room",
            AccountOrigin::ReceptionCharge => "reception_charge",
            AccountOrigin::CashierOrphan => "cashier_orphan",
        }
    }
}

impl fmt::Display for AccountOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum AccountStatus {
    #[default]
    Closed,
    Reopened,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountPayment {
    pub method: String,
    pub amount: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct AccountDetails {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub customer: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub waiter: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub room: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Archived bill
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClosedAccount {
    /// `CLOSED_{YYYYMMDDHHMMSS}_{original_id}`
    pub id: String,
    pub origin: AccountOrigin,
    pub original_id: String,
    #[serde(default)]
    pub items: Vec<OrderItem>,
    pub total: f64,
    #[serde(default)]
    pub payments: Vec<AccountPayment>,
    pub closed_at: String,
    pub closed_by: String,
    #[serde(default)]
    pub details: AccountDetails,
    #[serde(default)]
    pub status: AccountStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reopened_by: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reopened_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reopen_reason: Option<String>,
}

/// Payload for [`ClosedAccount`] creation; id and timestamp are assigned on save
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewClosedAccount {
    pub origin: AccountOrigin,
    pub original_id: String,
    pub items: Vec<OrderItem>,
    pub total: f64,
    pub payments: Vec<AccountPayment>,
    pub closed_by: String,
    #[serde(default)]
    pub details: AccountDetails,
}
