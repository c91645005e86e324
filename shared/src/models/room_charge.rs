//! Room Charge Model (客房挂账)
//!
//! Pending bill against an occupied room, produced by a table-to-room
//! transfer or a direct minibar launch.

use super::table_order::OrderItem;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Charge type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChargeType {
    Restaurant,
    Minibar,
}

/// Charge status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ChargeStatus {
    #[default]
    Pending,
    Paid,
    Cancelled,
    Refunded,
}

/// Structured reason attached to a charge
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChargeFlagKind {
    ServiceRemoved,
    DiscountApplied,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChargeFlag {
    #[serde(rename = "type")]
    pub kind: ChargeFlagKind,
    pub value: f64,
}

/// One edit in the charge's append-only audit log
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChargeAuditEntry {
    pub timestamp: String,
    pub user: String,
    pub action: String,
    #[serde(default)]
    pub justification: String,
    #[serde(default)]
    pub changes: Map<String, Value>,
}

/// Pending bill against a room
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoomCharge {
    pub id: String,
    pub room_number: String,
    /// Source table, when the charge came from a restaurant transfer
    #[serde(default)]
    pub table_id: Option<String>,
    #[serde(rename = "type")]
    pub charge_type: ChargeType,
    #[serde(default)]
    pub items: Vec<OrderItem>,
    /// Sum of item totals before fee and discount
    #[serde(default)]
    pub subtotal: f64,
    #[serde(default)]
    pub service_fee: f64,
    #[serde(default)]
    pub discount: f64,
    #[serde(default)]
    pub flags: Vec<ChargeFlag>,
    #[serde(default)]
    pub waiter: Option<String>,
    #[serde(default)]
    pub waiter_breakdown: BTreeMap<String, f64>,
    pub total: f64,
    pub date: String,
    #[serde(default)]
    pub status: ChargeStatus,
    #[serde(default)]
    pub audit_log: Vec<ChargeAuditEntry>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub paid_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub paid_by: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl RoomCharge {
    pub fn is_pending(&self) -> bool {
        self.status == ChargeStatus::Pending
    }

    pub fn has_flag(&self, kind: ChargeFlagKind) -> bool {
        self.flags.iter().any(|f| f.kind == kind)
    }
}

/// Room occupancy entry (`room_occupancy.json`, keyed by room number)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct OccupancyEntry {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub guest_name: Option<String>,
    /// Absent on older files; when present must be `occupied`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub checkin: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl OccupancyEntry {
    pub fn is_occupied(&self) -> bool {
        self.status
            .as_deref()
            .is_none_or(|s| s.eq_ignore_ascii_case("occupied"))
    }
}
