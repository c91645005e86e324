//! Table Order Model (餐桌订单)
//!
//! In-flight restaurant order as stored in `table_orders.json`, keyed by the
//! table id. Unknown fields are carried through `extra` so the web layer's
//! own attributes survive a rewrite by the core.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Item source marking a minibar (frigobar) launch
pub const SOURCE_MINIBAR: &str = "minibar";
/// Category marking a minibar item
pub const CATEGORY_MINIBAR: &str = "Frigobar";
/// Item source of the automatic artistic cover
pub const SOURCE_AUTO_COVER: &str = "auto_cover_activation";

fn default_qty() -> f64 {
    1.0
}

/// Complement (add-on) priced on top of an item
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Complement {
    pub name: String,
    #[serde(default)]
    pub price: f64,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// One line of a table order or room charge
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderItem {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub name: String,
    #[serde(default)]
    pub price: f64,
    #[serde(default = "default_qty")]
    pub qty: f64,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub complements: Vec<Complement>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub waiter: Option<String>,
    #[serde(default)]
    pub service_fee_exempt: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub product_id: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl OrderItem {
    pub fn new(name: impl Into<String>, price: f64, qty: f64) -> Self {
        Self {
            id: None,
            name: name.into(),
            price,
            qty,
            complements: Vec::new(),
            category: None,
            source: None,
            waiter: None,
            service_fee_exempt: false,
            product_id: None,
            extra: Map::new(),
        }
    }

    pub fn with_waiter(mut self, waiter: impl Into<String>) -> Self {
        self.waiter = Some(waiter.into());
        self
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    pub fn with_product_id(mut self, product_id: impl Into<String>) -> Self {
        self.product_id = Some(product_id.into());
        self
    }

    /// Launched from the room minibar rather than the restaurant
    pub fn is_minibar(&self) -> bool {
        self.source.as_deref() == Some(SOURCE_MINIBAR)
            || self.category.as_deref() == Some(CATEGORY_MINIBAR)
    }

    /// Artistic cover: excluded from commission and service fee
    pub fn is_cover(&self) -> bool {
        if self.source.as_deref() == Some(SOURCE_AUTO_COVER) {
            return true;
        }
        let name = self.name.to_lowercase();
        name.contains("couvert artistico") || name.contains("couvert artístico")
    }
}

/// Order status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    #[default]
    Open,
    Closed,
}

/// Who is being served at the table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum CustomerType {
    /// Walk-in customer
    #[default]
    Passante,
    /// Hotel guest (has a room)
    Hospede,
    /// Staff meal
    Funcionario,
}

/// Partial payment taken before the table closes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PartialPayment {
    pub id: String,
    pub method: String,
    pub amount: f64,
    pub timestamp: String,
    #[serde(default)]
    pub user: String,
    /// Cashier transaction recording this payment
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transaction_id: Option<String>,
}

/// In-flight restaurant order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct TableOrder {
    #[serde(default)]
    pub status: OrderStatus,
    #[serde(default)]
    pub customer_type: CustomerType,
    #[serde(default)]
    pub items: Vec<OrderItem>,
    #[serde(default)]
    pub total: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub waiter: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub opened_at: Option<String>,
    #[serde(default)]
    pub partial_payments: Vec<PartialPayment>,
    #[serde(default)]
    pub total_paid: f64,
    #[serde(default)]
    pub service_fee_removed: bool,
    #[serde(default)]
    pub discount_amount: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub room_number: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub customer_name: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl TableOrder {
    /// Free for a new order: no items and nothing owed
    pub fn is_free(&self) -> bool {
        self.items.is_empty() && self.total <= 0.0
    }
}
