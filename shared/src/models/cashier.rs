//! Cashier Model (收银班次)
//!
//! One [`Session`] is one cash-register shift; it exclusively owns its
//! append-only transaction log. Field names follow the sessions file written
//! by earlier versions, so `entity` and `document_id` are optional.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Cashier type label as stored in the sessions file
///
/// `restaurant_service` and `reception_room_billing` are legacy aliases of
/// `restaurant` and `guest_consumption`. Every lookup folds them through
/// [`CashierType::logical`]; labels are written back exactly as given.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum CashierType {
    Restaurant,
    RestaurantService,
    GuestConsumption,
    ReceptionRoomBilling,
    ReceptionReservations,
    /// Unknown label kept verbatim so old files still load
    Other(String),
}

impl CashierType {
    /// All known labels, aliases included
    pub const KNOWN: [CashierType; 5] = [
        CashierType::Restaurant,
        CashierType::RestaurantService,
        CashierType::GuestConsumption,
        CashierType::ReceptionRoomBilling,
        CashierType::ReceptionReservations,
    ];

    pub fn as_str(&self) -> &str {
        match self {
            CashierType::Restaurant => "restaurant",
            CashierType::RestaurantService => "restaurant_service",
            CashierType::GuestConsumption => "guest_consumption",
            CashierType::ReceptionRoomBilling => "reception_room_billing",
            CashierType::ReceptionReservations => "reception_reservations",
            CashierType::Other(s) => s.as_str(),
        }
    }

    /// Canonical label of the logical cashier this label belongs to
    pub fn logical(&self) -> CashierType {
        match self {
            CashierType::Restaurant | CashierType::RestaurantService => CashierType::Restaurant,
            CashierType::GuestConsumption | CashierType::ReceptionRoomBilling => {
                CashierType::GuestConsumption
            }
            other => other.clone(),
        }
    }

    /// Whether both labels name the same logical cashier
    pub fn same_logical(&self, other: &CashierType) -> bool {
        self.logical() == other.logical()
    }

    /// Every label that folds to the same logical cashier
    pub fn aliases(&self) -> Vec<CashierType> {
        match self.logical() {
            CashierType::Restaurant => {
                vec![CashierType::Restaurant, CashierType::RestaurantService]
            }
            CashierType::GuestConsumption => vec![
                CashierType::GuestConsumption,
                CashierType::ReceptionRoomBilling,
            ],
            other => vec![other],
        }
    }

    /// Operator-facing name
    pub fn display_name(&self) -> &str {
        match self.logical() {
            CashierType::Restaurant => "Caixa Restaurante",
            CashierType::GuestConsumption => "Caixa Consumo Hóspedes",
            CashierType::ReceptionReservations => "Caixa Recepção Reservas",
            _ => self.as_str(),
        }
    }
}

impl From<&str> for CashierType {
    fn from(value: &str) -> Self {
        match value.trim().to_lowercase().as_str() {
            "restaurant" => CashierType::Restaurant,
            "restaurant_service" => CashierType::RestaurantService,
            "guest_consumption" => CashierType::GuestConsumption,
            "reception_room_billing" => CashierType::ReceptionRoomBilling,
            "reception_reservations" => CashierType::ReceptionReservations,
            _ => CashierType::Other(value.to_string()),
        }
    }
}

impl From<String> for CashierType {
    fn from(value: String) -> Self {
        CashierType::from(value.as_str())
    }
}

impl From<CashierType> for String {
    fn from(value: CashierType) -> Self {
        value.as_str().to_string()
    }
}

impl fmt::Display for CashierType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Session status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    #[default]
    Open,
    Closed,
}

/// Money direction of a transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    In,
    Out,
}

/// Semantic label of a transaction (`type` on disk)
///
/// Legacy labels (`supply`, `sangria`, `bleeding`, ...) are kept verbatim
/// because the cash classification looks at the raw label;
/// [`TransactionKind::normalized`] folds them onto `in` / `out`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum TransactionKind {
    Sale,
    Refund,
    Deposit,
    Supply,
    Suprimento,
    Withdrawal,
    Sangria,
    Bleeding,
    In,
    Out,
    TransferIn,
    TransferOut,
    Other(String),
}

impl TransactionKind {
    pub fn as_str(&self) -> &str {
        match self {
            TransactionKind::Sale => "sale",
            TransactionKind::Refund => "refund",
            TransactionKind::Deposit => "deposit",
            TransactionKind::Supply => "supply",
            TransactionKind::Suprimento => "suprimento",
            TransactionKind::Withdrawal => "withdrawal",
            TransactionKind::Sangria => "sangria",
            TransactionKind::Bleeding => "bleeding",
            TransactionKind::In => "in",
            TransactionKind::Out => "out",
            TransactionKind::TransferIn => "transfer_in",
            TransactionKind::TransferOut => "transfer_out",
            TransactionKind::Other(s) => s.as_str(),
        }
    }

    /// Money direction: `out`, `withdrawal`, `refund`, `sangria` and their
    /// equivalents subtract; everything else adds.
    pub fn direction(&self) -> Direction {
        match self {
            TransactionKind::Out
            | TransactionKind::Withdrawal
            | TransactionKind::Refund
            | TransactionKind::Sangria
            | TransactionKind::Bleeding
            | TransactionKind::TransferOut => Direction::Out,
            _ => Direction::In,
        }
    }

    pub fn is_outflow(&self) -> bool {
        self.direction() == Direction::Out
    }

    /// Labels that always move physical cash (drawer supply / bleeding)
    pub fn is_cash_movement(&self) -> bool {
        matches!(
            self,
            TransactionKind::Supply
                | TransactionKind::Suprimento
                | TransactionKind::Bleeding
                | TransactionKind::Sangria
        )
    }

    /// Legacy label folded onto the current vocabulary
    pub fn normalized(&self) -> TransactionKind {
        match self {
            TransactionKind::Supply
            | TransactionKind::Suprimento
            | TransactionKind::Deposit
            | TransactionKind::TransferIn => TransactionKind::In,
            TransactionKind::Sangria
            | TransactionKind::Bleeding
            | TransactionKind::Withdrawal
            | TransactionKind::TransferOut => TransactionKind::Out,
            other => other.clone(),
        }
    }

    /// Kind used when compensating a transaction of this kind
    pub fn reverse(&self) -> TransactionKind {
        match self.direction() {
            Direction::In => TransactionKind::Refund,
            Direction::Out => TransactionKind::In,
        }
    }
}

impl From<&str> for TransactionKind {
    fn from(value: &str) -> Self {
        match value.trim().to_lowercase().replace('-', "_").as_str() {
            "sale" => TransactionKind::Sale,
            "refund" => TransactionKind::Refund,
            "deposit" => TransactionKind::Deposit,
            "supply" => TransactionKind::Supply,
            "suprimento" => TransactionKind::Suprimento,
            "withdrawal" => TransactionKind::Withdrawal,
            "sangria" => TransactionKind::Sangria,
            "bleeding" => TransactionKind::Bleeding,
            "in" => TransactionKind::In,
            "out" => TransactionKind::Out,
            "transfer_in" => TransactionKind::TransferIn,
            "transfer_out" => TransactionKind::TransferOut,
            _ => TransactionKind::Other(value.to_string()),
        }
    }
}

impl From<String> for TransactionKind {
    fn from(value: String) -> Self {
        TransactionKind::from(value.as_str())
    }
}

impl From<TransactionKind> for String {
    fn from(value: TransactionKind) -> Self {
        value.as_str().to_string()
    }
}

impl fmt::Display for TransactionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Well-known keys of [`Transaction::details`]
pub mod detail_keys {
    pub const PAYMENT_GROUP_ID: &str = "payment_group_id";
    pub const PAYMENT_METHOD_CODE: &str = "payment_method_code";
    pub const TOTAL_PAYMENT_GROUP_AMOUNT: &str = "total_payment_group_amount";
    pub const SERVICE_FEE_REMOVED: &str = "service_fee_removed";
    pub const IDEMPOTENCY_KEY: &str = "idempotency_key";
    pub const REVERSES: &str = "reverses";
    pub const TABLE_ID: &str = "table_id";
    pub const ROOM_NUMBER: &str = "room_number";
    /// Set on sales taken as a partial payment before the table closes
    pub const PARTIAL_PAYMENT_ID: &str = "partial_payment_id";
}

/// One line in a session log
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: String,
    /// Semantic label
    #[serde(rename = "type")]
    pub kind: TransactionKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    /// Always stored positive; the sign comes from `kind`
    pub amount: f64,
    #[serde(default)]
    pub payment_method: String,
    #[serde(default)]
    pub description: String,
    pub timestamp: String,
    #[serde(default)]
    pub user: String,
    #[serde(default)]
    pub details: Map<String, Value>,
    /// Shared by the two legs of a fund transfer
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub document_id: Option<String>,
}

impl Transaction {
    pub fn detail_str(&self, key: &str) -> Option<&str> {
        self.details.get(key).and_then(Value::as_str)
    }

    pub fn detail_f64(&self, key: &str) -> Option<f64> {
        self.details.get(key).and_then(Value::as_f64)
    }

    pub fn payment_group_id(&self) -> Option<&str> {
        self.detail_str(detail_keys::PAYMENT_GROUP_ID)
            .filter(|id| !id.is_empty())
    }

    pub fn idempotency_key(&self) -> Option<&str> {
        self.detail_str(detail_keys::IDEMPOTENCY_KEY)
            .filter(|key| !key.is_empty())
    }

    /// Signed amount according to the semantic label
    pub fn signed_amount(&self) -> f64 {
        match self.kind.direction() {
            Direction::In => self.amount.abs(),
            Direction::Out => -self.amount.abs(),
        }
    }
}

/// One cashier shift
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub id: String,
    #[serde(rename = "type")]
    pub cashier_type: CashierType,
    /// Opening operator
    pub user: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entity: Option<String>,
    pub opened_at: String,
    pub opening_balance: f64,
    #[serde(default)]
    pub status: SessionStatus,
    #[serde(default)]
    pub closed_at: Option<String>,
    #[serde(default)]
    pub closed_by: Option<String>,
    #[serde(default)]
    pub closing_balance: Option<f64>,
    #[serde(default)]
    pub difference: Option<f64>,
    #[serde(default)]
    pub transactions: Vec<Transaction>,
}

impl Session {
    pub fn is_open(&self) -> bool {
        self.status == SessionStatus::Open
    }

    pub fn find_transaction(&self, id: &str) -> Option<&Transaction> {
        self.transactions.iter().find(|t| t.id == id)
    }

    pub fn find_by_idempotency_key(&self, key: &str) -> Option<&Transaction> {
        self.transactions
            .iter()
            .find(|t| t.idempotency_key() == Some(key))
    }
}

/// Open session payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionOpen {
    #[serde(rename = "type")]
    pub cashier_type: CashierType,
    pub user: String,
    #[serde(default)]
    pub opening_balance: f64,
    #[serde(default)]
    pub entity: Option<String>,
}

/// Close session payload; `session_id` wins over `cashier_type` when both are set
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionClose {
    #[serde(default)]
    pub session_id: Option<String>,
    #[serde(default, rename = "type")]
    pub cashier_type: Option<CashierType>,
    pub user: String,
    /// Declared cash in the drawer; defaults to the expected balance
    #[serde(default)]
    pub closing_balance: Option<f64>,
}

/// Add transaction payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransactionInput {
    #[serde(rename = "type")]
    pub cashier_type: CashierType,
    /// Signed: a negative amount without explicit kind is a refund
    pub amount: f64,
    pub description: String,
    pub payment_method: String,
    pub user: String,
    #[serde(default)]
    pub details: Map<String, Value>,
    #[serde(default)]
    pub kind: Option<TransactionKind>,
    #[serde(default)]
    pub is_withdrawal: bool,
    #[serde(default)]
    pub payment_group_id: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
}

impl TransactionInput {
    pub fn new(
        cashier_type: CashierType,
        amount: f64,
        description: impl Into<String>,
        payment_method: impl Into<String>,
        user: impl Into<String>,
    ) -> Self {
        Self {
            cashier_type,
            amount,
            description: description.into(),
            payment_method: payment_method.into(),
            user: user.into(),
            details: Map::new(),
            kind: None,
            is_withdrawal: false,
            payment_group_id: None,
            category: None,
        }
    }

    pub fn with_kind(mut self, kind: TransactionKind) -> Self {
        self.kind = Some(kind);
        self
    }

    pub fn with_detail(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.details.insert(key.to_string(), value.into());
        self
    }

    pub fn with_payment_group(mut self, group_id: impl Into<String>) -> Self {
        self.payment_group_id = Some(group_id.into());
        self
    }

    pub fn withdrawal(mut self) -> Self {
        self.is_withdrawal = true;
        self
    }
}

/// One tender of a multi-tender payment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentLeg {
    pub method: String,
    pub amount: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub method_code: Option<String>,
}

impl PaymentLeg {
    pub fn new(method: impl Into<String>, amount: f64) -> Self {
        Self {
            method: method.into(),
            amount,
            method_code: None,
        }
    }
}
