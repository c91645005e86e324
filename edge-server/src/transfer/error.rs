use crate::cashier::CashierError;
use crate::stock::StockError;
use crate::storage::StorageError;
use shared::models::ChargeStatus;
use thiserror::Error;

/// Table / room transfer errors
///
/// Every variant is raised before any write, or after the partial writes
/// have been unwound.
#[derive(Debug, Error)]
pub enum TransferError {
    #[error(transparent)]
    Cashier(#[from] CashierError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Stock deduction failed: {0}")]
    Stock(#[from] StockError),

    #[error("Table {0} not found")]
    TableNotFound(String),

    #[error("Table {0} has no items to transfer")]
    EmptyTable(String),

    #[error("Table {table_id} already took {total_paid:.2} in partial payments; void them before transferring")]
    PartialPaymentsTaken { table_id: String, total_paid: f64 },

    #[error("Room {0} not found")]
    RoomNotFound(String),

    #[error("Room {0} is not occupied")]
    RoomNotOccupied(String),

    #[error("Room charge {0} not found")]
    ChargeNotFound(String),

    #[error("Room charge {charge_id} is {status:?}, only pending charges can be changed")]
    ChargeNotPending {
        charge_id: String,
        status: ChargeStatus,
    },

    #[error("Table {table_id} is occupied")]
    TableOccupied {
        table_id: String,
        free_tables: Vec<u32>,
    },

    #[error("No destination table: charge has no source table and none was given")]
    MissingDestination,

    #[error("Invalid input: {0}")]
    Validation(String),
}

impl TransferError {
    pub fn is_lock_timeout(&self) -> bool {
        match self {
            TransferError::Storage(e) => e.is_lock_timeout(),
            TransferError::Cashier(e) => e.is_lock_timeout(),
            TransferError::Stock(StockError::Storage(e)) => e.is_lock_timeout(),
            _ => false,
        }
    }
}

pub type TransferResult<T> = Result<T, TransferError>;
