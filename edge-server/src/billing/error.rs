use crate::accounts::AccountsError;
use crate::cashier::CashierError;
use crate::storage::StorageError;
use crate::transfer::TransferError;
use thiserror::Error;

/// Table / room checkout errors
#[derive(Debug, Error)]
pub enum BillingError {
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Cashier(#[from] CashierError),

    #[error(transparent)]
    Transfer(#[from] TransferError),

    #[error(transparent)]
    Accounts(#[from] AccountsError),

    #[error("Table {0} not found")]
    TableNotFound(String),

    #[error("Table {0} has no items")]
    EmptyTable(String),

    #[error("Table {0} is occupied")]
    TableOccupied(String),

    #[error("Partial payment {0} not found")]
    PartialPaymentNotFound(String),

    #[error("Room {0} has no pending charges")]
    NothingToSettle(String),

    #[error("Payments total {paid:.2} but {expected:.2} is due")]
    PaymentMismatch { expected: f64, paid: f64 },

    #[error("Invalid input: {0}")]
    Validation(String),
}

impl BillingError {
    pub fn is_lock_timeout(&self) -> bool {
        match self {
            BillingError::Storage(e) => e.is_lock_timeout(),
            BillingError::Cashier(e) => e.is_lock_timeout(),
            BillingError::Transfer(e) => e.is_lock_timeout(),
            BillingError::Accounts(e) => e.is_lock_timeout(),
            _ => false,
        }
    }
}

pub type BillingResult<T> = Result<T, BillingError>;
