use crate::storage::StorageError;
use thiserror::Error;

/// Cashier errors
#[derive(Debug, Error)]
pub enum CashierError {
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// Cashier already open on open, or closing a closed session
    #[error("{0}")]
    InvalidState(String),

    #[error("Insufficient cash balance: available {available:.2}, requested {requested:.2}")]
    InsufficientCashBalance { available: f64, requested: f64 },

    /// One or both cashier endpoints are closed
    #[error("{0}")]
    TransferIneligible(String),

    #[error("Cashier session not found: {0}")]
    SessionNotFound(String),

    #[error("Transaction not found: {0}")]
    TransactionNotFound(String),

    #[error("Transaction already reversed: {0}")]
    AlreadyReversed(String),

    #[error("Invalid amount: {0}")]
    InvalidAmount(String),
}

impl CashierError {
    pub fn is_lock_timeout(&self) -> bool {
        matches!(self, CashierError::Storage(e) if e.is_lock_timeout())
    }
}

pub type CashierResult<T> = Result<T, CashierError>;
