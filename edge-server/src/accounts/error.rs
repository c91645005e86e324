use crate::cashier::CashierError;
use crate::storage::StorageError;
use thiserror::Error;

/// Closed accounts / fiscal pool errors
#[derive(Debug, Error)]
pub enum AccountsError {
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Cashier(#[from] CashierError),

    #[error("Closed account {0} not found")]
    NotFound(String),

    #[error("Closed account {0} was already reopened")]
    AlreadyReopened(String),

    #[error("Invalid search filter: {0}")]
    InvalidFilter(String),
}

impl AccountsError {
    pub fn is_lock_timeout(&self) -> bool {
        match self {
            AccountsError::Storage(e) => e.is_lock_timeout(),
            AccountsError::Cashier(e) => e.is_lock_timeout(),
            _ => false,
        }
    }
}

pub type AccountsResult<T> = Result<T, AccountsError>;
