//! Unified Result Types

use super::AppError;

/// Boundary-level Result type
pub type AppResult<T> = Result<T, AppError>;
