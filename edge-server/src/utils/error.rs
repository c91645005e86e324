//! 统一错误处理
//!
//! 各子模块的错误在调用边界统一转换为 [`AppError`]，
//! 并序列化为 `{code, message, data}` 响应体。
//!
//! # 错误码规范
//!
//! | 错误码 | HTTP | 说明 |
//! |--------|------|------|
//! | E0000 | 200 | 成功 |
//! | E0002 | 400 | 验证失败 |
//! | E0003 | 404 | 资源不存在 |
//! | E0004 | 409 | 资源冲突 |
//! | E0005 | 422 | 业务规则违反 |
//! | E9003 | 503 | 文件锁超时，系统繁忙 |
//! | E9001 | 500 | 内部错误 |
//!
//! # 使用示例
//!
//! ```ignore
//! let receipt = state.billing.close_table(req).map_err(AppError::from)?;
//! Ok(ok(receipt))
//! ```

use axum::{
    Json,
    response::{IntoResponse, Response},
};
use http::StatusCode;
use serde::Serialize;
use serde_json::Value;
use tracing::error;

use crate::accounts::AccountsError;
use crate::billing::BillingError;
use crate::cashier::CashierError;
use crate::stock::StockError;
use crate::storage::StorageError;
use crate::transfer::TransferError;

/// 繁忙提示，锁超时时返回给操作员
pub const BUSY_MESSAGE: &str = "Sistema ocupado, tente novamente";

/// API 统一响应结构
///
/// ```json
/// {
///   "code": "E0000",
///   "message": "Success",
///   "data": { ... }
/// }
/// ```
#[derive(Debug, Serialize)]
pub struct AppResponse<T> {
    /// 错误码 (E0000 表示成功)
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

/// 应用错误枚举
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    // ========== 业务逻辑错误 (4xx) ==========
    #[error("Resource not found: {0}")]
    /// 资源不存在 (404)
    NotFound(String),

    #[error("Resource conflict: {0}")]
    /// 资源冲突 (409)，可附带数据 (例如空闲餐桌列表)
    Conflict(String, Option<Value>),

    #[error("Validation failed: {0}")]
    /// 验证失败 (400)
    Validation(String),

    #[error("Business rule violation: {0}")]
    /// 业务规则违反 (422)，可附带数据 (例如可用余额)
    BusinessRule(String, Option<Value>),

    // ========== 系统错误 (5xx) ==========
    #[error("System busy")]
    /// 文件锁超时 (503)
    Busy,

    #[error("Internal server error: {0}")]
    /// 内部错误 (500)
    Internal(String),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(..) => StatusCode::CONFLICT,
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::BusinessRule(..) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::Busy => StatusCode::SERVICE_UNAVAILABLE,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            AppError::NotFound(_) => "E0003",
            AppError::Conflict(..) => "E0004",
            AppError::Validation(_) => "E0002",
            AppError::BusinessRule(..) => "E0005",
            AppError::Busy => "E9003",
            AppError::Internal(_) => "E9001",
        }
    }

    fn body(self) -> AppResponse<Value> {
        let code = self.code().to_string();
        let (message, data) = match self {
            AppError::NotFound(msg) | AppError::Validation(msg) => (msg, None),
            AppError::Conflict(msg, data) | AppError::BusinessRule(msg, data) => (msg, data),
            AppError::Busy => (BUSY_MESSAGE.to_string(), None),
            AppError::Internal(msg) => {
                error!(target: "internal", error = %msg, "Internal error occurred");
                ("Internal server error".to_string(), None)
            }
        };
        AppResponse { code, message, data }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        (status, Json(self.body())).into_response()
    }
}

// ========== Conversions ==========

impl From<StorageError> for AppError {
    fn from(e: StorageError) -> Self {
        if e.is_lock_timeout() {
            return AppError::Busy;
        }
        AppError::Internal(e.to_string())
    }
}

impl From<CashierError> for AppError {
    fn from(e: CashierError) -> Self {
        match e {
            CashierError::Storage(e) => e.into(),
            CashierError::SessionNotFound(_) | CashierError::TransactionNotFound(_) => {
                AppError::NotFound(e.to_string())
            }
            CashierError::InvalidAmount(_) => AppError::Validation(e.to_string()),
            CashierError::InsufficientCashBalance {
                available,
                requested,
            } => AppError::BusinessRule(
                e.to_string(),
                Some(serde_json::json!({ "available": available, "requested": requested })),
            ),
            CashierError::InvalidState(_)
            | CashierError::TransferIneligible(_)
            | CashierError::AlreadyReversed(_) => AppError::BusinessRule(e.to_string(), None),
        }
    }
}

impl From<StockError> for AppError {
    fn from(e: StockError) -> Self {
        match e {
            StockError::Storage(e) => e.into(),
            StockError::Rejected(_) => AppError::Internal(e.to_string()),
        }
    }
}

impl From<TransferError> for AppError {
    fn from(e: TransferError) -> Self {
        match e {
            TransferError::Cashier(e) => e.into(),
            TransferError::Storage(e) => e.into(),
            TransferError::Stock(e) => e.into(),
            TransferError::TableNotFound(_)
            | TransferError::RoomNotFound(_)
            | TransferError::ChargeNotFound(_) => AppError::NotFound(e.to_string()),
            TransferError::TableOccupied {
                ref free_tables, ..
            } => {
                let data = serde_json::json!({ "free_tables": free_tables });
                AppError::Conflict(e.to_string(), Some(data))
            }
            TransferError::Validation(_) => AppError::Validation(e.to_string()),
            TransferError::EmptyTable(_)
            | TransferError::PartialPaymentsTaken { .. }
            | TransferError::RoomNotOccupied(_)
            | TransferError::ChargeNotPending { .. }
            | TransferError::MissingDestination => AppError::BusinessRule(e.to_string(), None),
        }
    }
}

impl From<AccountsError> for AppError {
    fn from(e: AccountsError) -> Self {
        match e {
            AccountsError::Storage(e) => e.into(),
            AccountsError::Cashier(e) => e.into(),
            AccountsError::NotFound(_) => AppError::NotFound(e.to_string()),
            AccountsError::AlreadyReopened(_) => AppError::BusinessRule(e.to_string(), None),
            AccountsError::InvalidFilter(_) => AppError::Validation(e.to_string()),
        }
    }
}

impl From<BillingError> for AppError {
    fn from(e: BillingError) -> Self {
        match e {
            BillingError::Storage(e) => e.into(),
            BillingError::Cashier(e) => e.into(),
            BillingError::Transfer(e) => e.into(),
            BillingError::Accounts(e) => e.into(),
            BillingError::TableNotFound(_) | BillingError::PartialPaymentNotFound(_) => {
                AppError::NotFound(e.to_string())
            }
            BillingError::TableOccupied(_) => AppError::Conflict(e.to_string(), None),
            BillingError::Validation(_) => AppError::Validation(e.to_string()),
            BillingError::PaymentMismatch { expected, paid } => AppError::BusinessRule(
                e.to_string(),
                Some(serde_json::json!({ "expected": expected, "paid": paid })),
            ),
            BillingError::EmptyTable(_) | BillingError::NothingToSettle(_) => {
                AppError::BusinessRule(e.to_string(), None)
            }
        }
    }
}

// ========== Helper functions ==========

/// Create a successful response
pub fn ok<T: Serialize>(data: T) -> Json<AppResponse<T>> {
    Json(AppResponse {
        code: "E0000".to_string(),
        message: "Success".to_string(),
        data: Some(data),
    })
}
