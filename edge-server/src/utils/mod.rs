//! 工具模块 - 错误边界与日志
//!
//! # 内容
//!
//! - [`AppError`] - 调用边界的统一错误
//! - [`AppResponse`] - `{code, message, data}` 响应结构
//! - [`logger`] - tracing 初始化

pub mod error;
pub mod logger;
pub mod result;

pub use error::{AppError, AppResponse, BUSY_MESSAGE, ok};
pub use result::AppResult;
