use std::path::PathBuf;
use thiserror::Error;

use crate::cashier::CashierError;
use crate::storage::StorageError;

/// 启动阶段错误
#[derive(Error, Debug)]
pub enum ServerError {
    #[error("无法创建工作目录 {path}: {source}")]
    WorkDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("会话文件不可用: {0}")]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Cashier(#[from] CashierError),
}

pub type Result<T> = std::result::Result<T, ServerError>;
