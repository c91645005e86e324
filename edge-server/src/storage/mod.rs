//! 存储原语
//!
//! 所有数据文件都是 JSON 文档：
//! - [`FileLock`] - 跨进程哨兵文件锁
//! - [`JsonFile`] - 带锁的读-改-写与原子替换
//! - [`write_atomic`] - 临时文件 + fsync + rename

mod error;
mod json_file;
mod lock;

pub use error::{StorageError, StorageResult};
pub use json_file::{JsonFile, to_pretty_json, write_atomic};
pub use lock::{DEFAULT_LOCK_TIMEOUT, FileLock};
