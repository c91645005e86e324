//! 核心模块 - 配置、状态、后台任务和启动错误
//!
//! # 模块结构
//!
//! - [`Config`] - 服务配置
//! - [`DataPaths`] - 数据文件路径
//! - [`ServerState`] - 服务状态
//! - [`BackgroundTasks`] - 后台任务管理
//! - [`ServerError`] - 启动错误

pub mod config;
pub mod error;
pub mod state;
pub mod tasks;

pub use config::{Config, DataPaths};
pub use error::{Result, ServerError};
pub use state::ServerState;
pub use tasks::{BackgroundTasks, TaskKind};
