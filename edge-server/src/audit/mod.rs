//! 审计日志模块
//!
//! 核心只负责产生审计条目，落地交给 [`AuditSink`]：
//!
//! ```text
//! 拦截的取款 / 转账  → WARNING
//! 成功的转账 / 结账  → INFO
//!   └─ emit() → AuditSink::record() → audit_log.jsonl
//! ```
//!
//! 审计失败只记录 tracing 日志，永远不会让资金操作失败。

mod sink;
pub mod types;

pub use sink::{AuditError, AuditSink, JsonlAuditSink, MemoryAuditSink, emit};
pub use types::{AuditAction, AuditEntry, Severity};
