//! 审计日志类型定义
//!
//! 字段名沿用后台审计表 (`acao`, `entidade`, `detalhes`, ...)，
//! 由 web 层的审计页面直接读取。

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// 审计操作类型（枚举，非自由文本）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
    // ═══ 收银班次 ═══
    CashierOpened,
    CashierClosed,
    /// 现金不足被拦截的取款
    WithdrawalBlocked,
    TransactionVoided,

    // ═══ 收银间转账 ═══
    /// 两端收银未同时开启，或现金不足
    TransferBlocked,
    FundsTransferred,
    TransferReversed,

    // ═══ 餐桌 / 客房 ═══
    TableTransferredToRoom,
    ChargeReturnedToRestaurant,
    ChargeCancelled,
    MinibarLaunched,
    TableClosed,
    RoomSettled,
    AccountReopened,

    // ═══ 税票 ═══
    FiscalRestitution,
}

impl std::fmt::Display for AuditAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// Severity level (`nivel_severidade`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Severity {
    Info,
    Warning,
    Error,
}

/// 审计日志条目
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditEntry {
    pub acao: AuditAction,
    /// Resource kind ("cashier", "room_charge", "table", ...)
    pub entidade: String,
    pub detalhes: Value,
    pub nivel_severidade: Severity,
    #[serde(default)]
    pub departamento_id: Option<String>,
    /// Operator
    #[serde(default)]
    pub colaborador_id: Option<String>,
    #[serde(default)]
    pub timestamp: String,
}

impl AuditEntry {
    pub fn new(
        acao: AuditAction,
        entidade: impl Into<String>,
        nivel_severidade: Severity,
        detalhes: Value,
    ) -> Self {
        Self {
            acao,
            entidade: entidade.into(),
            detalhes,
            nivel_severidade,
            departamento_id: None,
            colaborador_id: None,
            timestamp: shared::util::human_now(),
        }
    }

    pub fn info(acao: AuditAction, entidade: impl Into<String>, detalhes: Value) -> Self {
        Self::new(acao, entidade, Severity::Info, detalhes)
    }

    pub fn warning(acao: AuditAction, entidade: impl Into<String>, detalhes: Value) -> Self {
        Self::new(acao, entidade, Severity::Warning, detalhes)
    }

    pub fn by(mut self, user: impl Into<String>) -> Self {
        self.colaborador_id = Some(user.into());
        self
    }

    pub fn in_department(mut self, department: impl Into<String>) -> Self {
        self.departamento_id = Some(department.into());
        self
    }
}
