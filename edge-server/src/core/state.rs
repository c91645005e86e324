use std::fs;
use std::sync::Arc;

use crate::accounts::{ClosedAccountStore, FiscalPool, RestitutionService};
use crate::audit::{AuditSink, JsonlAuditSink};
use crate::billing::BillingService;
use crate::cashier::{BackupScheduler, CashierEngine, SYSTEM_AUTO_USER, SnapshotStore};
use crate::core::config::DataPaths;
use crate::core::tasks::{BackgroundTasks, TaskKind};
use crate::core::{Config, ServerError};
use crate::printing::{LogPrintDispatcher, PrintDispatcher};
use crate::stock::{JsonStockLedger, StockLedger};
use crate::transfer::{HotelStores, TransferCoordinator};

/// 服务器状态 - 持有所有服务的单例引用
///
/// 使用 Arc 实现浅拷贝，后台任务和调用方共享同一组服务。
///
/// # 服务组件
///
/// | 字段 | 类型 | 说明 |
/// |------|------|------|
/// | config | Config | 配置项 (不可变) |
/// | paths | DataPaths | 数据文件路径 |
/// | cashier | Arc<CashierEngine> | 收银会话与交易 |
/// | transfer | Arc<TransferCoordinator> | 餐桌 ⇄ 客房转账 |
/// | billing | Arc<BillingService> | 餐桌结账 / 客房结算 |
/// | accounts | ClosedAccountStore | 已关闭账单 |
/// | fiscal | FiscalPool | 待开票队列 |
/// | restitution | Arc<RestitutionService> | 开票补录 |
/// | audit | Arc<dyn AuditSink> | 审计日志 |
/// | stock | Arc<dyn StockLedger> | 库存出库 |
/// | printer | Arc<dyn PrintDispatcher> | 打印 |
///
/// # 使用示例
///
/// ```ignore
/// let state = ServerState::initialize(&config)?;
/// let session = state.cashier.get_active_session(&CashierType::Restaurant)?;
/// ```
#[derive(Clone)]
pub struct ServerState {
    /// 服务器配置
    pub config: Config,
    pub paths: DataPaths,
    pub cashier: Arc<CashierEngine>,
    pub transfer: Arc<TransferCoordinator>,
    pub billing: Arc<BillingService>,
    pub accounts: ClosedAccountStore,
    pub fiscal: FiscalPool,
    pub restitution: Arc<RestitutionService>,
    pub audit: Arc<dyn AuditSink>,
    pub stock: Arc<dyn StockLedger>,
    pub printer: Arc<dyn PrintDispatcher>,
}

impl ServerState {
    /// 初始化服务器状态
    ///
    /// 按顺序初始化：
    /// 1. 工作目录结构 (数据目录、备份目录、导出目录)
    /// 2. 审计 / 库存 / 打印协作者
    /// 3. 各服务 (Cashier, Transfer, Billing, Restitution)
    /// 4. 会话文件可读性检查 (必要时从备份恢复)
    pub fn initialize(config: &Config) -> Result<Self, ServerError> {
        let paths = config.data_paths();
        for dir in [&config.work_dir, &paths.cashier_backups, &config.audit_export_dir] {
            fs::create_dir_all(dir).map_err(|source| ServerError::WorkDir {
                path: dir.clone(),
                source,
            })?;
        }

        let audit: Arc<dyn AuditSink> = Arc::new(JsonlAuditSink::new(&paths.audit_log));
        let stock: Arc<dyn StockLedger> = Arc::new(JsonStockLedger::new(
            &paths.stock_entries,
            &paths.stock_logs,
            config.lock_timeout(),
        ));
        let printer: Arc<dyn PrintDispatcher> = Arc::new(LogPrintDispatcher);

        let state = Self::with_collaborators(config.clone(), audit, stock, printer);

        // 主文件损坏且没有可用备份时拒绝启动，避免覆盖历史
        let sessions = state.cashier.store().read()?;
        tracing::info!(
            work_dir = %config.work_dir.display(),
            sessions = sessions.len(),
            open = sessions.iter().filter(|s| s.is_open()).count(),
            "Cashier sessions loaded"
        );

        Ok(state)
    }

    /// 使用给定的协作者构造状态 (不触碰文件系统)
    ///
    /// 测试中注入 `MemoryAuditSink` / `MemoryPrintDispatcher`
    pub fn with_collaborators(
        config: Config,
        audit: Arc<dyn AuditSink>,
        stock: Arc<dyn StockLedger>,
        printer: Arc<dyn PrintDispatcher>,
    ) -> Self {
        let paths = config.data_paths();
        let timeout = config.lock_timeout();

        let store = SnapshotStore::new(&paths.cashier_sessions, &paths.cashier_backups, timeout);
        let cashier = Arc::new(
            CashierEngine::new(store, audit.clone(), &config.audit_export_dir)
                .with_printer(printer.clone()),
        );

        let stores = HotelStores::from_paths(&paths, timeout);
        let accounts = ClosedAccountStore::new(&paths.closed_accounts, timeout);
        let fiscal = FiscalPool::new(&paths.fiscal_pool, timeout);

        let transfer = Arc::new(TransferCoordinator::new(
            cashier.clone(),
            stores.clone(),
            stock.clone(),
            audit.clone(),
            printer.clone(),
            &paths.transfer_lock,
            timeout,
        ));
        let billing = Arc::new(BillingService::new(
            cashier.clone(),
            stores,
            accounts.clone(),
            fiscal.clone(),
            audit.clone(),
            printer.clone(),
        ));
        let restitution = Arc::new(RestitutionService::new(
            accounts.clone(),
            fiscal.clone(),
            cashier.clone(),
            audit.clone(),
        ));

        Self {
            config,
            paths,
            cashier,
            transfer,
            billing,
            accounts,
            fiscal,
            restitution,
            audit,
            stock,
            printer,
        }
    }

    /// 启动后台任务
    ///
    /// 启动的任务：
    /// - 开票补录 (Startup，启动时运行一次)
    /// - 收银备份调度器 (Periodic)
    pub fn start_background_tasks(&self) -> BackgroundTasks {
        let mut tasks = BackgroundTasks::new();

        let restitution = self.restitution.clone();
        tasks.spawn("fiscal_restitution", TaskKind::Startup, async move {
            match tokio::task::spawn_blocking(move || restitution.run(SYSTEM_AUTO_USER)).await {
                Ok(Ok(report)) => tracing::info!(
                    backfilled = report.backfilled,
                    orphans = report.orphans_recovered,
                    "Startup fiscal restitution finished"
                ),
                Ok(Err(e)) => tracing::warn!(error = %e, "Startup fiscal restitution failed"),
                Err(e) => tracing::error!(error = ?e, "Fiscal restitution task panicked"),
            }
        });

        let scheduler = BackupScheduler::new(self.clone(), tasks.shutdown_token());
        tasks.spawn("cashier_backup", TaskKind::Periodic, scheduler.run());

        tasks
    }
}
