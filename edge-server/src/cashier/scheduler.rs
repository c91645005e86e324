//! 收银备份调度器
//!
//! 按固定间隔对会话文件做一次快照备份（内容未变化时跳过），
//! 顺带清理过期的批次去重记录。

use crate::core::ServerState;
use tokio_util::sync::CancellationToken;

/// 定时备份调度器
///
/// 注册为 `TaskKind::Periodic`，在 `start_background_tasks()` 中启动。
pub struct BackupScheduler {
    state: ServerState,
    shutdown: CancellationToken,
}

impl BackupScheduler {
    pub fn new(state: ServerState, shutdown: CancellationToken) -> Self {
        Self { state, shutdown }
    }

    pub async fn run(self) {
        let interval = self.state.config.backup_interval();
        tracing::info!(interval_secs = interval.as_secs(), "Cashier backup scheduler started");

        loop {
            tokio::select! {
                _ = tokio::time::sleep(interval) => {
                    self.tick().await;
                }
                _ = self.shutdown.cancelled() => {
                    tracing::info!("Cashier backup scheduler received shutdown signal");
                    return;
                }
            }
        }
    }

    async fn tick(&self) {
        let cashier = self.state.cashier.clone();
        // 文件锁为阻塞轮询，放到阻塞线程池
        match tokio::task::spawn_blocking(move || cashier.backup_now()).await {
            Ok(Ok(Some(path))) => {
                tracing::debug!(path = %path.display(), "Scheduled cashier backup written");
            }
            Ok(Ok(None)) => {}
            Ok(Err(e)) => tracing::warn!(error = %e, "Scheduled cashier backup failed"),
            Err(e) => tracing::error!(error = ?e, "Backup task panicked"),
        }

        let purged = self.state.billing.purge_expired_batches();
        if purged > 0 {
            tracing::debug!(purged, "Expired item batches purged");
        }
    }
}
