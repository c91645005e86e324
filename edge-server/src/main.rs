use anyhow::Context;
use edge_server::{Config, ServerState, init_logger_with_file, print_banner};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1. 设置环境 (dotenv, 日志)
    dotenv::dotenv().ok();
    let config = Config::from_env();
    init_logger_with_file(&config.log_level, config.log_dir.as_deref());

    print_banner();
    tracing::info!(
        environment = %config.environment,
        work_dir = %config.work_dir.display(),
        "Hotel edge server starting..."
    );

    // 2. 初始化状态 (会话文件不可恢复时退出)
    let state = ServerState::initialize(&config).context("failed to initialize server state")?;

    // 3. 后台任务，直到 Ctrl-C
    let tasks = state.start_background_tasks();
    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for shutdown signal")?;

    tracing::info!("Shutdown signal received");
    if tasks.check_health() > 0 {
        tracing::warn!("Some background tasks had stopped before shutdown");
    }
    tasks.shutdown().await;

    if let Err(e) = state.cashier.backup_now() {
        tracing::warn!(error = %e, "Final cashier backup failed");
    }
    Ok(())
}
