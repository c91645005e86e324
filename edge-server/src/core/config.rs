use std::path::{Path, PathBuf};
use std::time::Duration;

/// 服务配置
///
/// # 环境变量
///
/// 所有配置项都可以通过环境变量覆盖：
///
/// | 环境变量 | 默认值 | 说明 |
/// |----------|--------|------|
/// | WORK_DIR | ./data | 数据目录，所有 JSON 文件都在这里 |
/// | AUDIT_EXPORT_DIR | {WORK_DIR}/audit | 已关闭班次导出目录 |
/// | BACKUP_INTERVAL_SECS | 300 | 定时备份间隔(秒) |
/// | LOCK_TIMEOUT_MS | 10000 | 文件锁获取超时(毫秒) |
/// | LOG_LEVEL | info | 日志级别 |
/// | LOG_DIR | (未设置) | 滚动日志目录 |
/// | ENVIRONMENT | development | 运行环境 |
///
/// # 示例
///
/// ```ignore
/// WORK_DIR=/srv/hotel/data BACKUP_INTERVAL_SECS=60 cargo run
/// ```
#[derive(Debug, Clone)]
pub struct Config {
    /// 数据目录
    pub work_dir: PathBuf,
    /// `caixas_fechados.json` 导出目录
    pub audit_export_dir: PathBuf,
    pub backup_interval_secs: u64,
    pub lock_timeout_ms: u64,
    pub log_level: String,
    /// 未设置时只输出到终端
    pub log_dir: Option<PathBuf>,
    /// 运行环境: development | staging | production
    pub environment: String,
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

fn env_path(key: &str) -> Option<PathBuf> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
}

impl Config {
    /// 从环境变量加载配置
    ///
    /// 如果环境变量未设置，使用默认值
    pub fn from_env() -> Self {
        let work_dir = env_path("WORK_DIR").unwrap_or_else(|| PathBuf::from("./data"));
        Self {
            audit_export_dir: env_path("AUDIT_EXPORT_DIR").unwrap_or_else(|| work_dir.join("audit")),
            work_dir,
            backup_interval_secs: env_parse("BACKUP_INTERVAL_SECS", 300),
            lock_timeout_ms: env_parse("LOCK_TIMEOUT_MS", 10_000),
            log_level: std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".into()),
            log_dir: env_path("LOG_DIR"),
            environment: std::env::var("ENVIRONMENT").unwrap_or_else(|_| "development".into()),
        }
    }

    /// 使用自定义数据目录覆盖配置
    ///
    /// 常用于测试场景
    pub fn with_overrides(work_dir: impl Into<PathBuf>) -> Self {
        let mut config = Self::from_env();
        config.work_dir = work_dir.into();
        config.audit_export_dir = config.work_dir.join("audit");
        config
    }

    /// 是否生产环境
    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }

    /// 是否开发环境
    pub fn is_development(&self) -> bool {
        self.environment == "development"
    }

    pub fn lock_timeout(&self) -> Duration {
        Duration::from_millis(self.lock_timeout_ms.max(1))
    }

    pub fn backup_interval(&self) -> Duration {
        Duration::from_secs(self.backup_interval_secs.max(1))
    }

    pub fn data_paths(&self) -> DataPaths {
        DataPaths::new(&self.work_dir)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::from_env()
    }
}

/// Every data file under the work directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataPaths {
    pub cashier_sessions: PathBuf,
    pub cashier_backups: PathBuf,
    pub room_charges: PathBuf,
    pub room_occupancy: PathBuf,
    pub table_orders: PathBuf,
    pub sales_history: PathBuf,
    pub closed_accounts: PathBuf,
    pub fiscal_pool: PathBuf,
    pub stock_entries: PathBuf,
    pub stock_logs: PathBuf,
    pub audit_log: PathBuf,
    /// Sentinel serializing table ⇄ room transfers
    pub transfer_lock: PathBuf,
}

impl DataPaths {
    pub fn new(work_dir: &Path) -> Self {
        Self {
            cashier_sessions: work_dir.join("cashier_sessions.json"),
            cashier_backups: work_dir.join("backups").join("cashier"),
            room_charges: work_dir.join("room_charges.json"),
            room_occupancy: work_dir.join("room_occupancy.json"),
            table_orders: work_dir.join("table_orders.json"),
            sales_history: work_dir.join("sales_history.json"),
            closed_accounts: work_dir.join("closed_accounts.json"),
            fiscal_pool: work_dir.join("fiscal_pool.json"),
            stock_entries: work_dir.join("stock_entries.json"),
            stock_logs: work_dir.join("stock_logs.json"),
            audit_log: work_dir.join("audit_log.jsonl"),
            transfer_lock: work_dir.join("transfer.lock"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_data_paths_live_under_work_dir() {
        let paths = DataPaths::new(Path::new("/srv/data"));
        assert_eq!(paths.cashier_sessions, Path::new("/srv/data/cashier_sessions.json"));
        assert_eq!(paths.cashier_backups, Path::new("/srv/data/backups/cashier"));
        assert_eq!(paths.audit_log, Path::new("/srv/data/audit_log.jsonl"));
    }

    #[test]
    fn test_overrides_move_export_dir() {
        let config = Config::with_overrides("/tmp/hotel");
        assert_eq!(config.work_dir, Path::new("/tmp/hotel"));
        assert_eq!(config.audit_export_dir, Path::new("/tmp/hotel/audit"));
        assert!(config.lock_timeout() > Duration::ZERO);
    }
}
