//! Hotel Edge Server - 酒店收银与餐厅结账引擎
//!
//! # 架构概述
//!
//! 所有数据都是工作目录下的 JSON 文件，多进程通过哨兵文件锁协调：
//!
//! - **存储** (`storage`): 文件锁、原子写
//! - **收银** (`cashier`): 会话、交易、收银间转账、冲正、备份
//! - **转账** (`transfer`): 餐桌 ⇄ 客房账单转移、迷你吧
//! - **结账** (`billing`): 餐桌结账、客房结算、重开账单
//! - **账单归档** (`accounts`): 已关闭账单、待开票队列、补录
//!
//! # 模块结构
//!
//! ```text
//! edge-server/src/
//! ├── core/          # 配置、状态、后台任务
//! ├── storage/       # 文件锁 + JSON 文档
//! ├── cashier/       # 收银引擎
//! ├── transfer/      # 转账协调器
//! ├── billing/       # 结账服务
//! ├── accounts/      # 已关闭账单 + 开票队列
//! ├── audit/         # 审计日志
//! ├── stock/         # 库存出库
//! ├── printing/      # 打印
//! └── utils/         # 错误边界、日志
//! ```

pub mod accounts;
pub mod audit;
pub mod billing;
pub mod cashier;
pub mod core;
pub mod money;
pub mod printing;
pub mod stock;
pub mod storage;
pub mod transfer;
pub mod utils;

// Re-export 公共类型
pub use core::{BackgroundTasks, Config, DataPaths, ServerError, ServerState};
pub use utils::{AppError, AppResult};

// Re-export logger functions
pub use utils::logger::{init_logger, init_logger_with_file};

pub fn print_banner() {
    println!(
        r#"
    __  __      __       __
   / / / /___  / /____  / /
  / /_/ / __ \/ __/ _ \/ /
 / __  / /_/ / /_/  __/ /
/_/ /_/\____/\__/\___/_/
    ______    __
   / ____/___/ /___ ____
  / __/ / __  / __ `/ _ \
 / /___/ /_/ / /_/ /  __/
/_____/\__,_/\__, /\___/
            /____/
    "#
    );
}
