//! 后台任务
//!
//! 启动补录跑一次就结束；备份调度器一直运行到取消令牌触发。
//! 两者都包一层 panic 捕获，异常只记日志，不拖垮进程。

use futures::FutureExt;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskKind {
    /// Runs once at startup; finishing is normal
    Startup,
    /// Runs until shutdown; finishing early is a fault
    Periodic,
}

struct Task {
    name: &'static str,
    kind: TaskKind,
    handle: JoinHandle<()>,
}

/// Spawned background tasks sharing one shutdown token
#[derive(Default)]
pub struct BackgroundTasks {
    tasks: Vec<Task>,
    shutdown: CancellationToken,
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> &str {
    payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("unknown panic")
}

impl BackgroundTasks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    pub fn spawn<F>(&mut self, name: &'static str, kind: TaskKind, future: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let handle = tokio::spawn(async move {
            match AssertUnwindSafe(future).catch_unwind().await {
                Ok(()) if kind == TaskKind::Periodic => {
                    tracing::warn!(task = name, "Periodic task returned before shutdown");
                }
                Ok(()) => {}
                Err(payload) => {
                    tracing::error!(task = name, panic = panic_message(payload.as_ref()), "Background task panicked");
                }
            }
        });
        tracing::info!(task = name, ?kind, "Background task started");
        self.tasks.push(Task { name, kind, handle });
    }

    /// Periodic tasks that are no longer running
    pub fn check_health(&self) -> usize {
        self.tasks
            .iter()
            .filter(|t| t.kind == TaskKind::Periodic && t.handle.is_finished())
            .inspect(|t| tracing::error!(task = t.name, "Periodic task is no longer running"))
            .count()
    }

    /// Cancel every task and wait for it
    pub async fn shutdown(self) {
        self.shutdown.cancel();
        for task in self.tasks {
            if let Err(e) = task.handle.await {
                tracing::error!(task = task.name, error = ?e, "Background task failed during shutdown");
            }
        }
        tracing::info!("Background tasks stopped");
    }
}
