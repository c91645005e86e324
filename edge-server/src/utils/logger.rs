//! Logging Infrastructure
//!
//! Terminal output, or a daily rolling file when a log directory is set.

use std::path::Path;
use tracing_subscriber::EnvFilter;

/// Initialize the logger with terminal output only
pub fn init_logger(log_level: &str) {
    init_logger_with_file(log_level, None);
}

/// Initialize the logger with optional file output
///
/// `RUST_LOG` takes precedence over `log_level` when set.
pub fn init_logger_with_file(log_level: &str, log_dir: Option<&Path>) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(log_level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_file(false)
        .with_line_number(false)
        .with_thread_ids(false)
        .with_target(false);

    if let Some(dir) = log_dir {
        match std::fs::create_dir_all(dir) {
            Ok(()) => {
                let file_appender = tracing_appender::rolling::daily(dir, "edge-server.log");
                let _ = subscriber.with_ansi(false).with_writer(file_appender).try_init();
                return;
            }
            Err(e) => eprintln!("Cannot create log dir {}: {e}", dir.display()),
        }
    }

    let _ = subscriber.try_init();
}
