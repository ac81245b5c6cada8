use std::path::Path;

use tracing::level_filters::LevelFilter;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{
    fmt::time::ChronoLocal, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer,
};

use crate::errors::AppResult;

pub const LOG_FILE_NAME: &str = "autosound.log";

/// Logs to stderr and a daily-rolling file in `log_dir`.
///
/// `RUST_LOG` wins over `level` when set. Keep the guard alive until exit or the file loses the tail.
pub fn initialize_logging(log_dir: &Path, level: LevelFilter) -> AppResult<WorkerGuard> {
    fs_err::create_dir_all(log_dir)?;
    let file_appender = tracing_appender::rolling::daily(log_dir, LOG_FILE_NAME);
    let (file_writer, guard) = tracing_appender::non_blocking(file_appender);

    let env_filter = || {
        EnvFilter::builder()
            .with_default_directive(level.into())
            .from_env_lossy()
    };

    let file_layer = tracing_subscriber::fmt::layer()
        .with_writer(file_writer)
        .with_ansi(false)
        .with_timer(ChronoLocal::rfc_3339())
        .with_thread_names(true)
        .with_filter(env_filter());

    let stderr_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_timer(ChronoLocal::rfc_3339())
        .with_target(false)
        .with_filter(env_filter());

    // Only fails if something already set a global subscriber, which would be a bug worth seeing
    if let Err(e) = tracing_subscriber::registry()
        .with(file_layer)
        .with(stderr_layer)
        .try_init()
    {
        eprintln!("Failed to initialize logging: {e}");
    }

    Ok(guard)
}
