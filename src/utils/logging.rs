//! Logging initialization
//!
//! Structured JSON logging to stdout and to a daily-rolling file.

use tracing_appender::rolling;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Log file name prefix (`status-notifier.log.YYYY-MM-DD`)
const LOG_FILE_PREFIX: &str = "status-notifier.log";
const DEFAULT_LOG_DIR: &str = "logs";

/// Initialize the tracing subscriber.
///
/// Log level comes from `RUST_LOG` (default `info,status_notifier=debug`).
/// Output goes to stdout and to daily files under `LOG_DIR` (default `logs`).
/// Called before configuration is loaded so config errors are logged too.
///
/// The returned `WorkerGuard` must be held by `main` until exit, otherwise
/// buffered file output is lost.
pub fn init_logging() -> tracing_appender::non_blocking::WorkerGuard {
    let log_dir = std::env::var("LOG_DIR").unwrap_or_else(|_| DEFAULT_LOG_DIR.to_string());

    let file_appender = rolling::daily(&log_dir, LOG_FILE_PREFIX);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let stdout_layer = fmt::layer()
        .json()
        .with_timer(fmt::time::UtcTime::rfc_3339())
        .with_current_span(true)
        .flatten_event(false);

    let file_layer = fmt::layer()
        .json()
        .with_timer(fmt::time::UtcTime::rfc_3339())
        .with_current_span(true)
        .flatten_event(false)
        .with_ansi(false)
        .with_writer(non_blocking);

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,status_notifier=debug"));

    let result = tracing_subscriber::registry()
        .with(filter)
        .with(stdout_layer)
        .with(file_layer)
        .try_init();

    if let Err(err) = result {
        use std::error::Error;
        let already_set = err
            .source()
            .and_then(|s| s.downcast_ref::<tracing::dispatcher::SetGlobalDefaultError>())
            .is_some();
        // Already initialized (tests) is ignored; other failures are reported.
        if !already_set {
            eprintln!("Failed to initialize tracing: {}", err);
        }
    }

    guard
}
