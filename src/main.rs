use chrono::Utc;
use clap::Parser;
use std::process::ExitCode;
use tracing::{error, info};

use status_notifier::config::{AppConfig, Cli};
use status_notifier::utils::init_logging;

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    // 1. Load environment
    dotenvy::dotenv().ok();

    // 2. Logging (guard must outlive the run)
    let _guard = init_logging();

    // 3. CLI + configuration
    let cli = Cli::parse();
    let config = match AppConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!(error = %e, "Invalid configuration");
            return ExitCode::from(2);
        }
    };

    let mode = cli.resolve_mode(config.auto_mode);
    info!(mode = ?mode, history = %config.history_file.display(), "status-notifier starting");

    // 4. Run
    match status_notifier::run(&config, mode, Utc::now()).await {
        Ok(report) if report.is_success() => ExitCode::SUCCESS,
        Ok(report) => {
            error!(failed = report.failed, "Some notifications were not delivered");
            ExitCode::FAILURE
        }
        Err(e) => {
            error!(error = %e, "Run failed");
            ExitCode::from(e.exit_code() as u8)
        }
    }
}
