pub mod config;
pub mod dedup;
pub mod event;
pub mod monitoring;
pub mod utils;

use chrono::{DateTime, Utc};
use tracing::{error, info};

use config::{AppConfig, RunMode};
use dedup::DedupStore;
use monitoring::{gate_for, FeedClient, NotificationSettings, RunReport, SendGate, SlackAlert, StatusMonitor};
use utils::AppError;

/// Execute one invocation in `mode`
pub async fn run(config: &AppConfig, mode: RunMode, now: DateTime<Utc>) -> Result<RunReport, AppError> {
    if mode == RunMode::TestNotify {
        return send_test_notification(config, now).await;
    }

    let mut gate = gate_for(mode);
    run_with_gate(config, gate.as_mut(), now).await
}

/// Execute one monitoring run through an explicit send gate
///
/// History is loaded from and saved to `config.history_file`, unless the gate
/// forbids persisting or the feed could not be read. A feed failure is
/// reported to the channel, except in dry runs.
pub async fn run_with_gate(
    config: &AppConfig,
    gate: &mut dyn SendGate,
    now: DateTime<Utc>,
) -> Result<RunReport, AppError> {
    let feed = FeedClient::new(&config.feed_base_url, config.http_timeout)?;
    let notifier = SlackAlert::new(&config.webhook_url, config.http_timeout)?;
    let monitor = StatusMonitor::new(feed, notifier, NotificationSettings::from_config(config));

    let mut store = DedupStore::load(&config.history_file);
    let outcome = monitor.run_once(&mut store, gate, now).await;

    if let Err(failure @ AppError::Feed(_)) = &outcome {
        if gate.persists() {
            monitor.report_failure(failure, now).await;
        }
        return outcome;
    }

    if gate.persists() {
        store.save()?;
    } else {
        info!("Dry run, history not saved");
    }

    outcome
}

async fn send_test_notification(config: &AppConfig, now: DateTime<Utc>) -> Result<RunReport, AppError> {
    let notifier = SlackAlert::new(&config.webhook_url, config.http_timeout)?;

    match notifier.send_test_message(now).await {
        Ok(()) => {
            info!("Test notification sent");
            Ok(RunReport {
                sent: 1,
                ..RunReport::default()
            })
        }
        Err(e) => {
            error!(error = %e, "Test notification failed");
            Err(e)
        }
    }
}
