//! Slack alert service
//!
//! Sends notifications to a Slack channel via an incoming webhook.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use std::time::Duration;
use tracing::{debug, error, info, instrument};

use crate::monitoring::notification::{
    monitor_error_message, test_message, Notification, SlackMessage,
};
use crate::monitoring::notifier::Notifier;
use crate::utils::AppError;

/// Slack incoming-webhook client
#[derive(Debug, Clone)]
pub struct SlackAlert {
    webhook_url: String,
    client: Client,
}

impl SlackAlert {
    /// Create a Slack alert service with a request timeout
    pub fn new(webhook_url: impl Into<String>, timeout: Duration) -> Result<Self, AppError> {
        let client = Client::builder().timeout(timeout).build().map_err(|e| {
            error!(error = %e, "Failed to build webhook HTTP client");
            AppError::notify(format!("Failed to build HTTP client: {}", e))
        })?;

        Ok(Self {
            webhook_url: webhook_url.into(),
            client,
        })
    }

    /// Get the webhook URL (for testing)
    pub fn webhook_url(&self) -> &str {
        &self.webhook_url
    }

    /// Send the fixed test message
    pub async fn send_test_message(&self, now: DateTime<Utc>) -> Result<(), AppError> {
        self.send_payload(&test_message(now)).await
    }

    /// Send raw Slack message payload
    async fn send_payload(&self, payload: &SlackMessage) -> Result<(), AppError> {
        let response = self
            .client
            .post(&self.webhook_url)
            .json(payload)
            .send()
            .await
            .map_err(|e| {
                error!(error = %e, "Failed to send Slack webhook");
                AppError::notify(format!("Failed to send Slack webhook: {}", e))
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            error!(status = %status, body = %body, "Slack webhook returned error");
            return Err(AppError::notify(format!(
                "Slack webhook error: {} - {}",
                status, body
            )));
        }

        debug!("Slack webhook accepted payload");
        Ok(())
    }
}

#[async_trait]
impl Notifier for SlackAlert {
    #[instrument(skip_all, fields(service = %notification.service, kind = %notification.kind))]
    async fn send(&self, notification: &Notification, now: DateTime<Utc>) -> Result<(), AppError> {
        let payload = notification.to_slack_message(now);
        self.send_payload(&payload).await?;

        info!(count = notification.count(), "Slack notification sent");
        Ok(())
    }

    async fn send_monitor_error(&self, error: &str, now: DateTime<Utc>) -> Result<(), AppError> {
        self.send_payload(&monitor_error_message(error, now)).await?;

        info!("Monitor error alert sent");
        Ok(())
    }
}
