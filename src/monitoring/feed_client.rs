//! Status feed client
//!
//! One query per (service, kind). The feed answers with either a bare JSON
//! array of records or a paginated object carrying a `results` array.

use async_trait::async_trait;
use reqwest::{Client, Url};
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, error, instrument};

use crate::event::EventKind;
use crate::utils::AppError;

/// Parameters of a single feed request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedQuery {
    pub service: String,
    pub kind: EventKind,
    pub ordering: String,
    pub limit: u32,
}

impl FeedQuery {
    pub fn new(service: impl Into<String>, kind: EventKind, ordering: impl Into<String>, limit: u32) -> Self {
        Self {
            service: service.into(),
            kind,
            ordering: ordering.into(),
            limit,
        }
    }
}

/// Source of raw feed records
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait FeedSource: Send + Sync {
    /// Fetch the raw records answering `query`
    async fn fetch(&self, query: &FeedQuery) -> Result<Vec<Value>, AppError>;
}

/// HTTP client for the maintenance/incident feed
#[derive(Debug, Clone)]
pub struct FeedClient {
    base_url: String,
    client: Client,
}

impl FeedClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, AppError> {
        let client = Client::builder().timeout(timeout).build().map_err(|e| {
            error!(error = %e, "Failed to build feed HTTP client");
            AppError::feed(format!("Failed to build HTTP client: {}", e))
        })?;

        Ok(Self {
            base_url: base_url.into(),
            client,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Full request URL for `query`
    pub fn query_url(&self, query: &FeedQuery) -> Result<Url, AppError> {
        let limit = query.limit.to_string();
        Url::parse_with_params(
            &self.base_url,
            &[
                ("service", query.service.as_str()),
                ("type", query.kind.feed_type()),
                ("ordering", query.ordering.as_str()),
                ("limit", limit.as_str()),
            ],
        )
        .map_err(|e| AppError::feed(format!("Invalid feed URL '{}': {}", self.base_url, e)))
    }
}

#[async_trait]
impl FeedSource for FeedClient {
    #[instrument(skip_all, fields(service = %query.service, kind = %query.kind))]
    async fn fetch(&self, query: &FeedQuery) -> Result<Vec<Value>, AppError> {
        let url = self.query_url(query)?;

        let response = self.client.get(url).send().await.map_err(|e| {
            error!(error = %e, "Feed request failed");
            AppError::feed(format!("Feed request failed: {}", e))
        })?;

        let status = response.status();
        if !status.is_success() {
            error!(status = %status, "Feed returned error status");
            return Err(AppError::feed(format!("Feed returned HTTP {}", status)));
        }

        let body: Value = response.json().await.map_err(|e| {
            error!(error = %e, "Feed body is not valid JSON");
            AppError::feed(format!("Feed body is not valid JSON: {}", e))
        })?;

        let records = extract_records(body)?;
        debug!(count = records.len(), "Fetched feed records");
        Ok(records)
    }
}

/// Accept `[...]` or `{"results": [...]}`
pub fn extract_records(body: Value) -> Result<Vec<Value>, AppError> {
    match body {
        Value::Array(items) => Ok(items),
        Value::Object(mut map) => match map.remove("results") {
            Some(Value::Array(items)) => Ok(items),
            _ => Err(AppError::feed("Feed object has no 'results' array")),
        },
        other => Err(AppError::feed(format!(
            "Feed body is not a collection: {}",
            other
        ))),
    }
}
