use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

/// Default feed endpoint
pub const DEFAULT_FEED_BASE_URL: &str = "https://help.sakura.ad.jp/maint/api/v1/feeds/";
/// Services polled when `FEED_SERVICES` is unset
pub const DEFAULT_SERVICES: [&str; 4] = ["rental-server", "cloud", "iot", "domain-ssl"];
/// Upper bound accepted by the feed for `limit`
pub const MAX_FEED_LIMIT: u32 = 100;
/// Dedup history file (relative to the working directory)
pub const DEFAULT_HISTORY_FILE: &str = "maintenance_sent.json";
/// Dedup retention window in days
pub const DEFAULT_RETENTION_DAYS: i64 = 7;
/// Longest accepted retention window (about ten years)
pub const MAX_RETENTION_DAYS: i64 = 3650;

const DEFAULT_TIMEOUT_SECS: u64 = 20;
const MAX_TIMEOUT_SECS: u64 = 120;

/// How dedup keys are derived
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DedupPolicy {
    /// At most one notification per (local date, service, kind)
    #[default]
    DayBucket,
    /// Never repeat the exact same event (hash of its content)
    ContentHash,
}

impl FromStr for DedupPolicy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "day-bucket" | "day_bucket" | "day" => Ok(DedupPolicy::DayBucket),
            "content-hash" | "content_hash" | "hash" => Ok(DedupPolicy::ContentHash),
            other => Err(ConfigError::InvalidDedupPolicy(other.to_string())),
        }
    }
}

/// Whether trouble (incident) notifications consult the dedup store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TroublePolicy {
    /// Every relevant incident is reported on every run
    #[default]
    Always,
    /// Incidents are deduplicated like maintenance
    Dedup,
}

impl FromStr for TroublePolicy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "always" | "all" => Ok(TroublePolicy::Always),
            "dedup" | "deduplicate" => Ok(TroublePolicy::Dedup),
            other => Err(ConfigError::InvalidTroublePolicy(other.to_string())),
        }
    }
}

/// Application configuration
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub webhook_url: String,
    pub feed_base_url: String,
    pub services: Vec<String>,
    pub feed_ordering: String,
    pub feed_limit: u32,
    pub http_timeout: Duration,
    pub history_file: PathBuf,
    pub retention_days: i64,
    pub dedup_policy: DedupPolicy,
    pub trouble_policy: TroublePolicy,
    /// `AUTO_MODE=1` was set
    pub auto_mode: bool,
}

impl AppConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration through an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let webhook_url = get("SLACK_WEBHOOK_URL").ok_or(ConfigError::MissingWebhookUrl)?;

        let feed_base_url =
            get("FEED_BASE_URL").unwrap_or_else(|| DEFAULT_FEED_BASE_URL.to_string());

        let services: Vec<String> = match get("FEED_SERVICES") {
            Some(list) => list
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect(),
            None => DEFAULT_SERVICES.iter().map(|s| s.to_string()).collect(),
        };
        if services.is_empty() {
            return Err(ConfigError::NoServices);
        }

        let feed_ordering = get("FEED_ORDERING").unwrap_or_else(|| "-event_start".to_string());

        let feed_limit = parse_or("FEED_LIMIT", get("FEED_LIMIT"), MAX_FEED_LIMIT)?;
        if feed_limit == 0 || feed_limit > MAX_FEED_LIMIT {
            return Err(ConfigError::InvalidFeedLimit(feed_limit));
        }

        let timeout_secs = parse_or(
            "HTTP_TIMEOUT_SECS",
            get("HTTP_TIMEOUT_SECS"),
            DEFAULT_TIMEOUT_SECS,
        )?;
        if timeout_secs == 0 || timeout_secs > MAX_TIMEOUT_SECS {
            return Err(ConfigError::InvalidTimeout(timeout_secs));
        }

        let history_file = PathBuf::from(
            get("HISTORY_FILE").unwrap_or_else(|| DEFAULT_HISTORY_FILE.to_string()),
        );

        let retention_days = parse_or(
            "HISTORY_RETENTION_DAYS",
            get("HISTORY_RETENTION_DAYS"),
            DEFAULT_RETENTION_DAYS,
        )?;
        if !(1..=MAX_RETENTION_DAYS).contains(&retention_days) {
            return Err(ConfigError::InvalidNumber {
                key: "HISTORY_RETENTION_DAYS".to_string(),
                value: retention_days.to_string(),
            });
        }

        let dedup_policy = match get("DEDUP_POLICY") {
            Some(v) => v.parse()?,
            None => DedupPolicy::default(),
        };

        let trouble_policy = match get("TROUBLE_POLICY") {
            Some(v) => v.parse()?,
            None => TroublePolicy::default(),
        };

        let auto_mode = matches!(
            get("AUTO_MODE").map(|v| v.to_lowercase()).as_deref(),
            Some("1") | Some("true") | Some("yes")
        );

        Ok(Self {
            webhook_url,
            feed_base_url,
            services,
            feed_ordering,
            feed_limit,
            http_timeout: Duration::from_secs(timeout_secs),
            history_file,
            retention_days,
            dedup_policy,
            trouble_policy,
            auto_mode,
        })
    }

    /// Retention window as a chrono duration
    pub fn retention(&self) -> chrono::Duration {
        chrono::Duration::days(self.retention_days)
    }
}

fn parse_or<T: FromStr>(key: &str, value: Option<String>, default: T) -> Result<T, ConfigError> {
    match value {
        Some(v) => v.parse().map_err(|_| ConfigError::InvalidNumber {
            key: key.to_string(),
            value: v,
        }),
        None => Ok(default),
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("SLACK_WEBHOOK_URL environment variable is required")]
    MissingWebhookUrl,
    #[error("FEED_SERVICES must name at least one service")]
    NoServices,
    #[error("{key} must be a number, got '{value}'")]
    InvalidNumber { key: String, value: String },
    #[error("FEED_LIMIT must be between 1 and 100, got {0}")]
    InvalidFeedLimit(u32),
    #[error("HTTP_TIMEOUT_SECS must be between 1 and 120, got {0}")]
    InvalidTimeout(u64),
    #[error("unknown DEDUP_POLICY '{0}' (expected 'day-bucket' or 'content-hash')")]
    InvalidDedupPolicy(String),
    #[error("unknown TROUBLE_POLICY '{0}' (expected 'always' or 'dedup')")]
    InvalidTroublePolicy(String),
}
