//! Feed event model
//!
//! Raw feed records are normalized into `Event` values. A record missing a
//! required field, or carrying a timestamp that is not a numeric UNIX instant,
//! fails with `EventParseError` and is skipped by the caller.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Status page shown when a record has no detail URL
pub const STATUS_PAGE_URL: &str = "https://help.sakura.ad.jp/status/";

/// Event kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventKind {
    /// Scheduled maintenance
    Maintenance,
    /// Incident / outage
    Trouble,
}

impl EventKind {
    /// Value of the feed's `type` query parameter
    pub fn feed_type(&self) -> &'static str {
        match self {
            EventKind::Maintenance => "maint",
            EventKind::Trouble => "trouble",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::Maintenance => "maintenance",
            EventKind::Trouble => "trouble",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventKind {
    type Err = EventParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "maint" | "maintenance" => Ok(EventKind::Maintenance),
            "trouble" => Ok(EventKind::Trouble),
            other => Err(EventParseError::UnknownKind(other.to_string())),
        }
    }
}

/// Why a feed record could not be turned into an `Event`
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EventParseError {
    #[error("record is not a JSON object: {0}")]
    NotAnObject(String),
    #[error("missing required field '{0}'")]
    MissingField(&'static str),
    #[error("unknown event kind '{0}'")]
    UnknownKind(String),
    #[error("field '{field}' is not a valid UNIX timestamp: {value}")]
    InvalidTimestamp { field: &'static str, value: String },
    #[error("end time precedes start time")]
    EndBeforeStart,
}

/// Feed record as delivered on the wire
///
/// Every field is optional here; `Event::try_from` decides what is required.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawFeedRecord {
    #[serde(default)]
    pub service: Option<String>,
    #[serde(default, rename = "type", alias = "kind")]
    pub kind: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default, alias = "start_time")]
    pub event_start: Option<serde_json::Value>,
    #[serde(default, alias = "end_time")]
    pub event_end: Option<serde_json::Value>,
    #[serde(default, alias = "detail_url")]
    pub url: Option<String>,
}

impl RawFeedRecord {
    /// Decode one element of the feed collection
    pub fn from_value(value: serde_json::Value) -> Result<Self, EventParseError> {
        if !value.is_object() {
            return Err(EventParseError::NotAnObject(value.to_string()));
        }
        serde_json::from_value(value).map_err(|e| EventParseError::NotAnObject(e.to_string()))
    }

    /// Fill `service`/`type` from the query that fetched this record
    pub fn with_query_defaults(mut self, service: &str, kind: EventKind) -> Self {
        if is_blank(&self.service) {
            self.service = Some(service.to_string());
        }
        if is_blank(&self.kind) {
            self.kind = Some(kind.feed_type().to_string());
        }
        self
    }
}

fn is_blank(value: &Option<String>) -> bool {
    value.as_deref().map(str::trim).unwrap_or("").is_empty()
}

/// Canonical feed event
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Event {
    pub service: String,
    pub kind: EventKind,
    pub title: String,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    pub detail_url: Option<String>,
}

impl Event {
    /// Whether the event has no end time (ongoing or unspecified)
    pub fn is_open_ended(&self) -> bool {
        self.end_time.is_none()
    }

    /// Detail link, falling back to the status page
    pub fn link(&self) -> &str {
        self.detail_url.as_deref().unwrap_or(STATUS_PAGE_URL)
    }
}

impl TryFrom<RawFeedRecord> for Event {
    type Error = EventParseError;

    fn try_from(raw: RawFeedRecord) -> Result<Self, Self::Error> {
        let service = required_text(raw.service, "service")?;
        let kind: EventKind = required_text(raw.kind, "type")?.parse()?;
        let title = required_text(raw.title, "title")?;

        let start_time = match raw.event_start {
            None | Some(serde_json::Value::Null) => {
                return Err(EventParseError::MissingField("event_start"))
            }
            Some(value) => parse_unix_timestamp(&value, "event_start")?,
        };

        let end_time = match raw.event_end {
            None | Some(serde_json::Value::Null) => None,
            Some(value) => Some(parse_unix_timestamp(&value, "event_end")?),
        };

        if let Some(end) = end_time {
            if end < start_time {
                return Err(EventParseError::EndBeforeStart);
            }
        }

        let detail_url = raw
            .url
            .map(|u| u.trim().to_string())
            .filter(|u| !u.is_empty());

        Ok(Event {
            service,
            kind,
            title,
            start_time,
            end_time,
            detail_url,
        })
    }
}

fn required_text(value: Option<String>, field: &'static str) -> Result<String, EventParseError> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .ok_or(EventParseError::MissingField(field))
}

/// Parse a UNIX-seconds timestamp given as integer, float or numeric string
pub fn parse_unix_timestamp(
    value: &serde_json::Value,
    field: &'static str,
) -> Result<DateTime<Utc>, EventParseError> {
    let invalid = || EventParseError::InvalidTimestamp {
        field,
        value: value.to_string(),
    };

    let secs = match value {
        serde_json::Value::Number(n) => match n.as_i64() {
            Some(i) => i,
            None => n
                .as_f64()
                .filter(|f| f.is_finite())
                .map(|f| f.trunc() as i64)
                .ok_or_else(invalid)?,
        },
        serde_json::Value::String(s) => {
            let s = s.trim();
            match s.parse::<i64>() {
                Ok(i) => i,
                Err(_) => s
                    .parse::<f64>()
                    .ok()
                    .filter(|f| f.is_finite())
                    .map(|f| f.trunc() as i64)
                    .ok_or_else(invalid)?,
            }
        }
        _ => return Err(invalid()),
    };

    DateTime::from_timestamp(secs, 0).ok_or_else(invalid)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn raw(value: serde_json::Value) -> RawFeedRecord {
        RawFeedRecord::from_value(value).expect("record should decode")
    }

    #[test]
    fn should_parse_complete_record() {
        // Arrange
        let record = raw(json!({
            "service": "cloud",
            "type": "maint",
            "title": "Network maintenance",
            "event_start": 1_760_662_800,
            "event_end": 1_760_670_000,
            "url": "https://help.sakura.ad.jp/maint/123/"
        }));

        // Act
        let event = Event::try_from(record).expect("record should parse");

        // Assert
        assert_eq!(event.service, "cloud");
        assert_eq!(event.kind, EventKind::Maintenance);
        assert_eq!(event.title, "Network maintenance");
        assert_eq!(event.start_time.timestamp(), 1_760_662_800);
        assert_eq!(event.end_time.map(|t| t.timestamp()), Some(1_760_670_000));
        assert_eq!(event.link(), "https://help.sakura.ad.jp/maint/123/");
    }

    #[test]
    fn should_accept_numeric_string_and_float_timestamps() {
        // Arrange
        let record = raw(json!({
            "service": "iot",
            "type": "trouble",
            "title": "Delay",
            "event_start": "1760662800",
            "event_end": 1760670000.9
        }));

        // Act
        let event = Event::try_from(record).expect("record should parse");

        // Assert
        assert_eq!(event.start_time.timestamp(), 1_760_662_800);
        assert_eq!(event.end_time.map(|t| t.timestamp()), Some(1_760_670_000));
    }

    #[test]
    fn should_treat_null_end_as_open_ended() {
        // Arrange
        let record = raw(json!({
            "service": "cloud",
            "type": "trouble",
            "title": "Packet loss",
            "event_start": 1_760_662_800,
            "event_end": null
        }));

        // Act
        let event = Event::try_from(record).expect("record should parse");

        // Assert
        assert!(event.is_open_ended());
        assert_eq!(event.link(), STATUS_PAGE_URL);
    }

    #[test]
    fn should_fail_when_required_fields_missing() {
        // Arrange
        let cases = [
            (json!({"type": "maint", "title": "t", "event_start": 1}), "service"),
            (json!({"service": "cloud", "title": "t", "event_start": 1}), "type"),
            (json!({"service": "cloud", "type": "maint", "title": "  ", "event_start": 1}), "title"),
            (json!({"service": "cloud", "type": "maint", "title": "t"}), "event_start"),
        ];

        for (value, field) in cases {
            // Act
            let result = Event::try_from(raw(value));

            // Assert
            assert_eq!(result, Err(EventParseError::MissingField(field)));
        }
    }

    #[test]
    fn should_fail_on_non_numeric_timestamp() {
        // Arrange
        let record = raw(json!({
            "service": "cloud",
            "type": "maint",
            "title": "t",
            "event_start": "tomorrow"
        }));

        // Act
        let result = Event::try_from(record);

        // Assert
        assert!(matches!(
            result,
            Err(EventParseError::InvalidTimestamp { field: "event_start", .. })
        ));
    }

    #[test]
    fn should_fail_when_end_precedes_start() {
        // Arrange
        let record = raw(json!({
            "service": "cloud",
            "type": "maint",
            "title": "t",
            "event_start": 2000,
            "event_end": 1000
        }));

        // Act
        let result = Event::try_from(record);

        // Assert
        assert_eq!(result, Err(EventParseError::EndBeforeStart));
    }

    #[test]
    fn should_fail_on_unknown_kind() {
        // Arrange
        let record = raw(json!({
            "service": "cloud",
            "type": "notice",
            "title": "t",
            "event_start": 1
        }));

        // Act
        let result = Event::try_from(record);

        // Assert
        assert_eq!(result, Err(EventParseError::UnknownKind("notice".to_string())));
    }

    #[test]
    fn should_reject_non_object_records() {
        // Arrange & Act
        let result = RawFeedRecord::from_value(json!("just a string"));

        // Assert
        assert!(matches!(result, Err(EventParseError::NotAnObject(_))));
    }

    #[test]
    fn should_fill_missing_service_and_kind_from_query() {
        // Arrange
        let record = raw(json!({"title": "t", "event_start": 1}));

        // Act
        let event = Event::try_from(record.with_query_defaults("domain-ssl", EventKind::Trouble))
            .expect("record should parse");

        // Assert
        assert_eq!(event.service, "domain-ssl");
        assert_eq!(event.kind, EventKind::Trouble);
    }

    #[test]
    fn should_keep_record_service_over_query_default() {
        // Arrange
        let record = raw(json!({"service": "cloud", "type": "maint", "title": "t", "event_start": 1}));

        // Act
        let event = Event::try_from(record.with_query_defaults("iot", EventKind::Trouble))
            .expect("record should parse");

        // Assert
        assert_eq!(event.service, "cloud");
        assert_eq!(event.kind, EventKind::Maintenance);
    }

    #[test]
    fn should_map_kind_to_feed_type() {
        // Arrange & Act & Assert
        assert_eq!(EventKind::Maintenance.feed_type(), "maint");
        assert_eq!(EventKind::Trouble.feed_type(), "trouble");
        assert_eq!("MAINTENANCE".parse::<EventKind>(), Ok(EventKind::Maintenance));
    }
}
