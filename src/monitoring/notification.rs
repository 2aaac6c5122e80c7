//! Notification payload
//!
//! One notification covers all relevant events of a (service, kind) pair.
//! It renders to a Slack incoming-webhook message with an itemized list.

use chrono::{DateTime, FixedOffset, Utc};
use serde::Serialize;

use crate::event::{Event, EventKind, STATUS_PAGE_URL};

/// Footer shown under every attachment
pub const FOOTER: &str = "status-notifier";

/// Slack attachment colors
pub mod colors {
    /// Incident - red
    pub const DANGER: &str = "danger";
    /// Maintenance - yellow
    pub const WARNING: &str = "warning";
    /// Test / informational - green
    pub const GOOD: &str = "good";
}

/// Slack incoming-webhook payload
#[derive(Debug, Clone, Serialize)]
pub struct SlackMessage {
    /// Top-level text (also used for push notifications)
    pub text: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub attachments: Vec<SlackAttachment>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SlackAttachment {
    pub color: String,
    pub fields: Vec<SlackField>,
    pub footer: String,
    /// UNIX seconds
    pub ts: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct SlackField {
    pub title: String,
    pub value: String,
    /// Render side by side with other short fields
    pub short: bool,
}

impl SlackField {
    fn new(title: &str, value: impl Into<String>, short: bool) -> Self {
        Self {
            title: title.to_string(),
            value: value.into(),
            short,
        }
    }
}

/// Notification for one (service, kind) group
#[derive(Debug, Clone, PartialEq)]
pub struct Notification {
    pub service: String,
    pub kind: EventKind,
    /// Itemized events, ordered by start time
    pub events: Vec<Event>,
    /// Offset used to render times
    pub offset: FixedOffset,
}

impl Notification {
    pub fn new(service: impl Into<String>, kind: EventKind, events: Vec<Event>, offset: FixedOffset) -> Self {
        Self {
            service: service.into(),
            kind,
            events,
            offset,
        }
    }

    pub fn count(&self) -> usize {
        self.events.len()
    }

    /// Incidents carry an `@here` attention marker
    pub fn needs_attention(&self) -> bool {
        self.kind == EventKind::Trouble
    }

    /// One-line summary
    pub fn headline(&self) -> String {
        match self.kind {
            EventKind::Trouble => format!(
                ":red_circle: <!here> Incident reported for {} ({} item{})",
                self.service,
                self.count(),
                plural(self.count())
            ),
            EventKind::Maintenance => format!(
                ":large_blue_circle: Maintenance scheduled today for {} ({} item{})",
                self.service,
                self.count(),
                plural(self.count())
            ),
        }
    }

    /// Itemized event list: title, time range and link per event
    pub fn itemized(&self) -> String {
        self.events
            .iter()
            .map(|e| format!("• {}\n    {}\n    {}", e.title, self.time_range(e), e.link()))
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn time_range(&self, event: &Event) -> String {
        let start = self.format_time(event.start_time);
        match (event.end_time, event.kind) {
            (Some(end), _) => format!("{} - {}", start, self.format_time(end)),
            (None, EventKind::Trouble) => format!("{} - (ongoing)", start),
            (None, EventKind::Maintenance) => format!("{} - (end not announced)", start),
        }
    }

    fn format_time(&self, instant: DateTime<Utc>) -> String {
        instant
            .with_timezone(&self.offset)
            .format("%Y-%m-%d %H:%M (UTC%:z)")
            .to_string()
    }

    /// Render the Slack payload
    pub fn to_slack_message(&self, now: DateTime<Utc>) -> SlackMessage {
        let color = match self.kind {
            EventKind::Trouble => colors::DANGER,
            EventKind::Maintenance => colors::WARNING,
        };

        SlackMessage {
            text: self.headline(),
            attachments: vec![SlackAttachment {
                color: color.to_string(),
                fields: vec![
                    SlackField::new("Service", self.service.clone(), true),
                    SlackField::new("Kind", self.kind.as_str(), true),
                    SlackField::new("Count", self.count().to_string(), true),
                    SlackField::new("Events", self.itemized(), false),
                ],
                footer: FOOTER.to_string(),
                ts: now.timestamp(),
            }],
        }
    }
}

/// Message used by `test-notify` to verify the webhook wiring
pub fn test_message(now: DateTime<Utc>) -> SlackMessage {
    SlackMessage {
        text: ":white_check_mark: status-notifier test message".to_string(),
        attachments: vec![SlackAttachment {
            color: colors::GOOD.to_string(),
            fields: vec![SlackField::new(
                "Message",
                "Webhook is reachable. No action required.",
                false,
            )],
            footer: FOOTER.to_string(),
            ts: now.timestamp(),
        }],
    }
}

/// Alert sent when the monitor itself could not check the feed
pub fn monitor_error_message(error: &str, now: DateTime<Utc>) -> SlackMessage {
    SlackMessage {
        text: ":warning: <!here> Status monitoring failed, events may be missed".to_string(),
        attachments: vec![SlackAttachment {
            color: colors::DANGER.to_string(),
            fields: vec![
                SlackField::new("Service", "status-notifier", true),
                SlackField::new("Status", "error", true),
                SlackField::new("Message", error, false),
                SlackField::new("Details", STATUS_PAGE_URL, false),
            ],
            footer: FOOTER.to_string(),
            ts: now.timestamp(),
        }],
    }
}

fn plural(count: usize) -> &'static str {
    if count == 1 {
        ""
    } else {
        "s"
    }
}
