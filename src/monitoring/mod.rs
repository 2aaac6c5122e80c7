//! Status monitoring
//!
//! - Feed client (HTTP)
//! - Notification payload and Slack webhook delivery
//! - Send gates per run mode
//! - Run orchestration

pub mod feed_client;
pub mod gate;
pub mod notification;
pub mod notifier;
pub mod processor;
pub mod slack_alert;

pub use feed_client::{FeedClient, FeedQuery, FeedSource};
pub use gate::{gate_for, AutoGate, DryRunGate, GateDecision, PromptGate, SendGate};
pub use notification::{Notification, SlackMessage};
pub use notifier::Notifier;
pub use processor::{NotificationSettings, RunReport, StatusMonitor};
pub use slack_alert::SlackAlert;
