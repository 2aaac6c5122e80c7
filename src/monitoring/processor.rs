//! Status monitor
//!
//! One run of the notification pipeline:
//! fetch -> parse -> prune -> filter -> group -> dedup -> gate -> send -> record
//!
//! History only changes when a notification was accepted by the notifier.

use chrono::{DateTime, Duration, Utc};
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

use crate::config::{AppConfig, DedupPolicy, TroublePolicy};
use crate::dedup::{DedupKey, DedupStore};
use crate::event::{Event, EventKind, RawFeedRecord, RelevanceFilter};
use crate::monitoring::feed_client::{FeedQuery, FeedSource};
use crate::monitoring::gate::{GateDecision, SendGate};
use crate::monitoring::notification::Notification;
use crate::monitoring::notifier::Notifier;
use crate::utils::AppError;

/// What to fetch and how to deduplicate
#[derive(Debug, Clone)]
pub struct NotificationSettings {
    pub services: Vec<String>,
    pub ordering: String,
    pub limit: u32,
    pub dedup_policy: DedupPolicy,
    pub trouble_policy: TroublePolicy,
    pub retention: Duration,
}

impl NotificationSettings {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            services: config.services.clone(),
            ordering: config.feed_ordering.clone(),
            limit: config.feed_limit,
            dedup_policy: config.dedup_policy,
            trouble_policy: config.trouble_policy,
            retention: config.retention(),
        }
    }
}

/// Counters for one run
///
/// `suppressed` counts events, the send counters count notifications.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunReport {
    /// Records returned by the feed
    pub fetched: usize,
    /// Records skipped as unparseable
    pub malformed: usize,
    /// Events in scope after filtering
    pub relevant: usize,
    pub sent: usize,
    /// Events already notified
    pub suppressed: usize,
    /// Notifications held back by the send gate
    pub skipped: usize,
    pub failed: usize,
    /// History records removed by retention
    pub pruned: usize,
}

impl RunReport {
    pub fn is_success(&self) -> bool {
        self.failed == 0
    }
}

/// Parsed feed contents
#[derive(Debug, Clone, Default)]
pub struct FetchedEvents {
    pub events: Vec<Event>,
    pub fetched: usize,
    pub malformed: usize,
}

/// A notification together with the history keys it will record
#[derive(Debug, Clone)]
pub struct PlannedNotification {
    pub notification: Notification,
    /// Empty when the notification bypasses history
    pub keys: Vec<DedupKey>,
}

#[derive(Debug, Clone, Default)]
pub struct NotificationPlan {
    pub notifications: Vec<PlannedNotification>,
    pub suppressed: usize,
}

pub struct StatusMonitor<F: FeedSource, N: Notifier> {
    feed: F,
    notifier: N,
    filter: RelevanceFilter,
    settings: NotificationSettings,
}

impl<F: FeedSource, N: Notifier> StatusMonitor<F, N> {
    pub fn new(feed: F, notifier: N, settings: NotificationSettings) -> Self {
        Self {
            feed,
            notifier,
            filter: RelevanceFilter::jst(),
            settings,
        }
    }

    /// Use a different day boundary offset
    pub fn with_filter(mut self, filter: RelevanceFilter) -> Self {
        self.filter = filter;
        self
    }

    pub fn settings(&self) -> &NotificationSettings {
        &self.settings
    }

    /// Query every service for both kinds, sequentially
    ///
    /// Any failed query fails the whole fetch. Malformed records are skipped.
    pub async fn fetch_events(&self) -> Result<FetchedEvents, AppError> {
        let mut result = FetchedEvents::default();

        for service in &self.settings.services {
            for kind in [EventKind::Maintenance, EventKind::Trouble] {
                let query = FeedQuery::new(
                    service.as_str(),
                    kind,
                    self.settings.ordering.as_str(),
                    self.settings.limit,
                );
                let records = self.feed.fetch(&query).await?;
                result.fetched += records.len();

                for value in records {
                    let parsed = RawFeedRecord::from_value(value)
                        .map(|raw| raw.with_query_defaults(service, kind))
                        .and_then(Event::try_from);

                    match parsed {
                        Ok(event) => result.events.push(event),
                        Err(e) => {
                            result.malformed += 1;
                            warn!(service = %service, kind = %kind, error = %e, "Skipping malformed feed record");
                        }
                    }
                }
            }
        }

        debug!(
            fetched = result.fetched,
            parsed = result.events.len(),
            malformed = result.malformed,
            "Feed fetch complete"
        );
        Ok(result)
    }

    /// Decide what to send for relevant events, without side effects
    pub fn plan(&self, relevant: &[Event], store: &DedupStore, now: DateTime<Utc>) -> NotificationPlan {
        let mut plan = NotificationPlan::default();
        let today = self.filter.local_date(now);

        for ((service, kind), events) in group_events(relevant) {
            let bypass_history =
                kind == EventKind::Trouble && self.settings.trouble_policy == TroublePolicy::Always;

            let (events, keys) = if bypass_history {
                (events, Vec::new())
            } else {
                match self.settings.dedup_policy {
                    DedupPolicy::DayBucket => {
                        let key = DedupKey::day_bucket(today, &service, kind);
                        if store.is_duplicate(&key) {
                            debug!(key = %key, count = events.len(), "Already notified today, suppressing");
                            plan.suppressed += events.len();
                            continue;
                        }
                        (events, vec![key])
                    }
                    DedupPolicy::ContentHash => {
                        let total = events.len();
                        let (fresh, keys): (Vec<Event>, Vec<DedupKey>) = events
                            .into_iter()
                            .map(|e| {
                                let key = DedupKey::content_hash(&e);
                                (e, key)
                            })
                            .filter(|(e, key)| {
                                let duplicate = store.is_duplicate(key);
                                if duplicate {
                                    debug!(key = %key, title = %e.title, "Event already notified, suppressing");
                                }
                                !duplicate
                            })
                            .unzip();
                        plan.suppressed += total - fresh.len();
                        if fresh.is_empty() {
                            continue;
                        }
                        (fresh, keys)
                    }
                }
            };

            plan.notifications.push(PlannedNotification {
                notification: Notification::new(service, kind, events, self.filter.offset()),
                keys,
            });
        }

        plan
    }

    /// Run the full pipeline once
    ///
    /// A feed error aborts before anything is sent or pruned. A failed send
    /// is counted and the run continues.
    #[instrument(skip_all, fields(run_id = %Uuid::new_v4()))]
    pub async fn run_once(
        &self,
        store: &mut DedupStore,
        gate: &mut dyn SendGate,
        now: DateTime<Utc>,
    ) -> Result<RunReport, AppError> {
        info!(services = ?self.settings.services, "Starting status check");

        let fetched = self.fetch_events().await?;
        let mut report = RunReport {
            fetched: fetched.fetched,
            malformed: fetched.malformed,
            ..RunReport::default()
        };

        report.pruned = store.prune(now, self.settings.retention);

        let relevant = self.filter.filter(fetched.events, now);
        report.relevant = relevant.len();

        let plan = self.plan(&relevant, store, now);
        report.suppressed = plan.suppressed;

        for planned in plan.notifications {
            let notification = &planned.notification;

            if gate.decide(notification)? == GateDecision::Skip {
                report.skipped += 1;
                continue;
            }

            match self.notifier.send(notification, now).await {
                Ok(()) => {
                    for key in &planned.keys {
                        store.record(key, now);
                    }
                    report.sent += 1;
                }
                Err(e) => {
                    error!(
                        service = %notification.service,
                        kind = %notification.kind,
                        error = %e,
                        "Notification failed, will retry next run"
                    );
                    report.failed += 1;
                }
            }
        }

        info!(
            fetched = report.fetched,
            malformed = report.malformed,
            relevant = report.relevant,
            sent = report.sent,
            suppressed = report.suppressed,
            skipped = report.skipped,
            failed = report.failed,
            pruned = report.pruned,
            "Status check complete"
        );
        Ok(report)
    }

    /// Alert the channel that a run failed before it could notify
    ///
    /// Best-effort: a failed alert is logged and otherwise ignored.
    pub async fn report_failure(&self, failure: &AppError, now: DateTime<Utc>) {
        match self.notifier.send_monitor_error(&failure.to_string(), now).await {
            Ok(()) => info!(error = %failure, "Reported monitor failure"),
            Err(e) => error!(error = %e, cause = %failure, "Failed to report monitor failure"),
        }
    }
}

/// Group by (service, kind) in order of first appearance
fn group_events(events: &[Event]) -> Vec<((String, EventKind), Vec<Event>)> {
    let mut groups: Vec<((String, EventKind), Vec<Event>)> = Vec::new();

    for event in events {
        match groups
            .iter_mut()
            .find(|((service, kind), _)| *service == event.service && *kind == event.kind)
        {
            Some((_, members)) => members.push(event.clone()),
            None => groups.push(((event.service.clone(), event.kind), vec![event.clone()])),
        }
    }

    groups
}
