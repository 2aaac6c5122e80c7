//! Relevance filter
//!
//! Decides which events are in scope for the current run:
//! - maintenance: starts within the current local day of a fixed offset (JST)
//! - trouble: still open, or ends at/after `now`
//!
//! "Local day" is computed from the configured offset, never from the host
//! time zone.

use chrono::{DateTime, Duration, FixedOffset, NaiveDate, NaiveTime, Offset, TimeZone, Utc};
use tracing::debug;

use crate::event::{Event, EventKind};

/// JST offset from UTC in seconds
const JST_OFFSET_SECS: i32 = 9 * 3600;

#[derive(Debug, Clone, Copy)]
pub struct RelevanceFilter {
    offset: FixedOffset,
}

impl Default for RelevanceFilter {
    fn default() -> Self {
        Self::jst()
    }
}

impl RelevanceFilter {
    /// Filter using Japan Standard Time (UTC+9) day boundaries
    pub fn jst() -> Self {
        Self::with_offset(FixedOffset::east_opt(JST_OFFSET_SECS).unwrap_or_else(|| Utc.fix()))
    }

    pub fn with_offset(offset: FixedOffset) -> Self {
        Self { offset }
    }

    pub fn offset(&self) -> FixedOffset {
        self.offset
    }

    /// Local calendar date of an instant
    pub fn local_date(&self, instant: DateTime<Utc>) -> NaiveDate {
        instant.with_timezone(&self.offset).date_naive()
    }

    /// `[start, end)` of the local day containing `now`, in UTC
    ///
    /// With second-resolution timestamps this is 00:00:00..=23:59:59 local.
    pub fn local_day_bounds(&self, now: DateTime<Utc>) -> (DateTime<Utc>, DateTime<Utc>) {
        let date = self.local_date(now);
        let midnight = date.and_time(NaiveTime::default());
        // A fixed offset has no DST gaps, so the mapping is always single.
        let start = self
            .offset
            .from_local_datetime(&midnight)
            .single()
            .map(|dt| dt.with_timezone(&Utc))
            .unwrap_or_else(|| Utc.from_utc_datetime(&midnight));
        (start, start + Duration::days(1))
    }

    /// Whether a single event is relevant at `now`
    pub fn is_relevant(&self, event: &Event, now: DateTime<Utc>) -> bool {
        match event.kind {
            EventKind::Maintenance => {
                let (start, end) = self.local_day_bounds(now);
                event.start_time >= start && event.start_time < end
            }
            EventKind::Trouble => match event.end_time {
                None => true,
                Some(end) => end >= now,
            },
        }
    }

    /// Relevant subset, stable-sorted by start time (ties keep feed order)
    pub fn filter(&self, events: Vec<Event>, now: DateTime<Utc>) -> Vec<Event> {
        let total = events.len();
        let mut relevant: Vec<Event> = events
            .into_iter()
            .filter(|e| {
                let keep = self.is_relevant(e, now);
                if !keep {
                    debug!(
                        service = %e.service,
                        kind = %e.kind,
                        title = %e.title,
                        "Event out of scope, skipping"
                    );
                }
                keep
            })
            .collect();
        relevant.sort_by_key(|e| e.start_time);

        debug!(total = total, relevant = relevant.len(), "Relevance filter applied");
        relevant
    }
}
