//! Feed event model and relevance filtering
//!
//! - Event definition and raw record parsing
//! - Relevance filter (JST day window, open-incident logic)

mod event_types;
pub mod relevance;

pub use event_types::{
    parse_unix_timestamp, Event, EventKind, EventParseError, RawFeedRecord, STATUS_PAGE_URL,
};
pub use relevance::RelevanceFilter;
