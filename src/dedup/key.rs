//! Dedup key derivation

use chrono::NaiveDate;
use sha2::{Digest, Sha256};
use std::fmt;

use crate::event::{Event, EventKind};

/// Hex characters kept from the SHA-256 digest
const HASH_PREFIX_LEN: usize = 16;

/// Identifier used to decide whether something was already notified
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DedupKey(String);

impl DedupKey {
    /// `"{YYYY-MM-DD}:{service}:{kind}"`
    ///
    /// At most one notification per service and kind per local day.
    pub fn day_bucket(date: NaiveDate, service: &str, kind: EventKind) -> Self {
        Self(format!("{}:{}:{}", date.format("%Y-%m-%d"), service, kind))
    }

    /// `"sha256:{16 hex}"` over service, kind, title and start time
    ///
    /// The same maintenance is never announced twice, whatever the day.
    pub fn content_hash(event: &Event) -> Self {
        let content = format!(
            "{}:{}:{}:{}",
            event.service,
            event.kind,
            event.title,
            event.start_time.timestamp()
        );
        let digest = hex::encode(Sha256::digest(content.as_bytes()));
        Self(format!("sha256:{}", &digest[..HASH_PREFIX_LEN]))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for DedupKey {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for DedupKey {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl fmt::Display for DedupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn event(title: &str, start_secs: i64) -> Event {
        Event {
            service: "cloud".to_string(),
            kind: EventKind::Maintenance,
            title: title.to_string(),
            start_time: Utc.timestamp_opt(start_secs, 0).single().expect("valid"),
            end_time: None,
            detail_url: Some("https://example.com/a".to_string()),
        }
    }

    #[test]
    fn should_build_day_bucket_key() {
        // Arrange
        let date = NaiveDate::from_ymd_opt(2026, 10, 17).expect("valid date");

        // Act
        let key = DedupKey::day_bucket(date, "cloud", EventKind::Maintenance);

        // Assert
        assert_eq!(key.as_str(), "2026-10-17:cloud:maintenance");
    }

    #[test]
    fn should_build_stable_content_hash() {
        // Arrange
        let a = event("Network maintenance", 1_760_662_800);
        let b = event("Network maintenance", 1_760_662_800);

        // Act
        let key_a = DedupKey::content_hash(&a);
        let key_b = DedupKey::content_hash(&b);

        // Assert
        assert_eq!(key_a, key_b);
        assert!(key_a.as_str().starts_with("sha256:"));
        assert_eq!(key_a.as_str().len(), "sha256:".len() + 16);
    }

    #[test]
    fn should_change_hash_when_content_changes() {
        // Arrange
        let base = event("Network maintenance", 1_760_662_800);
        let retitled = event("Storage maintenance", 1_760_662_800);
        let moved = event("Network maintenance", 1_760_666_400);

        // Act & Assert
        assert_ne!(DedupKey::content_hash(&base), DedupKey::content_hash(&retitled));
        assert_ne!(DedupKey::content_hash(&base), DedupKey::content_hash(&moved));
    }

    #[test]
    fn should_ignore_detail_url_in_hash() {
        // Arrange
        let a = event("Network maintenance", 1_760_662_800);
        let mut b = a.clone();
        b.detail_url = None;

        // Act & Assert
        assert_eq!(DedupKey::content_hash(&a), DedupKey::content_hash(&b));
    }
}
