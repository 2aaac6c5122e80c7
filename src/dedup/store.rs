//! Persisted dedup history
//!
//! File format (pretty JSON, keys sorted):
//! ```text
//! {
//!   "2026-10-17:cloud:maintenance": "2026-10-17T01:00:00Z",
//!   "sha256:1f0c9a...": "2026-10-15T22:30:00Z"
//! }
//! ```
//!
//! A missing or unreadable file is an empty history. Losing history only
//! causes a repeat notification; it must never stop monitoring.

use chrono::{DateTime, Duration, Utc};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, error, info, warn};

use crate::dedup::DedupKey;
use crate::utils::AppError;

pub type DedupResult<T> = Result<T, AppError>;

/// Key → first-sent timestamp mapping, owned by a single run
#[derive(Debug, Clone, Default)]
pub struct DedupStore {
    /// Backing file (`None` for in-memory stores)
    path: Option<PathBuf>,
    records: BTreeMap<String, DateTime<Utc>>,
}

impl DedupStore {
    /// Empty store that is never written to disk
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// Load history from `path`
    ///
    /// Best-effort: a missing file gives an empty store, an unreadable or
    /// corrupt file is logged and also gives an empty store.
    pub fn load(path: impl Into<PathBuf>) -> Self {
        let path = path.into();

        if !path.exists() {
            debug!(file = %path.display(), "History file not found, starting empty");
            return Self {
                path: Some(path),
                records: BTreeMap::new(),
            };
        }

        let records = match fs::read_to_string(&path) {
            Ok(content) => match Self::parse_records(&content) {
                Ok(records) => records,
                Err(e) => {
                    warn!(error = %e, file = %path.display(), "History file is corrupt, starting empty");
                    BTreeMap::new()
                }
            },
            Err(e) => {
                warn!(error = %e, file = %path.display(), "Failed to read history file, starting empty");
                BTreeMap::new()
            }
        };

        debug!(entries = records.len(), file = %path.display(), "Loaded dedup history");
        Self {
            path: Some(path),
            records,
        }
    }

    /// Build an in-memory store from serialized history
    pub fn from_json(content: &str) -> DedupResult<Self> {
        let records = Self::parse_records(content)
            .map_err(|e| AppError::history(format!("Failed to parse history: {}", e)))?;
        Ok(Self {
            path: None,
            records,
        })
    }

    /// Serialize the mapping (pretty JSON, sorted keys)
    pub fn to_json(&self) -> DedupResult<String> {
        serde_json::to_string_pretty(&self.records).map_err(|e| {
            error!(error = %e, "Failed to serialize history");
            AppError::history(format!("Failed to serialize history: {}", e))
        })
    }

    fn parse_records(content: &str) -> serde_json::Result<BTreeMap<String, DateTime<Utc>>> {
        if content.trim().is_empty() {
            return Ok(BTreeMap::new());
        }
        serde_json::from_str(content)
    }

    /// True iff `key` has a (not yet pruned) record
    pub fn is_duplicate(&self, key: &DedupKey) -> bool {
        self.records.contains_key(key.as_str())
    }

    /// Insert or overwrite the timestamp for `key`
    pub fn record(&mut self, key: &DedupKey, now: DateTime<Utc>) {
        self.records.insert(key.as_str().to_string(), now);
    }

    /// Remove records older than `retention`; returns how many were removed
    ///
    /// A window reaching past the earliest representable instant keeps everything.
    pub fn prune(&mut self, now: DateTime<Utc>, retention: Duration) -> usize {
        let Some(cutoff) = now.checked_sub_signed(retention) else {
            warn!(retention_days = retention.num_days(), "Retention window out of range, nothing pruned");
            return 0;
        };
        let before = self.records.len();
        self.records.retain(|_, sent_at| *sent_at >= cutoff);
        let removed = before - self.records.len();

        if removed > 0 {
            info!(removed = removed, cutoff = %cutoff.to_rfc3339(), "Pruned dedup history");
        }
        removed
    }

    /// Timestamp recorded for `key`
    pub fn sent_at(&self, key: &DedupKey) -> Option<DateTime<Utc>> {
        self.records.get(key.as_str()).copied()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &DateTime<Utc>)> {
        self.records.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Write history back to its file
    ///
    /// Writes a sibling temp file and renames it over the target so a crash
    /// never leaves a half-written history. In-memory stores are a no-op.
    pub fn save(&self) -> DedupResult<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| {
                error!(error = %e, dir = %parent.display(), "Failed to create history directory");
                AppError::history(format!("Failed to create history directory: {}", e))
            })?;
        }

        let content = self.to_json()?;
        let tmp_path = temp_path_for(path);

        fs::write(&tmp_path, content).map_err(|e| {
            error!(error = %e, file = %tmp_path.display(), "Failed to write history file");
            AppError::history(format!("Failed to write history file: {}", e))
        })?;

        fs::rename(&tmp_path, path).map_err(|e| {
            error!(error = %e, file = %path.display(), "Failed to replace history file");
            let _ = fs::remove_file(&tmp_path);
            AppError::history(format!("Failed to replace history file: {}", e))
        })?;

        debug!(entries = self.records.len(), file = %path.display(), "Saved dedup history");
        Ok(())
    }
}

fn temp_path_for(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::env::temp_dir;
    use uuid::Uuid;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 10, 17, 3, 0, 0).single().expect("valid")
    }

    fn test_history_path() -> PathBuf {
        temp_dir()
            .join(format!("test_dedup_store_{}", Uuid::new_v4()))
            .join("maintenance_sent.json")
    }

    #[test]
    fn should_report_duplicate_only_after_record() {
        // Arrange
        let mut store = DedupStore::in_memory();
        let key = DedupKey::from("2026-10-17:cloud:maintenance");

        // Act
        let before = store.is_duplicate(&key);
        store.record(&key, now());
        let after = store.is_duplicate(&key);

        // Assert
        assert!(!before);
        assert!(after);
        assert_eq!(store.sent_at(&key), Some(now()));
    }

    #[test]
    fn should_overwrite_timestamp_on_rerecord() {
        // Arrange
        let mut store = DedupStore::in_memory();
        let key = DedupKey::from("k");
        store.record(&key, now() - Duration::days(1));

        // Act
        store.record(&key, now());

        // Assert
        assert_eq!(store.len(), 1);
        assert_eq!(store.sent_at(&key), Some(now()));
    }

    #[test]
    fn should_prune_records_older_than_retention() {
        // Arrange
        let mut store = DedupStore::in_memory();
        let old = DedupKey::from("old");
        let recent = DedupKey::from("recent");
        let boundary = DedupKey::from("boundary");
        store.record(&old, now() - Duration::days(8));
        store.record(&recent, now() - Duration::days(6));
        store.record(&boundary, now() - Duration::days(7));

        // Act
        let removed = store.prune(now(), Duration::days(7));

        // Assert
        assert_eq!(removed, 1);
        assert!(!store.is_duplicate(&old));
        assert!(store.is_duplicate(&recent));
        assert!(store.is_duplicate(&boundary));
    }

    #[test]
    fn should_keep_everything_when_retention_exceeds_time_range() {
        // Arrange
        let mut store = DedupStore::in_memory();
        store.record(&DedupKey::from("ancient"), now() - Duration::days(365 * 100));

        // Act
        let removed = store.prune(now(), Duration::days(1_000_000_000));

        // Assert
        assert_eq!(removed, 0);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn should_fail_save_when_parent_is_a_file() {
        // Arrange
        let blocker = test_history_path();
        fs::create_dir_all(blocker.parent().expect("has parent")).expect("create dir");
        fs::write(&blocker, "{}").expect("write blocker file");
        let mut store = DedupStore::load(blocker.join("maintenance_sent.json"));
        store.record(&DedupKey::from("2026-10-17:cloud:maintenance"), now());

        // Act
        let result = store.save();

        // Assert
        assert!(matches!(result, Err(AppError::History(_))));
        assert_eq!(result.unwrap_err().exit_code(), 1);
    }

    #[test]
    fn should_round_trip_through_json() {
        // Arrange
        let mut store = DedupStore::in_memory();
        store.record(&DedupKey::from("2026-10-17:cloud:maintenance"), now());
        store.record(&DedupKey::from("sha256:0123456789abcdef"), now() - Duration::hours(5));

        // Act
        let json = store.to_json().expect("serialize");
        let restored = DedupStore::from_json(&json).expect("deserialize");

        // Assert
        let original: Vec<_> = store.iter().collect();
        let round_tripped: Vec<_> = restored.iter().collect();
        assert_eq!(original, round_tripped);
    }

    #[test]
    fn should_serialize_as_flat_object_with_rfc3339_values() {
        // Arrange
        let mut store = DedupStore::in_memory();
        store.record(&DedupKey::from("2026-10-17:cloud:maintenance"), now());

        // Act
        let json = store.to_json().expect("serialize");
        let value: serde_json::Value = serde_json::from_str(&json).expect("valid json");

        // Assert
        assert_eq!(
            value["2026-10-17:cloud:maintenance"],
            serde_json::json!("2026-10-17T03:00:00Z")
        );
    }

    #[test]
    fn should_load_empty_store_when_file_missing() {
        // Arrange
        let path = test_history_path();

        // Act
        let store = DedupStore::load(&path);

        // Assert
        assert!(store.is_empty());
        assert_eq!(store.path(), Some(path.as_path()));
    }

    #[test]
    fn should_load_empty_store_when_file_corrupt() {
        // Arrange
        let path = test_history_path();
        fs::create_dir_all(path.parent().expect("has parent")).expect("create dir");
        fs::write(&path, "{ not json").expect("write corrupt file");

        // Act
        let store = DedupStore::load(&path);

        // Assert
        assert!(store.is_empty());
    }

    #[test]
    fn should_load_empty_store_when_file_blank() {
        // Arrange
        let path = test_history_path();
        fs::create_dir_all(path.parent().expect("has parent")).expect("create dir");
        fs::write(&path, "\n").expect("write blank file");

        // Act
        let store = DedupStore::load(&path);

        // Assert
        assert!(store.is_empty());
    }

    #[test]
    fn should_persist_and_reload() {
        // Arrange
        let path = test_history_path();
        let key = DedupKey::from("2026-10-17:iot:trouble");
        let mut store = DedupStore::load(&path);
        store.record(&key, now());

        // Act
        store.save().expect("save");
        let reloaded = DedupStore::load(&path);

        // Assert
        assert!(reloaded.is_duplicate(&key));
        assert_eq!(reloaded.sent_at(&key), Some(now()));
        assert!(!temp_path_for(&path).exists());
    }

    #[test]
    fn should_skip_save_for_in_memory_store() {
        // Arrange
        let mut store = DedupStore::in_memory();
        store.record(&DedupKey::from("k"), now());

        // Act & Assert
        assert!(store.save().is_ok());
        assert!(store.path().is_none());
    }

    #[test]
    fn should_fail_from_json_on_invalid_content() {
        // Arrange & Act
        let result = DedupStore::from_json(r#"{"k": "not a timestamp"}"#);

        // Assert
        assert!(matches!(result, Err(AppError::History(_))));
    }
}
