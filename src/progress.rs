use serde::Serialize;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ProgressStatus {
    Starting,
    Downloading,
    Finished,
    Error,
    Unknown,
}

impl ProgressStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, ProgressStatus::Finished | ProgressStatus::Error)
    }
}

/// Snapshot served by `GET /progress/{video_id}`.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ProgressRecord {
    pub progress: f64,
    pub status: ProgressStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ProgressRecord {
    pub fn starting() -> Self {
        Self {
            progress: 0.0,
            status: ProgressStatus::Starting,
            error: None,
        }
    }

    pub fn unknown() -> Self {
        Self {
            progress: 0.0,
            status: ProgressStatus::Unknown,
            error: None,
        }
    }
}

#[derive(Debug)]
struct Entry {
    record: ProgressRecord,
    terminal_since: Option<Instant>,
}

impl Entry {
    fn new(record: ProgressRecord) -> Self {
        let terminal_since = record.status.is_terminal().then(Instant::now);
        Self {
            record,
            terminal_since,
        }
    }
}

/// Process-wide map of request id to progress. Each id has a single writer
/// (its worker), readers are the pollers.
#[derive(Clone, Debug, Default)]
pub struct ProgressStore {
    inner: Arc<Mutex<HashMap<String, Entry>>>,
}

impl ProgressStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, Entry>> {
        // A poisoned map still holds valid records.
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn set(&self, id: &str, record: ProgressRecord) {
        self.lock().insert(id.to_string(), Entry::new(record));
    }

    pub fn get(&self, id: &str) -> ProgressRecord {
        self.lock()
            .get(id)
            .map(|entry| entry.record.clone())
            .unwrap_or_else(ProgressRecord::unknown)
    }

    /// Seeds (or overwrites) the record for a freshly submitted id.
    pub fn begin(&self, id: &str) {
        self.set(id, ProgressRecord::starting());
    }

    /// Returns false when the record is already terminal and the update was dropped.
    pub fn record_progress(&self, id: &str, progress: f64) -> bool {
        let mut map = self.lock();
        if let Some(entry) = map.get(id)
            && entry.record.status.is_terminal()
        {
            return false;
        }
        map.insert(
            id.to_string(),
            Entry::new(ProgressRecord {
                progress,
                status: ProgressStatus::Downloading,
                error: None,
            }),
        );
        true
    }

    /// Marks the id finished, keeping the last reported progress value.
    pub fn finish(&self, id: &str) {
        let mut map = self.lock();
        let entry = map
            .entry(id.to_string())
            .or_insert_with(|| Entry::new(ProgressRecord::starting()));
        if entry.record.status == ProgressStatus::Finished {
            return;
        }
        entry.record.status = ProgressStatus::Finished;
        entry.record.error = None;
        entry.terminal_since = Some(Instant::now());
    }

    pub fn fail(&self, id: &str, message: impl Into<String>) {
        self.set(
            id,
            ProgressRecord {
                progress: 0.0,
                status: ProgressStatus::Error,
                error: Some(message.into()),
            },
        );
    }

    /// Drops records that have been terminal for longer than `ttl`.
    pub fn evict_expired(&self, ttl: Duration) -> usize {
        let mut map = self.lock();
        let before = map.len();
        map.retain(|_, entry| match entry.terminal_since {
            Some(since) => since.elapsed() < ttl,
            None => true,
        });
        before - map.len()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_id_returns_default() {
        let store = ProgressStore::new();
        let record = store.get("nope");
        assert_eq!(record.progress, 0.0);
        assert_eq!(record.status, ProgressStatus::Unknown);
        assert!(record.error.is_none());
    }

    #[test]
    fn test_lifecycle() {
        let store = ProgressStore::new();
        store.begin("a");
        assert_eq!(store.get("a").status, ProgressStatus::Starting);

        assert!(store.record_progress("a", 42.5));
        let record = store.get("a");
        assert_eq!(record.status, ProgressStatus::Downloading);
        assert_eq!(record.progress, 42.5);

        store.finish("a");
        let record = store.get("a");
        assert_eq!(record.status, ProgressStatus::Finished);
        // Progress is the last reported value, not forced to 100.
        assert_eq!(record.progress, 42.5);
    }

    #[test]
    fn test_terminal_state_does_not_revert() {
        let store = ProgressStore::new();
        store.begin("a");
        store.finish("a");
        assert!(!store.record_progress("a", 10.0));
        assert_eq!(store.get("a").status, ProgressStatus::Finished);

        store.fail("b", "boom");
        assert!(!store.record_progress("b", 10.0));
        let record = store.get("b");
        assert_eq!(record.status, ProgressStatus::Error);
        assert_eq!(record.error.as_deref(), Some("boom"));
    }

    #[test]
    fn test_failure_after_finish_is_recorded() {
        let store = ProgressStore::new();
        store.begin("a");
        store.record_progress("a", 100.0);
        store.finish("a");
        store.fail("a", "conversion failed");
        let record = store.get("a");
        assert_eq!(record.status, ProgressStatus::Error);
        assert_eq!(record.progress, 0.0);
    }

    #[test]
    fn test_evict_expired_keeps_active_records() {
        let store = ProgressStore::new();
        store.begin("active");
        store.record_progress("busy", 5.0);
        store.finish("done");
        store.fail("failed", "x");

        assert_eq!(store.evict_expired(Duration::from_secs(3600)), 0);
        assert_eq!(store.len(), 4);

        assert_eq!(store.evict_expired(Duration::ZERO), 2);
        assert_eq!(store.len(), 2);
        assert_eq!(store.get("done").status, ProgressStatus::Unknown);
        assert_eq!(store.get("active").status, ProgressStatus::Starting);
        assert_eq!(store.get("busy").status, ProgressStatus::Downloading);
    }

    #[test]
    fn test_serialization_omits_missing_error() {
        let json = serde_json::to_value(ProgressRecord::unknown()).unwrap();
        assert_eq!(json, serde_json::json!({ "progress": 0.0, "status": "unknown" }));

        let store = ProgressStore::new();
        store.fail("x", "bad url");
        let json = serde_json::to_value(store.get("x")).unwrap();
        assert_eq!(json["status"], "error");
        assert_eq!(json["error"], "bad url");
    }

    #[test]
    fn test_concurrent_writers() {
        let store = ProgressStore::new();
        let handles: Vec<_> = (0..8)
            .map(|n| {
                let store = store.clone();
                std::thread::spawn(move || {
                    let id = format!("id-{}", n);
                    store.begin(&id);
                    for p in 0..100 {
                        store.record_progress(&id, p as f64);
                    }
                    store.finish(&id);
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(store.len(), 8);
        for n in 0..8 {
            let record = store.get(&format!("id-{}", n));
            assert_eq!(record.status, ProgressStatus::Finished);
            assert_eq!(record.progress, 99.0);
        }
    }
}
