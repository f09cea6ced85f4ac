//! Persisted run snapshot.
//!
//! Only the start instant and the segment list are stored. The segment list
//! lets an out-of-process scheduler compute absolute cue times; the running
//! process always resolves against its own freshly built [`Timeline`].

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::data_dir;
use crate::capabilities::RunStore;
use crate::error::{CoreError, Result};
use crate::timer::{elapsed_secs, Resolution, Segment, Timeline};

const RUN_STATE_FILE: &str = "run_state.json";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistedRunConfig {
    /// Epoch milliseconds on the wire.
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub start_time: DateTime<Utc>,
    pub segments: Vec<Segment>,
}

impl PersistedRunConfig {
    pub fn new(start_time: DateTime<Utc>, timeline: &Timeline) -> Self {
        Self {
            start_time,
            segments: timeline.segments().to_vec(),
        }
    }

    /// Whether the stored segments still match `timeline`. A mismatch means
    /// the constants changed since the run was saved.
    pub fn matches(&self, timeline: &Timeline) -> bool {
        self.segments.as_slice() == timeline.segments()
    }

    pub fn resolve_at(&self, timeline: &Timeline, now: DateTime<Utc>) -> Resolution {
        timeline.resolve(elapsed_secs(self.start_time, now))
    }
}

/// JSON file in the data directory.
#[derive(Debug, Clone)]
pub struct JsonFileRunStore {
    path: PathBuf,
}

impl JsonFileRunStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// `run_state.json` inside [`data_dir`].
    pub fn open_default() -> Result<Self> {
        Ok(Self::new(data_dir()?.join(RUN_STATE_FILE)))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl RunStore for JsonFileRunStore {
    async fn save(&self, config: &PersistedRunConfig) -> Result<()> {
        let json = serde_json::to_string(config)?;
        tokio::fs::write(&self.path, json)
            .await
            .map_err(|e| CoreError::Persistence(format!("write {}: {e}", self.path.display())))
    }

    async fn load(&self) -> Result<Option<PersistedRunConfig>> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(CoreError::Persistence(format!(
                "read {}: {e}",
                self.path.display()
            ))),
        }
    }

    async fn clear(&self) -> Result<()> {
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(CoreError::Persistence(format!(
                "remove {}: {e}",
                self.path.display()
            ))),
        }
    }
}

/// Process-local store for tests and dry runs.
#[derive(Debug, Default)]
pub struct MemoryRunStore {
    slot: Mutex<Option<PersistedRunConfig>>,
}

impl MemoryRunStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> Option<PersistedRunConfig> {
        self.slot.lock().map(|g| g.clone()).unwrap_or(None)
    }
}

#[async_trait]
impl RunStore for MemoryRunStore {
    async fn save(&self, config: &PersistedRunConfig) -> Result<()> {
        let mut slot = self
            .slot
            .lock()
            .map_err(|_| CoreError::Persistence("memory store poisoned".into()))?;
        *slot = Some(config.clone());
        Ok(())
    }

    async fn load(&self) -> Result<Option<PersistedRunConfig>> {
        let slot = self
            .slot
            .lock()
            .map_err(|_| CoreError::Persistence("memory store poisoned".into()))?;
        Ok(slot.clone())
    }

    async fn clear(&self) -> Result<()> {
        let mut slot = self
            .slot
            .lock()
            .map_err(|_| CoreError::Persistence("memory store poisoned".into()))?;
        *slot = None;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn start() -> DateTime<Utc> {
        DateTime::from_timestamp_millis(1_700_000_000_123).unwrap()
    }

    #[test]
    fn wire_format_uses_epoch_millis() {
        let timeline = Timeline::build(10, 20, 1, 1).unwrap();
        let config = PersistedRunConfig::new(start(), &timeline);
        let json = serde_json::to_string(&config).unwrap();
        assert_eq!(
            json,
            r#"{"startTime":1700000000123,"segments":[{"type":"work","duration":10},{"type":"rest","duration":20}]}"#
        );
        let back: PersistedRunConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back, config);
    }

    #[test]
    fn mismatch_is_detected() {
        let saved = PersistedRunConfig::new(start(), &Timeline::build(10, 20, 3, 2).unwrap());
        assert!(saved.matches(&Timeline::standard().unwrap()));
        assert!(!saved.matches(&Timeline::build(15, 20, 3, 2).unwrap()));
    }

    #[tokio::test]
    async fn file_store_save_load_clear() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileRunStore::new(dir.path().join("run.json"));
        assert!(store.load().await.unwrap().is_none());

        let config = PersistedRunConfig::new(start(), &Timeline::standard().unwrap());
        store.save(&config).await.unwrap();
        assert_eq!(store.load().await.unwrap(), Some(config));

        store.clear().await.unwrap();
        assert!(store.load().await.unwrap().is_none());
        // Clearing twice is fine.
        store.clear().await.unwrap();
    }

    #[tokio::test]
    async fn corrupt_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("run.json");
        std::fs::write(&path, "not json").unwrap();
        let store = JsonFileRunStore::new(path);
        assert!(matches!(store.load().await, Err(CoreError::Json(_))));
    }

    #[tokio::test]
    async fn memory_store_roundtrip() {
        let store = MemoryRunStore::new();
        let config = PersistedRunConfig::new(start(), &Timeline::standard().unwrap());
        store.save(&config).await.unwrap();
        assert_eq!(store.current(), Some(config));
        store.clear().await.unwrap();
        assert_eq!(store.load().await.unwrap(), None);
    }
}
