//! Durable resource tracker.
//!
//! Authoritative map from `(project_slug, slot)` to the provider-assigned
//! identifier. An entry is written immediately after a successful provider
//! call and *before* the blueprint is updated, so after a crash the tracker
//! is always a superset of what the blueprint reflects, never a subset. An
//! entry is only removed once the provider confirms deletion (or confirms
//! the resource is already gone).

use crate::error::{ProviderError, Result};
use chrono::{DateTime, Utc};
use cirrus_core::{ResourceKind, Slot};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::sync::Mutex;

const TRACKER_VERSION: u32 = 1;

/// One tracked resource believed to exist at the provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackerEntry {
    pub project_slug: String,
    pub slot: Slot,
    pub kind: ResourceKind,
    pub provider_id: String,
    pub region: String,
    pub created_at: DateTime<Utc>,
}

impl TrackerEntry {
    pub fn new(
        project_slug: impl Into<String>,
        slot: Slot,
        provider_id: impl Into<String>,
        region: impl Into<String>,
    ) -> Self {
        Self {
            project_slug: project_slug.into(),
            slot,
            kind: slot.kind(),
            provider_id: provider_id.into(),
            region: region.into(),
            created_at: Utc::now(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct TrackerFile {
    version: u32,
    updated_at: DateTime<Utc>,
    /// Entries keyed by `project_slug:slot`.
    entries: HashMap<String, TrackerEntry>,
}

impl Default for TrackerFile {
    fn default() -> Self {
        Self {
            version: TRACKER_VERSION,
            updated_at: Utc::now(),
            entries: HashMap::new(),
        }
    }
}

fn entry_key(project_slug: &str, slot: Slot) -> String {
    format!("{}:{}", project_slug, slot.as_str())
}

/// Durable tracker state, safe to share behind an `Arc`.
pub struct ResourceTracker {
    path: PathBuf,
    state: Mutex<TrackerFile>,
}

impl ResourceTracker {
    /// Load the tracker from `path`, starting empty when the file does not
    /// exist yet.
    pub async fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let state = if path.exists() {
            let content = fs::read_to_string(&path).await?;
            let file: TrackerFile = serde_json::from_str(&content)?;
            if file.version > TRACKER_VERSION {
                return Err(ProviderError::StateError(format!(
                    "tracker file version {} is newer than supported version {}",
                    file.version, TRACKER_VERSION
                )));
            }
            tracing::debug!("Loaded tracker with {} entries", file.entries.len());
            file
        } else {
            TrackerFile::default()
        };
        Ok(Self {
            path,
            state: Mutex::new(state),
        })
    }

    fn backup_path(&self) -> PathBuf {
        let mut os = self.path.clone().into_os_string();
        os.push(".backup");
        PathBuf::from(os)
    }

    async fn persist(&self, state: &TrackerFile) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.exists() {
                fs::create_dir_all(parent).await?;
            }
        }
        let backup = self.backup_path();
        if self.path.exists() {
            if backup.exists() {
                fs::remove_file(&backup).await?;
            }
            fs::rename(&self.path, &backup).await?;
        }
        let content = serde_json::to_string_pretty(state)?;
        fs::write(&self.path, content).await?;
        Ok(())
    }

    /// Record (or overwrite) an entry and flush to disk.
    pub async fn record(&self, entry: TrackerEntry) -> Result<()> {
        let mut state = self.state.lock().await;
        tracing::info!(
            project = %entry.project_slug,
            slot = %entry.slot,
            id = %entry.provider_id,
            "tracking resource"
        );
        let key = entry_key(&entry.project_slug, entry.slot);
        if let Some(previous) = state.entries.get(&key) {
            if previous.provider_id != entry.provider_id {
                tracing::warn!(
                    project = %entry.project_slug,
                    slot = %entry.slot,
                    old = %previous.provider_id,
                    new = %entry.provider_id,
                    "replacing tracked provider id; the old resource may need manual cleanup"
                );
            }
        }
        state.entries.insert(key, entry);
        state.updated_at = Utc::now();
        self.persist(&state).await
    }

    /// Remove the entry for `(project_slug, slot)` once the provider has
    /// confirmed the deletion.
    pub async fn remove(&self, project_slug: &str, slot: Slot) -> Result<Option<TrackerEntry>> {
        let mut state = self.state.lock().await;
        let removed = state.entries.remove(&entry_key(project_slug, slot));
        if removed.is_some() {
            state.updated_at = Utc::now();
            self.persist(&state).await?;
        }
        Ok(removed)
    }

    /// Remove whichever entry carries `provider_id`, if any.
    pub async fn remove_by_provider_id(&self, provider_id: &str) -> Result<Option<TrackerEntry>> {
        let mut state = self.state.lock().await;
        let key = state
            .entries
            .iter()
            .find(|(_, e)| e.provider_id == provider_id)
            .map(|(k, _)| k.clone());
        match key {
            Some(key) => {
                let removed = state.entries.remove(&key);
                state.updated_at = Utc::now();
                self.persist(&state).await?;
                Ok(removed)
            }
            None => Ok(None),
        }
    }

    pub async fn get(&self, project_slug: &str, slot: Slot) -> Option<TrackerEntry> {
        let state = self.state.lock().await;
        state.entries.get(&entry_key(project_slug, slot)).cloned()
    }

    /// Entries for one project, in slot declaration order.
    pub async fn list(&self, project_slug: &str) -> Vec<TrackerEntry> {
        let state = self.state.lock().await;
        Slot::ALL
            .iter()
            .filter_map(|&slot| state.entries.get(&entry_key(project_slug, slot)).cloned())
            .collect()
    }

    /// Every tracked entry, across projects.
    pub async fn list_all(&self) -> Vec<TrackerEntry> {
        let state = self.state.lock().await;
        let mut entries: Vec<TrackerEntry> = state.entries.values().cloned().collect();
        entries.sort_by(|a, b| {
            (a.project_slug.as_str(), a.slot.as_str()).cmp(&(b.project_slug.as_str(), b.slot.as_str()))
        });
        entries
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_record_and_list() {
        let dir = tempdir().unwrap();
        let tracker = ResourceTracker::load(dir.path().join("tracker.json"))
            .await
            .unwrap();

        tracker
            .record(TrackerEntry::new("demo", Slot::Vpc, "vpc-123", "us-east-1"))
            .await
            .unwrap();
        tracker
            .record(TrackerEntry::new("demo", Slot::Instance, "i-456", "us-east-1"))
            .await
            .unwrap();
        tracker
            .record(TrackerEntry::new("other", Slot::Vpc, "vpc-999", "us-east-1"))
            .await
            .unwrap();

        let entries = tracker.list("demo").await;
        assert_eq!(entries.len(), 2);
        // Slot declaration order, not insertion order.
        assert_eq!(entries[0].slot, Slot::Vpc);
        assert_eq!(entries[1].slot, Slot::Instance);
    }

    #[tokio::test]
    async fn test_survives_reload() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("tracker.json");

        {
            let tracker = ResourceTracker::load(&path).await.unwrap();
            tracker
                .record(TrackerEntry::new("demo", Slot::Subnet, "subnet-1", "us-east-1"))
                .await
                .unwrap();
        }

        let tracker = ResourceTracker::load(&path).await.unwrap();
        let entry = tracker.get("demo", Slot::Subnet).await.unwrap();
        assert_eq!(entry.provider_id, "subnet-1");
        assert_eq!(entry.kind, ResourceKind::Subnet);
    }

    #[tokio::test]
    async fn test_record_overwrites_same_slot() {
        let dir = tempdir().unwrap();
        let tracker = ResourceTracker::load(dir.path().join("tracker.json"))
            .await
            .unwrap();

        tracker
            .record(TrackerEntry::new("demo", Slot::Vpc, "vpc-old", "us-east-1"))
            .await
            .unwrap();
        tracker
            .record(TrackerEntry::new("demo", Slot::Vpc, "vpc-new", "us-east-1"))
            .await
            .unwrap();

        assert_eq!(tracker.list("demo").await.len(), 1);
        assert_eq!(
            tracker.get("demo", Slot::Vpc).await.unwrap().provider_id,
            "vpc-new"
        );
    }

    #[tokio::test]
    async fn test_remove_by_provider_id() {
        let dir = tempdir().unwrap();
        let tracker = ResourceTracker::load(dir.path().join("tracker.json"))
            .await
            .unwrap();

        tracker
            .record(TrackerEntry::new("demo", Slot::Bucket, "demo-assets", "us-east-1"))
            .await
            .unwrap();

        let removed = tracker.remove_by_provider_id("demo-assets").await.unwrap();
        assert_eq!(removed.unwrap().slot, Slot::Bucket);
        assert!(tracker.list("demo").await.is_empty());
        assert!(tracker.remove_by_provider_id("demo-assets").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_remove_missing_is_noop() {
        let dir = tempdir().unwrap();
        let tracker = ResourceTracker::load(dir.path().join("tracker.json"))
            .await
            .unwrap();
        assert!(tracker.remove("demo", Slot::Vpc).await.unwrap().is_none());
    }
}
