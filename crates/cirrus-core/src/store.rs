//! Filesystem blueprint store.
//!
//! One YAML document per project at `<dir>/<slug>.yaml`. Saves keep a
//! `.yaml.backup` of the previous document before writing the new one.

use crate::error::{CoreError, Result};
use crate::model::Blueprint;
use std::path::{Path, PathBuf};
use tokio::fs;

pub struct BlueprintStore {
    dir: PathBuf,
}

impl BlueprintStore {
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
        }
    }

    /// Path of the document backing `slug`.
    pub fn path(&self, slug: &str) -> PathBuf {
        self.dir.join(format!("{}.yaml", slug))
    }

    fn backup_path(&self, slug: &str) -> PathBuf {
        self.dir.join(format!("{}.yaml.backup", slug))
    }

    async fn ensure_dir(&self) -> Result<()> {
        if !self.dir.exists() {
            fs::create_dir_all(&self.dir).await?;
            tracing::debug!("Created blueprint directory: {}", self.dir.display());
        }
        Ok(())
    }

    /// Load a project's blueprint.
    pub async fn load(&self, slug: &str) -> Result<Blueprint> {
        let path = self.path(slug);
        if !path.exists() {
            return Err(CoreError::ProjectNotFound(slug.to_string()));
        }
        let content = fs::read_to_string(&path).await?;
        let blueprint: Blueprint = serde_yaml::from_str(&content)?;
        Ok(blueprint)
    }

    /// Persist a blueprint, keeping a backup of the previous document.
    pub async fn save(&self, blueprint: &Blueprint) -> Result<PathBuf> {
        self.ensure_dir().await?;

        let slug = blueprint.slug();
        let path = self.path(&slug);
        let backup = self.backup_path(&slug);

        if path.exists() {
            if backup.exists() {
                fs::remove_file(&backup).await?;
            }
            fs::rename(&path, &backup).await?;
        }

        let content = serde_yaml::to_string(blueprint)?;
        fs::write(&path, content).await?;

        tracing::debug!("Saved blueprint {}", path.display());
        Ok(path)
    }

    /// Slugs of all stored projects, sorted.
    pub async fn list(&self) -> Result<Vec<String>> {
        if !self.dir.exists() {
            return Ok(Vec::new());
        }
        let mut slugs = Vec::new();
        let mut entries = fs::read_dir(&self.dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("yaml") {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                slugs.push(stem.to_string());
            }
        }
        slugs.sort();
        Ok(slugs)
    }

    /// Remove a project document (and its backup, if any).
    pub async fn remove(&self, slug: &str) -> Result<()> {
        let path = self.path(slug);
        if !path.exists() {
            return Err(CoreError::ProjectNotFound(slug.to_string()));
        }
        fs::remove_file(&path).await?;
        let backup = self.backup_path(slug);
        if backup.exists() {
            fs::remove_file(&backup).await?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ResourceStatus;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_save_load_round_trip() {
        let dir = tempdir().unwrap();
        let store = BlueprintStore::new(dir.path());

        let mut bp = Blueprint::new("Demo App", "us-east-1", "t3.micro");
        bp.compute.status = ResourceStatus::Created;
        bp.compute.instance_id = Some("i-0abc".into());

        store.save(&bp).await.unwrap();

        let loaded = store.load("demo-app").await.unwrap();
        assert_eq!(loaded.compute.instance_id.as_deref(), Some("i-0abc"));
        assert_eq!(loaded.compute.status, ResourceStatus::Created);
    }

    #[tokio::test]
    async fn test_save_keeps_backup() {
        let dir = tempdir().unwrap();
        let store = BlueprintStore::new(dir.path());

        let mut bp = Blueprint::new("Demo App", "us-east-1", "t3.micro");
        store.save(&bp).await.unwrap();
        bp.compute.status = ResourceStatus::Creating;
        store.save(&bp).await.unwrap();

        assert!(dir.path().join("demo-app.yaml").exists());
        assert!(dir.path().join("demo-app.yaml.backup").exists());
    }

    #[tokio::test]
    async fn test_list_ignores_backups() {
        let dir = tempdir().unwrap();
        let store = BlueprintStore::new(dir.path());

        store
            .save(&Blueprint::new("Beta", "us-east-1", "t3.micro"))
            .await
            .unwrap();
        store
            .save(&Blueprint::new("Alpha", "us-east-1", "t3.micro"))
            .await
            .unwrap();
        store
            .save(&Blueprint::new("Alpha", "us-east-1", "t3.small"))
            .await
            .unwrap();

        assert_eq!(store.list().await.unwrap(), vec!["alpha", "beta"]);
    }

    #[tokio::test]
    async fn test_load_missing_project() {
        let dir = tempdir().unwrap();
        let store = BlueprintStore::new(dir.path());
        assert!(matches!(
            store.load("nope").await,
            Err(CoreError::ProjectNotFound(_))
        ));
    }
}
