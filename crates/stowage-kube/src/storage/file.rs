//! File-based storage driver
//!
//! Stores one JSON document per revision. Used by the CLI, which runs next to
//! a deployment system that exports its release records to disk, and by tests
//! without a cluster.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use stowage_core::Release;

use super::{StorageDriver, already_exists, deserialize_release, not_found, serialize_release};
use crate::error::Result;

/// File-based storage driver
pub struct FileDriver {
    /// Base directory for storing releases
    base_dir: PathBuf,
}

impl FileDriver {
    /// Create a new file driver
    pub fn new(base_dir: PathBuf) -> Result<Self> {
        std::fs::create_dir_all(&base_dir)?;
        Ok(Self { base_dir })
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    fn release_path(&self, namespace: &str, name: &str, revision: u32) -> PathBuf {
        self.release_dir(namespace, name)
            .join(format!("v{}.json", revision))
    }

    fn release_dir(&self, namespace: &str, name: &str) -> PathBuf {
        self.base_dir.join(namespace).join(name)
    }

    fn write_release(&self, release: &Release) -> Result<()> {
        let path = self.release_path(&release.namespace, &release.name, release.revision);

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        std::fs::write(&path, serialize_release(release)?)?;
        Ok(())
    }

    fn read_release(&self, path: &Path) -> Result<Release> {
        let data = std::fs::read(path)?;
        deserialize_release(&data)
    }
}

#[async_trait]
impl StorageDriver for FileDriver {
    async fn get(&self, namespace: &str, name: &str, revision: u32) -> Result<Release> {
        let path = self.release_path(namespace, name, revision);

        if !path.exists() {
            return Err(not_found(namespace, name));
        }

        self.read_release(&path)
    }

    async fn get_latest(&self, namespace: &str, name: &str) -> Result<Release> {
        let history = self.history(namespace, name).await?;
        history
            .into_iter()
            .next()
            .ok_or_else(|| not_found(namespace, name))
    }

    async fn history(&self, namespace: &str, name: &str) -> Result<Vec<Release>> {
        let dir = self.release_dir(namespace, name);

        if !dir.exists() {
            return Err(not_found(namespace, name));
        }

        let mut releases = Vec::new();
        for entry in std::fs::read_dir(&dir)? {
            let path = entry?.path();
            if path.extension().is_some_and(|e| e == "json") {
                match self.read_release(&path) {
                    Ok(release) => releases.push(release),
                    Err(e) => {
                        tracing::warn!(path = %path.display(), error = %e, "skipping unreadable release file")
                    }
                }
            }
        }

        // Newest first
        releases.sort_by(|a, b| b.revision.cmp(&a.revision));

        if releases.is_empty() {
            return Err(not_found(namespace, name));
        }

        Ok(releases)
    }

    async fn create(&self, release: &Release) -> Result<()> {
        let path = self.release_path(&release.namespace, &release.name, release.revision);

        if path.exists() {
            return Err(already_exists(release));
        }

        self.write_release(release)
    }

    async fn update(&self, release: &Release) -> Result<()> {
        let path = self.release_path(&release.namespace, &release.name, release.revision);

        if !path.exists() {
            return Err(not_found(&release.namespace, &release.name));
        }

        self.write_release(release)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::KubeError;
    use stowage_core::{ChartRef, Values};
    use tempfile::TempDir;

    fn test_release(name: &str, revision: u32) -> Release {
        let mut release = Release::new(
            name,
            "default",
            ChartRef::new("matrix", semver::Version::new(1, 0, 0)),
            Values::new(),
        );
        release.revision = revision;
        release
    }

    #[tokio::test]
    async fn test_file_driver_create_and_get() {
        let tmp = TempDir::new().unwrap();
        let driver = FileDriver::new(tmp.path().to_path_buf()).unwrap();

        driver.create(&test_release("myapp", 1)).await.unwrap();

        let retrieved = driver.get("default", "myapp", 1).await.unwrap();
        assert_eq!(retrieved.name, "myapp");
        assert_eq!(retrieved.revision, 1);
        assert!(tmp.path().join("default/myapp/v1.json").exists());
    }

    #[tokio::test]
    async fn test_file_driver_history_newest_first() {
        let tmp = TempDir::new().unwrap();
        let driver = FileDriver::new(tmp.path().to_path_buf()).unwrap();

        for revision in 1..=3 {
            driver.create(&test_release("myapp", revision)).await.unwrap();
        }

        let history = driver.history("default", "myapp").await.unwrap();
        assert_eq!(history.len(), 3);
        assert_eq!(history[0].revision, 3);
        assert_eq!(history[2].revision, 1);

        let latest = driver.get_latest("default", "myapp").await.unwrap();
        assert_eq!(latest.revision, 3);
    }

    #[tokio::test]
    async fn test_file_driver_create_duplicate_fails() {
        let tmp = TempDir::new().unwrap();
        let driver = FileDriver::new(tmp.path().to_path_buf()).unwrap();

        driver.create(&test_release("myapp", 1)).await.unwrap();
        let err = driver.create(&test_release("myapp", 1)).await.unwrap_err();
        assert!(err.is_conflict());
    }

    #[tokio::test]
    async fn test_file_driver_update_requires_existing() {
        let tmp = TempDir::new().unwrap();
        let driver = FileDriver::new(tmp.path().to_path_buf()).unwrap();

        let err = driver.update(&test_release("myapp", 1)).await.unwrap_err();
        assert!(matches!(err, KubeError::ReleaseNotFound { .. }));
    }

    #[tokio::test]
    async fn test_file_driver_missing_release() {
        let tmp = TempDir::new().unwrap();
        let driver = FileDriver::new(tmp.path().to_path_buf()).unwrap();

        assert!(!driver.exists("default", "ghost").await.unwrap());
        let result = driver.get("default", "ghost", 1).await;
        assert!(matches!(result, Err(KubeError::ReleaseNotFound { .. })));
    }
}
