//! Release mutation interface
//!
//! Clearing a flag after a backup, or switching off a dependency before a
//! restore, is an upgrade of the release with a small values patch merged
//! over its current values.

use async_trait::async_trait;
use std::sync::{Arc, Mutex};
use stowage_core::{ChartRef, Release, ReleaseStatus, Values};

use crate::error::{KubeError, Result};
use crate::storage::StorageDriver;

/// Apply a values patch to a release as a new revision
#[async_trait]
pub trait ReleaseMutator: Send + Sync {
    async fn upgrade(
        &self,
        name: &str,
        namespace: &str,
        chart: &ChartRef,
        patch: &Values,
    ) -> Result<Release>;
}

/// Mutator writing new revisions into a [`StorageDriver`]
pub struct StorageReleaseMutator<S: StorageDriver> {
    storage: S,
}

impl<S: StorageDriver> StorageReleaseMutator<S> {
    pub fn new(storage: S) -> Self {
        Self { storage }
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }
}

#[async_trait]
impl<S: StorageDriver> ReleaseMutator for StorageReleaseMutator<S> {
    async fn upgrade(
        &self,
        name: &str,
        namespace: &str,
        chart: &ChartRef,
        patch: &Values,
    ) -> Result<Release> {
        let mut current = self.storage.get_latest(namespace, name).await?;

        let mut values = current.values.clone();
        values.merge(patch);

        let mut next = current.next_revision(values);
        next.chart = chart.clone();

        self.storage.create(&next).await?;

        current.status = ReleaseStatus::Superseded;
        self.storage.update(&current).await?;

        tracing::info!(
            release = %name,
            namespace = %namespace,
            revision = next.revision,
            "upgraded release"
        );
        Ok(next)
    }
}

/// A recorded call to [`MockReleaseMutator::upgrade`]
#[derive(Debug, Clone, PartialEq)]
pub struct UpgradeCall {
    pub name: String,
    pub namespace: String,
    pub chart: ChartRef,
    pub patch: Values,
}

#[derive(Default)]
struct MockMutatorState {
    releases: Vec<Release>,
    calls: Vec<UpgradeCall>,
    failure: Option<String>,
}

/// In-memory mutator recording every upgrade
#[derive(Clone, Default)]
pub struct MockReleaseMutator {
    state: Arc<Mutex<MockMutatorState>>,
}

impl MockReleaseMutator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the latest revision of a release
    pub fn with_release(release: Release) -> Self {
        let mutator = Self::new();
        mutator.state.lock().unwrap().releases.push(release);
        mutator
    }

    /// Fail every upgrade with `message`
    pub fn fail_with(&self, message: impl Into<String>) {
        self.state.lock().unwrap().failure = Some(message.into());
    }

    pub fn calls(&self) -> Vec<UpgradeCall> {
        self.state.lock().unwrap().calls.clone()
    }

    /// Latest revision held for a release
    pub fn latest(&self, namespace: &str, name: &str) -> Option<Release> {
        self.state
            .lock()
            .unwrap()
            .releases
            .iter()
            .find(|r| r.namespace == namespace && r.name == name)
            .cloned()
    }
}

#[async_trait]
impl ReleaseMutator for MockReleaseMutator {
    async fn upgrade(
        &self,
        name: &str,
        namespace: &str,
        chart: &ChartRef,
        patch: &Values,
    ) -> Result<Release> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(UpgradeCall {
            name: name.to_string(),
            namespace: namespace.to_string(),
            chart: chart.clone(),
            patch: patch.clone(),
        });

        if let Some(message) = &state.failure {
            return Err(KubeError::Storage(message.clone()));
        }

        let slot = state
            .releases
            .iter_mut()
            .find(|r| r.namespace == namespace && r.name == name)
            .ok_or_else(|| KubeError::ReleaseNotFound {
                name: name.to_string(),
                namespace: namespace.to_string(),
            })?;

        let mut values = slot.values.clone();
        values.merge(patch);
        let mut next = slot.next_revision(values);
        next.chart = chart.clone();
        *slot = next.clone();
        Ok(next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MockStorageDriver;
    use serde_json::json;

    fn release() -> Release {
        Release::new(
            "myapp",
            "default",
            ChartRef::new("matrix", semver::Version::new(1, 0, 0)),
            Values(json!({ "backup": { "enabled": true }, "replicas": 3 })),
        )
    }

    #[tokio::test]
    async fn test_storage_mutator_creates_next_revision() {
        let storage = MockStorageDriver::with_releases(vec![release()]);
        let mutator = StorageReleaseMutator::new(storage);
        let patch = Values::from_path("backup.enabled", json!(false)).unwrap();

        let chart = release().chart;
        let next = mutator
            .upgrade("myapp", "default", &chart, &patch)
            .await
            .unwrap();

        assert_eq!(next.revision, 2);
        assert_eq!(
            next.values.0,
            json!({ "backup": { "enabled": false }, "replicas": 3 })
        );

        let previous = mutator.storage().get("default", "myapp", 1).await.unwrap();
        assert_eq!(previous.status, ReleaseStatus::Superseded);
        let latest = mutator.storage().get_latest("default", "myapp").await.unwrap();
        assert_eq!(latest.revision, 2);
        assert_eq!(latest.status, ReleaseStatus::Deployed);
    }

    #[tokio::test]
    async fn test_storage_mutator_missing_release() {
        let mutator = StorageReleaseMutator::new(MockStorageDriver::new());
        let err = mutator
            .upgrade("ghost", "default", &release().chart, &Values::new())
            .await
            .unwrap_err();
        assert!(matches!(err, KubeError::ReleaseNotFound { .. }));
    }

    #[tokio::test]
    async fn test_mock_mutator_records_calls() {
        let mutator = MockReleaseMutator::with_release(release());
        let patch = Values::from_path("backup.enabled", json!(false)).unwrap();

        let next = mutator
            .upgrade("myapp", "default", &release().chart, &patch)
            .await
            .unwrap();
        assert_eq!(next.revision, 2);

        let calls = mutator.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].patch.0, json!({ "backup": { "enabled": false } }));
        assert_eq!(mutator.latest("default", "myapp").unwrap().revision, 2);
    }

    #[tokio::test]
    async fn test_mock_mutator_failure() {
        let mutator = MockReleaseMutator::with_release(release());
        mutator.fail_with("upgrade rejected");

        let err = mutator
            .upgrade("myapp", "default", &release().chart, &Values::new())
            .await
            .unwrap_err();
        assert!(err.to_string().contains("upgrade rejected"));
        assert_eq!(mutator.calls().len(), 1);
    }
}
