//! Mock storage driver for testing
//!
//! Stores releases in memory, useful for unit tests without a cluster.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use stowage_core::Release;

use super::{StorageDriver, already_exists, not_found};
use crate::error::Result;

/// namespace -> name -> revision -> release
type ReleaseMap = HashMap<String, HashMap<String, HashMap<u32, Release>>>;

/// In-memory storage driver for testing
#[derive(Clone, Default)]
pub struct MockStorageDriver {
    store: Arc<RwLock<ReleaseMap>>,
    /// Track operation counts for assertions
    operations: Arc<RwLock<OperationCounts>>,
}

/// Counts of operations performed for testing assertions
#[derive(Debug, Default, Clone)]
pub struct OperationCounts {
    pub gets: usize,
    pub creates: usize,
    pub updates: usize,
}

impl MockStorageDriver {
    /// Create a new empty mock driver
    pub fn new() -> Self {
        Self::default()
    }

    /// Create with pre-populated releases
    pub fn with_releases(releases: Vec<Release>) -> Self {
        let driver = Self::new();
        {
            let mut store = driver.store.write().unwrap();
            for release in releases {
                store
                    .entry(release.namespace.clone())
                    .or_default()
                    .entry(release.name.clone())
                    .or_default()
                    .insert(release.revision, release);
            }
        }
        driver
    }

    /// Get operation counts for assertions
    pub fn operation_counts(&self) -> OperationCounts {
        self.operations.read().unwrap().clone()
    }

    /// Count stored revisions across all releases
    pub fn release_count(&self) -> usize {
        let store = self.store.read().unwrap();
        store
            .values()
            .flat_map(|ns| ns.values())
            .map(|revisions| revisions.len())
            .sum()
    }

    fn revisions(&self, namespace: &str, name: &str) -> Vec<Release> {
        let store = self.store.read().unwrap();
        let mut releases: Vec<Release> = store
            .get(namespace)
            .and_then(|ns| ns.get(name))
            .map(|revisions| revisions.values().cloned().collect())
            .unwrap_or_default();
        releases.sort_by(|a, b| b.revision.cmp(&a.revision));
        releases
    }
}

#[async_trait]
impl StorageDriver for MockStorageDriver {
    async fn get(&self, namespace: &str, name: &str, revision: u32) -> Result<Release> {
        self.operations.write().unwrap().gets += 1;

        let store = self.store.read().unwrap();
        store
            .get(namespace)
            .and_then(|ns| ns.get(name))
            .and_then(|revisions| revisions.get(&revision))
            .cloned()
            .ok_or_else(|| not_found(namespace, name))
    }

    async fn get_latest(&self, namespace: &str, name: &str) -> Result<Release> {
        self.operations.write().unwrap().gets += 1;

        self.revisions(namespace, name)
            .into_iter()
            .next()
            .ok_or_else(|| not_found(namespace, name))
    }

    async fn history(&self, namespace: &str, name: &str) -> Result<Vec<Release>> {
        let releases = self.revisions(namespace, name);
        if releases.is_empty() {
            return Err(not_found(namespace, name));
        }
        Ok(releases)
    }

    async fn create(&self, release: &Release) -> Result<()> {
        self.operations.write().unwrap().creates += 1;

        let mut store = self.store.write().unwrap();
        let revisions = store
            .entry(release.namespace.clone())
            .or_default()
            .entry(release.name.clone())
            .or_default();

        if revisions.contains_key(&release.revision) {
            return Err(already_exists(release));
        }

        revisions.insert(release.revision, release.clone());
        Ok(())
    }

    async fn update(&self, release: &Release) -> Result<()> {
        self.operations.write().unwrap().updates += 1;

        let mut store = self.store.write().unwrap();
        let slot = store
            .get_mut(&release.namespace)
            .and_then(|ns| ns.get_mut(&release.name))
            .and_then(|revisions| revisions.get_mut(&release.revision))
            .ok_or_else(|| not_found(&release.namespace, &release.name))?;

        *slot = release.clone();
        Ok(())
    }
}
