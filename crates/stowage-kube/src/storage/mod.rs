//! Storage drivers for persisting release revisions
//!
//! The hook binary does not own the deployment system's release records, but
//! it needs somewhere to read the release it runs for and to write the
//! revisions its mutations produce:
//! - **File**: JSON documents under `<base>/<namespace>/<name>/v<revision>.json`
//! - **Mock**: in-memory, for tests and dry runs

mod file;
mod mock;

pub use file::FileDriver;
pub use mock::{MockStorageDriver, OperationCounts};

use async_trait::async_trait;
use stowage_core::Release;

use crate::error::{KubeError, Result};

/// Storage driver trait for release persistence
///
/// Implementations must be Send + Sync for use across async tasks.
#[async_trait]
pub trait StorageDriver: Send + Sync {
    /// Get a specific revision of a release
    async fn get(&self, namespace: &str, name: &str, revision: u32) -> Result<Release>;

    /// Get the latest revision of a release
    async fn get_latest(&self, namespace: &str, name: &str) -> Result<Release>;

    /// All revisions of a release, newest first
    async fn history(&self, namespace: &str, name: &str) -> Result<Vec<Release>>;

    /// Store a new revision
    async fn create(&self, release: &Release) -> Result<()>;

    /// Overwrite an existing revision
    async fn update(&self, release: &Release) -> Result<()>;

    /// Check if a release exists
    async fn exists(&self, namespace: &str, name: &str) -> Result<bool> {
        match self.get_latest(namespace, name).await {
            Ok(_) => Ok(true),
            Err(KubeError::ReleaseNotFound { .. }) => Ok(false),
            Err(e) => Err(e),
        }
    }
}

/// Serialize a release to JSON bytes
pub fn serialize_release(release: &Release) -> Result<Vec<u8>> {
    serde_json::to_vec_pretty(release).map_err(|e| KubeError::Serialization(e.to_string()))
}

/// Deserialize a release from JSON bytes
pub fn deserialize_release(data: &[u8]) -> Result<Release> {
    serde_json::from_slice(data).map_err(|e| KubeError::Serialization(e.to_string()))
}

fn not_found(namespace: &str, name: &str) -> KubeError {
    KubeError::ReleaseNotFound {
        name: name.to_string(),
        namespace: namespace.to_string(),
    }
}

fn already_exists(release: &Release) -> KubeError {
    KubeError::ReleaseAlreadyExists {
        name: release.name.clone(),
        namespace: release.namespace.clone(),
        revision: release.revision,
    }
}
