//! Object store for Backup and Restore custom resources
//!
//! The orchestrator, poller and reconciler only ever see [`ObjectStore`]:
//! - [`KubeObjectStore`]: the cluster, through `kube::Api<DynamicObject>`
//! - [`MockObjectStore`]: in-memory with scripted phases, for tests and dry runs

mod cluster;
mod mock;

pub use cluster::KubeObjectStore;
pub use mock::{MockObjectStore, StoreCounts};

use async_trait::async_trait;
use stowage_core::{OperationKind, OperationResource};

use crate::error::Result;

/// Identity of a custom resource
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ResourceKey {
    pub kind: OperationKind,
    pub namespace: String,
    pub name: String,
}

impl ResourceKey {
    pub fn new(kind: OperationKind, namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            kind,
            namespace: namespace.into(),
            name: name.into(),
        }
    }

    pub fn of(resource: &OperationResource) -> Self {
        Self::new(
            resource.kind,
            resource.metadata.namespace.clone(),
            resource.metadata.name.clone(),
        )
    }
}

impl std::fmt::Display for ResourceKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}/{}", self.kind, self.namespace, self.name)
    }
}

/// Create, read and delete operation resources
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Submit a new resource; fails with a conflict when the name is taken
    async fn create(&self, resource: &OperationResource) -> Result<OperationResource>;

    /// Fetch the current state of a resource, status included
    async fn get(&self, key: &ResourceKey) -> Result<OperationResource>;

    /// Delete a resource; fails with not-found when it does not exist
    async fn delete(&self, key: &ResourceKey) -> Result<()>;
}

#[async_trait]
impl<T: ObjectStore + ?Sized> ObjectStore for std::sync::Arc<T> {
    async fn create(&self, resource: &OperationResource) -> Result<OperationResource> {
        (**self).create(resource).await
    }

    async fn get(&self, key: &ResourceKey) -> Result<OperationResource> {
        (**self).get(key).await
    }

    async fn delete(&self, key: &ResourceKey) -> Result<()> {
        (**self).delete(key).await
    }
}
