//! In-memory object store
//!
//! Stands in for the backup controller as well as the API server: every read
//! of a resource advances it along a scripted sequence of statuses, so tests
//! can walk a backup through `New -> InProgress -> Completed` without a
//! cluster.

use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, RwLock};
use stowage_core::{OperationResource, OperationStatus, Phase};

use super::{ObjectStore, ResourceKey};
use crate::error::{KubeError, Result};

#[derive(Default)]
struct MockState {
    resources: HashMap<ResourceKey, OperationResource>,
    /// Statuses applied on successive reads; the last one sticks
    scripts: HashMap<ResourceKey, VecDeque<Option<OperationStatus>>>,
    /// Reads left to fail per key
    read_failures: HashMap<ResourceKey, u32>,
    reject_creates: Option<String>,
    fail_deletes: Option<String>,
    created: Vec<OperationResource>,
    counts: StoreCounts,
}

/// Counts of operations performed for testing assertions
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct StoreCounts {
    pub creates: usize,
    pub gets: usize,
    pub deletes: usize,
}

/// In-memory object store for tests and dry runs
#[derive(Clone, Default)]
pub struct MockObjectStore {
    state: Arc<RwLock<MockState>>,
}

impl MockObjectStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-populate with existing resources
    pub fn with_resources(resources: Vec<OperationResource>) -> Self {
        let store = Self::new();
        {
            let mut state = store.state.write().unwrap();
            for resource in resources {
                state.resources.insert(ResourceKey::of(&resource), resource);
            }
        }
        store
    }

    /// Phases reported on successive reads of `key`
    pub fn script_phases(&self, key: &ResourceKey, phases: impl IntoIterator<Item = Phase>) {
        self.script_statuses(
            key,
            phases
                .into_iter()
                .map(|phase| Some(OperationStatus::with_phase(phase))),
        );
    }

    /// Statuses reported on successive reads of `key`; `None` means the
    /// controller has not written a status yet
    pub fn script_statuses(
        &self,
        key: &ResourceKey,
        statuses: impl IntoIterator<Item = Option<OperationStatus>>,
    ) {
        let mut state = self.state.write().unwrap();
        state
            .scripts
            .insert(key.clone(), statuses.into_iter().collect());
    }

    /// Fail the next `count` reads of `key`
    pub fn fail_reads(&self, key: &ResourceKey, count: u32) {
        let mut state = self.state.write().unwrap();
        state.read_failures.insert(key.clone(), count);
    }

    /// Reject every create with `message`
    pub fn reject_creates(&self, message: impl Into<String>) {
        self.state.write().unwrap().reject_creates = Some(message.into());
    }

    /// Accept creates again
    pub fn accept_creates(&self) {
        self.state.write().unwrap().reject_creates = None;
    }

    /// Fail every delete with `message`
    pub fn fail_deletes(&self, message: impl Into<String>) {
        self.state.write().unwrap().fail_deletes = Some(message.into());
    }

    /// Resources submitted through `create`, in order
    pub fn created(&self) -> Vec<OperationResource> {
        self.state.read().unwrap().created.clone()
    }

    pub fn contains(&self, key: &ResourceKey) -> bool {
        self.state.read().unwrap().resources.contains_key(key)
    }

    pub fn counts(&self) -> StoreCounts {
        self.state.read().unwrap().counts.clone()
    }

    fn not_found(key: &ResourceKey) -> KubeError {
        KubeError::ResourceNotFound {
            kind: key.kind,
            name: key.name.clone(),
            namespace: key.namespace.clone(),
        }
    }
}

#[async_trait]
impl ObjectStore for MockObjectStore {
    async fn create(&self, resource: &OperationResource) -> Result<OperationResource> {
        let mut state = self.state.write().unwrap();
        state.counts.creates += 1;

        if let Some(message) = &state.reject_creates {
            return Err(KubeError::Storage(message.clone()));
        }

        let key = ResourceKey::of(resource);
        if state.resources.contains_key(&key) {
            return Err(KubeError::ResourceAlreadyExists {
                kind: key.kind,
                name: key.name,
                namespace: key.namespace,
            });
        }

        let mut stored = resource.clone();
        stored.status = None;
        stored.metadata.resource_version = Some("1".to_string());
        state.created.push(stored.clone());
        state.resources.insert(key, stored.clone());
        Ok(stored)
    }

    async fn get(&self, key: &ResourceKey) -> Result<OperationResource> {
        let mut state = self.state.write().unwrap();
        state.counts.gets += 1;

        if let Some(remaining) = state.read_failures.get_mut(key)
            && *remaining > 0
        {
            *remaining -= 1;
            return Err(KubeError::Storage(format!("injected read failure for {}", key)));
        }

        let next_status = match state.scripts.get_mut(key) {
            Some(script) if script.len() > 1 => script.pop_front(),
            Some(script) => script.front().cloned(),
            None => None,
        };

        let resource = state
            .resources
            .get_mut(key)
            .ok_or_else(|| Self::not_found(key))?;
        if let Some(status) = next_status {
            resource.status = status;
        }
        Ok(resource.clone())
    }

    async fn delete(&self, key: &ResourceKey) -> Result<()> {
        let mut state = self.state.write().unwrap();
        state.counts.deletes += 1;

        if let Some(message) = &state.fail_deletes {
            return Err(KubeError::Storage(message.clone()));
        }

        state
            .resources
            .remove(key)
            .map(|_| ())
            .ok_or_else(|| Self::not_found(key))
    }
}
