//! Stowage Kube - Kubernetes side of the backup/restore hook orchestrator
//!
//! This crate provides:
//! - **Object Store**: Create, read and delete Backup/Restore custom resources
//! - **Status Poller**: Wait for the backup controller with back-off and cancellation
//! - **Reconciler**: Clear release flags and clean up finished restores
//! - **Orchestrator**: The hook entry points tying it all together
//! - **Storage Drivers**: Persist release revisions locally or in memory

pub mod error;
pub mod hooks;
pub mod mutator;
pub mod orchestrator;
pub mod poller;
pub mod reconciler;
pub mod storage;
pub mod store;

pub use error::{FailureCategory, KubeError, Result};
pub use hooks::HookPhase;
pub use mutator::{MockReleaseMutator, ReleaseMutator, StorageReleaseMutator, UpgradeCall};
pub use orchestrator::{HookOutcome, Orchestrator, PlannedStep, SkipReason, plan};
pub use poller::{StatusPoller, WaitSchedule};
pub use reconciler::Reconciler;
pub use storage::{FileDriver, MockStorageDriver, OperationCounts, StorageDriver};
pub use store::{KubeObjectStore, MockObjectStore, ObjectStore, ResourceKey, StoreCounts};
