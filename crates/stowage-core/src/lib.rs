//! Stowage Core - Core types for the backup/restore hook orchestrator
//!
//! This crate provides the pure, I/O-free building blocks:
//! - `Values`: Release configuration with typed dotted-path lookups
//! - `Release`: The deployed release descriptor
//! - `OperationRequest`: Which operation a release asks for, and the
//!   backup/restore mutual-exclusion check
//! - `OperationResource`: Backup and Restore custom resources and their builders
//! - `OperationSettings`: Naming, retention, exclusions and poll timing

pub mod error;
pub mod operation;
pub mod release;
pub mod resource;
pub mod settings;
pub mod values;

pub use error::{CoreError, Result};
pub use operation::{
    BackupRequest, OperationKind, OperationRequest, RestoreRequest, ensure_exclusive,
    validate_exclusive,
};
pub use release::{ChartRef, FIRST_REVISION, Release, ReleaseStatus};
pub use resource::{
    BackupSpec, OperationResource, OperationStatus, Phase, ResourceMetadata, RestoreSpec,
    build_backup, build_restore, build_restore_for, build_snapshot,
};
pub use settings::{
    BackupNaming, BackupSettings, OperationSettings, PollSettings, RestoreSettings,
    SnapshotSettings,
};
pub use values::{FromValue, Lookup, Values, parse_set_values};
