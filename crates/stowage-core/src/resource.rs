//! Backup and Restore custom resources
//!
//! The documents built here follow the backup controller's schema exactly:
//!
//! ```yaml
//! apiVersion: velero.io/v1
//! kind: Backup
//! metadata:
//!   name: matrix-backup-myapp-1
//!   namespace: default
//!   labels:
//!     velero.io/storage-location: default
//! spec:
//!   hooks: {}
//!   includeNamespaces: [default]
//!   storageLocation: matrix-backup
//!   ttl: 720h0m0s
//! ```
//!
//! The `status` sub-document belongs to the controller; the core only reads it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::collections::BTreeMap;
use std::time::Duration;

use crate::error::Result;
use crate::operation::{BackupRequest, OperationKind, RestoreRequest};
use crate::release::Release;
use crate::settings::{BackupNaming, OperationSettings};

/// Label binding a backup to a storage location
pub const STORAGE_LOCATION_LABEL: &str = "velero.io/storage-location";

/// A Backup or Restore custom resource
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OperationResource {
    pub api_version: String,

    pub kind: OperationKind,

    pub metadata: ResourceMetadata,

    #[serde(default)]
    pub spec: JsonValue,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<OperationStatus>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceMetadata {
    pub name: String,

    pub namespace: String,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub labels: BTreeMap<String, String>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub annotations: BTreeMap<String, String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_version: Option<String>,
}

/// Spec of a Backup resource
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackupSpec {
    #[serde(default)]
    pub hooks: serde_json::Map<String, JsonValue>,

    #[serde(default)]
    pub include_namespaces: Vec<String>,

    pub storage_location: String,

    /// Go duration string, e.g. `720h0m0s`
    pub ttl: String,
}

/// Spec of a Restore resource
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RestoreSpec {
    pub backup_name: String,

    #[serde(default)]
    pub excluded_resources: Vec<String>,

    #[serde(rename = "restorePVs", default)]
    pub restore_pvs: bool,
}

/// Status written by the backup controller
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OperationStatus {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phase: Option<Phase>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub errors: Option<u32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub warnings: Option<u32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure_reason: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub validation_errors: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_timestamp: Option<DateTime<Utc>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completion_timestamp: Option<DateTime<Utc>>,
}

impl OperationStatus {
    pub fn with_phase(phase: Phase) -> Self {
        Self {
            phase: Some(phase),
            ..Default::default()
        }
    }

    /// One-line description of what went wrong, for error messages
    pub fn diagnostics(&self) -> String {
        let mut parts = Vec::new();
        if let Some(reason) = &self.failure_reason {
            parts.push(reason.clone());
        }
        if !self.validation_errors.is_empty() {
            parts.push(format!(
                "validation errors: {}",
                self.validation_errors.join("; ")
            ));
        }
        if let Some(errors) = self.errors.filter(|n| *n > 0) {
            parts.push(format!("{} error(s)", errors));
        }
        if let Some(warnings) = self.warnings.filter(|n| *n > 0) {
            parts.push(format!("{} warning(s)", warnings));
        }
        if parts.is_empty() {
            "no diagnostics reported".to_string()
        } else {
            parts.join(", ")
        }
    }
}

/// Progress of an operation as reported by the controller
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Phase {
    New,
    InProgress,
    Completed,
    Failed,
    PartiallyFailed,
    FailedValidation,
    #[serde(other)]
    Unknown,
}

impl Phase {
    pub fn is_terminal(&self) -> bool {
        self.is_success() || self.is_failure()
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Phase::Completed)
    }

    pub fn is_failure(&self) -> bool {
        matches!(
            self,
            Phase::Failed | Phase::PartiallyFailed | Phase::FailedValidation
        )
    }
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Phase::New => "New",
            Phase::InProgress => "InProgress",
            Phase::Completed => "Completed",
            Phase::Failed => "Failed",
            Phase::PartiallyFailed => "PartiallyFailed",
            Phase::FailedValidation => "FailedValidation",
            Phase::Unknown => "Unknown",
        };
        f.write_str(s)
    }
}

impl OperationResource {
    /// Phase reported by the controller, `None` until it reconciled the resource
    pub fn phase(&self) -> Option<Phase> {
        self.status.as_ref().and_then(|s| s.phase)
    }

    /// `Kind namespace/name`, for log lines and errors
    pub fn display_name(&self) -> String {
        format!(
            "{} {}/{}",
            self.kind, self.metadata.namespace, self.metadata.name
        )
    }

    /// Parse the spec of a Backup resource
    pub fn backup_spec(&self) -> Result<BackupSpec> {
        Ok(serde_json::from_value(self.spec.clone())?)
    }

    /// Parse the spec of a Restore resource
    pub fn restore_spec(&self) -> Result<RestoreSpec> {
        Ok(serde_json::from_value(self.spec.clone())?)
    }
}

/// Default name of a backup for a release
pub fn backup_name(release: &Release, settings: &OperationSettings) -> String {
    let suffix = match settings.backup.naming {
        BackupNaming::Revision => release.revision.to_string(),
        BackupNaming::Timestamp => release.last_deployed.format("%Y%m%d%H%M%S").to_string(),
    };
    format!("{}-{}-{}", settings.backup.name_prefix, release.name, suffix)
}

/// Build the Backup resource for a release
pub fn build_backup(
    release: &Release,
    request: &BackupRequest,
    settings: &OperationSettings,
) -> OperationResource {
    let name = request
        .name
        .clone()
        .unwrap_or_else(|| backup_name(release, settings));
    let ttl = request.ttl.unwrap_or(settings.backup.ttl);
    backup_resource(release, name, ttl, settings)
}

/// Build a snapshot Backup taken before a release operation
///
/// Named `<prefix>-<release>-<label>-<revision>` so snapshots of different
/// operations and revisions never collide.
pub fn build_snapshot(
    release: &Release,
    label: &str,
    settings: &OperationSettings,
) -> OperationResource {
    let name = format!(
        "{}-{}-{}-{}",
        settings.backup.name_prefix, release.name, label, release.revision
    );
    backup_resource(release, name, settings.backup.ttl, settings)
}

fn backup_resource(
    release: &Release,
    name: String,
    ttl: Duration,
    settings: &OperationSettings,
) -> OperationResource {
    let include_namespaces = if settings.backup.include_namespaces.is_empty() {
        vec![release.namespace.clone()]
    } else {
        settings.backup.include_namespaces.clone()
    };

    let spec = BackupSpec {
        hooks: serde_json::Map::new(),
        include_namespaces,
        storage_location: settings.backup.storage_location.clone(),
        ttl: go_duration(ttl),
    };

    let mut labels = BTreeMap::new();
    labels.insert(
        STORAGE_LOCATION_LABEL.to_string(),
        settings.backup.storage_location_label.clone(),
    );

    OperationResource {
        api_version: settings.api_version.clone(),
        kind: OperationKind::Backup,
        metadata: ResourceMetadata {
            name,
            namespace: settings.namespace.clone(),
            labels,
            ..Default::default()
        },
        spec: to_spec(&spec),
        status: None,
    }
}

/// Build the Restore resource for a release
///
/// Fails without building anything when `restore.backupName` is missing.
pub fn build_restore(release: &Release, settings: &OperationSettings) -> Result<OperationResource> {
    let request = RestoreRequest::from_values(&release.values)?;
    Ok(build_restore_for(&request, settings))
}

/// Build the Restore resource for an already validated request
pub fn build_restore_for(request: &RestoreRequest, settings: &OperationSettings) -> OperationResource {
    let spec = RestoreSpec {
        backup_name: request.backup_name.clone(),
        excluded_resources: settings.restore.excluded_resources.clone(),
        restore_pvs: settings.restore.restore_pvs,
    };

    OperationResource {
        api_version: settings.api_version.clone(),
        kind: OperationKind::Restore,
        metadata: ResourceMetadata {
            name: settings.restore.name.clone(),
            namespace: settings.namespace.clone(),
            ..Default::default()
        },
        spec: to_spec(&spec),
        status: None,
    }
}

fn to_spec<T: Serialize>(spec: &T) -> JsonValue {
    // Plain structs of strings, lists and bools always serialize.
    serde_json::to_value(spec).unwrap_or_else(|_| JsonValue::Object(serde_json::Map::new()))
}

/// Format a duration the way Go's `time.Duration.String()` does for whole seconds
pub fn go_duration(duration: Duration) -> String {
    let total = duration.as_secs();
    let hours = total / 3600;
    let minutes = (total % 3600) / 60;
    let seconds = total % 60;

    if hours > 0 {
        format!("{}h{}m{}s", hours, minutes, seconds)
    } else if minutes > 0 {
        format!("{}m{}s", minutes, seconds)
    } else {
        format!("{}s", seconds)
    }
}
