//! Operation requests derived from release values

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::{CoreError, Result};
use crate::release::Release;
use crate::values::{Lookup, Values};

pub const BACKUP_ENABLED: &str = "backup.enabled";
pub const BACKUP_NAME: &str = "backup.backupName";
pub const BACKUP_TTL: &str = "backup.ttl";
pub const RESTORE_ENABLED: &str = "restore.enabled";
pub const RESTORE_BACKUP_NAME: &str = "restore.backupName";
pub const SNAPSHOT_ENABLED: &str = "snapshot.enabled";

/// Kind of operation the backup controller runs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OperationKind {
    Backup,
    Restore,
}

impl OperationKind {
    /// Resource kind as the controller names it
    pub fn as_str(&self) -> &'static str {
        match self {
            OperationKind::Backup => "Backup",
            OperationKind::Restore => "Restore",
        }
    }

    /// Plural resource name used in API paths
    pub fn plural(&self) -> &'static str {
        match self {
            OperationKind::Backup => "backups",
            OperationKind::Restore => "restores",
        }
    }
}

impl std::fmt::Display for OperationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for OperationKind {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "backup" | "backups" => Ok(OperationKind::Backup),
            "restore" | "restores" => Ok(OperationKind::Restore),
            other => Err(CoreError::InvalidValue {
                path: "kind".to_string(),
                message: format!("unknown operation kind '{}'", other),
            }),
        }
    }
}

/// What a hook invocation should do, computed once from release values
#[derive(Debug, Clone, PartialEq)]
pub enum OperationRequest {
    None,
    Backup(BackupRequest),
    Restore(RestoreRequest),
}

#[derive(Debug, Clone, PartialEq)]
pub struct BackupRequest {
    /// Explicit `backup.backupName`, if configured
    pub name: Option<String>,
    /// `backup.ttl` override of the configured retention
    pub ttl: Option<Duration>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RestoreRequest {
    /// Backup to restore from
    pub backup_name: String,
}

impl OperationRequest {
    pub fn kind(&self) -> Option<OperationKind> {
        match self {
            OperationRequest::None => None,
            OperationRequest::Backup(_) => Some(OperationKind::Backup),
            OperationRequest::Restore(_) => Some(OperationKind::Restore),
        }
    }

    /// Decide which operation the release asks for
    ///
    /// Backup is only requested on the first revision. Both flags set is an
    /// error rather than a choice.
    pub fn from_release(release: &Release) -> Result<Self> {
        let values = &release.values;
        ensure_exclusive(values)?;

        if values.flag(RESTORE_ENABLED)? {
            return Ok(OperationRequest::Restore(RestoreRequest::from_values(values)?));
        }

        if values.flag(BACKUP_ENABLED)? && release.is_first_revision() {
            return Ok(OperationRequest::Backup(BackupRequest::from_values(values)?));
        }

        Ok(OperationRequest::None)
    }
}

impl BackupRequest {
    pub fn from_values(values: &Values) -> Result<Self> {
        let ttl = match values.optional_str(BACKUP_TTL)? {
            Some(raw) => Some(parse_ttl(&raw)?),
            None => None,
        };

        Ok(Self {
            name: values.optional_str(BACKUP_NAME)?,
            ttl,
        })
    }
}

impl RestoreRequest {
    /// Fails when `restore.backupName` is missing, empty or not a string
    pub fn from_values(values: &Values) -> Result<Self> {
        Ok(Self {
            backup_name: values.required_str(RESTORE_BACKUP_NAME)?,
        })
    }
}

fn parse_ttl(raw: &str) -> Result<Duration> {
    humantime_serde::re::humantime::parse_duration(raw).map_err(|e| CoreError::InvalidValue {
        path: BACKUP_TTL.to_string(),
        message: e.to_string(),
    })
}

/// Backup and restore must not both be requested
///
/// Absent or non-boolean flags count as not enabled. Returns false only
/// when both resolve to `true`.
pub fn validate_exclusive(values: &Values) -> bool {
    let backup = values.lookup::<bool>(BACKUP_ENABLED) == Lookup::Present(true);
    let restore = values.lookup::<bool>(RESTORE_ENABLED) == Lookup::Present(true);
    !(backup && restore)
}

/// `validate_exclusive` as a `Result`
pub fn ensure_exclusive(values: &Values) -> Result<()> {
    if validate_exclusive(values) {
        Ok(())
    } else {
        Err(CoreError::ConflictingOperations)
    }
}
