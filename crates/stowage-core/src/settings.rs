//! Operation settings
//!
//! Everything the backup/restore builders and the poller need that is not
//! part of a release's values: CR naming, storage location, retention,
//! restore exclusions and poll timing. Loaded from a YAML document such as:
//!
//! ```yaml
//! apiVersion: velero.io/v1
//! namespace: velero
//! backup:
//!   namePrefix: matrix-backup
//!   ttl: 30d
//! poll:
//!   maxWait: 30m
//! ```

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::error::{CoreError, Result};

/// Environment variable pointing at a settings file
pub const SETTINGS_ENV: &str = "STOWAGE_CONFIG";

/// Top-level settings document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct OperationSettings {
    /// API version of the backup controller's resources
    pub api_version: String,

    /// Namespace the backup controller watches for Backup/Restore CRs
    pub namespace: String,

    pub backup: BackupSettings,

    pub restore: RestoreSettings,

    pub snapshot: SnapshotSettings,

    pub poll: PollSettings,
}

impl Default for OperationSettings {
    fn default() -> Self {
        Self {
            api_version: "velero.io/v1".to_string(),
            namespace: "default".to_string(),
            backup: BackupSettings::default(),
            restore: RestoreSettings::default(),
            snapshot: SnapshotSettings::default(),
            poll: PollSettings::default(),
        }
    }
}

impl OperationSettings {
    /// Load settings from a YAML file
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Parse and validate settings from a YAML string
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let settings: Self = if yaml.trim().is_empty() {
            Self::default()
        } else {
            serde_yaml::from_str(yaml)?
        };
        settings.validate()?;
        Ok(settings)
    }

    /// Load from an explicit path, then `$STOWAGE_CONFIG`, then defaults
    pub fn resolve(path: Option<&Path>) -> Result<Self> {
        if let Some(path) = path {
            return Self::load_from(path);
        }
        match std::env::var_os(SETTINGS_ENV) {
            Some(env_path) if !env_path.is_empty() => Self::load_from(Path::new(&env_path)),
            _ => Ok(Self::default()),
        }
    }

    /// Check invariants serde cannot express
    pub fn validate(&self) -> Result<()> {
        let non_empty = [
            ("apiVersion", &self.api_version),
            ("namespace", &self.namespace),
            ("backup.namePrefix", &self.backup.name_prefix),
            ("backup.storageLocation", &self.backup.storage_location),
            ("backup.clearFlag", &self.backup.clear_flag),
            ("restore.name", &self.restore.name),
        ];
        for (field, value) in non_empty {
            if value.trim().is_empty() {
                return Err(CoreError::InvalidSettings {
                    message: format!("{} must not be empty", field),
                });
            }
        }

        if !self.api_version.contains('/') {
            return Err(CoreError::InvalidSettings {
                message: format!(
                    "apiVersion must be <group>/<version>, got '{}'",
                    self.api_version
                ),
            });
        }

        self.poll.validate()
    }

    /// API group of the backup controller (e.g. `velero.io`)
    pub fn api_group(&self) -> &str {
        self.api_version
            .split_once('/')
            .map(|(group, _)| group)
            .unwrap_or("")
    }

    /// API version without the group (e.g. `v1`)
    pub fn api_version_only(&self) -> &str {
        self.api_version
            .split_once('/')
            .map(|(_, version)| version)
            .unwrap_or(&self.api_version)
    }
}

/// How backups without an explicit name are named
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BackupNaming {
    /// `<prefix>-<release>-<revision>`
    #[default]
    Revision,
    /// `<prefix>-<release>-<YYYYMMDDHHMMSS>`
    Timestamp,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BackupSettings {
    pub name_prefix: String,

    pub naming: BackupNaming,

    /// Backup storage location the controller writes to
    pub storage_location: String,

    /// Value of the `velero.io/storage-location` label
    pub storage_location_label: String,

    /// Retention before the controller garbage-collects the backup
    #[serde(with = "humantime_serde")]
    pub ttl: Duration,

    /// Namespaces to back up; empty means the release namespace
    pub include_namespaces: Vec<String>,

    /// Value set to `false` once the first-revision backup completed
    pub clear_flag: String,
}

impl Default for BackupSettings {
    fn default() -> Self {
        Self {
            name_prefix: "matrix-backup".to_string(),
            naming: BackupNaming::Revision,
            storage_location: "matrix-backup".to_string(),
            storage_location_label: "default".to_string(),
            ttl: Duration::from_secs(720 * 3600),
            include_namespaces: Vec::new(),
            clear_flag: "backup.enabled".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RestoreSettings {
    /// Name of the Restore CR
    pub name: String,

    /// Resources that must never be restored
    pub excluded_resources: Vec<String>,

    /// Restore persistent volume data
    #[serde(rename = "restorePVs")]
    pub restore_pvs: bool,

    /// Boolean values switched off before a restore is submitted
    pub disable_before_restore: Vec<String>,

    /// Also clear `restore.enabled` once the restore completed
    pub clear_flag_on_success: bool,
}

impl Default for RestoreSettings {
    fn default() -> Self {
        Self {
            name: "matrix-restore".to_string(),
            excluded_resources: default_excluded_resources(),
            restore_pvs: true,
            disable_before_restore: vec!["postgresql.enabled".to_string()],
            clear_flag_on_success: false,
        }
    }
}

/// Cluster-scoped noise and the controller's own CRs
fn default_excluded_resources() -> Vec<String> {
    [
        "nodes",
        "events",
        "events.events.k8s.io",
        "backups.velero.io",
        "restores.velero.io",
        "resticrepositories.velero.io",
    ]
    .into_iter()
    .map(str::to_string)
    .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SnapshotSettings {
    /// Block the pre-operation hook until the snapshot completed
    pub wait_for_completion: bool,
}

impl Default for SnapshotSettings {
    fn default() -> Self {
        Self {
            wait_for_completion: true,
        }
    }
}

/// Poll timing for the completion watcher
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PollSettings {
    #[serde(with = "humantime_serde")]
    pub initial_interval: Duration,

    #[serde(with = "humantime_serde")]
    pub max_interval: Duration,

    pub multiplier: f64,

    /// Give up waiting for a terminal phase after this long
    #[serde(with = "humantime_serde")]
    pub max_wait: Duration,

    /// Consecutive failed reads tolerated before giving up
    pub max_read_errors: u32,
}

impl Default for PollSettings {
    fn default() -> Self {
        Self {
            initial_interval: Duration::from_secs(2),
            max_interval: Duration::from_secs(30),
            multiplier: 2.0,
            max_wait: Duration::from_secs(3600),
            max_read_errors: 5,
        }
    }
}

impl PollSettings {
    fn validate(&self) -> Result<()> {
        if self.initial_interval.is_zero() {
            return Err(CoreError::InvalidSettings {
                message: "poll.initialInterval must be positive".to_string(),
            });
        }
        if self.max_interval < self.initial_interval {
            return Err(CoreError::InvalidSettings {
                message: "poll.maxInterval must not be shorter than poll.initialInterval"
                    .to_string(),
            });
        }
        if !self.multiplier.is_finite() || self.multiplier < 1.0 {
            return Err(CoreError::InvalidSettings {
                message: format!("poll.multiplier must be >= 1.0, got {}", self.multiplier),
            });
        }
        if self.max_wait.is_zero() {
            return Err(CoreError::InvalidSettings {
                message: "poll.maxWait must be positive".to_string(),
            });
        }
        Ok(())
    }

    /// Delay before the poll following `delay`
    pub fn next_interval(&self, delay: Duration) -> Duration {
        delay.mul_f64(self.multiplier).min(self.max_interval)
    }
}
