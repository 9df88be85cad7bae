//! Release descriptor types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::values::Values;

/// Revision number of the first deploy of a release
pub const FIRST_REVISION: u32 = 1;

/// A deployed release of an application chart
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Release {
    /// Release name
    pub name: String,

    /// Kubernetes namespace
    pub namespace: String,

    /// Revision number (1-indexed, increments with each upgrade)
    pub revision: u32,

    /// Current status
    #[serde(default)]
    pub status: ReleaseStatus,

    /// Chart the release was deployed from
    pub chart: ChartRef,

    /// Values used for this release
    #[serde(default)]
    pub values: Values,

    /// When the first revision was deployed
    pub first_deployed: DateTime<Utc>,

    /// When this revision was deployed
    pub last_deployed: DateTime<Utc>,
}

impl Release {
    /// Create the first revision of a release
    pub fn new(
        name: impl Into<String>,
        namespace: impl Into<String>,
        chart: ChartRef,
        values: Values,
    ) -> Self {
        let now = Utc::now();
        Self {
            name: name.into(),
            namespace: namespace.into(),
            revision: FIRST_REVISION,
            status: ReleaseStatus::Deployed,
            chart,
            values,
            first_deployed: now,
            last_deployed: now,
        }
    }

    /// Build the next revision carrying the given values
    pub fn next_revision(&self, values: Values) -> Self {
        Self {
            name: self.name.clone(),
            namespace: self.namespace.clone(),
            revision: self.revision + 1,
            status: ReleaseStatus::Deployed,
            chart: self.chart.clone(),
            values,
            first_deployed: self.first_deployed,
            last_deployed: Utc::now(),
        }
    }

    /// Is this the first deploy of the release?
    pub fn is_first_revision(&self) -> bool {
        self.revision == FIRST_REVISION
    }

    /// `namespace/name`, used as a key and in log lines
    pub fn qualified_name(&self) -> String {
        format!("{}/{}", self.namespace, self.name)
    }
}

/// Chart identity of a release
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChartRef {
    pub name: String,
    pub version: semver::Version,
}

impl ChartRef {
    pub fn new(name: impl Into<String>, version: semver::Version) -> Self {
        Self {
            name: name.into(),
            version,
        }
    }
}

impl std::fmt::Display for ChartRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}-{}", self.name, self.version)
    }
}

/// Release status
///
/// Note: This enum is non-exhaustive - new variants may be added in future versions.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
#[non_exhaustive]
pub enum ReleaseStatus {
    #[default]
    Unknown,
    Deployed,
    Superseded,
    Failed,
    PendingUpgrade,
}

impl std::fmt::Display for ReleaseStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Unknown => "unknown",
            Self::Deployed => "deployed",
            Self::Superseded => "superseded",
            Self::Failed => "failed",
            Self::PendingUpgrade => "pending-upgrade",
        };
        write!(f, "{}", s)
    }
}
