//! Error types for stowage-kube

use stowage_core::{CoreError, OperationKind, Phase};
use thiserror::Error;

/// Result type for stowage-kube operations
pub type Result<T> = std::result::Result<T, KubeError>;

/// Errors that can occur while driving a backup or restore
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum KubeError {
    /// Release values are contradictory, incomplete or malformed
    #[error("configuration error: {message}")]
    Configuration { message: String },

    /// The object store rejected the new resource
    #[error("failed to submit {resource}: {source}")]
    Submission {
        resource: String,
        #[source]
        source: Box<KubeError>,
    },

    /// No terminal phase within the wait budget
    #[error("timed out waiting for {resource} after {waited}: {cause}")]
    Timeout {
        resource: String,
        waited: String,
        cause: String,
    },

    /// The backup controller reported a terminal failure
    #[error("{resource} ended in phase {phase}: {diagnostics}")]
    OperationFailed {
        resource: String,
        phase: Phase,
        diagnostics: String,
    },

    /// The operation succeeded but the release could not be updated
    #[error("failed to update release '{release}' after {step}: {source}\nHint: the {step} itself succeeded; retry the release update or clear the flag by hand")]
    Reconcile {
        release: String,
        step: String,
        #[source]
        source: Box<KubeError>,
    },

    /// The caller gave up waiting
    #[error("wait for {resource} was cancelled")]
    Cancelled { resource: String },

    /// Kubernetes API error
    #[error("Kubernetes API error: {0}")]
    Api(#[from] kube::Error),

    /// Resource not found in the object store
    #[error("{kind} '{name}' not found in namespace '{namespace}'")]
    ResourceNotFound {
        kind: OperationKind,
        name: String,
        namespace: String,
    },

    /// Resource name already taken
    #[error("{kind} '{name}' already exists in namespace '{namespace}'")]
    ResourceAlreadyExists {
        kind: OperationKind,
        name: String,
        namespace: String,
    },

    /// Release not found
    #[error("release '{name}' not found in namespace '{namespace}'")]
    ReleaseNotFound { name: String, namespace: String },

    /// Release already exists
    #[error("release '{name}' revision {revision} already exists in namespace '{namespace}'")]
    ReleaseAlreadyExists {
        name: String,
        namespace: String,
        revision: u32,
    },

    /// Storage error
    #[error("storage error: {0}")]
    Storage(String),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Coarse classification of a failure, logged with every hook error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureCategory {
    Configuration,
    Submission,
    Timeout,
    Operation,
    Reconcile,
    Cancelled,
    Store,
}

impl std::fmt::Display for FailureCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            FailureCategory::Configuration => "configuration",
            FailureCategory::Submission => "submission",
            FailureCategory::Timeout => "timeout",
            FailureCategory::Operation => "operation",
            FailureCategory::Reconcile => "reconcile",
            FailureCategory::Cancelled => "cancelled",
            FailureCategory::Store => "store",
        };
        f.write_str(s)
    }
}

impl From<serde_json::Error> for KubeError {
    fn from(e: serde_json::Error) -> Self {
        KubeError::Serialization(e.to_string())
    }
}

impl From<CoreError> for KubeError {
    fn from(e: CoreError) -> Self {
        match e {
            CoreError::Io(io) => KubeError::Io(io),
            e if e.is_configuration() => KubeError::Configuration {
                message: e.to_string(),
            },
            e => KubeError::Serialization(e.to_string()),
        }
    }
}

impl KubeError {
    pub fn category(&self) -> FailureCategory {
        match self {
            KubeError::Configuration { .. } => FailureCategory::Configuration,
            KubeError::Submission { .. } => FailureCategory::Submission,
            KubeError::Timeout { .. } => FailureCategory::Timeout,
            KubeError::OperationFailed { .. } => FailureCategory::Operation,
            KubeError::Reconcile { .. } => FailureCategory::Reconcile,
            KubeError::Cancelled { .. } => FailureCategory::Cancelled,
            _ => FailureCategory::Store,
        }
    }

    /// Check if this is a not found error (typed or Kubernetes 404)
    pub fn is_not_found(&self) -> bool {
        match self {
            KubeError::ResourceNotFound { .. } | KubeError::ReleaseNotFound { .. } => true,
            KubeError::Api(kube::Error::Api(resp)) => resp.code == 404,
            _ => false,
        }
    }

    /// Check if this is a conflict error (typed or Kubernetes 409)
    pub fn is_conflict(&self) -> bool {
        match self {
            KubeError::ResourceAlreadyExists { .. } | KubeError::ReleaseAlreadyExists { .. } => {
                true
            }
            KubeError::Api(kube::Error::Api(resp)) => resp.code == 409,
            _ => false,
        }
    }
}
