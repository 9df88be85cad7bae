//! CLI error types with exit code handling
//!
//! Every failure of a hook maps to one variant, so the deployment system
//! running `stowage run` can tell a bad configuration from a failed backup
//! by exit code alone.

use miette::Diagnostic;
use stowage_core::CoreError;
use stowage_kube::{FailureCategory, KubeError};
use thiserror::Error;

use crate::exit_codes;

/// CLI-specific error type that includes exit code information
#[derive(Error, Debug, Diagnostic)]
pub enum CliError {
    /// Release values or settings are invalid
    #[error("Configuration error: {message}")]
    #[diagnostic(code(stowage::cli::configuration))]
    Configuration {
        message: String,
        #[help]
        help: Option<String>,
    },

    /// The cluster refused the custom resource
    #[error("{message}")]
    #[diagnostic(
        code(stowage::cli::submission),
        help("check that the backup controller's CRDs are installed and the service account may create them")
    )]
    Submission { message: String },

    /// The operation did not finish in time
    #[error("{message}")]
    #[diagnostic(
        code(stowage::cli::timeout),
        help("raise poll.maxWait in the settings file, or inspect the resource with `stowage status`")
    )]
    Timeout { message: String },

    /// The backup controller reported a failure
    #[error("{message}")]
    #[diagnostic(code(stowage::cli::operation_failed))]
    OperationFailed { message: String },

    /// The operation succeeded but the release could not be updated
    #[error("{message}")]
    #[diagnostic(code(stowage::cli::reconcile))]
    Reconcile { message: String },

    /// Interrupted by the user
    #[error("Interrupted: {message}")]
    #[diagnostic(code(stowage::cli::cancelled))]
    Cancelled { message: String },

    /// Kubernetes API or release storage failure
    #[error("{message}")]
    #[diagnostic(code(stowage::cli::store))]
    Store {
        message: String,
        #[help]
        help: Option<String>,
    },

    /// IO error (file not found, permissions, etc.)
    #[error("IO error: {message}")]
    #[diagnostic(code(stowage::cli::io))]
    Io { message: String },
}

impl CliError {
    /// Get the exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::Configuration { .. } => exit_codes::CONFIGURATION_ERROR,
            CliError::Submission { .. } => exit_codes::SUBMISSION_ERROR,
            CliError::Timeout { .. } => exit_codes::TIMEOUT,
            CliError::OperationFailed { .. } => exit_codes::OPERATION_FAILED,
            CliError::Reconcile { .. } => exit_codes::RECONCILE_ERROR,
            CliError::Cancelled { .. } => exit_codes::CANCELLED,
            CliError::Store { .. } => exit_codes::ERROR,
            CliError::Io { .. } => exit_codes::IO_ERROR,
        }
    }

    /// Create a configuration error
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
            help: None,
        }
    }
}

impl From<std::io::Error> for CliError {
    fn from(err: std::io::Error) -> Self {
        CliError::Io {
            message: err.to_string(),
        }
    }
}

impl From<serde_json::Error> for CliError {
    fn from(err: serde_json::Error) -> Self {
        CliError::Io {
            message: err.to_string(),
        }
    }
}

impl From<serde_yaml::Error> for CliError {
    fn from(err: serde_yaml::Error) -> Self {
        CliError::Io {
            message: err.to_string(),
        }
    }
}

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::Io(io) => io.into(),
            other => CliError::configuration(other.to_string()),
        }
    }
}

impl From<KubeError> for CliError {
    fn from(err: KubeError) -> Self {
        let message = err.to_string();
        match err.category() {
            FailureCategory::Configuration => CliError::configuration(message),
            FailureCategory::Submission => CliError::Submission { message },
            FailureCategory::Timeout => CliError::Timeout { message },
            FailureCategory::Operation => CliError::OperationFailed { message },
            FailureCategory::Reconcile => CliError::Reconcile { message },
            FailureCategory::Cancelled => CliError::Cancelled { message },
            FailureCategory::Store => {
                let help = match &err {
                    KubeError::ReleaseNotFound { .. } => Some(
                        "release records are read from --storage-dir (default: <data dir>/stowage/releases)"
                            .to_string(),
                    ),
                    KubeError::Api(_) => {
                        Some("check the kubeconfig context and cluster connectivity".to_string())
                    }
                    _ => None,
                };
                CliError::Store { message, help }
            }
        }
    }
}

/// Result type for CLI operations
pub type Result<T> = std::result::Result<T, CliError>;
