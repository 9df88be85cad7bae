//! CLI commands

use std::path::PathBuf;

pub mod plan;
pub mod run;
pub mod status;

/// Where release records live unless `--storage-dir` says otherwise
pub fn default_storage_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("stowage")
        .join("releases")
}
