//! Error types for configuration loading and entry resolution.
//!
//! `ConfigError` covers everything that aborts a batch before the first
//! operation runs. `EntryError` is local to one named entry.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::config::ValidationError;

/// Fatal failures raised while loading a batch configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("configuration file {} does not exist", path.display())]
    NotFound { path: PathBuf },
    #[error("failed to read configuration file {}: {source}", path.display())]
    Read { path: PathBuf, source: io::Error },
    #[error("failed to parse configuration file {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("configuration file {} is invalid: {source}", path.display())]
    Validation {
        path: PathBuf,
        source: ValidationError,
    },
    #[error("specification directory {} does not exist or is not a directory", path.display())]
    DirectoryNotFound { path: PathBuf },
    #[error("failed to scan specification directory {}: {source}", path.display())]
    ScanDirectory { path: PathBuf, source: io::Error },
}

/// Failure to turn one entry into an executable descriptor.
#[derive(Debug, Error)]
pub enum EntryError {
    #[error("entry '{entry}': no specification file '{spec}' in {}", directory.display())]
    Unresolved {
        entry: String,
        spec: String,
        directory: PathBuf,
    },
    #[error("specification file {} does not exist", path.display())]
    MissingSpecFile { path: PathBuf },
}
