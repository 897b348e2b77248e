//! Error types for stackscan-core

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Errors loading the target configuration; all fatal before any connection
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Config file could not be read
    #[error("failed to read config {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Document is not valid YAML/JSON or has the wrong shape
    #[error("invalid config: {0}")]
    Parse(String),

    /// One target entry is malformed
    #[error("target #{index}: {reason}")]
    Target { index: usize, reason: String },
}

/// Errors persisting run artifacts
#[derive(Error, Debug)]
pub enum PersistError {
    /// Run directory could not be created; nothing can be saved without it
    #[error("failed to create run directory {}: {source}", path.display())]
    CreateDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// One per-target report could not be written; costs that artifact only
    #[error("failed to write report {}: {source}", path.display())]
    WriteReport {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Run index could not be written; the run loses its only summary record
    #[error("failed to write index {}: {source}", path.display())]
    WriteIndex {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}
