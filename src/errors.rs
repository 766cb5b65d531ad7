// src/errors.rs

//! Crate-wide error types.
//!
//! Each failure class of the reconciliation engine has its own error type so
//! it can be reported at the narrowest scope (one pattern or one path).
//! [`AutoscriptsError`] wraps all of them for collection in a
//! [`CycleReport`](crate::engine::CycleReport).

use std::path::PathBuf;

use thiserror::Error;

/// Boxed cause carried by the errors below.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// A `${command:ID}` placeholder could not be substituted.
#[derive(Error, Debug)]
#[error("cannot expand command `{command}` in pattern `{pattern}`: {source}")]
pub struct ExpansionError {
    pub pattern: String,
    pub command: String,
    #[source]
    pub source: BoxError,
}

/// A fully expanded glob could not be turned into a list of files.
#[derive(Error, Debug)]
pub enum ResolutionError {
    #[error("invalid glob pattern `{pattern}`: {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: globset::Error,
    },

    #[error("cannot traverse {dir:?} for pattern `{pattern}`: {source}")]
    Traversal {
        pattern: String,
        dir: PathBuf,
        #[source]
        source: BoxError,
    },
}

/// A matched script could not be read.
#[derive(Error, Debug)]
#[error("cannot read file {path:?}: {source}")]
pub struct ReadError {
    pub path: PathBuf,
    #[source]
    pub source: BoxError,
}

/// A script failed to start or failed while running.
#[derive(Error, Debug)]
#[error("cannot run file {path:?}: {source}")]
pub struct ExecutionError {
    pub path: PathBuf,
    #[source]
    pub source: BoxError,
}

impl ExecutionError {
    pub fn new(path: impl Into<PathBuf>, source: impl Into<BoxError>) -> Self {
        Self {
            path: path.into(),
            source: source.into(),
        }
    }
}

/// A file watch could not be created, or the OS reported a failure for it.
#[derive(Error, Debug)]
pub enum WatchError {
    #[error("cannot watch {path:?}: {reason}")]
    PathWatchFailed { path: PathBuf, reason: String },

    #[error("cannot start file watcher: {reason}")]
    BackendFailed { reason: String },
}

/// A configuration scope file could not be loaded.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("cannot read settings file {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid settings file {path:?}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

#[derive(Error, Debug)]
pub enum AutoscriptsError {
    #[error(transparent)]
    Expansion(#[from] ExpansionError),

    #[error(transparent)]
    Resolution(#[from] ResolutionError),

    #[error(transparent)]
    Read(#[from] ReadError),

    #[error(transparent)]
    Execution(#[from] ExecutionError),

    #[error(transparent)]
    Watch(#[from] WatchError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, AutoscriptsError>;
