// src/errors.rs

//! Crate-wide error type and result alias.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum SiteplanError {
    /// The action is not permitted from the node's current status.
    #[error("Invalid state transition: {0}")]
    InvalidStateTransition(String),

    /// The dependency graph would contain (or contains) a cycle.
    #[error("Cycle detected in dependency graph: {0}")]
    CycleDetected(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    /// The per-project runtime task is gone (shut down or panicked).
    #[error("Project runtime closed: {0}")]
    RuntimeClosed(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, SiteplanError>;
