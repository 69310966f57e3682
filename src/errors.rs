// src/errors.rs

//! Crate-wide error aliases and helpers.
//!
//! [`StackrunError`] covers failures that reach a caller synchronously
//! (bad config, a process that could not be launched, unreadable files).
//! Failures of a run that *did* start travel on the event stream as
//! [`crate::event::RunError`] instead.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum StackrunError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Launch error: {0}")]
    LaunchError(String),

    #[error("Deployment run failed: {0}")]
    RunFailed(#[from] crate::event::RunError),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("JSON parsing error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, StackrunError>;
