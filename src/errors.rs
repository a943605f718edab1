// src/errors.rs

//! Crate-wide error type and result alias.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum DotgraphError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Duplicate stage name: {0}")]
    DuplicateStage(String),

    #[error("Stage not found: {0}")]
    StageNotFound(String),

    #[error("Cycle detected in DAG: {0}")]
    DagCycle(String),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("stage '{stage}' is missing required command '{command}'")]
    MissingCommand { stage: String, command: String },

    #[error("stage '{stage}' failed: {cause:#}")]
    StageFailed { stage: String, cause: anyhow::Error },

    #[error("stage '{stage}' panicked")]
    StagePanicked { stage: String },

    #[error("command not found: {0}")]
    CommandNotFound(String),

    #[error("command '{program}' failed: {reason}{}", log_hint(.log_file))]
    CommandFailed {
        program: String,
        reason: String,
        log_file: Option<PathBuf>,
    },

    #[error("{0}")]
    Unsupported(String),

    #[error("Cancelled: {0}")]
    Cancelled(String),

    #[error("scheduler task failed: {0}")]
    Join(#[from] tokio::task::JoinError),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl DotgraphError {
    /// Name of the stage this error originated from, if it is a run-time
    /// stage failure.
    pub fn stage(&self) -> Option<&str> {
        match self {
            DotgraphError::MissingCommand { stage, .. }
            | DotgraphError::StageFailed { stage, .. }
            | DotgraphError::StagePanicked { stage } => Some(stage),
            _ => None,
        }
    }
}

fn log_hint(log_file: &Option<PathBuf>) -> String {
    match log_file {
        Some(path) => format!(" (see log: {})", path.display()),
        None => String::new(),
    }
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, DotgraphError>;
