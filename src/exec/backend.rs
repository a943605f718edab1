// src/exec/backend.rs

//! Pluggable command runner abstraction.
//!
//! Stages and conditions talk to a `CommandRunner` instead of spawning
//! processes themselves. This makes it easy to swap in
//! [`MockCommandRunner`](super::mock::MockCommandRunner) in tests while
//! keeping the production implementation in [`command`](super::command).

use std::fmt::Debug;
use std::path::PathBuf;

use crate::errors::{DotgraphError, Result};
use crate::types::BoxFuture;

/// Outcome of running an external program.
///
/// On failure, `log_file` points at a file holding the captured stdout and
/// stderr (when the runner managed to write one).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunResult {
    pub success: bool,
    pub log_file: Option<PathBuf>,
    pub error: Option<String>,
}

impl RunResult {
    pub fn success() -> Self {
        Self {
            success: true,
            log_file: None,
            error: None,
        }
    }

    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            success: false,
            log_file: None,
            error: Some(error.into()),
        }
    }

    pub fn with_log_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.log_file = Some(path.into());
        self
    }

    /// Convert into a `Result`, naming `program` in the error.
    pub fn into_result(self, program: &str) -> Result<()> {
        if self.success {
            return Ok(());
        }
        Err(DotgraphError::CommandFailed {
            program: program.to_string(),
            reason: self
                .error
                .unwrap_or_else(|| "exited unsuccessfully".to_string()),
            log_file: self.log_file,
        })
    }
}

/// Trait abstracting how external programs are run and found.
///
/// Production code uses [`RealCommandRunner`](super::RealCommandRunner);
/// tests provide an implementation that doesn't spawn real processes.
pub trait CommandRunner: Send + Sync + Debug {
    /// Run `program` with `args`, capturing its output.
    ///
    /// Dropping the returned future aborts the process.
    fn run<'a>(&'a self, program: &'a str, args: &'a [String]) -> BoxFuture<'a, RunResult>;

    /// Resolve `name` on the search path.
    fn lookup(&self, name: &str) -> Result<PathBuf>;
}
