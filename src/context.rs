// src/context.rs

//! Per-run execution context shared by every stage and condition.

use std::any::Any;
use std::fmt;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::condition::expand_path;
use crate::errors::{DotgraphError, Result};
use crate::exec::CommandRunner;
use crate::pkg::PackageInstaller;

/// Platform name of the running machine, using `darwin` for macOS.
pub fn current_os() -> &'static str {
    match std::env::consts::OS {
        "macos" => "darwin",
        other => other,
    }
}

/// Runtime environment information.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Environment {
    /// Operating system, e.g. `"darwin"` or `"linux"`.
    pub os: String,
    /// CPU architecture, e.g. `"x86_64"` or `"aarch64"`.
    pub arch: String,
    /// Base directory for file operations (normally `$HOME`).
    pub work_dir: PathBuf,
}

impl Environment {
    pub fn new(
        os: impl Into<String>,
        arch: impl Into<String>,
        work_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            os: os.into(),
            arch: arch.into(),
            work_dir: work_dir.into(),
        }
    }

    /// Detect the environment of the current process.
    ///
    /// The work dir is `$HOME`, falling back to the platform home directory.
    pub fn detect() -> Result<Self> {
        let work_dir = std::env::var_os("HOME")
            .filter(|home| !home.is_empty())
            .map(PathBuf::from)
            .or_else(dirs::home_dir)
            .ok_or_else(|| {
                DotgraphError::ConfigError("could not determine home directory".to_string())
            })?;

        Ok(Self::new(current_os(), std::env::consts::ARCH, work_dir))
    }
}

/// Run-wide options.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunOptions {
    /// Handlers should describe changes instead of making them.
    pub dry_run: bool,
    pub verbose: bool,
}

/// Everything a stage handler or condition may consult.
///
/// Built once before the graph executes and shared read-only (behind an
/// `Arc`) by all concurrently running stages.
pub struct ExecutionContext {
    pub env: Environment,
    pub runner: Arc<dyn CommandRunner>,
    pub installer: Arc<dyn PackageInstaller>,
    pub options: RunOptions,
    cancel: CancellationToken,
    user_data: Option<Arc<dyn Any + Send + Sync>>,
}

impl ExecutionContext {
    pub fn new(
        env: Environment,
        runner: Arc<dyn CommandRunner>,
        installer: Arc<dyn PackageInstaller>,
    ) -> Self {
        Self {
            env,
            runner,
            installer,
            options: RunOptions::default(),
            cancel: CancellationToken::new(),
            user_data: None,
        }
    }

    pub fn with_options(mut self, options: RunOptions) -> Self {
        self.options = options;
        self
    }

    /// Use `token` so the caller can cancel in-flight work.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    /// Attach application-specific data for handlers to read back with
    /// [`user_data`](Self::user_data).
    pub fn with_user_data<T: Any + Send + Sync>(mut self, data: T) -> Self {
        self.user_data = Some(Arc::new(data));
        self
    }

    pub fn user_data<T: Any>(&self) -> Option<&T> {
        self.user_data.as_deref()?.downcast_ref::<T>()
    }

    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancel
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Expand `~`, `$HOME` and environment references against this
    /// context's work dir.
    pub fn expand_path(&self, path: &str) -> PathBuf {
        expand_path(path, &self.env.work_dir)
    }

    pub fn work_dir(&self) -> &Path {
        &self.env.work_dir
    }

    /// Await `work` unless the run is cancelled first, in which case `work`
    /// is dropped (killing any process it spawned) and `Cancelled` is
    /// returned with `what` in the message.
    pub async fn until_cancelled<T>(
        &self,
        what: &str,
        work: impl Future<Output = Result<T>>,
    ) -> Result<T> {
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => {
                Err(DotgraphError::Cancelled(format!("{what} aborted")))
            }
            result = work => result,
        }
    }

    /// Run `program` through the injected runner, aborting it if the run is
    /// cancelled first.
    pub async fn run_command(&self, program: &str, args: &[String]) -> Result<()> {
        let work = async { self.runner.run(program, args).await.into_result(program) };
        self.until_cancelled(&format!("command '{program}'"), work).await
    }
}

impl fmt::Debug for ExecutionContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExecutionContext")
            .field("env", &self.env)
            .field("runner", &self.runner)
            .field("installer", &self.installer.name())
            .field("options", &self.options)
            .field("cancelled", &self.cancel.is_cancelled())
            .field("user_data", &self.user_data.is_some())
            .finish()
    }
}
