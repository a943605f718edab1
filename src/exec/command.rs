// src/exec/command.rs

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::process::Stdio;

use chrono::Local;
use tokio::fs::{File, OpenOptions};
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{debug, info, warn};

use crate::errors::{DotgraphError, Result};
use crate::exec::backend::{CommandRunner, RunResult};
use crate::types::BoxFuture;

/// Default directory for failure logs: `~/.cache/dotgraph-logs`, or
/// `<tmp>/dotgraph-logs` when no home directory can be found.
pub fn default_log_dir() -> PathBuf {
    dirs::home_dir()
        .map(|home| home.join(".cache").join("dotgraph-logs"))
        .unwrap_or_else(|| std::env::temp_dir().join("dotgraph-logs"))
}

/// Real command runner used in production.
///
/// Output is captured rather than streamed. Successful runs leave no trace;
/// failed runs write the command line, exit status, stdout and stderr to a
/// log file in `log_dir` and report its path.
#[derive(Debug, Clone)]
pub struct RealCommandRunner {
    log_dir: PathBuf,
}

impl RealCommandRunner {
    pub fn new() -> Self {
        Self::with_log_dir(default_log_dir())
    }

    pub fn with_log_dir(log_dir: impl Into<PathBuf>) -> Self {
        Self {
            log_dir: log_dir.into(),
        }
    }

    pub fn log_dir(&self) -> &Path {
        &self.log_dir
    }

    async fn run_inner(&self, program: &str, args: &[String]) -> RunResult {
        debug!(program, ?args, "running command");

        let output = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output()
            .await;

        let (status, stdout, stderr) = match output {
            Ok(output) if output.status.success() => {
                debug!(program, "command succeeded");
                return RunResult::success();
            }
            Ok(output) => (output.status.to_string(), output.stdout, output.stderr),
            Err(err) => (format!("failed to spawn: {err}"), Vec::new(), Vec::new()),
        };

        let mut result = RunResult::failure(status.clone());
        if let Some(path) = self
            .write_failure_log(program, args, &status, &stdout, &stderr)
            .await
        {
            info!(program, log_file = %path.display(), "command failed; output saved");
            result = result.with_log_file(path);
        }
        result
    }

    async fn write_failure_log(
        &self,
        program: &str,
        args: &[String],
        status: &str,
        stdout: &[u8],
        stderr: &[u8],
    ) -> Option<PathBuf> {
        if let Err(err) = tokio::fs::create_dir_all(&self.log_dir).await {
            warn!(dir = %self.log_dir.display(), error = %err, "failed to create log directory");
            return None;
        }

        let contents = format!(
            "Command: {program} {}\nExit Status: {status}\n\n\
             === STDOUT ===\n{}\n\n=== STDERR ===\n{}\n",
            args.join(" "),
            String::from_utf8_lossy(stdout),
            String::from_utf8_lossy(stderr),
        );

        let (path, mut file) = match self.create_log_file(program).await {
            Ok(created) => created,
            Err(err) => {
                warn!(dir = %self.log_dir.display(), error = %err, "failed to create log file");
                return None;
            }
        };

        let written = match file.write_all(contents.as_bytes()).await {
            Ok(()) => file.flush().await,
            Err(err) => Err(err),
        };
        match written {
            Ok(()) => Some(path),
            Err(err) => {
                warn!(path = %path.display(), error = %err, "failed to write log file");
                None
            }
        }
    }

    /// Create a fresh log file for `program`. Concurrent failures of the
    /// same program within one millisecond get `-1`, `-2`, ... suffixes
    /// instead of overwriting each other.
    async fn create_log_file(&self, program: &str) -> std::io::Result<(PathBuf, File)> {
        let stem = log_file_stem(program);
        let mut attempt = 0u32;
        loop {
            let name = match attempt {
                0 => format!("{stem}.log"),
                n => format!("{stem}-{n}.log"),
            };
            let path = self.log_dir.join(name);
            match OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&path)
                .await
            {
                Ok(file) => return Ok((path, file)),
                Err(err) if err.kind() == ErrorKind::AlreadyExists => attempt += 1,
                Err(err) => return Err(err),
            }
        }
    }
}

impl Default for RealCommandRunner {
    fn default() -> Self {
        Self::new()
    }
}

impl CommandRunner for RealCommandRunner {
    fn run<'a>(&'a self, program: &'a str, args: &'a [String]) -> BoxFuture<'a, RunResult> {
        Box::pin(self.run_inner(program, args))
    }

    fn lookup(&self, name: &str) -> Result<PathBuf> {
        which::which(name).map_err(|_| DotgraphError::CommandNotFound(name.to_string()))
    }
}

/// `<program>-<YYYYmmdd-HHMMSS-mmm>`, using only the file name of
/// `program` so absolute paths don't leak into the log directory layout.
fn log_file_stem(program: &str) -> String {
    let name = Path::new(program)
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("command");
    format!("{name}-{}", Local::now().format("%Y%m%d-%H%M%S-%3f"))
}
