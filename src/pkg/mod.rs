// src/pkg/mod.rs

//! Package installer layer.
//!
//! - [`PackageInstaller`] is the trait stages consume through the
//!   execution context.
//! - [`homebrew`] and [`arch`] hold the concrete installers; all of them
//!   shell out through the injected [`CommandRunner`].
//! - [`select_installer`] picks the first available installer for an OS.
//! - [`mock`] holds an in-memory installer for tests.

pub mod arch;
pub mod homebrew;
pub mod mock;

use std::fmt::Debug;
use std::sync::Arc;

use tracing::debug;

use crate::errors::{DotgraphError, Result};
use crate::exec::CommandRunner;
use crate::types::BoxFuture;

pub use arch::{Pacman, Yay};
pub use homebrew::Homebrew;
pub use mock::MockInstaller;

/// Trait abstracting a platform package manager.
pub trait PackageInstaller: Send + Sync + Debug {
    /// Install all `packages` in one batch. Empty input is a no-op.
    fn install<'a>(&'a self, packages: &'a [String]) -> BoxFuture<'a, Result<()>>;

    /// Whether `package` is already installed.
    fn is_installed<'a>(&'a self, package: &'a str) -> BoxFuture<'a, bool>;

    /// Whether the underlying tool exists on this machine.
    fn available(&self) -> bool;

    /// Identifier used for logging and selection.
    fn name(&self) -> &str;
}

/// Installers for `os`, in priority order.
pub fn candidates(os: &str, runner: Arc<dyn CommandRunner>) -> Vec<Arc<dyn PackageInstaller>> {
    match os {
        "darwin" | "macos" => vec![Arc::new(Homebrew::new(runner))],
        "linux" => vec![
            Arc::new(Yay::new(Arc::clone(&runner))),
            Arc::new(Pacman::new(runner)),
        ],
        _ => Vec::new(),
    }
}

/// Return the first available installer for `os`, or [`NoopInstaller`].
pub fn select_installer(os: &str, runner: Arc<dyn CommandRunner>) -> Arc<dyn PackageInstaller> {
    for installer in candidates(os, runner) {
        if installer.available() {
            debug!(os, installer = installer.name(), "selected package installer");
            return installer;
        }
        debug!(os, installer = installer.name(), "package installer not available");
    }

    debug!(os, "no package installer available; using noop");
    Arc::new(NoopInstaller)
}

/// Installer for platforms without a supported package manager.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopInstaller;

impl PackageInstaller for NoopInstaller {
    fn install<'a>(&'a self, _packages: &'a [String]) -> BoxFuture<'a, Result<()>> {
        Box::pin(async {
            Err(DotgraphError::Unsupported(
                "package manager not supported on this platform".to_string(),
            ))
        })
    }

    fn is_installed<'a>(&'a self, _package: &'a str) -> BoxFuture<'a, bool> {
        Box::pin(async { false })
    }

    fn available(&self) -> bool {
        false
    }

    fn name(&self) -> &str {
        "noop"
    }
}

/// Run `program` with `args` through `runner`, for installers whose tool
/// must be present.
pub(crate) async fn run_tool(
    runner: &dyn CommandRunner,
    installer: &str,
    tool: &str,
    program: &str,
    args: Vec<String>,
) -> Result<()> {
    if runner.lookup(tool).is_err() {
        return Err(DotgraphError::Unsupported(format!("{installer} not installed")));
    }
    runner.run(program, &args).await.into_result(program)
}
