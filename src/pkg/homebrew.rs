// src/pkg/homebrew.rs

use std::path::Path;
use std::sync::Arc;

use tracing::info;

use super::{run_tool, PackageInstaller};
use crate::errors::Result;
use crate::exec::CommandRunner;
use crate::types::BoxFuture;

/// Homebrew (macOS).
#[derive(Debug, Clone)]
pub struct Homebrew {
    runner: Arc<dyn CommandRunner>,
}

impl Homebrew {
    pub fn new(runner: Arc<dyn CommandRunner>) -> Self {
        Self { runner }
    }

    /// `brew bundle --file=<brewfile>`.
    pub async fn bundle(&self, brewfile: &Path) -> Result<()> {
        info!(brewfile = %brewfile.display(), "installing Brewfile packages via homebrew");
        let args = vec!["bundle".to_string(), format!("--file={}", brewfile.display())];
        run_tool(self.runner.as_ref(), "homebrew", "brew", "brew", args).await?;
        info!("Brewfile packages installed");
        Ok(())
    }
}

impl PackageInstaller for Homebrew {
    fn install<'a>(&'a self, packages: &'a [String]) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            if packages.is_empty() {
                return Ok(());
            }
            info!(
                count = packages.len(),
                packages = %packages.join(", "),
                "installing packages via homebrew"
            );
            let mut args = vec!["install".to_string()];
            args.extend(packages.iter().cloned());
            run_tool(self.runner.as_ref(), "homebrew", "brew", "brew", args).await
        })
    }

    fn is_installed<'a>(&'a self, package: &'a str) -> BoxFuture<'a, bool> {
        Box::pin(async move {
            if !self.available() {
                return false;
            }
            let args = vec!["list".to_string(), package.to_string()];
            self.runner.run("brew", &args).await.success
        })
    }

    fn available(&self) -> bool {
        self.runner.lookup("brew").is_ok()
    }

    fn name(&self) -> &str {
        "homebrew"
    }
}
