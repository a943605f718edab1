// src/pkg/arch.rs

//! Arch Linux installers: `yay` (repos + AUR) is preferred over plain
//! `pacman`.

use std::sync::Arc;

use tracing::info;

use super::{run_tool, PackageInstaller};
use crate::errors::Result;
use crate::exec::CommandRunner;
use crate::types::BoxFuture;

#[derive(Debug, Clone)]
pub struct Yay {
    runner: Arc<dyn CommandRunner>,
}

impl Yay {
    pub fn new(runner: Arc<dyn CommandRunner>) -> Self {
        Self { runner }
    }
}

impl PackageInstaller for Yay {
    fn install<'a>(&'a self, packages: &'a [String]) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            if packages.is_empty() {
                return Ok(());
            }
            info!(
                count = packages.len(),
                packages = %packages.join(", "),
                "installing packages via yay"
            );
            let mut args = vec!["-S".to_string(), "--noconfirm".to_string()];
            args.extend(packages.iter().cloned());
            run_tool(self.runner.as_ref(), "yay", "yay", "yay", args).await
        })
    }

    fn is_installed<'a>(&'a self, package: &'a str) -> BoxFuture<'a, bool> {
        Box::pin(async move {
            if !self.available() {
                return false;
            }
            let args = vec!["-Qi".to_string(), package.to_string()];
            self.runner.run("yay", &args).await.success
        })
    }

    fn available(&self) -> bool {
        self.runner.lookup("yay").is_ok()
    }

    fn name(&self) -> &str {
        "yay"
    }
}

/// Plain `pacman`; installs go through `sudo`.
#[derive(Debug, Clone)]
pub struct Pacman {
    runner: Arc<dyn CommandRunner>,
}

impl Pacman {
    pub fn new(runner: Arc<dyn CommandRunner>) -> Self {
        Self { runner }
    }
}

impl PackageInstaller for Pacman {
    fn install<'a>(&'a self, packages: &'a [String]) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            if packages.is_empty() {
                return Ok(());
            }
            info!(
                count = packages.len(),
                packages = %packages.join(", "),
                "installing packages via pacman"
            );
            let mut args = vec![
                "pacman".to_string(),
                "-S".to_string(),
                "--needed".to_string(),
                "--noconfirm".to_string(),
            ];
            args.extend(packages.iter().cloned());
            run_tool(self.runner.as_ref(), "pacman", "pacman", "sudo", args).await
        })
    }

    fn is_installed<'a>(&'a self, package: &'a str) -> BoxFuture<'a, bool> {
        Box::pin(async move {
            if !self.available() {
                return false;
            }
            let args = vec!["-Qi".to_string(), package.to_string()];
            self.runner.run("pacman", &args).await.success
        })
    }

    fn available(&self) -> bool {
        self.runner.lookup("pacman").is_ok()
    }

    fn name(&self) -> &str {
        "pacman"
    }
}
