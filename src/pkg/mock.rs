// src/pkg/mock.rs

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use super::PackageInstaller;
use crate::errors::{DotgraphError, Result};
use crate::types::BoxFuture;

#[derive(Debug, Default)]
struct MockInstallerState {
    installed: HashSet<String>,
    install_calls: Vec<Vec<String>>,
    fail_install: Option<String>,
}

/// In-memory package installer.
///
/// Records every `install` batch; successful installs mark the packages as
/// installed. Clones share state.
#[derive(Debug, Clone)]
pub struct MockInstaller {
    name: String,
    available: bool,
    state: Arc<Mutex<MockInstallerState>>,
}

impl MockInstaller {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            available: true,
            state: Arc::default(),
        }
    }

    pub fn unavailable(mut self) -> Self {
        self.available = false;
        self
    }

    pub fn with_installed(self, package: &str) -> Self {
        self.state
            .lock()
            .unwrap()
            .installed
            .insert(package.to_string());
        self
    }

    /// Make every subsequent `install` fail with `error`.
    pub fn fail_install(&self, error: &str) {
        self.state.lock().unwrap().fail_install = Some(error.to_string());
    }

    pub fn install_calls(&self) -> Vec<Vec<String>> {
        self.state.lock().unwrap().install_calls.clone()
    }
}

impl Default for MockInstaller {
    fn default() -> Self {
        Self::new("mock")
    }
}

impl PackageInstaller for MockInstaller {
    fn install<'a>(&'a self, packages: &'a [String]) -> BoxFuture<'a, Result<()>> {
        let result = {
            let mut state = self.state.lock().unwrap();
            state.install_calls.push(packages.to_vec());
            match state.fail_install.clone() {
                Some(error) => Err(DotgraphError::Other(anyhow::anyhow!(error))),
                None => {
                    state.installed.extend(packages.iter().cloned());
                    Ok(())
                }
            }
        };
        Box::pin(async move { result })
    }

    fn is_installed<'a>(&'a self, package: &'a str) -> BoxFuture<'a, bool> {
        let installed = self.state.lock().unwrap().installed.contains(package);
        Box::pin(async move { installed })
    }

    fn available(&self) -> bool {
        self.available
    }

    fn name(&self) -> &str {
        &self.name
    }
}
