// src/exec/mock.rs

use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use super::backend::{CommandRunner, RunResult};
use crate::errors::{DotgraphError, Result};
use crate::types::BoxFuture;

/// A single recorded `run` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedRun {
    pub program: String,
    pub args: Vec<String>,
}

#[derive(Debug, Default)]
struct MockRunnerState {
    on_path: HashSet<String>,
    results: HashMap<String, RunResult>,
    runs: Vec<RecordedRun>,
    lookups: Vec<String>,
}

/// In-memory command runner.
///
/// - `lookup` succeeds for commands registered with [`with_command`] /
///   [`add_command`], resolving them under `/usr/bin`.
/// - `run` records the call and returns the canned result registered for the
///   program, or success.
///
/// Clones share state, so a test can keep one handle while the context owns
/// another.
///
/// [`with_command`]: MockCommandRunner::with_command
/// [`add_command`]: MockCommandRunner::add_command
#[derive(Debug, Clone, Default)]
pub struct MockCommandRunner {
    state: Arc<Mutex<MockRunnerState>>,
}

impl MockCommandRunner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_command(self, name: &str) -> Self {
        self.add_command(name);
        self
    }

    pub fn add_command(&self, name: &str) {
        self.state.lock().unwrap().on_path.insert(name.to_string());
    }

    /// Canned result for every `run` of `program`.
    pub fn expect_run(&self, program: &str, result: RunResult) {
        self.state
            .lock()
            .unwrap()
            .results
            .insert(program.to_string(), result);
    }

    pub fn expect_run_failure(&self, program: &str, error: &str) {
        self.expect_run(program, RunResult::failure(error));
    }

    pub fn runs(&self) -> Vec<RecordedRun> {
        self.state.lock().unwrap().runs.clone()
    }

    pub fn runs_of(&self, program: &str) -> Vec<Vec<String>> {
        self.state
            .lock()
            .unwrap()
            .runs
            .iter()
            .filter(|r| r.program == program)
            .map(|r| r.args.clone())
            .collect()
    }

    pub fn lookups(&self) -> Vec<String> {
        self.state.lock().unwrap().lookups.clone()
    }
}

impl CommandRunner for MockCommandRunner {
    fn run<'a>(&'a self, program: &'a str, args: &'a [String]) -> BoxFuture<'a, RunResult> {
        let result = {
            let mut state = self.state.lock().unwrap();
            state.runs.push(RecordedRun {
                program: program.to_string(),
                args: args.to_vec(),
            });
            state
                .results
                .get(program)
                .cloned()
                .unwrap_or_else(RunResult::success)
        };
        Box::pin(async move { result })
    }

    fn lookup(&self, name: &str) -> Result<PathBuf> {
        let mut state = self.state.lock().unwrap();
        state.lookups.push(name.to_string());
        if state.on_path.contains(name) {
            Ok(PathBuf::from("/usr/bin").join(name))
        } else {
            Err(DotgraphError::CommandNotFound(name.to_string()))
        }
    }
}
