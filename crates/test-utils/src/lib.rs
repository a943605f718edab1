pub mod builders;

use std::sync::{Arc, Once};

use dotgraph::context::{Environment, ExecutionContext, RunOptions};
use dotgraph::exec::MockCommandRunner;
use dotgraph::pkg::MockInstaller;
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{fmt, EnvFilter};

static INIT: Once = Once::new();

/// Initialise tracing for tests.
///
/// - Uses `with_test_writer()`, so logs are captured per-test.
/// - The Rust test harness only prints captured output for **failing** tests
///   (unless you run with `-- --nocapture`).
///
/// Enable levels with e.g.:
/// `RUST_LOG=debug cargo test`
pub fn init_tracing() {
    INIT.call_once(|| {
        let filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

        fmt()
            .with_env_filter(filter)
            .with_test_writer() // print only for failing tests unless --nocapture
            .with_target(true)
            .init();
    });
}

/// Run a future with a 5-second timeout.
#[allow(dead_code)]
pub async fn with_timeout<F, T>(f: F) -> T
where
    F: std::future::Future<Output = T>,
{
    tokio::time::timeout(std::time::Duration::from_secs(5), f)
        .await
        .expect("Test timed out after 5 seconds")
}

/// Mock runner + mock installer + temporary work dir, ready to be turned
/// into an [`ExecutionContext`].
///
/// The runner and installer handles share state with every context built
/// from this fixture, so tests can inspect recorded calls afterwards.
pub struct TestContext {
    pub runner: MockCommandRunner,
    pub installer: MockInstaller,
    pub work_dir: TempDir,
    pub os: String,
    pub options: RunOptions,
}

impl TestContext {
    /// Linux machine with nothing on the search path.
    pub fn new() -> Self {
        Self {
            runner: MockCommandRunner::new(),
            installer: MockInstaller::default(),
            work_dir: TempDir::new().expect("failed to create temp work dir"),
            os: "linux".to_string(),
            options: RunOptions::default(),
        }
    }

    pub fn with_os(mut self, os: &str) -> Self {
        self.os = os.to_string();
        self
    }

    pub fn with_command(self, name: &str) -> Self {
        self.runner.add_command(name);
        self
    }

    pub fn with_installer(mut self, installer: MockInstaller) -> Self {
        self.installer = installer;
        self
    }

    pub fn dry_run(mut self) -> Self {
        self.options.dry_run = true;
        self
    }

    pub fn environment(&self) -> Environment {
        Environment::new(self.os.clone(), "x86_64", self.work_dir.path())
    }

    pub fn build(&self) -> ExecutionContext {
        ExecutionContext::new(
            self.environment(),
            Arc::new(self.runner.clone()),
            Arc::new(self.installer.clone()),
        )
        .with_options(self.options)
    }

    pub fn context(&self) -> Arc<ExecutionContext> {
        Arc::new(self.build())
    }

    pub fn context_with_cancellation(&self, token: CancellationToken) -> Arc<ExecutionContext> {
        Arc::new(self.build().with_cancellation(token))
    }
}

impl Default for TestContext {
    fn default() -> Self {
        Self::new()
    }
}
