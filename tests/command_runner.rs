// tests/command_runner.rs
#![cfg(unix)]

mod common;
use crate::common::builders::{ConfigFileBuilder, StageConfigBuilder};
use crate::common::{init_tracing, with_timeout, TestContext};

use std::collections::HashSet;
use std::error::Error;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use dotgraph::config::build_graph;
use dotgraph::context::ExecutionContext;
use dotgraph::dag::{Graph, RunReport, StageState};
use dotgraph::errors::DotgraphError;
use dotgraph::exec::{CommandRunner, RealCommandRunner, RunResult};
use dotgraph::pkg::PackageInstaller;
use dotgraph::types::BoxFuture;
use tempfile::TempDir;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

type TestResult = Result<(), Box<dyn Error>>;

fn args(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

#[tokio::test]
async fn successful_command_leaves_no_log() -> TestResult {
    init_tracing();
    let logs = TempDir::new()?;
    let runner = RealCommandRunner::with_log_dir(logs.path());

    let result = with_timeout(runner.run("sh", &args(&["-c", "echo fine"]))).await;

    assert_eq!(result, RunResult::success());
    assert_eq!(std::fs::read_dir(logs.path())?.count(), 0);
    Ok(())
}

#[tokio::test]
async fn failed_command_writes_log_file() -> TestResult {
    init_tracing();
    let logs = TempDir::new()?;
    let runner = RealCommandRunner::with_log_dir(logs.path().join("nested"));

    let script = "echo to-stdout; echo to-stderr >&2; exit 3";
    let result = with_timeout(runner.run("sh", &args(&["-c", script]))).await;

    assert!(!result.success);
    let error = result.error.clone().unwrap_or_default();
    assert!(error.contains('3'), "{error}");

    let log_file = result.log_file.clone().expect("log file written");
    assert!(log_file.starts_with(logs.path().join("nested")));
    let file_name = log_file
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or_default()
        .to_string();
    assert!(file_name.starts_with("sh-"), "{file_name}");
    assert!(file_name.ends_with(".log"), "{file_name}");

    let contents = std::fs::read_to_string(&log_file)?;
    assert!(contents.contains(&format!("Command: sh -c {script}")));
    assert!(contents.contains("=== STDOUT ===\nto-stdout"));
    assert!(contents.contains("=== STDERR ===\nto-stderr"));

    match result.into_result("sh") {
        Err(err @ DotgraphError::CommandFailed { .. }) => {
            assert!(err.to_string().contains("see log"), "{err}");
        }
        other => panic!("Expected CommandFailed, got: {:?}", other),
    }
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_failures_get_separate_log_files() -> TestResult {
    init_tracing();
    let logs = TempDir::new()?;
    let runner = Arc::new(RealCommandRunner::with_log_dir(logs.path()));

    let mut set = JoinSet::new();
    for i in 0..8 {
        let runner = Arc::clone(&runner);
        set.spawn(async move {
            let script = format!("echo out-{i}; exit 3");
            let result = runner.run("sh", &args(&["-c", &script])).await;
            (i, result)
        });
    }
    let results = with_timeout(async move {
        let mut results = Vec::new();
        while let Some(joined) = set.join_next().await {
            results.push(joined.expect("runner task panicked"));
        }
        results
    })
    .await;

    let mut paths = HashSet::new();
    for (i, result) in &results {
        assert!(!result.success);
        let log_file = result.log_file.clone().expect("log file written");
        let contents = std::fs::read_to_string(&log_file)?;
        assert!(contents.contains(&format!("out-{i}")), "{contents}");
        paths.insert(log_file);
    }
    assert_eq!(paths.len(), 8);
    assert_eq!(std::fs::read_dir(logs.path())?.count(), 8);
    Ok(())
}

#[tokio::test]
async fn unknown_program_fails_to_spawn() -> TestResult {
    init_tracing();
    let logs = TempDir::new()?;
    let runner = RealCommandRunner::with_log_dir(logs.path());

    let result = with_timeout(runner.run("dotgraph-no-such-program", &[])).await;

    assert!(!result.success);
    assert!(result
        .error
        .as_deref()
        .is_some_and(|e| e.contains("failed to spawn")));
    Ok(())
}

#[test]
fn lookup_uses_search_path() {
    let runner = RealCommandRunner::new();

    assert!(runner.lookup("sh").is_ok());
    assert!(matches!(
        runner.lookup("dotgraph-no-such-program"),
        Err(DotgraphError::CommandNotFound(name)) if name == "dotgraph-no-such-program"
    ));
}

/// Runner whose commands never finish on their own.
#[derive(Debug)]
struct HangingRunner;

impl CommandRunner for HangingRunner {
    fn run<'a>(&'a self, _program: &'a str, _args: &'a [String]) -> BoxFuture<'a, RunResult> {
        Box::pin(async {
            tokio::time::sleep(Duration::from_secs(60)).await;
            RunResult::success()
        })
    }

    fn lookup(&self, name: &str) -> dotgraph::errors::Result<PathBuf> {
        Ok(PathBuf::from("/usr/bin").join(name))
    }
}

fn cancel_soon(token: &CancellationToken) {
    let token = token.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        token.cancel();
    });
}

#[tokio::test]
async fn run_command_aborts_on_cancellation() {
    init_tracing();
    let fixture = TestContext::new();
    let token = CancellationToken::new();
    let ctx = ExecutionContext::new(
        fixture.environment(),
        Arc::new(HangingRunner),
        Arc::new(fixture.installer.clone()),
    )
    .with_cancellation(token.clone());

    cancel_soon(&token);
    let result = with_timeout(ctx.run_command("sleep", &args(&["60"]))).await;

    assert!(ctx.is_cancelled());
    assert!(matches!(result, Err(DotgraphError::Cancelled(_))));
}

#[tokio::test]
async fn cancelling_kills_real_processes() {
    init_tracing();
    let fixture = TestContext::new();
    let token = CancellationToken::new();
    let ctx = ExecutionContext::new(
        fixture.environment(),
        Arc::new(RealCommandRunner::with_log_dir(fixture.work_dir.path())),
        Arc::new(fixture.installer.clone()),
    )
    .with_cancellation(token.clone());

    cancel_soon(&token);
    let result = with_timeout(ctx.run_command("sleep", &args(&["60"]))).await;

    assert!(matches!(result, Err(DotgraphError::Cancelled(_))));
}

async fn sleep_a_minute(ctx: Arc<ExecutionContext>) -> anyhow::Result<()> {
    ctx.run_command("sleep", &args(&["60"])).await?;
    Ok(())
}

#[tokio::test]
async fn cancelled_stage_fails_and_blocks_dependents() {
    init_tracing();
    let mut graph = Graph::new();
    let slow = graph.add_stage("slow", sleep_a_minute).id();
    graph
        .add_stage("never", |_ctx| std::future::ready(Ok(())))
        .after([slow]);

    let fixture = TestContext::new();
    let token = CancellationToken::new();
    let ctx = ExecutionContext::new(
        fixture.environment(),
        Arc::new(HangingRunner),
        Arc::new(fixture.installer.clone()),
    )
    .with_cancellation(token.clone());

    cancel_soon(&token);
    let report = with_timeout(graph.execute_with_report(Arc::new(ctx)))
        .await
        .expect("graph is valid");

    assert_eq!(report.state_of("never"), Some(StageState::Pending));
    match report.into_result() {
        Err(DotgraphError::StageFailed { stage, cause }) => {
            assert_eq!(stage, "slow");
            assert!(matches!(
                cause.downcast_ref::<DotgraphError>(),
                Some(DotgraphError::Cancelled(_))
            ));
        }
        other => panic!("Expected StageFailed, got: {:?}", other),
    }
}

/// Installer whose installs never finish on their own.
#[derive(Debug)]
struct SlowInstaller;

impl PackageInstaller for SlowInstaller {
    fn install<'a>(
        &'a self,
        _packages: &'a [String],
    ) -> BoxFuture<'a, dotgraph::errors::Result<()>> {
        Box::pin(async {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok(())
        })
    }

    fn is_installed<'a>(&'a self, _package: &'a str) -> BoxFuture<'a, bool> {
        Box::pin(async { false })
    }

    fn available(&self) -> bool {
        true
    }

    fn name(&self) -> &str {
        "slow"
    }
}

fn assert_cancelled_stage(report: RunReport, expected: &str) {
    match report.into_result() {
        Err(DotgraphError::StageFailed { stage, cause }) => {
            assert_eq!(stage, expected);
            assert!(
                matches!(
                    cause.downcast_ref::<DotgraphError>(),
                    Some(DotgraphError::Cancelled(_))
                ),
                "{cause:#}"
            );
        }
        other => panic!("Expected StageFailed, got: {:?}", other),
    }
}

#[tokio::test]
async fn cancelling_aborts_package_install() -> TestResult {
    init_tracing();
    let cfg = ConfigFileBuilder::new()
        .with_stage("tools", StageConfigBuilder::new().package("git").build())
        .with_stage(
            "shell",
            StageConfigBuilder::new().after("tools").cmd("chsh").build(),
        )
        .build();
    let graph = build_graph(&cfg)?;

    let fixture = TestContext::new();
    let token = CancellationToken::new();
    let ctx = ExecutionContext::new(
        fixture.environment(),
        Arc::new(fixture.runner.clone()),
        Arc::new(SlowInstaller),
    )
    .with_cancellation(token.clone());

    cancel_soon(&token);
    let report = with_timeout(graph.execute_with_report(Arc::new(ctx))).await?;

    assert_eq!(report.state_of("shell"), Some(StageState::Pending));
    assert!(fixture.runner.runs().is_empty());
    assert_cancelled_stage(report, "tools");
    Ok(())
}

#[tokio::test]
async fn cancelling_aborts_brew_bundle() -> TestResult {
    init_tracing();
    let cfg = ConfigFileBuilder::new()
        .with_stage(
            "brewfile",
            StageConfigBuilder::new().brewfile("~/Brewfile").build(),
        )
        .build();
    let graph = build_graph(&cfg)?;

    let fixture = TestContext::new().with_os("darwin");
    let token = CancellationToken::new();
    let ctx = ExecutionContext::new(
        fixture.environment(),
        Arc::new(HangingRunner),
        Arc::new(fixture.installer.clone()),
    )
    .with_cancellation(token.clone());

    cancel_soon(&token);
    let report = with_timeout(graph.execute_with_report(Arc::new(ctx))).await?;

    assert_cancelled_stage(report, "brewfile");
    Ok(())
}
