// tests/installers.rs

use std::error::Error;
use std::path::Path;
use std::sync::Arc;

use dotgraph::errors::DotgraphError;
use dotgraph::exec::{MockCommandRunner, RecordedRun};
use dotgraph::pkg::{select_installer, Homebrew, NoopInstaller, PackageInstaller, Pacman, Yay};

type TestResult = Result<(), Box<dyn Error>>;

fn packages(names: &[&str]) -> Vec<String> {
    names.iter().map(|s| s.to_string()).collect()
}

fn args(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

#[test]
fn darwin_selects_homebrew_when_brew_is_present() {
    let runner = MockCommandRunner::new().with_command("brew");
    assert_eq!(select_installer("darwin", Arc::new(runner)).name(), "homebrew");
}

#[test]
fn linux_prefers_yay_over_pacman() {
    let both = MockCommandRunner::new()
        .with_command("yay")
        .with_command("pacman");
    assert_eq!(select_installer("linux", Arc::new(both)).name(), "yay");

    let pacman_only = MockCommandRunner::new().with_command("pacman");
    assert_eq!(select_installer("linux", Arc::new(pacman_only)).name(), "pacman");
}

#[test]
fn falls_back_to_noop_without_a_package_manager() {
    let empty = MockCommandRunner::new();
    assert_eq!(select_installer("linux", Arc::new(empty.clone())).name(), "noop");
    assert_eq!(select_installer("darwin", Arc::new(empty.clone())).name(), "noop");

    let brew_on_windows = MockCommandRunner::new().with_command("brew");
    assert_eq!(select_installer("windows", Arc::new(brew_on_windows)).name(), "noop");
}

#[tokio::test]
async fn noop_installer_always_refuses() {
    let noop = NoopInstaller;
    assert!(!noop.available());
    assert!(!noop.is_installed("git").await);

    match noop.install(&packages(&["git"])).await {
        Err(DotgraphError::Unsupported(msg)) => {
            assert_eq!(msg, "package manager not supported on this platform")
        }
        other => panic!("Expected Unsupported, got: {:?}", other),
    }
    assert!(noop.install(&[]).await.is_err());
}

#[tokio::test]
async fn homebrew_commands() -> TestResult {
    let runner = MockCommandRunner::new().with_command("brew");
    let brew = Homebrew::new(Arc::new(runner.clone()));

    brew.install(&packages(&["git", "fzf"])).await?;
    assert!(brew.is_installed("git").await);
    brew.bundle(Path::new("/home/user/Brewfile")).await?;

    assert_eq!(
        runner.runs(),
        vec![
            RecordedRun {
                program: "brew".to_string(),
                args: args(&["install", "git", "fzf"]),
            },
            RecordedRun {
                program: "brew".to_string(),
                args: args(&["list", "git"]),
            },
            RecordedRun {
                program: "brew".to_string(),
                args: args(&["bundle", "--file=/home/user/Brewfile"]),
            },
        ]
    );
    Ok(())
}

#[tokio::test]
async fn yay_commands() -> TestResult {
    let runner = MockCommandRunner::new().with_command("yay");
    let yay = Yay::new(Arc::new(runner.clone()));

    yay.install(&packages(&["neovim"])).await?;
    assert!(yay.is_installed("neovim").await);

    assert_eq!(
        runner.runs_of("yay"),
        vec![args(&["-S", "--noconfirm", "neovim"]), args(&["-Qi", "neovim"])]
    );
    Ok(())
}

#[tokio::test]
async fn pacman_installs_through_sudo() -> TestResult {
    let runner = MockCommandRunner::new().with_command("pacman");
    let pacman = Pacman::new(Arc::new(runner.clone()));

    pacman.install(&packages(&["git", "zsh"])).await?;
    runner.expect_run_failure("pacman", "exit status: 1");
    assert!(!pacman.is_installed("zsh").await);

    assert_eq!(
        runner.runs_of("sudo"),
        vec![args(&["pacman", "-S", "--needed", "--noconfirm", "git", "zsh"])]
    );
    assert_eq!(runner.runs_of("pacman"), vec![args(&["-Qi", "zsh"])]);
    Ok(())
}

#[tokio::test]
async fn empty_install_is_a_no_op() -> TestResult {
    let runner = MockCommandRunner::new().with_command("brew");
    let brew = Homebrew::new(Arc::new(runner.clone()));

    brew.install(&[]).await?;
    assert!(runner.runs().is_empty());
    Ok(())
}

#[tokio::test]
async fn missing_tool_is_reported_as_unsupported() {
    let runner = MockCommandRunner::new();
    let yay = Yay::new(Arc::new(runner.clone()));

    assert!(!yay.available());
    assert!(!yay.is_installed("git").await);
    match yay.install(&packages(&["git"])).await {
        Err(DotgraphError::Unsupported(msg)) => assert!(msg.contains("yay not installed")),
        other => panic!("Expected Unsupported, got: {:?}", other),
    }
    assert!(runner.runs().is_empty());
}

#[tokio::test]
async fn failed_install_reports_command_failure() {
    let runner = MockCommandRunner::new().with_command("brew");
    runner.expect_run_failure("brew", "exit status: 1");
    let brew = Homebrew::new(Arc::new(runner));

    match brew.install(&packages(&["nonexistent-formula"])).await {
        Err(DotgraphError::CommandFailed { program, reason, .. }) => {
            assert_eq!(program, "brew");
            assert_eq!(reason, "exit status: 1");
        }
        other => panic!("Expected CommandFailed, got: {:?}", other),
    }
}
