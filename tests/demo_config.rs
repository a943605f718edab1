// tests/demo_config.rs
mod common;
use crate::common::{init_tracing, with_timeout, TestContext};

use std::error::Error;
use std::path::Path;

use dotgraph::config::{build_graph, load_and_validate};
use dotgraph::dag::StageState;

type TestResult = Result<(), Box<dyn Error>>;

fn demo_path() -> &'static Path {
    Path::new(concat!(env!("CARGO_MANIFEST_DIR"), "/demos/Dotgraph.toml"))
}

#[tokio::test]
async fn demo_config_dry_run_on_linux() -> TestResult {
    init_tracing();
    let cfg = load_and_validate(demo_path())?;
    let graph = build_graph(&cfg)?;

    let fixture = TestContext::new()
        .with_os("linux")
        .with_command("git")
        .with_command("stow")
        .with_command("zsh")
        .dry_run();
    let report = with_timeout(graph.execute_with_report(fixture.context())).await?;

    assert!(report.is_success());
    assert_eq!(
        report.stages_in(StageState::Skipped),
        vec!["brew-bundle", "fonts", "homebrew"]
    );
    assert_eq!(
        report.stages_in(StageState::Succeeded),
        vec!["arch-packages", "dotfiles", "packages", "ssh-key", "zpm"]
    );
    assert!(fixture.runner.runs().is_empty());
    assert!(fixture.installer.install_calls().is_empty());
    Ok(())
}

#[tokio::test]
async fn demo_config_on_mac_skips_linux_stages() -> TestResult {
    init_tracing();
    let cfg = load_and_validate(demo_path())?;
    let mut graph = build_graph(&cfg)?;
    graph.set_platform("darwin");

    let fixture = TestContext::new()
        .with_os("linux")
        .with_command("brew")
        .with_command("git")
        .with_command("stow")
        .with_command("zsh")
        .dry_run();
    let report = with_timeout(graph.execute_with_report(fixture.context())).await?;

    assert!(report.is_success());
    assert_eq!(
        report.stages_in(StageState::Skipped),
        vec!["arch-packages", "fonts", "homebrew"]
    );
    assert_eq!(report.state_of("brew-bundle"), Some(StageState::Succeeded));
    Ok(())
}
