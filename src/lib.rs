// src/lib.rs

pub mod cli;
pub mod condition;
pub mod config;
pub mod context;
pub mod dag;
pub mod errors;
pub mod exec;
pub mod logging;
pub mod pkg;
pub mod types;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::cli::CliArgs;
use crate::condition::expand_path;
use crate::config::{build_graph, load_and_validate, ConfigFile};
use crate::context::{Environment, ExecutionContext, RunOptions};
use crate::dag::Graph;
use crate::exec::{CommandRunner, RealCommandRunner};
use crate::pkg::select_installer;

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - config loading and graph construction
/// - environment detection, command runner and package installer
/// - Ctrl-C handling
/// - graph execution
pub async fn run(args: CliArgs) -> Result<()> {
    let config_path = PathBuf::from(&args.config);
    let cfg = load_and_validate(&config_path)?;

    let mut graph = build_graph(&cfg)?;
    if let Some(platform) = &args.platform {
        graph.set_platform(platform.clone());
    }

    if args.check {
        print_plan(&cfg, &graph);
        return Ok(());
    }

    let env = environment(&cfg)?;
    let runner: Arc<dyn CommandRunner> = Arc::new(match &cfg.config.log_dir {
        Some(dir) => RealCommandRunner::with_log_dir(expand_path(dir, &env.work_dir)),
        None => RealCommandRunner::new(),
    });

    let platform = graph.platform().unwrap_or(env.os.as_str()).to_string();
    let installer = select_installer(&platform, Arc::clone(&runner));
    info!(
        platform = %platform,
        installer = installer.name(),
        work_dir = %env.work_dir.display(),
        "environment detected"
    );

    // Ctrl-C → abort in-flight commands.
    let cancel = CancellationToken::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!("failed to listen for Ctrl+C: {e}");
                return;
            }
            warn!("interrupt received, cancelling running commands");
            cancel.cancel();
        });
    }

    let options = RunOptions {
        dry_run: args.dry_run,
        verbose: args.verbose,
    };
    let ctx = ExecutionContext::new(env, runner, installer)
        .with_options(options)
        .with_cancellation(cancel);

    graph.execute(Arc::new(ctx)).await?;
    Ok(())
}

/// Detected environment, with `[config] work_dir` applied.
fn environment(cfg: &ConfigFile) -> Result<Environment> {
    let mut env = Environment::detect()?;
    if let Some(work_dir) = &cfg.config.work_dir {
        env.work_dir = expand_path(work_dir, &env.work_dir);
        debug!(work_dir = %env.work_dir.display(), "work dir overridden by config");
    }
    Ok(env)
}

/// `--check` output: stages in dependency order with their settings.
fn print_plan(cfg: &ConfigFile, graph: &Graph) {
    println!("dotgraph check");
    if let Some(platform) = graph.platform() {
        println!("  platform override = {platform}");
    }
    if let Some(dir) = &cfg.config.log_dir {
        println!("  config.log_dir = {dir}");
    }
    if let Some(dir) = &cfg.config.work_dir {
        println!("  config.work_dir = {dir}");
    }
    println!();

    println!("stages ({}):", cfg.order().len());
    for name in cfg.order() {
        if let Some(merge) = cfg.merge.get(name) {
            println!("  - {name} (merge)");
            println!("      after: {:?}", merge.after);
            continue;
        }
        let Some(stage) = cfg.stage.get(name) else {
            continue;
        };
        println!("  - {name}");
        if !stage.after.is_empty() {
            println!("      after: {:?}", stage.after);
        }
        if let Some(platform) = &stage.platform {
            println!("      platform: {platform}");
        }
        if !stage.packages.is_empty() {
            println!("      packages: {:?}", stage.packages);
        }
        if let Some(brewfile) = &stage.brewfile {
            println!("      brewfile: {brewfile}");
        }
        if let Some(cmd) = &stage.cmd {
            println!("      cmd: {cmd}");
        }
        if !stage.requires.is_empty() {
            println!("      requires: {:?}", stage.requires);
        }
        for condition in &stage.unless {
            println!("      unless: {}", condition.to_condition());
        }
        if stage.optional {
            println!("      optional: true");
        }
    }

    debug!("check complete (no execution)");
}
