// src/config/build.rs

//! Turn a validated [`ConfigFile`] into an executable [`Graph`].

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::Context;
use tracing::{debug, info};

use crate::config::model::{ConfigFile, StageConfig};
use crate::context::ExecutionContext;
use crate::dag::{Graph, StageId, StageMut};
use crate::errors::{DotgraphError, Result};
use crate::pkg::Homebrew;

/// Build the stage graph described by `cfg`.
///
/// Stages are registered in dependency order so every `after` entry already
/// has an id; `[merge.*]` entries become merge stages.
pub fn build_graph(cfg: &ConfigFile) -> Result<Graph> {
    let mut graph = Graph::new();
    let mut ids: HashMap<&str, StageId> = HashMap::new();

    for name in cfg.order() {
        let deps = cfg
            .after(name)
            .iter()
            .map(|dep| {
                ids.get(dep.as_str())
                    .copied()
                    .ok_or_else(|| DotgraphError::StageNotFound(dep.clone()))
            })
            .collect::<Result<Vec<_>>>()?;

        if cfg.merge.contains_key(name) {
            let id = graph.add_merge(name.clone(), &deps).id();
            ids.insert(name.as_str(), id);
            continue;
        }

        let stage_cfg = cfg
            .stage
            .get(name)
            .ok_or_else(|| DotgraphError::StageNotFound(name.clone()))?;

        let actions = Arc::new(StageActions::from_config(name, stage_cfg));
        let handler = move |ctx: Arc<ExecutionContext>| {
            let actions = Arc::clone(&actions);
            async move { actions.run(&ctx).await }
        };

        let id = match stage_cfg.platform.as_deref() {
            Some(platform) => configure(
                graph.add_platform(platform).add_stage(name.clone(), handler),
                stage_cfg,
                &deps,
            ),
            None => configure(graph.add_stage(name.clone(), handler), stage_cfg, &deps),
        };
        ids.insert(name.as_str(), id);
    }

    debug!(stages = graph.len(), "built stage graph from config");
    Ok(graph)
}

fn configure(stage: StageMut<'_>, cfg: &StageConfig, deps: &[StageId]) -> StageId {
    let mut stage = stage.after(deps.iter().copied());
    for command in &cfg.requires {
        stage = stage.requires(command.clone());
    }
    for condition in &cfg.unless {
        stage = stage.unless(condition.to_condition());
    }
    if cfg.optional {
        stage = stage.optional();
    }
    stage.id()
}

/// What a config-defined stage does when it runs: packages, then the
/// Brewfile, then the shell command.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StageActions {
    pub stage: String,
    pub packages: Vec<String>,
    pub brewfile: Option<String>,
    pub cmd: Option<String>,
}

impl StageActions {
    pub fn from_config(name: &str, cfg: &StageConfig) -> Self {
        Self {
            stage: name.to_string(),
            packages: cfg.packages.clone(),
            brewfile: cfg.brewfile.clone(),
            cmd: cfg.cmd.clone(),
        }
    }

    pub async fn run(&self, ctx: &ExecutionContext) -> anyhow::Result<()> {
        self.install_packages(ctx).await?;
        self.bundle_brewfile(ctx).await?;
        self.run_cmd(ctx).await?;
        Ok(())
    }

    async fn install_packages(&self, ctx: &ExecutionContext) -> anyhow::Result<()> {
        if self.packages.is_empty() {
            return Ok(());
        }

        let mut missing = Vec::new();
        for package in &self.packages {
            let query = async { Ok(ctx.installer.is_installed(package).await) };
            let installed = ctx
                .until_cancelled(&format!("checking package '{package}'"), query)
                .await?;
            if installed {
                debug!(stage = %self.stage, package = %package, "package already installed");
            } else {
                missing.push(package.clone());
            }
        }

        if missing.is_empty() {
            info!(stage = %self.stage, "all packages already installed");
            return Ok(());
        }

        if ctx.options.dry_run {
            info!(
                stage = %self.stage,
                installer = ctx.installer.name(),
                packages = %missing.join(", "),
                "dry-run: would install packages"
            );
            return Ok(());
        }

        let installer = ctx.installer.name();
        ctx.until_cancelled(
            &format!("{installer} install"),
            ctx.installer.install(&missing),
        )
        .await
        .with_context(|| format!("installing {} via {installer}", missing.join(", ")))
    }

    async fn bundle_brewfile(&self, ctx: &ExecutionContext) -> anyhow::Result<()> {
        let Some(brewfile) = &self.brewfile else {
            return Ok(());
        };
        let path = ctx.expand_path(brewfile);

        if ctx.options.dry_run {
            info!(
                stage = %self.stage,
                brewfile = %path.display(),
                "dry-run: would run brew bundle"
            );
            return Ok(());
        }

        let brew = Homebrew::new(Arc::clone(&ctx.runner));
        ctx.until_cancelled("brew bundle", brew.bundle(&path))
            .await
            .with_context(|| format!("installing Brewfile {}", path.display()))
    }

    async fn run_cmd(&self, ctx: &ExecutionContext) -> anyhow::Result<()> {
        let Some(cmd) = &self.cmd else {
            return Ok(());
        };

        if ctx.options.dry_run {
            info!(stage = %self.stage, cmd = %cmd, "dry-run: would run command");
            return Ok(());
        }

        let (program, args) = shell_command(cmd);
        debug!(stage = %self.stage, cmd = %cmd, "running command");
        ctx.run_command(program, &args)
            .await
            .with_context(|| format!("running `{cmd}`"))
    }
}

/// Program and arguments that run `cmd` through the platform shell.
pub fn shell_command(cmd: &str) -> (&'static str, Vec<String>) {
    if cfg!(windows) {
        ("cmd", vec!["/C".to_string(), cmd.to_string()])
    } else {
        ("sh", vec!["-c".to_string(), cmd.to_string()])
    }
}
