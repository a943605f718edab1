// src/dag/scheduler.rs

//! Concurrent graph execution.
//!
//! Every run starts from a fresh [`RunPlan`]: a snapshot of the stage
//! definitions plus one [`StateCell`] per stage. Roots are spawned onto a
//! `JoinSet`; each stage, once finished, spawns those dependents whose
//! dependencies are now all satisfied onto its own `JoinSet` and waits for
//! them. A dependent may be spawned by several predecessors, but only the
//! task that wins the `Pending -> Running` claim runs it.

use std::collections::BTreeMap;
use std::sync::Arc;

use tokio::task::JoinSet;
use tracing::{debug, error, info, trace, warn};

use crate::context::ExecutionContext;
use crate::dag::graph::Graph;
use crate::dag::stage::Stage;
use crate::dag::state::{StageState, StateCell};
use crate::errors::{DotgraphError, Result};
use crate::types::{BoxFuture, StageName};

struct PlannedStage {
    stage: Stage,
    dependents: Vec<usize>,
    state: StateCell,
}

struct RunPlan {
    stages: Vec<PlannedStage>,
    platform: Option<String>,
}

impl RunPlan {
    fn new(graph: &Graph) -> Self {
        let mut stages: Vec<PlannedStage> = graph
            .stages
            .iter()
            .cloned()
            .map(|stage| PlannedStage {
                stage,
                dependents: Vec::new(),
                state: StateCell::new(),
            })
            .collect();

        for idx in 0..stages.len() {
            let deps = stages[idx].stage.dependencies.clone();
            for dep in deps {
                let dependents = &mut stages[dep.index].dependents;
                if !dependents.contains(&idx) {
                    dependents.push(idx);
                }
            }
        }

        Self {
            stages,
            platform: graph.platform.clone(),
        }
    }

    fn deps_satisfied(&self, idx: usize) -> bool {
        self.stages[idx]
            .stage
            .dependencies
            .iter()
            .all(|dep| self.stages[dep.index].state.load().satisfies_dependents())
    }

    fn report(&self, mut errors: Vec<DotgraphError>) -> RunReport {
        errors.sort_by(|a, b| {
            (a.stage().is_none(), a.stage()).cmp(&(b.stage().is_none(), b.stage()))
        });

        let states = self
            .stages
            .iter()
            .map(|planned| (planned.stage.name.clone(), planned.state.load()))
            .collect();

        RunReport { states, errors }
    }
}

/// Outcome of one graph execution.
///
/// Holds the final state of every stage and every fatal error raised,
/// ordered by the name of the stage that raised it.
#[derive(Debug)]
pub struct RunReport {
    states: BTreeMap<StageName, StageState>,
    errors: Vec<DotgraphError>,
}

impl RunReport {
    pub fn state_of(&self, stage: &str) -> Option<StageState> {
        self.states.get(stage).copied()
    }

    pub fn states(&self) -> &BTreeMap<StageName, StageState> {
        &self.states
    }

    /// Names of the stages that ended in `state`, sorted.
    pub fn stages_in(&self, state: StageState) -> Vec<&str> {
        self.states
            .iter()
            .filter(|(_, s)| **s == state)
            .map(|(name, _)| name.as_str())
            .collect()
    }

    pub fn errors(&self) -> &[DotgraphError] {
        &self.errors
    }

    pub fn is_success(&self) -> bool {
        self.errors.is_empty()
    }

    /// The error of the lexicographically smallest failing stage, if any.
    pub fn into_result(self) -> Result<()> {
        match self.errors.into_iter().next() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

impl Graph {
    /// Execute the graph and return the first error, if any.
    ///
    /// See [`execute_with_report`](Self::execute_with_report).
    pub async fn execute(&self, ctx: Arc<ExecutionContext>) -> Result<()> {
        self.execute_with_report(ctx).await?.into_result()
    }

    /// Execute the graph.
    ///
    /// Configuration errors (see [`validate`](Self::validate)) are returned
    /// as `Err` before any stage runs. Stage failures are collected in the
    /// returned report; a failed stage's dependents never run, but sibling
    /// branches keep going and the call only returns once every spawned
    /// task has finished.
    pub async fn execute_with_report(&self, ctx: Arc<ExecutionContext>) -> Result<RunReport> {
        self.validate()?;

        let plan = Arc::new(RunPlan::new(self));
        let roots = self.roots();
        info!(stages = self.len(), roots = roots.len(), "executing bootstrap graph");

        let mut set = JoinSet::new();
        for root in roots {
            set.spawn(run_stage(Arc::clone(&plan), Arc::clone(&ctx), root.index));
        }
        let errors = join_all(set).await;

        let report = plan.report(errors);
        if report.is_success() {
            info!("✓ bootstrap graph completed successfully");
        } else {
            error!(failed = report.errors.len(), "bootstrap graph failed");
        }
        Ok(report)
    }
}

fn run_stage(
    plan: Arc<RunPlan>,
    ctx: Arc<ExecutionContext>,
    idx: usize,
) -> BoxFuture<'static, Vec<DotgraphError>> {
    Box::pin(async move {
        let planned = &plan.stages[idx];
        let name = planned.stage.name.as_str();

        if !planned.state.claim() {
            trace!(stage = %name, "stage already claimed by another predecessor");
            return Vec::new();
        }

        match run_claimed(plan.platform.as_deref(), &ctx, &planned.stage).await {
            Ok(state) => planned.state.finish(state),
            Err(err) => {
                planned.state.finish(StageState::Failed);
                error!(stage = %name, error = %err, "stage failed; dependents will not run");
                return vec![err];
            }
        }

        let mut set = JoinSet::new();
        for &dependent in &planned.dependents {
            if plan.stages[dependent].state.load() != StageState::Pending {
                continue;
            }
            if !plan.deps_satisfied(dependent) {
                trace!(
                    stage = %name,
                    dependent = %plan.stages[dependent].stage.name,
                    "dependent still waiting on other dependencies"
                );
                continue;
            }
            set.spawn(run_stage(Arc::clone(&plan), Arc::clone(&ctx), dependent));
        }

        join_all(set).await
    })
}

/// Gates and handler of a claimed stage. Returns the terminal state to
/// record, or the fatal error.
async fn run_claimed(
    platform_override: Option<&str>,
    ctx: &Arc<ExecutionContext>,
    stage: &Stage,
) -> Result<StageState> {
    let current = platform_override.unwrap_or(ctx.env.os.as_str());
    if let Some(expected) = stage.platform.as_deref() {
        if expected != current {
            debug!(
                stage = %stage.name,
                reason = "platform mismatch",
                expected,
                current,
                "skipping stage"
            );
            return Ok(StageState::Skipped);
        }
    }

    if let Some(condition) = stage.unless.iter().find(|c| c.evaluate(ctx)) {
        debug!(
            stage = %stage.name,
            reason = "unless condition met",
            condition = %condition,
            "skipping stage"
        );
        return Ok(StageState::Skipped);
    }

    for command in &stage.requires {
        if ctx.runner.lookup(command).is_ok() {
            continue;
        }
        if stage.optional {
            debug!(
                stage = %stage.name,
                reason = "missing requirement",
                command = %command,
                "skipping stage"
            );
            return Ok(StageState::Skipped);
        }
        return Err(DotgraphError::MissingCommand {
            stage: stage.name.clone(),
            command: command.clone(),
        });
    }

    info!(stage = %stage.name, "==> running stage");

    // Own task, so a panicking handler is reported against its stage.
    let outcome = tokio::spawn((stage.handler)(Arc::clone(ctx))).await;
    let failure = match outcome {
        Ok(Ok(())) => None,
        Ok(Err(cause)) => Some(DotgraphError::StageFailed {
            stage: stage.name.clone(),
            cause,
        }),
        Err(join_err) if join_err.is_panic() => Some(DotgraphError::StagePanicked {
            stage: stage.name.clone(),
        }),
        Err(join_err) => Some(DotgraphError::StageFailed {
            stage: stage.name.clone(),
            cause: anyhow::Error::new(join_err),
        }),
    };

    match failure {
        None => {
            info!(stage = %stage.name, "✓ stage completed");
            Ok(StageState::Succeeded)
        }
        Some(err) if stage.optional => {
            warn!(stage = %stage.name, error = %err, "stage failed (optional)");
            Ok(StageState::FailedOptional)
        }
        Some(err) => Err(err),
    }
}

async fn join_all(mut set: JoinSet<Vec<DotgraphError>>) -> Vec<DotgraphError> {
    let mut errors = Vec::new();
    while let Some(joined) = set.join_next().await {
        match joined {
            Ok(mut stage_errors) => errors.append(&mut stage_errors),
            Err(err) => errors.push(DotgraphError::Join(err)),
        }
    }
    errors
}
