// src/dag/graph.rs

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::future::Future;
use std::sync::Arc;

use petgraph::algo::toposort;
use petgraph::graphmap::DiGraphMap;
use tracing::warn;

use crate::context::ExecutionContext;
use crate::dag::stage::{boxed_handler, Stage, StageId, StageMut};
use crate::errors::{DotgraphError, Result};
use crate::types::StageName;

/// Dependency graph of stages, keyed by name.
///
/// The graph owns its stages; stages refer to each other by [`StageId`].
/// Registration never fails: duplicate names and bad references are
/// reported by [`validate`](Graph::validate), which `execute` runs before
/// launching anything.
#[derive(Debug, Clone)]
pub struct Graph {
    tag: u64,
    pub(crate) stages: Vec<Stage>,
    by_name: HashMap<StageName, StageId>,
    duplicates: Vec<StageName>,
    pub(crate) platform: Option<String>,
}

static NEXT_GRAPH_TAG: AtomicU64 = AtomicU64::new(0);

impl Default for Graph {
    fn default() -> Self {
        Self {
            tag: NEXT_GRAPH_TAG.fetch_add(1, Ordering::Relaxed),
            stages: Vec::new(),
            by_name: HashMap::new(),
            duplicates: Vec::new(),
            platform: None,
        }
    }
}

impl Graph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run as if on `platform` instead of the context's OS.
    pub fn with_platform(mut self, platform: impl Into<String>) -> Self {
        self.set_platform(platform);
        self
    }

    pub fn set_platform(&mut self, platform: impl Into<String>) {
        self.platform = Some(platform.into());
    }

    /// Platform override, if any.
    pub fn platform(&self) -> Option<&str> {
        self.platform.as_deref()
    }

    /// Register a stage running `run`.
    pub fn add_stage<F, Fut>(&mut self, name: impl Into<String>, run: F) -> StageMut<'_>
    where
        F: Fn(Arc<ExecutionContext>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        self.insert(Stage::new(name.into(), boxed_handler(run)))
    }

    /// Scope whose stages only run on `platform`.
    pub fn add_platform(&mut self, platform: impl Into<String>) -> PlatformScope<'_> {
        PlatformScope {
            graph: self,
            platform: platform.into(),
        }
    }

    /// Register a no-op stage `name` that waits for all of `stages`, and
    /// return a scope whose stages run after it.
    pub fn add_merge(&mut self, name: impl Into<String>, stages: &[StageId]) -> MergeScope<'_> {
        let merge = self
            .add_stage(name, |_ctx| async { Ok::<(), anyhow::Error>(()) })
            .after(stages.iter().copied())
            .id();
        MergeScope { graph: self, merge }
    }

    fn insert(&mut self, stage: Stage) -> StageMut<'_> {
        let id = StageId::new(self.tag, self.stages.len());
        if self.by_name.contains_key(&stage.name) {
            warn!(stage = %stage.name, "stage registered twice");
            self.duplicates.push(stage.name.clone());
        } else {
            self.by_name.insert(stage.name.clone(), id);
        }
        self.stages.push(stage);

        StageMut {
            stage: &mut self.stages[id.index],
            id,
        }
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    /// Look up a stage id by name.
    pub fn find(&self, name: &str) -> Option<StageId> {
        self.by_name.get(name).copied()
    }

    fn owns(&self, id: StageId) -> bool {
        id.graph == self.tag && id.index < self.stages.len()
    }

    pub fn stage(&self, id: StageId) -> Option<&Stage> {
        self.owns(id).then(|| &self.stages[id.index])
    }

    /// Builder for an already registered stage.
    pub fn stage_mut(&mut self, id: StageId) -> Option<StageMut<'_>> {
        if !self.owns(id) {
            return None;
        }
        let stage = &mut self.stages[id.index];
        Some(StageMut { stage, id })
    }

    pub fn stages(&self) -> impl Iterator<Item = (StageId, &Stage)> {
        self.stages
            .iter()
            .enumerate()
            .map(|(idx, stage)| (StageId::new(self.tag, idx), stage))
    }

    /// Stages without dependencies.
    pub fn roots(&self) -> Vec<StageId> {
        self.stages()
            .filter(|(_, stage)| stage.dependencies.is_empty())
            .map(|(id, _)| id)
            .collect()
    }

    /// Distinct stages that list `id` among their dependencies.
    pub fn dependents_of(&self, id: StageId) -> Vec<StageId> {
        self.stages()
            .filter(|(_, stage)| stage.dependencies.contains(&id))
            .map(|(dependent, _)| dependent)
            .collect()
    }

    /// Check that the graph can be executed:
    /// - no two stages share a name
    /// - every dependency refers to a stage of this graph
    /// - there are no cycles (including a stage depending on itself)
    pub fn validate(&self) -> Result<()> {
        if let Some(name) = self.duplicates.first() {
            return Err(DotgraphError::DuplicateStage(name.clone()));
        }

        for stage in &self.stages {
            for dep in &stage.dependencies {
                if !self.owns(*dep) {
                    return Err(DotgraphError::StageNotFound(format!(
                        "stage '{}' depends on stage #{} which is not part of this graph",
                        stage.name, dep.index
                    )));
                }
            }
        }

        // Edge direction: dep -> stage.
        let mut graph: DiGraphMap<usize, ()> = DiGraphMap::new();
        for idx in 0..self.stages.len() {
            graph.add_node(idx);
        }
        for (idx, stage) in self.stages.iter().enumerate() {
            for dep in &stage.dependencies {
                graph.add_edge(dep.index, idx, ());
            }
        }

        match toposort(&graph, None) {
            Ok(_order) => Ok(()),
            Err(cycle) => Err(DotgraphError::DagCycle(format!(
                "cycle detected in stage graph involving stage '{}'",
                self.stages[cycle.node_id()].name
            ))),
        }
    }
}

/// Registers stages restricted to one platform.
pub struct PlatformScope<'g> {
    graph: &'g mut Graph,
    platform: String,
}

impl PlatformScope<'_> {
    pub fn platform(&self) -> &str {
        &self.platform
    }

    pub fn add_stage<F, Fut>(&mut self, name: impl Into<String>, run: F) -> StageMut<'_>
    where
        F: Fn(Arc<ExecutionContext>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        let platform = self.platform.clone();
        self.graph.add_stage(name, run).platform(platform)
    }
}

/// Registers stages that run after a merge point.
pub struct MergeScope<'g> {
    graph: &'g mut Graph,
    merge: StageId,
}

impl MergeScope<'_> {
    /// Id of the synthetic merge stage.
    pub fn id(&self) -> StageId {
        self.merge
    }

    pub fn add_stage<F, Fut>(&mut self, name: impl Into<String>, run: F) -> StageMut<'_>
    where
        F: Fn(Arc<ExecutionContext>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        let merge = self.merge;
        self.graph.add_stage(name, run).after([merge])
    }
}
