// src/dag/stage.rs

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use crate::condition::Condition;
use crate::context::ExecutionContext;
use crate::types::{BoxFuture, StageName};

/// Handle to a stage inside the [`Graph`](super::Graph) that created it.
///
/// Ids are graph-local: each carries the tag of its graph (shared by
/// clones), and [`Graph::validate`](super::Graph::validate) rejects ids
/// minted by any other graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StageId {
    pub(crate) graph: u64,
    pub(crate) index: usize,
}

impl StageId {
    pub(crate) fn new(graph: u64, index: usize) -> Self {
        Self { graph, index }
    }

    pub fn index(self) -> usize {
        self.index
    }
}

/// Type-erased stage handler.
pub type Handler =
    Arc<dyn Fn(Arc<ExecutionContext>) -> BoxFuture<'static, anyhow::Result<()>> + Send + Sync>;

pub(crate) fn boxed_handler<F, Fut>(run: F) -> Handler
where
    F: Fn(Arc<ExecutionContext>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
{
    Arc::new(move |ctx| -> BoxFuture<'static, anyhow::Result<()>> { Box::pin(run(ctx)) })
}

/// Static definition of a stage. Per-run state is kept by the scheduler.
#[derive(Clone)]
pub struct Stage {
    pub(crate) name: StageName,
    pub(crate) handler: Handler,
    pub(crate) dependencies: Vec<StageId>,
    pub(crate) platform: Option<String>,
    pub(crate) requires: Vec<String>,
    pub(crate) unless: Vec<Condition>,
    pub(crate) optional: bool,
}

impl Stage {
    pub(crate) fn new(name: StageName, handler: Handler) -> Self {
        Self {
            name,
            handler,
            dependencies: Vec::new(),
            platform: None,
            requires: Vec::new(),
            unless: Vec::new(),
            optional: false,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Direct dependencies, in the order they were added. May contain
    /// duplicates.
    pub fn dependencies(&self) -> &[StageId] {
        &self.dependencies
    }

    /// Platform this stage is restricted to; `None` runs everywhere.
    pub fn platform(&self) -> Option<&str> {
        self.platform.as_deref()
    }

    pub fn requires(&self) -> &[String] {
        &self.requires
    }

    pub fn unless(&self) -> &[Condition] {
        &self.unless
    }

    pub fn is_optional(&self) -> bool {
        self.optional
    }
}

impl fmt::Debug for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Stage")
            .field("name", &self.name)
            .field("dependencies", &self.dependencies)
            .field("platform", &self.platform)
            .field("requires", &self.requires)
            .field("unless", &self.unless)
            .field("optional", &self.optional)
            .finish_non_exhaustive()
    }
}

/// Chaining builder returned when a stage is registered.
///
/// Holds a mutable borrow of the graph, so a stage can't be changed while
/// the graph is executing.
pub struct StageMut<'g> {
    pub(crate) stage: &'g mut Stage,
    pub(crate) id: StageId,
}

impl<'g> StageMut<'g> {
    /// Run after all of `stages`.
    pub fn after(self, stages: impl IntoIterator<Item = StageId>) -> Self {
        self.stage.dependencies.extend(stages);
        self
    }

    /// Require `command` on the search path.
    pub fn requires(self, command: impl Into<String>) -> Self {
        self.stage.requires.push(command.into());
        self
    }

    /// Skip the stage if `condition` holds.
    pub fn unless(self, condition: Condition) -> Self {
        self.stage.unless.push(condition);
        self
    }

    /// Downgrade failures of this stage to warnings.
    pub fn optional(self) -> Self {
        self.stage.optional = true;
        self
    }

    pub(crate) fn platform(self, platform: impl Into<String>) -> Self {
        self.stage.platform = Some(platform.into());
        self
    }

    pub fn id(&self) -> StageId {
        self.id
    }
}
