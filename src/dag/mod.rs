// src/dag/mod.rs

//! Stage graph and scheduling.
//!
//! - [`stage`] defines stages and the chaining builder used to wire them.
//! - [`graph`] owns the stages, the platform / merge scopes and validation.
//! - [`state`] holds the per-run atomic state register of a stage.
//! - [`scheduler`] executes a graph concurrently and reports the outcome.

pub mod graph;
pub mod scheduler;
pub mod stage;
pub mod state;

pub use graph::{Graph, MergeScope, PlatformScope};
pub use scheduler::RunReport;
pub use stage::{Handler, Stage, StageId, StageMut};
pub use state::StageState;
