// src/exec/mod.rs

//! Process execution layer.
//!
//! - [`backend`] provides the `CommandRunner` trait consumed by stages and
//!   conditions, and the `RunResult` it reports.
//! - [`command`] holds `RealCommandRunner`, which runs programs with
//!   `tokio::process::Command` and writes failure logs.
//! - [`mock`] holds an in-memory runner for tests.

pub mod backend;
pub mod command;
pub mod mock;

pub use backend::{CommandRunner, RunResult};
pub use command::{default_log_dir, RealCommandRunner};
pub use mock::{MockCommandRunner, RecordedRun};
