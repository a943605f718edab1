// src/config/mod.rs

//! Configuration loading and validation for dotgraph.
//!
//! Responsibilities:
//! - Define the TOML-backed data model (`model.rs`).
//! - Load a config file from disk (`loader.rs`).
//! - Validate names, dependencies and DAG correctness (`validate.rs`).
//! - Turn a validated config into an executable stage graph (`build.rs`).

pub mod build;
pub mod loader;
pub mod model;
pub mod validate;

pub use build::{build_graph, shell_command, StageActions};
pub use loader::{default_config_path, load_and_validate, load_from_path};
pub use model::{
    ConditionConfig, ConfigFile, ConfigSection, MergeConfig, RawConfigFile, StageConfig,
};
