// src/config/validate.rs

use petgraph::algo::toposort;
use petgraph::graphmap::DiGraphMap;

use crate::config::model::{ConfigFile, RawConfigFile};
use crate::errors::{DotgraphError, Result};

impl TryFrom<RawConfigFile> for ConfigFile {
    type Error = DotgraphError;

    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        let order = validate_raw_config(&raw)?;
        Ok(ConfigFile::new_unchecked(raw.config, raw.stage, raw.merge, order))
    }
}

/// Validate `cfg` and return stage / merge names in dependency order.
fn validate_raw_config(cfg: &RawConfigFile) -> Result<Vec<String>> {
    ensure_has_stages(cfg)?;
    validate_names(cfg)?;
    validate_stage_fields(cfg)?;
    validate_dependencies(cfg)?;
    validate_dag(cfg)
}

fn ensure_has_stages(cfg: &RawConfigFile) -> Result<()> {
    if cfg.stage.is_empty() {
        return Err(DotgraphError::ConfigError(
            "config must contain at least one [stage.<name>] section".to_string(),
        ));
    }
    Ok(())
}

fn validate_names(cfg: &RawConfigFile) -> Result<()> {
    for name in cfg.merge.keys() {
        if cfg.stage.contains_key(name) {
            return Err(DotgraphError::DuplicateStage(name.clone()));
        }
    }
    for name in cfg.stage.keys().chain(cfg.merge.keys()) {
        if name.trim().is_empty() {
            return Err(DotgraphError::ConfigError(
                "stage and merge names must not be empty".to_string(),
            ));
        }
    }
    Ok(())
}

fn validate_stage_fields(cfg: &RawConfigFile) -> Result<()> {
    for (name, stage) in cfg.stage.iter() {
        if let Some(platform) = &stage.platform {
            if platform.trim().is_empty() {
                return Err(DotgraphError::ConfigError(format!(
                    "stage '{}' has an empty `platform`",
                    name
                )));
            }
        }
        if let Some(cmd) = &stage.cmd {
            if cmd.trim().is_empty() {
                return Err(DotgraphError::ConfigError(format!(
                    "stage '{}' has an empty `cmd`",
                    name
                )));
            }
        }
    }
    for (name, merge) in cfg.merge.iter() {
        if merge.after.is_empty() {
            return Err(DotgraphError::ConfigError(format!(
                "merge '{}' must list at least one stage in `after`",
                name
            )));
        }
    }
    Ok(())
}

fn validate_dependencies(cfg: &RawConfigFile) -> Result<()> {
    let stage_deps = cfg.stage.iter().map(|(name, s)| (name, &s.after));
    let merge_deps = cfg.merge.iter().map(|(name, m)| (name, &m.after));

    for (name, after) in stage_deps.chain(merge_deps) {
        for dep in after.iter() {
            if !cfg.stage.contains_key(dep) && !cfg.merge.contains_key(dep) {
                return Err(DotgraphError::ConfigError(format!(
                    "stage '{}' has unknown dependency '{}' in `after`",
                    name, dep
                )));
            }
            if dep == name {
                return Err(DotgraphError::ConfigError(format!(
                    "stage '{}' cannot depend on itself in `after`",
                    name
                )));
            }
        }
    }
    Ok(())
}

fn validate_dag(cfg: &RawConfigFile) -> Result<Vec<String>> {
    // Edge direction: dep -> stage
    // For:
    //   [stage.B]
    //   after = ["A"]
    // we add edge A -> B.
    let mut graph: DiGraphMap<&str, ()> = DiGraphMap::new();

    for name in cfg.stage.keys().chain(cfg.merge.keys()) {
        graph.add_node(name.as_str());
    }

    for (name, stage) in cfg.stage.iter() {
        for dep in stage.after.iter() {
            graph.add_edge(dep.as_str(), name.as_str(), ());
        }
    }
    for (name, merge) in cfg.merge.iter() {
        for dep in merge.after.iter() {
            graph.add_edge(dep.as_str(), name.as_str(), ());
        }
    }

    match toposort(&graph, None) {
        Ok(order) => Ok(order.into_iter().map(str::to_string).collect()),
        Err(cycle) => Err(DotgraphError::DagCycle(format!(
            "cycle detected in stage DAG involving stage '{}'",
            cycle.node_id()
        ))),
    }
}
