// src/config/model.rs

use std::collections::BTreeMap;

use serde::Deserialize;

use crate::condition::{self, Condition};

/// Configuration exactly as read from a TOML file.
///
/// ```toml
/// [config]
/// log_dir = "~/.cache/dotgraph-logs"
///
/// [stage.brew]
/// platform = "darwin"
/// cmd = "./install-homebrew.sh"
/// unless = [{ command_exists = "brew" }]
///
/// [stage.tools]
/// after = ["brew"]
/// packages = ["git", "ripgrep"]
///
/// [merge.base]
/// after = ["tools", "dotfiles"]
/// ```
///
/// All sections are optional at this level; [`ConfigFile`] is the
/// validated form.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct RawConfigFile {
    /// Global settings from `[config]`.
    #[serde(default)]
    pub config: ConfigSection,

    /// All stages from `[stage.<name>]`.
    #[serde(default)]
    pub stage: BTreeMap<String, StageConfig>,

    /// Merge points from `[merge.<name>]`.
    #[serde(default)]
    pub merge: BTreeMap<String, MergeConfig>,
}

/// Validated configuration.
///
/// Obtained through `ConfigFile::try_from(raw)` (or
/// [`load_and_validate`](crate::config::load_and_validate)), which
/// guarantees that names are unique across stages and merges, every `after`
/// entry exists, and the dependency graph has no cycles.
#[derive(Debug, Clone)]
pub struct ConfigFile {
    pub config: ConfigSection,
    pub stage: BTreeMap<String, StageConfig>,
    pub merge: BTreeMap<String, MergeConfig>,
    order: Vec<String>,
}

impl ConfigFile {
    pub(crate) fn new_unchecked(
        config: ConfigSection,
        stage: BTreeMap<String, StageConfig>,
        merge: BTreeMap<String, MergeConfig>,
        order: Vec<String>,
    ) -> Self {
        Self {
            config,
            stage,
            merge,
            order,
        }
    }

    /// Stage and merge names in dependency order.
    pub fn order(&self) -> &[String] {
        &self.order
    }

    /// Dependencies of a stage or merge point.
    pub fn after(&self, name: &str) -> &[String] {
        if let Some(stage) = self.stage.get(name) {
            return &stage.after;
        }
        self.merge
            .get(name)
            .map(|m| m.after.as_slice())
            .unwrap_or(&[])
    }
}

/// `[config]` section.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct ConfigSection {
    /// Where failed command output is written. Defaults to
    /// `~/.cache/dotgraph-logs`.
    #[serde(default)]
    pub log_dir: Option<String>,

    /// Overrides `$HOME` as the base for `~` / `$HOME` expansion.
    #[serde(default)]
    pub work_dir: Option<String>,
}

/// `[stage.<name>]` section.
///
/// Actions run in this order: `packages`, `brewfile`, `cmd`. A stage with
/// none of them is a no-op (useful as a gate).
#[derive(Debug, Clone, Deserialize, Default)]
pub struct StageConfig {
    /// Shell command (`sh -c`, or `cmd /C` on Windows).
    #[serde(default)]
    pub cmd: Option<String>,

    /// Packages to install through the selected installer; already
    /// installed ones are skipped.
    #[serde(default)]
    pub packages: Vec<String>,

    /// Brewfile passed to `brew bundle`.
    #[serde(default)]
    pub brewfile: Option<String>,

    /// Stages or merge points this stage waits for.
    #[serde(default)]
    pub after: Vec<String>,

    /// Only run on this platform (`"darwin"`, `"linux"`, ...).
    #[serde(default)]
    pub platform: Option<String>,

    /// Commands that must be on the search path.
    #[serde(default)]
    pub requires: Vec<String>,

    /// Skip the stage if any of these holds.
    #[serde(default)]
    pub unless: Vec<ConditionConfig>,

    /// Failures only produce a warning.
    #[serde(default)]
    pub optional: bool,
}

/// `[merge.<name>]` section: a no-op join point.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct MergeConfig {
    #[serde(default)]
    pub after: Vec<String>,
}

/// Condition as written in `unless = [...]`, e.g.
/// `{ file_exists = "~/.zpm" }` or `{ not = { command_exists = "brew" } }`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConditionConfig {
    FileExists(String),
    CommandExists(String),
    EnvSet(String),
    Platform(String),
    Not(Box<ConditionConfig>),
    All(Vec<ConditionConfig>),
    Any(Vec<ConditionConfig>),
}

impl ConditionConfig {
    pub fn to_condition(&self) -> Condition {
        match self {
            ConditionConfig::FileExists(path) => condition::file_exists(path.clone()),
            ConditionConfig::CommandExists(name) => condition::command_exists(name.clone()),
            ConditionConfig::EnvSet(key) => condition::env_set(key.clone()),
            ConditionConfig::Platform(os) => condition::is_platform(os.clone()),
            ConditionConfig::Not(inner) => condition::not(inner.to_condition()),
            ConditionConfig::All(items) => {
                condition::and(items.iter().map(ConditionConfig::to_condition))
            }
            ConditionConfig::Any(items) => {
                condition::or(items.iter().map(ConditionConfig::to_condition))
            }
        }
    }
}
