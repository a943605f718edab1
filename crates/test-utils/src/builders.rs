#![allow(dead_code)]

use dotgraph::config::{
    ConditionConfig, ConfigFile, MergeConfig, RawConfigFile, StageConfig,
};
use dotgraph::errors::DotgraphError;

/// Builder for `ConfigFile` to simplify test setup.
pub struct ConfigFileBuilder {
    config: RawConfigFile,
}

impl ConfigFileBuilder {
    pub fn new() -> Self {
        Self {
            config: RawConfigFile::default(),
        }
    }

    pub fn with_stage(mut self, name: &str, stage: StageConfig) -> Self {
        self.config.stage.insert(name.to_string(), stage);
        self
    }

    pub fn with_merge(mut self, name: &str, after: &[&str]) -> Self {
        self.config.merge.insert(
            name.to_string(),
            MergeConfig {
                after: after.iter().map(|s| s.to_string()).collect(),
            },
        );
        self
    }

    pub fn with_log_dir(mut self, dir: &str) -> Self {
        self.config.config.log_dir = Some(dir.to_string());
        self
    }

    pub fn with_work_dir(mut self, dir: &str) -> Self {
        self.config.config.work_dir = Some(dir.to_string());
        self
    }

    pub fn raw(self) -> RawConfigFile {
        self.config
    }

    pub fn try_build(self) -> Result<ConfigFile, DotgraphError> {
        ConfigFile::try_from(self.config)
    }

    pub fn build(self) -> ConfigFile {
        self.try_build()
            .expect("Failed to build valid config from builder")
    }
}

impl Default for ConfigFileBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for `StageConfig`.
pub struct StageConfigBuilder {
    stage: StageConfig,
}

impl StageConfigBuilder {
    /// Stage without any action.
    pub fn new() -> Self {
        Self {
            stage: StageConfig::default(),
        }
    }

    pub fn cmd(mut self, cmd: &str) -> Self {
        self.stage.cmd = Some(cmd.to_string());
        self
    }

    pub fn package(mut self, package: &str) -> Self {
        self.stage.packages.push(package.to_string());
        self
    }

    pub fn brewfile(mut self, path: &str) -> Self {
        self.stage.brewfile = Some(path.to_string());
        self
    }

    pub fn after(mut self, dep: &str) -> Self {
        self.stage.after.push(dep.to_string());
        self
    }

    pub fn platform(mut self, platform: &str) -> Self {
        self.stage.platform = Some(platform.to_string());
        self
    }

    pub fn requires(mut self, command: &str) -> Self {
        self.stage.requires.push(command.to_string());
        self
    }

    pub fn unless(mut self, condition: ConditionConfig) -> Self {
        self.stage.unless.push(condition);
        self
    }

    pub fn optional(mut self) -> Self {
        self.stage.optional = true;
        self
    }

    pub fn build(self) -> StageConfig {
        self.stage
    }
}

impl Default for StageConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
