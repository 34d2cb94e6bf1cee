use std::fmt::Debug;

use anyhow::Result;
use figment::{
    providers::{Format, Yaml},
    Figment,
};
use serde::{Deserialize, Serialize};

use crate::options::MigrateOptions;

const LOCAL_ENV: &str = "local";

fn default_env() -> String {
    LOCAL_ENV.to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MigratorConfig {
    #[serde(default = "default_env")]
    pub env: String,
    #[serde(default)]
    pub migration: MigrateOptions,
}

impl Default for MigratorConfig {
    fn default() -> Self {
        MigratorConfig {
            env: default_env(),
            migration: MigrateOptions::default(),
        }
    }
}

impl MigratorConfig {
    pub fn from_path(path: &str) -> Result<MigratorConfig> {
        let config_str = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&config_str)
    }

    fn from_yaml_str(config_str: &str) -> Result<MigratorConfig> {
        let config: MigratorConfig = Figment::new().merge(Yaml::string(config_str)).extract()?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.env.trim().is_empty() {
            return Err(anyhow::anyhow!("env must not be empty"));
        }
        if let Some(name) = &self.migration.changelog_name {
            if name.trim().is_empty() {
                return Err(anyhow::anyhow!("changelog_name must not be empty"));
            }
        }
        if let Some(source) = &self.migration.step_source {
            if source.trim().is_empty() {
                return Err(anyhow::anyhow!("step_source must not be empty"));
            }
        }
        Ok(())
    }

    pub fn structured_logging(&self) -> bool {
        self.env != LOCAL_ENV
    }
}
