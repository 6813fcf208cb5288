//! Cluster Configuration
//!
//! Knobs shared by every member of an in-process cluster. Values come from
//! `Default`, from environment variables (`ClusterConfig::from_env`) or from
//! the builder-style setters used by tests.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

pub const ENV_PARTITION_COUNT: &str = "CLUSTER_PARTITION_COUNT";
pub const ENV_LOAD_ALL_PUBLISHES_ADD_EVENT: &str = "MAP_LOAD_ALL_PUBLISHES_ADD_EVENT";
pub const ENV_LOADER_BATCH_SIZE: &str = "MAP_LOADER_BATCH_SIZE";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClusterConfig {
    /// Number of fixed partitions keys are hashed into.
    pub partition_count: u32,
    /// Whether `load_all` publishes an entry event for every loaded key.
    pub load_all_publishes_add_event: bool,
    /// Maximum number of keys handed to the loader in one `load_all` call.
    pub loader_batch_size: usize,
}

impl Default for ClusterConfig {
    fn default() -> Self {
        Self {
            partition_count: 256,
            load_all_publishes_add_event: false,
            loader_batch_size: 1000,
        }
    }
}

impl ClusterConfig {
    /// Builds a config from defaults overridden by environment variables.
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();

        if let Some(value) = env_value::<u32>(ENV_PARTITION_COUNT)? {
            config.partition_count = value;
        }
        if let Some(value) = env_value::<bool>(ENV_LOAD_ALL_PUBLISHES_ADD_EVENT)? {
            config.load_all_publishes_add_event = value;
        }
        if let Some(value) = env_value::<usize>(ENV_LOADER_BATCH_SIZE)? {
            config.loader_batch_size = value;
        }

        config.validate()?;
        Ok(config)
    }

    pub fn with_load_all_publishes_add_event(mut self, enabled: bool) -> Self {
        self.load_all_publishes_add_event = enabled;
        self
    }

    pub fn with_partition_count(mut self, partition_count: u32) -> Self {
        self.partition_count = partition_count;
        self
    }

    pub fn with_loader_batch_size(mut self, batch_size: usize) -> Self {
        self.loader_batch_size = batch_size;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.partition_count == 0 {
            anyhow::bail!("{} must be > 0", ENV_PARTITION_COUNT);
        }
        if self.loader_batch_size == 0 {
            anyhow::bail!("{} must be > 0", ENV_LOADER_BATCH_SIZE);
        }
        Ok(())
    }
}

fn env_value<T>(name: &str) -> Result<Option<T>>
where
    T: FromStr,
    <T as FromStr>::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(name) {
        Ok(raw) => {
            let value = raw
                .trim()
                .parse::<T>()
                .with_context(|| format!("invalid value for {}: {:?}", name, raw))?;
            Ok(Some(value))
        }
        Err(_) => Ok(None),
    }
}
