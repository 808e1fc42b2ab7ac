//! TaskFan configuration types and loading

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use eyre::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::cluster::PeerAddress;
use crate::loader::LoaderConfig;

/// Main TaskFan configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Loader timing and buffering
    pub loader: LoaderConfig,

    /// Cluster identity and join behavior
    pub cluster: ClusterConfig,

    /// Pool sizes (overridable from the environment)
    pub pools: PoolsConfig,

    /// Fetch boundary behavior
    pub fetch: FetchConfig,
}

impl Config {
    /// Load configuration with fallback chain
    pub fn load(config_path: Option<&PathBuf>) -> Result<Self> {
        // If explicit config path provided, try to load it
        if let Some(path) = config_path {
            return Self::load_from_file(path).context(format!("Failed to load config from {}", path.display()));
        }

        // Try project-local config: .taskfan.yml
        let local_config = PathBuf::from(".taskfan.yml");
        if local_config.exists() {
            match Self::load_from_file(&local_config) {
                Ok(config) => return Ok(config),
                Err(e) => {
                    tracing::warn!("Failed to load config from {}: {}", local_config.display(), e);
                }
            }
        }

        // Try user config: ~/.config/taskfan/taskfan.yml
        if let Some(config_dir) = dirs::config_dir() {
            let user_config = config_dir.join("taskfan").join("taskfan.yml");
            if user_config.exists() {
                match Self::load_from_file(&user_config) {
                    Ok(config) => return Ok(config),
                    Err(e) => {
                        tracing::warn!("Failed to load config from {}: {}", user_config.display(), e);
                    }
                }
            }
        }

        // No config file found, use defaults
        tracing::info!("No config file found, using defaults");
        Ok(Self::default())
    }

    fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path).context("Failed to read config file")?;

        let config: Self = serde_yaml::from_str(&content).context("Failed to parse config file")?;

        tracing::info!("Loaded config from: {}", path.as_ref().display());
        Ok(config)
    }
}

/// Cluster identity and join behavior
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClusterConfig {
    /// Transport protocol advertised in the local address
    pub protocol: String,

    /// Logical system name advertised in the local address
    #[serde(rename = "system-name")]
    pub system_name: String,

    /// Host the local node advertises
    pub host: String,

    /// Port the local node advertises
    pub port: u16,

    /// Delay before the one-shot cluster join
    #[serde(rename = "join-delay-secs")]
    pub join_delay_secs: u64,
}

impl Default for ClusterConfig {
    fn default() -> Self {
        Self {
            protocol: "tcp".to_string(),
            system_name: "taskfan".to_string(),
            host: "127.0.0.1".to_string(),
            port: 2552,
            join_delay_secs: 60,
        }
    }
}

impl ClusterConfig {
    pub fn local_address(&self) -> PeerAddress {
        PeerAddress::new(&self.protocol, &self.system_name, &self.host, self.port)
    }

    pub fn join_delay(&self) -> Duration {
        Duration::from_secs(self.join_delay_secs)
    }
}

/// Pool sizes
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PoolsConfig {
    /// Loader instances behind the smallest-mailbox pool
    #[serde(rename = "data-loader-pool-size")]
    pub data_loader_pool_size: usize,

    /// Lookup workers behind the smallest-mailbox pool
    #[serde(rename = "task-pool-size")]
    pub task_pool_size: usize,

    /// Worker mailbox capacity
    #[serde(rename = "mailbox-capacity")]
    pub mailbox_capacity: usize,
}

impl Default for PoolsConfig {
    fn default() -> Self {
        Self {
            data_loader_pool_size: 4,
            task_pool_size: 4,
            mailbox_capacity: 64,
        }
    }
}

impl PoolsConfig {
    /// Apply the environment overrides. A variable that is absent or not a
    /// positive integer leaves the configured value alone.
    pub fn with_env_overrides(mut self, env: &HashMap<String, String>) -> Self {
        self.data_loader_pool_size = pool_size(env, "DATA_LOADER_POOL_SIZE", self.data_loader_pool_size);
        self.task_pool_size = pool_size(env, "TASK_POOL_SIZE", self.task_pool_size);
        self
    }
}

fn pool_size(env: &HashMap<String, String>, var: &str, default: usize) -> usize {
    env.get(var)
        .and_then(|value| value.parse::<usize>().ok())
        .filter(|&size| size > 0)
        .unwrap_or(default)
}

/// Fetch boundary behavior
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchConfig {
    /// Caller-side timeout for a batch fetch in milliseconds
    #[serde(rename = "request-timeout-ms")]
    pub request_timeout_ms: u64,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            request_timeout_ms: 1000,
        }
    }
}

impl FetchConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}
