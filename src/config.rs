// src/config.rs

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const DEFAULT_REDIS_URL: &str = "redis://localhost:6379/0";
pub const DEFAULT_PROC_ROOT: &str = "/proc";
const CONFIG_DIR_NAME: &str = "service-monitor";
const CONFIG_FILE_NAME: &str = "config.yaml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid YAML in {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Target {
    Redis,
    Linux,
    Kafka,
    Jvm,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputMode {
    Pretty,
    Json,
}

/// Whether a live-connection collector keeps its connection between calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionPolicy {
    /// Connect lazily and reuse; a failed call drops the connection.
    Persistent,
    /// Open a fresh connection for every `collect_all()` and close it after.
    #[value(alias = "per_call")]
    PerCall,
}

/// Raw settings as they appear in the YAML file. Every key is optional; the
/// CLI produces the same shape so the two can be layered.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    pub target: Option<Target>,
    pub redis_url: Option<String>,
    pub kafka_bootstrap: Option<String>,
    pub kafka_group: Option<String>,
    pub jmx_url: Option<String>,
    pub interval: Option<i64>,
    pub output: Option<OutputMode>,
    pub ping_samples: Option<u32>,
    pub ping_timeout_ms: Option<u64>,
    pub cpu_sample_delay_ms: Option<u64>,
    pub connection_policy: Option<ConnectionPolicy>,
    pub proc_root: Option<PathBuf>,
}

impl FileConfig {
    pub fn from_yaml_str(text: &str, origin: &Path) -> Result<Self, ConfigError> {
        // An empty file deserializes to unit, not a mapping.
        if text.trim().is_empty() {
            return Ok(FileConfig::default());
        }
        serde_yaml::from_str(text).map_err(|source| ConfigError::Parse {
            path: origin.to_path_buf(),
            source,
        })
    }

    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml_str(&text, path)
    }

    /// Layers `overrides` on top of `self`; set values in `overrides` win.
    pub fn merge(self, overrides: FileConfig) -> FileConfig {
        FileConfig {
            target: overrides.target.or(self.target),
            redis_url: overrides.redis_url.or(self.redis_url),
            kafka_bootstrap: overrides.kafka_bootstrap.or(self.kafka_bootstrap),
            kafka_group: overrides.kafka_group.or(self.kafka_group),
            jmx_url: overrides.jmx_url.or(self.jmx_url),
            interval: overrides.interval.or(self.interval),
            output: overrides.output.or(self.output),
            ping_samples: overrides.ping_samples.or(self.ping_samples),
            ping_timeout_ms: overrides.ping_timeout_ms.or(self.ping_timeout_ms),
            cpu_sample_delay_ms: overrides.cpu_sample_delay_ms.or(self.cpu_sample_delay_ms),
            connection_policy: overrides.connection_policy.or(self.connection_policy),
            proc_root: overrides.proc_root.or(self.proc_root),
        }
    }
}

/// Fully resolved settings handed to the collectors and the polling loop.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonitorConfig {
    pub target: Target,
    pub redis_url: String,
    pub kafka_bootstrap: Option<String>,
    pub kafka_group: Option<String>,
    pub jmx_url: Option<String>,
    /// Seconds between polls; zero or less polls once.
    pub interval: i64,
    pub output: OutputMode,
    pub ping_samples: usize,
    pub ping_timeout: Duration,
    pub cpu_sample_delay: Duration,
    pub connection_policy: ConnectionPolicy,
    pub proc_root: PathBuf,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        MonitorConfig::from(FileConfig::default())
    }
}

impl From<FileConfig> for MonitorConfig {
    fn from(raw: FileConfig) -> Self {
        MonitorConfig {
            target: raw.target.unwrap_or(Target::Redis),
            redis_url: raw
                .redis_url
                .unwrap_or_else(|| DEFAULT_REDIS_URL.to_string()),
            kafka_bootstrap: raw.kafka_bootstrap,
            kafka_group: raw.kafka_group,
            jmx_url: raw.jmx_url,
            interval: raw.interval.unwrap_or(0),
            output: raw.output.unwrap_or(OutputMode::Pretty),
            ping_samples: raw.ping_samples.unwrap_or(3).max(1) as usize,
            ping_timeout: Duration::from_millis(raw.ping_timeout_ms.unwrap_or(500).max(1)),
            cpu_sample_delay: Duration::from_millis(raw.cpu_sample_delay_ms.unwrap_or(200).max(1)),
            connection_policy: raw.connection_policy.unwrap_or(ConnectionPolicy::Persistent),
            proc_root: raw
                .proc_root
                .unwrap_or_else(|| PathBuf::from(DEFAULT_PROC_ROOT)),
        }
    }
}

impl MonitorConfig {
    /// Reads the file at `explicit` (which must exist), or the per-user
    /// default location if present, then applies `overrides`.
    pub fn load(explicit: Option<&Path>, overrides: FileConfig) -> Result<Self, ConfigError> {
        let file = match explicit {
            Some(path) => FileConfig::from_path(path)?,
            None => match default_config_path().filter(|path| path.is_file()) {
                Some(path) => FileConfig::from_path(&path)?,
                None => FileConfig::default(),
            },
        };
        Ok(MonitorConfig::from(file.merge(overrides)))
    }
}

pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME))
}
