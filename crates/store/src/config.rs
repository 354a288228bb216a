//! Configuration module
//!
//! YAML configuration with per-section sub-structs and serde defaults.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Store limits and database layout
    #[serde(default)]
    pub store: StoreConfig,
    /// Write-ahead binlog configuration
    #[serde(default)]
    pub binlog: BinlogConfig,
    /// Expiration reaper configuration
    #[serde(default)]
    pub reaper: ReaperConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            store: StoreConfig::default(),
            binlog: BinlogConfig::default(),
            reaper: ReaperConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from YAML file
    pub fn from_file(path: impl AsRef<std::path::Path>) -> Result<Self, ConfigError> {
        let content =
            std::fs::read_to_string(path).map_err(|e| ConfigError::IoError(e.to_string()))?;
        Self::from_yaml(&content)
    }

    /// Load configuration from YAML string
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigError> {
        serde_yaml::from_str(yaml).map_err(|e| ConfigError::ParseError(e.to_string()))
    }
}

/// Store limits
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Number of logical databases sharing the physical keyspace
    #[serde(default = "default_databases")]
    pub databases: u8,
    /// Maximum user key length in bytes
    #[serde(default = "default_max_key_size")]
    pub max_key_size: usize,
    /// Maximum value length in bytes
    #[serde(default = "default_max_value_size")]
    pub max_value_size: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            databases: default_databases(),
            max_key_size: default_max_key_size(),
            max_value_size: default_max_value_size(),
        }
    }
}

/// Write-ahead binlog configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BinlogConfig {
    /// Whether committed batches are appended to the binlog
    #[serde(default)]
    pub enabled: bool,
    /// Directory holding segment files and the index file
    #[serde(default = "default_binlog_dir")]
    pub dir: PathBuf,
    /// Literal prefix of segment file names
    #[serde(default = "default_binlog_prefix")]
    pub file_prefix: String,
    /// Size threshold after which the active segment rotates, in bytes
    #[serde(default = "default_max_segment_size")]
    pub max_segment_size: u64,
    /// Number of segments retained before the oldest are purged
    #[serde(default = "default_max_segment_count")]
    pub max_segment_count: usize,
}

impl Default for BinlogConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            dir: default_binlog_dir(),
            file_prefix: default_binlog_prefix(),
            max_segment_size: default_max_segment_size(),
            max_segment_count: default_max_segment_count(),
        }
    }
}

/// Expiration reaper configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReaperConfig {
    /// Tick interval in milliseconds
    #[serde(default = "default_reaper_tick_ms")]
    pub tick_interval_ms: u64,
    /// Maximum candidates collected per type per tick
    #[serde(default = "default_reaper_chunk")]
    pub scan_chunk: usize,
}

impl Default for ReaperConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: default_reaper_tick_ms(),
            scan_chunk: default_reaper_chunk(),
        }
    }
}

impl ReaperConfig {
    /// Get tick interval as Duration
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }
}

// Default value functions

fn default_databases() -> u8 {
    16
}

fn default_max_key_size() -> usize {
    1024
}

fn default_max_value_size() -> usize {
    16 * 1024 * 1024 // 16MB
}

fn default_binlog_dir() -> PathBuf {
    PathBuf::from("./data/binlog")
}

fn default_binlog_prefix() -> String {
    "tide-bin".to_string()
}

fn default_max_segment_size() -> u64 {
    64 * 1024 * 1024 // 64MB
}

fn default_max_segment_count() -> usize {
    16
}

fn default_reaper_tick_ms() -> u64 {
    1000 // 1 second
}

fn default_reaper_chunk() -> usize {
    256
}

/// Configuration error
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    IoError(String),
    #[error("Parse error: {0}")]
    ParseError(String),
}
