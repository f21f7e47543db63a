//! Configuration management (config.toml)
//!
//! Settings live in the platform config directory unless `--config` points
//! elsewhere. A missing default file means defaults; CLI flags override both.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use riposte_core::{SessionConfig, UdpConfig};
use riposte_shared::constants::DEFAULT_PORT;

/// CLI configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Config {
    /// Rollback session settings
    #[serde(default)]
    pub session: SessionConfig,
    /// UDP settings
    #[serde(default)]
    pub network: NetworkConfig,
}

/// UDP transport settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkConfig {
    /// Local address to bind (default: 0.0.0.0:7777)
    #[serde(default = "default_bind")]
    pub bind: String,
    /// Peer to connect to; hosts leave this unset
    #[serde(default)]
    pub peer: Option<String>,
    /// Recent inputs repeated in every packet
    #[serde(default = "default_redundancy")]
    pub redundancy: usize,
    /// Silence before the peer is considered gone
    #[serde(default = "default_disconnect_timeout_ms")]
    pub disconnect_timeout_ms: u64,
    /// Silence before an interruption is reported
    #[serde(default = "default_interrupt_notify_ms")]
    pub interrupt_notify_ms: u64,
}

fn default_bind() -> String {
    format!("0.0.0.0:{}", DEFAULT_PORT)
}

fn default_redundancy() -> usize {
    UdpConfig::default().redundancy
}

fn default_disconnect_timeout_ms() -> u64 {
    UdpConfig::default().disconnect_timeout.as_millis() as u64
}

fn default_interrupt_notify_ms() -> u64 {
    UdpConfig::default().interrupt_notify.as_millis() as u64
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            peer: None,
            redundancy: default_redundancy(),
            disconnect_timeout_ms: default_disconnect_timeout_ms(),
            interrupt_notify_ms: default_interrupt_notify_ms(),
        }
    }
}

impl NetworkConfig {
    pub fn udp_config(&self) -> UdpConfig {
        UdpConfig {
            redundancy: self.redundancy,
            interrupt_notify: Duration::from_millis(self.interrupt_notify_ms),
            disconnect_timeout: Duration::from_millis(self.disconnect_timeout_ms),
        }
    }
}

/// Platform config directory
pub fn config_dir() -> Option<PathBuf> {
    directories::ProjectDirs::from("io.riposte", "", "Riposte")
        .map(|dirs| dirs.config_dir().to_path_buf())
}

/// Load `path`, or the default config file if `path` is `None`
///
/// An explicit path must exist. The default file may be missing.
pub fn load(path: Option<&Path>) -> Result<Config> {
    let path = match path {
        Some(path) => path.to_path_buf(),
        None => match config_dir().map(|dir| dir.join("config.toml")) {
            Some(path) if path.exists() => path,
            _ => return Ok(Config::default()),
        },
    };

    let content = std::fs::read_to_string(&path)
        .with_context(|| format!("Failed to read config file {}", path.display()))?;
    let config = toml::from_str(&content)
        .with_context(|| format!("Failed to parse config file {}", path.display()))?;
    tracing::debug!(path = %path.display(), "Loaded config");
    Ok(config)
}
