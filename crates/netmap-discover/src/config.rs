//! Configuration for the netmap discovery service.

use serde::Deserialize;

use netmap_core::config::ConfigSource;
use netmap_core::NetmapError;

use crate::sweep::{DEFAULT_TIMEOUT_MS, DEFAULT_WORKERS};

/// Environment variable prefix (`NETMAP_MOCK`, `NETMAP_SCANNER__WORKERS`, ...).
pub const ENV_PREFIX: &str = "NETMAP";

/// Top-level discovery configuration.
///
/// Loaded from `netmap.toml` (or another file prefix) and `NETMAP_`
/// environment variables.
#[derive(Debug, Clone, Deserialize)]
pub struct DiscoverConfig {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub scanner: ScannerConfig,

    /// Use the fixture prober instead of real ICMP probing.
    #[serde(default)]
    pub mock: bool,
}

/// HTTP listener settings.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,
}

/// Sweep prober settings.
///
/// Signed so that zero or negative values from a file or the environment
/// are accepted and mean "use the default".
#[derive(Debug, Clone, Deserialize)]
pub struct ScannerConfig {
    /// Concurrent probe workers.
    #[serde(default = "default_workers")]
    pub workers: i64,

    /// Per-address ping timeout in milliseconds.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: i64,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_workers() -> i64 {
    DEFAULT_WORKERS as i64
}

fn default_timeout_ms() -> i64 {
    DEFAULT_TIMEOUT_MS as i64
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self {
            workers: default_workers(),
            timeout_ms: default_timeout_ms(),
        }
    }
}

impl Default for DiscoverConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            scanner: ScannerConfig::default(),
            mock: false,
        }
    }
}

impl DiscoverConfig {
    /// Load from `<file_prefix>.*` and `NETMAP_` environment variables.
    pub fn load(file_prefix: &str) -> Result<Self, NetmapError> {
        let config: Self = ConfigSource::new(file_prefix, ENV_PREFIX).load()?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), NetmapError> {
        if self.server.host.trim().is_empty() {
            return Err(NetmapError::InvalidConfig(
                "server.host must not be empty".to_string(),
            ));
        }
        Ok(())
    }

    /// `host:port` for the HTTP listener.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}
