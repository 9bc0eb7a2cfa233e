//! Configuration loading for NetMap services.
//!
//! Configuration is loaded from (in priority order):
//! 1. Environment variables (`<PREFIX>_` prefix, `__` between nested keys)
//! 2. Config file (`<file_prefix>.toml`, `.json` or `.yaml`), optional
//! 3. Serde defaults of the target type

use ::config::{Config, Environment, File};
use serde::de::DeserializeOwned;

use crate::error::NetmapError;

/// Where to read layered configuration from.
#[derive(Debug, Clone)]
pub struct ConfigSource {
    /// File name without extension, e.g. `netmap` for `netmap.toml`.
    pub file_prefix: String,
    /// Environment variable prefix, e.g. `NETMAP` for `NETMAP_MOCK`.
    pub env_prefix: String,
}

impl ConfigSource {
    pub fn new(file_prefix: &str, env_prefix: &str) -> Self {
        Self {
            file_prefix: file_prefix.to_string(),
            env_prefix: env_prefix.to_string(),
        }
    }

    /// Build the layered configuration and deserialize it into `T`.
    ///
    /// A missing file is not an error; a present but malformed one is.
    pub fn load<T: DeserializeOwned>(&self) -> Result<T, NetmapError> {
        let cfg = Config::builder()
            .add_source(File::with_name(&self.file_prefix).required(false))
            .add_source(
                Environment::with_prefix(&self.env_prefix)
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let loaded = cfg.try_deserialize::<T>()?;
        tracing::debug!(file_prefix = %self.file_prefix, "Configuration loaded");
        Ok(loaded)
    }
}
