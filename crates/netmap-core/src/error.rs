use thiserror::Error;

/// Top-level error type shared by NetMap crates.
#[derive(Error, Debug)]
pub enum NetmapError {
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}
