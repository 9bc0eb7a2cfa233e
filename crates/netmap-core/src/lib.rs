//! netmap-core: Shared types, configuration, and error handling for NetMap.
//!
//! This crate provides the foundational pieces used by the discovery engine
//! and its outer surfaces:
//! - Device and scan status types
//! - Layered configuration loading
//! - Common error types

pub mod config;
pub mod error;
pub mod types;

pub use error::NetmapError;
