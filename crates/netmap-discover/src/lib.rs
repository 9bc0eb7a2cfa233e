//! netmap-discover: Host discovery engine for NetMap.
//!
//! Sweeps an IPv4 range for live hosts with a pool of ping workers (or
//! replays fixture devices in mock mode) and tracks each sweep as a single
//! cancellable scan job, exposed over a small HTTP API.

pub mod api;
pub mod cancel;
pub mod config;
pub mod error;
pub mod fixture;
pub mod manager;
pub mod prober;
pub mod range;
pub mod sweep;

pub use error::ScanError;
pub use manager::{ScanJob, ScanManager};
pub use prober::{DeviceStream, Prober};
