//! Core domain types for NetMap.
//!
//! These are the values exchanged between the prober, the scan job manager
//! and the HTTP layer. They serialize to the JSON shape the web client polls.

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ── Scan identity ─────────────────────────────────────────────────

/// Opaque identifier of a scan job.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(transparent)]
pub struct ScanId(pub Uuid);

impl ScanId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Parse an identifier received from a caller. Returns `None` for text
    /// that is not a UUID, which callers treat the same as an unknown id.
    pub fn parse(raw: &str) -> Option<Self> {
        Uuid::parse_str(raw).ok().map(Self)
    }
}

impl Default for ScanId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ScanId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

// ── Devices ───────────────────────────────────────────────────────

/// Vendor label used when nothing better is known.
pub const UNKNOWN_VENDOR: &str = "Unknown";

/// Coarse classification of a discovered host.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum DeviceType {
    Router,
    Switch,
    Computer,
    Printer,
    #[default]
    Unknown,
}

impl DeviceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Router => "router",
            Self::Switch => "switch",
            Self::Computer => "computer",
            Self::Printer => "printer",
            Self::Unknown => "unknown",
        }
    }
}

impl fmt::Display for DeviceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A host found alive during a scan.
///
/// Empty strings mean "not known": `mac` is empty unless a prober can see
/// layer-2 addresses, `hostname` is empty when reverse lookup failed.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Device {
    pub ip: String,
    pub mac: String,
    pub hostname: String,
    pub vendor: String,
    #[serde(rename = "type")]
    pub device_type: DeviceType,
}

impl Device {
    /// A device known only by its address and (possibly empty) name.
    pub fn reachable(ip: impl Into<String>, hostname: impl Into<String>) -> Self {
        Self {
            ip: ip.into(),
            mac: String::new(),
            hostname: hostname.into(),
            vendor: UNKNOWN_VENDOR.to_string(),
            device_type: DeviceType::Unknown,
        }
    }
}

// ── Scan status ───────────────────────────────────────────────────

/// Lifecycle state of a scan job.
///
/// `Scanning` is the only non-terminal state; a job never leaves a terminal
/// state once reached.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum ScanStatus {
    Scanning,
    Completed,
    Cancelled,
    Failed,
}

impl ScanStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Scanning)
    }
}

impl fmt::Display for ScanStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Scanning => "scanning",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
            Self::Failed => "failed",
        };
        f.write_str(s)
    }
}
