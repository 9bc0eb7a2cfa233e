//! Scan job manager.
//!
//! Tracks at most one scan job at a time. Starting a job spawns a
//! reconciliation task that drives the prober and folds every discovered
//! device into the job until it completes, is cancelled, or fails.
//!
//! All job state sits behind one `RwLock`. The lock is only held while a
//! field is read or written, never while waiting on the prober.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::RwLock;

use netmap_core::types::{Device, ScanId, ScanStatus};

use crate::cancel::CancelToken;
use crate::error::{Result, ScanError};
use crate::prober::Prober;
use crate::range::parse_cidr;

/// One discovery run.
///
/// Values handed out by [`ScanManager`] are snapshots; they do not change
/// after being returned.
#[derive(Debug, Clone, Serialize)]
pub struct ScanJob {
    pub id: ScanId,
    pub network: String,
    /// Identifier of the node the topology is anchored on, if one was given.
    #[serde(rename = "core_switch", skip_serializing_if = "Option::is_none")]
    pub reference_node: Option<String>,
    pub status: ScanStatus,
    pub discovered_count: usize,
    pub devices: Vec<Device>,
    pub started_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub error: String,
    #[serde(skip)]
    cancel: CancelToken,
}

impl ScanJob {
    fn new(network: &str, reference_node: &str) -> Self {
        Self {
            id: ScanId::new(),
            network: network.to_string(),
            reference_node: Some(reference_node.to_string()).filter(|r| !r.is_empty()),
            status: ScanStatus::Scanning,
            discovered_count: 0,
            devices: Vec::new(),
            started_at: Utc::now(),
            completed_at: None,
            error: String::new(),
            cancel: CancelToken::new(),
        }
    }

    pub fn is_scanning(&self) -> bool {
        self.status == ScanStatus::Scanning
    }

    /// Append a device; ignored once the job is terminal.
    fn record_device(&mut self, device: Device) -> bool {
        if self.status.is_terminal() {
            return false;
        }
        self.devices.push(device);
        self.discovered_count = self.devices.len();
        true
    }

    /// Move to a terminal state. Only the first call has any effect.
    fn finish(&mut self, status: ScanStatus, error: Option<String>) -> bool {
        if self.status.is_terminal() || !status.is_terminal() {
            return false;
        }
        self.status = status;
        self.completed_at = Some(Utc::now());
        if let Some(error) = error {
            self.error = error;
        }
        true
    }
}

/// Owner of the current scan job.
///
/// Cheap to clone; clones share the same job state and prober.
#[derive(Clone)]
pub struct ScanManager {
    prober: Arc<dyn Prober>,
    current: Arc<RwLock<Option<ScanJob>>>,
}

impl ScanManager {
    pub fn new(prober: Arc<dyn Prober>) -> Self {
        Self {
            prober,
            current: Arc::new(RwLock::new(None)),
        }
    }

    /// Start a new scan of `network`.
    ///
    /// Fails with `AlreadyInProgress` while another job is scanning and with
    /// `InvalidRange` for a malformed network; in both cases no job is
    /// created and the current one is left alone. An empty
    /// `reference_node` means none.
    pub async fn start_scan(&self, network: &str, reference_node: &str) -> Result<ScanJob> {
        let mut current = self.current.write().await;

        if let Some(active) = current.as_ref().filter(|job| job.is_scanning()) {
            tracing::warn!(scan_id = %active.id, network = %network, "Scan already in progress");
            return Err(ScanError::AlreadyInProgress);
        }

        parse_cidr(network)?;

        let job = ScanJob::new(network, reference_node);
        tracing::info!(scan_id = %job.id, network = %network, "Scan started");

        *current = Some(job.clone());
        tokio::spawn(self.clone().reconcile(job.id, job.network.clone(), job.cancel.clone()));

        Ok(job)
    }

    /// The current job, if `id` identifies it.
    pub async fn get_scan(&self, id: ScanId) -> Result<ScanJob> {
        let current = self.current.read().await;
        current
            .as_ref()
            .filter(|job| job.id == id)
            .cloned()
            .ok_or(ScanError::NotFound)
    }

    /// The most recently started job, whatever its status.
    pub async fn get_current_scan(&self) -> Result<ScanJob> {
        let current = self.current.read().await;
        current.clone().ok_or(ScanError::NoActiveScan)
    }

    /// Request cancellation of the job identified by `id`.
    ///
    /// The returned snapshot may still read `Scanning`; the reconciliation
    /// task performs the transition to `Cancelled`.
    pub async fn cancel_scan(&self, id: ScanId) -> Result<ScanJob> {
        let current = self.current.write().await;
        let job = current
            .as_ref()
            .filter(|job| job.id == id)
            .ok_or(ScanError::NotFound)?;

        if !job.is_scanning() {
            return Err(ScanError::NotRunning);
        }

        if job.cancel.cancel() {
            tracing::info!(scan_id = %id, "Scan cancellation requested");
        }
        Ok(job.clone())
    }

    /// Whether a job is currently scanning.
    pub async fn is_scanning(&self) -> bool {
        self.current
            .read()
            .await
            .as_ref()
            .is_some_and(ScanJob::is_scanning)
    }

    /// Drive the prober for job `id` and fold its output into the job.
    ///
    /// Cancellation and the next device are raced; when both are ready the
    /// cancellation wins. Whichever terminal event is seen first is final.
    async fn reconcile(self, id: ScanId, network: String, cancel: CancelToken) {
        let mut stream = match self.prober.scan(&network) {
            Ok(stream) => stream,
            Err(e) => {
                tracing::error!(
                    scan_id = %id,
                    network = %network,
                    error = %e,
                    "Prober failed to start"
                );
                self.finish(id, ScanStatus::Failed, Some(e.to_string())).await;
                return;
            }
        };

        let outcome = loop {
            tokio::select! {
                biased;

                _ = cancel.cancelled() => break ScanStatus::Cancelled,

                next = stream.next() => match next {
                    Some(device) => self.record_device(id, device).await,
                    None => break ScanStatus::Completed,
                },
            }
        };

        // Close the stream first so producers stop before the job is final.
        drop(stream);
        self.finish(id, outcome, None).await;
    }

    async fn record_device(&self, id: ScanId, device: Device) {
        let mut current = self.current.write().await;
        let Some(job) = current.as_mut().filter(|job| job.id == id) else {
            return;
        };

        let ip = device.ip.clone();
        if job.record_device(device) {
            tracing::debug!(
                scan_id = %id,
                ip = %ip,
                discovered = job.discovered_count,
                "Device discovered"
            );
        }
    }

    async fn finish(&self, id: ScanId, status: ScanStatus, error: Option<String>) {
        let mut current = self.current.write().await;
        let Some(job) = current.as_mut().filter(|job| job.id == id) else {
            tracing::warn!(scan_id = %id, status = %status, "Scan job no longer current");
            return;
        };

        if job.finish(status, error) {
            tracing::info!(
                scan_id = %id,
                status = %status,
                discovered = job.discovered_count,
                "Scan finished"
            );
        }
    }
}
