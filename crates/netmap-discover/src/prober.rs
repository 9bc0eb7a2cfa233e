//! The prober capability: sweep a range, yield devices as they are found.

use std::sync::Arc;

use tokio::sync::mpsc;

use netmap_core::types::Device;

use crate::config::DiscoverConfig;
use crate::error::Result;
use crate::fixture::FixtureProber;
use crate::sweep::SweepProber;

/// Something that can discover devices on a network range.
///
/// `scan` validates `range` synchronously and fails with
/// [`ScanError::InvalidRange`](crate::error::ScanError::InvalidRange) before
/// any background work starts. On success the returned stream is fed by
/// tasks spawned on the current tokio runtime, so `scan` must be called from
/// within one.
pub trait Prober: Send + Sync {
    fn scan(&self, range: &str) -> Result<DeviceStream>;
}

/// Finite, non-restartable sequence of discovered devices.
///
/// `next` returns `None` once every producer has finished. Dropping the
/// stream tells producers to stop; devices still in flight are discarded.
#[derive(Debug)]
pub struct DeviceStream {
    rx: mpsc::Receiver<Device>,
}

impl DeviceStream {
    pub(crate) fn channel(capacity: usize) -> (mpsc::Sender<Device>, Self) {
        let (tx, rx) = mpsc::channel(capacity);
        (tx, Self { rx })
    }

    pub async fn next(&mut self) -> Option<Device> {
        self.rx.recv().await
    }

    /// Drain the stream to completion.
    #[cfg(test)]
    pub(crate) async fn collect_all(mut self) -> Vec<Device> {
        let mut devices = Vec::new();
        while let Some(device) = self.next().await {
            devices.push(device);
        }
        devices
    }
}

/// Pick the prober variant selected by configuration.
pub fn from_config(config: &DiscoverConfig) -> Arc<dyn Prober> {
    if config.mock {
        tracing::info!("Using fixture prober (mock mode)");
        Arc::new(FixtureProber::new())
    } else {
        let prober = SweepProber::new(config.scanner.workers, config.scanner.timeout_ms);
        tracing::info!(
            workers = prober.workers(),
            timeout_ms = prober.timeout().as_millis() as u64,
            "Using ICMP sweep prober"
        );
        Arc::new(prober)
    }
}
