//! ICMP sweep prober.
//!
//! Enumerates the target block, hands addresses to a fixed pool of worker
//! tasks, and forwards every host that answers a ping (plus its reverse DNS
//! name, if any) to the device stream as soon as it is confirmed. Output
//! order is completion order, not address order.

use std::future::Future;
use std::net::{IpAddr, Ipv4Addr};
use std::process::Stdio;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use tokio::process::Command;
use tokio::sync::mpsc;
use tokio::task::JoinSet;

use netmap_core::types::Device;

use crate::error::Result;
use crate::prober::{DeviceStream, Prober};
use crate::range::{parse_cidr, sweep_addresses, SweepAddresses};

pub const DEFAULT_WORKERS: usize = 100;
pub const DEFAULT_TIMEOUT_MS: u64 = 1000;

/// Devices buffered between workers and the consumer.
const DEVICE_BUFFER: usize = 100;

/// Extra time a ping child gets beyond its own timeout before it is killed.
const PROBE_GRACE: Duration = Duration::from_secs(1);

/// Worker count to use for a configured value; non-positive means default.
pub fn normalize_workers(workers: i64) -> usize {
    if workers <= 0 {
        DEFAULT_WORKERS
    } else {
        usize::try_from(workers).unwrap_or(DEFAULT_WORKERS)
    }
}

/// Probe timeout to use for a configured value; non-positive means default.
pub fn normalize_timeout(timeout_ms: i64) -> Duration {
    if timeout_ms <= 0 {
        Duration::from_millis(DEFAULT_TIMEOUT_MS)
    } else {
        Duration::from_millis(timeout_ms as u64)
    }
}

// ── Per-host probing ──────────────────────────────────────────────

/// Liveness check and name lookup for a single address.
///
/// Failures are never errors: a probe that cannot run means the host is
/// down, a lookup that fails yields an empty name.
pub trait HostProbe: Send + Sync + 'static {
    fn is_alive(&self, addr: Ipv4Addr) -> impl Future<Output = bool> + Send;

    fn resolve_name(&self, addr: Ipv4Addr) -> impl Future<Output = String> + Send;
}

/// Probes with the system `ping` binary and the system resolver.
#[derive(Debug, Clone)]
pub struct IcmpProbe {
    timeout: Duration,
}

impl IcmpProbe {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

impl HostProbe for IcmpProbe {
    async fn is_alive(&self, addr: Ipv4Addr) -> bool {
        let Some(mut cmd) = ping_command(addr, self.timeout) else {
            return false;
        };

        match tokio::time::timeout(self.timeout + PROBE_GRACE, cmd.status()).await {
            Ok(Ok(status)) => status.success(),
            Ok(Err(e)) => {
                tracing::debug!(ip = %addr, error = %e, "Failed to run ping");
                false
            }
            Err(_) => {
                tracing::debug!(ip = %addr, "Ping overran its timeout");
                false
            }
        }
    }

    async fn resolve_name(&self, addr: Ipv4Addr) -> String {
        let ip = IpAddr::V4(addr);
        let name = tokio::task::spawn_blocking(move || dns_lookup::lookup_addr(&ip).ok())
            .await
            .ok()
            .flatten()
            .unwrap_or_default();
        clean_hostname(&name, addr)
    }
}

/// Build a single-echo ping for the current platform. `None` where we do
/// not know the flags.
fn ping_command(addr: Ipv4Addr, timeout: Duration) -> Option<Command> {
    let millis = timeout.as_millis().max(1);
    let mut cmd = Command::new("ping");

    if cfg!(target_os = "windows") {
        cmd.arg("-n").arg("1").arg("-w").arg(millis.to_string());
    } else if cfg!(target_os = "macos") {
        // BSD ping takes the wait time in milliseconds.
        cmd.arg("-c").arg("1").arg("-W").arg(millis.to_string());
    } else if cfg!(target_os = "linux") {
        let secs = timeout.as_secs().max(1);
        cmd.arg("-c").arg("1").arg("-W").arg(secs.to_string());
    } else {
        return None;
    }

    cmd.arg(addr.to_string())
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .kill_on_drop(true);
    Some(cmd)
}

/// Strip the trailing root dot; resolvers that echo the address back count
/// as unresolved.
fn clean_hostname(name: &str, addr: Ipv4Addr) -> String {
    let trimmed = name.trim_end_matches('.');
    if trimmed.is_empty() || trimmed == addr.to_string() {
        String::new()
    } else {
        trimmed.to_string()
    }
}

// ── Worker pool ───────────────────────────────────────────────────

/// Sweep prober backed by a fixed-size worker pool.
#[derive(Debug)]
pub struct SweepProber<P = IcmpProbe> {
    workers: usize,
    timeout: Duration,
    probe: Arc<P>,
}

impl SweepProber<IcmpProbe> {
    /// Non-positive `workers` or `timeout_ms` fall back to the defaults.
    pub fn new(workers: i64, timeout_ms: i64) -> Self {
        let timeout = normalize_timeout(timeout_ms);
        Self {
            workers: normalize_workers(workers),
            timeout,
            probe: Arc::new(IcmpProbe::new(timeout)),
        }
    }
}

impl<P: HostProbe> SweepProber<P> {
    /// Use a custom per-host probe.
    pub fn with_probe(workers: i64, timeout_ms: i64, probe: P) -> Self {
        Self {
            workers: normalize_workers(workers),
            timeout: normalize_timeout(timeout_ms),
            probe: Arc::new(probe),
        }
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

impl<P: HostProbe> Prober for SweepProber<P> {
    fn scan(&self, range: &str) -> Result<DeviceStream> {
        let net = parse_cidr(range)?;
        let addresses = sweep_addresses(&net);
        let total = addresses.len();
        let workers = self.workers.min(total);

        let queue = Arc::new(Mutex::new(addresses));
        let (tx, stream) = DeviceStream::channel(DEVICE_BUFFER);
        let probe = self.probe.clone();

        tracing::info!(network = %net, addresses = total, workers, "Starting sweep");

        tokio::spawn(async move {
            let mut pool = JoinSet::new();
            for _ in 0..workers {
                pool.spawn(sweep_worker(queue.clone(), probe.clone(), tx.clone()));
            }
            // The stream closes once the last worker drops its sender.
            drop(tx);

            while let Some(joined) = pool.join_next().await {
                if let Err(e) = joined {
                    tracing::error!(error = %e, "Sweep worker panicked");
                }
            }
            tracing::debug!(network = %net, "Sweep finished");
        });

        Ok(stream)
    }
}

async fn sweep_worker<P: HostProbe>(
    queue: Arc<Mutex<SweepAddresses>>,
    probe: Arc<P>,
    tx: mpsc::Sender<Device>,
) {
    // A closed channel means the consumer went away; stop taking work.
    while !tx.is_closed() {
        let Some(addr) = next_address(&queue) else {
            break;
        };

        if !probe.is_alive(addr).await {
            continue;
        }

        let hostname = probe.resolve_name(addr).await;
        tracing::debug!(ip = %addr, hostname = %hostname, "Host is up");

        if tx.send(Device::reachable(addr.to_string(), hostname)).await.is_err() {
            break;
        }
    }
}

fn next_address(queue: &Mutex<SweepAddresses>) -> Option<Ipv4Addr> {
    queue.lock().unwrap_or_else(PoisonError::into_inner).next()
}
