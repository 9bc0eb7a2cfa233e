//! Deterministic prober used for demos and tests.
//!
//! Emits the same five devices in the same order on every call, pausing
//! between emissions so pollers can watch the count rise.

use std::time::Duration;

use netmap_core::types::{Device, DeviceType, UNKNOWN_VENDOR};

use crate::error::Result;
use crate::prober::{DeviceStream, Prober};
use crate::range::parse_cidr;

/// Pause after each emitted device.
pub const FIXTURE_DELAY: Duration = Duration::from_millis(100);

/// Prober that ignores the network and replays a canned device list.
#[derive(Debug, Clone)]
pub struct FixtureProber {
    delay: Duration,
}

impl FixtureProber {
    pub fn new() -> Self {
        Self {
            delay: FIXTURE_DELAY,
        }
    }

    /// Same devices, different pacing.
    pub fn with_delay(delay: Duration) -> Self {
        Self { delay }
    }
}

impl Default for FixtureProber {
    fn default() -> Self {
        Self::new()
    }
}

impl Prober for FixtureProber {
    fn scan(&self, range: &str) -> Result<DeviceStream> {
        parse_cidr(range)?;

        let devices = fixture_devices();
        let (tx, stream) = DeviceStream::channel(devices.len());
        let delay = self.delay;

        tokio::spawn(async move {
            for device in devices {
                tracing::debug!(ip = %device.ip, "Fixture device emitted");
                if tx.send(device).await.is_err() {
                    break;
                }
                tokio::time::sleep(delay).await;
            }
        });

        Ok(stream)
    }
}

/// The canned devices, in emission order.
pub fn fixture_devices() -> Vec<Device> {
    vec![
        fixture(
            "192.168.1.1",
            "00:0C:42:12:34:56",
            "gateway.local",
            "Routerboard.com",
            DeviceType::Router,
        ),
        fixture(
            "192.168.1.2",
            "00:17:88:AB:CD:EF",
            "switch-01",
            "Zyxel",
            DeviceType::Switch,
        ),
        fixture(
            "192.168.1.10",
            "D8:9E:F3:11:22:33",
            "workstation-01",
            "Dell",
            DeviceType::Computer,
        ),
        fixture(
            "192.168.1.20",
            "00:1E:C9:44:55:66",
            "printer-01",
            "HP",
            DeviceType::Printer,
        ),
        fixture(
            "192.168.1.99",
            "AA:BB:CC:DD:EE:FF",
            "",
            UNKNOWN_VENDOR,
            DeviceType::Unknown,
        ),
    ]
}

fn fixture(ip: &str, mac: &str, hostname: &str, vendor: &str, device_type: DeviceType) -> Device {
    Device {
        ip: ip.to_string(),
        mac: mac.to_string(),
        hostname: hostname.to_string(),
        vendor: vendor.to_string(),
        device_type,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ScanError;

    #[tokio::test]
    async fn test_emits_five_devices_in_order() {
        let prober = FixtureProber::with_delay(Duration::from_millis(1));
        let devices = prober.scan("192.168.1.0/24").unwrap().collect_all().await;

        let ips: Vec<_> = devices.iter().map(|d| d.ip.as_str()).collect();
        assert_eq!(
            ips,
            vec!["192.168.1.1", "192.168.1.2", "192.168.1.10", "192.168.1.20", "192.168.1.99"]
        );
        assert_eq!(devices[0].device_type, DeviceType::Router);
        assert_eq!(devices[4].hostname, "");
    }

    #[tokio::test]
    async fn test_output_independent_of_range() {
        let prober = FixtureProber::with_delay(Duration::from_millis(1));
        let a = prober.scan("10.0.0.0/8").unwrap().collect_all().await;
        let b = prober.scan("172.16.5.0/30").unwrap().collect_all().await;
        assert_eq!(a, b);
        assert_eq!(a, fixture_devices());
    }

    #[test]
    fn test_rejects_invalid_range_without_runtime() {
        let err = FixtureProber::new().scan("not-a-cidr").unwrap_err();
        assert!(matches!(err, ScanError::InvalidRange { .. }));
    }

    #[tokio::test]
    async fn test_emission_is_paced() {
        let prober = FixtureProber::with_delay(Duration::from_millis(40));
        let mut stream = prober.scan("192.168.1.0/24").unwrap();

        let start = tokio::time::Instant::now();
        assert!(stream.next().await.is_some());
        assert!(stream.next().await.is_some());
        assert!(start.elapsed() >= Duration::from_millis(40));
    }
}
