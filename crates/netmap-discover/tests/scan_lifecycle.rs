//! End-to-end scan job lifecycle against the fixture prober.

use std::sync::Arc;
use std::time::Duration;

use netmap_core::types::{ScanId, ScanStatus};
use netmap_discover::fixture::FixtureProber;
use netmap_discover::{ScanError, ScanJob, ScanManager};

fn manager_with_delay(delay_ms: u64) -> ScanManager {
    ScanManager::new(Arc::new(FixtureProber::with_delay(Duration::from_millis(
        delay_ms,
    ))))
}

async fn wait_terminal(manager: &ScanManager, id: ScanId) -> ScanJob {
    tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            let job = manager.get_scan(id).await.unwrap();
            if job.status.is_terminal() {
                return job;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("scan did not reach a terminal state")
}

#[tokio::test]
async fn test_fixture_scan_progresses_to_completion() {
    let manager = manager_with_delay(100);

    let started = manager.start_scan("192.168.1.0/24", "").await.unwrap();
    assert_eq!(started.status, ScanStatus::Scanning);
    assert_eq!(started.discovered_count, 0);
    assert!(started.devices.is_empty());
    assert!(started.completed_at.is_none());

    let mut observed = Vec::new();
    let finished = tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            let job = manager.get_current_scan().await.unwrap();
            assert_eq!(job.discovered_count, job.devices.len());
            observed.push(job.discovered_count);
            if job.status.is_terminal() {
                return job;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
    })
    .await
    .unwrap();

    assert_eq!(finished.status, ScanStatus::Completed);
    assert_eq!(finished.discovered_count, 5);
    assert_eq!(finished.devices.len(), 5);
    assert!(finished.error.is_empty());
    assert!(finished.completed_at.unwrap() >= finished.started_at);

    assert!(observed.windows(2).all(|w| w[0] <= w[1]), "count never decreases");
    assert!(
        observed.iter().any(|&c| c > 0 && c < 5),
        "progress visible while scanning: {observed:?}"
    );
}

#[tokio::test]
async fn test_invalid_range_creates_no_job() {
    let manager = manager_with_delay(1);

    for bad in ["not-a-cidr", "192.168.1.0", "192.168.1.0/33", "::1/128"] {
        let err = manager.start_scan(bad, "").await.unwrap_err();
        assert!(matches!(err, ScanError::InvalidRange { .. }), "{bad}: {err:?}");
    }

    assert_eq!(
        manager.get_current_scan().await.unwrap_err(),
        ScanError::NoActiveScan
    );
}

#[tokio::test]
async fn test_second_start_is_rejected_while_scanning() {
    let manager = manager_with_delay(100);
    let first = manager.start_scan("192.168.1.0/24", "core-1").await.unwrap();

    let err = manager.start_scan("10.0.0.0/24", "").await.unwrap_err();
    assert_eq!(err, ScanError::AlreadyInProgress);

    let current = manager.get_current_scan().await.unwrap();
    assert_eq!(current.id, first.id);
    assert_eq!(current.network, "192.168.1.0/24");
    assert_eq!(current.reference_node.as_deref(), Some("core-1"));
    assert_eq!(current.status, ScanStatus::Scanning);
}

#[tokio::test]
async fn test_cancel_right_after_start() {
    let manager = manager_with_delay(100);
    let started = manager.start_scan("192.168.1.0/24", "").await.unwrap();

    let snapshot = manager.cancel_scan(started.id).await.unwrap();
    assert_eq!(snapshot.id, started.id);

    let cancelled = wait_terminal(&manager, started.id).await;
    assert_eq!(cancelled.status, ScanStatus::Cancelled);
    assert!(cancelled.completed_at.is_some());
    assert!(cancelled.discovered_count < 5);

    // Device list stays frozen after the fixture would have finished.
    tokio::time::sleep(Duration::from_millis(600)).await;
    let later = manager.get_scan(started.id).await.unwrap();
    assert_eq!(later.status, ScanStatus::Cancelled);
    assert_eq!(later.discovered_count, cancelled.discovered_count);
    assert_eq!(later.devices, cancelled.devices);
    assert_eq!(later.completed_at, cancelled.completed_at);

    assert_eq!(
        manager.cancel_scan(started.id).await.unwrap_err(),
        ScanError::NotRunning
    );
}

#[tokio::test]
async fn test_cancel_after_completion_is_not_running() {
    let manager = manager_with_delay(1);
    let started = manager.start_scan("192.168.1.0/24", "").await.unwrap();
    let done = wait_terminal(&manager, started.id).await;
    assert_eq!(done.status, ScanStatus::Completed);

    assert_eq!(
        manager.cancel_scan(started.id).await.unwrap_err(),
        ScanError::NotRunning
    );
    assert_eq!(
        manager.get_scan(started.id).await.unwrap().status,
        ScanStatus::Completed
    );
}

#[tokio::test]
async fn test_new_scan_supersedes_old_id() {
    let manager = manager_with_delay(1);

    let first = manager.start_scan("192.168.1.0/24", "").await.unwrap();
    wait_terminal(&manager, first.id).await;
    assert!(manager.get_scan(first.id).await.is_ok());

    let second = manager.start_scan("192.168.2.0/24", "").await.unwrap();
    assert_ne!(first.id, second.id);

    assert_eq!(
        manager.get_scan(first.id).await.unwrap_err(),
        ScanError::NotFound
    );
    assert_eq!(
        manager.cancel_scan(first.id).await.unwrap_err(),
        ScanError::NotFound
    );
    assert_eq!(manager.get_scan(second.id).await.unwrap().id, second.id);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_readers_see_consistent_counts() {
    let manager = manager_with_delay(10);
    let started = manager.start_scan("192.168.1.0/24", "").await.unwrap();

    let mut readers = Vec::new();
    for _ in 0..8 {
        let manager = manager.clone();
        readers.push(tokio::spawn(async move {
            loop {
                let job = manager.get_scan(started.id).await.unwrap();
                assert_eq!(job.discovered_count, job.devices.len());
                if job.status.is_terminal() {
                    break;
                }
                tokio::task::yield_now().await;
            }
        }));
    }

    for reader in readers {
        reader.await.unwrap();
    }
    let done = wait_terminal(&manager, started.id).await;
    assert_eq!(done.discovered_count, 5);
}
