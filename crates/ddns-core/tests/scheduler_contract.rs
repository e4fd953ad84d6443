//! Contract Test: Scheduling and Shutdown
//!
//! This test drives the runner loop on tokio's paused clock.
//!
//! Constraints verified:
//! - The first cycle runs immediately at start
//! - Further cycles run once per interval, never more often
//! - Shutdown stops the loop and is reported as an event
//! - Cycle failures never end the loop
//! - A runner cannot be started twice concurrently
//! - Dropping a running loop lets the runner be started again
//!
//! If this test fails, someone has added:
//! - A startup delay before the first sync
//! - Busy polling between ticks
//! - Tasks that ignore the shutdown signal

mod common;

use common::*;
use ddns_core::EngineEvent;
use std::sync::Arc;
use std::time::Duration;

#[tokio::test(start_paused = true)]
async fn first_cycle_runs_immediately_then_per_interval() {
    let provider = Arc::new(MockDnsProvider::new(&[("zone-1", "example.com")]));
    let ip_source = Arc::new(StaticIpSource::new(TARGET_IP));
    let mut config = minimal_config();
    config.sync_interval_secs = 60;
    let runner = Arc::new(runner_with(config, &provider, &ip_source));
    runner.register_host("app.example.com");

    let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel();
    let task = {
        let runner = Arc::clone(&runner);
        tokio::spawn(async move { runner.run(shutdown_rx).await })
    };

    tokio::time::sleep(Duration::from_millis(10)).await;
    assert_eq!(ip_source.call_count(), 1, "cycle at start");

    tokio::time::sleep(Duration::from_secs(30)).await;
    assert_eq!(ip_source.call_count(), 1, "no cycle before the interval elapses");

    tokio::time::sleep(Duration::from_secs(30)).await;
    assert_eq!(ip_source.call_count(), 2);

    tokio::time::sleep(Duration::from_secs(120)).await;
    assert_eq!(ip_source.call_count(), 4);

    shutdown_tx.send(()).expect("runner still listening");
    let result = tokio::time::timeout(Duration::from_secs(5), task)
        .await
        .expect("runner stops promptly")
        .expect("runner task completes");
    assert!(result.is_ok());

    tokio::time::sleep(Duration::from_secs(600)).await;
    assert_eq!(ip_source.call_count(), 4, "no cycles after shutdown");
}

#[tokio::test(start_paused = true)]
async fn failing_cycles_keep_the_loop_alive() {
    let provider = Arc::new(MockDnsProvider::failing_zones());
    let ip_source = Arc::new(StaticIpSource::new(TARGET_IP));
    let mut config = minimal_config();
    config.sync_interval_secs = 10;
    let runner = Arc::new(runner_with(config, &provider, &ip_source));
    runner.register_host("app.example.com");

    let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel();
    let task = {
        let runner = Arc::clone(&runner);
        tokio::spawn(async move { runner.run(shutdown_rx).await })
    };

    tokio::time::sleep(Duration::from_secs(25)).await;
    assert_eq!(provider.list_zones_calls(), 3);

    let _ = shutdown_tx.send(());
    assert!(task.await.unwrap().is_ok());
}

#[tokio::test(start_paused = true)]
async fn shutdown_is_reported_and_second_start_rejected() {
    let provider = Arc::new(MockDnsProvider::new(&[("zone-1", "example.com")]));
    let ip_source = Arc::new(StaticIpSource::new(TARGET_IP));
    let runner = Arc::new(runner_with(minimal_config(), &provider, &ip_source));
    let mut events = runner.take_events().expect("receiver available");

    let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel();
    let task = {
        let runner = Arc::clone(&runner);
        tokio::spawn(async move { runner.run(shutdown_rx).await })
    };
    tokio::time::sleep(Duration::from_millis(10)).await;

    let (_unused_tx, second_rx) = tokio::sync::oneshot::channel();
    assert!(runner.run(second_rx).await.is_err(), "already running");

    // Dropping the sender counts as shutdown
    drop(shutdown_tx);
    assert!(task.await.unwrap().is_ok());

    assert_eq!(events.recv().await, Some(EngineEvent::Started { hosts_count: 0 }));
    assert!(matches!(events.recv().await, Some(EngineEvent::CycleSkipped { .. })));
    assert!(matches!(events.recv().await, Some(EngineEvent::Stopped { .. })));
    assert_eq!(provider.total_calls(), 0);
}

#[tokio::test(start_paused = true)]
async fn dropped_run_future_allows_restart() {
    let provider = Arc::new(MockDnsProvider::new(&[("zone-1", "example.com")]));
    let ip_source = Arc::new(StaticIpSource::new(TARGET_IP));
    let runner = runner_with(minimal_config(), &provider, &ip_source);
    runner.register_host("app.example.com");

    let (_shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel();
    let timed_out = tokio::time::timeout(Duration::from_secs(5), runner.run(shutdown_rx)).await;
    assert!(timed_out.is_err(), "loop still running when abandoned");
    assert_eq!(ip_source.call_count(), 1);

    let (restart_tx, restart_rx) = tokio::sync::oneshot::channel();
    drop(restart_tx);
    assert!(runner.run(restart_rx).await.is_ok(), "restart not refused");
}
