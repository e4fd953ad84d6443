//! Contract Test: Single Runner Per Process
//!
//! This test verifies the first-caller-wins runner cell.
//!
//! Constraints verified:
//! - Concurrent constructions share one runner carrying the first credential
//! - A missing credential fails construction
//! - A failed construction is sticky for every later caller
//! - Hosts registered through any handle land in the same registry
//!
//! If this test fails, someone has:
//! - Allowed a second runner (and a second scheduler) in one process
//! - Let a later configuration silently replace the first one

mod common;

use common::*;
use ddns_core::{Error, RunnerCell, SyncConfig, SyncRunner};
use std::sync::{Arc, Barrier};

fn build(token: &str) -> ddns_core::Result<SyncRunner> {
    let provider = Arc::new(MockDnsProvider::new(&[("zone-1", "example.com")]));
    let ip_source = Arc::new(StaticIpSource::new(TARGET_IP));
    SyncRunner::new(SyncConfig::new(token), provider, ip_source)
}

#[test]
fn concurrent_constructions_share_first_runner() {
    let cell = Arc::new(RunnerCell::new());
    let barrier = Arc::new(Barrier::new(2));

    let handles: Vec<_> = ["token-a", "token-b"]
        .into_iter()
        .map(|token| {
            let cell = Arc::clone(&cell);
            let barrier = Arc::clone(&barrier);
            std::thread::spawn(move || {
                barrier.wait();
                cell.get_or_init(|| build(token)).expect("construction succeeds")
            })
        })
        .collect();

    let runners: Vec<Arc<SyncRunner>> = handles.into_iter().map(|h| h.join().unwrap()).collect();

    assert!(Arc::ptr_eq(&runners[0], &runners[1]), "one runner per cell");
    let token = runners[0].config().api_token.as_str();
    assert!(token == "token-a" || token == "token-b");

    // Whoever won, later callers keep getting the same instance
    let again = cell.get_or_init(|| build("token-c")).unwrap();
    assert!(Arc::ptr_eq(&again, &runners[0]));
    assert_eq!(again.config().api_token, token);
}

#[test]
fn registrations_through_any_handle_are_shared() {
    let cell = RunnerCell::new();
    let first = cell.get_or_init(|| build("token-a")).unwrap();
    let second = cell.get_or_init(|| build("token-b")).unwrap();

    first.register_host("a.example.com");
    second.register_host("b.example.com");

    assert_eq!(first.registry().len(), 2);
    assert_eq!(cell.get().map(|r| r.registry().len()), Some(2));
}

#[test]
fn missing_credential_fails_permanently() {
    let cell = RunnerCell::new();

    let first = cell.get_or_init(|| build("   "));
    assert!(matches!(first, Err(Error::Config(_))));

    // A valid configuration arriving later does not repair the cell
    let second = cell.get_or_init(|| build("token-b"));
    match second {
        Err(Error::Config(message)) => assert!(message.contains("token missing")),
        other => panic!("expected sticky config error, got {other:?}"),
    }
    assert!(cell.get().is_none());
}
