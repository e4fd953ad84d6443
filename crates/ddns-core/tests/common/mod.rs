//! Test doubles and common utilities for contract tests
//!
//! The doubles count every call so tests can assert exactly how much
//! network work a cycle would have done.

#![allow(dead_code)]

use ddns_core::error::{Error, Result};
use ddns_core::traits::{ARecord, ARecordSpec, DnsProvider, HostSource, IpSource, Zone};
use ddns_core::{HostName, SyncConfig, SyncRunner};
use std::collections::{HashMap, HashSet};
use std::net::Ipv4Addr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

pub const TARGET_IP: Ipv4Addr = Ipv4Addr::new(203, 0, 113, 5);

pub type Hook = Box<dyn Fn() + Send + Sync>;

/// An IpSource returning a fixed address (or a fixed failure)
pub struct StaticIpSource {
    ip: Mutex<Option<Ipv4Addr>>,
    calls: AtomicUsize,
}

impl StaticIpSource {
    pub fn new(ip: Ipv4Addr) -> Self {
        Self {
            ip: Mutex::new(Some(ip)),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn failing() -> Self {
        Self {
            ip: Mutex::new(None),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn set_ip(&self, ip: Ipv4Addr) {
        *self.ip.lock().unwrap() = Some(ip);
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl IpSource for StaticIpSource {
    async fn current(&self) -> Result<Ipv4Addr> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let ip = *self.ip.lock().unwrap();
        ip.ok_or_else(|| {
            Error::ip_resolution("all IP sources failed: https://ip.test: connection refused")
        })
    }

    fn source_name(&self) -> &'static str {
        "static"
    }
}

/// A HostSource returning a mutable list of hosts (or a fixed failure)
pub struct StaticHostSource {
    hosts: Mutex<Option<Vec<HostName>>>,
    calls: AtomicUsize,
}

impl StaticHostSource {
    pub fn new(names: &[&str]) -> Self {
        Self {
            hosts: Mutex::new(Some(names.iter().map(|name| host(name)).collect())),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn failing() -> Self {
        Self {
            hosts: Mutex::new(None),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn set_hosts(&self, names: &[&str]) {
        *self.hosts.lock().unwrap() = Some(names.iter().map(|name| host(name)).collect());
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl HostSource for StaticHostSource {
    async fn discover(&self) -> Result<Vec<HostName>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.hosts
            .lock()
            .unwrap()
            .clone()
            .ok_or_else(|| Error::invalid_input("/configs: no such file or directory"))
    }

    fn source_name(&self) -> &str {
        "static-hosts"
    }
}

/// A recorded create call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateCall {
    pub zone_id: String,
    pub spec: ARecordSpec,
}

/// A recorded update call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateCall {
    pub zone_id: String,
    pub record_id: String,
    pub spec: ARecordSpec,
}

/// An in-memory DnsProvider that tracks calls
pub struct MockDnsProvider {
    zones: Vec<Zone>,
    records: Mutex<HashMap<String, Vec<ARecord>>>,
    failing_hosts: Mutex<HashSet<String>>,
    fail_zones: bool,
    zone_hook: Mutex<Option<Hook>>,
    list_zones_calls: AtomicUsize,
    list_records_calls: AtomicUsize,
    creates: Mutex<Vec<CreateCall>>,
    updates: Mutex<Vec<UpdateCall>>,
    next_id: AtomicUsize,
}

impl MockDnsProvider {
    pub fn new(zones: &[(&str, &str)]) -> Self {
        Self {
            zones: zones
                .iter()
                .map(|(id, name)| Zone {
                    id: (*id).to_string(),
                    name: (*name).to_string(),
                })
                .collect(),
            records: Mutex::new(HashMap::new()),
            failing_hosts: Mutex::new(HashSet::new()),
            fail_zones: false,
            zone_hook: Mutex::new(None),
            list_zones_calls: AtomicUsize::new(0),
            list_records_calls: AtomicUsize::new(0),
            creates: Mutex::new(Vec::new()),
            updates: Mutex::new(Vec::new()),
            next_id: AtomicUsize::new(1),
        }
    }

    /// A provider whose zone listing always fails
    pub fn failing_zones() -> Self {
        Self {
            fail_zones: true,
            ..Self::new(&[])
        }
    }

    /// Seed an existing record
    pub fn with_record(self, host: &str, id: &str, content: &str, proxied: bool, comment: Option<&str>) -> Self {
        self.records
            .lock()
            .unwrap()
            .entry(host.to_string())
            .or_default()
            .push(ARecord {
                id: id.to_string(),
                name: host.to_string(),
                record_type: "A".to_string(),
                content: content.to_string(),
                proxied,
                comment: comment.map(str::to_string),
            });
        self
    }

    /// Make record listing fail for one host
    pub fn fail_host(self, host: &str) -> Self {
        self.failing_hosts.lock().unwrap().insert(host.to_string());
        self
    }

    /// Run `hook` inside every list_zones call (i.e. mid-cycle)
    pub fn set_zone_hook(&self, hook: Hook) {
        *self.zone_hook.lock().unwrap() = Some(hook);
    }

    pub fn list_zones_calls(&self) -> usize {
        self.list_zones_calls.load(Ordering::SeqCst)
    }

    pub fn list_records_calls(&self) -> usize {
        self.list_records_calls.load(Ordering::SeqCst)
    }

    pub fn creates(&self) -> Vec<CreateCall> {
        self.creates.lock().unwrap().clone()
    }

    pub fn updates(&self) -> Vec<UpdateCall> {
        self.updates.lock().unwrap().clone()
    }

    pub fn write_count(&self) -> usize {
        self.creates.lock().unwrap().len() + self.updates.lock().unwrap().len()
    }

    pub fn total_calls(&self) -> usize {
        self.list_zones_calls() + self.list_records_calls() + self.write_count()
    }

    pub fn records_for(&self, host: &str) -> Vec<ARecord> {
        self.records
            .lock()
            .unwrap()
            .get(host)
            .cloned()
            .unwrap_or_default()
    }
}

#[async_trait::async_trait]
impl DnsProvider for MockDnsProvider {
    async fn list_zones(&self) -> Result<Vec<Zone>> {
        self.list_zones_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(hook) = self.zone_hook.lock().unwrap().as_ref() {
            hook();
        }
        if self.fail_zones {
            return Err(Error::status(503, "zones unavailable"));
        }
        Ok(self.zones.clone())
    }

    async fn list_a_records(&self, _zone_id: &str, host: &HostName) -> Result<Vec<ARecord>> {
        self.list_records_calls.fetch_add(1, Ordering::SeqCst);
        if self.failing_hosts.lock().unwrap().contains(host.as_str()) {
            return Err(Error::status(403, "forbidden"));
        }
        let mut records = self.records_for(host.as_str());
        records.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(records)
    }

    async fn create_a_record(&self, zone_id: &str, spec: &ARecordSpec) -> Result<ARecord> {
        self.creates.lock().unwrap().push(CreateCall {
            zone_id: zone_id.to_string(),
            spec: spec.clone(),
        });
        let record = ARecord {
            id: format!("new-{}", self.next_id.fetch_add(1, Ordering::SeqCst)),
            name: spec.name.to_string(),
            record_type: "A".to_string(),
            content: spec.ip.to_string(),
            proxied: spec.proxied,
            comment: Some(spec.comment.clone()),
        };
        self.records
            .lock()
            .unwrap()
            .entry(spec.name.to_string())
            .or_default()
            .push(record.clone());
        Ok(record)
    }

    async fn update_a_record(&self, zone_id: &str, record_id: &str, spec: &ARecordSpec) -> Result<ARecord> {
        self.updates.lock().unwrap().push(UpdateCall {
            zone_id: zone_id.to_string(),
            record_id: record_id.to_string(),
            spec: spec.clone(),
        });
        let mut records = self.records.lock().unwrap();
        let record = records
            .get_mut(spec.name.as_str())
            .and_then(|list| list.iter_mut().find(|r| r.id == record_id))
            .ok_or_else(|| Error::status(404, "record not found"))?;
        record.content = spec.ip.to_string();
        record.proxied = spec.proxied;
        record.comment = Some(spec.comment.clone());
        Ok(record.clone())
    }

    fn provider_name(&self) -> &'static str {
        "mock"
    }
}

/// Build a runner over shared doubles
pub fn runner_with(
    config: SyncConfig,
    provider: &Arc<MockDnsProvider>,
    ip_source: &Arc<StaticIpSource>,
) -> SyncRunner {
    SyncRunner::new(config, provider.clone(), ip_source.clone()).expect("runner construction succeeds")
}

/// Minimal valid configuration
pub fn minimal_config() -> SyncConfig {
    SyncConfig::new("test-token")
}

pub fn host(name: &str) -> HostName {
    HostName::parse(name).expect("valid hostname")
}
