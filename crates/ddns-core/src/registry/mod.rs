//! Host registry
//!
//! The registry is the set of hostnames under management. Discovery paths
//! (explicit configuration, router rules, live observations) add entries at
//! any time; the runner copies the current set at the start of each cycle.
//!
//! ## Usage
//!
//! ```rust
//! use ddns_core::registry::HostRegistry;
//!
//! let registry = HostRegistry::new();
//! registry.register_host("App.Example.com:443");
//! registry.register_hosts(["www.example.com", "*.example.com"]);
//!
//! let snapshot = registry.snapshot();
//! assert_eq!(snapshot.len(), 2);
//! ```
//!
//! ## Growth
//!
//! Entries are never removed during the process lifetime. A hostname that
//! disappears from the proxy configuration keeps being reconciled until
//! restart.

use crate::config::RouteConfig;
use crate::host::{HostName, normalize};
use std::collections::HashSet;
use std::sync::{PoisonError, RwLock};
use tracing::{debug, info, warn};

/// Concurrency-safe set of managed hostnames
///
/// ## Thread Safety
///
/// The registry uses interior mutability with RwLock, allowing concurrent
/// reads and exclusive writes. Writers only hold the lock for a single
/// insert, so a long-running cycle never blocks discovery.
#[derive(Debug, Default)]
pub struct HostRegistry {
    hosts: RwLock<HashSet<HostName>>,
}

impl HostRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a raw hostname
    ///
    /// Invalid or wildcard input is ignored. Returns `true` when the host was
    /// not registered before.
    pub fn register_host(&self, raw: &str) -> bool {
        match normalize(raw) {
            Some(host) => self.insert(host),
            None => {
                debug!("Ignoring invalid host {:?}", raw);
                false
            }
        }
    }

    /// Register several raw hostnames
    ///
    /// Returns how many were newly added.
    pub fn register_hosts<I, S>(&self, names: I) -> usize
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        names
            .into_iter()
            .filter(|name| self.register_host(name.as_ref()))
            .count()
    }

    /// Register every hostname a producer contributes
    ///
    /// `name` identifies the producer in logs. A producer zone differing from
    /// the runner's `global_zone` only triggers a warning: the runner zone
    /// always wins.
    pub fn register_route_config(
        &self,
        name: &str,
        route: &RouteConfig,
        global_zone: Option<&str>,
    ) -> usize {
        let local = route.zone.as_deref().map(str::trim).filter(|z| !z.is_empty());
        let global = global_zone.map(str::trim).filter(|z| !z.is_empty());
        if let (Some(local), Some(global)) = (local, global) {
            let local = local.trim_end_matches('.');
            let global = global.trim_end_matches('.');
            if !local.eq_ignore_ascii_case(global) {
                warn!(
                    "Producer {} asks for zone {} but the runner manages {}; using {}",
                    name, local, global, global
                );
            }
        }

        let hosts = route.hosts();
        let total = hosts.len();
        let added = hosts.into_iter().filter(|host| self.insert(host.clone())).count();
        info!(
            "Producer {} registered {} host(s), {} new, {} total",
            name,
            total,
            added,
            self.len()
        );
        added
    }

    /// Register an already-canonical hostname
    pub fn insert(&self, host: HostName) -> bool {
        let mut hosts = self.hosts.write().unwrap_or_else(PoisonError::into_inner);
        let added = hosts.insert(host.clone());
        if added {
            debug!("Registered host {}", host);
        }
        added
    }

    /// Copy of the current host set
    ///
    /// Order is unspecified.
    pub fn snapshot(&self) -> Vec<HostName> {
        let hosts = self.hosts.read().unwrap_or_else(PoisonError::into_inner);
        hosts.iter().cloned().collect()
    }

    /// Check if a hostname is registered
    pub fn contains(&self, raw: &str) -> bool {
        normalize(raw).is_some_and(|host| {
            self.hosts
                .read()
                .unwrap_or_else(PoisonError::into_inner)
                .contains(&host)
        })
    }

    /// Number of registered hosts
    pub fn len(&self) -> usize {
        self.hosts.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Whether no hosts are registered
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
