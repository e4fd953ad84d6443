//! Configuration types for the DDNS sync system
//!
//! [`SyncConfig`] holds the effective settings of the single runner. It is
//! built once by the outer application, passed through
//! [`SyncConfig::normalized`] so missing or invalid values fall back to
//! defaults, and never mutated afterwards.
//!
//! [`RouteConfig`] is the per-producer registration input: explicit domains
//! plus router rules to mine for hostnames.

use crate::host::{HostName, normalize};
use crate::rule::extract_hosts;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::time::Duration;

/// Default sync interval (5 minutes)
pub const DEFAULT_SYNC_INTERVAL_SECS: u64 = 300;

/// Default timeout for each outbound HTTP request
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 10;

/// Comment written into records created by this system
pub const DEFAULT_MANAGED_COMMENT: &str = "managed-by=ddns-traefik-sync";

/// Public IP echo services, queried in this order
pub const DEFAULT_IP_SOURCES: &[&str] = &[
    "https://api.ipify.org",
    "https://ifconfig.me/ip",
    "https://checkip.amazonaws.com",
];

/// Effective runner configuration
#[derive(Clone, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Provider API token
    ///
    /// Never logged; `Debug` redacts it.
    #[serde(default)]
    pub api_token: String,

    /// Restrict management to this single zone name
    #[serde(default)]
    pub zone: Option<String>,

    /// Seconds between sync cycles
    #[serde(default = "default_sync_interval_secs")]
    pub sync_interval_secs: u64,

    /// Timeout for each outbound request, in seconds
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Ordered public IP endpoints
    #[serde(default = "default_ip_sources")]
    pub ip_sources: Vec<String>,

    /// Proxied flag applied when creating records (never on update)
    #[serde(default)]
    pub default_proxied: bool,

    /// Comment written into created records
    #[serde(default = "default_managed_comment")]
    pub managed_comment: String,

    /// Whether the runner performs cycles at all
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    /// Perform all reads but only log intended writes
    #[serde(default)]
    pub dry_run: bool,

    /// Capacity of the engine event channel
    ///
    /// When full, new events are dropped (with a warning log).
    #[serde(default = "default_event_channel_capacity")]
    pub event_channel_capacity: usize,
}

// Custom Debug implementation that hides the API token
impl std::fmt::Debug for SyncConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncConfig")
            .field("api_token", &"<REDACTED>")
            .field("zone", &self.zone)
            .field("sync_interval_secs", &self.sync_interval_secs)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("ip_sources", &self.ip_sources)
            .field("default_proxied", &self.default_proxied)
            .field("managed_comment", &self.managed_comment)
            .field("enabled", &self.enabled)
            .field("dry_run", &self.dry_run)
            .finish()
    }
}

impl SyncConfig {
    /// Create a configuration with defaults and the given token
    pub fn new(api_token: impl Into<String>) -> Self {
        Self {
            api_token: api_token.into(),
            zone: None,
            sync_interval_secs: default_sync_interval_secs(),
            request_timeout_secs: default_request_timeout_secs(),
            ip_sources: default_ip_sources(),
            default_proxied: false,
            managed_comment: default_managed_comment(),
            enabled: default_enabled(),
            dry_run: false,
            event_channel_capacity: default_event_channel_capacity(),
        }
    }

    /// Apply defaults to missing or invalid fields
    ///
    /// Trims the token and zone, replaces zero durations, drops blank IP
    /// sources (falling back to the defaults when none remain) and restores
    /// the default comment when blank.
    pub fn normalized(mut self) -> Self {
        self.api_token = self.api_token.trim().to_string();
        self.zone = self
            .zone
            .map(|z| z.trim().trim_end_matches('.').to_ascii_lowercase())
            .filter(|z| !z.is_empty());
        if self.sync_interval_secs == 0 {
            self.sync_interval_secs = DEFAULT_SYNC_INTERVAL_SECS;
        }
        if self.request_timeout_secs == 0 {
            self.request_timeout_secs = DEFAULT_REQUEST_TIMEOUT_SECS;
        }
        self.ip_sources = self
            .ip_sources
            .into_iter()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();
        if self.ip_sources.is_empty() {
            self.ip_sources = default_ip_sources();
        }
        if self.managed_comment.trim().is_empty() {
            self.managed_comment = default_managed_comment();
        }
        if self.event_channel_capacity == 0 {
            self.event_channel_capacity = default_event_channel_capacity();
        }
        self
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        if self.api_token.trim().is_empty() {
            return Err(crate::Error::config(
                "provider API token missing: set the api token in the configuration",
            ));
        }
        Ok(())
    }

    /// Interval between cycles
    pub fn sync_interval(&self) -> Duration {
        Duration::from_secs(self.sync_interval_secs.max(1))
    }

    /// Per-request timeout
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs.max(1))
    }
}

/// Hostname registration input from one producer (e.g. one proxy middleware)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouteConfig {
    /// Explicit hostnames to always manage
    #[serde(default)]
    pub domains: Vec<String>,

    /// Comma-separated alternative to `domains`
    #[serde(default)]
    pub domains_csv: Option<String>,

    /// Mine `router_rules` for `Host(...)` literals
    #[serde(default = "default_enabled")]
    pub auto_discover_host: bool,

    /// Router rule expressions
    #[serde(default)]
    pub router_rules: Vec<String>,

    /// Zone the producer expects; only used for a mismatch warning
    #[serde(default)]
    pub zone: Option<String>,
}

impl Default for RouteConfig {
    fn default() -> Self {
        Self {
            domains: Vec::new(),
            domains_csv: None,
            auto_discover_host: default_enabled(),
            router_rules: Vec::new(),
            zone: None,
        }
    }
}

impl RouteConfig {
    /// Every valid hostname this producer contributes
    pub fn hosts(&self) -> BTreeSet<HostName> {
        let csv = self
            .domains_csv
            .as_deref()
            .into_iter()
            .flat_map(|csv| csv.split(','));

        let mut hosts: BTreeSet<HostName> = self
            .domains
            .iter()
            .map(String::as_str)
            .chain(csv)
            .filter_map(normalize)
            .collect();

        if self.auto_discover_host {
            for rule in &self.router_rules {
                hosts.extend(extract_hosts(rule));
            }
        }
        hosts
    }
}

fn default_sync_interval_secs() -> u64 {
    DEFAULT_SYNC_INTERVAL_SECS
}

fn default_request_timeout_secs() -> u64 {
    DEFAULT_REQUEST_TIMEOUT_SECS
}

fn default_ip_sources() -> Vec<String> {
    DEFAULT_IP_SOURCES.iter().map(|s| (*s).to_string()).collect()
}

fn default_managed_comment() -> String {
    DEFAULT_MANAGED_COMMENT.to_string()
}

fn default_enabled() -> bool {
    true
}

fn default_event_channel_capacity() -> usize {
    1000
}
