//! Core sync engine
//!
//! The SyncRunner is responsible for:
//! - Owning the host registry fed by discovery producers
//! - Running one reconciliation cycle immediately, then on a fixed interval
//! - Resolving the public IP and the provider zones once per cycle
//! - Reconciling every registered host against the provider
//!
//! ## Architecture
//!
//! ```text
//!   producers ── register_host ──┐
//!                                ▼
//!                       ┌────────────────┐
//!   IntervalStream ───▶ │   SyncRunner   │ ─── EngineEvent ───▶ observers
//!                       └────────────────┘
//!                                │
//!         ┌──────────────────────┼──────────────────────┐
//!         ▼                      ▼                      ▼
//! ┌──────────────┐      ┌──────────────┐       ┌──────────────┐
//! │   IpSource   │      │ DnsProvider  │       │  Reconciler  │
//! │  (public IP) │      │   (zones)    │       │  (records)   │
//! └──────────────┘      └──────────────┘       └──────────────┘
//! ```
//!
//! ## Cycle Flow
//!
//! 1. Poll attached host sources, then snapshot the registry (no hosts →
//!    no-op, no network calls)
//! 2. Resolve the public IP (failure aborts the cycle)
//! 3. List zones (failure aborts the cycle)
//! 4. Per host: resolve the zone, reconcile, count the outcome
//! 5. Emit a summary event

mod cell;

pub use cell::RunnerCell;

use crate::config::{RouteConfig, SyncConfig};
use crate::error::{Error, Result};
use crate::host::HostName;
use crate::reconcile::{ReconcileOutcome, Reconciler, SyncSummary};
use crate::registry::HostRegistry;
use crate::traits::{DnsProvider, HostSource, IpSource};
use crate::zone::resolve_zone;
use chrono::{DateTime, Utc};
use std::net::Ipv4Addr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, PoisonError};
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{Mutex, mpsc, oneshot};
use tokio::time::MissedTickBehavior;
use tokio_stream::StreamExt;
use tokio_stream::wrappers::IntervalStream;
use tracing::{debug, error, info, warn};

/// Events emitted by the SyncRunner
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineEvent {
    /// Scheduler started
    Started {
        hosts_count: usize,
    },

    /// A cycle ended before reconciling anything
    CycleSkipped {
        reason: String,
    },

    /// One host was reconciled
    HostReconciled {
        host: HostName,
        ip: Ipv4Addr,
        outcome: ReconcileOutcome,
    },

    /// No zone matched the host
    HostSkipped {
        host: HostName,
    },

    /// Reconciling one host failed
    HostFailed {
        host: HostName,
        error: String,
    },

    /// A cycle finished
    CycleCompleted {
        ip: Ipv4Addr,
        summary: SyncSummary,
    },

    /// Scheduler stopped
    Stopped {
        reason: String,
    },
}

/// Diagnostic state carried between cycles
///
/// Never used to skip work: records are validated every cycle.
#[derive(Debug, Clone, Default)]
pub struct CycleState {
    /// Last successfully resolved public IP
    pub last_ip: Option<Ipv4Addr>,
    /// When the last cycle completed
    pub last_completed: Option<DateTime<Utc>>,
}

/// Periodic A-record reconciler
///
/// ## Lifecycle
///
/// 1. Create with [`SyncRunner::new()`] (normally through a [`RunnerCell`])
/// 2. Register hosts at any time
/// 3. Start with [`SyncRunner::run()`]; it returns after the shutdown signal
///
/// ## Threading
///
/// Cycles never overlap: the cycle body holds an async mutex, so a manual
/// [`SyncRunner::run_cycle()`] waits for a scheduled one to finish. Hosts
/// are reconciled one at a time.
pub struct SyncRunner {
    config: SyncConfig,

    registry: HostRegistry,

    provider: Arc<dyn DnsProvider>,

    ip_source: Arc<dyn IpSource>,

    host_sources: Vec<Arc<dyn HostSource>>,

    reconciler: Reconciler,

    state: Mutex<CycleState>,

    running: AtomicBool,

    event_tx: mpsc::Sender<EngineEvent>,

    event_rx: std::sync::Mutex<Option<mpsc::Receiver<EngineEvent>>>,

    /// Set once an observer holds the receiver; events are not queued before
    events_taken: AtomicBool,
}

impl SyncRunner {
    /// Create a new runner
    ///
    /// The configuration is normalized first. Fails when the provider
    /// credential is missing.
    pub fn new(
        config: SyncConfig,
        provider: Arc<dyn DnsProvider>,
        ip_source: Arc<dyn IpSource>,
    ) -> Result<Self> {
        let config = config.normalized();
        config.validate()?;

        let (event_tx, event_rx) = mpsc::channel(config.event_channel_capacity);
        let reconciler = Reconciler::new(Arc::clone(&provider), config.managed_comment.clone())
            .with_default_proxied(config.default_proxied)
            .with_dry_run(config.dry_run);

        info!(
            "Sync runner created (provider={}, ip_source={}, zone={}, interval={}s, dry_run={})",
            provider.provider_name(),
            ip_source.source_name(),
            config.zone.as_deref().unwrap_or("<any>"),
            config.sync_interval_secs,
            config.dry_run
        );

        Ok(Self {
            config,
            registry: HostRegistry::new(),
            provider,
            ip_source,
            host_sources: Vec::new(),
            reconciler,
            state: Mutex::new(CycleState::default()),
            running: AtomicBool::new(false),
            event_tx,
            event_rx: std::sync::Mutex::new(Some(event_rx)),
            events_taken: AtomicBool::new(false),
        })
    }

    /// Attach a source polled at the start of every cycle
    pub fn with_host_source(mut self, source: Arc<dyn HostSource>) -> Self {
        info!("Host source attached: {}", source.source_name());
        self.host_sources.push(source);
        self
    }

    /// Effective configuration
    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    /// Registry of managed hosts
    pub fn registry(&self) -> &HostRegistry {
        &self.registry
    }

    /// Register a raw hostname; invalid input is ignored
    pub fn register_host(&self, raw: &str) -> bool {
        self.registry.register_host(raw)
    }

    /// Register several raw hostnames
    pub fn register_hosts<I, S>(&self, names: I) -> usize
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.registry.register_hosts(names)
    }

    /// Register a producer's routes against this runner's zone
    pub fn register_route_config(&self, name: &str, route: &RouteConfig) -> usize {
        self.registry
            .register_route_config(name, route, self.config.zone.as_deref())
    }

    /// Take the event receiver
    ///
    /// Only the first caller gets it.
    pub fn take_events(&self) -> Option<mpsc::Receiver<EngineEvent>> {
        let mut slot = self.event_rx.lock().unwrap_or_else(PoisonError::into_inner);
        let rx = slot.take();
        if rx.is_some() {
            self.events_taken.store(true, Ordering::Release);
        }
        rx
    }

    /// Copy of the diagnostic cycle state
    pub async fn cycle_state(&self) -> CycleState {
        self.state.lock().await.clone()
    }

    /// Run one reconciliation cycle
    ///
    /// Per-host failures are counted in the summary. Errors are returned only
    /// when the cycle aborts early (IP resolution or zone listing failed).
    pub async fn run_cycle(&self) -> Result<SyncSummary> {
        if !self.config.enabled {
            debug!("Sync disabled, skipping cycle");
            return Ok(SyncSummary::default());
        }

        let mut state = self.state.lock().await;

        self.poll_host_sources().await;

        let mut hosts = self.registry.snapshot();
        if hosts.is_empty() {
            debug!("No hosts registered yet, nothing to sync");
            self.emit_event(EngineEvent::CycleSkipped {
                reason: "no hosts registered".to_string(),
            });
            return Ok(SyncSummary::default());
        }
        hosts.sort();

        let ip = match self.ip_source.current().await {
            Ok(ip) => ip,
            Err(e) => {
                warn!("Could not resolve public IP: {}", e);
                self.emit_event(EngineEvent::CycleSkipped {
                    reason: e.to_string(),
                });
                return Err(e.context("resolve public IP"));
            }
        };

        if state.last_ip == Some(ip) {
            debug!("Public IP unchanged ({}), still validating records", ip);
        } else {
            info!("Public IP is {} (previous: {:?})", ip, state.last_ip);
        }

        let zones = match self.provider.list_zones().await {
            Ok(zones) => zones,
            Err(e) => {
                warn!("Could not list zones: {}", e);
                self.emit_event(EngineEvent::CycleSkipped {
                    reason: e.to_string(),
                });
                return Err(e.context("list zones"));
            }
        };
        debug!("Provider returned {} zone(s)", zones.len());

        let mut summary = SyncSummary::default();
        for host in hosts {
            let Some(zone) = resolve_zone(&host, &zones, self.config.zone.as_deref()) else {
                warn!("No managed zone matches {}, skipping", host);
                summary.skipped += 1;
                self.emit_event(EngineEvent::HostSkipped { host });
                continue;
            };

            match self.reconciler.reconcile(zone, &host, ip).await {
                Ok(outcome) => {
                    summary.record(&outcome);
                    self.emit_event(EngineEvent::HostReconciled { host, ip, outcome });
                }
                Err(e) => {
                    error!("Failed to sync {}: {}", host, e);
                    summary.failed += 1;
                    self.emit_event(EngineEvent::HostFailed {
                        host,
                        error: e.to_string(),
                    });
                }
            }
        }

        state.last_ip = Some(ip);
        state.last_completed = Some(Utc::now());

        info!("Sync cycle complete for {}: {}", ip, summary);
        self.emit_event(EngineEvent::CycleCompleted { ip, summary });
        Ok(summary)
    }

    /// Run cycles until `shutdown` fires
    ///
    /// The first cycle starts immediately. The shutdown signal is observed
    /// between cycles only; a dropped sender counts as a shutdown. Cycle
    /// failures are logged and never end the loop.
    pub async fn run(&self, mut shutdown: oneshot::Receiver<()>) -> Result<()> {
        if !self.config.enabled {
            info!("Sync disabled, scheduler not started");
            self.emit_event(EngineEvent::Stopped {
                reason: "disabled".to_string(),
            });
            return Ok(());
        }

        if self.running.swap(true, Ordering::SeqCst) {
            return Err(Error::Other("sync runner already running".to_string()));
        }
        let _running = RunningGuard(&self.running);

        self.emit_event(EngineEvent::Started {
            hosts_count: self.registry.len(),
        });
        info!(
            "Scheduler started, syncing every {}s",
            self.config.sync_interval_secs
        );

        let mut interval = tokio::time::interval(self.config.sync_interval());
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut ticks = IntervalStream::new(interval);

        loop {
            tokio::select! {
                biased;

                _ = &mut shutdown => {
                    info!("Shutdown signal received");
                    break;
                }

                Some(_) = ticks.next() => {
                    if let Err(e) = self.run_cycle().await {
                        error!("Sync cycle aborted: {}", e);
                    }
                }
            }
        }

        self.emit_event(EngineEvent::Stopped {
            reason: "Shutdown signal".to_string(),
        });
        Ok(())
    }

    async fn poll_host_sources(&self) {
        for source in &self.host_sources {
            match source.discover().await {
                Ok(hosts) => {
                    let found = hosts.len();
                    let added = hosts
                        .into_iter()
                        .filter(|host| self.registry.insert(host.clone()))
                        .count();
                    debug!(
                        "Host source {} returned {} host(s), {} new",
                        source.source_name(),
                        found,
                        added
                    );
                }
                Err(e) => warn!("Host source {} failed: {}", source.source_name(), e),
            }
        }
    }

    fn emit_event(&self, event: EngineEvent) {
        if !self.events_taken.load(Ordering::Acquire) {
            return;
        }
        // Bounded channel: drop instead of blocking a cycle on slow observers
        match self.event_tx.try_send(event) {
            Ok(()) | Err(TrySendError::Closed(_)) => {}
            Err(TrySendError::Full(_)) => warn!("Event channel full, dropping event"),
        }
    }
}

/// Clears the running flag however `run` exits, including when its future
/// is dropped mid-loop
struct RunningGuard<'a>(&'a AtomicBool);

impl Drop for RunningGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

impl std::fmt::Debug for SyncRunner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncRunner")
            .field("config", &self.config)
            .field("provider", &self.provider.provider_name())
            .field("hosts", &self.registry.len())
            .field("host_sources", &self.host_sources.len())
            .finish()
    }
}
