//! Record-level reconciliation
//!
//! For one hostname in one zone the [`Reconciler`] compares the A records the
//! provider holds with the target address and issues at most one write:
//!
//! 1. any record already pointing at the target → no write
//! 2. no record at all → create with the default proxied flag and the
//!    managed comment
//! 3. otherwise → update the lowest-id record, changing only its content
//!
//! Records are never deleted, and a record's proxied flag and comment are
//! never touched by an update.

use crate::error::Result;
use crate::host::HostName;
use crate::traits::{ARecord, ARecordSpec, DnsProvider, Zone};
use std::fmt;
use std::net::Ipv4Addr;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// What reconciling one host did
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconcileOutcome {
    /// A record already points at the target address
    Unchanged {
        /// Matching record
        record_id: String,
    },

    /// No record existed and one was created
    Created {
        /// Id of the new record
        record_id: String,
    },

    /// A stale record was repointed
    Updated {
        /// Updated record
        record_id: String,
        /// Content before the update
        previous: String,
    },

    /// Dry run: a record would have been created
    WouldCreate,

    /// Dry run: a record would have been updated
    WouldUpdate {
        /// Record that would change
        record_id: String,
        /// Its current content
        previous: String,
    },
}

impl ReconcileOutcome {
    /// Whether the provider was (or would have been) written to
    pub fn is_write(&self) -> bool {
        !matches!(self, Self::Unchanged { .. })
    }
}

/// Per-cycle counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncSummary {
    /// Records created (or that would be, in dry-run mode)
    pub created: usize,
    /// Records updated (or that would be, in dry-run mode)
    pub updated: usize,
    /// Hosts already in the desired state
    pub unchanged: usize,
    /// Hosts without a matching zone
    pub skipped: usize,
    /// Hosts whose reconciliation failed
    pub failed: usize,
}

impl SyncSummary {
    /// Count one outcome
    pub fn record(&mut self, outcome: &ReconcileOutcome) {
        match outcome {
            ReconcileOutcome::Unchanged { .. } => self.unchanged += 1,
            ReconcileOutcome::Created { .. } | ReconcileOutcome::WouldCreate => self.created += 1,
            ReconcileOutcome::Updated { .. } | ReconcileOutcome::WouldUpdate { .. } => {
                self.updated += 1
            }
        }
    }

    /// Total hosts accounted for
    pub fn total(&self) -> usize {
        self.created + self.updated + self.unchanged + self.skipped + self.failed
    }
}

impl fmt::Display for SyncSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "created={} updated={} unchanged={} skipped={} failed={}",
            self.created, self.updated, self.unchanged, self.skipped, self.failed
        )
    }
}

/// The first record already pointing at `ip`, if any
pub fn desired_record(records: &[ARecord], ip: Ipv4Addr) -> Option<&ARecord> {
    records.iter().find(|record| record.points_to(ip))
}

/// The record an update targets: lowest id first
pub fn pick_record(records: &[ARecord]) -> Option<&ARecord> {
    records.iter().min_by(|a, b| a.id.cmp(&b.id))
}

/// Diffs and writes A records through a [`DnsProvider`]
pub struct Reconciler {
    provider: Arc<dyn DnsProvider>,
    default_proxied: bool,
    managed_comment: String,
    dry_run: bool,
}

impl Reconciler {
    /// Create a reconciler writing through `provider`
    pub fn new(provider: Arc<dyn DnsProvider>, managed_comment: impl Into<String>) -> Self {
        Self {
            provider,
            default_proxied: false,
            managed_comment: managed_comment.into(),
            dry_run: false,
        }
    }

    /// Proxied flag for created records
    pub fn with_default_proxied(mut self, proxied: bool) -> Self {
        self.default_proxied = proxied;
        self
    }

    /// Only log intended writes
    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Bring `host` in `zone` to point at `ip`
    pub async fn reconcile(
        &self,
        zone: &Zone,
        host: &HostName,
        ip: Ipv4Addr,
    ) -> Result<ReconcileOutcome> {
        let records = self
            .provider
            .list_a_records(&zone.id, host)
            .await
            .map_err(|e| e.context(format!("list A records for {host}")))?;

        if let Some(current) = desired_record(&records, ip) {
            debug!("{} already points to {}", host, ip);
            return Ok(ReconcileOutcome::Unchanged {
                record_id: current.id.clone(),
            });
        }

        let Some(target) = pick_record(&records) else {
            return self.create(zone, host, ip).await;
        };

        if records.len() > 1 {
            warn!(
                "{} has {} A records in zone {}, updating {} only",
                host,
                records.len(),
                zone.name,
                target.id
            );
        }

        let spec = ARecordSpec {
            name: host.clone(),
            ip,
            proxied: target.proxied,
            comment: target.comment.clone().unwrap_or_default(),
        };

        if self.dry_run {
            info!("[dry-run] Would update {} {} -> {}", host, target.content, ip);
            return Ok(ReconcileOutcome::WouldUpdate {
                record_id: target.id.clone(),
                previous: target.content.clone(),
            });
        }

        let updated = self
            .provider
            .update_a_record(&zone.id, &target.id, &spec)
            .await
            .map_err(|e| e.context(format!("update A record for {host}")))?;
        info!("Updated {} {} -> {}", host, target.content, ip);

        Ok(ReconcileOutcome::Updated {
            record_id: updated.id,
            previous: target.content.clone(),
        })
    }

    async fn create(&self, zone: &Zone, host: &HostName, ip: Ipv4Addr) -> Result<ReconcileOutcome> {
        let spec = ARecordSpec {
            name: host.clone(),
            ip,
            proxied: self.default_proxied,
            comment: self.managed_comment.clone(),
        };

        if self.dry_run {
            info!("[dry-run] Would create {} -> {} (proxied={})", host, ip, spec.proxied);
            return Ok(ReconcileOutcome::WouldCreate);
        }

        let created = self
            .provider
            .create_a_record(&zone.id, &spec)
            .await
            .map_err(|e| e.context(format!("create A record for {host}")))?;
        info!("Created {} -> {} in zone {}", host, ip, zone.name);

        Ok(ReconcileOutcome::Created {
            record_id: created.id,
        })
    }
}
