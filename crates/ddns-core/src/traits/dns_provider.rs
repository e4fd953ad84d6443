// # DNS Provider Trait
//
// Defines the interface the reconciler uses to read and write A records.
//
// ## Implementations
//
// - Cloudflare: `ddns-provider-cloudflare` crate
//
// ## Usage
//
// ```rust,ignore
// use ddns_core::{DnsProvider, HostName};
//
// async fn show(provider: &dyn DnsProvider) -> ddns_core::Result<()> {
//     let zones = provider.list_zones().await?;
//     let host = HostName::parse("app.example.com").unwrap();
//     for zone in &zones {
//         let records = provider.list_a_records(&zone.id, &host).await?;
//         println!("{}: {:?}", zone.name, records);
//     }
//     Ok(())
// }
// ```

use crate::host::HostName;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::net::Ipv4Addr;

/// A provider-managed DNS zone
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Zone {
    /// Provider zone identifier
    pub id: String,
    /// Zone apex name (e.g. `example.com`)
    pub name: String,
}

/// An A record as stored by the provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ARecord {
    /// Provider record identifier
    pub id: String,
    /// Fully-qualified record name
    pub name: String,
    /// Record type, always `A` after client-side filtering
    #[serde(rename = "type")]
    pub record_type: String,
    /// Record content (the IPv4 address as text)
    pub content: String,
    /// Whether traffic is routed through the provider edge
    #[serde(default)]
    pub proxied: bool,
    /// Free-form record comment
    #[serde(default)]
    pub comment: Option<String>,
}

impl ARecord {
    /// Whether the record already points at `ip`
    pub fn points_to(&self, ip: Ipv4Addr) -> bool {
        self.content.trim().parse::<Ipv4Addr>().is_ok_and(|current| current == ip)
    }
}

/// Desired state written on create or update
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ARecordSpec {
    /// Record name
    pub name: HostName,
    /// Target address
    pub ip: Ipv4Addr,
    /// Proxied flag to write
    pub proxied: bool,
    /// Comment to write
    pub comment: String,
}

/// Trait for DNS provider implementations
///
/// Every method performs (at most) the API calls needed for that single
/// operation. Retry of transient upstream failures happens inside the
/// implementation; the reconciler never retries.
///
/// # Thread Safety
///
/// Implementations must be thread-safe and usable across async tasks.
#[async_trait]
pub trait DnsProvider: Send + Sync {
    /// List every zone visible to the credential, across all pages
    async fn list_zones(&self) -> Result<Vec<Zone>, crate::Error>;

    /// List the A records named exactly `host` in `zone_id`
    ///
    /// Implementations must return only records whose name matches `host`
    /// case-insensitively and whose type is `A`, sorted by id ascending.
    async fn list_a_records(
        &self,
        zone_id: &str,
        host: &HostName,
    ) -> Result<Vec<ARecord>, crate::Error>;

    /// Create a new A record
    async fn create_a_record(
        &self,
        zone_id: &str,
        spec: &ARecordSpec,
    ) -> Result<ARecord, crate::Error>;

    /// Overwrite an existing A record
    async fn update_a_record(
        &self,
        zone_id: &str,
        record_id: &str,
        spec: &ARecordSpec,
    ) -> Result<ARecord, crate::Error>;

    /// Get the provider name (for logging/debugging)
    fn provider_name(&self) -> &'static str;
}
