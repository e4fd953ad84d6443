// # Host Source Trait
//
// Defines the interface for producers that discover hostnames by
// re-reading some external description of the routed services.
//
// ## Implementations
//
// - Traefik dynamic configuration files: `ddns-source-traefik` crate
//
// Push-style producers call `SyncRunner::register_host` directly instead.

use crate::host::HostName;
use async_trait::async_trait;

/// Trait for pull-style host discovery
///
/// The runner polls every attached source at the start of each cycle and
/// registers whatever it returns. A host that disappears from the source
/// stays registered for the lifetime of the process.
#[async_trait]
pub trait HostSource: Send + Sync {
    /// Discover the hosts currently described by the source
    ///
    /// # Returns
    ///
    /// - `Ok(hosts)`: Canonical hosts found (may be empty)
    /// - `Err(Error)`: If the source itself could not be read
    async fn discover(&self) -> Result<Vec<HostName>, crate::Error>;

    /// Short name for logging
    fn source_name(&self) -> &str {
        "host-source"
    }
}
