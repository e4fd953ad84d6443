// # IP Source Trait
//
// Defines the interface for discovering the machine's current public IPv4
// address.
//
// ## Implementations
//
// - HTTP echo services with ordered fallback: `ddns-ip-http` crate
//
// ## Usage
//
// ```rust,ignore
// use ddns_core::IpSource;
//
// async fn show(source: &dyn IpSource) -> ddns_core::Result<()> {
//     let ip = source.current().await?;
//     println!("public address: {ip}");
//     Ok(())
// }
// ```

use async_trait::async_trait;
use std::net::Ipv4Addr;

/// Trait for public IP source implementations
///
/// Sources are queried once per cycle and hold no state between calls.
/// They must not retry internally: a failed lookup is reported to the
/// runner, which aborts the current cycle and tries again on the next tick.
#[async_trait]
pub trait IpSource: Send + Sync {
    /// Resolve the current public IPv4 address
    ///
    /// # Returns
    ///
    /// - `Ok(Ipv4Addr)`: The current public address
    /// - `Err(Error)`: If no configured endpoint yielded a valid address
    async fn current(&self) -> Result<Ipv4Addr, crate::Error>;

    /// Short name for logging
    fn source_name(&self) -> &'static str {
        "ip-source"
    }
}
