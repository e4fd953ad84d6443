//! Core traits for the DDNS sync system
//!
//! This module defines the abstract interfaces that all implementations must follow.
//!
//! - [`IpSource`]: Discover the current public IPv4 address
//! - [`DnsProvider`]: Read and write A records via provider APIs
//! - [`HostSource`]: Re-discover hostnames once per cycle

pub mod ip_source;
pub mod dns_provider;
pub mod host_source;

pub use ip_source::IpSource;
pub use dns_provider::{ARecord, ARecordSpec, DnsProvider, Zone};
pub use host_source::HostSource;
