// # ddns-core
//
// Core library for the reverse-proxy driven DDNS reconciler.
//
// ## Architecture Overview
//
// This library keeps provider A records pointed at the machine's public IPv4
// address for every hostname a producer registers:
// - **host / rule**: Hostname normalization and router-rule extraction
// - **IpSource**: Trait for discovering the public IPv4 address
// - **DnsProvider**: Trait for reading and writing A records via provider APIs
// - **HttpClient**: Transport seam shared by IP sources and providers
// - **HostRegistry**: Concurrency-safe set of managed hostnames
// - **Reconciler**: Per-host diff of desired vs. actual A records
// - **SyncRunner**: Periodic cycle orchestrating all of the above
//
// ## Design Principles
//
// 1. **Separation of Concerns**: Core logic is separate from implementations
// 2. **Stateless Cycles**: Every cycle re-reads zones and records; nothing is cached
// 3. **Never Delete**: Only creates and updates, and updates never touch proxied/comment
// 4. **Library-First**: All core functionality can be used as a library

pub mod config;
pub mod engine;
pub mod error;
pub mod host;
pub mod http;
pub mod reconcile;
pub mod registry;
pub mod retry;
pub mod rule;
pub mod traits;
pub mod zone;

// Re-export core types for convenience
pub use config::{RouteConfig, SyncConfig};
pub use engine::{CycleState, EngineEvent, RunnerCell, SyncRunner};
pub use error::{Error, Result};
pub use host::{HostName, normalize};
pub use http::{HttpClient, HttpRequest, HttpResponse};
pub use reconcile::{ReconcileOutcome, Reconciler, SyncSummary};
pub use registry::HostRegistry;
pub use retry::{Attempt, RetryPolicy, execute_with_policy};
pub use rule::extract_hosts;
pub use traits::{ARecord, ARecordSpec, DnsProvider, HostSource, IpSource, Zone};
pub use zone::{best_zone_for_domain, resolve_zone};
