// # HTTP IP Source
//
// This crate provides the public IPv4 resolver for the DDNS sync system and
// the reqwest-backed HTTP transport shared with the provider client.
//
// ## Architecture
//
// Queries an ordered list of echo services (e.g. api.ipify.org) that answer
// with the caller's address as plain text. Services are tried strictly one
// after another; the first valid IPv4 answer wins. There is no caching and
// no retry here: a total failure aborts the current cycle and the next
// cycle simply tries again.

mod client;

pub use client::ReqwestHttpClient;

use ddns_core::config::SyncConfig;
use ddns_core::http::{HttpClient, HttpRequest};
use ddns_core::traits::IpSource;
use ddns_core::{Error, Result};
use std::net::Ipv4Addr;
use std::sync::Arc;
use tracing::{debug, warn};

/// Longest body excerpt quoted in a failure reason
const MAX_BODY_EXCERPT: usize = 64;

/// Resolve the public IPv4 address from the first answering source
///
/// Each failure (transport error, non-2xx status, body that is not an IPv4
/// address) is recorded and the next source is tried. When every source
/// fails the error lists each reason as `"<url>: <reason>"`, joined by `"; "`.
pub async fn resolve_public_ipv4(sources: &[String], client: &dyn HttpClient) -> Result<Ipv4Addr> {
    let mut failures = Vec::with_capacity(sources.len());

    for source in sources {
        match query_source(source, client).await {
            Ok(ip) => {
                debug!("Public IP {} from {}", ip, source);
                return Ok(ip);
            }
            Err(reason) => {
                warn!("IP source {} failed: {}", source, reason);
                failures.push(format!("{source}: {reason}"));
            }
        }
    }

    if failures.is_empty() {
        return Err(Error::ip_resolution("no IP sources configured"));
    }
    Err(Error::ip_resolution(format!(
        "all IP sources failed: {}",
        failures.join("; ")
    )))
}

async fn query_source(url: &str, client: &dyn HttpClient) -> std::result::Result<Ipv4Addr, String> {
    let response = client
        .send(HttpRequest::get(url))
        .await
        .map_err(|e| e.to_string())?;

    if !response.is_success() {
        return Err(format!("unexpected status {}", response.status.as_u16()));
    }

    let text = response.text();
    let text = text.trim();
    text.parse::<Ipv4Addr>()
        .map_err(|_| format!("invalid IPv4 response {:?}", excerpt(text)))
}

fn excerpt(text: &str) -> &str {
    match text.char_indices().nth(MAX_BODY_EXCERPT) {
        Some((end, _)) => &text[..end],
        None => text,
    }
}

/// HTTP echo-service IP source with ordered fallback
pub struct HttpIpSource {
    /// Services to query, in order
    sources: Vec<String>,

    /// HTTP transport
    client: Arc<dyn HttpClient>,
}

impl HttpIpSource {
    /// Create a source over `sources` using `client`
    pub fn new(sources: Vec<String>, client: Arc<dyn HttpClient>) -> Self {
        Self { sources, client }
    }

    /// Create a source from the runner configuration
    ///
    /// Uses the configured IP sources and request timeout.
    pub fn from_config(config: &SyncConfig) -> Result<Self> {
        let client = ReqwestHttpClient::new(config.request_timeout())?;
        Ok(Self::new(config.ip_sources.clone(), Arc::new(client)))
    }

    /// Configured services
    pub fn sources(&self) -> &[String] {
        &self.sources
    }
}

#[async_trait::async_trait]
impl IpSource for HttpIpSource {
    async fn current(&self) -> Result<Ipv4Addr> {
        resolve_public_ipv4(&self.sources, self.client.as_ref()).await
    }

    fn source_name(&self) -> &'static str {
        "http"
    }
}
