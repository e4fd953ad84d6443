// # Cloudflare DNS Provider
//
// This crate provides the Cloudflare DNS provider for the DDNS sync system.
//
// ## Behaviour
//
// - Lists every zone the token can see (paginated, 50 per page)
// - Lists, creates and updates A records; never deletes anything
// - Retries transport failures, HTTP 429 and HTTP 5xx up to 3 attempts with
//   linear backoff (1s, 2s)
// - Fails immediately on any other non-2xx status, an unparseable body or
//   an envelope with `success: false`
//
// ## Security Requirements
//
// - API token NEVER appears in logs or Debug output
// - Construction fails if the token is empty
//
// ## API Reference
//
// - Cloudflare API v4: https://developers.cloudflare.com/api/
// - List Zones: GET `/zones?page=N&per_page=50`
// - List DNS Records: GET `/zones/:zone_id/dns_records?type=A&name=...`
// - Create DNS Record: POST `/zones/:zone_id/dns_records`
// - Update DNS Record: PUT `/zones/:zone_id/dns_records/:record_id`

mod types;

use async_trait::async_trait;
use ddns_core::http::{HttpClient, HttpRequest, HttpResponse};
use ddns_core::retry::{Attempt, RetryPolicy, execute_with_policy};
use ddns_core::traits::{ARecord, ARecordSpec, DnsProvider, Zone};
use ddns_core::{Error, HostName, Result};
use http::header::{AUTHORIZATION, CONTENT_TYPE};
use http::{HeaderValue, Method};
use serde::de::DeserializeOwned;
use std::sync::Arc;
use tracing::{debug, trace};
use types::{CloudflareResponse, ErrorBody, RecordPayload, summarize};

/// Cloudflare API base URL
pub const CLOUDFLARE_API_BASE: &str = "https://api.cloudflare.com/client/v4";

/// Zones per page (the API maximum for zone listing)
const ZONES_PER_PAGE: u32 = 50;

/// Records per page when listing a single name
const RECORDS_PER_PAGE: u32 = 100;

/// Longest error body excerpt kept in errors
const MAX_BODY_EXCERPT: usize = 256;

/// Cloudflare DNS provider
///
/// Every outbound call goes through the injected [`HttpClient`], which owns
/// the request timeout.
///
/// # Security
///
/// The Debug implementation intentionally does NOT expose the API token.
pub struct CloudflareProvider {
    /// Cloudflare API token
    /// ⚠️ NEVER log this value
    api_token: String,

    /// API root, overridable for tests
    base_url: String,

    /// HTTP transport
    client: Arc<dyn HttpClient>,

    /// Retry policy for each API call
    retry: RetryPolicy,
}

// Custom Debug implementation that hides the API token
impl std::fmt::Debug for CloudflareProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CloudflareProvider")
            .field("api_token", &"<REDACTED>")
            .field("base_url", &self.base_url)
            .field("retry", &self.retry)
            .finish()
    }
}

impl CloudflareProvider {
    /// Create a new Cloudflare provider
    ///
    /// # Parameters
    ///
    /// - `api_token`: Cloudflare API token with Zone:Read and DNS:Edit permissions
    /// - `client`: HTTP transport (configured with the request timeout)
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the token is empty.
    pub fn new(api_token: impl Into<String>, client: Arc<dyn HttpClient>) -> Result<Self> {
        let api_token = api_token.into().trim().to_string();
        if api_token.is_empty() {
            return Err(Error::config("Cloudflare API token is required"));
        }

        Ok(Self {
            api_token,
            base_url: CLOUDFLARE_API_BASE.to_string(),
            client,
            retry: RetryPolicy::default(),
        })
    }

    /// Point the provider at another API root
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Replace the retry policy
    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    fn build_request(&self, method: Method, path: &str, body: Option<Vec<u8>>) -> Result<HttpRequest> {
        let bearer = HeaderValue::from_str(&format!("Bearer {}", self.api_token))
            .map_err(|_| Error::config("Cloudflare API token contains invalid characters"))?;

        let mut request = HttpRequest::new(method, format!("{}{}", self.base_url, path))
            .with_header(AUTHORIZATION, bearer)
            .with_header(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        if let Some(body) = body {
            request = request.with_body(body);
        }
        Ok(request)
    }

    /// Send one API call with retry and unwrap the envelope
    async fn call<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: Option<Vec<u8>>,
    ) -> Result<CloudflareResponse<T>> {
        debug!("Cloudflare {} {}", method, path);
        let request = self.build_request(method.clone(), path, body)?;
        let request = &request;

        execute_with_policy(&self.retry, move |attempt| async move {
            trace!("Cloudflare attempt {} for {}", attempt, request.url);
            match self.client.send(request.clone()).await {
                Ok(response) => classify_response(response),
                Err(e) => Attempt::Retryable(e),
            }
        })
        .await
        .map_err(|e| e.context(format!("cloudflare request failed ({method} {path})")))
    }
}

/// Turn one HTTP response into an attempt outcome
fn classify_response<T: DeserializeOwned>(response: HttpResponse) -> Attempt<CloudflareResponse<T>> {
    if !response.is_success() {
        let err = Error::status(response.status.as_u16(), error_detail(&response.body));
        return if err.is_transient() {
            Attempt::Retryable(err)
        } else {
            Attempt::Permanent(err)
        };
    }

    let envelope: CloudflareResponse<T> = match serde_json::from_slice(&response.body) {
        Ok(envelope) => envelope,
        Err(e) => return Attempt::Permanent(Error::malformed(format!("cloudflare envelope: {e}"))),
    };

    if !envelope.success {
        return Attempt::Permanent(Error::provider("cloudflare", envelope.error_summary()));
    }
    Attempt::Success(envelope)
}

/// Readable detail for a failed response: API errors if present, else the raw body
fn error_detail(body: &[u8]) -> String {
    if let Ok(ErrorBody { errors: Some(errors) }) = serde_json::from_slice::<ErrorBody>(body)
        && !errors.is_empty()
    {
        return summarize(&errors);
    }
    let text = String::from_utf8_lossy(body);
    let text = text.trim();
    match text.char_indices().nth(MAX_BODY_EXCERPT) {
        Some((end, _)) => text[..end].to_string(),
        None => text.to_string(),
    }
}

fn require_result<T>(envelope: CloudflareResponse<T>, what: &str) -> Result<T> {
    envelope
        .result
        .ok_or_else(|| Error::malformed(format!("cloudflare {what}: missing result")))
}

#[async_trait]
impl DnsProvider for CloudflareProvider {
    async fn list_zones(&self) -> Result<Vec<Zone>> {
        let mut zones = Vec::new();
        let mut page = 1;

        loop {
            let path = format!("/zones?page={page}&per_page={ZONES_PER_PAGE}");
            let envelope: CloudflareResponse<Vec<Zone>> = self.call(Method::GET, &path, None).await?;
            let total_pages = envelope.result_info.as_ref().map_or(0, |info| info.total_pages);
            zones.extend(envelope.result.unwrap_or_default());

            if total_pages <= page {
                break;
            }
            page += 1;
        }

        debug!("Cloudflare returned {} zone(s)", zones.len());
        Ok(zones)
    }

    async fn list_a_records(&self, zone_id: &str, host: &HostName) -> Result<Vec<ARecord>> {
        let path = format!(
            "/zones/{}/dns_records?type=A&name={}&per_page={}",
            zone_id,
            urlencoding::encode(host.as_str()),
            RECORDS_PER_PAGE
        );
        let envelope: CloudflareResponse<Vec<ARecord>> = self.call(Method::GET, &path, None).await?;

        // The name filter is re-applied locally; the API has matched loosely before
        let mut records: Vec<ARecord> = envelope
            .result
            .unwrap_or_default()
            .into_iter()
            .filter(|r| r.record_type.eq_ignore_ascii_case("A"))
            .filter(|r| r.name.trim_end_matches('.').eq_ignore_ascii_case(host.as_str()))
            .collect();
        records.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(records)
    }

    async fn create_a_record(&self, zone_id: &str, spec: &ARecordSpec) -> Result<ARecord> {
        let body = serde_json::to_vec(&RecordPayload::from(spec))?;
        let path = format!("/zones/{zone_id}/dns_records");
        let envelope = self.call(Method::POST, &path, Some(body)).await?;
        require_result(envelope, "create record")
    }

    async fn update_a_record(&self, zone_id: &str, record_id: &str, spec: &ARecordSpec) -> Result<ARecord> {
        let body = serde_json::to_vec(&RecordPayload::from(spec))?;
        let path = format!("/zones/{zone_id}/dns_records/{record_id}");
        let envelope = self.call(Method::PUT, &path, Some(body)).await?;
        require_result(envelope, "update record")
    }

    fn provider_name(&self) -> &'static str {
        "cloudflare"
    }
}
