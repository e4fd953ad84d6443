//! Cloudflare API v4 wire types

use ddns_core::traits::ARecordSpec;
use serde::{Deserialize, Serialize};

/// Common response envelope
#[derive(Debug, Deserialize)]
#[serde(bound(deserialize = "T: Deserialize<'de>"))]
pub(crate) struct CloudflareResponse<T> {
    pub success: bool,
    #[serde(default)]
    pub result: Option<T>,
    #[serde(default)]
    pub errors: Option<Vec<CloudflareError>>,
    #[serde(default)]
    pub result_info: Option<CloudflareResultInfo>,
}

impl<T> CloudflareResponse<T> {
    /// `[code] message` pairs joined for error reporting
    pub fn error_summary(&self) -> String {
        summarize(self.errors.as_deref().unwrap_or_default())
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct CloudflareError {
    #[serde(default)]
    pub code: i64,
    #[serde(default)]
    pub message: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct CloudflareResultInfo {
    #[serde(default)]
    pub total_pages: u32,
}

/// Error body of a non-2xx response; every field is optional
#[derive(Debug, Default, Deserialize)]
pub(crate) struct ErrorBody {
    #[serde(default)]
    pub errors: Option<Vec<CloudflareError>>,
}

pub(crate) fn summarize(errors: &[CloudflareError]) -> String {
    if errors.is_empty() {
        return "unknown error".to_string();
    }
    errors
        .iter()
        .map(|e| format!("[{}] {}", e.code, e.message))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Body of record create/update requests
#[derive(Debug, Serialize)]
pub(crate) struct RecordPayload<'a> {
    #[serde(rename = "type")]
    pub record_type: &'static str,
    pub name: &'a str,
    pub content: String,
    /// 1 means "automatic" on Cloudflare
    pub ttl: u32,
    pub proxied: bool,
    pub comment: &'a str,
}

impl<'a> From<&'a ARecordSpec> for RecordPayload<'a> {
    fn from(spec: &'a ARecordSpec) -> Self {
        Self {
            record_type: "A",
            name: spec.name.as_str(),
            content: spec.ip.to_string(),
            ttl: 1,
            proxied: spec.proxied,
            comment: &spec.comment,
        }
    }
}
