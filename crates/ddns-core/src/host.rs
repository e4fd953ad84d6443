//! Hostname canonicalization
//!
//! Every hostname entering the system (from router rules, explicit domain
//! lists or live discovery) passes through [`normalize`]. The result is a
//! [`HostName`]: lowercase, literal, without port, brackets or trailing dot.

use crate::error::Error;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A canonical fully-qualified hostname managed by the system
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct HostName(String);

impl HostName {
    /// Parse and canonicalize a raw hostname
    ///
    /// Returns `None` for anything [`normalize`] rejects.
    pub fn parse(raw: &str) -> Option<Self> {
        normalize(raw)
    }

    /// The canonical hostname
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consume into the underlying string
    pub fn into_string(self) -> String {
        self.0
    }

    /// Whether this host is `zone` itself or lies underneath it
    ///
    /// `zone` is compared case-insensitively; surrounding whitespace is ignored.
    pub fn is_within(&self, zone: &str) -> bool {
        let zone = zone.trim().trim_end_matches('.').to_lowercase();
        if zone.is_empty() {
            return false;
        }
        self.0 == zone
            || (self.0.len() > zone.len()
                && self.0.ends_with(zone.as_str())
                && self.0.as_bytes()[self.0.len() - zone.len() - 1] == b'.')
    }
}

impl fmt::Display for HostName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for HostName {
    type Error = Error;

    fn try_from(raw: String) -> Result<Self, Self::Error> {
        normalize(&raw).ok_or_else(|| Error::invalid_input(format!("not a literal hostname: {raw:?}")))
    }
}

impl From<HostName> for String {
    fn from(host: HostName) -> Self {
        host.0
    }
}

impl AsRef<str> for HostName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Canonicalize a raw hostname
///
/// - trims whitespace and stray backticks, lowercases
/// - strips bracket syntax (`[host]` / `[host]:port`)
/// - strips a `:port` suffix when exactly one colon is present
/// - drops a trailing root dot
///
/// Returns `None` when the result is empty, contains a wildcard, or still
/// carries characters that cannot appear in a literal hostname (`:`, brackets,
/// inner whitespace). Never panics.
pub fn normalize(raw: &str) -> Option<HostName> {
    let mut host = raw.trim().trim_matches('`').trim().to_lowercase();

    if let Some(rest) = host.strip_prefix('[') {
        host = match rest.split_once(']') {
            Some((inner, _port)) => inner.to_string(),
            None => rest.to_string(),
        };
    } else if let Some(inner) = host.strip_suffix(']') {
        host = inner.to_string();
    }

    if host.matches(':').count() == 1 {
        if let Some((name, _port)) = host.split_once(':') {
            host = name.to_string();
        }
    }

    let host = host.trim().trim_end_matches('.');

    if host.is_empty()
        || host.contains('*')
        || host.contains(':')
        || host.contains('[')
        || host.contains(']')
        || host.chars().any(char::is_whitespace)
    {
        return None;
    }

    Some(HostName(host.to_string()))
}
