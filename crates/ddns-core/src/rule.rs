//! Router rule host extraction
//!
//! Reverse-proxy router rules combine predicate calls with boolean
//! operators, e.g.
//!
//! ```text
//! (Host(`app.example.com`) || Host(`www.example.com`)) && PathPrefix(`/api`)
//! ```
//!
//! Only literal hostnames inside `Host(...)` (HTTP routers) and
//! `HostSNI(...)` (TCP routers) are of interest. Everything else, including
//! `HostRegexp(...)`, is ignored.

use crate::host::{HostName, normalize};
use regex::Regex;
use std::collections::BTreeSet;
use std::sync::LazyLock;
use tracing::debug;

/// `Host(...)` / `HostSNI(...)` calls; the argument ends at the first `)`.
static HOST_CALL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(?:HostSNI|Host)\(([^)]*)\)").expect("host call pattern is valid")
});

/// Backtick-quoted literal inside a call argument list.
static BACKTICK_LITERAL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"`([^`]+)`").expect("backtick pattern is valid"));

/// Extract the literal hostnames referenced by a router rule
///
/// Malformed calls and wildcard or otherwise invalid literals are dropped
/// without affecting the rest of the rule.
pub fn extract_hosts(rule: &str) -> BTreeSet<HostName> {
    let mut hosts = BTreeSet::new();
    let rule = rule.trim();
    if rule.is_empty() {
        return hosts;
    }

    for call in HOST_CALL.captures_iter(rule) {
        let Some(args) = call.get(1) else { continue };
        let mut literals = 0usize;
        for literal in BACKTICK_LITERAL.captures_iter(args.as_str()) {
            literals += 1;
            let Some(raw) = literal.get(1) else { continue };
            match normalize(raw.as_str()) {
                Some(host) => {
                    hosts.insert(host);
                }
                None => debug!("Ignoring non-literal host {:?} in rule", raw.as_str()),
            }
        }
        if literals == 0 {
            debug!("Ignoring host call without literals: {}", call.get(0).map_or("", |m| m.as_str()));
        }
    }

    hosts
}
