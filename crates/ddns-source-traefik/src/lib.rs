// # Traefik Host Source
//
// This crate discovers hostnames from Traefik's file-provider dynamic
// configuration: either a single YAML file or a directory tree of `.yml` /
// `.yaml` files, each possibly holding several YAML documents.
//
// ## Discovery
//
// Every document is searched for `http.routers.<name>.rule` and
// `tcp.routers.<name>.rule`. Literal hosts inside `Host(...)` and
// `HostSNI(...)` are extracted; a rule using `HostRegexp(...)` is skipped as
// a whole since its hosts cannot be enumerated.
//
// Unreadable files and YAML syntax errors are logged and skipped so one bad
// file never hides the routers declared elsewhere. Only a missing or
// unreadable source path is an error.
//
// The source is re-read on every call, so routers added while the daemon
// runs are picked up by the next sync cycle.

use async_trait::async_trait;
use ddns_core::traits::HostSource;
use ddns_core::{Error, HostName, Result, extract_hosts};
use serde::Deserialize;
use serde_yaml::Value;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use walkdir::WalkDir;

/// Router sections that carry host rules
const ROUTER_SECTIONS: [&str; 2] = ["http", "tcp"];

/// List the YAML files making up a configuration source
///
/// A file path is returned as is, whatever its extension. A directory is
/// walked recursively and only `.yml` / `.yaml` files (any case) are kept,
/// in file-name order. Entries that cannot be walked are skipped.
pub fn list_yaml_files(source: &Path) -> Result<Vec<PathBuf>> {
    let metadata = std::fs::metadata(source)
        .map_err(|e| Error::invalid_input(format!("{}: {}", source.display(), e)))?;

    if !metadata.is_dir() {
        return Ok(vec![source.to_path_buf()]);
    }

    let files = WalkDir::new(source)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file())
        .map(|entry| entry.into_path())
        .filter(|path| is_yaml(path))
        .collect();

    Ok(files)
}

fn is_yaml(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("yml") || ext.eq_ignore_ascii_case("yaml"))
}

/// Hosts named by one router rule
///
/// `context` only labels log lines.
pub fn hosts_from_rule(rule: &str, context: &str) -> BTreeSet<HostName> {
    if rule.contains("HostRegexp(") {
        warn!("Skipping unsupported HostRegexp rule in {}: {}", context, rule);
        return BTreeSet::new();
    }

    let hosts = extract_hosts(rule);
    if hosts.is_empty() && (rule.contains("Host(") || rule.contains("HostSNI(")) {
        warn!("No literal hosts extracted from {}: {}", context, rule);
    }
    hosts
}

/// Hosts named by the HTTP and TCP routers of one YAML document
pub fn hosts_from_document(doc: &Value, origin: &str) -> BTreeSet<HostName> {
    let mut hosts = BTreeSet::new();

    for section in ROUTER_SECTIONS {
        let Some(routers) = doc
            .get(section)
            .and_then(|s| s.get("routers"))
            .and_then(Value::as_mapping)
        else {
            continue;
        };

        for (name, router) in routers {
            let Some(rule) = router.get("rule").and_then(Value::as_str) else {
                continue;
            };
            let context = format!(
                "{}:{}.routers.{}",
                origin,
                section,
                name.as_str().unwrap_or("<unnamed>")
            );
            hosts.extend(hosts_from_rule(rule, &context));
        }
    }

    hosts
}

/// Scan a file or directory for router hosts
pub fn discover_hosts(source: &Path) -> Result<BTreeSet<HostName>> {
    let mut hosts = BTreeSet::new();

    for path in list_yaml_files(source)? {
        let content = match std::fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) => {
                warn!("Failed reading {}: {}", path.display(), e);
                continue;
            }
        };

        let origin = path.display().to_string();
        for document in serde_yaml::Deserializer::from_str(&content) {
            match Value::deserialize(document) {
                Ok(doc) => hosts.extend(hosts_from_document(&doc, &origin)),
                Err(e) => {
                    // The parser cannot resync after an error
                    warn!("Failed parsing YAML in {}: {}", origin, e);
                    break;
                }
            }
        }
    }

    debug!("Discovered {} host(s) under {}", hosts.len(), source.display());
    Ok(hosts)
}

/// [`HostSource`] backed by Traefik dynamic configuration on disk
#[derive(Debug, Clone)]
pub struct TraefikSource {
    path: PathBuf,
}

impl TraefikSource {
    /// Create a source reading `path` (file or directory)
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Configured source path
    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl HostSource for TraefikSource {
    async fn discover(&self) -> Result<Vec<HostName>> {
        let path = self.path.clone();
        let hosts = tokio::task::spawn_blocking(move || discover_hosts(&path))
            .await
            .map_err(|e| Error::Other(format!("traefik scan task failed: {e}")))??;
        Ok(hosts.into_iter().collect())
    }

    fn source_name(&self) -> &str {
        "traefik"
    }
}
