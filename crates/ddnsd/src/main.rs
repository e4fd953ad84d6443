// # ddnsd - DDNS Sync Daemon
//
// The ddnsd daemon is a thin integration layer responsible for:
// 1. Reading configuration from environment variables
// 2. Initializing logging and the runtime
// 3. Wiring the HTTP transport, Cloudflare provider, IP resolver and host sources
// 4. Registering hostnames and running the sync runner until a signal
//
// All reconciliation logic lives in ddns-core.
//
// ## Configuration
//
// All configuration is done via environment variables:
//
// ### Provider
// - `DDNS_PROVIDER_API_TOKEN`: Cloudflare API token (required)
// - `DDNS_ZONE`: Only manage records in this zone (optional)
//
// ### Hostnames
// - `DDNS_DOMAINS`: Comma-separated hostnames to manage
// - `DDNS_ROUTER_RULES`: Router rules to mine for `Host(...)`, separated by `;` or newlines
// - `DDNS_TRAEFIK_SOURCE`: Traefik dynamic-config file or directory, re-scanned every cycle
//
// ### Sync
// - `DDNS_SYNC_INTERVAL_SECS`: Seconds between cycles (default 300)
// - `DDNS_REQUEST_TIMEOUT_SECS`: Per-request timeout (default 10)
// - `DDNS_IP_SOURCES`: Comma-separated public IP endpoints
// - `DDNS_DEFAULT_PROXIED`: Proxied flag for created records (default false)
// - `DDNS_MANAGED_COMMENT`: Comment written into created records
// - `DDNS_ENABLED`: Set to false to disable syncing (default true)
// - `DDNS_MODE`: `dry-run` to log writes instead of performing them
// - `DDNS_RUN_ONCE`: Run a single cycle and exit (default false)
//
// ### Logging
// - `DDNS_LOG_LEVEL`: trace, debug, info, warn, error (default info)
//
// ## Example
//
// ```bash
// export DDNS_PROVIDER_API_TOKEN=your_token
// export DDNS_ZONE=example.com
// export DDNS_DOMAINS=example.com,www.example.com
// export DDNS_ROUTER_RULES='Host(`app.example.com`) && PathPrefix(`/api`)'
// export DDNS_TRAEFIK_SOURCE=/etc/traefik/dynamic
//
// ddnsd
// ```

use anyhow::{Context, Result};
use ddns_core::{EngineEvent, RouteConfig, RunnerCell, SyncConfig, SyncRunner};
use ddns_ip_http::{HttpIpSource, ReqwestHttpClient};
use ddns_provider_cloudflare::CloudflareProvider;
use ddns_source_traefik::TraefikSource;
use std::env;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use tracing::{Level, debug, error, info, warn};
use tracing_subscriber::FmtSubscriber;

#[cfg(unix)]
use tokio::signal::unix::{SignalKind, signal};

/// How long a running cycle may take to finish after a shutdown signal
const SHUTDOWN_GRACE: Duration = Duration::from_secs(30);

/// Exit codes for different termination scenarios
///
/// These codes follow systemd conventions:
/// - 0: Clean shutdown
/// - 1: Configuration or startup error
/// - 2: Runtime error (unexpected)
#[derive(Debug, Clone, Copy)]
enum DdnsExitCode {
    /// Clean shutdown (normal exit)
    CleanShutdown = 0,
    /// Configuration error or startup failure
    ConfigError = 1,
    /// Runtime error (unexpected failure)
    RuntimeError = 2,
}

impl From<DdnsExitCode> for ExitCode {
    fn from(code: DdnsExitCode) -> Self {
        ExitCode::from(code as u8)
    }
}

/// Application configuration
#[derive(Debug)]
struct Config {
    sync: SyncConfig,
    route: RouteConfig,
    traefik_source: Option<PathBuf>,
    run_once: bool,
    log_level: String,
}

impl Config {
    /// Load configuration from environment variables
    fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration through `lookup`, which maps a variable name to its value
    fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let api_token = var("DDNS_PROVIDER_API_TOKEN").context(
            "DDNS_PROVIDER_API_TOKEN is required. \
             Set it via: export DDNS_PROVIDER_API_TOKEN=your_token",
        )?;

        let mut sync = SyncConfig::new(api_token);
        sync.zone = var("DDNS_ZONE");
        if let Some(secs) = var("DDNS_SYNC_INTERVAL_SECS") {
            sync.sync_interval_secs = parse_secs("DDNS_SYNC_INTERVAL_SECS", &secs)?;
        }
        if let Some(secs) = var("DDNS_REQUEST_TIMEOUT_SECS") {
            sync.request_timeout_secs = parse_secs("DDNS_REQUEST_TIMEOUT_SECS", &secs)?;
        }
        if let Some(sources) = var("DDNS_IP_SOURCES") {
            sync.ip_sources = split_list(&sources, &[',']);
        }
        if let Some(proxied) = var("DDNS_DEFAULT_PROXIED") {
            sync.default_proxied = parse_bool("DDNS_DEFAULT_PROXIED", &proxied)?;
        }
        if let Some(comment) = var("DDNS_MANAGED_COMMENT") {
            sync.managed_comment = comment;
        }
        if let Some(enabled) = var("DDNS_ENABLED") {
            sync.enabled = parse_bool("DDNS_ENABLED", &enabled)?;
        }
        sync.dry_run = var("DDNS_MODE").is_some_and(|mode| mode.eq_ignore_ascii_case("dry-run"));

        for source in &sync.ip_sources {
            if !source.starts_with("https://") && !source.starts_with("http://") {
                anyhow::bail!("DDNS_IP_SOURCES entries must be http(s) URLs. Got: {}", source);
            }
        }

        let route = RouteConfig {
            domains: var("DDNS_DOMAINS")
                .map(|d| split_list(&d, &[',']))
                .unwrap_or_default(),
            router_rules: var("DDNS_ROUTER_RULES")
                .map(|r| split_list(&r, &[';', '\n']))
                .unwrap_or_default(),
            zone: sync.zone.clone(),
            ..RouteConfig::default()
        };

        let traefik_source = var("DDNS_TRAEFIK_SOURCE").map(PathBuf::from);

        let run_once = match var("DDNS_RUN_ONCE") {
            Some(value) => parse_bool("DDNS_RUN_ONCE", &value)?,
            None => false,
        };

        let log_level = var("DDNS_LOG_LEVEL").unwrap_or_else(|| "info".to_string());

        Ok(Self {
            sync: sync.normalized(),
            route,
            traefik_source,
            run_once,
            log_level,
        })
    }

    /// Validate the configuration
    fn validate(&self) -> Result<()> {
        self.sync.validate()?;

        if !(1..=86_400).contains(&self.sync.sync_interval_secs) {
            anyhow::bail!(
                "DDNS_SYNC_INTERVAL_SECS must be between 1 and 86400 seconds. Got: {}",
                self.sync.sync_interval_secs
            );
        }

        if !(1..=300).contains(&self.sync.request_timeout_secs) {
            anyhow::bail!(
                "DDNS_REQUEST_TIMEOUT_SECS must be between 1 and 300 seconds. Got: {}",
                self.sync.request_timeout_secs
            );
        }

        match self.log_level.to_lowercase().as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            _ => anyhow::bail!(
                "DDNS_LOG_LEVEL '{}' is not valid. \
                Valid levels: trace, debug, info, warn, error",
                self.log_level
            ),
        }

        Ok(())
    }
}

fn split_list(raw: &str, separators: &[char]) -> Vec<String> {
    raw.split(separators)
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

fn parse_secs(key: &str, value: &str) -> Result<u64> {
    value
        .parse()
        .with_context(|| format!("{key} must be a whole number of seconds. Got: {value}"))
}

fn parse_bool(key: &str, value: &str) -> Result<bool> {
    match value.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => anyhow::bail!("{key} must be true or false. Got: {value}"),
    }
}

fn main() -> ExitCode {
    // Load configuration from environment
    let config = match Config::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Configuration error: {:#}", e);
            return DdnsExitCode::ConfigError.into();
        }
    };

    // Validate configuration
    if let Err(e) = config.validate() {
        eprintln!("Configuration validation error: {:#}", e);
        return DdnsExitCode::ConfigError.into();
    }

    // Initialize tracing
    let log_level = match config.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = FmtSubscriber::builder().with_max_level(log_level).finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
        return DdnsExitCode::ConfigError.into();
    }

    info!("Starting ddnsd daemon");
    if config.sync.dry_run {
        warn!("Running in DRY-RUN mode - no DNS records will be changed");
    }

    let cell = RunnerCell::new();
    let runner = match cell.get_or_init(|| build_runner(&config.sync, config.traefik_source.as_deref())) {
        Ok(runner) => runner,
        Err(e) => {
            error!("Failed to initialize sync runner: {}", e);
            return DdnsExitCode::ConfigError.into();
        }
    };

    let added = runner.register_route_config("env", &config.route);
    info!("Configuration loaded: {} host(s) registered", added);

    // Enter tokio runtime
    let rt = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("Failed to create tokio runtime: {}", e);
            return DdnsExitCode::RuntimeError.into();
        }
    };

    let result = rt.block_on(async {
        if let Err(e) = run_daemon(runner, config.run_once).await {
            error!("Daemon error: {:#}", e);
            DdnsExitCode::RuntimeError
        } else {
            DdnsExitCode::CleanShutdown
        }
    });

    result.into()
}

/// Wire the production transport, provider, IP resolver and host sources into a runner
fn build_runner(sync: &SyncConfig, traefik_source: Option<&Path>) -> ddns_core::Result<SyncRunner> {
    let client = Arc::new(ReqwestHttpClient::new(sync.request_timeout())?);
    let provider = CloudflareProvider::new(sync.api_token.clone(), client.clone())?;
    let ip_source = HttpIpSource::new(sync.ip_sources.clone(), client);

    let mut runner = SyncRunner::new(sync.clone(), Arc::new(provider), Arc::new(ip_source))?;
    if let Some(path) = traefik_source {
        info!("Scanning Traefik configuration at {}", path.display());
        runner = runner.with_host_source(Arc::new(TraefikSource::new(path)));
    }
    Ok(runner)
}

/// Run the daemon
async fn run_daemon(runner: Arc<SyncRunner>, run_once: bool) -> Result<()> {
    if let Some(events) = runner.take_events() {
        tokio::spawn(log_events(events));
    }

    if run_once {
        info!("Running a single sync cycle");
        let summary = runner.run_cycle().await.context("sync cycle aborted")?;
        info!("Single cycle finished: {}", summary);
        return Ok(());
    }

    let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel();
    let handle = {
        let runner = Arc::clone(&runner);
        tokio::spawn(async move { runner.run(shutdown_rx).await })
    };

    info!("Daemon initialized successfully");

    let signal = wait_for_shutdown().await?;
    info!("Received shutdown signal: {}", signal);
    let _ = shutdown_tx.send(());

    match tokio::time::timeout(SHUTDOWN_GRACE, handle).await {
        Ok(joined) => joined.context("sync runner task panicked")??,
        Err(_) => anyhow::bail!("Shutdown timeout after {:?}", SHUTDOWN_GRACE),
    }

    info!("Shutting down daemon");
    Ok(())
}

/// Drain engine events into the debug log
async fn log_events(mut events: tokio::sync::mpsc::Receiver<EngineEvent>) {
    while let Some(event) = events.recv().await {
        debug!(?event, "engine event");
    }
}

/// Wait for shutdown signals (SIGTERM, SIGINT)
///
/// # Returns
///
/// Returns the name of the signal received.
#[cfg(unix)]
async fn wait_for_shutdown() -> Result<&'static str> {
    // Set up signal handlers for SIGTERM and SIGINT
    let mut sigterm = signal(SignalKind::terminate())
        .map_err(|e| anyhow::anyhow!("Failed to setup SIGTERM handler: {}", e))?;
    let mut sigint = signal(SignalKind::interrupt())
        .map_err(|e| anyhow::anyhow!("Failed to setup SIGINT handler: {}", e))?;

    let signal = tokio::select! {
        _ = sigterm.recv() => "SIGTERM",
        _ = sigint.recv() => "SIGINT",
    };
    Ok(signal)
}

/// Wait for shutdown signals (SIGINT only)
///
/// Fallback implementation for non-Unix platforms.
#[cfg(not(unix))]
async fn wait_for_shutdown() -> Result<&'static str> {
    tokio::signal::ctrl_c()
        .await
        .map_err(|e| anyhow::anyhow!("Failed to wait for CTRL-C: {}", e))?;
    Ok("SIGINT")
}
