// # vpnrouterd - Policy Routing Daemon
//
// This is a thin integration layer: all routing logic lives in
// vpnrouter-core, file parsing in vpnrouter-hosts and HTTP handling in
// vpnrouter-api.
//
// The vpnrouterd daemon is responsible for:
// 1. Reading configuration from environment variables
// 2. Initializing logging and the runtime
// 3. Replaying persisted rules onto the OS
// 4. Serving the API and web UI until SIGTERM/SIGINT
//
// ## Configuration
//
// ### HTTP
// - `VPNROUTER_LISTEN`: Listen address (default `0.0.0.0:8080`)
// - `VPNROUTER_WEB_DIR`: Directory with static web files (optional)
// - `VPNROUTER_ADMIN_IPS`: Caller IPs allowed to change any route (default `127.0.0.1`)
// - `VPNROUTER_API_TOKENS`: Bearer tokens allowed to change any route (optional)
// - `VPNROUTER_TABLES`: `name=Label` pairs offered to clients (default `null=Blocked,defgw=Default`)
//
// ### Hosts
// - `VPNROUTER_LEASE_FILE`: dnsmasq lease file (default `/var/lib/misc/dnsmasq.leases`)
// - `VPNROUTER_ARP_FILE`: ARP table (default `/proc/net/arp`)
// - `VPNROUTER_NAME_FILE`: Static `MAC Name` file (default `./names.txt`)
// - `VPNROUTER_DEVICES`: LAN devices to take ARP entries from (default `eth0,eth1`)
//
// ### Rules
// - `VPNROUTER_DB_FILE`: Snapshot of the desired rules (default `./db.txt`)
// - `VPNROUTER_DEBUG`: Keep rules in memory instead of calling `ip`
// - `VPNROUTER_IP_COMMAND`: `ip` binary (default `ip`)
// - `VPNROUTER_COMMAND_TIMEOUT_SECS`: Time limit per `ip` call (default 10)
//
// ### Logging
// - `VPNROUTER_LOG_LEVEL`: trace, debug, info, warn or error (default `info`)
//
// ## Example
//
// ```bash
// export VPNROUTER_DEVICES=br0
// export VPNROUTER_TABLES=null=Blocked,defgw=Cable,vpn=VPN
// export VPNROUTER_DB_FILE=/var/lib/vpnrouter/db.txt
// export VPNROUTER_WEB_DIR=/usr/share/vpnrouter/web
//
// vpnrouterd
// ```

mod config;

use anyhow::{Context, Result};
use std::net::SocketAddr;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{Level, error, info, warn};
use tracing_subscriber::FmtSubscriber;
use vpnrouter_api::{AnyAuth, ApiState, IpAuth, TokenAuth, create_router};
use vpnrouter_core::{HostMerger, RulePersistence, VpnRouter};
use vpnrouter_hosts::{ArpTableSource, DnsmasqLeaseSource, StaticNameSource};

use crate::config::Config;

#[cfg(unix)]
use tokio::signal::unix::{SignalKind, signal};

/// Exit codes for different termination scenarios
///
/// These codes follow systemd conventions:
/// - 0: Clean shutdown
/// - 1: Configuration or startup error
/// - 2: Runtime error (unexpected)
#[derive(Debug, Clone, Copy)]
enum RouterExitCode {
    /// Clean shutdown (normal exit)
    CleanShutdown = 0,
    /// Configuration error or startup failure
    ConfigError = 1,
    /// Runtime error (unexpected failure)
    RuntimeError = 2,
}

impl From<RouterExitCode> for ExitCode {
    fn from(code: RouterExitCode) -> Self {
        ExitCode::from(code as u8)
    }
}

fn main() -> ExitCode {
    let config = match Config::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Configuration error: {:#}", e);
            return RouterExitCode::ConfigError.into();
        }
    };

    if let Err(e) = config.validate() {
        eprintln!("Configuration validation error: {:#}", e);
        return RouterExitCode::ConfigError.into();
    }

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
        return RouterExitCode::ConfigError.into();
    }

    info!("Starting vpnrouterd");
    info!(
        "Configuration loaded: {} table(s), devices {:?}",
        config.tables.len(),
        config.devices
    );
    if config.debug {
        warn!("Debug mode: rules are kept in memory, the OS is not changed");
    }

    let rt = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("Failed to create tokio runtime: {}", e);
            return RouterExitCode::RuntimeError.into();
        }
    };

    let result = rt.block_on(async {
        if let Err(e) = run_daemon(config).await {
            error!("Daemon error: {:#}", e);
            RouterExitCode::RuntimeError
        } else {
            RouterExitCode::CleanShutdown
        }
    });

    result.into()
}

/// Run the daemon
async fn run_daemon(config: Config) -> Result<()> {
    let router_config = config.router_config();

    let rules = Arc::new(RulePersistence::new(
        router_config.rules.build(),
        &router_config.db_file,
    ));
    let report = rules
        .init()
        .await
        .context("Failed to restore persisted rules")?;
    if !report.is_clean() {
        for (ip, reason) in &report.failed {
            warn!(ip = %ip, "Persisted rule not restored: {}", reason);
        }
    }
    info!("Restored {} persisted rule(s)", report.applied);

    let hosts_config = &router_config.hosts;
    let hosts = HostMerger::new(
        Box::new(ArpTableSource::new(
            &hosts_config.arp_file,
            hosts_config.devices.iter().cloned(),
        )),
        Box::new(DnsmasqLeaseSource::new(&hosts_config.lease_file)),
        Box::new(StaticNameSource::new(&hosts_config.name_file)),
    );
    let router = Arc::new(VpnRouter::new(Box::new(hosts), rules));

    let mut auth = AnyAuth::new().with(IpAuth::new(config.admin_ips.iter().copied()));
    if !config.api_tokens.is_empty() {
        auth = auth.with(TokenAuth::new(config.api_tokens.iter().cloned()));
    }

    let state = ApiState::new(router, Arc::new(auth), router_config.tables.clone());
    let app = create_router(state, config.web_dir.clone());

    let listener = tokio::net::TcpListener::bind(config.listen)
        .await
        .with_context(|| format!("Failed to bind {}", config.listen))?;
    info!("Listening on {}", listener.local_addr()?);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(async {
        match wait_for_shutdown().await {
            Ok(signal) => info!("Received shutdown signal: {}", signal),
            Err(e) => error!("Shutdown error: {}", e),
        }
    })
    .await
    .context("HTTP server failed")?;

    info!("Shutting down daemon");
    Ok(())
}

/// Wait for shutdown signals (SIGTERM, SIGINT)
///
/// # Returns
///
/// Returns the name of the signal received, or an error if the handlers
/// could not be installed.
#[cfg(unix)]
async fn wait_for_shutdown() -> Result<&'static str> {
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
