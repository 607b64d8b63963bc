//! `gatehouse` binary: loads settings, wires the broker, workspace manager
//! and agent adapter into the HTTP server, and serves until Ctrl-C.

#![deny(unsafe_code)]

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use gatehouse_core::logging::{LogTarget, init_subscriber};
use gatehouse_runtime::agent::{AdapterConfig, AgentInvocationAdapter, CommandRuntime};
use gatehouse_runtime::broker::PermissionBroker;
use gatehouse_runtime::workspace::SessionWorkspaceManager;
use gatehouse_server::GatehouseServer;
use gatehouse_settings::GatehouseSettings;
use tokio::net::TcpListener;
use tracing::{info, warn};

#[derive(Debug, Parser)]
#[command(name = "gatehouse", about = "Human-in-the-loop permission broker for agent tool calls")]
struct Args {
    /// Settings file. Defaults to `~/.gatehouse/settings.json`.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Override the listen port.
    #[arg(long)]
    port: Option<u16>,

    /// Skip installing the Prometheus recorder.
    #[arg(long, default_value_t = false)]
    no_metrics: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let loaded = match &args.config {
        Some(path) => gatehouse_settings::reload_settings_from_path(path),
        None => gatehouse_settings::get_settings(),
    };
    let mut settings = (*loaded).clone();
    if let Some(port) = args.port {
        settings.server.port = port;
    }

    init_subscriber(&settings.logging.level, settings.logging.json, LogTarget::Stdout)
        .context("failed to install tracing subscriber")?;

    let metrics = if args.no_metrics {
        None
    } else {
        match gatehouse_server::metrics::install_recorder() {
            Ok(handle) => Some(handle),
            Err(e) => {
                warn!(error = %e, "metrics recorder unavailable");
                None
            }
        }
    };

    let server = build_server(&settings, metrics)?;
    let addr = format!("{}:{}", settings.server.host, settings.server.port);
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;

    let shutdown = Arc::clone(server.shutdown());
    drop(tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("interrupt received");
        }
        shutdown.shutdown();
    }));

    server.serve(listener).await.context("server failed")
}

/// Wire every component from settings.
fn build_server(
    settings: &GatehouseSettings,
    metrics: Option<gatehouse_server::metrics::PrometheusHandle>,
) -> Result<GatehouseServer> {
    let broker = PermissionBroker::new(
        Duration::from_secs(settings.broker.request_timeout_secs),
        settings.broker.observer_buffer,
    );
    let workspaces = SessionWorkspaceManager::open(&settings.workspace.base_dir).with_context(|| {
        format!(
            "failed to open workspace base {}",
            settings.workspace.base_dir.display()
        )
    })?;
    let runtime = CommandRuntime::new(settings.agent.command.clone(), settings.agent.args.clone());
    let adapter = AgentInvocationAdapter::new(
        Arc::new(runtime),
        Arc::new(workspaces),
        AdapterConfig {
            broker_url: settings.server.base_url(),
            proxy_command: settings.proxy.command.clone(),
            proxy_args: Vec::new(),
            proxy_timeout_secs: settings.proxy.request_timeout_secs,
        },
    );
    info!(
        base_dir = %settings.workspace.base_dir.display(),
        agent = %settings.agent.command,
        timeout_secs = settings.broker.request_timeout_secs,
        "gatehouse configured"
    );
    Ok(GatehouseServer::new(broker, Arc::new(adapter), metrics))
}
