//! `gatehouse-proxy` binary. Stdout carries the protocol; logs go to stderr.

#![deny(unsafe_code)]

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use gatehouse_core::logging::{LogTarget, init_subscriber};
use gatehouse_proxy::{BrokerClient, PermissionPrompt, ProxyServer};
use tokio::io::BufReader;

#[derive(Debug, Parser)]
#[command(
    name = "gatehouse-proxy",
    about = "Forward agent tool permission prompts to the gatehouse broker"
)]
struct Args {
    /// Broker base URL.
    #[arg(long, env = "GATEHOUSE_BROKER_URL", default_value = "http://127.0.0.1:8787")]
    broker_url: String,

    /// Session workspace that temp paths are redirected into.
    #[arg(long, env = "GATEHOUSE_SESSION_DIR")]
    session_dir: PathBuf,

    /// Seconds to wait for the broker. Must exceed its decision deadline.
    #[arg(long, env = "GATEHOUSE_PROXY_TIMEOUT_SECS", default_value_t = 65)]
    timeout_secs: u64,

    /// Log filter when `RUST_LOG` is unset.
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_subscriber(&args.log_level, false, LogTarget::Stderr)
        .context("failed to install tracing subscriber")?;

    let client = BrokerClient::new(&args.broker_url, Duration::from_secs(args.timeout_secs))
        .context("failed to build broker client")?;
    tracing::info!(
        broker_url = %args.broker_url,
        session_dir = %args.session_dir.display(),
        timeout_secs = args.timeout_secs,
        "starting permission proxy"
    );

    let server = ProxyServer::new(PermissionPrompt::new(client, Some(args.session_dir)));
    server
        .run(BufReader::new(tokio::io::stdin()), tokio::io::stdout())
        .await
        .context("stdio loop failed")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_dir_is_required() {
        assert!(Args::try_parse_from(["gatehouse-proxy"]).is_err());
        let args = Args::try_parse_from(["gatehouse-proxy", "--session-dir", "/w/sess-1"]).unwrap();
        assert_eq!(args.session_dir, PathBuf::from("/w/sess-1"));
        assert_eq!(args.timeout_secs, 65);
    }
}
