//! Quorum Probe
//!
//! Connects to the configured node network once and prints what the quorum
//! agreed on.
//!
//! ## Output
//!
//! A single JSON document on stdout with the agreed core node config, the
//! node set in use and the epoch requests would be addressed to.

use anyhow::{Context, Result};
use quorum_client::{QuorumClient, Settings, telemetry};

#[tokio::main]
async fn main() -> Result<()> {
    telemetry::init_tracing();

    let settings = Settings::from_env();
    if let Err(message) = settings.validate() {
        tracing::error!("{message}");
        std::process::exit(1);
    }

    tracing::info!(
        nodes = settings.bootstrap_urls().len(),
        minimum_threshold = settings.minimum_threshold(),
        consensus_mode = %settings.consensus_mode(),
        mtls = settings.mtls_enabled(),
        "Probing node network"
    );

    let client = QuorumClient::new(settings).context("Failed to build quorum client")?;
    let result = client.connect().await;
    let report = match result {
        Ok(config) => serde_json::json!({
            "connected": true,
            "coreNodeConfig": config,
            "nodeSet": client.node_set().await,
            "effectiveEpoch": client.effective_epoch().await,
        }),
        Err(e) => {
            telemetry::shutdown_tracing();
            return Err(e).context("Handshake failed");
        }
    };

    println!(
        "{}",
        serde_json::to_string_pretty(&report).context("Failed to render report")?
    );

    telemetry::shutdown_tracing();
    Ok(())
}
