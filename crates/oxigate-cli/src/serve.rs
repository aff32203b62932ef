//! `oxigate serve`: run the HTTP gateway until Ctrl+C.
//!
//! Startup sequence:
//! 1. Load config (file + env), apply `--host` / `--port`
//! 2. Wire the gateway (file secrets, header rules, HTTP dispatcher)
//! 3. Bind and serve in the background
//! 4. On Ctrl+C, shut down gracefully

use anyhow::Result;
use tracing::info;

use oxigate_core::config::load_config;
use oxigate_gateway::serve_with_config;
use oxigate_providers::PROVIDERS;

use crate::helpers;

/// Run the gateway in the foreground.
pub async fn run(host: Option<String>, port: Option<u16>) -> Result<()> {
    let mut config = load_config(None);
    if let Some(host) = host {
        config.gateway.host = host;
    }
    if let Some(port) = port {
        config.gateway.port = port;
    }

    helpers::print_banner();
    let host = config.gateway.host.clone();
    let secrets_root = config.secrets.root.clone();

    let handle = serve_with_config(config).await?;
    info!(host = %host, port = handle.port, providers = PROVIDERS.len(), "gateway starting");

    println!("  Listening: http://{}:{}/api/openai", host, handle.port);
    println!("  Secrets:   {}", secrets_root);
    println!("  Providers: {}", PROVIDERS.len());
    println!();
    println!("  Ctrl+C to stop");
    println!();

    tokio::signal::ctrl_c().await?;
    println!();
    println!("  Shutting down...");
    info!("received Ctrl+C, shutting down");
    handle.shutdown().await?;

    println!("  Gateway stopped. Goodbye!");
    Ok(())
}
