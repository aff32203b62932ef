//! Serve entrypoint: binds the router and runs it in a spawned task.

use anyhow::{Context, Result};
use oxigate_core::config::Config;
use tokio::sync::oneshot;

use crate::gateway::Gateway;
use crate::router::router;

/// Handle returned by [`serve`]: holds the bound port and shutdown trigger.
pub struct ServeHandle {
    /// The port the gateway is listening on.
    pub port: u16,
    shutdown_tx: Option<oneshot::Sender<()>>,
    join: Option<tokio::task::JoinHandle<Result<(), std::io::Error>>>,
}

impl ServeHandle {
    /// Trigger graceful shutdown and wait for the server to stop.
    pub async fn shutdown(mut self) -> Result<()> {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        if let Some(join) = self.join.take() {
            join.await??;
        }
        Ok(())
    }
}

/// Wire a [`Gateway`] from `config` and serve it on the configured address.
pub async fn serve_with_config(config: Config) -> Result<ServeHandle> {
    let bind = format!("{}:{}", config.gateway.host, config.gateway.port);
    let gateway = Gateway::from_config(config).context("failed to build gateway")?;
    serve(gateway, &bind).await
}

/// Bind `bind` and start serving `gateway`.
///
/// The server runs in a spawned task; call `handle.shutdown()` to stop it.
/// Binding port 0 picks a free port, reported in [`ServeHandle::port`].
pub async fn serve(gateway: Gateway, bind: &str) -> Result<ServeHandle> {
    let app = router(gateway);
    let listener = tokio::net::TcpListener::bind(bind)
        .await
        .with_context(|| format!("failed to bind {bind}"))?;
    let port = listener.local_addr()?.port();
    tracing::info!("gateway listening on {bind} (port {port})");

    let (shutdown_tx, shutdown_rx) = oneshot::channel();
    let join = tokio::spawn(async move {
        axum::serve(listener, app)
            .with_graceful_shutdown(async {
                let _ = shutdown_rx.await;
                tracing::info!("received shutdown signal");
            })
            .await
    });

    Ok(ServeHandle {
        port,
        shutdown_tx: Some(shutdown_tx),
        join: Some(join),
    })
}
