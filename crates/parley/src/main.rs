//! parley-server: runs a Parley chat server.
//!
//! Usage: `parley-server [config.toml]`. Without an argument, or if the
//! file does not exist, the built-in defaults are used.

use std::path::PathBuf;

use parley::{ChatServer, ParleyError, ServerConfig};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), ParleyError> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(true)
        .init();

    let config = match std::env::args().nth(1).map(PathBuf::from) {
        Some(path) => ServerConfig::load(&path).await.map_err(|e| {
            error!(path = %path.display(), error = %e, "failed to load config");
            e
        })?,
        None => ServerConfig::default(),
    };

    info!(
        tcp = %config.tcp_addr,
        ws = config.ws_addr.as_deref().unwrap_or("disabled"),
        log = %config.log_file.display(),
        "starting parley"
    );

    let server = ChatServer::builder().config(config).build().await.map_err(|e| {
        error!(error = %e, "failed to start server");
        e
    })?;
    server.run_until(shutdown_signal()).await?;

    info!("parley stopped");
    Ok(())
}

/// Resolves on Ctrl-C. If the handler cannot be installed the server runs
/// until killed.
async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("received Ctrl-C"),
        Err(e) => {
            error!(error = %e, "failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    }
}
