//! QuillKV server entry point.
//!
//! Parses the command line, sets up logging, the storage engine and the
//! replication info, then accepts connections until Ctrl+C.

use anyhow::Context;
use clap::Parser;
use quillkv::commands::CommandHandler;
use quillkv::connection::handle_connection;
use quillkv::info::ReplicationInfo;
use quillkv::storage::StorageEngine;
use quillkv::Config;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::signal;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::parse();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    info!("QuillKV v{}", quillkv::VERSION);

    let replication =
        Arc::new(ReplicationInfo::generate().context("failed to initialise replication info")?);
    info!(replid = %replication.replid(), "Replication id generated");

    // Shared by every connection
    let storage = Arc::new(StorageEngine::new());
    let handler = CommandHandler::new(Arc::clone(&storage), replication);

    let listener = TcpListener::bind(config.bind_address())
        .await
        .with_context(|| format!("failed to bind {}", config.bind_address()))?;
    info!("Listening on {}", config.bind_address());

    let shutdown = async {
        match signal::ctrl_c().await {
            Ok(()) => info!("Shutdown signal received, stopping server..."),
            Err(e) => {
                error!(error = %e, "Failed to listen for Ctrl+C");
                std::future::pending::<()>().await
            }
        }
    };

    tokio::select! {
        _ = accept_loop(listener, handler) => {}
        _ = shutdown => {}
    }

    let stats = storage.stats();
    info!(
        keys = stats.keys,
        get_ops = stats.get_ops,
        set_ops = stats.set_ops,
        expired = stats.expired,
        "Server shutdown complete"
    );
    Ok(())
}

/// Accepts connections forever, one task per client.
async fn accept_loop(listener: TcpListener, handler: CommandHandler) {
    loop {
        match listener.accept().await {
            Ok((stream, addr)) => {
                tokio::spawn(handle_connection(stream, addr, handler.clone()));
            }
            Err(e) => {
                error!("Failed to accept connection: {}", e);
            }
        }
    }
}
