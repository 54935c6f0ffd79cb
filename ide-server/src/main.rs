//! `simple-ide-server` entry point.
//!
//! Loads configuration (defaults < `config.toml` < `SIMPLE_IDE_*` env <
//! command-line flags), makes sure the store root exists, then serves until
//! Ctrl+C or SIGTERM.

use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use simple_ide_core::{ConfigLoader, ProjectStore};
use simple_ide_server::AppState;
use tokio::net::TcpListener;

#[derive(Debug, Parser)]
#[command(version, about = "Project file store and C compile service")]
struct Cli {
    /// Path to a config.toml; defaults to `$SIMPLE_IDE_HOME/config.toml`.
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Address to listen on, e.g. `127.0.0.1:5000`.
    #[arg(long, value_name = "ADDR")]
    bind: Option<SocketAddr>,

    /// Directory holding one sub-directory per project.
    #[arg(long, value_name = "DIR")]
    root: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    tracing::info!("simple-ide-server v{} starting", env!("CARGO_PKG_VERSION"));

    let mut loader = ConfigLoader::new()
        .with_bind_addr(cli.bind)
        .with_store_root(cli.root);
    if let Some(path) = cli.config {
        loader = loader.with_config_file(path);
    }
    let config = loader.load().context("failed to load configuration")?;

    ProjectStore::new(config.store_root.clone())
        .ensure_root()
        .await
        .with_context(|| {
            format!(
                "failed to create store root {}",
                config.store_root.display()
            )
        })?;
    tracing::info!("Project store at {}", config.store_root.display());

    let listener = TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.bind_addr))?;
    tracing::info!(
        sandbox = ?config.compile.sandbox,
        compiler = %config.compile.compiler,
        "listening on {}",
        listener.local_addr()?
    );

    simple_ide_server::serve(listener, AppState::new(config), shutdown_signal()).await?;

    tracing::info!("simple-ide-server exiting cleanly");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!("failed to listen for Ctrl+C: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::warn!("failed to listen for SIGTERM: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
    tracing::info!("Signal received, shutting down");
}
