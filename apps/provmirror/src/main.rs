//! provmirror - Read-through mirror for the Terraform provider registry
//!
//! Serves the provider registry protocol. The pass-through namespace is
//! proxied to the upstream registry; every other namespace is answered from
//! source-control releases, with assets mirrored to local storage.

mod cli;
mod error;
mod routes;

use crate::cli::Cli;
use crate::error::ServerError;
use clap::Parser;
use provmirror_config::Config;
use provmirror_ops::RegistryCtx;
use std::process;
use std::sync::Arc;
use tracing::{error, info, warn};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    init_tracing(cli.log_json, cli.debug);

    if let Err(e) = run(cli).await {
        error!("Server error: {}", e);
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

/// Main application logic
async fn run(cli: Cli) -> Result<(), ServerError> {
    info!("Starting provmirror v{}", env!("CARGO_PKG_VERSION"));

    // Load configuration with proper precedence:
    // 1. Start with file config (or defaults)
    let mut config = Config::load_or_default(cli.config.as_deref()).await?;

    // 2. Merge environment variables
    config.merge_env()?;

    // 3. Apply CLI flags (highest precedence)
    apply_cli_config(&mut config, &cli);

    config.validate()?;

    let listen = config.server.listen.clone();
    info!(
        listen = %listen,
        storage = %config.storage.root.display(),
        public_url = %config.server.public_url,
        passthrough = %config.upstream.passthrough_namespace,
        "configuration loaded"
    );

    let ctx = Arc::new(RegistryCtx::from_config(config)?);
    if !ctx.is_authenticated() {
        warn!("no GITHUB_TOKEN set; release lookups are rate limited");
    }
    let listener = tokio::net::TcpListener::bind(&listen).await?;
    info!(address = %listener.local_addr()?, "listening");

    axum::serve(listener, routes::router(ctx))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

/// Apply CLI configuration overrides
fn apply_cli_config(config: &mut Config, cli: &Cli) {
    if let Some(listen) = &cli.listen {
        config.server.listen.clone_from(listen);
    }
    if let Some(dir) = &cli.storage_dir {
        config.storage.root.clone_from(dir);
    }
    if let Some(url) = &cli.public_url {
        config.server.public_url.clone_from(url);
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {}", e);
    }
}

/// Initialize tracing/logging
fn init_tracing(json_mode: bool, debug_enabled: bool) {
    let default_filter = if debug_enabled {
        "info,provmirror=debug"
    } else {
        "info"
    };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_filter));

    if json_mode {
        tracing_subscriber::fmt()
            .json()
            .with_writer(std::io::stderr)
            .with_env_filter(filter)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_writer(std::io::stderr)
            .with_env_filter(filter)
            .init();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_cli_overrides_config() {
        let mut config = Config::default();
        config.server.listen = "0.0.0.0:1".to_string();

        let cli = Cli::try_parse_from([
            "provmirror",
            "--listen",
            "127.0.0.1:9000",
            "--storage-dir",
            "/srv/mirror",
        ])
        .unwrap();
        apply_cli_config(&mut config, &cli);

        assert_eq!(config.server.listen, "127.0.0.1:9000");
        assert_eq!(config.storage.root, PathBuf::from("/srv/mirror"));
        assert_eq!(config.server.public_url, "http://localhost:8181/storage");
    }
}
