//! Crimson - in-memory session server
//!
//! Main entry point for the Crimson server binary.

use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::prelude::*;

use crimson_server::{CrimsonConfig, Server};
use crimson_session::{ProviderRegistry, SessionManager};

// ─────────────────────────────────────────────────────────────────────────────
// CLI Structure
// ─────────────────────────────────────────────────────────────────────────────

/// Crimson - in-memory session server
#[derive(Parser)]
#[command(name = "crimson")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to the configuration file
    #[arg(short, long, env = "CRIMSON_CONFIG", default_value = "crimson.toml")]
    pub config: PathBuf,

    /// Address to listen on
    #[arg(long, default_value = "127.0.0.1")]
    pub host: IpAddr,

    /// Port to listen on (overrides the config file)
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Enable verbose output
    #[arg(short, long)]
    pub verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long)]
    pub json: bool,
}

// ─────────────────────────────────────────────────────────────────────────────
// Main
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_tracing(cli.verbose, cli.json);

    let (config, found) = CrimsonConfig::load(&cli.config)
        .with_context(|| format!("failed to load {}", cli.config.display()))?;
    if found {
        info!(path = %cli.config.display(), "Loaded configuration");
    } else {
        warn!(path = %cli.config.display(), "Config file not found, using defaults");
    }

    let registry = ProviderRegistry::with_builtin();
    let manager = SessionManager::from_registry(config.session.clone(), &registry)
        .context("failed to start session manager")?;

    let port = cli.port.unwrap_or(config.server.port);
    let server_config = config
        .server_config()
        .with_bind_address(SocketAddr::new(cli.host, port));

    Server::new(manager, server_config).run().await?;

    Ok(())
}

fn init_tracing(verbose: bool, json: bool) {
    let default_filter = if verbose {
        "crimson=debug,crimson_server=debug,crimson_session=debug,tower_http=debug,info"
    } else {
        "crimson=info,crimson_server=info,crimson_session=info,warn"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_target(true))
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_target(true))
            .init();
    }
}
