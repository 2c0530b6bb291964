//! Voxa Daemon - voice assistant command router
//!
//! Serves the intent router over a local HTTP API.

use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;
use voxad::config::Config;
use voxad::router::IntentRouter;
use voxad::server::{self, AppState};
use voxad::store::{FrequencyStore, JsonFrequencyStore, MemoryFrequencyStore};

#[derive(Parser)]
#[command(name = "voxad")]
#[command(about = "Voxa daemon - routes voice commands to answers and actions", long_about = None)]
#[command(version)]
struct Args {
    /// Config file (default: $VOXA_CONFIG, /etc/voxa/config.toml, ~/.config/voxa/config.toml)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Listen address, overrides [server].bind_addr
    #[arg(long)]
    bind: Option<String>,

    /// Keep command counts in memory only
    #[arg(long)]
    ephemeral: bool,

    /// Print the effective config (keys redacted) and exit
    #[arg(long)]
    print_config: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("voxad=info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let args = Args::parse();
    let mut config = Config::load(args.config.as_deref());
    if let Some(bind) = args.bind {
        config.server.bind_addr = bind;
    }

    if args.print_config {
        print!("{}", config.to_redacted_toml()?);
        return Ok(());
    }

    info!("Voxa Daemon v{} starting", env!("CARGO_PKG_VERSION"));

    let store: Arc<dyn FrequencyStore> = if args.ephemeral {
        info!("Command counts kept in memory only");
        Arc::new(MemoryFrequencyStore::new())
    } else {
        info!("Command counts stored in {}", config.store.path.display());
        Arc::new(JsonFrequencyStore::new(config.store.path.clone()))
    };

    let router = IntentRouter::from_config(&config, store)?;
    server::run(AppState::new(router), &config.server.bind_addr).await
}
