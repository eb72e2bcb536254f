//! Planner Shell Dev Server
//!
//! Run with: cargo run
//!
//! # Configuration
//!
//! Loaded from a TOML file (platform config dir, /etc/planner-shell, or
//! ./config.toml), overridden by environment variables, overridden in turn
//! by CLI flags:
//! - `PLANNER_SHELL_HOST`: Host to bind to (default: 127.0.0.1)
//! - `PLANNER_SHELL_PORT`: Port to listen on (default: 5173)
//! - `PLANNER_SHELL_ASSETS_DIR`: Built shell assets (default: dist)
//! - `PLANNER_SHELL_BACKEND_URL`: Planner backend origin (default: http://localhost:8501)
//! - `RUST_LOG`: Log filter (beats the config-file level)

use clap::Parser;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use planner_shell::config::{generate_default_config, Config};
use planner_shell::server::{serve, AppState};

#[derive(Parser)]
#[command(name = "planner-shell", version, about = "Dev server for the planner front-end shell")]
struct Cli {
    /// Path to a config file (skips the default search locations)
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Host to bind to
    #[arg(long)]
    host: Option<String>,

    /// Port to listen on
    #[arg(long)]
    port: Option<u16>,

    /// Planner backend origin, e.g. http://localhost:8501
    #[arg(long, value_name = "URL")]
    backend: Option<String>,

    /// Directory holding the built shell assets
    #[arg(long, value_name = "DIR")]
    assets: Option<PathBuf>,

    /// Print a commented default config file and exit
    #[arg(long)]
    print_default_config: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    if cli.print_default_config {
        print!("{}", generate_default_config());
        return Ok(());
    }

    let mut config = match &cli.config {
        Some(path) => Config::load_with_env(path)?,
        None => Config::load_default(),
    };

    // CLI flags beat environment and file values
    if let Some(host) = cli.host {
        config.server.host = host;
    }
    if let Some(port) = cli.port {
        config.server.port = port;
    }
    if let Some(backend) = cli.backend {
        config.backend.url = backend;
    }
    if let Some(assets) = cli.assets {
        config.server.assets_dir = assets;
    }

    init_tracing(&config);

    tracing::info!("Starting planner-shell dev server v{}", env!("CARGO_PKG_VERSION"));
    tracing::info!("Backend origin: {}", config.backend.url);
    tracing::info!("Shell assets: {:?}", config.server.assets_dir);

    let state = AppState::new(&config);
    serve(state, &config.server).await?;

    tracing::info!("Planner shell stopped");
    Ok(())
}

/// Initialize tracing from the logging config, letting RUST_LOG win
fn init_tracing(config: &Config) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        tracing_subscriber::EnvFilter::new(format!(
            "planner_shell={},tower_http=debug",
            config.logging.level
        ))
    });

    let registry = tracing_subscriber::registry().with(filter);
    if config.logging.format == "json" {
        registry
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}
