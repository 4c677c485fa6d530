//! PiWatch agent binary.
//!
//! Serves the telemetry API by default; `snapshot` samples every metric
//! domain once and prints the result.

use clap::{Parser, Subcommand};
use piwatch::{start_server, AgentConfig, MetricsSnapshot};
use tracing::{info, Level};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[derive(Parser)]
#[command(name = "piwatch")]
#[command(about = "PiWatch - single-host telemetry agent")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(long_about = "Samples resource usage, scheduled jobs, and network identity \
from the local machine and exposes them over an authenticated HTTP API")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Bind address (overrides PIWATCH_HOST)
    #[arg(long)]
    host: Option<String>,

    /// HTTP port (overrides PIWATCH_PORT)
    #[arg(short, long)]
    port: Option<u16>,

    /// Shared secret for mutating endpoints (overrides PIWATCH_TOKEN)
    #[arg(long)]
    token: Option<String>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP server (default)
    Serve,

    /// Sample every metric domain once, print JSON, and exit
    Snapshot,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    init_logging(&cli)?;

    let mut config = AgentConfig::from_env()?;
    if let Some(host) = &cli.host {
        config = config.with_host(host.clone());
    }
    if let Some(port) = cli.port {
        config = config.with_port(port);
    }
    if let Some(token) = &cli.token {
        config = config.with_token(token.clone());
    }

    match cli.command {
        Some(Commands::Snapshot) => snapshot_command().await?,
        Some(Commands::Serve) | None => serve_command(config).await?,
    }

    Ok(())
}

fn init_logging(cli: &Cli) -> Result<(), Box<dyn std::error::Error>> {
    let level = if cli.debug {
        Level::DEBUG
    } else if cli.verbose {
        Level::INFO
    } else {
        Level::WARN
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(false)
        .compact()
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    Ok(())
}

async fn serve_command(config: AgentConfig) -> Result<(), Box<dyn std::error::Error>> {
    info!(
        "starting agent on {} (auth {})",
        config.bind_address(),
        if config.auth_enabled() {
            "enabled"
        } else {
            "disabled"
        }
    );
    start_server(config).await?;
    Ok(())
}

async fn snapshot_command() -> Result<(), Box<dyn std::error::Error>> {
    let snapshot = MetricsSnapshot::gather().await;
    println!("{}", serde_json::to_string_pretty(&snapshot)?);
    Ok(())
}
