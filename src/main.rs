//! Agenda Server
//!
//! Run with: cargo run -- serve
//!
//! # Configuration
//!
//! Settings are read from `--config`, or the first of
//! `~/.config/agenda/config.toml`, `/etc/agenda/config.toml` and
//! `./config.toml` that exists. `AGENDA_*` environment variables override
//! file values, and `RUST_LOG` overrides the configured log level.

use anyhow::Context;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use agenda::api::{serve, AppState};
use agenda::config::{generate_default_config, Config, LoggingConfig};

#[derive(Parser)]
#[command(name = "agenda")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Appointment booking server with live WebSocket updates")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Path to a TOML config file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the HTTP and WebSocket server (default)
    Serve,

    /// Generate default config file
    InitConfig {
        /// Output path (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command.unwrap_or(Commands::Serve) {
        Commands::InitConfig { output } => {
            let content = generate_default_config();
            match output {
                Some(path) => {
                    std::fs::write(&path, content)
                        .with_context(|| format!("Failed to write config to {:?}", path))?;
                    println!("Config written to {:?}", path);
                }
                None => print!("{}", content),
            }
            Ok(())
        }
        Commands::Serve => {
            let config = Config::resolve(cli.config.as_deref())?;
            init_logging(&config.logging);

            tracing::info!("Starting Agenda server v{}", env!("CARGO_PKG_VERSION"));
            if config.auth.uses_dev_secret() {
                tracing::warn!("Using the built-in development JWT secret; set AGENDA_JWT_SECRET");
            }
            tracing::info!(
                auth_timeout_secs = config.websocket.auth_timeout_secs,
                token_ttl_secs = config.auth.token_ttl_secs,
                "WebSocket and token settings"
            );

            serve(AppState::new(config))
                .await
                .context("API server failed")?;

            tracing::info!("Agenda server stopped");
            Ok(())
        }
    }
}

/// Initialize tracing from `RUST_LOG`, falling back to the configured level
fn init_logging(logging: &LoggingConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| format!("agenda={},tower_http=info", logging.level).into());

    let registry = tracing_subscriber::registry().with(filter);

    if logging.format == "json" {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}
