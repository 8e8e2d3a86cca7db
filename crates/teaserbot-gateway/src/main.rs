//! Teaserbot - brainteaser-of-the-day chat bot

use anyhow::Context;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use teaserbot_core::{AuthMode, BindMode, TeaserbotConfig, TickKind};
use teaserbot_gateway::{build_orchestrator, start_gateway};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "teaserbot", about = "Brainteaser-of-the-day chat bot")]
struct Cli {
    /// Config file (TOML)
    #[arg(short, long, global = true, default_value = "teaserbot.toml")]
    config: PathBuf,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the gateway server
    Serve {
        #[arg(short, long)]
        port: Option<u16>,
        #[arg(short, long)]
        bind: Option<String>,
        #[arg(long)]
        no_auth: bool,
    },
    /// Run one scheduled broadcast now and exit
    Tick {
        /// daily-item or daily-motivation
        kind: TickKind,
    },
    /// Print the effective config as TOML
    Config,
    /// Show version
    Version,
}

fn load_config(path: &Path) -> anyhow::Result<TeaserbotConfig> {
    let mut config = TeaserbotConfig::load(path)
        .with_context(|| format!("loading config {}", path.display()))?;
    config.apply_env();
    Ok(config)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "teaserbot=info,tower_http=info".into());
    let registry = tracing_subscriber::registry().with(filter);
    if cli.json_logs {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }

    match cli.command {
        Some(Commands::Serve {
            port,
            bind,
            no_auth,
        }) => {
            let mut config = load_config(&cli.config)?;
            if let Some(port) = port {
                config.gateway.port = port;
            }
            if let Some(bind) = bind {
                config.gateway.bind = match bind.as_str() {
                    "loopback" | "localhost" | "127.0.0.1" => BindMode::Loopback,
                    _ => BindMode::Lan,
                };
            }
            if no_auth {
                config.gateway.auth.mode = AuthMode::None;
            }
            start_gateway(config).await?;
        }

        Some(Commands::Tick { kind }) => {
            let config = load_config(&cli.config)?;
            let orchestrator = build_orchestrator(&config).await?;
            let report = orchestrator.on_scheduled_tick(kind).await?;
            println!("{}", serde_json::to_string_pretty(&report)?);
        }

        Some(Commands::Config) => {
            let config = load_config(&cli.config)?;
            print!("{}", config.to_toml());
        }

        Some(Commands::Version) => {
            println!("teaserbot v{}", env!("CARGO_PKG_VERSION"));
        }

        None => {
            start_gateway(load_config(&cli.config)?).await?;
        }
    }

    Ok(())
}
