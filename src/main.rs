use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

mod node_orchestrator;
use node_orchestrator::{NodeConfig, NodeOrchestrator};

/// Fee oracle node command-line interface
#[derive(Parser)]
#[command(name = "fee-oracle-node")]
#[command(about = "Recommends transaction fees from recently committed blocks")]
#[command(version)]
struct Cli {
    /// Configuration file (TOML)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Data directory for the block store (in-memory chain when omitted)
    #[arg(short, long)]
    datadir: Option<PathBuf>,

    /// Synthetic blocks to seed an empty chain with
    #[arg(long)]
    history: Option<u64>,

    /// Milliseconds between produced blocks
    #[arg(long)]
    block_interval_ms: Option<u64>,

    /// Stop after producing this many blocks (0 runs until Ctrl-C)
    #[arg(long)]
    blocks: Option<u64>,

    /// Log level
    #[arg(long, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the node (default)
    Run,

    /// Print the effective configuration as TOML
    Config,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env()
                .add_directive(cli.log_level.parse().context("Invalid log level")?),
        )
        .init();

    let mut config = match &cli.config {
        Some(path) => NodeConfig::from_file(path)?,
        None => NodeConfig::default(),
    };
    if cli.datadir.is_some() {
        config.datadir = cli.datadir;
    }
    if let Some(history) = cli.history {
        config.history_blocks = history;
    }
    if let Some(block_interval_ms) = cli.block_interval_ms {
        config.block_interval_ms = block_interval_ms;
    }
    if let Some(blocks) = cli.blocks {
        config.max_blocks = blocks;
    }
    config.validate()?;

    match cli.command {
        Some(Commands::Config) => {
            print!("{}", toml::to_string_pretty(&config)?);
            Ok(())
        }
        _ => {
            info!("Starting fee oracle node...");
            match &config.datadir {
                Some(dir) => info!("Data directory: {:?}", dir),
                None => info!("Using in-memory chain"),
            }
            info!(
                "Oracle window {} blocks at percentile {}, bounds {}..={}",
                config.oracle.window_size,
                config.oracle.percentile,
                config.oracle.min_default,
                config.oracle.max_configured
            );

            let orchestrator =
                NodeOrchestrator::new(config).context("Failed to initialize node")?;
            orchestrator.start().await.context("Node execution failed")?;

            info!("Fee oracle node stopped");
            Ok(())
        }
    }
}
