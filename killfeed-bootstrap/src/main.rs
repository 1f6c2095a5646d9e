use std::path::Path;

use anyhow::Result;
use clap::{Parser, Subcommand};

use killfeed_bootstrap::{init_tracing, run_reset_cursor, run_standalone};
use killfeed_infrastructure::{AppConfig, CONFIG_ENV};

#[derive(Parser, Debug)]
#[command(name = "killfeed")]
#[command(about = "Game server killfeed ingestion service", long_about = None)]
struct Args {
    /// Path to config file
    #[arg(short, long, global = true)]
    config: Option<String>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Poll tracked servers and serve the query API (default)
    Serve,
    /// Rewind a cursor so the file is re-read from its first line
    ResetCursor {
        #[arg(long)]
        guild: u64,
        #[arg(long)]
        server: String,
        /// server_log or death_log
        #[arg(long)]
        role: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    if let Some(config) = &args.config {
        std::env::set_var(CONFIG_ENV, config);
    }

    let config = AppConfig::load().await?;
    let _guard = init_tracing(config.log_dir.as_deref().map(Path::new));

    match args.command.unwrap_or(Command::Serve) {
        Command::Serve => run_standalone(config).await,
        Command::ResetCursor {
            guild,
            server,
            role,
        } => run_reset_cursor(config, guild, &server, &role).await,
    }
}
