use clap::Parser;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use chaptervault::config::Config;
use chaptervault::sources::StaticLoader;
use chaptervault::state::AppState;

mod cli;
mod commands;

use cli::{Cli, Commands};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();

    let config = Config::load()?;
    let state = AppState::new(config, Arc::new(StaticLoader::new()))?;

    match cli.command {
        Commands::Download(args) => commands::download(&state, args).await?,
        Commands::Package(args) => commands::package(&state, args).await?,
        Commands::Delete(args) => commands::delete(&state, args).await?,
        Commands::Export(args) => commands::export(&state, args).await?,
        Commands::Rename(args) => commands::rename(&state, args).await?,
        Commands::Metadata(command) => commands::metadata(&state, command).await?,
        Commands::Config => commands::show_config(&state)?,
    }

    Ok(())
}
