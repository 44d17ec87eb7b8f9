pub mod cache;
pub mod cli;
mod commands;
pub mod config;
pub mod content;
pub mod error;
pub mod kiosk;
pub mod media;
pub mod model;
pub mod offline;
pub mod report;
pub mod resolver;
pub mod util;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use cli::{Cli, Command};
use commands::Context;

/// Logs go to stderr so command output on stdout stays pipeable.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("cavetour=info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

pub async fn run() -> anyhow::Result<()> {
    init_tracing();
    let cli = Cli::parse();
    let config_path = commands::config_path(cli.config)?;

    match cli.command {
        Command::Init => commands::init::run(&config_path),
        Command::Kiosk => commands::kiosk::run(&config_path).await,
        Command::Save { location_id } => {
            commands::save::run(&Context::load(&config_path)?, &location_id).await
        }
        Command::Find { spot_id, offline } => {
            commands::find::run(&Context::load(&config_path)?, &spot_id, offline).await
        }
        Command::Status { location_id } => {
            commands::status::run(&Context::load(&config_path)?, location_id.as_deref()).await
        }
        Command::Asset { url, out } => {
            commands::asset::run(&Context::load(&config_path)?, &url, out.as_deref()).await
        }
        Command::Clear => commands::clear::run(&Context::load(&config_path)?).await,
    }
}
