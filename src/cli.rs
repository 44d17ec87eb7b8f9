use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(name = "cavetour", version, about = "Offline cave tours and kiosk playback")]
pub struct Cli {
    /// Config file (default: ~/.cavetour/config.json)
    #[arg(long, env = "CAVETOUR_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Write a default config file if none exists
    Init,
    /// Download a location, its spots and its images for offline use
    Save {
        location_id: String,
    },
    /// Look up a spot and its sibling spots, online first
    Find {
        spot_id: String,
        /// Skip the content store and read the offline cache only
        #[arg(long)]
        offline: bool,
    },
    /// Show which locations are available offline
    Status {
        location_id: Option<String>,
    },
    /// Print (or write) a cached media file
    Asset {
        url: String,
        #[arg(long, short)]
        out: Option<PathBuf>,
    },
    /// Delete all offline data
    Clear,
    /// Run the configured kiosk playlist until Ctrl-C
    Kiosk,
}
