pub mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "tributary")]
#[command(about = "Keeps a local store of blogs and posts in sync with their feeds", long_about = None)]
pub struct Cli {
    /// Config file (default: ~/.config/tributary/config.toml)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// SQLite database file, overriding the config
    #[arg(long, global = true)]
    pub db: Option<PathBuf>,

    /// Number of blogs synced concurrently, overriding the config
    #[arg(short, long, global = true)]
    pub workers: Option<usize>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Sync a single feed, creating its blog on first sight
    Add {
        /// URL of the feed
        url: String,
    },
    /// Run one full sync pass over every blog
    Sync,
    /// List blogs or a blog's posts
    List {
        /// Feed URL whose posts to list
        #[arg(long, value_name = "FEED_URL")]
        posts: Option<String>,

        /// Maximum number of posts to show
        #[arg(short, long, default_value_t = 20)]
        limit: usize,
    },
    /// Sync periodically until interrupted
    Run {
        /// Time between passes (e.g., "1h", "30m", "6h", "1d")
        #[arg(short, long, value_parser = crate::config::parse_interval)]
        interval: Option<std::time::Duration>,

        /// Skip the pass normally run at startup
        #[arg(long)]
        no_initial_sync: bool,
    },
}
