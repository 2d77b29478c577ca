use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use tributary::app::AppContext;
use tributary::cli::{commands, Cli, Commands};
use tributary::config::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };
    if let Some(db) = cli.db {
        config.database.path = Some(db);
    }
    if let Some(workers) = cli.workers {
        config.sync.max_concurrency = workers;
    }

    let ctx = AppContext::new(config)?;

    match cli.command {
        Commands::Add { url } => {
            commands::add_feed(&ctx, &url).await?;
        }
        Commands::Sync => {
            commands::sync_all(&ctx).await?;
        }
        Commands::List { posts, limit } => match posts {
            Some(feed_url) => commands::list_posts(&ctx, &feed_url, limit)?,
            None => commands::list_blogs(&ctx)?,
        },
        Commands::Run {
            interval,
            no_initial_sync,
        } => {
            let shutdown = CancellationToken::new();
            let signal = shutdown.clone();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    tracing::info!("interrupt received, stopping after the current pass");
                }
                signal.cancel();
            });

            commands::run(&ctx, interval, no_initial_sync, shutdown).await?;
        }
    }

    Ok(())
}
