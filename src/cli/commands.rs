use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::app::{AppContext, Result};
use crate::config::{format_interval, SyncConfig};
use crate::daemon::Daemon;
use crate::store::Store;
use crate::sync::{BlogSyncOutcome, SyncOutcome};

pub async fn add_feed(ctx: &AppContext, url: &str) -> Result<()> {
    match ctx.sync.sync_blog(url).await? {
        BlogSyncOutcome::Created { blog, posts } => {
            println!("Added blog: {}", blog.display_title());
            println!("  {}", blog.site_url);
            println!("Stored {} posts", posts.created);
            if posts.failed > 0 {
                eprintln!("  {} posts could not be stored", posts.failed);
            }
        }
        BlogSyncOutcome::Refreshed { blog, posts } => {
            println!(
                "Synced {}: {} new, {} updated",
                blog.display_title(),
                posts.created,
                posts.updated
            );
        }
        BlogSyncOutcome::NotModified { blog } => {
            println!("{} has no new content", blog.display_title());
        }
        BlogSyncOutcome::CoolingDown => {
            println!("Feed was synced recently, try again later: {}", url);
        }
    }

    Ok(())
}

pub async fn sync_all(ctx: &AppContext) -> Result<()> {
    match ctx.sync.sync_all().await? {
        SyncOutcome::Skipped => println!("A sync is already running"),
        SyncOutcome::Completed(summary) => {
            if summary.blogs == 0 {
                println!("No blogs to sync");
                return Ok(());
            }

            println!(
                "Sync complete: {} blogs ({} refreshed, {} not modified, {} cooling down, {} errors)",
                summary.blogs,
                summary.refreshed,
                summary.not_modified,
                summary.cooling_down,
                summary.failed
            );
            println!(
                "  {} new posts, {} updated",
                summary.posts.created, summary.posts.updated
            );
        }
    }

    Ok(())
}

pub fn list_blogs(ctx: &AppContext) -> Result<()> {
    let blogs = ctx.store.list_blogs()?;

    if blogs.is_empty() {
        println!("No blogs");
        return Ok(());
    }

    for blog in blogs {
        println!(
            "{} (synced {})\n  {}",
            blog.display_title(),
            blog.synced_at.format("%Y-%m-%d %H:%M"),
            blog.feed_url
        );
    }

    Ok(())
}

pub fn list_posts(ctx: &AppContext, feed_url: &str, limit: usize) -> Result<()> {
    let blog = ctx.store.read_blog_by_feed_url(feed_url)?;
    let posts = ctx.store.list_posts(blog.id, limit, 0)?;

    if posts.is_empty() {
        println!("No posts");
        return Ok(());
    }

    for post in posts {
        println!("{} {}", post.published_at.format("%Y-%m-%d"), post.title);
        println!("  {}", post.url);
        if !post.content.is_empty() {
            println!("  {}", post.preview(80));
        }
    }

    Ok(())
}

/// Sync on a schedule until `shutdown` is cancelled.
pub async fn run(
    ctx: &AppContext,
    interval: Option<Duration>,
    no_initial_sync: bool,
    shutdown: CancellationToken,
) -> Result<()> {
    let config = SyncConfig {
        interval: interval.unwrap_or(ctx.config.sync.interval),
        sync_on_start: ctx.config.sync.sync_on_start && !no_initial_sync,
        ..ctx.config.sync.clone()
    };

    println!(
        "Syncing every {} (Ctrl-C to stop)",
        format_interval(config.interval)
    );

    Daemon::new(ctx.sync.clone(), &config, shutdown).run().await;
    Ok(())
}
