//! Periodic sync driver.
//!
//! Runs a full pass at startup and then once per interval until the
//! shutdown token is cancelled. Cancellation is only observed between
//! passes, so a pass that has started always finishes.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::time::{interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::config::{format_interval, SyncConfig};
use crate::sync::{SyncOutcome, SyncService};

pub struct Daemon {
    service: Arc<SyncService>,
    interval: Duration,
    sync_on_start: bool,
    shutdown: CancellationToken,
}

impl Daemon {
    pub fn new(service: Arc<SyncService>, config: &SyncConfig, shutdown: CancellationToken) -> Self {
        Self {
            service,
            interval: config.interval,
            sync_on_start: config.sync_on_start,
            shutdown,
        }
    }

    /// Token that stops the driver once the current pass is done.
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// Run until shutdown.
    pub async fn run(&self) {
        info!(
            interval = %format_interval(self.interval),
            pid = std::process::id(),
            "sync daemon started"
        );

        if self.sync_on_start {
            info!("running initial sync");
            self.run_pass().await;
        }

        let mut timer = interval(self.interval.max(Duration::from_millis(1)));
        timer.set_missed_tick_behavior(MissedTickBehavior::Skip);
        timer.tick().await; // Skip the first immediate tick

        loop {
            tokio::select! {
                biased;
                _ = self.shutdown.cancelled() => break,
                _ = timer.tick() => {
                    info!("running scheduled sync");
                    self.run_pass().await;
                }
            }
        }

        info!("sync daemon shutting down");
    }

    async fn run_pass(&self) {
        let start = Instant::now();

        match self.service.sync_all().await {
            Ok(SyncOutcome::Completed(summary)) => {
                info!(
                    blogs = summary.blogs,
                    posts_created = summary.posts.created,
                    failed = summary.failed,
                    elapsed_ms = start.elapsed().as_millis() as u64,
                    "pass finished"
                );
            }
            Ok(SyncOutcome::Skipped) => info!("previous pass still running"),
            Err(e) => error!(error = %e, "sync pass failed"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::SystemClock;
    use crate::domain::Blog;
    use crate::fetcher::mock::{MockFeedFetcher, MockPageFetcher};
    use crate::fetcher::FeedResponse;
    use crate::store::{MemoryStore, Store};
    use chrono::Utc;

    const FEED_URL: &str = "https://example.com/feed.xml";

    fn setup(config: &SyncConfig) -> (Arc<SyncService>, Arc<MockFeedFetcher>) {
        let store = Arc::new(MemoryStore::new());
        store
            .create_blog(&Blog::new(
                FEED_URL,
                "https://example.com/",
                "Example",
                Utc::now() - chrono::Duration::days(1),
            ))
            .unwrap();

        let feeds = Arc::new(MockFeedFetcher::new());
        feeds.set_response(FEED_URL, FeedResponse::default());

        let service = Arc::new(SyncService::new(
            store,
            feeds.clone(),
            Arc::new(MockPageFetcher::new()),
            Arc::new(SystemClock),
            config,
        ));
        (service, feeds)
    }

    #[tokio::test]
    async fn test_cancelled_daemon_runs_startup_pass_and_exits() {
        let config = SyncConfig::default();
        let (service, feeds) = setup(&config);
        let shutdown = CancellationToken::new();
        shutdown.cancel();

        Daemon::new(service, &config, shutdown).run().await;
        assert_eq!(feeds.fetch_count(), 1);
    }

    #[tokio::test]
    async fn test_no_startup_pass_when_disabled() {
        let config = SyncConfig {
            sync_on_start: false,
            ..Default::default()
        };
        let (service, feeds) = setup(&config);
        let shutdown = CancellationToken::new();
        shutdown.cancel();

        Daemon::new(service, &config, shutdown).run().await;
        assert_eq!(feeds.fetch_count(), 0);
    }

    #[tokio::test]
    async fn test_runs_on_interval_until_cancelled() {
        let config = SyncConfig {
            interval: Duration::from_millis(20),
            cooldown: Duration::ZERO,
            ..Default::default()
        };
        let (service, feeds) = setup(&config);
        let daemon = Daemon::new(service, &config, CancellationToken::new());
        let shutdown = daemon.shutdown_token();

        let handle = tokio::spawn(async move { daemon.run().await });
        tokio::time::sleep(Duration::from_millis(150)).await;
        shutdown.cancel();
        handle.await.unwrap();

        let count = feeds.fetch_count();
        assert!(count >= 2, "expected scheduled passes, got {count}");

        tokio::time::sleep(Duration::from_millis(60)).await;
        assert_eq!(feeds.fetch_count(), count);
    }
}
