//! Feed synchronization.
//!
//! ```text
//! list blogs → (per blog, bounded) fetch → parse → hydrate → reconcile → store
//! ```
//!
//! [`SyncService::sync_all`] is single-flight: a call made while another pass
//! is running returns [`SyncOutcome::Skipped`] straight away.

pub mod reconcile;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};
use futures::future::join_all;
use tokio::sync::Semaphore;
use tracing::{debug, error, info, warn};

use crate::app::{Result, TributaryError};
use crate::clock::Clock;
use crate::config::SyncConfig;
use crate::domain::{Blog, Post};
use crate::fetcher::{FeedFetcher, FeedResponse, PageFetcher};
use crate::hydrator::hydrate;
use crate::normalizer;
use crate::store::Store;

pub use reconcile::{reconcile, Reconciliation};

/// Page size used when loading a blog's known posts.
const KNOWN_POSTS_BATCH: usize = 50;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PostCounts {
    pub created: usize,
    pub updated: usize,
    pub failed: usize,
}

impl PostCounts {
    fn add(&mut self, other: PostCounts) {
        self.created += other.created;
        self.updated += other.updated;
        self.failed += other.failed;
    }
}

/// What happened to a single blog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BlogSyncOutcome {
    /// First sighting of the feed: blog row and its posts were created.
    Created { blog: Blog, posts: PostCounts },
    /// New content was fetched and reconciled.
    Refreshed { blog: Blog, posts: PostCounts },
    /// The origin had nothing new.
    NotModified { blog: Blog },
    /// Synced too recently; nothing was fetched.
    CoolingDown,
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SyncSummary {
    pub blogs: usize,
    pub refreshed: usize,
    pub not_modified: usize,
    pub cooling_down: usize,
    pub failed: usize,
    pub posts: PostCounts,
}

impl SyncSummary {
    fn record(&mut self, outcome: &BlogSyncOutcome) {
        match outcome {
            BlogSyncOutcome::Created { posts, .. } | BlogSyncOutcome::Refreshed { posts, .. } => {
                self.refreshed += 1;
                self.posts.add(*posts);
            }
            BlogSyncOutcome::NotModified { .. } => self.not_modified += 1,
            BlogSyncOutcome::CoolingDown => self.cooling_down += 1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncOutcome {
    /// Another pass was already running.
    Skipped,
    Completed(SyncSummary),
}

/// Whether `blog` is past its cooldown at `now`.
pub fn is_syncable(blog: &Blog, now: DateTime<Utc>, cooldown: chrono::Duration) -> bool {
    blog.is_syncable(now, cooldown)
}

/// Copy non-empty cache tokens from `response` onto `blog`.
/// Returns whether the blog needs to be written back.
pub fn update_cache_headers(blog: &mut Blog, response: &FeedResponse) -> bool {
    blog.refresh_cache_tokens(&response.etag, &response.last_modified)
}

/// Clears the in-progress flag on every exit path.
struct PassGuard<'a>(&'a AtomicBool);

impl Drop for PassGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

pub struct SyncService {
    store: Arc<dyn Store>,
    feeds: Arc<dyn FeedFetcher>,
    pages: Arc<dyn PageFetcher>,
    clock: Arc<dyn Clock>,
    cooldown: chrono::Duration,
    limiter: Arc<Semaphore>,
    in_progress: AtomicBool,
}

impl SyncService {
    pub fn new(
        store: Arc<dyn Store>,
        feeds: Arc<dyn FeedFetcher>,
        pages: Arc<dyn PageFetcher>,
        clock: Arc<dyn Clock>,
        config: &SyncConfig,
    ) -> Self {
        let cooldown = chrono::Duration::from_std(config.cooldown).unwrap_or(chrono::Duration::MAX);

        Self {
            store,
            feeds,
            pages,
            clock,
            cooldown,
            limiter: Arc::new(Semaphore::new(config.max_concurrency.max(1))),
            in_progress: AtomicBool::new(false),
        }
    }

    pub fn store(&self) -> &Arc<dyn Store> {
        &self.store
    }

    fn try_begin_pass(&self) -> Option<PassGuard<'_>> {
        self.in_progress
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| PassGuard(&self.in_progress))
    }

    /// Sync every known blog, at most `max_concurrency` at a time.
    ///
    /// Individual blog failures are logged and counted; only failing to list
    /// the blogs fails the pass.
    pub async fn sync_all(self: &Arc<Self>) -> Result<SyncOutcome> {
        let Some(_guard) = self.try_begin_pass() else {
            info!("sync already in progress");
            return Ok(SyncOutcome::Skipped);
        };

        let start = Instant::now();
        let blogs = self.store.list_blogs()?;
        info!(blogs = blogs.len(), "syncing blogs");

        let mut handles = Vec::with_capacity(blogs.len());
        for blog in blogs {
            let service = Arc::clone(self);

            handles.push(tokio::spawn(async move {
                let blog_id = blog.id;
                let feed_url = blog.feed_url.clone();

                let result = match service.limiter.clone().acquire_owned().await {
                    Ok(_permit) => service.sync_existing_blog(blog).await,
                    Err(e) => Err(TributaryError::Other(format!("sync limiter closed: {e}"))),
                };

                (blog_id, feed_url, result)
            }));
        }

        let mut summary = SyncSummary {
            blogs: handles.len(),
            ..Default::default()
        };

        for joined in join_all(handles).await {
            match joined {
                Ok((_, _, Ok(outcome))) => summary.record(&outcome),
                Ok((blog_id, feed_url, Err(e))) => {
                    warn!(blog_id, %feed_url, error = %e, "failed to sync blog");
                    summary.failed += 1;
                }
                Err(e) => {
                    error!("Task join error: {}", e);
                    summary.failed += 1;
                }
            }
        }

        info!(
            refreshed = summary.refreshed,
            not_modified = summary.not_modified,
            cooling_down = summary.cooling_down,
            failed = summary.failed,
            posts_created = summary.posts.created,
            posts_updated = summary.posts.updated,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "sync complete"
        );

        Ok(SyncOutcome::Completed(summary))
    }

    /// Sync one feed URL, creating its blog on first sight.
    pub async fn sync_blog(&self, feed_url: &str) -> Result<BlogSyncOutcome> {
        match self.store.read_blog_by_feed_url(feed_url) {
            Ok(blog) => self.sync_existing_blog(blog).await,
            Err(e) if e.is_not_found() => self.sync_new_blog(feed_url).await,
            Err(e) => Err(e),
        }
    }

    async fn sync_new_blog(&self, feed_url: &str) -> Result<BlogSyncOutcome> {
        let response = self.feeds.fetch_feed(feed_url, "", "").await?;

        // An unconditional fetch must produce a feed
        if !response.has_content() {
            return Err(TributaryError::UnreachableFeed(format!(
                "{feed_url}: empty response"
            )));
        }

        let now = self.clock.now();
        let parsed = normalizer::parse(feed_url, &response.body)?;
        let parsed = hydrate(parsed, self.pages.as_ref()).await;

        let mut blog = Blog::new(&parsed.feed_url, &parsed.site_url, &parsed.title, now);
        update_cache_headers(&mut blog, &response);
        let blog = self.store.create_blog(&blog)?;
        info!(blog_id = blog.id, title = %blog.title, "created blog");

        let plan = reconcile(&blog, &[], &parsed.posts, now);
        let posts = self.persist(&blog, plan);

        Ok(BlogSyncOutcome::Created { blog, posts })
    }

    async fn sync_existing_blog(&self, mut blog: Blog) -> Result<BlogSyncOutcome> {
        let now = self.clock.now();
        if !is_syncable(&blog, now, self.cooldown) {
            debug!(blog_id = blog.id, title = %blog.title, "skipping recently synced blog");
            return Ok(BlogSyncOutcome::CoolingDown);
        }

        // Claim the attempt before touching the network
        blog.mark_synced(now);
        let mut blog = self.store.update_blog(&blog)?;

        info!(blog_id = blog.id, title = %blog.title, "syncing blog");
        let response = self
            .feeds
            .fetch_feed(&blog.feed_url, &blog.etag, &blog.last_modified)
            .await?;

        let mut refreshed = blog.clone();
        if update_cache_headers(&mut refreshed, &response) {
            match self.store.update_blog(&refreshed) {
                Ok(updated) => blog = updated,
                Err(e) => {
                    warn!(blog_id = blog.id, error = %e, "failed to store cache tokens");
                }
            }
        }

        if !response.has_content() {
            debug!(blog_id = blog.id, "no new content");
            return Ok(BlogSyncOutcome::NotModified { blog });
        }

        let parsed = normalizer::parse(&blog.feed_url, &response.body)?;
        let parsed = hydrate(parsed, self.pages.as_ref()).await;

        let known = self.known_posts(&blog)?;
        let plan = reconcile(&blog, &known, &parsed.posts, now);
        let posts = self.persist(&blog, plan);

        Ok(BlogSyncOutcome::Refreshed { blog, posts })
    }

    fn known_posts(&self, blog: &Blog) -> Result<Vec<Post>> {
        let mut known = Vec::new();
        let mut offset = 0;

        loop {
            let batch = self.store.list_posts(blog.id, KNOWN_POSTS_BATCH, offset)?;
            let done = batch.len() < KNOWN_POSTS_BATCH;
            offset += batch.len();
            known.extend(batch);
            if done {
                return Ok(known);
            }
        }
    }

    /// Apply a reconciliation one post at a time, skipping failed writes.
    fn persist(&self, blog: &Blog, plan: Reconciliation) -> PostCounts {
        let mut counts = PostCounts::default();

        for post in plan.to_create {
            match self.store.create_post(&post) {
                Ok(_) => counts.created += 1,
                Err(e) => {
                    warn!(blog_id = blog.id, url = %post.url, error = %e, "failed to create post");
                    counts.failed += 1;
                }
            }
        }

        for post in plan.to_update {
            match self.store.update_post(&post) {
                Ok(_) => counts.updated += 1,
                Err(e) => {
                    warn!(blog_id = blog.id, url = %post.url, error = %e, "failed to update post");
                    counts.failed += 1;
                }
            }
        }

        if counts.created > 0 || counts.updated > 0 {
            info!(
                blog_id = blog.id,
                created = counts.created,
                updated = counts.updated,
                "stored posts"
            );
        }

        counts
    }
}
