pub mod memory;
pub mod sqlite;

use chrono::{DateTime, Duration, Utc};

use crate::app::Result;
use crate::domain::{Blog, Post};

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

/// Blog and post persistence.
///
/// Updates are optimistic: a write only succeeds when the stored row's
/// `updated_at` still equals the value on the record passed in. On success
/// the returned record carries the new `updated_at` and must be used for
/// any further writes.
pub trait Store: Send + Sync {
    // Blog operations
    /// Fails with `Conflict` if the feed URL is taken.
    fn create_blog(&self, blog: &Blog) -> Result<Blog>;
    fn read_blog_by_feed_url(&self, feed_url: &str) -> Result<Blog>;
    fn list_blogs(&self) -> Result<Vec<Blog>>;
    /// Fails with `NotFound` if the blog is missing or stale.
    fn update_blog(&self, blog: &Blog) -> Result<Blog>;

    // Post operations
    /// Fails with `Conflict` if the URL is taken.
    fn create_post(&self, post: &Post) -> Result<Post>;
    fn read_post_by_url(&self, url: &str) -> Result<Post>;
    /// Newest first.
    fn list_posts(&self, blog_id: i64, limit: usize, offset: usize) -> Result<Vec<Post>>;
    /// Fails with `NotFound` if the post is missing or stale.
    fn update_post(&self, post: &Post) -> Result<Post>;
}

/// The `updated_at` to write over `previous`: `now`, bumped by a microsecond
/// if needed so that every successful update changes the version.
pub(crate) fn next_version(previous: DateTime<Utc>, now: DateTime<Utc>) -> DateTime<Utc> {
    if now > previous {
        now
    } else {
        previous + Duration::microseconds(1)
    }
}

#[cfg(test)]
pub(crate) mod contract {
    //! Behaviour every [`Store`] must share, run against each backend.

    use chrono::{Duration, TimeZone, Utc};

    use super::Store;
    use crate::app::TributaryError;
    use crate::clock::ManualClock;
    use crate::domain::{Blog, Post};

    fn blog(feed_url: &str) -> Blog {
        let at = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        Blog::new(feed_url, "https://example.com/", "Example", at)
    }

    pub fn blog_round_trip(store: &dyn Store) {
        let mut blog = blog("https://example.com/feed.xml");
        blog.etag = "\"abc\"".into();
        let created = store.create_blog(&blog).unwrap();
        assert!(created.id > 0);

        let read = store
            .read_blog_by_feed_url("https://example.com/feed.xml")
            .unwrap();
        assert_eq!(read, created);
        assert_eq!(read.etag, "\"abc\"");
    }

    pub fn blog_conflict_and_not_found(store: &dyn Store) {
        let blog = blog("https://example.com/feed.xml");
        store.create_blog(&blog).unwrap();

        let err = store.create_blog(&blog).unwrap_err();
        assert!(matches!(err, TributaryError::Conflict(_)));

        let err = store
            .read_blog_by_feed_url("https://example.com/missing.xml")
            .unwrap_err();
        assert!(err.is_not_found());
    }

    pub fn blog_update_is_optimistic(store: &dyn Store) {
        let created = store.create_blog(&blog("https://example.com/feed.xml")).unwrap();

        let mut first = created.clone();
        first.etag = "\"v2\"".into();
        let updated = store.update_blog(&first).unwrap();
        assert!(updated.updated_at > created.updated_at);
        assert_eq!(updated.etag, "\"v2\"");

        // A writer holding the old version loses
        let mut stale = created.clone();
        stale.title = "Stale".into();
        let err = store.update_blog(&stale).unwrap_err();
        assert!(err.is_not_found());

        // The returned record is authoritative for the next write
        let mut second = updated.clone();
        second.synced_at = created.synced_at + Duration::hours(3);
        let updated = store.update_blog(&second).unwrap();
        let read = store
            .read_blog_by_feed_url("https://example.com/feed.xml")
            .unwrap();
        assert_eq!(read, updated);
        assert_eq!(read.etag, "\"v2\"");
        assert_eq!(read.title, "Example");

        let mut missing = updated;
        missing.id = 9_999;
        assert!(store.update_blog(&missing).unwrap_err().is_not_found());
    }

    pub fn list_blogs(store: &dyn Store) {
        store.create_blog(&blog("https://b.example.com/feed.xml")).unwrap();
        store.create_blog(&blog("https://a.example.com/feed.xml")).unwrap();

        let blogs = store.list_blogs().unwrap();
        assert_eq!(blogs.len(), 2);
    }

    pub fn post_round_trip_and_conflict(store: &dyn Store) {
        let blog = store.create_blog(&blog("https://example.com/feed.xml")).unwrap();
        let now = blog.created_at;
        let post = Post::new(&blog, "https://example.com/a", "A", "body", now, now);

        let created = store.create_post(&post).unwrap();
        assert!(created.id > 0);
        assert_eq!(store.read_post_by_url("https://example.com/a").unwrap(), created);

        let err = store.create_post(&post).unwrap_err();
        assert!(matches!(err, TributaryError::Conflict(_)));

        assert!(store
            .read_post_by_url("https://example.com/missing")
            .unwrap_err()
            .is_not_found());
    }

    pub fn post_update_is_optimistic(store: &dyn Store) {
        let blog = store.create_blog(&blog("https://example.com/feed.xml")).unwrap();
        let now = blog.created_at;
        let created = store
            .create_post(&Post::new(&blog, "https://example.com/a", "A", "", now, now))
            .unwrap();

        let mut edit = created.clone();
        edit.content = "hydrated".into();
        let updated = store.update_post(&edit).unwrap();
        assert_eq!(updated.content, "hydrated");
        assert!(updated.updated_at > created.updated_at);

        let err = store.update_post(&created).unwrap_err();
        assert!(err.is_not_found());

        let read = store.read_post_by_url("https://example.com/a").unwrap();
        assert_eq!(read, updated);
    }

    pub fn updates_are_stamped_by_store_clock(store: &dyn Store, clock: &ManualClock) {
        let blog = store.create_blog(&blog("https://example.com/feed.xml")).unwrap();
        let stamp = Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap();
        clock.set(stamp);

        let updated = store.update_blog(&blog).unwrap();
        assert_eq!(updated.updated_at, stamp);

        // Clock standing still still yields a new version
        let again = store.update_blog(&updated).unwrap();
        assert_eq!(again.updated_at, stamp + Duration::microseconds(1));

        let now = blog.created_at;
        let post = store
            .create_post(&Post::new(&again, "https://example.com/a", "A", "", now, now))
            .unwrap();
        clock.advance(Duration::hours(1));
        let updated = store.update_post(&post).unwrap();
        assert_eq!(updated.updated_at, stamp + Duration::hours(1));
    }

    pub fn list_posts_orders_and_pages(store: &dyn Store) {
        let blog = store.create_blog(&blog("https://example.com/feed.xml")).unwrap();
        let other = store
            .create_blog(&self::blog("https://other.example.com/feed.xml"))
            .unwrap();
        let base = blog.created_at;

        for i in 0..5 {
            let post = Post::new(
                &blog,
                format!("https://example.com/{i}"),
                format!("Post {i}"),
                "",
                base + Duration::days(i),
                base,
            );
            store.create_post(&post).unwrap();
        }
        store
            .create_post(&Post::new(&other, "https://other.example.com/x", "X", "", base, base))
            .unwrap();

        let page = store.list_posts(blog.id, 2, 0).unwrap();
        let urls: Vec<_> = page.iter().map(|p| p.url.as_str()).collect();
        assert_eq!(urls, vec!["https://example.com/4", "https://example.com/3"]);

        let page = store.list_posts(blog.id, 2, 4).unwrap();
        assert_eq!(page.len(), 1);
        assert_eq!(page[0].url, "https://example.com/0");

        assert!(store.list_posts(blog.id, 2, 6).unwrap().is_empty());
        assert_eq!(store.list_posts(other.id, 10, 0).unwrap().len(), 1);
    }
}
