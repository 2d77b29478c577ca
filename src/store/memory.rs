use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard};

use crate::app::{Result, TributaryError};
use crate::clock::{Clock, SystemClock};
use crate::domain::{Blog, Post};
use crate::store::{next_version, Store};

#[derive(Default)]
struct Tables {
    blogs: BTreeMap<i64, Blog>,
    posts: BTreeMap<i64, Post>,
    next_blog_id: i64,
    next_post_id: i64,
}

/// A [`Store`] kept entirely in process memory.
pub struct MemoryStore {
    tables: Mutex<Tables>,
    clock: Arc<dyn Clock>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self {
            tables: Mutex::default(),
            clock: Arc::new(SystemClock),
        }
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stamp row versions with `clock` instead of the wall clock.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    fn tables(&self) -> Result<MutexGuard<'_, Tables>> {
        self.tables
            .lock()
            .map_err(|e| TributaryError::Other(format!("memory store poisoned: {e}")))
    }
}

impl Store for MemoryStore {
    fn create_blog(&self, blog: &Blog) -> Result<Blog> {
        let mut tables = self.tables()?;

        if tables.blogs.values().any(|b| b.feed_url == blog.feed_url) {
            return Err(TributaryError::Conflict(format!("blog {}", blog.feed_url)));
        }

        tables.next_blog_id += 1;
        let created = Blog {
            id: tables.next_blog_id,
            ..blog.clone()
        };
        tables.blogs.insert(created.id, created.clone());
        Ok(created)
    }

    fn read_blog_by_feed_url(&self, feed_url: &str) -> Result<Blog> {
        self.tables()?
            .blogs
            .values()
            .find(|b| b.feed_url == feed_url)
            .cloned()
            .ok_or_else(|| TributaryError::NotFound(format!("blog {feed_url}")))
    }

    fn list_blogs(&self) -> Result<Vec<Blog>> {
        Ok(self.tables()?.blogs.values().cloned().collect())
    }

    fn update_blog(&self, blog: &Blog) -> Result<Blog> {
        let mut tables = self.tables()?;

        let stored = tables
            .blogs
            .get_mut(&blog.id)
            .filter(|stored| stored.updated_at == blog.updated_at)
            .ok_or_else(|| {
                TributaryError::NotFound(format!(
                    "blog {} (missing or modified concurrently)",
                    blog.id
                ))
            })?;

        let updated = Blog {
            feed_url: stored.feed_url.clone(),
            created_at: stored.created_at,
            updated_at: next_version(blog.updated_at, self.clock.now()),
            ..blog.clone()
        };
        *stored = updated.clone();
        Ok(updated)
    }

    fn create_post(&self, post: &Post) -> Result<Post> {
        let mut tables = self.tables()?;

        if tables.posts.values().any(|p| p.url == post.url) {
            return Err(TributaryError::Conflict(format!("post {}", post.url)));
        }

        tables.next_post_id += 1;
        let created = Post {
            id: tables.next_post_id,
            ..post.clone()
        };
        tables.posts.insert(created.id, created.clone());
        Ok(created)
    }

    fn read_post_by_url(&self, url: &str) -> Result<Post> {
        self.tables()?
            .posts
            .values()
            .find(|p| p.url == url)
            .cloned()
            .ok_or_else(|| TributaryError::NotFound(format!("post {url}")))
    }

    fn list_posts(&self, blog_id: i64, limit: usize, offset: usize) -> Result<Vec<Post>> {
        let tables = self.tables()?;

        let mut posts: Vec<Post> = tables
            .posts
            .values()
            .filter(|p| p.blog_id == blog_id)
            .cloned()
            .collect();
        posts.sort_by(|a, b| {
            b.published_at
                .cmp(&a.published_at)
                .then_with(|| b.id.cmp(&a.id))
        });

        Ok(posts.into_iter().skip(offset).take(limit).collect())
    }

    fn update_post(&self, post: &Post) -> Result<Post> {
        let mut tables = self.tables()?;

        let stored = tables
            .posts
            .get_mut(&post.id)
            .filter(|stored| stored.updated_at == post.updated_at)
            .ok_or_else(|| {
                TributaryError::NotFound(format!(
                    "post {} (missing or modified concurrently)",
                    post.url
                ))
            })?;

        let updated = Post {
            blog_id: stored.blog_id,
            url: stored.url.clone(),
            created_at: stored.created_at,
            updated_at: next_version(post.updated_at, self.clock.now()),
            ..post.clone()
        };
        *stored = updated.clone();
        Ok(updated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::store::contract;

    #[test]
    fn test_blog_round_trip() {
        contract::blog_round_trip(&MemoryStore::new());
    }

    #[test]
    fn test_blog_conflict_and_not_found() {
        contract::blog_conflict_and_not_found(&MemoryStore::new());
    }

    #[test]
    fn test_blog_update_is_optimistic() {
        contract::blog_update_is_optimistic(&MemoryStore::new());
    }

    #[test]
    fn test_list_blogs() {
        contract::list_blogs(&MemoryStore::new());
    }

    #[test]
    fn test_post_round_trip_and_conflict() {
        contract::post_round_trip_and_conflict(&MemoryStore::new());
    }

    #[test]
    fn test_post_update_is_optimistic() {
        contract::post_update_is_optimistic(&MemoryStore::new());
    }

    #[test]
    fn test_list_posts_orders_and_pages() {
        contract::list_posts_orders_and_pages(&MemoryStore::new());
    }

    #[test]
    fn test_updates_are_stamped_by_store_clock() {
        let clock = Arc::new(ManualClock::default());
        let store = MemoryStore::new().with_clock(clock.clone());
        contract::updates_are_stamped_by_store_clock(&store, &clock);
    }
}
