use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::types::Type;
use rusqlite::{params, Connection, ErrorCode, OptionalExtension, Row};
use rusqlite_migration::{Migrations, M};

use crate::app::{Result, TributaryError};
use crate::clock::{Clock, SystemClock};
use crate::domain::{Blog, Post};
use crate::store::{next_version, Store};

const BLOG_COLUMNS: &str =
    "id, feed_url, site_url, title, etag, last_modified, synced_at, created_at, updated_at";
const POST_COLUMNS: &str = "id, blog_id, url, title, content, published_at, created_at, updated_at";

pub struct SqliteStore {
    conn: Mutex<Connection>,
    clock: Arc<dyn Clock>,
}

impl SqliteStore {
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self> {
        let conn = Connection::open(path)?;
        let store = Self {
            conn: Mutex::new(conn),
            clock: Arc::new(SystemClock),
        };
        store.run_migrations()?;
        Ok(store)
    }

    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let store = Self {
            conn: Mutex::new(conn),
            clock: Arc::new(SystemClock),
        };
        store.run_migrations()?;
        Ok(store)
    }

    /// Stamp row versions with `clock` instead of the wall clock.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    fn run_migrations(&self) -> Result<()> {
        let migrations = Migrations::new(vec![M::up(include_str!(
            "../../migrations/001-initial/up.sql"
        ))]);

        let mut conn = self.conn()?;

        conn.execute("PRAGMA foreign_keys = ON", [])?;
        migrations
            .to_latest(&mut conn)
            .map_err(|e| TributaryError::Other(format!("migration failed: {e}")))?;

        Ok(())
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|e| {
            TributaryError::Database(rusqlite::Error::SqliteFailure(
                rusqlite::ffi::Error::new(1),
                Some(e.to_string()),
            ))
        })
    }

    fn format_datetime(dt: &DateTime<Utc>) -> String {
        dt.to_rfc3339_opts(SecondsFormat::Micros, true)
    }

    fn parse_datetime(row: &Row<'_>, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
        let raw: String = row.get(idx)?;
        DateTime::parse_from_rfc3339(&raw)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
    }

    fn blog_from_row(row: &Row<'_>) -> rusqlite::Result<Blog> {
        Ok(Blog {
            id: row.get(0)?,
            feed_url: row.get(1)?,
            site_url: row.get(2)?,
            title: row.get(3)?,
            etag: row.get(4)?,
            last_modified: row.get(5)?,
            synced_at: Self::parse_datetime(row, 6)?,
            created_at: Self::parse_datetime(row, 7)?,
            updated_at: Self::parse_datetime(row, 8)?,
        })
    }

    fn post_from_row(row: &Row<'_>) -> rusqlite::Result<Post> {
        Ok(Post {
            id: row.get(0)?,
            blog_id: row.get(1)?,
            url: row.get(2)?,
            title: row.get(3)?,
            content: row.get(4)?,
            published_at: Self::parse_datetime(row, 5)?,
            created_at: Self::parse_datetime(row, 6)?,
            updated_at: Self::parse_datetime(row, 7)?,
        })
    }
}

/// Turn a unique-constraint failure into `Conflict`.
fn conflict_or(err: rusqlite::Error, what: impl FnOnce() -> String) -> TributaryError {
    match &err {
        rusqlite::Error::SqliteFailure(e, _) if e.code == ErrorCode::ConstraintViolation => {
            TributaryError::Conflict(what())
        }
        _ => TributaryError::Database(err),
    }
}

impl Store for SqliteStore {
    fn create_blog(&self, blog: &Blog) -> Result<Blog> {
        let conn = self.conn()?;

        conn.execute(
            "INSERT INTO blogs (feed_url, site_url, title, etag, last_modified, synced_at, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                blog.feed_url,
                blog.site_url,
                blog.title,
                blog.etag,
                blog.last_modified,
                Self::format_datetime(&blog.synced_at),
                Self::format_datetime(&blog.created_at),
                Self::format_datetime(&blog.updated_at),
            ],
        )
        .map_err(|e| conflict_or(e, || format!("blog {}", blog.feed_url)))?;

        Ok(Blog {
            id: conn.last_insert_rowid(),
            ..blog.clone()
        })
    }

    fn read_blog_by_feed_url(&self, feed_url: &str) -> Result<Blog> {
        let conn = self.conn()?;

        conn.query_row(
            &format!("SELECT {BLOG_COLUMNS} FROM blogs WHERE feed_url = ?1"),
            params![feed_url],
            Self::blog_from_row,
        )
        .optional()?
        .ok_or_else(|| TributaryError::NotFound(format!("blog {feed_url}")))
    }

    fn list_blogs(&self) -> Result<Vec<Blog>> {
        let conn = self.conn()?;

        let mut stmt = conn.prepare(&format!("SELECT {BLOG_COLUMNS} FROM blogs ORDER BY id"))?;
        let blogs = stmt
            .query_map([], Self::blog_from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(blogs)
    }

    fn update_blog(&self, blog: &Blog) -> Result<Blog> {
        let conn = self.conn()?;
        let updated_at = next_version(blog.updated_at, self.clock.now());

        let changed = conn.execute(
            "UPDATE blogs
             SET site_url = ?1, title = ?2, etag = ?3, last_modified = ?4, synced_at = ?5, updated_at = ?6
             WHERE id = ?7 AND updated_at = ?8",
            params![
                blog.site_url,
                blog.title,
                blog.etag,
                blog.last_modified,
                Self::format_datetime(&blog.synced_at),
                Self::format_datetime(&updated_at),
                blog.id,
                Self::format_datetime(&blog.updated_at),
            ],
        )?;

        if changed == 0 {
            return Err(TributaryError::NotFound(format!(
                "blog {} (missing or modified concurrently)",
                blog.id
            )));
        }

        Ok(Blog {
            updated_at,
            ..blog.clone()
        })
    }

    fn create_post(&self, post: &Post) -> Result<Post> {
        let conn = self.conn()?;

        conn.execute(
            "INSERT INTO posts (blog_id, url, title, content, published_at, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                post.blog_id,
                post.url,
                post.title,
                post.content,
                Self::format_datetime(&post.published_at),
                Self::format_datetime(&post.created_at),
                Self::format_datetime(&post.updated_at),
            ],
        )
        .map_err(|e| conflict_or(e, || format!("post {}", post.url)))?;

        Ok(Post {
            id: conn.last_insert_rowid(),
            ..post.clone()
        })
    }

    fn read_post_by_url(&self, url: &str) -> Result<Post> {
        let conn = self.conn()?;

        conn.query_row(
            &format!("SELECT {POST_COLUMNS} FROM posts WHERE url = ?1"),
            params![url],
            Self::post_from_row,
        )
        .optional()?
        .ok_or_else(|| TributaryError::NotFound(format!("post {url}")))
    }

    fn list_posts(&self, blog_id: i64, limit: usize, offset: usize) -> Result<Vec<Post>> {
        let conn = self.conn()?;

        let mut stmt = conn.prepare(&format!(
            "SELECT {POST_COLUMNS} FROM posts WHERE blog_id = ?1
             ORDER BY published_at DESC, id DESC LIMIT ?2 OFFSET ?3"
        ))?;
        let posts = stmt
            .query_map(
                params![blog_id, limit as i64, offset as i64],
                Self::post_from_row,
            )?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(posts)
    }

    fn update_post(&self, post: &Post) -> Result<Post> {
        let conn = self.conn()?;
        let updated_at = next_version(post.updated_at, self.clock.now());

        let changed = conn.execute(
            "UPDATE posts
             SET title = ?1, content = ?2, published_at = ?3, updated_at = ?4
             WHERE id = ?5 AND updated_at = ?6",
            params![
                post.title,
                post.content,
                Self::format_datetime(&post.published_at),
                Self::format_datetime(&updated_at),
                post.id,
                Self::format_datetime(&post.updated_at),
            ],
        )?;

        if changed == 0 {
            return Err(TributaryError::NotFound(format!(
                "post {} (missing or modified concurrently)",
                post.url
            )));
        }

        Ok(Post {
            updated_at,
            ..post.clone()
        })
    }
}
