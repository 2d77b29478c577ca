use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// A feed-backed blog.
///
/// `etag` and `last_modified` are opaque cache-validation tokens; an empty
/// string means the origin never sent one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Blog {
    pub id: i64,
    pub feed_url: String,
    pub site_url: String,
    pub title: String,
    pub etag: String,
    pub last_modified: String,
    pub synced_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Blog {
    pub fn new(
        feed_url: impl Into<String>,
        site_url: impl Into<String>,
        title: impl Into<String>,
        synced_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: 0,
            feed_url: feed_url.into(),
            site_url: site_url.into(),
            title: title.into(),
            etag: String::new(),
            last_modified: String::new(),
            synced_at,
            created_at: synced_at,
            updated_at: synced_at,
        }
    }

    pub fn display_title(&self) -> &str {
        if self.title.is_empty() {
            &self.feed_url
        } else {
            &self.title
        }
    }

    /// Whether enough time has passed since the last sync attempt.
    pub fn is_syncable(&self, now: DateTime<Utc>, cooldown: Duration) -> bool {
        now.signed_duration_since(self.synced_at) >= cooldown
    }

    /// Record a sync attempt. Never moves `synced_at` backwards.
    pub fn mark_synced(&mut self, now: DateTime<Utc>) {
        if now > self.synced_at {
            self.synced_at = now;
        }
    }

    /// Adopt non-empty tokens from a response. Returns whether anything changed.
    pub fn refresh_cache_tokens(&mut self, etag: &str, last_modified: &str) -> bool {
        let mut changed = false;
        if !etag.is_empty() && etag != self.etag {
            self.etag = etag.to_string();
            changed = true;
        }
        if !last_modified.is_empty() && last_modified != self.last_modified {
            self.last_modified = last_modified.to_string();
            changed = true;
        }
        changed
    }
}
