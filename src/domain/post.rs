use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::clock::normalize;
use crate::domain::Blog;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Post {
    pub id: i64,
    pub blog_id: i64,
    pub url: String,
    pub title: String,
    pub content: String,
    pub published_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Post {
    pub fn new(
        blog: &Blog,
        url: impl Into<String>,
        title: impl Into<String>,
        content: impl Into<String>,
        published_at: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: 0,
            blog_id: blog.id,
            url: url.into(),
            title: title.into(),
            content: content.into(),
            published_at: normalize(published_at),
            created_at: now,
            updated_at: now,
        }
    }

    /// First `max_chars` characters of the content, for listings.
    pub fn preview(&self, max_chars: usize) -> String {
        let mut preview: String = self.content.chars().take(max_chars).collect();
        if self.content.chars().count() > max_chars {
            preview.push('…');
        }
        preview
    }
}
