use chrono::{DateTime, Utc};

/// A feed as decoded from the wire, before it touches the store.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ParsedFeed {
    pub feed_url: String,
    pub site_url: String,
    pub title: String,
    pub posts: Vec<ParsedPost>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedPost {
    pub url: String,
    pub title: String,
    pub content: String,
    /// `None` when neither the entry nor its feed carried a date.
    pub published_at: Option<DateTime<Utc>>,
}
