pub mod http_fetcher;
pub mod mock;
pub mod sanitize;

use async_trait::async_trait;

use crate::app::Result;

pub use http_fetcher::{HttpFeedFetcher, HttpPageFetcher};

/// Outcome of a conditional feed fetch.
///
/// "Not modified" is an empty `body`. Tokens are `""` when the response did
/// not carry them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FeedResponse {
    pub body: Vec<u8>,
    pub etag: String,
    pub last_modified: String,
}

impl FeedResponse {
    pub fn has_content(&self) -> bool {
        !self.body.is_empty()
    }
}

#[async_trait]
pub trait FeedFetcher: Send + Sync {
    /// Fetch `url`, sending `If-None-Match`/`If-Modified-Since` for non-empty tokens.
    async fn fetch_feed(&self, url: &str, etag: &str, last_modified: &str)
        -> Result<FeedResponse>;
}

#[async_trait]
pub trait PageFetcher: Send + Sync {
    /// Fetch a web page and return its readable text.
    async fn fetch_page(&self, url: &str) -> Result<String>;
}
