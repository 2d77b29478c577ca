//! In-process fetchers for exercising the sync pipeline without a network.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::SecondsFormat;
use html_escape::{encode_double_quoted_attribute, encode_text};
use tokio::sync::{Notify, Semaphore};

use crate::app::{Result, TributaryError};
use crate::domain::ParsedPost;
use crate::fetcher::{FeedFetcher, FeedResponse, PageFetcher};

/// A conditional request as seen by [`MockFeedFetcher`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedRequest {
    pub url: String,
    pub etag: String,
    pub last_modified: String,
}

/// Serves canned [`FeedResponse`]s by URL; unknown URLs are unreachable.
#[derive(Default)]
pub struct MockFeedFetcher {
    responses: Mutex<HashMap<String, FeedResponse>>,
    requests: Mutex<Vec<FeedRequest>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    delay: Option<Duration>,
    gate: Option<Arc<Semaphore>>,
    started: Notify,
}

impl MockFeedFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Hold every fetch for `delay` before answering.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Block every fetch until `gate` has a permit available.
    pub fn with_gate(mut self, gate: Arc<Semaphore>) -> Self {
        self.gate = Some(gate);
        self
    }

    pub fn set_response(&self, url: &str, response: FeedResponse) {
        if let Ok(mut responses) = self.responses.lock() {
            responses.insert(url.to_string(), response);
        }
    }

    pub fn set_feed(&self, url: &str, body: impl Into<Vec<u8>>) {
        self.set_response(
            url,
            FeedResponse {
                body: body.into(),
                ..Default::default()
            },
        );
    }

    pub fn requests(&self) -> Vec<FeedRequest> {
        self.requests.lock().map(|r| r.clone()).unwrap_or_default()
    }

    pub fn fetch_count(&self) -> usize {
        self.requests.lock().map(|r| r.len()).unwrap_or_default()
    }

    /// Highest number of fetches observed running at the same time.
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    /// Wait until at least one fetch has started.
    pub async fn wait_started(&self) {
        self.started.notified().await;
    }
}

#[async_trait]
impl FeedFetcher for MockFeedFetcher {
    async fn fetch_feed(
        &self,
        url: &str,
        etag: &str,
        last_modified: &str,
    ) -> Result<FeedResponse> {
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(FeedRequest {
                url: url.to_string(),
                etag: etag.to_string(),
                last_modified: last_modified.to_string(),
            });
        }

        let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(current, Ordering::SeqCst);
        self.started.notify_one();

        if let Some(gate) = &self.gate {
            let _permit = gate.acquire().await;
        }
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        let response = self
            .responses
            .lock()
            .ok()
            .and_then(|responses| responses.get(url).cloned());

        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        response.ok_or_else(|| TributaryError::UnreachableFeed(url.to_string()))
    }
}

/// Serves canned page text by URL; unknown URLs are unreachable.
#[derive(Default)]
pub struct MockPageFetcher {
    pages: Mutex<HashMap<String, String>>,
    fetches: AtomicUsize,
}

impl MockPageFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_page(&self, url: &str, text: &str) {
        if let Ok(mut pages) = self.pages.lock() {
            pages.insert(url.to_string(), text.to_string());
        }
    }

    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PageFetcher for MockPageFetcher {
    async fn fetch_page(&self, url: &str) -> Result<String> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        self.pages
            .lock()
            .ok()
            .and_then(|pages| pages.get(url).cloned())
            .ok_or_else(|| TributaryError::UnreachablePage(url.to_string()))
    }
}

/// Render an Atom 1.0 document. Posts with empty content get no `<content>`.
pub fn atom_feed(title: &str, site_url: &str, posts: &[ParsedPost]) -> String {
    let mut xml = String::from("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");
    xml.push_str("<feed xmlns=\"http://www.w3.org/2005/Atom\">\n");
    xml.push_str(&format!("  <title>{}</title>\n", encode_text(title)));
    xml.push_str(&format!(
        "  <link href=\"{}\"/>\n",
        encode_double_quoted_attribute(site_url)
    ));
    xml.push_str(&format!("  <id>{}</id>\n", encode_text(site_url)));

    for post in posts {
        xml.push_str("  <entry>\n");
        xml.push_str(&format!("    <title>{}</title>\n", encode_text(&post.title)));
        xml.push_str(&format!(
            "    <link href=\"{}\"/>\n",
            encode_double_quoted_attribute(&post.url)
        ));
        xml.push_str(&format!("    <id>{}</id>\n", encode_text(&post.url)));
        if let Some(published_at) = post.published_at {
            xml.push_str(&format!(
                "    <published>{}</published>\n",
                published_at.to_rfc3339_opts(SecondsFormat::Micros, true)
            ));
        }
        if !post.content.is_empty() {
            xml.push_str(&format!(
                "    <content type=\"html\">{}</content>\n",
                encode_text(&post.content)
            ));
        }
        xml.push_str("  </entry>\n");
    }

    xml.push_str("</feed>\n");
    xml
}
