use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ETAG, IF_MODIFIED_SINCE, IF_NONE_MATCH, LAST_MODIFIED};
use reqwest::{Client, StatusCode};
use url::Url;

use crate::app::{Result, TributaryError};
use crate::config::HttpConfig;
use crate::fetcher::sanitize::clean_html;
use crate::fetcher::{FeedFetcher, FeedResponse, PageFetcher};

fn build_client(config: &HttpConfig) -> Result<Client> {
    let client = Client::builder()
        .timeout(Duration::from_secs(config.timeout_secs))
        .gzip(true)
        .brotli(true)
        .user_agent(config.user_agent.clone())
        .build()?;
    Ok(client)
}

fn header_string(headers: &HeaderMap, name: reqwest::header::HeaderName) -> String {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(String::from)
        .unwrap_or_default()
}

pub struct HttpFeedFetcher {
    client: Client,
}

impl HttpFeedFetcher {
    pub fn new(config: &HttpConfig) -> Result<Self> {
        Ok(Self {
            client: build_client(config)?,
        })
    }
}

#[async_trait]
impl FeedFetcher for HttpFeedFetcher {
    async fn fetch_feed(
        &self,
        url: &str,
        etag: &str,
        last_modified: &str,
    ) -> Result<FeedResponse> {
        let unreachable = |reason: String| TributaryError::UnreachableFeed(format!("{url}: {reason}"));

        Url::parse(url).map_err(|e| unreachable(e.to_string()))?;

        let mut headers = HeaderMap::new();

        if !etag.is_empty() {
            if let Ok(value) = HeaderValue::from_str(etag) {
                headers.insert(IF_NONE_MATCH, value);
            }
        }

        if !last_modified.is_empty() {
            if let Ok(value) = HeaderValue::from_str(last_modified) {
                headers.insert(IF_MODIFIED_SINCE, value);
            }
        }

        let response = self
            .client
            .get(url)
            .headers(headers)
            .send()
            .await
            .map_err(|e| unreachable(e.to_string()))?;

        let status = response.status();
        if status.as_u16() >= 400 {
            return Err(unreachable(format!("status {status}")));
        }

        let etag = header_string(response.headers(), ETAG);
        let last_modified = header_string(response.headers(), LAST_MODIFIED);

        if status == StatusCode::NOT_MODIFIED {
            tracing::debug!(url, "feed not modified");
            return Ok(FeedResponse {
                body: Vec::new(),
                etag,
                last_modified,
            });
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| unreachable(e.to_string()))?
            .to_vec();

        Ok(FeedResponse {
            body,
            etag,
            last_modified,
        })
    }
}

pub struct HttpPageFetcher {
    client: Client,
}

impl HttpPageFetcher {
    pub fn new(config: &HttpConfig) -> Result<Self> {
        Ok(Self {
            client: build_client(config)?,
        })
    }
}

#[async_trait]
impl PageFetcher for HttpPageFetcher {
    async fn fetch_page(&self, url: &str) -> Result<String> {
        let unreachable = |reason: String| TributaryError::UnreachablePage(format!("{url}: {reason}"));

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| unreachable(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(unreachable(format!("status {status}")));
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| unreachable(e.to_string()))?;

        Ok(clean_html(&body))
    }
}
