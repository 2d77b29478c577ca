use chrono::{DateTime, Utc};
use feed_rs::model::{Entry, Feed, Link};
use feed_rs::parser;
use html_escape::decode_html_entities;

use crate::app::{Result, TributaryError};
use crate::clock::normalize;
use crate::domain::{ParsedFeed, ParsedPost};

/// Decode a raw RSS/Atom/JSON feed into a [`ParsedFeed`].
///
/// Entries without a link or a title are dropped. An entry has no
/// publication time when neither it nor the feed carries one.
pub fn parse(feed_url: &str, body: &[u8]) -> Result<ParsedFeed> {
    let feed = parser::parse(body).map_err(|e| TributaryError::MalformedFeed(e.to_string()))?;

    let site_url = alternate_link(&feed.links).unwrap_or_default();
    let title = feed
        .title
        .as_ref()
        .map(|t| decode_text(&t.content))
        .unwrap_or_default();

    let posts = feed
        .entries
        .iter()
        .filter_map(|entry| parse_entry(&feed, entry, &site_url))
        .collect();

    Ok(ParsedFeed {
        feed_url: feed_url.to_string(),
        site_url,
        title,
        posts,
    })
}

fn parse_entry(feed: &Feed, entry: &Entry, site_url: &str) -> Option<ParsedPost> {
    let link = alternate_link(&entry.links).unwrap_or_default();
    let title = entry
        .title
        .as_ref()
        .map(|t| decode_text(&t.content))
        .unwrap_or_default();

    if link.is_empty() || title.is_empty() {
        tracing::debug!(site_url, "skipping entry without link or title");
        return None;
    }

    let content = entry
        .content
        .as_ref()
        .and_then(|c| c.body.clone())
        .unwrap_or_default();

    Some(ParsedPost {
        url: normalize_post_url(site_url, &link),
        title,
        content,
        published_at: determine_published_at(entry.published, feed.updated),
    })
}

/// Resolve an entry link against the site URL and make sure it has a scheme.
pub fn normalize_post_url(site_url: &str, link: &str) -> String {
    let mut url = link.to_string();

    if link.starts_with('/') {
        url = match site_url.strip_suffix('/') {
            Some(base) => format!("{base}{link}"),
            None => format!("{site_url}{link}"),
        };
    }

    if !(url.starts_with("https://") || url.starts_with("http://")) {
        url = format!("https://{url}");
    }

    url
}

/// Entry publication time, else the feed's update time.
pub fn determine_published_at(
    entry_published: Option<DateTime<Utc>>,
    feed_updated: Option<DateTime<Utc>>,
) -> Option<DateTime<Utc>> {
    entry_published.or(feed_updated).map(normalize)
}

/// The page a feed or entry points at: the first link without `rel` or with
/// `rel="alternate"`, else the first link that isn't `rel="self"`.
fn alternate_link(links: &[Link]) -> Option<String> {
    let href = |l: &Link| l.href.trim().to_string();

    links
        .iter()
        .find(|l| matches!(l.rel.as_deref(), None | Some("alternate")))
        .or_else(|| links.iter().find(|l| l.rel.as_deref() != Some("self")))
        .map(href)
        .filter(|h| !h.is_empty())
}

fn decode_text(s: &str) -> String {
    decode_html_entities(s.trim()).trim().to_string()
}
