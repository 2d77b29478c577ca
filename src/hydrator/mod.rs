use crate::domain::ParsedFeed;
use crate::fetcher::PageFetcher;

/// Fill in content for posts the feed left empty, one page at a time.
///
/// A page that can't be fetched leaves its post empty; it never fails the feed.
pub async fn hydrate(mut feed: ParsedFeed, pages: &dyn PageFetcher) -> ParsedFeed {
    for post in feed.posts.iter_mut().filter(|p| p.content.is_empty()) {
        match pages.fetch_page(&post.url).await {
            Ok(content) => {
                tracing::debug!(url = %post.url, chars = content.len(), "hydrated post");
                post.content = content;
            }
            Err(e) => {
                tracing::warn!(url = %post.url, error = %e, "failed to hydrate post");
            }
        }
    }

    feed
}
