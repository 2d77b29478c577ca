use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};

use crate::domain::{Blog, ParsedPost, Post};

/// Writes needed to bring a blog's stored posts in line with its feed.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Reconciliation {
    pub to_create: Vec<Post>,
    pub to_update: Vec<Post>,
}

impl Reconciliation {
    pub fn is_empty(&self) -> bool {
        self.to_create.is_empty() && self.to_update.is_empty()
    }
}

/// Diff freshly parsed posts against the blog's known posts, keyed by URL.
///
/// Known posts only change where the feed supplies a non-empty value that
/// differs from the stored one; empty feed fields never erase stored data.
/// An undated entry is stamped with `now` when created and never moves a
/// stored date. A URL repeated within one feed is considered once.
pub fn reconcile(
    blog: &Blog,
    known: &[Post],
    parsed: &[ParsedPost],
    now: DateTime<Utc>,
) -> Reconciliation {
    let by_url: HashMap<&str, &Post> = known.iter().map(|p| (p.url.as_str(), p)).collect();
    let mut seen = HashSet::new();
    let mut result = Reconciliation::default();

    for incoming in parsed {
        if !seen.insert(incoming.url.as_str()) {
            continue;
        }

        let Some(existing) = by_url.get(incoming.url.as_str()) else {
            result.to_create.push(Post::new(
                blog,
                incoming.url.clone(),
                incoming.title.clone(),
                incoming.content.clone(),
                incoming.published_at.unwrap_or(now),
                now,
            ));
            continue;
        };

        let mut post = (*existing).clone();
        let mut dirty = false;

        if !incoming.title.is_empty() && incoming.title != post.title {
            post.title = incoming.title.clone();
            dirty = true;
        }
        if !incoming.content.is_empty() && incoming.content != post.content {
            post.content = incoming.content.clone();
            dirty = true;
        }
        if let Some(published_at) = incoming.published_at {
            if published_at != post.published_at {
                post.published_at = published_at;
                dirty = true;
            }
        }

        if dirty {
            result.to_update.push(post);
        }
    }

    result
}
