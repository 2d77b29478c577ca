//! # Tributary
//!
//! Keeps a local store of blogs and their posts in sync with the blogs'
//! RSS/Atom feeds.
//!
//! ## Architecture
//!
//! Each sync pass follows the same pipeline per blog:
//!
//! ```text
//! Fetcher → Normalizer → Hydrator → Reconcile → Store
//! ```
//!
//! - [`fetcher`]: HTTP client with ETag/Last-Modified conditional requests
//! - [`normalizer`]: Converts RSS/Atom feeds into parsed posts
//! - [`hydrator`]: Fills in missing post content from the post's page
//! - [`sync`]: Decides what to create or update and runs the pass
//! - [`store`]: SQLite (or in-memory) persistence
//!
//! ## Quick Start
//!
//! ```bash
//! # Add a blog by its feed URL
//! tributary add https://blog.rust-lang.org/feed.xml
//!
//! # Sync every blog once
//! tributary sync
//!
//! # List blogs, or one blog's posts
//! tributary list
//! tributary list --posts https://blog.rust-lang.org/feed.xml
//!
//! # Keep syncing every hour
//! tributary run --interval 1h
//! ```

/// Application context and error handling.
///
/// The [`AppContext`](app::AppContext) struct wires together all components:
/// store, fetchers, clock and sync service.
pub mod app;

/// Command-line interface using clap.
///
/// - `add <url>` - Sync one feed, creating its blog
/// - `sync` - Run one full pass
/// - `list [--posts <feed-url>]` - List blogs or posts
/// - `run [--interval 1h]` - Sync periodically
pub mod cli;

/// Time source, swappable in tests.
pub mod clock;

/// Configuration loaded from `~/.config/tributary/config.toml`.
pub mod config;

pub mod daemon;

/// Core domain models.
///
/// - [`Blog`](domain::Blog): a followed feed and its cache tokens
/// - [`Post`](domain::Post): an entry stored for a blog
/// - [`ParsedFeed`](domain::ParsedFeed): transient parse output
pub mod domain;

/// HTTP fetching with conditional request support.
///
/// - [`FeedFetcher`](fetcher::FeedFetcher): Async trait for feed fetching
/// - [`PageFetcher`](fetcher::PageFetcher): Async trait for page text
/// - [`HttpFeedFetcher`](fetcher::HttpFeedFetcher): reqwest-based implementation
pub mod fetcher;

pub mod hydrator;

/// Feed parsing and normalization.
///
/// Converts RSS 0.9x/1.0/2.0, Atom 0.3/1.0, and JSON Feed 1.0
/// into [`ParsedFeed`](domain::ParsedFeed) values.
pub mod normalizer;

/// Persistence layer.
///
/// - [`Store`](store::Store): Trait defining storage operations
/// - [`SqliteStore`](store::SqliteStore): SQLite implementation
/// - [`MemoryStore`](store::MemoryStore): in-process implementation
pub mod store;

pub mod sync;
