use thiserror::Error;

#[derive(Error, Debug)]
pub enum TributaryError {
    #[error("Feed unreachable: {0}")]
    UnreachableFeed(String),

    #[error("Page unreachable: {0}")]
    UnreachablePage(String),

    #[error("Malformed feed: {0}")]
    MalformedFeed(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("{0}")]
    Other(String),
}

impl TributaryError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

pub type Result<T> = std::result::Result<T, TributaryError>;
