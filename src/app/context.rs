use std::path::PathBuf;
use std::sync::Arc;

use crate::app::error::{Result, TributaryError};
use crate::clock::{Clock, SystemClock};
use crate::config::Config;
use crate::fetcher::{HttpFeedFetcher, HttpPageFetcher};
use crate::store::sqlite::SqliteStore;
use crate::store::Store;
use crate::sync::SyncService;

pub struct AppContext {
    pub config: Config,
    pub store: Arc<SqliteStore>,
    pub sync: Arc<SyncService>,
}

impl AppContext {
    pub fn new(config: Config) -> Result<Self> {
        let db_path = match &config.database.path {
            Some(p) => p.clone(),
            None => Self::default_db_path()?,
        };

        let clock: Arc<dyn Clock> = Arc::new(SystemClock);
        let store = Arc::new(SqliteStore::new(&db_path)?.with_clock(clock.clone()));
        Self::with_store(config, store, clock)
    }

    pub fn in_memory(config: Config) -> Result<Self> {
        let clock: Arc<dyn Clock> = Arc::new(SystemClock);
        let store = Arc::new(SqliteStore::in_memory()?.with_clock(clock.clone()));
        Self::with_store(config, store, clock)
    }

    fn with_store(config: Config, store: Arc<SqliteStore>, clock: Arc<dyn Clock>) -> Result<Self> {
        let feeds = Arc::new(HttpFeedFetcher::new(&config.http)?);
        let pages = Arc::new(HttpPageFetcher::new(&config.http)?);
        let sync = Arc::new(SyncService::new(
            store.clone() as Arc<dyn Store>,
            feeds,
            pages,
            clock,
            &config.sync,
        ));

        Ok(Self {
            config,
            store,
            sync,
        })
    }

    fn default_db_path() -> Result<PathBuf> {
        let data_dir = dirs::data_dir()
            .ok_or_else(|| TributaryError::Config("Could not find data directory".into()))?;
        let tributary_dir = data_dir.join("tributary");
        std::fs::create_dir_all(&tributary_dir)?;
        Ok(tributary_dir.join("tributary.db"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_context_uses_configured_database() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = Config::default();
        config.database.path = Some(dir.path().join("test.db"));

        let ctx = AppContext::new(config).unwrap();
        assert!(ctx.store.list_blogs().unwrap().is_empty());
        assert!(dir.path().join("test.db").exists());
    }

    #[test]
    fn test_in_memory_context() {
        let ctx = AppContext::in_memory(Config::default()).unwrap();
        assert!(ctx.sync.store().list_blogs().unwrap().is_empty());
    }
}
