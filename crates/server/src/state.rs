use std::sync::Arc;

use arrmate_core::{CatalogSync, ConfigStore, Pool, SeriesMirror, SeriesSearch};

use crate::chat::ChatResponder;

/// Shared application state
pub struct AppState {
    pool: Pool,
    config_store: ConfigStore,
    mirror: SeriesMirror,
    search: SeriesSearch,
    sync: Arc<CatalogSync>,
    chat: ChatResponder,
}

impl AppState {
    pub fn new(pool: Pool, sync: Arc<CatalogSync>) -> Self {
        let search = SeriesSearch::new(pool.clone());
        Self {
            config_store: ConfigStore::new(pool.clone()),
            mirror: SeriesMirror::new(pool.clone()),
            chat: ChatResponder::new(search.clone(), Arc::clone(&sync)),
            search,
            sync,
            pool,
        }
    }

    pub fn pool(&self) -> &Pool {
        &self.pool
    }

    pub fn config_store(&self) -> &ConfigStore {
        &self.config_store
    }

    pub fn mirror(&self) -> &SeriesMirror {
        &self.mirror
    }

    pub fn search(&self) -> &SeriesSearch {
        &self.search
    }

    pub fn sync(&self) -> &Arc<CatalogSync> {
        &self.sync
    }

    pub fn chat(&self) -> &ChatResponder {
        &self.chat
    }
}
