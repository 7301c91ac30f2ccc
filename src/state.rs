//! Application state
//!
//! Every component is constructed once at startup and handed to
//! consumers through this state; there are no module-level singletons.

use std::sync::Arc;

use sqlx::SqlitePool;

use crate::annotations::CalibrationManager;
use crate::config::Config;
use crate::db::{ChunkStore, MetadataCache};
use crate::ocr::{HttpOcrProvider, OcrProviderTrait, OcrService};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: Config,
    db: SqlitePool,
    cache: MetadataCache,
    chunks: ChunkStore,
    calibration: CalibrationManager,
    ocr: Arc<OcrService>,
}

impl AppState {
    /// Create application state with the HTTP OCR provider
    pub fn new(config: Config, db: SqlitePool) -> Self {
        let provider = Arc::new(HttpOcrProvider::new(&config.ocr.endpoint));
        Self::with_provider(config, db, provider)
    }

    /// Create application state with an explicit OCR provider
    pub fn with_provider(
        config: Config,
        db: SqlitePool,
        provider: Arc<dyn OcrProviderTrait>,
    ) -> Self {
        let cache = MetadataCache::new(config.storage.cache_capacity);
        let chunks = ChunkStore::new(db.clone(), config.storage.chunk_size);
        let ocr = Arc::new(OcrService::new(provider, config.ocr.clone()));

        Self {
            inner: Arc::new(AppStateInner {
                config,
                db,
                cache,
                chunks,
                calibration: CalibrationManager::new(),
                ocr,
            }),
        }
    }

    pub fn config(&self) -> &Config {
        &self.inner.config
    }

    pub fn db(&self) -> &SqlitePool {
        &self.inner.db
    }

    pub fn cache(&self) -> &MetadataCache {
        &self.inner.cache
    }

    pub fn chunks(&self) -> &ChunkStore {
        &self.inner.chunks
    }

    pub fn calibration(&self) -> &CalibrationManager {
        &self.inner.calibration
    }

    pub fn ocr(&self) -> Arc<OcrService> {
        Arc::clone(&self.inner.ocr)
    }
}
