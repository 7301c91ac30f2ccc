//! LRU metadata cache
//!
//! Sits in front of folder and annotation-set reads only. Image
//! payloads are never cached here: a reassembled binary can be orders
//! of magnitude larger than the metadata, and keeping them would defeat
//! the point of a bounded cache. Writes invalidate (remove) the entry
//! rather than refreshing it.

use std::num::NonZeroUsize;
use std::sync::Arc;

use lru::LruCache;
use tokio::sync::RwLock;

use crate::annotations::AnnotationSet;
use crate::library::Folder;

/// Bounded cache for folder and annotation metadata
#[derive(Clone)]
pub struct MetadataCache {
    folders: Arc<RwLock<LruCache<String, Folder>>>,
    /// Saved annotation sets per folder id
    annotation_sets: Arc<RwLock<LruCache<String, Vec<AnnotationSet>>>>,
}

impl MetadataCache {
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity.max(1)).unwrap_or(NonZeroUsize::MIN);
        Self {
            folders: Arc::new(RwLock::new(LruCache::new(capacity))),
            annotation_sets: Arc::new(RwLock::new(LruCache::new(capacity))),
        }
    }

    pub async fn get_folder(&self, id: &str) -> Option<Folder> {
        self.folders.write().await.get(id).cloned()
    }

    pub async fn put_folder(&self, folder: Folder) {
        self.folders.write().await.put(folder.id.clone(), folder);
    }

    pub async fn get_annotation_sets(&self, folder_id: &str) -> Option<Vec<AnnotationSet>> {
        self.annotation_sets.write().await.get(folder_id).cloned()
    }

    pub async fn put_annotation_sets(&self, folder_id: &str, sets: Vec<AnnotationSet>) {
        self.annotation_sets
            .write()
            .await
            .put(folder_id.to_string(), sets);
    }

    /// Drop every cached entry for a folder after any write to it
    pub async fn invalidate_folder(&self, id: &str) {
        self.folders.write().await.pop(id);
        self.annotation_sets.write().await.pop(id);
    }
}
